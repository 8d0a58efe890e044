//! Tablespace page frame source.
//!
//! [`PageSource`] hands out fixed 16 KiB [`PageFrame`]s from a `.ibd` file,
//! a memory map of one, or an in-memory image. Every read is addressed by
//! offset (`page_no * PAGE_SIZE`) through `&self`, so one source can be
//! shared by several decoding threads. File-backed sources serialize their
//! seek+read pairs behind a mutex; in-memory and mapped sources need no lock.
//!
//! A trailing partial page is never silently dropped: [`PageSource::frames`]
//! ends with an `Io` error for it rather than reaching end of stream.

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use tracing::debug;

use crate::innodb::constants::*;
use crate::InnoError;

/// Supertrait combining `Read + Seek` for type-erased readers.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// One page worth of raw bytes and its position in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFrame {
    page_no: u64,
    data: Vec<u8>,
}

impl PageFrame {
    /// Wrap bytes that were read for page `page_no`.
    pub fn new(page_no: u64, data: Vec<u8>) -> Self {
        PageFrame { page_no, data }
    }

    /// Ordinal position of the frame: byte offset / `PAGE_SIZE`.
    pub fn page_no(&self) -> u64 {
        self.page_no
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Byte offset of the frame within its file.
    pub fn file_offset(&self) -> u64 {
        self.page_no * PAGE_SIZE as u64
    }
}

enum Backend {
    Stream(Mutex<Box<dyn ReadSeek + Send>>),
    Memory(Vec<u8>),
    #[cfg(feature = "cli")]
    Mapped(memmap2::Mmap),
}

/// Random-access supplier of page frames.
pub struct PageSource {
    backend: Backend,
    file_size: u64,
}

impl PageSource {
    /// Open a tablespace file for buffered reads.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, InnoError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| InnoError::Io(format!("Cannot open {}: {}", path.display(), e)))?;
        let file_size = file
            .metadata()
            .map_err(|e| InnoError::Io(format!("Cannot stat {}: {}", path.display(), e)))?
            .len();
        debug!(path = %path.display(), file_size, "opened tablespace");
        Ok(Self::from_reader(Box::new(file), file_size))
    }

    /// Open a tablespace file using memory-mapped I/O.
    ///
    /// Mapped pages are copied out per frame without seeking, so concurrent
    /// readers never contend on a file cursor.
    ///
    /// # Safety
    ///
    /// The underlying `mmap` call is marked `unsafe` because the mapped file
    /// must not be modified by another process while the mapping is active.
    /// The file should not be written to by MySQL while it is being analyzed.
    #[cfg(feature = "cli")]
    pub fn open_mmap<P: AsRef<Path>>(path: P) -> Result<Self, InnoError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| InnoError::Io(format!("Cannot open {}: {}", path.display(), e)))?;
        let mmap = unsafe {
            memmap2::Mmap::map(&file)
                .map_err(|e| InnoError::Io(format!("Cannot mmap {}: {}", path.display(), e)))?
        };
        let file_size = mmap.len() as u64;
        debug!(path = %path.display(), file_size, "mapped tablespace");
        Ok(PageSource {
            backend: Backend::Mapped(mmap),
            file_size,
        })
    }

    /// Wrap any seekable reader of known length.
    pub fn from_reader(reader: Box<dyn ReadSeek + Send>, file_size: u64) -> Self {
        PageSource {
            backend: Backend::Stream(Mutex::new(reader)),
            file_size,
        }
    }

    /// Create a source over an in-memory tablespace image.
    ///
    /// # Examples
    ///
    /// ```
    /// use innoread::innodb::constants::PAGE_SIZE;
    /// use innoread::innodb::tablespace::PageSource;
    ///
    /// let source = PageSource::from_bytes(vec![0u8; PAGE_SIZE * 3]);
    /// assert_eq!(source.page_count(), 3);
    ///
    /// let frame = source.read_page(2).unwrap();
    /// assert_eq!(frame.page_no(), 2);
    /// assert_eq!(frame.data().len(), PAGE_SIZE);
    /// assert!(source.read_page(3).is_err());
    /// ```
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let file_size = data.len() as u64;
        PageSource {
            backend: Backend::Memory(data),
            file_size,
        }
    }

    /// Number of whole pages in the source.
    pub fn page_count(&self) -> u64 {
        self.file_size / PAGE_SIZE as u64
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Bytes after the last whole page; non-zero means the file is truncated.
    pub fn trailing_bytes(&self) -> u64 {
        self.file_size % PAGE_SIZE as u64
    }

    /// Read page `page_no` by random access.
    ///
    /// A page number at or past the end of the file is an `Argument` error;
    /// a page that is only partly present is an `Io` error.
    pub fn read_page(&self, page_no: u64) -> Result<PageFrame, InnoError> {
        self.next_frame(page_no)?.ok_or_else(|| {
            InnoError::Argument(format!(
                "Page {} out of range (tablespace has {} pages)",
                page_no,
                self.page_count()
            ))
        })
    }

    /// Read the frame at `page_no`, or `None` at end of stream.
    pub fn next_frame(&self, page_no: u64) -> Result<Option<PageFrame>, InnoError> {
        let offset = page_no
            .checked_mul(PAGE_SIZE as u64)
            .filter(|&o| o < self.file_size);
        let offset = match offset {
            Some(o) => o,
            None => return Ok(None),
        };

        let available = self.file_size - offset;
        if available < PAGE_SIZE as u64 {
            return Err(InnoError::Io(format!(
                "Short read at page {}: {} of {} bytes available",
                page_no, available, PAGE_SIZE
            )));
        }

        let data = match &self.backend {
            Backend::Stream(reader) => {
                let mut reader = reader
                    .lock()
                    .map_err(|_| InnoError::Io("Tablespace reader lock poisoned".to_string()))?;
                reader.seek(SeekFrom::Start(offset)).map_err(|e| {
                    InnoError::Io(format!("Cannot seek to page {}: {}", page_no, e))
                })?;
                let mut buf = vec![0u8; PAGE_SIZE];
                reader
                    .read_exact(&mut buf)
                    .map_err(|e| InnoError::Io(format!("Cannot read page {}: {}", page_no, e)))?;
                buf
            }
            Backend::Memory(bytes) => slice_page(bytes, offset),
            #[cfg(feature = "cli")]
            Backend::Mapped(mmap) => slice_page(mmap, offset),
        };

        Ok(Some(PageFrame::new(page_no, data)))
    }

    /// Lazily iterate frames from `start` to the end of the source.
    ///
    /// The iterator yields at most one `Err` and stops after it.
    pub fn frames(&self, start: u64) -> Frames<'_> {
        Frames {
            source: self,
            next: start,
            done: false,
        }
    }
}

fn slice_page(bytes: &[u8], offset: u64) -> Vec<u8> {
    let start = offset as usize;
    bytes[start..start + PAGE_SIZE].to_vec()
}

/// Sequential iterator over the frames of a [`PageSource`].
pub struct Frames<'a> {
    source: &'a PageSource,
    next: u64,
    done: bool,
}

impl Iterator for Frames<'_> {
    type Item = Result<PageFrame, InnoError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.source.next_frame(self.next) {
            Ok(Some(frame)) => {
                self.next += 1;
                Some(Ok(frame))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, ByteOrder};
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn numbered_pages(count: u32) -> Vec<u8> {
        let mut data = vec![0u8; PAGE_SIZE * count as usize];
        for n in 0..count {
            let base = n as usize * PAGE_SIZE;
            BigEndian::write_u32(&mut data[base + FIL_PAGE_OFFSET..], n);
        }
        data
    }

    fn write_temp(data: &[u8]) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().expect("create temp file");
        tmp.write_all(data).expect("write pages");
        tmp.flush().expect("flush");
        tmp
    }

    fn page_no_of(frame: &PageFrame) -> u32 {
        BigEndian::read_u32(&frame.data()[FIL_PAGE_OFFSET..])
    }

    #[test]
    fn test_open_counts_pages() {
        let tmp = write_temp(&numbered_pages(3));
        let source = PageSource::open(tmp.path()).unwrap();
        assert_eq!(source.page_count(), 3);
        assert_eq!(source.file_size(), 3 * PAGE_SIZE as u64);
        assert_eq!(source.trailing_bytes(), 0);
    }

    #[test]
    fn test_open_missing_file() {
        let err = PageSource::open("/nonexistent/path/t.ibd").err().unwrap();
        assert!(matches!(err, InnoError::Io(_)));
    }

    #[test]
    fn test_read_page_random_access() {
        let tmp = write_temp(&numbered_pages(4));
        let source = PageSource::open(tmp.path()).unwrap();
        let frame = source.read_page(2).unwrap();
        assert_eq!(frame.page_no(), 2);
        assert_eq!(frame.file_offset(), 2 * PAGE_SIZE as u64);
        assert_eq!(page_no_of(&frame), 2);
        assert_eq!(page_no_of(&source.read_page(0).unwrap()), 0);
    }

    #[test]
    fn test_read_page_out_of_range() {
        let source = PageSource::from_bytes(numbered_pages(1));
        assert!(matches!(
            source.read_page(99),
            Err(InnoError::Argument(_))
        ));
    }

    #[test]
    fn test_frames_in_order() {
        let source = PageSource::from_bytes(numbered_pages(3));
        let seen: Vec<u32> = source
            .frames(0)
            .map(|f| page_no_of(&f.unwrap()))
            .collect();
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_frames_restart_from_page() {
        let tmp = write_temp(&numbered_pages(5));
        let source = PageSource::open(tmp.path()).unwrap();
        let seen: Vec<u64> = source.frames(3).map(|f| f.unwrap().page_no()).collect();
        assert_eq!(seen, vec![3, 4]);
        assert_eq!(source.frames(5).count(), 0);
    }

    #[test]
    fn test_trailing_partial_page_is_io_error() {
        let mut data = numbered_pages(2);
        data.extend_from_slice(&[0u8; 100]);
        let source = PageSource::from_reader(Box::new(Cursor::new(data)), 2 * PAGE_SIZE as u64 + 100);
        assert_eq!(source.trailing_bytes(), 100);

        let results: Vec<_> = source.frames(0).collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(matches!(results[2], Err(InnoError::Io(_))));
        assert!(matches!(source.read_page(2), Err(InnoError::Io(_))));
    }

    #[test]
    fn test_empty_source() {
        let source = PageSource::from_bytes(Vec::new());
        assert_eq!(source.page_count(), 0);
        assert_eq!(source.frames(0).count(), 0);
    }

    #[test]
    fn test_concurrent_reads_share_source() {
        let tmp = write_temp(&numbered_pages(8));
        let source = PageSource::open(tmp.path()).unwrap();
        std::thread::scope(|s| {
            for n in 0..8u64 {
                let source = &source;
                s.spawn(move || {
                    let frame = source.read_page(n).unwrap();
                    assert_eq!(page_no_of(&frame) as u64, n);
                });
            }
        });
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_mmap_matches_buffered() {
        let tmp = write_temp(&numbered_pages(3));
        let mapped = PageSource::open_mmap(tmp.path()).unwrap();
        let buffered = PageSource::open(tmp.path()).unwrap();
        assert_eq!(mapped.page_count(), 3);
        for n in 0..3 {
            assert_eq!(mapped.read_page(n).unwrap(), buffered.read_page(n).unwrap());
        }
    }
}
