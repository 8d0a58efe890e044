//! Fixed on-disk structure layouts.
//!
//! Every structure this crate decodes has a fixed serialized size. Each one
//! implements [`OnDisk`], which pairs a declared size with a decoder that
//! reads through a [`ByteCursor`]. [`verify_layouts`] runs every registered
//! decoder over a scratch buffer, measures how many bytes it actually
//! consumed, and compares the result against the constant from
//! [`constants`](crate::innodb::constants). A disagreement means the decoder
//! and the format definition have drifted apart, so callers should run it
//! once at startup and refuse to continue on error.
//!
//! All multi-byte integers go through `byteorder::BigEndian`; InnoDB is
//! big-endian on disk regardless of host byte order.

use byteorder::{BigEndian, ByteOrder};

use crate::innodb::constants::*;
use crate::innodb::flst::{FileAddress, ListBaseNode, ListNode};
use crate::innodb::fsp::{FspHeader, XdesEntry};
use crate::innodb::index::{FsegHeader, IndexHeader, RecordHeader, SystemRecord};
use crate::innodb::inode::InodeEntry;
use crate::innodb::page::{FilHeader, FilTrailer};
use crate::InnoError;

/// A forward-only big-endian reader over a byte slice.
///
/// Reads return `None` once the slice is exhausted; the position is left
/// unchanged by a failed read.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, pos: 0 }
    }

    /// Create a cursor positioned at `pos` within `data`.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        ByteCursor { data, pos }
    }

    /// Current byte position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the position and the end of the slice.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Move to an absolute position.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    pub fn read_u16(&mut self) -> Option<u16> {
        self.take(2).map(BigEndian::read_u16)
    }

    pub fn read_u32(&mut self) -> Option<u32> {
        self.take(4).map(BigEndian::read_u32)
    }

    pub fn read_u64(&mut self) -> Option<u64> {
        self.take(8).map(BigEndian::read_u64)
    }

    /// Read a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Some(out)
    }

    /// Decode one fixed-size structure.
    pub fn read<T: OnDisk>(&mut self) -> Option<T> {
        T::read_from(self)
    }
}

/// A structure with a fixed serialized size.
pub trait OnDisk: Sized {
    /// Structure name used in error reports.
    const NAME: &'static str;
    /// Serialized size in bytes; also the stride of arrays of this structure.
    const SIZE: usize;

    /// Decode from the cursor's position, advancing it past the structure.
    fn read_from(cursor: &mut ByteCursor<'_>) -> Option<Self>;

    /// Decode from the start of a byte slice.
    fn parse(data: &[u8]) -> Option<Self> {
        Self::read_from(&mut ByteCursor::new(data))
    }
}

/// Measured size of one registered structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutCheck {
    pub structure: &'static str,
    /// Bytes the decoder consumed.
    pub actual: usize,
    /// Declared `OnDisk::SIZE`.
    pub declared: usize,
    /// Size from the format definition.
    pub expected: usize,
}

impl LayoutCheck {
    pub fn is_ok(&self) -> bool {
        self.actual == self.expected && self.declared == self.expected
    }
}

const SCRATCH_SIZE: usize = 1024;

/// Number of bytes `T`'s decoder consumes.
///
/// Returns `None` if the decoder cannot complete within the scratch buffer.
pub fn encoded_len<T: OnDisk>() -> Option<usize> {
    let scratch = [0u8; SCRATCH_SIZE];
    let mut cursor = ByteCursor::new(&scratch);
    T::read_from(&mut cursor).map(|_| cursor.position())
}

fn check<T: OnDisk>(expected: usize) -> LayoutCheck {
    LayoutCheck {
        structure: T::NAME,
        actual: encoded_len::<T>().unwrap_or(SCRATCH_SIZE + 1),
        declared: T::SIZE,
        expected,
    }
}

fn region(structure: &'static str, actual: usize, expected: usize) -> LayoutCheck {
    LayoutCheck {
        structure,
        actual,
        declared: expected,
        expected,
    }
}

/// Measure every registered structure against its format constant.
pub fn layout_catalog() -> Vec<LayoutCheck> {
    vec![
        check::<FileAddress>(FIL_ADDR_SIZE),
        check::<ListNode>(FLST_NODE_SIZE),
        check::<ListBaseNode>(FLST_BASE_NODE_SIZE),
        check::<FilHeader>(SIZE_FIL_HEAD),
        check::<FilTrailer>(SIZE_FIL_TRAILER),
        check::<FspHeader>(FSP_HEADER_SIZE),
        check::<XdesEntry>(XDES_SIZE),
        check::<InodeEntry>(FSEG_INODE_SIZE),
        check::<IndexHeader>(INDEX_HEADER_SIZE),
        check::<FsegHeader>(FSEG_HEADER_SIZE),
        check::<RecordHeader>(REC_HEADER_SIZE),
        check::<SystemRecord>(SYSTEM_RECORD_SIZE),
        // Composite regions: each must land where the next structure begins.
        region(
            "index page header",
            IndexHeader::SIZE + 2 * FsegHeader::SIZE,
            PAGE_HEADER_SIZE,
        ),
        region(
            "system records origin",
            FIL_PAGE_DATA + IndexHeader::SIZE + 2 * FsegHeader::SIZE,
            PAGE_DATA_OFFSET,
        ),
        region(
            "extent descriptor array origin",
            FIL_PAGE_DATA + FspHeader::SIZE,
            XDES_ARR_OFFSET,
        ),
        region(
            "segment inode array origin",
            FIL_PAGE_DATA + ListNode::SIZE,
            FSEG_ARR_OFFSET,
        ),
    ]
}

/// Verify every structure layout, failing on the first disagreement.
///
/// # Examples
///
/// ```
/// innoread::innodb::layout::verify_layouts().expect("layouts match the format");
/// ```
pub fn verify_layouts() -> Result<(), InnoError> {
    for entry in layout_catalog() {
        if !entry.is_ok() {
            let actual = if entry.actual != entry.expected {
                entry.actual
            } else {
                entry.declared
            };
            return Err(InnoError::Layout {
                structure: entry.structure,
                actual,
                expected: entry.expected,
            });
        }
    }
    // The fixed arrays must fit between the header area and the trailer.
    let xdes_end = XDES_ARR_OFFSET + XDES_PER_PAGE * XdesEntry::SIZE;
    if xdes_end > PAGE_DIR {
        return Err(InnoError::Layout {
            structure: "extent descriptor array",
            actual: xdes_end,
            expected: PAGE_DIR,
        });
    }
    let inode_end = FSEG_ARR_OFFSET + FSP_SEG_INODES_PER_PAGE * InodeEntry::SIZE;
    if inode_end > PAGE_DIR {
        return Err(InnoError::Layout {
            structure: "segment inode array",
            actual: inode_end,
            expected: PAGE_DIR,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Oversized;

    impl OnDisk for Oversized {
        const NAME: &'static str = "oversized";
        const SIZE: usize = 4;

        fn read_from(cursor: &mut ByteCursor<'_>) -> Option<Self> {
            cursor.read_u32()?;
            cursor.read_u16()?;
            Some(Oversized)
        }
    }

    #[test]
    fn test_all_layouts_match() {
        for entry in layout_catalog() {
            assert!(entry.is_ok(), "layout drift: {:?}", entry);
        }
        assert!(verify_layouts().is_ok());
    }

    #[test]
    fn test_drifted_layout_detected() {
        let entry = check::<Oversized>(4);
        assert_eq!(entry.actual, 6);
        assert!(!entry.is_ok());
    }

    #[test]
    fn test_cursor_reads_big_endian() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0, 0x01];
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_u16(), Some(0x1234));
        assert_eq!(c.read_u8(), Some(0x56));
        assert_eq!(c.position(), 3);
        c.seek(0);
        assert_eq!(c.read_u64(), Some(0x123456789ABCDEF0));
        assert_eq!(c.remaining(), 1);
    }

    #[test]
    fn test_cursor_short_read_keeps_position() {
        let data = [0u8; 3];
        let mut c = ByteCursor::at(&data, 1);
        assert_eq!(c.read_u32(), None);
        assert_eq!(c.position(), 1);
        assert_eq!(c.read_array::<2>(), Some([0, 0]));
        assert_eq!(c.read_u8(), None);
    }

    #[test]
    fn test_cursor_past_end() {
        let data = [0u8; 4];
        let mut c = ByteCursor::at(&data, 10);
        assert_eq!(c.remaining(), 0);
        assert_eq!(c.read_u8(), None);
    }
}
