//! INDEX page internal structure parsing.
//!
//! INDEX pages (page type 17855 / `FIL_PAGE_INDEX`) are the B+Tree nodes that
//! store table data and secondary index entries; SDI pages (17853) share the
//! same layout. Each page contains a 36-byte [`IndexHeader`] at
//! `FIL_PAGE_DATA` (byte 38), followed by two 10-byte FSEG inode pointers
//! ([`FsegHeader`]) for the leaf and non-leaf segments, the infimum and
//! supremum [`SystemRecord`]s, and, at the very end of the page just before
//! the FIL trailer, the page directory: one 2-byte slot per group of records,
//! growing backward.
//!
//! [`IndexPage::decode`] reads all of it; the record heap in between is out
//! of scope.

use serde::Serialize;
use std::fmt;

use crate::innodb::constants::*;
use crate::innodb::layout::{ByteCursor, OnDisk};
use crate::InnoError;

/// Row format of the records on an index page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PageFormat {
    /// Legacy format (PAGE_N_HEAP bit 15 clear).
    Redundant,
    /// Compact format (PAGE_N_HEAP bit 15 set).
    Compact,
}

impl fmt::Display for PageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageFormat::Redundant => write!(f, "REDUNDANT"),
            PageFormat::Compact => write!(f, "COMPACT"),
        }
    }
}

/// Direction of the most recent inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InsertDirection {
    Left,
    Right,
    SameRec,
    SamePage,
    NoDirection,
    Other(u16),
}

impl InsertDirection {
    pub fn from_u16(value: u16) -> Self {
        match value {
            PAGE_LEFT => InsertDirection::Left,
            PAGE_RIGHT => InsertDirection::Right,
            PAGE_SAME_REC => InsertDirection::SameRec,
            PAGE_SAME_PAGE => InsertDirection::SamePage,
            PAGE_NO_DIRECTION => InsertDirection::NoDirection,
            other => InsertDirection::Other(other),
        }
    }
}

impl fmt::Display for InsertDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertDirection::Left => write!(f, "Left"),
            InsertDirection::Right => write!(f, "Right"),
            InsertDirection::SameRec => write!(f, "Same Record"),
            InsertDirection::SamePage => write!(f, "Same Page"),
            InsertDirection::NoDirection => write!(f, "No Direction"),
            InsertDirection::Other(v) => write!(f, "Unknown({})", v),
        }
    }
}

/// Parsed INDEX page header (36 bytes, at FIL_PAGE_DATA offset within an INDEX page).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexHeader {
    /// Number of directory slots in the page directory.
    pub n_dir_slots: u16,
    /// Pointer to record heap top.
    pub heap_top: u16,
    /// Number of records in the heap. Bit 15 is the compact format flag.
    pub n_heap_raw: u16,
    /// Pointer to start of free record list (0 if none).
    pub free: u16,
    /// Number of bytes in deleted records (garbage).
    pub garbage: u16,
    /// Pointer to the last inserted record (0 if reset).
    pub last_insert: u16,
    /// Last insert direction.
    pub direction: u16,
    /// Number of consecutive inserts in the same direction.
    pub n_direction: u16,
    /// Number of user records on the page.
    pub n_recs: u16,
    /// Highest trx id that may have modified a record (secondary indexes only).
    pub max_trx_id: u64,
    /// Level in the B+Tree (0 = leaf).
    pub level: u16,
    /// Index ID where the page belongs.
    pub index_id: u64,
}

impl IndexHeader {
    /// Parse an INDEX page header from a full page buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use innoread::innodb::index::{IndexHeader, InsertDirection, PageFormat};
    /// use innoread::innodb::constants::*;
    /// use byteorder::{BigEndian, ByteOrder};
    ///
    /// let mut page = vec![0u8; 256];
    /// let base = FIL_PAGE_DATA; // byte 38
    ///
    /// BigEndian::write_u16(&mut page[base + PAGE_N_DIR_SLOTS..], 4);
    /// BigEndian::write_u16(&mut page[base + PAGE_N_HEAP..], 0x8003); // compact + 3 records
    /// BigEndian::write_u16(&mut page[base + PAGE_N_RECS..], 1);
    /// BigEndian::write_u64(&mut page[base + PAGE_INDEX_ID..], 100);
    /// BigEndian::write_u16(&mut page[base + PAGE_DIRECTION..], PAGE_RIGHT);
    ///
    /// let hdr = IndexHeader::parse_page(&page).unwrap();
    /// assert_eq!(hdr.n_dir_slots, 4);
    /// assert_eq!(hdr.page_format(), PageFormat::Compact);
    /// assert_eq!(hdr.heap_record_count(), 3);
    /// assert!(hdr.is_leaf());
    /// assert_eq!(hdr.index_id, 100);
    /// assert_eq!(hdr.insert_direction(), InsertDirection::Right);
    /// ```
    pub fn parse_page(page_data: &[u8]) -> Option<Self> {
        Self::read_from(&mut ByteCursor::at(page_data, FIL_PAGE_DATA))
    }

    /// Records in the heap, including infimum, supremum and deleted records.
    pub fn heap_record_count(&self) -> u16 {
        heap_record_count(self.n_heap_raw)
    }

    /// Row format signaled by bit 15 of PAGE_N_HEAP.
    pub fn page_format(&self) -> PageFormat {
        page_format(self.n_heap_raw)
    }

    pub fn insert_direction(&self) -> InsertDirection {
        InsertDirection::from_u16(self.direction)
    }

    /// Returns true if this is a leaf-level page.
    pub fn is_leaf(&self) -> bool {
        self.level == 0
    }
}

/// Low 15 bits of a PAGE_N_HEAP value.
pub fn heap_record_count(n_heap_raw: u16) -> u16 {
    n_heap_raw & PAGE_N_HEAP_COUNT_MASK
}

/// Format flag (bit 15) of a PAGE_N_HEAP value.
pub fn page_format(n_heap_raw: u16) -> PageFormat {
    if n_heap_raw & PAGE_N_HEAP_COMPACT_FLAG != 0 {
        PageFormat::Compact
    } else {
        PageFormat::Redundant
    }
}

impl OnDisk for IndexHeader {
    const NAME: &'static str = "INDEX_HEADER";
    const SIZE: usize = INDEX_HEADER_SIZE;

    fn read_from(cursor: &mut ByteCursor<'_>) -> Option<Self> {
        Some(IndexHeader {
            n_dir_slots: cursor.read_u16()?,
            heap_top: cursor.read_u16()?,
            n_heap_raw: cursor.read_u16()?,
            free: cursor.read_u16()?,
            garbage: cursor.read_u16()?,
            last_insert: cursor.read_u16()?,
            direction: cursor.read_u16()?,
            n_direction: cursor.read_u16()?,
            n_recs: cursor.read_u16()?,
            max_trx_id: cursor.read_u64()?,
            level: cursor.read_u16()?,
            index_id: cursor.read_u64()?,
        })
    }
}

/// FSEG (File Segment) header pointer (10 bytes each).
///
/// There are two FSEG headers per INDEX page: one for the leaf segment
/// and one for the non-leaf (internal) segment. They locate the segment's
/// inode slot and are only meaningful on the root page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FsegHeader {
    /// Space ID of the inode.
    pub space_id: u32,
    /// Page number of the inode.
    pub page_no: u32,
    /// Byte offset of the inode within the page.
    pub offset: u16,
}

impl OnDisk for FsegHeader {
    const NAME: &'static str = "FSEG_HEADER";
    const SIZE: usize = FSEG_HEADER_SIZE;

    fn read_from(cursor: &mut ByteCursor<'_>) -> Option<Self> {
        Some(FsegHeader {
            space_id: cursor.read_u32()?,
            page_no: cursor.read_u32()?,
            offset: cursor.read_u16()?,
        })
    }
}

/// Compact-format record header (5 bytes preceding the record origin).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordHeader {
    /// Info bits (high nibble) and owned-record count (low nibble).
    pub info_and_n_owned: u8,
    /// Heap number (high 13 bits) and record type (low 3 bits).
    pub heap_no_and_type: u16,
    /// Next-record pointer, relative to this record's origin.
    pub next_record: u16,
}

impl RecordHeader {
    /// Records owned by this record's directory slot.
    pub fn n_owned(&self) -> u8 {
        self.info_and_n_owned & 0x0F
    }

    pub fn info_bits(&self) -> u8 {
        self.info_and_n_owned >> 4
    }

    pub fn is_deleted(&self) -> bool {
        self.info_and_n_owned & 0x20 != 0
    }

    /// Left-most record on a non-leaf level.
    pub fn is_min_rec(&self) -> bool {
        self.info_and_n_owned & 0x10 != 0
    }

    pub fn heap_no(&self) -> u16 {
        self.heap_no_and_type >> 3
    }

    pub fn record_type(&self) -> u8 {
        (self.heap_no_and_type & 0x07) as u8
    }

    /// Returns the record type name.
    pub fn record_type_name(&self) -> &'static str {
        match self.record_type() {
            0 => "REC_STATUS_ORDINARY",
            1 => "REC_STATUS_NODE_PTR",
            2 => "REC_STATUS_INFIMUM",
            3 => "REC_STATUS_SUPREMUM",
            _ => "UNKNOWN",
        }
    }
}

impl OnDisk for RecordHeader {
    const NAME: &'static str = "RECORD_HEADER";
    const SIZE: usize = REC_HEADER_SIZE;

    fn read_from(cursor: &mut ByteCursor<'_>) -> Option<Self> {
        Some(RecordHeader {
            info_and_n_owned: cursor.read_u8()?,
            heap_no_and_type: cursor.read_u16()?,
            next_record: cursor.read_u16()?,
        })
    }
}

/// Infimum or supremum record: header plus 8 bytes of fixed data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemRecord {
    pub header: RecordHeader,
    pub data: [u8; SYSTEM_RECORD_DATA_SIZE],
}

impl SystemRecord {
    /// The data bytes as text, trailing NULs dropped.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data)
            .trim_end_matches('\0')
            .to_string()
    }
}

impl OnDisk for SystemRecord {
    const NAME: &'static str = "SYSTEM_RECORD";
    const SIZE: usize = SYSTEM_RECORD_SIZE;

    fn read_from(cursor: &mut ByteCursor<'_>) -> Option<Self> {
        Some(SystemRecord {
            header: cursor.read()?,
            data: cursor.read_array()?,
        })
    }
}

/// Decoded body of an INDEX or SDI page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexPage {
    pub header: IndexHeader,
    /// Leaf segment (PAGE_BTR_SEG_LEAF).
    pub seg_leaf: FsegHeader,
    /// Non-leaf segment (PAGE_BTR_SEG_TOP).
    pub seg_top: FsegHeader,
    pub infimum: SystemRecord,
    pub supremum: SystemRecord,
    /// Directory slots in ascending address order, starting at
    /// [`directory_offset`](Self::directory_offset). The last entry sits
    /// right before the trailer and owns the infimum.
    pub dir_slots: Vec<u16>,
}

impl IndexPage {
    /// Decode the index header, segment headers, system records and
    /// page directory of a full page.
    ///
    /// Any failure aborts the decode. On compact pages, system records
    /// without their literal "infimum"/"supremum" text are reported through
    /// `issues` but do not fail the decode.
    pub fn decode(page_data: &[u8], issues: &mut Vec<InnoError>) -> Result<Self, InnoError> {
        let mut cursor = ByteCursor::at(page_data, FIL_PAGE_DATA);
        let short = |what: &str| {
            InnoError::Parse(format!(
                "Index page too short for {} ({} bytes)",
                what,
                page_data.len()
            ))
        };

        let header: IndexHeader = cursor.read().ok_or_else(|| short("index header"))?;
        let seg_leaf: FsegHeader = cursor.read().ok_or_else(|| short("leaf segment header"))?;
        let seg_top: FsegHeader = cursor.read().ok_or_else(|| short("top segment header"))?;
        let infimum: SystemRecord = cursor.read().ok_or_else(|| short("infimum"))?;
        let supremum: SystemRecord = cursor.read().ok_or_else(|| short("supremum"))?;

        let dir_start = directory_start(header.n_dir_slots);
        let records_end = PAGE_DATA_OFFSET + 2 * SYSTEM_RECORD_SIZE;
        let dir_start = match dir_start {
            Some(start) if start >= records_end && start >= header.heap_top as usize => start,
            other => {
                return Err(InnoError::DirectoryOverlap {
                    slots: header.n_dir_slots,
                    dir_start: other.unwrap_or(0),
                    heap_top: header.heap_top,
                })
            }
        };

        let count = header.n_dir_slots as usize;
        let mut cursor = ByteCursor::at(page_data, dir_start);
        let mut dir_slots = Vec::with_capacity(count);
        for _ in 0..count {
            match cursor.read_u16() {
                Some(slot) => dir_slots.push(slot),
                None => {
                    return Err(InnoError::ShortArray {
                        structure: "PAGE_DIR_SLOT",
                        decoded: dir_slots.len(),
                        expected: count,
                    })
                }
            }
        }

        if header.page_format() == PageFormat::Compact {
            if &infimum.data != INFIMUM_TEXT {
                issues.push(InnoError::Parse(format!(
                    "Infimum record data is {:?}, expected \"infimum\"",
                    infimum.text()
                )));
            }
            if &supremum.data != SUPREMUM_TEXT {
                issues.push(InnoError::Parse(format!(
                    "Supremum record data is {:?}, expected \"supremum\"",
                    supremum.text()
                )));
            }
        }

        Ok(IndexPage {
            header,
            seg_leaf,
            seg_top,
            infimum,
            supremum,
            dir_slots,
        })
    }

    pub fn heap_record_count(&self) -> u16 {
        self.header.heap_record_count()
    }

    pub fn page_format(&self) -> PageFormat {
        self.header.page_format()
    }

    pub fn is_leaf(&self) -> bool {
        self.header.is_leaf()
    }

    pub fn direction(&self) -> InsertDirection {
        self.header.insert_direction()
    }

    /// Byte offset of the lowest directory slot.
    pub fn directory_offset(&self) -> usize {
        PAGE_DIR - PAGE_DIR_SLOT_SIZE * self.dir_slots.len()
    }
}

/// Byte offset where a directory of `n_dir_slots` slots begins, or `None`
/// if it would not fit in the page.
pub fn directory_start(n_dir_slots: u16) -> Option<usize> {
    PAGE_DIR.checked_sub(PAGE_DIR_SLOT_SIZE * n_dir_slots as usize)
}
