//! File-based list primitives.
//!
//! InnoDB threads extents, inode pages and segment extents together with
//! doubly linked lists stored directly in page bytes. A [`ListBaseNode`]
//! (16 bytes) holds the length and the first/last member; each member embeds
//! a [`ListNode`] (12 bytes) with prev/next links. Both use 6-byte
//! [`FileAddress`] values, where a page number of `FIL_NULL` means "no
//! address".

use serde::Serialize;
use std::fmt;

use crate::innodb::constants::*;
use crate::innodb::layout::{ByteCursor, OnDisk};

/// A (page number, byte offset) pair referencing a spot in the tablespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileAddress {
    pub page_no: u32,
    pub offset: u16,
}

impl FileAddress {
    /// The null address (`FIL_NULL`, offset 0).
    pub const NULL: FileAddress = FileAddress {
        page_no: FIL_NULL,
        offset: 0,
    };

    /// Returns true if this address is the `FIL_NULL` sentinel.
    pub fn is_null(&self) -> bool {
        self.page_no == FIL_NULL
    }
}

impl OnDisk for FileAddress {
    const NAME: &'static str = "FIL_ADDR";
    const SIZE: usize = FIL_ADDR_SIZE;

    fn read_from(cursor: &mut ByteCursor<'_>) -> Option<Self> {
        Some(FileAddress {
            page_no: cursor.read_u32()?,
            offset: cursor.read_u16()?,
        })
    }
}

impl fmt::Display for FileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "NULL")
        } else {
            write!(f, "{}:{}", self.page_no, self.offset)
        }
    }
}

/// List node embedded in a list member (12 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListNode {
    pub prev: FileAddress,
    pub next: FileAddress,
}

impl ListNode {
    /// Returns true if neither link points anywhere.
    pub fn is_unlinked(&self) -> bool {
        self.prev.is_null() && self.next.is_null()
    }
}

impl OnDisk for ListNode {
    const NAME: &'static str = "FLST_NODE";
    const SIZE: usize = FLST_NODE_SIZE;

    fn read_from(cursor: &mut ByteCursor<'_>) -> Option<Self> {
        Some(ListNode {
            prev: cursor.read()?,
            next: cursor.read()?,
        })
    }
}

/// List base node, the head of a file-based list (16 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListBaseNode {
    pub len: u32,
    pub first: FileAddress,
    pub last: FileAddress,
}

impl ListBaseNode {
    /// Returns true if the list has no members.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl OnDisk for ListBaseNode {
    const NAME: &'static str = "FLST_BASE_NODE";
    const SIZE: usize = FLST_BASE_NODE_SIZE;

    fn read_from(cursor: &mut ByteCursor<'_>) -> Option<Self> {
        Some(ListBaseNode {
            len: cursor.read_u32()?,
            first: cursor.read()?,
            last: cursor.read()?,
        })
    }
}

impl fmt::Display for ListBaseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "len={} first={} last={}", self.len, self.first, self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, ByteOrder};

    #[test]
    fn test_file_address_null() {
        let mut data = vec![0u8; 6];
        BigEndian::write_u32(&mut data[0..], FIL_NULL);
        let addr = FileAddress::parse(&data).unwrap();
        assert!(addr.is_null());
        assert_eq!(addr, FileAddress::NULL);
        assert_eq!(addr.to_string(), "NULL");
    }

    #[test]
    fn test_file_address_linked() {
        let mut data = vec![0u8; 6];
        BigEndian::write_u32(&mut data[0..], 7);
        BigEndian::write_u16(&mut data[4..], 150);
        let addr = FileAddress::parse(&data).unwrap();
        assert!(!addr.is_null());
        assert_eq!(addr.to_string(), "7:150");
    }

    #[test]
    fn test_list_base_node_parse() {
        let mut data = vec![0u8; FLST_BASE_NODE_SIZE];
        BigEndian::write_u32(&mut data[0..], 3);
        BigEndian::write_u32(&mut data[4..], 0);
        BigEndian::write_u16(&mut data[8..], 158);
        BigEndian::write_u32(&mut data[10..], 2);
        BigEndian::write_u16(&mut data[14..], 238);
        let base = ListBaseNode::parse(&data).unwrap();
        assert_eq!(base.len, 3);
        assert_eq!(base.first, FileAddress { page_no: 0, offset: 158 });
        assert_eq!(base.last, FileAddress { page_no: 2, offset: 238 });
        assert!(!base.is_empty());
    }

    #[test]
    fn test_list_node_unlinked() {
        let mut data = vec![0u8; FLST_NODE_SIZE];
        BigEndian::write_u32(&mut data[0..], FIL_NULL);
        BigEndian::write_u32(&mut data[6..], FIL_NULL);
        let node = ListNode::parse(&data).unwrap();
        assert!(node.is_unlinked());
    }

    #[test]
    fn test_list_node_too_short() {
        assert!(ListNode::parse(&[0u8; 11]).is_none());
    }
}
