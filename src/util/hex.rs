//! Hex and offset formatting for the text report.
//!
//! Helpers for formatting byte offsets, page pointers, raw byte runs, and
//! the two-bit-per-page extent bitmap.

use crate::innodb::constants::{FIL_NULL, FSP_EXTENT_SIZE};
use crate::innodb::fsp::XdesEntry;

/// Format a byte offset as "decimal (0xhex)".
pub fn format_offset(offset: u64) -> String {
    format!("{} (0x{:x})", offset, offset)
}

/// Format a u32 value as hex with 0x prefix.
pub fn format_hex32(value: u32) -> String {
    format!("0x{:08x}", value)
}

/// Format a u64 value as hex with 0x prefix.
pub fn format_hex64(value: u64) -> String {
    format!("0x{:016x}", value)
}

/// Format bytes as a compact hex string (e.g., "4a2f00ff").
pub fn format_bytes(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Format a page pointer, showing FIL_NULL as "NULL".
pub fn format_page_ref(page: u32) -> String {
    if page == FIL_NULL {
        "NULL".to_string()
    } else {
        page.to_string()
    }
}

/// One character per page of an extent: `.` free, `c` used and clean,
/// `#` used and dirty.
pub fn format_extent_bitmap(entry: &XdesEntry) -> String {
    (0..FSP_EXTENT_SIZE)
        .map(|i| {
            if entry.is_page_free(i) {
                '.'
            } else if entry.is_page_clean(i) {
                'c'
            } else {
                '#'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::innodb::flst::{FileAddress, ListNode};

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(&[0x4a, 0x2f, 0x00, 0xff]), "4a2f00ff");
        assert_eq!(format_bytes(&[]), "");
    }

    #[test]
    fn test_format_offset_and_hex() {
        assert_eq!(format_offset(16384), "16384 (0x4000)");
        assert_eq!(format_hex32(0xBEEF), "0x0000beef");
        assert_eq!(format_hex64(1), "0x0000000000000001");
    }

    #[test]
    fn test_format_page_ref() {
        assert_eq!(format_page_ref(FIL_NULL), "NULL");
        assert_eq!(format_page_ref(7), "7");
    }

    #[test]
    fn test_format_extent_bitmap() {
        let mut bitmap = [0u8; 16];
        // page 0: free+clean, page 1: clean only, page 2: neither
        bitmap[0] = 0b0000_1011;
        let entry = XdesEntry {
            seg_id: 0,
            node: ListNode {
                prev: FileAddress::NULL,
                next: FileAddress::NULL,
            },
            state_raw: 1,
            bitmap,
        };
        let text = format_extent_bitmap(&entry);
        assert_eq!(text.len(), FSP_EXTENT_SIZE);
        assert!(text.starts_with(".c#"));
    }
}
