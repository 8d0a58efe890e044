//! File segment inode page parsing.
//!
//! INODE pages (page type 3) hold the bookkeeping for file segments. The
//! body starts with a 12-byte list node linking the page into the space's
//! SEG_INODES_FULL or SEG_INODES_FREE list, followed by 85 fixed 192-byte
//! [`InodeEntry`] slots. Each slot is independent: a zeroed slot is simply
//! unused, and a slot with a bad magic number is flagged without affecting
//! its neighbours.

use serde::Serialize;

use crate::innodb::constants::*;
use crate::innodb::flst::{ListBaseNode, ListNode};
use crate::innodb::layout::{ByteCursor, OnDisk};
use crate::InnoError;

/// One segment inode (192 bytes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InodeEntry {
    /// Segment id; 0 marks an unused slot.
    pub seg_id: u64,
    /// Number of used pages in the segment's NOT_FULL extent list.
    pub not_full_n_used: u32,
    /// Extents owned by the segment with every page free.
    pub free: ListBaseNode,
    /// Extents owned by the segment with some pages used.
    pub not_full: ListBaseNode,
    /// Extents owned by the segment with every page used.
    pub full: ListBaseNode,
    /// Should equal `FSEG_MAGIC_N_VALUE` on a used slot.
    pub magic_n: u32,
    /// Individually allocated fragment pages; FIL_NULL if the slot is empty.
    pub frag_arr: [u32; FSEG_FRAG_ARR_N_SLOTS],
}

impl InodeEntry {
    pub fn is_used(&self) -> bool {
        self.seg_id != 0
    }

    pub fn has_valid_magic(&self) -> bool {
        self.magic_n == FSEG_MAGIC_N_VALUE
    }

    /// Fragment page numbers currently assigned to the segment.
    pub fn used_fragment_pages(&self) -> Vec<u32> {
        self.frag_arr
            .iter()
            .copied()
            .filter(|&p| p != FIL_NULL)
            .collect()
    }
}

impl OnDisk for InodeEntry {
    const NAME: &'static str = "FSEG_INODE";
    const SIZE: usize = FSEG_INODE_SIZE;

    fn read_from(cursor: &mut ByteCursor<'_>) -> Option<Self> {
        let seg_id = cursor.read_u64()?;
        let not_full_n_used = cursor.read_u32()?;
        let free = cursor.read()?;
        let not_full = cursor.read()?;
        let full = cursor.read()?;
        let magic_n = cursor.read_u32()?;
        let mut frag_arr = [FIL_NULL; FSEG_FRAG_ARR_N_SLOTS];
        for slot in frag_arr.iter_mut() {
            *slot = cursor.read_u32()?;
        }
        Some(InodeEntry {
            seg_id,
            not_full_n_used,
            free,
            not_full,
            full,
            magic_n,
            frag_arr,
        })
    }
}

/// Classification of one inode slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "entry", rename_all = "snake_case")]
pub enum InodeSlot {
    /// Used slot with the expected magic number.
    Valid(InodeEntry),
    /// Segment id 0; the slot has never been assigned or was freed.
    Unused(InodeEntry),
    /// Used slot whose magic number is wrong.
    Suspect(InodeEntry),
    /// The buffer ended before this slot.
    Truncated,
}

impl InodeSlot {
    /// The decoded entry, if the slot could be read at all.
    pub fn entry(&self) -> Option<&InodeEntry> {
        match self {
            InodeSlot::Valid(e) | InodeSlot::Unused(e) | InodeSlot::Suspect(e) => Some(e),
            InodeSlot::Truncated => None,
        }
    }
}

/// Decoded body of an INODE page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InodePage {
    /// Link in SEG_INODES_FULL / SEG_INODES_FREE.
    pub node: ListNode,
    /// Exactly `FSP_SEG_INODES_PER_PAGE` slots.
    pub slots: Vec<InodeSlot>,
}

impl InodePage {
    /// Decode the list node and every inode slot.
    ///
    /// Each suspect slot pushes a [`InnoError::MagicMismatch`] and each
    /// unreadable slot a [`InnoError::ShortArray`] to `issues`; decoding
    /// always continues with the next slot. Fails only if the leading list
    /// node itself does not fit.
    pub fn decode(page_data: &[u8], issues: &mut Vec<InnoError>) -> Result<Self, InnoError> {
        let bounded = &page_data[..page_data.len().min(PAGE_DIR)];
        let node = ListNode::read_from(&mut ByteCursor::at(bounded, FSEG_INODE_PAGE_NODE))
            .ok_or_else(|| {
                InnoError::Parse(format!(
                    "Inode page list node needs {} bytes at offset {}, page has {}",
                    FLST_NODE_SIZE,
                    FSEG_INODE_PAGE_NODE,
                    page_data.len()
                ))
            })?;

        let mut slots = Vec::with_capacity(FSP_SEG_INODES_PER_PAGE);
        for i in 0..FSP_SEG_INODES_PER_PAGE {
            let offset = FSEG_ARR_OFFSET + i * InodeEntry::SIZE;
            let slot = match InodeEntry::read_from(&mut ByteCursor::at(bounded, offset)) {
                None => {
                    issues.push(InnoError::ShortArray {
                        structure: InodeEntry::NAME,
                        decoded: i,
                        expected: FSP_SEG_INODES_PER_PAGE,
                    });
                    InodeSlot::Truncated
                }
                Some(entry) if !entry.is_used() => InodeSlot::Unused(entry),
                Some(entry) if entry.has_valid_magic() => InodeSlot::Valid(entry),
                Some(entry) => {
                    issues.push(InnoError::MagicMismatch {
                        slot: i,
                        found: entry.magic_n,
                    });
                    InodeSlot::Suspect(entry)
                }
            };
            slots.push(slot);
        }

        Ok(InodePage { node, slots })
    }

    /// Slots holding a live segment with a valid magic number.
    pub fn valid_entries(&self) -> impl Iterator<Item = (usize, &InodeEntry)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| match s {
            InodeSlot::Valid(e) => Some((i, e)),
            _ => None,
        })
    }

    pub fn suspect_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, InodeSlot::Suspect(_)))
            .count()
    }
}
