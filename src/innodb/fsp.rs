//! File space header and extent descriptor parsing.
//!
//! Page 0 of every tablespace (type `FSP_HDR`) starts its body with the
//! 112-byte [`FspHeader`]: size counters, the free limit, space flags, and
//! the base nodes of the five space-level lists. At byte 150 follows an
//! array of 256 [`XdesEntry`] extent descriptors, each tracking 64 pages
//! with a 2-bit-per-page bitmap. `XDES` pages (type 9), which repeat every
//! 16384 pages in large tablespaces, carry the same array at the same
//! offset with an unused header area.

use serde::Serialize;
use std::fmt;

use crate::innodb::constants::*;
use crate::innodb::flst::{ListBaseNode, ListNode};
use crate::innodb::layout::{ByteCursor, OnDisk};
use crate::InnoError;

/// Parsed FSP header (from page 0 of a tablespace, starts at FIL_PAGE_DATA).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FspHeader {
    /// Space ID.
    pub space_id: u32,
    /// Unused field, kept for fidelity.
    pub not_used: u32,
    /// Size of the tablespace in pages.
    pub size: u32,
    /// Minimum page number not yet initialized.
    pub free_limit: u32,
    /// Space flags (contains page size, compression, encryption info).
    pub flags: u32,
    /// Number of used pages in the FSP_FREE_FRAG list.
    pub frag_n_used: u32,
    /// Extents with every page free.
    pub free: ListBaseNode,
    /// Extents with some pages free, used for fragment pages.
    pub free_frag: ListBaseNode,
    /// Extents with no free pages, used for fragment pages.
    pub full_frag: ListBaseNode,
    /// Next unused segment id.
    pub seg_id: u64,
    /// Inode pages with no free slots.
    pub seg_inodes_full: ListBaseNode,
    /// Inode pages with at least one free slot.
    pub seg_inodes_free: ListBaseNode,
}

impl FspHeader {
    /// Parse the FSP header from a full page buffer.
    pub fn parse_page(page_data: &[u8]) -> Option<Self> {
        Self::read_from(&mut ByteCursor::at(page_data, FIL_PAGE_DATA))
    }

    /// Extract the page size from FSP flags.
    ///
    /// An ssize of 0 means the default 16K; otherwise the page size is
    /// `1 << (ssize + 9)` (ssize=3 => 4K, ssize=5 => 16K, ssize=7 => 64K).
    pub fn page_size_from_flags(&self) -> u32 {
        let ssize = (self.flags & FSP_FLAGS_MASK_PAGE_SSIZE) >> FSP_FLAGS_POS_PAGE_SSIZE;
        if ssize == 0 {
            SIZE_PAGE_DEFAULT
        } else {
            1u32 << (ssize + 9)
        }
    }
}

impl OnDisk for FspHeader {
    const NAME: &'static str = "FSP_HEADER";
    const SIZE: usize = FSP_HEADER_SIZE;

    fn read_from(cursor: &mut ByteCursor<'_>) -> Option<Self> {
        Some(FspHeader {
            space_id: cursor.read_u32()?,
            not_used: cursor.read_u32()?,
            size: cursor.read_u32()?,
            free_limit: cursor.read_u32()?,
            flags: cursor.read_u32()?,
            frag_n_used: cursor.read_u32()?,
            free: cursor.read()?,
            free_frag: cursor.read()?,
            full_frag: cursor.read()?,
            seg_id: cursor.read_u64()?,
            seg_inodes_full: cursor.read()?,
            seg_inodes_free: cursor.read()?,
        })
    }
}

/// State of an extent, from its descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum XdesState {
    /// Descriptor never initialized (state 0).
    NotInitialized,
    /// Extent is in the space FREE list.
    Free,
    /// Extent is in FREE_FRAG, some pages used as fragments.
    FreeFrag,
    /// Extent is in FULL_FRAG, all pages used as fragments.
    FullFrag,
    /// Extent belongs to a segment.
    Fseg,
    /// Extent belongs to a segment and holds fragment pages.
    FsegFrag,
    /// Any other value.
    Other(u32),
}

impl XdesState {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => XdesState::NotInitialized,
            XDES_FREE => XdesState::Free,
            XDES_FREE_FRAG => XdesState::FreeFrag,
            XDES_FULL_FRAG => XdesState::FullFrag,
            XDES_FSEG => XdesState::Fseg,
            XDES_FSEG_FRAG => XdesState::FsegFrag,
            other => XdesState::Other(other),
        }
    }
}

impl fmt::Display for XdesState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XdesState::NotInitialized => write!(f, "NOT_INITED"),
            XdesState::Free => write!(f, "FREE"),
            XdesState::FreeFrag => write!(f, "FREE_FRAG"),
            XdesState::FullFrag => write!(f, "FULL_FRAG"),
            XdesState::Fseg => write!(f, "FSEG"),
            XdesState::FsegFrag => write!(f, "FSEG_FRAG"),
            XdesState::Other(v) => write!(f, "UNKNOWN({})", v),
        }
    }
}

/// Extent descriptor (40 bytes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XdesEntry {
    /// Id of the segment owning the extent (0 if none).
    pub seg_id: u64,
    /// Link in whichever list the extent currently belongs to.
    pub node: ListNode,
    /// Raw state value; see [`XdesEntry::state`].
    pub state_raw: u32,
    /// Two bits per page: bit 0 = free, bit 1 = clean.
    pub bitmap: [u8; XDES_BITMAP_SIZE],
}

impl XdesEntry {
    pub fn state(&self) -> XdesState {
        XdesState::from_u32(self.state_raw)
    }

    fn bit(&self, page: usize, bit: usize) -> bool {
        if page >= FSP_EXTENT_SIZE {
            return false;
        }
        let index = page * XDES_BITS_PER_PAGE + bit;
        self.bitmap
            .get(index / 8)
            .is_some_and(|byte| (byte >> (index % 8)) & 1 == 1)
    }

    /// Returns true if page `page` (0..64) of the extent is free.
    /// Pages outside the extent are never free.
    pub fn is_page_free(&self, page: usize) -> bool {
        self.bit(page, XDES_FREE_BIT)
    }

    /// Returns true if page `page` (0..64) of the extent is clean.
    pub fn is_page_clean(&self, page: usize) -> bool {
        self.bit(page, XDES_CLEAN_BIT)
    }

    /// Number of free pages in the extent.
    pub fn free_page_count(&self) -> usize {
        (0..FSP_EXTENT_SIZE).filter(|&p| self.is_page_free(p)).count()
    }
}

impl OnDisk for XdesEntry {
    const NAME: &'static str = "XDES_ENTRY";
    const SIZE: usize = XDES_SIZE;

    fn read_from(cursor: &mut ByteCursor<'_>) -> Option<Self> {
        Some(XdesEntry {
            seg_id: cursor.read_u64()?,
            node: cursor.read()?,
            state_raw: cursor.read_u32()?,
            bitmap: cursor.read_array()?,
        })
    }
}

/// First page number covered by descriptor `index` on the descriptor page
/// `descriptor_page`.
pub fn extent_first_page(descriptor_page: u32, index: usize) -> u64 {
    descriptor_page as u64 + (index * FSP_EXTENT_SIZE) as u64
}

/// Decode the extent descriptor array of an FSP_HDR or XDES page.
///
/// Reads up to [`XDES_PER_PAGE`] entries from byte 150, never past the
/// trailer. If the buffer runs out first, the whole entries decoded so far
/// are returned and a [`InnoError::ShortArray`] is pushed to `issues`.
pub fn read_extent_array(page_data: &[u8], issues: &mut Vec<InnoError>) -> Vec<XdesEntry> {
    let bounded = &page_data[..page_data.len().min(PAGE_DIR)];
    let mut cursor = ByteCursor::at(bounded, XDES_ARR_OFFSET);
    let mut extents = Vec::with_capacity(XDES_PER_PAGE);
    for _ in 0..XDES_PER_PAGE {
        match cursor.read::<XdesEntry>() {
            Some(entry) => extents.push(entry),
            None => {
                issues.push(InnoError::ShortArray {
                    structure: XdesEntry::NAME,
                    decoded: extents.len(),
                    expected: XDES_PER_PAGE,
                });
                break;
            }
        }
    }
    extents
}

/// Decoded body of an FSP_HDR page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceHeaderPage {
    pub header: FspHeader,
    pub extents: Vec<XdesEntry>,
}

impl SpaceHeaderPage {
    /// Decode the FSP header and extent array of a page.
    ///
    /// Fails only if the FSP header itself does not fit; a truncated extent
    /// array is reported through `issues`.
    pub fn decode(page_data: &[u8], issues: &mut Vec<InnoError>) -> Result<Self, InnoError> {
        let header = FspHeader::parse_page(page_data).ok_or_else(|| {
            InnoError::Parse(format!(
                "FSP header needs {} bytes at offset {}, page has {}",
                FSP_HEADER_SIZE,
                FIL_PAGE_DATA,
                page_data.len()
            ))
        })?;
        let extents = read_extent_array(page_data, issues);
        Ok(SpaceHeaderPage { header, extents })
    }
}

/// Decoded body of an XDES page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XdesPage {
    pub extents: Vec<XdesEntry>,
}

impl XdesPage {
    pub fn decode(page_data: &[u8], issues: &mut Vec<InnoError>) -> Self {
        XdesPage {
            extents: read_extent_array(page_data, issues),
        }
    }
}
