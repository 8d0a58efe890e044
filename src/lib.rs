//! Read-only InnoDB tablespace page decoder.
//!
//! The `innodb-reader` crate (library name `innoread`) classifies every
//! 16 KiB page of an InnoDB tablespace file (`.ibd`) by its page type and
//! decodes the header, trailer, and type-specific body into typed,
//! validated structures. It never writes to the tablespace.
//!
//! # CLI
//!
//! The `innoread` binary (feature `cli`, on by default) decodes a whole file
//! or a single page and prints the result as text or JSON:
//!
//! ```text
//! innoread --path table.ibd
//! innoread --path table.ibd --page 3 --json
//! innoread --path ibdata1 --threads 4 --mmap
//! ```
//!
//! # Library API
//!
//! ```no_run
//! use innoread::innodb::scan::{decode_page, PageOutcome};
//! use innoread::innodb::tablespace::PageSource;
//!
//! innoread::innodb::layout::verify_layouts().unwrap();
//!
//! let source = PageSource::open("table.ibd").unwrap();
//! let frame = source.read_page(0).unwrap();
//! match decode_page(&frame) {
//!     PageOutcome::Decoded(page) => println!("page 0 is {}", page.header.page_type),
//!     PageOutcome::Aborted { reason, .. } => println!("page 0 unreadable: {}", reason),
//! }
//! ```
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`innodb::layout`] | Fixed structure sizes, startup verification, big-endian cursor |
//! | [`innodb::tablespace`] | Page frame source (file, mmap, memory) |
//! | [`innodb::page`] | FIL header/trailer and LSN cross-check |
//! | [`innodb::flst`] | File addresses and list nodes |
//! | [`innodb::fsp`] | Space header and extent descriptors |
//! | [`innodb::inode`] | Segment inode pages |
//! | [`innodb::index`] | B+Tree index page structure |
//! | [`innodb::scan`] | Page-type dispatch and scan drivers |
//! | [`innodb::checksum`] | CRC-32C and legacy InnoDB checksum classification |

#[cfg(feature = "cli")]
pub mod cli;
pub mod innodb;
#[cfg(feature = "cli")]
pub mod util;

use serde::Serialize;
use thiserror::Error;

/// Errors returned by `innoread` operations.
///
/// `Io` and `Layout` are fatal to a scan or to startup; every other variant
/// is scoped to a single page (or a single entry within a page) and is
/// reported alongside that page's decode outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum InnoError {
    /// The byte source could not supply a full page frame.
    #[error("I/O error: {0}")]
    Io(String),

    /// A structure's encoded size disagrees with its on-disk definition.
    #[error("Layout error: {structure} encodes to {actual} bytes, expected {expected}")]
    Layout {
        structure: &'static str,
        actual: usize,
        expected: usize,
    },

    /// Header LSN and trailer LSN disagree; the page body is unreliable.
    #[error(
        "Corrupt page {page}: header LSN low 32 bits 0x{header_lsn_low32:08x} != trailer 0x{trailer_lsn_low32:08x}"
    )]
    Corruption {
        page: u64,
        header_lsn_low32: u32,
        trailer_lsn_low32: u32,
    },

    /// A fixed-count array ran out of bytes partway through.
    #[error("Short array: decoded {decoded} of {expected} {structure} entries")]
    ShortArray {
        structure: &'static str,
        decoded: usize,
        expected: usize,
    },

    /// A segment inode slot carries the wrong magic number.
    #[error("Inode slot {slot}: magic number {found} does not match FSEG_MAGIC_N_VALUE")]
    MagicMismatch { slot: usize, found: u32 },

    /// The index page directory would overlap the record heap.
    #[error("Page directory at {dir_start} ({slots} slots) overlaps heap top {heap_top}")]
    DirectoryOverlap {
        slots: u16,
        dir_start: usize,
        heap_top: u16,
    },

    /// Malformed binary data or unexpected values.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An invalid argument was supplied (out-of-range page number, bad option, etc.).
    #[error("Invalid argument: {0}")]
    Argument(String),
}

impl InnoError {
    /// Returns true if this error must stop a scan rather than a single page.
    pub fn is_fatal(&self) -> bool {
        matches!(self, InnoError::Io(_) | InnoError::Layout { .. })
    }
}
