//! InnoDB binary format parsing.
//!
//! Types and functions for reading the on-disk structures of an InnoDB
//! tablespace: the FIL header/trailer present on every page, file list
//! primitives, the space header and extent descriptors, segment inode
//! pages, and B+Tree index pages.
//!
//! Start with [`tablespace::PageSource`] to open a `.ibd` file, then use
//! [`scan::decode_page`] or [`scan::scan`] to decode its pages.

pub mod checksum;
pub mod constants;
pub mod flst;
pub mod fsp;
pub mod index;
pub mod inode;
pub mod layout;
pub mod page;
pub mod page_types;
pub mod scan;
pub mod tablespace;
