//! InnoDB page type definitions.
//!
//! Maps the 2-byte page type field (bytes 24-25 of the FIL header) to a
//! [`PageType`] enum. Each variant carries its MySQL source name, a human-readable
//! description, and a usage note via the `PageType::metadata` method.
//!
//! Codes outside the known set are kept verbatim in
//! [`PageType::Unrecognized`] so a forensic report can show what was on disk.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;

/// InnoDB page types from MySQL 5.7 through 9.x.
///
/// Values are from `fil0fil.h` in MySQL source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageType {
    /// Freshly allocated, type field not initialized (FIL_PAGE_TYPE_ALLOCATED = 0)
    Allocated,
    /// Unused page type marker (FIL_PAGE_TYPE_UNUSED = 1)
    Unused,
    /// Undo log page (FIL_PAGE_UNDO_LOG = 2)
    UndoLog,
    /// File segment inode (FIL_PAGE_INODE = 3)
    Inode,
    /// Insert buffer free list (FIL_PAGE_IBUF_FREE_LIST = 4)
    IbufFreeList,
    /// Insert buffer bitmap (FIL_PAGE_IBUF_BITMAP = 5)
    IbufBitmap,
    /// System internal page (FIL_PAGE_TYPE_SYS = 6)
    Sys,
    /// Transaction system header (FIL_PAGE_TYPE_TRX_SYS = 7)
    TrxSys,
    /// File space header, page 0 of each tablespace (FIL_PAGE_TYPE_FSP_HDR = 8)
    FspHdr,
    /// Extent descriptor (FIL_PAGE_TYPE_XDES = 9)
    Xdes,
    /// Uncompressed BLOB page (FIL_PAGE_TYPE_BLOB = 10)
    Blob,
    /// First compressed BLOB page (FIL_PAGE_TYPE_ZBLOB = 11)
    ZBlob,
    /// Subsequent compressed BLOB page (FIL_PAGE_TYPE_ZBLOB2 = 12)
    ZBlob2,
    /// Unknown/reserved (FIL_PAGE_TYPE_UNKNOWN = 13)
    Unknown,
    /// Compressed page (FIL_PAGE_COMPRESSED = 14)
    Compressed,
    /// Encrypted page (FIL_PAGE_ENCRYPTED = 15)
    Encrypted,
    /// Compressed and encrypted page (FIL_PAGE_COMPRESSED_AND_ENCRYPTED = 16)
    CompressedEncrypted,
    /// Encrypted R-tree page (FIL_PAGE_ENCRYPTED_RTREE = 17)
    EncryptedRtree,
    /// Uncompressed SDI BLOB page (FIL_PAGE_SDI_BLOB = 18, MySQL 8.0+)
    SdiBlob,
    /// Compressed SDI BLOB page (FIL_PAGE_SDI_ZBLOB = 19, MySQL 8.0+)
    SdiZblob,
    /// Legacy doublewrite buffer page (FIL_PAGE_TYPE_LEGACY_DBLWR = 20, MySQL 8.0+)
    LegacyDblwr,
    /// Rollback segment array page (FIL_PAGE_TYPE_RSEG_ARRAY = 21, MySQL 8.0+)
    RsegArray,
    /// LOB index page (FIL_PAGE_TYPE_LOB_INDEX = 22, MySQL 8.0+)
    LobIndex,
    /// LOB data page (FIL_PAGE_TYPE_LOB_DATA = 23, MySQL 8.0+)
    LobData,
    /// LOB first page (FIL_PAGE_TYPE_LOB_FIRST = 24, MySQL 8.0+)
    LobFirst,
    /// First page of compressed LOB (FIL_PAGE_TYPE_ZLOB_FIRST = 25, MySQL 8.0+)
    ZlobFirst,
    /// Data pages of compressed LOB (FIL_PAGE_TYPE_ZLOB_DATA = 26, MySQL 8.0+)
    ZlobData,
    /// Index pages of compressed LOB (FIL_PAGE_TYPE_ZLOB_INDEX = 27, MySQL 8.0+)
    ZlobIndex,
    /// Fragment pages of compressed LOB (FIL_PAGE_TYPE_ZLOB_FRAG = 28, MySQL 8.0+)
    ZlobFrag,
    /// Index of fragment pages for compressed LOB (FIL_PAGE_TYPE_ZLOB_FRAG_ENTRY = 29, MySQL 8.0+)
    ZlobFragEntry,
    /// SDI index page (FIL_PAGE_SDI = 17853, MySQL 8.0+)
    Sdi,
    /// R-tree index page for spatial indexes (FIL_PAGE_RTREE = 17854)
    Rtree,
    /// B+Tree index page for table and index data (FIL_PAGE_INDEX = 17855)
    Index,
    /// MariaDB page-level compression (type 34354)
    PageCompressed,
    /// MariaDB page-level compression + encryption (type 37401)
    PageCompressedEncrypted,
    /// Any other type code, kept as read.
    Unrecognized(u16),
}

impl PageType {
    /// Parse a page type from a u16 value read from the FIL header.
    ///
    /// # Examples
    ///
    /// ```
    /// use innoread::innodb::page_types::PageType;
    ///
    /// // INDEX pages (B+Tree data) use type code 17855
    /// assert_eq!(PageType::from_u16(17855), PageType::Index);
    ///
    /// // FSP_HDR (file space header, page 0) uses type code 8
    /// assert_eq!(PageType::from_u16(8), PageType::FspHdr);
    ///
    /// // Unrecognized values keep their code
    /// assert_eq!(PageType::from_u16(9999), PageType::Unrecognized(9999));
    /// ```
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => PageType::Allocated,
            1 => PageType::Unused,
            2 => PageType::UndoLog,
            3 => PageType::Inode,
            4 => PageType::IbufFreeList,
            5 => PageType::IbufBitmap,
            6 => PageType::Sys,
            7 => PageType::TrxSys,
            8 => PageType::FspHdr,
            9 => PageType::Xdes,
            10 => PageType::Blob,
            11 => PageType::ZBlob,
            12 => PageType::ZBlob2,
            13 => PageType::Unknown,
            14 => PageType::Compressed,
            15 => PageType::Encrypted,
            16 => PageType::CompressedEncrypted,
            17 => PageType::EncryptedRtree,
            18 => PageType::SdiBlob,
            19 => PageType::SdiZblob,
            20 => PageType::LegacyDblwr,
            21 => PageType::RsegArray,
            22 => PageType::LobIndex,
            23 => PageType::LobData,
            24 => PageType::LobFirst,
            25 => PageType::ZlobFirst,
            26 => PageType::ZlobData,
            27 => PageType::ZlobIndex,
            28 => PageType::ZlobFrag,
            29 => PageType::ZlobFragEntry,
            17853 => PageType::Sdi,
            17854 => PageType::Rtree,
            17855 => PageType::Index,
            34354 => PageType::PageCompressed,
            37401 => PageType::PageCompressedEncrypted,
            other => PageType::Unrecognized(other),
        }
    }

    /// Returns the raw u16 value of this page type.
    pub fn as_u16(self) -> u16 {
        match self {
            PageType::Allocated => 0,
            PageType::Unused => 1,
            PageType::UndoLog => 2,
            PageType::Inode => 3,
            PageType::IbufFreeList => 4,
            PageType::IbufBitmap => 5,
            PageType::Sys => 6,
            PageType::TrxSys => 7,
            PageType::FspHdr => 8,
            PageType::Xdes => 9,
            PageType::Blob => 10,
            PageType::ZBlob => 11,
            PageType::ZBlob2 => 12,
            PageType::Unknown => 13,
            PageType::Compressed => 14,
            PageType::Encrypted => 15,
            PageType::CompressedEncrypted => 16,
            PageType::EncryptedRtree => 17,
            PageType::SdiBlob => 18,
            PageType::SdiZblob => 19,
            PageType::LegacyDblwr => 20,
            PageType::RsegArray => 21,
            PageType::LobIndex => 22,
            PageType::LobData => 23,
            PageType::LobFirst => 24,
            PageType::ZlobFirst => 25,
            PageType::ZlobData => 26,
            PageType::ZlobIndex => 27,
            PageType::ZlobFrag => 28,
            PageType::ZlobFragEntry => 29,
            PageType::Sdi => 17853,
            PageType::Rtree => 17854,
            PageType::Index => 17855,
            PageType::PageCompressed => 34354,
            PageType::PageCompressedEncrypted => 37401,
            PageType::Unrecognized(code) => code,
        }
    }

    /// Returns true for page types laid out as B+Tree index pages.
    pub fn is_index_layout(self) -> bool {
        matches!(self, PageType::Index | PageType::Sdi)
    }

    /// Returns (name, description, usage) for this page type.
    fn metadata(self) -> (&'static str, &'static str, &'static str) {
        match self {
            PageType::Allocated => (
                "ALLOCATED",
                "Freshly allocated",
                "Page type field not initialized.",
            ),
            PageType::Unused => (
                "UNUSED",
                "Unused page type",
                "Reserved page type marker (not used in practice).",
            ),
            PageType::UndoLog => (
                "UNDO_LOG",
                "Undo log",
                "Stores previous values of modified records.",
            ),
            PageType::Inode => (
                "INODE",
                "File segment inode",
                "Bookkeeping for file segments.",
            ),
            PageType::IbufFreeList => (
                "IBUF_FREE_LIST",
                "Insert buffer free list",
                "Bookkeeping for insert buffer free space management.",
            ),
            PageType::IbufBitmap => (
                "IBUF_BITMAP",
                "Insert buffer bitmap",
                "Bookkeeping for insert buffer writes to be merged.",
            ),
            PageType::Sys => (
                "SYS",
                "System internal",
                "Used for various purposes in the system tablespace.",
            ),
            PageType::TrxSys => (
                "TRX_SYS",
                "Transaction system header",
                "Bookkeeping for the transaction system in system tablespace.",
            ),
            PageType::FspHdr => (
                "FSP_HDR",
                "File space header",
                "Header page (page 0) for each tablespace file.",
            ),
            PageType::Xdes => (
                "XDES",
                "Extent descriptor",
                "Header page for subsequent blocks of 16,384 pages.",
            ),
            PageType::Blob => (
                "BLOB",
                "Uncompressed BLOB",
                "Externally-stored uncompressed BLOB column data.",
            ),
            PageType::ZBlob => (
                "ZBLOB",
                "First compressed BLOB",
                "Externally-stored compressed BLOB column data, first page.",
            ),
            PageType::ZBlob2 => (
                "ZBLOB2",
                "Subsequent compressed BLOB",
                "Externally-stored compressed BLOB column data, subsequent page.",
            ),
            PageType::Unknown => (
                "UNKNOWN",
                "Unknown page type",
                "Unknown or unrecognized page type.",
            ),
            PageType::Compressed => (
                "COMPRESSED",
                "Compressed page",
                "Page stored in compressed format.",
            ),
            PageType::Encrypted => (
                "ENCRYPTED",
                "Encrypted page",
                "Page stored in encrypted format.",
            ),
            PageType::CompressedEncrypted => (
                "COMPRESSED_ENCRYPTED",
                "Compressed and encrypted page",
                "Page stored in compressed and encrypted format.",
            ),
            PageType::EncryptedRtree => (
                "ENCRYPTED_RTREE",
                "Encrypted R-tree page",
                "Encrypted R-tree spatial index page.",
            ),
            PageType::SdiBlob => (
                "SDI_BLOB",
                "SDI BLOB",
                "Uncompressed SDI BLOB overflow data (MySQL 8.0+).",
            ),
            PageType::SdiZblob => (
                "SDI_ZBLOB",
                "Compressed SDI BLOB",
                "Compressed SDI BLOB overflow data (MySQL 8.0+).",
            ),
            PageType::LegacyDblwr => (
                "LEGACY_DBLWR",
                "Legacy doublewrite buffer",
                "Legacy doublewrite buffer page (MySQL 8.0+).",
            ),
            PageType::RsegArray => (
                "RSEG_ARRAY",
                "Rollback segment array",
                "Rollback segment array page (MySQL 8.0+).",
            ),
            PageType::LobIndex => (
                "LOB_INDEX",
                "LOB index",
                "Index page for uncompressed large objects (MySQL 8.0+).",
            ),
            PageType::LobData => (
                "LOB_DATA",
                "LOB data",
                "Data page for uncompressed large objects (MySQL 8.0+).",
            ),
            PageType::LobFirst => (
                "LOB_FIRST",
                "LOB first page",
                "First page of an uncompressed large object (MySQL 8.0+).",
            ),
            PageType::ZlobFirst => (
                "ZLOB_FIRST",
                "Compressed LOB first page",
                "First page of a compressed large object (MySQL 8.0+).",
            ),
            PageType::ZlobData => (
                "ZLOB_DATA",
                "Compressed LOB data",
                "Data page for compressed large objects (MySQL 8.0+).",
            ),
            PageType::ZlobIndex => (
                "ZLOB_INDEX",
                "Compressed LOB index",
                "Index page for compressed large objects (MySQL 8.0+).",
            ),
            PageType::ZlobFrag => (
                "ZLOB_FRAG",
                "Compressed LOB fragment",
                "Fragment page for compressed large objects (MySQL 8.0+).",
            ),
            PageType::ZlobFragEntry => (
                "ZLOB_FRAG_ENTRY",
                "Compressed LOB fragment index",
                "Index of fragment pages for compressed large objects (MySQL 8.0+).",
            ),
            PageType::Sdi => (
                "SDI",
                "Serialized Dictionary Information",
                "Serialized Dictionary Information metadata (MySQL 8.0+).",
            ),
            PageType::Index => (
                "INDEX",
                "B+Tree index",
                "Table and index data stored in B+Tree structure.",
            ),
            PageType::Rtree => (
                "RTREE",
                "R-tree index",
                "Spatial index data stored in R-tree structure.",
            ),
            PageType::PageCompressed => (
                "PAGE_COMPRESSED",
                "MariaDB page compression",
                "Page-level compression (MariaDB). Algorithm ID at offset 26.",
            ),
            PageType::PageCompressedEncrypted => (
                "PAGE_COMPRESSED_ENCRYPTED",
                "MariaDB compressed + encrypted",
                "Page-level compression with encryption (MariaDB).",
            ),
            PageType::Unrecognized(_) => (
                "UNRECOGNIZED",
                "Unrecognized page type",
                "Type code outside the known InnoDB page types.",
            ),
        }
    }

    /// Returns the name of this page type as used in MySQL source.
    ///
    /// # Examples
    ///
    /// ```
    /// use innoread::innodb::page_types::PageType;
    ///
    /// assert_eq!(PageType::Index.name(), "INDEX");
    /// assert_eq!(PageType::FspHdr.name(), "FSP_HDR");
    /// assert_eq!(PageType::Sdi.name(), "SDI");
    /// assert_eq!(PageType::PageCompressed.name(), "PAGE_COMPRESSED");
    /// ```
    pub fn name(self) -> &'static str {
        self.metadata().0
    }

    /// Returns a human-readable description of this page type.
    pub fn description(self) -> &'static str {
        self.metadata().1
    }

    /// Returns usage information for this page type.
    pub fn usage(self) -> &'static str {
        self.metadata().2
    }
}

/// Serialized as `{"name": "FSP_HDR", "code": 8}`; unrecognized codes keep
/// their raw value under the name `UNRECOGNIZED`.
impl Serialize for PageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PageType", 2)?;
        state.serialize_field("name", self.name())?;
        state.serialize_field("code", &self.as_u16())?;
        state.end()
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageType::Unrecognized(code) => write!(f, "UNRECOGNIZED({})", code),
            _ => write!(f, "{}", self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_type_from_u16() {
        assert_eq!(PageType::from_u16(0), PageType::Allocated);
        assert_eq!(PageType::from_u16(2), PageType::UndoLog);
        assert_eq!(PageType::from_u16(3), PageType::Inode);
        assert_eq!(PageType::from_u16(5), PageType::IbufBitmap);
        assert_eq!(PageType::from_u16(8), PageType::FspHdr);
        assert_eq!(PageType::from_u16(9), PageType::Xdes);
        assert_eq!(PageType::from_u16(17853), PageType::Sdi);
        assert_eq!(PageType::from_u16(17855), PageType::Index);
    }

    #[test]
    fn test_unrecognized_keeps_code() {
        let pt = PageType::from_u16(9999);
        assert_eq!(pt, PageType::Unrecognized(9999));
        assert_eq!(pt.as_u16(), 9999);
        assert_eq!(pt.name(), "UNRECOGNIZED");
        assert_eq!(pt.to_string(), "UNRECOGNIZED(9999)");
    }

    #[test]
    fn test_serializes_name_and_code() {
        let known = serde_json::to_value(PageType::FspHdr).unwrap();
        assert_eq!(known, serde_json::json!({"name": "FSP_HDR", "code": 8}));
        let other = serde_json::to_value(PageType::from_u16(9999)).unwrap();
        assert_eq!(other, serde_json::json!({"name": "UNRECOGNIZED", "code": 9999}));
    }

    #[test]
    fn test_reserved_unknown_is_distinct() {
        assert_eq!(PageType::from_u16(13), PageType::Unknown);
        assert_ne!(PageType::from_u16(13), PageType::Unrecognized(13));
    }

    #[test]
    fn test_page_type_roundtrip() {
        for code in (0u16..=40).chain([17853, 17854, 17855, 34354, 37401, u16::MAX]) {
            assert_eq!(PageType::from_u16(code).as_u16(), code);
        }
    }

    #[test]
    fn test_index_layout_types() {
        assert!(PageType::Index.is_index_layout());
        assert!(PageType::Sdi.is_index_layout());
        assert!(!PageType::Rtree.is_index_layout());
        assert!(!PageType::FspHdr.is_index_layout());
    }

    #[test]
    fn test_page_type_display() {
        assert_eq!(format!("{}", PageType::Index), "INDEX");
        assert_eq!(format!("{}", PageType::FspHdr), "FSP_HDR");
        assert_eq!(format!("{}", PageType::Inode), "INODE");
    }
}
