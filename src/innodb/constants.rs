/// InnoDB page and file structure constants.
///
/// These values are derived from the MySQL/InnoDB source code headers:
/// - fil0fil.h (FIL header/trailer)
/// - fut0lst.h (file-based list nodes)
/// - fsp0fsp.h (FSP header, extent descriptors, segment inodes)
/// - page0page.h (index page header)
// Page size
pub const PAGE_SIZE: usize = 16384;
pub const SIZE_PAGE_DEFAULT: u32 = PAGE_SIZE as u32;

// FIL Header (38 bytes total)
pub const SIZE_FIL_HEAD: usize = 38;
pub const FIL_PAGE_SPACE_OR_CHKSUM: usize = 0; // 4 bytes - checksum or space id
pub const FIL_PAGE_OFFSET: usize = 4; // 4 bytes - page number
pub const FIL_PAGE_PREV: usize = 8; // 4 bytes - previous page
pub const FIL_PAGE_NEXT: usize = 12; // 4 bytes - next page
pub const FIL_PAGE_LSN: usize = 16; // 8 bytes - LSN of newest modification
pub const FIL_PAGE_TYPE: usize = 24; // 2 bytes - page type
pub const FIL_PAGE_FILE_FLUSH_LSN: usize = 26; // 8 bytes - flush LSN or compression overlay
pub const FIL_PAGE_SPACE_ID: usize = 34; // 4 bytes - space id

// FIL Trailer (8 bytes total), at PAGE_SIZE - SIZE_FIL_TRAILER
pub const SIZE_FIL_TRAILER: usize = 8;
pub const FIL_PAGE_END_LSN_OLD_CHKSUM: usize = PAGE_SIZE - SIZE_FIL_TRAILER;

// Start of page data (immediately after FIL header)
pub const FIL_PAGE_DATA: usize = 38;

// Special page number values
pub const FIL_NULL: u32 = 0xFFFFFFFF; // "null" page reference (4294967295)

// File-based list structures
pub const FIL_ADDR_SIZE: usize = 6; // page number (4) + byte offset (2)
pub const FLST_NODE_SIZE: usize = 12; // prev + next address
pub const FLST_BASE_NODE_SIZE: usize = 16; // length + first + last address

// FSP Header (112 bytes, starts at FIL_PAGE_DATA on page 0)
pub const FSP_HEADER_SIZE: usize = 112;
pub const FSP_SPACE_ID: usize = 0; // 4 bytes - space id
pub const FSP_NOT_USED: usize = 4; // 4 bytes - unused
pub const FSP_SIZE: usize = 8; // 4 bytes - tablespace size in pages
pub const FSP_FREE_LIMIT: usize = 12; // 4 bytes - minimum page not yet initialized
pub const FSP_SPACE_FLAGS: usize = 16; // 4 bytes - flags
pub const FSP_FRAG_N_USED: usize = 20; // 4 bytes - number of used pages in FSP_FREE_FRAG list
pub const FSP_FREE: usize = 24; // 16 bytes - list of free extents
pub const FSP_FREE_FRAG: usize = 40; // 16 bytes - list of partially free extents
pub const FSP_FULL_FRAG: usize = 56; // 16 bytes - list of full fragment extents
pub const FSP_SEG_ID: usize = 72; // 8 bytes - next unused segment id
pub const FSP_SEG_INODES_FULL: usize = 80; // 16 bytes - list of full inode pages
pub const FSP_SEG_INODES_FREE: usize = 96; // 16 bytes - list of inode pages with free slots

// FSP flags bit positions for page size detection
pub const FSP_FLAGS_POS_PAGE_SSIZE: u32 = 6; // bit position of page size
pub const FSP_FLAGS_MASK_PAGE_SSIZE: u32 = 0xF << FSP_FLAGS_POS_PAGE_SSIZE; // 4 bits

// Extent descriptors (on FSP_HDR and XDES pages)
pub const XDES_ARR_OFFSET: usize = FIL_PAGE_DATA + FSP_HEADER_SIZE; // 150
pub const XDES_SIZE: usize = 40;
pub const XDES_ID: usize = 0; // 8 bytes - owning segment id
pub const XDES_FLST_NODE: usize = 8; // 12 bytes - list node
pub const XDES_STATE: usize = 20; // 4 bytes - extent state
pub const XDES_BITMAP: usize = 24; // 16 bytes - 2 bits per page
pub const XDES_BITMAP_SIZE: usize = 16;
pub const XDES_PER_PAGE: usize = 256;
pub const FSP_EXTENT_SIZE: usize = 64; // pages per extent for 16K pages
pub const XDES_BITS_PER_PAGE: usize = 2;
pub const XDES_FREE_BIT: usize = 0;
pub const XDES_CLEAN_BIT: usize = 1;

// Extent states
pub const XDES_FREE: u32 = 1;
pub const XDES_FREE_FRAG: u32 = 2;
pub const XDES_FULL_FRAG: u32 = 3;
pub const XDES_FSEG: u32 = 4;
pub const XDES_FSEG_FRAG: u32 = 5;

// Segment inode pages
pub const FSEG_INODE_PAGE_NODE: usize = FIL_PAGE_DATA; // 12-byte list node
pub const FSEG_ARR_OFFSET: usize = FIL_PAGE_DATA + FLST_NODE_SIZE; // 50
pub const FSEG_INODE_SIZE: usize = 192;
pub const FSP_SEG_INODES_PER_PAGE: usize = 85;
pub const FSEG_FRAG_ARR_N_SLOTS: usize = 32; // FSP_EXTENT_SIZE / 2
pub const FSEG_MAGIC_N_VALUE: u32 = 97937874;

// Page Header (INDEX page specific, starts at FIL_PAGE_DATA = offset 38)
pub const PAGE_N_DIR_SLOTS: usize = 0; // 2 bytes - number of directory slots
pub const PAGE_HEAP_TOP: usize = 2; // 2 bytes - pointer to record heap top
pub const PAGE_N_HEAP: usize = 4; // 2 bytes - number of records in heap (bit 15 = compact flag)
pub const PAGE_FREE: usize = 6; // 2 bytes - pointer to start of free record list
pub const PAGE_GARBAGE: usize = 8; // 2 bytes - bytes in deleted records
pub const PAGE_LAST_INSERT: usize = 10; // 2 bytes - pointer to last inserted record
pub const PAGE_DIRECTION: usize = 12; // 2 bytes - last insert direction
pub const PAGE_N_DIRECTION: usize = 14; // 2 bytes - consecutive inserts in same direction
pub const PAGE_N_RECS: usize = 16; // 2 bytes - number of user records
pub const PAGE_MAX_TRX_ID: usize = 18; // 8 bytes - max trx id (secondary indexes only)
pub const PAGE_LEVEL: usize = 26; // 2 bytes - level in B+tree (0 = leaf)
pub const PAGE_INDEX_ID: usize = 28; // 8 bytes - index id
pub const PAGE_BTR_SEG_LEAF: usize = 36; // 10 bytes - leaf segment header
pub const PAGE_BTR_SEG_TOP: usize = 46; // 10 bytes - non-leaf segment header
pub const INDEX_HEADER_SIZE: usize = 36; // index header proper, before the FSEG headers
pub const PAGE_HEADER_SIZE: usize = 56; // index header plus both FSEG headers

// PAGE_N_HEAP packing
pub const PAGE_N_HEAP_COUNT_MASK: u16 = 0x7FFF;
pub const PAGE_N_HEAP_COMPACT_FLAG: u16 = 0x8000;

// FSEG Header size
pub const FSEG_HEADER_SIZE: usize = 10;

// System records (infimum/supremum) follow the page header at byte 94
pub const PAGE_DATA_OFFSET: usize = FIL_PAGE_DATA + PAGE_HEADER_SIZE; // 94
pub const REC_HEADER_SIZE: usize = 5;
pub const SYSTEM_RECORD_DATA_SIZE: usize = 8;
pub const SYSTEM_RECORD_SIZE: usize = REC_HEADER_SIZE + SYSTEM_RECORD_DATA_SIZE; // 13
pub const INFIMUM_TEXT: &[u8; 8] = b"infimum\0";
pub const SUPREMUM_TEXT: &[u8; 8] = b"supremum";

// Page directory
pub const PAGE_DIR_SLOT_SIZE: usize = 2;
pub const PAGE_DIR: usize = PAGE_SIZE - SIZE_FIL_TRAILER; // directory grows backward from here

// Checksum constants
pub const UT_HASH_RANDOM_MASK: u32 = 1463735687;
pub const UT_HASH_RANDOM_MASK2: u32 = 1653893711;
pub const BUF_NO_CHECKSUM_MAGIC: u32 = 0xDEADBEEF;

// Insert direction values
pub const PAGE_LEFT: u16 = 1;
pub const PAGE_RIGHT: u16 = 2;
pub const PAGE_SAME_REC: u16 = 3;
pub const PAGE_SAME_PAGE: u16 = 4;
pub const PAGE_NO_DIRECTION: u16 = 5;
