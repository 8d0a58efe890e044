//! InnoDB page header and trailer parsing.
//!
//! Every InnoDB page begins with a 38-byte FIL header ([`FilHeader`]) containing
//! the checksum, page number, prev/next pointers, LSN, page type, flush LSN, and
//! space ID. The last 8 bytes form the FIL trailer ([`FilTrailer`]) with the
//! old-style checksum and low 32 bits of the LSN.
//!
//! [`decode_fil`] decodes both and cross-checks the two LSN copies. A page
//! whose copies disagree was torn or overwritten and its body must not be
//! trusted.

use serde::Serialize;

use crate::innodb::constants::*;
use crate::innodb::layout::{ByteCursor, OnDisk};
use crate::innodb::page_types::PageType;
use crate::InnoError;

/// Parsed FIL header (38 bytes, present at the start of every InnoDB page).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilHeader {
    /// Checksum (or space id in older formats). Bytes 0-3.
    pub checksum: u32,
    /// Page number within the tablespace. Bytes 4-7.
    pub page_number: u32,
    /// Previous page in the doubly-linked list. Bytes 8-11.
    /// FIL_NULL (0xFFFFFFFF) if not used.
    pub prev_page: u32,
    /// Next page in the doubly-linked list. Bytes 12-15.
    /// FIL_NULL (0xFFFFFFFF) if not used.
    pub next_page: u32,
    /// LSN of newest modification to this page. Bytes 16-23.
    pub lsn: u64,
    /// Page type. Bytes 24-25.
    pub page_type: PageType,
    /// Bytes 26-33. Flush LSN on page 0 of the system tablespace; on
    /// page-compressed pages the same bytes hold the compression overlay
    /// exposed by the `compression_*` accessors.
    pub flush_lsn: u64,
    /// Space ID this page belongs to. Bytes 34-37.
    pub space_id: u32,
}

impl FilHeader {
    /// Returns true if prev_page links to a page (anything but FIL_NULL).
    pub fn has_prev(&self) -> bool {
        self.prev_page != FIL_NULL
    }

    /// Returns true if next_page links to a page (anything but FIL_NULL).
    pub fn has_next(&self) -> bool {
        self.next_page != FIL_NULL
    }

    /// Low 32 bits of the header LSN, as mirrored in the trailer.
    pub fn lsn_low32(&self) -> u32 {
        (self.lsn & 0xFFFFFFFF) as u32
    }

    /// Compression format version (byte 26).
    pub fn compression_version(&self) -> u8 {
        (self.flush_lsn >> 56) as u8
    }

    /// Compression algorithm (byte 27).
    pub fn compression_algorithm(&self) -> u8 {
        (self.flush_lsn >> 48) as u8
    }

    /// Page type before compression (bytes 28-29).
    pub fn compression_original_type(&self) -> u16 {
        (self.flush_lsn >> 32) as u16
    }

    /// Uncompressed data size (bytes 30-31).
    pub fn compression_original_size(&self) -> u16 {
        (self.flush_lsn >> 16) as u16
    }

    /// Compressed data size (bytes 32-33).
    pub fn compression_compressed_size(&self) -> u16 {
        self.flush_lsn as u16
    }

    /// Cross-check this header's LSN against the trailer copy.
    pub fn check_trailer(&self, trailer: &FilTrailer, page: u64) -> Result<(), InnoError> {
        if trailer.lsn_low32 == self.lsn_low32() {
            Ok(())
        } else {
            Err(InnoError::Corruption {
                page,
                header_lsn_low32: self.lsn_low32(),
                trailer_lsn_low32: trailer.lsn_low32,
            })
        }
    }
}

impl OnDisk for FilHeader {
    const NAME: &'static str = "FIL_HEADER";
    const SIZE: usize = SIZE_FIL_HEAD;

    fn read_from(cursor: &mut ByteCursor<'_>) -> Option<Self> {
        Some(FilHeader {
            checksum: cursor.read_u32()?,
            page_number: cursor.read_u32()?,
            prev_page: cursor.read_u32()?,
            next_page: cursor.read_u32()?,
            lsn: cursor.read_u64()?,
            page_type: PageType::from_u16(cursor.read_u16()?),
            flush_lsn: cursor.read_u64()?,
            space_id: cursor.read_u32()?,
        })
    }
}

/// Parsed FIL trailer (8 bytes, present at the end of every InnoDB page).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilTrailer {
    /// Old-style checksum (or low 32 bits of LSN, depending on version). Bytes 0-3 of trailer.
    pub checksum: u32,
    /// Low 32 bits of the LSN. Bytes 4-7 of trailer.
    pub lsn_low32: u32,
}

impl OnDisk for FilTrailer {
    const NAME: &'static str = "FIL_TRAILER";
    const SIZE: usize = SIZE_FIL_TRAILER;

    fn read_from(cursor: &mut ByteCursor<'_>) -> Option<Self> {
        Some(FilTrailer {
            checksum: cursor.read_u32()?,
            lsn_low32: cursor.read_u32()?,
        })
    }
}

/// Decode the FIL header and trailer of a full page and cross-check them.
///
/// `page` is the page's ordinal position in the file, used for error
/// reports. Fails with [`InnoError::Parse`] if the buffer is not a full
/// page and with [`InnoError::Corruption`] if the LSN copies disagree.
///
/// # Examples
///
/// ```
/// use innoread::innodb::constants::*;
/// use innoread::innodb::page::decode_fil;
/// use byteorder::{BigEndian, ByteOrder};
///
/// let mut page = vec![0u8; PAGE_SIZE];
/// BigEndian::write_u64(&mut page[FIL_PAGE_LSN..], 0x1_0000_2000);
/// BigEndian::write_u32(&mut page[PAGE_SIZE - 4..], 0x2000);
///
/// let (header, trailer) = decode_fil(&page, 0).unwrap();
/// assert_eq!(header.lsn, 0x1_0000_2000);
/// assert_eq!(trailer.lsn_low32, 0x2000);
///
/// page[PAGE_SIZE - 1] ^= 1;
/// assert!(decode_fil(&page, 0).is_err());
/// ```
pub fn decode_fil(frame: &[u8], page: u64) -> Result<(FilHeader, FilTrailer), InnoError> {
    if frame.len() != PAGE_SIZE {
        return Err(InnoError::Parse(format!(
            "Page {} is {} bytes, expected {}",
            page,
            frame.len(),
            PAGE_SIZE
        )));
    }
    let header = FilHeader::parse(frame)
        .ok_or_else(|| InnoError::Parse(format!("Cannot decode FIL header of page {}", page)))?;
    let trailer = FilTrailer::parse(&frame[FIL_PAGE_END_LSN_OLD_CHKSUM..])
        .ok_or_else(|| InnoError::Parse(format!("Cannot decode FIL trailer of page {}", page)))?;
    header.check_trailer(&trailer, page)?;
    Ok((header, trailer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, ByteOrder};

    #[allow(clippy::too_many_arguments)]
    fn make_fil_header_bytes(
        checksum: u32,
        page_num: u32,
        prev: u32,
        next: u32,
        lsn: u64,
        page_type: u16,
        flush_lsn: u64,
        space_id: u32,
    ) -> Vec<u8> {
        let mut buf = vec![0u8; SIZE_FIL_HEAD];
        BigEndian::write_u32(&mut buf[FIL_PAGE_SPACE_OR_CHKSUM..], checksum);
        BigEndian::write_u32(&mut buf[FIL_PAGE_OFFSET..], page_num);
        BigEndian::write_u32(&mut buf[FIL_PAGE_PREV..], prev);
        BigEndian::write_u32(&mut buf[FIL_PAGE_NEXT..], next);
        BigEndian::write_u64(&mut buf[FIL_PAGE_LSN..], lsn);
        BigEndian::write_u16(&mut buf[FIL_PAGE_TYPE..], page_type);
        BigEndian::write_u64(&mut buf[FIL_PAGE_FILE_FLUSH_LSN..], flush_lsn);
        BigEndian::write_u32(&mut buf[FIL_PAGE_SPACE_ID..], space_id);
        buf
    }

    fn make_page(lsn: u64, trailer_low32: u32) -> Vec<u8> {
        let mut page = vec![0u8; PAGE_SIZE];
        BigEndian::write_u64(&mut page[FIL_PAGE_LSN..], lsn);
        BigEndian::write_u32(&mut page[FIL_PAGE_END_LSN_OLD_CHKSUM + 4..], trailer_low32);
        page
    }

    #[test]
    fn test_fil_header_parse() {
        let data = make_fil_header_bytes(
            0x12345678, // checksum
            42,         // page number
            41,         // prev page
            43,         // next page
            1000,       // lsn
            17855,      // INDEX page type
            2000,       // flush lsn
            5,          // space id
        );
        let hdr = FilHeader::parse(&data).unwrap();
        assert_eq!(hdr.checksum, 0x12345678);
        assert_eq!(hdr.page_number, 42);
        assert_eq!(hdr.prev_page, 41);
        assert_eq!(hdr.next_page, 43);
        assert_eq!(hdr.lsn, 1000);
        assert_eq!(hdr.page_type, PageType::Index);
        assert_eq!(hdr.flush_lsn, 2000);
        assert_eq!(hdr.space_id, 5);
        assert!(hdr.has_prev());
        assert!(hdr.has_next());
    }

    #[test]
    fn test_fil_header_null_pages() {
        let data = make_fil_header_bytes(0, 0, FIL_NULL, FIL_NULL, 0, 0, 0, 0);
        let hdr = FilHeader::parse(&data).unwrap();
        assert!(!hdr.has_prev());
        assert!(!hdr.has_next());
    }

    #[test]
    fn test_fil_header_page_zero_is_a_link() {
        let data = make_fil_header_bytes(0, 1, 0, 0, 0, 17855, 0, 0);
        let hdr = FilHeader::parse(&data).unwrap();
        assert_eq!(hdr.prev_page, 0);
        assert!(hdr.has_prev());
        assert!(hdr.has_next());
    }

    #[test]
    fn test_fil_header_too_short() {
        let data = vec![0u8; 10];
        assert!(FilHeader::parse(&data).is_none());
    }

    #[test]
    fn test_compression_overlay() {
        let overlay = 0x01_02_45BF_2000_0800u64;
        let data = make_fil_header_bytes(0, 3, FIL_NULL, FIL_NULL, 1, 34354, overlay, 9);
        let hdr = FilHeader::parse(&data).unwrap();
        assert_eq!(hdr.compression_version(), 1);
        assert_eq!(hdr.compression_algorithm(), 2);
        assert_eq!(hdr.compression_original_type(), 17855);
        assert_eq!(hdr.compression_original_size(), 0x2000);
        assert_eq!(hdr.compression_compressed_size(), 0x0800);
    }

    #[test]
    fn test_fil_trailer_parse() {
        let mut data = vec![0u8; 8];
        BigEndian::write_u32(&mut data[0..], 0xAABBCCDD);
        BigEndian::write_u32(&mut data[4..], 0x11223344);
        let trl = FilTrailer::parse(&data).unwrap();
        assert_eq!(trl.checksum, 0xAABBCCDD);
        assert_eq!(trl.lsn_low32, 0x11223344);
    }

    #[test]
    fn test_decode_fil_matching_lsn() {
        let page = make_page(0xABCD_0000_1234_5678, 0x1234_5678);
        let (hdr, trl) = decode_fil(&page, 0).unwrap();
        assert_eq!(hdr.lsn_low32(), trl.lsn_low32);
    }

    #[test]
    fn test_decode_fil_single_bit_perturbation() {
        let lsn = 0x0000_0001_8000_0001u64;
        for bit in 0..32 {
            let page = make_page(lsn, (lsn as u32) ^ (1 << bit));
            match decode_fil(&page, 7) {
                Err(InnoError::Corruption {
                    page,
                    header_lsn_low32,
                    trailer_lsn_low32,
                }) => {
                    assert_eq!(page, 7);
                    assert_eq!(header_lsn_low32, 0x8000_0001);
                    assert_eq!(trailer_lsn_low32, 0x8000_0001 ^ (1 << bit));
                }
                other => panic!("bit {}: expected corruption, got {:?}", bit, other),
            }
        }
    }

    #[test]
    fn test_decode_fil_high_lsn_bits_ignored() {
        let page = make_page(0xFFFF_FFFF_0000_0010, 0x10);
        assert!(decode_fil(&page, 0).is_ok());
    }

    #[test]
    fn test_decode_fil_rejects_partial_frame() {
        let page = vec![0u8; PAGE_SIZE - 1];
        assert!(matches!(decode_fil(&page, 0), Err(InnoError::Parse(_))));
    }
}
