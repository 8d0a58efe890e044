//! Page checksum classification.
//!
//! The first four bytes of every page hold a checksum written by one of
//! several algorithms depending on server version and
//! `innodb_checksum_algorithm`. [`validate_checksum`] figures out which one
//! (if any) produced the stored value. The result is informational: a
//! checksum mismatch does not stop a page from being decoded.

use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;

use crate::innodb::constants::*;

/// Checksum algorithms used by InnoDB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChecksumAlgorithm {
    /// CRC-32C (hardware accelerated, MySQL 5.7.7+ default)
    Crc32c,
    /// Legacy InnoDB checksum (buf_calc_page_new_checksum equivalent)
    InnoDB,
    /// No checksum (innodb_checksum_algorithm=none)
    None,
    /// Freshly allocated page, every byte zero
    Empty,
}

/// Result of a checksum validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecksumResult {
    pub algorithm: ChecksumAlgorithm,
    pub valid: bool,
    pub stored_checksum: u32,
    pub calculated_checksum: u32,
}

/// Classify a full page's stored checksum.
///
/// A page shorter than [`PAGE_SIZE`] is reported invalid.
pub fn validate_checksum(page_data: &[u8]) -> ChecksumResult {
    if page_data.len() < PAGE_SIZE {
        return ChecksumResult {
            algorithm: ChecksumAlgorithm::None,
            valid: false,
            stored_checksum: 0,
            calculated_checksum: 0,
        };
    }

    let stored_checksum = BigEndian::read_u32(&page_data[FIL_PAGE_SPACE_OR_CHKSUM..]);

    if stored_checksum == BUF_NO_CHECKSUM_MAGIC {
        return ChecksumResult {
            algorithm: ChecksumAlgorithm::None,
            valid: true,
            stored_checksum,
            calculated_checksum: BUF_NO_CHECKSUM_MAGIC,
        };
    }

    if stored_checksum == 0 && page_data[..PAGE_SIZE].iter().all(|&b| b == 0) {
        return ChecksumResult {
            algorithm: ChecksumAlgorithm::Empty,
            valid: true,
            stored_checksum: 0,
            calculated_checksum: 0,
        };
    }

    let crc_checksum = calculate_crc32c(page_data);
    if stored_checksum == crc_checksum {
        return ChecksumResult {
            algorithm: ChecksumAlgorithm::Crc32c,
            valid: true,
            stored_checksum,
            calculated_checksum: crc_checksum,
        };
    }

    let innodb_checksum = calculate_innodb_checksum(page_data);
    if stored_checksum == innodb_checksum {
        return ChecksumResult {
            algorithm: ChecksumAlgorithm::InnoDB,
            valid: true,
            stored_checksum,
            calculated_checksum: innodb_checksum,
        };
    }

    // Neither matched; report against CRC-32C, the modern default.
    ChecksumResult {
        algorithm: ChecksumAlgorithm::Crc32c,
        valid: false,
        stored_checksum,
        calculated_checksum: crc_checksum,
    }
}

/// CRC-32C over bytes 4..26 and 38..(page end - 8).
///
/// Skips the stored checksum, the flush LSN / space id area (written
/// outside the buffer pool), and the trailer.
pub fn calculate_crc32c(page_data: &[u8]) -> u32 {
    let crc = crc32c::crc32c(&page_data[FIL_PAGE_OFFSET..FIL_PAGE_FILE_FLUSH_LSN]);
    crc32c::crc32c_append(crc, &page_data[FIL_PAGE_DATA..FIL_PAGE_END_LSN_OLD_CHKSUM])
}

/// MySQL's ut_fold_ulint_pair, on 64-bit `ulint`.
#[inline]
fn ut_fold_ulint_pair(n1: u64, n2: u64) -> u64 {
    let mask2 = UT_HASH_RANDOM_MASK2 as u64;
    let mask = UT_HASH_RANDOM_MASK as u64;
    ((((n1 ^ n2 ^ mask2) << 8).wrapping_add(n1)) ^ mask).wrapping_add(n2)
}

/// MySQL's ut_fold_binary: folds one byte at a time.
fn ut_fold_binary(data: &[u8]) -> u64 {
    data.iter()
        .fold(0u64, |fold, &b| ut_fold_ulint_pair(fold, b as u64))
}

/// Legacy InnoDB checksum (buf_calc_page_new_checksum), masked to 32 bits.
pub fn calculate_innodb_checksum(page_data: &[u8]) -> u32 {
    let fold1 = ut_fold_binary(&page_data[FIL_PAGE_OFFSET..FIL_PAGE_FILE_FLUSH_LSN]);
    let fold2 = ut_fold_binary(&page_data[FIL_PAGE_DATA..FIL_PAGE_END_LSN_OLD_CHKSUM]);
    fold1.wrapping_add(fold2) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_zero_page_is_valid() {
        let page = vec![0u8; PAGE_SIZE];
        let result = validate_checksum(&page);
        assert!(result.valid);
        assert_eq!(result.algorithm, ChecksumAlgorithm::Empty);
    }

    #[test]
    fn test_no_checksum_magic() {
        let mut page = vec![0u8; PAGE_SIZE];
        BigEndian::write_u32(&mut page[0..], BUF_NO_CHECKSUM_MAGIC);
        let result = validate_checksum(&page);
        assert!(result.valid);
        assert_eq!(result.algorithm, ChecksumAlgorithm::None);
    }

    #[test]
    fn test_crc32c_detected() {
        let mut page = vec![0u8; PAGE_SIZE];
        BigEndian::write_u32(&mut page[FIL_PAGE_OFFSET..], 5);
        page[200] = 0x5A;
        let crc = calculate_crc32c(&page);
        BigEndian::write_u32(&mut page[0..], crc);
        let result = validate_checksum(&page);
        assert!(result.valid);
        assert_eq!(result.algorithm, ChecksumAlgorithm::Crc32c);
    }

    #[test]
    fn test_legacy_checksum_detected() {
        let mut page = vec![0u8; PAGE_SIZE];
        BigEndian::write_u32(&mut page[FIL_PAGE_OFFSET..], 9);
        page[1000] = 0x11;
        let legacy = calculate_innodb_checksum(&page);
        BigEndian::write_u32(&mut page[0..], legacy);
        let result = validate_checksum(&page);
        assert!(result.valid);
        assert_eq!(result.algorithm, ChecksumAlgorithm::InnoDB);
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut page = vec![0u8; PAGE_SIZE];
        page[300] = 1;
        BigEndian::write_u32(&mut page[0..], 0x0BADF00D);
        let result = validate_checksum(&page);
        assert!(!result.valid);
        assert_eq!(result.stored_checksum, 0x0BADF00D);
    }

    #[test]
    fn test_short_page_invalid() {
        assert!(!validate_checksum(&[0u8; 100]).valid);
    }
}
