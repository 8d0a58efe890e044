//! Criterion benchmarks for innodb-reader core operations.
//!
//! Benchmarks cover:
//! - FIL header/trailer decode and LSN cross-check
//! - Body decode per page type (FSP_HDR, INODE, INDEX)
//! - Full in-memory tablespace scan, sequential and parallel

use std::sync::atomic::AtomicBool;

use byteorder::{BigEndian, ByteOrder};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use innoread::innodb::constants::*;
use innoread::innodb::page::decode_fil;
use innoread::innodb::scan::{decode_page, scan};
use innoread::innodb::tablespace::{PageFrame, PageSource};

const PS: usize = PAGE_SIZE;

// ---------------------------------------------------------------------------
// Synthetic page builders (mirrors integration test helpers)
// ---------------------------------------------------------------------------

fn build_page(page_num: u32, page_type: u16, lsn: u64) -> Vec<u8> {
    let mut page = vec![0u8; PS];
    BigEndian::write_u32(&mut page[FIL_PAGE_OFFSET..], page_num);
    BigEndian::write_u32(&mut page[FIL_PAGE_PREV..], FIL_NULL);
    BigEndian::write_u32(&mut page[FIL_PAGE_NEXT..], FIL_NULL);
    BigEndian::write_u64(&mut page[FIL_PAGE_LSN..], lsn);
    BigEndian::write_u16(&mut page[FIL_PAGE_TYPE..], page_type);
    BigEndian::write_u32(&mut page[PS - 4..], (lsn & 0xFFFFFFFF) as u32);
    page
}

fn build_index_page(page_num: u32, lsn: u64) -> Vec<u8> {
    let mut page = build_page(page_num, 17855, lsn);
    let ph = FIL_PAGE_DATA;
    BigEndian::write_u16(&mut page[ph + PAGE_N_DIR_SLOTS..], 40);
    BigEndian::write_u16(&mut page[ph + PAGE_HEAP_TOP..], 8000);
    BigEndian::write_u16(&mut page[ph + PAGE_N_HEAP..], 0x8000 | 200);
    page[PAGE_DATA_OFFSET + 5..PAGE_DATA_OFFSET + 13].copy_from_slice(INFIMUM_TEXT);
    let sup = PAGE_DATA_OFFSET + SYSTEM_RECORD_SIZE;
    page[sup + 5..sup + 13].copy_from_slice(SUPREMUM_TEXT);
    page
}

fn build_synthetic_tablespace(num_pages: u32) -> Vec<u8> {
    let mut data = build_page(0, 8, 1000);
    for n in 1..num_pages {
        let page = match n % 4 {
            1 => build_page(n, 3, 1000 + n as u64),
            2 => build_page(n, 2, 1000 + n as u64),
            _ => build_index_page(n, 1000 + n as u64),
        };
        data.extend_from_slice(&page);
    }
    data
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_fil_decode(c: &mut Criterion) {
    let page = build_index_page(1, 5000);
    c.bench_function("fil_header_trailer_decode", |b| {
        b.iter(|| decode_fil(black_box(&page), 1))
    });
}

fn bench_decode_page_by_type(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_page");
    group.throughput(Throughput::Bytes(PS as u64));

    let cases = [
        ("fsp_hdr", build_page(0, 8, 10)),
        ("inode", build_page(2, 3, 10)),
        ("index", build_index_page(3, 10)),
        ("undo_log", build_page(4, 2, 10)),
    ];
    for (name, page) in cases {
        let frame = PageFrame::new(0, page);
        group.bench_with_input(BenchmarkId::from_parameter(name), &frame, |b, frame| {
            b.iter(|| decode_page(black_box(frame)))
        });
    }
    group.finish();
}

fn bench_full_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_scan");
    for &num_pages in &[64u32, 512] {
        let source = PageSource::from_bytes(build_synthetic_tablespace(num_pages));
        let cancel = AtomicBool::new(false);
        group.throughput(Throughput::Bytes(num_pages as u64 * PS as u64));

        group.bench_with_input(
            BenchmarkId::new("sequential", num_pages),
            &source,
            |b, source| b.iter(|| scan(source, 0, &cancel, |o| {
                black_box(o);
                Ok(())
            })),
        );
        #[cfg(feature = "cli")]
        group.bench_with_input(
            BenchmarkId::new("parallel", num_pages),
            &source,
            |b, source| b.iter(|| innoread::innodb::scan::scan_parallel(source, 0, &cancel, |o| {
                black_box(o);
                Ok(())
            })),
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_fil_decode,
    bench_decode_page_by_type,
    bench_full_scan
);
criterion_main!(benches);
