//! Page-type dispatch and tablespace scan drivers.
//!
//! [`decode_page`] takes one [`PageFrame`] through the per-page sequence
//! (FIL header, trailer cross-check, type routing, body decode) and returns
//! a [`PageOutcome`]. A page whose header and trailer disagree is
//! [`PageOutcome::Aborted`] before any body decode is attempted; a body that
//! cannot be decoded still yields [`PageOutcome::Decoded`] with `body: None`
//! and the reason in `issues`.
//!
//! [`scan`] drives the decode over a [`PageSource`] in page order and feeds
//! every outcome to a sink. Only a frame-source `Io` error ends a scan
//! early; it is recorded in [`ScanSummary::terminated_by`].
//! [`scan_parallel`] does the same work on the rayon pool and still emits
//! outcomes in page-number order.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::innodb::checksum::{validate_checksum, ChecksumResult};
use crate::innodb::constants::*;
use crate::innodb::fsp::{SpaceHeaderPage, XdesPage};
use crate::innodb::index::IndexPage;
use crate::innodb::inode::InodePage;
use crate::innodb::layout::OnDisk;
use crate::innodb::page::{FilHeader, FilTrailer};
use crate::innodb::page_types::PageType;
use crate::innodb::tablespace::{PageFrame, PageSource};
use crate::InnoError;

/// Last stage a page reached before its decode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    HeaderDecoded,
    TrailerValidated,
    TypeRouted,
    BodyDecoded,
}

/// Type-specific body of a decoded page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum PageBody {
    SpaceHeader(SpaceHeaderPage),
    Xdes(XdesPage),
    SegmentInodes(InodePage),
    Index(IndexPage),
    /// Page types whose body is not decoded.
    Empty,
}

impl PageBody {
    pub fn name(&self) -> &'static str {
        match self {
            PageBody::SpaceHeader(_) => "space header",
            PageBody::Xdes(_) => "extent descriptors",
            PageBody::SegmentInodes(_) => "segment inodes",
            PageBody::Index(_) => "index",
            PageBody::Empty => "empty",
        }
    }
}

/// A page whose header and trailer were consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedPage {
    pub page_no: u64,
    pub header: FilHeader,
    pub trailer: FilTrailer,
    pub checksum: ChecksumResult,
    /// `BodyDecoded`, or `TypeRouted` if the body decoder failed.
    pub stage: Stage,
    /// `None` when the body decoder failed; the failure is in `issues`.
    pub body: Option<PageBody>,
    /// Recoverable problems found while decoding the body.
    pub issues: Vec<InnoError>,
}

/// Terminal result of decoding one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PageOutcome {
    Decoded(DecodedPage),
    Aborted {
        page_no: u64,
        stage: Stage,
        reason: InnoError,
    },
}

impl PageOutcome {
    pub fn page_no(&self) -> u64 {
        match self {
            PageOutcome::Decoded(page) => page.page_no,
            PageOutcome::Aborted { page_no, .. } => *page_no,
        }
    }

    /// Number of problems attached to this outcome.
    pub fn issue_count(&self) -> usize {
        match self {
            PageOutcome::Decoded(page) => page.issues.len(),
            PageOutcome::Aborted { .. } => 1,
        }
    }
}

/// Decode one page frame.
///
/// # Examples
///
/// ```
/// use byteorder::{BigEndian, ByteOrder};
/// use innoread::innodb::constants::*;
/// use innoread::innodb::page_types::PageType;
/// use innoread::innodb::scan::{decode_page, PageBody, PageOutcome};
/// use innoread::innodb::tablespace::PageFrame;
///
/// let mut page = vec![0u8; PAGE_SIZE];
/// BigEndian::write_u16(&mut page[FIL_PAGE_TYPE..], 9999);
/// BigEndian::write_u64(&mut page[FIL_PAGE_LSN..], 42);
/// BigEndian::write_u32(&mut page[PAGE_SIZE - 4..], 42);
///
/// match decode_page(&PageFrame::new(0, page)) {
///     PageOutcome::Decoded(p) => {
///         assert_eq!(p.header.page_type, PageType::Unrecognized(9999));
///         assert_eq!(p.body, Some(PageBody::Empty));
///         assert!(p.issues.is_empty());
///     }
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
pub fn decode_page(frame: &PageFrame) -> PageOutcome {
    let page_no = frame.page_no();
    let data = frame.data();
    let abort = |stage, reason| PageOutcome::Aborted {
        page_no,
        stage,
        reason,
    };

    if data.len() != PAGE_SIZE {
        return abort(
            Stage::Start,
            InnoError::Parse(format!(
                "Page {} is {} bytes, expected {}",
                page_no,
                data.len(),
                PAGE_SIZE
            )),
        );
    }

    let header = match FilHeader::parse(data) {
        Some(h) => h,
        None => {
            return abort(
                Stage::Start,
                InnoError::Parse(format!("Cannot decode FIL header of page {}", page_no)),
            )
        }
    };

    let trailer = match FilTrailer::parse(&data[FIL_PAGE_END_LSN_OLD_CHKSUM..]) {
        Some(t) => t,
        None => {
            return abort(
                Stage::HeaderDecoded,
                InnoError::Parse(format!("Cannot decode FIL trailer of page {}", page_no)),
            )
        }
    };
    if let Err(e) = header.check_trailer(&trailer, page_no) {
        return abort(Stage::HeaderDecoded, e);
    }

    let checksum = validate_checksum(data);
    let mut issues = Vec::new();
    let body = match decode_body(header.page_type, data, &mut issues) {
        Ok(body) => Some(body),
        Err(e) => {
            issues.push(e);
            None
        }
    };

    if let Some(PageBody::SpaceHeader(space)) = &body {
        let flagged = space.header.page_size_from_flags();
        if flagged as usize != PAGE_SIZE {
            warn!(
                page = page_no,
                flagged, "FSP flags declare a page size other than 16384"
            );
        }
    }

    let stage = if body.is_some() {
        Stage::BodyDecoded
    } else {
        Stage::TypeRouted
    };

    PageOutcome::Decoded(DecodedPage {
        page_no,
        header,
        trailer,
        checksum,
        stage,
        body,
        issues,
    })
}

fn decode_body(
    page_type: PageType,
    data: &[u8],
    issues: &mut Vec<InnoError>,
) -> Result<PageBody, InnoError> {
    match page_type {
        PageType::FspHdr => SpaceHeaderPage::decode(data, issues).map(PageBody::SpaceHeader),
        PageType::Xdes => Ok(PageBody::Xdes(XdesPage::decode(data, issues))),
        PageType::Inode => InodePage::decode(data, issues).map(PageBody::SegmentInodes),
        t if t.is_index_layout() => IndexPage::decode(data, issues).map(PageBody::Index),
        _ => Ok(PageBody::Empty),
    }
}

/// Aggregate counts for one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub start_page: u64,
    pub pages_scanned: u64,
    pub pages_decoded: u64,
    pub pages_aborted: u64,
    /// Decoded pages whose body decoder failed.
    pub bodies_failed: u64,
    pub issues: u64,
    /// Decoded pages per page type name.
    pub page_types: BTreeMap<String, u64>,
    pub cancelled: bool,
    /// The frame-source error that ended the scan early.
    pub terminated_by: Option<InnoError>,
}

impl ScanSummary {
    pub fn new(start_page: u64) -> Self {
        ScanSummary {
            start_page,
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: &PageOutcome) {
        self.pages_scanned += 1;
        self.issues += outcome.issue_count() as u64;
        match outcome {
            PageOutcome::Decoded(page) => {
                self.pages_decoded += 1;
                if page.body.is_none() {
                    self.bodies_failed += 1;
                }
                *self
                    .page_types
                    .entry(page.header.page_type.name().to_string())
                    .or_insert(0) += 1;
            }
            PageOutcome::Aborted { .. } => self.pages_aborted += 1,
        }
    }

    /// True if every page up to the end of the source was visited.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.terminated_by.is_none()
    }
}

fn log_outcome(outcome: &PageOutcome) {
    match outcome {
        PageOutcome::Decoded(page) => {
            debug!(
                page = page.page_no,
                page_type = %page.header.page_type,
                body = page.body.as_ref().map_or("failed", PageBody::name),
                "decoded page"
            );
            for issue in &page.issues {
                warn!(page = page.page_no, issue = %issue, "page issue");
            }
        }
        PageOutcome::Aborted {
            page_no,
            stage,
            reason,
        } => {
            warn!(page = page_no, stage = ?stage, reason = %reason, "page aborted");
        }
    }
}

/// Decode every page from `start` to the end of `source`, in order.
///
/// `cancel` is checked between pages. A sink error stops the scan and is
/// returned; a frame-source error stops it and is recorded in the summary.
pub fn scan<F>(
    source: &PageSource,
    start: u64,
    cancel: &AtomicBool,
    mut sink: F,
) -> Result<ScanSummary, InnoError>
where
    F: FnMut(PageOutcome) -> Result<(), InnoError>,
{
    info!(start, pages = source.page_count(), "scan started");
    let mut summary = ScanSummary::new(start);

    for frame in source.frames(start) {
        if cancel.load(Ordering::Relaxed) {
            summary.cancelled = true;
            break;
        }
        let frame = match frame {
            Ok(f) => f,
            Err(e) => {
                error!(error = %e, "scan stopped");
                summary.terminated_by = Some(e);
                break;
            }
        };
        let outcome = decode_page(&frame);
        log_outcome(&outcome);
        summary.record(&outcome);
        sink(outcome)?;
    }

    finish(&summary);
    Ok(summary)
}

/// Parallel variant of [`scan`] running on the current rayon pool.
///
/// Pages are read and decoded in batches; outcomes reach `sink` in
/// page-number order. `cancel` is checked before each outcome is handed
/// over, so pages decoded ahead of a cancellation are discarded.
#[cfg(feature = "cli")]
pub fn scan_parallel<F>(
    source: &PageSource,
    start: u64,
    cancel: &AtomicBool,
    mut sink: F,
) -> Result<ScanSummary, InnoError>
where
    F: FnMut(PageOutcome) -> Result<(), InnoError>,
{
    use rayon::prelude::*;

    let page_count = source.page_count();
    let batch = (rayon::current_num_threads() as u64 * 16).max(1);
    info!(start, pages = page_count, batch, "parallel scan started");
    let mut summary = ScanSummary::new(start);

    let mut next = start;
    'batches: while next < page_count {
        let end = (next + batch).min(page_count);
        let results: Vec<Result<PageOutcome, InnoError>> = (next..end)
            .into_par_iter()
            .map(|n| source.read_page(n).map(|frame| decode_page(&frame)))
            .collect();

        for result in results {
            if cancel.load(Ordering::Relaxed) {
                summary.cancelled = true;
                break 'batches;
            }
            match result {
                Ok(outcome) => {
                    log_outcome(&outcome);
                    summary.record(&outcome);
                    sink(outcome)?;
                }
                Err(e) => {
                    error!(error = %e, "scan stopped");
                    summary.terminated_by = Some(e);
                    break 'batches;
                }
            }
        }
        next = end;
    }

    if summary.is_complete() {
        // Reaches the trailing partial page, if any.
        if let Err(e) = source.next_frame(page_count.max(start)) {
            error!(error = %e, "scan stopped");
            summary.terminated_by = Some(e);
        }
    }

    finish(&summary);
    Ok(summary)
}

fn finish(summary: &ScanSummary) {
    if summary.cancelled {
        warn!(
            scanned = summary.pages_scanned,
            "scan cancelled before the end of the tablespace"
        );
    }
    info!(
        scanned = summary.pages_scanned,
        decoded = summary.pages_decoded,
        aborted = summary.pages_aborted,
        issues = summary.issues,
        "scan finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, ByteOrder};

    fn page(page_no: u32, page_type: u16, lsn: u64) -> Vec<u8> {
        let mut page = vec![0u8; PAGE_SIZE];
        BigEndian::write_u32(&mut page[FIL_PAGE_OFFSET..], page_no);
        BigEndian::write_u32(&mut page[FIL_PAGE_PREV..], FIL_NULL);
        BigEndian::write_u32(&mut page[FIL_PAGE_NEXT..], FIL_NULL);
        BigEndian::write_u64(&mut page[FIL_PAGE_LSN..], lsn);
        BigEndian::write_u16(&mut page[FIL_PAGE_TYPE..], page_type);
        BigEndian::write_u32(&mut page[PAGE_SIZE - 4..], lsn as u32);
        page
    }

    fn decoded(outcome: PageOutcome) -> DecodedPage {
        match outcome {
            PageOutcome::Decoded(p) => p,
            other => panic!("expected decoded page, got {:?}", other),
        }
    }

    #[test]
    fn test_space_header_page() {
        let data = page(0, 8, 1000);
        let p = decoded(decode_page(&PageFrame::new(0, data)));
        assert_eq!(p.header.page_type, PageType::FspHdr);
        assert!(p.issues.is_empty(), "{:?}", p.issues);
        match p.body {
            Some(PageBody::SpaceHeader(space)) => assert_eq!(space.extents.len(), XDES_PER_PAGE),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_routes_by_type() {
        let cases: [(u16, &str); 6] = [
            (9, "extent descriptors"),
            (3, "segment inodes"),
            (17855, "index"),
            (17853, "index"),
            (2, "empty"),
            (5, "empty"),
        ];
        for (code, expected) in cases {
            let p = decoded(decode_page(&PageFrame::new(1, page(1, code, 5))));
            assert_eq!(p.body.as_ref().map(PageBody::name), Some(expected), "type {}", code);
        }
    }

    #[test]
    fn test_unrecognized_type_is_empty_body() {
        let p = decoded(decode_page(&PageFrame::new(4, page(4, 9999, 7))));
        assert_eq!(p.header.page_type, PageType::Unrecognized(9999));
        assert_eq!(p.body, Some(PageBody::Empty));
        assert!(p.issues.is_empty());
    }

    #[test]
    fn test_lsn_mismatch_aborts_before_body() {
        let mut data = page(2, 17855, 0x1234);
        data[PAGE_SIZE - 1] ^= 0x01;
        match decode_page(&PageFrame::new(2, data)) {
            PageOutcome::Aborted {
                page_no,
                stage,
                reason,
            } => {
                assert_eq!(page_no, 2);
                assert_eq!(stage, Stage::HeaderDecoded);
                assert!(matches!(reason, InnoError::Corruption { page: 2, .. }));
            }
            other => panic!("expected abort, got {:?}", other),
        }
    }

    #[test]
    fn test_short_frame_aborts() {
        let outcome = decode_page(&PageFrame::new(0, vec![0u8; 100]));
        assert!(matches!(
            outcome,
            PageOutcome::Aborted {
                stage: Stage::Start,
                ..
            }
        ));
    }

    #[test]
    fn test_failed_index_body_keeps_header() {
        let mut data = page(3, 17855, 9);
        BigEndian::write_u16(&mut data[FIL_PAGE_DATA + PAGE_N_DIR_SLOTS..], u16::MAX);
        let p = decoded(decode_page(&PageFrame::new(3, data)));
        assert!(p.body.is_none());
        assert_eq!(p.stage, Stage::TypeRouted);
        assert!(matches!(p.issues[0], InnoError::DirectoryOverlap { .. }));
        assert_eq!(p.header.page_number, 3);
    }

    #[test]
    fn test_scan_collects_in_order() {
        let mut image = Vec::new();
        image.extend(page(0, 8, 10));
        image.extend(page(1, 3, 11));
        image.extend(page(2, 17855, 12));
        let source = PageSource::from_bytes(image);
        let cancel = AtomicBool::new(false);

        let mut seen = Vec::new();
        let summary = scan(&source, 0, &cancel, |o| {
            seen.push(o.page_no());
            Ok(())
        })
        .unwrap();

        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(summary.pages_scanned, 3);
        assert_eq!(summary.pages_decoded, 3);
        assert_eq!(summary.page_types.get("INODE"), Some(&1));
        assert!(summary.is_complete());
    }

    #[test]
    fn test_scan_continues_past_corrupt_page() {
        let mut image = Vec::new();
        image.extend(page(0, 8, 10));
        let mut bad = page(1, 17855, 11);
        bad[PAGE_SIZE - 2] ^= 0x80;
        image.extend(bad);
        image.extend(page(2, 2, 12));
        let source = PageSource::from_bytes(image);
        let cancel = AtomicBool::new(false);

        let summary = scan(&source, 0, &cancel, |_| Ok(())).unwrap();
        assert_eq!(summary.pages_scanned, 3);
        assert_eq!(summary.pages_aborted, 1);
        assert_eq!(summary.issues, 1);
    }

    #[test]
    fn test_scan_stops_on_truncated_frame() {
        let mut image = page(0, 8, 10);
        image.extend_from_slice(&[0u8; 512]);
        let source = PageSource::from_bytes(image);
        let cancel = AtomicBool::new(false);

        let summary = scan(&source, 0, &cancel, |_| Ok(())).unwrap();
        assert_eq!(summary.pages_scanned, 1);
        assert!(matches!(summary.terminated_by, Some(InnoError::Io(_))));
        assert!(!summary.is_complete());
    }

    #[test]
    fn test_scan_honors_cancel() {
        let source = PageSource::from_bytes(page(0, 8, 10).repeat(4));
        let cancel = AtomicBool::new(false);
        let summary = scan(&source, 0, &cancel, |o| {
            if o.page_no() == 1 {
                cancel.store(true, Ordering::Relaxed);
            }
            Ok(())
        })
        .unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.pages_scanned, 2);
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_parallel_scan_honors_cancel_mid_batch() {
        let source = PageSource::from_bytes(page(0, 8, 10).repeat(200));
        let cancel = AtomicBool::new(false);
        let mut seen = Vec::new();
        let summary = scan_parallel(&source, 0, &cancel, |o| {
            if o.page_no() == 1 {
                cancel.store(true, Ordering::Relaxed);
            }
            seen.push(o.page_no());
            Ok(())
        })
        .unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.pages_scanned, 2);
        assert_eq!(seen, vec![0, 1]);
        assert!(summary.terminated_by.is_none());
    }

    #[test]
    fn test_sink_error_propagates() {
        let source = PageSource::from_bytes(page(0, 8, 10).repeat(2));
        let cancel = AtomicBool::new(false);
        let result = scan(&source, 0, &cancel, |_| {
            Err(InnoError::Io("broken pipe".to_string()))
        });
        assert!(result.is_err());
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_parallel_matches_sequential() {
        let mut image = Vec::new();
        for n in 0..40u32 {
            let code = [8u16, 3, 17855, 2, 9][n as usize % 5];
            image.extend(page(n, code, 100 + n as u64));
        }
        image.extend_from_slice(&[0u8; 10]);
        let source = PageSource::from_bytes(image);
        let cancel = AtomicBool::new(false);

        let mut sequential = Vec::new();
        let seq = scan(&source, 3, &cancel, |o| {
            sequential.push(o);
            Ok(())
        })
        .unwrap();
        let mut parallel = Vec::new();
        let par = scan_parallel(&source, 3, &cancel, |o| {
            parallel.push(o);
            Ok(())
        })
        .unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(seq, par);
        assert_eq!(par.pages_scanned, 37);
        assert!(par.terminated_by.is_some());
    }
}
