use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use colored::Colorize;
use serde::Serialize;

use crate::cli::{create_progress_bar, open_source, wprint, wprintln};
use crate::innodb::checksum::ChecksumAlgorithm;
use crate::innodb::constants::PAGE_SIZE;
use crate::innodb::fsp::{extent_first_page, FspHeader, XdesEntry};
use crate::innodb::index::{IndexPage, SystemRecord};
use crate::innodb::inode::{InodePage, InodeSlot};
use crate::innodb::page_types::PageType;
use crate::innodb::scan::{self, decode_page, DecodedPage, PageBody, PageOutcome, ScanSummary};
use crate::innodb::tablespace::PageSource;
use crate::util::hex::{
    format_bytes, format_extent_bitmap, format_hex32, format_hex64, format_offset, format_page_ref,
};
use crate::InnoError;

/// Options for a tablespace scan.
#[derive(Default)]
pub struct ScanOptions {
    /// Path to the tablespace file.
    pub path: String,
    /// Decode only this page.
    pub page: Option<u64>,
    /// First page of a full scan.
    pub start: u64,
    pub verbose: bool,
    pub json: bool,
    /// Decode on the rayon pool when non-zero.
    pub threads: usize,
    pub mmap: bool,
    /// Set from outside (Ctrl-C) to stop between pages.
    pub cancel: Arc<AtomicBool>,
}

/// JSON document for a full scan.
#[derive(Serialize)]
struct ScanReport<'a> {
    path: &'a str,
    file_size: u64,
    page_count: u64,
    pages: Vec<PageOutcome>,
    summary: ScanSummary,
}

/// Decode a tablespace and write the report to `writer`.
///
/// In **single-page mode** (`--page N`) only that page is read, by random
/// access, and printed. In **full-file mode** every page from `--start` to
/// the end is decoded in order and a summary follows: pages scanned,
/// decoded and aborted, issue count, and a per-type table.
///
/// Per-page problems are part of the report and do not fail the command.
/// A file that ends in a partial page is reported up to that point and then
/// fails with the `Io` error.
pub fn execute(opts: &ScanOptions, writer: &mut dyn Write) -> Result<(), InnoError> {
    let source = open_source(&opts.path, opts.mmap)?;

    if let Some(page_no) = opts.page {
        let frame = source.read_page(page_no)?;
        let outcome = decode_page(&frame);
        if opts.json {
            let json = serde_json::to_string_pretty(&outcome)
                .map_err(|e| InnoError::Parse(format!("JSON serialization error: {}", e)))?;
            wprintln!(writer, "{}", json)?;
        } else {
            print_outcome(writer, &outcome, opts.verbose)?;
        }
        return Ok(());
    }

    if opts.start > 0 && opts.start >= source.page_count() {
        return Err(InnoError::Argument(format!(
            "Start page {} out of range (tablespace has {} pages)",
            opts.start,
            source.page_count()
        )));
    }

    let summary = if opts.json {
        let mut pages = Vec::new();
        let summary = run_scan(opts, &source, |outcome| {
            pages.push(outcome);
            Ok(())
        })?;
        let report = ScanReport {
            path: &opts.path,
            file_size: source.file_size(),
            page_count: source.page_count(),
            pages,
            summary: summary.clone(),
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| InnoError::Parse(format!("JSON serialization error: {}", e)))?;
        wprintln!(writer, "{}", json)?;
        summary
    } else {
        wprintln!(
            writer,
            "Pages in {} ({} pages, {} bytes):",
            opts.path,
            source.page_count(),
            source.file_size()
        )?;
        wprintln!(writer, "{}", "-".repeat(50))?;

        let pb = create_progress_bar(source.page_count().saturating_sub(opts.start), "pages");
        let summary = run_scan(opts, &source, |outcome| {
            pb.inc(1);
            print_outcome(writer, &outcome, opts.verbose)
        });
        pb.finish_and_clear();
        let summary = summary?;
        print_summary(writer, &summary)?;
        summary
    };

    match summary.terminated_by {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn run_scan<F>(opts: &ScanOptions, source: &PageSource, sink: F) -> Result<ScanSummary, InnoError>
where
    F: FnMut(PageOutcome) -> Result<(), InnoError>,
{
    if opts.threads > 0 {
        scan::scan_parallel(source, opts.start, &opts.cancel, sink)
    } else {
        scan::scan(source, opts.start, &opts.cancel, sink)
    }
}

fn print_outcome(
    writer: &mut dyn Write,
    outcome: &PageOutcome,
    verbose: bool,
) -> Result<(), InnoError> {
    match outcome {
        PageOutcome::Decoded(page) => print_page(writer, page, verbose),
        PageOutcome::Aborted {
            page_no,
            stage,
            reason,
        } => {
            wprintln!(writer, "Page: {}", page_no)?;
            wprintln!(writer, "{}", "-".repeat(20))?;
            wprintln!(
                writer,
                "{} after {:?}: {}",
                "ABORTED".red().bold(),
                stage,
                reason
            )?;
            wprintln!(writer, "{}", "-".repeat(20))?;
            Ok(())
        }
    }
}

fn print_page(writer: &mut dyn Write, page: &DecodedPage, verbose: bool) -> Result<(), InnoError> {
    let header = &page.header;
    let pt = header.page_type;

    wprintln!(writer, "Page: {}", page.page_no)?;
    wprintln!(writer, "{}", "-".repeat(20))?;
    wprintln!(writer, "{}", "HEADER".bold())?;
    wprintln!(
        writer,
        "Byte Start: {}",
        format_offset(page.page_no * PAGE_SIZE as u64)
    )?;
    wprintln!(
        writer,
        "Page Type: {}\n-- {}: {} - {}",
        pt.as_u16(),
        pt.name(),
        pt.description(),
        pt.usage()
    )?;
    if header.page_number as u64 != page.page_no {
        wprintln!(
            writer,
            "Page Number Field: {} {}",
            header.page_number,
            "(does not match position)".yellow()
        )?;
    }

    wprint!(writer, "Prev Page: ")?;
    if !header.has_prev() {
        wprintln!(writer, "Not used.")?;
    } else {
        wprintln!(writer, "{}", header.prev_page)?;
    }

    wprint!(writer, "Next Page: ")?;
    if !header.has_next() {
        wprintln!(writer, "Not used.")?;
    } else {
        wprintln!(writer, "{}", header.next_page)?;
    }

    wprintln!(writer, "LSN: {}", header.lsn)?;
    wprintln!(writer, "Space ID: {}", header.space_id)?;
    wprintln!(writer, "Checksum: {}", format_hex32(header.checksum))?;

    let csum = &page.checksum;
    let status = if csum.valid {
        "OK".green().to_string()
    } else {
        "MISMATCH".red().to_string()
    };
    let algorithm = match csum.algorithm {
        ChecksumAlgorithm::Crc32c => "crc32c",
        ChecksumAlgorithm::InnoDB => "innodb",
        ChecksumAlgorithm::None => "none",
        ChecksumAlgorithm::Empty => "empty page",
    };
    wprintln!(writer, "Checksum Status: {} ({})", status, algorithm)?;
    if verbose {
        wprintln!(
            writer,
            "  stored={} calculated={}",
            format_hex32(csum.stored_checksum),
            format_hex32(csum.calculated_checksum)
        )?;
        if matches!(
            pt,
            PageType::PageCompressed | PageType::PageCompressedEncrypted
        ) {
            wprintln!(
                writer,
                "Compression: version={} algorithm={} original_type={} original_size={} compressed_size={}",
                header.compression_version(),
                header.compression_algorithm(),
                PageType::from_u16(header.compression_original_type()).name(),
                header.compression_original_size(),
                header.compression_compressed_size()
            )?;
        } else if header.flush_lsn != 0 {
            wprintln!(writer, "Flush LSN: {}", format_hex64(header.flush_lsn))?;
        }
    }

    wprintln!(writer, "{}", "TRAILER".bold())?;
    wprintln!(writer, "Old-style Checksum: {}", format_hex32(page.trailer.checksum))?;
    wprintln!(writer, "Low 32 bits of LSN: {}", page.trailer.lsn_low32)?;

    match &page.body {
        Some(body) => print_body(writer, header.page_number, body, verbose)?,
        None => wprintln!(writer, "{}", "BODY NOT DECODED".red())?,
    }

    for issue in &page.issues {
        wprintln!(writer, "{} {}", "Issue:".yellow(), issue)?;
    }
    wprintln!(writer, "{}", "-".repeat(20))?;
    Ok(())
}

fn print_body(
    writer: &mut dyn Write,
    page_number: u32,
    body: &PageBody,
    verbose: bool,
) -> Result<(), InnoError> {
    match body {
        PageBody::SpaceHeader(space) => {
            print_fsp_header(writer, &space.header)?;
            print_extents(writer, page_number, &space.extents, verbose)
        }
        PageBody::Xdes(xdes) => {
            wprintln!(writer, "{}", "XDES - Extent Descriptors".bold())?;
            print_extents(writer, page_number, &xdes.extents, verbose)
        }
        PageBody::SegmentInodes(inodes) => print_inodes(writer, inodes, verbose),
        PageBody::Index(index) => print_index(writer, index, verbose),
        PageBody::Empty => Ok(()),
    }
}

fn print_fsp_header(writer: &mut dyn Write, fsp: &FspHeader) -> Result<(), InnoError> {
    wprintln!(writer, "{}", "FSP_HDR - Filespace Header".bold())?;
    wprintln!(writer, "Space ID: {}", fsp.space_id)?;
    wprintln!(writer, "Size (pages): {}", fsp.size)?;
    wprintln!(writer, "Page Free Limit: {}", fsp.free_limit)?;
    wprintln!(
        writer,
        "Flags: {} (page size {})",
        format_hex32(fsp.flags),
        fsp.page_size_from_flags()
    )?;
    wprintln!(writer, "Fragment Pages Used: {}", fsp.frag_n_used)?;
    wprintln!(writer, "Next Segment ID: {}", fsp.seg_id)?;
    wprintln!(writer, "FSP_FREE: {}", fsp.free)?;
    wprintln!(writer, "FSP_FREE_FRAG: {}", fsp.free_frag)?;
    wprintln!(writer, "FSP_FULL_FRAG: {}", fsp.full_frag)?;
    wprintln!(writer, "FSP_SEG_INODES_FULL: {}", fsp.seg_inodes_full)?;
    wprintln!(writer, "FSP_SEG_INODES_FREE: {}", fsp.seg_inodes_free)?;
    Ok(())
}

fn print_extents(
    writer: &mut dyn Write,
    descriptor_page: u32,
    extents: &[XdesEntry],
    verbose: bool,
) -> Result<(), InnoError> {
    let initialized = extents.iter().filter(|e| e.state_raw != 0).count();
    wprintln!(
        writer,
        "Extent Descriptors: {} ({} initialized)",
        extents.len(),
        initialized
    )?;
    if !verbose {
        return Ok(());
    }
    for (i, entry) in extents.iter().enumerate() {
        if entry.state_raw == 0 {
            continue;
        }
        wprintln!(
            writer,
            "  [{:3}] pages {:>6}+  {:<10} seg={} free={:2} {}",
            i,
            extent_first_page(descriptor_page, i),
            entry.state().to_string(),
            entry.seg_id,
            entry.free_page_count(),
            format_extent_bitmap(entry)
        )?;
    }
    Ok(())
}

fn print_inodes(writer: &mut dyn Write, inodes: &InodePage, verbose: bool) -> Result<(), InnoError> {
    wprintln!(writer, "{}", "INODE - File Segment Inodes".bold())?;
    wprintln!(
        writer,
        "List Node: prev={} next={}",
        inodes.node.prev,
        inodes.node.next
    )?;
    let used = inodes
        .slots
        .iter()
        .filter(|s| matches!(s, InodeSlot::Valid(_) | InodeSlot::Suspect(_)))
        .count();
    wprintln!(
        writer,
        "Slots: {} ({} used, {} suspect)",
        inodes.slots.len(),
        used,
        inodes.suspect_count()
    )?;
    if !verbose {
        return Ok(());
    }
    for (i, slot) in inodes.slots.iter().enumerate() {
        let (label, entry) = match slot {
            InodeSlot::Valid(e) => ("OK".green().to_string(), e),
            InodeSlot::Suspect(e) => ("BAD MAGIC".red().to_string(), e),
            InodeSlot::Unused(_) => continue,
            InodeSlot::Truncated => {
                wprintln!(writer, "  [{:2}] {}", i, "TRUNCATED".red())?;
                continue;
            }
        };
        let frags: Vec<String> = entry
            .used_fragment_pages()
            .iter()
            .map(|p| format_page_ref(*p))
            .collect();
        wprintln!(
            writer,
            "  [{:2}] seg={} {} not_full_used={} free={} not_full={} full={} frags=[{}]",
            i,
            entry.seg_id,
            label,
            entry.not_full_n_used,
            entry.free.len,
            entry.not_full.len,
            entry.full.len,
            frags.join(",")
        )?;
    }
    Ok(())
}

fn print_system_record(
    writer: &mut dyn Write,
    name: &str,
    rec: &SystemRecord,
) -> Result<(), InnoError> {
    let h = &rec.header;
    wprintln!(
        writer,
        "{}: \"{}\" ({}) n_owned={} heap_no={} type={} next={} info_bits={}",
        name,
        rec.text(),
        format_bytes(&rec.data),
        h.n_owned(),
        h.heap_no(),
        h.record_type_name(),
        h.next_record,
        h.info_bits()
    )
}

fn print_index(writer: &mut dyn Write, index: &IndexPage, verbose: bool) -> Result<(), InnoError> {
    let hdr = &index.header;
    wprintln!(writer, "{}", "INDEX - B+Tree Node".bold())?;
    wprintln!(writer, "Index ID: {}", hdr.index_id)?;
    wprintln!(
        writer,
        "Level: {}{}",
        hdr.level,
        if index.is_leaf() { " (leaf)" } else { "" }
    )?;
    wprintln!(writer, "Format: {}", index.page_format())?;
    wprintln!(
        writer,
        "Records: {} user, {} in heap",
        hdr.n_recs,
        index.heap_record_count()
    )?;
    wprintln!(writer, "Heap Top: {}", hdr.heap_top)?;
    wprintln!(writer, "Garbage: {} bytes", hdr.garbage)?;
    wprintln!(
        writer,
        "Last Insert: {} ({}, {} in a row)",
        hdr.last_insert,
        index.direction(),
        hdr.n_direction
    )?;
    wprintln!(writer, "Max Trx ID: {}", hdr.max_trx_id)?;
    wprintln!(
        writer,
        "Leaf Segment: space={} page={} offset={}",
        index.seg_leaf.space_id,
        format_page_ref(index.seg_leaf.page_no),
        index.seg_leaf.offset
    )?;
    wprintln!(
        writer,
        "Top Segment: space={} page={} offset={}",
        index.seg_top.space_id,
        format_page_ref(index.seg_top.page_no),
        index.seg_top.offset
    )?;
    print_system_record(writer, "Infimum", &index.infimum)?;
    print_system_record(writer, "Supremum", &index.supremum)?;
    wprintln!(
        writer,
        "Directory Slots: {} at {}",
        index.dir_slots.len(),
        format_offset(index.directory_offset() as u64)
    )?;
    if verbose && !index.dir_slots.is_empty() {
        let slots: Vec<String> = index.dir_slots.iter().map(|s| s.to_string()).collect();
        wprintln!(writer, "  [{}]", slots.join(", "))?;
    }
    Ok(())
}

fn print_summary(writer: &mut dyn Write, summary: &ScanSummary) -> Result<(), InnoError> {
    wprintln!(writer)?;
    wprintln!(writer, "{}", "Scan Summary".bold())?;
    wprintln!(writer, "  Pages scanned: {}", summary.pages_scanned)?;
    wprintln!(writer, "  Decoded:       {}", summary.pages_decoded)?;
    wprintln!(writer, "  Aborted:       {}", summary.pages_aborted)?;
    wprintln!(writer, "  Body failures: {}", summary.bodies_failed)?;
    wprintln!(writer, "  Issues:        {}", summary.issues)?;

    if !summary.page_types.is_empty() {
        wprintln!(writer)?;
        wprintln!(writer, "{}", "Page Type Summary".bold())?;
        let mut sorted: Vec<_> = summary.page_types.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (name, count) in sorted {
            let label = if *count == 1 { "page" } else { "pages" };
            wprintln!(writer, "  {:20} {:>6} {}", name, count, label)?;
        }
    }

    if summary.cancelled {
        wprintln!(writer, "{}", "Scan cancelled.".yellow())?;
    }
    if let Some(e) = &summary.terminated_by {
        wprintln!(writer, "{} {}", "Scan stopped:".red(), e)?;
    }
    Ok(())
}
