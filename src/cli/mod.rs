//! Command-line front end for the `innoread` binary.
//!
//! Argument parsing uses clap derive macros. The [`app::Cli`] struct is
//! defined in [`app`] and shared between `main.rs` and `build.rs` (for man
//! page generation) via `include!()`. `main.rs` converts it into a
//! [`scan::ScanOptions`] and calls [`scan::execute`], which writes the
//! report to any `&mut dyn Write` so output can be captured in tests or
//! redirected with `--output`.
//!
//! The `wprintln!` and `wprint!` macros wrap `writeln!`/`write!` to convert
//! `io::Error` into `InnoError`.

pub mod app;
pub mod scan;

/// Write a line to the given writer, converting io::Error to InnoError.
macro_rules! wprintln {
    ($w:expr) => {
        writeln!($w).map_err(|e| $crate::InnoError::Io(e.to_string()))
    };
    ($w:expr, $($arg:tt)*) => {
        writeln!($w, $($arg)*).map_err(|e| $crate::InnoError::Io(e.to_string()))
    };
}

/// Write (without newline) to the given writer, converting io::Error to InnoError.
macro_rules! wprint {
    ($w:expr, $($arg:tt)*) => {
        write!($w, $($arg)*).map_err(|e| $crate::InnoError::Io(e.to_string()))
    };
}

pub(crate) use wprint;
pub(crate) use wprintln;

use crate::innodb::tablespace::PageSource;
use crate::InnoError;
use indicatif::{ProgressBar, ProgressStyle};

/// Open a tablespace file, selecting mmap or buffered I/O based on the flag.
pub(crate) fn open_source(path: &str, use_mmap: bool) -> Result<PageSource, InnoError> {
    if use_mmap {
        PageSource::open_mmap(path)
    } else {
        PageSource::open(path)
    }
}

/// Create a styled progress bar for iterating over pages.
pub(crate) fn create_progress_bar(count: u64, unit: &str) -> ProgressBar {
    let pb = ProgressBar::new(count);
    let template = format!(
        "{{spinner:.green}} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{eta}})",
        unit
    );
    let style = ProgressStyle::default_bar()
        .template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}
