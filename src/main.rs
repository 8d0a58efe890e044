#[cfg(not(feature = "cli"))]
compile_error!("The `innoread` binary requires the `cli` feature. Build with `--features cli`.");

use clap::{CommandFactory, Parser};
use std::fs::File;
use std::io::Write;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use innoread::cli;
use innoread::cli::app::{Cli, ColorMode};
use innoread::innodb::layout::verify_layouts;
use innoread::InnoError;

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Err(e) = verify_layouts() {
        error!(error = %e, "on-disk layout check failed");
        eprintln!("Error: {}", e);
        process::exit(2);
    }

    let path = match cli.path.as_deref() {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => {
            let mut cmd = Cli::command();
            let _ = cmd.print_help();
            println!();
            return;
        }
    };

    // Configure rayon thread pool if --threads was specified
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .ok(); // Ignore if already initialized
    }

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {} // colored auto-detects tty
    }

    let writer_result: Result<Box<dyn Write>, InnoError> = match &cli.output {
        Some(out) => File::create(out)
            .map(|f| Box::new(f) as Box<dyn Write>)
            .map_err(|e| InnoError::Io(format!("Cannot create {}: {}", out, e))),
        None => Ok(Box::new(std::io::stdout()) as Box<dyn Write>),
    };

    let mut writer = match writer_result {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        debug!(error = %e, "Ctrl-C handler not installed");
    }

    let result = cli::scan::execute(
        &cli::scan::ScanOptions {
            path,
            page: cli.page,
            start: cli.start,
            verbose: cli.verbose,
            json: cli.json,
            threads: cli.threads,
            mmap: cli.mmap,
            cancel,
        },
        &mut writer,
    );

    let flushed = writer
        .flush()
        .map_err(|e| InnoError::Io(format!("Cannot flush output: {}", e)));

    if let Err(e) = result.and(flushed) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
