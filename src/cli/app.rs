use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[command(name = "innoread")]
#[command(about = "Decode the pages of an InnoDB tablespace file")]
#[command(version)]
pub struct Cli {
    /// Path to InnoDB data file (.ibd or ibdata1)
    #[arg(short, long)]
    pub path: Option<String>,

    /// Decode a single page number
    #[arg(long, conflicts_with = "start")]
    pub page: Option<u64>,

    /// Start a full scan at this page number
    #[arg(long, default_value_t = 0)]
    pub start: u64,

    /// Show extent descriptors, inode slots and directory slots in full
    #[arg(short, long)]
    pub verbose: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Decode pages in parallel on this many threads (0 = sequential)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Use memory-mapped I/O for file access
    #[arg(long)]
    pub mmap: bool,

    /// Control colored output
    #[arg(long, default_value = "auto")]
    pub color: ColorMode,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    /// Log filter for diagnostics on stderr (e.g. warn, debug, innoread=trace)
    #[arg(long = "log-level", default_value = "warn")]
    pub log_level: String,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}
