use clap::CommandFactory;
use clap_mangen::Man;
use std::path::PathBuf;

// Include the CLI definition from the library crate
include!("src/cli/app.rs");

fn main() {
    let out_dir =
        PathBuf::from(std::env::var("OUT_DIR").unwrap_or_else(|_| "target/man".to_string()));
    let man_dir = out_dir.join("man");
    std::fs::create_dir_all(&man_dir).unwrap();

    let mut buf = Vec::new();
    Man::new(Cli::command()).render(&mut buf).unwrap();
    std::fs::write(man_dir.join("innoread.1"), buf).unwrap();

    println!("cargo:rerun-if-changed=src/cli/app.rs");
}
