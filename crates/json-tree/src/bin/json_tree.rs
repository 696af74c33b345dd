//! `json-tree`: view and restructure a flat JSON array as a tree.
//!
//! Usage:
//!   json-tree <command> [args] [--id KEY] [--children KEY] [--depth KEY] [--label KEY]
//!
//! The document is read from stdin; see `json_tree::cli` for the commands.
//! Logs go to stderr, filtered by `RUST_LOG` (default `json_tree=warn`).

use json_tree::cli::{parse_args, run};
use std::io::{self, Read, Write};
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("json_tree=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match parse_args(&args) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let mut buf = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buf) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    match run(&invocation, &buf) {
        Ok(output) => {
            let mut stdout = io::stdout();
            let written = stdout
                .write_all(output.as_bytes())
                .and_then(|()| if output.ends_with('\n') { Ok(()) } else { stdout.write_all(b"\n") });
            if let Err(e) = written {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
