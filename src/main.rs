//! Usage: `fstringify [--no-input] [--no-write] <FILES>...`

use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use fstringify::{Options, Runner};

#[derive(Parser, Debug)]
#[command(name = "fstringify")]
#[command(about = "Rewrite '%s' % name interpolation into f-strings")]
struct Args {
    /// Write every change without asking
    #[arg(long = "no-input")]
    no_input: bool,

    /// Only print diffs, leave files untouched
    #[arg(long = "no-write")]
    no_write: bool,

    /// Python files or directories to search for them
    #[arg(required = true, num_args = 1..)]
    files: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    fstringify::init_logging();

    let args = Args::parse();
    let options = Options::from_flags(args.no_input, args.no_write);

    let stdin = io::stdin();
    let summary = Runner::new(options)
        .run(&args.files, stdin.lock(), io::stdout())
        .context("fstringify failed")?;

    info!(
        files = summary.files,
        changed = summary.changed,
        written = summary.written,
        rewritten = summary.rewritten,
        skipped = summary.skipped,
        "done"
    );

    if summary.errors > 0 {
        process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_flags_and_files() {
        let args = Args::try_parse_from(["fstringify", "--no-write", "a.py", "pkg"]).unwrap();
        assert!(!args.no_input);
        assert!(args.no_write);
        assert_eq!(args.files, vec![PathBuf::from("a.py"), PathBuf::from("pkg")]);

        let options = Options::from_flags(args.no_input, args.no_write);
        assert!(!options.interactive);
        assert!(!options.write);
    }

    #[test]
    fn test_args_require_a_path() {
        assert!(Args::try_parse_from(["fstringify", "--no-input"]).is_err());
    }
}
