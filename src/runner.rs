//! Applies the transformation to files on disk: collects sources, shows a
//! diff for each changed file, optionally asks before writing it back.

use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::diff;
use crate::error::{Error, Result};
use crate::processor::Transformer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Ask before writing each changed file
    pub interactive: bool,
    /// Write changes back; otherwise only print diffs
    pub write: bool,
}

impl Options {
    /// Map the command-line switches: `--no-write` implies no prompting.
    pub fn from_flags(no_input: bool, no_write: bool) -> Self {
        Self {
            interactive: !no_input && !no_write,
            write: !no_write,
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interactive: true,
            write: true,
        }
    }
}

/// Totals over one run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub files: usize,
    pub changed: usize,
    pub written: usize,
    pub rewritten: usize,
    pub skipped: usize,
    /// Files that could not be read, parsed or written, plus failed rewrites
    pub errors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Yes,
    No,
    All,
    Quit,
}

pub struct Runner {
    options: Options,
    transformer: Transformer,
}

impl Runner {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            transformer: Transformer::default(),
        }
    }

    /// Transform every Python source under `paths`. Diffs and prompts go to
    /// `output`, answers are read from `input`.
    pub fn run<R: BufRead, W: Write>(&self, paths: &[PathBuf], mut input: R, mut output: W) -> Result<Summary> {
        let sources = collect_sources(paths)?;
        let mut summary = Summary::default();
        let mut ask = self.options.interactive && self.options.write;

        for path in &sources {
            summary.files += 1;

            let source = match fs::read_to_string(path) {
                Ok(source) => source,
                Err(source) => {
                    error!("{}", Error::Read { path: path.clone(), source });
                    summary.errors += 1;
                    continue;
                }
            };

            let transformation = match self.transformer.transform(&source) {
                Ok(transformation) => transformation,
                Err(e) => {
                    error!(path = %path.display(), "{e}");
                    summary.errors += 1;
                    continue;
                }
            };
            summary.rewritten += transformation.rewritten;
            summary.skipped += transformation.skipped;
            summary.errors += transformation.failed;

            if !transformation.is_changed() {
                debug!(path = %path.display(), "no changes");
                continue;
            }
            summary.changed += 1;

            let label = path.display().to_string();
            let patch = diff::unified(&source, &transformation.output, &label, &label);
            output.write_all(patch.as_bytes()).map_err(Error::Console)?;

            if !self.options.write {
                continue;
            }

            if ask {
                match prompt(&mut input, &mut output, path)? {
                    Answer::Yes => {}
                    Answer::No => continue,
                    Answer::All => ask = false,
                    Answer::Quit => {
                        info!("stopping at user request");
                        break;
                    }
                }
            }

            match fs::write(path, &transformation.output) {
                Ok(()) => {
                    info!(path = %path.display(), rewritten = transformation.rewritten, "wrote changes");
                    summary.written += 1;
                }
                Err(source) => {
                    error!("{}", Error::Write { path: path.clone(), source });
                    summary.errors += 1;
                }
            }
        }

        Ok(summary)
    }
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, path: &Path) -> Result<Answer> {
    loop {
        write!(output, "Apply these changes to {}? [y,n,a,q] ", path.display()).map_err(Error::Console)?;
        output.flush().map_err(Error::Console)?;

        let mut line = String::new();
        if input.read_line(&mut line).map_err(Error::Console)? == 0 {
            return Ok(Answer::Quit);
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(Answer::Yes),
            "n" | "no" => return Ok(Answer::No),
            "a" | "all" => return Ok(Answer::All),
            "q" | "quit" => return Ok(Answer::Quit),
            other => warn!("unrecognised answer {other:?}"),
        }
    }
}

/// Expand `paths` into the files to process: files as given, directories
/// searched recursively for `*.py` in file name order. Symlinks inside a
/// directory are not followed into.
pub fn collect_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for path in paths {
        let metadata = fs::metadata(path).map_err(|source| Error::Read {
            path: path.clone(),
            source,
        })?;
        if !metadata.is_dir() {
            sources.push(path.clone());
            continue;
        }

        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let failed = e.path().unwrap_or(path.as_path()).to_path_buf();
                Error::Read {
                    path: failed,
                    source: e.into(),
                }
            })?;
            if !entry.file_type().is_dir() && entry.path().extension().is_some_and(|ext| ext == "py") {
                sources.push(entry.into_path());
            }
        }
    }
    Ok(sources)
}
