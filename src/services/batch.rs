//! Batch conversion of page dumps.
//!
//! Files are processed in parallel on a rayon pool. Each worker owns its
//! file from parse to write; the pipeline context is shared read-only. A
//! page that fails extraction becomes a failure record and the batch moves
//! on. Outputs mirror the input tree below the inputs' common directory, so
//! equal file names in different folders never overwrite each other.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::export::ExportFormat;
use crate::extract::RawDocument;
use crate::pipeline::{self, PipelineContext};
use crate::types::Song;

/// File name of the batch summary written next to the outputs.
pub const REPORT_FILE: &str = "report.json";

/// Where and how to write a batch.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Output directory, created when missing.
    pub output_dir: PathBuf,
    /// Formats written per song.
    pub formats: Vec<ExportFormat>,
    /// Worker threads; `None` lets rayon decide.
    pub threads: Option<usize>,
}

/// One page or file that produced no songs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    /// Input file.
    pub path: PathBuf,
    /// Zero-based page, or `None` when the whole file failed.
    pub page: Option<usize>,
    /// Error message.
    pub error: String,
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Input files seen.
    pub files: usize,
    /// Pages converted.
    pub processed: usize,
    /// Pages or files that failed.
    pub failed: usize,
    /// Output files written.
    pub songs_written: usize,
    /// Warnings raised across all pages.
    pub warnings: usize,
    /// Every failure, in input order.
    pub failures: Vec<FailureRecord>,
    /// RFC 3339 completion time.
    pub finished_at: String,
}

#[derive(Debug, Default)]
struct FileOutcome {
    processed: usize,
    written: usize,
    warnings: usize,
    failures: Vec<FailureRecord>,
}

/// Page dumps under `input`: the file itself, or every `*.json` below a
/// directory in sorted order. Earlier reports are skipped.
pub fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(Error::io(
            std::io::Error::new(std::io::ErrorKind::NotFound, "input not found"),
            input.to_path_buf(),
        ));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .follow_links(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")))
        .filter(|e| e.file_name() != REPORT_FILE)
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();
    tracing::info!("Found {} page dump(s) under {}", files.len(), input.display());
    Ok(files)
}

/// Convert every input and write the outputs plus a report.
pub fn run_batch(inputs: &[PathBuf], ctx: &PipelineContext, options: &BatchOptions) -> Result<BatchReport> {
    fs_err::create_dir_all(&options.output_dir).map_err(|e| Error::io(e, options.output_dir.clone()))?;

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = options.threads {
        builder = builder.num_threads(threads);
    }
    let pool = builder
        .build()
        .map_err(|e| Error::Msg(format!("cannot start worker pool: {e}")))?;

    let root = common_root(inputs);
    let outcomes: Vec<(PathBuf, Result<FileOutcome>)> = pool.install(|| {
        inputs
            .par_iter()
            .map(|path| {
                let out_dir = output_dir_for(path, &root, &options.output_dir);
                (path.clone(), process_file(path, &out_dir, ctx, options))
            })
            .collect()
    });

    let mut report = BatchReport { files: inputs.len(), ..BatchReport::default() };
    for (path, outcome) in outcomes {
        match outcome {
            Ok(outcome) => {
                report.processed += outcome.processed;
                report.songs_written += outcome.written;
                report.warnings += outcome.warnings;
                report.failures.extend(outcome.failures);
            }
            Err(e) => {
                tracing::warn!("{}: {e}", path.display());
                report.failures.push(FailureRecord { path, page: None, error: e.to_string() });
            }
        }
    }
    report.failed = report.failures.len();
    report.finished_at = chrono::Local::now().to_rfc3339();

    write_report(&report, &options.output_dir)?;
    tracing::info!(
        "Batch done: {} page(s) processed, {} failed, {} file(s) written",
        report.processed,
        report.failed,
        report.songs_written
    );
    Ok(report)
}

/// Deepest directory holding every input.
fn common_root(inputs: &[PathBuf]) -> PathBuf {
    let mut parents = inputs.iter().filter_map(|p| p.parent());
    let Some(first) = parents.next() else {
        return PathBuf::new();
    };
    let mut root = first.to_path_buf();
    for parent in parents {
        while !parent.starts_with(&root) {
            if !root.pop() {
                return PathBuf::new();
            }
        }
    }
    root
}

/// Output directory for one input: its folder relative to `root`, under
/// `output_dir`.
fn output_dir_for(path: &Path, root: &Path, output_dir: &Path) -> PathBuf {
    path.parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .map_or_else(|| output_dir.to_path_buf(), |relative| output_dir.join(relative))
}

fn process_file(path: &Path, out_dir: &Path, ctx: &PipelineContext, options: &BatchOptions) -> Result<FileOutcome> {
    let doc = RawDocument::load(path)?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("song")
        .to_string();

    let mut outcome = FileOutcome::default();
    let mut songs: Vec<Song> = Vec::new();
    for page in pipeline::process_document(&doc, ctx) {
        outcome.warnings += page.diagnostics.len();
        match page.result {
            Ok(page_songs) => {
                outcome.processed += 1;
                songs.extend(page_songs);
            }
            Err(e) => outcome.failures.push(FailureRecord {
                path: path.to_path_buf(),
                page: Some(page.page),
                error: e.to_string(),
            }),
        }
    }

    if !songs.is_empty() {
        fs_err::create_dir_all(out_dir).map_err(|e| Error::io(e, out_dir.to_path_buf()))?;
    }
    let single = songs.len() == 1;
    for song in &songs {
        let base = if single {
            stem.clone()
        } else {
            format!("{stem}_p{}_{}", song.page + 1, song.region + 1)
        };
        for &format in &options.formats {
            let rendered = pipeline::export_with(song, format, ctx)?;
            let target = out_dir.join(format!("{base}.{}", format.extension()));
            fs_err::write(&target, rendered).map_err(|e| Error::io(e, target.clone()))?;
            outcome.written += 1;
        }
    }
    tracing::info!("{}: {} song(s) from {} page(s)", path.display(), songs.len(), doc.pages.len());
    Ok(outcome)
}

/// Write the report as pretty JSON into `dir`.
pub fn write_report(report: &BatchReport, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(REPORT_FILE);
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| Error::Export(format!("report: {e}")))?;
    fs_err::write(&path, json).map_err(|e| Error::io(e, path.clone()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn collects_json_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs_err::write(dir.path().join("b.json"), "[]").unwrap();
        fs_err::write(dir.path().join("a.json"), "[]").unwrap();
        fs_err::write(dir.path().join("notes.txt"), "").unwrap();
        fs_err::write(dir.path().join(REPORT_FILE), "{}").unwrap();

        let files = collect_inputs(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|p| p.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn outputs_mirror_input_folders() {
        let inputs = vec![PathBuf::from("in/hr/psalam.json"), PathBuf::from("in/sl/psalam.json")];
        let root = common_root(&inputs);
        assert_eq!(root, PathBuf::from("in"));
        let out = Path::new("out");
        assert_eq!(output_dir_for(&inputs[0], &root, out), PathBuf::from("out/hr"));
        assert_eq!(output_dir_for(&inputs[1], &root, out), PathBuf::from("out/sl"));
    }

    #[test]
    fn single_input_writes_flat() {
        let inputs = vec![PathBuf::from("in/hr/psalam.json")];
        let root = common_root(&inputs);
        assert_eq!(output_dir_for(&inputs[0], &root, Path::new("out")), PathBuf::from("out"));
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let err = collect_inputs(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
