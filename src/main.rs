//! `songbook` - convert songbook page dumps to ChordPro, HTML and text.
//!
//! Usage:
//!   `songbook <input-file-or-dir> [--out DIR] [--lang CODE] [--lang-dir DIR]
//!             [--format chordpro|html|text|json|all] [--threads N] [--verbose]`
//!
//! Flags override the `SONGBOOK_*` environment variables and `.env`.

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};
use songbook::config::{expand_path, Config};
use songbook::export::ExportFormat;
use songbook::pipeline::PipelineContext;
use songbook::services::batch::{collect_inputs, run_batch, BatchOptions};

const USAGE: &str = "Usage: songbook <input-file-or-dir> [--out DIR] [--lang CODE] [--lang-dir DIR] \
                     [--format chordpro|html|text|json|all] [--threads N] [--verbose]";

struct Args {
    input: PathBuf,
    out: Option<PathBuf>,
    lang: Option<String>,
    lang_dir: Option<PathBuf>,
    formats: Option<Vec<ExportFormat>>,
    threads: Option<usize>,
    verbose: bool,
}

fn parse_args(args: &[String]) -> anyhow::Result<Args> {
    let mut input = None;
    let mut parsed = Args {
        input: PathBuf::new(),
        out: None,
        lang: None,
        lang_dir: None,
        formats: None,
        threads: None,
        verbose: false,
    };

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let arg = arg.as_str();
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .with_context(|| format!("{flag} needs a value"))
        };
        match arg {
            "--out" | "-o" => parsed.out = Some(expand_path(&value(arg)?)),
            "--lang" | "-l" => parsed.lang = Some(value(arg)?.to_lowercase()),
            "--lang-dir" => parsed.lang_dir = Some(expand_path(&value(arg)?)),
            "--format" | "-f" => parsed.formats = Some(ExportFormat::parse_list(&value(arg)?)?),
            "--threads" | "-j" => {
                let n: usize = value(arg)?.parse().context("--threads needs a number")?;
                parsed.threads = (n > 0).then_some(n);
            }
            "--verbose" | "-v" => parsed.verbose = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            flag if flag.starts_with('-') => bail!("unknown flag {flag}\n{USAGE}"),
            path if input.is_none() => input = Some(expand_path(path)),
            extra => bail!("unexpected argument {extra}\n{USAGE}"),
        }
    }

    parsed.input = input.with_context(|| USAGE.to_string())?;
    Ok(parsed)
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let args = parse_args(&args)?;

    let level = if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load()?;
    if let Some(lang) = args.lang {
        config.language = lang;
    }
    if args.lang_dir.is_some() {
        config.language_dir = args.lang_dir;
    }
    if let Some(out) = args.out {
        config.output_dir = out;
    }
    if let Some(formats) = args.formats {
        config.formats = formats;
    }
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    tracing::info!("{} {} (language {})", config.app_name(), config.app_version(), config.language);

    let ctx = PipelineContext::from_config(&config)?;
    let inputs = collect_inputs(&args.input)?;
    if inputs.is_empty() {
        bail!("no page dumps found under {}", args.input.display());
    }

    let options = BatchOptions {
        output_dir: config.output_dir.clone(),
        formats: config.formats.clone(),
        threads: config.threads,
    };
    let report = run_batch(&inputs, &ctx, &options)?;

    println!(
        "{} page(s) processed, {} failed, {} file(s) written to {}",
        report.processed,
        report.failed,
        report.songs_written,
        options.output_dir.display()
    );
    for failure in &report.failures {
        match failure.page {
            Some(page) => eprintln!("  {} page {}: {}", failure.path.display(), page + 1, failure.error),
            None => eprintln!("  {}: {}", failure.path.display(), failure.error),
        }
    }
    Ok(())
}
