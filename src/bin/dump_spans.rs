//! Debug tool to show how a page dump is read.
//!
//! Usage:
//!   `cargo run --bin dump_spans -- <page.json> [--lang CODE] [--page N]`
//!
//! Prints each layout region with its classified tokens, the rebuilt lines
//! and any warnings, to track down mis-detected chords or roles.

// Development/debug binary - allow expect/unwrap for simpler error handling
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::env;
use std::path::Path;

use songbook::chords::{detect_tokens, ChordDetector, FontConvention};
use songbook::classify::{classify_rows, repair_lyrics};
use songbook::config::PipelineSettings;
use songbook::error::Diagnostics;
use songbook::export::chordpro::inline_chords;
use songbook::extract::{extract_spans, PageSource, RawDocument};
use songbook::language::LanguageConfig;
use songbook::layout::partition;
use songbook::types::Span;
use songbook::verse::{build_verses, group_rows};

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <page.json> [--lang CODE] [--page N]", args[0]);
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);
    let code = flag_value(&args, "--lang").unwrap_or("hr");
    let only_page: Option<usize> = flag_value(&args, "--page").map(|p| {
        p.parse::<usize>().unwrap_or_else(|_| {
            eprintln!("--page needs a 1-based page number");
            std::process::exit(1);
        }).saturating_sub(1)
    });

    let lang = LanguageConfig::builtin(code).unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1);
    });
    let doc = RawDocument::load(path).unwrap_or_else(|e| {
        eprintln!("Failed to read {}: {e}", path.display());
        std::process::exit(1);
    });

    println!("Source: {}", doc.source_name().unwrap_or("(unnamed)"));
    println!("Language: {} ({})", lang.name(), lang.code());
    for index in 0..doc.page_count() {
        if only_page.is_some_and(|p| p != index) {
            continue;
        }
        dump_page(&doc, index, &lang);
    }
}

fn dump_page(doc: &RawDocument, index: usize, lang: &LanguageConfig) {
    let settings = PipelineSettings::default();
    let page = doc.page(index).expect("page index in range");
    println!();
    println!("═══ Page {} ═══", index + 1);

    let spans: Vec<Span> = match extract_spans(page, index) {
        Ok(spans) => spans.collect(),
        Err(e) => {
            println!("  ✗ {e}");
            return;
        }
    };

    let mut diag = Diagnostics::new();
    let detector = ChordDetector::new(lang);
    let convention = FontConvention::detect(&spans, &detector);
    println!("  {} spans, chord font: {convention:?}", spans.len());

    for (region, part) in partition(spans, &settings, index, &mut diag).into_iter().enumerate() {
        let b = part.bounds;
        println!();
        println!(
            "  ── Region {} [{:.0},{:.0} .. {:.0},{:.0}] {} spans",
            region + 1,
            b.left,
            b.top,
            b.right,
            b.bottom,
            part.spans.len()
        );

        let mut tokens = detect_tokens(&part.spans, &detector, &convention, settings.baseline_tolerance, &mut diag);
        repair_lyrics(&mut tokens, lang);
        for t in &tokens {
            println!("    {:>11} x={:>6.1} y={:>6.1} {:?}", t.kind.to_string(), t.x, t.y, t.normalized);
        }

        let classified = classify_rows(group_rows(tokens, settings.baseline_tolerance), lang, &mut diag);
        if let Some(title) = &classified.title {
            println!("    title: {title}");
        }
        if let Some(capo) = &classified.capo {
            println!("    capo: {capo}");
        }
        for (v, verse) in build_verses(&classified.rows, lang, &settings).iter().enumerate() {
            println!("    verse {}", v + 1);
            for line in &verse.lines {
                println!(
                    "      {:<8} {:<4} {}",
                    line.role().name(),
                    line.marker().unwrap_or(""),
                    inline_chords(line)
                );
            }
        }
        for comment in &classified.comments {
            println!("    comment: {comment}");
        }
    }

    for warning in diag.warnings() {
        println!("  ⚠ {warning}");
    }
}
