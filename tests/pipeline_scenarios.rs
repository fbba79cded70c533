//! End-to-end scenarios: page dumps in, songs and exports out.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use regex::Regex;
use songbook::chords::{detect_tokens, ChordDetector, FontConvention};
use songbook::config::PipelineSettings;
use songbook::error::{Diagnostics, Warning};
use songbook::export::{parse_chordpro, to_chordpro, to_html, ExportFormat, HtmlOptions};
use songbook::extract::{extract_spans, RawDocument, RawPage};
use songbook::language::LanguageConfig;
use songbook::layout::partition;
use songbook::pipeline::{self, build_song, process, PipelineContext};
use songbook::types::{Role, Song, Span};
use songbook::utils::font_metrics;

fn page(json: &str) -> RawPage {
    RawDocument::from_json(json, None).unwrap().pages.remove(0)
}

fn context(code: &str) -> PipelineContext {
    PipelineContext::new(LanguageConfig::builtin(code).unwrap())
}

fn run(json: &str, ctx: &PipelineContext) -> (Vec<Song>, Diagnostics) {
    let mut diag = Diagnostics::new();
    let songs = process(&page(json), 0, ctx, &mut diag).unwrap();
    (songs, diag)
}

const PSALM: &str = r#"[
    ["C", 50, 88, 10],
    ["Gospodin je pastir moj", 50, 100, 10]
]"#;

const RESPONSORY: &str = r#"[
    ["C", 50, 88, 10],
    ["Gospodin je pastir moj", 50, 100, 10],
    ["D", 50, 112, 10],
    ["Z. Smiluj se nama", 50, 124, 10],
    ["G", 70, 136, 10],
    ["Kriste, smiluj se", 50, 148, 10],
    ["E", 66, 175, 10],
    ["K. Gospodine", 50, 187, 10]
]"#;

#[test]
fn scenario_a_chord_over_first_character() {
    let (songs, diag) = run(PSALM, &context("hr"));
    assert_eq!(songs.len(), 1);
    let lines: Vec<_> = songs[0].lines().collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].text(), "Gospodin je pastir moj");
    let chords: Vec<(usize, String)> = lines[0]
        .chords()
        .iter()
        .map(|c| (c.offset, c.chord.to_string()))
        .collect();
    assert_eq!(chords, vec![(0, "C".to_string())]);
    assert!(diag.is_empty());
}

#[test]
fn scenario_b_two_columns_two_songs() {
    let json = r#"[
        {"text": "Gospodin je pastir moj", "x": 50, "y": 100, "size": 10, "width": 150},
        {"text": "Slavim te Gospodine", "x": 300, "y": 100, "size": 10, "width": 150}
    ]"#;
    let ctx = context("hr");
    let spans: Vec<Span> = extract_spans(&page(json), 0).unwrap().collect();
    let mut diag = Diagnostics::new();
    let parts = partition(spans.clone(), &ctx.settings, 0, &mut diag);
    assert_eq!(parts.len(), 2);

    let detector = ChordDetector::new(&ctx.language);
    let convention = FontConvention::detect(&spans, &detector);
    let songs: Vec<Song> = parts
        .iter()
        .enumerate()
        .map(|(i, p)| build_song(p, 0, i, &ctx, &detector, &convention, &mut diag).unwrap())
        .collect();
    assert_eq!(songs[0].lines().next().unwrap().text(), "Gospodin je pastir moj");
    assert_eq!(songs[1].lines().next().unwrap().text(), "Slavim te Gospodine");

    let (via_process, _) = run(json, &ctx);
    assert_eq!(via_process, songs);
    assert_eq!(via_process[1].region, 1);
}

#[test]
fn scenario_c_marker_sets_role_and_is_not_sung() {
    let (songs, _) = run(RESPONSORY, &context("hr"));
    let lines: Vec<_> = songs[0].lines().collect();
    let choir = lines.iter().find(|l| l.marker() == Some("Z.")).unwrap();
    assert_eq!(choir.role(), &Role::Choir);
    assert_eq!(choir.text(), "Smiluj se nama");
    assert!(!choir.text().contains("Z."));
}

#[test]
fn scenario_d_repairs_run_before_classification() {
    let lang = LanguageConfig::from_json_str(
        r#"{
            "code": "xx",
            "name": "Test",
            "diacritic_repairs": {"nasao": "našao", "Ž.": "Z."},
            "markers": {"Z.": "choir"}
        }"#,
    )
    .unwrap();
    let ctx = PipelineContext::new(lang);
    let (songs, _) = run(r#"[["Ž. Ja sam nasao", 50, 100, 10]]"#, &ctx);
    let line = songs[0].lines().next().unwrap();
    assert_eq!(line.text(), "Ja sam našao");
    // The marker only exists after the repair.
    assert_eq!(line.role(), &Role::Choir);
}

#[test]
fn roles_carry_forward_until_the_next_marker() {
    let (songs, diag) = run(RESPONSORY, &context("hr"));
    let roles: Vec<(String, Role)> = songs[0]
        .lines()
        .map(|l| (l.text().to_string(), l.role().clone()))
        .collect();
    assert_eq!(
        roles,
        vec![
            ("Gospodin je pastir moj".to_string(), Role::Lead),
            ("Smiluj se nama".to_string(), Role::Choir),
            ("Kriste, smiluj se".to_string(), Role::Choir),
            ("Gospodine".to_string(), Role::Lead),
        ]
    );
    assert_eq!(diag.unknown_markers(), 0);
}

#[test]
fn large_gap_opens_a_new_verse() {
    let (songs, _) = run(RESPONSORY, &context("hr"));
    let sizes: Vec<usize> = songs[0].verses.iter().map(|v| v.lines.len()).collect();
    assert_eq!(sizes, vec![3, 1]);
}

#[test]
fn processing_is_idempotent() {
    let ctx = context("hr");
    let (first, _) = run(RESPONSORY, &ctx);
    let (second, _) = run(RESPONSORY, &ctx);
    assert_eq!(first, second);
    assert_eq!(to_chordpro(&first[0]), to_chordpro(&second[0]));
    assert_eq!(
        to_html(&first[0], &HtmlOptions::default()),
        to_html(&second[0], &HtmlOptions::default())
    );
}

#[test]
fn tokens_cover_every_span_exactly() {
    let json = r#"[
        ["  H 7   a", 50, 88, 10],
        ["G / H", 120, 88, 10],
        ["aE", 160, 88, 10],
        ["Gospodin  je pastir moj ", 50, 100, 10],
        ["a  ti", 200, 100, 10]
    ]"#;
    let lang = LanguageConfig::builtin("hr").unwrap();
    let detector = ChordDetector::new(&lang);
    let spans: Vec<Span> = extract_spans(&page(json), 0).unwrap().collect();
    let mut diag = Diagnostics::new();
    let tokens = detect_tokens(&spans, &detector, &FontConvention::NONE, 2.5, &mut diag);
    for span in &spans {
        let covered: String = tokens
            .iter()
            .filter(|t| t.span == span.seq)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(covered, span.text);
    }
}

#[test]
fn spaced_and_glued_chords_are_normalized() {
    let json = r#"[
        ["H 7", 50, 88, 10],
        ["G / H", 90, 88, 10],
        ["aE", 140, 88, 10],
        ["Gospodin je pastir moj i vodi me", 50, 100, 10]
    ]"#;
    let (songs, _) = run(json, &context("hr"));
    let symbols: Vec<String> = songs[0]
        .lines()
        .flat_map(|l| l.chords().iter().map(|c| c.chord.to_string()))
        .collect();
    assert_eq!(symbols, vec!["H7", "G/H", "a", "E"]);
}

#[test]
fn inline_chord_word_is_lyric_with_a_warning() {
    let (songs, diag) = run(r#"[["Tebe a Boga hvalimo", 50, 100, 10]]"#, &context("hr"));
    let line = songs[0].lines().next().unwrap();
    assert_eq!(line.text(), "Tebe a Boga hvalimo");
    assert!(line.chords().is_empty());
    assert!(diag
        .warnings()
        .iter()
        .any(|w| matches!(w, Warning::ClassificationAmbiguity { text, .. } if text == "a")));
}

#[test]
fn title_and_capo_are_lifted_out_of_the_body() {
    let json = r#"[
        ["GOSPODIN JE PASTIR MOJ", 50, 60, 14],
        ["Kapodaster na II. polju", 50, 75, 10],
        ["C", 50, 88, 10],
        ["Gospodin je pastir moj", 50, 100, 10],
        ["* Psalam 23", 50, 115, 10]
    ]"#;
    let (songs, _) = run(json, &context("hr"));
    let song = &songs[0];
    assert_eq!(song.title.as_deref(), Some("GOSPODIN JE PASTIR MOJ"));
    assert_eq!(song.capo.as_deref(), Some("Kapodaster na II. polju"));
    assert_eq!(song.comments, vec!["* Psalam 23".to_string()]);
    assert_eq!(song.lines().count(), 1);
}

#[test]
fn chord_offsets_stay_within_the_text() {
    let json = r#"[
        ["C", 50, 88, 10], ["G", 400, 88, 10],
        ["Gospodin je pastir moj", 50, 100, 10],
        ["D", 10, 112, 10],
        ["ni u čem", 50, 124, 10]
    ]"#;
    let (songs, _) = run(json, &context("hr"));
    for line in songs[0].lines() {
        for c in line.chords() {
            assert!(c.offset <= line.char_len());
        }
    }

    let lines: Vec<_> = songs[0].lines().collect();
    assert_eq!(lines[0].chords()[1].offset, lines[0].char_len());
    let early = lines.iter().find(|l| l.text() == "ni u čem").unwrap();
    assert_eq!(early.chords().len(), 1);
    assert_eq!(early.chords()[0].chord.to_string(), "D");
    assert_eq!(early.chords()[0].offset, 0);
}

#[test]
fn repeat_mark_on_a_chord_row_keeps_its_chords() {
    let json = r#"[
        ["C      G      (2x)", 50, 88, 10],
        ["Gospodin je pastir moj", 50, 100, 10]
    ]"#;
    let (songs, diag) = run(json, &context("hr"));
    let lines: Vec<_> = songs[0].lines().collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].text(), "Gospodin je pastir moj");
    let symbols: Vec<String> = lines[0].chords().iter().map(|c| c.chord.to_string()).collect();
    assert_eq!(symbols, vec!["C", "G"]);
    assert_eq!(lines[0].annotation(), Some("(2x)"));
    assert!(diag.is_empty());
    assert!(to_chordpro(&songs[0]).contains("{comment: (2x)}"));
}

#[test]
fn unknown_chord_spelling_does_not_demote_its_row() {
    let json = r#"[
        ["C", 50, 88, 10], ["G", 90, 88, 10], ["C6", 130, 88, 10],
        ["Gospodin je pastir moj", 50, 100, 10]
    ]"#;
    let (songs, _) = run(json, &context("hr"));
    let lines: Vec<_> = songs[0].lines().collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].text(), "Gospodin je pastir moj");
    let symbols: Vec<String> = lines[0].chords().iter().map(|c| c.chord.to_string()).collect();
    assert_eq!(symbols, vec!["C", "G"]);
}

#[test]
fn chordpro_round_trip_keeps_text_chords_and_offsets() {
    let (songs, _) = run(RESPONSORY, &context("hr"));
    let song = &songs[0];
    let doc = parse_chordpro(&to_chordpro(song));

    let expected: Vec<(String, Vec<(usize, String)>)> = song
        .lines()
        .map(|l| {
            let chords = l.chords().iter().map(|c| (c.offset, c.chord.to_string())).collect();
            (l.text().to_string(), chords)
        })
        .collect();
    let parsed: Vec<(String, Vec<(usize, String)>)> = doc
        .verses
        .iter()
        .flatten()
        .map(|l| (l.text.clone(), l.chords.clone()))
        .collect();
    assert_eq!(parsed, expected);
    assert_eq!(doc.verses.len(), song.verses.len());
}

#[test]
fn html_positions_follow_from_offsets_alone() {
    let json = r#"[
        ["C", 50, 88, 10], ["G", 107, 88, 10],
        ["Gospodin je pastir moj", 50, 100, 10]
    ]"#;
    let (songs, _) = run(json, &context("hr"));
    let options = HtmlOptions::default();
    let html = to_html(&songs[0], &options);
    let doc = parse_chordpro(&to_chordpro(&songs[0]));

    let left = Regex::new(r"left: ([0-9.]+)px").unwrap();
    let rendered: Vec<String> = left.captures_iter(&html).map(|c| c[1].to_string()).collect();
    let recomputed: Vec<String> = doc
        .verses
        .iter()
        .flatten()
        .flat_map(|l| {
            l.chords
                .iter()
                .map(|(offset, _)| format!("{:.1}", font_metrics::prefix_width(&l.text, *offset, options.font_size)))
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(rendered.len(), 2);
    assert_eq!(rendered, recomputed);
}

#[test]
fn every_format_renders() {
    let (songs, _) = run(PSALM, &context("hr"));
    for format in ExportFormat::ALL {
        let out = pipeline::export(&songs[0], format).unwrap();
        assert!(out.contains("Gospodin"), "{format} output lacks the lyric");
    }
}

#[test]
fn settings_drive_the_verse_split() {
    let mut ctx = context("hr");
    ctx.settings = PipelineSettings { verse_gap_factor: 10.0, ..PipelineSettings::default() };
    let (songs, _) = run(RESPONSORY, &ctx);
    assert_eq!(songs[0].verses.len(), 1);
}

#[test]
fn far_off_coordinates_are_processed() {
    let (songs, _) = run(r#"[["Gospodin je pastir moj", 50, 100, 10], ["amen", 3e38, 112, 10]]"#, &context("hr"));
    assert_eq!(songs.len(), 1);
    let texts: Vec<&str> = songs[0].lines().map(|l| l.text()).collect();
    assert_eq!(texts, vec!["Gospodin je pastir moj", "amen"]);
}
