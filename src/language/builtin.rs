//! Languages shipped with the crate.

use std::collections::BTreeMap;

use super::LanguageSpec;
use crate::chords::grammar::{GrammarSpec, Notation};

/// Codes accepted by [`super::LanguageConfig::builtin`].
pub const BUILTIN_CODES: &[&str] = &["hr", "sl", "it"];

/// Pink used for titles and printed remarks in the liturgical songbooks.
const ACCENT_PINKS: [u32; 3] = [15_466_635, 15_466_636, 15_466_637];

fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| (*w).to_string()).collect()
}

pub(super) fn spec(code: &str) -> Option<LanguageSpec> {
    match code {
        "hr" => Some(croatian()),
        "sl" => Some(slovenian()),
        "it" => Some(italian()),
        _ => None,
    }
}

fn croatian() -> LanguageSpec {
    LanguageSpec {
        code: "hr".into(),
        name: "Hrvatski".into(),
        default_role: "lead".into(),
        markers: map(&[
            ("K.+Z.", "lead+choir"),
            ("K.+P.", "lead+priest"),
            ("K.", "lead"),
            ("Z.", "choir"),
            ("P.", "priest"),
            ("D.", "children"),
        ]),
        diacritic_repairs: map(&[("è", "č"), ("È", "Č")]),
        comment_marker: Some(r"^C:\s*(.*)$".into()),
        chord_grammar: GrammarSpec::default(),
        lyric_words: words(&["a", "e", "as", "es"]),
        marker_shape: super::default_marker_shape(),
        capo_pattern: Some(r"(?i)^(?:kapodaster|capo)\b".into()),
        title_font_size_min: 12.0,
        accent_colors: ACCENT_PINKS.to_vec(),
        expansions: map(&[(
            "SMILUJ SE...",
            "SMILUJ SE NAMA, KOJI SMO GREŠNICI, GOSPODINE, SMILUJ SE!",
        )]),
        break_verse_on_marker: false,
    }
}

fn slovenian() -> LanguageSpec {
    LanguageSpec {
        code: "sl".into(),
        name: "Slovenščina".into(),
        default_role: "lead".into(),
        markers: map(&[
            ("K.+Z.", "lead+choir"),
            ("P.+Z.", "priest+choir"),
            ("K.", "lead"),
            ("Z.", "choir"),
            ("P.", "priest"),
            ("O.", "children"),
        ]),
        diacritic_repairs: map(&[("è", "č"), ("È", "Č")]),
        comment_marker: Some(r"^C:\s*(.*)$".into()),
        chord_grammar: GrammarSpec::default(),
        lyric_words: words(&["a", "e", "as", "es"]),
        marker_shape: super::default_marker_shape(),
        capo_pattern: Some(r"(?i)^(?:kapodaster|capo)\b".into()),
        title_font_size_min: 12.0,
        accent_colors: ACCENT_PINKS.to_vec(),
        expansions: BTreeMap::new(),
        break_verse_on_marker: false,
    }
}

fn italian() -> LanguageSpec {
    let mut grammar = GrammarSpec {
        notation: Notation::English,
        ..GrammarSpec::default()
    };
    grammar.qualities.extend(words(&["m", "m7", "6", "maj9"]));
    grammar.quality_aliases = map(&[("min", "m"), ("-", "m"), ("Δ", "maj7")]);

    LanguageSpec {
        code: "it".into(),
        name: "Italiano".into(),
        default_role: "lead".into(),
        markers: map(&[
            ("S.+C.", "lead+choir"),
            ("S.", "lead"),
            ("C.", "choir"),
            ("A.", "people"),
            ("B.", "children"),
        ]),
        // Latin-1 read as UTF-8.
        diacritic_repairs: map(&[
            ("Ã¨", "è"),
            ("Ã©", "é"),
            ("Ã\u{a0}", "à"),
            ("Ã²", "ò"),
            ("Ã¹", "ù"),
            ("Ã¬", "ì"),
            ("Ãˆ", "È"),
        ]),
        comment_marker: Some(r"^N:\s*(.*)$".into()),
        chord_grammar: grammar,
        lyric_words: words(&["e", "a"]),
        marker_shape: super::default_marker_shape(),
        capo_pattern: Some(r"(?i)^capo\b".into()),
        title_font_size_min: 12.0,
        accent_colors: ACCENT_PINKS.to_vec(),
        expansions: BTreeMap::new(),
        break_verse_on_marker: true,
    }
}
