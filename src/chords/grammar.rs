//! Chord symbol grammar.
//!
//! A chord is a root (letter plus optional accidental), at most two quality
//! suffixes and an optional bass note after the separator. German notation
//! spells sharps and flats as `is`/`es` and marks minor with a lower-case
//! root; English notation uses `#`/`b` and an `m` quality.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Chord;

const GERMAN_ROOT: &str = r"(?:[A-Ha-h](?:is|IS|es|ES|#|♯)?|[AEae]s|[AE]S)";
const ENGLISH_ROOT: &str = r"(?:[A-G](?:#|b|♯|♭)?)";

/// How roots and accidentals are spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Notation {
    /// `H` for B natural, `B` for B flat, `Fis`, `Es`, minor in lower case.
    #[default]
    German,
    /// `B` for B natural, `F#`, `Eb`, minor as `m`.
    English,
}

/// Serializable description of a chord grammar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarSpec {
    /// Root spelling.
    pub notation: Notation,
    /// Recognized quality suffixes.
    pub qualities: Vec<String>,
    /// Alternative quality spellings mapped to their normalized form.
    pub quality_aliases: BTreeMap<String, String>,
    /// Separator before a bass note.
    pub bass_separator: String,
    /// Non-harmonic symbols printed in the chord row.
    pub symbols: Vec<String>,
}

impl Default for GrammarSpec {
    fn default() -> Self {
        Self {
            notation: Notation::German,
            qualities: ["7", "9", "11", "13", "sus2", "sus4", "maj7", "min7", "dim", "aug", "add9"]
                .into_iter()
                .map(String::from)
                .collect(),
            quality_aliases: BTreeMap::new(),
            bass_separator: "/".to_string(),
            symbols: vec!["*".to_string(), "d*".to_string()],
        }
    }
}

/// Compiled chord grammar.
#[derive(Debug, Clone)]
pub struct ChordGrammar {
    notation: Notation,
    chord: Regex,
    root: Regex,
    quality: Regex,
    aliases: BTreeMap<String, String>,
    separator: String,
    symbols: Vec<String>,
}

impl ChordGrammar {
    /// Compile a grammar description.
    pub fn new(spec: &GrammarSpec) -> Result<Self> {
        if spec.bass_separator.is_empty() {
            return Err(Error::Language("chord grammar needs a non-empty bass separator".into()));
        }
        let root = match spec.notation {
            Notation::German => GERMAN_ROOT,
            Notation::English => ENGLISH_ROOT,
        };

        let mut suffixes: Vec<&str> = spec
            .qualities
            .iter()
            .chain(spec.quality_aliases.keys())
            .map(String::as_str)
            .filter(|q| !q.is_empty())
            .collect();
        // Longest first so `maj7` wins over `7`.
        suffixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        suffixes.dedup();
        let quality = if suffixes.is_empty() {
            // Matches nothing.
            r"[^\s\S]".to_string()
        } else {
            suffixes.iter().map(|q| regex::escape(q)).collect::<Vec<_>>().join("|")
        };
        let sep = regex::escape(&spec.bass_separator);

        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| Error::Language(format!("invalid chord grammar: {e}")))
        };

        Ok(Self {
            notation: spec.notation,
            chord: compile(format!(
                r"^(?P<root>{root})(?P<q1>{quality})?(?P<q2>{quality})?(?:{sep}(?P<bass>{root}))?$"
            ))?,
            root: compile(format!(r"^{root}$"))?,
            quality: compile(format!(r"^(?:{quality})(?:{quality})?$"))?,
            aliases: spec.quality_aliases.clone(),
            separator: spec.bass_separator.clone(),
            symbols: spec.symbols.clone(),
        })
    }

    /// Parse a chord symbol, normalizing its spelling. Surrounding
    /// whitespace is ignored; anything else must match exactly.
    pub fn parse(&self, text: &str, x: f32) -> Option<Chord> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if self.symbols.iter().any(|s| s == text) {
            return Some(Chord::new(text, "", x));
        }
        let caps = self.chord.captures(text)?;
        let root = self.normalize_root(caps.name("root")?.as_str());
        let quality: String = ["q1", "q2"]
            .iter()
            .filter_map(|name| caps.name(name))
            .map(|m| self.normalize_quality(m.as_str()))
            .collect();
        let bass = caps.name("bass").map(|m| self.normalize_root(m.as_str()));
        Some(Chord { root, quality, bass, x })
    }

    /// Whether the text is a complete chord symbol.
    pub fn is_chord(&self, text: &str) -> bool {
        self.parse(text, 0.0).is_some()
    }

    /// Whether the text is a root with nothing attached.
    pub fn is_bare_root(&self, text: &str) -> bool {
        self.root.is_match(text.trim())
    }

    /// Whether the text is one or two quality suffixes on their own.
    pub fn is_quality(&self, text: &str) -> bool {
        self.quality.is_match(text.trim())
    }

    /// The bass separator.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Byte index splitting a word into exactly two chords, when exactly one
    /// such split exists (`aE` splits after `a`).
    pub fn glued_split(&self, word: &str) -> Option<usize> {
        let word = word.trim();
        if self.is_chord(word) {
            return None;
        }
        let mut splits = word
            .char_indices()
            .skip(1)
            .map(|(i, _)| i)
            .filter(|&i| self.is_chord(&word[..i]) && self.is_chord(&word[i..]));
        let first = splits.next()?;
        splits.next().is_none().then_some(first)
    }

    fn normalize_root(&self, root: &str) -> String {
        let mut chars = root.chars();
        let Some(first) = chars.next() else {
            return String::new();
        };
        let rest: String = chars
            .map(|c| match c {
                '♯' => '#',
                '♭' => 'b',
                other => other,
            })
            .collect();
        match self.notation {
            Notation::German => {
                let rest = if rest == "#" { rest } else { rest.to_lowercase() };
                format!("{first}{rest}")
            }
            Notation::English => format!("{}{rest}", first.to_ascii_uppercase()),
        }
    }

    fn normalize_quality(&self, quality: &str) -> String {
        self.aliases.get(quality).cloned().unwrap_or_else(|| quality.to_string())
    }
}
