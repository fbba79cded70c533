//! Per-language configuration.
//!
//! A language is data, not code: a [`LanguageSpec`] (plain JSON) is compiled
//! into a read-only [`LanguageConfig`] that every pipeline stage consults.
//! Adding a language means writing one JSON file.

mod builtin;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::chords::grammar::{ChordGrammar, GrammarSpec};
use crate::error::{Error, Result};
use crate::types::Role;

pub use builtin::BUILTIN_CODES;

fn default_role_name() -> String {
    "lead".to_string()
}

fn default_marker_shape() -> String {
    r"^\p{Lu}{1,2}\.(?:\+\p{Lu}{1,2}\.)?$".to_string()
}

const fn default_title_size() -> f32 {
    12.0
}

/// Serializable language description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageSpec {
    /// Short code (`hr`, `sl`, `it`).
    pub code: String,
    /// Display name.
    pub name: String,
    /// Role in effect before any marker.
    #[serde(default = "default_role_name")]
    pub default_role: String,
    /// Marker literal to role name.
    #[serde(default)]
    pub markers: BTreeMap<String, String>,
    /// Broken text to its repaired form.
    #[serde(default)]
    pub diacritic_repairs: BTreeMap<String, String>,
    /// Regex for inline comment rows; group 1 is the comment body.
    #[serde(default)]
    pub comment_marker: Option<String>,
    /// Chord spelling rules.
    #[serde(default)]
    pub chord_grammar: GrammarSpec,
    /// Words that also parse as chords but are common lyrics.
    #[serde(default)]
    pub lyric_words: Vec<String>,
    /// Regex for words that look like role markers.
    #[serde(default = "default_marker_shape")]
    pub marker_shape: String,
    /// Regex for capo instructions.
    #[serde(default)]
    pub capo_pattern: Option<String>,
    /// Smallest font size for title rows.
    #[serde(default = "default_title_size")]
    pub title_font_size_min: f32,
    /// Packed RGB colours used for titles and printed remarks.
    #[serde(default)]
    pub accent_colors: Vec<u32>,
    /// Abbreviated responses to their full text.
    #[serde(default)]
    pub expansions: BTreeMap<String, String>,
    /// Start a new verse whenever a marker appears.
    #[serde(default)]
    pub break_verse_on_marker: bool,
}

/// Compiled, read-only language configuration.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    code: String,
    name: String,
    default_role: Role,
    /// Longest literal first.
    markers: Vec<(String, Role)>,
    /// Longest pattern first.
    repairs: Vec<(String, String)>,
    comment: Option<Regex>,
    grammar: ChordGrammar,
    lyric_words: HashSet<String>,
    marker_shape: Regex,
    capo: Option<Regex>,
    title_font_size_min: f32,
    accent_colors: Vec<u32>,
    expansions: Vec<(String, String)>,
    break_verse_on_marker: bool,
}

fn compile(what: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Language(format!("invalid {what} pattern {pattern:?}: {e}")))
}

fn longest_first(map: &BTreeMap<String, String>) -> Vec<(String, String)> {
    let mut pairs: Vec<_> = map
        .iter()
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    pairs.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()).then_with(|| a.0.cmp(&b.0)));
    pairs
}

impl LanguageConfig {
    /// Compile a language description, validating every pattern and role.
    pub fn from_spec(spec: &LanguageSpec) -> Result<Self> {
        if spec.code.trim().is_empty() {
            return Err(Error::Language("language code is empty".into()));
        }

        let markers = longest_first(&spec.markers)
            .into_iter()
            .map(|(marker, role)| Ok((marker, role.parse::<Role>()?)))
            .collect::<Result<Vec<_>>>()?;

        let comment = spec
            .comment_marker
            .as_deref()
            .map(|p| compile("comment marker", p))
            .transpose()?;
        if let Some(re) = &comment {
            if re.captures_len() < 2 {
                return Err(Error::Language(format!(
                    "comment marker {:?} needs one capture group for the comment body",
                    re.as_str()
                )));
            }
        }

        Ok(Self {
            code: spec.code.trim().to_lowercase(),
            name: spec.name.clone(),
            default_role: spec.default_role.parse()?,
            markers,
            repairs: longest_first(&spec.diacritic_repairs),
            comment,
            grammar: ChordGrammar::new(&spec.chord_grammar)?,
            lyric_words: spec.lyric_words.iter().map(|w| w.to_lowercase()).collect(),
            marker_shape: compile("marker shape", &spec.marker_shape)?,
            capo: spec.capo_pattern.as_deref().map(|p| compile("capo", p)).transpose()?,
            title_font_size_min: spec.title_font_size_min,
            accent_colors: spec.accent_colors.clone(),
            expansions: longest_first(&spec.expansions),
            break_verse_on_marker: spec.break_verse_on_marker,
        })
    }

    /// Parse and compile a JSON language file's contents.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let spec: LanguageSpec =
            serde_json::from_str(json).map_err(|e| Error::parse(e.to_string(), None))?;
        Self::from_spec(&spec)
    }

    /// Load a JSON language file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs_err::read_to_string(path).map_err(|e| Error::io(e, path.to_path_buf()))?;
        let spec: LanguageSpec =
            serde_json::from_str(&json).map_err(|e| Error::parse(e.to_string(), path.to_path_buf()))?;
        Self::from_spec(&spec)
    }

    /// One of the configurations shipped with the crate.
    pub fn builtin(code: &str) -> Result<Self> {
        let spec = builtin::spec(code).ok_or_else(|| {
            Error::Language(format!(
                "unknown language {code:?}; built-in languages are {}",
                BUILTIN_CODES.join(", ")
            ))
        })?;
        Self::from_spec(&spec)
    }

    /// Prefer `<dir>/<code>.json`, falling back to a built-in language.
    pub fn resolve(code: &str, dir: Option<&Path>) -> Result<Self> {
        let code = code.trim().to_lowercase();
        if let Some(dir) = dir {
            let path = dir.join(format!("{code}.json"));
            if path.is_file() {
                tracing::info!("Loading language {code} from {}", path.display());
                return Self::load(&path);
            }
        }
        Self::builtin(&code)
    }

    /// Language code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role in effect before any marker.
    pub const fn default_role(&self) -> &Role {
        &self.default_role
    }

    /// Chord grammar.
    pub const fn grammar(&self) -> &ChordGrammar {
        &self.grammar
    }

    /// Smallest font size for title rows.
    pub const fn title_font_size_min(&self) -> f32 {
        self.title_font_size_min
    }

    /// Whether a marker always opens a new verse.
    pub const fn break_verse_on_marker(&self) -> bool {
        self.break_verse_on_marker
    }

    /// Apply the repair table in one left-to-right pass, longest match
    /// first, so repaired text is never repaired again.
    pub fn repair(&self, text: &str) -> String {
        if self.repairs.is_empty() {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        'scan: while let Some(c) = rest.chars().next() {
            for (from, to) in &self.repairs {
                if let Some(after) = rest.strip_prefix(from.as_str()) {
                    out.push_str(to);
                    rest = after;
                    continue 'scan;
                }
            }
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
        out
    }

    /// Configured marker at the start of `text`, followed by whitespace or
    /// the end of the text. Longest markers are tried first.
    pub fn match_marker(&self, text: &str) -> Option<(&str, &Role)> {
        let text = text.trim_start();
        self.markers.iter().find_map(|(marker, role)| {
            let rest = text.strip_prefix(marker.as_str())?;
            rest.chars()
                .next()
                .is_none_or(char::is_whitespace)
                .then_some((marker.as_str(), role))
        })
    }

    /// Whether a word has the shape of a role marker.
    pub fn looks_like_marker(&self, word: &str) -> bool {
        self.marker_shape.is_match(word.trim())
    }

    /// Body of an inline comment row.
    pub fn comment_body(&self, text: &str) -> Option<String> {
        let caps = self.comment.as_ref()?.captures(text.trim())?;
        Some(caps.get(1).map_or("", |m| m.as_str()).trim().to_string())
    }

    /// Whether the row is a capo instruction.
    pub fn is_capo(&self, text: &str) -> bool {
        self.capo.as_ref().is_some_and(|re| re.is_match(text.trim()))
    }

    /// Replace abbreviated responses with their full text.
    pub fn expand(&self, text: &str) -> Option<String> {
        self.expansions
            .iter()
            .find(|(short, _)| text.contains(short.as_str()))
            .map(|(short, full)| text.replacen(short.as_str(), full, 1))
    }

    /// Whether a chord-shaped word is also an ordinary lyric word.
    pub fn is_lyric_word(&self, word: &str) -> bool {
        self.lyric_words.contains(&word.trim().to_lowercase())
    }

    /// Whether a span colour is one of the accent colours.
    pub fn is_accent(&self, color: Option<u32>) -> bool {
        color.is_some_and(|c| self.accent_colors.contains(&c))
    }
}
