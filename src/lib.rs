//! `songbook` - songbook PDF text layers to ChordPro and positioned HTML.
//!
//! The crate turns positioned text runs from a songbook page into songs:
//! lyric lines with chords anchored to character offsets, tagged with the
//! role that sings them. Language-specific behaviour (role markers, chord
//! dialect, encoding repairs) comes from a [`language::LanguageConfig`]
//! value, so one pipeline serves every songbook.

// Re-export public modules for use in integration tests and as a library
pub mod chords;
pub mod classify;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod extract;
pub mod language;
pub mod layout;
pub mod pipeline;
pub mod services;
pub mod types;
pub mod utils;
pub mod verse;

pub use error::{Diagnostics, Error, Result, Warning};
pub use pipeline::{export, process, PipelineContext};
