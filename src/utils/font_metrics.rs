//! Proportional font metrics for offset-to-position conversion.
//!
//! Songbooks are typeset in Arial, so widths come from Arial's advance
//! table (units per 1000 em). Accented letters borrow the width of their
//! base letter; anything unknown uses the average advance.

use std::collections::HashMap;

use lazy_static::lazy_static;

/// Average Arial advance, used for characters missing from the table.
pub const DEFAULT_ADVANCE: u16 = 556;

lazy_static! {
    /// Arial advance widths in font units (1000 per em).
    static ref ARIAL_ADVANCES: HashMap<char, u16> = {
        let mut m = HashMap::new();
        let rows: [(&str, u16); 22] = [
            ("ABEKPSVXY&", 667),
            ("CDHNRUw", 722),
            ("FTZ", 611),
            ("GOQ", 778),
            ("J", 500),
            ("L", 556),
            ("Mm", 833),
            ("W", 944),
            ("abdeghnopqu0123456789?_$#", 556),
            ("cksvxyz", 500),
            ("Ift .,:;/[]\\", 278),
            ("ijl", 222),
            ("r!()-`", 333),
            ("=+~<>", 584),
            ("%", 889),
            ("\"", 355),
            ("'", 191),
            ("{}", 334),
            ("*", 389),
            ("|", 260),
            ("@", 1015),
            ("^", 469),
        ];
        for (chars, width) in rows {
            for c in chars.chars() {
                m.insert(c, width);
            }
        }
        m
    };
}

/// Map an accented Latin letter to the letter whose advance it shares.
fn base_letter(c: char) -> char {
    match c {
        'č' | 'ć' | 'ç' => 'c',
        'Č' | 'Ć' | 'Ç' => 'C',
        'š' => 's',
        'Š' => 'S',
        'ž' => 'z',
        'Ž' => 'Z',
        'đ' => 'd',
        'Đ' => 'D',
        'à' | 'á' | 'â' | 'ä' | 'ã' => 'a',
        'À' | 'Á' | 'Â' | 'Ä' | 'Ã' => 'A',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'ò' | 'ó' | 'ô' | 'ö' | 'õ' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Ö' | 'Õ' => 'O',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        '\t' | '\u{a0}' => ' ',
        '♯' => '#',
        '♭' => 'b',
        _ => c,
    }
}

/// Advance of one character in font units.
pub fn advance(c: char) -> u16 {
    ARIAL_ADVANCES
        .get(&base_letter(c))
        .copied()
        .unwrap_or(DEFAULT_ADVANCE)
}

/// Width of one character at the given font size.
pub fn char_width(c: char, font_size: f32) -> f32 {
    f32::from(advance(c)) / 1000.0 * font_size
}

/// Width of a whole string at the given font size.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(|c| char_width(c, font_size)).sum()
}

/// Width of the first `chars` characters of `text`.
pub fn prefix_width(text: &str, chars: usize, font_size: f32) -> f32 {
    text.chars().take(chars).map(|c| char_width(c, font_size)).sum()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn known_widths() {
        assert_eq!(advance('A'), 667);
        assert_eq!(advance('i'), 222);
        assert_eq!(advance(' '), 278);
        assert_eq!(advance('m'), 833);
        assert_eq!(advance('T'), 611);
    }

    #[test]
    fn accented_letters_use_base_width() {
        assert_eq!(advance('č'), advance('c'));
        assert_eq!(advance('Š'), advance('S'));
        assert_eq!(advance('è'), advance('e'));
    }

    #[test]
    fn unknown_falls_back_to_average() {
        assert_eq!(advance('∑'), DEFAULT_ADVANCE);
    }

    #[test]
    fn widths_scale_with_font_size() {
        let w10 = text_width("Gospodin", 10.0);
        let w20 = text_width("Gospodin", 20.0);
        assert!((w20 - 2.0 * w10).abs() < 1e-3);
        assert!((prefix_width("ab", 1, 10.0) - 5.56).abs() < 1e-3);
    }
}
