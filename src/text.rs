//! OCR text clean-up for Indian registration plates.
//!
//! Plates follow `LL DD L[L] DDDD`: a two letter state code, a two digit
//! district code, a one or two letter series and a four digit number.
//! OCR engines regularly swap visually similar letters and digits, so each
//! window of the string is pushed back to the character class it must hold
//! before the plate pattern is searched.

use regex::Regex;

use crate::error::LprError;

/// Substituted when the OCR stage produced nothing usable.
pub const UNREADABLE: &str = "unreadable";

const PLATE_PATTERN: &str = r"[A-Z]{2}[0-9]{2}[A-Z]{1,2}[0-9]{4}";

/// One recognized fragment as handed back by the OCR engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOcrToken {
    pub text: String,
    pub confidence: f32,
}

impl RawOcrToken {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self { text: text.into(), confidence }
    }
}

/// All fragments of one image joined in reading order, upper-cased,
/// without spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPlateString(String);

impl RawPlateString {

    /// Fails with `NoTextDetected` when the engine returned no fragment.
    pub fn from_tokens(tokens: &[RawOcrToken]) -> Result<Self, LprError> {
        if tokens.is_empty() {
            return Err(LprError::no_text());
        }
        let joined: String = tokens.iter().map(|t| t.text.as_str()).collect();
        Ok(Self::from(joined.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RawPlateString {
    fn from(text: &str) -> Self {
        Self(text.replace(' ', "").to_uppercase())
    }
}

fn digit_to_letter(c: char) -> char {
    match c {
        '0' => 'O',
        '1' => 'I',
        '6' => 'G',
        '8' => 'B',
        '5' => 'S',
        _ => c,
    }
}

// the series window also sees 2 read for Z
fn digit_to_series_letter(c: char) -> char {
    match c {
        '2' => 'Z',
        _ => digit_to_letter(c),
    }
}

fn letter_to_digit(c: char) -> char {
    match c {
        'O' => '0',
        'I' => '1',
        'Z' => '2',
        'S' => '5',
        'G' => '6',
        'B' => '8',
        _ => c,
    }
}

/// Uppercase and drop everything outside `[A-Z0-9]`.
pub fn canonicalize(raw: &str) -> Vec<char> {
    raw.chars()
        .flat_map(char::to_uppercase)
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}

/// Rewrite `chars[start..end]` through `map`, but only when the buffer is at
/// least `min_len` long. Digits or letters are picked by `digits`.
fn correct_window(mut chars: Vec<char>, start: usize, end: usize, min_len: usize, digits: bool, map: fn(char) -> char) -> Vec<char> {
    if chars.len() < min_len {
        return chars;
    }
    for c in &mut chars[start..end] {
        if c.is_ascii_digit() == digits {
            *c = map(*c);
        }
    }
    chars
}

fn fix_state_code(chars: Vec<char>) -> Vec<char> {
    correct_window(chars, 0, 2, 2, true, digit_to_letter)
}

fn fix_district_code(chars: Vec<char>) -> Vec<char> {
    correct_window(chars, 2, 4, 4, false, letter_to_digit)
}

fn fix_series(chars: Vec<char>) -> Vec<char> {
    correct_window(chars, 4, 6, 6, true, digit_to_series_letter)
}

// measured from the current end, whatever the length turned out to be
fn fix_number(chars: Vec<char>) -> Vec<char> {
    let len = chars.len();
    correct_window(chars, len.saturating_sub(4), len, 10, false, letter_to_digit)
}

/// Positional letter/digit correction. Windows are applied one after the
/// other on the already corrected buffer.
pub fn correct_positions(chars: Vec<char>) -> Vec<char> {
    let chars = fix_state_code(chars);
    let chars = fix_district_code(chars);
    let chars = fix_series(chars);
    fix_number(chars)
}

pub struct PlateNormalizer {
    pattern: Regex,
}

impl PlateNormalizer {

    pub fn new() -> Result<Self, LprError> {
        let pattern = Regex::new(PLATE_PATTERN)?;
        Ok(Self { pattern })
    }

    /// Never fails. Returns the leftmost plate-shaped match when there is
    /// one, otherwise the corrected string as is (possibly empty).
    pub fn normalize(&self, raw: &str) -> String {
        let corrected: String = correct_positions(canonicalize(raw)).into_iter().collect();

        if let Some(found) = self.pattern.find(&corrected) {
            return found.as_str().to_string();
        }
        if (8..=12).contains(&corrected.len()) {
            log::debug!("{} has plate length but no plate pattern", corrected);
        }
        corrected
    }

    /// Final text for one plate: the normalized string, or `UNREADABLE` when
    /// the OCR stage found nothing or nothing survived the clean-up.
    pub fn plate_text(&self, tokens: &[RawOcrToken]) -> String {
        let raw = match RawPlateString::from_tokens(tokens) {
            Ok(raw) => raw,
            Err(e) => {
                log::debug!("{}, using sentinel", e);
                return UNREADABLE.to_string();
            }
        };
        let text = self.normalize(raw.as_str());
        if text.is_empty() {
            UNREADABLE.to_string()
        } else {
            text
        }
    }
}
