//! Date Normalizer
//!
//! Converts spreadsheet serials, localized date strings and native chrono
//! values into a civil `NaiveDate`. Never fails: unrecognized input is
//! `None` and the caller decides whether that is fatal.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

use super::grid::Cell;

/// Largest serial a spreadsheet can represent (9999-12-31).
const MAX_SERIAL: f64 = 2_958_465.0;

/// Serial 60 is the nonexistent 1900-02-29 carried over from Lotus 1-2-3.
const PHANTOM_LEAP_DAY: i64 = 60;

/// Any date representation the normalizer accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum DateInput {
    Serial(f64),
    Text(String),
    Native(NaiveDateTime),
}

impl From<NaiveDate> for DateInput {
    fn from(date: NaiveDate) -> Self {
        Self::Native(date.and_time(NaiveTime::MIN))
    }
}

impl From<NaiveDateTime> for DateInput {
    fn from(datetime: NaiveDateTime) -> Self {
        Self::Native(datetime)
    }
}

impl From<DateTime<Utc>> for DateInput {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::Native(datetime.naive_utc())
    }
}

impl From<&str> for DateInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<f64> for DateInput {
    fn from(serial: f64) -> Self {
        Self::Serial(serial)
    }
}

/// Converts a spreadsheet day-count serial to a date. Fractions (time of
/// day) are dropped.
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let days = serial.floor() as i64;
    if days == PHANTOM_LEAP_DAY {
        return None;
    }
    // Serials before the phantom day are one day behind the 1899-12-30 epoch.
    let offset = if days < PHANTOM_LEAP_DAY { days + 1 } else { days };
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(offset as u64))
}

/// Indonesian month names and abbreviations mapped to English so chrono's
/// `%B` / `%b` can parse them.
fn translate_months(text: &str) -> String {
    static WORD: OnceLock<Regex> = OnceLock::new();
    let word = WORD.get_or_init(|| Regex::new(r"[A-Za-z]+").expect("static regex"));

    word.replace_all(text, |caps: &regex::Captures| {
        let original = &caps[0];
        let english = match original.to_lowercase().as_str() {
            "januari" => "January",
            "februari" | "pebruari" => "February",
            "maret" => "March",
            "mei" => "May",
            "juni" => "June",
            "juli" => "July",
            "agustus" => "August",
            "oktober" => "October",
            "nopember" => "November",
            "desember" => "December",
            "peb" => "Feb",
            "agu" | "agt" | "ags" => "Aug",
            "okt" => "Oct",
            "nop" => "Nov",
            "des" => "Dec",
            _ => return original.to_string(),
        };
        english.to_string()
    })
    .into_owned()
}

#[derive(Debug, Clone)]
pub struct DateNormalizer {
    formats: Vec<String>,
}

impl DateNormalizer {
    pub fn new(formats: Vec<String>) -> Self {
        Self { formats }
    }

    pub fn normalize(&self, input: &DateInput) -> Option<NaiveDate> {
        match input {
            DateInput::Serial(serial) => from_serial(*serial),
            DateInput::Text(text) => self.parse_text(text),
            DateInput::Native(datetime) => Some(datetime.date()),
        }
    }

    pub fn normalize_cell(&self, cell: &Cell) -> Option<NaiveDate> {
        match cell {
            Cell::Number(serial) | Cell::DateSerial(serial) => from_serial(*serial),
            Cell::Text(text) => self.parse_text(text),
            Cell::Empty => None,
        }
    }

    /// First strict match in declared pattern order. Numeric text is read
    /// as a serial.
    pub fn parse_text(&self, text: &str) -> Option<NaiveDate> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Ok(serial) = text.parse::<f64>() {
            return from_serial(serial);
        }

        let translated = translate_months(text);
        self.formats.iter().find_map(|format| {
            NaiveDate::parse_from_str(&translated, format)
                .or_else(|_| NaiveDateTime::parse_from_str(&translated, format).map(|dt| dt.date()))
                .ok()
                .filter(|date| (1900..=9999).contains(&date.year()))
        })
    }
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new(crate::config::ImportConfig::default().date_formats)
    }
}
