//! Chunk classification: a fixed, ordered table of (pattern, class) pairs.
//! First match wins; anything unmatched is a candidate transaction line.

use crate::config::Dialect;
use regex_lite::Regex;

/// What a normalized chunk turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkClass {
    Header,
    Footer,
    Report,
    Cancel,
    Reprint,
    Refund,
    NoSale,
    Diagnostic,
    /// Fallthrough: handed to the transaction parser.
    Line,
}

enum Pattern {
    Regex(Regex),
    StartsWith(&'static str),
    Contains(&'static str),
    ContainsAny(&'static [&'static str]),
}

impl Pattern {
    /// `chunk` arrives with leading whitespace already trimmed.
    fn matches(&self, chunk: &str) -> bool {
        match self {
            Pattern::Regex(re) => re.is_match(chunk),
            Pattern::StartsWith(prefix) => chunk.starts_with(prefix),
            Pattern::Contains(needle) => chunk.contains(needle),
            Pattern::ContainsAny(needles) => needles.iter().any(|n| chunk.contains(n)),
        }
    }
}

/// Precompiled classification table for one dialect.
pub struct Dispatcher {
    table: Vec<(Pattern, ChunkClass)>,
}

impl Dispatcher {
    pub fn new(dialect: Dialect) -> Self {
        let header = match dialect {
            // 420 printouts open with a date line: d{1,2}/dd/yyyy.
            Dialect::D420 => Pattern::Regex(
                Regex::new(r"^[0-9]{1,2}/[0-9]{2}/[0-9]{4}").expect("header pattern"),
            ),
            // The 520 has no clock line; its blocks open with a mode banner.
            Dialect::D520 => Pattern::Contains("REGISTER MODE"),
        };

        let table = vec![
            (header, ChunkClass::Header),
            (Pattern::StartsWith("CLERK"), ChunkClass::Footer),
            (Pattern::Contains("REPORT"), ChunkClass::Report),
            (Pattern::Contains("CANCEL"), ChunkClass::Cancel),
            (Pattern::Contains("REPRINT"), ChunkClass::Reprint),
            (Pattern::StartsWith("PAID OUT"), ChunkClass::Refund),
            (Pattern::ContainsAny(&["NOSALE", "NS"]), ChunkClass::NoSale),
            (Pattern::Contains("="), ChunkClass::Diagnostic),
        ];

        Self { table }
    }

    pub fn classify(&self, chunk: &str) -> ChunkClass {
        // One trim up front so anchored patterns tolerate the same leading
        // whitespace the prefix patterns do.
        let chunk = chunk.trim_start();
        for (pattern, class) in &self.table {
            if pattern.matches(chunk) {
                return *class;
            }
        }
        ChunkClass::Line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_420_header_is_a_date() {
        let d = Dispatcher::new(Dialect::D420);
        assert_eq!(d.classify("10/03/2024 09:05:12"), ChunkClass::Header);
        assert_eq!(d.classify("1/03/2024 09:05:12"), ChunkClass::Header);
        assert_eq!(d.classify("REGISTER MODE"), ChunkClass::Line);
    }

    #[test]
    fn test_520_header_is_the_mode_banner() {
        let d = Dispatcher::new(Dialect::D520);
        assert_eq!(d.classify("*** REGISTER MODE ***"), ChunkClass::Header);
        assert_eq!(d.classify("10/03/2024 09:05:12"), ChunkClass::Line);
    }

    #[test]
    fn test_420_header_tolerates_leading_whitespace() {
        let d = Dispatcher::new(Dialect::D420);
        assert_eq!(d.classify("  10/03/2024 09:05:12"), ChunkClass::Header);
    }

    #[test]
    fn test_markers() {
        let d = Dispatcher::new(Dialect::D420);
        assert_eq!(d.classify("CLERK 01"), ChunkClass::Footer);
        assert_eq!(d.classify("X REPORT"), ChunkClass::Report);
        assert_eq!(d.classify("  CANCEL"), ChunkClass::Cancel);
        assert_eq!(d.classify("RECEIPT REPRINT"), ChunkClass::Reprint);
        assert_eq!(d.classify("PAID OUT       £5.00"), ChunkClass::Refund);
        assert_eq!(d.classify("NOSALE"), ChunkClass::NoSale);
        assert_eq!(d.classify("NS"), ChunkClass::NoSale);
        assert_eq!(d.classify("RATE=17.5"), ChunkClass::Diagnostic);
    }

    #[test]
    fn test_first_match_wins() {
        // A cancel marker inside a report block still reads as a report.
        let d = Dispatcher::new(Dialect::D420);
        assert_eq!(d.classify("REPORT CANCEL"), ChunkClass::Report);
    }

    #[test]
    fn test_fallthrough_is_a_line() {
        let d = Dispatcher::new(Dialect::D420);
        assert_eq!(d.classify("Coffee        £2.50"), ChunkClass::Line);
        assert_eq!(d.classify("TOTAL         £2.50"), ChunkClass::Line);
    }
}
