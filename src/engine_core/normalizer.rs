//! Chunk normalization: byte scrubbing shared by both dialects plus the 520
//! rewrites that make its polling stream look like the 420's line stream.
//!
//! Rules here are bit-exact against the device; change nothing without a
//! captured trace showing why.

use crate::config::Dialect;
use regex_lite::Regex;

pub struct Normalizer {
    dialect: Dialect,
    currency: char,
    qty_marker: Regex,
    bare_price: Regex,
    /// Single-slot buffer for the synthetic `CHANGE` sub-chunk split out of
    /// a combined 520 cash line; drained on the next read cycle.
    pending: Option<String>,
}

impl Normalizer {
    pub fn new(dialect: Dialect, currency: char) -> Self {
        Self {
            dialect,
            currency,
            qty_marker: Regex::new(r"\s[0-9]\s").expect("quantity marker pattern"),
            bare_price: Regex::new(r"[0-9]{1,2}\.[0-9]{2}").expect("price pattern"),
            pending: None,
        }
    }

    /// Take the queued synthetic sub-chunk, if any.
    pub fn take_pending(&mut self) -> Option<String> {
        self.pending.take()
    }

    /// Turn one raw chunk into zero or more canonical chunks, in order.
    /// Never fails; garbage falls through to the dispatcher and is rejected
    /// there.
    pub fn normalize(&mut self, raw: &str) -> Vec<String> {
        let scrubbed = self.scrub(raw);

        match self.dialect {
            Dialect::D420 => {
                if scrubbed.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![scrubbed]
                }
            }
            Dialect::D520 => self.rewrite_520(&scrubbed),
        }
    }

    /// Shared byte scrub: drop NULs and 0xC2 padding, rewrite the 0x9C
    /// currency glyph and `?` to the configured symbol.
    fn scrub(&self, raw: &str) -> String {
        raw.chars()
            .filter(|&c| c != '\u{0}' && c != '\u{c2}')
            .map(|c| {
                if c == '\u{9c}' || c == '?' {
                    self.currency
                } else {
                    c
                }
            })
            .collect()
    }

    fn rewrite_520(&mut self, scrubbed: &str) -> Vec<String> {
        let text: String = scrubbed.chars().filter(|&c| c != '@').collect();
        let text = self
            .qty_marker
            .replace_all(&text, " ")
            .into_owned();
        let text = self.mark_prices(&text);

        if !text.contains("CASH") {
            return if text.trim().is_empty() {
                Vec::new()
            } else {
                vec![text]
            };
        }

        // The device prints cash and change on one physical line; split so
        // CASH is parsed this cycle and CHANGE on the next.
        let (head, change) = match text.find("CHANGE") {
            Some(pos) => (&text[..pos], Some(text[pos..].trim().to_string())),
            None => (text.as_str(), None),
        };
        if let Some(change) = change {
            if self.pending.replace(change).is_some() {
                log::warn!("Pending CHANGE sub-chunk overwritten before drain");
            }
        }

        let mut out = Vec::new();
        match head.find("CASH") {
            Some(pos) if pos > 0 && !head[..pos].trim().is_empty() => {
                out.push(head[..pos].trim().to_string());
                out.push(head[pos..].trim().to_string());
            }
            _ => {
                let head = head.trim();
                if !head.is_empty() {
                    out.push(head.to_string());
                }
            }
        }
        out
    }

    /// Prepend the currency symbol to bare `d{1,2}.dd` literals so the 520
    /// stream parses with the same key/value split as the 420's.
    fn mark_prices(&self, text: &str) -> String {
        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len() + 4);
        let mut last = 0;
        for m in self.bare_price.find_iter(text) {
            let preceded = m.start() > 0
                && matches!(
                    bytes[m.start() - 1],
                    b'0'..=b'9' | b'.'
                );
            let already_marked = text[..m.start()].chars().next_back() == Some(self.currency);
            let followed = bytes.get(m.end()).is_some_and(|b| b.is_ascii_digit());
            out.push_str(&text[last..m.start()]);
            if !preceded && !already_marked && !followed {
                out.push(self.currency);
            }
            out.push_str(m.as_str());
            last = m.end();
        }
        out.push_str(&text[last..]);
        out
    }
}
