//! Transaction-line parsing: split a line on the currency symbol and type it.
//!
//! The subdispatch is ordered; the first matching key wins. Lines with no
//! currency symbol are discarded unless they are an `AMOUNT` discount, which
//! the 420 prints bare.

use crate::catalog::title_case;

/// A typed transaction-line operation, ready for the engine to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOp {
    Total(f64),
    Cash(f64),
    Change(f64),
    /// CARD and CHEQUE tenders land in the same bucket.
    Card(f64),
    /// Discount against the most recent line item; value keeps its sign.
    Discount(f64),
    /// Candidate PLU line item with a title-cased key.
    Item { key: String, value: f64 },
}

pub fn parse_line(line: &str, currency: char) -> Option<LineOp> {
    let (key, value) = match line.find(currency) {
        Some(pos) => {
            let value = parse_money(&line[pos + currency.len_utf8()..])?;
            (line[..pos].trim(), value)
        }
        None => {
            let trimmed = line.trim_start();
            if let Some(rest) = trimmed.strip_prefix("AMOUNT") {
                return Some(LineOp::Discount(parse_money(rest)?));
            }
            return None;
        }
    };

    let op = if key.contains("TOTAL") {
        LineOp::Total(value)
    } else if key.contains("CASH") {
        LineOp::Cash(value)
    } else if key.contains("CHANGE") {
        LineOp::Change(value)
    } else if key.contains("CHEQUE") || key.contains("CARD") {
        LineOp::Card(value)
    } else if key.contains("AMOUNT") {
        LineOp::Discount(value)
    } else {
        LineOp::Item {
            key: title_case(key),
            value,
        }
    };
    Some(op)
}

/// Parse the leading money token of `s`: optional sign, digits, decimal.
fn parse_money(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let mut end = 0;
    for (i, c) in s.char_indices() {
        let ok = c.is_ascii_digit() || c == '.' || (i == 0 && c == '-');
        if !ok {
            break;
        }
        end = i + c.len_utf8();
    }
    s[..end].parse().ok()
}
