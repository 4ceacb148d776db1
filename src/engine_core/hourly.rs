//! The hourly aggregation row: one `[H, H+1)` bucket of money, per-PLU
//! totals in catalog order, and transaction bookkeeping. Cloning the row is
//! the snapshot mechanism: a single shadow copy taken at each printout
//! header is enough, since at most one transaction is in flight.

use crate::catalog::PluCatalog;

/// Tolerance for the cash-plus-cards versus takings comparison.
pub const EPSILON: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq)]
pub struct HourlyRow {
    /// Window start hour; `None` until the first header of the hour.
    pub hour: Option<u32>,
    pub total_takings: f64,
    /// May swing negative mid-transaction (CHANGE before CASH when chunks
    /// interleave); reconciled at flush.
    pub cash: f64,
    pub credit_cards: f64,
    /// Parallel to the catalog, same order.
    pub plu: Vec<f64>,
    pub customer_count: u32,
    pub first_transaction: Option<String>,
    pub last_transaction: Option<String>,
    pub no_sale: u32,
}

impl HourlyRow {
    pub fn new(plu_len: usize) -> Self {
        Self {
            hour: None,
            total_takings: 0.0,
            cash: 0.0,
            credit_cards: 0.0,
            plu: vec![0.0; plu_len],
            customer_count: 0,
            first_transaction: None,
            last_transaction: None,
            no_sale: 0,
        }
    }

    /// Zero everything, keeping the PLU vector sized to the catalog.
    pub fn clear(&mut self) {
        let len = self.plu.len();
        *self = Self::new(len);
    }

    /// True when nothing has been recorded since the last clear.
    pub fn is_empty(&self) -> bool {
        self.total_takings == 0.0
            && self.cash == 0.0
            && self.credit_cards == 0.0
            && self.customer_count == 0
            && self.no_sale == 0
            && self.first_transaction.is_none()
            && self.plu.iter().all(|&v| v == 0.0)
    }

    /// Money conservation at flush: takings must equal cash plus cards.
    /// A register that omitted its card line shows cards of zero, in which
    /// case cash is authoritative; otherwise cards absorb the difference.
    pub fn reconcile(&mut self) {
        let diff = (self.total_takings - (self.cash + self.credit_cards)).abs();
        if diff > EPSILON {
            if self.credit_cards == 0.0 {
                self.total_takings = self.cash;
            } else {
                self.credit_cards = self.total_takings - self.cash;
            }
        }
        // An over-applied discount must not surface as a negative category.
        for total in &mut self.plu {
            if *total < 0.0 {
                log::debug!("Clamping negative category total {:.2}", total);
                *total = 0.0;
            }
        }
    }

    /// Quiescent hours are discarded, not written.
    pub fn should_emit(&self) -> bool {
        self.total_takings > 0.0 && self.customer_count > 0
    }

    pub fn window_label(&self) -> String {
        let h = self.hour.unwrap_or(0);
        format!("{:02}.00-{:02}.00", h, h + 1)
    }

    /// Render in output column order. Money with two decimals, counts bare.
    pub fn render(&self) -> Vec<String> {
        let mut fields = vec![
            self.window_label(),
            format!("{:.2}", self.total_takings),
            format!("{:.2}", self.cash),
            format!("{:.2}", self.credit_cards),
        ];
        fields.extend(self.plu.iter().map(|v| format!("{:.2}", v)));
        fields.push(self.customer_count.to_string());
        fields.push(self.first_transaction.clone().unwrap_or_default());
        fields.push(self.last_transaction.clone().unwrap_or_default());
        fields.push(self.no_sale.to_string());
        fields
    }

    /// Header row matching [`render`](Self::render) column for column.
    pub fn header(catalog: &PluCatalog) -> Vec<String> {
        let mut fields = vec![
            "HourWindow".to_string(),
            "TotalTakings".to_string(),
            "Cash".to_string(),
            "CreditCards".to_string(),
        ];
        fields.extend(catalog.names().iter().cloned());
        fields.push("CustomerCount".to_string());
        fields.push("FirstTransaction".to_string());
        fields.push("LastTransaction".to_string());
        fields.push("NoSale".to_string());
        fields
    }
}
