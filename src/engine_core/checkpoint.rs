//! Per-hour crash-recovery checkpoint. The row is serialized with field
//! names (JSON) so a catalog or schema change between runs degrades to
//! dropped fields instead of a corrupt load. Writes go to a temp file and
//! rename into place; a failed write is logged and the pipeline carries on.

use crate::catalog::PluCatalog;
use crate::engine_core::hourly::HourlyRow;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum CheckpointError {
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl From<std::io::Error> for CheckpointError {
    fn from(err: std::io::Error) -> Self {
        CheckpointError::Io(err)
    }
}

impl From<serde_json::Error> for CheckpointError {
    fn from(err: serde_json::Error) -> Self {
        CheckpointError::Serde(err)
    }
}

impl std::fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckpointError::Io(e) => write!(f, "IO error: {}", e),
            CheckpointError::Serde(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for CheckpointError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub hour: u32,
    pub total_takings: f64,
    pub cash: f64,
    pub credit_cards: f64,
    /// Named so a reordered or extended catalog still loads.
    pub plu: Vec<(String, f64)>,
    pub customer_count: u32,
    pub first_transaction: Option<String>,
    pub last_transaction: Option<String>,
    pub no_sale: u32,
}

impl CheckpointRecord {
    pub fn from_row(row: &HourlyRow, catalog: &PluCatalog) -> Option<Self> {
        let hour = row.hour?;
        Some(Self {
            hour,
            total_takings: row.total_takings,
            cash: row.cash,
            credit_cards: row.credit_cards,
            plu: catalog
                .names()
                .iter()
                .cloned()
                .zip(row.plu.iter().copied())
                .collect(),
            customer_count: row.customer_count,
            first_transaction: row.first_transaction.clone(),
            last_transaction: row.last_transaction.clone(),
            no_sale: row.no_sale,
        })
    }

    pub fn into_row(self, catalog: &PluCatalog) -> HourlyRow {
        let mut row = HourlyRow::new(catalog.len());
        row.hour = Some(self.hour);
        row.total_takings = self.total_takings;
        row.cash = self.cash;
        row.credit_cards = self.credit_cards;
        for (name, value) in self.plu {
            match catalog.position(&name) {
                Some(idx) => row.plu[idx] = value,
                None => log::warn!("Checkpoint PLU '{}' not in catalog, dropped", name),
            }
        }
        row.customer_count = self.customer_count;
        row.first_transaction = self.first_transaction;
        row.last_transaction = self.last_transaction;
        row.no_sale = self.no_sale;
        row
    }
}

pub struct Checkpointer {
    dir: PathBuf,
}

impl Checkpointer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, hour: u32) -> PathBuf {
        self.dir.join(format!("checkpoint-{:02}.dat", hour))
    }

    /// Persist the row for its hour. Failures are logged, never fatal.
    pub fn save(&self, row: &HourlyRow, catalog: &PluCatalog) {
        let Some(record) = CheckpointRecord::from_row(row, catalog) else {
            return;
        };
        if let Err(e) = self.write_atomic(&record) {
            log::warn!("Failed to write checkpoint: {}", e);
        }
    }

    fn write_atomic(&self, record: &CheckpointRecord) -> Result<(), CheckpointError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(record.hour);
        let tmp = path.with_extension("dat.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(record)?)?;
        fs::rename(&tmp, &path)?;
        log::debug!("Checkpointed hour {:02} to {}", record.hour, path.display());
        Ok(())
    }

    /// Startup recovery: load the row for the current clock hour if one was
    /// checkpointed, then delete it (the next commit re-saves). Checkpoints
    /// for any other hour are stale and removed.
    pub fn load_current_hour(&self, hour: u32, catalog: &PluCatalog) -> Option<HourlyRow> {
        let mut recovered = None;
        let path = self.path_for(hour);
        if path.exists() {
            match read_record(&path) {
                Ok(record) if record.hour == hour => {
                    log::info!("Recovered hour {:02} from {}", hour, path.display());
                    recovered = Some(record.into_row(catalog));
                }
                Ok(record) => {
                    log::warn!(
                        "Checkpoint {} tagged hour {:02}, expected {:02}; ignored",
                        path.display(),
                        record.hour,
                        hour
                    );
                }
                Err(e) => log::warn!("Unreadable checkpoint {}: {}", path.display(), e),
            }
        }
        self.delete_all();
        recovered
    }

    /// Remove every checkpoint file in the directory.
    pub fn delete_all(&self) {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("checkpoint-") && name.ends_with(".dat") {
                if let Err(e) = fs::remove_file(entry.path()) {
                    log::warn!("Failed to delete checkpoint {}: {}", name, e);
                }
            }
        }
    }
}

fn read_record(path: &Path) -> Result<CheckpointRecord, CheckpointError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PluCatalog {
        PluCatalog::from_lines(["Bread", "Coffee"].into_iter())
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tillflow-ckpt-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_row() -> HourlyRow {
        let mut row = HourlyRow::new(2);
        row.hour = Some(9);
        row.total_takings = 2.5;
        row.cash = 2.5;
        row.plu[1] = 2.5;
        row.customer_count = 1;
        row.first_transaction = Some("09:05".to_string());
        row.last_transaction = Some("09:05".to_string());
        row
    }

    #[test]
    fn test_save_then_load_same_hour() {
        let dir = temp_dir("roundtrip");
        let ckpt = Checkpointer::new(&dir);
        let cat = catalog();
        ckpt.save(&sample_row(), &cat);

        let loaded = ckpt.load_current_hour(9, &cat).expect("recovered row");
        assert_eq!(loaded, sample_row());
        // Consumed on load.
        assert!(ckpt.load_current_hour(9, &cat).is_none());
    }

    #[test]
    fn test_stale_hour_is_deleted_not_loaded() {
        let dir = temp_dir("stale");
        let ckpt = Checkpointer::new(&dir);
        let cat = catalog();
        ckpt.save(&sample_row(), &cat);

        assert!(ckpt.load_current_hour(10, &cat).is_none());
        assert!(!dir.join("checkpoint-09.dat").exists());
    }

    #[test]
    fn test_unknown_plu_names_are_dropped_on_load() {
        let cat = catalog();
        let record = CheckpointRecord {
            hour: 9,
            total_takings: 3.0,
            cash: 3.0,
            credit_cards: 0.0,
            plu: vec![("Coffee".to_string(), 2.0), ("Scone".to_string(), 1.0)],
            customer_count: 1,
            first_transaction: None,
            last_transaction: None,
            no_sale: 0,
        };
        let row = record.into_row(&cat);
        assert_eq!(row.plu, vec![0.0, 2.0]);
    }

    #[test]
    fn test_rowless_save_is_a_noop() {
        let dir = temp_dir("noop");
        let ckpt = Checkpointer::new(&dir);
        let cat = catalog();
        ckpt.save(&HourlyRow::new(2), &cat);
        assert!(fs::read_dir(&dir).unwrap().next().is_none());
    }
}
