//! Site identity: maps the machine's hostname to the shop id used in output
//! file names. Multi-register sites embed a single digit in the hostname,
//! which becomes a `_<digit>` suffix on the id.

use serde::Deserialize;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ShopRecord {
    id: String,
    name: String,
}

#[derive(Debug, Clone)]
pub struct SiteMap {
    shops: Vec<(String, String)>, // (id, lowercased name)
}

impl SiteMap {
    /// Load `shops.csv` (columns `id,name`, with header row).
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let file = File::open(path)
            .map_err(|e| format!("Cannot open site mapping {}: {}", path.display(), e))?;
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);

        let mut shops = Vec::new();
        for record in reader.deserialize() {
            let record: ShopRecord = record?;
            shops.push((record.id.trim().to_string(), record.name.trim().to_lowercase()));
        }
        log::info!("Loaded {} shops from {}", shops.len(), path.display());
        Ok(Self { shops })
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            shops: pairs
                .iter()
                .map(|(id, name)| (id.to_string(), name.to_lowercase()))
                .collect(),
        }
    }

    /// Resolve a hostname to a site id, `"UNKNOWN"` when unmapped.
    ///
    /// Matching strips digits from the hostname and compares case-folded
    /// against the shop name. A hostname carrying exactly one decimal digit
    /// is a numbered register; the digit is appended as `_<digit>`.
    pub fn resolve(&self, hostname: &str) -> String {
        let host = hostname.trim().to_lowercase();
        let stripped: String = host.chars().filter(|c| !c.is_ascii_digit()).collect();
        let digits: Vec<char> = host.chars().filter(|c| c.is_ascii_digit()).collect();

        let id = self
            .shops
            .iter()
            .find(|(_, name)| *name == stripped)
            .map(|(id, _)| id.clone())
            .unwrap_or_else(|| {
                log::warn!("Hostname '{}' not present in site mapping", hostname);
                "UNKNOWN".to_string()
            });

        match digits.as_slice() {
            [register] => format!("{}_{}", id, register),
            _ => id,
        }
    }
}

/// Host identity, from `$HOSTNAME` or `/etc/hostname`.
pub fn local_hostname() -> String {
    if let Ok(name) = std::env::var("HOSTNAME") {
        if !name.trim().is_empty() {
            return name.trim().to_string();
        }
    }
    std::fs::read_to_string("/etc/hostname")
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}
