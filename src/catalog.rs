//! PLU catalog: the ordered set of product categories the register reports.
//!
//! Order matters: it fixes the left-to-right column order of the per-PLU
//! totals in every output row, so the catalog is a vector plus a hash index
//! rather than a map.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Empty(String),
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io(err)
    }
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io(e) => write!(f, "Catalog read error: {}", e),
            CatalogError::Empty(path) => write!(f, "Catalog file {} has no entries", path),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Immutable, insertion-ordered catalog of canonical (title-cased) names.
#[derive(Debug, Clone)]
pub struct PluCatalog {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl PluCatalog {
    /// Load from a newline-delimited file. Blank lines are skipped; file
    /// order is preserved; names are canonicalised to title case.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)?;
        let catalog = Self::from_lines(raw.lines());
        if catalog.is_empty() {
            return Err(CatalogError::Empty(path.display().to_string()));
        }
        log::info!(
            "Loaded PLU catalog ({} entries) from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn from_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Self {
        let mut names = Vec::new();
        let mut index = HashMap::new();
        for line in lines {
            let name = title_case(line.trim());
            if name.is_empty() || index.contains_key(&name) {
                continue;
            }
            index.insert(name.clone(), names.len());
            names.push(name);
        }
        Self { names, index }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of a canonical (already title-cased) name, if present.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name_at(&self, idx: usize) -> &str {
        &self.names[idx]
    }
}

/// Title-case a key the way the register's keys are matched: first letter of
/// each whitespace-separated word upper, the rest lower.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, word) in s.split_whitespace().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.extend(chars.flat_map(|c| c.to_lowercase()));
        }
    }
    out
}
