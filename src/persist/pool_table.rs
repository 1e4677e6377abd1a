use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use log::debug;

use crate::arb::pool::PoolStore;
use crate::models::{Decimals, PoolRow};

/// The pool table file. It is read once at startup and fully rewritten after every
/// change, through a temporary file renamed over the old one.
#[derive(Debug, Clone)]
pub struct PoolTable {
    /// Location of the table
    path: PathBuf,
}

impl PoolTable {
    /// Creates a handle on the table at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the table
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the rows of the table.
    ///
    /// # Errors
    /// * If the file cannot be read or parsed
    pub fn load_rows(&self) -> Result<Vec<PoolRow>> {
        read_rows(&self.path)
    }

    /// Builds a store from the table.
    ///
    /// # Errors
    /// * If the file cannot be read or parsed
    /// * If a token has no decimals or a pool is listed twice
    pub fn load_store(&self, decimals: &Decimals) -> Result<PoolStore> {
        store_from_rows(self.load_rows()?, decimals)
    }

    /// Rewrites the table from the store.
    ///
    /// # Errors
    /// * If the temporary file cannot be written or renamed
    pub fn save(&self, store: &PoolStore) -> Result<()> {
        let rows: Vec<PoolRow> = store.records().iter().map(PoolRow::from).collect();
        let json = serde_json::to_string_pretty(&rows)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&tmp, json).wrap_err_with(|| format!("Cannot write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .wrap_err_with(|| format!("Cannot replace {}", self.path.display()))?;
        debug!(
            "persist::pool_table: saved {} pools to {}",
            rows.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Reads a JSON array of pool rows, as used by both the pool list and the table
///
/// # Errors
/// * If the file cannot be read or parsed
pub fn read_rows(path: &Path) -> Result<Vec<PoolRow>> {
    let raw = fs::read_to_string(path)
        .wrap_err_with(|| format!("Cannot read pools from {}", path.display()))?;
    serde_json::from_str(&raw).wrap_err_with(|| format!("Invalid pool rows in {}", path.display()))
}

/// Builds a store from rows, in row order
///
/// # Errors
/// * If a token has no decimals or a pool is listed twice
pub fn store_from_rows(rows: Vec<PoolRow>, decimals: &Decimals) -> Result<PoolStore> {
    let records = rows
        .into_iter()
        .map(|row| row.into_record(decimals))
        .collect::<Result<Vec<_>>>()?;
    PoolStore::new(records)
}
