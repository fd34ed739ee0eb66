use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tokio::fs;

use crate::formats::CartRow;
use crate::sheet_store::write_table_atomic;
use crate::table::Table;

/// The local copy of one user's cart, kept as a CSV file next to the app.
#[derive(Debug, Clone)]
pub struct CartCache {
    path: PathBuf,
}

impl CartCache {
    pub fn new(cache_dir: &Path, cart_name: &str) -> Self {
        Self {
            path: cache_dir.join(format!("{cart_name}.csv")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when no cache exists yet, which is the normal first-use state.
    pub async fn load(&self) -> anyhow::Result<Option<Vec<CartRow>>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("read cart cache: {}", self.path.display()));
            }
        };
        let table = Table::read_csv(bytes.as_slice())
            .with_context(|| format!("parse cart cache: {}", self.path.display()))?;
        let rows = table
            .to_records()
            .with_context(|| format!("decode cart cache: {}", self.path.display()))?;
        Ok(Some(rows))
    }

    pub async fn save(&self, rows: &[CartRow]) -> anyhow::Result<()> {
        let table = Table::from_records(rows)?;
        write_table_atomic(&self.path, &table)
            .await
            .with_context(|| format!("write cart cache: {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), rows = rows.len(), "saved cart cache");
        Ok(())
    }
}
