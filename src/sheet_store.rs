use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::fs;

use crate::table::Table;

/// Raised by [`SheetStore::read`] and [`SheetStore::update`] when the
/// worksheet does not exist. Callers detect it with `downcast_ref`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("worksheet not found: {sheet}")]
pub struct SheetNotFound {
    pub sheet: String,
}

pub fn is_sheet_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<SheetNotFound>().is_some()
}

/// The shared spreadsheet holding the catalogue and one cart worksheet per user.
#[async_trait]
pub trait SheetStore: Send + Sync {
    async fn read(&self, sheet: &str) -> anyhow::Result<Table>;
    async fn update(&self, sheet: &str, table: &Table) -> anyhow::Result<()>;
    async fn create(&self, sheet: &str, table: &Table) -> anyhow::Result<()>;
}

/// Keeps every worksheet as `<base_dir>/<sheet>.csv`.
#[derive(Debug, Clone)]
pub struct LocalFsSheetStore {
    base_dir: PathBuf,
}

impl LocalFsSheetStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.base_dir.join(format!("{sheet}.csv"))
    }
}

#[async_trait]
impl SheetStore for LocalFsSheetStore {
    async fn read(&self, sheet: &str) -> anyhow::Result<Table> {
        let path = self.sheet_path(sheet);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(SheetNotFound {
                    sheet: sheet.to_owned(),
                }
                .into());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("read sheet: {}", path.display()));
            }
        };
        Table::read_csv(bytes.as_slice()).with_context(|| format!("parse sheet: {sheet}"))
    }

    async fn update(&self, sheet: &str, table: &Table) -> anyhow::Result<()> {
        let path = self.sheet_path(sheet);
        if !fs::try_exists(&path)
            .await
            .with_context(|| format!("stat sheet: {}", path.display()))?
        {
            return Err(SheetNotFound {
                sheet: sheet.to_owned(),
            }
            .into());
        }
        write_table_atomic(&path, table).await?;
        tracing::debug!(sheet = %sheet, rows = table.len(), "updated sheet");
        Ok(())
    }

    async fn create(&self, sheet: &str, table: &Table) -> anyhow::Result<()> {
        let path = self.sheet_path(sheet);
        if fs::try_exists(&path)
            .await
            .with_context(|| format!("stat sheet: {}", path.display()))?
        {
            anyhow::bail!("worksheet already exists: {sheet}");
        }
        write_table_atomic(&path, table).await?;
        tracing::info!(sheet = %sheet, rows = table.len(), "created sheet");
        Ok(())
    }
}

pub(crate) async fn write_table_atomic(path: &Path, table: &Table) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create parent dir: {}", parent.display()))?;
    }

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = table.to_csv_bytes().context("serialize csv")?;
    let written = match fs::write(&tmp_path, &data).await {
        Ok(()) => fs::rename(&tmp_path, path)
            .await
            .with_context(|| format!("rename tmp to final: {}", path.display())),
        Err(err) => Err(err).with_context(|| format!("write tmp: {}", tmp_path.display())),
    };
    if written.is_err() {
        let _ = fs::remove_file(&tmp_path).await;
    }
    written
}
