use super::xlsx::read_workbook;
use crate::corpus::Table;
use crate::loader::{FileLoaderStrategy, LoaderKind};
use crate::models::{FileReference, LoadType};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use calamine::{Ods, Reader};
use std::io::Cursor;

/// OpenDocument spreadsheet loader
pub struct OdsLoaderStrategy {
    file_ref: FileReference,
}

impl OdsLoaderStrategy {
    pub fn new(file_ref: FileReference) -> Self {
        Self { file_ref }
    }
}

#[async_trait]
impl FileLoaderStrategy for OdsLoaderStrategy {
    async fn load(&self, _load_type: LoadType) -> Result<Table> {
        let bytes = self.file_ref.read_bytes().await?;
        let name = self.file_ref.path();
        tokio::task::spawn_blocking(move || -> Result<Table> {
            let mut workbook: Ods<_> = Ods::new(Cursor::new(bytes))
                .map_err(|e| anyhow!("Not a valid ODS spreadsheet: {e}"))?;
            read_workbook(&mut workbook)
        })
        .await?
        .with_context(|| format!("Failed to read ODS file: {name}"))
    }

    fn file_ref(&self) -> &FileReference {
        &self.file_ref
    }

    fn kind(&self) -> LoaderKind {
        LoaderKind::Ods
    }
}
