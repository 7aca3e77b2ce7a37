use super::csv::load_delimited;
use crate::corpus::Table;
use crate::loader::{FileLoaderStrategy, LoaderKind};
use crate::models::{FileReference, LoadType};
use anyhow::Result;
use async_trait::async_trait;

/// Tab separated values loader
pub struct TsvLoaderStrategy {
    file_ref: FileReference,
}

impl TsvLoaderStrategy {
    pub fn new(file_ref: FileReference) -> Self {
        Self { file_ref }
    }
}

#[async_trait]
impl FileLoaderStrategy for TsvLoaderStrategy {
    async fn load(&self, _load_type: LoadType) -> Result<Table> {
        load_delimited(&self.file_ref, b'\t').await
    }

    fn file_ref(&self) -> &FileReference {
        &self.file_ref
    }

    fn kind(&self) -> LoaderKind {
        LoaderKind::Tsv
    }
}
