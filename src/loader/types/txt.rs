use super::document_table;
use crate::corpus::Table;
use crate::loader::{FileLoaderStrategy, LoaderKind};
use crate::models::{FileReference, LoadType};
use crate::utils::strip_bom;
use anyhow::Result;
use async_trait::async_trait;

/// Plain text loader
pub struct TxtLoaderStrategy {
    file_ref: FileReference,
}

impl TxtLoaderStrategy {
    pub fn new(file_ref: FileReference) -> Self {
        Self { file_ref }
    }
}

#[async_trait]
impl FileLoaderStrategy for TxtLoaderStrategy {
    async fn load(&self, load_type: LoadType) -> Result<Table> {
        let bytes = self.file_ref.read_bytes().await?;
        // Latin-1 and other legacy encodings degrade to replacement characters
        let text = String::from_utf8_lossy(strip_bom(&bytes)).into_owned();
        document_table(&self.file_ref, load_type, text)
    }

    fn file_ref(&self) -> &FileReference {
        &self.file_ref
    }

    fn kind(&self) -> LoaderKind {
        LoaderKind::Txt
    }
}
