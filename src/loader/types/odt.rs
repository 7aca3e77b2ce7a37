use super::document_table;
use crate::corpus::Table;
use crate::loader::xml::{extract_paragraphs, read_archive_member, ODT_TAGS};
use crate::loader::{FileLoaderStrategy, LoaderKind};
use crate::models::{FileReference, LoadType};
use anyhow::{Context, Result};
use async_trait::async_trait;

/// OpenDocument text loader
pub struct OdtLoaderStrategy {
    file_ref: FileReference,
}

impl OdtLoaderStrategy {
    pub fn new(file_ref: FileReference) -> Self {
        Self { file_ref }
    }
}

#[async_trait]
impl FileLoaderStrategy for OdtLoaderStrategy {
    async fn load(&self, load_type: LoadType) -> Result<Table> {
        let bytes = self.file_ref.read_bytes().await?;
        let name = self.file_ref.path();
        let text = tokio::task::spawn_blocking(move || -> Result<String> {
            let xml = read_archive_member(bytes, "content.xml")?;
            extract_paragraphs(&xml, &ODT_TAGS)
        })
        .await?
        .with_context(|| format!("Failed to read ODT file: {name}"))?;

        document_table(&self.file_ref, load_type, text)
    }

    fn file_ref(&self) -> &FileReference {
        &self.file_ref
    }

    fn kind(&self) -> LoaderKind {
        LoaderKind::Odt
    }
}
