use crate::corpus::Table;
use crate::models::{FileReference, LoadType};
use anyhow::Result;
use async_trait::async_trait;

/// Concrete loader implementations. RDS, RDATA and RDA share `R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderKind {
    Txt,
    Odt,
    Docx,
    Csv,
    Tsv,
    Xlsx,
    Ods,
    R,
}

/// Strategy turning one referenced file into corpus-ingestible rows
#[async_trait]
pub trait FileLoaderStrategy: Send + Sync {
    /// Load the file as corpus documents or as metadata records
    async fn load(&self, load_type: LoadType) -> Result<Table>;

    /// The file this loader is bound to
    fn file_ref(&self) -> &FileReference;

    fn kind(&self) -> LoaderKind;
}
