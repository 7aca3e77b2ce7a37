use crate::corpus::Table;
use crate::loader::{FileLoaderStrategy, LoaderKind};
use crate::models::{FileReference, LoadType};
use crate::utils::strip_bom;
use anyhow::{Context, Result};
use async_trait::async_trait;

/// Comma separated values loader
pub struct CsvLoaderStrategy {
    file_ref: FileReference,
}

impl CsvLoaderStrategy {
    pub fn new(file_ref: FileReference) -> Self {
        Self { file_ref }
    }
}

#[async_trait]
impl FileLoaderStrategy for CsvLoaderStrategy {
    async fn load(&self, _load_type: LoadType) -> Result<Table> {
        load_delimited(&self.file_ref, b',').await
    }

    fn file_ref(&self) -> &FileReference {
        &self.file_ref
    }

    fn kind(&self) -> LoaderKind {
        LoaderKind::Csv
    }
}

/// Read a delimited file whose first row is the header
pub(crate) async fn load_delimited(file_ref: &FileReference, delimiter: u8) -> Result<Table> {
    let bytes = file_ref.read_bytes().await?;
    let name = file_ref.path();
    tokio::task::spawn_blocking(move || parse_delimited(&bytes, delimiter))
        .await?
        .with_context(|| format!("Failed to parse delimited file: {name}"))
}

fn parse_delimited(bytes: &[u8], delimiter: u8) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(strip_bom(bytes));

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut table = Table::new(headers);

    for (line, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Invalid record {}", line + 1))?;
        table.push_row(record.iter().map(str::to_string).collect());
    }

    Ok(table)
}
