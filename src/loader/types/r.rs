use crate::corpus::Table;
use crate::loader::rdata::{object_to_table, parse_rdata, parse_rds};
use crate::loader::{FileLoaderStrategy, LoaderKind};
use crate::models::{FileReference, LoadType};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;

/// Loader for R data files: `.rds`, `.RData` and `.rda`
pub struct RLoaderStrategy {
    file_ref: FileReference,
}

impl RLoaderStrategy {
    pub fn new(file_ref: FileReference) -> Self {
        Self { file_ref }
    }
}

#[async_trait]
impl FileLoaderStrategy for RLoaderStrategy {
    async fn load(&self, _load_type: LoadType) -> Result<Table> {
        let bytes = self.file_ref.read_bytes().await?;
        let name = self.file_ref.path();
        let is_rds = self.file_ref.extension().eq_ignore_ascii_case("rds");

        tokio::task::spawn_blocking(move || -> Result<Table> {
            let objects = if is_rds {
                vec![("value".to_string(), parse_rds(&bytes)?)]
            } else {
                parse_rdata(&bytes)?
            };

            let mut table = Table::default();
            let mut found = false;
            for (object_name, object) in &objects {
                match object_to_table(object_name, object) {
                    Some(t) => {
                        table.append(t);
                        found = true;
                    }
                    None => tracing::debug!(object = %object_name, "skipping non-tabular R object"),
                }
            }

            if !found {
                bail!("no data frame or vector found");
            }
            Ok(table)
        })
        .await?
        .with_context(|| format!("Failed to read R data file: {name}"))
    }

    fn file_ref(&self) -> &FileReference {
        &self.file_ref
    }

    fn kind(&self) -> LoaderKind {
        LoaderKind::R
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::rdata::tests::{gzip, XdrWriter};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_rds_data_frame() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("speeches.RDS");
        let mut w = XdrWriter::header(3);
        w.data_frame(["document", "year"], &["Four score", "I have a dream"], &[1863.0, 1963.0]);
        std::fs::write(&path, gzip(&w.buf)).unwrap();

        let loader = RLoaderStrategy::new(FileReference::from_path(&path));
        let table = loader.load(LoadType::Corpus).await.unwrap();

        assert_eq!(table.headers(), ["document", "year"]);
        assert_eq!(table.get(1, "document"), Some("I have a dream"));
        assert_eq!(table.get(1, "year"), Some("1963"));
    }

    #[tokio::test]
    async fn test_rdata_concatenates_frames() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("workspace.rda");

        let mut w = XdrWriter::header(2);
        w.tagged_cell("first");
        w.data_frame(["document", "id"], &["a"], &[1.0]);
        w.tagged_cell("second");
        w.data_frame(["document", "id"], &["b"], &[2.0]);
        w.nil();
        let mut bytes = b"RDX2\n".to_vec();
        bytes.extend_from_slice(&w.buf);
        std::fs::write(&path, gzip(&bytes)).unwrap();

        let loader = RLoaderStrategy::new(FileReference::from_path(&path));
        let table = loader.load(LoadType::Meta).await.unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "document"), Some("a"));
        assert_eq!(table.get(1, "id"), Some("2"));
    }

    #[tokio::test]
    async fn test_rdata_without_tables_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.RData");
        let mut bytes = b"RDX2\n".to_vec();
        let mut w = XdrWriter::header(2);
        w.nil();
        bytes.extend_from_slice(&w.buf);
        std::fs::write(&path, &bytes).unwrap();

        let loader = RLoaderStrategy::new(FileReference::from_path(&path));
        let err = loader.load(LoadType::Corpus).await.unwrap_err();
        assert!(format!("{err:#}").contains("no data frame"));
    }
}
