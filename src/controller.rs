use crate::config::LoaderConfig;
use crate::corpus::{Corpus, Document, Table};
use crate::loader::LoaderFactory;
use crate::models::{FileReference, LoadType};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Operations the view layer forwards user actions to
#[async_trait]
pub trait Controller: Send + Sync {
    /// Load files as corpus documents. Returns false and records the error on failure.
    async fn load_corpus_from_filepaths(&mut self, files: &[FileReference]) -> bool;

    /// Load files as metadata records. Returns false and records the error on failure.
    async fn load_meta_from_filepaths(&mut self, files: &[FileReference]) -> bool;

    /// Build a named corpus from everything loaded so far
    async fn build_corpus(&mut self, corpus_name: &str) -> bool;

    fn loaded_corpus_files(&self) -> Vec<&FileReference>;

    fn loaded_meta_files(&self) -> Vec<&FileReference>;

    fn corpora(&self) -> &[Corpus];

    /// Message of the most recent failed operation
    fn last_error(&self) -> Option<&str>;
}

struct LoadedFile {
    file_ref: FileReference,
    table: Table,
}

/// Holds loaded corpus and metadata tables and the corpora built from them
pub struct CorpusController {
    config: LoaderConfig,
    corpus_files: Vec<LoadedFile>,
    meta_files: Vec<LoadedFile>,
    corpora: Vec<Corpus>,
    last_error: Option<String>,
}

impl CorpusController {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            corpus_files: Vec::new(),
            meta_files: Vec::new(),
            corpora: Vec::new(),
            last_error: None,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn set_text_header(&mut self, header: impl Into<String>) {
        self.config.text_header = header.into();
    }

    /// Join metadata onto documents where `corpus_link` equals `meta_link`
    pub fn set_link_headers(&mut self, corpus_link: Option<String>, meta_link: Option<String>) {
        self.config.corpus_link = corpus_link;
        self.config.meta_link = meta_link;
    }

    /// Columns across all loaded corpus files
    pub fn corpus_headers(&self) -> Vec<String> {
        combine(&self.corpus_files).headers().to_vec()
    }

    /// Columns across all loaded metadata files
    pub fn meta_headers(&self) -> Vec<String> {
        combine(&self.meta_files).headers().to_vec()
    }

    pub fn unload_all(&mut self) {
        self.corpus_files.clear();
        self.meta_files.clear();
        self.last_error = None;
    }

    /// Drop one corpus file; false when it was not loaded
    pub fn unload_corpus_file(&mut self, file_ref: &FileReference) -> bool {
        remove_file(&mut self.corpus_files, file_ref)
    }

    /// Drop one metadata file; false when it was not loaded
    pub fn unload_meta_file(&mut self, file_ref: &FileReference) -> bool {
        remove_file(&mut self.meta_files, file_ref)
    }

    async fn load_files(&mut self, files: &[FileReference], load_type: LoadType) -> bool {
        let loaded = match load_type {
            LoadType::Corpus => &self.corpus_files,
            LoadType::Meta => &self.meta_files,
        };

        match read_files(loaded, files, load_type).await {
            Ok(new_files) => {
                info!(count = new_files.len(), kind = %load_type, "loaded files");
                let target = match load_type {
                    LoadType::Corpus => &mut self.corpus_files,
                    LoadType::Meta => &mut self.meta_files,
                };
                target.extend(new_files);
                self.last_error = None;
                true
            }
            Err(e) => self.fail(e),
        }
    }

    fn assemble(&self, corpus_name: &str) -> Result<Corpus> {
        let name = corpus_name.trim();
        if name.is_empty() {
            bail!("Corpus name must not be empty");
        }
        if self.corpus_files.is_empty() {
            bail!("No corpus files loaded");
        }

        let corpus_table = combine(&self.corpus_files);
        let meta_table = combine(&self.meta_files);

        let text_header = &self.config.text_header;
        let text_col = corpus_table.column_index(text_header).ok_or_else(|| {
            anyhow!(
                "Text column '{}' not found in corpus files. Available columns: {}",
                text_header,
                corpus_table.headers().join(", ")
            )
        })?;

        let alignment = self.align(&corpus_table, &meta_table)?;

        let mut meta_headers: Vec<String> = corpus_table
            .headers()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != text_col)
            .map(|(_, h)| h.clone())
            .collect();

        let meta_link_col = match &alignment {
            Alignment::Linked { meta_col, .. } => Some(*meta_col),
            _ => None,
        };
        let mut meta_columns: Vec<(usize, String)> = Vec::new();
        if !matches!(alignment, Alignment::Unaligned) {
            for (i, header) in meta_table.headers().iter().enumerate() {
                if Some(i) == meta_link_col || meta_headers.contains(header) {
                    continue;
                }
                meta_headers.push(header.clone());
                meta_columns.push((i, header.clone()));
            }
        }

        let documents = corpus_table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let mut metadata: BTreeMap<String, String> = corpus_table
                    .headers()
                    .iter()
                    .zip(row)
                    .enumerate()
                    .filter(|(col, _)| *col != text_col)
                    .map(|(_, (h, v))| (h.clone(), v.clone()))
                    .collect();

                let meta_row = match &alignment {
                    Alignment::Unaligned => None,
                    Alignment::ByRow => meta_table.rows().get(i),
                    Alignment::Linked { corpus_col, index, .. } => index
                        .get(row[*corpus_col].as_str())
                        .and_then(|&j| meta_table.rows().get(j)),
                };
                for (col, header) in &meta_columns {
                    let value = meta_row.map(|r| r[*col].clone()).unwrap_or_default();
                    metadata.insert(header.clone(), value);
                }

                Document {
                    text: row[text_col].clone(),
                    metadata,
                }
            })
            .collect();

        Ok(Corpus::new(name, meta_headers, documents))
    }

    fn align<'a>(&self, corpus_table: &Table, meta_table: &'a Table) -> Result<Alignment<'a>> {
        if self.meta_files.is_empty() {
            return Ok(Alignment::Unaligned);
        }

        match (&self.config.corpus_link, &self.config.meta_link) {
            (Some(corpus_link), Some(meta_link)) => {
                let corpus_col = corpus_table.column_index(corpus_link).ok_or_else(|| {
                    anyhow!("Link column '{corpus_link}' not found in corpus files")
                })?;
                let meta_col = meta_table.column_index(meta_link).ok_or_else(|| {
                    anyhow!("Link column '{meta_link}' not found in metadata files")
                })?;
                let index = meta_table
                    .index_by(meta_link)
                    .context("Metadata link column disappeared")?;
                Ok(Alignment::Linked {
                    corpus_col,
                    meta_col,
                    index,
                })
            }
            (None, None) => {
                if meta_table.len() != corpus_table.len() {
                    bail!(
                        "Cannot align {} metadata rows with {} documents without link columns",
                        meta_table.len(),
                        corpus_table.len()
                    );
                }
                Ok(Alignment::ByRow)
            }
            _ => bail!("Both a corpus and a metadata link column must be set to join metadata"),
        }
    }

    fn fail(&mut self, error: anyhow::Error) -> bool {
        let message = format!("{error:#}");
        warn!(error = %message, "operation failed");
        self.last_error = Some(message);
        false
    }
}

/// How metadata rows line up with corpus rows
enum Alignment<'a> {
    /// No metadata loaded
    Unaligned,
    /// Row `i` of metadata belongs to document `i`
    ByRow,
    Linked {
        corpus_col: usize,
        meta_col: usize,
        index: HashMap<&'a str, usize>,
    },
}

#[async_trait]
impl Controller for CorpusController {
    async fn load_corpus_from_filepaths(&mut self, files: &[FileReference]) -> bool {
        self.load_files(files, LoadType::Corpus).await
    }

    async fn load_meta_from_filepaths(&mut self, files: &[FileReference]) -> bool {
        self.load_files(files, LoadType::Meta).await
    }

    async fn build_corpus(&mut self, corpus_name: &str) -> bool {
        match self.assemble(corpus_name) {
            Ok(corpus) => {
                info!(
                    name = %corpus.name,
                    documents = corpus.len(),
                    meta_columns = corpus.meta_headers.len(),
                    "built corpus"
                );
                self.corpora.retain(|c| c.name != corpus.name);
                self.corpora.push(corpus);
                self.corpus_files.clear();
                self.meta_files.clear();
                self.last_error = None;
                true
            }
            Err(e) => self.fail(e),
        }
    }

    fn loaded_corpus_files(&self) -> Vec<&FileReference> {
        self.corpus_files.iter().map(|f| &f.file_ref).collect()
    }

    fn loaded_meta_files(&self) -> Vec<&FileReference> {
        self.meta_files.iter().map(|f| &f.file_ref).collect()
    }

    fn corpora(&self) -> &[Corpus] {
        &self.corpora
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// Resolve and run loaders for files not already loaded. Any failure
/// discards the whole batch.
async fn read_files(
    loaded: &[LoadedFile],
    files: &[FileReference],
    load_type: LoadType,
) -> Result<Vec<LoadedFile>> {
    let mut seen = HashSet::new();
    let pending: Vec<&FileReference> = files
        .iter()
        .filter(|f| !loaded.iter().any(|l| &l.file_ref == *f))
        .filter(|f| seen.insert(*f))
        .collect();

    if pending.len() < files.len() {
        debug!(skipped = files.len() - pending.len(), "skipping files already loaded");
    }

    let loaders = pending
        .iter()
        .map(|f| LoaderFactory::get_file_loader(f))
        .collect::<Result<Vec<_>, _>>()?;

    let tables = futures::future::try_join_all(loaders.iter().map(|loader| async move {
        debug!(file = %loader.file_ref(), kind = ?loader.kind(), "loading file");
        loader
            .load(load_type)
            .await
            .with_context(|| format!("Failed to load {}", loader.file_ref().filename()))
    }))
    .await?;

    Ok(pending
        .into_iter()
        .cloned()
        .zip(tables)
        .map(|(file_ref, table)| LoadedFile { file_ref, table })
        .collect())
}

fn combine(files: &[LoadedFile]) -> Table {
    let mut table = Table::default();
    for file in files {
        table.append(file.table.clone());
    }
    table
}

fn remove_file(files: &mut Vec<LoadedFile>, file_ref: &FileReference) -> bool {
    let before = files.len();
    files.retain(|f| &f.file_ref != file_ref);
    files.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> FileReference {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        FileReference::from_path(path)
    }

    #[tokio::test]
    async fn test_load_and_build_text_corpus() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.txt", "first document");
        let b = write(&dir, "b.txt", "second document");

        let mut controller = CorpusController::new(LoaderConfig::default());
        assert!(controller.load_corpus_from_filepaths(&[a, b]).await);
        assert_eq!(controller.loaded_corpus_files().len(), 2);

        assert!(controller.build_corpus("letters").await);
        let corpus = &controller.corpora()[0];
        assert_eq!(corpus.name, "letters");
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.documents[0].text, "first document");
        assert_eq!(corpus.documents[1].metadata["filename"], "b.txt");
        assert_eq!(corpus.meta_headers, vec!["filename"]);
        assert!(controller.loaded_corpus_files().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.txt", "text");

        let mut controller = CorpusController::new(LoaderConfig::default());
        assert!(controller.load_corpus_from_filepaths(&[a.clone(), a.clone()]).await);
        assert!(controller.load_corpus_from_filepaths(&[a]).await);
        assert_eq!(controller.loaded_corpus_files().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_batch_keeps_nothing() {
        let dir = TempDir::new().unwrap();
        let good = write(&dir, "good.txt", "ok");
        let bad = write(&dir, "bad.pdf", "%PDF");

        let mut controller = CorpusController::new(LoaderConfig::default());
        assert!(!controller.load_corpus_from_filepaths(&[good, bad]).await);
        assert!(controller.loaded_corpus_files().is_empty());
        let error = controller.last_error().unwrap();
        assert!(error.contains("Invalid file type loaded: PDF"));
    }

    #[tokio::test]
    async fn test_build_without_files_fails() {
        let mut controller = CorpusController::new(LoaderConfig::default());
        assert!(!controller.build_corpus("empty").await);
        assert_eq!(controller.last_error(), Some("No corpus files loaded"));
        assert!(controller.corpora().is_empty());
    }

    #[tokio::test]
    async fn test_build_requires_name() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.txt", "text");
        let mut controller = CorpusController::new(LoaderConfig::default());
        assert!(controller.load_corpus_from_filepaths(&[a]).await);
        assert!(!controller.build_corpus("   ").await);
        assert_eq!(controller.loaded_corpus_files().len(), 1);
    }

    #[tokio::test]
    async fn test_build_missing_text_column() {
        let dir = TempDir::new().unwrap();
        let csv = write(&dir, "data.csv", "body,author\nhello,ann\n");

        let mut controller = CorpusController::new(LoaderConfig::default());
        assert!(controller.load_corpus_from_filepaths(&[csv]).await);
        assert!(!controller.build_corpus("c").await);
        assert!(controller.last_error().unwrap().contains("Text column 'document' not found"));

        controller.set_text_header("body");
        assert!(controller.build_corpus("c").await);
        assert_eq!(controller.corpora()[0].documents[0].text, "hello");
    }

    #[tokio::test]
    async fn test_metadata_joined_by_link_columns() {
        let dir = TempDir::new().unwrap();
        let corpus = write(&dir, "corpus.csv", "document,id\nalpha,1\nbeta,2\ngamma,3\n");
        let meta = write(&dir, "meta.tsv", "doc_id\tauthor\n2\tBob\n1\tAnn\n");

        let mut controller = CorpusController::new(LoaderConfig::default());
        controller.set_link_headers(Some("id".to_string()), Some("doc_id".to_string()));
        assert!(controller.load_corpus_from_filepaths(&[corpus]).await);
        assert!(controller.load_meta_from_filepaths(&[meta]).await);
        assert_eq!(controller.meta_headers(), vec!["doc_id", "author"]);

        assert!(controller.build_corpus("joined").await);
        let corpus = &controller.corpora()[0];
        assert_eq!(corpus.meta_headers, vec!["id", "author"]);
        assert_eq!(corpus.documents[0].metadata["author"], "Ann");
        assert_eq!(corpus.documents[1].metadata["author"], "Bob");
        assert_eq!(corpus.documents[2].metadata["author"], "");
    }

    #[tokio::test]
    async fn test_metadata_joined_by_row_requires_equal_counts() {
        let dir = TempDir::new().unwrap();
        let corpus = write(&dir, "corpus.csv", "document\nalpha\nbeta\n");
        let meta = write(&dir, "meta.csv", "year\n1999\n");

        let mut controller = CorpusController::new(LoaderConfig::default());
        assert!(controller.load_corpus_from_filepaths(&[corpus]).await);
        assert!(controller.load_meta_from_filepaths(&[meta.clone()]).await);
        assert!(!controller.build_corpus("rows").await);
        assert!(controller.last_error().unwrap().contains("Cannot align 1 metadata rows with 2 documents"));

        assert!(controller.unload_meta_file(&meta));
        let meta = write(&dir, "meta2.csv", "year\n1999\n2000\n");
        assert!(controller.load_meta_from_filepaths(&[meta]).await);
        assert!(controller.build_corpus("rows").await);
        assert_eq!(controller.corpora()[0].documents[1].metadata["year"], "2000");
    }

    #[tokio::test]
    async fn test_partial_link_configuration_fails() {
        let dir = TempDir::new().unwrap();
        let corpus = write(&dir, "corpus.csv", "document,id\nalpha,1\n");
        let meta = write(&dir, "meta.csv", "id,year\n1,1999\n");

        let mut controller = CorpusController::new(LoaderConfig::default());
        controller.set_link_headers(Some("id".to_string()), None);
        assert!(controller.load_corpus_from_filepaths(&[corpus]).await);
        assert!(controller.load_meta_from_filepaths(&[meta]).await);
        assert!(!controller.build_corpus("partial").await);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_same_name() {
        let dir = TempDir::new().unwrap();
        let mut controller = CorpusController::new(LoaderConfig::default());

        assert!(controller.load_corpus_from_filepaths(&[write(&dir, "a.txt", "one")]).await);
        assert!(controller.build_corpus("same").await);
        assert!(controller.load_corpus_from_filepaths(&[write(&dir, "b.txt", "two")]).await);
        assert!(controller.build_corpus("same").await);

        assert_eq!(controller.corpora().len(), 1);
        assert_eq!(controller.corpora()[0].documents[0].text, "two");
    }

    #[tokio::test]
    async fn test_unload() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.txt", "one");
        let b = write(&dir, "b.txt", "two");

        let mut controller = CorpusController::new(LoaderConfig::default());
        assert!(controller.load_corpus_from_filepaths(&[a.clone(), b]).await);
        assert!(controller.unload_corpus_file(&a));
        assert!(!controller.unload_corpus_file(&a));
        assert_eq!(controller.loaded_corpus_files().len(), 1);
        assert_eq!(controller.corpus_headers(), vec!["document", "filename"]);

        controller.unload_all();
        assert!(controller.loaded_corpus_files().is_empty());
    }
}
