use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Where the bytes of a referenced file live
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileSource {
    /// Regular file on disk
    Disk(PathBuf),
    /// Entry inside a ZIP archive on disk
    ZipEntry { archive: PathBuf, entry: String },
}

/// Immutable reference to a source file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileReference {
    source: FileSource,
}

impl FileReference {
    /// Reference a file on disk
    pub fn from_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            source: FileSource::Disk(path.into()),
        }
    }

    /// Reference an entry inside a ZIP archive
    pub fn from_zip_entry<P: Into<PathBuf>, S: Into<String>>(archive: P, entry: S) -> Self {
        Self {
            source: FileSource::ZipEntry {
                archive: archive.into(),
                entry: entry.into(),
            },
        }
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    /// Final component of the file's name
    pub fn filename(&self) -> String {
        match &self.source {
            FileSource::Disk(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            FileSource::ZipEntry { entry, .. } => entry
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or(entry)
                .to_string(),
        }
    }

    /// Text after the last `.` of the filename, empty when there is none.
    /// Case is preserved.
    pub fn extension(&self) -> String {
        Path::new(&self.filename())
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Display path, `archive.zip/inner/name.txt` for archive entries
    pub fn path(&self) -> String {
        match &self.source {
            FileSource::Disk(path) => path.display().to_string(),
            FileSource::ZipEntry { archive, entry } => format!("{}/{}", archive.display(), entry),
        }
    }

    /// Dotfiles and entries under dot-directories
    pub fn is_hidden(&self) -> bool {
        let name = self.filename();
        if name.starts_with('.') {
            return true;
        }
        match &self.source {
            FileSource::Disk(_) => false,
            FileSource::ZipEntry { entry, .. } => entry
                .split('/')
                .any(|part| part.starts_with('.') || part == "__MACOSX"),
        }
    }

    /// Read the whole file into memory
    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        match &self.source {
            FileSource::Disk(path) => tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read file: {}", path.display())),
            FileSource::ZipEntry { archive, entry } => {
                let archive = archive.clone();
                let entry = entry.clone();
                tokio::task::spawn_blocking(move || read_zip_entry(&archive, &entry)).await?
            }
        }
    }
}

impl fmt::Display for FileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

fn read_zip_entry(archive: &Path, entry: &str) -> Result<Vec<u8>> {
    let file = std::fs::File::open(archive)
        .with_context(|| format!("Failed to open ZIP file: {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive: {}", archive.display()))?;
    let mut member = zip
        .by_name(entry)
        .with_context(|| format!("Entry {} not found in {}", entry, archive.display()))?;

    let mut bytes = Vec::new();
    member
        .read_to_end(&mut bytes)
        .with_context(|| format!("Failed to read {} in {}", entry, archive.display()))?;
    Ok(bytes)
}

/// Whether a file feeds corpus documents or metadata records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadType {
    Corpus,
    Meta,
}

impl fmt::Display for LoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadType::Corpus => f.write_str("corpus"),
            LoadType::Meta => f.write_str("metadata"),
        }
    }
}
