use crate::constants::ARCHIVE_EXTENSIONS;
use crate::controller::Controller;
use crate::loader::{LoaderFactory, ValidFileType};
use crate::models::FileReference;
use crate::view::Widget;
use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Selection of files and directories to load, plus what has been loaded
#[derive(Debug, Default)]
pub struct FileLoaderWidget {
    corpus_files: Vec<String>,
    meta_files: Vec<String>,
    last_error: Option<String>,
}

impl FileLoaderWidget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn corpus_files(&self) -> &[String] {
        &self.corpus_files
    }

    pub fn meta_files(&self) -> &[String] {
        &self.meta_files
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Expand a user selection into file references.
    ///
    /// Directories are walked recursively and ZIP archives are opened; from
    /// those only supported, non-hidden files are kept. Files named directly
    /// are kept as given so unsupported ones surface as load errors.
    pub fn collect_file_refs<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<FileReference>> {
        let mut refs = Vec::new();

        for path in paths {
            let path = path.as_ref();
            if path.is_dir() {
                let walker = WalkDir::new(path)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
                for entry in walker {
                    let entry = entry?;
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    if is_archive(entry.path()) {
                        refs.extend(expand_archive(entry.path())?);
                        continue;
                    }
                    let file_ref = FileReference::from_path(entry.path());
                    if LoaderFactory::is_supported(&file_ref) {
                        refs.push(file_ref);
                    } else {
                        debug!(file = %file_ref, "skipping unsupported file");
                    }
                }
            } else if path.is_file() {
                if is_archive(path) {
                    refs.extend(expand_archive(path)?);
                } else {
                    refs.push(FileReference::from_path(path));
                }
            } else {
                bail!("Path does not exist: {}", path.display());
            }
        }

        Ok(refs)
    }
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ARCHIVE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Supported entries of a ZIP archive, in archive order
fn expand_archive(path: &Path) -> Result<Vec<FileReference>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open ZIP file: {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive: {}", path.display()))?;

    let mut refs = Vec::new();
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read file {} in ZIP", i))?;
        if entry.is_dir() {
            continue;
        }
        let file_ref = FileReference::from_zip_entry(path, entry.name());
        if !file_ref.is_hidden() && LoaderFactory::is_supported(&file_ref) {
            refs.push(file_ref);
        }
    }
    Ok(refs)
}

impl Widget for FileLoaderWidget {
    fn update_display(&mut self, controller: &dyn Controller) {
        self.corpus_files = controller
            .loaded_corpus_files()
            .iter()
            .map(|f| f.path())
            .collect();
        self.meta_files = controller
            .loaded_meta_files()
            .iter()
            .map(|f| f.path())
            .collect();
        self.last_error = controller.last_error().map(str::to_string);
    }

    fn render(&self) -> String {
        let mut out = format!("Supported file types: {}\n", ValidFileType::accepted_types());

        out.push_str(&format!("\nCorpus files ({}):", self.corpus_files.len()));
        for name in &self.corpus_files {
            out.push_str(&format!("\n  - {name}"));
        }
        out.push_str(&format!("\n\nMetadata files ({}):", self.meta_files.len()));
        for name in &self.meta_files {
            out.push_str(&format!("\n  - {name}"));
        }
        if let Some(error) = &self.last_error {
            out.push_str(&format!("\n\nError: {error}"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    #[test]
    fn test_collect_walks_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.csv"), "a").unwrap();
        std::fs::write(dir.path().join("nested/c.docx"), "c").unwrap();
        std::fs::write(dir.path().join("image.png"), "png").unwrap();
        std::fs::write(dir.path().join(".hidden.txt"), "h").unwrap();
        std::fs::write(dir.path().join(".git/config.txt"), "g").unwrap();

        let refs = FileLoaderWidget::collect_file_refs(&[dir.path()]).unwrap();
        let names: Vec<String> = refs.iter().map(|r| r.filename()).collect();
        assert_eq!(names, vec!["a.csv", "b.txt", "c.docx"]);
    }

    #[test]
    fn test_collect_keeps_explicit_unsupported_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, "%PDF").unwrap();

        let refs = FileLoaderWidget::collect_file_refs(&[&path]).unwrap();
        assert_eq!(refs, vec![FileReference::from_path(&path)]);
    }

    #[test]
    fn test_collect_expands_zip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundle.ZIP");
        let mut zip = ZipWriter::new(std::fs::File::create(&path).unwrap());
        zip.add_directory("texts/", FileOptions::default()).unwrap();
        zip.start_file("texts/one.txt", FileOptions::default()).unwrap();
        zip.write_all(b"one").unwrap();
        zip.start_file("__MACOSX/texts/._one.txt", FileOptions::default()).unwrap();
        zip.write_all(b"junk").unwrap();
        zip.start_file("notes.md", FileOptions::default()).unwrap();
        zip.write_all(b"skip").unwrap();
        zip.finish().unwrap();

        let refs = FileLoaderWidget::collect_file_refs(&[&path]).unwrap();
        assert_eq!(refs, vec![FileReference::from_zip_entry(&path, "texts/one.txt")]);
    }

    #[test]
    fn test_collect_missing_path() {
        let result = FileLoaderWidget::collect_file_refs(&["/definitely/not/here"]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_same_named_files_are_told_apart() {
        use crate::config::LoaderConfig;
        use crate::controller::CorpusController;

        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a").join("notes.txt");
        let b = dir.path().join("b").join("notes.txt");
        for path in [&a, &b] {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "text").unwrap();
        }

        let mut controller = CorpusController::new(LoaderConfig::default());
        let files = vec![FileReference::from_path(&a), FileReference::from_path(&b)];
        assert!(controller.load_corpus_from_filepaths(&files).await);

        let mut widget = FileLoaderWidget::new();
        widget.update_display(&controller);
        assert_eq!(
            widget.corpus_files(),
            &[a.display().to_string(), b.display().to_string()]
        );
    }

    #[test]
    fn test_render_lists_files_and_error() {
        let widget = FileLoaderWidget {
            corpus_files: vec!["a.txt".to_string()],
            meta_files: Vec::new(),
            last_error: Some("boom".to_string()),
        };
        let text = widget.render();
        assert!(text.contains("Corpus files (1):\n  - a.txt"));
        assert!(text.contains("Metadata files (0):"));
        assert!(text.ends_with("Error: boom"));
    }
}
