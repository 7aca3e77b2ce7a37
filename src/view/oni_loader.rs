use crate::constants::RO_CRATE_METADATA;
use crate::controller::Controller;
use crate::loader::LoaderFactory;
use crate::models::FileReference;
use crate::view::Widget;
use anyhow::{anyhow, Context, Result};
use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// An RO-Crate opened from a local directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OniCrate {
    pub name: String,
    pub root: PathBuf,
    pub files: Vec<FileReference>,
}

impl OniCrate {
    /// Read `ro-crate-metadata.json` from `dir` and collect its supported files
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let root = dir.as_ref().to_path_buf();
        let metadata_path = root.join(RO_CRATE_METADATA);
        let content = std::fs::read_to_string(&metadata_path)
            .with_context(|| format!("Failed to read crate metadata: {}", metadata_path.display()))?;
        let json: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse crate metadata: {}", metadata_path.display()))?;

        let graph = json
            .get("@graph")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("No @graph found in {}", metadata_path.display()))?;

        let name = graph
            .iter()
            .find(|entity| entity.get("@id").and_then(Value::as_str) == Some("./"))
            .and_then(|entity| entity.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                root.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });

        let mut files = Vec::new();
        for entity in graph.iter().filter(|e| is_file_entity(e)) {
            let Some(id) = entity.get("@id").and_then(Value::as_str) else {
                continue;
            };
            if id.starts_with("http://") || id.starts_with("https://") {
                debug!(id, "skipping remote file entity");
                continue;
            }
            let Some(path) = resolve_file_id(&root, id) else {
                warn!(id, "skipping file entity outside the crate");
                continue;
            };
            let file_ref = FileReference::from_path(path);
            if LoaderFactory::is_supported(&file_ref) {
                files.push(file_ref);
            }
        }

        info!(crate_name = %name, files = files.len(), "opened RO-Crate");
        Ok(Self { name, root, files })
    }
}

/// Percent-decode a file id and place it under the crate root. Absolute ids
/// and ids with `..` components are rejected.
fn resolve_file_id(root: &Path, id: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(id).decode_utf8().ok()?;
    let mut path = root.to_path_buf();
    let mut has_name = false;
    for component in Path::new(decoded.as_ref()).components() {
        match component {
            Component::Normal(part) => {
                path.push(part);
                has_name = true;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    has_name.then_some(path)
}

fn is_file_entity(entity: &Value) -> bool {
    match entity.get("@type") {
        Some(Value::String(t)) => t == "File",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("File")),
        _ => false,
    }
}

/// Browses a local RO-Crate and offers its files for loading
#[derive(Debug, Default)]
pub struct OniLoaderWidget {
    current: Option<OniCrate>,
    loaded: HashSet<FileReference>,
}

impl OniLoaderWidget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_crate<P: AsRef<Path>>(&mut self, dir: P) -> Result<&OniCrate> {
        let opened = OniCrate::open(dir)?;
        Ok(self.current.insert(opened))
    }

    pub fn current(&self) -> Option<&OniCrate> {
        self.current.as_ref()
    }

    /// Files of the open crate, empty when none is open
    pub fn file_refs(&self) -> Vec<FileReference> {
        self.current
            .as_ref()
            .map(|c| c.files.clone())
            .unwrap_or_default()
    }
}

impl Widget for OniLoaderWidget {
    fn update_display(&mut self, controller: &dyn Controller) {
        self.loaded = controller
            .loaded_corpus_files()
            .into_iter()
            .chain(controller.loaded_meta_files())
            .cloned()
            .collect();
    }

    fn render(&self) -> String {
        let Some(current) = &self.current else {
            return "No RO-Crate opened".to_string();
        };

        let mut out = format!("Crate: {}\n  Files: {}", current.name, current.files.len());
        for file in &current.files {
            let marker = if self.loaded.contains(file) { " (loaded)" } else { "" };
            out.push_str(&format!("\n  - {}{}", file.filename(), marker));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoaderConfig;
    use crate::controller::CorpusController;
    use tempfile::TempDir;

    fn write_crate(dir: &TempDir) {
        let metadata = serde_json::json!({
            "@context": "https://w3id.org/ro/crate/1.1/context",
            "@graph": [
                {"@id": "ro-crate-metadata.json", "@type": "CreativeWork"},
                {"@id": "./", "@type": "Dataset", "name": "Interview Collection"},
                {"@id": "data/one.txt", "@type": "File"},
                {"@id": "data/meta.csv", "@type": ["File", "Dataset"]},
                {"@id": "data/audio.wav", "@type": "File"},
                {"@id": "https://example.org/remote.txt", "@type": "File"},
                {"@id": "#person1", "@type": "Person", "name": "A"}
            ]
        });
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/one.txt"), "hello").unwrap();
        std::fs::write(dir.path().join("data/meta.csv"), "id\n1\n").unwrap();
        std::fs::write(dir.path().join(RO_CRATE_METADATA), metadata.to_string()).unwrap();
    }

    #[test]
    fn test_open_crate_lists_supported_files() {
        let dir = TempDir::new().unwrap();
        write_crate(&dir);

        let opened = OniCrate::open(dir.path()).unwrap();
        assert_eq!(opened.name, "Interview Collection");
        assert_eq!(
            opened.files,
            vec![
                FileReference::from_path(dir.path().join("data/one.txt")),
                FileReference::from_path(dir.path().join("data/meta.csv")),
            ]
        );
    }

    #[test]
    fn test_file_ids_stay_inside_crate() {
        let dir = TempDir::new().unwrap();
        let metadata = serde_json::json!({
            "@graph": [
                {"@id": "./", "@type": "Dataset", "name": "Escapes"},
                {"@id": "../secret.txt", "@type": "File"},
                {"@id": "/etc/hostname.txt", "@type": "File"},
                {"@id": "data/../../up.txt", "@type": "File"},
                {"@id": "./data/field%20notes.txt", "@type": "File"}
            ]
        });
        std::fs::write(dir.path().join(RO_CRATE_METADATA), metadata.to_string()).unwrap();

        let opened = OniCrate::open(dir.path()).unwrap();
        assert_eq!(
            opened.files,
            vec![FileReference::from_path(dir.path().join("data").join("field notes.txt"))]
        );
    }

    #[test]
    fn test_resolve_file_id() {
        let root = Path::new("/crates/demo");
        assert_eq!(
            resolve_file_id(root, "a/b.csv"),
            Some(PathBuf::from("/crates/demo/a/b.csv"))
        );
        assert_eq!(resolve_file_id(root, "./"), None);
        assert_eq!(resolve_file_id(root, ".."), None);
        assert_eq!(resolve_file_id(root, "/abs.txt"), None);
    }

    #[test]
    fn test_open_crate_without_metadata() {
        let dir = TempDir::new().unwrap();
        assert!(OniCrate::open(dir.path()).is_err());
    }

    #[test]
    fn test_open_crate_without_graph() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(RO_CRATE_METADATA), "{}").unwrap();
        let err = OniCrate::open(dir.path()).unwrap_err();
        assert!(err.to_string().contains("No @graph"));
    }

    #[tokio::test]
    async fn test_render_marks_loaded_files() {
        let dir = TempDir::new().unwrap();
        write_crate(&dir);

        let mut widget = OniLoaderWidget::new();
        assert_eq!(widget.render(), "No RO-Crate opened");
        widget.open_crate(dir.path()).unwrap();

        let mut controller = CorpusController::new(LoaderConfig::default());
        let texts: Vec<FileReference> = widget
            .file_refs()
            .into_iter()
            .filter(|f| f.extension() == "txt")
            .collect();
        assert!(controller.load_corpus_from_filepaths(&texts).await);

        widget.update_display(&controller);
        let text = widget.render();
        assert!(text.starts_with("Crate: Interview Collection\n  Files: 2"));
        assert!(text.contains("- one.txt (loaded)"));
        assert!(text.contains("- meta.csv\n") || text.ends_with("- meta.csv"));
    }
}
