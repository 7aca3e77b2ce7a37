//! Constants shared across the corpus loader

/// Column holding document text in loaded tables
pub const DEFAULT_TEXT_HEADER: &str = "document";

/// Column recording the source file of a text document
pub const FILENAME_HEADER: &str = "filename";

/// Corpus name used when none is given
pub const DEFAULT_CORPUS_NAME: &str = "corpus";

/// Metadata descriptor at the root of an RO-Crate
pub const RO_CRATE_METADATA: &str = "ro-crate-metadata.json";

/// Archives expanded into their entries when selected
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip"];

/// Tab titles, in display order
pub const FILE_LOADER_TAB: &str = "File Loader";
pub const ONI_LOADER_TAB: &str = "Oni Loader";
pub const CORPUS_OVERVIEW_TAB: &str = "Corpus Overview";

/// Config file locations, searched in order
pub const CONFIG_PATHS: &[&str] = &[
    "config/settings.toml",
    "./config/settings.toml",
    "~/.config/corpusloader/settings.toml",
];
