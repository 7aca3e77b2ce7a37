use thiserror::Error;

/// Raised when a file cannot be matched to a loader
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileLoadError {
    #[error("No file extension found in file name: {filename}. File name must be in format <filename>.<extension>")]
    MissingExtension { filename: String },

    #[error("Invalid file type loaded: {extension}. Valid file types: {valid}")]
    InvalidFileType { extension: String, valid: String },
}
