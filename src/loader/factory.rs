use crate::loader::types::{
    CsvLoaderStrategy, DocxLoaderStrategy, OdsLoaderStrategy, OdtLoaderStrategy, RLoaderStrategy,
    TsvLoaderStrategy, TxtLoaderStrategy, XlsxLoaderStrategy,
};
use crate::loader::{FileLoadError, FileLoaderStrategy, ValidFileType};
use crate::models::FileReference;
use std::sync::Arc;

/// Factory for creating loader strategies based on file extension.
/// Extensions are matched case-insensitively.
pub struct LoaderFactory;

impl LoaderFactory {
    /// Map a file reference to the loader for its extension
    pub fn get_file_loader(
        file_ref: &FileReference,
    ) -> Result<Arc<dyn FileLoaderStrategy>, FileLoadError> {
        let file_type = Self::file_type(file_ref)?;
        Ok(Self::create(file_type, file_ref.clone()))
    }

    /// Resolve the file type of a reference without building a loader
    pub fn file_type(file_ref: &FileReference) -> Result<ValidFileType, FileLoadError> {
        let extension = file_ref.extension().to_uppercase();
        if extension.is_empty() {
            return Err(FileLoadError::MissingExtension {
                filename: file_ref.filename(),
            });
        }

        ValidFileType::from_name(&extension).ok_or_else(|| FileLoadError::InvalidFileType {
            extension,
            valid: ValidFileType::accepted_types(),
        })
    }

    pub fn is_supported(file_ref: &FileReference) -> bool {
        Self::file_type(file_ref).is_ok()
    }

    /// Build the loader for a file type
    pub fn create(file_type: ValidFileType, file_ref: FileReference) -> Arc<dyn FileLoaderStrategy> {
        match file_type {
            ValidFileType::Txt => Arc::new(TxtLoaderStrategy::new(file_ref)),
            ValidFileType::Odt => Arc::new(OdtLoaderStrategy::new(file_ref)),
            ValidFileType::Docx => Arc::new(DocxLoaderStrategy::new(file_ref)),
            ValidFileType::Csv => Arc::new(CsvLoaderStrategy::new(file_ref)),
            ValidFileType::Tsv => Arc::new(TsvLoaderStrategy::new(file_ref)),
            ValidFileType::Xlsx => Arc::new(XlsxLoaderStrategy::new(file_ref)),
            ValidFileType::Ods => Arc::new(OdsLoaderStrategy::new(file_ref)),
            ValidFileType::Rds | ValidFileType::Rdata | ValidFileType::Rda => {
                Arc::new(RLoaderStrategy::new(file_ref))
            }
        }
    }
}
