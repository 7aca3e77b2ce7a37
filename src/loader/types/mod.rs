pub mod csv;
pub mod docx;
pub mod odt;
pub mod ods;
pub mod r;
pub mod tsv;
pub mod txt;
pub mod xlsx;

pub use self::csv::CsvLoaderStrategy;
pub use docx::DocxLoaderStrategy;
pub use odt::OdtLoaderStrategy;
pub use ods::OdsLoaderStrategy;
pub use r::RLoaderStrategy;
pub use tsv::TsvLoaderStrategy;
pub use txt::TxtLoaderStrategy;
pub use xlsx::XlsxLoaderStrategy;

use crate::constants::{DEFAULT_TEXT_HEADER, FILENAME_HEADER};
use crate::corpus::Table;
use crate::models::{FileReference, LoadType};
use anyhow::{bail, Result};

/// One-row table holding a whole document and the file it came from.
/// Documents only feed the corpus, never metadata.
pub(crate) fn document_table(
    file_ref: &FileReference,
    load_type: LoadType,
    text: String,
) -> Result<Table> {
    if load_type == LoadType::Meta {
        bail!(
            "{} is a document file and cannot be loaded as metadata",
            file_ref.filename()
        );
    }

    let mut table = Table::new([DEFAULT_TEXT_HEADER, FILENAME_HEADER]);
    table.push_row(vec![text, file_ref.filename()]);
    Ok(table)
}
