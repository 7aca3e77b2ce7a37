pub mod config;
pub mod constants;
pub mod controller;
pub mod corpus;
pub mod loader;
pub mod models;
pub mod utils;
pub mod view;

pub use controller::{Controller, CorpusController};
pub use corpus::{Corpus, Document, Table};
pub use loader::{FileLoadError, FileLoaderStrategy, LoaderFactory, ValidFileType};
pub use models::{FileReference, LoadType};
pub use view::ViewWrapper;
