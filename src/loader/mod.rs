pub mod error;
pub mod factory;
pub mod file_type;
pub mod rdata;
pub mod r#trait;
pub mod types;
pub mod xml;

pub use error::FileLoadError;
pub use factory::LoaderFactory;
pub use file_type::ValidFileType;
pub use r#trait::{FileLoaderStrategy, LoaderKind};
