pub mod table;

pub use table::Table;

use serde::Serialize;
use std::collections::BTreeMap;

/// One document of a built corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

/// A named collection of documents with shared metadata columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Corpus {
    pub name: String,
    /// Metadata column names in load order
    pub meta_headers: Vec<String>,
    pub documents: Vec<Document>,
}

impl Corpus {
    pub fn new(name: impl Into<String>, meta_headers: Vec<String>, documents: Vec<Document>) -> Self {
        Self {
            name: name.into(),
            meta_headers,
            documents,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
