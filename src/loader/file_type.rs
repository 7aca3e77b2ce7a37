use std::fmt;

/// File extensions that have a loader, in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidFileType {
    Txt,
    Odt,
    Docx,
    Csv,
    Tsv,
    Xlsx,
    Ods,
    Rds,
    Rdata,
    Rda,
}

impl ValidFileType {
    pub const ALL: [ValidFileType; 10] = [
        ValidFileType::Txt,
        ValidFileType::Odt,
        ValidFileType::Docx,
        ValidFileType::Csv,
        ValidFileType::Tsv,
        ValidFileType::Xlsx,
        ValidFileType::Ods,
        ValidFileType::Rds,
        ValidFileType::Rdata,
        ValidFileType::Rda,
    ];

    /// Upper-case extension tag
    pub fn name(self) -> &'static str {
        match self {
            ValidFileType::Txt => "TXT",
            ValidFileType::Odt => "ODT",
            ValidFileType::Docx => "DOCX",
            ValidFileType::Csv => "CSV",
            ValidFileType::Tsv => "TSV",
            ValidFileType::Xlsx => "XLSX",
            ValidFileType::Ods => "ODS",
            ValidFileType::Rds => "RDS",
            ValidFileType::Rdata => "RDATA",
            ValidFileType::Rda => "RDA",
        }
    }

    /// Exact match against an upper-cased extension
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|file_type| file_type.name() == name)
    }

    /// Comma separated list of every accepted extension
    pub fn accepted_types() -> String {
        Self::ALL
            .iter()
            .map(|file_type| file_type.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether the format holds rows and columns rather than a single document
    pub fn is_tabular(self) -> bool {
        !matches!(
            self,
            ValidFileType::Txt | ValidFileType::Odt | ValidFileType::Docx
        )
    }
}

impl fmt::Display for ValidFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
