use crate::corpus::Table;
use crate::loader::{FileLoaderStrategy, LoaderKind};
use crate::models::{FileReference, LoadType};
use crate::utils::format_number;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use calamine::{Data, Reader, Xlsx};
use std::fmt::Display;
use std::io::Cursor;

/// Excel workbook loader
pub struct XlsxLoaderStrategy {
    file_ref: FileReference,
}

impl XlsxLoaderStrategy {
    pub fn new(file_ref: FileReference) -> Self {
        Self { file_ref }
    }
}

#[async_trait]
impl FileLoaderStrategy for XlsxLoaderStrategy {
    async fn load(&self, _load_type: LoadType) -> Result<Table> {
        let bytes = self.file_ref.read_bytes().await?;
        let name = self.file_ref.path();
        tokio::task::spawn_blocking(move || -> Result<Table> {
            let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
                .map_err(|e| anyhow!("Not a valid XLSX workbook: {e}"))?;
            read_workbook(&mut workbook)
        })
        .await?
        .with_context(|| format!("Failed to read XLSX file: {name}"))
    }

    fn file_ref(&self) -> &FileReference {
        &self.file_ref
    }

    fn kind(&self) -> LoaderKind {
        LoaderKind::Xlsx
    }
}

/// Concatenate every non-empty sheet. The first non-blank row of a sheet is
/// its header; blank rows are skipped.
pub(crate) fn read_workbook<R>(workbook: &mut R) -> Result<Table>
where
    R: Reader<Cursor<Vec<u8>>>,
    R::Error: Display,
{
    let mut table = Table::default();

    for sheet in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| anyhow!("Failed to read sheet {sheet}: {e}"))?;

        let mut rows = range
            .rows()
            .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)));

        let Some(header_row) = rows.next() else {
            tracing::debug!(sheet = %sheet, "skipping empty sheet");
            continue;
        };

        let mut sheet_table = Table::new(header_row.iter().map(cell_to_string));
        for row in rows {
            sheet_table.push_row(row.iter().map(cell_to_string).collect());
        }
        table.append(sheet_table);
    }

    Ok(table)
}

pub(crate) fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_number(*f),
        Data::String(s) => s.clone(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => format_number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
    const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    /// Worksheet XML; numeric values become number cells, others inline strings.
    /// Rows start at `first_row` (1-based).
    fn sheet_xml(first_row: usize, rows: &[&[&str]]) -> String {
        let body: String = rows
            .iter()
            .enumerate()
            .map(|(r, row)| {
                let r = r + first_row;
                let cells: String = row
                    .iter()
                    .enumerate()
                    .map(|(c, value)| {
                        let reference = format!("{}{}", char::from(b'A' + c as u8), r);
                        if value.parse::<f64>().is_ok() {
                            format!(r#"<c r="{reference}"><v>{value}</v></c>"#)
                        } else {
                            format!(r#"<c r="{reference}" t="inlineStr"><is><t>{value}</t></is></c>"#)
                        }
                    })
                    .collect();
                format!(r#"<row r="{r}">{cells}</row>"#)
            })
            .collect();
        format!(r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="{MAIN_NS}"><sheetData>{body}</sheetData></worksheet>"#)
    }

    fn write_xlsx(path: &std::path::Path, sheets: &[(&str, String)]) {
        let mut sheet_entries = String::new();
        let mut rels = String::new();
        let mut overrides = String::new();
        for (i, (name, _)) in sheets.iter().enumerate() {
            let n = i + 1;
            sheet_entries.push_str(&format!(r#"<sheet name="{name}" sheetId="{n}" r:id="rId{n}"/>"#));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{n}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{n}.xml"/>"#
            ));
            overrides.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            ));
        }

        let content_types = format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
                r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
                r#"<Default Extension="xml" ContentType="application/xml"/>"#,
                r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
                "{}</Types>"
            ),
            overrides
        );
        let root_rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
        );
        let workbook = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets>{sheet_entries}</sheets></workbook>"#
        );
        let workbook_rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
        );

        let mut zip = ZipWriter::new(std::fs::File::create(path).unwrap());
        let mut add = |name: &str, content: &str| {
            zip.start_file(name, FileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        };
        add("[Content_Types].xml", &content_types);
        add("_rels/.rels", &root_rels);
        add("xl/workbook.xml", &workbook);
        add("xl/_rels/workbook.xml.rels", &workbook_rels);
        for (i, (_, xml)) in sheets.iter().enumerate() {
            add(&format!("xl/worksheets/sheet{}.xml", i + 1), xml);
        }
        zip.finish().unwrap();
    }

    #[tokio::test]
    async fn test_xlsx_single_sheet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("speeches.xlsx");
        write_xlsx(
            &path,
            &[(
                "Speeches",
                sheet_xml(3, &[&["document", "year"], &["We choose", "1962"], &["Ask not", "1961.5"]]),
            )],
        );

        let loader = XlsxLoaderStrategy::new(FileReference::from_path(&path));
        let table = loader.load(LoadType::Corpus).await.unwrap();

        assert_eq!(table.headers(), ["document", "year"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "document"), Some("We choose"));
        assert_eq!(table.get(0, "year"), Some("1962"));
        assert_eq!(table.get(1, "year"), Some("1961.5"));
    }

    #[tokio::test]
    async fn test_xlsx_sheets_are_unioned_and_empty_sheets_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta.xlsx");
        write_xlsx(
            &path,
            &[
                ("Authors", sheet_xml(1, &[&["id", "author"], &["1", "Ann"]])),
                ("Blank", sheet_xml(1, &[])),
                ("Years", sheet_xml(2, &[&["id", "year"], &["2", "1999"]])),
            ],
        );

        let loader = XlsxLoaderStrategy::new(FileReference::from_path(&path));
        let table = loader.load(LoadType::Meta).await.unwrap();

        assert_eq!(table.headers(), ["id", "author", "year"]);
        assert_eq!(table.rows()[0], vec!["1", "Ann", ""]);
        assert_eq!(table.rows()[1], vec!["2", "", "1999"]);
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&Data::Int(7)), "7");
        assert_eq!(cell_to_string(&Data::Float(2.0)), "2");
        assert_eq!(cell_to_string(&Data::Float(0.25)), "0.25");
        assert_eq!(cell_to_string(&Data::String("abc".to_string())), "abc");
        assert_eq!(cell_to_string(&Data::Bool(false)), "FALSE");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }

    #[tokio::test]
    async fn test_xlsx_rejects_garbage() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, "not a workbook").unwrap();

        let loader = XlsxLoaderStrategy::new(FileReference::from_path(&path));
        let err = loader.load(LoadType::Corpus).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read XLSX file"));
    }
}
