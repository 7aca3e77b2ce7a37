use serde::Serialize;
use std::collections::HashMap;

/// Rows of string cells under ordered column headers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Empty table with the given headers. Blank headers become `column_{n}`.
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let headers = headers
            .into_iter()
            .enumerate()
            .map(|(i, header)| {
                let header: String = header.into();
                let trimmed = header.trim();
                if trimmed.is_empty() {
                    placeholder_header(i)
                } else {
                    trimmed.to_string()
                }
            })
            .collect();

        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Cell at `row` under `header`
    pub fn get(&self, row: usize, header: &str) -> Option<&str> {
        let col = self.column_index(header)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    /// Append a row. Short rows are padded, long rows add placeholder columns.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        while row.len() > self.headers.len() {
            self.add_column(placeholder_header(self.headers.len()));
        }
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// Concatenate `other` below this table, taking the union of columns.
    /// New columns keep their first-seen order and missing cells stay empty.
    pub fn append(&mut self, other: Table) {
        if self.headers.is_empty() && self.rows.is_empty() {
            *self = other;
            return;
        }

        let mapping: Vec<usize> = other
            .headers
            .iter()
            .map(|header| match self.column_index(header) {
                Some(idx) => idx,
                None => self.add_column(header.clone()),
            })
            .collect();

        for row in other.rows {
            let mut aligned = vec![String::new(); self.headers.len()];
            for (cell, &target) in row.into_iter().zip(&mapping) {
                aligned[target] = cell;
            }
            self.rows.push(aligned);
        }
    }

    /// Index rows by the value in `header`; the first occurrence wins
    pub fn index_by(&self, header: &str) -> Option<HashMap<&str, usize>> {
        let col = self.column_index(header)?;
        let mut index = HashMap::new();
        for (i, row) in self.rows.iter().enumerate() {
            index.entry(row[col].as_str()).or_insert(i);
        }
        Some(index)
    }

    /// Plain-text rendering of the headers and the first `max_rows` rows
    pub fn preview(&self, max_rows: usize) -> String {
        let shown = &self.rows[..self.rows.len().min(max_rows)];
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                shown
                    .iter()
                    .map(|row| display_cell(&row[col]).chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        out.push_str(&format_line(self.headers.iter().map(String::as_str), &widths));
        for row in shown {
            out.push('\n');
            let cells: Vec<String> = row.iter().map(|c| display_cell(c)).collect();
            out.push_str(&format_line(cells.iter().map(String::as_str), &widths));
        }
        if self.rows.len() > shown.len() {
            out.push_str(&format!("\n... {} more rows", self.rows.len() - shown.len()));
        }
        out
    }

    fn add_column(&mut self, header: String) -> usize {
        self.headers.push(header);
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }
}

fn placeholder_header(index: usize) -> String {
    format!("column_{}", index + 1)
}

const MAX_CELL_WIDTH: usize = 40;

fn display_cell(cell: &str) -> String {
    let flat = cell.replace(['\n', '\r', '\t'], " ");
    if flat.chars().count() > MAX_CELL_WIDTH {
        let cut: String = flat.chars().take(MAX_CELL_WIDTH - 3).collect();
        format!("{cut}...")
    } else {
        flat
    }
}

fn format_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}
