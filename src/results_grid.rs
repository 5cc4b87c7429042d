use crate::core::db::query::{format_value, QueryResult};
use crate::core::{Result, SqlpeekError};

/// Results Grid Module for sqlpeek
///
/// This module renders tabular results as text. One grid implementation
/// serves every consumer: per-table browsing, ad-hoc query results and the
/// degenerate single-cell error results all flow through the same
/// (headers, rows) shape. It includes a virtualized viewport for large
/// datasets and export functionality.

use rusqlite::types::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Represents a single cell in the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub content: String,
    /// Scalar type of the originating value ("integer", "text", ...).
    pub cell_type: String,
}

/// Represents a row of cells in the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Display label shown in the leftmost column.
    pub label: String,
    pub cells: Vec<Cell>,
    pub row_index: usize,
}

/// How row labels are assigned when filling the grid from a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLabels {
    /// Label rows with their 1-based position (table browsing).
    Position,
    /// Label rows with their first value; remaining values become cells
    /// (ad-hoc query results).
    FirstValue,
}

/// Represents the viewport for virtualized scrolling.
#[derive(Debug, Clone)]
pub struct Viewport {
    pub start: usize,
    pub end: usize,
}

impl Viewport {
    pub fn new(start: usize, end: usize) -> Self {
        Viewport { start, end }
    }

    pub fn visible_rows<'a>(&self, rows: &'a [Row]) -> &'a [Row] {
        let start = self.start.min(rows.len());
        let end = self.end.min(rows.len());
        &rows[start..end]
    }

    pub fn scroll_down(&mut self, total_rows: usize) {
        if self.end < total_rows {
            self.start += 1;
            self.end += 1;
        }
    }

    pub fn scroll_up(&mut self) {
        if self.start > 0 {
            self.start -= 1;
            self.end -= 1;
        }
    }
}

/// Represents the entire grid structure.
#[derive(Debug, Clone)]
pub struct ResultsGrid {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub viewport: Viewport,
    label_mode: RowLabels,
}

impl ResultsGrid {
    /// Creates a new, empty ResultsGrid.
    pub fn new() -> Self {
        ResultsGrid {
            headers: Vec::new(),
            rows: Vec::new(),
            viewport: Viewport::new(0, 10), // Default viewport with 10 rows
            label_mode: RowLabels::Position,
        }
    }

    /// Creates a grid with a viewport of the given height.
    pub fn with_viewport_rows(height: usize) -> Self {
        let mut grid = ResultsGrid::new();
        grid.viewport = Viewport::new(0, height);
        grid
    }

    /// Sets the headers for the grid.
    pub fn set_headers(&mut self, headers: Vec<String>) {
        self.headers = headers;
    }

    /// Adds a position-labeled row. Each row is a vector of strings.
    pub fn add_row(&mut self, row: Vec<String>) {
        let cells = row
            .into_iter()
            .map(|s| Cell {
                content: s,
                cell_type: "text".to_string(),
            })
            .collect();
        self.rows.push(Row {
            label: (self.rows.len() + 1).to_string(),
            cells,
            row_index: self.rows.len(),
        });
    }

    /// Replaces the grid contents with a query result.
    ///
    /// Any column count is accepted, including the single synthetic column
    /// of mutation counts and packaged errors. Rows that cannot be placed
    /// in the grid (wrong arity for the headers, or no leading value to
    /// label with) are logged and skipped individually; one bad row never
    /// aborts the rendering.
    pub fn fill(&mut self, result: &QueryResult, labels: RowLabels) {
        self.headers = result.columns.clone();
        self.rows.clear();
        self.label_mode = labels;

        for (idx, values) in result.rows.iter().enumerate() {
            if values.len() != result.columns.len() {
                warn!(
                    row = idx,
                    cells = values.len(),
                    expected = result.columns.len(),
                    "skipping malformed row"
                );
                continue;
            }
            let (label, cells) = match labels {
                RowLabels::Position => (format!("{}", idx + 1), values.as_slice()),
                RowLabels::FirstValue => match values.split_first() {
                    Some((first, rest)) => (format_value(first), rest),
                    None => {
                        warn!(row = idx, "skipping row with no label value");
                        continue;
                    }
                },
            };
            let cells = cells
                .iter()
                .map(|value| Cell {
                    content: format_value(value),
                    cell_type: value_type_name(value).to_string(),
                })
                .collect();
            self.rows.push(Row {
                label,
                cells,
                row_index: self.rows.len(),
            });
        }
    }

    /// Returns the full cell contents of a row, aligned with the headers.
    fn full_cells(&self, row: &Row) -> Vec<String> {
        let cells = row.cells.iter().map(|cell| cell.content.clone());
        match self.label_mode {
            RowLabels::Position => cells.collect(),
            RowLabels::FirstValue => std::iter::once(row.label.clone()).chain(cells).collect(),
        }
    }

    /// Renders the grid as a simple string with headers and visible rows.
    pub fn render(&self) -> String {
        let mut output = String::new();
        if !self.headers.is_empty() {
            let header_line = match self.label_mode {
                RowLabels::Position => {
                    let mut line = vec!["#".to_string()];
                    line.extend(self.headers.iter().cloned());
                    line.join(" | ")
                }
                RowLabels::FirstValue => self.headers.join(" | "),
            };
            output.push_str(&header_line);
            output.push('\n');
            output.push_str(&"-".repeat(header_line.len()));
            output.push('\n');
        }
        for row in self.viewport.visible_rows(&self.rows) {
            let mut line = vec![row.label.clone()];
            line.extend(row.cells.iter().map(|cell| cell.content.clone()));
            output.push_str(&line.join(" | "));
            output.push('\n');
        }
        output
    }

    /// Exports the grid data to a specified format.
    /// Supported formats: CSV, JSON, Markdown.
    pub fn export(&self, format: &str) -> Result<String> {
        match format.to_lowercase().as_str() {
            "csv" => self.export_to_csv(),
            "json" => self.export_to_json(),
            "markdown" => self.export_to_markdown(),
            _ => Err(SqlpeekError::App(format!(
                "Unsupported export format: '{}'. Supported formats: csv, json, markdown",
                format
            ))),
        }
    }

    fn export_to_csv(&self) -> Result<String> {
        let mut output = String::new();
        if !self.headers.is_empty() {
            output.push_str(&self.headers.join(","));
            output.push('\n');
        }
        for row in &self.rows {
            output.push_str(&self.full_cells(row).join(","));
            output.push('\n');
        }
        Ok(output)
    }

    fn export_to_json(&self) -> Result<String> {
        let mut rows = Vec::new();
        for row in &self.rows {
            let mut row_map = BTreeMap::new();
            for (i, content) in self.full_cells(row).into_iter().enumerate() {
                if let Some(header) = self.headers.get(i) {
                    row_map.insert(header.clone(), content);
                }
            }
            rows.push(row_map);
        }
        serde_json::to_string(&rows).map_err(|e| SqlpeekError::App(e.to_string()))
    }

    fn export_to_markdown(&self) -> Result<String> {
        let mut output = String::new();
        if !self.headers.is_empty() {
            output.push_str(&self.headers.join(" | "));
            output.push('\n');
            let underline: Vec<String> = self
                .headers
                .iter()
                .map(|h| "-".repeat(h.len()))
                .collect();
            output.push_str(&underline.join(" | "));
            output.push('\n');
        }
        for row in &self.rows {
            output.push_str(&self.full_cells(row).join(" | "));
            output.push('\n');
        }
        Ok(output)
    }
}

impl Default for ResultsGrid {
    fn default() -> Self {
        ResultsGrid::new()
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Integer(_) => "integer",
        Value::Real(_) => "real",
        Value::Text(_) => "text",
        Value::Blob(_) => "blob",
    }
}
