//! Query Panel
//!
//! Sends free-text SQL to the query service and turns the response into a
//! table of strings. The catalog is picked by a substring guess, not by
//! parsing the SQL.

use std::fmt;
use std::sync::Arc;

use policy_registry_client::QueryService;
use policy_types::{Catalog, QueryColumn, QueryRequest};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ConsoleError, Result};
use crate::sequence::RequestSequencer;

pub const DEFAULT_SCHEMA: &str = "public";
pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a SQL query";

/// `iceberg` when the text mentions it anywhere (any case), else `postgres`.
pub fn route_catalog(query: &str) -> Catalog {
    if query.to_lowercase().contains("iceberg") {
        Catalog::Iceberg
    } else {
        Catalog::Postgres
    }
}

/// Cell text: strings unquoted, null as empty, whole floats without a
/// fraction, everything else as JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableView {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    pub fn build(columns: &[QueryColumn], rows: &[Vec<Value>]) -> Self {
        Self {
            headers: columns.iter().map(|c| c.name().to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(cell_text).collect())
                .collect(),
        }
    }

    fn column_widths(&self) -> Vec<usize> {
        let width = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0);

        (0..width)
            .map(|i| {
                let header = self.headers.get(i).map(|h| h.chars().count()).unwrap_or(0);
                self.rows
                    .iter()
                    .filter_map(|r| r.get(i))
                    .map(|c| c.chars().count())
                    .chain(std::iter::once(header))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, widths: &[usize], cells: &[String]) -> fmt::Result {
    let padded: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            format!("{:<width$}", cell, width = *w)
        })
        .collect();
    writeln!(f, "| {} |", padded.join(" | "))
}

impl fmt::Display for TableView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.column_widths();

        write_row(f, &widths, &self.headers)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "|-{}-|", rule.join("-|-"))?;
        for row in &self.rows {
            write_row(f, &widths, row)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QueryOutcome {
    Table { query_id: String, table: TableView },
    /// Succeeded without columns/data
    NoData { query_id: String },
}

impl QueryOutcome {
    pub fn status_message(&self) -> String {
        match self {
            QueryOutcome::Table { query_id, .. } => {
                format!("Query executed successfully. Query ID: {}", query_id)
            }
            QueryOutcome::NoData { .. } => "Query executed but no data returned".to_string(),
        }
    }
}

pub struct QueryPanel {
    service: Arc<dyn QueryService>,
    sequencer: RequestSequencer,
}

impl QueryPanel {
    pub fn new(service: Arc<dyn QueryService>) -> Self {
        Self {
            service,
            sequencer: RequestSequencer::new(),
        }
    }

    /// Run `text` against the query service.
    ///
    /// Blank input is rejected without a request. `Ok(None)` means a newer
    /// query was issued before this one returned.
    pub async fn execute(&self, text: &str) -> Result<Option<QueryOutcome>> {
        let query = text.trim();
        if query.is_empty() {
            return Err(ConsoleError::LocalValidation(EMPTY_QUERY_MESSAGE.to_string()));
        }

        let request = QueryRequest {
            query: query.to_string(),
            catalog: route_catalog(query),
            schema: DEFAULT_SCHEMA.to_string(),
        };
        tracing::debug!(catalog = %request.catalog, "executing query");

        let ticket = self.sequencer.issue();
        let outcome = self.service.execute(&request).await;
        let Some(outcome) = self.sequencer.accept(ticket, outcome) else {
            return Ok(None);
        };

        let result = outcome?;
        if !result.success {
            let reason = result.error.unwrap_or_else(|| "Unknown error".to_string());
            return Err(ConsoleError::QueryFailed(reason));
        }

        let outcome = match (result.columns, result.rows) {
            (Some(columns), Some(rows)) => QueryOutcome::Table {
                query_id: result.query_id,
                table: TableView::build(&columns, &rows),
            },
            _ => QueryOutcome::NoData {
                query_id: result.query_id,
            },
        };
        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn catalog_routing() {
        assert_eq!(route_catalog("select * from iceberg.db.tbl"), Catalog::Iceberg);
        assert_eq!(route_catalog("SELECT * FROM ICEBERG.sales"), Catalog::Iceberg);
        assert_eq!(route_catalog("select 1"), Catalog::Postgres);
    }

    #[test]
    fn null_cells_render_empty() {
        let table = TableView::build(&[QueryColumn::named("id")], &[vec![json!(1)], vec![Value::Null]]);
        assert_eq!(table.headers, vec!["id"]);
        assert_eq!(table.rows, vec![vec!["1".to_string()], vec![String::new()]]);
    }

    #[test]
    fn cell_text_variants() {
        assert_eq!(cell_text(&json!("eu-west")), "eu-west");
        assert_eq!(cell_text(&json!(2.5)), "2.5");
        assert_eq!(cell_text(&json!(true)), "true");
        assert_eq!(cell_text(&json!(null)), "");
    }

    #[test]
    fn whole_floats_render_without_fraction() {
        assert_eq!(cell_text(&json!(1.0)), "1");
        assert_eq!(cell_text(&json!(-42.0)), "-42");
        assert_eq!(cell_text(&json!(0.25)), "0.25");
        assert_eq!(cell_text(&json!(7)), "7");
    }

    #[test]
    fn table_display_pads_columns() {
        let table = TableView {
            headers: vec!["id".into(), "email".into()],
            rows: vec![vec!["1".into(), "a@b.c".into()], vec!["22".into()]],
        };
        let text = table.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "| id | email |");
        assert_eq!(lines[1], "|----|-------|");
        assert_eq!(lines[2], "| 1  | a@b.c |");
        assert_eq!(lines[3], "| 22 |       |");
    }
}
