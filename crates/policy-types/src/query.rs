//! Query API types (`POST /query`)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Query-engine routing target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Catalog {
    #[default]
    Postgres,
    Iceberg,
}

impl Catalog {
    pub fn as_str(&self) -> &'static str {
        match self {
            Catalog::Postgres => "postgres",
            Catalog::Iceberg => "iceberg",
        }
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body for `POST /query`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub catalog: Catalog,
    pub schema: String,
}

/// Result column. The service sends `{name, type}` objects, older
/// deployments send bare column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryColumn {
    Named {
        name: String,
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        column_type: Option<String>,
    },
    Bare(String),
}

impl QueryColumn {
    pub fn named(name: impl Into<String>) -> Self {
        QueryColumn::Named {
            name: name.into(),
            column_type: None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            QueryColumn::Named { name, .. } => name,
            QueryColumn::Bare(name) => name,
        }
    }
}

/// Response from `POST /query`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub success: bool,
    #[serde(default)]
    pub query_id: String,
    #[serde(default)]
    pub columns: Option<Vec<QueryColumn>>,
    /// Row-major cells, JSON scalars
    #[serde(default, rename = "data")]
    pub rows: Option<Vec<Vec<serde_json::Value>>>,
    #[serde(default)]
    pub error: Option<String>,
}
