//! Resource records of the BigQuery v2 REST API, limited to the fields used here.

use serde::{Deserialize, Serialize};

use crate::row::VisitRow;

/// Kind tag of an `insertAll` request body.
pub const INSERT_ALL_KIND: &str = "bigquery#tableDataInsertAllRequest";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetReference {
    pub project_id: String,
    pub dataset_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub dataset_reference: DatasetReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReference {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl TableReference {
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
        }
    }

    /// Reference to the dataset holding this table.
    pub fn dataset(&self) -> DatasetReference {
        DatasetReference {
            project_id: self.project_id.clone(),
            dataset_id: self.dataset_id.clone(),
        }
    }
}

impl std::fmt::Display for TableReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    String,
    Timestamp,
    Record,
    Integer,
    Boolean,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldMode {
    Nullable,
    Required,
    Repeated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableFieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<FieldMode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<TableFieldSchema>,
}

impl TableFieldSchema {
    pub fn new(name: &str, field_type: FieldType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            description: description.to_string(),
            mode: None,
            fields: Vec::new(),
        }
    }

    /// Repeated record with the given sub-fields.
    pub fn repeated_record(name: &str, description: &str, fields: Vec<TableFieldSchema>) -> Self {
        Self {
            mode: Some(FieldMode::Repeated),
            fields,
            ..Self::new(name, FieldType::Record, description)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub fields: Vec<TableFieldSchema>,
}

/// Table resource as sent to `tables.insert`. Reference and schema are
/// optional so that an incomplete descriptor can be rejected before any call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_reference: Option<TableReference>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub friendly_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<TableSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertRow {
    /// De-duplication key: a row resent by the retry is stored only once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_id: Option<String>,
    pub json: VisitRow,
}

impl InsertRow {
    pub fn new(json: VisitRow) -> Self {
        Self {
            insert_id: Some(uuid::Uuid::new_v4().to_string()),
            json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertAllRequest {
    pub kind: String,
    pub rows: Vec<InsertRow>,
}

impl InsertAllRequest {
    pub fn new(rows: Vec<VisitRow>) -> Self {
        Self {
            kind: INSERT_ALL_KIND.to_string(),
            rows: rows.into_iter().map(InsertRow::new).collect(),
        }
    }
}

/// One error reported for a row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorProto {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub debug_info: String,
    #[serde(default)]
    pub message: String,
}

impl ErrorProto {
    /// An entry only counts as an error if one of its fields is filled in.
    pub fn is_error(&self) -> bool {
        !self.reason.is_empty() || !self.message.is_empty() || !self.debug_info.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowInsertErrors {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

/// Insert outcome: per-row error lists, empty when every row was accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAllResponse {
    #[serde(default)]
    pub insert_errors: Vec<RowInsertErrors>,
}
