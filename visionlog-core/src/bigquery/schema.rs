//! Fixed layout of the visit table.

use super::types::{FieldType, Table, TableFieldSchema, TableReference, TableSchema};

/// Friendly name given to the visit table.
pub const VISIT_TABLE_FRIENDLY_NAME: &str = "Vision API Demo Data";

/// Columns of the visit table, matching [`crate::row::VisitRow`].
pub fn visit_table_schema() -> TableSchema {
    use FieldType::*;

    let field = TableFieldSchema::new;
    TableSchema {
        fields: vec![
            field("User", String, "User Id"),
            field("Time", Timestamp, "Time"),
            TableFieldSchema::repeated_record(
                "Labels",
                "Labels",
                vec![
                    field("Type", String, "Label Type"),
                    field("Label", String, "Label"),
                    field("Score", Float, "Score"),
                ],
            ),
            field("Filename", String, "Filename"),
            field("ContentType", String, "Content Type"),
            field("Size", Integer, "File size"),
            field("Country", String, "Country"),
            field("Region", String, "Region"),
            field("City", String, "City"),
            field("IsMobile", Boolean, "IsMobile"),
            field("MozillaVersion", String, "MozillaVersion"),
            field("Platform", String, "Platform"),
            field("OS", String, "OS"),
            field("EngineName", String, "EngineName"),
            field("EngineVersion", String, "EngineVersion"),
            field("BrowserName", String, "BrowserName"),
            field("BrowserVersion", String, "BrowserVersion"),
            field("UserAgent", String, "UserAgent"),
        ],
    }
}

/// Complete descriptor of the visit table at `reference`.
pub fn visit_table(reference: TableReference) -> Table {
    Table {
        table_reference: Some(reference),
        friendly_name: VISIT_TABLE_FRIENDLY_NAME.to_string(),
        schema: Some(visit_table_schema()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bigquery::types::FieldMode;
    use crate::row::{project_row, UploadInfo, VisitMetadata};
    use crate::user_agent::UserAgentInfo;

    #[test]
    fn test_labels_is_repeated_record() {
        let schema = visit_table_schema();
        let labels = schema.fields.iter().find(|f| f.name == "Labels").unwrap();
        assert_eq!(labels.field_type, FieldType::Record);
        assert_eq!(labels.mode, Some(FieldMode::Repeated));
        let names: Vec<_> = labels.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Type", "Label", "Score"]);
    }

    #[test]
    fn test_schema_matches_row_columns() {
        let row = project_row(
            None,
            &VisitMetadata {
                user_id: "u".to_string(),
                time: chrono::Utc::now(),
                upload: UploadInfo::default(),
                geo: Default::default(),
                user_agent: UserAgentInfo::default(),
            },
        );
        let value = serde_json::to_value(row).unwrap();
        let mut row_columns: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        let mut schema_columns: Vec<_> = visit_table_schema()
            .fields
            .into_iter()
            .map(|f| f.name)
            .collect();
        row_columns.sort();
        schema_columns.sort();
        assert_eq!(row_columns, schema_columns);
    }

    #[test]
    fn test_table_serialization() {
        let table = visit_table(TableReference::new("my-app", "demo", "vision"));
        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(value["tableReference"]["tableId"], "vision");
        assert_eq!(value["friendlyName"], "Vision API Demo Data");
        assert_eq!(value["schema"]["fields"][2]["mode"], "REPEATED");
        assert_eq!(value["schema"]["fields"][2]["fields"][2]["type"], "FLOAT");
        assert!(value["schema"]["fields"][0].get("mode").is_none());
    }
}
