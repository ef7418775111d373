//! MySQL column type classification.

use serde::{Deserialize, Serialize};

/// Semantic type of a column, derived from `information_schema.columns.DATA_TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Decimal,
    Float,
    Date,
    Time,
    Datetime,
    Year,
    String,
    Enum,
    Set,
    Binary,
    Bit,
    Geometry,
    Json,
}

impl ColumnType {
    /// Classify a `DATA_TYPE` value. Unknown types are treated as strings.
    pub fn from_data_type(data_type: &str) -> Self {
        match data_type.to_ascii_lowercase().as_str() {
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" => {
                ColumnType::Integer
            }
            "decimal" | "numeric" => ColumnType::Decimal,
            "float" | "double" | "real" => ColumnType::Float,
            "date" => ColumnType::Date,
            "time" => ColumnType::Time,
            "datetime" | "timestamp" => ColumnType::Datetime,
            "year" => ColumnType::Year,
            "enum" => ColumnType::Enum,
            "set" => ColumnType::Set,
            "binary" | "varbinary" | "tinyblob" | "blob" | "mediumblob" | "longblob" => {
                ColumnType::Binary
            }
            "bit" => ColumnType::Bit,
            "geometry" | "point" | "linestring" | "polygon" | "multipoint"
            | "multilinestring" | "multipolygon" | "geometrycollection" | "geomcollection" => {
                ColumnType::Geometry
            }
            "json" => ColumnType::Json,
            _ => ColumnType::String,
        }
    }

    pub fn is_integer(self) -> bool {
        self == ColumnType::Integer
    }

    /// Values of these types cannot be embedded in delimited text without
    /// escaping ambiguity, so the extraction pipeline must encode them.
    pub fn is_unsafe_for_text(self) -> bool {
        matches!(
            self,
            ColumnType::Binary | ColumnType::Geometry | ColumnType::Bit
        )
    }
}
