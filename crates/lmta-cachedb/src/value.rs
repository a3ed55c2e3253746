//! Scalar values, row tuples, and logical table descriptors.

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

use crate::error::DbError;

/// A single scalar field of a row: numeric, string, or null.
///
/// Rows are immutable once produced by a query; `Value` is cheap to
/// clone for everything but long text fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    /// Integer content, if this value is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric content widened to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Text content, if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            // Telemetry tables carry no blob columns; decode as text if one appears.
            ValueRef::Blob(b) => Value::Text(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*r)),
            Value::Text(t) => ToSqlOutput::Borrowed(ValueRef::Text(t.as_bytes())),
        })
    }
}

/// An ordered, fixed-length row tuple corresponding 1:1 to a table's
/// declared columns.
pub type Row = Vec<Value>;

/// A logical table descriptor: ordered column names plus the ordered
/// subset of columns forming the primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Column names, order-significant; defines the row tuple shape.
    pub columns: Vec<String>,
    /// Primary key column names; non-empty subset of `columns`.
    pub primary_key: Vec<String>,
}

impl TableSchema {
    /// Build a descriptor from column and primary-key name lists.
    pub fn new<C, P>(columns: C, primary_key: P) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            primary_key: primary_key.into_iter().map(Into::into).collect(),
        }
    }

    /// Check that the primary key is non-empty and a subset of the columns.
    pub fn validate(&self, table: &str) -> Result<(), DbError> {
        if self.columns.is_empty() {
            return Err(DbError::InvalidSchema {
                table: table.to_string(),
                reason: "no columns declared".to_string(),
            });
        }
        if self.primary_key.is_empty() {
            return Err(DbError::InvalidSchema {
                table: table.to_string(),
                reason: "empty primary key".to_string(),
            });
        }
        for key in &self.primary_key {
            if !self.columns.contains(key) {
                return Err(DbError::InvalidSchema {
                    table: table.to_string(),
                    reason: format!("primary key column {key} is not a declared column"),
                });
            }
        }
        Ok(())
    }

    /// The idempotent create statement for this descriptor.
    pub fn create_statement(&self, table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({}, PRIMARY KEY ({}))",
            table,
            self.columns.join(", "),
            self.primary_key.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_accessors() {
        assert_eq!(Value::Integer(7).as_i64(), Some(7));
        assert_eq!(Value::Real(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::Integer(2).as_f64(), Some(2.0));
        assert_eq!(Value::Text("x".into()).as_str(), Some("x"));
        assert!(Value::Null.is_null());
        assert_eq!(Value::Text("x".into()).as_i64(), None);
    }

    #[test]
    fn value_serde_roundtrip() {
        let row: Row = vec![
            Value::Null,
            Value::Integer(42),
            Value::Real(1.5),
            Value::Text("ost01".into()),
        ];
        let json = serde_json::to_string(&row).unwrap();
        let back: Row = serde_json::from_str(&json).unwrap();
        assert_eq!(row, back);
    }

    #[test]
    fn schema_create_statement() {
        let schema = TableSchema::new(["OST_ID", "TS_ID", "READ_BYTES"], ["OST_ID", "TS_ID"]);
        assert_eq!(
            schema.create_statement("OST_DATA"),
            "CREATE TABLE IF NOT EXISTS OST_DATA (OST_ID, TS_ID, READ_BYTES, PRIMARY KEY (OST_ID, TS_ID))"
        );
    }

    #[test]
    fn schema_validation_accepts_well_formed() {
        let schema = TableSchema::new(["A", "B"], ["A"]);
        assert!(schema.validate("T").is_ok());
    }

    #[test]
    fn schema_validation_rejects_empty_primary_key() {
        let schema = TableSchema::new(["A", "B"], Vec::<String>::new());
        assert!(matches!(
            schema.validate("T"),
            Err(DbError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn schema_validation_rejects_foreign_key_column() {
        let schema = TableSchema::new(["A", "B"], ["C"]);
        assert!(matches!(
            schema.validate("T"),
            Err(DbError::InvalidSchema { .. })
        ));
    }
}
