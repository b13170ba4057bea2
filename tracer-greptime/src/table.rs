use crate::error::{RowError, SchemaError};
use chrono::{DateTime, Utc};

/// Role a column plays in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticKind {
    /// Indexed, low cardinality grouping column
    Tag,
    /// The time index of the row
    Timestamp,
    /// Row payload
    Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Int64,
    TimestampNanosecond,
    TimestampMillisecond,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampPrecision {
    Nanosecond,
    Millisecond,
}

impl TimestampPrecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampPrecision::Nanosecond => "ns",
            TimestampPrecision::Millisecond => "ms",
        }
    }
}

impl ColumnType {
    pub fn timestamp_precision(&self) -> Option<TimestampPrecision> {
        match self {
            ColumnType::TimestampNanosecond => Some(TimestampPrecision::Nanosecond),
            ColumnType::TimestampMillisecond => Some(TimestampPrecision::Millisecond),
            ColumnType::String | ColumnType::Int64 => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    String(String),
    Int64(i64),
    Timestamp(DateTime<Utc>),
}

impl ColumnValue {
    pub fn fits(&self, column_type: ColumnType) -> bool {
        matches!(
            (self, column_type),
            (ColumnValue::String(_), ColumnType::String)
                | (ColumnValue::Int64(_), ColumnType::Int64)
                | (
                    ColumnValue::Timestamp(_),
                    ColumnType::TimestampNanosecond | ColumnType::TimestampMillisecond
                )
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: SemanticKind,
    pub column_type: ColumnType,
}

/// Schema plus rows of a single batch write.
/// Every row has exactly one value per column, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Vec<ColumnValue>>,
}

fn validate_name(what: &'static str, name: &str) -> Result<(), SchemaError> {
    let invalid = |reason| SchemaError::InvalidName {
        what,
        name: name.to_string(),
        reason,
    };
    if name.trim().is_empty() {
        return Err(invalid("can't be blank"));
    }
    if name.trim() != name {
        return Err(invalid("can't start or end with whitespace"));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid("can't contain control characters"));
    }
    Ok(())
}

impl Table {
    pub fn new<S: Into<String>>(name: S) -> Result<Self, SchemaError> {
        let name = name.into();
        validate_name("table", &name)?;
        Ok(Self {
            name,
            columns: vec![],
            rows: vec![],
        })
    }

    pub fn add_tag_column<S: Into<String>>(
        &mut self,
        name: S,
        column_type: ColumnType,
    ) -> Result<(), SchemaError> {
        self.add_column(name, SemanticKind::Tag, column_type)
    }

    pub fn add_timestamp_column<S: Into<String>>(
        &mut self,
        name: S,
        column_type: ColumnType,
    ) -> Result<(), SchemaError> {
        self.add_column(name, SemanticKind::Timestamp, column_type)
    }

    pub fn add_field_column<S: Into<String>>(
        &mut self,
        name: S,
        column_type: ColumnType,
    ) -> Result<(), SchemaError> {
        self.add_column(name, SemanticKind::Field, column_type)
    }

    /// Columns can't be added once rows exist
    pub fn add_column<S: Into<String>>(
        &mut self,
        name: S,
        kind: SemanticKind,
        column_type: ColumnType,
    ) -> Result<(), SchemaError> {
        let name = name.into();
        validate_name("column", &name)?;
        if !self.rows.is_empty() {
            return Err(SchemaError::InvalidName {
                what: "column",
                name,
                reason: "table already has rows",
            });
        }
        if self.columns.iter().any(|existing| existing.name == name) {
            return Err(SchemaError::DuplicateColumn(name));
        }
        self.columns.push(Column {
            name,
            kind,
            column_type,
        });
        Ok(())
    }

    pub fn add_row(&mut self, row: Vec<ColumnValue>) -> Result<(), RowError> {
        if row.len() != self.columns.len() {
            return Err(RowError::Arity {
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        if let Some((column, value)) = self
            .columns
            .iter()
            .zip(row.iter())
            .find(|(column, value)| !value.fits(column.column_type))
        {
            return Err(RowError::TypeMismatch {
                column: column.name.clone(),
                expected: column.column_type,
                got: value.clone(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<ColumnValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
