//! Record projection
//!
//! Maps table rows into output records according to a schema. The projection
//! is planned once per table: mappings whose source column is not in the
//! header are dropped for the whole job, and the rest are resolved to column
//! positions.
//!
//! Values pass through as text. The only normalization is whitespace
//! trimming, with blank and null cells becoming JSON `null`.

use serde_json::{Map, Value};

use super::ids::IdAllocator;
use crate::parser::{Row, Table};
use crate::schema::{Schema, ID_FIELD};

/// A mapping resolved against a table header
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlannedField {
    index: usize,
    target: String,
}

/// Schema mappings resolved against one table header
#[derive(Debug, Clone)]
pub struct Projection {
    fields: Vec<PlannedField>,
    dropped: Vec<String>,
}

impl Projection {
    pub fn plan(schema: &Schema, headers: &[String]) -> Self {
        let mut fields = Vec::with_capacity(schema.columns.len());
        let mut dropped = Vec::new();

        for column in &schema.columns {
            match headers.iter().position(|h| *h == column.source) {
                Some(index) => fields.push(PlannedField { index, target: column.target.clone() }),
                None => dropped.push(column.source.clone()),
            }
        }

        Self { fields, dropped }
    }

    /// Declared source columns missing from the header, in schema order
    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }

    /// Build one record: `id` first, then fields in schema order
    pub fn project(&self, row: &Row<'_>, id: String) -> Value {
        let mut record = Map::with_capacity(self.fields.len() + 1);
        record.insert(ID_FIELD.to_string(), Value::String(id));
        for field in &self.fields {
            record.insert(field.target.clone(), normalize_cell(row.cell(field.index)));
        }
        Value::Object(record)
    }
}

/// Trimmed text, or `null` for an absent or blank cell
pub fn normalize_cell(raw: Option<&str>) -> Value {
    match raw.map(str::trim) {
        Some(v) if !v.is_empty() => Value::String(v.to_string()),
        _ => Value::Null,
    }
}

/// Records produced from one table
#[derive(Debug, Clone)]
pub struct Conversion {
    /// One record per table row, in row order
    pub records: Vec<Value>,
    /// Declared source columns that were not found
    pub dropped: Vec<String>,
    /// Declared mappings, dropped ones included, not counting `id`
    pub fields: usize,
}

/// Convert every row of `table` with `schema`. Pure; no I/O.
pub fn convert(schema: &Schema, table: &Table) -> Conversion {
    let projection = Projection::plan(schema, table.headers());
    let mut ids = IdAllocator::new(schema.id_prefix.as_str());

    let records = table
        .rows()
        .map(|row| projection.project(&row, ids.next_id()))
        .collect();

    Conversion {
        records,
        dropped: projection.dropped().to_vec(),
        fields: schema.columns.len(),
    }
}
