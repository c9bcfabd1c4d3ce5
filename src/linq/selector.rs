use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{QueryError, QueryResult};
use crate::schema::{DocumentMapping, DATA_COLUMN, DOCUMENT_ALIAS, ID_COLUMN};

/// One row returned by the storage layer: column names with their values, in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.columns.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (N, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }
    }
}

/// Turns raw rows into `T`
pub trait Selector<T> {
    /// Column list placed between `select` and `from`
    fn select_clause(&self, mapping: &dyn DocumentMapping) -> String;

    fn resolve(&self, row: &Row) -> QueryResult<T>;

    fn read_all(&self, rows: &[Row]) -> QueryResult<Vec<T>> {
        rows.iter().map(|row| self.resolve(row)).collect()
    }
}

/// Deserializes the whole JSON payload column into `T`
pub struct WholeDocumentSelector<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> WholeDocumentSelector<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for WholeDocumentSelector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for WholeDocumentSelector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WholeDocumentSelector")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: DeserializeOwned> Selector<T> for WholeDocumentSelector<T> {
    fn select_clause(&self, _mapping: &dyn DocumentMapping) -> String {
        format!(
            "{alias}.{data}, {alias}.{id}",
            alias = DOCUMENT_ALIAS,
            data = DATA_COLUMN,
            id = ID_COLUMN
        )
    }

    fn resolve(&self, row: &Row) -> QueryResult<T> {
        let payload = row.get(DATA_COLUMN).ok_or_else(|| {
            QueryError::Deserialization(format!("column '{}' missing from row", DATA_COLUMN))
        })?;

        // Drivers hand jsonb back either decoded or as raw text.
        let document = match payload {
            Value::String(text) => serde_json::from_str(text)?,
            other => serde_json::from_value(other.clone())?,
        };
        Ok(document)
    }
}
