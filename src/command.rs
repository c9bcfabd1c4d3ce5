use serde::Serialize;
use serde_json::Value;

/// A value bound to a positional placeholder (`$1`, `$2`, ...)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
}

/// SQL text plus its bound parameters, handed to the storage layer for execution.
///
/// Placeholders are numbered in the order parameters are added, so a fragment
/// that renders its text and binds its values in one pass keeps ordinals
/// aligned left to right. Several statements may be appended to the same
/// command; numbering continues across them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Command {
    sql: String,
    parameters: Vec<Parameter>,
}

impl Command {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value and return the placeholder that references it
    pub fn add_parameter(&mut self, value: impl Into<Value>) -> String {
        let name = format!("${}", self.parameters.len() + 1);
        self.parameters.push(Parameter {
            name: name.clone(),
            value: value.into(),
        });
        name
    }

    /// Append a statement, separating it from any previous one with `;`
    pub fn append_query(&mut self, sql: &str) {
        if !self.sql.is_empty() {
            self.sql.push(';');
        }
        self.sql.push_str(sql);
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameter_values(&self) -> Vec<&Value> {
        self.parameters.iter().map(|p| &p.value).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty() && self.parameters.is_empty()
    }
}
