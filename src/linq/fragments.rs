use std::fmt;

use serde_json::Value;

use crate::command::Command;

/// A renderable boolean condition.
///
/// `to_sql` binds the fragment's values onto `command` while producing text
/// that references them, so it must run exactly once per fragment per
/// command. Rendering twice binds every value twice.
pub trait WhereFragment: fmt::Debug + Send + Sync {
    fn to_sql(&self, command: &mut Command) -> String;
}

/// Literal SQL in which each `?` is replaced by the next bound parameter.
///
/// The jsonb operators `?`, `?|` and `?&` are written doubled (`??`, `??|`,
/// `??&`) and render as a single literal `?`. A `?` left over once every
/// parameter is bound is kept as is. Fragments without parameters render
/// verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    sql: String,
    parameters: Vec<Value>,
}

impl SqlFragment {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameters(sql: impl Into<String>, parameters: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            parameters,
        }
    }
}

impl WhereFragment for SqlFragment {
    fn to_sql(&self, command: &mut Command) -> String {
        if self.parameters.is_empty() {
            return self.sql.clone();
        }

        let mut values = self.parameters.iter();
        let mut out = String::with_capacity(self.sql.len());
        let mut chars = self.sql.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '?' {
                if chars.next_if_eq(&'?').is_some() {
                    out.push('?');
                    continue;
                }
                if let Some(value) = values.next() {
                    out.push_str(&command.add_parameter(value.clone()));
                    continue;
                }
            }
            out.push(ch);
        }
        out
    }
}

/// `<locator> <operator> $n`
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonFragment {
    locator: String,
    operator: &'static str,
    value: Value,
}

impl ComparisonFragment {
    pub fn new(locator: impl Into<String>, operator: &'static str, value: Value) -> Self {
        Self {
            locator: locator.into(),
            operator,
            value,
        }
    }
}

impl WhereFragment for ComparisonFragment {
    fn to_sql(&self, command: &mut Command) -> String {
        let param = command.add_parameter(self.value.clone());
        format!("{} {} {}", self.locator, self.operator, param)
    }
}

/// `<locator> = ANY($n)` with the whole list bound as one array parameter
#[derive(Debug, Clone, PartialEq)]
pub struct AnyFragment {
    locator: String,
    values: Vec<Value>,
}

impl AnyFragment {
    pub fn new(locator: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            locator: locator.into(),
            values,
        }
    }
}

impl WhereFragment for AnyFragment {
    fn to_sql(&self, command: &mut Command) -> String {
        let param = command.add_parameter(Value::Array(self.values.clone()));
        format!("{} = ANY({})", self.locator, param)
    }
}

/// Children wrapped in parentheses and joined by `and` / `or`
#[derive(Debug)]
pub struct CompoundWhereFragment {
    separator: &'static str,
    children: Vec<Box<dyn WhereFragment>>,
}

impl CompoundWhereFragment {
    pub fn and(children: Vec<Box<dyn WhereFragment>>) -> Self {
        Self {
            separator: "and",
            children,
        }
    }

    pub fn or(children: Vec<Box<dyn WhereFragment>>) -> Self {
        Self {
            separator: "or",
            children,
        }
    }

    pub fn add(&mut self, child: Box<dyn WhereFragment>) {
        self.children.push(child);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl WhereFragment for CompoundWhereFragment {
    fn to_sql(&self, command: &mut Command) -> String {
        // Children render in order so placeholders read left to right.
        let parts: Vec<String> = self
            .children
            .iter()
            .map(|child| format!("({})", child.to_sql(command)))
            .collect();
        parts.join(&format!(" {} ", self.separator))
    }
}

#[derive(Debug)]
pub struct NotWhereFragment {
    inner: Box<dyn WhereFragment>,
}

impl NotWhereFragment {
    pub fn new(inner: Box<dyn WhereFragment>) -> Self {
        Self { inner }
    }
}

impl WhereFragment for NotWhereFragment {
    fn to_sql(&self, command: &mut Command) -> String {
        format!("not({})", self.inner.to_sql(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sql_fragment_substitutes_placeholders() {
        let fragment = SqlFragment::with_parameters(
            "d.mt_doc_type = ? and d.tenant = ?",
            vec![json!("admin"), json!("t1")],
        );
        let mut cmd = Command::new();
        assert_eq!(fragment.to_sql(&mut cmd), "d.mt_doc_type = $1 and d.tenant = $2");
        assert_eq!(cmd.parameter_values(), vec![&json!("admin"), &json!("t1")]);
    }

    #[test]
    fn test_sql_fragment_keeps_jsonb_key_operators() {
        let fragment = SqlFragment::with_parameters(
            "d.data ?? 'tags' and d.data->'tags' ??| array['a'] and d.mt_doc_type = ?",
            vec![json!("admin")],
        );
        let mut cmd = Command::new();
        assert_eq!(
            fragment.to_sql(&mut cmd),
            "d.data ? 'tags' and d.data->'tags' ?| array['a'] and d.mt_doc_type = $1"
        );
        assert_eq!(cmd.parameter_values(), vec![&json!("admin")]);
    }

    #[test]
    fn test_sql_fragment_without_parameters_is_verbatim() {
        let mut cmd = Command::new();
        assert_eq!(
            SqlFragment::new("d.mt_deleted = false").to_sql(&mut cmd),
            "d.mt_deleted = false"
        );
        assert!(cmd.parameters().is_empty());
    }

    #[test]
    fn test_compound_binds_left_to_right() {
        let compound = CompoundWhereFragment::and(vec![
            Box::new(ComparisonFragment::new("d.data->>'a'", "=", json!("x"))),
            Box::new(ComparisonFragment::new("d.data->>'b'", "=", json!("y"))),
        ]);
        let mut cmd = Command::new();
        assert_eq!(
            compound.to_sql(&mut cmd),
            "(d.data->>'a' = $1) and (d.data->>'b' = $2)"
        );
        assert_eq!(cmd.parameter_values(), vec![&json!("x"), &json!("y")]);
    }

    #[test]
    fn test_rendering_twice_binds_twice() {
        let fragment = ComparisonFragment::new("d.data->>'a'", "=", json!(1));
        let mut cmd = Command::new();
        fragment.to_sql(&mut cmd);
        assert_eq!(fragment.to_sql(&mut cmd), "d.data->>'a' = $2");
        assert_eq!(cmd.parameters().len(), 2);
    }

    #[test]
    fn test_any_binds_array() {
        let fragment = AnyFragment::new("d.data->>'color'", vec![json!("red"), json!("blue")]);
        let mut cmd = Command::new();
        assert_eq!(fragment.to_sql(&mut cmd), "d.data->>'color' = ANY($1)");
        assert_eq!(cmd.parameter_values(), vec![&json!(["red", "blue"])]);
    }

    #[test]
    fn test_not_wraps_inner() {
        let fragment = NotWhereFragment::new(Box::new(SqlFragment::new("d.data->>'a' is null")));
        let mut cmd = Command::new();
        assert_eq!(fragment.to_sql(&mut cmd), "not(d.data->>'a' is null)");
    }
}
