use convert_case::{Case, Casing as _};
use serde_json::Value;

use super::locator::{
    member_locator, validate_identifier, Casing, DELETED_COLUMN, DOCUMENT_ALIAS,
    DOC_TYPE_COLUMN,
};
use super::DocumentMapping;
use crate::error::{QueryError, QueryResult};
use crate::linq::{CompoundWhereFragment, Expression, SqlFragment, WhereFragment};

/// Default prefix for generated document table names
pub const DEFAULT_TABLE_PREFIX: &str = "mt_doc_";

/// Storage layout of one document type
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSchema {
    document_type: String,
    schema: Option<String>,
    table: String,
    casing: Casing,
    soft_deleted: bool,
    sub_class: Option<String>,
}

impl DocumentSchema {
    /// Mapping for `document_type` stored in `mt_doc_<snake_case type>`
    pub fn new(document_type: &str) -> QueryResult<Self> {
        Self::with_prefix(document_type, DEFAULT_TABLE_PREFIX)
    }

    pub fn with_prefix(document_type: &str, prefix: &str) -> QueryResult<Self> {
        let table = format!("{}{}", prefix, document_type.to_case(Case::Snake));
        validate_identifier(&table)?;
        Ok(Self {
            document_type: document_type.to_string(),
            schema: None,
            table,
            casing: Casing::default(),
            soft_deleted: false,
            sub_class: None,
        })
    }

    pub fn table(mut self, table: &str) -> QueryResult<Self> {
        self.table = validate_identifier(table)?.to_string();
        Ok(self)
    }

    pub fn schema(mut self, schema: &str) -> QueryResult<Self> {
        self.schema = Some(validate_identifier(schema)?.to_string());
        Ok(self)
    }

    pub fn casing(mut self, casing: Casing) -> Self {
        self.casing = casing;
        self
    }

    pub fn soft_deleted(mut self, soft_deleted: bool) -> Self {
        self.soft_deleted = soft_deleted;
        self
    }

    /// Scope queries to one sub-type of a hierarchy stored in a shared table
    pub fn sub_class(mut self, alias: impl Into<String>) -> Self {
        self.sub_class = Some(alias.into());
        self
    }

    pub fn document_type(&self) -> &str {
        &self.document_type
    }

    pub fn is_soft_deleted(&self) -> bool {
        self.soft_deleted
    }

    fn visibility_fragments(&self) -> Vec<Box<dyn WhereFragment>> {
        let mut fragments: Vec<Box<dyn WhereFragment>> = Vec::new();
        if let Some(alias) = &self.sub_class {
            fragments.push(Box::new(SqlFragment::with_parameters(
                format!("{}.{} = ?", DOCUMENT_ALIAS, DOC_TYPE_COLUMN),
                vec![Value::String(alias.clone())],
            )));
        }
        if self.soft_deleted {
            fragments.push(Box::new(SqlFragment::new(format!(
                "{}.{} = false",
                DOCUMENT_ALIAS, DELETED_COLUMN
            ))));
        }
        fragments
    }
}

impl DocumentMapping for DocumentSchema {
    fn table_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.table),
            None => self.table.clone(),
        }
    }

    fn json_locator(&self, expression: &Expression) -> QueryResult<String> {
        match expression {
            Expression::Member(path) => member_locator(path, self.casing),
            other => Err(QueryError::UnsupportedExpression(format!(
                "no JSON locator for {}",
                other
            ))),
        }
    }

    fn default_where_fragment(&self) -> Option<Box<dyn WhereFragment>> {
        let mut fragments = self.visibility_fragments();
        match fragments.len() {
            0 => None,
            1 => fragments.pop(),
            _ => Some(Box::new(CompoundWhereFragment::and(fragments))),
        }
    }

    fn filter_documents(&self, fragment: Box<dyn WhereFragment>) -> Box<dyn WhereFragment> {
        let extra = self.visibility_fragments();
        if extra.is_empty() {
            return fragment;
        }
        let mut compound = CompoundWhereFragment::and(vec![fragment]);
        for child in extra {
            compound.add(child);
        }
        Box::new(compound)
    }
}
