//! Common test utilities for query compilation tests
//!
//! Provides shared helper functions for:
//! - Building document mappings for the fixture types
//! - Compiling queries against fresh commands

#![allow(dead_code)]

use docquery::linq::FieldType;
use docquery::{
    Command, DocumentQuery, DocumentSchema, Expression, ExpressionParser, QueryModel,
    QueryResult,
};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Widget {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub color: Option<String>,
}

pub fn widgets() -> DocumentSchema {
    DocumentSchema::new("Widget")
        .expect("valid type name")
        .table("widgets")
        .expect("valid table name")
}

pub fn soft_deleted_widgets() -> DocumentSchema {
    widgets().soft_deleted(true)
}

pub fn price() -> Expression {
    Expression::typed_member("Price", FieldType::Decimal)
}

pub fn name() -> Expression {
    Expression::member("Name")
}

/// Compile a fetch for `query` against `mapping` and return the populated command
pub fn compile_fetch(mapping: &DocumentSchema, query: &QueryModel) -> QueryResult<Command> {
    let parser = ExpressionParser::new();
    let mut command = Command::new();
    DocumentQuery::new(mapping, query, &parser).compile_fetch::<Widget>(&mut command)?;
    Ok(command)
}

pub fn fetch_sql(query: &QueryModel) -> String {
    compile_fetch(&widgets(), query)
        .expect("query compiles")
        .sql()
        .to_string()
}
