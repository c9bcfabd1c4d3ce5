pub mod command;
pub mod config;
pub mod error;
pub mod linq;
pub mod schema;

pub use command::{Command, Parameter};
pub use config::StoreConfig;
pub use error::{QueryError, QueryResult};
pub use linq::{
    DocumentQuery, Expression, ExpressionParser, FieldType, PredicateTranslator, QueryMode,
    QueryModel, ResultOperator, Row, Selector, WholeDocumentSelector,
};
pub use schema::{DocumentMapping, DocumentSchema};
