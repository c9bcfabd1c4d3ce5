pub mod locator;
pub mod mapping;

pub use locator::{validate_identifier, Casing, DATA_COLUMN, DOCUMENT_ALIAS, ID_COLUMN};
pub use mapping::{DocumentSchema, DEFAULT_TABLE_PREFIX};

use crate::error::QueryResult;
use crate::linq::{Expression, WhereFragment};

/// How one document type is stored: its table, how field access turns into
/// JSON-path SQL, and which rows are visible by default.
///
/// Implementations are immutable per document type and may be shared across
/// threads while several queries compile.
pub trait DocumentMapping: Send + Sync {
    fn table_name(&self) -> String;

    /// Opaque, already-escaped SQL dereferencing the field the expression names
    fn json_locator(&self, expression: &Expression) -> QueryResult<String>;

    /// Predicate used when a query has no filters at all
    fn default_where_fragment(&self) -> Option<Box<dyn WhereFragment>>;

    /// Hook applied to the translated filters (soft deletes, sub-type scoping)
    fn filter_documents(&self, fragment: Box<dyn WhereFragment>) -> Box<dyn WhereFragment>;
}
