pub mod document_query;
pub mod expression;
pub mod fragments;
pub mod model;
pub mod parser;
pub mod selector;

pub use document_query::DocumentQuery;
pub use expression::{CompareOp, Expression, FieldType, MemberPath, StringMatchKind};
pub use fragments::{
    AnyFragment, ComparisonFragment, CompoundWhereFragment, NotWhereFragment, SqlFragment,
    WhereFragment,
};
pub use model::{
    AggregateKind, ElementOperator, Ordering, OrderingDirection, QueryMode, QueryModel,
    ResultOperator,
};
pub use parser::{ExpressionParser, PredicateTranslator};
pub use selector::{Row, Selector, WholeDocumentSelector};
