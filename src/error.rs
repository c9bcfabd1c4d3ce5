use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Operation not supported: {0}")]
    UnsupportedOperator(String),

    #[error("Projection not supported: {0}")]
    UnsupportedProjection(String),

    #[error("Expression not supported: {0}")]
    UnsupportedExpression(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Sequence contains no elements")]
    NoElements,

    #[error("Sequence contains more than one element")]
    MoreThanOneElement,

    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),
}

pub type QueryResult<T> = Result<T, QueryError>;

impl serde::Serialize for QueryError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::Deserialization(err.to_string())
    }
}
