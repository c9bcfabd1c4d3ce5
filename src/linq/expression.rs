use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared type of a document field; decides the cast applied to its locator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Text,
    Integer,
    BigInt,
    Double,
    Decimal,
    Boolean,
    Timestamp,
    Uuid,
}

impl FieldType {
    /// PostgreSQL type the extracted text is cast to, if any
    pub fn pg_cast(self) -> Option<&'static str> {
        match self {
            FieldType::Text => None,
            FieldType::Integer => Some("integer"),
            FieldType::BigInt => Some("bigint"),
            FieldType::Double => Some("double precision"),
            FieldType::Decimal => Some("numeric"),
            FieldType::Boolean => Some("boolean"),
            FieldType::Timestamp => Some("timestamptz"),
            FieldType::Uuid => Some("uuid"),
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::BigInt | FieldType::Double | FieldType::Decimal
        )
    }
}

/// A field access on the origin item, e.g. `x.Address.City`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPath {
    pub members: Vec<String>,
    #[serde(default)]
    pub field_type: FieldType,
}

impl MemberPath {
    /// Dotted path (`"Address.City"`) of text type
    pub fn new(path: &str) -> Self {
        Self::typed(path, FieldType::Text)
    }

    pub fn typed(path: &str, field_type: FieldType) -> Self {
        Self {
            members: path
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            field_type,
        }
    }
}

impl fmt::Display for MemberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x.{}", self.members.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
}

impl CompareOp {
    pub fn sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
        }
    }

    /// Operator that keeps the meaning when the operands swap sides
    pub fn flip(self) -> Self {
        match self {
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::GtEq => CompareOp::LtEq,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::LtEq => CompareOp::GtEq,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringMatchKind {
    Contains,
    StartsWith,
    EndsWith,
}

/// Expression tree handed over by the query front-end.
///
/// The set of shapes is closed: anything the front-end cannot express with
/// these variants never reaches the compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    /// The origin item itself (`x => x`)
    Item,
    Member(MemberPath),
    Constant {
        value: Value,
    },
    Compare {
        left: Box<Expression>,
        op: CompareOp,
        right: Box<Expression>,
    },
    And {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Or {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Not {
        operand: Box<Expression>,
    },
    IsNull {
        member: MemberPath,
    },
    IsNotNull {
        member: MemberPath,
    },
    In {
        member: MemberPath,
        values: Vec<Value>,
    },
    StringMatch {
        member: MemberPath,
        kind: StringMatchKind,
        value: String,
    },
}

impl Expression {
    pub fn member(path: &str) -> Self {
        Expression::Member(MemberPath::new(path))
    }

    pub fn typed_member(path: &str, field_type: FieldType) -> Self {
        Expression::Member(MemberPath::typed(path, field_type))
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Expression::Constant {
            value: value.into(),
        }
    }

    pub fn compare(self, op: CompareOp, right: Expression) -> Self {
        Expression::Compare {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    pub fn equals(self, value: impl Into<Value>) -> Self {
        self.compare(CompareOp::Eq, Expression::constant(value))
    }

    pub fn not_equals(self, value: impl Into<Value>) -> Self {
        self.compare(CompareOp::NotEq, Expression::constant(value))
    }

    pub fn greater_than(self, value: impl Into<Value>) -> Self {
        self.compare(CompareOp::Gt, Expression::constant(value))
    }

    pub fn greater_or_equal(self, value: impl Into<Value>) -> Self {
        self.compare(CompareOp::GtEq, Expression::constant(value))
    }

    pub fn less_than(self, value: impl Into<Value>) -> Self {
        self.compare(CompareOp::Lt, Expression::constant(value))
    }

    pub fn less_or_equal(self, value: impl Into<Value>) -> Self {
        self.compare(CompareOp::LtEq, Expression::constant(value))
    }

    pub fn and(self, other: Expression) -> Self {
        Expression::And {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn or(self, other: Expression) -> Self {
        Expression::Or {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn negate(self) -> Self {
        Expression::Not {
            operand: Box::new(self),
        }
    }

    pub fn as_member(&self) -> Option<&MemberPath> {
        match self {
            Expression::Member(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Item => write!(f, "x"),
            Expression::Member(path) => write!(f, "{}", path),
            Expression::Constant { value } => write!(f, "{}", value),
            Expression::Compare { left, op, right } => {
                write!(f, "({} {} {})", left, op.sql(), right)
            }
            Expression::And { left, right } => write!(f, "({} && {})", left, right),
            Expression::Or { left, right } => write!(f, "({} || {})", left, right),
            Expression::Not { operand } => write!(f, "!{}", operand),
            Expression::IsNull { member } => write!(f, "({} == null)", member),
            Expression::IsNotNull { member } => write!(f, "({} != null)", member),
            Expression::In { member, values } => {
                let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}].Contains({})", values.join(", "), member)
            }
            Expression::StringMatch {
                member,
                kind,
                value,
            } => {
                let method = match kind {
                    StringMatchKind::Contains => "Contains",
                    StringMatchKind::StartsWith => "StartsWith",
                    StringMatchKind::EndsWith => "EndsWith",
                };
                write!(f, "{}.{}({:?})", member, method, value)
            }
        }
    }
}
