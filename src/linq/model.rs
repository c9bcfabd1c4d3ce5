use serde::{Deserialize, Serialize};

use super::expression::Expression;
use crate::error::{QueryError, QueryResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingDirection {
    #[default]
    Asc,
    Desc,
}

/// One sort key of an ORDER BY
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ordering {
    pub expression: Expression,
    #[serde(default)]
    pub direction: OrderingDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    Sum,
    Min,
    Max,
    Average,
}

impl AggregateKind {
    pub fn sql_function(self) -> &'static str {
        match self {
            AggregateKind::Sum => "sum",
            AggregateKind::Min => "min",
            AggregateKind::Max => "max",
            AggregateKind::Average => "avg",
        }
    }
}

/// Query modifiers that change cardinality or aggregate rather than row content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ResultOperator {
    Take { count: u64 },
    Skip { count: u64 },
    First,
    FirstOrDefault,
    Single,
    SingleOrDefault,
    Last,
    LastOrDefault,
    Any,
    Count,
    Sum,
    Min,
    Max,
    Average,
}

/// How the caller should execute a query and interpret its rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Any,
    Count,
    Aggregate(AggregateKind),
    Fetch,
}

/// Element operators reduce a fetched row set to at most one document.
///
/// The compiler only limits the row count (1 for first, 2 for single); the
/// cardinality checks happen here, once rows are back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementOperator {
    First,
    FirstOrDefault,
    Single,
    SingleOrDefault,
}

impl ElementOperator {
    pub fn reduce<T>(self, rows: Vec<T>) -> QueryResult<Option<T>> {
        let mut rows = rows.into_iter();
        let first = rows.next();
        match self {
            ElementOperator::First => first.map(Some).ok_or(QueryError::NoElements),
            ElementOperator::FirstOrDefault => Ok(first),
            ElementOperator::Single | ElementOperator::SingleOrDefault => {
                if rows.next().is_some() {
                    return Err(QueryError::MoreThanOneElement);
                }
                if first.is_none() && self == ElementOperator::Single {
                    return Err(QueryError::NoElements);
                }
                Ok(first)
            }
        }
    }
}

/// Immutable description of one logical query over a document type.
///
/// Builder methods consume and return the model; the origin item type can only
/// be set by [`QueryModel::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryModel {
    item_type: String,
    #[serde(default)]
    filters: Vec<Expression>,
    #[serde(default)]
    orderings: Vec<Ordering>,
    #[serde(default)]
    result_operators: Vec<ResultOperator>,
    #[serde(default = "default_selector")]
    selector: Expression,
}

fn default_selector() -> Expression {
    Expression::Item
}

impl QueryModel {
    pub fn new(item_type: impl Into<String>) -> Self {
        Self {
            item_type: item_type.into(),
            filters: Vec::new(),
            orderings: Vec::new(),
            result_operators: Vec::new(),
            selector: default_selector(),
        }
    }

    pub fn filter(mut self, predicate: Expression) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn order_by(mut self, expression: Expression) -> Self {
        self.orderings.push(Ordering {
            expression,
            direction: OrderingDirection::Asc,
        });
        self
    }

    pub fn order_by_descending(mut self, expression: Expression) -> Self {
        self.orderings.push(Ordering {
            expression,
            direction: OrderingDirection::Desc,
        });
        self
    }

    pub fn select(mut self, selector: Expression) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_operator(mut self, operator: ResultOperator) -> Self {
        self.result_operators.push(operator);
        self
    }

    pub fn take(self, count: u64) -> Self {
        self.with_operator(ResultOperator::Take { count })
    }

    pub fn skip(self, count: u64) -> Self {
        self.with_operator(ResultOperator::Skip { count })
    }

    /// `Sum(x => x.Field)`: sets the selector and appends the operator
    pub fn sum(self, selector: Expression) -> Self {
        self.select(selector).with_operator(ResultOperator::Sum)
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    pub fn filters(&self) -> &[Expression] {
        &self.filters
    }

    pub fn orderings(&self) -> &[Ordering] {
        &self.orderings
    }

    pub fn result_operators(&self) -> &[ResultOperator] {
        &self.result_operators
    }

    pub fn selector(&self) -> &Expression {
        &self.selector
    }

    pub fn has_operator(&self, predicate: impl Fn(&ResultOperator) -> bool) -> bool {
        self.result_operators.iter().any(predicate)
    }

    /// Classify the request by its terminal operator
    pub fn mode(&self) -> QueryMode {
        for op in &self.result_operators {
            match op {
                ResultOperator::Any => return QueryMode::Any,
                ResultOperator::Count => return QueryMode::Count,
                ResultOperator::Sum => return QueryMode::Aggregate(AggregateKind::Sum),
                ResultOperator::Min => return QueryMode::Aggregate(AggregateKind::Min),
                ResultOperator::Max => return QueryMode::Aggregate(AggregateKind::Max),
                ResultOperator::Average => return QueryMode::Aggregate(AggregateKind::Average),
                _ => {}
            }
        }
        QueryMode::Fetch
    }

    pub fn element_operator(&self) -> Option<ElementOperator> {
        self.result_operators.iter().find_map(|op| match op {
            ResultOperator::First => Some(ElementOperator::First),
            ResultOperator::FirstOrDefault => Some(ElementOperator::FirstOrDefault),
            ResultOperator::Single => Some(ElementOperator::Single),
            ResultOperator::SingleOrDefault => Some(ElementOperator::SingleOrDefault),
            _ => None,
        })
    }
}
