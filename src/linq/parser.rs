use serde_json::Value;

use super::expression::{CompareOp, Expression, FieldType, MemberPath, StringMatchKind};
use super::fragments::{
    AnyFragment, ComparisonFragment, CompoundWhereFragment, NotWhereFragment, SqlFragment,
    WhereFragment,
};
use crate::error::{QueryError, QueryResult};
use crate::schema::DocumentMapping;

/// Turns one boolean expression tree into a where fragment
pub trait PredicateTranslator: Send + Sync {
    fn parse_where_fragment(
        &self,
        mapping: &dyn DocumentMapping,
        expression: &Expression,
    ) -> QueryResult<Box<dyn WhereFragment>>;
}

/// Default translator onto PostgreSQL JSON operators
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionParser;

impl ExpressionParser {
    pub fn new() -> Self {
        Self
    }

    fn locator(mapping: &dyn DocumentMapping, member: &MemberPath) -> QueryResult<String> {
        mapping.json_locator(&Expression::Member(member.clone()))
    }

    fn parse_comparison(
        &self,
        mapping: &dyn DocumentMapping,
        left: &Expression,
        op: CompareOp,
        right: &Expression,
    ) -> QueryResult<Box<dyn WhereFragment>> {
        match (left, right) {
            (Expression::Member(member), Expression::Constant { value }) => {
                compare_to_value(Self::locator(mapping, member)?, op, value)
            }
            // 10 < x.Price is x.Price > 10
            (Expression::Constant { value }, Expression::Member(member)) => {
                compare_to_value(Self::locator(mapping, member)?, op.flip(), value)
            }
            (Expression::Member(l), Expression::Member(r)) => Ok(Box::new(SqlFragment::new(
                format!(
                    "{} {} {}",
                    Self::locator(mapping, l)?,
                    op.sql(),
                    Self::locator(mapping, r)?
                ),
            ))),
            _ => Err(QueryError::UnsupportedExpression(format!(
                "cannot compare {} with {}",
                left, right
            ))),
        }
    }
}

fn compare_to_value(
    locator: String,
    op: CompareOp,
    value: &Value,
) -> QueryResult<Box<dyn WhereFragment>> {
    if value.is_null() {
        return match op {
            CompareOp::Eq => Ok(Box::new(SqlFragment::new(format!("{} is null", locator)))),
            CompareOp::NotEq => Ok(Box::new(SqlFragment::new(format!(
                "{} is not null",
                locator
            )))),
            other => Err(QueryError::UnsupportedExpression(format!(
                "cannot apply '{}' to null",
                other.sql()
            ))),
        };
    }
    Ok(Box::new(ComparisonFragment::new(
        locator,
        op.sql(),
        value.clone(),
    )))
}

fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

impl PredicateTranslator for ExpressionParser {
    fn parse_where_fragment(
        &self,
        mapping: &dyn DocumentMapping,
        expression: &Expression,
    ) -> QueryResult<Box<dyn WhereFragment>> {
        match expression {
            Expression::Compare { left, op, right } => {
                self.parse_comparison(mapping, left, *op, right)
            }
            Expression::And { left, right } => Ok(Box::new(CompoundWhereFragment::and(vec![
                self.parse_where_fragment(mapping, left)?,
                self.parse_where_fragment(mapping, right)?,
            ]))),
            Expression::Or { left, right } => Ok(Box::new(CompoundWhereFragment::or(vec![
                self.parse_where_fragment(mapping, left)?,
                self.parse_where_fragment(mapping, right)?,
            ]))),
            Expression::Not { operand } => Ok(Box::new(NotWhereFragment::new(
                self.parse_where_fragment(mapping, operand)?,
            ))),
            Expression::IsNull { member } => Ok(Box::new(SqlFragment::new(format!(
                "{} is null",
                Self::locator(mapping, member)?
            )))),
            Expression::IsNotNull { member } => Ok(Box::new(SqlFragment::new(format!(
                "{} is not null",
                Self::locator(mapping, member)?
            )))),
            Expression::In { member, values } => Ok(Box::new(AnyFragment::new(
                Self::locator(mapping, member)?,
                values.clone(),
            ))),
            Expression::StringMatch {
                member,
                kind,
                value,
            } => {
                let escaped = escape_like(value);
                let pattern = match kind {
                    StringMatchKind::Contains => format!("%{}%", escaped),
                    StringMatchKind::StartsWith => format!("{}%", escaped),
                    StringMatchKind::EndsWith => format!("%{}", escaped),
                };
                Ok(Box::new(ComparisonFragment::new(
                    Self::locator(mapping, member)?,
                    "like",
                    Value::String(pattern),
                )))
            }
            // Bare boolean member, e.g. Where(x => x.IsActive)
            Expression::Member(member) if member.field_type == FieldType::Boolean => {
                Ok(Box::new(SqlFragment::new(format!(
                    "{} = true",
                    Self::locator(mapping, member)?
                ))))
            }
            Expression::Constant {
                value: Value::Bool(b),
            } => Ok(Box::new(SqlFragment::new(b.to_string()))),
            other => Err(QueryError::UnsupportedExpression(format!(
                "'{}' is not a boolean predicate",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::schema::DocumentSchema;
    use serde_json::json;

    fn render(expression: &Expression) -> (String, Command) {
        let mapping = DocumentSchema::new("Widget").unwrap();
        let fragment = ExpressionParser::new()
            .parse_where_fragment(&mapping, expression)
            .unwrap();
        let mut cmd = Command::new();
        let sql = fragment.to_sql(&mut cmd);
        (sql, cmd)
    }

    #[test]
    fn test_member_greater_than_constant() {
        let (sql, cmd) =
            render(&Expression::typed_member("Price", FieldType::Decimal).greater_than(10));
        assert_eq!(sql, "(d.data->>'price')::numeric > $1");
        assert_eq!(cmd.parameter_values(), vec![&json!(10)]);
    }

    #[test]
    fn test_constant_on_left_flips_operator() {
        let expr = Expression::constant(10).compare(
            CompareOp::Lt,
            Expression::typed_member("Price", FieldType::Decimal),
        );
        let (sql, _) = render(&expr);
        assert_eq!(sql, "(d.data->>'price')::numeric > $1");
    }

    #[test]
    fn test_equals_null_becomes_is_null() {
        let (sql, cmd) = render(&Expression::member("Name").equals(Value::Null));
        assert_eq!(sql, "d.data->>'name' is null");
        assert!(cmd.parameters().is_empty());

        let (sql, _) = render(&Expression::member("Name").not_equals(Value::Null));
        assert_eq!(sql, "d.data->>'name' is not null");
    }

    #[test]
    fn test_or_and_not() {
        let expr = Expression::member("Color")
            .equals("red")
            .or(Expression::member("Color").equals("blue"))
            .negate();
        let (sql, cmd) = render(&expr);
        assert_eq!(
            sql,
            "not((d.data->>'color' = $1) or (d.data->>'color' = $2))"
        );
        assert_eq!(cmd.parameter_values(), vec![&json!("red"), &json!("blue")]);
    }

    #[test]
    fn test_member_to_member() {
        let expr = Expression::typed_member("Cost", FieldType::Decimal).compare(
            CompareOp::GtEq,
            Expression::typed_member("Price", FieldType::Decimal),
        );
        let (sql, cmd) = render(&expr);
        assert_eq!(
            sql,
            "(d.data->>'cost')::numeric >= (d.data->>'price')::numeric"
        );
        assert!(cmd.parameters().is_empty());
    }

    #[test]
    fn test_string_contains_escapes_wildcards() {
        let expr = Expression::StringMatch {
            member: MemberPath::new("Name"),
            kind: StringMatchKind::Contains,
            value: "50%_off".to_string(),
        };
        let (sql, cmd) = render(&expr);
        assert_eq!(sql, "d.data->>'name' like $1");
        assert_eq!(cmd.parameter_values(), vec![&json!("%50\\%\\_off%")]);
    }

    #[test]
    fn test_in_list() {
        let expr = Expression::In {
            member: MemberPath::new("Color"),
            values: vec![json!("red"), json!("blue")],
        };
        let (sql, cmd) = render(&expr);
        assert_eq!(sql, "d.data->>'color' = ANY($1)");
        assert_eq!(cmd.parameter_values(), vec![&json!(["red", "blue"])]);
    }

    #[test]
    fn test_boolean_member_shorthand() {
        let (sql, _) = render(&Expression::typed_member("IsActive", FieldType::Boolean));
        assert_eq!(sql, "(d.data->>'isActive')::boolean = true");
    }

    #[test]
    fn test_non_predicate_is_rejected() {
        let mapping = DocumentSchema::new("Widget").unwrap();
        let err = ExpressionParser::new()
            .parse_where_fragment(&mapping, &Expression::member("Name"))
            .unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedExpression(_)));
    }

    #[test]
    fn test_ordering_comparison_against_null_is_rejected() {
        let mapping = DocumentSchema::new("Widget").unwrap();
        let err = ExpressionParser::new()
            .parse_where_fragment(&mapping, &Expression::member("Name").greater_than(Value::Null))
            .unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedExpression(_)));
    }
}
