use serde::de::DeserializeOwned;
use serde_json::Value;

use super::expression::Expression;
use super::fragments::{CompoundWhereFragment, WhereFragment};
use super::model::{AggregateKind, OrderingDirection, QueryMode, QueryModel, ResultOperator};
use super::parser::PredicateTranslator;
use super::selector::{Selector, WholeDocumentSelector};
use crate::command::Command;
use crate::error::{QueryError, QueryResult};
use crate::schema::{DocumentMapping, DOCUMENT_ALIAS};

/// Compiles one [`QueryModel`] into a single SQL statement on a [`Command`].
///
/// Every failure is detected before the first fragment renders, so a command
/// passed to a compilation that returns `Err` is left untouched.
pub struct DocumentQuery<'a> {
    mapping: &'a dyn DocumentMapping,
    query: &'a QueryModel,
    parser: &'a dyn PredicateTranslator,
}

impl<'a> DocumentQuery<'a> {
    pub fn new(
        mapping: &'a dyn DocumentMapping,
        query: &'a QueryModel,
        parser: &'a dyn PredicateTranslator,
    ) -> Self {
        Self {
            mapping,
            query,
            parser,
        }
    }

    /// `select (count(*) > 0) as result ...`
    pub fn compile_existence_check(&self, command: &mut Command) -> QueryResult<()> {
        let where_fragment = self.build_where_clause()?;

        let mut sql = format!(
            "select (count(*) > 0) as result from {} as {}",
            self.mapping.table_name(),
            DOCUMENT_ALIAS
        );
        append_where(&mut sql, where_fragment, command);

        self.attach(command, sql);
        Ok(())
    }

    /// `select count(*) as number ...`
    pub fn compile_count(&self, command: &mut Command) -> QueryResult<()> {
        let where_fragment = self.build_where_clause()?;

        let mut sql = format!(
            "select count(*) as number from {} as {}",
            self.mapping.table_name(),
            DOCUMENT_ALIAS
        );
        append_where(&mut sql, where_fragment, command);

        self.attach(command, sql);
        Ok(())
    }

    /// `select sum(<locator>) as number ...`
    pub fn compile_sum(&self, command: &mut Command) -> QueryResult<()> {
        self.compile_aggregate(AggregateKind::Sum, command)
    }

    pub fn compile_aggregate(&self, kind: AggregateKind, command: &mut Command) -> QueryResult<()> {
        let locator = self.aggregate_locator(kind)?;
        let where_fragment = self.build_where_clause()?;

        let mut sql = format!(
            "select {}({}) as number from {} as {}",
            kind.sql_function(),
            locator,
            self.mapping.table_name(),
            DOCUMENT_ALIAS
        );
        append_where(&mut sql, where_fragment, command);

        self.attach(command, sql);
        Ok(())
    }

    /// Full result-set fetch. Returns the selector that turns the rows into `T`.
    pub fn compile_fetch<T: DeserializeOwned>(
        &self,
        command: &mut Command,
    ) -> QueryResult<WholeDocumentSelector<T>> {
        if self.query.has_operator(|op| {
            matches!(op, ResultOperator::Last | ResultOperator::LastOrDefault)
        }) {
            return Err(QueryError::UnsupportedOperator(
                "Last() and LastOrDefault() are not supported. Use a combination of ordering and First/FirstOrDefault() instead".to_string(),
            ));
        }

        let selector = self.build_select_clause::<T>()?;
        let where_fragment = self.build_where_clause()?;
        let order_by = self.to_order_clause()?;

        let mut sql = format!(
            "select {} from {} as {}",
            selector.select_clause(self.mapping),
            self.mapping.table_name(),
            DOCUMENT_ALIAS
        );

        // Parameters bind here, before any text that follows the where clause.
        append_where(&mut sql, where_fragment, command);
        sql.push_str(&order_by);

        if let Some(limit) = self.limit() {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset() {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        self.attach(command, sql);
        Ok(selector)
    }

    /// Compile in whichever mode the query's terminal operator asks for.
    ///
    /// Fetches are compiled for raw JSON documents; callers wanting typed rows
    /// resolve them with their own [`WholeDocumentSelector`].
    pub fn compile(&self, command: &mut Command) -> QueryResult<QueryMode> {
        let mode = self.query.mode();
        match mode {
            QueryMode::Any => self.compile_existence_check(command)?,
            QueryMode::Count => self.compile_count(command)?,
            QueryMode::Aggregate(kind) => self.compile_aggregate(kind, command)?,
            QueryMode::Fetch => {
                self.compile_fetch::<Value>(command)?;
            }
        }
        Ok(mode)
    }

    fn build_select_clause<T: DeserializeOwned>(&self) -> QueryResult<WholeDocumentSelector<T>> {
        match self.query.selector() {
            Expression::Item => Ok(WholeDocumentSelector::new()),
            other => Err(QueryError::UnsupportedProjection(format!(
                "Cannot yet do a Select() projection ({})",
                other
            ))),
        }
    }

    fn aggregate_locator(&self, kind: AggregateKind) -> QueryResult<String> {
        let selector = self.query.selector();
        let unsupported = || {
            QueryError::UnsupportedProjection(format!(
                "{}() needs a direct field selector, got {}",
                kind.sql_function(),
                selector
            ))
        };
        let path = selector.as_member().ok_or_else(unsupported)?;

        // sum and avg only make sense over a numeric cast
        if matches!(kind, AggregateKind::Sum | AggregateKind::Average)
            && !path.field_type.is_numeric()
        {
            return Err(QueryError::UnsupportedProjection(format!(
                "{}() needs a numeric field, got {} ({:?})",
                kind.sql_function(),
                selector,
                path.field_type
            )));
        }

        self.mapping
            .json_locator(selector)
            .map_err(|_| unsupported())
    }

    fn build_where_clause(&self) -> QueryResult<Option<Box<dyn WhereFragment>>> {
        let wheres = self.query.filters();
        if wheres.is_empty() {
            return Ok(self.mapping.default_where_fragment());
        }

        let fragment: Box<dyn WhereFragment> = if wheres.len() == 1 {
            self.parser.parse_where_fragment(self.mapping, &wheres[0])?
        } else {
            let children = wheres
                .iter()
                .map(|w| self.parser.parse_where_fragment(self.mapping, w))
                .collect::<QueryResult<Vec<_>>>()?;
            Box::new(CompoundWhereFragment::and(children))
        };

        Ok(Some(self.mapping.filter_documents(fragment)))
    }

    fn to_order_clause(&self) -> QueryResult<String> {
        let orderings = self.query.orderings();
        if orderings.is_empty() {
            return Ok(String::new());
        }

        let keys = orderings
            .iter()
            .map(|ordering| {
                let locator = self.mapping.json_locator(&ordering.expression)?;
                Ok(match ordering.direction {
                    OrderingDirection::Asc => locator,
                    OrderingDirection::Desc => format!("{} desc", locator),
                })
            })
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(format!(" order by {}", keys.join(", ")))
    }

    fn limit(&self) -> Option<u64> {
        let takes: Vec<u64> = self
            .query
            .result_operators()
            .iter()
            .filter_map(|op| match op {
                ResultOperator::Take { count } => Some(*count),
                _ => None,
            })
            .collect();

        if let Some(take) = pick_by_descending_count("Take", takes) {
            return Some(take);
        }

        if self.query.has_operator(|op| {
            matches!(op, ResultOperator::First | ResultOperator::FirstOrDefault)
        }) {
            return Some(1);
        }

        // Two rows, so a Single() over a non-unique match can be detected by the caller
        if self.query.has_operator(|op| {
            matches!(op, ResultOperator::Single | ResultOperator::SingleOrDefault)
        }) {
            return Some(2);
        }

        None
    }

    fn offset(&self) -> Option<u64> {
        let skips: Vec<u64> = self
            .query
            .result_operators()
            .iter()
            .filter_map(|op| match op {
                ResultOperator::Skip { count } => Some(*count),
                _ => None,
            })
            .collect();

        pick_by_descending_count("Skip", skips)
    }

    fn attach(&self, command: &mut Command, sql: String) {
        tracing::debug!(
            document_type = self.query.item_type(),
            parameters = command.parameters().len(),
            "compiled query: {}",
            sql
        );
        command.append_query(&sql);
    }
}

fn append_where(sql: &mut String, fragment: Option<Box<dyn WhereFragment>>, command: &mut Command) {
    if let Some(fragment) = fragment {
        sql.push_str(" where ");
        sql.push_str(&fragment.to_sql(command));
    }
}

/// Duplicate Take/Skip operators: order by count descending and keep the first
fn pick_by_descending_count(operator: &str, mut counts: Vec<u64>) -> Option<u64> {
    if counts.len() > 1 {
        tracing::warn!(
            "{} {}() operators in one query, using the largest count",
            counts.len(),
            operator
        );
    }
    counts.sort_unstable_by(|a, b| b.cmp(a));
    counts.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linq::{ExpressionParser, FieldType};
    use crate::schema::DocumentSchema;
    use serde_json::json;

    fn widgets() -> DocumentSchema {
        DocumentSchema::new("Widget")
            .unwrap()
            .table("widgets")
            .unwrap()
    }

    fn fetch_sql(query: &QueryModel) -> String {
        let mapping = widgets();
        let parser = ExpressionParser::new();
        let mut cmd = Command::new();
        DocumentQuery::new(&mapping, query, &parser)
            .compile_fetch::<Value>(&mut cmd)
            .unwrap();
        cmd.sql().to_string()
    }

    #[test]
    fn test_plain_fetch() {
        assert_eq!(
            fetch_sql(&QueryModel::new("Widget")),
            "select d.data, d.id from widgets as d"
        );
    }

    #[test]
    fn test_first_limits_to_one() {
        let query = QueryModel::new("Widget").with_operator(ResultOperator::FirstOrDefault);
        assert_eq!(
            fetch_sql(&query),
            "select d.data, d.id from widgets as d LIMIT 1"
        );
    }

    #[test]
    fn test_duplicate_takes_use_largest() {
        let query = QueryModel::new("Widget").take(2).take(7).take(4);
        assert!(fetch_sql(&query).ends_with(" LIMIT 7"));
    }

    #[test]
    fn test_duplicate_skips_use_largest() {
        let query = QueryModel::new("Widget").skip(10).skip(3);
        assert!(fetch_sql(&query).ends_with(" OFFSET 10"));
    }

    #[test]
    fn test_limit_before_offset() {
        let query = QueryModel::new("Widget").skip(20).take(10);
        assert!(fetch_sql(&query).ends_with(" LIMIT 10 OFFSET 20"));
    }

    #[test]
    fn test_sum_of_typed_member() {
        let mapping = widgets();
        let parser = ExpressionParser::new();
        let query = QueryModel::new("Widget")
            .filter(Expression::member("Color").equals("red"))
            .sum(Expression::typed_member("Price", FieldType::Decimal));
        let mut cmd = Command::new();
        DocumentQuery::new(&mapping, &query, &parser)
            .compile_sum(&mut cmd)
            .unwrap();
        assert_eq!(
            cmd.sql(),
            "select sum((d.data->>'price')::numeric) as number from widgets as d where d.data->>'color' = $1"
        );
        assert_eq!(cmd.parameter_values(), vec![&json!("red")]);
    }

    #[test]
    fn test_sum_requires_member_selector() {
        let mapping = widgets();
        let parser = ExpressionParser::new();
        let query = QueryModel::new("Widget").with_operator(ResultOperator::Sum);
        let mut cmd = Command::new();
        let err = DocumentQuery::new(&mapping, &query, &parser)
            .compile_sum(&mut cmd)
            .unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedProjection(_)));
        assert!(cmd.is_empty());
    }

    #[test]
    fn test_compile_dispatches_on_mode() {
        let mapping = widgets();
        let parser = ExpressionParser::new();
        let query = QueryModel::new("Widget").with_operator(ResultOperator::Count);
        let mut cmd = Command::new();
        let mode = DocumentQuery::new(&mapping, &query, &parser)
            .compile(&mut cmd)
            .unwrap();
        assert_eq!(mode, QueryMode::Count);
        assert_eq!(cmd.sql(), "select count(*) as number from widgets as d");
    }

    #[test]
    fn test_pick_by_descending_count() {
        assert_eq!(pick_by_descending_count("Take", vec![]), None);
        assert_eq!(pick_by_descending_count("Take", vec![3]), Some(3));
        assert_eq!(pick_by_descending_count("Take", vec![3, 9, 1]), Some(9));
    }
}
