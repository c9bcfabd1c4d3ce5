use convert_case::{Case, Casing as _};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::linq::MemberPath;

/// Alias every document table is selected under
pub const DOCUMENT_ALIAS: &str = "d";
/// JSON payload column
pub const DATA_COLUMN: &str = "data";
/// Identity column
pub const ID_COLUMN: &str = "id";
/// Soft-delete marker column
pub const DELETED_COLUMN: &str = "mt_deleted";
/// Sub-type discriminator column for document hierarchies
pub const DOC_TYPE_COLUMN: &str = "mt_doc_type";

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// How member names are turned into JSON keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Casing {
    #[default]
    Camel,
    Snake,
    AsIs,
}

impl Casing {
    pub fn apply(self, member: &str) -> String {
        match self {
            Casing::Camel => member.to_case(Case::Camel),
            Casing::Snake => member.to_case(Case::Snake),
            Casing::AsIs => member.to_string(),
        }
    }
}

/// Table and schema names are spliced into SQL unquoted, so only plain identifiers pass
pub fn validate_identifier(name: &str) -> QueryResult<&str> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(name)
    } else {
        Err(QueryError::InvalidIdentifier(name.to_string()))
    }
}

fn quote_key(key: &str) -> String {
    format!("'{}'", key.replace('\'', "''"))
}

/// Build the locator for a member path, e.g. `(d.data->'address'->>'zip')::integer`
pub fn member_locator(path: &MemberPath, casing: Casing) -> QueryResult<String> {
    let Some((last, parents)) = path.members.split_last() else {
        return Err(QueryError::UnsupportedExpression(
            "empty member path".to_string(),
        ));
    };
    if path.members.iter().any(|member| member.is_empty()) {
        return Err(QueryError::UnsupportedExpression(format!(
            "empty segment in member path {}",
            path
        )));
    }

    let mut locator = format!("{}.{}", DOCUMENT_ALIAS, DATA_COLUMN);
    for member in parents {
        locator.push_str("->");
        locator.push_str(&quote_key(&casing.apply(member)));
    }
    locator.push_str("->>");
    locator.push_str(&quote_key(&casing.apply(last)));

    Ok(match path.field_type.pg_cast() {
        Some(cast) => format!("({})::{}", locator, cast),
        None => locator,
    })
}
