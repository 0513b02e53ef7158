use async_trait::async_trait;
use polyglot_sql::expressions::Identifier;
use polyglot_sql::traversal::transform_map;
use polyglot_sql::{Dialect as Engine, DialectType, Expression};
use tracing::debug;

use crate::dialect::Dialect;
use crate::translate::interface::{TranslateError, Translator};

/// Translator backed by the polyglot-sql transpiler
#[derive(Debug, Clone, Default)]
pub struct PolyglotTranslator;

impl PolyglotTranslator {
    pub fn new() -> Self {
        Self
    }
}

fn dialect_type(dialect: Dialect) -> DialectType {
    match dialect {
        Dialect::BigQuery => DialectType::BigQuery,
        Dialect::Databricks => DialectType::Databricks,
        Dialect::Spark => DialectType::Spark,
        Dialect::Hive => DialectType::Hive,
        Dialect::PostgreSQL => DialectType::PostgreSQL,
        Dialect::MySQL => DialectType::MySQL,
        Dialect::Snowflake => DialectType::Snowflake,
        Dialect::TSQL => DialectType::TSQL,
        Dialect::DuckDB => DialectType::DuckDB,
        Dialect::SQLite => DialectType::SQLite,
        Dialect::Redshift => DialectType::Redshift,
        Dialect::Trino => DialectType::Trino,
        Dialect::Presto => DialectType::Presto,
        Dialect::Oracle => DialectType::Oracle,
        Dialect::ClickHouse => DialectType::ClickHouse,
    }
}

/// Parse, check and re-emit every statement in `sql`
fn transpile(sql: &str, from: Dialect, to: Dialect) -> Result<Vec<String>, TranslateError> {
    let (read, write) = (dialect_type(from), dialect_type(to));
    let reader = Engine::get(read);
    let writer = Engine::get(write);

    let statements = reader.parse(sql).map_err(rejected)?;

    statements
        .into_iter()
        .map(|expr| {
            // The parser accepts bare expressions at the top level (`SELEC * FORM t`)
            if !expr.is_statement() {
                return Err(TranslateError::Rejected(
                    "Invalid expression / Unexpected token".to_string(),
                ));
            }
            let expr = if from == Dialect::BigQuery {
                transform_map(expr, &unquote_table_path).map_err(rejected)?
            } else {
                expr
            };
            let transformed = writer.transform(expr).map_err(rejected)?;
            writer.generate_with_source(&transformed, read).map_err(rejected)
        })
        .collect()
}

fn rejected(e: polyglot_sql::Error) -> TranslateError {
    TranslateError::Rejected(e.to_string())
}

/// BigQuery backticks around `project.dataset.table` only delimit the path;
/// drop them when every segment is a plain identifier
fn unquote_table_path(expr: Expression) -> polyglot_sql::Result<Expression> {
    match expr {
        Expression::Table(mut table) => {
            let t = &mut *table;
            let parts = t
                .catalog
                .iter_mut()
                .chain(t.schema.iter_mut())
                .chain(std::iter::once(&mut t.name));
            for ident in parts {
                unquote_if_plain(ident);
            }
            Ok(Expression::Table(table))
        }
        other => Ok(other),
    }
}

fn unquote_if_plain(ident: &mut Identifier) {
    if ident.quoted && is_plain_path(&ident.name) {
        ident.quoted = false;
    }
}

fn is_plain_path(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[async_trait]
impl Translator for PolyglotTranslator {
    fn name(&self) -> &'static str {
        "polyglot-sql"
    }

    fn supported_dialects(&self) -> &[Dialect] {
        &Dialect::ALL
    }

    async fn translate(
        &self,
        query: &str,
        from: Dialect,
        to: Dialect,
    ) -> Result<Vec<String>, TranslateError> {
        debug!("Transpiling {} -> {} ({} bytes)", from, to, query.len());

        // Parsing and generation are CPU-bound; keep them off the async workers
        let query = query.to_string();
        tokio::task::spawn_blocking(move || transpile(&query, from, to)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_path() {
        assert!(is_plain_path("project.dataset.table"));
        assert!(is_plain_path("_tmp"));
        assert!(!is_plain_path("my-project.dataset.table"));
        assert!(!is_plain_path("dataset.25"));
        assert!(!is_plain_path("a..b"));
        assert!(!is_plain_path(""));
    }

    #[test]
    fn test_backticked_path_unquoted() {
        let out = transpile(
            "SELECT * FROM `project.dataset.table`",
            Dialect::BigQuery,
            Dialect::Databricks,
        )
        .unwrap();
        assert_eq!(out, vec!["SELECT * FROM project.dataset.table".to_string()]);
    }

    #[test]
    fn test_hyphenated_path_stays_quoted() {
        let out = transpile(
            "SELECT * FROM `my-project.dataset.table`",
            Dialect::BigQuery,
            Dialect::Databricks,
        )
        .unwrap();
        assert!(out[0].contains('`'));
    }

    #[test]
    fn test_bare_expression_rejected() {
        let err = transpile("SELEC * FORM t", Dialect::BigQuery, Dialect::Databricks).unwrap_err();
        assert!(matches!(err, TranslateError::Rejected(_)));
        assert_eq!(err.to_string(), "Invalid expression / Unexpected token");
    }

    #[test]
    fn test_multiple_statements() {
        let out = transpile("SELECT 1; SELECT 2", Dialect::BigQuery, Dialect::Databricks).unwrap();
        assert_eq!(out, vec!["SELECT 1".to_string(), "SELECT 2".to_string()]);
    }
}
