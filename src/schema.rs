use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::dialect::Dialect;
use crate::error::ConvertError;
use crate::translate::Translator;

/// Inbound body of `POST /convert`
///
/// Fields are loosely typed at the serde level so that a missing or
/// non-string field is reported by name instead of as a generic
/// deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionRequest {
    #[serde(default)]
    pub query: Option<Value>,
    #[serde(default)]
    pub dialect_from: Option<Value>,
    #[serde(default)]
    pub dialect_to: Option<Value>,
    #[serde(default)]
    pub mode: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResponse {
    pub converted_query: String,
}

/// How the converted statement is presented to the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    #[default]
    Sql,
    Pyspark,
    Python,
}

impl OutputMode {
    pub fn render(&self, sql: &str) -> String {
        match self {
            OutputMode::Sql => sql.to_string(),
            OutputMode::Pyspark => format!("df = spark.sql('''{}''')", sql),
            OutputMode::Python => format!("df = duckdb.query('''{}''').to_df()", sql),
        }
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sql" => Ok(OutputMode::Sql),
            "pyspark" => Ok(OutputMode::Pyspark),
            "python" => Ok(OutputMode::Python),
            other => Err(format!(
                "unsupported mode '{}', expected one of: sql, pyspark, python",
                other
            )),
        }
    }
}

/// A request that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub query: String,
    pub dialect_from: Dialect,
    pub dialect_to: Dialect,
    pub mode: OutputMode,
}

impl ConversionRequest {
    pub fn new(query: &str, dialect_from: &str, dialect_to: &str) -> Self {
        Self {
            query: Some(Value::from(query)),
            dialect_from: Some(Value::from(dialect_from)),
            dialect_to: Some(Value::from(dialect_to)),
            mode: None,
        }
    }

    /// Check the request shape and resolve dialect names against what
    /// `translator` declares. The first offending field is reported.
    pub fn validate(&self, translator: &dyn Translator) -> Result<ValidatedRequest, ConvertError> {
        let query = required_text("query", string_field("query", &self.query)?)?;
        let dialect_from =
            resolve_dialect("dialect_from", string_field("dialect_from", &self.dialect_from)?, translator)?;
        let dialect_to =
            resolve_dialect("dialect_to", string_field("dialect_to", &self.dialect_to)?, translator)?;
        let mode = match string_field("mode", &self.mode)? {
            None => OutputMode::default(),
            Some(raw) => raw
                .parse::<OutputMode>()
                .map_err(|msg| ConvertError::validation("mode", msg))?,
        };

        Ok(ValidatedRequest {
            query: query.to_string(),
            dialect_from,
            dialect_to,
            mode,
        })
    }
}

/// `null` counts as missing; any other non-string JSON value is rejected
fn string_field<'a>(field: &str, value: &'a Option<Value>) -> Result<Option<&'a str>, ConvertError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ConvertError::validation(
            field,
            format!("field '{}' must be a string", field),
        )),
    }
}

fn required_text<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, ConvertError> {
    match value {
        None => Err(ConvertError::validation(field, format!("field '{}' is required", field))),
        Some(v) if v.trim().is_empty() => Err(ConvertError::validation(
            field,
            format!("field '{}' must not be empty", field),
        )),
        Some(v) => Ok(v),
    }
}

pub(crate) fn resolve_dialect(
    field: &str,
    value: Option<&str>,
    translator: &dyn Translator,
) -> Result<Dialect, ConvertError> {
    let raw = required_text(field, value)?;
    let dialect = raw
        .parse::<Dialect>()
        .map_err(|e| ConvertError::validation(field, format!("{}: {}", field, e)))?;

    if !translator.supports(dialect) {
        return Err(ConvertError::validation(
            field,
            format!("{}: dialect '{}' is not supported by {}", field, dialect, translator.name()),
        ));
    }
    Ok(dialect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::TranslateError;
    use async_trait::async_trait;

    struct OnlyBigQuery;

    #[async_trait]
    impl Translator for OnlyBigQuery {
        fn name(&self) -> &'static str {
            "only-bigquery"
        }

        fn supported_dialects(&self) -> &[Dialect] {
            &[Dialect::BigQuery, Dialect::Databricks]
        }

        async fn translate(
            &self,
            query: &str,
            _from: Dialect,
            _to: Dialect,
        ) -> Result<Vec<String>, TranslateError> {
            Ok(vec![query.to_string()])
        }
    }

    fn field_of(result: Result<ValidatedRequest, ConvertError>) -> String {
        result.unwrap_err().field().unwrap().to_string()
    }

    #[test]
    fn test_valid_request() {
        let req = ConversionRequest::new("SELECT 1", "BigQuery", "databricks");
        let validated = req.validate(&OnlyBigQuery).unwrap();
        assert_eq!(validated.dialect_from, Dialect::BigQuery);
        assert_eq!(validated.dialect_to, Dialect::Databricks);
        assert_eq!(validated.mode, OutputMode::Sql);
    }

    #[test]
    fn test_missing_fields_are_named() {
        let mut req = ConversionRequest::new("SELECT 1", "bigquery", "databricks");
        req.query = None;
        assert_eq!(field_of(req.validate(&OnlyBigQuery)), "query");

        let mut req = ConversionRequest::new("SELECT 1", "bigquery", "databricks");
        req.dialect_from = None;
        assert_eq!(field_of(req.validate(&OnlyBigQuery)), "dialect_from");

        let mut req = ConversionRequest::new("SELECT 1", "bigquery", "databricks");
        req.dialect_to = None;
        assert_eq!(field_of(req.validate(&OnlyBigQuery)), "dialect_to");
    }

    #[test]
    fn test_blank_query_rejected() {
        let req = ConversionRequest::new("   \n", "bigquery", "databricks");
        assert_eq!(field_of(req.validate(&OnlyBigQuery)), "query");
    }

    #[test]
    fn test_unknown_dialect_rejected() {
        let req = ConversionRequest::new("SELECT 1", "not_a_real_dialect", "databricks");
        let err = req.validate(&OnlyBigQuery).unwrap_err();
        assert_eq!(err.field(), Some("dialect_from"));
        assert!(err.to_string().contains("not_a_real_dialect"));
    }

    #[test]
    fn test_dialect_outside_translator_set_rejected() {
        let req = ConversionRequest::new("SELECT 1", "bigquery", "oracle");
        let err = req.validate(&OnlyBigQuery).unwrap_err();
        assert_eq!(err.field(), Some("dialect_to"));
        assert!(err.to_string().contains("only-bigquery"));
    }

    #[test]
    fn test_mode_parsing() {
        let mut req = ConversionRequest::new("SELECT 1", "bigquery", "databricks");
        req.mode = Some(Value::from("PySpark"));
        assert_eq!(req.validate(&OnlyBigQuery).unwrap().mode, OutputMode::Pyspark);

        req.mode = Some(Value::from("udf"));
        assert_eq!(field_of(req.validate(&OnlyBigQuery)), "mode");
    }

    #[test]
    fn test_non_string_field_named() {
        let req: ConversionRequest = serde_json::from_value(serde_json::json!({
            "query": 123,
            "dialect_from": "bigquery",
            "dialect_to": "databricks"
        }))
        .unwrap();
        let err = req.validate(&OnlyBigQuery).unwrap_err();
        assert_eq!(err.field(), Some("query"));
        assert!(err.to_string().contains("must be a string"));

        let req: ConversionRequest = serde_json::from_value(serde_json::json!({
            "query": "SELECT 1",
            "dialect_from": ["bigquery"],
            "dialect_to": "databricks"
        }))
        .unwrap();
        assert_eq!(field_of(req.validate(&OnlyBigQuery)), "dialect_from");
    }

    #[test]
    fn test_null_counts_as_missing() {
        let req: ConversionRequest = serde_json::from_value(serde_json::json!({
            "query": "SELECT 1",
            "dialect_from": "bigquery",
            "dialect_to": null
        }))
        .unwrap();
        let err = req.validate(&OnlyBigQuery).unwrap_err();
        assert_eq!(err.field(), Some("dialect_to"));
        assert!(err.to_string().contains("is required"));
    }

    #[test]
    fn test_render_modes() {
        assert_eq!(OutputMode::Sql.render("SELECT 1"), "SELECT 1");
        assert_eq!(
            OutputMode::Pyspark.render("SELECT 1"),
            "df = spark.sql('''SELECT 1''')"
        );
        assert_eq!(
            OutputMode::Python.render("SELECT 1"),
            "df = duckdb.query('''SELECT 1''').to_df()"
        );
    }
}
