use std::sync::Arc;

use tracing::{debug, warn};

use crate::dialect::Dialect;
use crate::error::ConvertError;
use crate::rules::MappingRules;
use crate::schema::{ConversionRequest, ConversionResponse, OutputMode, ValidatedRequest};
use crate::translate::{TranslateError, Translator};

/// Stateless conversion service, built once at startup and shared by handlers
#[derive(Clone)]
pub struct ConversionService {
    translator: Arc<dyn Translator>,
    rules: Option<Arc<MappingRules>>,
}

impl ConversionService {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self {
            translator,
            rules: None,
        }
    }

    pub fn with_rules(mut self, rules: MappingRules) -> Self {
        self.rules = Some(Arc::new(rules));
        self
    }

    pub fn translator(&self) -> &dyn Translator {
        self.translator.as_ref()
    }

    /// Validate `request`, translate it and render the configured output mode
    pub async fn convert(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionResponse, ConvertError> {
        let validated = request.validate(self.translator.as_ref())?;
        self.convert_validated(&validated).await
    }

    pub async fn convert_validated(
        &self,
        request: &ValidatedRequest,
    ) -> Result<ConversionResponse, ConvertError> {
        let converted = self
            .translate(&request.query, request.dialect_from, request.dialect_to)
            .await?;

        Ok(ConversionResponse {
            converted_query: request.mode.render(&converted),
        })
    }

    /// Translate and apply mapping rules, without output-mode rendering
    pub async fn translate(
        &self,
        query: &str,
        from: Dialect,
        to: Dialect,
    ) -> Result<String, ConvertError> {
        debug!("Converting {} -> {}", from, to);

        let statements = match self.translator.translate(query, from, to).await {
            Ok(statements) => statements,
            Err(TranslateError::Rejected(message)) => {
                warn!("Translator rejected {} query: {}", from, message);
                return Err(ConvertError::Translation(message));
            }
            Err(e @ TranslateError::Task(_)) => return Err(ConvertError::Internal(e.into())),
        };

        if statements.is_empty() {
            return Err(ConvertError::Translation(
                "no SQL statement found in query".to_string(),
            ));
        }

        let mut converted = statements.join(";\n");
        if let Some(rules) = self.rules.as_ref().filter(|r| r.applies_to(from, to)) {
            converted = rules.apply(&converted);
        }
        Ok(converted.trim().to_string())
    }

    /// Convert with an explicit mode, used by batch conversion
    pub async fn convert_text(
        &self,
        query: &str,
        from: Dialect,
        to: Dialect,
        mode: OutputMode,
    ) -> Result<String, ConvertError> {
        if query.trim().is_empty() {
            return Err(ConvertError::validation("query", "field 'query' must not be empty"));
        }
        let converted = self.translate(query, from, to).await?;
        Ok(mode.render(&converted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Uppercases its input, fails on anything containing "FORM"
    #[derive(Default)]
    struct FakeTranslator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Translator for FakeTranslator {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn supported_dialects(&self) -> &[Dialect] {
            &Dialect::ALL
        }

        async fn translate(
            &self,
            query: &str,
            _from: Dialect,
            _to: Dialect,
        ) -> Result<Vec<String>, TranslateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if query.contains("FORM") {
                return Err(TranslateError::Rejected(
                    "Invalid expression / Unexpected token. Line 1, Col: 10.".to_string(),
                ));
            }
            Ok(query
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_uppercase)
                .collect())
        }
    }

    fn service() -> (Arc<FakeTranslator>, ConversionService) {
        let fake = Arc::new(FakeTranslator::default());
        (fake.clone(), ConversionService::new(fake))
    }

    #[tokio::test]
    async fn test_convert_success() {
        let (_, service) = service();
        let req = ConversionRequest::new("select 1", "bigquery", "databricks");
        let resp = service.convert(&req).await.unwrap();
        assert_eq!(resp.converted_query, "SELECT 1");
    }

    #[tokio::test]
    async fn test_validation_failure_skips_translator() {
        let (fake, service) = service();

        let mut missing = ConversionRequest::new("select 1", "bigquery", "databricks");
        missing.query = None;
        let empty = ConversionRequest::new("", "bigquery", "databricks");
        let bad_dialect = ConversionRequest::new("select 1", "not_a_real_dialect", "databricks");

        for req in [missing, empty, bad_dialect] {
            let err = service.convert(&req).await.unwrap_err();
            assert!(matches!(err, ConvertError::Validation { .. }));
        }
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_translation_error_carries_message() {
        let (fake, service) = service();
        let req = ConversionRequest::new("SELEC * FORM t", "bigquery", "databricks");
        match service.convert(&req).await {
            Err(ConvertError::Translation(msg)) => assert!(msg.contains("Unexpected token")),
            other => panic!("expected translation error, got {:?}", other),
        }
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_multiple_statements_joined() {
        let (_, service) = service();
        let req = ConversionRequest::new("select 1; select 2", "bigquery", "databricks");
        let resp = service.convert(&req).await.unwrap();
        assert_eq!(resp.converted_query, "SELECT 1;\nSELECT 2");
    }

    #[tokio::test]
    async fn test_no_statements_is_translation_error() {
        let (_, service) = service();
        let req = ConversionRequest::new(";", "bigquery", "databricks");
        let err = service.convert(&req).await.unwrap_err();
        assert!(matches!(err, ConvertError::Translation(_)));
    }

    #[tokio::test]
    async fn test_output_mode_applied() {
        let (_, service) = service();
        let mut req = ConversionRequest::new("select 1", "bigquery", "databricks");
        req.mode = Some(serde_json::Value::from("python"));
        let resp = service.convert(&req).await.unwrap();
        assert_eq!(resp.converted_query, "df = duckdb.query('''SELECT 1''').to_df()");
    }

    #[tokio::test]
    async fn test_rules_only_for_matching_pair() {
        let rules = MappingRules::from_file(
            serde_yaml::from_str("functions:\n  FARM_FINGERPRINT: XXHASH64\n").unwrap(),
        )
        .unwrap();
        let service = ConversionService::new(Arc::new(FakeTranslator::default())).with_rules(rules);

        let out = service
            .translate("select farm_fingerprint(x)", Dialect::BigQuery, Dialect::Databricks)
            .await
            .unwrap();
        assert_eq!(out, "SELECT XXHASH64(X)");

        let out = service
            .translate("select farm_fingerprint(x)", Dialect::BigQuery, Dialect::Snowflake)
            .await
            .unwrap();
        assert_eq!(out, "SELECT FARM_FINGERPRINT(X)");
    }
}
