use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::config::Config;
use crate::dialect::Dialect;
use crate::rules::MappingRules;
use crate::service::ConversionService;
use crate::translate::{PolyglotTranslator, Translator};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub service: ConversionService,
    /// Dialect pair used by batch conversion when the form omits one
    pub default_dialects: (Dialect, Dialect),
}

impl AppState {
    /// Build the production state: polyglot translator plus optional mapping rules
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let mut service = ConversionService::new(Arc::new(PolyglotTranslator::new()));
        if let Some(path) = &config.conversion.rules_file {
            service = service.with_rules(MappingRules::load(path)?);
        }
        Self::with_service(config, service)
    }

    pub fn with_service(config: Config, service: ConversionService) -> anyhow::Result<Self> {
        let default_dialects = (
            resolve_default(service.translator(), &config.conversion.default_dialect_from)
                .context("conversion.default_dialect_from")?,
            resolve_default(service.translator(), &config.conversion.default_dialect_to)
                .context("conversion.default_dialect_to")?,
        );
        info!(
            "Translator {} ready with {} dialects (batch default {} -> {})",
            service.translator().name(),
            service.translator().supported_dialects().len(),
            default_dialects.0,
            default_dialects.1
        );

        Ok(Self {
            config: Arc::new(config),
            service,
            default_dialects,
        })
    }
}

fn resolve_default(translator: &dyn Translator, name: &str) -> anyhow::Result<Dialect> {
    let dialect: Dialect = name.parse()?;
    if !translator.supports(dialect) {
        anyhow::bail!("dialect '{}' is not supported by {}", dialect, translator.name());
    }
    Ok(dialect)
}
