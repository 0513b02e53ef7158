//! Translator interface - the actual SQL rewriting is done by a third-party engine

use async_trait::async_trait;

use crate::dialect::Dialect;

/// Interface for a SQL dialect translator
/// Implementations must be stateless: the same input always yields the same output
#[async_trait]
pub trait Translator: Send + Sync {
    /// Short name of the backing engine, reported by the health endpoint
    fn name(&self) -> &'static str;

    /// Dialects this translator can read and write
    fn supported_dialects(&self) -> &[Dialect];

    /// Rewrite `query` from `from` into `to`
    ///
    /// # Returns
    /// One rendered statement per input statement, or the engine's diagnostic
    async fn translate(
        &self,
        query: &str,
        from: Dialect,
        to: Dialect,
    ) -> Result<Vec<String>, TranslateError>;

    fn supports(&self, dialect: Dialect) -> bool {
        self.supported_dialects().contains(&dialect)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// The engine rejected the input
    #[error("{0}")]
    Rejected(String),

    /// The blocking task running the engine did not complete
    #[error("translation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
