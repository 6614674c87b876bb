//! Upstream data sources.
//!
//! [`MedicalSources`] is the only contract the gateway has with the
//! registries and search indexes it aggregates: call with the caller's
//! arguments, get typed records back or a [`SourceError`].

pub mod records;
pub mod relay;

#[cfg(test)]
pub mod stub;

pub use records::{Authors, DrugLabel, HealthIndicator, OpenFda, PubMedArticle, RxNormConcept, ScholarRecord};
pub use relay::RelaySources;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("unexpected upstream payload: {0}")]
    Decode(String),
}

#[async_trait]
pub trait MedicalSources: Send + Sync {
    /// FDA drug labels matching a free-text query.
    async fn search_drugs(&self, query: &str, limit: usize) -> Result<Vec<DrugLabel>, SourceError>;

    /// A single drug label by National Drug Code.
    async fn drug_by_ndc(&self, ndc: &str) -> Result<Option<DrugLabel>, SourceError>;

    /// WHO indicator observations, optionally restricted to one country.
    async fn health_indicators(
        &self,
        indicator: &str,
        country: Option<&str>,
    ) -> Result<Vec<HealthIndicator>, SourceError>;

    async fn search_pubmed(&self, query: &str, max_results: usize) -> Result<Vec<PubMedArticle>, SourceError>;

    async fn search_rxnorm(&self, query: &str) -> Result<Vec<RxNormConcept>, SourceError>;

    async fn search_scholar(&self, query: &str) -> Result<Vec<ScholarRecord>, SourceError>;
}
