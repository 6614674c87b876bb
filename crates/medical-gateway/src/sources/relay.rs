use super::{DrugLabel, HealthIndicator, MedicalSources, PubMedArticle, RxNormConcept, ScholarRecord, SourceError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Sources served by an upstream utility service over HTTP.
///
/// Each operation is a `GET {base_url}/{operation}` with query parameters,
/// answered with a JSON array of records (or a single record for NDC lookups).
pub struct RelaySources {
    client: Client,
    base_url: String,
}

impl RelaySources {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("medical-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, operation: &str) -> String {
        format!("{}/{}", self.base_url, operation)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, SourceError> {
        let url = self.url(operation);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::Request(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            tracing::warn!(url = %url, status = response.status().as_u16(), "upstream error status");
            return Err(SourceError::Status(response.status().as_u16()));
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| SourceError::Decode(e.to_string()))
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, SourceError> {
        Ok(self.get_json::<Vec<T>>(operation, query).await?.unwrap_or_default())
    }
}

#[async_trait]
impl MedicalSources for RelaySources {
    async fn search_drugs(&self, query: &str, limit: usize) -> Result<Vec<DrugLabel>, SourceError> {
        self.get_list("drugs/search", &[("query", query.to_string()), ("limit", limit.to_string())])
            .await
    }

    async fn drug_by_ndc(&self, ndc: &str) -> Result<Option<DrugLabel>, SourceError> {
        self.get_json("drugs/ndc", &[("ndc", ndc.to_string())]).await
    }

    async fn health_indicators(
        &self,
        indicator: &str,
        country: Option<&str>,
    ) -> Result<Vec<HealthIndicator>, SourceError> {
        let mut query = vec![("indicator", indicator.to_string())];
        if let Some(country) = country {
            query.push(("country", country.to_string()));
        }
        self.get_list("health/indicators", &query).await
    }

    async fn search_pubmed(&self, query: &str, max_results: usize) -> Result<Vec<PubMedArticle>, SourceError> {
        self.get_list(
            "literature/search",
            &[("query", query.to_string()), ("max_results", max_results.to_string())],
        )
        .await
    }

    async fn search_rxnorm(&self, query: &str) -> Result<Vec<RxNormConcept>, SourceError> {
        self.get_list("drugs/nomenclature", &[("query", query.to_string())]).await
    }

    async fn search_scholar(&self, query: &str) -> Result<Vec<ScholarRecord>, SourceError> {
        self.get_list("scholar/search", &[("query", query.to_string())]).await
    }
}
