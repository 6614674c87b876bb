//! The six medical tools, shaped for the web API.
//!
//! Each tool validates its arguments, calls one [`MedicalSources`]
//! operation and reshapes the records into the display types in
//! [`output`]. Upstream failures are wrapped with a tool-specific prefix.

pub mod args;
pub mod output;

use crate::sources::{MedicalSources, SourceError};
use args::*;
use futures_util::future::join_all;
use output::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub const TOOL_NAMES: [&str; 6] = [
    "search-drugs",
    "get-drug-details",
    "get-health-statistics",
    "search-medical-literature",
    "search-drug-nomenclature",
    "search-google-scholar",
];

pub const BREAST_CANCER_DRUGS: [&str; 9] = [
    "tamoxifen",
    "herceptin",
    "anastrozole",
    "letrozole",
    "fulvestrant",
    "pertuzumab",
    "ribociclib",
    "doxorubicin",
    "cyclophosphamide",
];

pub const BREAST_CANCER_INDICATORS: [&str; 4] = [
    "breast cancer incidence",
    "breast cancer mortality",
    "breast cancer survival rate",
    "breast cancer screening coverage",
];

pub const BREAST_CANCER_TOPICS: [&str; 4] = [
    "breast cancer immunotherapy 2024",
    "triple negative breast cancer treatment",
    "breast cancer biomarkers prognosis",
    "BRCA1 BRCA2 breast cancer hereditary",
];

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{0} parameter is required")]
    MissingField(&'static str),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{operation}: {source}")]
    Upstream {
        operation: &'static str,
        source: SourceError,
    },

    #[error("Google Scholar search failed: {0}. This might be due to rate limiting.")]
    Scholar(SourceError),

    #[error("Failed to get drug details: No drug found with NDC: {0}")]
    DrugNotFound(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("failed to encode result: {0}")]
    Encode(String),
}

fn upstream(operation: &'static str) -> impl FnOnce(SourceError) -> ToolError {
    move |source| {
        tracing::error!(operation, error = %source, "upstream call failed");
        ToolError::Upstream { operation, source }
    }
}

/// A required text field; absent and empty are both missing.
fn required<'a>(value: &'a Option<String>, label: &'static str) -> Result<&'a str, ToolError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(ToolError::MissingField(label))
}

/// Parse tool arguments, treating an absent body as all defaults.
pub fn parse_args<T: DeserializeOwned + Default>(args: Value) -> Result<T, ToolError> {
    if args.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

fn to_json<T: Serialize>(value: T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::Encode(e.to_string()))
}

#[derive(Clone)]
pub struct MedicalTools {
    sources: Arc<dyn MedicalSources>,
}

impl MedicalTools {
    pub fn new(sources: Arc<dyn MedicalSources>) -> Self {
        Self { sources }
    }

    pub fn available_tools(&self) -> Vec<&'static str> {
        TOOL_NAMES.to_vec()
    }

    pub async fn search_drugs(&self, args: DrugSearchArgs) -> Result<DrugSearch, ToolError> {
        let query = required(&args.query, "Query")?;
        let limit = args.limit.unwrap_or(DEFAULT_LIMIT);

        let labels = self
            .sources
            .search_drugs(query, limit)
            .await
            .map_err(upstream("Drug search failed"))?;

        Ok(DrugSearch {
            query: query.to_string(),
            total: labels.len(),
            message: labels
                .is_empty()
                .then(|| format!("No drugs found matching \"{query}\"")),
            drugs: labels.into_iter().map(DrugSummary::from).collect(),
        })
    }

    pub async fn drug_details(&self, args: DrugDetailsArgs) -> Result<DrugDetails, ToolError> {
        let ndc = required(&args.ndc, "NDC")?;

        let label = self
            .sources
            .drug_by_ndc(ndc)
            .await
            .map_err(upstream("Failed to get drug details"))?
            .ok_or_else(|| ToolError::DrugNotFound(ndc.to_string()))?;

        Ok(DrugDetails::new(ndc, label))
    }

    pub async fn health_statistics(&self, args: StatisticsArgs) -> Result<HealthStatistics, ToolError> {
        let indicator = required(&args.indicator, "Indicator")?;
        let country = args.country.as_deref().filter(|c| !c.is_empty());
        let limit = args.limit.unwrap_or(DEFAULT_LIMIT);

        let observations = self
            .sources
            .health_indicators(indicator, country)
            .await
            .map_err(upstream("Health statistics search failed"))?;

        let message = observations.is_empty().then(|| match country {
            Some(c) => format!("No health indicators found for \"{indicator}\" in {c}"),
            None => format!("No health indicators found for \"{indicator}\""),
        });

        Ok(HealthStatistics {
            indicator: indicator.to_string(),
            country: country.unwrap_or("Global").to_string(),
            total: observations.len(),
            statistics: observations
                .into_iter()
                .take(limit)
                .map(|o| HealthStatistic::new(indicator, o))
                .collect(),
            message,
        })
    }

    pub async fn search_literature(&self, args: LiteratureArgs) -> Result<LiteratureSearch, ToolError> {
        let query = required(&args.query, "Query")?;
        let max_results = args.max_results.unwrap_or(DEFAULT_LIMIT);

        let articles = self
            .sources
            .search_pubmed(query, max_results)
            .await
            .map_err(upstream("Medical literature search failed"))?;

        Ok(LiteratureSearch {
            query: query.to_string(),
            total: articles.len(),
            message: articles
                .is_empty()
                .then(|| format!("No medical articles found for \"{query}\"")),
            articles: articles.into_iter().map(Article::from).collect(),
        })
    }

    pub async fn search_nomenclature(&self, args: QueryArgs) -> Result<NomenclatureSearch, ToolError> {
        let query = required(&args.query, "Query")?;

        let concepts = self
            .sources
            .search_rxnorm(query)
            .await
            .map_err(upstream("Drug nomenclature search failed"))?;

        Ok(NomenclatureSearch {
            query: query.to_string(),
            total: concepts.len(),
            message: concepts
                .is_empty()
                .then(|| format!("No drugs found in RxNorm database for \"{query}\"")),
            drugs: concepts.into_iter().map(NomenclatureEntry::from).collect(),
        })
    }

    pub async fn search_scholar(&self, args: QueryArgs) -> Result<ScholarSearch, ToolError> {
        let query = required(&args.query, "Query")?;

        let records = self.sources.search_scholar(query).await.map_err(|e| {
            tracing::error!(error = %e, "scholar search failed");
            ToolError::Scholar(e)
        })?;

        Ok(ScholarSearch {
            query: query.to_string(),
            total: records.len(),
            message: records.is_empty().then(|| {
                format!(
                    "No academic articles found for \"{query}\". \
                     This could be due to rate limiting or network issues."
                )
            }),
            articles: records.into_iter().map(ScholarArticle::from).collect(),
        })
    }

    /// Dispatch by tool name with JSON arguments.
    pub async fn call_tool(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "search-drugs" => to_json(self.search_drugs(parse_args(args)?).await?),
            "get-drug-details" => to_json(self.drug_details(parse_args(args)?).await?),
            "get-health-statistics" => to_json(self.health_statistics(parse_args(args)?).await?),
            "search-medical-literature" => to_json(self.search_literature(parse_args(args)?).await?),
            "search-drug-nomenclature" => to_json(self.search_nomenclature(parse_args(args)?).await?),
            "search-google-scholar" => to_json(self.search_scholar(parse_args(args)?).await?),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// Label searches for the common breast cancer therapies, three labels
    /// each. Failed searches are dropped from the result.
    pub async fn breast_cancer_drugs(&self) -> Vec<DrugSearch> {
        let searches = BREAST_CANCER_DRUGS.iter().map(|drug| {
            self.search_drugs(DrugSearchArgs {
                query: Some(drug.to_string()),
                limit: Some(3),
            })
        });
        successes(join_all(searches).await)
    }

    pub async fn breast_cancer_statistics(&self, country: &str) -> Vec<HealthStatistics> {
        let lookups = BREAST_CANCER_INDICATORS.iter().map(|indicator| {
            self.health_statistics(StatisticsArgs {
                indicator: Some(indicator.to_string()),
                country: Some(country.to_string()),
                limit: Some(5),
            })
        });
        successes(join_all(lookups).await)
    }

    pub async fn breast_cancer_research(&self) -> Vec<LiteratureSearch> {
        let searches = BREAST_CANCER_TOPICS.iter().map(|topic| {
            self.search_literature(LiteratureArgs {
                query: Some(topic.to_string()),
                max_results: Some(5),
            })
        });
        successes(join_all(searches).await)
    }
}

fn successes<T>(results: Vec<Result<T, ToolError>>) -> Vec<T> {
    let total = results.len();
    let kept: Vec<T> = results.into_iter().filter_map(Result::ok).collect();
    if kept.len() < total {
        tracing::warn!(failed = total - kept.len(), total, "fan-out partially failed");
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::stub::StubSources;
    use serde_json::json;

    fn tools() -> (MedicalTools, Arc<StubSources>) {
        let stub = Arc::new(StubSources::default());
        (MedicalTools::new(stub.clone()), stub)
    }

    fn query(q: &str) -> QueryArgs {
        QueryArgs {
            query: Some(q.to_string()),
        }
    }

    #[tokio::test]
    async fn missing_query_fails_before_upstream() {
        let (tools, stub) = tools();

        let err = tools.search_drugs(DrugSearchArgs::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Query parameter is required");

        let err = tools
            .drug_details(DrugDetailsArgs { ndc: Some(String::new()) })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "NDC parameter is required");

        let err = tools.health_statistics(StatisticsArgs::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Indicator parameter is required");

        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn search_drugs_uses_default_limit() {
        let (tools, stub) = tools();
        let result = tools
            .search_drugs(DrugSearchArgs {
                query: Some("ibuprofen".into()),
                limit: None,
            })
            .await
            .unwrap();

        assert_eq!(stub.calls(), vec!["search_drugs:ibuprofen:10"]);
        assert_eq!(result.total, 2);
        assert_eq!(result.drugs[0].brand_name, "Advil");
        assert_eq!(result.drugs[1].brand_name, "Unknown Brand");
        assert!(result.message.is_none());
    }

    #[tokio::test]
    async fn empty_results_carry_a_message() {
        let (tools, _) = tools();

        let drugs = tools
            .search_drugs(DrugSearchArgs {
                query: Some("empty".into()),
                limit: Some(1),
            })
            .await
            .unwrap();
        assert_eq!(drugs.total, 0);
        assert_eq!(drugs.message.as_deref(), Some("No drugs found matching \"empty\""));

        let stats = tools
            .health_statistics(StatisticsArgs {
                indicator: Some("empty".into()),
                country: Some("FRA".into()),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(
            stats.message.as_deref(),
            Some("No health indicators found for \"empty\" in FRA")
        );

        let scholar = tools.search_scholar(query("empty")).await.unwrap();
        assert!(scholar.message.unwrap().ends_with("rate limiting or network issues."));
    }

    #[tokio::test]
    async fn statistics_are_limited_but_total_is_not() {
        let (tools, stub) = tools();
        let stats = tools
            .health_statistics(StatisticsArgs {
                indicator: Some("life expectancy".into()),
                country: None,
                limit: Some(3),
            })
            .await
            .unwrap();

        assert_eq!(stats.country, "Global");
        assert_eq!(stats.total, 10);
        assert_eq!(stats.statistics.len(), 3);
        assert_eq!(stub.calls(), vec!["health_indicators:life expectancy:-"]);
    }

    #[tokio::test]
    async fn unknown_ndc_is_not_found() {
        let (tools, _) = tools();
        let err = tools
            .drug_details(DrugDetailsArgs {
                ndc: Some("0000-0000".into()),
            })
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to get drug details: No drug found with NDC: 0000-0000"
        );

        let details = tools
            .drug_details(DrugDetailsArgs {
                ndc: Some("0573-0164".into()),
            })
            .await
            .unwrap();
        assert_eq!(details.generic_name, "IBUPROFEN");
    }

    #[tokio::test]
    async fn upstream_failures_are_prefixed() {
        let (tools, stub) = tools();
        stub.fail_on("aspirin");

        let err = tools.search_nomenclature(query("aspirin")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Drug nomenclature search failed: upstream returned HTTP 503"
        );

        let err = tools.search_scholar(query("aspirin")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Google Scholar search failed: upstream returned HTTP 503. This might be due to rate limiting."
        );
    }

    #[tokio::test]
    async fn call_tool_dispatches_by_name() {
        let (tools, stub) = tools();

        let result = tools
            .call_tool("search-medical-literature", json!({"query": "crispr", "max_results": 2}))
            .await
            .unwrap();
        assert_eq!(result["articles"][0]["url"], "https://pubmed.ncbi.nlm.nih.gov/38000001/");
        assert_eq!(result["articles"][0]["authors"], "Smith J, Doe A");
        assert_eq!(stub.calls(), vec!["search_pubmed:crispr:2"]);

        let result = tools
            .call_tool("search-drug-nomenclature", json!({"query": "aspirin"}))
            .await
            .unwrap();
        assert_eq!(result["drugs"][0]["source"], "RxNorm");

        let err = tools.call_tool("summon-doctor", json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: summon-doctor");

        let err = tools.call_tool("search-drugs", Value::Null).await.unwrap_err();
        assert!(matches!(err, ToolError::MissingField("Query")));

        let err = tools
            .call_tool("search-drugs", json!({"query": 5}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn fan_outs_keep_only_successes() {
        let (tools, stub) = tools();
        stub.fail_on("herceptin");
        stub.fail_on("breast cancer mortality");

        let drugs = tools.breast_cancer_drugs().await;
        assert_eq!(drugs.len(), 8);
        assert!(drugs.iter().all(|d| d.query != "herceptin"));

        let stats = tools.breast_cancer_statistics("USA").await;
        assert_eq!(stats.len(), 3);
        assert!(stats.iter().all(|s| s.statistics.len() == 5 && s.country == "USA"));

        let research = tools.breast_cancer_research().await;
        assert_eq!(research.len(), 4);
        assert!(stub.calls().contains(&"search_pubmed:BRCA1 BRCA2 breast cancer hereditary:5".to_string()));
    }
}
