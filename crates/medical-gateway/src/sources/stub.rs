//! Canned sources for handler and tool tests.

use super::*;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashSet;

/// Returns fixed records for known queries and empty lists otherwise.
/// Queries listed in `failing` error out; every call is recorded.
#[derive(Default)]
pub struct StubSources {
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl StubSources {
    pub fn fail_on(&self, query: &str) {
        self.failing.lock().insert(query.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String, query: &str) -> Result<(), SourceError> {
        self.calls.lock().push(call);
        if self.failing.lock().contains(query) {
            return Err(SourceError::Status(503));
        }
        Ok(())
    }
}

pub fn ibuprofen_label() -> DrugLabel {
    serde_json::from_value(json!({
        "openfda": {
            "brand_name": ["Advil"],
            "generic_name": ["IBUPROFEN"],
            "manufacturer_name": ["Pfizer"],
            "route": ["ORAL"],
            "dosage_form": ["TABLET"],
            "product_ndc": ["0573-0164"]
        },
        "purpose": ["Pain reliever/fever reducer"],
        "effective_time": "20240115",
        "warnings": ["Allergy alert: ".to_string() + &"x".repeat(400)],
        "drug_interactions": ["Ask a doctor before use if you take aspirin"]
    }))
    .expect("valid label fixture")
}

#[async_trait]
impl MedicalSources for StubSources {
    async fn search_drugs(&self, query: &str, limit: usize) -> Result<Vec<DrugLabel>, SourceError> {
        self.record(format!("search_drugs:{query}:{limit}"), query)?;
        Ok(match query {
            "ibuprofen" => vec![ibuprofen_label(), DrugLabel::default()],
            "empty" => Vec::new(),
            _ => vec![DrugLabel::default()],
        })
    }

    async fn drug_by_ndc(&self, ndc: &str) -> Result<Option<DrugLabel>, SourceError> {
        self.record(format!("drug_by_ndc:{ndc}"), ndc)?;
        Ok((ndc == "0573-0164").then(ibuprofen_label))
    }

    async fn health_indicators(
        &self,
        indicator: &str,
        country: Option<&str>,
    ) -> Result<Vec<HealthIndicator>, SourceError> {
        self.record(
            format!("health_indicators:{indicator}:{}", country.unwrap_or("-")),
            indicator,
        )?;
        if indicator == "empty" {
            return Ok(Vec::new());
        }
        Ok((2015..2025)
            .map(|year| HealthIndicator {
                spatial_dim: country.map(str::to_string),
                value: Some(format!("{}.0", year - 2000)),
                numeric_value: Some((year - 2000) as f64),
                time_dim: Some(json!(year)),
                ..Default::default()
            })
            .collect())
    }

    async fn search_pubmed(&self, query: &str, max_results: usize) -> Result<Vec<PubMedArticle>, SourceError> {
        self.record(format!("search_pubmed:{query}:{max_results}"), query)?;
        if query == "empty" {
            return Ok(Vec::new());
        }
        Ok(vec![
            PubMedArticle {
                pmid: Some("38000001".into()),
                title: "Immunotherapy outcomes".into(),
                journal: "Lancet".into(),
                publication_date: Some("2024-03-05".into()),
                doi: Some("10.1000/xyz".into()),
                abstract_text: Some("Background".into()),
                authors: Some(Authors::List(vec!["Smith J".into(), "Doe A".into()])),
            },
            PubMedArticle {
                title: "Untitled".into(),
                ..Default::default()
            },
        ])
    }

    async fn search_rxnorm(&self, query: &str) -> Result<Vec<RxNormConcept>, SourceError> {
        self.record(format!("search_rxnorm:{query}"), query)?;
        if query == "empty" {
            return Ok(Vec::new());
        }
        Ok(vec![RxNormConcept {
            rxcui: "1191".into(),
            name: "aspirin".into(),
            tty: "IN".into(),
            language: Some("ENG".into()),
            synonym: None,
        }])
    }

    async fn search_scholar(&self, query: &str) -> Result<Vec<ScholarRecord>, SourceError> {
        self.record(format!("search_scholar:{query}"), query)?;
        if query == "empty" {
            return Ok(Vec::new());
        }
        Ok(vec![ScholarRecord {
            title: "CRISPR screens".into(),
            citations: Some("152 citations".into()),
            abstract_text: Some("a".repeat(350)),
            ..Default::default()
        }])
    }
}
