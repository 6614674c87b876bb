//! Display shapes returned to API callers.
//!
//! Upstream records are sparse. Conversion fills placeholders, truncates
//! long label sections and attaches the source each record came from.

use crate::sources::{Authors, DrugLabel, HealthIndicator, PubMedArticle, RxNormConcept, ScholarRecord};
use serde::Serialize;
use serde_json::Value;

const NOT_SPECIFIED: &str = "Not specified";
const PURPOSE_LIMIT: usize = 200;
const SECTION_LIMIT: usize = 300;

pub const WHO_SOURCE: &str = "WHO Global Health Observatory";
pub const PUBMED_SOURCE: &str = "PubMed";
pub const RXNORM_SOURCE: &str = "RxNorm";
pub const SCHOLAR_SOURCE: &str = "Google Scholar";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugSearch {
    pub query: String,
    pub total: usize,
    pub drugs: Vec<DrugSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugSummary {
    pub brand_name: String,
    pub generic_name: String,
    pub manufacturer: String,
    pub route: String,
    pub dosage_form: String,
    pub ndc: Option<String>,
    pub purpose: String,
    pub last_updated: String,
    /// The label as received, for the detail view.
    pub original_data: DrugLabel,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugDetails {
    pub ndc: String,
    pub brand_name: String,
    pub generic_name: String,
    pub manufacturer: String,
    pub route: String,
    pub dosage_form: String,
    pub last_updated: String,
    pub purpose: Vec<String>,
    pub warnings: Vec<String>,
    pub drug_interactions: Vec<String>,
    pub indications_and_usage: Vec<String>,
    pub dosage_and_administration: Vec<String>,
    pub contraindications: Vec<String>,
    pub adverse_reactions: Vec<String>,
    pub clinical_pharmacology: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatistics {
    pub indicator: String,
    pub country: String,
    pub total: usize,
    pub statistics: Vec<HealthStatistic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatistic {
    pub country: String,
    pub indicator: String,
    pub value: String,
    pub numeric_value: Option<f64>,
    /// Year as the observatory reports it (number or string), or `"Unknown"`.
    pub year: Value,
    pub date: Option<String>,
    pub comments: String,
    pub low: Option<Value>,
    pub high: Option<Value>,
    pub unit: String,
    pub source: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiteratureSearch {
    pub query: String,
    pub total: usize,
    pub articles: Vec<Article>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub pmid: Option<String>,
    pub title: String,
    pub journal: String,
    pub publication_date: Option<String>,
    pub publication_year: String,
    pub doi: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: String,
    pub url: Option<String>,
    pub source: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NomenclatureSearch {
    pub query: String,
    pub total: usize,
    pub drugs: Vec<NomenclatureEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NomenclatureEntry {
    pub rxcui: String,
    pub name: String,
    pub tty: String,
    pub language: Option<String>,
    pub synonym: String,
    pub synonyms: Vec<String>,
    pub source: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScholarSearch {
    pub query: String,
    pub total: usize,
    pub articles: Vec<ScholarArticle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScholarArticle {
    pub title: String,
    pub authors: String,
    pub journal: String,
    pub year: String,
    pub citations: String,
    pub cited_by: u64,
    pub url: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub snippet: String,
    pub source: &'static str,
}

/// First element of an optional list, with empty strings counted as absent.
fn first(values: Option<&Vec<String>>) -> Option<&str> {
    values.and_then(|v| v.first()).map(String::as_str).filter(|s| !s.is_empty())
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn or(value: Option<&str>, fallback: &str) -> String {
    present(value).unwrap_or(fallback).to_string()
}

/// Cut to `limit` characters, marking the cut with `...`.
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((at, _)) => format!("{}...", &text[..at]),
        None => text.to_string(),
    }
}

/// The first run of four digits, e.g. `2024` out of `2024-03-05` or `Mar 2024`.
pub fn year_of(date: &str) -> Option<&str> {
    let bytes = date.as_bytes();
    (0..bytes.len().saturating_sub(3))
        .find(|&i| bytes[i..i + 4].iter().all(u8::is_ascii_digit))
        .map(|i| &date[i..i + 4])
}

/// Leading integer of a citation string: `"152 citations"` is 152, anything
/// that does not start with a number is 0.
pub fn cited_by(citations: &str) -> u64 {
    let trimmed = citations.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().unwrap_or(0)
}

impl From<DrugLabel> for DrugSummary {
    fn from(label: DrugLabel) -> Self {
        let fda = label.openfda.as_ref();
        let purpose = match first(label.purpose.as_ref()) {
            Some(text) => truncate(text, PURPOSE_LIMIT),
            None => NOT_SPECIFIED.to_string(),
        };

        DrugSummary {
            brand_name: first(fda.map(|f| &f.brand_name)).unwrap_or("Unknown Brand").to_string(),
            generic_name: or(first(fda.map(|f| &f.generic_name)), NOT_SPECIFIED),
            manufacturer: or(first(fda.map(|f| &f.manufacturer_name)), NOT_SPECIFIED),
            route: or(first(fda.map(|f| &f.route)), NOT_SPECIFIED),
            dosage_form: or(first(fda.map(|f| &f.dosage_form)), NOT_SPECIFIED),
            ndc: first(fda.map(|f| &f.product_ndc)).map(str::to_string),
            purpose,
            last_updated: or(label.effective_time.as_deref(), "Unknown"),
            original_data: label,
        }
    }
}

impl DrugDetails {
    pub fn new(ndc: &str, label: DrugLabel) -> Self {
        let fda = label.openfda.as_ref();
        let sections = |s: &Option<Vec<String>>| -> Vec<String> {
            s.iter().flatten().map(|t| truncate(t, SECTION_LIMIT)).collect()
        };

        DrugDetails {
            ndc: ndc.to_string(),
            brand_name: or(first(fda.map(|f| &f.brand_name)), NOT_SPECIFIED),
            generic_name: or(first(fda.map(|f| &f.generic_name)), NOT_SPECIFIED),
            manufacturer: or(first(fda.map(|f| &f.manufacturer_name)), NOT_SPECIFIED),
            route: or(first(fda.map(|f| &f.route)), NOT_SPECIFIED),
            dosage_form: or(first(fda.map(|f| &f.dosage_form)), NOT_SPECIFIED),
            last_updated: or(label.effective_time.as_deref(), "Unknown"),
            warnings: sections(&label.warnings),
            drug_interactions: sections(&label.drug_interactions),
            purpose: label.purpose.unwrap_or_default(),
            indications_and_usage: label.indications_and_usage.unwrap_or_default(),
            dosage_and_administration: label.dosage_and_administration.unwrap_or_default(),
            contraindications: label.contraindications.unwrap_or_default(),
            adverse_reactions: label.adverse_reactions.unwrap_or_default(),
            clinical_pharmacology: label.clinical_pharmacology.unwrap_or_default(),
        }
    }
}

impl HealthStatistic {
    pub fn new(indicator: &str, observation: HealthIndicator) -> Self {
        let year = match observation.time_dim {
            Some(Value::Null) | None => Value::from("Unknown"),
            Some(Value::String(s)) if s.is_empty() => Value::from("Unknown"),
            Some(year) => year,
        };

        HealthStatistic {
            country: or(observation.spatial_dim.as_deref(), "Unknown"),
            indicator: indicator.to_string(),
            value: or(observation.value.as_deref(), "N/A"),
            numeric_value: observation.numeric_value,
            year,
            date: observation.date.filter(|d| !d.is_empty()),
            comments: observation.comments.unwrap_or_default(),
            low: observation.low.filter(|v| !v.is_null()),
            high: observation.high.filter(|v| !v.is_null()),
            unit: observation.unit.unwrap_or_default(),
            source: WHO_SOURCE,
        }
    }
}

impl From<PubMedArticle> for Article {
    fn from(article: PubMedArticle) -> Self {
        let publication_year = article
            .publication_date
            .as_deref()
            .and_then(year_of)
            .unwrap_or("Unknown")
            .to_string();
        let authors = match article.authors {
            Some(Authors::List(names)) => names.join(", "),
            Some(Authors::Single(name)) if !name.is_empty() => name,
            _ => "Authors not available".to_string(),
        };
        let pmid = article.pmid.filter(|p| !p.is_empty());

        Article {
            url: pmid.as_ref().map(|p| format!("https://pubmed.ncbi.nlm.nih.gov/{p}/")),
            pmid,
            title: article.title,
            journal: article.journal,
            publication_date: article.publication_date,
            publication_year,
            doi: article.doi.filter(|d| !d.is_empty()),
            abstract_text: or(article.abstract_text.as_deref(), "Abstract not available"),
            authors,
            source: PUBMED_SOURCE,
        }
    }
}

impl From<RxNormConcept> for NomenclatureEntry {
    fn from(concept: RxNormConcept) -> Self {
        let synonym = or(first(concept.synonym.as_ref()), &concept.name);

        NomenclatureEntry {
            synonym,
            synonyms: concept.synonym.unwrap_or_default(),
            rxcui: concept.rxcui,
            name: concept.name,
            tty: concept.tty,
            language: concept.language,
            source: RXNORM_SOURCE,
        }
    }
}

impl From<ScholarRecord> for ScholarArticle {
    fn from(record: ScholarRecord) -> Self {
        let citations = or(record.citations.as_deref(), "0");
        let summary = present(record.abstract_text.as_deref());

        ScholarArticle {
            cited_by: cited_by(&citations),
            citations,
            snippet: summary
                .map(|a| truncate(a, SECTION_LIMIT))
                .unwrap_or_else(|| "No snippet available".to_string()),
            abstract_text: summary.unwrap_or("Abstract not available").to_string(),
            title: record.title,
            authors: or(record.authors.as_deref(), "Authors not available"),
            journal: or(record.journal.as_deref(), "Journal not available"),
            year: or(record.year.as_deref(), "Year not available"),
            url: record.url.filter(|u| !u.is_empty()),
            source: SCHOLAR_SOURCE,
        }
    }
}
