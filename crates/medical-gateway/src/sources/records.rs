//! Records as the upstream sources return them.
//!
//! Every field is optional or defaulted: upstream payloads are sparse and
//! the reshaping layer supplies the placeholders.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Drug label from the FDA registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrugLabel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openfda: Option<OpenFda>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drug_interactions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indications_and_usage: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage_and_administration: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contraindications: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adverse_reactions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_pharmacology: Option<Vec<String>>,
    /// Remaining label sections, carried through untouched.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenFda {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub brand_name: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_name: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manufacturer_name: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dosage_form: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub product_ndc: Vec<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// One observation from the WHO Global Health Observatory.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthIndicator {
    #[serde(default)]
    pub spatial_dim: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub numeric_value: Option<f64>,
    /// Usually a year number, occasionally a string.
    #[serde(default)]
    pub time_dim: Option<Value>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub low: Option<Value>,
    #[serde(default)]
    pub high: Option<Value>,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Authors {
    List(Vec<String>),
    Single(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PubMedArticle {
    #[serde(default)]
    pub pmid: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub journal: String,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub authors: Option<Authors>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RxNormConcept {
    #[serde(default)]
    pub rxcui: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tty: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub synonym: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScholarRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Option<String>,
    #[serde(default)]
    pub journal: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub citations: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
}
