//! Tool arguments as callers send them in JSON bodies.
//!
//! Everything is optional at this level; required fields are checked by the
//! tool itself so that both the dedicated routes and the generic tool
//! endpoint report a missing field the same way.

use serde::Deserialize;

pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrugSearchArgs {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrugDetailsArgs {
    #[serde(default)]
    pub ndc: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatisticsArgs {
    #[serde(default)]
    pub indicator: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiteratureArgs {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryArgs {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountryArgs {
    #[serde(default)]
    pub country: Option<String>,
}
