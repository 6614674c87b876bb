use crate::config::Config;
use crate::error::GatewayError;
use crate::middleware::{rate_limit, with_security_headers, RateLimiter};
use crate::tools::output::{DrugDetails, DrugSearch, HealthStatistics, LiteratureSearch, NomenclatureSearch, ScholarSearch};
use crate::tools::{parse_args, args::CountryArgs, MedicalTools, ToolError};
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub const SERVICE_NAME: &str = "Medical MCP Web API";

/// Successful API response: `{success: true, data, timestamp}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: String,
}

type ApiResult<T> = Result<Json<Envelope<T>>, GatewayError>;

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data,
        timestamp: timestamp(),
    })
}

/// A JSON request body. An empty body means no arguments.
fn body_json(body: &Bytes) -> Result<Value, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| GatewayError::BadRequest(e.to_string()))
}

fn body_args<T: DeserializeOwned + Default>(body: &Bytes, failure: &str) -> Result<T, GatewayError> {
    parse_args(body_json(body)?).map_err(|e| GatewayError::from_tool(failure, e))
}

fn failed(failure: &'static str) -> impl FnOnce(ToolError) -> GatewayError {
    move |e| GatewayError::from_tool(failure, e)
}

async fn health(State(tools): State<MedicalTools>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": timestamp(),
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "availableTools": tools.available_tools(),
    }))
}

async fn list_tools(State(tools): State<MedicalTools>) -> Json<Envelope<Value>> {
    let names = tools.available_tools();
    let count = names.len();
    ok(json!({
        "tools": names,
        "description": "Available Medical MCP tools",
        "totalCount": count,
    }))
}

async fn search_drugs(State(tools): State<MedicalTools>, body: Bytes) -> ApiResult<DrugSearch> {
    const FAILURE: &str = "Failed to search for drugs";
    let args = body_args(&body, FAILURE)?;
    tools.search_drugs(args).await.map(ok).map_err(failed(FAILURE))
}

async fn drug_details(State(tools): State<MedicalTools>, body: Bytes) -> ApiResult<DrugDetails> {
    const FAILURE: &str = "Failed to get drug details";
    let args = body_args(&body, FAILURE)?;
    tools.drug_details(args).await.map(ok).map_err(failed(FAILURE))
}

async fn health_statistics(State(tools): State<MedicalTools>, body: Bytes) -> ApiResult<HealthStatistics> {
    const FAILURE: &str = "Failed to get health statistics";
    let args = body_args(&body, FAILURE)?;
    tools.health_statistics(args).await.map(ok).map_err(failed(FAILURE))
}

async fn search_literature(State(tools): State<MedicalTools>, body: Bytes) -> ApiResult<LiteratureSearch> {
    const FAILURE: &str = "Failed to search medical literature";
    let args = body_args(&body, FAILURE)?;
    tools.search_literature(args).await.map(ok).map_err(failed(FAILURE))
}

async fn search_nomenclature(State(tools): State<MedicalTools>, body: Bytes) -> ApiResult<NomenclatureSearch> {
    const FAILURE: &str = "Failed to search drug nomenclature";
    let args = body_args(&body, FAILURE)?;
    tools.search_nomenclature(args).await.map(ok).map_err(failed(FAILURE))
}

async fn search_scholar(State(tools): State<MedicalTools>, body: Bytes) -> ApiResult<ScholarSearch> {
    const FAILURE: &str = "Failed to search Google Scholar";
    let args = body_args(&body, FAILURE)?;
    tools.search_scholar(args).await.map(ok).map_err(failed(FAILURE))
}

async fn breast_cancer_drugs(State(tools): State<MedicalTools>) -> Json<Envelope<Vec<DrugSearch>>> {
    ok(tools.breast_cancer_drugs().await)
}

async fn breast_cancer_statistics(State(tools): State<MedicalTools>, body: Bytes) -> ApiResult<Vec<HealthStatistics>> {
    let args: CountryArgs = body_args(&body, "Failed to get breast cancer statistics")?;
    let country = args.country.filter(|c| !c.is_empty()).unwrap_or_else(|| "USA".to_string());
    Ok(ok(tools.breast_cancer_statistics(&country).await))
}

async fn breast_cancer_research(State(tools): State<MedicalTools>) -> Json<Envelope<Vec<LiteratureSearch>>> {
    ok(tools.breast_cancer_research().await)
}

async fn call_tool(State(tools): State<MedicalTools>, Path(name): Path<String>, body: Bytes) -> ApiResult<Value> {
    let failure = format!("Failed to execute tool: {name}");
    tools
        .call_tool(&name, body_json(&body)?)
        .await
        .map(ok)
        .map_err(|e| GatewayError::from_tool(failure, e))
}

/// The API routes plus the static single-page frontend for everything else.
pub fn router(tools: MedicalTools, static_dir: &std::path::Path) -> Router {
    let frontend = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/health", get(health))
        .route("/api/tools", get(list_tools))
        .route("/api/tools/{name}", post(call_tool))
        .route("/api/drugs/search", post(search_drugs))
        .route("/api/drugs/details", post(drug_details))
        .route("/api/drugs/nomenclature", post(search_nomenclature))
        .route("/api/health/statistics", post(health_statistics))
        .route("/api/literature/search", post(search_literature))
        .route("/api/scholar/search", post(search_scholar))
        .route("/api/breast-cancer/drugs", post(breast_cancer_drugs))
        .route("/api/breast-cancer/statistics", post(breast_cancer_statistics))
        .route("/api/breast-cancer/research", post(breast_cancer_research))
        .fallback_service(frontend)
        .with_state(tools)
}

/// [`router`] wrapped in the middleware stack the server runs with.
pub fn app(tools: MedicalTools, config: &Config) -> Router {
    let mut app = router(tools, &config.server.static_dir);

    if config.rate_limit.enabled {
        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
        app = app.layer(axum::middleware::from_fn_with_state(limiter, rate_limit));
    }

    with_security_headers(app)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(config.server.body_limit_bytes))
        .layer(TraceLayer::new_for_http())
}
