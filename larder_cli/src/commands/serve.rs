//! HTTP surface over the aggregator.
//!
//! - `GET /foods/search?query=<text>` answers a JSON array of records
//! - `GET /foods/barcode/:code` answers one record, or 404
//!
//! Malformed input is a 400 with `{"error", "code"}`. Provider trouble never
//! changes the status; it only shrinks the result.

use crate::cli::Cli;
use crate::commands::{load_config, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use larder_core::error::SearchError;
use larder_core::{FoodAggregator, FoodRecord};
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

/// Request failures mapped onto status codes.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(SearchError),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(e) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: e.to_string(),
                    code: e.code_str(),
                },
            ),
            ApiError::NotFound(barcode) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: format!("No product found for barcode {}", barcode),
                    code: "not_found",
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        ApiError::BadRequest(e)
    }
}

pub fn router(aggregator: Arc<FoodAggregator>) -> Router {
    Router::new()
        .route("/foods/search", get(search_handler))
        .route("/foods/barcode/:code", get(barcode_handler))
        .with_state(aggregator)
}

async fn search_handler(
    State(aggregator): State<Arc<FoodAggregator>>,
    Query(params): Query<SearchParams>,
) -> std::result::Result<Json<Vec<FoodRecord>>, ApiError> {
    let query = params.query.unwrap_or_default();
    let records = aggregator.search_by_name(&query).await?;
    Ok(Json(records))
}

async fn barcode_handler(
    State(aggregator): State<Arc<FoodAggregator>>,
    Path(code): Path<String>,
) -> std::result::Result<Json<FoodRecord>, ApiError> {
    match aggregator.search_by_barcode(&code).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::NotFound(code.trim().to_string())),
    }
}

pub async fn run(cli: &Cli, bind: &str) -> Result<()> {
    let config = load_config(cli)?;
    let aggregator = Arc::new(FoodAggregator::from_config(&config));
    let sources: Vec<&str> = aggregator
        .providers()
        .iter()
        .map(|p| p.source.as_str())
        .collect();

    let listener = tokio::net::TcpListener::bind(bind).await?;
    let addr = listener.local_addr()?;
    info!(%addr, providers = ?sources, "serving food search");
    eprintln!(
        "{} listening on {} ({})",
        "larder".bold().cyan(),
        format!("http://{}", addr).blue(),
        sources.join(", ")
    );

    axum::serve(listener, router(aggregator))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
