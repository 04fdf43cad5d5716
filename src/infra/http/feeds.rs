use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Path, Query, State},
    http::{
        HeaderMap, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::{
    application::{
        delivery::{
            Delivery, DeliveryOutcome, FeedDeliveryService, FeedRequest, ValidatorError,
            parse_if_modified_since, parse_if_none_match,
        },
        error::HttpError,
    },
    domain::types::FeedFormat,
    util::http_date,
};

use super::middleware::{log_responses, set_request_context};

const SOURCE: &str = "infra::http::feeds";

#[derive(Clone)]
pub struct HttpState {
    pub delivery: Arc<FeedDeliveryService>,
    /// Query value that switches on debug annotations.
    pub debug_query_value: Arc<str>,
}

impl HttpState {
    pub fn new(delivery: Arc<FeedDeliveryService>, debug_query_value: impl Into<Arc<str>>) -> Self {
        Self {
            delivery,
            debug_query_value: debug_query_value.into(),
        }
    }

    fn debug_requested(&self, query: &FeedQuery) -> bool {
        let expected = self.debug_query_value.as_bytes();
        match query.debug.as_deref() {
            Some(value) if !expected.is_empty() => value.as_bytes().ct_eq(expected).into(),
            _ => false,
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        // The router wants one parameter name per position: `segment` is the
        // format for the firehose and the category otherwise.
        .route("/feeds/{segment}", get(firehose_feed))
        .route("/feeds/{segment}/{format}", get(category_feed))
        .route("/{category}/feeds/{format}", get(category_feed))
        .route("/_health", get(health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FeedQuery {
    debug: Option<String>,
}

async fn firehose_feed(
    State(state): State<HttpState>,
    Path(format): Path<String>,
    Query(query): Query<FeedQuery>,
    headers: HeaderMap,
) -> Response {
    serve_feed(&state, None, &format, &query, &headers)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

async fn category_feed(
    State(state): State<HttpState>,
    Path((category, format)): Path<(String, String)>,
    Query(query): Query<FeedQuery>,
    headers: HeaderMap,
) -> Response {
    serve_feed(&state, Some(&category), &format, &query, &headers)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn serve_feed(
    state: &HttpState,
    category: Option<&str>,
    format: &str,
    query: &FeedQuery,
    headers: &HeaderMap,
) -> Result<Response, HttpError> {
    let format = FeedFormat::from_route_segment(format).ok_or_else(|| {
        HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Unknown feed format.",
            format!("`{format}` is not a feed format"),
        )
    })?;

    let scope = state.delivery.resolve_scope(category)?;

    let mut request = FeedRequest::new(scope, format).with_debug(state.debug_requested(query));
    if let Some(raw) = header_text(headers, IF_NONE_MATCH, true)? {
        request = request.with_if_none_match(parse_if_none_match(&raw)?);
    }
    if let Some(raw) = header_text(headers, IF_MODIFIED_SINCE, false)? {
        request = request.with_if_modified_since(parse_if_modified_since(&raw)?);
    }

    let delivery = state.delivery.deliver(&request).await?;
    Ok(delivery_response(
        delivery,
        request.debug,
        state.delivery.options().ttl.minutes(),
    ))
}

fn header_text(
    headers: &HeaderMap,
    name: axum::http::HeaderName,
    entity_tag: bool,
) -> Result<Option<String>, ValidatorError> {
    let Some(value) = headers.get(&name) else {
        return Ok(None);
    };
    match value.to_str() {
        Ok(text) => Ok(Some(text.to_string())),
        Err(_) => {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            Err(if entity_tag {
                ValidatorError::MalformedEntityTag { value }
            } else {
                ValidatorError::MalformedDate { value }
            })
        }
    }
}

fn delivery_response(delivery: Delivery, debug: bool, ttl_minutes: Option<u32>) -> Response {
    let status = match delivery.outcome {
        DeliveryOutcome::NotModified => StatusCode::NOT_MODIFIED,
        DeliveryOutcome::Fresh | DeliveryOutcome::Hit => StatusCode::OK,
    };

    let cache_control = match (debug, ttl_minutes) {
        (true, _) => "no-store".to_string(),
        (false, Some(minutes)) => format!("public, max-age={}", u64::from(minutes) * 60),
        (false, None) => "no-cache".to_string(),
    };

    let mut builder = Response::builder()
        .status(status)
        .header(LAST_MODIFIED, http_date::format(delivery.last_modified))
        .header(CACHE_CONTROL, cache_control);
    if let Some(tag) = delivery.etag.as_deref() {
        builder = builder.header(ETAG, format!("\"{tag}\""));
    }

    let body = match delivery.body {
        Some(body) => {
            builder = builder.header(CONTENT_TYPE, content_type(delivery.format));
            Body::from(body)
        }
        None => Body::empty(),
    };

    builder
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn content_type(format: FeedFormat) -> String {
    format!("{}; charset=utf-8", format.mime_type())
}
