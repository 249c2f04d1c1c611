use crate::error::{ApiError, ErrorResponse};
use crate::state::ApiState;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Instant;
use utoipa::{IntoParams, ToSchema};
use veil_derive::{api_handler, api_model};
use veil_domain::{ScoredMember, Status};
use veil_store::Expiry;

pub(crate) const SYSTEM_TAG: &str = "System";
pub(crate) const STORE_TAG: &str = "Store";

const UNIQUE_MEMBER: &str = "Value should be unique in the set.";
const KEY_NOT_FOUND: &str = "Key does not exist.";

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

#[api_model]
/// Health check response
pub(crate) struct HealthResponse {
    status: String,
    version: String,
    /// Uptime in seconds
    uptime: u64,
}

#[api_model]
pub(crate) struct KeyValue {
    key: String,
    value: String,
}

/// Unit for `expiration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub(crate) enum TimeUnit {
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "ms")]
    Millis,
}

#[api_model]
pub(crate) struct SetRequest {
    key: String,
    value: String,
    /// Time to live, in `expTimeUnit` (seconds by default)
    expiration: Option<u64>,
    exp_time_unit: Option<TimeUnit>,
}

#[api_model]
pub(crate) struct ZaddRequest {
    key: String,
    /// Integer score
    score: String,
    value: String,
}

#[api_model]
pub(crate) struct ScoredValue {
    value: String,
    score: i64,
}

#[api_model]
pub(crate) struct ArithmeticRequest {
    key: String,
    /// Integer operand
    value: String,
}

#[api_model]
pub(crate) struct SaddRequest {
    key: String,
    values: Vec<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct RangeQuery {
    /// Lower bound: an integer or `-inf`
    min: Option<String>,
    /// Upper bound: an integer, `inf` or `+inf`
    max: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct SearchQuery {
    /// Words to look for
    search: Option<String>,
}

impl From<ScoredMember> for ScoredValue {
    fn from(entry: ScoredMember) -> Self {
        Self { value: entry.member, score: entry.score }
    }
}

#[api_handler(
    get,
    path = "/health",
    responses(
        (status = OK, description = "The store answers", body = HealthResponse),
        (status = BAD_GATEWAY, description = "The store is unreachable", body = ErrorResponse),
    ),
    tag = SYSTEM_TAG,
)]
pub(crate) async fn health(State(store): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    store.ping().await?;
    let body = HealthResponse {
        status: "up".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        uptime: START_TIME.elapsed().as_secs(),
    };
    Ok(([(header::CACHE_CONTROL, "no-store, no-cache, must-revalidate")], Json(body)))
}

#[api_handler(
    get,
    path = "/redis/{key}",
    params(("key" = String, Path, description = "Logical key")),
    responses(
        (status = OK, body = KeyValue),
        (status = NOT_FOUND, body = ErrorResponse),
    ),
    tag = STORE_TAG,
)]
pub(crate) async fn get_value(
    State(store): State<ApiState>,
    Path(key): Path<String>,
) -> Result<Json<KeyValue>, ApiError> {
    let value = store.get(&key).await?.ok_or_else(|| ApiError::not_found(KEY_NOT_FOUND))?;
    Ok(Json(KeyValue { key, value }))
}

#[api_handler(
    post,
    path = "/redis",
    request_body = SetRequest,
    responses((status = CREATED, description = "Stored; `Location` points at the key")),
    tag = STORE_TAG,
)]
pub(crate) async fn set_value(
    State(store): State<ApiState>,
    Json(request): Json<SetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let expiry = request.expiration.map(|ttl| match request.exp_time_unit {
        Some(TimeUnit::Millis) => Expiry::Millis(ttl),
        Some(TimeUnit::Seconds) | None => Expiry::Seconds(ttl),
    });
    store.set(&request.key, &request.value, expiry).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::try_from(format!("/redis/{}", request.key)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers))
}

#[api_handler(
    delete,
    path = "/redis/{key}",
    params(("key" = String, Path, description = "Logical key")),
    responses(
        (status = NO_CONTENT, description = "Deleted"),
        (status = NOT_FOUND, body = ErrorResponse),
    ),
    tag = STORE_TAG,
)]
pub(crate) async fn delete_value(
    State(store): State<ApiState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    match store.del(&key).await? {
        Status::Ok => Ok(StatusCode::NO_CONTENT),
        Status::Nok => Err(ApiError::not_found(KEY_NOT_FOUND)),
    }
}

#[api_handler(
    delete,
    path = "/redis",
    responses(
        (status = NO_CONTENT, description = "Every key removed"),
        (status = NOT_IMPLEMENTED, description = "Cluster topology", body = ErrorResponse),
    ),
    tag = STORE_TAG,
)]
pub(crate) async fn flush_all(State(store): State<ApiState>) -> Result<StatusCode, ApiError> {
    store.flush_all().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[api_handler(
    post,
    path = "/redis/zadd",
    request_body = ZaddRequest,
    responses(
        (status = CREATED, description = "Member added"),
        (status = BAD_REQUEST, body = ErrorResponse),
    ),
    tag = STORE_TAG,
)]
pub(crate) async fn zadd(
    State(store): State<ApiState>,
    Json(request): Json<ZaddRequest>,
) -> Result<StatusCode, ApiError> {
    match store.zadd(&request.key, &request.score, &request.value).await? {
        Status::Ok => Ok(StatusCode::CREATED),
        Status::Nok => Err(ApiError::bad_request(UNIQUE_MEMBER)),
    }
}

#[api_handler(
    get,
    path = "/redis/zadd/{key}",
    params(("key" = String, Path, description = "Logical key"), RangeQuery),
    responses(
        (status = OK, body = Vec<ScoredValue>),
        (status = BAD_REQUEST, body = ErrorResponse),
    ),
    tag = STORE_TAG,
)]
pub(crate) async fn zrange_by_score(
    State(store): State<ApiState>,
    Path(key): Path<String>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<ScoredValue>>, ApiError> {
    let min = range.min.as_deref().unwrap_or("-inf");
    let max = range.max.as_deref().unwrap_or("+inf");
    let entries = store.zrange_by_score(&key, min, max).await?;
    Ok(Json(entries.into_iter().map(ScoredValue::from).collect()))
}

#[api_handler(
    post,
    path = "/redis/sum",
    request_body = ArithmeticRequest,
    responses(
        (status = NO_CONTENT, description = "Value incremented"),
        (status = NOT_FOUND, body = ErrorResponse),
        (status = BAD_REQUEST, body = ErrorResponse),
    ),
    tag = STORE_TAG,
)]
pub(crate) async fn sum(
    State(store): State<ApiState>,
    Json(request): Json<ArithmeticRequest>,
) -> Result<StatusCode, ApiError> {
    store.sum(&request.key, &request.value).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[api_handler(
    post,
    path = "/redis/diff",
    request_body = ArithmeticRequest,
    responses(
        (status = NO_CONTENT, description = "Value decremented"),
        (status = NOT_FOUND, body = ErrorResponse),
        (status = BAD_REQUEST, body = ErrorResponse),
    ),
    tag = STORE_TAG,
)]
pub(crate) async fn diff(
    State(store): State<ApiState>,
    Json(request): Json<ArithmeticRequest>,
) -> Result<StatusCode, ApiError> {
    store.diff(&request.key, &request.value).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[api_handler(
    post,
    path = "/redis/mult",
    request_body = ArithmeticRequest,
    responses(
        (status = NO_CONTENT, description = "Value multiplied"),
        (status = NOT_FOUND, body = ErrorResponse),
        (status = BAD_REQUEST, body = ErrorResponse),
    ),
    tag = STORE_TAG,
)]
pub(crate) async fn mult(
    State(store): State<ApiState>,
    Json(request): Json<ArithmeticRequest>,
) -> Result<StatusCode, ApiError> {
    store.mult(&request.key, &request.value).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[api_handler(
    post,
    path = "/redis/sadd",
    request_body = SaddRequest,
    responses((status = CREATED, description = "Members added")),
    tag = STORE_TAG,
)]
pub(crate) async fn sadd(
    State(store): State<ApiState>,
    Json(request): Json<SaddRequest>,
) -> Result<StatusCode, ApiError> {
    store.sadd(&request.key, &request.values).await?;
    Ok(StatusCode::CREATED)
}

#[api_handler(
    get,
    path = "/redis/sadd/{key}",
    params(("key" = String, Path, description = "Logical key"), SearchQuery),
    responses((status = OK, body = Vec<String>)),
    tag = STORE_TAG,
)]
pub(crate) async fn smembers(
    State(store): State<ApiState>,
    Path(key): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(store.smembers(&key, query.search.as_deref()).await?))
}
