use std::collections::{BTreeMap, HashMap};

use axum::{
    extract::{Path, Query, State},
    http::{header::HOST, HeaderMap, Uri},
    Json,
};
use serde_json::{json, Value};

use crate::models::{Agency, Category, NewsCreate, NewsFilter, NewsView};

use super::envelope::{
    AgenciesData, CategoriesData, Envelope, ErrorField, NewsData, Pagination,
};
use super::error::ApiError;
use super::extract::{IngestKey, NewsCreateBulk, ValidatedJson};
use super::AppState;

pub const SERVICE_NAME: &str = "News Relay Ingest Service";
pub const MAX_PAGE_SIZE: i64 = 200;

pub async fn index() -> Json<Value> {
    Json(json!({ "service": SERVICE_NAME }))
}

pub async fn healthz() -> Json<Value> {
    Json(json!({ "ok": true }))
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}

pub async fn ingest_news(
    _key: IngestKey,
    State(state): State<AppState>,
    ValidatedJson(item): ValidatedJson<NewsCreate>,
) -> Result<Json<Envelope<NewsData<NewsView>>>, ApiError> {
    let (news, created) = state.repo.ingest(item).await?;
    tracing::debug!(id = %news.id, created, "ingested news item");
    Ok(Json(Envelope::new(NewsData { news })))
}

pub async fn ingest_news_bulk(
    _key: IngestKey,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<NewsCreateBulk>,
) -> Result<Json<Envelope<NewsData<Vec<NewsView>>>>, ApiError> {
    let news = state.repo.ingest_bulk(payload.items).await?;
    tracing::debug!(count = news.len(), "ingested news batch");
    Ok(Json(Envelope::new(NewsData { news })))
}

pub async fn get_news(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<NewsData<NewsView>>>, ApiError> {
    match state.repo.get_news(id.clone()).await? {
        Some(news) => Ok(Json(Envelope::new(NewsData { news }))),
        None => Err(ApiError::NotFound(format!("News {} not found", id))),
    }
}

pub async fn list_news(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Envelope<NewsData<Vec<NewsView>>>>, ApiError> {
    let filter = parse_filter(&params)?;
    let (limit, offset) = (filter.limit, filter.offset);
    let (total, news) = state.repo.list_news(filter).await?;

    let base = match headers.get(HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => format!("http://{}{}", host, uri.path()),
        None => uri.path().to_string(),
    };
    let pagination = paginate(&base, &params, limit, offset, total, news.len() as i64);
    Ok(Json(Envelope::paginated(NewsData { news }, pagination)))
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Envelope<CategoriesData<Vec<Category>>>>, ApiError> {
    let categories = state.repo.list_categories().await?;
    Ok(Json(Envelope::new(CategoriesData { categories })))
}

pub async fn list_agencies(
    State(state): State<AppState>,
) -> Result<Json<Envelope<AgenciesData<Vec<Agency>>>>, ApiError> {
    let agencies = state.repo.list_agencies().await?;
    Ok(Json(Envelope::new(AgenciesData { agencies })))
}

/// Read `GET /api/news` query parameters into a filter, collecting every
/// invalid parameter rather than stopping at the first.
pub fn parse_filter(params: &HashMap<String, String>) -> Result<NewsFilter, ApiError> {
    let mut errors = Vec::new();
    let mut int = |name: &str, default: Option<i64>, min: i64, max: Option<i64>| -> Option<i64> {
        let raw = match params.get(name) {
            Some(raw) => raw,
            None => return default,
        };
        match raw.trim().parse::<i64>() {
            Ok(v) if v < min => {
                errors.push(ErrorField::new(
                    name,
                    format!("Input should be greater than or equal to {min}"),
                ));
                default
            }
            Ok(v) if max.is_some_and(|max| v > max) => {
                errors.push(ErrorField::new(
                    name,
                    format!("Input should be less than or equal to {}", max.unwrap_or(v)),
                ));
                default
            }
            Ok(v) => Some(v),
            Err(_) => {
                errors.push(ErrorField::new(name, "Input should be a valid integer"));
                default
            }
        }
    };

    let category_id = int("category_id", None, 1, None);
    let agency_id = int("agency_id", None, 1, None);
    let limit = int("limit", Some(50), 1, Some(MAX_PAGE_SIZE)).unwrap_or(50);
    let offset = int("offset", Some(0), 0, None).unwrap_or(0);

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let text = |name: &str| params.get(name).filter(|s| !s.is_empty()).cloned();
    Ok(NewsFilter {
        category_id,
        agency_id,
        category: text("category"),
        agency: text("agency"),
        q: text("q"),
        limit,
        offset,
    })
}

/// Build next/prev links that keep the caller's query parameters.
pub fn paginate(
    base: &str,
    params: &HashMap<String, String>,
    limit: i64,
    offset: i64,
    total: i64,
    count: i64,
) -> Pagination {
    let url_with = |new_offset: i64| {
        let mut query: BTreeMap<&str, String> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        query.insert("limit", limit.to_string());
        query.insert("offset", new_offset.max(0).to_string());
        let encoded: Vec<String> = query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        format!("{}?{}", base, encoded.join("&"))
    };

    let next = if offset + count < total {
        url_with(offset + limit)
    } else {
        String::new()
    };
    let prev = if offset > 0 {
        url_with(offset - limit)
    } else {
        String::new()
    };

    Pagination {
        next,
        prev,
        current_page: count,
        total_items: total,
    }
}
