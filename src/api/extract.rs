use std::sync::OnceLock;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::feed::normalize::MAX_TITLE_CHARS;
use crate::models::NewsCreate;
use crate::services::API_KEY_HEADER;

use super::envelope::ErrorField;
use super::error::ApiError;
use super::AppState;

/// Passes when the request carries the configured ingest key, or when the
/// server does not require one.
#[derive(Debug, Clone, Copy)]
pub struct IngestKey;

impl FromRequestParts<AppState> for IngestKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !state.require_api_key {
            return Ok(IngestKey);
        }
        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        match (provided, state.api_key.as_deref()) {
            (Some(provided), Some(expected)) if provided == expected => Ok(IngestKey),
            _ => Err(ApiError::Forbidden("Invalid or missing API key".into())),
        }
    }
}

/// Request bodies that can report per-field problems.
pub trait Validate {
    fn validate(&self) -> Vec<ErrorField>;
}

impl Validate for NewsCreate {
    fn validate(&self) -> Vec<ErrorField> {
        let mut errors = Vec::new();
        if self.title.chars().count() > MAX_TITLE_CHARS {
            errors.push(ErrorField::new(
                "title",
                format!("String should have at most {MAX_TITLE_CHARS} characters"),
            ));
        }
        errors
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsCreateBulk {
    pub items: Vec<NewsCreate>,
}

impl Validate for NewsCreateBulk {
    fn validate(&self) -> Vec<ErrorField> {
        self.items
            .iter()
            .enumerate()
            .flat_map(|(i, item)| {
                item.validate().into_iter().map(move |e| {
                    ErrorField::new(format!("items.{}.{}", i, e.field), e.message)
                })
            })
            .collect()
    }
}

/// JSON body that failed neither deserialization nor [`Validate`].
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;
        let errors = value.validate();
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(Self(value))
    }
}

fn rejection_to_error(rejection: JsonRejection) -> ApiError {
    static MISSING: OnceLock<Regex> = OnceLock::new();
    let missing =
        MISSING.get_or_init(|| Regex::new(r"missing field `([^`]+)`").expect("valid regex"));

    let message = rejection.body_text();
    let field = missing
        .captures(&message)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "body".to_string());
    ApiError::Validation(vec![ErrorField::new(field, message)])
}
