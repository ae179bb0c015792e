use serde::{Deserialize, Serialize};

pub const ERROR_HELP_BASE: &str = "https://injast.life/help/errors/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub next: String,
    pub prev: String,
    pub current_page: i64,
    pub total_items: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaSuccess {
    pub success: bool,
    pub pagination: Option<Pagination>,
}

/// Successful response: `{meta: {success: true, pagination}, data}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub meta: MetaSuccess,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            meta: MetaSuccess {
                success: true,
                pagination: None,
            },
            data,
        }
    }

    pub fn paginated(data: T, pagination: Pagination) -> Self {
        Self {
            meta: MetaSuccess {
                success: true,
                pagination: Some(pagination),
            },
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorField {
    pub field: String,
    pub message: String,
}

impl ErrorField {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaError {
    pub success: bool,
    pub error_code: String,
    pub error_help: String,
    pub error_fields: Vec<ErrorField>,
}

/// Error response: `{meta: {success: false, error_code, ...}, message}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub meta: MetaError,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(code: &str, message: impl Into<String>, fields: Vec<ErrorField>) -> Self {
        Self {
            meta: MetaError {
                success: false,
                error_code: code.to_string(),
                error_help: format!("{ERROR_HELP_BASE}{code}"),
                error_fields: fields,
            },
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsData<T> {
    pub news: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoriesData<T> {
    pub categories: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgenciesData<T> {
    pub agencies: T,
}
