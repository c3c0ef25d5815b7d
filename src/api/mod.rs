pub mod http;
pub mod types;

use async_trait::async_trait;
use std::fmt;

use crate::models::funnel::FunnelDefinition;

pub use http::HttpBackend;
pub use types::{ContactPayload, LeadSubmission, TrackEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    NotFound,
    Timeout,
    Network(String),
    Server { status: u16, message: Option<String> },
    Decode(String),
    Config(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound => write!(f, "Not found"),
            ApiError::Timeout => write!(f, "Request timed out"),
            ApiError::Network(e) => write!(f, "Network error: {e}"),
            ApiError::Server { status, message: Some(m) } => write!(f, "Server error {status}: {m}"),
            ApiError::Server { status, message: None } => write!(f, "Server error {status}"),
            ApiError::Decode(e) => write!(f, "Invalid response: {e}"),
            ApiError::Config(e) => write!(f, "Client configuration error: {e}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

const GENERIC_FAILURE: &str = "Beim Absenden ist ein Fehler aufgetreten. Bitte versuchen Sie es erneut.";

impl ApiError {
    /// Text shown to the visitor: the server's own message when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Server { message: Some(m), .. } if !m.trim().is_empty() => m.clone(),
            ApiError::Timeout => {
                "Der Server antwortet nicht. Bitte versuchen Sie es später erneut.".to_string()
            }
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

/// The CRM REST backend as seen by the viewer.
#[async_trait]
pub trait FunnelBackend: Send + Sync {
    /// `GET /funnels/by-slug/{slug}`
    async fn fetch_funnel(&self, slug: &str) -> Result<FunnelDefinition, ApiError>;

    /// `POST /funnels/{slug}/track`
    async fn track_view(&self, event: &TrackEvent) -> Result<(), ApiError>;

    /// `POST /contacts`
    async fn create_contact(&self, contact: &ContactPayload) -> Result<(), ApiError>;

    /// `POST /funnels/{slug}/leads`
    async fn submit_lead(&self, slug: &str, lead: &LeadSubmission) -> Result<(), ApiError>;
}
