use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, Url};

use super::{ApiError, ContactPayload, FunnelBackend, LeadSubmission, TrackEvent};
use crate::config::ApiConfig;
use crate::models::funnel::FunnelDefinition;

/// reqwest-backed client for the CRM REST API.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("funnelview/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::Config(format!("invalid API base URL '{}': {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Config(format!("API base URL '{}' cannot be a base", config.base_url)));
        }
        Ok(Self { client, base_url, token: config.token.clone() })
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Config("API base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Pull a human readable message out of an error body (`message` or `error`).
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|k| value.get(k).and_then(|v| v.as_str()))
        .map(String::from)
}

/// Map non-2xx responses and `{"success": false}` bodies to errors.
async fn ensure_success(resp: Response) -> Result<(), ApiError> {
    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound);
    }
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(ApiError::Server { status: status.as_u16(), message: extract_message(&body) });
    }
    let rejected = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("success").and_then(|s| s.as_bool()))
        == Some(false);
    if rejected {
        return Err(ApiError::Server { status: status.as_u16(), message: extract_message(&body) });
    }
    Ok(())
}

#[async_trait]
impl FunnelBackend for HttpBackend {
    async fn fetch_funnel(&self, slug: &str) -> Result<FunnelDefinition, ApiError> {
        let url = self.url(&["funnels", "by-slug", slug])?;
        let resp = self.request(Method::GET, url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ApiError::Server { status: status.as_u16(), message: extract_message(&body) });
        }
        FunnelDefinition::from_json(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn track_view(&self, event: &TrackEvent) -> Result<(), ApiError> {
        let url = self.url(&["funnels", &event.slug, "track"])?;
        let resp = self.request(Method::POST, url).json(event).send().await?;
        ensure_success(resp).await
    }

    async fn create_contact(&self, contact: &ContactPayload) -> Result<(), ApiError> {
        let url = self.url(&["contacts"])?;
        let resp = self.request(Method::POST, url).json(contact).send().await?;
        ensure_success(resp).await
    }

    async fn submit_lead(&self, slug: &str, lead: &LeadSubmission) -> Result<(), ApiError> {
        let url = self.url(&["funnels", slug, "leads"])?;
        let resp = self.request(Method::POST, url).json(lead).send().await?;
        ensure_success(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::new(&ApiConfig { base_url: base.to_string(), token: None, timeout_secs: 5 }).unwrap()
    }

    #[test]
    fn joins_and_encodes_segments() {
        let b = backend("http://api.test/api/");
        let url = b.url(&["funnels", "by-slug", "mein funnel"]).unwrap();
        assert_eq!(url.as_str(), "http://api.test/api/funnels/by-slug/mein%20funnel");
    }

    #[test]
    fn rejects_non_base_url() {
        let err = HttpBackend::new(&ApiConfig {
            base_url: "mailto:x@y.z".to_string(),
            token: None,
            timeout_secs: 5,
        })
        .err();
        assert!(matches!(err, Some(ApiError::Config(_))));
    }

    #[test]
    fn extracts_server_message() {
        assert_eq!(extract_message(r#"{"message": "E-Mail existiert"}"#).as_deref(), Some("E-Mail existiert"));
        assert_eq!(extract_message(r#"{"error": "boom"}"#).as_deref(), Some("boom"));
        assert_eq!(extract_message("<html>"), None);
    }
}
