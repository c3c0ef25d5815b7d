use actix_web::HttpResponse;

use crate::api::{ApiError, FunnelBackend};
use crate::models::funnel::{Availability, FunnelDefinition};

/// Decode a URL-encoded string (form data): `+` → space, `%HH` → byte.
pub fn url_decode(s: &str) -> String {
    let s = s.replace('+', " ");
    let mut out = Vec::with_capacity(s.len());
    let b = s.as_bytes();
    let mut i = 0;
    while i < b.len() {
        if b[i] == b'%' && i + 2 < b.len() {
            let hex = std::str::from_utf8(&b[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(b[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse a URL-encoded form body, keeping duplicate keys and order.
pub fn parse_form_body(body: &str) -> Vec<(String, String)> {
    body.split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (url_decode(k), url_decode(v)),
            None => (url_decode(pair), String::new()),
        })
        .collect()
}

pub fn get_field<'a>(params: &'a [(String, String)], key: &str) -> &'a str {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .unwrap_or("")
}

/// Posted `field:{key}` values with the prefix stripped.
pub fn field_values(params: &[(String, String)]) -> impl Iterator<Item = (&str, &str)> {
    params
        .iter()
        .filter_map(|(k, v)| k.strip_prefix("field:").map(|key| (key, v.as_str())))
}

/// The `action` a step form was submitted with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    Next,
    Previous,
    Button(String),
    Toggle { component_id: String, option_index: usize },
    /// Fields were posted without a recognised action; values are still kept.
    Save,
}

impl StepAction {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "next" => return StepAction::Next,
            "previous" => return StepAction::Previous,
            _ => {}
        }
        if let Some(id) = raw.strip_prefix("button:").filter(|id| !id.is_empty()) {
            return StepAction::Button(id.to_string());
        }
        if let Some(rest) = raw.strip_prefix("toggle:") {
            // Component ids may contain ':'; the option index is always last.
            if let Some((id, index)) = rest.rsplit_once(':') {
                if let Ok(option_index) = index.parse::<usize>() {
                    if !id.is_empty() {
                        return StepAction::Toggle { component_id: id.to_string(), option_index };
                    }
                }
            }
        }
        StepAction::Save
    }
}

pub fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header(("Location", location.to_string()))
        .finish()
}

/// What loading a funnel for display produced.
pub enum Loaded {
    Ready(FunnelDefinition),
    NotFound,
    Unavailable(FunnelDefinition),
    Failed(ApiError),
}

/// Fetch by slug and classify the outcome. Backend errors are logged here.
pub async fn load_definition(backend: &dyn FunnelBackend, slug: &str) -> Loaded {
    match backend.fetch_funnel(slug).await {
        Ok(mut def) => match def.availability() {
            Availability::Available => {
                for collision in def.field_key_collisions() {
                    log::warn!(
                        "Funnel '{slug}': field key '{}' used in step {} and step {}; later values overwrite earlier ones",
                        collision.key,
                        collision.first_step + 1,
                        collision.second_step + 1
                    );
                }
                if def.slug.is_empty() {
                    def.slug = slug.to_string();
                }
                Loaded::Ready(def)
            }
            Availability::NotFound => Loaded::NotFound,
            Availability::Unavailable => Loaded::Unavailable(def),
        },
        Err(ApiError::NotFound) => Loaded::NotFound,
        Err(e) => {
            log::error!("Failed to load funnel '{slug}': {e}");
            Loaded::Failed(e)
        }
    }
}
