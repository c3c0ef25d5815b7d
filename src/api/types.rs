use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::form_state::FormState;

/// Body of `POST /funnels/{slug}/track`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEvent {
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    pub visitor_id: String,
}

/// Body of `POST /funnels/{slug}/leads`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSubmission {
    pub lead_data: FormState,
    pub step_id: String,
}

/// Body of `POST /contacts`. Field names follow the contacts API, not the funnel API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactPayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub pipeline_id: Option<String>,
    pub stage_id: Option<String>,
    pub company_id: Option<String>,
    pub additional_data: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}
