use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::settings::FunnelSettings;

/// Accept either a JSON string or number and keep it as a string.
/// The backend is not consistent about id types across endpoints.
fn flexible_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(flexible_opt_string(d)?.unwrap_or_default())
}

fn flexible_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Publication status of a funnel. Anything the viewer does not know is treated as inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum FunnelStatus {
    Draft,
    Active,
    #[default]
    Inactive,
}

impl From<String> for FunnelStatus {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => FunnelStatus::Active,
            "draft" => FunnelStatus::Draft,
            _ => FunnelStatus::Inactive,
        }
    }
}

/// A funnel as served by `GET /funnels/by-slug/{slug}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelDefinition {
    #[serde(default, deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub status: FunnelStatus,
    #[serde(default, deserialize_with = "flexible_opt_string")]
    pub pipeline_id: Option<String>,
    #[serde(default, deserialize_with = "flexible_opt_string")]
    pub stage_id: Option<String>,
    #[serde(default, deserialize_with = "flexible_opt_string")]
    pub company_id: Option<String>,
    #[serde(default)]
    pub design: Design,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Design {
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub settings: FunnelSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(default, deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub components: Vec<Component>,
}

impl Step {
    /// True when the step holds at least one free-text input.
    pub fn has_inputs(&self) -> bool {
        self.components
            .iter()
            .any(|c| matches!(c.kind, ComponentKind::Input { .. }))
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }
}

/// Optional presentational overrides shared by every component type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStyle {
    #[serde(default, deserialize_with = "flexible_opt_string")]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "flexible_opt_string")]
    pub background_color: Option<String>,
    #[serde(default, deserialize_with = "flexible_opt_string")]
    pub font_size: Option<String>,
    #[serde(default, deserialize_with = "flexible_opt_string")]
    pub text_align: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Component {
    #[serde(default, deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(flatten)]
    pub style: ComponentStyle,
    #[serde(flatten)]
    pub kind: ComponentKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ComponentKind {
    Heading {
        #[serde(default, deserialize_with = "flexible_opt_string")]
        level: Option<String>,
        #[serde(default)]
        text: String,
    },
    Paragraph {
        #[serde(default)]
        text: String,
    },
    Button {
        #[serde(default)]
        text: String,
        #[serde(default)]
        link: Option<String>,
        #[serde(default)]
        icon: Option<String>,
    },
    Input {
        #[serde(default, rename = "inputType")]
        input_type: InputType,
        #[serde(default)]
        placeholder: Option<String>,
        #[serde(default)]
        label: Option<String>,
        #[serde(default, rename = "semanticRole")]
        semantic_role: Option<SemanticRole>,
    },
    Image {
        #[serde(default)]
        src: String,
        #[serde(default)]
        alt: String,
    },
    Divider,
    Testimonial {
        #[serde(default)]
        text: String,
        #[serde(default)]
        author: String,
    },
    Countdown {
        #[serde(default)]
        text: Option<String>,
        #[serde(default, rename = "endsAt")]
        ends_at: Option<String>,
    },
    #[serde(rename = "multiplechoice")]
    MultipleChoice {
        #[serde(default)]
        text: String,
        #[serde(default)]
        options: Vec<String>,
        #[serde(default, rename = "optionIcons")]
        option_icons: Vec<String>,
        #[serde(default)]
        label: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum InputType {
    #[default]
    Text,
    Email,
    Tel,
}

impl From<String> for InputType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "email" => InputType::Email,
            "tel" => InputType::Tel,
            _ => InputType::Text,
        }
    }
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Text => "text",
            InputType::Email => "email",
            InputType::Tel => "tel",
        }
    }
}

/// What a collected value means for the contact record.
/// Set explicitly in the definition so the payload does not depend on key prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum SemanticRole {
    FirstName,
    LastName,
    FullName,
    Email,
    Phone,
    Other,
}

impl From<String> for SemanticRole {
    fn from(s: String) -> Self {
        match s.as_str() {
            "firstName" | "first_name" => SemanticRole::FirstName,
            "lastName" | "last_name" => SemanticRole::LastName,
            "fullName" | "full_name" | "name" => SemanticRole::FullName,
            "email" => SemanticRole::Email,
            "phone" | "tel" => SemanticRole::Phone,
            _ => SemanticRole::Other,
        }
    }
}

impl SemanticRole {
    pub fn label(&self) -> &'static str {
        match self {
            SemanticRole::FirstName => "Vorname",
            SemanticRole::LastName => "Nachname",
            SemanticRole::FullName => "Name",
            SemanticRole::Email => "E-Mail",
            SemanticRole::Phone => "Telefon",
            SemanticRole::Other => "Angabe",
        }
    }
}

impl Component {
    /// Form-state key for value-carrying components: `{inputType}_{id}` for inputs,
    /// `multiplechoice_{id}` for choices. Display components have none.
    pub fn field_key(&self) -> Option<String> {
        match &self.kind {
            ComponentKind::Input { input_type, .. } => {
                Some(format!("{}_{}", input_type.as_str(), self.id))
            }
            ComponentKind::MultipleChoice { .. } => Some(format!("multiplechoice_{}", self.id)),
            _ => None,
        }
    }

    /// Explicit label from the definition, if the builder set one.
    pub fn explicit_label(&self) -> Option<&str> {
        let label = match &self.kind {
            ComponentKind::Input { label, .. } => label.as_deref(),
            ComponentKind::MultipleChoice { label, .. } => label.as_deref(),
            _ => None,
        };
        label.map(str::trim).filter(|l| !l.is_empty())
    }

    pub fn semantic_role(&self) -> Option<SemanticRole> {
        match &self.kind {
            ComponentKind::Input { semantic_role, .. } => *semantic_role,
            _ => None,
        }
    }
}

/// Schemes a definition may send visitors to. Anything else (`javascript:`, `data:`) is dropped.
const SAFE_LINK_PREFIXES: [&str; 4] = ["http://", "https://", "mailto:", "tel:"];

/// The trimmed link when it uses an allowed scheme.
pub fn safe_link(raw: &str) -> Option<&str> {
    let link = raw.trim();
    let lower = link.to_ascii_lowercase();
    SAFE_LINK_PREFIXES
        .iter()
        .any(|p| lower.starts_with(p) && lower.len() > p.len())
        .then_some(link)
}

/// Whether a fetched definition can be shown to visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    NotFound,
    Unavailable,
}

/// Two value-carrying components that write to the same form-state key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKeyCollision {
    pub key: String,
    pub first_step: usize,
    pub second_step: usize,
}

impl FunnelDefinition {
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn steps(&self) -> &[Step] {
        &self.design.steps
    }

    pub fn settings(&self) -> &FunnelSettings {
        &self.design.settings
    }

    pub fn step_count(&self) -> usize {
        self.design.steps.len()
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.design.steps.get(index)
    }

    pub fn availability(&self) -> Availability {
        if self.design.steps.is_empty() {
            Availability::NotFound
        } else if self.status != FunnelStatus::Active {
            Availability::Unavailable
        } else {
            Availability::Available
        }
    }

    /// All components in navigation order paired with their step index.
    pub fn components(&self) -> impl Iterator<Item = (usize, &Component)> {
        self.design
            .steps
            .iter()
            .enumerate()
            .flat_map(|(i, step)| step.components.iter().map(move |c| (i, c)))
    }

    /// Value-carrying components whose synthesized keys collide. Later ones overwrite earlier state.
    pub fn field_key_collisions(&self) -> Vec<FieldKeyCollision> {
        let mut seen: Vec<(String, usize)> = Vec::new();
        let mut collisions = Vec::new();
        for (step_index, component) in self.components() {
            let Some(key) = component.field_key() else { continue };
            if let Some((_, first_step)) = seen.iter().find(|(k, _)| *k == key) {
                collisions.push(FieldKeyCollision {
                    key: key.clone(),
                    first_step: *first_step,
                    second_step: step_index,
                });
            } else {
                seen.push((key, step_index));
            }
        }
        collisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(json: &str) -> FunnelDefinition {
        FunnelDefinition::from_json(json).unwrap()
    }

    #[test]
    fn ids_may_be_strings_or_numbers() {
        let def = definition(
            r#"{"id": 12, "pipelineId": 7, "stageId": "s-1", "companyId": null, "status": "active",
                "design": {"steps": [{"id": 3, "components": [{"id": 5, "type": "input"}]}]}}"#,
        );
        assert_eq!(def.id, "12");
        assert_eq!(def.pipeline_id.as_deref(), Some("7"));
        assert_eq!(def.stage_id.as_deref(), Some("s-1"));
        assert_eq!(def.company_id, None);
        assert_eq!(def.steps()[0].id, "3");
        assert_eq!(def.steps()[0].components[0].field_key().as_deref(), Some("text_5"));
    }

    #[test]
    fn status_decides_availability() {
        let steps = r#""design": {"steps": [{"id": "s", "components": []}]}"#;
        let with_status = |status: &str| definition(&format!(r#"{{"status": "{status}", {steps}}}"#));

        assert_eq!(with_status("active").availability(), Availability::Available);
        assert_eq!(with_status("ACTIVE").availability(), Availability::Available);
        assert_eq!(with_status("draft").status, FunnelStatus::Draft);
        assert_eq!(with_status("draft").availability(), Availability::Unavailable);
        assert_eq!(with_status("archived").status, FunnelStatus::Inactive);
        assert_eq!(with_status("archived").availability(), Availability::Unavailable);
        assert_eq!(definition(&format!("{{{steps}}}")).availability(), Availability::Unavailable);
    }

    #[test]
    fn no_steps_is_not_found_even_when_active() {
        let def = definition(r#"{"status": "active", "design": {"steps": []}}"#);
        assert_eq!(def.availability(), Availability::NotFound);
        assert_eq!(definition("{}").availability(), Availability::NotFound);
    }

    #[test]
    fn unknown_component_types_keep_id_and_style() {
        let c: Component =
            serde_json::from_str(r#"{"id": "v", "type": "video", "src": "a.mp4", "color": "red"}"#).unwrap();
        assert!(matches!(c.kind, ComponentKind::Unknown));
        assert_eq!(c.id, "v");
        assert_eq!(c.style.color.as_deref(), Some("red"));
        assert_eq!(c.field_key(), None);
    }

    #[test]
    fn flattened_style_and_kind_fields() {
        let c: Component = serde_json::from_str(
            r#"{"id": "q", "type": "multiplechoice", "text": "Wie?", "options": ["A"],
                "fontSize": 18, "label": " Frage ", "textAlign": "center"}"#,
        )
        .unwrap();
        assert_eq!(c.style.font_size.as_deref(), Some("18"));
        assert_eq!(c.style.text_align.as_deref(), Some("center"));
        assert_eq!(c.explicit_label(), Some("Frage"));
        assert_eq!(c.field_key().as_deref(), Some("multiplechoice_q"));
    }

    #[test]
    fn colliding_field_keys_are_reported() {
        let def = definition(
            r#"{"design": {"steps": [
                {"id": "a", "components": [{"id": "5", "type": "input"}, {"id": "6", "type": "button"}]},
                {"id": "b", "components": [{"id": 5, "type": "input", "inputType": "text"},
                                           {"id": 5, "type": "input", "inputType": "email"}]}
            ]}}"#,
        );
        assert_eq!(
            def.field_key_collisions(),
            vec![FieldKeyCollision { key: "text_5".to_string(), first_step: 0, second_step: 1 }]
        );
        assert!(definition(r#"{"design": {"steps": []}}"#).field_key_collisions().is_empty());
    }

    #[test]
    fn only_web_mail_and_phone_links_are_safe() {
        assert_eq!(safe_link(" https://example.com/a "), Some("https://example.com/a"));
        assert_eq!(safe_link("HTTP://example.com"), Some("HTTP://example.com"));
        assert_eq!(safe_link("mailto:info@example.com"), Some("mailto:info@example.com"));
        assert_eq!(safe_link("tel:+4930123"), Some("tel:+4930123"));
        assert_eq!(safe_link("javascript:alert(1)"), None);
        assert_eq!(safe_link(" JavaScript:alert(1)"), None);
        assert_eq!(safe_link("data:text/html,x"), None);
        assert_eq!(safe_link("//evil.test"), None);
        assert_eq!(safe_link("https://"), None);
    }
}
