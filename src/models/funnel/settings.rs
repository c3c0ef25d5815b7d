use serde::Deserialize;

use super::types::safe_link;

/// Viewer configuration stored in `design.settings`.
/// Every option falls back to the value in `Default` when the builder left it out.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FunnelSettings {
    pub show_progress_bar: bool,
    pub next_button_text: String,
    pub next_button_color: String,
    pub next_button_hover_color: String,
    pub previous_button_text: String,
    pub previous_button_color: String,
    pub previous_button_hover_color: String,
    pub submit_button_text: String,
    pub submit_button_color: String,
    pub submit_button_text_color: String,
    pub submit_button_hover_color: String,
    pub privacy_policy: String,
    pub privacy_policy_link: String,
    pub privacy_policy_link_text: String,
}

impl Default for FunnelSettings {
    fn default() -> Self {
        Self {
            show_progress_bar: true,
            next_button_text: "Weiter".to_string(),
            next_button_color: "#2563eb".to_string(),
            next_button_hover_color: "#1d4ed8".to_string(),
            previous_button_text: "Zurück".to_string(),
            previous_button_color: "#e5e7eb".to_string(),
            previous_button_hover_color: "#d1d5db".to_string(),
            submit_button_text: "Absenden".to_string(),
            submit_button_color: "#16a34a".to_string(),
            submit_button_text_color: "#ffffff".to_string(),
            submit_button_hover_color: "#15803d".to_string(),
            privacy_policy: "Ich habe die Datenschutzerklärung gelesen und stimme der Verarbeitung meiner Daten zu."
                .to_string(),
            privacy_policy_link: String::new(),
            privacy_policy_link_text: "Datenschutzerklärung".to_string(),
        }
    }
}

impl FunnelSettings {
    /// Privacy link, only when the builder configured one with an allowed scheme.
    pub fn privacy_link(&self) -> Option<&str> {
        safe_link(&self.privacy_policy_link)
    }

    /// Inline style for the "next" button, hover colour exposed as a CSS variable.
    pub fn next_button_style(&self) -> String {
        format!(
            "background-color: {}; --hover-color: {};",
            self.next_button_color, self.next_button_hover_color
        )
    }

    pub fn previous_button_style(&self) -> String {
        format!(
            "background-color: {}; --hover-color: {};",
            self.previous_button_color, self.previous_button_hover_color
        )
    }

    pub fn submit_button_style(&self) -> String {
        format!(
            "background-color: {}; color: {}; --hover-color: {};",
            self.submit_button_color, self.submit_button_text_color, self.submit_button_hover_color
        )
    }
}
