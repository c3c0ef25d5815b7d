//! Step navigation and validation for one visitor's pass through a funnel.
//!
//! A funnel with N content steps is a line `Viewing(0) .. Viewing(N-1)` followed
//! by a single `Confirming` step. Forward moves are gated on the current step's
//! required fields; backward moves never validate and never touch form state.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::confirmation::field_label;
use super::renderer::{ButtonAction, resolve_button_action};
use crate::models::form_state::{FormState, MAX_FIELD_CHARS};
use crate::models::funnel::{Component, ComponentKind, FunnelDefinition, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "step", rename_all = "snake_case")]
pub enum NavigationState {
    Viewing(usize),
    Confirming,
}

impl Default for NavigationState {
    fn default() -> Self {
        NavigationState::Viewing(0)
    }
}

/// Which of the two public viewers is driving the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerMode {
    /// `/funnel/{slug}`: inputs and multiple choice are required, ends in a confirmation step.
    Full,
    /// `/f/{slug}`: legacy viewer; only inputs are required, and leaving a step that has
    /// inputs sends a lead, whether through a submit button or the nav "next" button.
    Simple,
}

impl ViewerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewerMode::Full => "funnel",
            ViewerMode::Simple => "f",
        }
    }

    /// Public path prefix of the viewer, e.g. `/funnel/{slug}`.
    pub fn base_path(&self, slug: &str) -> String {
        format!("/{}/{}", self.as_str(), slug)
    }
}

/// A rejected transition. The message is shown to the visitor as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
    pub missing: Vec<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), missing: Vec::new() }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Result of a navigation attempt that was allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A content step was entered; callers record a step view for it.
    Entered { step_index: usize, step_id: String },
    Confirming,
    /// Simple mode only: the last step was passed, there is nothing left to show.
    Completed,
    /// Nothing changed (e.g. "back" on the first step).
    Stayed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonOutcome {
    OpenLink(String),
    Advanced(Transition),
    /// Simple mode: the step validated and its lead must now be submitted.
    SubmitStep { step_id: String },
    Rejected(ValidationError),
    /// The button does not exist on the current step (stale form).
    Ignored,
}

const MISSING_FIELDS_MESSAGE: &str = "Bitte füllen Sie alle Pflichtfelder aus";
const TERMS_MESSAGE: &str = "Bitte akzeptieren Sie die Datenschutzbestimmungen, um fortzufahren.";

/// Field keys that must be filled before leaving `step` forward.
pub fn required_fields(step: &Step, mode: ViewerMode) -> Vec<(String, &Component)> {
    step.components
        .iter()
        .filter(|c| match c.kind {
            ComponentKind::Input { .. } => true,
            ComponentKind::MultipleChoice { .. } => mode == ViewerMode::Full,
            _ => false,
        })
        .filter_map(|c| c.field_key().map(|k| (k, c)))
        .collect()
}

pub fn validate_step(step: &Step, form: &FormState, mode: ViewerMode) -> Result<(), ValidationError> {
    let missing: Vec<(String, &Component)> = required_fields(step, mode)
        .into_iter()
        .filter(|(key, _)| !form.is_filled(key))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    let mut labels: Vec<String> = Vec::new();
    for (_, component) in &missing {
        let label = field_label(component);
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    Err(ValidationError {
        message: format!("{MISSING_FIELDS_MESSAGE}: {}.", labels.join(", ")),
        missing: missing.into_iter().map(|(k, _)| k).collect(),
    })
}

/// Per-visitor viewer state; this is what lives in the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunnelViewer {
    pub nav: NavigationState,
    pub form: FormState,
    #[serde(default)]
    pub agreed_to_terms: bool,
    /// Whether the view of the first step has been reported for this pass.
    #[serde(default)]
    pub start_tracked: bool,
}

impl FunnelViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_confirming(&self) -> bool {
        self.nav == NavigationState::Confirming
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.nav {
            NavigationState::Viewing(i) => Some(i),
            NavigationState::Confirming => None,
        }
    }

    pub fn current_step<'a>(&self, def: &'a FunnelDefinition) -> Option<&'a Step> {
        self.current_index().and_then(|i| def.step(i))
    }

    /// Pull a stored position back into range after the definition changed underneath it.
    /// Returns true when the state was adjusted.
    pub fn clamp(&mut self, def: &FunnelDefinition, mode: ViewerMode) -> bool {
        let count = def.step_count();
        let clamped = match self.nav {
            NavigationState::Viewing(i) if count == 0 && i != 0 => NavigationState::Viewing(0),
            NavigationState::Viewing(i) if count > 0 && i >= count => NavigationState::Viewing(count - 1),
            NavigationState::Confirming if mode == ViewerMode::Simple || count == 0 => {
                NavigationState::Viewing(count.saturating_sub(1))
            }
            other => other,
        };
        let changed = clamped != self.nav;
        self.nav = clamped;
        changed
    }

    /// Upsert posted text values, accepting only inputs that belong to the current step.
    ///
    /// All or nothing: if any accepted value is longer than [`MAX_FIELD_CHARS`], no value
    /// is applied and the form is left as it was.
    pub fn update_fields<'p>(
        &mut self,
        def: &FunnelDefinition,
        values: impl IntoIterator<Item = (&'p str, &'p str)>,
    ) -> Result<usize, ValidationError> {
        let Some(step) = self.current_step(def) else { return Ok(0) };
        let accepted: Vec<(&Component, &str, &str)> = values
            .into_iter()
            .filter_map(|(key, value)| {
                step.components
                    .iter()
                    .filter(|c| matches!(c.kind, ComponentKind::Input { .. }))
                    .find(|c| c.field_key().as_deref() == Some(key))
                    .map(|c| (c, key, value))
            })
            .collect();

        let too_long: Vec<&str> = accepted
            .iter()
            .filter(|(_, _, value)| value.chars().count() > MAX_FIELD_CHARS)
            .map(|(_, key, _)| *key)
            .collect();
        if let Some((component, _, _)) = accepted.iter().find(|(_, key, _)| too_long.contains(key)) {
            return Err(ValidationError {
                message: format!(
                    "{}: Bitte geben Sie höchstens {MAX_FIELD_CHARS} Zeichen ein.",
                    field_label(component)
                ),
                missing: too_long.into_iter().map(str::to_string).collect(),
            });
        }

        for (_, key, value) in &accepted {
            self.form.set_text(key, value);
        }
        Ok(accepted.len())
    }

    /// Toggle `options[option_index]` of a multiple-choice component on the current step.
    pub fn toggle_choice(&mut self, def: &FunnelDefinition, component_id: &str, option_index: usize) -> bool {
        let Some(step) = self.current_step(def) else { return false };
        let Some(component) = step.component(component_id) else { return false };
        let ComponentKind::MultipleChoice { options, .. } = &component.kind else { return false };
        let (Some(option), Some(key)) = (options.get(option_index), component.field_key()) else {
            return false;
        };
        self.form.toggle_choice(&key, option);
        true
    }

    /// Validate the current step and move forward one position.
    pub fn next(&mut self, def: &FunnelDefinition, mode: ViewerMode) -> Result<Transition, ValidationError> {
        let NavigationState::Viewing(index) = self.nav else {
            return Ok(Transition::Stayed);
        };
        let Some(step) = def.step(index) else {
            return Err(ValidationError::new("Dieser Schritt existiert nicht mehr."));
        };
        validate_step(step, &self.form, mode)?;

        let last = def.step_count().saturating_sub(1);
        if index < last {
            self.nav = NavigationState::Viewing(index + 1);
            return Ok(entered(def, index + 1));
        }
        match mode {
            ViewerMode::Full => {
                self.nav = NavigationState::Confirming;
                Ok(Transition::Confirming)
            }
            ViewerMode::Simple => Ok(Transition::Completed),
        }
    }

    /// Move back one position. Never validates, never loses data.
    pub fn previous(&mut self, def: &FunnelDefinition) -> Transition {
        match self.nav {
            NavigationState::Viewing(0) => Transition::Stayed,
            NavigationState::Viewing(i) => {
                self.nav = NavigationState::Viewing(i - 1);
                entered(def, i - 1)
            }
            NavigationState::Confirming => {
                let last = def.step_count().saturating_sub(1);
                self.nav = NavigationState::Viewing(last);
                entered(def, last)
            }
        }
    }

    /// Handle a click on a component button of the current step.
    pub fn handle_button(&mut self, def: &FunnelDefinition, mode: ViewerMode, component_id: &str) -> ButtonOutcome {
        let Some(step) = self.current_step(def) else { return ButtonOutcome::Ignored };
        let Some(component) = step.component(component_id) else { return ButtonOutcome::Ignored };
        let ComponentKind::Button { link, .. } = &component.kind else { return ButtonOutcome::Ignored };

        match resolve_button_action(link.as_deref(), step.has_inputs()) {
            ButtonAction::Link(url) => ButtonOutcome::OpenLink(url),
            ButtonAction::Submit if mode == ViewerMode::Simple => match validate_step(step, &self.form, mode) {
                Ok(()) => ButtonOutcome::SubmitStep { step_id: step.id.clone() },
                Err(e) => ButtonOutcome::Rejected(e),
            },
            ButtonAction::Submit | ButtonAction::Next => match self.next(def, mode) {
                Ok(t) => ButtonOutcome::Advanced(t),
                Err(e) => ButtonOutcome::Rejected(e),
            },
        }
    }

    /// Forward move from the step's nav "next" button or a default form submit.
    /// In simple mode a step with inputs is submitted the way its submit button would be.
    pub fn advance(&mut self, def: &FunnelDefinition, mode: ViewerMode) -> ButtonOutcome {
        if mode == ViewerMode::Simple {
            if let Some(step) = self.current_step(def).filter(|s| s.has_inputs()) {
                return match validate_step(step, &self.form, mode) {
                    Ok(()) => ButtonOutcome::SubmitStep { step_id: step.id.clone() },
                    Err(e) => ButtonOutcome::Rejected(e),
                };
            }
        }
        match self.next(def, mode) {
            Ok(t) => ButtonOutcome::Advanced(t),
            Err(e) => ButtonOutcome::Rejected(e),
        }
    }

    pub fn set_terms(&mut self, agreed: bool) {
        self.agreed_to_terms = agreed;
    }

    /// Gate for the final submission: confirmation step, consent given, every step complete.
    /// Returns the id of the step the lead is recorded against.
    pub fn ready_for_submission<'a>(&self, def: &'a FunnelDefinition) -> Result<&'a str, ValidationError> {
        if !self.is_confirming() {
            return Err(ValidationError::new("Bitte schließen Sie zuerst alle Schritte ab."));
        }
        if !self.agreed_to_terms {
            return Err(ValidationError::new(TERMS_MESSAGE));
        }
        for step in def.steps() {
            validate_step(step, &self.form, ViewerMode::Full)?;
        }
        def.steps()
            .last()
            .map(|s| s.id.as_str())
            .ok_or_else(|| ValidationError::new("Dieser Funnel hat keine Schritte."))
    }

    /// Back to the first step with nothing entered.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 1-based position and total positions, counting the confirmation step in full mode.
    pub fn progress(&self, def: &FunnelDefinition, mode: ViewerMode) -> (usize, usize) {
        let steps = def.step_count();
        let total = match mode {
            ViewerMode::Full => steps + 1,
            ViewerMode::Simple => steps,
        };
        let current = match self.nav {
            NavigationState::Viewing(i) => i + 1,
            NavigationState::Confirming => total,
        };
        (current.min(total.max(1)), total.max(1))
    }
}

fn entered(def: &FunnelDefinition, index: usize) -> Transition {
    Transition::Entered {
        step_index: index,
        step_id: def.step(index).map(|s| s.id.clone()).unwrap_or_default(),
    }
}
