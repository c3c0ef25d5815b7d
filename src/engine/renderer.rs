//! Maps definition components plus the current form state to template view models.
//!
//! Rendering is pure. Interactive elements carry the `action` value the step form
//! posts back, so the state machine sees exactly the events the markup offers.

use chrono::DateTime;

use crate::models::form_state::{FormState, MAX_FIELD_CHARS};
use crate::models::funnel::{Component, ComponentKind, ComponentStyle, InputType, safe_link};

pub const DEFAULT_OPTION_ICON: &str = "check";
const DEFAULT_COUNTDOWN_TEXT: &str = "Angebot endet bald";

/// What a button does when clicked, in precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    /// Open an external URL; no state change.
    Link(String),
    /// Validate the step and submit / advance.
    Submit,
    /// Advance to the next step.
    Next,
}

impl ButtonAction {
    pub fn kind(&self) -> &'static str {
        match self {
            ButtonAction::Link(_) => "link",
            ButtonAction::Submit => "submit",
            ButtonAction::Next => "next",
        }
    }
}

/// A configured link always wins, even on steps with inputs. Links with a scheme
/// other than http(s), mailto or tel are ignored and the button acts as if unlinked.
pub fn resolve_button_action(link: Option<&str>, step_has_inputs: bool) -> ButtonAction {
    match link.and_then(safe_link) {
        Some(url) => ButtonAction::Link(url.to_string()),
        None if step_has_inputs => ButtonAction::Submit,
        None => ButtonAction::Next,
    }
}

/// Facts about the step being rendered that individual components depend on.
#[derive(Debug, Clone, Copy)]
pub struct StepContext {
    pub has_inputs: bool,
}

#[derive(Debug, Clone)]
pub struct HeadingView {
    pub id: String,
    pub level: u8,
    pub text: String,
    pub style: String,
}

#[derive(Debug, Clone)]
pub struct TextView {
    pub id: String,
    pub text: String,
    pub style: String,
}

#[derive(Debug, Clone)]
pub struct ButtonView {
    pub id: String,
    pub text: String,
    pub icon: String,
    pub style: String,
    pub action: ButtonAction,
    pub kind: &'static str,
    pub href: String,
    pub action_value: String,
}

#[derive(Debug, Clone)]
pub struct InputView {
    pub id: String,
    pub name: String,
    pub html_type: &'static str,
    pub value: String,
    pub placeholder: String,
    pub label: String,
    pub max_length: usize,
    pub style: String,
}

#[derive(Debug, Clone)]
pub struct ImageView {
    pub id: String,
    pub src: String,
    pub alt: String,
    pub style: String,
}

#[derive(Debug, Clone)]
pub struct DividerView {
    pub id: String,
    pub style: String,
}

#[derive(Debug, Clone)]
pub struct TestimonialView {
    pub id: String,
    pub text: String,
    pub author: String,
    pub style: String,
}

/// Static countdown. There is no running timer.
#[derive(Debug, Clone)]
pub struct CountdownView {
    pub id: String,
    pub text: String,
    pub ends_at: String,
    pub style: String,
}

#[derive(Debug, Clone)]
pub struct ChoiceOptionView {
    pub label: String,
    pub icon: String,
    pub selected: bool,
    pub action_value: String,
}

#[derive(Debug, Clone)]
pub struct ChoiceView {
    pub id: String,
    pub question: String,
    pub options: Vec<ChoiceOptionView>,
    pub style: String,
}

#[derive(Debug, Clone)]
pub enum RenderedComponent {
    Heading(HeadingView),
    Paragraph(TextView),
    Button(ButtonView),
    Input(InputView),
    Image(ImageView),
    Divider(DividerView),
    Testimonial(TestimonialView),
    Countdown(CountdownView),
    MultipleChoice(ChoiceView),
    Empty,
}

/// Parse `"h1"`..`"h6"` (or a bare digit); anything else is an h2.
pub fn heading_level(level: Option<&str>) -> u8 {
    level
        .map(|l| l.trim().trim_start_matches(['h', 'H']))
        .and_then(|l| l.parse::<u8>().ok())
        .filter(|l| (1..=6).contains(l))
        .unwrap_or(2)
}

/// Reject values that could break out of a single CSS declaration.
fn css_value(value: &Option<String>) -> Option<&str> {
    let v = value.as_deref()?.trim();
    if v.is_empty() || v.contains([';', '{', '}', '<', '>', '"', '\'']) {
        return None;
    }
    Some(v)
}

pub fn inline_style(style: &ComponentStyle) -> String {
    let mut out = String::new();
    if let Some(c) = css_value(&style.color) {
        out.push_str(&format!("color: {c}; "));
    }
    if let Some(bg) = css_value(&style.background_color) {
        out.push_str(&format!("background-color: {bg}; "));
    }
    if let Some(size) = css_value(&style.font_size) {
        if size.chars().all(|c| c.is_ascii_digit() || c == '.') {
            out.push_str(&format!("font-size: {size}px; "));
        } else {
            out.push_str(&format!("font-size: {size}; "));
        }
    }
    if let Some(align) = css_value(&style.text_align) {
        out.push_str(&format!("text-align: {align}; "));
    }
    out.trim_end().to_string()
}

pub fn default_placeholder(input_type: InputType) -> &'static str {
    match input_type {
        InputType::Text => "Ihr Name",
        InputType::Email => "ihre@email.de",
        InputType::Tel => "+49 123 456789",
    }
}

fn html_input_type(input_type: InputType) -> &'static str {
    match input_type {
        InputType::Text => "text",
        InputType::Email => "email",
        InputType::Tel => "tel",
    }
}

fn countdown_end(ends_at: Option<&str>) -> String {
    ends_at
        .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
        .map(|dt| dt.format("%d.%m.%Y, %H:%M Uhr").to_string())
        .unwrap_or_default()
}

pub fn render(component: &Component, form: &FormState, ctx: StepContext) -> RenderedComponent {
    let id = component.id.clone();
    let style = inline_style(&component.style);
    match &component.kind {
        ComponentKind::Heading { level, text } => RenderedComponent::Heading(HeadingView {
            id,
            level: heading_level(level.as_deref()),
            text: text.clone(),
            style,
        }),
        ComponentKind::Paragraph { text } => {
            RenderedComponent::Paragraph(TextView { id, text: text.clone(), style })
        }
        ComponentKind::Button { text, link, icon } => {
            let action = resolve_button_action(link.as_deref(), ctx.has_inputs);
            let href = match &action {
                ButtonAction::Link(url) => url.clone(),
                _ => String::new(),
            };
            RenderedComponent::Button(ButtonView {
                action_value: format!("button:{id}"),
                id,
                text: text.clone(),
                icon: icon.clone().unwrap_or_default(),
                style,
                kind: action.kind(),
                href,
                action,
            })
        }
        ComponentKind::Input { input_type, placeholder, .. } => {
            let key = component.field_key().unwrap_or_default();
            let placeholder = placeholder
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .unwrap_or(default_placeholder(*input_type))
                .to_string();
            RenderedComponent::Input(InputView {
                id,
                name: format!("field:{key}"),
                html_type: html_input_type(*input_type),
                value: form.text(&key).to_string(),
                placeholder,
                label: component.explicit_label().unwrap_or("").to_string(),
                max_length: MAX_FIELD_CHARS,
                style,
            })
        }
        ComponentKind::Image { src, alt } => {
            RenderedComponent::Image(ImageView { id, src: src.clone(), alt: alt.clone(), style })
        }
        ComponentKind::Divider => RenderedComponent::Divider(DividerView { id, style }),
        ComponentKind::Testimonial { text, author } => RenderedComponent::Testimonial(TestimonialView {
            id,
            text: text.clone(),
            author: author.clone(),
            style,
        }),
        ComponentKind::Countdown { text, ends_at } => RenderedComponent::Countdown(CountdownView {
            id,
            text: text
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(DEFAULT_COUNTDOWN_TEXT)
                .to_string(),
            ends_at: countdown_end(ends_at.as_deref()),
            style,
        }),
        ComponentKind::MultipleChoice { text, options, option_icons, .. } => {
            let key = component.field_key().unwrap_or_default();
            let options = options
                .iter()
                .enumerate()
                .map(|(i, label)| ChoiceOptionView {
                    label: label.clone(),
                    icon: option_icons
                        .get(i)
                        .map(|s| s.trim())
                        .filter(|s| !s.is_empty())
                        .unwrap_or(DEFAULT_OPTION_ICON)
                        .to_string(),
                    selected: form.is_selected(&key, label),
                    action_value: format!("toggle:{id}:{i}"),
                })
                .collect();
            RenderedComponent::MultipleChoice(ChoiceView { id, question: text.clone(), options, style })
        }
        ComponentKind::Unknown => RenderedComponent::Empty,
    }
}

/// Render a whole step in declaration order.
pub fn render_step(components: &[Component], form: &FormState) -> Vec<RenderedComponent> {
    let ctx = StepContext {
        has_inputs: components.iter().any(|c| matches!(c.kind, ComponentKind::Input { .. })),
    };
    components.iter().map(|c| render(c, form, ctx)).collect()
}
