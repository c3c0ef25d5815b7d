use actix_session::Session;
use serde::{Deserialize, Serialize};

const TOAST_KEY: &str = "toast";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

impl ToastKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToastKind::Success => "success",
            ToastKind::Error => "error",
            ToastKind::Info => "info",
        }
    }
}

/// One-shot notification shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

/// Longest toast text kept in the session, in characters.
const MAX_TOAST_CHARS: usize = 300;

pub fn set_toast(session: &Session, kind: ToastKind, message: impl Into<String>) {
    let mut message = message.into();
    if let Some((cut, _)) = message.char_indices().nth(MAX_TOAST_CHARS) {
        message.truncate(cut);
    }
    let toast = Toast { kind, message };
    if let Err(e) = session.insert(TOAST_KEY, &toast) {
        log::warn!("Failed to store toast in session: {e}");
    }
}

pub fn take_toast(session: &Session) -> Option<Toast> {
    let toast = session.get::<Toast>(TOAST_KEY).unwrap_or(None);
    if toast.is_some() {
        session.remove(TOAST_KEY);
    }
    toast
}
