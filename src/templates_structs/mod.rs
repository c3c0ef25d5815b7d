// Template context structures for askama templates.

pub mod funnel;

pub use funnel::*;

use actix_session::Session;

use crate::session::csrf;
use crate::session::flash::take_toast;

/// Context shared by every public funnel page.
/// Templates access these as `page.title`, `page.csrf_token`, etc.
pub struct FunnelPage {
    pub title: String,
    pub base_path: String,
    pub csrf_token: String,
    pub toast_kind: String,
    pub toast_message: String,
}

impl FunnelPage {
    /// Consumes the pending toast, so build it once per rendered page.
    pub fn build(session: &Session, title: &str, base_path: &str) -> Self {
        let csrf_token = csrf::get_or_create_token(session);
        let (toast_kind, toast_message) = match take_toast(session) {
            Some(t) => (t.kind.as_str().to_string(), t.message),
            None => (String::new(), String::new()),
        };
        Self {
            title: title.to_string(),
            base_path: base_path.to_string(),
            csrf_token,
            toast_kind,
            toast_message,
        }
    }
}
