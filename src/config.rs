use actix_web::cookie::Key;

/// Connection settings for the CRM REST backend.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

/// Runtime configuration, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub bind_addr: String,
    pub session_key: Option<String>,
    pub cookie_secure: bool,
    pub static_dir: String,
}

const DEFAULT_API_URL: &str = "http://127.0.0.1:3001/api";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MIN_SESSION_KEY_LEN: usize = 64;

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let timeout_secs = match get("FUNNEL_API_TIMEOUT_SECS").map(|v| v.parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => secs,
            Some(_) => {
                log::warn!("Invalid FUNNEL_API_TIMEOUT_SECS, using {DEFAULT_TIMEOUT_SECS}s");
                DEFAULT_TIMEOUT_SECS
            }
            None => DEFAULT_TIMEOUT_SECS,
        };

        Self {
            api: ApiConfig {
                base_url: get("FUNNEL_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
                token: get("FUNNEL_API_TOKEN"),
                timeout_secs,
            },
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            session_key: get("SESSION_KEY"),
            cookie_secure: get("COOKIE_SECURE").is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
            static_dir: get("STATIC_DIR").unwrap_or_else(|| "./static".to_string()),
        }
    }

    /// Session encryption key from SESSION_KEY, or a random one (sessions lost on restart).
    pub fn session_key(&self) -> Key {
        match &self.session_key {
            Some(val) if val.len() >= MIN_SESSION_KEY_LEN => {
                log::info!("Using SESSION_KEY from environment");
                Key::from(val.as_bytes())
            }
            Some(val) => {
                log::warn!(
                    "SESSION_KEY too short ({} bytes, need {MIN_SESSION_KEY_LEN}+), generating random key",
                    val.len()
                );
                Key::generate()
            }
            None => {
                log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
                Key::generate()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let c = config(&[]);
        assert_eq!(c.api.base_url, DEFAULT_API_URL);
        assert_eq!(c.api.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(c.api.token, None);
        assert_eq!(c.bind_addr, "127.0.0.1:8080");
        assert!(!c.cookie_secure);
    }

    #[test]
    fn invalid_timeout_falls_back() {
        assert_eq!(config(&[("FUNNEL_API_TIMEOUT_SECS", "soon")]).api.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config(&[("FUNNEL_API_TIMEOUT_SECS", "0")]).api.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config(&[("FUNNEL_API_TIMEOUT_SECS", "3")]).api.timeout_secs, 3);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let c = config(&[("FUNNEL_API_TOKEN", "  "), ("COOKIE_SECURE", "true")]);
        assert_eq!(c.api.token, None);
        assert!(c.cookie_secure);
    }
}
