//! Connection configuration: where to connect and how hard to retry.

use std::time::Duration;

use crate::identity::generate_session_id;

// ---------------------------------------------------------------------------
// ReconnectPolicy
// ---------------------------------------------------------------------------

/// Exponential backoff for automatic reconnection.
///
/// Attempt `n` (1-based) waits `base_delay * 2^(n-1)`; with the defaults
/// that is 1 s, 2 s, 4 s, 8 s, 16 s, after which the manager gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first attempt.
    pub base_delay: Duration,
    /// Number of attempts before giving up. 0 disables reconnection.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Returns the delay before `attempt`, or `None` if `attempt` is
    /// outside `1..=max_attempts`.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        Some(self.base_delay.saturating_mul(factor))
    }
}

// ---------------------------------------------------------------------------
// ConnectionConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`ConnectionManager`](crate::ConnectionManager).
///
/// The only required field is the endpoint.
///
/// ```
/// use std::time::Duration;
/// use partyline_session::{ConnectionConfig, ReconnectPolicy};
///
/// let config = ConnectionConfig::new("https://party.example.com/ws")
///     .with_reconnect(ReconnectPolicy {
///         base_delay: Duration::from_millis(500),
///         max_attempts: 3,
///     });
/// assert!(config.socket_url().starts_with("wss://party.example.com/ws?sessionId="));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Base endpoint. May be `http(s)://`, `ws(s)://`, or a bare host.
    pub endpoint: String,
    /// Session id appended to the socket URL. Random by default.
    pub session_id: String,
    /// Automatic reconnection policy.
    pub reconnect: ReconnectPolicy,
}

impl ConnectionConfig {
    /// Creates a config for `endpoint` with a fresh session id and the
    /// default reconnection policy.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            session_id: generate_session_id(),
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// Sets the reconnection policy.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Uses a fixed session id instead of a random one.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Builds the socket URL: the endpoint with its scheme mapped to a
    /// WebSocket scheme and `sessionId` appended as a query parameter.
    ///
    /// `http` → `ws`, `https` → `wss`, `ws`/`wss` unchanged, and an
    /// endpoint without a scheme defaults to `wss`. An endpoint with no
    /// path gets `/` so the request target is never empty.
    pub fn socket_url(&self) -> String {
        let endpoint = self.endpoint.trim();
        let base = if let Some(rest) = strip_scheme(endpoint, "https") {
            format!("wss://{rest}")
        } else if let Some(rest) = strip_scheme(endpoint, "http") {
            format!("ws://{rest}")
        } else if strip_scheme(endpoint, "wss").is_some()
            || strip_scheme(endpoint, "ws").is_some()
        {
            endpoint.to_string()
        } else {
            format!("wss://{endpoint}")
        };
        let base = with_root_path(base);
        let separator = if base.contains('?') { '&' } else { '?' };
        format!("{base}{separator}sessionId={}", self.session_id)
    }
}

/// Inserts `/` after the authority when `url` has no path.
fn with_root_path(mut url: String) -> String {
    let authority_start = url.find("://").map_or(0, |i| i + 3);
    let after = &url[authority_start..];
    let authority_len = after.find(['/', '?', '#']).unwrap_or(after.len());
    if !after[authority_len..].starts_with('/') {
        url.insert(authority_start + authority_len, '/');
    }
    url
}

/// Strips `<scheme>://` case-insensitively.
fn strip_scheme<'a>(url: &'a str, scheme: &str) -> Option<&'a str> {
    let (head, rest) = url.split_once("://")?;
    head.eq_ignore_ascii_case(scheme).then_some(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url_for(endpoint: &str) -> String {
        ConnectionConfig::new(endpoint)
            .with_session_id("abc")
            .socket_url()
    }

    // =====================================================================
    // socket_url()
    // =====================================================================

    #[test]
    fn test_socket_url_maps_http_to_ws() {
        assert_eq!(url_for("http://localhost:8080/ws"), "ws://localhost:8080/ws?sessionId=abc");
    }

    #[test]
    fn test_socket_url_maps_https_to_wss() {
        assert_eq!(url_for("https://example.com/ws"), "wss://example.com/ws?sessionId=abc");
    }

    #[test]
    fn test_socket_url_passes_websocket_schemes_through() {
        assert_eq!(url_for("ws://example.com"), "ws://example.com/?sessionId=abc");
        assert_eq!(url_for("wss://example.com"), "wss://example.com/?sessionId=abc");
    }

    #[test]
    fn test_socket_url_bare_host_defaults_to_wss() {
        assert_eq!(url_for("example.com/ws"), "wss://example.com/ws?sessionId=abc");
    }

    #[test]
    fn test_socket_url_scheme_is_case_insensitive() {
        assert_eq!(url_for("HTTPS://example.com"), "wss://example.com/?sessionId=abc");
    }

    #[test]
    fn test_socket_url_bare_host_without_path_gets_root() {
        assert_eq!(url_for("example.com"), "wss://example.com/?sessionId=abc");
        assert_eq!(url_for("127.0.0.1:8080"), "wss://127.0.0.1:8080/?sessionId=abc");
    }

    #[test]
    fn test_socket_url_http_host_with_port_gets_root() {
        assert_eq!(url_for("http://127.0.0.1:41985"), "ws://127.0.0.1:41985/?sessionId=abc");
    }

    #[test]
    fn test_socket_url_query_without_path_gets_root() {
        assert_eq!(
            url_for("wss://example.com?v=2"),
            "wss://example.com/?v=2&sessionId=abc"
        );
    }

    #[test]
    fn test_socket_url_appends_to_existing_query() {
        assert_eq!(
            url_for("wss://example.com/ws?v=2"),
            "wss://example.com/ws?v=2&sessionId=abc"
        );
    }

    #[test]
    fn test_new_generates_session_id() {
        let a = ConnectionConfig::new("example.com");
        let b = ConnectionConfig::new("example.com");
        assert_eq!(a.session_id.len(), 36);
        assert_ne!(a.session_id, b.session_id);
    }

    // =====================================================================
    // ReconnectPolicy::delay_for()
    // =====================================================================

    #[test]
    fn test_delay_for_default_policy_doubles_from_one_second() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u64> = (1..=5)
            .map(|n| policy.delay_for(n).unwrap().as_secs())
            .collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16]);
    }

    #[test]
    fn test_delay_for_outside_range_is_none() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(0), None);
        assert_eq!(policy.delay_for(6), None);
    }

    #[test]
    fn test_delay_for_huge_attempt_saturates() {
        let policy = ReconnectPolicy {
            base_delay: Duration::from_secs(1),
            max_attempts: u32::MAX,
        };
        assert!(policy.delay_for(200).is_some());
    }
}
