use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed failure taxonomy for remote operations. Produced where the failure
/// happens, not reconstructed from message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Timeout,
    Auth,
    Permission,
    NotFound,
    Server,
    Validation,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::Network,
        ErrorKind::Timeout,
        ErrorKind::Auth,
        ErrorKind::Permission,
        ErrorKind::NotFound,
        ErrorKind::Server,
        ErrorKind::Validation,
        ErrorKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Auth => "auth",
            ErrorKind::Permission => "permission",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Server => "server",
            ErrorKind::Validation => "validation",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Whether another attempt within the same pass can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::Timeout | ErrorKind::Server)
    }

    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorKind::Auth,
            403 => ErrorKind::Permission,
            404 | 410 => ErrorKind::NotFound,
            408 | 504 => ErrorKind::Timeout,
            400 | 409 | 422 => ErrorKind::Validation,
            429 => ErrorKind::Network,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Unknown,
        }
    }

    /// Best-effort bucket for messages that arrive without a kind, e.g. errors
    /// persisted by older builds.
    pub fn classify_text(message: &str) -> Self {
        let text = message.to_ascii_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|needle| text.contains(needle));

        if has(&["timeout", "timed out", "deadline"]) {
            ErrorKind::Timeout
        } else if has(&[
            "unauthorized",
            "401",
            "unauthenticated",
            "invalid token",
            "expired token",
            "token expired",
        ]) {
            ErrorKind::Auth
        } else if has(&["forbidden", "403", "permission", "denied"]) {
            ErrorKind::Permission
        } else if has(&["not found", "404", "no such"]) {
            ErrorKind::NotFound
        } else if has(&["validation", "invalid", "422", "required", "missing field"]) {
            ErrorKind::Validation
        } else if has(&["500", "502", "503", "internal server", "server error"]) {
            ErrorKind::Server
        } else if has(&["network", "connection", "offline", "dns", "unreachable", "fetch"]) {
            ErrorKind::Network
        } else {
            ErrorKind::Unknown
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown error kind: {s}"))
    }
}
