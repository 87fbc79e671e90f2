//! Authentication identity and gate outcome types.

use serde::Serialize;

use crate::jwt::Claims;

/// Identity established for a single in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Login identifier
    pub subject: String,
    /// Member identifier
    #[serde(rename = "memberId")]
    pub member_id: i64,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.subject,
            member_id: claims.member_id,
        }
    }
}

/// What the gate concluded about a request. Stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Path is on the public allow-list; no token was looked at
    Bypassed,
    /// No token was presented
    NoToken,
    Authenticated(Identity),
    /// Token is genuine but past its expiry; a refresh may succeed
    Expired,
    /// Token is forged or unreadable
    Invalid,
}

impl GateOutcome {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            GateOutcome::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }
}
