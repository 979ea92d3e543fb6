use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle for one live connection, minted by the registry.
///
/// Session state only ever refers to connections through this type;
/// transport-level identifiers (socket addresses, stream handles) never
/// leak into the session table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Generate a short human-shareable session token: the first hyphenated
/// segment of a v4 UUID (8 hex chars).
pub fn new_session_token() -> String {
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    format!(
        "{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3]
    )
}
