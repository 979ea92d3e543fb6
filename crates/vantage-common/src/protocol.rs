//! Wire protocol between endpoints and the broker. Every frame is a JSON
//! text message tagged by `type`. Handshake payloads are opaque to the
//! broker and relayed verbatim; only the envelope is validated.

use serde::{Deserialize, Serialize};

/// Frames an endpoint sends to the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Create a new session; the sender becomes its host.
    CreateSession,

    /// Join an existing session as the viewer.
    #[serde(rename_all = "camelCase")]
    JoinSession { session_id: String },

    /// SDP offer, host -> viewer.
    #[serde(rename_all = "camelCase")]
    HandshakeOffer {
        session_id: String,
        offer: serde_json::Value,
    },

    /// SDP answer, viewer -> host.
    #[serde(rename_all = "camelCase")]
    HandshakeAnswer {
        session_id: String,
        answer: serde_json::Value,
    },

    /// ICE candidate, either participant -> the other.
    #[serde(rename_all = "camelCase")]
    HandshakeCandidate {
        session_id: String,
        candidate: serde_json::Value,
    },

    /// Input event, viewer -> host only.
    #[serde(rename_all = "camelCase")]
    RemoteControl {
        session_id: String,
        command: ControlCommand,
    },
}

/// Typed input events carried inside `remote-control` frames. The broker
/// never executes these; it only relays them to the session host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ControlCommand {
    MouseMove {
        x: i32,
        y: i32,
    },
    MouseClick {
        button: MouseButton,
        #[serde(default)]
        double: bool,
    },
    MouseScroll {
        #[serde(rename = "deltaY")]
        delta_y: f64,
    },
    KeyPress {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(rename = "isSpecial", default)]
        is_special: bool,
    },
    KeyRelease {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
    KeyCombo {
        keys: Vec<String>,
    },
    ExecuteCommand {
        command: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Frames the broker sends to endpoints. Relayed handshake and
/// remote-control traffic arrives as the sender's original
/// [`ClientMessage`] JSON instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Reply to `create-session`.
    #[serde(rename_all = "camelCase")]
    SessionCreated { session_id: String },

    /// Reply to a successful `join-session`.
    #[serde(rename_all = "camelCase")]
    SessionJoined { session_id: String },

    /// Told to the host when a viewer joins.
    #[serde(rename_all = "camelCase")]
    PeerJoined { session_id: String },

    /// Told to the surviving participant when the other side disconnects.
    #[serde(rename_all = "camelCase")]
    PeerDisconnected { session_id: String },

    Error { message: String },
}
