//! Message router: resolves the sender's session and role, applies the
//! authorization table, and picks the peer connection a frame should be
//! relayed to. Pure pass-through — payloads are never rewritten.

use vantage_common::{BrokerError, ClientMessage, ConnectionId, Result};

use crate::session::{Role, SessionTable};

/// Relayed message kinds. Session management frames (`create-session`,
/// `join-session`) are handled before routing and never reach here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    Offer,
    Answer,
    Candidate,
    Control,
}

/// Classify a parsed frame as relayable, returning its kind and session
/// token. `None` for session management frames.
pub fn classify(msg: &ClientMessage) -> Option<(RelayKind, &str)> {
    match msg {
        ClientMessage::HandshakeOffer { session_id, .. } => Some((RelayKind::Offer, session_id)),
        ClientMessage::HandshakeAnswer { session_id, .. } => Some((RelayKind::Answer, session_id)),
        ClientMessage::HandshakeCandidate { session_id, .. } => {
            Some((RelayKind::Candidate, session_id))
        }
        ClientMessage::RemoteControl { session_id, .. } => Some((RelayKind::Control, session_id)),
        ClientMessage::CreateSession | ClientMessage::JoinSession { .. } => None,
    }
}

/// Decide where a frame goes.
///
/// `Ok(Some(target))` means relay verbatim to `target`; `Ok(None)` means
/// there is legitimately nobody to deliver to yet (e.g. an offer sent
/// before a viewer joined) and the frame is dropped silently.
pub async fn route(
    kind: RelayKind,
    token: &str,
    sender: ConnectionId,
    table: &SessionTable,
) -> Result<Option<ConnectionId>> {
    let session = table
        .lookup(token)
        .await
        .ok_or_else(|| BrokerError::SessionNotFound(token.to_string()))?;

    let role = SessionTable::role_of(&session, sender).ok_or_else(|| {
        BrokerError::UnauthorizedRole("sender is not a participant of this session".into())
    })?;

    match (kind, role) {
        (RelayKind::Offer, Role::Host) => Ok(session.viewer),
        (RelayKind::Offer, Role::Viewer) => Err(BrokerError::UnauthorizedRole(
            "handshake-offer must come from the session host".into(),
        )),

        (RelayKind::Answer, Role::Viewer) => Ok(Some(session.host)),
        (RelayKind::Answer, Role::Host) => Err(BrokerError::UnauthorizedRole(
            "handshake-answer must come from the session viewer".into(),
        )),

        (RelayKind::Candidate, Role::Host) => Ok(session.viewer),
        (RelayKind::Candidate, Role::Viewer) => Ok(Some(session.host)),

        (RelayKind::Control, Role::Viewer) => Ok(Some(session.host)),
        (RelayKind::Control, Role::Host) => Err(BrokerError::UnauthorizedRole(
            "remote control is viewer to host only".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(raw: u64) -> ConnectionId {
        ConnectionId::from_raw(raw)
    }

    async fn active_pair(table: &SessionTable) -> (String, ConnectionId, ConnectionId) {
        let host = conn(1);
        let viewer = conn(2);
        let token = table.create_session(host).await.unwrap();
        table.join_session(&token, viewer).await.unwrap();
        (token, host, viewer)
    }

    #[tokio::test]
    async fn offer_goes_host_to_viewer() {
        let table = SessionTable::new();
        let (token, host, viewer) = active_pair(&table).await;

        let target = route(RelayKind::Offer, &token, host, &table).await.unwrap();
        assert_eq!(target, Some(viewer));
    }

    #[tokio::test]
    async fn offer_from_viewer_is_unauthorized() {
        let table = SessionTable::new();
        let (token, _host, viewer) = active_pair(&table).await;

        let err = route(RelayKind::Offer, &token, viewer, &table)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::UnauthorizedRole(_)));
    }

    #[tokio::test]
    async fn offer_before_join_has_no_target() {
        let table = SessionTable::new();
        let host = conn(1);
        let token = table.create_session(host).await.unwrap();

        let target = route(RelayKind::Offer, &token, host, &table).await.unwrap();
        assert_eq!(target, None);
    }

    #[tokio::test]
    async fn answer_goes_viewer_to_host() {
        let table = SessionTable::new();
        let (token, host, viewer) = active_pair(&table).await;

        let target = route(RelayKind::Answer, &token, viewer, &table)
            .await
            .unwrap();
        assert_eq!(target, Some(host));

        let err = route(RelayKind::Answer, &token, host, &table)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::UnauthorizedRole(_)));
    }

    #[tokio::test]
    async fn candidate_goes_to_the_other_participant() {
        let table = SessionTable::new();
        let (token, host, viewer) = active_pair(&table).await;

        let from_host = route(RelayKind::Candidate, &token, host, &table)
            .await
            .unwrap();
        assert_eq!(from_host, Some(viewer));

        let from_viewer = route(RelayKind::Candidate, &token, viewer, &table)
            .await
            .unwrap();
        assert_eq!(from_viewer, Some(host));
    }

    #[tokio::test]
    async fn control_goes_viewer_to_host_only() {
        let table = SessionTable::new();
        let (token, host, viewer) = active_pair(&table).await;

        let target = route(RelayKind::Control, &token, viewer, &table)
            .await
            .unwrap();
        assert_eq!(target, Some(host));

        let err = route(RelayKind::Control, &token, host, &table)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::UnauthorizedRole(_)));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let table = SessionTable::new();
        let err = route(RelayKind::Candidate, "deadbeef", conn(1), &table)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn outsider_cannot_route_into_a_session() {
        let table = SessionTable::new();
        let (token, _host, _viewer) = active_pair(&table).await;

        let err = route(RelayKind::Candidate, &token, conn(9), &table)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::UnauthorizedRole(_)));
    }

    #[tokio::test]
    async fn classify_splits_relay_from_management() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"handshake-answer","sessionId":"s","answer":{}}"#)
                .unwrap();
        assert_eq!(classify(&msg), Some((RelayKind::Answer, "s")));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"create-session"}"#).unwrap();
        assert_eq!(classify(&msg), None);
    }
}
