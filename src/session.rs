//! Room session
//!
//! Bridges one WebSocket connection to one room: credential handshake,
//! then a read loop feeding the room and a write task draining the
//! session's mailbox.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::member::{Identity, Member};
use crate::message::{Credentials, Envelope};
use crate::room::{Origin, RoomHandle};
use crate::service::ChatService;

/// Run a session until the connection ends or the room drops it
pub async fn run_session(
    mut ws: WebSocketStream<TcpStream>,
    room: RoomHandle,
    service: &ChatService,
) -> Result<(), AppError> {
    let result = tokio::time::timeout(service.handshake_timeout(), handshake(&mut ws, service))
        .await
        .unwrap_or(Err(AppError::HandshakeTimeout));
    let identity = match result {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Rejecting session for room {}: {}", room.name(), e);
            let _ = ws.close(None).await;
            return Err(e);
        }
    };

    let (member, mut mailbox) = Member::new(identity.clone(), service.mailbox_capacity());
    let origin = Origin {
        session: member.id,
        user: identity.id,
    };
    room.register(member)?;

    info!(
        "Session {} started for {} in room {}",
        origin.session,
        identity.display_name,
        room.name()
    );

    let (mut ws_sender, mut ws_receiver) = ws.split();

    // Spawn write task (mailbox -> WebSocket)
    let mut write_task = tokio::spawn(async move {
        while let Some(envelope) = mailbox.recv().await {
            match serde_json::to_string(envelope.as_ref()) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize envelope: {}", e);
                }
            }
        }

        // Mailbox closed: removed from the room, or the room is gone
        let _ = ws_sender.close().await;
    });

    // Read loop (WebSocket -> room)
    let read_loop = async {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match serde_json::from_str::<Envelope>(&text) {
                    Ok(envelope) => {
                        room.dispatch(origin, envelope.stamped(&identity.display_name));
                    }
                    Err(e) => {
                        warn!("Invalid envelope from {}: {}", origin.session, e);
                    }
                },
                Ok(Message::Close(_)) => {
                    debug!("Session {} sent close frame", origin.session);
                    break;
                }
                Ok(_) => {
                    // Ping/pong handled by tungstenite, binary ignored
                }
                Err(e) => {
                    debug!("WebSocket error for {}: {}", origin.session, e);
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = read_loop => {
            debug!("Read loop completed for {}", origin.session);
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", origin.session);
        }
    }

    // Always leave the room, whatever ended the session
    room.unregister(origin.session);

    info!("Session {} ended", origin.session);
    Ok(())
}

/// Read the credential frame and authenticate it
async fn handshake(
    ws: &mut WebSocketStream<TcpStream>,
    service: &ChatService,
) -> Result<Identity, AppError> {
    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(text) => {
                let credentials: Credentials = serde_json::from_str(&text)?;
                return service.authenticate(&credentials.token).await;
            }
            Message::Close(_) => break,
            _ => continue,
        }
    }
    Err(AppError::HandshakeAborted)
}
