//! WebSocket connection handler
//!
//! Handles individual TCP connections: WebSocket handshake with routing on
//! the request path, then hands the socket to a room session or serves
//! admin requests on it.
//!
//! Routes:
//! - `/chat/join/{name}`: room session (404 if the room does not exist)
//! - `/chat/admin`: create / close / list rooms

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::message::{AdminRequest, AdminResponse};
use crate::room::RoomHandle;
use crate::service::ChatService;
use crate::session::run_session;

const JOIN_PREFIX: &str = "/chat/join/";
const ADMIN_PATH: &str = "/chat/admin";

/// Where an accepted connection goes
#[derive(Debug)]
enum Endpoint {
    Join(RoomHandle),
    Admin,
}

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake, resolving the route before the
/// upgrade completes so unknown rooms are refused with a plain 404.
pub async fn handle_connection(
    stream: TcpStream,
    service: Arc<ChatService>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    let mut endpoint = None;
    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
        route(&service, req.uri().path()).map(|found| {
            endpoint = Some(found);
            resp
        })
    })
    .await?;

    match endpoint {
        Some(Endpoint::Join(room)) => {
            info!("{} joining room {}", peer_addr, room.name());
            run_session(ws_stream, room, &service).await
        }
        Some(Endpoint::Admin) => {
            info!("{} opened admin connection", peer_addr);
            serve_admin(ws_stream, &service).await
        }
        None => Ok(()),
    }
}

/// Map a request path to an endpoint, or to the HTTP rejection to send
fn route(service: &ChatService, path: &str) -> Result<Endpoint, ErrorResponse> {
    if path == ADMIN_PATH {
        return Ok(Endpoint::Admin);
    }

    let Some(name) = path.strip_prefix(JOIN_PREFIX) else {
        return Err(rejection(StatusCode::NOT_FOUND, "not found"));
    };

    match service.join(name) {
        Ok(room) => Ok(Endpoint::Join(room)),
        Err(e) => {
            warn!("Join refused: {}", e);
            Err(rejection(StatusCode::NOT_FOUND, "room not found"))
        }
    }
}

fn rejection(status: StatusCode, message: &str) -> ErrorResponse {
    let mut resp = ErrorResponse::new(Some(message.to_string()));
    *resp.status_mut() = status;
    resp
}

/// Serve admin requests until the client disconnects
async fn serve_admin(
    ws_stream: WebSocketStream<TcpStream>,
    service: &ChatService,
) -> Result<(), AppError> {
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    while let Some(msg_result) = ws_receiver.next().await {
        let text = match msg_result? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let response = match serde_json::from_str::<AdminRequest>(&text) {
            Ok(request) => execute(service, request).await,
            Err(e) => AppError::from(e).into(),
        };

        let json = serde_json::to_string(&response)?;
        ws_sender.send(Message::Text(json.into())).await?;
    }

    Ok(())
}

async fn execute(service: &ChatService, request: AdminRequest) -> AdminResponse {
    let result = match request {
        AdminRequest::CreateRoom { name, token } => service
            .create_room(&token, &name)
            .await
            .map(|_| AdminResponse::RoomCreated { name }),
        AdminRequest::CloseRoom { name, token } => service
            .close_room(&token, &name)
            .await
            .map(|_| AdminResponse::RoomClosed { name }),
        AdminRequest::ListRooms => Ok(AdminResponse::Rooms {
            names: service.list_rooms(),
        }),
    };

    result.unwrap_or_else(|e| {
        debug!("Admin request failed: {}", e);
        e.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticUserChecker;
    use crate::config::ChatConfig;

    fn service() -> ChatService {
        let checker = StaticUserChecker::default().with_user("owner", 42, "Owner");
        ChatService::new(&ChatConfig::default(), Arc::new(checker)).unwrap()
    }

    #[tokio::test]
    async fn test_route_join_existing_room() {
        let service = service();
        match route(&service, "/chat/join/general") {
            Ok(Endpoint::Join(room)) => assert_eq!(room.name().as_str(), "general"),
            other => panic!("unexpected route: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_route_rejections() {
        let service = service();

        let resp = route(&service, "/chat/join/missing").unwrap_err();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = route(&service, "/somewhere/else").unwrap_err();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_route_admin() {
        let service = service();
        assert!(matches!(route(&service, "/chat/admin"), Ok(Endpoint::Admin)));
    }

    #[tokio::test]
    async fn test_execute_admin_requests() {
        let service = service();

        let resp = execute(
            &service,
            AdminRequest::CreateRoom {
                name: "lobby1".to_string(),
                token: "owner".to_string(),
            },
        )
        .await;
        assert!(matches!(resp, AdminResponse::RoomCreated { ref name } if name == "lobby1"));

        match execute(&service, AdminRequest::ListRooms).await {
            AdminResponse::Rooms { names } => assert_eq!(names, vec!["general", "lobby1"]),
            other => panic!("unexpected response: {:?}", other),
        }

        let resp = execute(
            &service,
            AdminRequest::CloseRoom {
                name: "general".to_string(),
                token: "owner".to_string(),
            },
        )
        .await;
        assert!(matches!(
            resp,
            AdminResponse::Error {
                code: crate::message::ErrorCode::Unauthorized,
                ..
            }
        ));
    }
}
