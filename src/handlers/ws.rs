//! WebSocket handler: handshake authentication, socket read/write loops, teardown.

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::handlers::http::AppState;
use crate::models::{ClientEvent, ConnectionHandle, ConnectionId, Identity, ServerEvent};
use crate::services::Session;

/// Close code sent to a connection replaced by a newer one for the same user.
const CLOSE_SUPERSEDED: u16 = 4000;

/// Query parameters for the handshake. Browsers cannot set headers on WebSocket requests.
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Upgrade HTTP to WebSocket. The credential is checked before upgrading; a rejected
/// handshake never reaches the presence registry.
pub async fn ws_handler(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    Query(params): Query<WsAuthQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let token = bearer
        .map(|TypedHeader(Authorization(b))| b.token().to_string())
        .or(params.token)
        .ok_or_else(|| AppError::Auth("Authentication token required".to_string()))?;

    let identity = state.authenticator().authenticate(&token).await?;
    info!(user_id = %identity.user_id(), "ws handshake authenticated");

    Ok(ws.on_upgrade(move |socket| handle_socket(state, socket, identity)))
}

async fn handle_socket(state: AppState, socket: WebSocket, identity: Identity) {
    let connection_id = ConnectionId::generate();
    info!(connection_id = %connection_id, user_id = %identity.user_id(), "ws connected");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let handle = ConnectionHandle::new(connection_id.clone(), tx);

    // queued first so it precedes any room traffic
    handle.deliver(ServerEvent::connection_established(connection_id, &identity));

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "failed to encode event");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
            if matches!(event, ServerEvent::SessionSuperseded) {
                let close = Message::Close(Some(CloseFrame {
                    code: CLOSE_SUPERSEDED,
                    reason: "session superseded".into(),
                }));
                if let Err(e) = sender.send(close).await {
                    debug!(error = %e, "failed to send close frame");
                }
                break;
            }
        }
    });

    let session = Session::open(state.realtime().clone(), identity, handle).await;

    // frames run to completion; the writer ending is only observed between frames
    loop {
        tokio::select! {
            _ = &mut send_task => break,
            frame = receiver.next() => match frame {
                Some(Ok(msg)) => {
                    if !dispatch(&session, msg).await {
                        break;
                    }
                }
                _ => break,
            },
        }
    }

    session.close().await;
    send_task.abort();
    info!(
        connection_id = %session.connection_id(),
        user_id = %session.identity().user_id(),
        "ws disconnected"
    );
}

/// Handle one inbound frame. Returns false when the client closed the socket.
async fn dispatch(session: &Session, msg: Message) -> bool {
    match msg {
        Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
            Ok(event) => session.handle(event).await,
            Err(e) => session.reject_frame(&e),
        },
        Message::Close(_) => return false,
        _ => {}
    }
    true
}
