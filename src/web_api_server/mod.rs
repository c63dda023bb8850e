use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use log::*;
use serde::Deserialize;
use socketioxide::extract::{Data, SocketRef};
use socketioxide::{SocketIo, TransportType};
use tower_http::cors::CorsLayer;

use crate::dispatcher::{self, subscription_cmds};
use crate::error::ErrorEnvelope;
use crate::wire::{CommandRequest, CommandResponse};
use crate::world::World;

struct AppState {
    world: Arc<World>,
}

/// `POST /api/command` — the single RPC entry point (spec.md §6). Parses the
/// envelope into a [`dispatcher::Command`] and runs it against the shared
/// `World`; both parse and dispatch failures come back as the same
/// `{"success": false, ...}` shape so callers never have to special-case a
/// malformed request versus a rejected one.
async fn command_handler(State(state): State<Arc<AppState>>, Json(request): Json<CommandRequest>) -> Json<CommandResponse> {
    let result = match dispatcher::parse_command(&request) {
        Ok(command) => dispatcher::dispatch(&state.world, command).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(data) => Json(CommandResponse::ok(data)),
        Err(err) => {
            warn!("command '{}' failed: {}", request.command, err);
            Json(CommandResponse::err(ErrorEnvelope::from(&err)))
        }
    }
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct ConnectAuth {
    character_id: String,
    #[serde(default)]
    admin_password: Option<String>,
}

/// Socket.IO connection handler (spec.md §4.4 "SubscriptionHub" transport
/// side). The client authenticates on connect by supplying `character_id`
/// (and optionally `admin_password`) as the handshake `auth` payload;
/// everything emitted for that character afterward is pushed down this
/// socket as `event_name` with the event's JSON payload, in causal order.
fn on_connect(socket: SocketRef, Data(auth): Data<ConnectAuth>, state: Arc<AppState>) {
    info!("socket connected for character '{}'", auth.character_id);

    let handle = match subscription_cmds::subscribe_my_messages(
        &state.world,
        subscription_cmds::SubscribeMyMessagesParams {
            character_id: auth.character_id.clone(),
            admin_password: auth.admin_password,
        },
    ) {
        Ok(handle) => handle,
        Err(err) => {
            warn!("rejecting socket connection for '{}': {}", auth.character_id, err);
            socket.emit("error", &ErrorEnvelope::from(&err)).ok();
            socket.disconnect().ok();
            return;
        }
    };

    let mut rx = handle.rx;
    let forward_socket = socket.clone();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if forward_socket.emit(event.event_name.clone(), &event).is_err() {
                break;
            }
        }
    });

    let world = state.world.clone();
    let character_id = auth.character_id.clone();
    socket.on_disconnect(move |_: SocketRef| {
        world.hub.unsubscribe(&character_id);
        info!("socket disconnected for character '{}'", character_id);
    });
}

pub struct WebApiServer {
    world: Arc<World>,
}

impl WebApiServer {
    pub fn new(world: Arc<World>) -> Self {
        Self { world }
    }

    pub async fn run(&self) {
        info!("Starting server");

        let (socketio_layer, io) = SocketIo::builder()
            .req_path("/api/events")
            .transports([TransportType::Websocket])
            .ping_interval(Duration::from_secs(10))
            .ping_timeout(Duration::from_secs(5))
            .build_layer();

        let shared_state = Arc::new(AppState { world: self.world.clone() });

        {
            let shared_state = shared_state.clone();
            io.ns("/", move |socket: SocketRef, data: Data<ConnectAuth>| {
                on_connect(socket, data, shared_state.clone())
            });
        }

        let app = axum::Router::new()
            .route("/api/command", post(command_handler))
            .route("/healthz", get(healthz))
            .route("/api/events", get(|| async { StatusCode::OK }).layer(socketio_layer))
            .with_state(shared_state)
            .layer(CorsLayer::permissive());

        let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
        info!("Listening on {}", listener.local_addr().unwrap());
        axum::serve(listener, app).await.unwrap();
    }
}
