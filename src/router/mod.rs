pub mod activity;
pub mod container;
pub mod image;
pub mod public;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::config::{Config, CorsConfig};
use crate::container::lifecycle::LifecycleManager;
use crate::container::power::PowerManager;
use crate::image::ImageManager;
use crate::websocket::{self, EventHub, WebSocketState};

/// Shared components every route is built from
#[derive(Clone)]
pub struct AppComponents {
    pub event_hub: Arc<EventHub>,
    pub lifecycle: Arc<LifecycleManager>,
    pub power: Arc<PowerManager>,
    pub images: Arc<ImageManager>,
}

pub fn app_router(components: AppComponents, config: &Config) -> Router {
    let ws_state = WebSocketState {
        event_hub: components.event_hub.clone(),
        lifecycle: components.lifecycle.clone(),
        settings: config.live.clone(),
    };

    // WebSocket route
    let ws_routes = Router::new()
        .route("/ws", get(websocket::ws_handler))
        .with_state(ws_state);

    public::public_router(config.get_version().to_string())
        .merge(container::container_router(components.lifecycle, components.power))
        .merge(image::image_router(components.images))
        .merge(activity::activity_router(components.event_hub))
        .merge(ws_routes)
        .layer(cors_layer(&config.cors))
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    if cors.allowed_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
