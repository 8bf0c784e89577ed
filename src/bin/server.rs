use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use rand::rngs::StdRng;
use rand::SeedableRng;
use routle_rust_server::config::ServerConfig;
use routle_rust_server::constants::SESSION_SWEEP_INTERVAL_SECS;
use routle_rust_server::geocoder::{GeoNamesClient, Geocoder};
use routle_rust_server::map_registry::{MapRegistry, MapRegistryError};
use routle_rust_server::server_protocol::{
    error_body, GuessRequest, MapListResponse, RadiusRequest, StartGameRequest, StartGameResponse,
};
use routle_rust_server::server_utils::is_valid_game_id;
use routle_rust_server::session::{GameSession, GuessError, SessionError, SessionRegistry};
use serde_json::json;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type SharedState = Arc<AppState>;

struct AppState {
    maps: MapRegistry,
    geocoder: Arc<dyn Geocoder>,
    geocoder_timeout: Duration,
    sessions: SessionRegistry,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("routle_rust_server=info,server=info")),
        )
        .init();

    let config = ServerConfig::from_env();

    // Without maps there is nothing to play; refuse to start.
    let maps = MapRegistry::load(&config.map_list_path).with_context(|| {
        format!(
            "failed to load map list from {}",
            config.map_list_path.display()
        )
    })?;

    let geocoder: Arc<dyn Geocoder> = Arc::new(GeoNamesClient::new(
        &config.geonames_base_url,
        &config.geonames_username,
        config.city_pool_size,
    ));

    let state = Arc::new(AppState {
        maps,
        geocoder,
        geocoder_timeout: config.geocoder_timeout,
        sessions: SessionRegistry::new(config.session_idle_ttl, config.finished_session_ttl),
    });

    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            sweeper.sessions.sweep().await;
        }
    });

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/maps", get(maps_handler))
        .route("/api/games", post(start_game_handler))
        .route(
            "/api/games/{id}",
            get(snapshot_handler).delete(end_game_handler),
        )
        .route("/api/games/{id}/guess", post(guess_handler))
        .route("/api/games/{id}/radius", put(radius_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir(config.static_dir.as_ref()) {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.display(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        warn!("static file root not found; serving the API only");
        app
    };
    let app = app.layer(TraceLayer::new_for_http());

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    info!(port = config.port, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn resolve_static_dir(configured: Option<&PathBuf>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.join("index.html").is_file() {
            return Some(path.clone());
        }
    }

    let candidates = [PathBuf::from("dist/client"), PathBuf::from("out")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn maps_handler(State(state): State<SharedState>) -> impl IntoResponse {
    Json(MapListResponse {
        maps: state.maps.maps().to_vec(),
    })
}

async fn start_game_handler(
    State(state): State<SharedState>,
    payload: Result<Json<StartGameRequest>, JsonRejection>,
) -> Response {
    let request = match json_body(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let map = match state.maps.get(&request.map) {
        Ok(map) => map.clone(),
        Err(error @ MapRegistryError::UnknownMap(_)) => {
            return error_response(StatusCode::NOT_FOUND, &error.to_string());
        }
        Err(error) => {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &error.to_string());
        }
    };

    let mut rng = StdRng::from_os_rng();
    let started = GameSession::start(
        state.sessions.next_id(),
        map,
        state.geocoder.clone(),
        state.geocoder_timeout,
        &mut rng,
    )
    .await;
    let session = match started {
        Ok(session) => state.sessions.insert(session).await,
        Err(error) => {
            warn!(map = %request.map, error = %error, "failed to start game");
            return error_response(session_error_status(&error), &error.to_string());
        }
    };

    let body = StartGameResponse {
        game_id: session.id.clone(),
        started_at: session.started_at_iso(),
        start_city: session.start_city.clone(),
        end_city: session.end_city.clone(),
        snapshot: session.snapshot().await,
    };
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn snapshot_handler(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let Some(session) = find_session(&state, &id).await else {
        return unknown_game();
    };
    Json(session.snapshot().await).into_response()
}

async fn end_game_handler(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    if !is_valid_game_id(&id) {
        return unknown_game();
    }
    match state.sessions.remove(&id).await {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => unknown_game(),
    }
}

async fn guess_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<GuessRequest>, JsonRejection>,
) -> Response {
    let request = match json_body(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let Some(session) = find_session(&state, &id).await else {
        return unknown_game();
    };
    match session.submit_guess(&request.query, request.viewport).await {
        Ok(report) => Json(report).into_response(),
        Err(error) => error_response(guess_error_status(&error), &error.to_string()),
    }
}

async fn radius_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<RadiusRequest>, JsonRejection>,
) -> Response {
    let request = match json_body(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let Some(session) = find_session(&state, &id).await else {
        return unknown_game();
    };
    let Some(update) = request.into_update() else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "send exactly one of radius or modifier",
        );
    };
    match session.update_radius(update).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(error) => error_response(guess_error_status(&error), &error.to_string()),
    }
}

async fn find_session(state: &AppState, id: &str) -> Option<Arc<GameSession>> {
    if !is_valid_game_id(id) {
        return None;
    }
    state.sessions.get(id).await
}

fn session_error_status(error: &SessionError) -> StatusCode {
    match error {
        SessionError::Geocoder(_) => StatusCode::BAD_GATEWAY,
        SessionError::GeocoderTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        SessionError::NotEnoughCities(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn guess_error_status(error: &GuessError) -> StatusCode {
    match error {
        GuessError::EmptyQuery
        | GuessError::QueryTooLong(_)
        | GuessError::InvalidViewport
        | GuessError::InvalidModifier
        | GuessError::Engine(_) => StatusCode::BAD_REQUEST,
        GuessError::Geocoder(_) => StatusCode::BAD_GATEWAY,
        GuessError::GeocoderTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        GuessError::Cancelled => StatusCode::GONE,
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| error_response(StatusCode::BAD_REQUEST, &rejection.body_text()))
}

fn unknown_game() -> Response {
    error_response(StatusCode::NOT_FOUND, "unknown game")
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(error_body(message))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::Request;
    use routle_rust_server::engine::EngineError;
    use routle_rust_server::geocoder::GeocoderError;
    use serde_json::Value;

    async fn extract_guess(content_type: Option<&str>, body: &str) -> Response {
        let mut builder = Request::builder().method("POST").uri("/api/games/x/guess");
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        let request = builder
            .body(Body::from(body.to_string()))
            .expect("request builds");
        let payload = Json::<GuessRequest>::from_request(request, &()).await;
        match json_body(payload) {
            Ok(request) => panic!("unexpected body {request:?}"),
            Err(response) => response,
        }
    }

    async fn error_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        serde_json::from_slice(&bytes).expect("error body is json")
    }

    #[tokio::test]
    async fn malformed_json_gets_error_body() {
        let response = extract_guess(Some("application/json"), r#"{"query":"#).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = error_json(response).await;
        assert_eq!(body["type"], "error");
        assert!(body["message"].as_str().is_some_and(|text| !text.is_empty()));
    }

    #[tokio::test]
    async fn missing_fields_and_content_type_get_error_body() {
        let response = extract_guess(Some("application/json"), r#"{"query":"Lund"}"#).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_json(response).await["type"], "error");

        let response = extract_guess(None, r#"{"query":"Lund"}"#).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_json(response).await["type"], "error");
    }

    #[test]
    fn guess_errors_map_to_http_status() {
        assert_eq!(
            guess_error_status(&GuessError::EmptyQuery),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            guess_error_status(&GuessError::QueryTooLong(64)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            guess_error_status(&GuessError::Engine(EngineError::GameOver)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            guess_error_status(&GuessError::Geocoder(GeocoderError::Network(
                "down".to_string()
            ))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            guess_error_status(&GuessError::GeocoderTimeout(Duration::from_secs(1))),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(guess_error_status(&GuessError::Cancelled), StatusCode::GONE);
    }

    #[test]
    fn session_errors_map_to_http_status() {
        assert_eq!(
            session_error_status(&SessionError::NotEnoughCities("x".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            session_error_status(&SessionError::GeocoderTimeout(Duration::from_secs(1))),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
