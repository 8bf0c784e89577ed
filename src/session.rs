use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::constants::MAX_QUERY_CHARS;
use crate::engine::{EngineError, GameEngine};
use crate::geocoder::{Geocoder, GeocoderError};
use crate::resolver::resolve;
use crate::sampler::pick_route;
use crate::server_utils::{make_game_id, normalize_radius_modifier, sanitize_query};
use crate::types::{GameSnapshot, GeoCity, GuessEvent, GuessReport, MapConfig, Viewport};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("geocoder failed: {0}")]
    Geocoder(#[from] GeocoderError),
    #[error("geocoder timed out after {0:?}")]
    GeocoderTimeout(Duration),
    #[error("map '{0}' has fewer than two distinct cities to play between")]
    NotEnoughCities(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Error)]
pub enum GuessError {
    #[error("query is empty")]
    EmptyQuery,
    #[error("query is longer than {0} characters")]
    QueryTooLong(usize),
    #[error("viewport must have positive width and height")]
    InvalidViewport,
    #[error("radius modifier must be a positive number")]
    InvalidModifier,
    #[error("geocoder failed: {0}")]
    Geocoder(#[from] GeocoderError),
    #[error("geocoder timed out after {0:?}")]
    GeocoderTimeout(Duration),
    #[error("game was cancelled")]
    Cancelled,
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Clone, Copy, Debug)]
pub enum RadiusUpdate {
    Absolute(f64),
    Modifier(f64),
}

/// One player's game. Guesses hold the engine lock from geocoding until the
/// state transition, so concurrent guesses run one after another and each
/// sees the position left by the previous one.
pub struct GameSession {
    pub id: String,
    pub map: MapConfig,
    pub start_city: GeoCity,
    pub end_city: GeoCity,
    pub started_at: DateTime<Utc>,

    geocoder: Arc<dyn Geocoder>,
    geocoder_timeout: Duration,
    engine: Mutex<GameEngine>,
    cancelled: AtomicBool,
    finished: AtomicBool,
    last_active_ms: AtomicI64,
}

impl GameSession {
    pub async fn start<R: Rng>(
        id: String,
        map: MapConfig,
        geocoder: Arc<dyn Geocoder>,
        geocoder_timeout: Duration,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        let pool = tokio::time::timeout(geocoder_timeout, geocoder.sample_cities(&map))
            .await
            .map_err(|_| SessionError::GeocoderTimeout(geocoder_timeout))??;

        let Some(route) = pick_route(&pool, &map.bounds, rng) else {
            return Err(SessionError::NotEnoughCities(map.name.clone()));
        };
        if !route.separated {
            warn!(
                game_id = %id,
                map = %map.name,
                pool = pool.len(),
                "no end city cleared minimum separation; using farthest city"
            );
        }

        Self::with_cities(
            id,
            map,
            route.start,
            route.end,
            geocoder,
            geocoder_timeout,
        )
    }

    pub fn with_cities(
        id: String,
        map: MapConfig,
        start_city: GeoCity,
        end_city: GeoCity,
        geocoder: Arc<dyn Geocoder>,
        geocoder_timeout: Duration,
    ) -> Result<Self, SessionError> {
        let engine = GameEngine::new(map.clone(), &start_city, &end_city)?;
        info!(
            game_id = %id,
            map = %map.name,
            start = %start_city.name,
            end = %end_city.name,
            "game started"
        );
        let started_at = Utc::now();
        Ok(Self {
            id,
            map,
            start_city,
            end_city,
            started_at,
            geocoder,
            geocoder_timeout,
            engine: Mutex::new(engine),
            cancelled: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            last_active_ms: AtomicI64::new(started_at.timestamp_millis()),
        })
    }

    pub fn started_at_iso(&self) -> String {
        self.started_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            info!(game_id = %self.id, "game cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// True once the game has been won.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Time since the last guess, radius change or snapshot.
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        let last = self.last_active_ms.load(Ordering::SeqCst);
        let elapsed = now.timestamp_millis().saturating_sub(last).max(0);
        Duration::from_millis(elapsed as u64)
    }

    fn touch(&self) {
        self.last_active_ms
            .fetch_max(Utc::now().timestamp_millis(), Ordering::SeqCst);
    }

    /// Waits behind any guess in flight, so this can take up to the
    /// geocoder timeout.
    pub async fn snapshot(&self) -> GameSnapshot {
        self.touch();
        self.engine.lock().await.build_snapshot()
    }

    pub async fn submit_guess(
        &self,
        raw_query: &str,
        viewport: Viewport,
    ) -> Result<GuessReport, GuessError> {
        let query = sanitize_query(raw_query).ok_or(GuessError::EmptyQuery)?;
        if query.chars().count() > MAX_QUERY_CHARS {
            return Err(GuessError::QueryTooLong(MAX_QUERY_CHARS));
        }
        if !viewport.is_valid() {
            return Err(GuessError::InvalidViewport);
        }
        if self.is_cancelled() {
            return Err(GuessError::Cancelled);
        }
        self.touch();

        let mut engine = self.engine.lock().await;
        if engine.has_won() {
            return Ok(report(GuessEvent::Ignored, &engine));
        }
        let radius = engine.search_radius();

        let cities = tokio::time::timeout(
            self.geocoder_timeout,
            self.geocoder.search(&self.map, &query),
        )
        .await;
        let cities = match cities {
            Ok(Ok(cities)) => cities,
            Ok(Err(error)) => {
                warn!(game_id = %self.id, query = %query, error = %error, "geocoder failed");
                return Err(GuessError::Geocoder(error));
            }
            Err(_) => {
                warn!(game_id = %self.id, query = %query, "geocoder timed out");
                return Err(GuessError::GeocoderTimeout(self.geocoder_timeout));
            }
        };

        if self.is_cancelled() {
            return Err(GuessError::Cancelled);
        }

        let outcome = resolve(
            &query,
            &cities,
            &self.map,
            engine.current_point(),
            engine.end_point(),
        );
        let event = engine.apply_guess(outcome, viewport, radius);
        if engine.has_won() {
            self.finished.store(true, Ordering::SeqCst);
        }
        info!(
            game_id = %self.id,
            query = %query,
            hits = cities.len(),
            event = event.kind(),
            "guess applied"
        );
        Ok(report(event, &engine))
    }

    /// Queues behind any guess in flight like `snapshot`. The new radius
    /// applies from the next guess on.
    pub async fn update_radius(&self, update: RadiusUpdate) -> Result<GameSnapshot, GuessError> {
        if self.is_cancelled() {
            return Err(GuessError::Cancelled);
        }
        self.touch();
        let mut engine = self.engine.lock().await;
        match update {
            RadiusUpdate::Absolute(radius) => engine.set_search_radius(radius)?,
            RadiusUpdate::Modifier(raw) => {
                let modifier = normalize_radius_modifier(raw).ok_or(GuessError::InvalidModifier)?;
                engine.scale_search_radius(modifier)?
            }
        }
        Ok(engine.build_snapshot())
    }
}

fn report(event: GuessEvent, engine: &GameEngine) -> GuessReport {
    GuessReport {
        tagline: event.tagline(),
        event,
        snapshot: engine.build_snapshot(),
    }
}

/// Live games by id. Games idle longer than `idle_ttl`, or won and left
/// alone for `finished_ttl`, are cancelled and dropped by `sweep`.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<GameSession>>>,
    idle_ttl: Duration,
    finished_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration, finished_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
            finished_ttl,
        }
    }

    pub fn next_id(&self) -> String {
        make_game_id()
    }

    pub async fn insert(&self, session: GameSession) -> Arc<GameSession> {
        self.sweep().await;
        let session = Arc::new(session);
        let previous = self
            .sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }
        session
    }

    pub async fn get(&self, id: &str) -> Option<Arc<GameSession>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Removes and cancels a session; in-flight guesses on it are discarded.
    pub async fn remove(&self, id: &str) -> Option<Arc<GameSession>> {
        let removed = self.sessions.write().await.remove(id);
        if let Some(session) = &removed {
            session.cancel();
        }
        removed
    }

    pub async fn sweep(&self) -> usize {
        self.sweep_at(Utc::now()).await
    }

    /// Evicts expired sessions as of `now` and returns how many were dropped.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| {
            let ttl = if session.is_finished() {
                self.finished_ttl
            } else {
                self.idle_ttl
            };
            let keep = session.idle_for(now) < ttl;
            if !keep {
                session.cancel();
            }
            keep
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "evicted expired games");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
