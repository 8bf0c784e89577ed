use thiserror::Error;

use crate::coords::{points_within_radius, to_city_point};
use crate::resolver::ResolveOutcome;
use crate::types::{CityPoint, GameSnapshot, GeoCity, GuessEvent, MapConfig, Viewport};

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("search radius must be a positive finite number, got {0}")]
    InvalidRadius(f64),
    #[error("game is already won")]
    GameOver,
    #[error("map '{name}' is not playable: {reason}")]
    InvalidMap { name: String, reason: &'static str },
}

#[derive(Clone, Debug)]
pub struct GameEngine {
    pub map: MapConfig,

    current_point: CityPoint,
    end_point: CityPoint,
    past_points: Vec<CityPoint>,
    far_points: Vec<CityPoint>,
    search_radius: f64,
    has_won: bool,
    guess_count: u32,
}

impl GameEngine {
    pub fn new(map: MapConfig, start: &GeoCity, end: &GeoCity) -> Result<Self, EngineError> {
        map.check().map_err(|reason| EngineError::InvalidMap {
            name: map.name.clone(),
            reason,
        })?;
        let current_point = to_city_point(&map.bounds, start);
        let end_point = to_city_point(&map.bounds, end);
        let search_radius = map.search_radius;
        Ok(Self {
            map,
            current_point,
            end_point,
            past_points: Vec::new(),
            far_points: Vec::new(),
            search_radius,
            has_won: false,
            guess_count: 0,
        })
    }

    pub fn current_point(&self) -> &CityPoint {
        &self.current_point
    }

    pub fn end_point(&self) -> &CityPoint {
        &self.end_point
    }

    pub fn past_points(&self) -> &[CityPoint] {
        &self.past_points
    }

    pub fn far_points(&self) -> &[CityPoint] {
        &self.far_points
    }

    pub fn search_radius(&self) -> f64 {
        self.search_radius
    }

    pub fn has_won(&self) -> bool {
        self.has_won
    }

    pub fn guess_count(&self) -> u32 {
        self.guess_count
    }

    pub fn set_search_radius(&mut self, radius: f64) -> Result<(), EngineError> {
        if self.has_won {
            return Err(EngineError::GameOver);
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(EngineError::InvalidRadius(radius));
        }
        self.search_radius = radius;
        Ok(())
    }

    /// Sets the radius relative to the map's configured base radius.
    pub fn scale_search_radius(&mut self, modifier: f64) -> Result<(), EngineError> {
        self.set_search_radius(self.map.search_radius * modifier)
    }

    /// Applies one resolved guess. `radius` is the value captured when the
    /// guess started, in the pixel space of `viewport`.
    pub fn apply_guess(
        &mut self,
        outcome: ResolveOutcome,
        viewport: Viewport,
        radius: f64,
    ) -> GuessEvent {
        if self.has_won {
            return GuessEvent::Ignored;
        }
        self.guess_count += 1;

        let (candidate, end_candidate) = match outcome {
            ResolveOutcome::NoMatch { query } => return GuessEvent::NoMatch { query },
            ResolveOutcome::AlreadyHere { query } => return GuessEvent::AlreadyHere { query },
            ResolveOutcome::Selected {
                candidate,
                end_candidate,
            } => (candidate, end_candidate),
        };

        if end_candidate
            && points_within_radius(&self.end_point, &self.current_point, viewport, radius)
        {
            let end_point = self.end_point.clone();
            self.move_to(end_point.clone());
            self.has_won = true;
            return GuessEvent::Won {
                city: end_point,
                cities_visited: self.past_points.len(),
            };
        }

        if points_within_radius(&candidate, &self.current_point, viewport, radius) {
            self.move_to(candidate.clone());
            GuessEvent::Moved { city: candidate }
        } else {
            self.far_points.push(candidate.clone());
            GuessEvent::TooFar { city: candidate }
        }
    }

    fn move_to(&mut self, next: CityPoint) {
        let previous = std::mem::replace(&mut self.current_point, next);
        self.past_points.push(previous);
        self.far_points.clear();
    }

    pub fn build_snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            map_name: self.map.name.clone(),
            current_point: self.current_point.clone(),
            end_point: self.end_point.clone(),
            past_points: self.past_points.clone(),
            far_points: self.far_points.clone(),
            search_radius: self.search_radius,
            base_search_radius: self.map.search_radius,
            has_won: self.has_won,
            guess_count: self.guess_count,
            cities_visited: self.has_won.then_some(self.past_points.len()),
        }
    }
}
