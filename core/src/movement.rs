use serde::{Deserialize, Serialize};

use crate::*;

/// Which movement controller drives the player.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MovementMode {
    /// Discrete step commands.
    #[default]
    Buttons,
    /// External continuous position feed.
    Geo,
}

impl MovementMode {
    /// Interprets the optional start-up parameter, anything unrecognized means
    /// manual movement.
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("geo") || value.eq_ignore_ascii_case("geolocation") => {
                Self::Geo
            }
            _ => Self::Buttons,
        }
    }
}

/// Identifies one subscription to a position feed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchId(pub u32);

/// External source of continuous position updates. Updates are delivered by
/// the host to [`Session::on_feed_position`] tagged with the id returned from
/// [`PositionFeed::watch`].
pub trait PositionFeed {
    fn watch(&mut self) -> Result<WatchId>;
    fn clear_watch(&mut self, id: WatchId);
}

impl<F: PositionFeed + ?Sized> PositionFeed for &mut F {
    fn watch(&mut self) -> Result<WatchId> {
        (**self).watch()
    }

    fn clear_watch(&mut self, id: WatchId) {
        (**self).clear_watch(id)
    }
}

/// Feed for hosts without any position source.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoPositionFeed;

impl PositionFeed for NoPositionFeed {
    fn watch(&mut self) -> Result<WatchId> {
        Err(GameError::PositionUnavailable("no position source".into()))
    }

    fn clear_watch(&mut self, _id: WatchId) {}
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ManualMovement {
    grid: GridMapper,
}

impl ManualMovement {
    pub const fn new(grid: GridMapper) -> Self {
        Self { grid }
    }

    /// Position one cell away, along a single axis.
    pub fn step(&self, position: LatLng, direction: Direction) -> LatLng {
        self.grid.step_position(position, direction)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct LiveFeedMovement {
    watch: Option<WatchId>,
}

impl LiveFeedMovement {
    pub const fn new() -> Self {
        Self { watch: None }
    }

    pub const fn watch_id(&self) -> Option<WatchId> {
        self.watch
    }

    /// Whether an update from `id` belongs to the running subscription.
    pub fn accepts(&self, id: WatchId) -> bool {
        self.watch == Some(id)
    }
}

/// The active movement controller.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Movement {
    Manual(ManualMovement),
    LiveFeed(LiveFeedMovement),
}

impl Movement {
    pub fn for_mode(mode: MovementMode, grid: GridMapper) -> Self {
        match mode {
            MovementMode::Buttons => Self::Manual(ManualMovement::new(grid)),
            MovementMode::Geo => Self::LiveFeed(LiveFeedMovement::new()),
        }
    }

    pub const fn mode(&self) -> MovementMode {
        match self {
            Self::Manual(_) => MovementMode::Buttons,
            Self::LiveFeed(_) => MovementMode::Geo,
        }
    }

    pub fn start<F: PositionFeed + ?Sized>(&mut self, feed: &mut F) -> Result<()> {
        match self {
            Self::Manual(_) => Ok(()),
            Self::LiveFeed(live) => {
                if live.watch.is_none() {
                    let id = feed.watch()?;
                    log::debug!("watching position feed ({:?})", id);
                    live.watch = Some(id);
                }
                Ok(())
            }
        }
    }

    /// Releases any subscription before returning, later updates from it are
    /// no longer accepted.
    pub fn stop<F: PositionFeed + ?Sized>(&mut self, feed: &mut F) {
        if let Self::LiveFeed(live) = self {
            if let Some(id) = live.watch.take() {
                feed.clear_watch(id);
                log::debug!("stopped watching position feed ({:?})", id);
            }
        }
    }

    pub fn accepts(&self, id: WatchId) -> bool {
        match self {
            Self::Manual(_) => false,
            Self::LiveFeed(live) => live.accepts(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingFeed {
        next: u32,
        active: Vec<WatchId>,
        unavailable: bool,
    }

    impl PositionFeed for CountingFeed {
        fn watch(&mut self) -> Result<WatchId> {
            if self.unavailable {
                return Err(GameError::PositionUnavailable("denied".into()));
            }
            self.next += 1;
            let id = WatchId(self.next);
            self.active.push(id);
            Ok(id)
        }

        fn clear_watch(&mut self, id: WatchId) {
            self.active.retain(|&active| active != id);
        }
    }

    #[test]
    fn mode_param_recognizes_geo_spellings() {
        assert_eq!(MovementMode::from_param(Some("geo")), MovementMode::Geo);
        assert_eq!(MovementMode::from_param(Some("Geolocation")), MovementMode::Geo);
        assert_eq!(MovementMode::from_param(Some("buttons")), MovementMode::Buttons);
        assert_eq!(MovementMode::from_param(Some("gps")), MovementMode::Buttons);
        assert_eq!(MovementMode::from_param(None), MovementMode::Buttons);
    }

    #[test]
    fn mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MovementMode::Geo).unwrap(), r#""geo""#);
        assert_eq!(serde_json::to_string(&MovementMode::Buttons).unwrap(), r#""buttons""#);
    }

    #[test]
    fn manual_step_moves_exactly_one_step() {
        let manual = ManualMovement::new(GridMapper::default());
        let start = LatLng::new(1.0, 1.0);

        assert_eq!(manual.step(start, Direction::North), LatLng::new(1.0 + 1e-4, 1.0));
        assert_eq!(manual.step(start, Direction::West), LatLng::new(1.0, 1.0 - 1e-4));
    }

    #[test]
    fn live_feed_subscribes_and_unsubscribes() {
        let mut feed = CountingFeed::default();
        let mut movement = Movement::for_mode(MovementMode::Geo, GridMapper::default());

        movement.start(&mut feed).unwrap();
        assert!(movement.accepts(WatchId(1)));
        assert_eq!(feed.active, vec![WatchId(1)]);

        movement.stop(&mut feed);
        assert!(!movement.accepts(WatchId(1)));
        assert!(feed.active.is_empty());
    }

    #[test]
    fn unavailable_feed_reports_error() {
        let mut feed = CountingFeed {
            unavailable: true,
            ..Default::default()
        };
        let mut movement = Movement::for_mode(MovementMode::Geo, GridMapper::default());

        assert!(matches!(
            movement.start(&mut feed),
            Err(GameError::PositionUnavailable(_))
        ));
        assert!(!movement.accepts(WatchId(0)));
    }

    #[test]
    fn manual_never_accepts_feed_updates() {
        let mut movement = Movement::for_mode(MovementMode::Buttons, GridMapper::default());
        movement.start(&mut NoPositionFeed).unwrap();

        assert!(!movement.accepts(WatchId(0)));
        assert_eq!(movement.mode(), MovementMode::Buttons);
    }
}
