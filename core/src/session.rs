use alloc::vec::Vec;

use crate::*;

/// How a cell's outcome was obtained.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// First sight of the cell, the generator decided.
    Generated(CellOutcome),
    /// The memento already held an outcome.
    Restored(CellOutcome),
}

impl Resolution {
    pub const fn outcome(self) -> CellOutcome {
        match self {
            Self::Generated(outcome) | Self::Restored(outcome) => outcome,
        }
    }

    pub const fn is_restored(self) -> bool {
        matches!(self, Self::Restored(_))
    }
}

/// A cell that entered view.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterializedCell {
    pub address: CellAddress,
    pub bounds: Bounds,
    pub resolution: Resolution,
    pub token: Option<Token>,
}

/// What the host must tear down and build after a viewport change. Removals
/// are to be applied before additions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewportUpdate {
    pub removed: Vec<CellAddress>,
    pub added: Vec<MaterializedCell>,
}

impl ViewportUpdate {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// The world context owned by the host: every event goes through here.
#[derive(Debug)]
pub struct Session<S, F> {
    config: WorldConfig,
    grid: GridMapper,
    generator: Generator,
    memento: CellMementoStore,
    viewport: Viewport,
    tokens: TokenEngine,
    player: LatLng,
    movement: Movement,
    persistence: Persistence<S>,
    feed: F,
}

impl<S: KeyValueStore, F: PositionFeed> Session<S, F> {
    /// Resumes the saved session from `store`, or starts a fresh one. A saved
    /// movement mode overrides `mode_param`. Movement is not started until
    /// [`Session::resume_movement`].
    pub fn open(config: WorldConfig, session_seed: u64, store: S, feed: F, mode_param: Option<&str>) -> Self {
        let grid = config.grid();
        let persistence = Persistence::new(store);
        let mut memento = CellMementoStore::new();
        let mut tokens = TokenEngine::new(config.collect_radius_m, config.win_banner);
        let mut player = config.start_position;
        let mut mode = MovementMode::from_param(mode_param);

        if let Some(snapshot) = persistence.load::<Snapshot>() {
            match CellMementoStore::deserialize(&snapshot.cell_state) {
                Ok(restored) if snapshot.player_lat.is_finite() && snapshot.player_lng.is_finite() => {
                    log::info!("restored session with {} touched cells", restored.len());
                    memento = restored;
                    tokens.restore(snapshot.hand, snapshot.has_won);
                    player = snapshot.player();
                    mode = snapshot.movement_mode;
                }
                Ok(_) => log::warn!("discarding saved session with invalid player position"),
                Err(err) => log::warn!("discarding saved session: {}", err),
            }
        }

        Self {
            generator: Generator::new(config.generator, config.spawn.clone(), session_seed),
            movement: Movement::for_mode(mode, grid),
            config,
            grid,
            memento,
            viewport: Viewport::new(),
            tokens,
            player,
            persistence,
            feed,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn grid(&self) -> &GridMapper {
        &self.grid
    }

    pub fn player(&self) -> LatLng {
        self.player
    }

    pub fn hand(&self) -> Option<Tier> {
        self.tokens.hand()
    }

    pub fn has_won(&self) -> bool {
        self.tokens.has_won()
    }

    pub fn memento(&self) -> &CellMementoStore {
        &self.memento
    }

    pub fn visible(&self) -> &VisibleSet {
        self.viewport.visible()
    }

    pub fn live_tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.live_tokens()
    }

    pub fn token_at(&self, addr: CellAddress) -> Option<&Token> {
        self.tokens.token_at(addr)
    }

    pub fn movement_mode(&self) -> MovementMode {
        self.movement.mode()
    }

    pub fn store(&self) -> &S {
        self.persistence.store()
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub fn feed_mut(&mut self) -> &mut F {
        &mut self.feed
    }

    /// One-line summary of the hand and the surroundings.
    pub fn status_line(&self) -> String {
        let hand = match self.hand() {
            Some(tier) => format!("Holding tier {}.", tier),
            None => "Hand empty.".to_string(),
        };
        format!(
            "{} Tokens on screen: {}. Interact within {:.0}m.",
            hand,
            self.tokens.live_count(),
            self.config.collect_radius_m
        )
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            player_lat: self.player.lat,
            player_lng: self.player.lng,
            hand: self.hand(),
            cell_state: self.memento.serialize(),
            movement_mode: self.movement.mode(),
            has_won: self.has_won(),
        }
    }

    /// Memento first, generator for cells never seen before.
    pub fn resolve_cell(&mut self, addr: CellAddress) -> Resolution {
        if let Some(outcome) = self.memento.get(addr) {
            return Resolution::Restored(outcome);
        }
        let outcome = self.generator.generate(addr);
        if self.config.record_generated {
            self.memento.set(addr, outcome);
        }
        Resolution::Generated(outcome)
    }

    /// Recomputes the viewport centred on the player.
    pub fn refresh_viewport(&mut self) -> ViewportUpdate {
        let bounds = self.config.viewport_around(self.player);
        self.update_viewport(bounds)
    }

    /// Recomputes the viewport for host-supplied map bounds.
    pub fn update_viewport(&mut self, bounds: Bounds) -> ViewportUpdate {
        let range = self.grid.visible_range(bounds);
        let diff = self.viewport.apply(range);

        let removed = diff.to_remove;
        for &addr in &removed {
            self.tokens.dematerialize(addr);
        }

        let mut recorded = false;
        let mut added = Vec::with_capacity(diff.to_add.len());
        for addr in diff.to_add {
            let resolution = self.resolve_cell(addr);
            recorded |= self.config.record_generated && !resolution.is_restored();
            let token = self
                .tokens
                .materialize(addr, self.grid.cell_center(addr), resolution.outcome());
            added.push(MaterializedCell {
                address: addr,
                bounds: self.grid.cell_bounds(addr),
                resolution,
                token,
            });
        }

        if recorded {
            self.save();
        }
        ViewportUpdate { removed, added }
    }

    /// Starts the current movement controller, falling back to manual
    /// movement when its source is unavailable.
    pub fn resume_movement(&mut self) -> Result<()> {
        let result = self.movement.start(&mut self.feed);
        if let Err(err) = &result {
            log::warn!("could not start {:?} movement: {}", self.movement.mode(), err);
            self.movement = Movement::for_mode(MovementMode::Buttons, self.grid);
            self.save();
        }
        result
    }

    /// Swaps the movement controller, the old one is always stopped first.
    pub fn set_movement_mode(&mut self, mode: MovementMode) -> Result<()> {
        if self.movement.mode() != mode {
            log::debug!("switching movement {:?} -> {:?}", self.movement.mode(), mode);
            self.movement.stop(&mut self.feed);
            self.movement = Movement::for_mode(mode, self.grid);
        }
        let result = self.resume_movement();
        self.save();
        result
    }

    /// Manual one-cell step.
    pub fn step(&mut self, direction: Direction) -> Result<ViewportUpdate> {
        match self.movement {
            Movement::Manual(manual) => {
                let position = manual.step(self.player, direction);
                Ok(self.move_player(position))
            }
            Movement::LiveFeed(_) => Err(GameError::WrongMovementMode),
        }
    }

    /// Position from the live feed; updates from stale subscriptions are
    /// ignored.
    pub fn on_feed_position(&mut self, id: WatchId, position: LatLng) -> Option<ViewportUpdate> {
        if !self.movement.accepts(id) {
            log::debug!("ignoring position from inactive feed {:?}", id);
            return None;
        }
        Some(self.move_player(position))
    }

    /// Failure reported by the live feed after it started. Switches back to
    /// manual movement and returns the error to display.
    pub fn on_feed_error(&mut self, id: WatchId, message: &str) -> Option<GameError> {
        if !self.movement.accepts(id) {
            return None;
        }
        log::warn!("position feed failed: {}", message);
        self.movement.stop(&mut self.feed);
        self.movement = Movement::for_mode(MovementMode::Buttons, self.grid);
        self.save();
        Some(GameError::PositionUnavailable(message.to_string()))
    }

    /// Click on a token.
    pub fn interact(&mut self, addr: CellAddress) -> Result<InteractOutcome> {
        let outcome = self.tokens.interact(addr, self.player, &mut self.memento)?;
        if outcome.has_update() {
            self.save();
        }
        Ok(outcome)
    }

    /// Interaction with whichever token is closest, if any is in range.
    pub fn interact_nearest(&mut self) -> Result<InteractOutcome> {
        let outcome = self.tokens.interact_nearest(self.player, &mut self.memento)?;
        if outcome.has_update() {
            self.save();
        }
        Ok(outcome)
    }

    /// Forgets the world: memento, hand, win flag, visible cells and the
    /// saved snapshot. The player goes back to the start position.
    pub fn reset(&mut self) -> ViewportUpdate {
        let removed = self.viewport.clear();
        self.tokens.reset();
        self.memento.clear();
        self.persistence.clear::<Snapshot>();
        self.player = self.config.start_position;
        log::info!("world reset, {} cells dematerialized", removed.len());
        ViewportUpdate {
            removed,
            added: Vec::new(),
        }
    }

    fn move_player(&mut self, position: LatLng) -> ViewportUpdate {
        self.player = position;
        let update = self.refresh_viewport();
        self.save();
        update
    }

    fn save(&mut self) {
        let snapshot = self.snapshot();
        self.persistence.save(&snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WorldConfig {
        WorldConfig {
            start_position: LatLng::new(0.00005, 0.00005),
            viewport_cells: (3, 3),
            ..Default::default()
        }
    }

    fn open(config: WorldConfig, store: &mut MemoryStore) -> Session<&mut MemoryStore, NoPositionFeed> {
        Session::open(config, 1, store, NoPositionFeed, None)
    }

    #[test]
    fn resolve_distinguishes_first_visit_from_revisit() {
        let mut store = MemoryStore::new();
        let mut session = open(config(), &mut store);
        let addr = CellAddress::new(7, 7);

        let first = session.resolve_cell(addr);
        let second = session.resolve_cell(addr);

        assert!(matches!(first, Resolution::Generated(_)));
        assert_eq!(second, Resolution::Restored(first.outcome()));
    }

    #[test]
    fn unrecorded_cells_are_generated_again() {
        let mut store = MemoryStore::new();
        let mut session = open(
            WorldConfig {
                record_generated: false,
                generator: GeneratorConfig::Seeded { seed: 3 },
                ..config()
            },
            &mut store,
        );
        let addr = CellAddress::new(2, 2);

        let first = session.resolve_cell(addr);
        let second = session.resolve_cell(addr);

        assert_eq!(first, second);
        assert!(matches!(second, Resolution::Generated(_)));
        assert!(session.memento().is_empty());
    }

    #[test]
    fn refresh_materializes_cells_around_player() {
        let mut store = MemoryStore::new();
        let mut session = open(config(), &mut store);

        let update = session.refresh_viewport();

        assert!(update.removed.is_empty());
        assert_eq!(update.added.len(), session.visible().len());
        assert!(session.visible().contains(&CellAddress::new(0, 0)));
        assert_eq!(session.memento().len(), update.added.len());
        assert!(session.refresh_viewport().is_empty());
    }

    #[test]
    fn step_is_rejected_while_following_feed() {
        let mut store = MemoryStore::new();
        let mut session = Session::open(config(), 1, &mut store, NoPositionFeed, Some("geo"));

        assert_eq!(session.movement_mode(), MovementMode::Geo);
        assert_eq!(session.step(Direction::North), Err(GameError::WrongMovementMode));
    }

    #[test]
    fn unavailable_feed_falls_back_to_buttons() {
        let mut store = MemoryStore::new();
        let mut session = open(config(), &mut store);

        let result = session.set_movement_mode(MovementMode::Geo);

        assert!(matches!(result, Err(GameError::PositionUnavailable(_))));
        assert_eq!(session.movement_mode(), MovementMode::Buttons);
        assert!(session.step(Direction::East).is_ok());
    }

    #[test]
    fn status_line_reports_hand_and_tokens() {
        let mut store = MemoryStore::new();
        let session = open(config(), &mut store);

        assert_eq!(
            session.status_line(),
            "Hand empty. Tokens on screen: 0. Interact within 60m."
        );
    }
}
