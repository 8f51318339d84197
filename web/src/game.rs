use clap::Args;
use gloo::events::EventListener;
use gridmerge_core as world;
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsCast;
use world::{CellAddress, Direction, InteractOutcome, LatLng, MovementMode};
use yew::prelude::*;

use crate::geo::{FeedEvent, GeoFeed};
use crate::storage::LocalStore;

type Session = world::Session<LocalStore, GeoFeed>;

/// Helper function to use JavaScript's Math.random
fn js_random_seed() -> u64 {
    use js_sys::Math::random;
    let half = || (random() * f64::from(u32::MAX)) as u64;
    (half() << 32) | half()
}

/// Banner for a session resumed after an earlier win.
fn resumed_banner(has_won: bool, policy: world::WinBanner) -> Option<String> {
    match policy {
        world::WinBanner::EveryMaxMerge if has_won => Some("Welcome back, you already won!".to_string()),
        _ => None,
    }
}

/// Maps a key to the command it triggers.
fn key_command(key: &str) -> Option<Msg> {
    match key {
        "e" | "E" => Some(Msg::InteractNearest),
        "ArrowUp" => Some(Msg::Step(Direction::North)),
        "ArrowDown" => Some(Msg::Step(Direction::South)),
        "ArrowLeft" => Some(Msg::Step(Direction::West)),
        "ArrowRight" => Some(Msg::Step(Direction::East)),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) enum Msg {
    Step(Direction),
    Interact(CellAddress),
    InteractNearest,
    SetMode(MovementMode),
    Reset,
    Feed(FeedEvent),
    DismissBanner,
}

#[derive(Args, Properties, Debug, Clone, PartialEq)]
pub(crate) struct GameProps {
    /// Start with the given movement mode (`buttons` or `geo`), a saved session wins
    #[arg(short, long)]
    pub(crate) movement: Option<String>,

    /// Use a deterministic world generated from this seed
    #[arg(short, long)]
    pub(crate) seed: Option<u64>,

    /// Only announce the first win of a session
    #[arg(long)]
    pub(crate) once_banner: bool,
}

impl GameProps {
    fn world_config(&self) -> world::WorldConfig {
        let mut config = world::WorldConfig::default();
        if let Some(seed) = self.seed {
            config.generator = world::GeneratorConfig::Seeded { seed };
        }
        if self.once_banner {
            config.win_banner = world::WinBanner::OncePerSession;
        }
        config
    }
}

/// Projects world positions into the SVG's cell-sized units, north up.
#[derive(Copy, Clone, Debug)]
struct MapFrame {
    view: world::Bounds,
    cell_deg: f64,
}

impl MapFrame {
    fn x(&self, lng: f64) -> f64 {
        (lng - self.view.west) / self.cell_deg
    }

    fn y(&self, lat: f64) -> f64 {
        (self.view.north - lat) / self.cell_deg
    }

    fn width(&self) -> f64 {
        self.x(self.view.east)
    }

    fn height(&self) -> f64 {
        self.y(self.view.south)
    }
}

#[derive(Debug)]
pub(crate) struct GameView {
    session: Session,
    banner: Option<String>,
    error: Option<String>,
    _keydown: EventListener,
}

impl GameView {
    fn report(&mut self, err: world::GameError) {
        log::info!("{}", err);
        self.error = Some(err.to_string());
    }

    fn apply_interaction(&mut self, outcome: world::Result<InteractOutcome>) {
        match outcome {
            Ok(InteractOutcome::Merged {
                tier,
                announce_win: true,
                ..
            }) => {
                self.banner = Some(format!("Tier {} reached, you win!", tier));
                self.error = None;
            }
            Ok(_) => self.error = None,
            Err(err) => self.report(err),
        }
    }

    fn log_update(update: &world::ViewportUpdate) {
        if !update.is_empty() {
            log::debug!(
                "viewport: -{} +{} cells",
                update.removed.len(),
                update.added.len()
            );
        }
    }

    fn view_cells(&self, ctx: &Context<Self>, frame: MapFrame) -> Html {
        let grid = self.session.grid();
        let mut cells: Vec<_> = self.session.visible().iter().copied().collect();
        cells.sort_unstable();

        cells
            .into_iter()
            .map(|addr| {
                let bounds = grid.cell_bounds(addr);
                let x = frame.x(bounds.west);
                let y = frame.y(bounds.north);
                let token = self.session.token_at(addr).map(|token| {
                    let onclick = ctx.link().callback(move |_| Msg::Interact(addr));
                    let class = classes!("token", format!("tier-{}", token.tier));
                    html! {
                        <g {class} {onclick}>
                            <circle cx={(x + 0.5).to_string()} cy={(y + 0.5).to_string()} r="0.4"/>
                            <text x={(x + 0.5).to_string()} y={(y + 0.65).to_string()}>{token.tier.to_string()}</text>
                        </g>
                    }
                });
                html! {
                    <g key={addr.key()}>
                        <rect class="cell" x={x.to_string()} y={y.to_string()} width="1" height="1"/>
                        {for token}
                    </g>
                }
            })
            .collect()
    }

    fn view_player(&self, frame: MapFrame) -> Html {
        let LatLng { lat, lng } = self.session.player();
        let radius = self.session.config().collect_radius_m
            / (world::EARTH_RADIUS_M * self.session.config().cell_deg.to_radians());
        html! {
            <g class="player">
                <circle class="reach" cx={frame.x(lng).to_string()} cy={frame.y(lat).to_string()} r={radius.to_string()}/>
                <circle class="marker" cx={frame.x(lng).to_string()} cy={frame.y(lat).to_string()} r="0.3"/>
            </g>
        }
    }

    fn view_controls(&self, ctx: &Context<Self>) -> Html {
        let mode = self.session.movement_mode();
        let step = |direction: Direction, label: &'static str| {
            let onclick = ctx.link().callback(move |_| Msg::Step(direction));
            html! { <button {onclick} disabled={mode != MovementMode::Buttons}>{label}</button> }
        };
        let next_mode = match mode {
            MovementMode::Buttons => MovementMode::Geo,
            MovementMode::Geo => MovementMode::Buttons,
        };
        let toggle_label = match next_mode {
            MovementMode::Buttons => "Use buttons",
            MovementMode::Geo => "Use geolocation",
        };
        let on_toggle = ctx.link().callback(move |_| Msg::SetMode(next_mode));
        let on_reset = ctx.link().callback(|_| Msg::Reset);
        let on_nearest = ctx.link().callback(|_| Msg::InteractNearest);

        html! {
            <nav>
                {step(Direction::North, "⬆️")}
                {step(Direction::West, "⬅️")}
                {step(Direction::South, "⬇️")}
                {step(Direction::East, "➡️")}
                <button onclick={on_nearest}>{"Interact (e)"}</button>
                <button onclick={on_toggle}>{toggle_label}</button>
                <button class="reset" onclick={on_reset}>{"🚮"}</button>
            </nav>
        }
    }
}

impl Component for GameView {
    type Message = Msg;
    type Properties = GameProps;

    fn create(ctx: &Context<Self>) -> Self {
        let props = ctx.props();
        let feed = GeoFeed::new(ctx.link().callback(Msg::Feed));
        let mut session = Session::open(
            props.world_config(),
            js_random_seed(),
            LocalStore,
            feed,
            props.movement.as_deref(),
        );

        let error = session.resume_movement().err().map(|err| err.to_string());
        Self::log_update(&session.refresh_viewport());

        let keydown = {
            let link = ctx.link().clone();
            EventListener::new(&gloo::utils::document(), "keydown", move |event| {
                let Some(event) = event.dyn_ref::<web_sys::KeyboardEvent>() else {
                    return;
                };
                if let Some(msg) = key_command(&event.key()) {
                    event.prevent_default();
                    link.send_message(msg);
                }
            })
        };

        Self {
            banner: resumed_banner(session.has_won(), session.config().win_banner),
            session,
            error,
            _keydown: keydown,
        }
    }

    fn update(&mut self, _ctx: &Context<Self>, msg: Self::Message) -> bool {
        use Msg::*;

        match msg {
            Step(direction) => match self.session.step(direction) {
                Ok(update) => Self::log_update(&update),
                Err(err) => self.report(err),
            },
            Interact(addr) => {
                log::debug!("interact: {}", addr);
                let outcome = self.session.interact(addr);
                self.apply_interaction(outcome);
            }
            InteractNearest => {
                let outcome = self.session.interact_nearest();
                self.apply_interaction(outcome);
            }
            SetMode(mode) => {
                self.error = self.session.set_movement_mode(mode).err().map(|err| err.to_string());
                Self::log_update(&self.session.refresh_viewport());
            }
            Reset => {
                let update = self.session.reset();
                Self::log_update(&update);
                Self::log_update(&self.session.refresh_viewport());
                self.banner = None;
                self.error = None;
            }
            Feed(FeedEvent::Position(id, position)) => match self.session.on_feed_position(id, position) {
                Some(update) => Self::log_update(&update),
                None => return false,
            },
            Feed(FeedEvent::Error(id, message)) => match self.session.on_feed_error(id, &message) {
                Some(err) => self.report(err),
                None => return false,
            },
            DismissBanner => self.banner = None,
        }
        true
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let config = self.session.config();
        let frame = MapFrame {
            view: config.viewport_around(self.session.player()),
            cell_deg: config.cell_deg,
        };
        let view_box = format!("0 0 {} {}", frame.width(), frame.height());
        let on_dismiss = ctx.link().callback(|_| Msg::DismissBanner);

        html! {
            <div class="gridmerge">
                {self.view_controls(ctx)}
                <svg class="map" viewBox={view_box}>
                    {self.view_cells(ctx, frame)}
                    {self.view_player(frame)}
                </svg>
                <p class="status">{self.session.status_line()}</p>
                if let Some(error) = &self.error {
                    <p class="error">{error}</p>
                }
                if let Some(banner) = &self.banner {
                    <div class="banner" onclick={on_dismiss}>{banner}</div>
                }
            </div>
        }
    }
}
