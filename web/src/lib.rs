use clap::Parser;
use wasm_bindgen::prelude::*;

mod game;
mod geo;
mod storage;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// What log level to use
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,

    #[command(flatten)]
    game: game::GameProps,
}

impl Args {
    /// Parses options from a location hash such as `#--movement=geo&-v`.
    fn from_hash(hash: &str) -> Result<Self, clap::Error> {
        Self::try_parse_from(hash.split(['#', '&']))
    }
}

#[wasm_bindgen(start)]
pub fn run_app() {
    use gloo::utils::{document, window};

    #[cfg(feature = "console_error_panic_hook")]
    {
        console_error_panic_hook::set_once();
    }

    let location_hash = window()
        .location()
        .hash()
        .unwrap_or_else(|_| "".to_string());

    let args = Args::from_hash(&location_hash).expect("Could not parse args");
    if let Some(log_level) = args.verbose.log_level() {
        console_log::init_with_level(log_level).expect("Error initializing logger");
    }
    log::debug!("options: {:?}", args.game);

    let root = document()
        .get_element_by_id("game")
        .expect("Could not find id=\"game\" element");

    log::debug!("App started");
    yew::Renderer::<game::GameView>::with_root_and_props(root, args.game).render();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hash_uses_defaults() {
        let args = Args::from_hash("").unwrap();

        assert_eq!(args.game.movement, None);
        assert_eq!(args.game.seed, None);
        assert!(!args.game.once_banner);
    }

    #[test]
    fn hash_options_are_split_on_ampersands() {
        let args = Args::from_hash("#--movement=geo&--seed=42&--once-banner").unwrap();

        assert_eq!(args.game.movement.as_deref(), Some("geo"));
        assert_eq!(args.game.seed, Some(42));
        assert!(args.game.once_banner);
    }
}
