use gridmerge_core::{GameError, LatLng, PositionFeed, Result, WatchId};
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{Position, PositionError, PositionOptions};
use yew::Callback;

/// Something the browser reported for a watch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) enum FeedEvent {
    Position(WatchId, LatLng),
    Error(WatchId, String),
}

/// A running `watchPosition` subscription. The closures must outlive it.
struct ActiveWatch {
    id: WatchId,
    browser_id: i32,
    _on_position: Closure<dyn FnMut(Position)>,
    _on_error: Closure<dyn FnMut(PositionError)>,
}

/// Position feed backed by the browser Geolocation API.
pub(crate) struct GeoFeed {
    callback: Callback<FeedEvent>,
    issued: u32,
    active: Vec<ActiveWatch>,
}

impl GeoFeed {
    pub(crate) fn new(callback: Callback<FeedEvent>) -> Self {
        Self {
            callback,
            issued: 0,
            active: Vec::new(),
        }
    }
}

impl std::fmt::Debug for GeoFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoFeed")
            .field("issued", &self.issued)
            .field("active", &self.active.iter().map(|watch| watch.id).collect::<Vec<_>>())
            .finish()
    }
}

impl PositionFeed for GeoFeed {
    fn watch(&mut self) -> Result<WatchId> {
        let geolocation = gloo::utils::window()
            .navigator()
            .geolocation()
            .map_err(|err| GameError::PositionUnavailable(format!("{:?}", err)))?;

        self.issued += 1;
        let id = WatchId(self.issued);

        let on_position = {
            let callback = self.callback.clone();
            Closure::<dyn FnMut(Position)>::new(move |position: Position| {
                let coords = position.coords();
                callback.emit(FeedEvent::Position(id, LatLng::new(coords.latitude(), coords.longitude())));
            })
        };
        let on_error = {
            let callback = self.callback.clone();
            Closure::<dyn FnMut(PositionError)>::new(move |err: PositionError| {
                callback.emit(FeedEvent::Error(id, err.message()));
            })
        };

        let options = PositionOptions::new();
        options.set_enable_high_accuracy(true);
        let browser_id = geolocation
            .watch_position_with_error_callback_and_options(
                on_position.as_ref().unchecked_ref(),
                Some(on_error.as_ref().unchecked_ref()),
                &options,
            )
            .map_err(|err| GameError::PositionUnavailable(format!("{:?}", err)))?;

        log::debug!("browser watch {} started as {:?}", browser_id, id);
        self.active.push(ActiveWatch {
            id,
            browser_id,
            _on_position: on_position,
            _on_error: on_error,
        });
        Ok(id)
    }

    fn clear_watch(&mut self, id: WatchId) {
        let Some(index) = self.active.iter().position(|watch| watch.id == id) else {
            return;
        };
        let watch = self.active.swap_remove(index);
        match gloo::utils::window().navigator().geolocation() {
            Ok(geolocation) => geolocation.clear_watch(watch.browser_id),
            Err(err) => log::warn!("could not clear watch {:?}: {:?}", id, err),
        }
    }
}

impl Drop for GeoFeed {
    fn drop(&mut self) {
        let ids: Vec<_> = self.active.iter().map(|watch| watch.id).collect();
        for id in ids {
            self.clear_watch(id);
        }
    }
}
