//! Wires configuration, the XP and notification stores, and the event bus
//! into the one long-lived handle the CLI and `serve` loop share.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use zortex_config::ZortexConfig;
use zortex_events::EventBus;
use zortex_notify::NotificationManager;
use zortex_store::PersistenceManager;
use zortex_xp::{Event, XpService, XpStore};

use crate::error::AppResult;

/// `~/.zortex`, matching `zortex_config::default_config_file_path`'s
/// home-relative convention.
pub fn default_data_dir() -> AppResult<PathBuf> {
    let home = dirs::home_dir().ok_or(zortex_config::ConfigError::NoHomeDir)?;
    Ok(home.join(".zortex"))
}

/// The wired-together engine: one store per concern, a shared event bus,
/// and the XP service subscribed to it.
pub struct App {
    pub config: Arc<ZortexConfig>,
    pub bus: Arc<EventBus<Event>>,
    pub xp_store: Arc<XpStore>,
    pub xp_service: Arc<XpService>,
    pub notify_manager: Arc<NotificationManager>,
    pub persistence: Arc<PersistenceManager>,
}

impl App {
    /// Loads configuration, opens the XP and notification stores under
    /// `data_dir`, and registers the XP service's handlers on a fresh
    /// event bus.
    pub fn bootstrap(data_dir: &Path) -> AppResult<Self> {
        let config = Arc::new(zortex_config::load_config()?);

        let xp_store = Arc::new(XpStore::open(data_dir.join("xp.json"))?);
        let notify_manager = Arc::new(NotificationManager::open(data_dir.join("notifications.json"))?);

        let bus = Arc::new(EventBus::new());
        let xp_service = Arc::new(XpService::new(config.clone(), xp_store.clone()));
        xp_service.register_handlers(&bus);

        let persistence = Arc::new(PersistenceManager::new());
        persistence.register(xp_store.persistence_handle());
        persistence.register(notify_manager.persistence_handle());

        let bus_for_saved = bus.clone();
        persistence.on_saved(move |store| {
            bus_for_saved.emit(Event::StoreSaved { store: store.to_string() });
        });

        Ok(Self {
            config,
            bus,
            xp_store,
            xp_service,
            notify_manager,
            persistence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn flushing_a_dirty_store_emits_store_saved() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::bootstrap(dir.path()).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_for_handler = seen.clone();
        app.bus.on("store:saved", "test::store_saved", 0, move |event| {
            if let Event::StoreSaved { store } = event {
                seen_for_handler.lock().unwrap().push(store.clone());
            }
            Ok(())
        });

        app.xp_store
            .start_season("Q1", chrono::NaiveDate::from_ymd_opt(2026, 3, 31).unwrap())
            .unwrap();
        app.persistence.flush_all().unwrap();

        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
