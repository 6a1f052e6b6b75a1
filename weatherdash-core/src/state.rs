//! The session's current selection and the one value that outlives it.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::config::{Config, project_dirs};
use crate::model::{Location, Theme, Unit};

/// Key the last selected location is saved under.
pub const LOCATION_KEY: &str = "location";

/// Small JSON key-value file.
///
/// Values are read leniently: a missing file, unreadable JSON or a value of
/// the wrong shape all read as "not set".
#[derive(Debug, Clone)]
pub struct LocationStore {
    path: PathBuf,
}

impl LocationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `state.json` in the platform data directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(project_dirs()?.data_dir().join("state.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.read_map().remove(key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(err) => {
                tracing::warn!(key, "ignoring stored value: {err}");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let mut map = self.read_map();
        map.insert(
            key.to_string(),
            serde_json::to_value(value).context("Failed to serialize stored value")?,
        );

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create state directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(&Value::Object(map))
            .context("Failed to serialize state file")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write state file: {}", self.path.display()))
    }

    /// Last selected location, or [`Location::fallback`].
    pub fn load_location(&self) -> Location {
        self.get(LOCATION_KEY).unwrap_or_else(Location::fallback)
    }

    pub fn save_location(&self, location: &Location) -> Result<()> {
        self.set(LOCATION_KEY, location)
    }

    fn read_map(&self) -> Map<String, Value> {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return Map::new();
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                tracing::warn!(path = %self.path.display(), "state file is corrupt, starting fresh");
                Map::new()
            }
        }
    }
}

/// What every view renders from.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub location: Location,
    pub unit: Unit,
    pub theme: Theme,
}

/// Owner of the current [`Selection`].
///
/// All changes go through the `&mut self` methods below; views that need to
/// react hold a receiver from [`AppState::subscribe`]. Unit and theme are
/// saved to the config file, the location to the [`LocationStore`].
#[derive(Debug)]
pub struct AppState {
    store: LocationStore,
    config: Config,
    config_path: PathBuf,
    selection: watch::Sender<Selection>,
}

impl AppState {
    pub fn load(store: LocationStore, config_path: impl Into<PathBuf>) -> Result<Self> {
        let config_path = config_path.into();
        let config = Config::load_from(&config_path)?;
        let selection = Selection {
            location: store.load_location(),
            unit: config.unit,
            theme: config.theme,
        };
        let (selection, _) = watch::channel(selection);

        Ok(Self { store, config, config_path, selection })
    }

    /// State file and config file at their platform locations.
    pub fn open_default() -> Result<Self> {
        Self::load(LocationStore::open_default()?, Config::config_file_path()?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn selection(&self) -> Selection {
        self.selection.borrow().clone()
    }

    pub fn location(&self) -> Location {
        self.selection.borrow().location.clone()
    }

    pub fn unit(&self) -> Unit {
        self.selection.borrow().unit
    }

    pub fn theme(&self) -> Theme {
        self.selection.borrow().theme
    }

    pub fn subscribe(&self) -> watch::Receiver<Selection> {
        self.selection.subscribe()
    }

    /// Makes `location` current and saves it for the next session.
    pub fn select_location(&mut self, location: Location) -> Result<()> {
        tracing::info!(address = %location.address, "location selected");
        self.selection.send_modify(|s| s.location = location.clone());
        self.store.save_location(&location)
    }

    /// Switches the unit for this session without saving it.
    pub fn use_unit(&mut self, unit: Unit) {
        self.selection.send_if_modified(|s| std::mem::replace(&mut s.unit, unit) != unit);
    }

    pub fn set_unit(&mut self, unit: Unit) -> Result<()> {
        self.update_config(|cfg| cfg.unit = unit)
    }

    pub fn toggle_unit(&mut self) -> Result<Unit> {
        let unit = self.unit().toggled();
        self.set_unit(unit)?;
        Ok(unit)
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.update_config(|cfg| cfg.theme = theme)
    }

    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let theme = self.theme().toggled();
        self.set_theme(theme)?;
        Ok(theme)
    }

    /// Applies `edit` to the configuration, publishes the resulting unit and
    /// theme, and saves the file.
    pub fn update_config(&mut self, edit: impl FnOnce(&mut Config)) -> Result<()> {
        edit(&mut self.config);

        let (unit, theme) = (self.config.unit, self.config.theme);
        self.selection.send_if_modified(|s| {
            let changed = s.unit != unit || s.theme != theme;
            s.unit = unit;
            s.theme = theme;
            changed
        });

        self.config.save_to(&self.config_path)
    }
}
