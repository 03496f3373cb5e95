//! Observatory configuration files.
//!
//! A run directory carries JSON configuration files such as `obs_config.json`,
//! `daq_config.json` and `data_config.json`. They are loaded as raw JSON keyed by file
//! stem, with a typed view of the observatory config for looking up module hardware.
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::pixelmap::BoardVariant;
use crate::Result;

/// Name of the observatory config.
pub const OBS_CONFIG: &str = "obs_config";

/// A module entry of the observatory config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub id: u32,
    /// Quabo board revision; the config file may call this `quabo_version`.
    #[serde(default, alias = "quabo_version")]
    pub board: Option<BoardVariant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomeConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
}

/// Typed view of `obs_config.json`. Keys not listed here are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObsConfig {
    #[serde(default)]
    pub domes: Vec<DomeConfig>,
}

impl ObsConfig {
    /// Find a module by id in any dome.
    #[must_use]
    pub fn module(&self, id: u32) -> Option<&ModuleConfig> {
        self.domes
            .iter()
            .flat_map(|d| d.modules.iter())
            .find(|m| m.id == id)
    }
}

/// Configuration documents keyed by file stem.
///
/// # Example
/// ```no_run
/// use pff::config::Configs;
///
/// let configs = Configs::load_dir("/data/obs_Lick.start_2023-08-01T05:14:21Z.runtype_sci-obs.pffd")?;
/// let variant = configs.board_variant(254)?;
/// # Ok::<(), pff::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configs {
    docs: BTreeMap<String, Value>,
}

impl Configs {
    /// Load every `*.json` file in `dir`.
    ///
    /// # Errors
    /// [crate::Error::Io] if the directory or a file cannot be read, or
    /// [crate::Error::Json] if a file is not valid JSON.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();
        Self::load_files(paths)
    }

    /// Load specific files. A later file replaces an earlier one with the same stem.
    ///
    /// # Errors
    /// [crate::Error::Io] if a file cannot be read, or [crate::Error::Json] if a file
    /// is not valid JSON.
    pub fn load_files<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut docs = BTreeMap::new();
        for path in paths {
            let path = path.as_ref();
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            debug!(?path, "loading config");
            let doc: Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;
            docs.insert(stem, doc);
        }
        Ok(Self { docs })
    }

    /// Loaded config names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.docs.keys().map(String::as_str)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.docs.get(name)
    }

    /// Deserialize the config `name` into `T`.
    ///
    /// # Errors
    /// [crate::Error::Json] if the document does not match `T`.
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.docs.get(name) {
            Some(doc) => Ok(Some(T::deserialize(doc)?)),
            None => Ok(None),
        }
    }

    /// The typed observatory config, if loaded.
    ///
    /// # Errors
    /// [crate::Error::Json] if `obs_config` does not have the expected structure.
    pub fn obs_config(&self) -> Result<Option<ObsConfig>> {
        self.parse(OBS_CONFIG)
    }

    /// Board variant of module `id` according to the observatory config.
    ///
    /// `None` if there is no observatory config, no such module, or the module does
    /// not declare a board.
    ///
    /// # Errors
    /// [crate::Error::Json] if `obs_config` does not have the expected structure.
    pub fn board_variant(&self, id: u32) -> Result<Option<BoardVariant>> {
        Ok(self
            .obs_config()?
            .and_then(|obs| obs.module(id).and_then(|m| m.board)))
    }
}
