// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Profile-based configuration.
//!
//! A configuration file is a JSON object of named [`Profile`]s:
//! ```json
//! {
//!     "default": { "paths": ["features/**/*.feature"] },
//!     "smoke": {
//!         "paths": ["features/**/*.feature"],
//!         "tags": "@smoke and not @wip",
//!         "retries": 1,
//!         "mode": "split",
//!         "worldParameters": { "baseUrl": "http://localhost:8080" }
//!     }
//! }
//! ```

use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

use crate::{filter, ConfigError, Filter, Mode, Services};

/// Environment variable naming the configuration file.
pub const CONFIG_VAR: &str = "CONFIG";

/// Environment variable naming the [`Profile`] to use.
pub const PROFILE_VAR: &str = "PROFILE";

/// Configuration file used when [`CONFIG_VAR`] is not set.
pub const DEFAULT_CONFIG: &str = "config.json";

/// [`Profile`] used when [`PROFILE_VAR`] is not set.
pub const DEFAULT_PROFILE: &str = "default";

/// Settings of a single run.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, SmartDefault)]
#[serde(default, rename_all = "camelCase")]
pub struct Profile {
    /// Glob patterns of `.feature` files.
    #[default(vec!["features/**/*.feature".to_owned()])]
    pub paths: Vec<String>,

    /// Tag expression selecting scenarios to run.
    pub tags: Option<String>,

    /// Number of times a failed scenario is re-run.
    pub retries: u32,

    /// Layout of scenarios over the test runtime callbacks.
    pub mode: Mode,

    /// Parameters shared by all scenarios, see [`World::parameters()`].
    ///
    /// [`World::parameters()`]: crate::World::parameters
    pub world_parameters: serde_json::Value,
}

impl Profile {
    /// Loads the [`Profile`] named by the `PROFILE` environment variable out
    /// of the configuration file named by the `CONFIG` one.
    ///
    /// # Errors
    ///
    /// If the configuration file cannot be read or parsed, or has no such
    /// [`Profile`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = env::var_os(CONFIG_VAR)
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
        let name =
            env::var(PROFILE_VAR).unwrap_or_else(|_| DEFAULT_PROFILE.to_owned());
        Config::from_path(path)?.profile(&name).cloned()
    }

    /// Builds the [`Filter`] of the [`Profile::tags`], if any.
    ///
    /// # Errors
    ///
    /// If the [`Profile::tags`] is not a valid tag expression.
    pub fn filter(&self) -> Result<Option<Filter>, ConfigError> {
        self.tags.as_deref().map(filter::tags).transpose()
    }

    /// Builds the [`Services`] carrying the [`Profile::world_parameters`].
    #[must_use]
    pub fn services(&self) -> Services {
        Services::default().with_parameters(self.world_parameters.clone())
    }
}

/// Named [`Profile`]s.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Config {
    /// [`Profile`]s by their names.
    pub profiles: BTreeMap<String, Profile>,
}

impl Config {
    /// Reads a [`Config`] from the JSON file at the given `path`.
    ///
    /// # Errors
    ///
    /// If the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|source| {
            ConfigError::Io { path: path.to_owned(), source }
        })?;
        serde_json::from_str(&src).map_err(|source| ConfigError::Json {
            path: path.to_owned(),
            source,
        })
    }

    /// Returns the [`Profile`] with the given `name`.
    ///
    /// # Errors
    ///
    /// If there is no such [`Profile`].
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::MissingProfile(name.to_owned()))
    }
}
