// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Command line options of a run.
//!
//! [`Opts`] override the [`Profile`] loaded out of a configuration file, and
//! provide filtering based on [`Regex`] or [tag expressions][1].
//!
//! [1]: https://cucumber.io/docs/cucumber/api#tag-expressions

use regex::Regex;
use smart_default::SmartDefault;

use crate::{
    config::{Config, DEFAULT_CONFIG, DEFAULT_PROFILE},
    filter, ConfigError, Filter, Mode, Profile,
};

pub use clap::{Args, Parser};

/// Root CLI (command line interface) of a run.
///
/// # Example
///
/// ```rust
/// # use cucumber_adapter::cli::Opts;
/// #
/// let opts = Opts::try_parse_from(["tests", "-t", "@smoke", "--retries", "2"])
///     .unwrap();
/// let profile = opts.apply(Default::default());
///
/// assert_eq!(profile.tags.as_deref(), Some("@smoke"));
/// assert_eq!(profile.retries, 2);
/// ```
#[derive(Clone, Debug, Parser, SmartDefault)]
#[command(
    name = "cucumber-adapter",
    about = "Run the scenarios as tests, pet a dog!",
    long_about = "Run the scenarios as tests, pet a dog!"
)]
pub struct Opts {
    /// Glob patterns of `.feature` files, replacing the ones of the profile.
    #[arg(id = "input", long = "input", short = 'i', value_name = "glob")]
    pub input: Vec<String>,

    /// Regex to filter scenarios by their name.
    #[arg(
        id = "name",
        long = "name",
        short = 'n',
        value_name = "regex",
        visible_alias = "scenario-name"
    )]
    pub re_filter: Option<Regex>,

    /// Tag expression to filter scenarios by, replacing the one of the
    /// profile.
    ///
    /// Note: Tags from Feature, Rule and Scenario are merged together on
    /// filtering, so be careful about conflicting tags on different levels.
    #[arg(id = "tags", long = "tags", short = 't', value_name = "tagexpr")]
    pub tags_filter: Option<String>,

    /// Name of the profile to load.
    #[arg(
        long,
        short = 'p',
        value_name = "name",
        default_value = DEFAULT_PROFILE
    )]
    #[default(DEFAULT_PROFILE.to_owned())]
    pub profile: String,

    /// Path of the configuration file.
    #[arg(
        long,
        short = 'c',
        value_name = "path",
        default_value = DEFAULT_CONFIG
    )]
    #[default(DEFAULT_CONFIG.to_owned())]
    pub config: String,

    /// Number of times a failed scenario is re-run.
    #[arg(long, value_name = "int")]
    pub retries: Option<u32>,

    /// Layout of scenarios over the test runtime callbacks.
    #[arg(long, value_name = "inline|split")]
    pub mode: Option<Mode>,
}

impl Opts {
    /// Shortcut for [`Parser::parse()`], which doesn't require the trait
    /// being imported.
    #[must_use]
    pub fn parsed() -> Self {
        <Self as Parser>::parse()
    }

    /// Shortcut for [`Parser::try_parse_from()`], which doesn't require
    /// the trait being imported.
    ///
    /// # Errors
    ///
    /// If the `args` are not valid [`Opts`].
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(args)
    }

    /// Overrides the given [`Profile`] with these [`Opts`].
    #[must_use]
    pub fn apply(&self, mut profile: Profile) -> Profile {
        if !self.input.is_empty() {
            profile.paths.clone_from(&self.input);
        }
        if let Some(tags) = &self.tags_filter {
            profile.tags = Some(tags.clone());
        }
        if let Some(retries) = self.retries {
            profile.retries = retries;
        }
        if let Some(mode) = self.mode {
            profile.mode = mode;
        }
        profile
    }

    /// Loads the [`Opts::profile`] out of the [`Opts::config`] file and
    /// overrides it with these [`Opts`].
    ///
    /// # Errors
    ///
    /// If the configuration file cannot be read or has no such [`Profile`].
    pub fn profile(&self) -> Result<Profile, ConfigError> {
        let config = Config::from_path(&self.config)?;
        Ok(self.apply(config.profile(&self.profile)?.clone()))
    }

    /// Builds the [`Filter`] of the [`Opts::re_filter`] and
    /// [`Opts::tags_filter`], if any.
    ///
    /// # Errors
    ///
    /// If the [`Opts::tags_filter`] is not a valid tag expression.
    pub fn filter(&self) -> Result<Option<Filter>, ConfigError> {
        let tags = self.tags_filter.as_deref().map(filter::tags).transpose()?;
        let name = self.re_filter.clone().map(Filter::regex);
        Ok(match (name, tags) {
            (Some(n), Some(t)) => Some(n.and(t)),
            (n, t) => n.or(t),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn defaults() {
        let opts = Opts::try_parse_from(["tests"]).unwrap();
        assert!(opts.input.is_empty());
        assert!(opts.re_filter.is_none());
        assert_eq!(opts.retries, None);
        assert!(opts.filter().unwrap().is_none());

        assert_eq!(opts.apply(Profile::default()), Profile::default());
    }

    #[test]
    fn overrides_profile() {
        let opts = Opts::try_parse_from([
            "tests",
            "-i",
            "a/*.feature",
            "--input",
            "b/*.feature",
            "--mode",
            "split",
            "--retries",
            "3",
        ])
        .unwrap();

        let profile = opts.apply(Profile {
            tags: Some("@kept".into()),
            ..Profile::default()
        });
        assert_eq!(profile.paths, ["a/*.feature", "b/*.feature"]);
        assert_eq!(profile.mode, Mode::Split);
        assert_eq!(profile.retries, 3);
        assert_eq!(profile.tags.as_deref(), Some("@kept"));
    }

    #[test]
    fn combines_filters() {
        let opts =
            Opts::try_parse_from(["tests", "-n", "^Eat", "-t", "@fruit"])
                .unwrap();
        let filter = opts.filter().unwrap().unwrap();
        assert!(filter.test("Eat apples @fruit"));
        assert!(!filter.test("Eat apples @veggie"));
        assert!(!filter.test("Buy apples @fruit"));
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Opts::try_parse_from(["tests", "--mode", "both"]).is_err());
    }

    #[test]
    fn loads_named_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "ci": { "retries": 1, "tags": "@ci" } }"#)
            .unwrap();

        let opts = Opts::try_parse_from([
            "tests",
            "-c",
            path.to_str().unwrap(),
            "-p",
            "ci",
            "-t",
            "@nightly",
        ])
        .unwrap();
        let profile = opts.profile().unwrap();
        assert_eq!(profile.retries, 1);
        assert_eq!(profile.tags.as_deref(), Some("@nightly"));

        let opts = Opts::try_parse_from([
            "tests",
            "-c",
            path.to_str().unwrap(),
            "-p",
            "absent",
        ])
        .unwrap();
        assert!(matches!(
            opts.profile().unwrap_err(),
            ConfigError::MissingProfile(name) if name == "absent",
        ));
    }
}
