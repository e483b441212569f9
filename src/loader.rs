// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Discovery, parsing and compilation of `.feature` files.

use std::path::Path;

use gherkin::GherkinEnv;
use itertools::Itertools as _;

use crate::{config::Profile, feature, ConfigError, Document};

/// Loads all the `.feature` files matching the glob `patterns` (relative to
/// the `base` directory) into [`Document`]s.
///
/// Files are loaded in path order, each one once, and their [`Document`]s
/// are identified by their paths relative to the `base`.
///
/// # Errors
///
/// If the `patterns` are not valid globs, or any of the files cannot be
/// parsed or compiled.
pub fn load_features<P, S>(
    base: P,
    patterns: &[S],
) -> Result<Vec<Document>, ConfigError>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let base = base.as_ref();
    let walker = globwalk::GlobWalkerBuilder::from_patterns(base, patterns)
        .case_insensitive(true)
        .build()
        .map_err(ConfigError::Glob)?;

    let paths = walker
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .sorted()
        .dedup()
        .collect::<Vec<_>>();
    tracing::debug!(
        base = %base.display(),
        files = paths.len(),
        "features found",
    );

    paths
        .into_iter()
        .map(|path| {
            let uri = path
                .strip_prefix(base)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .join("/");
            let env = GherkinEnv::default();
            let parsed = gherkin::Feature::parse_path(&path, env).map_err(
                |e| ConfigError::Parse { uri: uri.clone(), reason: e.to_string() },
            )?;
            feature::compile(parsed, uri).map_err(ConfigError::Expand)
        })
        .collect()
}

/// Parses and compiles a single in-memory `.feature` source.
///
/// # Errors
///
/// If the `source` cannot be parsed or compiled.
pub fn load_feature_str(
    source: &str,
    uri: &str,
) -> Result<Document, ConfigError> {
    let parsed = gherkin::Feature::parse(source, GherkinEnv::default())
        .map_err(|e| ConfigError::Parse {
            uri: uri.to_owned(),
            reason: e.to_string(),
        })?;
    feature::compile(parsed, uri).map_err(ConfigError::Expand)
}

/// Loads the `.feature` files of the given [`Profile`], relative to the
/// `base` directory.
///
/// # Errors
///
/// See [`load_features()`].
pub fn load_profile<P: AsRef<Path>>(
    base: P,
    profile: &Profile,
) -> Result<Vec<Document>, ConfigError> {
    load_features(base, profile.paths.as_slice())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn loads_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("b.feature"),
            "Feature: B\n  Scenario: b\n    Given b\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("nested/a.feature"),
            "Feature: A\n  Scenario: a\n    Given a\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "not a feature").unwrap();

        let docs =
            load_features(dir.path(), &["**/*.feature", "b.feature"]).unwrap();

        let uris = docs.iter().map(|d| d.uri.as_str()).collect::<Vec<_>>();
        assert_eq!(uris, ["b.feature", "nested/a.feature"]);
        assert_eq!(docs[1].pickles[0].id, "nested/a.feature:2");
    }

    #[test]
    fn reports_unparsable_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.feature"), "Scenario without feature")
            .unwrap();

        let err = load_features(dir.path(), &["*.feature"]).unwrap_err();
        assert!(
            matches!(&err, ConfigError::Parse { uri, .. } if uri == "bad.feature"),
            "unexpected error: {err}",
        );
    }

    #[test]
    fn loads_from_string() {
        let doc = load_feature_str(
            "Feature: F\n  Scenario: s\n    Given x\n",
            "memory.feature",
        )
        .unwrap();
        assert_eq!(doc.uri, "memory.feature");
        assert_eq!(doc.pickles[0].steps[0].text, "x");
    }
}
