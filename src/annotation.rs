// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Test metadata linking a registered test back to its scenario.

use derive_more::with_trait::Display;
use serde::Serialize;

use crate::pickle::Pickle;

/// Kind of an [`Annotation`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationType {
    /// Name of the scenario.
    #[display("name")]
    Name,

    /// URI of the scenario source.
    #[display("uri")]
    Uri,

    /// Unique identifier of the scenario.
    #[display("testId")]
    TestId,

    /// JSON array of the scenario tags.
    #[display("tags")]
    Tags,
}

/// Searchable key-value metadata attached to a registered test.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Annotation {
    /// Kind of this [`Annotation`].
    #[serde(rename = "type")]
    pub kind: AnnotationType,

    /// Value of this [`Annotation`].
    pub description: String,
}

impl Annotation {
    /// Creates a new [`Annotation`].
    #[must_use]
    pub fn new(kind: AnnotationType, description: impl Into<String>) -> Self {
        Self { kind, description: description.into() }
    }
}

/// Tags and [`Annotation`]s a test is registered with.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct TestDetails {
    /// Deduplicated tags, with their leading `@`.
    pub tags: Vec<String>,

    /// [`Annotation`]s.
    pub annotations: Vec<Annotation>,
}

impl TestDetails {
    /// Builds the [`TestDetails`] of the given [`Pickle`].
    #[must_use]
    pub fn for_pickle(pickle: &Pickle) -> Self {
        let tags = pickle.unique_tags();
        let annotations = vec![
            Annotation::new(AnnotationType::Name, &pickle.name),
            Annotation::new(AnnotationType::Uri, &pickle.uri),
            Annotation::new(AnnotationType::TestId, &pickle.id),
            Annotation::new(
                AnnotationType::Tags,
                serde_json::Value::from(tags.clone()).to_string(),
            ),
        ];
        Self { tags, annotations }
    }

    /// Returns the description of the first [`Annotation`] of the given
    /// `kind`.
    #[must_use]
    pub fn annotation(&self, kind: AnnotationType) -> Option<&str> {
        find(&self.annotations, kind)
    }

    /// Returns the scenario identifier these [`TestDetails`] carry.
    #[must_use]
    pub fn test_id(&self) -> Option<&str> {
        self.annotation(AnnotationType::TestId)
    }
}

/// Returns the description of the first [`Annotation`] of the given `kind`.
#[must_use]
pub fn find(annotations: &[Annotation], kind: AnnotationType) -> Option<&str> {
    annotations
        .iter()
        .find(|a| a.kind == kind)
        .map(|a| a.description.as_str())
}
