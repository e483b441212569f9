// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Compiled scenario model: [`Document`]s of executable [`Pickle`]s.
//!
//! This is the shape the [`Adapter`] consumes. It is usually produced by
//! [`feature::compile()`] out of a parsed [`gherkin::Feature`], but may be
//! built by hand as well.
//!
//! [`Adapter`]: crate::Adapter
//! [`feature::compile()`]: crate::feature::compile

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use itertools::Itertools as _;
use serde::Serialize;

/// Tag of a [`Pickle`], stored with its leading `@`.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct Tag {
    /// Name of this [`Tag`], including the leading `@`.
    pub name: String,
}

impl Tag {
    /// Creates a new [`Tag`], prepending `@` if the `name` misses it.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let name = if name.starts_with('@') { name } else { format!("@{name}") };
        Self { name }
    }

    /// Returns the name of this [`Tag`] without the leading `@`.
    #[must_use]
    pub fn bare(&self) -> &str {
        self.name.trim_start_matches('@')
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Structured argument of a [`PickleStep`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StepArgument {
    /// [Doc string][1] argument.
    ///
    /// [1]: https://cucumber.io/docs/gherkin/reference#doc-strings
    DocString(String),

    /// [Data table][1] argument, row by row.
    ///
    /// [1]: https://cucumber.io/docs/gherkin/reference#data-tables
    DataTable(Vec<Vec<String>>),
}

impl StepArgument {
    /// Returns the label appended to a step title carrying this argument.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::DocString(_) => " [MultiLine]",
            Self::DataTable(_) => " [DataTable]",
        }
    }
}

/// Single executable line of a [`Pickle`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickleStep {
    /// Identifier of this [`PickleStep`], unique inside its [`Pickle`].
    pub id: String,

    /// Keyword the step was written with (`Given`, `And`, etc.).
    pub keyword: String,

    /// Text matched against step definitions.
    pub text: String,

    /// Optional structured argument.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument: Option<StepArgument>,
}

impl PickleStep {
    /// Creates a new [`PickleStep`] with the given `text`.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            keyword: String::new(),
            text: text.into(),
            argument: None,
        }
    }

    /// Sets the [`StepArgument`] of this [`PickleStep`].
    #[must_use]
    pub fn with_argument(mut self, argument: StepArgument) -> Self {
        self.argument = Some(argument);
        self
    }

    /// Sets the keyword of this [`PickleStep`].
    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = keyword.into();
        self
    }

    /// Returns the title this step is reported under.
    #[must_use]
    pub fn title(&self) -> String {
        match &self.argument {
            Some(arg) => format!("{}{}", self.text, arg.label()),
            None => self.text.clone(),
        }
    }
}

/// Line and column inside a feature source.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize)]
pub struct Position {
    /// One-based line.
    pub line: usize,

    /// One-based column.
    pub column: usize,
}

/// One concrete executable scenario (a scenario, or one row of an outline).
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pickle {
    /// Identifier of this [`Pickle`], unique inside its [`Document`].
    pub id: String,

    /// Name of this [`Pickle`], unique inside its [`Document`].
    pub name: String,

    /// URI of the source this [`Pickle`] was compiled from.
    pub uri: String,

    /// [`Tag`]s, including the inherited ones.
    pub tags: Vec<Tag>,

    /// Ordered [`PickleStep`]s.
    pub steps: Vec<PickleStep>,

    /// [`Position`] of the scenario (or the outline row) in its source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Position>,
}

impl Pickle {
    /// Creates a new [`Pickle`] named `name` without any steps.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            uri: String::new(),
            tags: Vec::new(),
            steps: Vec::new(),
            location: None,
        }
    }

    /// Sets the identifier of this [`Pickle`].
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Appends a [`Tag`] to this [`Pickle`].
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(Tag::new(tag));
        self
    }

    /// Appends a [`PickleStep`] to this [`Pickle`].
    #[must_use]
    pub fn with_step(mut self, step: PickleStep) -> Self {
        if step.id.is_empty() {
            let id = self.steps.len().to_string();
            self.steps.push(PickleStep { id, ..step });
        } else {
            self.steps.push(step);
        }
        self
    }

    /// Sets the [`Position`] of this [`Pickle`].
    #[must_use]
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.location = Some(Position { line, column });
        self
    }

    /// Returns the tag names of this [`Pickle`] without duplicates, in order
    /// of their first appearance.
    #[must_use]
    pub fn unique_tags(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.clone()).unique().collect()
    }
}

/// One compiled feature source.
#[derive(Clone, Debug, Serialize)]
pub struct Document {
    /// Name of the feature.
    pub name: String,

    /// URI of the feature source.
    pub uri: String,

    /// Raw parsed form, passed through to hooks untouched.
    #[serde(skip)]
    pub feature: Option<Arc<gherkin::Feature>>,

    /// Executable [`Pickle`]s in source order.
    pub pickles: Vec<Arc<Pickle>>,
}

impl Document {
    /// Creates a new [`Document`] out of the given [`Pickle`]s.
    ///
    /// Duplicated [`Pickle`] names (and identifiers) get an occurrence suffix,
    /// so the second `Eat` becomes `Eat (2)`. [`Pickle`]s without an `uri`
    /// inherit the one of this [`Document`], and [`Pickle`]s without an
    /// identifier get one derived from it, or from the [`Document`] name if
    /// there is no `uri` at all.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        uri: impl Into<String>,
        pickles: impl IntoIterator<Item = Pickle>,
    ) -> Self {
        let (name, uri) = (name.into(), uri.into());
        let mut names = Occurrences::default();
        let mut ids = Occurrences::default();

        let pickles = pickles
            .into_iter()
            .enumerate()
            .map(|(n, mut p)| {
                if p.uri.is_empty() {
                    p.uri.clone_from(&uri);
                }
                if p.id.is_empty() {
                    let base = if p.uri.is_empty() { &name } else { &p.uri };
                    p.id = match p.location {
                        Some(pos) => format!("{base}:{}", pos.line),
                        None => format!("{base}#{n}"),
                    };
                }
                p.name = names.disambiguate(&p.name);
                p.id = ids.disambiguate(&p.id);
                Arc::new(p)
            })
            .collect();

        Self { name, uri, feature: None, pickles }
    }

    /// Attaches the raw parsed [`gherkin::Feature`] to this [`Document`].
    #[must_use]
    pub fn with_feature(mut self, feature: gherkin::Feature) -> Self {
        self.feature = Some(Arc::new(feature));
        self
    }
}

/// Tracker of already taken names, producing unique ones.
#[derive(Debug, Default)]
struct Occurrences {
    /// Number of times every original name has been seen.
    seen: HashMap<String, usize>,

    /// Names already given out.
    taken: HashSet<String>,
}

impl Occurrences {
    fn disambiguate(&mut self, name: &str) -> String {
        let count = self.seen.entry(name.to_owned()).or_default();
        *count += 1;

        let mut n = *count;
        let mut candidate = name.to_owned();
        while n > 1 || self.taken.contains(&candidate) {
            n = n.max(2);
            candidate = format!("{name} ({n})");
            if !self.taken.contains(&candidate) {
                break;
            }
            n += 1;
        }
        _ = self.taken.insert(candidate.clone());
        candidate
    }
}
