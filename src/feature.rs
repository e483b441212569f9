// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Compilation of [`gherkin::Feature`]s into executable [`Document`]s.

use std::{iter, mem, path::PathBuf};

use derive_more::with_trait::{Display, Error};
use lazy_regex::regex;
use sealed::sealed;

use crate::pickle::{Document, Pickle, PickleStep, Position, StepArgument};

/// Helper methods to operate on [`gherkin::Feature`]s.
#[sealed]
pub trait Ext: Sized {
    /// Expands [`Scenario Outline`][1] [`Examples`][2].
    ///
    /// So this one:
    /// ```gherkin
    /// Feature: Hungry
    ///   Scenario Outline: eating
    ///     Given there are <start> cucumbers
    ///     When I eat <eat> cucumbers
    ///
    ///     Examples:
    ///       | start | eat |
    ///       |    12 |   5 |
    ///       |    20 |   4 |
    /// ```
    ///
    /// Becomes two scenarios, one per row, with `<start>` and `<eat>`
    /// replaced in the name, steps, doc strings and tables. Every expanded
    /// scenario is positioned at its row, and inherits the tags of its
    /// [`Examples`][2].
    ///
    /// # Errors
    ///
    /// If a placeholder has no column to be resolved from.
    ///
    /// [1]: https://cucumber.io/docs/gherkin/reference#scenario-outline
    /// [2]: https://cucumber.io/docs/gherkin/reference#examples
    fn expand_examples(self) -> Result<Self, ExpandExamplesError>;

    /// Counts all the [`Feature`]'s [`Scenario`]s, including [`Rule`]s inside.
    ///
    /// [`Feature`]: gherkin::Feature
    /// [`Rule`]: gherkin::Rule
    /// [`Scenario`]: gherkin::Scenario
    #[must_use]
    fn count_scenarios(&self) -> usize;
}

#[sealed]
impl Ext for gherkin::Feature {
    fn expand_examples(mut self) -> Result<Self, ExpandExamplesError> {
        let path = self.path.clone();
        let expand = |scenarios: Vec<gherkin::Scenario>| -> Result<_, _> {
            scenarios
                .into_iter()
                .flat_map(|s| expand_scenario(s, path.as_ref()))
                .collect()
        };

        for r in &mut self.rules {
            r.scenarios = expand(mem::take(&mut r.scenarios))?;
        }
        self.scenarios = expand(mem::take(&mut self.scenarios))?;

        Ok(self)
    }

    fn count_scenarios(&self) -> usize {
        self.scenarios.len()
            + self.rules.iter().map(|r| r.scenarios.len()).sum::<usize>()
    }
}

/// Expands [`Scenario`] [`Examples`], if any.
///
/// [`Examples`]: gherkin::Examples
/// [`Scenario`]: gherkin::Scenario
fn expand_scenario(
    scenario: gherkin::Scenario,
    path: Option<&PathBuf>,
) -> Vec<Result<gherkin::Scenario, ExpandExamplesError>> {
    if scenario.examples.is_empty() {
        return vec![Ok(scenario)];
    }

    let mut out = Vec::new();
    for example in &scenario.examples {
        let Some((header, rows)) =
            example.table.as_ref().and_then(|t| t.rows.split_first())
        else {
            continue;
        };

        for (n, row) in rows.iter().enumerate() {
            let replace = |text: &str, pos: gherkin::LineCol| {
                substitute(text, header, row).map_err(|name| {
                    ExpandExamplesError { pos, name, path: path.cloned() }
                })
            };

            let mut expanded = scenario.clone();
            expanded.examples.clear();

            // Examples keyword, then the header row, then the values.
            expanded.position = example.position;
            expanded.position.line += n + 2;
            expanded.tags.extend(example.tags.iter().cloned());

            let filled = fill(&mut expanded, &replace);
            out.push(filled.map(|()| expanded));
        }
    }
    out
}

/// Replaces placeholders in the name, steps, doc strings and tables of the
/// `scenario`.
fn fill<R>(
    scenario: &mut gherkin::Scenario,
    replace: &R,
) -> Result<(), ExpandExamplesError>
where
    R: Fn(&str, gherkin::LineCol) -> Result<String, ExpandExamplesError>,
{
    scenario.name = replace(&scenario.name, scenario.position)?;
    for s in &mut scenario.steps {
        for value in iter::once(&mut s.value)
            .chain(s.docstring.iter_mut())
            .chain(
                s.table
                    .iter_mut()
                    .flat_map(|t| t.rows.iter_mut().flat_map(|r| r.iter_mut())),
            )
        {
            *value = replace(value, s.position)?;
        }
    }
    Ok(())
}

/// Replaces `<name>` placeholders in the `text` with the values of the
/// matching `header` columns of the `row`.
///
/// Returns the name of the first unknown placeholder on failure.
fn substitute(
    text: &str,
    header: &[String],
    row: &[String],
) -> Result<String, String> {
    let mut unknown = None;
    let replaced = regex!(r"<([^>\s]+)>")
        .replace_all(text, |cap: &regex::Captures<'_>| {
            let name = &cap[1];
            header
                .iter()
                .zip(row)
                .find_map(|(k, v)| (k == name).then_some(v.as_str()))
                .unwrap_or_else(|| {
                    _ = unknown.get_or_insert_with(|| name.to_owned());
                    ""
                })
                .to_owned()
        })
        .into_owned();
    unknown.map_or(Ok(replaced), Err)
}

/// Error of [`Scenario Outline`][1] expansion encountering an unknown
/// placeholder.
///
/// [1]: https://cucumber.io/docs/gherkin/reference#scenario-outline
#[derive(Clone, Debug, Display, Error)]
#[display(
    "Failed to resolve <{name}> at {}:{}:{}",
    path.as_deref().map(|p| p.display().to_string()).unwrap_or_default(),
    pos.line,
    pos.col,
)]
pub struct ExpandExamplesError {
    /// Position of the unknown placeholder.
    pub pos: gherkin::LineCol,

    /// Name of the unknown placeholder.
    pub name: String,

    /// Path to the `.feature` file, if any.
    pub path: Option<PathBuf>,
}

/// Compiles a parsed [`gherkin::Feature`] into a [`Document`].
///
/// Every scenario (and every row of every outline) becomes a [`Pickle`]
/// whose steps are the background steps followed by the scenario ones, and
/// whose tags are the feature, rule, scenario and examples tags.
///
/// # Errors
///
/// If an outline cannot be expanded.
pub fn compile(
    feature: gherkin::Feature,
    uri: impl Into<String>,
) -> Result<Document, ExpandExamplesError> {
    let uri = uri.into();
    let expanded = feature.clone().expand_examples()?;
    let background = expanded.background.as_ref().map(|b| b.steps.as_slice());

    let mut pickles = Vec::with_capacity(expanded.count_scenarios());
    for s in &expanded.scenarios {
        pickles.push(pickle(&uri, [&expanded.tags], [background], s));
    }
    for r in &expanded.rules {
        let rule_background = r.background.as_ref().map(|b| b.steps.as_slice());
        for s in &r.scenarios {
            pickles.push(pickle(
                &uri,
                [&expanded.tags, &r.tags],
                [background, rule_background],
                s,
            ));
        }
    }

    tracing::trace!(uri = %uri, scenarios = pickles.len(), "feature compiled");
    Ok(Document::new(expanded.name, uri, pickles).with_feature(feature))
}

/// Compiles a single expanded [`gherkin::Scenario`].
fn pickle<'a, const N: usize>(
    uri: &str,
    inherited_tags: [&'a Vec<String>; N],
    backgrounds: [Option<&'a [gherkin::Step]>; N],
    scenario: &'a gherkin::Scenario,
) -> Pickle {
    let steps = backgrounds
        .into_iter()
        .flatten()
        .flatten()
        .chain(&scenario.steps)
        .map(|s| pickle_step(uri, s));
    let tags = inherited_tags
        .into_iter()
        .flatten()
        .chain(&scenario.tags);

    let mut pickle = Pickle::new(scenario.name.as_str())
        .with_id(format!("{uri}:{}", scenario.position.line));
    pickle.uri = uri.to_owned();
    pickle.location = Some(scenario.position.into());
    for tag in tags {
        pickle = pickle.with_tag(tag.as_str());
    }
    for step in steps {
        pickle = pickle.with_step(step);
    }
    pickle
}

fn pickle_step(uri: &str, step: &gherkin::Step) -> PickleStep {
    let mut out = PickleStep::new(step.value.as_str())
        .with_keyword(step.keyword.trim());
    out.id = format!("{uri}:{}", step.position.line);
    if let Some(doc) = &step.docstring {
        out = out.with_argument(StepArgument::DocString(doc.clone()));
    } else if let Some(table) = &step.table {
        out = out.with_argument(StepArgument::DataTable(table.rows.clone()));
    }
    out
}

impl From<gherkin::LineCol> for Position {
    fn from(pos: gherkin::LineCol) -> Self {
        Self { line: pos.line, column: pos.col }
    }
}
