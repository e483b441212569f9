// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Registered step definitions and their resolution.

use std::{fmt, rc::Rc};

use futures::future::LocalBoxFuture;

use crate::World;

use super::{
    context::Context, error::StepError, location::Location, matcher::Matcher,
    StepFn,
};

/// One registered step implementation.
pub struct StepDefinition<S> {
    /// Pattern deciding which step texts this definition implements.
    matcher: Matcher,

    /// Where this definition was registered.
    location: Option<Location>,

    /// Body invoked for a matching step.
    body: StepFn<S>,
}

// Implemented manually to omit redundant `S: Clone` trait bound, imposed by
// `#[derive(Clone)]`.
impl<S> Clone for StepDefinition<S> {
    fn clone(&self) -> Self {
        Self {
            matcher: self.matcher.clone(),
            location: self.location,
            body: Rc::clone(&self.body),
        }
    }
}

impl<S> fmt::Debug for StepDefinition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("matcher", &self.matcher.as_str())
            .field("location", &self.location)
            .field("body", &format!("{:p}", Rc::as_ptr(&self.body)))
            .finish()
    }
}

impl<S> StepDefinition<S> {
    /// Creates a new [`StepDefinition`].
    #[must_use]
    pub fn new(
        matcher: Matcher,
        location: Option<Location>,
        body: StepFn<S>,
    ) -> Self {
        Self { matcher, location, body }
    }

    /// Returns the [`Matcher`] of this [`StepDefinition`].
    #[must_use]
    pub const fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Returns the [`Location`] this [`StepDefinition`] was registered at.
    #[must_use]
    pub const fn location(&self) -> Option<Location> {
        self.location
    }

    /// Indicates whether the given step `text` applies to this
    /// [`StepDefinition`].
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.matcher.matches(text)
    }

    /// Extracts positional parameters of the given step `text`, if it matches.
    #[must_use]
    pub fn parameters(&self, text: &str) -> Option<Vec<String>> {
        self.matcher.captures(text)
    }

    /// Returns the body of this [`StepDefinition`].
    #[must_use]
    pub fn body(&self) -> StepFn<S> {
        Rc::clone(&self.body)
    }

    /// Invokes the body of this [`StepDefinition`].
    pub fn invoke<'a>(
        &self,
        world: &'a mut World<S>,
        ctx: Context,
    ) -> LocalBoxFuture<'a, ()> {
        (self.body)(world, ctx)
    }
}

/// Ordered collection of [`StepDefinition`]s.
///
/// Every step text has to match exactly one [`StepDefinition`].
pub struct Collection<S> {
    definitions: Vec<StepDefinition<S>>,
}

// Implemented manually to omit redundant `S: Clone` trait bound, imposed by
// `#[derive(Clone)]`.
impl<S> Clone for Collection<S> {
    fn clone(&self) -> Self {
        Self { definitions: self.definitions.clone() }
    }
}

// Implemented manually to omit redundant `S: Default` trait bound, imposed by
// `#[derive(Default)]`.
impl<S> Default for Collection<S> {
    fn default() -> Self {
        Self { definitions: Vec::new() }
    }
}

impl<S> fmt::Debug for Collection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.definitions).finish()
    }
}

impl<S> Collection<S> {
    /// Creates a new empty [`Collection`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a [`StepDefinition`] to this [`Collection`].
    pub fn push(&mut self, definition: StepDefinition<S>) {
        self.definitions.push(definition);
    }

    /// Returns the number of [`StepDefinition`]s.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Indicates whether this [`Collection`] has no [`StepDefinition`]s.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Iterates over [`StepDefinition`]s in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &StepDefinition<S>> {
        self.definitions.iter()
    }

    /// Resolves the given step `text` to the only [`StepDefinition`] matching
    /// it, along with the extracted parameters.
    ///
    /// # Errors
    ///
    /// - [`StepError::Undefined`] if no [`StepDefinition`] matches;
    /// - [`StepError::Ambiguous`] if more than one does.
    pub fn resolve(
        &self,
        text: &str,
    ) -> Result<(&StepDefinition<S>, Vec<String>), StepError> {
        let mut found = self
            .definitions
            .iter()
            .filter_map(|def| def.parameters(text).map(|params| (def, params)))
            .collect::<Vec<_>>();

        match found.len() {
            0 => Err(StepError::Undefined(text.to_owned())),
            // Instead of `.unwrap()` to avoid documenting `# Panics`.
            1 => Ok(found.pop().unwrap_or_else(|| unreachable!())),
            _ => Err(StepError::Ambiguous {
                step: text.to_owned(),
                possible_matches: found
                    .into_iter()
                    .map(|(def, _)| (def.matcher.as_str().to_owned(), def.location))
                    .collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt as _;
    use regex::Regex;

    use super::*;

    fn noop<S>() -> StepFn<S> {
        Rc::new(|_, _| async {}.boxed_local())
    }

    fn collection() -> Collection<()> {
        let mut c = Collection::new();
        c.push(StepDefinition::new(
            Matcher::regex(Regex::new(r"^I have (\d+) cucumbers$").unwrap()),
            Some(Location::new("steps.rs", 1, 1)),
            noop(),
        ));
        c.push(StepDefinition::new(
            Matcher::expression("I eat {int}").unwrap(),
            Some(Location::new("steps.rs", 2, 1)),
            noop(),
        ));
        c.push(StepDefinition::new(
            Matcher::regex(Regex::new(r"^I eat (\d+)$").unwrap()),
            Some(Location::new("steps.rs", 3, 1)),
            noop(),
        ));
        c
    }

    #[test]
    fn resolves_single_match_with_parameters() {
        let c = collection();
        let (def, params) = c.resolve("I have 5 cucumbers").unwrap();
        assert_eq!(def.location(), Some(Location::new("steps.rs", 1, 1)));
        assert_eq!(params, ["5"]);
    }

    #[test]
    fn undefined_when_nothing_matches() {
        let err = collection().resolve("I fly").unwrap_err();
        assert_eq!(err, StepError::Undefined("I fly".into()));
    }

    #[test]
    fn ambiguous_when_many_match() {
        let err = collection().resolve("I eat 3").unwrap_err();
        let StepError::Ambiguous { step, possible_matches } = err else {
            panic!("expected ambiguity");
        };
        assert_eq!(step, "I eat 3");
        assert_eq!(possible_matches.len(), 2);
    }
}
