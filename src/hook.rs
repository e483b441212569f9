// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Lifecycle hooks.

use std::{fmt, future::Future, rc::Rc, sync::Arc};

use futures::{future::LocalBoxFuture, FutureExt as _};
use gherkin::tagexpr::TagOperation;
use serde::Serialize;

use crate::{
    error::ConfigError,
    pickle::{Document, Pickle, PickleStep},
    result::HookResult,
    step::Location,
    tag::{self, Ext as _},
    World,
};

/// Body of a [`Hook`] run once per suite.
pub type RunOnceFn = Rc<dyn Fn() -> LocalBoxFuture<'static, ()>>;

/// Body of a [`Hook`] run around every scenario.
pub type ScenarioHookFn<S> = Rc<
    dyn for<'a> Fn(
        &'a mut World<S>,
        &'a ScenarioHookParams,
    ) -> LocalBoxFuture<'a, ()>,
>;

/// Body of a [`Hook`] run around every step.
pub type StepHookFn<S> = Rc<
    dyn for<'a> Fn(&'a mut World<S>, &'a StepHookParams) -> LocalBoxFuture<'a, ()>,
>;

/// Registered lifecycle hook.
///
/// Fails by panicking, the same way step bodies do.
pub struct Hook<F> {
    /// Name reported instead of the default one for the hook's category.
    name: Option<String>,

    /// Tag expression a scenario has to satisfy for this [`Hook`] to run.
    tags: Option<TagOperation>,

    /// Where this [`Hook`] was created.
    location: Option<Location>,

    /// Body of this [`Hook`].
    body: F,
}

// Implemented manually to omit redundant trait bounds on the body.
impl<F: Clone> Clone for Hook<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            tags: self.tags.clone(),
            location: self.location,
            body: self.body.clone(),
        }
    }
}

impl<F> fmt::Debug for Hook<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl<F> Hook<F> {
    /// Creates a new [`Hook`] with the given body, located at the caller.
    #[must_use]
    #[track_caller]
    fn with_body(body: F) -> Self {
        Self {
            name: None,
            tags: None,
            location: Some(Location::caller()),
            body,
        }
    }

    /// Sets the name this [`Hook`] is reported under.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Restricts this [`Hook`] to scenarios satisfying the tag `expr`, like
    /// `@browser and not @mobile`.
    ///
    /// # Errors
    ///
    /// If the `expr` is not a valid tag expression.
    pub fn tagged(self, expr: &str) -> Result<Self, ConfigError> {
        Ok(self.with_tags(tag::parse(expr)?))
    }

    /// Restricts this [`Hook`] to scenarios satisfying the given
    /// [`TagOperation`].
    #[must_use]
    pub fn with_tags(mut self, tags: TagOperation) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Overrides the [`Location`] of this [`Hook`].
    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Returns the declared name of this [`Hook`], if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the name this [`Hook`] is reported under, falling back to the
    /// provided `default` one.
    #[must_use]
    pub fn title<'s>(&'s self, default: &'s str) -> &'s str {
        self.name.as_deref().unwrap_or(default)
    }

    /// Returns the [`Location`] of this [`Hook`].
    #[must_use]
    pub const fn location(&self) -> Option<Location> {
        self.location
    }

    /// Returns the body of this [`Hook`].
    #[must_use]
    pub const fn body(&self) -> &F {
        &self.body
    }

    /// Indicates whether this [`Hook`] applies to the given [`Pickle`].
    ///
    /// A [`Hook`] without a tag expression applies to every [`Pickle`].
    #[must_use]
    pub fn applies_to(&self, pickle: &Pickle) -> bool {
        self.tags.as_ref().map_or(true, |t| t.applies_to(pickle))
    }
}

impl Hook<RunOnceFn> {
    /// Creates a [`Hook`] run once per suite.
    #[must_use]
    #[track_caller]
    pub fn run_once<F, Fut>(body: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        Self::with_body(Rc::new(move || body().boxed_local()))
    }
}

impl<S> Hook<ScenarioHookFn<S>> {
    /// Creates a [`Hook`] run around every applicable scenario.
    #[must_use]
    #[track_caller]
    pub fn scenario<F>(body: F) -> Self
    where
        F: for<'a> Fn(
                &'a mut World<S>,
                &'a ScenarioHookParams,
            ) -> LocalBoxFuture<'a, ()>
            + 'static,
    {
        Self::with_body(Rc::new(body))
    }
}

impl<S> Hook<StepHookFn<S>> {
    /// Creates a [`Hook`] run around every step of applicable scenarios.
    #[must_use]
    #[track_caller]
    pub fn step<F>(body: F) -> Self
    where
        F: for<'a> Fn(
                &'a mut World<S>,
                &'a StepHookParams,
            ) -> LocalBoxFuture<'a, ()>
            + 'static,
    {
        Self::with_body(Rc::new(body))
    }
}

/// Parameters of a [`Hook`] run around a scenario.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioHookParams {
    /// [`Document`] the scenario belongs to.
    #[serde(skip)]
    pub document: Arc<Document>,

    /// Executed scenario.
    pub pickle: Arc<Pickle>,

    /// Identifier of the current execution attempt of the scenario.
    pub test_case_started_id: String,

    /// Outcome of the scenario so far. Absent for before-hooks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<HookResult>,
}

/// Parameters of a [`Hook`] run around a step.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepHookParams {
    /// [`Document`] the scenario belongs to.
    #[serde(skip)]
    pub document: Arc<Document>,

    /// Executed scenario.
    pub pickle: Arc<Pickle>,

    /// Executed step.
    pub pickle_step: PickleStep,

    /// Identifier of the current execution attempt of the scenario.
    pub test_case_started_id: String,

    /// Identifier of the executed step.
    pub test_step_id: String,

    /// Outcome of the scenario so far. Absent for before-step hooks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<HookResult>,
}
