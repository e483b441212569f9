// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Support code: step definitions and hooks.

use std::{fmt, rc::Rc};

use futures::future::LocalBoxFuture;

use crate::{
    hook::{Hook, RunOnceFn, ScenarioHookFn, StepHookFn},
    step::{Collection, Context, Location, Matcher, StepDefinition},
    World,
};

/// Ordered collections of step definitions and hooks a scenario runs
/// against.
///
/// Everything is kept in registration order, which is also the order hooks of
/// the same category run in.
pub struct Registry<S> {
    /// Step definitions.
    steps: Collection<S>,

    /// Hooks run once before all scenarios.
    before_all: Vec<Hook<RunOnceFn>>,

    /// Hooks run once after all scenarios.
    after_all: Vec<Hook<RunOnceFn>>,

    /// Hooks run before every scenario.
    before: Vec<Hook<ScenarioHookFn<S>>>,

    /// Hooks run after every scenario.
    after: Vec<Hook<ScenarioHookFn<S>>>,

    /// Hooks run before every step.
    before_step: Vec<Hook<StepHookFn<S>>>,

    /// Hooks run after every step.
    after_step: Vec<Hook<StepHookFn<S>>>,
}

// Implemented manually to omit redundant `S: Default` trait bound, imposed by
// `#[derive(Default)]`.
impl<S> Default for Registry<S> {
    fn default() -> Self {
        Self {
            steps: Collection::new(),
            before_all: Vec::new(),
            after_all: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            before_step: Vec::new(),
            after_step: Vec::new(),
        }
    }
}

impl<S> fmt::Debug for Registry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("steps", &self.steps)
            .field("before_all", &self.before_all)
            .field("after_all", &self.after_all)
            .field("before", &self.before)
            .field("after", &self.after)
            .field("before_step", &self.before_step)
            .field("after_step", &self.after_step)
            .finish()
    }
}

impl<S> Registry<S> {
    /// Creates a new empty [`Registry`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a step definition.
    ///
    /// The body receives the scenario's [`World`] and a [`Context`] with the
    /// parameters extracted by the `matcher`.
    #[must_use]
    #[track_caller]
    pub fn step<M, F>(mut self, matcher: M, body: F) -> Self
    where
        M: Into<Matcher>,
        F: for<'a> Fn(&'a mut World<S>, Context) -> LocalBoxFuture<'a, ()>
            + 'static,
    {
        let location = Location::caller();
        self.steps.push(StepDefinition::new(
            matcher.into(),
            Some(location),
            Rc::new(body),
        ));
        self
    }

    /// Registers a ready [`StepDefinition`].
    #[must_use]
    pub fn step_definition(mut self, definition: StepDefinition<S>) -> Self {
        self.steps.push(definition);
        self
    }

    /// Registers a [`Hook`] run once before all scenarios.
    #[must_use]
    pub fn before_all(mut self, hook: Hook<RunOnceFn>) -> Self {
        self.before_all.push(hook);
        self
    }

    /// Registers a [`Hook`] run once after all scenarios.
    #[must_use]
    pub fn after_all(mut self, hook: Hook<RunOnceFn>) -> Self {
        self.after_all.push(hook);
        self
    }

    /// Registers a [`Hook`] run before every applicable scenario.
    #[must_use]
    pub fn before(mut self, hook: Hook<ScenarioHookFn<S>>) -> Self {
        self.before.push(hook);
        self
    }

    /// Registers a [`Hook`] run after every applicable scenario.
    #[must_use]
    pub fn after(mut self, hook: Hook<ScenarioHookFn<S>>) -> Self {
        self.after.push(hook);
        self
    }

    /// Registers a [`Hook`] run before every step of applicable scenarios.
    #[must_use]
    pub fn before_step(mut self, hook: Hook<StepHookFn<S>>) -> Self {
        self.before_step.push(hook);
        self
    }

    /// Registers a [`Hook`] run after every step of applicable scenarios.
    #[must_use]
    pub fn after_step(mut self, hook: Hook<StepHookFn<S>>) -> Self {
        self.after_step.push(hook);
        self
    }

    /// Returns the step definitions.
    #[must_use]
    pub const fn steps(&self) -> &Collection<S> {
        &self.steps
    }

    /// Returns the hooks run once before all scenarios.
    #[must_use]
    pub fn before_all_hooks(&self) -> &[Hook<RunOnceFn>] {
        &self.before_all
    }

    /// Returns the hooks run once after all scenarios.
    #[must_use]
    pub fn after_all_hooks(&self) -> &[Hook<RunOnceFn>] {
        &self.after_all
    }

    /// Returns the hooks run before every scenario.
    #[must_use]
    pub fn before_hooks(&self) -> &[Hook<ScenarioHookFn<S>>] {
        &self.before
    }

    /// Returns the hooks run after every scenario.
    #[must_use]
    pub fn after_hooks(&self) -> &[Hook<ScenarioHookFn<S>>] {
        &self.after
    }

    /// Returns the hooks run before every step.
    #[must_use]
    pub fn before_step_hooks(&self) -> &[Hook<StepHookFn<S>>] {
        &self.before_step
    }

    /// Returns the hooks run after every step.
    #[must_use]
    pub fn after_step_hooks(&self) -> &[Hook<StepHookFn<S>>] {
        &self.after_step
    }
}
