// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-scenario state machine.

use std::{panic::AssertUnwindSafe, rc::Rc, sync::Arc};

use futures::{
    future::{self, LocalBoxFuture},
    FutureExt as _,
};

use crate::{
    hook::{ScenarioHookParams, StepHookParams},
    host::{HostFuture, Outcome, TestInfo},
    pickle::{Document, Pickle, PickleStep},
    result::HookResult,
    step::{Context, StepDefinition},
    ExecutionResult, Failure, Registry, Services, State, World,
};

/// Executes a single [`Pickle`] against a [`Registry`], reporting every hook
/// and step as a named step of the current test.
pub(crate) struct ScenarioRun<S> {
    registry: Rc<Registry<S>>,
    document: Arc<Document>,
    pickle: Arc<Pickle>,
}

// Implemented manually to omit redundant `S: Clone` trait bound, imposed by
// `#[derive(Clone)]`.
impl<S> Clone for ScenarioRun<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
            document: Arc::clone(&self.document),
            pickle: Arc::clone(&self.pickle),
        }
    }
}

impl<S: State> ScenarioRun<S> {
    pub(crate) fn new(
        registry: Rc<Registry<S>>,
        document: Arc<Document>,
        pickle: Arc<Pickle>,
    ) -> Self {
        Self { registry, document, pickle }
    }

    pub(crate) fn pickle(&self) -> &Pickle {
        &self.pickle
    }

    /// Runs the whole scenario: constructs a [`World`], runs the before-hooks,
    /// the steps and the after-hooks, and drops the [`World`].
    pub(crate) async fn run(
        &self,
        info: &dyn TestInfo,
        services: Services,
        fixtures: S::Fixtures,
    ) -> Outcome {
        let mut result = ExecutionResult::new();
        let mut world = self.construct(services, fixtures).await?;

        self.before_hooks(info, &mut world, &mut result).await;
        self.steps(info, &mut world, &mut result).await;
        self.after_hooks(info, &mut world, &mut result).await;
        drop(world);

        tracing::debug!(
            scenario = %self.pickle.name,
            failed = result.is_failed(),
            "scenario finished",
        );
        result.into_outcome()
    }

    /// Constructs a fresh [`World`] and hands the `fixtures` over to it.
    pub(crate) async fn construct(
        &self,
        services: Services,
        fixtures: S::Fixtures,
    ) -> Result<World<S>, Failure> {
        tracing::debug!(scenario = %self.pickle.name, "constructing world");

        let created = AssertUnwindSafe(World::create(
            Rc::clone(&self.registry),
            services,
        ))
        .catch_unwind()
        .await
        .map_err(Failure::from_panic)?;

        let mut world = created.map_err(|e| {
            Failure::new(format!("Failed to construct World: {e}"))
        })?;
        world.init(fixtures);
        Ok(world)
    }

    /// Runs the applicable before-scenario hooks, stopping at the first
    /// failing one.
    pub(crate) async fn before_hooks(
        &self,
        info: &dyn TestInfo,
        world: &mut World<S>,
        result: &mut ExecutionResult,
    ) {
        let hooks = self.registry.before_hooks().iter();
        for hook in hooks.filter(|h| h.applies_to(&self.pickle)) {
            let params = self.scenario_params(info, None);
            let body = catching((hook.body())(world, &params));
            if let Err(e) =
                info.step(hook.title("Before"), hook.location(), body).await
            {
                tracing::warn!(
                    scenario = %self.pickle.name,
                    error = %e,
                    "before hook failed",
                );
                result.fail(e);
                break;
            }
        }
    }

    /// Runs the steps one by one, until the first failure.
    pub(crate) async fn steps(
        &self,
        info: &dyn TestInfo,
        world: &mut World<S>,
        result: &mut ExecutionResult,
    ) {
        for step in &self.pickle.steps {
            if result.is_failed() {
                break;
            }

            let (def, matches) = match self.registry.steps().resolve(&step.text)
            {
                Ok(found) => found,
                Err(e) => {
                    let failure = Failure::from(e);
                    let report = future::ready(Err(failure.clone()));
                    _ = info.step(&step.title(), None, report.boxed_local()).await;
                    result.fail(failure);
                    break;
                }
            };

            let body = self.run_step(info, world, result, step, def, matches);
            _ = info.step(&step.title(), def.location(), body).await;
        }
    }

    /// Runs the applicable after-scenario hooks, all of them, passing the
    /// final [`ExecutionResult`] to each one.
    pub(crate) async fn after_hooks(
        &self,
        info: &dyn TestInfo,
        world: &mut World<S>,
        result: &mut ExecutionResult,
    ) {
        let hooks = self.registry.after_hooks().iter();
        for hook in hooks.filter(|h| h.applies_to(&self.pickle)) {
            let params = self.scenario_params(info, Some(result.snapshot()));
            let body = catching((hook.body())(world, &params));
            if let Err(e) =
                info.step(hook.title("After"), hook.location(), body).await
            {
                tracing::warn!(
                    scenario = %self.pickle.name,
                    error = %e,
                    "after hook failed",
                );
                result.fail(e);
            }
        }
    }

    /// Runs a resolved step wrapped with its before-step and after-step
    /// hooks.
    fn run_step<'a>(
        &'a self,
        info: &'a dyn TestInfo,
        world: &'a mut World<S>,
        result: &'a mut ExecutionResult,
        step: &'a PickleStep,
        def: &'a StepDefinition<S>,
        matches: Vec<String>,
    ) -> HostFuture<'a> {
        async move {
            let hooks = self.registry.before_step_hooks().iter();
            for hook in hooks.filter(|h| h.applies_to(&self.pickle)) {
                let params = self.step_params(info, step, None);
                let body = catching((hook.body())(world, &params));
                if let Err(e) = info
                    .step(hook.title("Before Step"), hook.location(), body)
                    .await
                {
                    result.fail(e.clone());
                    return Err(e);
                }
            }

            tracing::trace!(step = %step.text, "invoking step");
            let ctx = Context::new(
                step.text.as_str(),
                matches,
                step.argument.clone(),
                def.location(),
            );
            let mut outcome = catching(def.invoke(world, ctx)).await;
            if let Err(e) = &outcome {
                result.fail(e.clone());
            }

            let hooks = self.registry.after_step_hooks().iter();
            for hook in hooks.filter(|h| h.applies_to(&self.pickle)) {
                let params =
                    self.step_params(info, step, Some(result.snapshot()));
                let body = catching((hook.body())(world, &params));
                if let Err(e) = info
                    .step(hook.title("After Step"), hook.location(), body)
                    .await
                {
                    tracing::warn!(
                        step = %step.text,
                        error = %e,
                        "after step hook failed",
                    );
                    result.fail(e.clone());
                    if outcome.is_ok() {
                        outcome = Err(e);
                    }
                }
            }
            outcome
        }
        .boxed_local()
    }

    fn started_id(&self, info: &dyn TestInfo) -> String {
        format!("{}#{}", self.pickle.id, info.retry())
    }

    fn scenario_params(
        &self,
        info: &dyn TestInfo,
        result: Option<HookResult>,
    ) -> ScenarioHookParams {
        ScenarioHookParams {
            document: Arc::clone(&self.document),
            pickle: Arc::clone(&self.pickle),
            test_case_started_id: self.started_id(info),
            result,
        }
    }

    fn step_params(
        &self,
        info: &dyn TestInfo,
        step: &PickleStep,
        result: Option<HookResult>,
    ) -> StepHookParams {
        StepHookParams {
            document: Arc::clone(&self.document),
            pickle: Arc::clone(&self.pickle),
            pickle_step: step.clone(),
            test_case_started_id: self.started_id(info),
            test_step_id: step.id.clone(),
            result,
        }
    }
}

/// Converts a panic of the `body` into a failed [`Outcome`].
pub(crate) fn catching(body: LocalBoxFuture<'_, ()>) -> HostFuture<'_> {
    AssertUnwindSafe(body)
        .catch_unwind()
        .map(|r| r.map_err(Failure::from_panic))
        .boxed_local()
}
