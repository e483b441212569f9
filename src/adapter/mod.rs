// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Registration of compiled scenarios as tests of a [`Host`].

mod execution;
mod table;

use std::{collections::HashMap, fmt, rc::Rc, str::FromStr, sync::Arc};

use futures::FutureExt as _;
use serde::{Deserialize, Serialize};

use crate::{
    host::{Host, Outcome, TestInfo},
    pickle::Document,
    ExecutionResult, Failure, Registry, Services, State, TestDetails,
};

use self::{
    execution::{catching, ScenarioRun},
    table::{AttemptKey, Entry, WorldTable},
};

/// How a scenario is laid out over the callbacks of a [`Host`].
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Everything runs in the test body, from [`World`] construction to
    /// after-hooks.
    ///
    /// [`World`]: crate::World
    #[default]
    Inline,

    /// [`World`] construction and before-hooks run in a `before_each`
    /// callback, steps run in the test body, and after-hooks run in an
    /// `after_each` callback.
    ///
    /// Callbacks find their scenario by the `testId` annotation and the
    /// attempt number of the current test.
    ///
    /// [`World`]: crate::World
    Split,
}

impl FromStr for Mode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "split" => Ok(Self::Split),
            _ => Err("possible options: inline, split"),
        }
    }
}

/// Registers one test per [`Pickle`] of its [`Document`]s, plus the
/// run-once hooks of its [`Registry`], in a [`Host`].
///
/// Every [`Document`] becomes a suite named after it.
///
/// [`Pickle`]: crate::Pickle
pub struct Adapter<S> {
    /// Steps and hooks scenarios run against.
    registry: Rc<Registry<S>>,

    /// Compiled features.
    documents: Vec<Arc<Document>>,

    /// [`Services`] handed over to every [`World`].
    ///
    /// [`World`]: crate::World
    services: Services,

    /// Layout of scenarios over the [`Host`] callbacks.
    mode: Mode,

    /// Scenarios in flight between [`Mode::Split`] callbacks.
    table: WorldTable<S>,
}

impl<S> fmt::Debug for Adapter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("registry", &self.registry)
            .field("documents", &self.documents)
            .field("services", &self.services)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl<S: State> Adapter<S> {
    /// Creates a new [`Adapter`] running scenarios against the given
    /// [`Registry`].
    #[must_use]
    pub fn new(registry: impl Into<Rc<Registry<S>>>) -> Self {
        Self {
            registry: registry.into(),
            documents: Vec::new(),
            services: Services::default(),
            mode: Mode::default(),
            table: WorldTable::default(),
        }
    }

    /// Adds a [`Document`] to register.
    #[must_use]
    pub fn document(mut self, document: impl Into<Arc<Document>>) -> Self {
        self.documents.push(document.into());
        self
    }

    /// Adds [`Document`]s to register.
    #[must_use]
    pub fn documents<I>(mut self, documents: I) -> Self
    where
        I: IntoIterator<Item = Document>,
    {
        self.documents.extend(documents.into_iter().map(Arc::new));
        self
    }

    /// Sets the [`Services`] handed over to every [`World`].
    ///
    /// Attachments are always routed to the test the [`World`] runs in.
    ///
    /// [`World`]: crate::World
    #[must_use]
    pub fn services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    /// Sets the [`Mode`] scenarios are registered in.
    #[must_use]
    pub const fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the number of [`Mode::Split`] scenarios whose [`World`] is
    /// constructed but not yet torn down.
    ///
    /// [`World`]: crate::World
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.table.len()
    }

    /// Registers everything in the given [`Host`].
    pub fn register<H>(&self, host: &mut H)
    where
        H: Host<Fixtures = S::Fixtures>,
    {
        self.register_before_all(host);
        for doc in &self.documents {
            tracing::debug!(
                document = %doc.name,
                scenarios = doc.pickles.len(),
                mode = ?self.mode,
                "registering document",
            );
            host.describe(&doc.name, |host| match self.mode {
                Mode::Inline => self.register_inline(host, doc),
                Mode::Split => self.register_split(host, doc),
            });
        }
        self.register_after_all(host);
    }

    fn register_inline<H>(&self, host: &mut H, doc: &Arc<Document>)
    where
        H: Host<Fixtures = S::Fixtures>,
    {
        for pickle in &doc.pickles {
            let run = ScenarioRun::new(
                Rc::clone(&self.registry),
                Arc::clone(doc),
                Arc::clone(pickle),
            );
            let services = self.services.clone();
            host.test(
                &pickle.name,
                TestDetails::for_pickle(pickle),
                Rc::new(move |info, fixtures| {
                    inline(run.clone(), services.clone(), info, fixtures)
                        .boxed_local()
                }),
            );
        }
    }

    fn register_split<H>(&self, host: &mut H, doc: &Arc<Document>)
    where
        H: Host<Fixtures = S::Fixtures>,
    {
        let scenarios = doc
            .pickles
            .iter()
            .map(|p| {
                let run = ScenarioRun::new(
                    Rc::clone(&self.registry),
                    Arc::clone(doc),
                    Arc::clone(p),
                );
                (p.id.clone(), run)
            })
            .collect::<HashMap<_, _>>();
        let scenarios = Rc::new(scenarios);

        let (table, services) = (self.table.clone(), self.services.clone());
        host.before_each(
            "Before Hooks",
            Rc::new(move |info, fixtures| {
                setup(
                    table.clone(),
                    Rc::clone(&scenarios),
                    services.clone(),
                    info,
                    fixtures,
                )
                .boxed_local()
            }),
        );

        for pickle in &doc.pickles {
            let table = self.table.clone();
            host.test(
                &pickle.name,
                TestDetails::for_pickle(pickle),
                Rc::new(move |info, _| body(table.clone(), info).boxed_local()),
            );
        }

        let table = self.table.clone();
        host.after_each(
            "After Hooks",
            Rc::new(move |info| teardown(table.clone(), info).boxed_local()),
        );
    }

    fn register_before_all<H: Host>(&self, host: &mut H) {
        if self.registry.before_all_hooks().is_empty() {
            return;
        }
        let registry = Rc::clone(&self.registry);
        host.before_all(
            "Before All",
            Rc::new(move |info| before_all(Rc::clone(&registry), info).boxed_local()),
        );
    }

    fn register_after_all<H: Host>(&self, host: &mut H) {
        if self.registry.after_all_hooks().is_empty() {
            return;
        }
        let registry = Rc::clone(&self.registry);
        host.after_all(
            "After All",
            Rc::new(move |info| after_all(Rc::clone(&registry), info).boxed_local()),
        );
    }
}

/// Routes [`World::attach()`]ments to the given test.
///
/// [`World::attach()`]: crate::World::attach
fn attached_to(services: Services, info: &Rc<dyn TestInfo>) -> Services {
    let info = Rc::clone(info);
    services.with_attach(move |a| info.attach(a))
}

/// Body of a [`Mode::Inline`] test.
async fn inline<S: State>(
    run: ScenarioRun<S>,
    services: Services,
    info: Rc<dyn TestInfo>,
    fixtures: S::Fixtures,
) -> Outcome {
    let services = attached_to(services, &info);
    run.run(&*info, services, fixtures).await
}

/// `before_each` callback of [`Mode::Split`]: constructs the [`World`] and
/// runs the before-hooks.
///
/// [`World`]: crate::World
async fn setup<S: State>(
    table: WorldTable<S>,
    scenarios: Rc<HashMap<String, ScenarioRun<S>>>,
    services: Services,
    info: Rc<dyn TestInfo>,
    fixtures: S::Fixtures,
) -> Outcome {
    let key = AttemptKey::of(&*info)?;
    let run = scenarios.get(&key.test_id).cloned().ok_or_else(|| {
        Failure::new(format!("Test '{}' has no scenario", info.title()))
    })?;

    let services = attached_to(services, &info);
    let mut world = run.construct(services, fixtures).await?;
    let mut result = ExecutionResult::new();
    run.before_hooks(&*info, &mut world, &mut result).await;

    let outcome = result.outcome();
    tracing::trace!(attempt = %key, "world stored");
    table.insert(key, Entry { run, world, result });
    outcome
}

/// Test body of [`Mode::Split`]: runs the steps of the stored scenario.
async fn body<S: State>(table: WorldTable<S>, info: Rc<dyn TestInfo>) -> Outcome {
    let key = AttemptKey::of(&*info)?;
    let Some(mut checkout) = table.checkout(key.clone()) else {
        return Err(Failure::new(format!("World of '{key}' is not constructed")));
    };

    let Entry { run, world, result } = checkout.entry();
    let seen = result.errors().len();
    run.steps(&*info, world, result).await;
    result.errors().get(seen).cloned().map_or(Ok(()), Err)
}

/// `after_each` callback of [`Mode::Split`]: runs the after-hooks and drops
/// the stored [`World`].
///
/// [`World`]: crate::World
async fn teardown<S: State>(
    table: WorldTable<S>,
    info: Rc<dyn TestInfo>,
) -> Outcome {
    let key = AttemptKey::of(&*info)?;
    let Some(mut entry) = table.remove(&key) else {
        tracing::debug!(attempt = %key, "no world to tear down");
        return Ok(());
    };

    let seen = entry.result.errors().len();
    entry
        .run
        .after_hooks(&*info, &mut entry.world, &mut entry.result)
        .await;
    tracing::debug!(
        scenario = %entry.run.pickle().name,
        failed = entry.result.is_failed(),
        in_flight = table.len(),
        "scenario finished",
    );

    let Entry { world, result, .. } = entry;
    drop(world);
    result.errors().get(seen).cloned().map_or(Ok(()), Err)
}

/// Runs the run-once hooks preceding all scenarios, stopping at the first
/// failing one.
async fn before_all<S>(registry: Rc<Registry<S>>, info: Rc<dyn TestInfo>) -> Outcome {
    for hook in registry.before_all_hooks() {
        let body = catching((hook.body())());
        info.step(hook.title("Before All"), hook.location(), body)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "before all hook failed");
                e
            })?;
    }
    Ok(())
}

/// Runs all the run-once hooks following all scenarios, reporting the first
/// failure.
async fn after_all<S>(registry: Rc<Registry<S>>, info: Rc<dyn TestInfo>) -> Outcome {
    let mut outcome = Ok(());
    for hook in registry.after_all_hooks() {
        let body = catching((hook.body())());
        if let Err(e) = info.step(hook.title("After All"), hook.location(), body).await
        {
            tracing::warn!(error = %e, "after all hook failed");
            if outcome.is_ok() {
                outcome = Err(e);
            }
        }
    }
    outcome
}
