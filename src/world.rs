// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-scenario execution context.

use std::{fmt, future::Future, panic::AssertUnwindSafe, rc::Rc, sync::Arc};

use derive_more::with_trait::{Deref, DerefMut};
use futures::{future::LocalBoxFuture, FutureExt as _};

use crate::{
    host::Attachment, pickle::StepArgument, step::Context, Failure, Registry,
};

/// Caller-defined state of a [`World`].
///
/// A fresh value is constructed for every scenario execution (including every
/// retry attempt), and is dropped as soon as the scenario's after-hooks
/// complete.
pub trait State: Sized + 'static {
    /// Error of creating a new [`State`] instance.
    type Error: fmt::Display;

    /// Resources owned by the test runtime and handed over to every scenario
    /// (a browser page, a database transaction, etc.).
    type Fixtures: 'static;

    /// Creates a new [`State`] instance.
    fn new() -> impl Future<Output = Result<Self, Self::Error>>;

    /// Injects the runtime [`State::Fixtures`], once, after construction and
    /// before any hook runs.
    ///
    /// Ignores them by default.
    fn init(&mut self, fixtures: Self::Fixtures) {
        _ = fixtures;
    }
}

/// Services handed over to every [`World`] by the code creating it.
#[derive(Clone)]
pub struct Services {
    /// Sink of [`World::log()`] messages.
    log: Rc<dyn Fn(&str)>,

    /// Sink of [`World::attach()`]ments.
    attach: Rc<dyn Fn(Attachment)>,

    /// Arbitrary parameters shared by all scenarios of a run.
    parameters: Arc<serde_json::Value>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            log: Rc::new(|msg| {
                tracing::info!(target: "cucumber_adapter::world", "{msg}");
            }),
            attach: Rc::new(|a| {
                tracing::debug!(
                    target: "cucumber_adapter::world",
                    name = %a.name,
                    content_type = %a.content_type,
                    len = a.body.len(),
                    "attachment has no sink, dropping",
                );
            }),
            parameters: Arc::new(serde_json::Value::Null),
        }
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("log", &"..")
            .field("attach", &"..")
            .field("parameters", &self.parameters)
            .finish()
    }
}

impl Services {
    /// Replaces the sink of [`World::log()`] messages.
    #[must_use]
    pub fn with_log(mut self, log: impl Fn(&str) + 'static) -> Self {
        self.log = Rc::new(log);
        self
    }

    /// Replaces the sink of [`World::attach()`]ments.
    #[must_use]
    pub fn with_attach(mut self, attach: impl Fn(Attachment) + 'static) -> Self {
        self.attach = Rc::new(attach);
        self
    }

    /// Sets the parameters shared by all scenarios of a run.
    #[must_use]
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = Arc::new(parameters);
        self
    }

    /// Returns the parameters shared by all scenarios of a run.
    #[must_use]
    pub fn parameters(&self) -> &serde_json::Value {
        &self.parameters
    }
}

/// Isolated context of a single scenario execution.
///
/// Composes the caller's [`State`] (reachable via [`Deref`]) with the
/// [`Services`] and the [`Registry`] the scenario runs against.
#[derive(Deref, DerefMut)]
pub struct World<S> {
    /// Caller-defined state.
    #[deref]
    #[deref_mut]
    state: S,

    /// [`Registry`] used by [`World::execute_step()`].
    registry: Rc<Registry<S>>,

    /// [`Services`] of this [`World`].
    services: Services,
}

impl<S: fmt::Debug> fmt::Debug for World<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("state", &self.state)
            .field("services", &self.services)
            .finish_non_exhaustive()
    }
}

impl<S: State> World<S> {
    /// Constructs a new [`World`] with a fresh [`State`].
    ///
    /// # Errors
    ///
    /// If [`State::new()`] fails.
    pub async fn create(
        registry: Rc<Registry<S>>,
        services: Services,
    ) -> Result<Self, S::Error> {
        let state = S::new().await?;
        Ok(Self { state, registry, services })
    }

    /// Hands the runtime [`State::Fixtures`] over to the [`State`].
    pub fn init(&mut self, fixtures: S::Fixtures) {
        self.state.init(fixtures);
    }
}

impl<S> World<S> {
    /// Returns the caller-defined [`State`].
    #[must_use]
    pub const fn state(&self) -> &S {
        &self.state
    }

    /// Returns the caller-defined [`State`] mutably.
    #[must_use]
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Returns the [`Registry`] this [`World`] runs against.
    #[must_use]
    pub fn registry(&self) -> &Registry<S> {
        &self.registry
    }

    /// Returns the parameters shared by all scenarios of a run.
    #[must_use]
    pub fn parameters(&self) -> &serde_json::Value {
        self.services.parameters()
    }

    /// Logs the provided `message` to the current test.
    pub fn log(&self, message: impl AsRef<str>) {
        (self.services.log)(message.as_ref());
    }

    /// Attaches the provided [`Attachment`] to the current test.
    pub fn attach(&self, attachment: Attachment) {
        (self.services.attach)(attachment);
    }

    /// Resolves the step `text` against the [`Registry`] and executes it on
    /// this [`World`].
    ///
    /// Intended to be called from step and hook bodies, so it fails the way
    /// they do: by panicking with a [`Failure`] whose message is prefixed
    /// with the executed step `text`. This also happens if the `text` matches
    /// no step definition or more than one.
    pub fn execute_step<'a>(
        &'a mut self,
        text: &str,
        argument: Option<StepArgument>,
    ) -> LocalBoxFuture<'a, ()> {
        let text = text.to_owned();
        let registry = Rc::clone(&self.registry);
        async move {
            let (def, matches) = match registry.steps().resolve(&text) {
                Ok(found) => found,
                Err(e) => Failure::from(e).nested(&text).resume(),
            };
            tracing::trace!(step = %text, "executing nested step");

            let ctx = Context::new(text.as_str(), matches, argument, def.location());
            if let Err(payload) =
                AssertUnwindSafe(def.invoke(self, ctx)).catch_unwind().await
            {
                Failure::from_panic(payload).nested(&text).resume();
            }
        }
        .boxed_local()
    }
}
