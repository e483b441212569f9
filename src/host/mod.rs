// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Capability surface of the test runtime scenarios are registered in.
//!
//! The runtime owns scheduling, retries and reporting. It only has to offer
//! nested suites, tests, `before`/`after` callbacks and nested named steps,
//! which is what the [`Host`] and [`TestInfo`] traits describe.
//!
//! [`LocalHost`] is an in-process implementation running everything
//! sequentially on the current thread.

pub mod local;

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use serde::Serialize;

use crate::{annotation::Annotation, step::Location, Failure, TestDetails};

#[doc(inline)]
pub use self::local::{
    Attempt, AttemptStatus, HookReport, LocalHost, Report, StepRecord,
    SuiteReport, TestReport,
};

/// Outcome of a test, a callback or a step reported to a [`Host`].
pub type Outcome = Result<(), Failure>;

/// Future resolving into an [`Outcome`].
pub type HostFuture<'a> = LocalBoxFuture<'a, Outcome>;

/// Body of a test or of a `before_each` callback, receiving the runtime
/// fixtures.
pub type TestFn<F> = Rc<dyn Fn(Rc<dyn TestInfo>, F) -> HostFuture<'static>>;

/// Body of a callback receiving no fixtures.
pub type HookFn = Rc<dyn Fn(Rc<dyn TestInfo>) -> HostFuture<'static>>;

/// File attached to a test.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Name of the file.
    pub name: String,

    /// MIME type of the [`Attachment::body`].
    pub content_type: String,

    /// Content of the file.
    pub body: Vec<u8>,
}

impl Attachment {
    /// Creates a new `text/plain` [`Attachment`] named `attachment`.
    #[must_use]
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            name: "attachment".into(),
            content_type: "text/plain".into(),
            body: body.into(),
        }
    }

    /// Sets the file name of this [`Attachment`].
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the MIME type of this [`Attachment`].
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// Handle of the currently executing test.
pub trait TestInfo {
    /// Returns the title of the test.
    fn title(&self) -> &str;

    /// Returns the [`Annotation`]s the test was registered with.
    fn annotations(&self) -> &[Annotation];

    /// Returns the zero-based number of the current execution attempt.
    fn retry(&self) -> u32;

    /// Attaches a file to the test.
    fn attach(&self, attachment: Attachment);

    /// Runs the `body` as a named step of the test, nested into the step
    /// running at the moment (if any), and returns its [`Outcome`].
    fn step<'a>(
        &'a self,
        title: &str,
        location: Option<Location>,
        body: HostFuture<'a>,
    ) -> HostFuture<'a>;
}

/// Test runtime to register suites, tests and callbacks in.
///
/// Callbacks registered inside [`Host::describe()`] belong to that suite,
/// the ones registered outside of any suite belong to the whole run.
pub trait Host {
    /// Runtime-owned resources handed over to tests.
    type Fixtures: 'static;

    /// Registers a suite, populated by the `body`.
    fn describe<B: FnOnce(&mut Self)>(&mut self, title: &str, body: B);

    /// Registers a test.
    fn test(
        &mut self,
        title: &str,
        details: TestDetails,
        body: TestFn<Self::Fixtures>,
    );

    /// Registers a callback run before every test of the current suite.
    fn before_each(&mut self, title: &str, body: TestFn<Self::Fixtures>);

    /// Registers a callback run after every test of the current suite, even a
    /// failed one.
    fn after_each(&mut self, title: &str, body: HookFn);

    /// Registers a callback run once before all tests of the current suite.
    fn before_all(&mut self, title: &str, body: HookFn);

    /// Registers a callback run once after all tests of the current suite.
    fn after_all(&mut self, title: &str, body: HookFn);
}
