// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! In-process [`Host`] running everything sequentially on the current thread.

use std::{
    cell::RefCell,
    fmt,
    panic::AssertUnwindSafe,
    rc::Rc,
    time::{Duration, Instant},
};

use futures::{future::LocalBoxFuture, FutureExt as _};
use itertools::Itertools as _;
use serde::{Serialize, Serializer};

use crate::{
    annotation::Annotation, step::Location, Failure, Filter, TestDetails,
};

use super::{
    Attachment, Host, HookFn, HostFuture, Outcome, TestFn, TestInfo,
};

/// Callback registered in a [`Suite`].
struct Callback<B> {
    title: String,
    body: B,
}

/// Registered test.
struct Test<F> {
    title: String,
    details: TestDetails,
    body: TestFn<F>,
}

enum Entry<F> {
    Suite(Suite<F>),
    Test(Test<F>),
}

/// Registered suite.
struct Suite<F> {
    title: String,
    before_all: Vec<Callback<HookFn>>,
    after_all: Vec<Callback<HookFn>>,
    before_each: Vec<Callback<TestFn<F>>>,
    after_each: Vec<Callback<HookFn>>,
    entries: Vec<Entry<F>>,
}

impl<F> Suite<F> {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            before_all: Vec::new(),
            after_all: Vec::new(),
            before_each: Vec::new(),
            after_each: Vec::new(),
            entries: Vec::new(),
        }
    }
}

/// [`Host`] collecting suites, tests and callbacks, and running them one by
/// one once [`LocalHost::run()`] is awaited.
///
/// Fixtures are produced by the provided factory, once per every test body
/// and `before_each` callback invocation.
pub struct LocalHost<F> {
    /// Factory of fixtures.
    fixtures: Rc<dyn Fn(&dyn TestInfo) -> F>,

    /// Number of times a failed test is re-run.
    retries: u32,

    /// [`Filter`] of tests to run.
    grep: Option<Filter>,

    /// Top-level suite, holding everything registered outside of
    /// [`Host::describe()`].
    root: Suite<F>,

    /// Path to the suite being populated at the moment.
    cursor: Vec<usize>,
}

impl<F> fmt::Debug for LocalHost<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalHost")
            .field("retries", &self.retries)
            .field("grep", &self.grep)
            .finish_non_exhaustive()
    }
}

impl<F: 'static> LocalHost<F> {
    /// Creates a new [`LocalHost`] producing fixtures with the given factory.
    #[must_use]
    pub fn new(fixtures: impl Fn(&dyn TestInfo) -> F + 'static) -> Self {
        Self {
            fixtures: Rc::new(fixtures),
            retries: 0,
            grep: None,
            root: Suite::new(""),
            cursor: Vec::new(),
        }
    }

    /// Sets the number of times a failed test is re-run.
    #[must_use]
    pub const fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Runs only the tests whose titles (prefixed with their suites' titles
    /// and followed by their tags) pass the given [`Filter`].
    #[must_use]
    pub fn grep(mut self, filter: Filter) -> Self {
        self.grep = Some(filter);
        self
    }

    /// Runs everything registered so far.
    pub async fn run(self) -> Report {
        let root = self.run_suite(&self.root, Vec::new(), false).await;
        Report { hooks: root.hooks, tests: root.tests, suites: root.suites }
    }

    fn current(&mut self) -> &mut Suite<F> {
        let mut suite = &mut self.root;
        for &i in &self.cursor {
            suite = match suite.entries.get_mut(i) {
                Some(Entry::Suite(s)) => s,
                Some(Entry::Test(_)) | None => {
                    unreachable!("cursor always points to a suite")
                }
            };
        }
        suite
    }

    fn full_title(&self, chain: &[&Suite<F>], test: &Test<F>) -> String {
        chain
            .iter()
            .map(|s| s.title.as_str())
            .chain([test.title.as_str()])
            .chain(test.details.tags.iter().map(String::as_str))
            .filter(|s| !s.is_empty())
            .join(" ")
    }

    fn is_selected(&self, chain: &[&Suite<F>], test: &Test<F>) -> bool {
        self.grep
            .as_ref()
            .map_or(true, |f| f.test(&self.full_title(chain, test)))
    }

    fn has_selected<'a>(
        &self,
        chain: &mut Vec<&'a Suite<F>>,
        suite: &'a Suite<F>,
    ) -> bool {
        chain.push(suite);
        let found = suite.entries.iter().any(|e| match e {
            Entry::Test(t) => self.is_selected(chain, t),
            Entry::Suite(s) => self.has_selected(chain, s),
        });
        _ = chain.pop();
        found
    }

    fn run_suite<'a>(
        &'a self,
        suite: &'a Suite<F>,
        mut chain: Vec<&'a Suite<F>>,
        aborted: bool,
    ) -> LocalBoxFuture<'a, SuiteReport> {
        async move {
            let mut report = SuiteReport {
                title: suite.title.clone(),
                hooks: Vec::new(),
                tests: Vec::new(),
                suites: Vec::new(),
            };
            if !self.has_selected(&mut chain.clone(), suite) {
                return report;
            }
            chain.push(suite);

            let mut skip = aborted;
            if !aborted {
                for cb in &suite.before_all {
                    let hook = run_hook(cb).await;
                    let failed = hook.error.is_some();
                    report.hooks.push(hook);
                    if failed {
                        skip = true;
                        break;
                    }
                }
            }

            for entry in &suite.entries {
                match entry {
                    Entry::Test(t) if self.is_selected(&chain, t) => {
                        let test = if skip {
                            TestReport::skipped(t)
                        } else {
                            self.run_test(&chain, t).await
                        };
                        report.tests.push(test);
                    }
                    Entry::Test(_) => {}
                    Entry::Suite(s) => {
                        let nested =
                            self.run_suite(s, chain.clone(), skip).await;
                        report.suites.push(nested);
                    }
                }
            }

            if !aborted {
                for cb in &suite.after_all {
                    report.hooks.push(run_hook(cb).await);
                }
            }
            report
        }
        .boxed_local()
    }

    async fn run_test(&self, chain: &[&Suite<F>], test: &Test<F>) -> TestReport {
        let mut attempts = Vec::new();
        for retry in 0..=self.retries {
            let attempt = self.run_attempt(chain, test, retry).await;
            let passed = attempt.status == AttemptStatus::Passed;
            attempts.push(attempt);
            if passed {
                break;
            }
        }
        TestReport {
            title: test.title.clone(),
            details: test.details.clone(),
            attempts,
        }
    }

    async fn run_attempt(
        &self,
        chain: &[&Suite<F>],
        test: &Test<F>,
        retry: u32,
    ) -> Attempt {
        tracing::debug!(test = %test.title, retry, "running test");

        let started = Instant::now();
        let info = Rc::new(LocalTestInfo::new(
            &test.title,
            test.details.annotations.clone(),
            retry,
        ));
        let handle: Rc<dyn TestInfo> = info.clone();
        let mut error = None;

        'before: for suite in chain {
            for cb in &suite.before_each {
                let fixtures = (self.fixtures)(&*info);
                let body = (cb.body)(Rc::clone(&handle), fixtures);
                if let Err(e) = info.step(&cb.title, None, body).await {
                    error = Some(e);
                    break 'before;
                }
            }
        }

        if error.is_none() {
            let fixtures = (self.fixtures)(&*info);
            if let Err(e) = guard((test.body)(Rc::clone(&handle), fixtures)).await
            {
                error = Some(e);
            }
        }

        for suite in chain.iter().rev() {
            for cb in &suite.after_each {
                let body = (cb.body)(Rc::clone(&handle));
                if let Err(e) = info.step(&cb.title, None, body).await {
                    _ = error.get_or_insert(e);
                }
            }
        }

        let (steps, attachments) = info.take();
        Attempt {
            retry,
            status: if error.is_some() {
                AttemptStatus::Failed
            } else {
                AttemptStatus::Passed
            },
            error: error.map(|e| e.message().to_owned()),
            duration: started.elapsed(),
            steps,
            attachments,
        }
    }
}

impl<F: 'static> Host for LocalHost<F> {
    type Fixtures = F;

    fn describe<B: FnOnce(&mut Self)>(&mut self, title: &str, body: B) {
        let suite = self.current();
        suite.entries.push(Entry::Suite(Suite::new(title)));
        let index = suite.entries.len() - 1;

        self.cursor.push(index);
        body(self);
        _ = self.cursor.pop();
    }

    fn test(&mut self, title: &str, details: TestDetails, body: TestFn<F>) {
        self.current().entries.push(Entry::Test(Test {
            title: title.to_owned(),
            details,
            body,
        }));
    }

    fn before_each(&mut self, title: &str, body: TestFn<F>) {
        self.current()
            .before_each
            .push(Callback { title: title.to_owned(), body });
    }

    fn after_each(&mut self, title: &str, body: HookFn) {
        self.current()
            .after_each
            .push(Callback { title: title.to_owned(), body });
    }

    fn before_all(&mut self, title: &str, body: HookFn) {
        self.current()
            .before_all
            .push(Callback { title: title.to_owned(), body });
    }

    fn after_all(&mut self, title: &str, body: HookFn) {
        self.current()
            .after_all
            .push(Callback { title: title.to_owned(), body });
    }
}

/// Runs a `before_all`/`after_all` callback.
async fn run_hook(cb: &Callback<HookFn>) -> HookReport {
    let started = Instant::now();
    let info = Rc::new(LocalTestInfo::new(&cb.title, Vec::new(), 0));
    let outcome = guard((cb.body)(info.clone())).await;
    if let Err(e) = &outcome {
        tracing::warn!(hook = %cb.title, error = %e, "suite callback failed");
    }
    let (steps, attachments) = info.take();
    HookReport {
        title: cb.title.clone(),
        error: outcome.err().map(|e| e.message().to_owned()),
        duration: started.elapsed(),
        steps,
        attachments,
    }
}

/// Turns a panic escaping the `body` into a failed [`Outcome`].
async fn guard(body: HostFuture<'_>) -> Outcome {
    AssertUnwindSafe(body)
        .catch_unwind()
        .await
        .unwrap_or_else(|p| Err(Failure::from_panic(p)))
}

/// [`TestInfo`] of a [`LocalHost`] test, recording nested steps.
struct LocalTestInfo {
    title: String,
    annotations: Vec<Annotation>,
    retry: u32,

    /// Steps recorded on every nesting level, the innermost being the last.
    frames: RefCell<Vec<Vec<StepRecord>>>,

    attachments: RefCell<Vec<Attachment>>,
}

impl LocalTestInfo {
    fn new(title: &str, annotations: Vec<Annotation>, retry: u32) -> Self {
        Self {
            title: title.to_owned(),
            annotations,
            retry,
            frames: RefCell::new(vec![Vec::new()]),
            attachments: RefCell::new(Vec::new()),
        }
    }

    /// Takes the recorded top-level steps and attachments out.
    fn take(&self) -> (Vec<StepRecord>, Vec<Attachment>) {
        let steps = self
            .frames
            .borrow_mut()
            .first_mut()
            .map(std::mem::take)
            .unwrap_or_default();
        (steps, self.attachments.take())
    }
}

impl TestInfo for LocalTestInfo {
    fn title(&self) -> &str {
        &self.title
    }

    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    fn retry(&self) -> u32 {
        self.retry
    }

    fn attach(&self, attachment: Attachment) {
        self.attachments.borrow_mut().push(attachment);
    }

    fn step<'a>(
        &'a self,
        title: &str,
        location: Option<Location>,
        body: HostFuture<'a>,
    ) -> HostFuture<'a> {
        let title = title.to_owned();
        async move {
            self.frames.borrow_mut().push(Vec::new());
            let started = Instant::now();

            let outcome = guard(body).await;

            let steps = self.frames.borrow_mut().pop().unwrap_or_default();
            let record = StepRecord {
                title,
                location,
                error: outcome.as_ref().err().map(|e| e.message().to_owned()),
                duration: started.elapsed(),
                steps,
            };
            if let Some(parent) = self.frames.borrow_mut().last_mut() {
                parent.push(record);
            }
            outcome
        }
        .boxed_local()
    }
}

/// Outcome of a [`LocalHost::run()`].
#[derive(Clone, Debug, Default, Serialize)]
pub struct Report {
    /// Callbacks registered outside of any suite.
    pub hooks: Vec<HookReport>,

    /// Tests registered outside of any suite.
    pub tests: Vec<TestReport>,

    /// Top-level suites.
    pub suites: Vec<SuiteReport>,
}

impl Report {
    /// Returns all the executed tests, depth-first.
    #[must_use]
    pub fn tests(&self) -> Vec<&TestReport> {
        let mut out = self.tests.iter().collect::<Vec<_>>();
        for s in &self.suites {
            s.collect_tests(&mut out);
        }
        out
    }

    /// Returns all the executed suite callbacks, depth-first.
    #[must_use]
    pub fn hooks(&self) -> Vec<&HookReport> {
        let mut out = self.hooks.iter().collect::<Vec<_>>();
        for s in &self.suites {
            s.collect_hooks(&mut out);
        }
        out
    }

    /// Returns the first executed test with the given `title`.
    #[must_use]
    pub fn test(&self, title: &str) -> Option<&TestReport> {
        self.tests().into_iter().find(|t| t.title == title)
    }

    /// Returns the number of failed tests and failed suite callbacks.
    #[must_use]
    pub fn failed(&self) -> usize {
        let tests = self
            .tests()
            .into_iter()
            .filter(|t| t.status() == AttemptStatus::Failed)
            .count();
        let hooks = self.hooks().into_iter().filter(|h| h.error.is_some()).count();
        tests + hooks
    }

    /// Returns the number of passed tests.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.tests()
            .into_iter()
            .filter(|t| t.status() == AttemptStatus::Passed)
            .count()
    }
}

/// Outcome of a suite.
#[derive(Clone, Debug, Serialize)]
pub struct SuiteReport {
    /// Title of the suite.
    pub title: String,

    /// `before_all` and `after_all` callbacks of the suite.
    pub hooks: Vec<HookReport>,

    /// Tests of the suite.
    pub tests: Vec<TestReport>,

    /// Nested suites.
    pub suites: Vec<SuiteReport>,
}

impl SuiteReport {
    fn collect_tests<'a>(&'a self, out: &mut Vec<&'a TestReport>) {
        out.extend(&self.tests);
        for s in &self.suites {
            s.collect_tests(out);
        }
    }

    fn collect_hooks<'a>(&'a self, out: &mut Vec<&'a HookReport>) {
        out.extend(&self.hooks);
        for s in &self.suites {
            s.collect_hooks(out);
        }
    }
}

/// Outcome of a `before_all` or `after_all` callback.
#[derive(Clone, Debug, Serialize)]
pub struct HookReport {
    /// Title the callback was registered with.
    pub title: String,

    /// Message of the failure, if any.
    pub error: Option<String>,

    /// Time the callback took.
    #[serde(serialize_with = "as_millis")]
    pub duration: Duration,

    /// Steps recorded by the callback.
    pub steps: Vec<StepRecord>,

    /// Files attached by the callback.
    pub attachments: Vec<Attachment>,
}

/// Outcome of a test, over all its attempts.
#[derive(Clone, Debug, Serialize)]
pub struct TestReport {
    /// Title of the test.
    pub title: String,

    /// Tags and annotations the test was registered with.
    pub details: TestDetails,

    /// Execution attempts, the last one being decisive.
    pub attempts: Vec<Attempt>,
}

impl TestReport {
    fn skipped(test: &Test<impl Sized>) -> Self {
        Self {
            title: test.title.clone(),
            details: test.details.clone(),
            attempts: vec![Attempt {
                retry: 0,
                status: AttemptStatus::Skipped,
                error: None,
                duration: Duration::ZERO,
                steps: Vec::new(),
                attachments: Vec::new(),
            }],
        }
    }

    /// Returns the status of the last attempt.
    #[must_use]
    pub fn status(&self) -> AttemptStatus {
        self.last().map_or(AttemptStatus::Skipped, |a| a.status)
    }

    /// Returns the last attempt.
    #[must_use]
    pub fn last(&self) -> Option<&Attempt> {
        self.attempts.last()
    }
}

/// Status of an [`Attempt`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    /// Test passed.
    Passed,

    /// Test, or one of its callbacks, failed.
    Failed,

    /// Test did not run, because a `before_all` callback failed.
    Skipped,
}

/// Single execution attempt of a test.
#[derive(Clone, Debug, Serialize)]
pub struct Attempt {
    /// Zero-based number of this [`Attempt`].
    pub retry: u32,

    /// Status of this [`Attempt`].
    pub status: AttemptStatus,

    /// Message of the first failure, if any.
    pub error: Option<String>,

    /// Time this [`Attempt`] took, callbacks included.
    #[serde(serialize_with = "as_millis")]
    pub duration: Duration,

    /// Top-level steps recorded by this [`Attempt`].
    pub steps: Vec<StepRecord>,

    /// Files attached during this [`Attempt`].
    pub attachments: Vec<Attachment>,
}

impl Attempt {
    /// Returns the titles of all the recorded steps, depth-first, each
    /// indented with two spaces per nesting level.
    #[must_use]
    pub fn timeline(&self) -> Vec<String> {
        let mut out = Vec::new();
        for s in &self.steps {
            s.flatten(0, &mut out);
        }
        out
    }
}

/// Step recorded by [`TestInfo::step()`].
#[derive(Clone, Debug, Serialize)]
pub struct StepRecord {
    /// Title of the step.
    pub title: String,

    /// Location of the code the step runs.
    pub location: Option<Location>,

    /// Message of the failure, if any.
    pub error: Option<String>,

    /// Time the step took.
    #[serde(serialize_with = "as_millis")]
    pub duration: Duration,

    /// Nested steps.
    pub steps: Vec<StepRecord>,
}

impl StepRecord {
    fn flatten(&self, depth: usize, out: &mut Vec<String>) {
        out.push(format!("{}{}", "  ".repeat(depth), self.title));
        for s in &self.steps {
            s.flatten(depth + 1, out);
        }
    }
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
