// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Runs compiled [Cucumber] scenarios inside a test runtime that knows nothing
//! about [Gherkin].
//!
//! The runtime is described by the [`Host`] trait: it offers suites, tests,
//! nested named steps and `before`/`after` callbacks. An [`Adapter`] walks the
//! compiled [`Document`]s and registers one test per [`Pickle`], whose body
//! constructs a fresh [`World`], runs the [`Registry`] hooks and steps in
//! order, and reports the outcome back through the [`Host`].
//!
//! ```rust
//! # use std::convert::Infallible;
//! # use cucumber_adapter::{
//! #     host::LocalHost, step::Matcher, Adapter, Document, Pickle, PickleStep,
//! #     Registry, State,
//! # };
//! # use futures::FutureExt as _;
//! #
//! #[derive(Debug, Default)]
//! struct Counter(u32);
//!
//! impl State for Counter {
//!     type Error = Infallible;
//!     type Fixtures = ();
//!
//!     async fn new() -> Result<Self, Infallible> {
//!         Ok(Self::default())
//!     }
//! }
//!
//! # futures::executor::block_on(async {
//! let registry = Registry::<Counter>::new().step(
//!     Matcher::literal("I count"),
//!     |world, _| async move { world.0 += 1 }.boxed_local(),
//! );
//! let document = Document::new(
//!     "Counting",
//!     "counting.feature",
//!     [Pickle::new("once").with_step(PickleStep::new("I count"))],
//! );
//!
//! let mut host = LocalHost::new(|_| ());
//! Adapter::new(registry).document(document).register(&mut host);
//!
//! let report = host.run().await;
//! assert_eq!(report.failed(), 0);
//! # });
//! ```
//!
//! [Cucumber]: https://cucumber.io
//! [Gherkin]: https://cucumber.io/docs/gherkin/reference

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![forbid(non_ascii_idents, unsafe_code)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    unused_qualifications
)]

pub mod adapter;
pub mod annotation;
pub mod cli;
pub mod config;
pub mod error;
pub mod feature;
pub mod filter;
pub mod hook;
pub mod host;
pub mod loader;
pub mod pickle;
pub mod registry;
pub mod result;
pub mod step;
pub mod tag;
pub mod world;

pub use gherkin;

#[doc(inline)]
pub use self::{
    adapter::{Adapter, Mode},
    annotation::{Annotation, AnnotationType, TestDetails},
    cli::Opts,
    config::{Config, Profile},
    error::{ConfigError, Failure},
    filter::{filter, tags, Filter},
    hook::{Hook, ScenarioHookParams, StepHookParams},
    host::{Attachment, Host, TestInfo},
    pickle::{Document, Pickle, PickleStep, StepArgument, Tag},
    registry::Registry,
    result::{ExecutionResult, HookResult, Status},
    step::{template, Context, Location, Matcher, StepError},
    world::{Services, State, World},
};
