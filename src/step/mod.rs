// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Step definitions, their matching and resolution.
//!
//! - [`Matcher`]: regex, [Cucumber Expression][1] or literal pattern of a
//!   step definition, extracting positional parameters;
//! - [`StepDefinition`] and [`Collection`]: registered step bodies and the
//!   exactly-one-match resolution over them;
//! - [`Context`]: what a step body receives about the matched step;
//! - [`template()`]: a step body replaying other steps.
//!
//! [1]: https://github.com/cucumber/cucumber-expressions

pub mod collection;
pub mod context;
pub mod error;
pub mod location;
pub mod matcher;
pub mod template;

use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::World;

pub use self::{
    collection::{Collection, StepDefinition},
    context::Context,
    error::{ParameterError, PatternError, StepError},
    location::Location,
    matcher::Matcher,
    template::template,
};

/// Body of a step definition.
pub type StepFn<S> =
    Rc<dyn for<'a> Fn(&'a mut World<S>, Context) -> LocalBoxFuture<'a, ()>>;
