// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Evaluation of [tag expressions][1].
//!
//! [1]: https://cucumber.io/docs/cucumber/api#tag-expressions

use gherkin::tagexpr::TagOperation;
use sealed::sealed;

use crate::{error::ConfigError, pickle::Pickle};

/// Extension of a [`TagOperation`] allowing to evaluate it.
#[sealed]
pub trait Ext {
    /// Evaluates this [`TagOperation`] for the given `tags`.
    ///
    /// Tags match regardless of a leading `@` on either side.
    #[must_use]
    fn eval<I, S>(&self, tags: I) -> bool
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S> + Clone;

    /// Evaluates this [`TagOperation`] for the [`Tag`]s of a [`Pickle`].
    ///
    /// [`Tag`]: crate::Tag
    #[must_use]
    fn applies_to(&self, pickle: &Pickle) -> bool {
        self.eval(pickle.tags.iter().map(|t| t.name.as_str()))
    }
}

#[sealed]
impl Ext for TagOperation {
    fn eval<I, S>(&self, tags: I) -> bool
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S> + Clone,
    {
        match self {
            Self::And(l, r) => l.eval(tags.clone()) & r.eval(tags),
            Self::Or(l, r) => l.eval(tags.clone()) | r.eval(tags),
            Self::Not(t) => !t.eval(tags),
            Self::Tag(t) => {
                let t = t.trim_start_matches('@');
                tags.into_iter()
                    .any(|tag| tag.as_ref().trim_start_matches('@') == t)
            }
        }
    }
}

/// Parses the given tag expression.
///
/// # Errors
///
/// If the `expr` is not a valid tag expression.
pub fn parse(expr: &str) -> Result<TagOperation, ConfigError> {
    expr.trim().parse::<TagOperation>().map_err(|e| {
        ConfigError::TagExpression {
            expr: expr.to_owned(),
            reason: e.to_string(),
        }
    })
}
