// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Filters selecting tests by their title.

use std::{fmt, sync::Arc};

use regex::Regex;

use crate::{
    error::ConfigError,
    tag::{self, Ext as _},
};

/// Predicate over a test title (the title followed by its tags, separated
/// with whitespace).
#[derive(Clone)]
pub struct Filter {
    /// Human-readable description of this [`Filter`].
    description: String,

    /// Predicate itself.
    predicate: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Filter").field(&self.description).finish()
    }
}

impl Filter {
    /// Creates a [`Filter`] out of a [`Regex`] searched in the title.
    #[must_use]
    pub fn regex(regex: Regex) -> Self {
        Self {
            description: format!("/{}/", regex.as_str()),
            predicate: Arc::new(move |title| regex.is_match(title)),
        }
    }

    /// Creates a [`Filter`] out of a regular expression `pattern` searched in
    /// the title.
    ///
    /// # Errors
    ///
    /// If the `pattern` is not a valid regular expression.
    pub fn pattern(pattern: &str) -> Result<Self, ConfigError> {
        Regex::new(pattern).map(Self::regex).map_err(|source| {
            ConfigError::Regex { pattern: pattern.to_owned(), source }
        })
    }

    /// Indicates whether the given `title` passes this [`Filter`].
    #[must_use]
    pub fn test(&self, title: &str) -> bool {
        (self.predicate)(title)
    }

    /// Combines this [`Filter`] with the `other` one, so a title has to pass
    /// both.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self {
            description: format!("{} and {}", self.description, other.description),
            predicate: Arc::new(move |title| self.test(title) && other.test(title)),
        }
    }
}

/// Creates a [`Filter`] evaluating a tag expression, like
/// `@smoke and not @slow`, against the `@`-prefixed words of a title.
///
/// # Errors
///
/// If the `expr` is not a valid tag expression.
pub fn tags(expr: &str) -> Result<Filter, ConfigError> {
    let op = tag::parse(expr)?;
    Ok(Filter {
        description: expr.to_owned(),
        predicate: Arc::new(move |title| {
            let tokens = title
                .split_whitespace()
                .filter(|t| t.starts_with('@'))
                .collect::<Vec<_>>();
            op.eval(tokens.iter())
        }),
    })
}

/// Creates a [`Filter`] out of an arbitrary `predicate` over a title.
pub fn filter<P>(predicate: P) -> Filter
where
    P: Fn(&str) -> bool + Send + Sync + 'static,
{
    Filter { description: "<predicate>".into(), predicate: Arc::new(predicate) }
}
