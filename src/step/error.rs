// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors of step patterns, resolution and parameter extraction.

use derive_more::with_trait::{Display, Error};
use itertools::Itertools as _;

use super::location::Location;

/// Error of resolving a step text to exactly one step definition.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum StepError {
    /// No step definition matches the text.
    #[display("Step '{_0}' is not defined")]
    Undefined(#[error(not(source))] String),

    /// More than one step definition matches the text.
    #[display(
        "Step '{step}' matches multiple step definitions:{}",
        format_matches(possible_matches),
    )]
    Ambiguous {
        /// Text of the step.
        step: String,

        /// Patterns (and their [`Location`]s) matching the text.
        possible_matches: Vec<(String, Option<Location>)>,
    },
}

impl StepError {
    /// Returns the text of the step which failed to resolve.
    #[must_use]
    pub fn step(&self) -> &str {
        match self {
            Self::Undefined(step) | Self::Ambiguous { step, .. } => step,
        }
    }
}

/// Formats possible matches of an ambiguous step, one per line.
fn format_matches(matches: &[(String, Option<Location>)]) -> String {
    matches
        .iter()
        .sorted()
        .map(|(pattern, loc)| match loc {
            Some(loc) => format!("\n  {pattern} --> {loc}"),
            None => format!("\n  {pattern}"),
        })
        .collect()
}

/// Error of a step pattern which cannot be compiled.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display("invalid step pattern `{pattern}`: {reason}")]
pub struct PatternError {
    /// Source of the pattern.
    pub pattern: String,

    /// Reason reported by the compiler.
    pub reason: String,
}

/// Error of extracting a typed parameter out of a step [`Context`].
///
/// [`Context`]: super::Context
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum ParameterError {
    /// Step has fewer parameters than requested.
    #[display("parameter {index} not found in step '{step}'")]
    Missing {
        /// Zero-based index of the parameter.
        index: usize,

        /// Text of the step.
        step: String,
    },

    /// Parameter cannot be parsed into the requested type.
    #[display("parameter {index} '{value}' can not be parsed to {ty}: {reason}")]
    Parse {
        /// Zero-based index of the parameter.
        index: usize,

        /// Raw value of the parameter.
        value: String,

        /// Name of the requested type.
        ty: &'static str,

        /// Reason reported by the parser.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_message_names_the_step() {
        let err = StepError::Undefined("I fly".into());
        assert_eq!(err.to_string(), "Step 'I fly' is not defined");
        assert_eq!(err.step(), "I fly");
    }

    #[test]
    fn ambiguous_message_lists_sorted_matches() {
        let err = StepError::Ambiguous {
            step: "I eat 3".into(),
            possible_matches: vec![
                ("^I eat (\\d+)$".into(), Some(Location::new("b.rs", 2, 1))),
                ("^I eat (.*)$".into(), None),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Step 'I eat 3' matches multiple step definitions:\n  \
             ^I eat (.*)$\n  \
             ^I eat (\\d+)$ --> b.rs:2:1",
        );
    }
}
