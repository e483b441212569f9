// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Context passed to a step body.

use std::{any, str::FromStr};

use crate::pickle::StepArgument;

use super::{error::ParameterError, location::Location};

/// Everything a step body gets to know about the step it implements.
#[derive(Clone, Debug)]
pub struct Context {
    /// Text of the step, without its keyword.
    pub text: String,

    /// Positional parameters extracted from the [`Context::text`].
    pub matches: Vec<String>,

    /// Multi-line argument of the step, if any.
    pub argument: Option<StepArgument>,

    /// Where the matched step definition was registered.
    pub location: Option<Location>,
}

impl Context {
    /// Creates a new [`Context`].
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        matches: Vec<String>,
        argument: Option<StepArgument>,
        location: Option<Location>,
    ) -> Self {
        Self { text: text.into(), matches, argument, location }
    }

    /// Returns the raw positional parameter at `index`.
    #[must_use]
    pub fn param(&self, index: usize) -> Option<&str> {
        self.matches.get(index).map(String::as_str)
    }

    /// Parses the positional parameter at `index` into `T`.
    ///
    /// # Errors
    ///
    /// If there is no parameter at `index`, or it cannot be parsed into `T`.
    pub fn get<T>(&self, index: usize) -> Result<T, ParameterError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        let value = self.param(index).ok_or_else(|| ParameterError::Missing {
            index,
            step: self.text.clone(),
        })?;
        value.parse().map_err(|e: T::Err| ParameterError::Parse {
            index,
            value: value.to_owned(),
            ty: any::type_name::<T>(),
            reason: e.to_string(),
        })
    }

    /// Returns the doc string argument of the step, if any.
    #[must_use]
    pub fn docstring(&self) -> Option<&str> {
        match &self.argument {
            Some(StepArgument::DocString(s)) => Some(s),
            Some(StepArgument::DataTable(_)) | None => None,
        }
    }

    /// Returns the data table argument of the step, if any.
    #[must_use]
    pub fn table(&self) -> Option<&[Vec<String>]> {
        match &self.argument {
            Some(StepArgument::DataTable(rows)) => Some(rows),
            Some(StepArgument::DocString(_)) | None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_parameters() {
        let ctx = Context::new("I eat 3 apples", vec!["3".into()], None, None);
        assert_eq!(ctx.get::<u32>(0), Ok(3));
        assert_eq!(ctx.param(0), Some("3"));
    }

    #[test]
    fn reports_missing_and_unparsable_parameters() {
        let ctx = Context::new("I eat a apples", vec!["a".into()], None, None);
        assert_eq!(
            ctx.get::<u32>(1),
            Err(ParameterError::Missing {
                index: 1,
                step: "I eat a apples".into(),
            }),
        );
        let err = ctx.get::<u32>(0).unwrap_err();
        assert!(matches!(err, ParameterError::Parse { index: 0, .. }));
        assert!(err.to_string().contains("u32"));
    }

    #[test]
    fn exposes_arguments() {
        let ctx = Context::new(
            "a table",
            vec![],
            Some(StepArgument::DataTable(vec![vec!["a".into(), "b".into()]])),
            None,
        );
        assert_eq!(ctx.table().map(<[_]>::len), Some(1));
        assert_eq!(ctx.docstring(), None);

        let ctx = Context::new(
            "a doc",
            vec![],
            Some(StepArgument::DocString("text".into())),
            None,
        );
        assert_eq!(ctx.docstring(), Some("text"));
        assert!(ctx.table().is_none());
    }
}
