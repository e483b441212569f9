// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Failures raised by step and hook bodies, and configuration errors.

use std::{
    any::Any,
    fmt, io, panic,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use derive_more::with_trait::{Display, Error};

use crate::{feature::ExpandExamplesError, step::StepError};

/// Raw payload of a panic or an error raised by a step or hook body.
///
/// [`String`], `&'static str` and [`StepError`] payloads are stored as is,
/// any other payload is kept as a `Mutex<Box<dyn Any + Send>>`.
pub type Info = Arc<dyn Any + Send + Sync + 'static>;

/// Failure of a step, hook or [`World`] construction.
///
/// Bodies fail by panicking (this is what assertion macros do), so a
/// [`Failure`] keeps both a human-readable message and the original payload.
///
/// [`World`]: crate::World
#[derive(Clone, Display)]
#[display("{message}")]
pub struct Failure {
    /// Human-readable message of this [`Failure`].
    message: String,

    /// Original payload this [`Failure`] was created from, if any.
    info: Option<Info>,
}

impl Failure {
    /// Creates a new [`Failure`] with the provided `message` and no payload.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), info: None }
    }

    /// Coerces a caught panic payload into a [`Failure`].
    ///
    /// A payload that already is a [`Failure`] (see [`Failure::resume()`]) is
    /// returned as is.
    #[must_use]
    pub fn from_panic(payload: Box<dyn Any + Send + 'static>) -> Self {
        let payload = match payload.downcast::<Self>() {
            Ok(failure) => return *failure,
            Err(payload) => payload,
        };
        let message = panic_message(&*payload);
        Self { message, info: Some(into_info(payload)) }
    }

    /// Returns the human-readable message of this [`Failure`].
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the original payload of this [`Failure`], if any.
    #[must_use]
    pub fn info(&self) -> Option<&Info> {
        self.info.as_ref()
    }

    /// Wraps this [`Failure`] with the text of the step which raised it.
    #[must_use]
    pub fn nested(self, step: &str) -> Self {
        Self {
            message: format!("Failed to execute step '{step}': {}", self.message),
            info: self.info,
        }
    }

    /// Raises this [`Failure`] as a panic, without invoking the panic hook.
    ///
    /// The payload is recovered intact by [`Failure::from_panic()`].
    pub fn resume(self) -> ! {
        panic::resume_unwind(Box::new(self))
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("message", &self.message)
            .field("info", &self.info.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Error for Failure {}

impl From<StepError> for Failure {
    fn from(err: StepError) -> Self {
        Self { message: err.to_string(), info: Some(Arc::new(err)) }
    }
}

/// Moves a panic payload into an [`Info`].
fn into_info(payload: Box<dyn Any + Send + 'static>) -> Info {
    let payload = match payload.downcast::<String>() {
        Ok(s) => return Arc::new(*s),
        Err(p) => p,
    };
    let payload = match payload.downcast::<&'static str>() {
        Ok(s) => return Arc::new(*s),
        Err(p) => p,
    };
    match payload.downcast::<StepError>() {
        Ok(e) => Arc::new(*e),
        Err(p) => Arc::new(Mutex::new(p)),
    }
}

/// Extracts a message out of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(e) = payload.downcast_ref::<StepError>() {
        e.to_string()
    } else {
        "Opaque panic payload".to_owned()
    }
}

/// Error of loading features, configuration or filters.
#[derive(Debug, Display, Error)]
pub enum ConfigError {
    /// Failed to read a file.
    #[display("cannot read `{}`: {source}", path.display())]
    Io {
        /// Path of the file.
        path: PathBuf,

        /// Underlying [`io::Error`].
        source: io::Error,
    },

    /// Configuration file is not valid JSON of the expected shape.
    #[display("malformed configuration `{}`: {source}", path.display())]
    Json {
        /// Path of the configuration file.
        path: PathBuf,

        /// Underlying [`serde_json::Error`].
        source: serde_json::Error,
    },

    /// Requested profile is absent from the configuration.
    #[display("profile `{_0}` is not defined")]
    MissingProfile(#[error(not(source))] String),

    /// Tag expression cannot be parsed.
    #[display("invalid tag expression `{expr}`: {reason}")]
    TagExpression {
        /// Source of the tag expression.
        expr: String,

        /// Reason reported by the parser.
        reason: String,
    },

    /// Regular expression cannot be compiled.
    #[display("invalid regex `{pattern}`: {source}")]
    Regex {
        /// Source of the regular expression.
        pattern: String,

        /// Underlying [`regex::Error`].
        source: regex::Error,
    },

    /// Glob patterns cannot be compiled or walked.
    #[display("invalid glob: {_0}")]
    Glob(globwalk::GlobError),

    /// Feature file cannot be parsed.
    #[display("failed to parse `{uri}`: {reason}")]
    Parse {
        /// URI of the feature.
        uri: String,

        /// Reason reported by the parser.
        reason: String,
    },

    /// Scenario outline cannot be expanded.
    #[display("{_0}")]
    Expand(ExpandExamplesError),
}
