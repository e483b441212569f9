// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Outcomes of scenarios and steps, as seen by hooks.

use std::{
    fmt,
    time::{Duration, Instant},
};

use derive_more::with_trait::Display;
use itertools::Itertools as _;
use serde::{Serialize, Serializer};

use crate::Failure;

/// Status of an [`ExecutionResult`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// Nothing has failed so far.
    #[display("PASSED")]
    Passed,

    /// Something has failed.
    #[display("FAILED")]
    Failed,
}

/// Running outcome of a single scenario execution.
///
/// Starts as [`Status::Passed`] and turns into [`Status::Failed`] at most
/// once: the first [`Failure`] is the one reported, later ones are only
/// collected.
#[derive(Clone, Debug)]
pub struct ExecutionResult {
    /// Current [`Status`].
    status: Status,

    /// When the execution started.
    started: Instant,

    /// Collected [`Failure`]s, the first one being the reported one.
    errors: Vec<Failure>,
}

impl Default for ExecutionResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionResult {
    /// Creates a new passed [`ExecutionResult`] starting now.
    #[must_use]
    pub fn new() -> Self {
        Self { status: Status::Passed, started: Instant::now(), errors: Vec::new() }
    }

    /// Records the given [`Failure`].
    pub fn fail(&mut self, failure: Failure) {
        self.status = Status::Failed;
        self.errors.push(failure);
    }

    /// Returns the current [`Status`].
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Indicates whether anything has failed so far.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == Status::Failed
    }

    /// Returns the first recorded [`Failure`], if any.
    #[must_use]
    pub fn error(&self) -> Option<&Failure> {
        self.errors.first()
    }

    /// Returns all the recorded [`Failure`]s.
    #[must_use]
    pub fn errors(&self) -> &[Failure] {
        &self.errors
    }

    /// Returns the time elapsed since the execution started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Converts this [`ExecutionResult`] into a [`HookResult`], measuring the
    /// duration up to now.
    #[must_use]
    pub fn snapshot(&self) -> HookResult {
        self.snapshot_with(self.elapsed())
    }

    /// Converts this [`ExecutionResult`] into a [`HookResult`] with the given
    /// `duration`.
    #[must_use]
    pub fn snapshot_with(&self, duration: Duration) -> HookResult {
        let message = (!self.errors.is_empty())
            .then(|| self.errors.iter().map(Failure::message).join("\n"));
        HookResult {
            status: self.status,
            duration,
            message,
            exception: self.error().cloned(),
        }
    }

    /// Returns the outcome to report to the test runtime: the first recorded
    /// [`Failure`], if any.
    ///
    /// # Errors
    ///
    /// If this [`ExecutionResult`] is failed.
    pub fn outcome(&self) -> Result<(), Failure> {
        self.error().cloned().map_or(Ok(()), Err)
    }

    /// Consumes this [`ExecutionResult`] into its outcome.
    ///
    /// # Errors
    ///
    /// If this [`ExecutionResult`] is failed.
    pub fn into_outcome(self) -> Result<(), Failure> {
        self.errors.into_iter().next().map_or(Ok(()), Err)
    }
}

/// [`ExecutionResult`] in the shape hooks receive it.
#[derive(Clone, Debug, Serialize)]
pub struct HookResult {
    /// Upper-cased status.
    pub status: Status,

    /// Time elapsed since the scenario started.
    #[serde(serialize_with = "serialize_duration")]
    pub duration: Duration,

    /// Messages of all the recorded [`Failure`]s, joined with new lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// First recorded [`Failure`].
    #[serde(skip)]
    pub exception: Option<Failure>,
}

impl Display for HookResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {}",
            self.status,
            humantime::format_duration(self.duration),
        )?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

/// Serializes a [`Duration`] as `{"seconds": .., "nanos": ..}`.
fn serialize_duration<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct Timestamp {
        seconds: u64,
        nanos: u32,
    }

    Timestamp { seconds: duration.as_secs(), nanos: duration.subsec_nanos() }
        .serialize(serializer)
}
