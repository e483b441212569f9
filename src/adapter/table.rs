// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Worlds of scenarios executed across separate host callbacks.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    rc::Rc,
};

use crate::{
    annotation::{self, AnnotationType},
    host::TestInfo,
    ExecutionResult, Failure, World,
};

use super::execution::ScenarioRun;

/// Identifies a single execution attempt of a test.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(crate) struct AttemptKey {
    /// `testId` annotation of the test.
    pub(crate) test_id: String,

    /// Zero-based number of the attempt.
    pub(crate) retry: u32,
}

impl AttemptKey {
    /// Reads the [`AttemptKey`] of the test currently executing.
    pub(crate) fn of(info: &dyn TestInfo) -> Result<Self, Failure> {
        let test_id = annotation::find(info.annotations(), AnnotationType::TestId)
            .ok_or_else(|| {
                Failure::new(format!(
                    "Test '{}' has no `{}` annotation",
                    info.title(),
                    AnnotationType::TestId,
                ))
            })?;
        Ok(Self { test_id: test_id.to_owned(), retry: info.retry() })
    }
}

impl fmt::Display for AttemptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.test_id, self.retry)
    }
}

/// State of a scenario between its setup and teardown callbacks.
pub(crate) struct Entry<S> {
    pub(crate) run: ScenarioRun<S>,
    pub(crate) world: World<S>,
    pub(crate) result: ExecutionResult,
}

/// Table of in-flight scenario executions, keyed by [`AttemptKey`].
///
/// An [`Entry`] is inserted once its [`World`] is constructed and removed
/// after its after-hooks complete, so it never outlives a single attempt.
pub(crate) struct WorldTable<S> {
    entries: Rc<RefCell<HashMap<AttemptKey, Entry<S>>>>,

    /// Number of [`Entry`]s currently taken out by a [`Checkout`].
    checked_out: Rc<Cell<usize>>,
}

// Implemented manually to omit redundant `S: Clone` trait bound, imposed by
// `#[derive(Clone)]`.
impl<S> Clone for WorldTable<S> {
    fn clone(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
            checked_out: Rc::clone(&self.checked_out),
        }
    }
}

impl<S> Default for WorldTable<S> {
    fn default() -> Self {
        Self {
            entries: Rc::new(RefCell::new(HashMap::new())),
            checked_out: Rc::new(Cell::new(0)),
        }
    }
}

impl<S> WorldTable<S> {
    /// Inserts an [`Entry`], replacing a stale one left under the same
    /// `key`.
    pub(crate) fn insert(&self, key: AttemptKey, entry: Entry<S>) {
        if self.entries.borrow_mut().insert(key.clone(), entry).is_some() {
            tracing::warn!(attempt = %key, "replaced a stale world");
        }
    }

    /// Removes the [`Entry`] of the given `key`.
    pub(crate) fn remove(&self, key: &AttemptKey) -> Option<Entry<S>> {
        self.entries.borrow_mut().remove(key)
    }

    /// Takes the [`Entry`] of the given `key` out, until the returned
    /// [`Checkout`] is dropped.
    pub(crate) fn checkout(&self, key: AttemptKey) -> Option<Checkout<S>> {
        let entry = self.remove(&key)?;
        self.checked_out.set(self.checked_out.get() + 1);
        Some(Checkout { table: self.clone(), key, entry: Some(entry) })
    }

    /// Returns the number of in-flight scenario executions, including the
    /// checked out ones.
    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len() + self.checked_out.get()
    }
}

/// [`Entry`] taken out of a [`WorldTable`].
///
/// Puts the [`Entry`] back on drop, so it survives a test body cancelled by
/// the host and is still torn down.
pub(crate) struct Checkout<S> {
    table: WorldTable<S>,
    key: AttemptKey,
    entry: Option<Entry<S>>,
}

impl<S> Checkout<S> {
    /// Returns the checked out [`Entry`].
    pub(crate) fn entry(&mut self) -> &mut Entry<S> {
        self.entry
            .as_mut()
            .unwrap_or_else(|| unreachable!("`Entry` is taken only on drop"))
    }
}

impl<S> Drop for Checkout<S> {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            self.table.checked_out.set(self.table.checked_out.get() - 1);
            self.table.insert(self.key.clone(), entry);
        }
    }
}
