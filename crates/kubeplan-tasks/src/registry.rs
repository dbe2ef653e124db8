//! Task registry
//!
//! The shared sink all compile passes write into. It guarantees at most
//! one logical task per name and exposes the final set in name order, so
//! the executor can diff runs byte for byte.

use crate::error::{Result, TaskError};
use crate::task::Task;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Append/merge-by-name task container.
///
/// `add` is for tasks a single builder owns: a second definition under the
/// same name must be identical, otherwise it is a composition bug.
/// `ensure` is for tasks that independent builders legitimately share
/// (e.g. one client CA used by every etcd cluster): the first caller
/// inserts, later callers get the existing task back.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task, failing on a conflicting definition under the same
    /// name. Re-adding a byte-identical task is a no-op.
    pub fn add(&mut self, task: Task) -> Result<()> {
        match self.tasks.entry(task.name.clone()) {
            Entry::Vacant(e) => {
                e.insert(task);
                Ok(())
            }
            Entry::Occupied(e) => {
                if *e.get() == task {
                    Ok(())
                } else {
                    Err(TaskError::DuplicateTask { name: task.name })
                }
            }
        }
    }

    /// Insert the task if absent, otherwise return the existing one.
    /// An existing task with a *different* definition is still a
    /// duplicate error: builders sharing a name must agree on its shape.
    pub fn ensure(&mut self, task: Task) -> Result<&Task> {
        match self.tasks.entry(task.name.clone()) {
            Entry::Vacant(e) => Ok(e.insert(task)),
            Entry::Occupied(e) => {
                let existing = e.into_mut();
                if *existing != task {
                    return Err(TaskError::DuplicateTask { name: task.name });
                }
                Ok(existing)
            }
        }
    }

    /// Look up a task by name
    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    /// All tasks, sorted by name
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
