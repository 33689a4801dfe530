//! Evaluation programs: ordered task lists executed against a VM.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::task::Task;
use crate::vm::EvaluationVm;

/// Append-only list of tasks. Once frozen into an `Arc` it is treated as immutable
/// and can be replayed by any number of evaluations.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EvaluationProgram {
    tasks: Vec<Arc<Task>>,
}

impl EvaluationProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tasks: Vec::with_capacity(capacity),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, EvalError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, EvalError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn append_task(&mut self, task: Task) {
        self.tasks.push(Arc::new(task));
    }

    /// Append a task shared with other programs.
    pub fn append_task_ptr(&mut self, task: Arc<Task>) {
        self.tasks.push(task);
    }

    /// Run every task in append order.
    pub fn execute(&self, vm: &mut EvaluationVm) {
        for task in &self.tasks {
            task.execute(vm);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().map(|t| t.as_ref())
    }

    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    pub fn freeze(self) -> Arc<EvaluationProgram> {
        Arc::new(self)
    }
}

impl Extend<Task> for EvaluationProgram {
    fn extend<I: IntoIterator<Item = Task>>(&mut self, iter: I) {
        self.tasks.extend(iter.into_iter().map(Arc::new));
    }
}

impl FromIterator<Task> for EvaluationProgram {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        let mut program = Self::new();
        program.extend(iter);
        program
    }
}

impl fmt::Display for EvaluationProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, task) in self.tasks.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{task}")?;
        }
        Ok(())
    }
}
