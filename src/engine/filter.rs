use bon::Builder;

use super::types::{Status, Task};

/// Task selection predicate.
///
/// All three constraints are ANDed; membership inside each list is ORed.
/// An empty list leaves its constraint open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
pub struct TaskFilter {
    #[builder(default)]
    pub ids: Vec<String>,
    #[builder(default)]
    pub statuses: Vec<Status>,
    #[builder(default)]
    pub not_statuses: Vec<Status>,
}

impl TaskFilter {
    /// Filter selecting exactly one task id.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::builder().ids(vec![id.into()]).build()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.statuses.is_empty() && self.not_statuses.is_empty()
    }

    pub fn matches(&self, task: &Task) -> bool {
        (self.ids.is_empty() || self.ids.iter().any(|id| *id == task.id))
            && (self.statuses.is_empty() || self.statuses.contains(&task.status))
            && !self.not_statuses.contains(&task.status)
    }

    /// Applies the filter, keeping the input order.
    pub fn apply<'a, I>(&self, tasks: I) -> Vec<Task>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        tasks
            .into_iter()
            .filter(|task| self.matches(task))
            .cloned()
            .collect()
    }
}
