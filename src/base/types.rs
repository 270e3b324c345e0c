//! Shared types for brain dumps, tasks, and Traffic Light lanes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};

/// The application error type.
pub type Err = anyhow::Error;
/// The application result type.
pub type Res<T> = Result<T, Err>;
/// A result carrying no value.
pub type Void = Res<()>;

// Categories and lanes.

/// Traffic Light category that the LLM assigns to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Urgent; do it today.
    Red,
    /// Important; do it this week.
    Yellow,
    /// Low energy; do it later.
    Green,
}

impl Category {
    /// Every category, in priority order.
    pub const ALL: [Category; 3] = [Category::Red, Category::Yellow, Category::Green];

    /// The wire name of the category.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Red => "red",
            Category::Yellow => "yellow",
            Category::Green => "green",
        }
    }

    /// The lane this category lands in.
    pub fn lane(self) -> Lane {
        match self {
            Category::Red => Lane::Red,
            Category::Yellow => Lane::Yellow,
            Category::Green => Lane::Green,
        }
    }

    /// Advisory maximum number of tasks per brain dump in this category.
    pub fn limit(self) -> usize {
        // Active lanes always carry a limit.
        self.lane().limit().unwrap_or(usize::MAX)
    }
}

/// A board lane.
///
/// The three active lanes mirror [`Category`]; `Gray` is storage for things
/// that are neither urgent nor scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    /// Urgent / today.
    Red,
    /// This week.
    Yellow,
    /// Later.
    Green,
    /// Storage.
    Gray,
}

impl Lane {
    /// Every lane, in board order.
    pub const ALL: [Lane; 4] = [Lane::Red, Lane::Yellow, Lane::Green, Lane::Gray];

    /// Maximum number of tasks the lane should hold (`None` is unbounded).
    pub fn limit(self) -> Option<usize> {
        match self {
            Lane::Red => Some(3),
            Lane::Yellow => Some(2),
            Lane::Green => Some(1),
            Lane::Gray => None,
        }
    }

    /// Human-readable time box for a task in this lane.
    pub fn time_box(self) -> &'static str {
        match self {
            Lane::Red => "25-45 min",
            Lane::Yellow => "45-60 min",
            Lane::Green => "Anytime",
            Lane::Gray => "Storage",
        }
    }

    /// Default focus session length, in minutes.
    pub fn focus_minutes(self) -> u32 {
        match self {
            Lane::Red => 25,
            Lane::Yellow => 45,
            Lane::Green => 15,
            Lane::Gray => 0,
        }
    }
}

// Brain dump request / response.

/// A single actionable task produced from a brain dump.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// The main action of the task.
    pub title: String,
    /// Traffic Light category.
    pub category: Category,
    /// Estimated minutes.
    ///
    /// Models occasionally quote numbers, so `"25"` is accepted as well as `25`.
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub duration: u32,
    /// Short reason for the assigned category.
    pub reasoning: String,
}

/// The caller's unstructured input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainDumpRequest {
    /// Arbitrary free text; no length or content checks are applied.
    pub raw_text: String,
}

/// The structured result: tasks in the order the model produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainDumpResponse {
    /// The tasks, never re-sorted.
    pub tasks: Vec<Task>,
}

/// A category that holds more tasks than its advisory limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitViolation {
    /// The offending category.
    pub category: Category,
    /// How many tasks the model put in it.
    pub count: usize,
    /// The advisory maximum.
    pub limit: usize,
}

impl BrainDumpResponse {
    /// Check the constraints that the schema alone cannot express.
    pub fn validate(&self) -> Void {
        for (index, task) in self.tasks.iter().enumerate() {
            if task.title.trim().is_empty() {
                return Err(anyhow::anyhow!("tasks[{index}].title must not be empty."));
            }
        }

        Ok(())
    }

    /// Count the tasks in each category.
    pub fn category_counts(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();

        for task in &self.tasks {
            *counts.entry(task.category).or_insert(0) += 1;
        }

        counts
    }

    /// Report every category that exceeds its advisory limit.
    ///
    /// The limits are only requested of the model; violations are reported, never repaired.
    pub fn limit_violations(&self) -> Vec<LimitViolation> {
        self.category_counts()
            .into_iter()
            .filter(|(category, count)| *count > category.limit())
            .map(|(category, count)| LimitViolation { category, count, limit: category.limit() })
            .collect()
    }
}

// Tests.
