//! Goal completion derived from the tasks sheet.

use serde::Serialize;

use super::{GoalRecord, GoalsRepository, TaskStatus, TasksRepository};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub goal: GoalRecord,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// Rounded to the nearest whole percent; 0 when the goal has no tasks
    pub progress_percent: u32,
}

pub fn percent(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u32
}

pub async fn calculate_goal_progress(
    goal_id: &str,
    goals: &GoalsRepository,
    tasks: &TasksRepository,
) -> Result<Option<GoalProgress>> {
    let Some(goal) = goals.find_by_id(goal_id).await? else {
        return Ok(None);
    };

    let goal_tasks = tasks.list_by_goal_id(goal_id).await?;
    let completed_tasks = goal_tasks
        .iter()
        .filter(|t| t.record.status() == Some(TaskStatus::Done))
        .count();
    let total_tasks = goal_tasks.len();

    Ok(Some(GoalProgress {
        goal: goal.record,
        total_tasks,
        completed_tasks,
        progress_percent: percent(completed_tasks, total_tasks),
    }))
}

/// Progress for every pending or approved goal, most complete first.
pub async fn list_active_goal_progress(
    goals: &GoalsRepository,
    tasks: &TasksRepository,
) -> Result<Vec<GoalProgress>> {
    let all_tasks = tasks.list_all().await?;
    let mut progress: Vec<GoalProgress> = goals
        .list()
        .await?
        .into_iter()
        .filter(|g| g.record.status().is_some_and(|s| s.is_active()))
        .map(|g| {
            let goal_tasks: Vec<_> = all_tasks
                .iter()
                .filter(|t| t.record.goal_id == g.record.id)
                .collect();
            let completed_tasks = goal_tasks
                .iter()
                .filter(|t| t.record.status() == Some(TaskStatus::Done))
                .count();
            GoalProgress {
                total_tasks: goal_tasks.len(),
                completed_tasks,
                progress_percent: percent(completed_tasks, goal_tasks.len()),
                goal: g.record,
            }
        })
        .collect();

    // stable: equal percentages keep sheet order
    progress.sort_by(|a, b| b.progress_percent.cmp(&a.progress_percent));
    Ok(progress)
}
