//! Activity summary figures for the dashboard

use serde::Serialize;

use crate::content::progress_percentage;
use crate::workspace::{Note, Task, WeeklyGoal};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalTotals {
    pub current: u64,
    pub target: u64,
    /// Goals whose progress reached the target
    pub met: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStats {
    pub notes_created: usize,
    pub tasks_completed: usize,
    pub completion_percentage: u8,
    pub goals: GoalTotals,
}

impl ActivityStats {
    pub fn compute(
        notes: &[Note],
        tasks: &[Task],
        goals: &[WeeklyGoal],
        completed_chapters: usize,
        total_chapters: usize,
    ) -> Self {
        let goals = goals.iter().fold(GoalTotals::default(), |mut acc, g| {
            acc.current += u64::from(g.current);
            acc.target += u64::from(g.target);
            if g.is_met() {
                acc.met += 1;
            }
            acc
        });

        Self {
            notes_created: notes.len(),
            tasks_completed: tasks.iter().filter(|t| t.completed).count(),
            completion_percentage: progress_percentage(completed_chapters, total_chapters),
            goals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn task(completed: bool) -> Task {
        Task {
            id: Uuid::new_v4(),
            text: "t".to_string(),
            completed,
            reminder: None,
        }
    }

    fn goal(current: u32, target: u32) -> WeeklyGoal {
        WeeklyGoal {
            id: Uuid::new_v4(),
            description: "g".to_string(),
            target,
            current,
        }
    }

    #[test]
    fn test_stats_summaries() {
        let notes = vec![Note {
            id: Uuid::new_v4(),
            content: "n".to_string(),
        }];
        let tasks = vec![task(true), task(false), task(true)];
        let goals = vec![goal(5, 5), goal(1, 3)];

        let stats = ActivityStats::compute(&notes, &tasks, &goals, 3, 12);
        assert_eq!(stats.notes_created, 1);
        assert_eq!(stats.tasks_completed, 2);
        assert_eq!(stats.completion_percentage, 25);
        assert_eq!(
            stats.goals,
            GoalTotals {
                current: 6,
                target: 8,
                met: 1
            }
        );
    }

    #[test]
    fn test_empty_workspace_stats() {
        let stats = ActivityStats::compute(&[], &[], &[], 0, 0);
        assert_eq!(stats, ActivityStats::default());
    }
}
