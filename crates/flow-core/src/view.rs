//! Read-only projections of the workspace. Both the dashboard and the plain
//! commands render these and never reach into the state trees directly.

use crate::progression::achievement;
use crate::roster::standings;
use crate::state::ms_to_utc;
use crate::state::Challenge;
use crate::state::Notice;
use crate::state::StudyProfile;
use crate::state::TaskBoard;
use crate::state::TaskId;
use crate::state::Workspace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub id: TaskId,
    pub title: String,
    pub priority: &'static str,
    pub completed: bool,
    pub published: bool,
    pub points: Option<u32>,
    /// Completed and not yet published.
    pub can_publish: bool,
    pub created: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusWidget {
    pub top_task: Option<String>,
    pub clock: String,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskBoardView {
    pub total_points: u64,
    pub rows: Vec<TaskRow>,
    pub focus: FocusWidget,
    pub extracting: bool,
    pub latest_notice: Option<Notice>,
}

pub fn task_board_view(board: &TaskBoard, latest_notice: Option<&Notice>) -> TaskBoardView {
    let rows = board
        .tasks
        .iter()
        .map(|task| TaskRow {
            id: task.id.clone(),
            title: task.title.clone(),
            priority: task.priority.label(),
            completed: task.completed,
            published: task.published,
            points: task.points,
            can_publish: task.completed && !task.published,
            created: ms_to_utc(task.created_at_ms)
                .map(|ts| ts.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        })
        .collect();

    TaskBoardView {
        total_points: board.total_points(),
        rows,
        focus: FocusWidget {
            top_task: board.top_task().map(|task| task.title.clone()),
            clock: board.timer.display(),
            running: board.timer.is_running(),
        },
        extracting: board.extracting,
        latest_notice: latest_notice.cloned(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectRow {
    pub id: String,
    pub name: String,
    pub progress: u8,
    pub link: Option<String>,
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandingRow {
    pub rank: usize,
    pub name: String,
    pub xp: u64,
    pub is_user: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyView {
    pub display_name: String,
    pub level: u32,
    pub title: &'static str,
    pub xp: u64,
    pub threshold: u64,
    /// 0..=100
    pub level_progress: u8,
    pub lifetime_xp: u64,
    pub daily_xp: u64,
    pub weekly_xp: u64,
    pub streak: u32,
    pub best_streak: u32,
    pub energy: u32,
    pub coins: u64,
    pub gems: u64,
    pub sessions: u32,
    pub focus_minutes: u64,
    pub peak_hour: Option<usize>,
    pub daily_challenge: Option<Challenge>,
    pub weekly_challenge: Option<Challenge>,
    pub subjects: Vec<SubjectRow>,
    pub leaderboard: Vec<StandingRow>,
    pub rank: usize,
    pub mode: &'static str,
    pub penalty_active: bool,
    pub streak_insurance: bool,
    pub achievements: Vec<&'static str>,
    pub clock: String,
    pub running: bool,
    pub latest_notice: Option<Notice>,
}

pub fn study_view(profile: &StudyProfile, latest_notice: Option<&Notice>) -> StudyView {
    let extras = &profile.extras;
    let threshold = profile.level_threshold();
    let level_progress = (profile.xp.saturating_mul(100) / threshold).min(100) as u8;

    let leaderboard = standings(profile)
        .into_iter()
        .enumerate()
        .map(|(idx, row)| StandingRow {
            rank: idx + 1,
            name: row.name,
            xp: row.xp,
            is_user: row.is_user,
        })
        .collect();

    StudyView {
        display_name: profile.display_name.clone(),
        level: profile.level,
        title: profile.title.label(),
        xp: profile.xp,
        threshold,
        level_progress,
        lifetime_xp: profile.lifetime_xp,
        daily_xp: extras.daily_xp,
        weekly_xp: extras.weekly_xp,
        streak: extras.streak.current,
        best_streak: extras.streak.best,
        energy: extras.energy,
        coins: extras.coins,
        gems: extras.gems,
        sessions: extras.sessions,
        focus_minutes: extras.focus_minutes,
        peak_hour: peak_hour(&extras.heatmap),
        daily_challenge: extras.daily_challenge.clone(),
        weekly_challenge: extras.weekly_challenge.clone(),
        subjects: profile
            .subjects
            .iter()
            .map(|subject| SubjectRow {
                id: subject.id.clone(),
                name: subject.name.clone(),
                progress: subject.progress,
                link: subject.link.clone(),
                complete: subject.is_complete(),
            })
            .collect(),
        leaderboard,
        rank: extras.rank,
        mode: extras.mode.label(),
        penalty_active: extras.penalty_active,
        streak_insurance: extras.streak_insurance,
        achievements: extras
            .achievements
            .iter()
            .filter_map(|id| achievement(id).map(|entry| entry.label))
            .collect(),
        clock: profile.timer.display(),
        running: profile.timer.is_running(),
        latest_notice: latest_notice.cloned(),
    }
}

/// Busiest hour of the day; the earliest wins a tie. `None` before any
/// focus time was recorded.
pub fn peak_hour(heatmap: &[u64; 24]) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (hour, minutes) in heatmap.iter().copied().enumerate() {
        if minutes == 0 {
            continue;
        }
        if best.map_or(true, |(_, top)| minutes > top) {
            best = Some((hour, minutes));
        }
    }
    best.map(|(hour, _)| hour)
}

impl Workspace {
    pub fn task_board_view(&self) -> TaskBoardView {
        task_board_view(&self.tasks, self.notices.latest())
    }

    pub fn study_view(&self) -> StudyView {
        study_view(&self.study, self.notices.latest())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::state::Priority;
    use crate::state::Rival;

    #[test]
    fn completed_unpublished_rows_can_publish() {
        let mut board = TaskBoard::default();
        let low = board.prepend("tidy desk".to_string(), Priority::Low, 0);
        let high = board.prepend("exam prep".to_string(), Priority::High, 0);
        if let Some(task) = board.get_mut(&low) {
            task.completed = true;
        }
        if let Some(task) = board.get_mut(&high) {
            task.completed = true;
            task.published = true;
            task.points = Some(50);
        }

        let view = task_board_view(&board, None);
        assert_eq!(view.total_points, 50);
        let flags: Vec<(&str, bool)> = view
            .rows
            .iter()
            .map(|row| (row.title.as_str(), row.can_publish))
            .collect();
        assert_eq!(flags, vec![("exam prep", false), ("tidy desk", true)]);
        assert_eq!(view.rows[0].created, "1970-01-01");
        assert_eq!(view.focus.top_task, None);
        assert_eq!(view.focus.clock, "25:00");
        assert!(!view.focus.running);
    }

    #[test]
    fn focus_widget_shows_top_open_task() {
        let mut board = TaskBoard::default();
        board.prepend("water plants".to_string(), Priority::Medium, 0);
        board.prepend("pay rent".to_string(), Priority::High, 0);
        board.timer.toggle();
        board.timer.tick();

        let view = task_board_view(&board, None);
        assert_eq!(view.focus.top_task.as_deref(), Some("pay rent"));
        assert_eq!(view.focus.clock, "24:59");
        assert!(view.focus.running);
    }

    #[test]
    fn study_view_reports_progress_and_standings() {
        let mut profile = StudyProfile {
            display_name: "Ana".to_string(),
            xp: 250,
            lifetime_xp: 1_250,
            level: 2,
            ..StudyProfile::default()
        };
        profile.extras.rivals = vec![Rival {
            name: "Omar".to_string(),
            xp: 4_000,
        }];
        profile.extras.rank = 2;
        profile.extras.heatmap[9] = 25;
        profile.extras.heatmap[14] = 50;
        profile.extras.achievements = vec!["first_session".to_string(), "retired".to_string()];

        let view = study_view(&profile, None);
        assert_eq!(view.threshold, 1_000);
        assert_eq!(view.level_progress, 25);
        assert_eq!(view.peak_hour, Some(14));
        assert_eq!(view.achievements, vec!["First focus session"]);
        assert_eq!(
            view.leaderboard,
            vec![
                StandingRow {
                    rank: 1,
                    name: "Omar".to_string(),
                    xp: 4_000,
                    is_user: false,
                },
                StandingRow {
                    rank: 2,
                    name: "Ana".to_string(),
                    xp: 1_250,
                    is_user: true,
                },
            ]
        );
        assert_eq!(view.mode, "normal");
    }

    #[test]
    fn peak_hour_is_none_without_focus_time() {
        assert_eq!(peak_hour(&[0; 24]), None);
        let mut heatmap = [0; 24];
        heatmap[3] = 10;
        heatmap[20] = 10;
        assert_eq!(peak_hour(&heatmap), Some(3));
    }
}
