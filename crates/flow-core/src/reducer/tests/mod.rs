use chrono::NaiveDate;
use pretty_assertions::assert_eq;

pub(super) use super::reduce;
pub(super) use super::FlowEffect;
pub(super) use crate::actions::ExtractedItem;
pub(super) use crate::actions::FlowAction;
pub(super) use crate::actions::Slot;
pub(super) use crate::actions::StudyAction;
pub(super) use crate::actions::TaskAction;
pub(super) use crate::actions::TimerAction;
pub(super) use crate::state::Moment;
pub(super) use crate::state::NoticeLevel;
pub(super) use crate::state::Priority;
pub(super) use crate::state::Rival;
pub(super) use crate::state::StudyProfile;
pub(super) use crate::state::TaskBoard;
pub(super) use crate::state::TaskId;
pub(super) use crate::state::Workspace;
pub(super) use crate::timer::Pomodoro;
pub(super) use crate::timer::TimerPhase;

mod experience;
mod extraction;
mod leaderboard;
mod tasks;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).expect("valid day")
}

/// 10:00 local on 2026-03-`d`.
fn moment(d: u32) -> Moment {
    Moment::at(day(d).and_hms_opt(10, 0, 0).expect("valid time"))
}

fn workspace() -> Workspace {
    Workspace::new(TaskBoard::default(), StudyProfile::default())
}

fn run_tasks(ws: &mut Workspace, action: TaskAction) -> Vec<FlowEffect> {
    reduce(ws, FlowAction::Tasks(action), moment(1))
}

fn run_study_on(ws: &mut Workspace, action: StudyAction, d: u32) -> Vec<FlowEffect> {
    reduce(ws, FlowAction::Study(action), moment(d))
}

fn run_study(ws: &mut Workspace, action: StudyAction) -> Vec<FlowEffect> {
    run_study_on(ws, action, 1)
}

fn add_task(ws: &mut Workspace, title: &str, priority: Priority) -> TaskId {
    let effects = run_tasks(
        ws,
        TaskAction::Add {
            title: title.to_string(),
            priority,
        },
    );
    assert!(effects.contains(&FlowEffect::Persist(Slot::Tasks)));
    ws.tasks.tasks[0].id.clone()
}

fn persists(effects: &[FlowEffect], slot: Slot) -> bool {
    effects.contains(&FlowEffect::Persist(slot))
}

fn notices(effects: &[FlowEffect]) -> Vec<(NoticeLevel, String)> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            FlowEffect::Notify(notice) => Some((notice.level, notice.message.clone())),
            _ => None,
        })
        .collect()
}

#[test]
fn notices_are_mirrored_into_the_buffer() {
    let mut ws = workspace();
    let id = add_task(&mut ws, "write report", Priority::High);
    let effects = run_tasks(&mut ws, TaskAction::Toggle(id));

    let emitted = notices(&effects);
    assert_eq!(emitted.len(), 1);
    let latest = ws.notices.latest().expect("notice");
    assert_eq!(latest.message, emitted[0].1);
    assert_eq!(latest.seq, 1);
}
