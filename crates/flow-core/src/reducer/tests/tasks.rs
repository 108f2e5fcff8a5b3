use super::*;
use pretty_assertions::assert_eq;

#[test]
fn toggling_twice_restores_completion_and_keeps_points() {
    let mut ws = workspace();
    let id = add_task(&mut ws, "read chapter", Priority::Low);
    run_tasks(&mut ws, TaskAction::Toggle(id.clone()));
    run_tasks(&mut ws, TaskAction::Publish(id.clone()));
    let before = ws.tasks.get(&id).cloned().expect("task");

    run_tasks(&mut ws, TaskAction::Toggle(id.clone()));
    let effects = run_tasks(&mut ws, TaskAction::Toggle(id.clone()));

    let after = ws.tasks.get(&id).expect("task");
    assert_eq!(after.completed, before.completed);
    assert_eq!(after.points, before.points);
    assert!(persists(&effects, Slot::Tasks));
}

#[test]
fn completing_a_task_notifies_but_reopening_does_not() {
    let mut ws = workspace();
    let id = add_task(&mut ws, "email tutor", Priority::Medium);

    let effects = run_tasks(&mut ws, TaskAction::Toggle(id.clone()));
    assert_eq!(notices(&effects).len(), 1);
    assert_eq!(notices(&effects)[0].0, NoticeLevel::Success);

    let effects = run_tasks(&mut ws, TaskAction::Toggle(id));
    assert!(notices(&effects).is_empty());
}

#[test]
fn publish_points_follow_priority() {
    for (priority, expected) in [
        (Priority::High, 50),
        (Priority::Medium, 20),
        (Priority::Low, 20),
    ] {
        let mut ws = workspace();
        let id = add_task(&mut ws, "task", priority);
        run_tasks(&mut ws, TaskAction::Publish(id.clone()));
        let task = ws.tasks.get(&id).expect("task");
        assert!(task.published);
        assert_eq!(task.points, Some(expected), "{priority:?}");
    }
}

#[test]
fn publishing_twice_awards_once() {
    let mut ws = workspace();
    let id = add_task(&mut ws, "ship it", Priority::High);
    run_tasks(&mut ws, TaskAction::Publish(id.clone()));
    ws.tasks.get_mut(&id).expect("task").priority = Priority::Low;

    let effects = run_tasks(&mut ws, TaskAction::Publish(id.clone()));
    assert!(!persists(&effects, Slot::Tasks));
    assert_eq!(ws.tasks.get(&id).and_then(|task| task.points), Some(50));
    assert_eq!(ws.tasks.total_points(), 50);
}

#[test]
fn top_task_prefers_highest_open_priority() {
    let mut ws = workspace();
    ws.tasks.tasks.clear();
    // Added in reverse because new tasks go on top.
    let medium = add_task(&mut ws, "medium", Priority::Medium);
    add_task(&mut ws, "high", Priority::High);
    add_task(&mut ws, "low", Priority::Low);
    run_tasks(&mut ws, TaskAction::Toggle(medium));

    let order: Vec<&str> = ws.tasks.tasks.iter().map(|task| task.title.as_str()).collect();
    assert_eq!(order, vec!["low", "high", "medium"]);
    assert_eq!(ws.tasks.top_task().map(|task| task.title.as_str()), Some("high"));
}

#[test]
fn top_task_ties_go_to_the_earlier_entry() {
    let mut ws = workspace();
    add_task(&mut ws, "second", Priority::High);
    add_task(&mut ws, "first", Priority::High);
    assert_eq!(ws.tasks.top_task().map(|task| task.title.as_str()), Some("first"));
}

#[test]
fn top_task_is_none_when_nothing_is_open() {
    let mut ws = workspace();
    assert!(ws.tasks.top_task().is_none());

    let id = add_task(&mut ws, "only", Priority::High);
    run_tasks(&mut ws, TaskAction::Toggle(id));
    assert!(ws.tasks.top_task().is_none());
}

#[test]
fn unknown_ids_are_silent_no_ops() {
    let mut ws = workspace();
    add_task(&mut ws, "keep", Priority::Low);
    let before = ws.tasks.clone();
    let ghost = TaskId("t0-99".to_string());

    assert!(run_tasks(&mut ws, TaskAction::Toggle(ghost.clone())).is_empty());
    assert!(run_tasks(&mut ws, TaskAction::Delete(ghost.clone())).is_empty());
    assert!(run_tasks(&mut ws, TaskAction::Publish(ghost)).is_empty());
    assert_eq!(ws.tasks, before);
}

#[test]
fn delete_removes_the_task() {
    let mut ws = workspace();
    let keep = add_task(&mut ws, "keep", Priority::Low);
    let drop = add_task(&mut ws, "drop", Priority::Low);

    let effects = run_tasks(&mut ws, TaskAction::Delete(drop.clone()));
    assert!(persists(&effects, Slot::Tasks));
    assert!(ws.tasks.get(&drop).is_none());
    assert!(ws.tasks.get(&keep).is_some());
}

#[test]
fn blank_titles_are_rejected() {
    let mut ws = workspace();
    let effects = run_tasks(
        &mut ws,
        TaskAction::Add {
            title: "   ".to_string(),
            priority: Priority::High,
        },
    );
    assert!(ws.tasks.tasks.is_empty());
    assert!(!persists(&effects, Slot::Tasks));
    assert_eq!(notices(&effects)[0].0, NoticeLevel::Error);
}

#[test]
fn ids_are_unique_within_the_same_millisecond() {
    let mut ws = workspace();
    let a = add_task(&mut ws, "a", Priority::Low);
    let b = add_task(&mut ws, "b", Priority::Low);
    assert_ne!(a, b);
    assert!(a.as_str().starts_with('t'));
}
