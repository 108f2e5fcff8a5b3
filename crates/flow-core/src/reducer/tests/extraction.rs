use super::*;
use pretty_assertions::assert_eq;

fn request(ws: &mut Workspace, text: &str) -> Vec<FlowEffect> {
    run_tasks(
        ws,
        TaskAction::RequestExtraction {
            text: text.to_string(),
        },
    )
}

#[test]
fn request_sets_guard_and_emits_call() {
    let mut ws = workspace();
    let effects = request(&mut ws, "  buy milk, study physics  ");
    assert!(ws.tasks.extracting);
    assert_eq!(
        effects[0],
        FlowEffect::ExtractTasks {
            text: "buy milk, study physics".to_string()
        }
    );
}

#[test]
fn empty_text_is_ignored() {
    let mut ws = workspace();
    assert!(request(&mut ws, "   ").is_empty());
    assert!(!ws.tasks.extracting);
}

#[test]
fn second_request_while_in_flight_is_refused() {
    let mut ws = workspace();
    request(&mut ws, "first");
    let effects = request(&mut ws, "second");
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, FlowEffect::ExtractTasks { .. })));
    assert_eq!(notices(&effects)[0].0, NoticeLevel::Info);
}

#[test]
fn success_prepends_items_with_default_priority() {
    let mut ws = workspace();
    add_task(&mut ws, "existing", Priority::Low);
    request(&mut ws, "text");

    let effects = run_tasks(
        &mut ws,
        TaskAction::ExtractionFinished(Ok(vec![
            ExtractedItem::new("study physics", Some(Priority::High)),
            ExtractedItem::new("buy milk", None),
        ])),
    );

    assert!(!ws.tasks.extracting);
    assert!(persists(&effects, Slot::Tasks));
    let rows: Vec<(&str, Priority, bool)> = ws
        .tasks
        .tasks
        .iter()
        .map(|task| (task.title.as_str(), task.priority, task.completed))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("buy milk", Priority::Medium, false),
            ("study physics", Priority::High, false),
            ("existing", Priority::Low, false),
        ]
    );
    assert!(ws.tasks.tasks[0].points.is_none());
}

#[test]
fn failure_leaves_board_unchanged_and_clears_guard() {
    let mut ws = workspace();
    add_task(&mut ws, "existing", Priority::Low);
    request(&mut ws, "text");
    let before = ws.tasks.tasks.clone();

    let effects = run_tasks(
        &mut ws,
        TaskAction::ExtractionFinished(Err("timed out".to_string())),
    );

    assert!(!ws.tasks.extracting);
    assert_eq!(ws.tasks.tasks, before);
    assert!(!persists(&effects, Slot::Tasks));
    let emitted = notices(&effects);
    assert_eq!(emitted[0].0, NoticeLevel::Error);
    assert!(emitted[0].1.contains("timed out"));
}

#[test]
fn guard_clears_so_a_new_request_can_start() {
    let mut ws = workspace();
    request(&mut ws, "first");
    run_tasks(&mut ws, TaskAction::ExtractionFinished(Ok(Vec::new())));
    let effects = request(&mut ws, "second");
    assert!(effects
        .iter()
        .any(|effect| matches!(effect, FlowEffect::ExtractTasks { .. })));
}
