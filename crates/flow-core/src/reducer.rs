use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::actions::ExtractedItem;
use super::actions::FlowAction;
use super::actions::Slot;
use super::actions::StudyAction;
use super::actions::TaskAction;
use super::actions::TimerAction;
use super::progression::add_experience;
use super::progression::truncate_award;
use super::progression::ExperienceGrant;
use super::progression::SESSION_XP;
use super::progression::SUBJECT_STEP;
use super::progression::SUBJECT_UPGRADE_XP;
use super::roster::generate_challenges;
use super::state::Moment;
use super::state::Notice;
use super::state::NoticeLevel;
use super::state::Priority;
use super::state::Subject;
use super::state::TaskId;
use super::state::Workspace;
use super::timer::Pomodoro;
use super::timer::TickOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEffect {
    /// Write the named slot; emitted after every durable mutation.
    Persist(Slot),
    Notify(Notice),
    /// Run the outbound extraction call and feed the result back as
    /// `TaskAction::ExtractionFinished`.
    ExtractTasks { text: String },
    RequestFrame,
}

pub fn reduce(ws: &mut Workspace, action: FlowAction, now: Moment) -> Vec<FlowEffect> {
    match action {
        FlowAction::Tasks(action) => reduce_tasks(ws, action, now),
        FlowAction::Study(action) => reduce_study(ws, action, now),
    }
}

fn notify(
    ws: &mut Workspace,
    level: NoticeLevel,
    message: impl Into<String>,
    now: Moment,
) -> FlowEffect {
    let mut notice = Notice::new(level, message);
    notice.ts_ms = now.ts_ms;
    notice.seq = ws.notices.push(notice.clone());
    FlowEffect::Notify(notice)
}

fn reduce_tasks(ws: &mut Workspace, action: TaskAction, now: Moment) -> Vec<FlowEffect> {
    match action {
        TaskAction::Add { title, priority } => {
            let title = title.trim();
            if title.is_empty() {
                return vec![notify(ws, NoticeLevel::Error, "A task needs a title", now)];
            }
            let id = ws.tasks.prepend(title.to_string(), priority, now.ts_ms);
            info!(task = %id, priority = priority.label(), "task added");
            vec![FlowEffect::Persist(Slot::Tasks), FlowEffect::RequestFrame]
        }
        TaskAction::Toggle(id) => toggle_task(ws, &id, now),
        TaskAction::Delete(id) => {
            let before = ws.tasks.tasks.len();
            ws.tasks.tasks.retain(|task| task.id != id);
            if ws.tasks.tasks.len() == before {
                debug!(task = %id, "delete ignored: unknown task");
                return Vec::new();
            }
            info!(task = %id, "task deleted");
            vec![FlowEffect::Persist(Slot::Tasks), FlowEffect::RequestFrame]
        }
        TaskAction::Publish(id) => publish_task(ws, &id, now),
        TaskAction::RequestExtraction { text } => {
            let text = text.trim();
            if text.is_empty() {
                return Vec::new();
            }
            if ws.tasks.extracting {
                return vec![notify(
                    ws,
                    NoticeLevel::Info,
                    "Still analysing the previous text",
                    now,
                )];
            }
            ws.tasks.extracting = true;
            info!(chars = text.chars().count(), "task extraction requested");
            vec![
                FlowEffect::ExtractTasks {
                    text: text.to_string(),
                },
                FlowEffect::RequestFrame,
            ]
        }
        TaskAction::ExtractionFinished(outcome) => finish_extraction(ws, outcome, now),
        TaskAction::Timer(timer_action) => {
            let outcome = apply_timer(&mut ws.tasks.timer, timer_action);
            let mut effects = Vec::new();
            if outcome == Some(TickOutcome::Completed) {
                info!("task board focus session completed");
                effects.push(notify(
                    ws,
                    NoticeLevel::Success,
                    "Focus time is over. Take a break!",
                    now,
                ));
            }
            effects.push(FlowEffect::RequestFrame);
            effects
        }
    }
}

fn toggle_task(ws: &mut Workspace, id: &TaskId, now: Moment) -> Vec<FlowEffect> {
    let Some(task) = ws.tasks.get_mut(id) else {
        debug!(task = %id, "toggle ignored: unknown task");
        return Vec::new();
    };
    task.completed = !task.completed;
    let completed = task.completed;
    info!(task = %id, completed, "task toggled");

    let mut effects = Vec::new();
    if completed {
        effects.push(notify(
            ws,
            NoticeLevel::Success,
            "Nice! Task done. Publish it to earn impact points",
            now,
        ));
    }
    effects.push(FlowEffect::Persist(Slot::Tasks));
    effects.push(FlowEffect::RequestFrame);
    effects
}

fn publish_task(ws: &mut Workspace, id: &TaskId, now: Moment) -> Vec<FlowEffect> {
    let Some(task) = ws.tasks.get_mut(id) else {
        debug!(task = %id, "publish ignored: unknown task");
        return Vec::new();
    };
    if task.published {
        debug!(task = %id, "publish ignored: already published");
        return vec![notify(ws, NoticeLevel::Info, "Already published", now)];
    }
    let points = task.priority.publish_points();
    task.published = true;
    task.points = Some(points);
    info!(task = %id, points, "task published");
    vec![
        notify(
            ws,
            NoticeLevel::Success,
            format!("Published! +{points} impact points"),
            now,
        ),
        FlowEffect::Persist(Slot::Tasks),
        FlowEffect::RequestFrame,
    ]
}

fn finish_extraction(
    ws: &mut Workspace,
    outcome: Result<Vec<ExtractedItem>, String>,
    now: Moment,
) -> Vec<FlowEffect> {
    ws.tasks.extracting = false;
    match outcome {
        Ok(items) => {
            let count = items.len();
            for item in items {
                let priority = item.priority.unwrap_or(Priority::Medium);
                ws.tasks.prepend(item.title, priority, now.ts_ms);
            }
            info!(count, "extracted tasks added");
            vec![
                notify(
                    ws,
                    NoticeLevel::Success,
                    format!("Added {count} task(s) from your text"),
                    now,
                ),
                FlowEffect::Persist(Slot::Tasks),
                FlowEffect::RequestFrame,
            ]
        }
        Err(reason) => {
            warn!(%reason, "task extraction failed");
            vec![
                notify(
                    ws,
                    NoticeLevel::Error,
                    format!("Could not reach the text-generation service: {reason}"),
                    now,
                ),
                FlowEffect::RequestFrame,
            ]
        }
    }
}

fn apply_timer(timer: &mut Pomodoro, action: TimerAction) -> Option<TickOutcome> {
    match action {
        TimerAction::Toggle => {
            let phase = timer.toggle();
            debug!(phase = phase.label(), remaining = timer.remaining_secs, "timer toggled");
            None
        }
        TimerAction::Tick => Some(timer.tick()),
        TimerAction::Reset => {
            timer.reset();
            None
        }
        TimerAction::SetLength { secs } => {
            timer.set_length(secs);
            None
        }
    }
}

fn reduce_study(ws: &mut Workspace, action: StudyAction, now: Moment) -> Vec<FlowEffect> {
    match action {
        StudyAction::GrantExperience(raw) => {
            let amount = truncate_award(raw);
            if amount == 0 {
                debug!(raw, "experience grant ignored");
                return Vec::new();
            }
            let grant = add_experience(&mut ws.study, amount, now.today);
            let mut effects = announce_grant(ws, &grant, now);
            effects.push(FlowEffect::Persist(Slot::Study));
            effects.push(FlowEffect::RequestFrame);
            effects
        }
        StudyAction::UpgradeSubject { id } => upgrade_subject(ws, &id, now),
        StudyAction::AddSubject { name, link } => {
            let name = name.trim();
            if name.is_empty() {
                return vec![notify(ws, NoticeLevel::Error, "A subject needs a name", now)];
            }
            let id = unique_subject_id(&ws.study.subjects, name);
            let link = link
                .map(|link| link.trim().to_string())
                .filter(|link| !link.is_empty());
            info!(subject = %id, "subject added");
            ws.study.subjects.push(Subject::new(id, name, link));
            vec![FlowEffect::Persist(Slot::Study), FlowEffect::RequestFrame]
        }
        StudyAction::RerollChallenges { seed } => {
            let mut rng = StdRng::seed_from_u64(seed);
            generate_challenges(&mut ws.study.extras, &mut rng);
            info!("challenges rerolled");
            vec![FlowEffect::Persist(Slot::Study), FlowEffect::RequestFrame]
        }
        StudyAction::SetMode(mode) => {
            if ws.study.extras.mode == mode {
                return Vec::new();
            }
            ws.study.extras.mode = mode;
            info!(mode = mode.label(), "study mode changed");
            vec![FlowEffect::Persist(Slot::Study), FlowEffect::RequestFrame]
        }
        StudyAction::SetPenalty(active) => {
            if ws.study.extras.penalty_active == active {
                return Vec::new();
            }
            ws.study.extras.penalty_active = active;
            vec![FlowEffect::Persist(Slot::Study), FlowEffect::RequestFrame]
        }
        StudyAction::SetStreakInsurance(active) => {
            if ws.study.extras.streak_insurance == active {
                return Vec::new();
            }
            ws.study.extras.streak_insurance = active;
            vec![FlowEffect::Persist(Slot::Study), FlowEffect::RequestFrame]
        }
        StudyAction::Timer(timer_action) => study_timer(ws, timer_action, now),
    }
}

fn upgrade_subject(ws: &mut Workspace, id: &str, now: Moment) -> Vec<FlowEffect> {
    let Some(subject) = ws.study.subject_mut(id) else {
        debug!(subject = id, "upgrade ignored: unknown subject");
        return Vec::new();
    };
    if subject.is_complete() {
        debug!(subject = id, "upgrade ignored: already complete");
        return Vec::new();
    }
    subject.progress = subject.progress.saturating_add(SUBJECT_STEP).min(100);
    info!(subject = id, progress = subject.progress, "subject upgraded");

    let grant = add_experience(&mut ws.study, SUBJECT_UPGRADE_XP, now.today);
    let mut effects = announce_grant(ws, &grant, now);
    effects.push(FlowEffect::Persist(Slot::Study));
    effects.push(FlowEffect::RequestFrame);
    effects
}

fn study_timer(ws: &mut Workspace, action: TimerAction, now: Moment) -> Vec<FlowEffect> {
    let outcome = apply_timer(&mut ws.study.timer, action);
    match outcome {
        Some(TickOutcome::Ignored) => Vec::new(),
        // Every counting second is written; an interrupted run loses at most one tick.
        Some(TickOutcome::Counting { .. }) => {
            vec![FlowEffect::Persist(Slot::Study), FlowEffect::RequestFrame]
        }
        Some(TickOutcome::Completed) => {
            let minutes = u64::from(ws.study.timer.session_minutes());
            let extras = &mut ws.study.extras;
            extras.sessions = extras.sessions.saturating_add(1);
            extras.focus_minutes = extras.focus_minutes.saturating_add(minutes);
            if let Some(bucket) = extras.heatmap.get_mut(now.hour as usize) {
                *bucket = bucket.saturating_add(minutes);
            }
            info!(sessions = extras.sessions, minutes, "study session completed");

            let mut effects = vec![notify(
                ws,
                NoticeLevel::Success,
                format!("Session complete! +{SESSION_XP} XP"),
                now,
            )];
            let grant = add_experience(&mut ws.study, SESSION_XP, now.today);
            effects.extend(announce_grant(ws, &grant, now));
            effects.push(FlowEffect::Persist(Slot::Study));
            effects.push(FlowEffect::RequestFrame);
            effects
        }
        None => vec![FlowEffect::Persist(Slot::Study), FlowEffect::RequestFrame],
    }
}

fn announce_grant(ws: &mut Workspace, grant: &ExperienceGrant, now: Moment) -> Vec<FlowEffect> {
    let mut effects = Vec::new();
    if grant.levels_gained > 0 {
        let message = format!(
            "Level up! You reached level {} ({})",
            ws.study.level,
            ws.study.title.label()
        );
        effects.push(notify(ws, NoticeLevel::Success, message, now));
    }
    for achievement in &grant.unlocked {
        effects.push(notify(
            ws,
            NoticeLevel::Success,
            format!("Achievement unlocked: {}", achievement.label),
            now,
        ));
    }
    effects
}

fn unique_subject_id(subjects: &[Subject], name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    let base = if slug.is_empty() {
        "subject".to_string()
    } else {
        slug
    };

    let taken = |candidate: &str| subjects.iter().any(|subject| subject.id == candidate);
    if !taken(&base) {
        return base;
    }
    let mut n = 2_u32;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests;
