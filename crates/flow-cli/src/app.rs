use std::sync::Arc;

use flow_core::reduce;
use flow_core::timer::Pomodoro;
use flow_core::Config;
use flow_core::FlowAction;
use flow_core::FlowEffect;
use flow_core::FlowResult;
use flow_core::Moment;
use flow_core::Notice;
use flow_core::NoticeLevel;
use flow_core::Slot;
use flow_core::StateStore;
use flow_core::StudyProfile;
use flow_core::TaskAction;
use flow_core::Workspace;
use flow_exec::TaskExtractor;
use tracing::debug;
use tracing::warn;

/// What the caller still has to do after a dispatch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub notices: Vec<Notice>,
    /// Text to hand to the extractor; the answer comes back as
    /// `TaskAction::ExtractionFinished`.
    pub extraction: Option<String>,
}

/// Owns the workspace and carries out the reducer's effects.
///
/// Save failures never abort a dispatch: they are logged and surface as an
/// error notice, once per run of consecutive failures.
pub struct App {
    ws: Workspace,
    store: StateStore,
    extractor: Arc<dyn TaskExtractor>,
    save_failing: bool,
}

/// The action behind the focus widget's "done" button.
pub fn complete_top_task(ws: &Workspace) -> Option<TaskAction> {
    ws.tasks
        .top_task()
        .map(|task| TaskAction::Toggle(task.id.clone()))
}

impl App {
    pub fn open(
        store: StateStore,
        config: &Config,
        extractor: Arc<dyn TaskExtractor>,
    ) -> FlowResult<Self> {
        let session_secs = config.timer.session_secs();
        let mut tasks = store.load_tasks()?;
        tasks.timer = Pomodoro::new(session_secs);

        let mut created = false;
        let mut study = store.load_study(|| {
            created = true;
            StudyProfile::fresh(
                &config.profile.display_name,
                session_secs,
                &mut rand::thread_rng(),
            )
        })?;
        if created {
            // Rivals and challenges are rolled once and must survive restarts.
            store.save(Slot::Study, &study)?;
        } else {
            study.timer.set_length(session_secs);
        }

        Ok(Self {
            ws: Workspace::new(tasks, study),
            store,
            extractor,
            save_failing: false,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.ws
    }

    pub fn extractor(&self) -> Arc<dyn TaskExtractor> {
        Arc::clone(&self.extractor)
    }

    pub fn dispatch(&mut self, action: FlowAction) -> Outcome {
        self.dispatch_at(action, Moment::now())
    }

    pub fn dispatch_at(&mut self, action: FlowAction, now: Moment) -> Outcome {
        let effects = reduce(&mut self.ws, action, now);
        let mut outcome = Outcome::default();
        for effect in effects {
            match effect {
                FlowEffect::Persist(slot) => {
                    if let Some(notice) = self.persist(slot, now) {
                        outcome.notices.push(notice);
                    }
                }
                FlowEffect::Notify(notice) => outcome.notices.push(notice),
                FlowEffect::ExtractTasks { text } => outcome.extraction = Some(text),
                // The dashboard redraws on every loop iteration.
                FlowEffect::RequestFrame => {}
            }
        }
        outcome
    }

    /// Dispatches and, when extraction was requested, runs it on this thread
    /// before returning.
    pub fn dispatch_blocking(&mut self, action: FlowAction) -> Vec<Notice> {
        let mut outcome = self.dispatch(action);
        let mut notices = std::mem::take(&mut outcome.notices);
        if let Some(text) = outcome.extraction {
            let result = self.extractor.extract(&text).map_err(|err| {
                warn!(error = %err, "extraction failed");
                err.to_string()
            });
            let finished = self.dispatch(FlowAction::Tasks(TaskAction::ExtractionFinished(result)));
            notices.extend(finished.notices);
        }
        notices
    }

    /// Writes both slots. Called when the dashboard closes so a paused or
    /// running study timer comes back with the seconds it had left.
    pub fn flush(&mut self) -> Vec<Notice> {
        let now = Moment::now();
        [Slot::Tasks, Slot::Study]
            .into_iter()
            .filter_map(|slot| self.persist(slot, now))
            .collect()
    }

    fn persist(&mut self, slot: Slot, now: Moment) -> Option<Notice> {
        debug!(slot = slot.file_name(), "persisting");
        match self.save(slot) {
            Ok(()) => {
                self.save_failing = false;
                None
            }
            Err(err) => {
                warn!(slot = slot.file_name(), error = %err, "failed to save state");
                if std::mem::replace(&mut self.save_failing, true) {
                    return None;
                }
                let mut notice = Notice::new(
                    NoticeLevel::Error,
                    format!("Could not save {}: {err}", slot.file_name()),
                );
                notice.ts_ms = now.ts_ms;
                notice.seq = self.ws.notices.push(notice.clone());
                Some(notice)
            }
        }
    }

    fn save(&self, slot: Slot) -> FlowResult<()> {
        match slot {
            Slot::Tasks => self.store.save(slot, &self.ws.tasks),
            Slot::Study => self.store.save(slot, &self.ws.study),
        }
    }
}

#[cfg(test)]
mod tests {
    use flow_core::ExtractedItem;
    use flow_core::Priority;
    use flow_core::StudyAction;
    use flow_core::TimerAction;
    use flow_exec::StaticTaskExtractor;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    fn open_app(dir: &std::path::Path, extractor: StaticTaskExtractor) -> App {
        let store = StateStore::open(dir).expect("store");
        App::open(store, &Config::default(), Arc::new(extractor)).expect("app")
    }

    #[test]
    fn first_open_persists_a_rolled_profile() {
        let dir = tempdir().expect("tmpdir");
        let app = open_app(dir.path(), StaticTaskExtractor::items(Vec::new()));
        assert_eq!(app.workspace().study.extras.rivals.len(), 5);

        let reopened = open_app(dir.path(), StaticTaskExtractor::items(Vec::new()));
        assert_eq!(
            reopened.workspace().study.extras.rivals,
            app.workspace().study.extras.rivals
        );
    }

    #[test]
    fn mutations_survive_a_restart() {
        let dir = tempdir().expect("tmpdir");
        let mut app = open_app(dir.path(), StaticTaskExtractor::items(Vec::new()));
        app.dispatch(FlowAction::Tasks(TaskAction::Add {
            title: "Draft slides".to_string(),
            priority: Priority::High,
        }));
        app.dispatch(FlowAction::Study(StudyAction::GrantExperience(250.0)));

        let reopened = open_app(dir.path(), StaticTaskExtractor::items(Vec::new()));
        let ws = reopened.workspace();
        assert_eq!(ws.tasks.tasks.len(), 1);
        assert_eq!(ws.tasks.tasks[0].title, "Draft slides");
        assert_eq!(ws.study.xp, 250);
    }

    #[test]
    fn blocking_extraction_adds_items() {
        let dir = tempdir().expect("tmpdir");
        let mut app = open_app(
            dir.path(),
            StaticTaskExtractor::items(vec![
                ExtractedItem::new("Email landlord", Some(Priority::High)),
                ExtractedItem::new("Buy stamps", None),
            ]),
        );

        let notices = app.dispatch_blocking(FlowAction::Tasks(TaskAction::RequestExtraction {
            text: "email landlord and buy stamps".to_string(),
        }));

        let titles: Vec<&str> = app
            .workspace()
            .tasks
            .tasks
            .iter()
            .map(|task| task.title.as_str())
            .collect();
        assert_eq!(titles.len(), 2);
        assert!(titles.contains(&"Email landlord"));
        assert!(!app.workspace().tasks.extracting);
        assert!(notices.iter().any(|n| n.level == NoticeLevel::Success));
    }

    #[test]
    fn failed_extraction_leaves_the_board_alone() {
        let dir = tempdir().expect("tmpdir");
        let mut app = open_app(dir.path(), StaticTaskExtractor::failing("offline"));
        let notices = app.dispatch_blocking(FlowAction::Tasks(TaskAction::RequestExtraction {
            text: "anything".to_string(),
        }));

        assert!(app.workspace().tasks.tasks.is_empty());
        assert!(!app.workspace().tasks.extracting);
        assert_eq!(notices.last().map(|n| n.level), Some(NoticeLevel::Error));
    }

    #[test]
    fn study_countdown_survives_a_restart() {
        let dir = tempdir().expect("tmpdir");
        let mut app = open_app(dir.path(), StaticTaskExtractor::items(Vec::new()));
        let study_tick = || FlowAction::Study(StudyAction::Timer(TimerAction::Tick));
        app.dispatch(FlowAction::Study(StudyAction::Timer(TimerAction::Toggle)));
        for _ in 0..300 {
            app.dispatch(study_tick());
        }
        assert_eq!(app.workspace().study.timer.remaining_secs, 1200);
        drop(app);

        let reopened = open_app(dir.path(), StaticTaskExtractor::items(Vec::new()));
        let timer = &reopened.workspace().study.timer;
        assert_eq!(timer.remaining_secs, 1200);
        assert!(!timer.is_running());
    }

    #[test]
    fn flush_writes_the_current_timer() {
        let dir = tempdir().expect("tmpdir");
        let mut app = open_app(dir.path(), StaticTaskExtractor::items(Vec::new()));
        app.ws.study.timer.remaining_secs = 42;
        assert!(app.flush().is_empty());

        let reopened = open_app(dir.path(), StaticTaskExtractor::items(Vec::new()));
        assert_eq!(reopened.workspace().study.timer.remaining_secs, 42);
    }

    #[test]
    fn save_failures_become_a_single_error_notice() {
        let root = tempdir().expect("tmpdir");
        let data = root.path().join("data");
        let mut app = open_app(&data, StaticTaskExtractor::items(Vec::new()));
        // A plain file where the data directory was makes every write fail.
        std::fs::remove_dir_all(&data).expect("remove data dir");
        std::fs::write(&data, b"").expect("block data dir");

        let add = |title: &str| {
            FlowAction::Tasks(TaskAction::Add {
                title: title.to_string(),
                priority: Priority::Low,
            })
        };
        let first = app.dispatch(add("Water plants"));
        let errors: Vec<&Notice> = first
            .notices
            .iter()
            .filter(|n| n.level == NoticeLevel::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("tasks"));
        assert_eq!(app.workspace().tasks.tasks.len(), 1);
        assert_eq!(
            app.workspace().notices.latest().map(|n| n.level),
            Some(NoticeLevel::Error)
        );

        let second = app.dispatch(add("Feed cat"));
        assert!(second.notices.iter().all(|n| n.level != NoticeLevel::Error));
        assert_eq!(app.workspace().tasks.tasks.len(), 2);
    }

    #[test]
    fn completing_the_top_task_targets_the_highest_priority() {
        let dir = tempdir().expect("tmpdir");
        let mut app = open_app(dir.path(), StaticTaskExtractor::items(Vec::new()));
        assert!(complete_top_task(app.workspace()).is_none());
        for (title, priority) in [("Stretch", Priority::Low), ("File taxes", Priority::High)] {
            app.dispatch(FlowAction::Tasks(TaskAction::Add {
                title: title.to_string(),
                priority,
            }));
        }

        let action = complete_top_task(app.workspace()).expect("top task");
        app.dispatch(FlowAction::Tasks(action));
        let done: Vec<&str> = app
            .workspace()
            .tasks
            .tasks
            .iter()
            .filter(|task| task.completed)
            .map(|task| task.title.as_str())
            .collect();
        assert_eq!(done, vec!["File taxes"]);
    }
}
