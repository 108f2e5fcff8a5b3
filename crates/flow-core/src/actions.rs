use crate::state::Priority;
use crate::state::StudyMode;
use crate::state::TaskId;

#[derive(Debug, Clone)]
pub enum FlowAction {
    Tasks(TaskAction),
    Study(StudyAction),
}

#[derive(Debug, Clone)]
pub enum TaskAction {
    Add { title: String, priority: Priority },
    Toggle(TaskId),
    Delete(TaskId),
    Publish(TaskId),
    RequestExtraction { text: String },
    ExtractionFinished(Result<Vec<ExtractedItem>, String>),
    Timer(TimerAction),
}

#[derive(Debug, Clone)]
pub enum StudyAction {
    /// Raw award; truncated toward zero before use.
    GrantExperience(f64),
    UpgradeSubject { id: String },
    AddSubject { name: String, link: Option<String> },
    RerollChallenges { seed: u64 },
    SetMode(StudyMode),
    SetPenalty(bool),
    SetStreakInsurance(bool),
    Timer(TimerAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Toggle,
    Tick,
    Reset,
    SetLength { secs: u32 },
}

/// One task proposed by the text-generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedItem {
    pub title: String,
    pub priority: Option<Priority>,
}

impl ExtractedItem {
    pub fn new(title: impl Into<String>, priority: Option<Priority>) -> Self {
        Self {
            title: title.into(),
            priority,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Tasks,
    Study,
}

impl Slot {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Tasks => "tasks.json",
            Self::Study => "study.json",
        }
    }
}
