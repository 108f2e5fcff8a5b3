use std::collections::VecDeque;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Timelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::progression::StudyTitle;
use crate::progression::XP_PER_LEVEL;
use crate::roster::generate_challenges;
use crate::roster::generate_rivals;
use crate::roster::update_leaderboard;
use crate::timer::Pomodoro;

pub const NOTICE_CAPACITY: usize = 32;

/// Wall-clock facts a mutation may depend on. Injected so reducers stay
/// deterministic under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    pub today: NaiveDate,
    pub hour: u32,
    pub ts_ms: i64,
}

impl Moment {
    pub fn now() -> Self {
        let local = Local::now();
        Self {
            today: local.date_naive(),
            hour: local.hour(),
            ts_ms: local.timestamp_millis(),
        }
    }

    pub fn at(local: NaiveDateTime) -> Self {
        Self {
            today: local.date(),
            hour: local.hour(),
            ts_ms: local.and_utc().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            Self::High => 2,
            Self::Medium => 1,
            Self::Low => 0,
        }
    }

    /// Impact points awarded on publication.
    pub fn publish_points(self) -> u32 {
        match self {
            Self::High => 50,
            Self::Medium | Self::Low => 20,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub points: Option<u32>,
    pub created_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskBoard {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub next_seq: u64,
    #[serde(skip)]
    pub timer: Pomodoro,
    #[serde(skip)]
    pub extracting: bool,
}

impl Default for TaskBoard {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            next_seq: 1,
            timer: Pomodoro::default(),
            extracting: false,
        }
    }
}

impl TaskBoard {
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn get_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| &task.id == id)
    }

    /// Highest priority open task; the earliest one wins a tie.
    pub fn top_task(&self) -> Option<&Task> {
        self.tasks
            .iter()
            .filter(|task| !task.completed)
            .min_by_key(|task| std::cmp::Reverse(task.priority.rank()))
    }

    pub fn total_points(&self) -> u64 {
        self.tasks
            .iter()
            .map(|task| u64::from(task.points.unwrap_or(0)))
            .sum()
    }

    pub fn next_id(&mut self, ts_ms: i64) -> TaskId {
        let seq = self.next_seq.max(1);
        self.next_seq = seq.saturating_add(1);
        TaskId(format!("t{ts_ms}-{seq}"))
    }

    /// Inserts a fresh open task at the top of the board.
    pub fn prepend(&mut self, title: String, priority: Priority, ts_ms: i64) -> TaskId {
        let id = self.next_id(ts_ms);
        self.tasks.insert(
            0,
            Task {
                id: id.clone(),
                title,
                priority,
                completed: false,
                published: false,
                points: None,
                created_at_ms: ts_ms,
            },
        );
        id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub progress: u8,
    #[serde(default)]
    pub link: Option<String>,
}

impl Subject {
    pub fn new(id: impl Into<String>, name: impl Into<String>, link: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            progress: 0,
            link,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 100
    }
}

pub fn default_subjects() -> Vec<Subject> {
    vec![
        Subject::new("mathematics", "Mathematics", None),
        Subject::new("physics", "Physics", None),
        Subject::new("chemistry", "Chemistry", None),
        Subject::new("literature", "Literature", None),
    ]
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub current: u32,
    pub best: u32,
    pub last_active_day: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub description: String,
    pub reward_xp: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rival {
    pub name: String,
    pub xp: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyMode {
    #[default]
    Normal,
    Hardcore,
    Chill,
    Recovery,
}

impl StudyMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Hardcore => "hardcore",
            Self::Chill => "chill",
            Self::Recovery => "recovery",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "hardcore" => Some(Self::Hardcore),
            "chill" => Some(Self::Chill),
            "recovery" => Some(Self::Recovery),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyExtras {
    pub streak: Streak,
    pub energy: u32,
    pub coins: u64,
    pub gems: u64,
    pub daily_xp: u64,
    pub weekly_xp: u64,
    pub sessions: u32,
    pub focus_minutes: u64,
    /// Focus minutes per local hour of day.
    pub heatmap: [u64; 24],
    pub daily_challenge: Option<Challenge>,
    pub weekly_challenge: Option<Challenge>,
    pub achievements: Vec<String>,
    pub rivals: Vec<Rival>,
    pub rank: usize,
    pub mode: StudyMode,
    pub penalty_active: bool,
    pub streak_insurance: bool,
}

impl Default for StudyExtras {
    fn default() -> Self {
        Self {
            streak: Streak::default(),
            energy: 100,
            coins: 0,
            gems: 0,
            daily_xp: 0,
            weekly_xp: 0,
            sessions: 0,
            focus_minutes: 0,
            heatmap: [0; 24],
            daily_challenge: None,
            weekly_challenge: None,
            achievements: Vec::new(),
            rivals: Vec::new(),
            rank: 1,
            mode: StudyMode::Normal,
            penalty_active: false,
            streak_insurance: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyProfile {
    #[serde(default = "default_display_name")]
    pub display_name: String,
    pub level: u32,
    pub xp: u64,
    pub lifetime_xp: u64,
    pub title: StudyTitle,
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub timer: Pomodoro,
    #[serde(default)]
    pub extras: StudyExtras,
}

fn default_display_name() -> String {
    "You".to_string()
}

impl Default for StudyProfile {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            level: 1,
            xp: 0,
            lifetime_xp: 0,
            title: StudyTitle::Beginner,
            subjects: default_subjects(),
            timer: Pomodoro::default(),
            extras: StudyExtras::default(),
        }
    }
}

impl StudyProfile {
    /// A new profile with challenges and a rival roster rolled from `rng`.
    pub fn fresh<R: Rng>(display_name: &str, session_secs: u32, rng: &mut R) -> Self {
        let mut profile = Self {
            display_name: display_name.to_string(),
            timer: Pomodoro::new(session_secs),
            ..Self::default()
        };
        generate_challenges(&mut profile.extras, rng);
        profile.extras.rivals = generate_rivals(rng);
        update_leaderboard(&mut profile);
        profile
    }

    /// Experience needed to leave the current level. Every level costs the
    /// same, so `xp` always stays below `level * XP_PER_LEVEL`.
    pub fn level_threshold(&self) -> u64 {
        XP_PER_LEVEL
    }

    pub fn subject_mut(&mut self, id: &str) -> Option<&mut Subject> {
        self.subjects.iter_mut().find(|subject| subject.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

impl NoticeLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub seq: u64,
    pub level: NoticeLevel,
    pub message: String,
    pub ts_ms: i64,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            seq: 0,
            level,
            message: message.into(),
            ts_ms: 0,
        }
    }
}

/// Bounded FIFO of transient notices. Never persisted.
#[derive(Debug, Clone)]
pub struct NoticeBuffer {
    cap: usize,
    next_seq: u64,
    buf: VecDeque<Notice>,
}

impl Default for NoticeBuffer {
    fn default() -> Self {
        Self::new(NOTICE_CAPACITY)
    }
}

impl NoticeBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            next_seq: 1,
            buf: VecDeque::with_capacity(cap.max(1)),
        }
    }

    pub fn push(&mut self, mut notice: Notice) -> u64 {
        notice.seq = self.next_seq;
        self.next_seq += 1;

        if self.buf.len() == self.cap {
            self.buf.pop_front();
        }
        let seq = notice.seq;
        self.buf.push_back(notice);
        seq
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.buf.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.buf.iter()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Everything the controller owns: both application trees plus the
/// transient notice channel.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    pub tasks: TaskBoard,
    pub study: StudyProfile,
    pub notices: NoticeBuffer,
}

impl Workspace {
    pub fn new(tasks: TaskBoard, study: StudyProfile) -> Self {
        Self {
            tasks,
            study,
            notices: NoticeBuffer::default(),
        }
    }
}

pub fn ms_to_utc(ts_ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ts_ms)
}
