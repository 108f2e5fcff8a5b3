//! Experience, levels, titles, streaks, currency and achievements.
//!
//! Everything here is arithmetic on a [`StudyProfile`]; persistence and
//! notices are the reducer's job.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::roster::update_leaderboard;
use crate::state::StudyExtras;
use crate::state::StudyProfile;

pub const XP_PER_LEVEL: u64 = 1000;
pub const SESSION_XP: u64 = 100;
pub const SUBJECT_UPGRADE_XP: u64 = 50;
pub const SUBJECT_STEP: u8 = 5;
pub const COIN_DIVISOR: u64 = 40;
pub const GEM_THRESHOLD: u64 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyTitle {
    Beginner,
    KnowledgeFighter,
    ExcellenceWarrior,
    StudyMonster,
    HighSchoolLegend,
}

impl StudyTitle {
    pub fn for_level(level: u32) -> Self {
        match level {
            0..=4 => Self::Beginner,
            5..=9 => Self::KnowledgeFighter,
            10..=19 => Self::ExcellenceWarrior,
            20..=34 => Self::StudyMonster,
            _ => Self::HighSchoolLegend,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::KnowledgeFighter => "Knowledge Fighter",
            Self::ExcellenceWarrior => "Excellence Warrior",
            Self::StudyMonster => "Study Monster",
            Self::HighSchoolLegend => "High-School Legend",
        }
    }
}

/// What a single experience grant changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperienceGrant {
    pub awarded: u64,
    pub levels_gained: u32,
    pub coins: u64,
    pub gems: u64,
    pub streak_advanced: bool,
    pub unlocked: Vec<&'static Achievement>,
}

/// Truncates a raw award toward zero; negative and non-finite input is 0.
pub fn truncate_award(raw: f64) -> u64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    raw.trunc().min(u64::MAX as f64) as u64
}

pub fn add_experience(
    profile: &mut StudyProfile,
    amount: u64,
    today: NaiveDate,
) -> ExperienceGrant {
    if amount == 0 {
        return ExperienceGrant::default();
    }

    roll_accumulators(&mut profile.extras, today);
    profile.xp = profile.xp.saturating_add(amount);
    profile.lifetime_xp = profile.lifetime_xp.saturating_add(amount);
    profile.extras.daily_xp = profile.extras.daily_xp.saturating_add(amount);
    profile.extras.weekly_xp = profile.extras.weekly_xp.saturating_add(amount);

    let levels_gained = settle_levels(profile);
    profile.title = StudyTitle::for_level(profile.level);

    let streak_advanced = update_streak(&mut profile.extras, today);
    let (coins, gems) = accrue_currency(&mut profile.extras, amount);
    let unlocked = unlock_achievements(profile);
    update_leaderboard(profile);

    ExperienceGrant {
        awarded: amount,
        levels_gained,
        coins,
        gems,
        streak_advanced,
        unlocked,
    }
}

/// Converts surplus experience into levels; a large grant may cross several
/// thresholds at once. Each level costs a flat `XP_PER_LEVEL`.
fn settle_levels(profile: &mut StudyProfile) -> u32 {
    let threshold = profile.level_threshold();
    let gained = u32::try_from(profile.xp / threshold).unwrap_or(u32::MAX);
    profile.xp %= threshold;
    profile.level = profile.level.saturating_add(gained);
    gained
}

/// Returns true when the streak counters moved.
pub fn update_streak(extras: &mut StudyExtras, today: NaiveDate) -> bool {
    let streak = &mut extras.streak;
    if streak.last_active_day == Some(today) {
        return false;
    }
    let yesterday = today.pred_opt();
    streak.current = match (streak.last_active_day, yesterday) {
        (Some(last), Some(yesterday)) if last == yesterday => streak.current.saturating_add(1),
        _ => 1,
    };
    streak.best = streak.best.max(streak.current);
    streak.last_active_day = Some(today);
    true
}

pub fn accrue_currency(extras: &mut StudyExtras, amount: u64) -> (u64, u64) {
    let coins = amount / COIN_DIVISOR;
    let gems = u64::from(amount >= GEM_THRESHOLD);
    extras.coins = extras.coins.saturating_add(coins);
    extras.gems = extras.gems.saturating_add(gems);
    (coins, gems)
}

/// Zeroes the daily and weekly accumulators when the calendar moved on
/// since the last active day.
pub fn roll_accumulators(extras: &mut StudyExtras, today: NaiveDate) {
    let Some(last) = extras.streak.last_active_day else {
        return;
    };
    if last != today {
        extras.daily_xp = 0;
    }
    if last.iso_week() != today.iso_week() {
        extras.weekly_xp = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    Sessions(u32),
    Level(u32),
    Streak(u32),
    Coins(u64),
    SubjectMastered,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Achievement {
    pub id: &'static str,
    pub label: &'static str,
    pub milestone: Milestone,
}

pub const ACHIEVEMENTS: [Achievement; 8] = [
    Achievement {
        id: "first_session",
        label: "First focus session",
        milestone: Milestone::Sessions(1),
    },
    Achievement {
        id: "ten_sessions",
        label: "Ten focus sessions",
        milestone: Milestone::Sessions(10),
    },
    Achievement {
        id: "level_5",
        label: "Reached level 5",
        milestone: Milestone::Level(5),
    },
    Achievement {
        id: "level_10",
        label: "Reached level 10",
        milestone: Milestone::Level(10),
    },
    Achievement {
        id: "streak_3",
        label: "Three-day streak",
        milestone: Milestone::Streak(3),
    },
    Achievement {
        id: "streak_7",
        label: "Seven-day streak",
        milestone: Milestone::Streak(7),
    },
    Achievement {
        id: "coins_100",
        label: "Saved 100 coins",
        milestone: Milestone::Coins(100),
    },
    Achievement {
        id: "subject_mastered",
        label: "Mastered a subject",
        milestone: Milestone::SubjectMastered,
    },
];

pub fn achievement(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|entry| entry.id == id)
}

fn milestone_reached(profile: &StudyProfile, milestone: Milestone) -> bool {
    match milestone {
        Milestone::Sessions(n) => profile.extras.sessions >= n,
        Milestone::Level(n) => profile.level >= n,
        Milestone::Streak(n) => profile.extras.streak.best >= n,
        Milestone::Coins(n) => profile.extras.coins >= n,
        Milestone::SubjectMastered => profile.subjects.iter().any(|s| s.is_complete()),
    }
}

/// Appends every newly reached achievement exactly once.
pub fn unlock_achievements(profile: &mut StudyProfile) -> Vec<&'static Achievement> {
    let mut unlocked = Vec::new();
    for entry in ACHIEVEMENTS.iter() {
        if profile.extras.achievements.iter().any(|id| id == entry.id) {
            continue;
        }
        if milestone_reached(profile, entry.milestone) {
            profile.extras.achievements.push(entry.id.to_string());
            unlocked.push(entry);
        }
    }
    unlocked
}
