use rand::seq::SliceRandom;
use rand::Rng;

use crate::state::Challenge;
use crate::state::Rival;
use crate::state::StudyExtras;
use crate::state::StudyProfile;

pub const RIVAL_COUNT: usize = 5;
pub const RIVAL_XP_CEILING: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeTemplate {
    pub description: &'static str,
    pub reward_xp: u32,
}

impl ChallengeTemplate {
    fn to_challenge(self) -> Challenge {
        Challenge {
            description: self.description.to_string(),
            reward_xp: self.reward_xp,
        }
    }
}

const DAILY_CHALLENGES: [ChallengeTemplate; 4] = [
    ChallengeTemplate {
        description: "Finish two focus sessions",
        reward_xp: 150,
    },
    ChallengeTemplate {
        description: "Upgrade any subject twice",
        reward_xp: 100,
    },
    ChallengeTemplate {
        description: "Study for 60 minutes",
        reward_xp: 200,
    },
    ChallengeTemplate {
        description: "Review one subject resource",
        reward_xp: 80,
    },
];

const WEEKLY_CHALLENGE: ChallengeTemplate = ChallengeTemplate {
    description: "Keep a five-day streak",
    reward_xp: 1_000,
};

const RIVAL_NAMES: [&str; 8] = [
    "Ahmed", "Sara", "Omar", "Lina", "Yusuf", "Maya", "Karim", "Nour",
];

/// Assigns a random daily challenge and the fixed weekly one, replacing any
/// previous assignment.
pub fn generate_challenges<R: Rng>(extras: &mut StudyExtras, rng: &mut R) {
    extras.daily_challenge = DAILY_CHALLENGES
        .choose(rng)
        .map(|template| template.to_challenge());
    extras.weekly_challenge = Some(WEEKLY_CHALLENGE.to_challenge());
}

pub fn generate_rivals<R: Rng>(rng: &mut R) -> Vec<Rival> {
    RIVAL_NAMES
        .choose_multiple(rng, RIVAL_COUNT)
        .map(|name| Rival {
            name: (*name).to_string(),
            xp: rng.gen_range(0..RIVAL_XP_CEILING),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub name: String,
    pub xp: u64,
    pub is_user: bool,
}

/// The user and every rival ordered by experience (descending), ties broken
/// by name so the order never depends on insertion.
pub fn standings(profile: &StudyProfile) -> Vec<Standing> {
    let mut rows: Vec<Standing> = profile
        .extras
        .rivals
        .iter()
        .map(|rival| Standing {
            name: rival.name.clone(),
            xp: rival.xp,
            is_user: false,
        })
        .collect();
    rows.push(Standing {
        name: profile.display_name.clone(),
        xp: profile.lifetime_xp,
        is_user: true,
    });
    rows.sort_by(|a, b| {
        b.xp.cmp(&a.xp)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| b.is_user.cmp(&a.is_user))
    });
    rows
}

pub fn update_leaderboard(profile: &mut StudyProfile) -> usize {
    let rank = standings(profile)
        .iter()
        .position(|row| row.is_user)
        .map_or(1, |idx| idx + 1);
    profile.extras.rank = rank;
    rank
}
