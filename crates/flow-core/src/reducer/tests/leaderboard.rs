use super::*;
use crate::state::StudyMode;
use pretty_assertions::assert_eq;

fn with_rivals(ws: &mut Workspace, xps: &[u64]) {
    ws.study.extras.rivals = xps
        .iter()
        .enumerate()
        .map(|(idx, xp)| Rival {
            name: format!("rival-{idx}"),
            xp: *xp,
        })
        .collect();
}

#[test]
fn rank_climbs_as_experience_grows() {
    let mut ws = workspace();
    with_rivals(&mut ws, &[3000, 1500, 500]);
    run_study(&mut ws, StudyAction::GrantExperience(100.0));
    assert_eq!(ws.study.extras.rank, 4);

    run_study(&mut ws, StudyAction::GrantExperience(1000.0));
    assert_eq!(ws.study.extras.rank, 3);

    run_study(&mut ws, StudyAction::GrantExperience(5000.0));
    assert_eq!(ws.study.extras.rank, 1);
}

#[test]
fn reroll_is_deterministic_for_a_seed() {
    let mut a = workspace();
    let mut b = workspace();
    run_study(&mut a, StudyAction::RerollChallenges { seed: 42 });
    run_study(&mut b, StudyAction::RerollChallenges { seed: 42 });
    assert_eq!(a.study.extras.daily_challenge, b.study.extras.daily_challenge);
    assert!(a.study.extras.daily_challenge.is_some());
    assert!(a.study.extras.weekly_challenge.is_some());
}

#[test]
fn mode_and_flags_persist_only_on_change() {
    let mut ws = workspace();
    assert!(run_study(&mut ws, StudyAction::SetMode(StudyMode::Normal)).is_empty());

    let effects = run_study(&mut ws, StudyAction::SetMode(StudyMode::Hardcore));
    assert!(persists(&effects, Slot::Study));
    assert_eq!(ws.study.extras.mode, StudyMode::Hardcore);

    assert!(persists(
        &run_study(&mut ws, StudyAction::SetStreakInsurance(true)),
        Slot::Study
    ));
    assert!(run_study(&mut ws, StudyAction::SetStreakInsurance(true)).is_empty());
    assert!(persists(
        &run_study(&mut ws, StudyAction::SetPenalty(true)),
        Slot::Study
    ));
    assert!(ws.study.extras.penalty_active);
}
