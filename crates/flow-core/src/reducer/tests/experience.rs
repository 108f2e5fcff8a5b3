use super::*;
use crate::progression::StudyTitle;
use pretty_assertions::assert_eq;

#[test]
fn exact_threshold_levels_up_once() {
    let mut ws = workspace();
    let effects = run_study(&mut ws, StudyAction::GrantExperience(1000.0));

    assert_eq!(ws.study.level, 2);
    assert_eq!(ws.study.xp, 0);
    assert_eq!(ws.study.lifetime_xp, 1000);
    assert!(persists(&effects, Slot::Study));
    assert!(notices(&effects)
        .iter()
        .any(|(_, message)| message.contains("level 2")));
}

#[test]
fn large_grant_crosses_several_levels() {
    let mut ws = workspace();
    run_study(&mut ws, StudyAction::GrantExperience(2500.0));
    assert_eq!(ws.study.level, 3);
    assert_eq!(ws.study.xp, 500);
    assert_eq!(ws.study.lifetime_xp, 2500);
}

#[test]
fn fractional_grants_are_truncated() {
    let mut ws = workspace();
    run_study(&mut ws, StudyAction::GrantExperience(99.9));
    assert_eq!(ws.study.xp, 99);
    assert_eq!(ws.study.extras.daily_xp, 99);
    assert_eq!(ws.study.extras.weekly_xp, 99);
}

#[test]
fn zero_and_negative_grants_change_nothing() {
    let mut ws = workspace();
    let before = ws.study.clone();
    assert!(run_study(&mut ws, StudyAction::GrantExperience(0.4)).is_empty());
    assert!(run_study(&mut ws, StudyAction::GrantExperience(-50.0)).is_empty());
    assert_eq!(ws.study, before);
}

#[test]
fn title_follows_level_bands() {
    let mut ws = workspace();
    run_study(&mut ws, StudyAction::GrantExperience(3999.0));
    assert_eq!(ws.study.level, 4);
    assert_eq!(ws.study.title, StudyTitle::Beginner);

    run_study(&mut ws, StudyAction::GrantExperience(1.0));
    assert_eq!(ws.study.level, 5);
    assert_eq!(ws.study.xp, 0);
    assert_eq!(ws.study.title, StudyTitle::KnowledgeFighter);
    assert!(ws.study.extras.achievements.contains(&"level_5".to_string()));
}

#[test]
fn every_level_costs_the_same() {
    let mut ws = workspace();
    ws.study.level = 7;
    ws.study.xp = 900;
    run_study(&mut ws, StudyAction::GrantExperience(1100.0));
    assert_eq!(ws.study.level, 9);
    assert_eq!(ws.study.xp, 0);
    assert_eq!(ws.study.title, StudyTitle::KnowledgeFighter);
}

#[test]
fn grants_accrue_coins_and_gems() {
    let mut ws = workspace();
    run_study(&mut ws, StudyAction::GrantExperience(399.0));
    assert_eq!((ws.study.extras.coins, ws.study.extras.gems), (9, 0));
    run_study(&mut ws, StudyAction::GrantExperience(400.0));
    assert_eq!((ws.study.extras.coins, ws.study.extras.gems), (19, 1));
}

#[test]
fn daily_accumulator_resets_on_a_new_day() {
    let mut ws = workspace();
    run_study_on(&mut ws, StudyAction::GrantExperience(300.0), 3);
    run_study_on(&mut ws, StudyAction::GrantExperience(200.0), 4);
    assert_eq!(ws.study.extras.daily_xp, 200);
    // 2026-03-03 and 2026-03-04 share an ISO week.
    assert_eq!(ws.study.extras.weekly_xp, 500);
    assert_eq!(ws.study.lifetime_xp, 500);
}
