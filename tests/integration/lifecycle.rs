//! Race lifecycle integration tests.
//!
//! These tests verify start validation, the single-race rule, reset, and
//! that runners from a discarded race cannot affect the next one.

use tokio_test::{assert_err, assert_ok};

use aoc_race::orchestration::StartRequest;
use aoc_race::pipeline::Strategy;
use aoc_race::race::{CompetitorStatus, Part, RaceStatus, Stage, StageEvent};
use aoc_race::Error;

use crate::fixtures::{settle, FakeSource, Harness, SESSION, YEAR};

/// Test: Reset then start
/// Given a race with agent activity and a solved human part
/// When the race is reset and a new one started
/// Then the new session is fresh and the old run was cancelled
#[tokio::test]
async fn test_reset_then_start_yields_fresh_session() {
    let h = Harness::new(FakeSource::new(1));
    let first = h.start(1).await;
    h.wait_for_launches(1).await;
    h.pipeline.stage(Part::One, StageEvent::new(Stage::Planning, "Creating implementation plan..."));
    h.wait_for("planning", |s| s.latest_stage == Some(Stage::Planning)).await;
    h.service.submit_answer(Part::One, "142").await.unwrap();

    h.service.reset_race();
    assert!(matches!(h.service.get_status(), Err(Error::NoActiveRace)));
    let old_job = h.pipeline.jobs()[0].clone();
    assert!(old_job.cancel.is_cancelled());

    let second = h.start(1).await;
    assert!(second.generation > first.generation);
    assert_ne!(second.race_id, first.race_id);
    assert_eq!(second.part1.human.status, CompetitorStatus::Pending);
    assert_eq!(second.part2.human.status, CompetitorStatus::Pending);
    assert_eq!(second.part2.agent.status, CompetitorStatus::Pending);
    assert!(second.part1.activity.is_empty());
    assert!(second.puzzle_part2.is_none());

    h.wait_for_launches(2).await;
    assert!(!h.pipeline.jobs()[1].cancel.is_cancelled());
}

/// Test: Stale runner after reset
/// Given a race that was reset while its part-1 run was waiting
/// When a new race starts and the new run reports
/// Then only the new race's state changes
#[tokio::test]
async fn test_reset_detaches_old_runner() {
    let h = Harness::new(FakeSource::new(1));
    h.start(1).await;
    h.wait_for_launches(1).await;

    h.service.reset_race();
    settle().await;

    let fresh = h.start(1).await;
    h.wait_for_launches(2).await;
    assert_eq!(fresh.part1.agent.status, CompetitorStatus::Running);

    h.pipeline.stage(Part::One, StageEvent::new(Stage::Critique, "Reviewing plan..."));
    let status = h.wait_for("critique", |s| s.latest_stage == Some(Stage::Critique)).await;
    assert_eq!(status.generation, fresh.generation);
    assert_eq!(status.part1.activity.len(), 1);
}

/// Test: Single race at a time
/// Given an active race, finished or not
/// When another start arrives
/// Then it is rejected with AlreadyRacing
#[tokio::test]
async fn test_start_while_active_is_rejected() {
    let h = Harness::new(FakeSource::new(25));
    h.start(25).await;

    let err = h.service.start_race(h.start_request(25)).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyRacing));

    h.service.submit_answer(Part::One, "142").await.unwrap();
    h.pipeline.solve(Part::One, "142");
    h.wait_for("finished", |s| s.status == RaceStatus::Finished).await;
    assert!(matches!(
        h.service.start_race(h.start_request(25)).await,
        Err(Error::AlreadyRacing)
    ));

    h.service.reset_race();
    assert_ok!(h.service.start_race(h.start_request(25)).await);
}

/// Test: Session token fallback
/// Given no token in the request
/// When a default token exists it is used, otherwise MissingSession
#[tokio::test]
async fn test_session_token_fallback() {
    let h = Harness::new(FakeSource::new(1));
    let request = StartRequest {
        session: Some("   ".to_string()),
        ..h.start_request(1)
    };
    assert!(matches!(
        h.service.start_race(request).await,
        Err(Error::MissingSession)
    ));
    assert!(h.connector.sessions().is_empty());

    let h = Harness::with_default_session(FakeSource::new(1), Some("env-token"));
    let request = StartRequest {
        session: None,
        ..h.start_request(1)
    };
    assert_ok!(h.service.start_race(request).await);
    assert_eq!(h.connector.sessions(), vec!["env-token".to_string()]);
}

/// Test: Start validation
/// Given out-of-range puzzles or a locked day
/// When a start is attempted
/// Then it fails and no race exists afterwards
#[tokio::test]
async fn test_invalid_starts_leave_service_idle() {
    let h = Harness::new(FakeSource::new(1));
    for (year, day) in [(YEAR, 0), (YEAR, 26), (2014, 1)] {
        let request = StartRequest {
            year,
            day,
            session: Some(SESSION.to_string()),
            strategy: None,
        };
        assert!(matches!(
            h.service.start_race(request).await,
            Err(Error::Validation(_))
        ));
    }

    let locked = Harness::new(FakeSource::locked(7));
    assert!(matches!(
        locked.service.start_race(locked.start_request(7)).await,
        Err(Error::PartLocked { day: 7, part: Part::One, .. })
    ));
    assert_err!(locked.service.get_status());
    assert!(locked.pipeline.jobs().is_empty());
}

/// Test: Requests without a race
#[tokio::test]
async fn test_requests_without_race() {
    let h = Harness::new(FakeSource::new(1));
    assert!(matches!(h.service.get_status(), Err(Error::NoActiveRace)));
    assert!(matches!(
        h.service.submit_answer(Part::One, "142").await,
        Err(Error::NoActiveRace)
    ));
    // Reset is a no-op without a race.
    h.service.reset_race();
}

/// Test: Part 2 locked and empty answers
#[tokio::test]
async fn test_submit_validation() {
    let h = Harness::new(FakeSource::new(1));
    h.start(1).await;

    assert!(matches!(
        h.service.submit_answer(Part::Two, "281").await,
        Err(Error::PartNotUnlocked(Part::Two))
    ));
    assert!(matches!(
        h.service.submit_answer(Part::One, "  ").await,
        Err(Error::Validation(_))
    ));
    assert!(h.source.submissions().is_empty());
}

/// Test: Strategy selection
/// Given a one-shot start request
/// Then the snapshot and the launched job both use one-shot
#[tokio::test]
async fn test_strategy_selection() {
    let h = Harness::new(FakeSource::new(1));
    let request = StartRequest {
        strategy: Some(Strategy::OneShot),
        ..h.start_request(1)
    };
    let started = h.service.start_race(request).await.unwrap();
    assert_eq!(started.strategy, Strategy::OneShot);

    h.wait_for_launches(1).await;
    let job = &h.pipeline.jobs()[0];
    assert_eq!(job.strategy, Strategy::OneShot);
    assert_eq!(job.workspace_root, h.workspace.path());
}
