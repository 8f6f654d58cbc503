use std::collections::BTreeSet;
use std::sync::Arc;

use drill_core::model::{QuestionBank, QuestionId, QuestionRecord, Verdict};
use drill_core::time::fixed_now;
use services::{Clock, DrillSession, DrillState, ProgressStore, SessionPlanner};
use storage::json::JsonFileRepository;
use storage::repository::{InMemoryRepository, ProgressRepository};

fn two_question_bank() -> Arc<QuestionBank> {
    Arc::new(
        QuestionBank::from_records(vec![
            QuestionRecord::new(QuestionId::new(0), "A", "q0", "a0"),
            QuestionRecord::new(QuestionId::new(1), "A", "q1", "a1"),
        ])
        .unwrap(),
    )
}

fn only(name: &str) -> BTreeSet<String> {
    BTreeSet::from([name.to_owned()])
}

/// Marks question 0 correct and question 1 incorrect, whatever the order.
async fn run_first_pass(session: &mut DrillSession) {
    while let DrillState::Presenting { index } = session.state() {
        let id = session.queue()[index];
        session.submit_answer().unwrap();
        let verdict = if id == QuestionId::new(0) {
            Verdict::Known
        } else {
            Verdict::Unknown
        };
        session.record_verdict(verdict).await.unwrap();
    }
}

#[tokio::test]
async fn two_questions_one_missed_then_declined() {
    let repo = InMemoryRepository::new();
    let store = ProgressStore::load_or_create(Arc::new(repo.clone()), Clock::fixed(fixed_now()))
        .await
        .unwrap();
    let mut session = DrillSession::start(
        two_question_bank(),
        only("A"),
        store,
        &mut SessionPlanner::new(),
    )
    .unwrap();

    let mut queue = session.queue().to_vec();
    queue.sort();
    assert_eq!(queue, vec![QuestionId::new(0), QuestionId::new(1)]);

    run_first_pass(&mut session).await;

    let log = session.progress_log();
    assert_eq!(log.current_known(), &[QuestionId::new(0)]);
    assert_eq!(log.current_unknown(), &[QuestionId::new(1)]);
    let report = session.take_report().unwrap();
    assert_eq!(format!("{:.2}%", report.percentage), "50.00%");
    assert!(session.has_retry_offer());

    session.decline_retry().unwrap();
    assert_eq!(session.state(), DrillState::Terminated);

    let stored = repo.stored().unwrap();
    assert_eq!(stored.time.len(), 1);
    assert_eq!(stored.known, vec![vec![QuestionId::new(0)]]);
    assert_eq!(stored.unknown, vec![vec![QuestionId::new(1)]]);
}

#[tokio::test]
async fn retry_begun_then_abandoned_leaves_two_entries() {
    let store = ProgressStore::load_or_create(
        Arc::new(InMemoryRepository::new()),
        Clock::fixed(fixed_now()),
    )
    .await
    .unwrap();
    let mut session = DrillSession::start(
        two_question_bank(),
        only("A"),
        store,
        &mut SessionPlanner::with_seed(11),
    )
    .unwrap();

    run_first_pass(&mut session).await;
    session.take_report();
    session.accept_retry().unwrap();
    assert_eq!(session.queue(), &[QuestionId::new(1)]);
    session.terminate();

    let store = session.into_store();
    let log = store.log();
    assert_eq!(log.len(), 2);
    assert_eq!(log.known()[0], vec![QuestionId::new(0)]);
    assert_eq!(log.unknown()[0], vec![QuestionId::new(1)]);
    assert!(log.known()[1].is_empty());
    assert!(log.unknown()[1].is_empty());
}

#[tokio::test]
async fn progress_survives_a_restart_through_the_json_file() {
    let path = std::env::temp_dir()
        .join(format!("drill-smoke-{}", uuid::Uuid::new_v4()))
        .join("progress.json");
    let repo: Arc<dyn ProgressRepository> = Arc::new(JsonFileRepository::new(&path));

    let store = ProgressStore::load_or_create(Arc::clone(&repo), Clock::fixed(fixed_now()))
        .await
        .unwrap();
    let mut session = DrillSession::start(
        two_question_bank(),
        only("A"),
        store,
        &mut SessionPlanner::with_seed(5),
    )
    .unwrap();
    run_first_pass(&mut session).await;
    let first_run = session.progress_log().clone();
    drop(session);

    let reopened = ProgressStore::load_or_create(repo, Clock::fixed(fixed_now()))
        .await
        .unwrap();
    let log = reopened.log();
    assert_eq!(log.len(), 2);
    assert_eq!(log.entry(0), first_run.entry(0));
    assert_eq!(log.current_known().len() + log.current_unknown().len(), 0);
}
