//! Ponder bounding and deferral escalation.

mod common;

use common::{ponder, RuntimeBuilder};
use covenant::domain::models::{
    Task, TaskContext, TaskStatus, Thought, ThoughtStatus, MONITOR_TASK_ID,
};

#[tokio::test]
async fn test_ponder_bounces_then_defers_at_limit() {
    let mut rt = RuntimeBuilder::new()
        .script(vec![
            ponder(&["what does the user actually want?"]),
            ponder(&["still unsure"]),
            ponder(&["this should never run"]),
        ])
        .configure(|config| config.workflow.max_ponder_rounds = 2)
        .build()
        .await;
    let task = rt.submit_task("An ambiguous request", "chan-1").await;

    // Round one: the thought bounces back to PENDING.
    rt.run_ticks(1).await;
    let thoughts = rt.thoughts_for(&task.id).await;
    assert_eq!(thoughts.len(), 1);
    assert_eq!(thoughts[0].status, ThoughtStatus::Pending);
    assert_eq!(thoughts[0].ponder_count, 1);
    assert_eq!(thoughts[0].ponder_notes.len(), 1);

    // Round two: the limit is reached and the thought defers; the
    // (non-protected) parent task follows.
    rt.run_ticks(1).await;
    let thoughts = rt.thoughts_for(&task.id).await;
    assert_eq!(thoughts[0].status, ThoughtStatus::Deferred);
    assert!(thoughts[0]
        .ponder_notes
        .iter()
        .any(|q| q.contains("still unsure")));
    assert_eq!(rt.task(&task.id).await.status, TaskStatus::Deferred);

    // No third pipeline entry happens for this thought.
    rt.run_ticks(2).await;
    assert_eq!(rt.selector.remaining(), 1);
    assert_eq!(
        rt.thoughts_for(&task.id).await[0].status,
        ThoughtStatus::Deferred
    );
}

#[tokio::test]
async fn test_ponder_count_never_exceeds_limit() {
    let max_rounds = 3;
    let mut rt = RuntimeBuilder::new()
        .script(
            (0..10)
                .map(|i| common::ponder_questions(vec![format!("round {i}")]))
                .collect(),
        )
        .configure(|config| config.workflow.max_ponder_rounds = max_rounds)
        .build()
        .await;
    let task = rt.submit_task("Spiraling deliberation", "chan-1").await;

    rt.run_until_idle(12).await;

    let thoughts = rt.thoughts_for(&task.id).await;
    for thought in &thoughts {
        assert!(
            thought.ponder_count <= max_rounds,
            "ponder_count {} exceeded limit {max_rounds}",
            thought.ponder_count
        );
    }
    assert_eq!(thoughts[0].status, ThoughtStatus::Deferred);
}

#[tokio::test]
async fn test_protected_task_survives_ponder_limit_deferral() {
    let mut rt = RuntimeBuilder::new()
        .script(vec![ponder(&["monitoring is hard"])])
        .configure(|config| config.workflow.max_ponder_rounds = 1)
        .build()
        .await;

    // The monitor job is a protected root; seed it by hand since the
    // task manager never auto-seeds protected tasks.
    let monitor = Task::with_id(
        MONITOR_TASK_ID,
        "Monitor incoming channels.",
        0,
        TaskContext::with_channel("chan-1"),
    )
    .with_status(TaskStatus::Active);
    rt.store.add_task(&monitor).await.unwrap();
    rt.store
        .add_thought(&Thought::seed(&monitor, 0))
        .await
        .unwrap();

    rt.run_ticks(1).await;

    let thoughts = rt.thoughts_for(MONITOR_TASK_ID).await;
    assert_eq!(thoughts[0].status, ThoughtStatus::Deferred);
    // The protected root never defers through a child.
    assert_eq!(rt.task(MONITOR_TASK_ID).await.status, TaskStatus::Active);
}
