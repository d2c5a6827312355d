//! Wakeup ritual sequencing and the SPEAK-before-complete rule.

mod common;

use common::{defer, speak, task_complete, RuntimeBuilder};
use covenant::domain::models::{
    ActionKind, CorrelationStatus, TaskStatus, ThoughtStatus, WAKEUP_ROOT_TASK_ID,
};
use covenant::services::processor::{ProcessorState, WakeupOutcome};

#[tokio::test]
async fn test_wakeup_ritual_completes_step_by_step() {
    let mut script = Vec::new();
    for step in 0..5 {
        script.push(speak(&format!("affirmation for step {step}")));
        script.push(task_complete());
    }
    let mut rt = RuntimeBuilder::new().script(script).build().await;

    let outcome = rt.processor.run_wakeup(Some("wake-chan")).await.unwrap();
    assert_eq!(outcome, WakeupOutcome::Completed);
    assert_eq!(rt.processor.state(), ProcessorState::Work);

    // Every step spoke once, in order, on the wakeup channel.
    let sent = rt.sent_messages();
    assert_eq!(sent.len(), 5);
    for (i, (channel, content)) in sent.iter().enumerate() {
        assert_eq!(channel, "wake-chan");
        assert!(content.contains(&format!("step {i}")));
    }

    // Each step task completed and carries a COMPLETED speak
    // correlation; the protected root stays active.
    let steps = rt.store.get_tasks_by_parent(WAKEUP_ROOT_TASK_ID).await.unwrap();
    assert_eq!(steps.len(), 5);
    for step in &steps {
        assert_eq!(step.status, TaskStatus::Completed, "step {}", step.id);
        let correlations = rt
            .store
            .get_correlations_by_task_and_action(&step.id, "speak", CorrelationStatus::Completed)
            .await
            .unwrap();
        assert_eq!(correlations.len(), 1, "step {}", step.id);
    }
    assert_eq!(
        rt.task(WAKEUP_ROOT_TASK_ID).await.status,
        TaskStatus::Active
    );
}

#[tokio::test]
async fn test_wakeup_task_complete_requires_prior_speak() {
    // First step tries to complete before speaking; the dispatcher
    // rewrites the completion to PONDER guidance and the step stays
    // open until a SPEAK lands.
    let mut script = vec![
        task_complete(),
        speak("CORE IDENTITY - I affirm who I am"),
        task_complete(),
    ];
    for _ in 1..5 {
        script.push(speak("affirmation"));
        script.push(task_complete());
    }
    let mut rt = RuntimeBuilder::new().script(script).build().await;

    let outcome = rt.processor.run_wakeup(Some("wake-chan")).await.unwrap();
    assert_eq!(outcome, WakeupOutcome::Completed);

    let steps = rt.store.get_tasks_by_parent(WAKEUP_ROOT_TASK_ID).await.unwrap();
    let first_step = &steps[0];
    assert_eq!(first_step.status, TaskStatus::Completed);

    // The blocked attempt is recorded: a failed thought whose final
    // action was rewritten to PONDER.
    let thoughts = rt.thoughts_for(&first_step.id).await;
    let blocked = thoughts
        .iter()
        .find(|t| {
            t.status == ThoughtStatus::Failed
                && t.final_action
                    .as_ref()
                    .is_some_and(|a| a.selected_action == ActionKind::Ponder)
        })
        .expect("blocked completion should be rewritten to PONDER");
    assert!(blocked
        .final_action
        .as_ref()
        .unwrap()
        .rationale
        .contains("SPEAK"));
}

#[tokio::test]
async fn test_wakeup_defer_sends_processor_to_shutdown() {
    let mut rt = RuntimeBuilder::new()
        .script(vec![defer("cannot affirm this sincerely")])
        .build()
        .await;

    let outcome = rt.processor.run_wakeup(Some("wake-chan")).await.unwrap();
    assert_eq!(outcome, WakeupOutcome::Deferred);
    assert_eq!(rt.processor.state(), ProcessorState::Shutdown);

    // The deferral reached the wise authority.
    let deferrals = rt.wise_authority.deferrals.lock().unwrap();
    assert_eq!(deferrals.len(), 1);
    assert!(deferrals[0].reason.contains("cannot affirm"));

    let steps = rt.store.get_tasks_by_parent(WAKEUP_ROOT_TASK_ID).await.unwrap();
    assert_eq!(steps[0].status, TaskStatus::Deferred);
}
