//! Integration tests for the bounded-concurrency bulk executor.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use boardgate::domain::errors::BulkValidationError;
use boardgate::domain::models::{BulkItemResult, BulkOutcome};
use boardgate::domain::ports::BoardClient;
use boardgate::services::BulkExecutor;

use common::{MockBehavior, MockBoardClient};

fn counting_op(
    calls: &Arc<AtomicUsize>,
) -> impl Fn(i64) -> futures::future::Ready<Result<(), String>> + '_ {
    move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        futures::future::ready(Ok(()))
    }
}

#[tokio::test]
async fn test_empty_input_makes_no_calls() {
    let executor = BulkExecutor::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let results = executor.execute(&[], counting_op(&calls)).await.unwrap();
    let from_json = executor.execute_json(&json!([]), counting_op(&calls)).await.unwrap();

    assert!(results.is_empty());
    assert!(from_json.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(BulkExecutor::summarize(&results).outcome(), BulkOutcome::Empty);
}

#[tokio::test]
async fn test_oversized_input_rejected_before_any_call() {
    let executor = BulkExecutor::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let ids: Vec<i64> = (1..=501).collect();

    let err = executor.execute(&ids, counting_op(&calls)).await.unwrap_err();
    assert_eq!(
        err,
        BulkValidationError::TooManyItems {
            limit: 500,
            actual: 501
        }
    );
    assert!(err.to_string().contains("500"));

    let err = executor
        .execute_json(&json!(ids), counting_op(&calls))
        .await
        .unwrap_err();
    assert!(matches!(err, BulkValidationError::TooManyItems { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_exactly_max_items_is_accepted() {
    let executor = BulkExecutor::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let ids: Vec<i64> = (1..=500).collect();

    let results = executor.execute(&ids, counting_op(&calls)).await.unwrap();
    assert_eq!(results.len(), 500);
    assert_eq!(calls.load(Ordering::SeqCst), 500);
}

#[tokio::test]
async fn test_invalid_ids_rejected_before_any_call() {
    let executor = BulkExecutor::default();
    let calls = Arc::new(AtomicUsize::new(0));

    for input in [json!([1, 2, 0]), json!([-1, 4]), json!([3, 2.5]), json!(["12"])] {
        let err = executor
            .execute_json(&input, counting_op(&calls))
            .await
            .unwrap_err();
        assert!(
            matches!(err, BulkValidationError::InvalidId { .. }),
            "{input} should be rejected, got {err:?}"
        );
    }

    for ids in [vec![1, 0], vec![-1]] {
        let err = executor.execute(&ids, counting_op(&calls)).await.unwrap_err();
        assert!(matches!(err, BulkValidationError::InvalidId { .. }));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_non_list_input_rejected() {
    let executor = BulkExecutor::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let err = executor
        .execute_json(&json!({"ids": [1, 2]}), counting_op(&calls))
        .await
        .unwrap_err();
    assert_eq!(err, BulkValidationError::NotAList("object".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_single_failure_does_not_sink_siblings() {
    let client = MockBoardClient::new("prod", MockBehavior::default().failing_write(5));
    let executor = BulkExecutor::default();
    let ids: Vec<i64> = (1..=10).collect();

    let results = executor
        .execute(&ids, |id| client.delete_card(id))
        .await
        .unwrap();

    assert_eq!(results.len(), 10);
    assert_eq!(results.iter().map(|r| r.id).collect::<Vec<_>>(), ids);
    for result in &results {
        if result.id == 5 {
            assert!(!result.success);
            assert!(result.error.as_deref().unwrap().contains("simulated failure for 5"));
        } else {
            assert_eq!(result, &BulkItemResult::succeeded(result.id));
        }
    }

    let summary = BulkExecutor::summarize(&results);
    assert_eq!(summary.succeeded, 9);
    assert_eq!(summary.outcome(), BulkOutcome::PartialSuccess);
    assert_eq!(client.writes(), 10);
}

#[tokio::test]
async fn test_panicking_item_is_recorded_as_failure() {
    let client = MockBoardClient::new("prod", MockBehavior::default().panicking_write(2));
    let executor = BulkExecutor::new(2);

    let results = executor
        .execute(&[1, 2, 3], |id| client.archive_board(id))
        .await
        .unwrap();

    assert!(results[0].success);
    assert!(!results[1].success);
    assert!(results[1]
        .error
        .as_deref()
        .unwrap()
        .contains("simulated panic while writing 2"));
    assert!(results[2].success);
}

#[tokio::test(start_paused = true)]
async fn test_window_never_exceeds_concurrency() {
    let client = MockBoardClient::new(
        "prod",
        MockBehavior::default().write_delay(Duration::from_millis(10)),
    );
    let executor = BulkExecutor::new(4);
    let ids: Vec<i64> = (1..=37).collect();

    let results = executor
        .execute(&ids, |id| client.delete_board(id))
        .await
        .unwrap();

    assert_eq!(results.len(), 37);
    assert_eq!(client.max_in_flight(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_wall_time_scales_with_batches_not_items() {
    let client = MockBoardClient::new(
        "prod",
        MockBehavior::default().write_delay(Duration::from_millis(100)),
    );
    let executor = BulkExecutor::default();
    let ids: Vec<i64> = (1..=25).collect();

    let start = tokio::time::Instant::now();
    let results = executor
        .execute(&ids, |id| client.archive_workspace(id))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    // ceil(25 / 10) = 3 rounds of 100ms, far below 25 sequential calls.
    assert!(results.iter().all(|r| r.success));
    assert!(elapsed >= Duration::from_millis(300), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(400), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_results_follow_input_order_not_completion_order() {
    let executor = BulkExecutor::new(5);
    let ids = [5_i64, 4, 3, 2, 1];
    let completed = Arc::new(std::sync::Mutex::new(Vec::new()));

    let results = executor
        .execute(&ids, |id| {
            let completed = Arc::clone(&completed);
            async move {
                let delay = u64::try_from(id).unwrap() * 10;
                tokio::time::sleep(Duration::from_millis(delay)).await;
                completed.lock().unwrap().push(id);
                Ok::<_, String>(())
            }
        })
        .await
        .unwrap();

    assert_eq!(*completed.lock().unwrap(), vec![1, 2, 3, 4, 5]);
    assert_eq!(results.iter().map(|r| r.id).collect::<Vec<_>>(), ids);
}
