//! Bounded-concurrency bulk executor.
//!
//! Applies one async operation to a list of ids while keeping at most
//! `concurrency` operations outstanding. Input is validated up front; once
//! execution starts every outcome, including a panic, becomes a
//! [`BulkItemResult`] in input order.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde_json::Value;

use crate::domain::errors::BulkValidationError;
use crate::domain::models::{BulkConfig, BulkItemResult, BulkSummary};

/// Hard upper bound on ids per bulk call.
pub const MAX_BULK_ITEMS: usize = 500;

/// Operations in flight at once unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Runs one operation per id with a bounded number in flight.
///
/// Results come back in input order regardless of completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkExecutor {
    concurrency: usize,
    max_items: usize,
}

impl Default for BulkExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl From<&BulkConfig> for BulkExecutor {
    fn from(config: &BulkConfig) -> Self {
        Self::new(config.concurrency).with_max_items(config.max_items)
    }
}

impl BulkExecutor {
    /// Create an executor with the given window size (at least 1).
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            max_items: MAX_BULK_ITEMS,
        }
    }

    /// Lower the per-call id limit. Values above [`MAX_BULK_ITEMS`] are clamped.
    #[must_use]
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items.clamp(1, MAX_BULK_ITEMS);
        self
    }

    /// Operations allowed in flight at once.
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Largest batch accepted.
    pub const fn max_items(&self) -> usize {
        self.max_items
    }

    /// Validate raw tool input and extract the ids.
    ///
    /// The value must be an array of at most `max_items` positive integers.
    /// Floats, strings and non-positive numbers are rejected along with the
    /// index they were found at.
    pub fn parse_ids(&self, value: &Value) -> Result<Vec<i64>, BulkValidationError> {
        let Value::Array(items) = value else {
            return Err(BulkValidationError::NotAList(json_type_name(value).to_string()));
        };

        self.check_len(items.len())?;

        items
            .iter()
            .enumerate()
            .map(|(index, item)| match item.as_i64() {
                Some(id) if id > 0 => Ok(id),
                _ => Err(BulkValidationError::InvalidId {
                    index,
                    value: item.to_string(),
                }),
            })
            .collect()
    }

    /// Check an already typed id list.
    pub fn validate(&self, ids: &[i64]) -> Result<(), BulkValidationError> {
        self.check_len(ids.len())?;
        if let Some((index, id)) = ids.iter().enumerate().find(|(_, id)| **id <= 0) {
            return Err(BulkValidationError::InvalidId {
                index,
                value: id.to_string(),
            });
        }
        Ok(())
    }

    fn check_len(&self, len: usize) -> Result<(), BulkValidationError> {
        if len > self.max_items {
            return Err(BulkValidationError::TooManyItems {
                limit: self.max_items,
                actual: len,
            });
        }
        Ok(())
    }

    /// Run `operation` once per id.
    ///
    /// Fails only on invalid input, before any operation is started. The
    /// returned results line up with `ids` one to one.
    pub async fn execute<F, Fut, T, E>(
        &self,
        ids: &[i64],
        operation: F,
    ) -> Result<Vec<BulkItemResult>, BulkValidationError>
    where
        F: Fn(i64) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.validate(ids)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            items = ids.len(),
            concurrency = self.concurrency,
            "Starting bulk execution"
        );

        let operation = &operation;
        let mut slots: Vec<Option<BulkItemResult>> = vec![None; ids.len()];
        let mut outcomes = stream::iter(ids.iter().copied().enumerate())
            .map(|(index, id)| async move {
                let outcome = AssertUnwindSafe(async move { operation(id).await })
                    .catch_unwind()
                    .await;
                let result = match outcome {
                    Ok(Ok(_)) => BulkItemResult::succeeded(id),
                    Ok(Err(e)) => {
                        tracing::debug!(id, error = %e, "Bulk item failed");
                        BulkItemResult::failed(id, e.to_string())
                    }
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        tracing::warn!(id, panic = %message, "Bulk item panicked");
                        BulkItemResult::failed(id, format!("operation panicked: {message}"))
                    }
                };
                (index, result)
            })
            .buffer_unordered(self.concurrency);

        while let Some((index, result)) = outcomes.next().await {
            slots[index] = Some(result);
        }

        let results: Vec<BulkItemResult> = slots.into_iter().flatten().collect();
        let summary = Self::summarize(&results);
        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed.len(),
            "Bulk execution finished"
        );
        Ok(results)
    }

    /// [`parse_ids`](Self::parse_ids) followed by [`execute`](Self::execute).
    pub async fn execute_json<F, Fut, T, E>(
        &self,
        ids: &Value,
        operation: F,
    ) -> Result<Vec<BulkItemResult>, BulkValidationError>
    where
        F: Fn(i64) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let ids = self.parse_ids(ids)?;
        self.execute(&ids, operation).await
    }

    /// Aggregate `results` into counts and failures.
    pub fn summarize(results: &[BulkItemResult]) -> BulkSummary {
        BulkSummary::from_results(results)
    }
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ids_accepts_positive_integers() {
        let executor = BulkExecutor::default();
        assert_eq!(executor.parse_ids(&json!([3, 1, 2])).unwrap(), vec![3, 1, 2]);
        assert!(executor.parse_ids(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_parse_ids_rejects_non_list() {
        let executor = BulkExecutor::default();
        assert_eq!(
            executor.parse_ids(&json!("1,2,3")).unwrap_err(),
            BulkValidationError::NotAList("string".to_string())
        );
        assert_eq!(
            executor.parse_ids(&json!({"ids": [1]})).unwrap_err(),
            BulkValidationError::NotAList("object".to_string())
        );
    }

    #[test]
    fn test_parse_ids_rejects_bad_ids() {
        let executor = BulkExecutor::default();
        for (input, index) in [
            (json!([1, 0]), 1),
            (json!([-1]), 0),
            (json!([1, 2, 2.5]), 2),
            (json!(["7"]), 0),
            (json!([null]), 0),
        ] {
            match executor.parse_ids(&input).unwrap_err() {
                BulkValidationError::InvalidId { index: got, .. } => assert_eq!(got, index),
                other => panic!("Expected InvalidId for {input}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_ids_enforces_limit() {
        let executor = BulkExecutor::default();
        let ids: Vec<i64> = (1..=501).collect();
        assert_eq!(
            executor.parse_ids(&json!(ids)).unwrap_err(),
            BulkValidationError::TooManyItems {
                limit: 500,
                actual: 501
            }
        );
    }

    #[test]
    fn test_configured_limit_is_clamped() {
        let executor = BulkExecutor::new(0).with_max_items(10_000);
        assert_eq!(executor.concurrency(), 1);
        assert_eq!(executor.max_items(), MAX_BULK_ITEMS);

        let executor = BulkExecutor::from(&BulkConfig {
            concurrency: 4,
            max_items: 3,
        });
        assert!(matches!(
            executor.validate(&[1, 2, 3, 4]),
            Err(BulkValidationError::TooManyItems { limit: 3, actual: 4 })
        ));
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[tokio::test]
    async fn test_execute_records_failures_in_order() {
        let executor = BulkExecutor::new(2);
        let results = executor
            .execute(&[1, 2, 3], |id| async move {
                if id == 2 {
                    Err(format!("item {id} rejected"))
                } else {
                    Ok(())
                }
            })
            .await
            .unwrap();

        assert_eq!(
            results,
            vec![
                BulkItemResult::succeeded(1),
                BulkItemResult::failed(2, "item 2 rejected"),
                BulkItemResult::succeeded(3),
            ]
        );
    }
}
