//! Record sorting for query execution
//!
//! Multi-key, stable and deterministic. `null` (or a missing field) sorts after
//! every value ascending and before every value descending.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::errors::{ExecutorError, ExecutorResult};
use crate::document::OrderKey;
use crate::expr::compare_values;

/// Sorts source records by order keys
pub struct RecordSorter;

impl RecordSorter {
    /// Sorts records in place; ties on one key fall through to the next.
    ///
    /// Fails with `NotOrderable` on the first pair that cannot be compared.
    pub fn sort(task: &str, records: &mut [&Map<String, Value>], order: &[OrderKey]) -> ExecutorResult<()> {
        if order.is_empty() {
            return Ok(());
        }

        let mut failure: Option<ExecutorError> = None;
        records.sort_by(|a, b| {
            for key in order {
                let left = a.get(&key.key).unwrap_or(&Value::Null);
                let right = b.get(&key.key).unwrap_or(&Value::Null);
                let ordering = match Self::compare(left, right) {
                    Some(o) => o,
                    None => {
                        if failure.is_none() {
                            failure = Some(ExecutorError::not_orderable(task, &key.key, left, right));
                        }
                        return Ordering::Equal;
                    }
                };
                let ordering = if key.descending {
                    ordering.reverse()
                } else {
                    ordering
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Ascending comparison with nulls last
    fn compare(a: &Value, b: &Value) -> Option<Ordering> {
        match (a.is_null(), b.is_null()) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Greater),
            (false, true) => Some(Ordering::Less),
            (false, false) => compare_values(a, b),
        }
    }
}
