//! Join-then-check fan-out
//!
//! Every item of a stage runs to completion on the current task. Outcomes
//! are applied in start order once all of them have settled, and the stage
//! reports the first failure in that order.

use crate::error::{CollinsError, Result};
use futures::future::join_all;
use std::future::Future;

/// Outcome of one fan-out item, tagged with the gear key it belongs to
pub type Outcome<T> = (String, Result<T>);

/// Runs all `items` concurrently and waits for every one of them.
///
/// Outcomes come back in the order the items were given, whatever order they
/// completed in.
pub async fn settle_all<T, F>(items: Vec<(String, F)>) -> Vec<Outcome<T>>
where
    F: Future<Output = Result<T>>,
{
    let (keys, futures): (Vec<String>, Vec<F>) = items.into_iter().unzip();
    let results = join_all(futures).await;
    keys.into_iter().zip(results).collect()
}

/// Applies successful outcomes with `apply` and returns the first error.
///
/// Failures don't stop later successes from being applied.
pub fn apply_settled<T, A>(stage: &str, outcomes: Vec<Outcome<T>>, mut apply: A) -> Result<()>
where
    A: FnMut(&str, T) -> Result<()>,
{
    let mut first_error: Option<CollinsError> = None;
    let mut failures = 0usize;

    for (key, outcome) in outcomes {
        let result = outcome.and_then(|value| apply(&key, value));
        if let Err(e) = result {
            failures += 1;
            tracing::error!(stage, gear = %key, error = %e, "Fan-out item failed");
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }

    match first_error {
        Some(e) => {
            if failures > 1 {
                tracing::warn!(stage, failures, "Only the first fan-out error is reported");
            }
            Err(e)
        }
        None => Ok(()),
    }
}
