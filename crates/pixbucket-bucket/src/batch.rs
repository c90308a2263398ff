//! Concurrent fan-out of per-object work.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use tokio::task::JoinSet;
use tracing::warn;

/// Results of a fan-out, keyed by object name.
pub(crate) struct BatchOutcome<R> {
    pub succeeded: Vec<(String, R)>,
    pub failed: BTreeMap<String, String>,
}

/// Run `task` for every item concurrently, one spawned task per item.
///
/// Each task reports back under its own name, so results never depend on
/// completion order. A task that panics is recorded as a failure of the item
/// it was spawned for; it never affects the others.
pub(crate) async fn fan_out<T, R, F, Fut>(items: Vec<(String, T)>, mut task: F) -> BatchOutcome<R>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<R, String>> + Send + 'static,
    R: Send + 'static,
{
    let mut pending = BTreeSet::new();
    let mut tasks = JoinSet::new();
    for (name, item) in items {
        pending.insert(name.clone());
        let fut = task(item);
        tasks.spawn(async move { (name, fut.await) });
    }

    let mut outcome = BatchOutcome {
        succeeded: Vec::with_capacity(pending.len()),
        failed: BTreeMap::new(),
    };
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, result)) => {
                pending.remove(&name);
                match result {
                    Ok(r) => outcome.succeeded.push((name, r)),
                    Err(reason) => {
                        outcome.failed.insert(name, reason);
                    }
                }
            }
            Err(e) => warn!(error = %e, "batch task did not complete"),
        }
    }

    // Whatever never reported back panicked or was aborted.
    for name in pending {
        outcome
            .failed
            .insert(name, "task did not complete".to_string());
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn results_are_keyed_by_name() {
        let items = vec![
            ("slow".to_string(), 30u64),
            ("fast".to_string(), 1),
            ("bad".to_string(), 0),
        ];
        let outcome = fan_out(items, |delay| async move {
            if delay == 0 {
                return Err("rejected".to_string());
            }
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(delay * 2)
        })
        .await;

        let mut ok = outcome.succeeded;
        ok.sort();
        assert_eq!(ok, vec![("fast".to_string(), 2), ("slow".to_string(), 60)]);
        assert_eq!(outcome.failed.get("bad").map(String::as_str), Some("rejected"));
    }

    #[tokio::test]
    async fn panicking_task_fails_only_its_item() {
        let items = vec![("boom".to_string(), true), ("fine".to_string(), false)];
        let outcome = fan_out(items, |explode| async move {
            if explode {
                panic!("task exploded");
            }
            Ok(())
        })
        .await;

        assert_eq!(outcome.succeeded.len(), 1);
        assert_eq!(outcome.succeeded[0].0, "fine");
        assert!(outcome.failed.contains_key("boom"));
    }

    #[tokio::test]
    async fn empty_batch() {
        let outcome = fan_out(Vec::<(String, ())>::new(), |_| async { Ok::<_, String>(()) }).await;
        assert!(outcome.succeeded.is_empty());
        assert!(outcome.failed.is_empty());
    }
}
