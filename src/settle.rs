//! Helpers for waiting on a set of concurrent operations.
//!
//! Unlike `try_join_all`, nothing here short-circuits: every future runs to
//! completion so partial failures can be retried or reported together.

use anyhow::Result;
use futures_util::future::join_all;
use std::future::Future;

use crate::error::{ClientError, client_error};

/// Waits for every keyed future and returns each outcome next to its key,
/// in input order.
pub async fn settle<K, T, Fut>(futures: impl IntoIterator<Item = (K, Fut)>) -> Vec<(K, Result<T>)>
where
    Fut: Future<Output = Result<T>>,
{
    let (keys, futures): (Vec<K>, Vec<Fut>) = futures.into_iter().unzip();
    let outcomes = join_all(futures).await;
    keys.into_iter().zip(outcomes).collect()
}

/// The failed subset of settled outcomes.
pub fn rejected<K, T>(outcomes: &[(K, Result<T>)]) -> Vec<(&K, &anyhow::Error)> {
    outcomes
        .iter()
        .filter_map(|(key, outcome)| outcome.as_ref().err().map(|e| (key, e)))
        .collect()
}

/// Waits for every future. If any failed, returns a single [`ClientError`]
/// whose message is `label` followed by every rejection message; status and
/// code are taken from the first rejection.
pub async fn all<T, Fut>(label: &str, futures: impl IntoIterator<Item = Fut>) -> Result<Vec<T>>
where
    Fut: Future<Output = Result<T>>,
{
    let outcomes = join_all(futures).await;

    let mut values = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(value) => values.push(value),
            Err(e) => failures.push(e),
        }
    }

    let Some(first) = failures.first() else {
        return Ok(values);
    };

    let mut error = ClientError::new(format!(
        "{}{}",
        label,
        failures
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    ));
    if let Some(first) = client_error(first) {
        error.status = first.status;
        error.code = first.code.clone();
        error.exception_id = first.exception_id.clone();
    }

    Err(error.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::time::Duration;

    type BoxedResult = Pin<Box<dyn Future<Output = Result<i32>>>>;

    #[tokio::test]
    async fn test_settle_keeps_order_and_all_outcomes() {
        let futures: Vec<(&str, BoxedResult)> = vec![
            (
                "slow",
                Box::pin(async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(1)
                }),
            ),
            ("failed", Box::pin(async { Err(anyhow::anyhow!("boom")) })),
            ("fast", Box::pin(async { Ok(3) })),
        ];

        let outcomes = settle(futures).await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].0, "slow");
        assert_eq!(*outcomes[0].1.as_ref().unwrap(), 1);
        assert!(outcomes[1].1.is_err());
        assert_eq!(*outcomes[2].1.as_ref().unwrap(), 3);

        let failed = rejected(&outcomes);
        assert_eq!(failed.len(), 1);
        assert_eq!(*failed[0].0, "failed");
        assert_eq!(failed[0].1.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_all_success() {
        let futures = vec![
            std::future::ready(Ok::<_, anyhow::Error>(1)),
            std::future::ready(Ok(2)),
        ];
        let values = all("Uploading failed: ", futures).await.unwrap();
        assert_eq!(values, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_all_empty_is_ok() {
        let futures: Vec<std::future::Ready<Result<i32>>> = vec![];
        assert!(all("x", futures).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_aggregates_every_rejection() {
        let futures: Vec<BoxedResult> = vec![
            Box::pin(async {
                Err(anyhow::Error::from(
                    ClientError::new("block 1 failed")
                        .with_status(503)
                        .with_code("ServerBusy"),
                ))
            }),
            Box::pin(async { Ok(2) }),
            Box::pin(async { Err(anyhow::anyhow!("block 3 failed")) }),
        ];

        let err = all("Uploading to blob storage failed: ", futures)
            .await
            .unwrap_err();

        let client_error = err.downcast_ref::<ClientError>().unwrap();
        assert_eq!(
            client_error.message,
            "Uploading to blob storage failed: block 1 failed; block 3 failed"
        );
        assert_eq!(client_error.status, Some(503));
        assert_eq!(client_error.string_code(), "ServerBusy");
    }
}
