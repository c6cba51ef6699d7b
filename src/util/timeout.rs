//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::MeshError;

/// Wrap a future with a timeout.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, MeshError>>,
) -> Result<T, MeshError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(MeshError::Timeout(duration.as_millis() as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn elapsed_future_becomes_timeout_error() {
        let err = with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, MeshError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, MeshError::Timeout(50)));
    }

    #[tokio::test]
    async fn completed_future_passes_through() {
        let value = with_timeout(Duration::from_secs(1), async { Ok::<_, MeshError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
