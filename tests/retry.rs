#[cfg(test)]
mod tests {

    use std::io;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Instant;

    use file_share::storage::retry::{with_retry, with_retry_if, RetryConfig};
    use file_share::{CatalogError, StorageError};
    use tokio::sync::Mutex;
    use tokio::time::Duration;

    struct MockOperation {
        attempts: Arc<Mutex<u32>>,
        success_after: u32,
        error_message: String,
    }

    impl MockOperation {
        fn new(success_after: u32, error_message: &str) -> Self {
            Self {
                attempts: Arc::new(Mutex::new(0)),
                success_after,
                error_message: error_message.to_string(),
            }
        }

        async fn execute<T: ToString>(&self, success_value: T) -> Result<String, CatalogError> {
            let mut attempts = self.attempts.lock().await;
            *attempts += 1;

            if *attempts > self.success_after {
                Ok(success_value.to_string())
            } else {
                Err(CatalogError::remote(
                    "upload",
                    format!("{} (Attempt {})", self.error_message, *attempts),
                ))
            }
        }

        async fn get_attempts(&self) -> u32 {
            *self.attempts.lock().await
        }
    }

    #[tokio::test]
    async fn test_immediate_success() {
        let config = RetryConfig::default();
        let operation = MockOperation::new(0, "Should not see this error");

        let result = with_retry(&config, || {
            let op = &operation;
            async move { op.execute("Success!").await }
        })
        .await;

        assert_eq!(result.unwrap(), "Success!");
        assert_eq!(operation.get_attempts().await, 1);
    }

    #[tokio::test]
    async fn test_success_after_retries() {
        let config = RetryConfig::new(3, Duration::from_millis(10));
        let operation = MockOperation::new(2, "Temporary error");

        let result = with_retry(&config, || {
            let op = &operation;
            async move { op.execute("Success after retry!").await }
        })
        .await;

        assert_eq!(result.unwrap(), "Success after retry!");
        assert_eq!(operation.get_attempts().await, 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_returns_last_error() {
        let config = RetryConfig::new(2, Duration::from_millis(10));
        let operation = MockOperation::new(u32::MAX, "Permanent failure");

        let result = with_retry(&config, || {
            let op = &operation;
            async move { op.execute("Should not succeed").await }
        })
        .await;

        let error = result.unwrap_err();
        assert!(error.to_string().contains("Permanent failure (Attempt 2)"));
        assert_eq!(operation.get_attempts().await, 2);
    }

    #[tokio::test]
    async fn test_exponential_backoff_timing() {
        let config = RetryConfig::new(3, Duration::from_millis(20));
        let operation = MockOperation::new(3, "Testing backoff");

        let start_time = Instant::now();
        let result = with_retry(&config, || {
            let op = &operation;
            async move { op.execute("Should not succeed").await }
        })
        .await;

        let elapsed = start_time.elapsed();
        assert!(result.is_err());
        assert_eq!(operation.get_attempts().await, 3);

        // 20ms after the first failure, 40ms after the second
        assert!(
            elapsed.as_millis() >= 60,
            "Expected at least 60ms delay, got {}ms",
            elapsed.as_millis()
        );
    }

    #[tokio::test]
    async fn test_single_attempt_config() {
        let config = RetryConfig::none();
        assert_eq!(config.max_attempts(), 1);
        assert_eq!(RetryConfig::new(0, Duration::ZERO).max_attempts(), 1);

        let operation = MockOperation::new(1, "Only once");
        let result = with_retry(&config, || {
            let op = &operation;
            async move { op.execute("unused").await }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(operation.get_attempts().await, 1);
    }

    #[tokio::test]
    async fn test_retry_with_different_error_types() {
        let config = RetryConfig::new(3, Duration::from_millis(5));
        let attempt_counter = Arc::new(Mutex::new(0));

        let result = with_retry(&config, || {
            let counter = Arc::clone(&attempt_counter);
            async move {
                let mut attempts = counter.lock().await;
                *attempts += 1;
                match *attempts {
                    1 => Err(CatalogError::Io(io::Error::new(io::ErrorKind::TimedOut, "Timeout error"))),
                    2 => Err(CatalogError::remote("list files", "Connection reset")),
                    _ => Ok("Success after different errors"),
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "Success after different errors");
        assert_eq!(*attempt_counter.lock().await, 3);
    }

    #[tokio::test]
    async fn test_refusals_stop_retrying() {
        let config = RetryConfig::new(3, Duration::from_millis(5));
        let attempt_counter = Arc::new(Mutex::new(0));

        let result: Result<(), CatalogError> = with_retry_if(&config, CatalogError::is_retryable, || {
            let counter = Arc::clone(&attempt_counter);
            async move {
                *counter.lock().await += 1;
                Err(CatalogError::Refused {
                    operation: "upload tool.exe".to_string(),
                    status: 400,
                })
            }
        })
        .await;

        assert!(matches!(result, Err(CatalogError::Refused { status: 400, .. })));
        assert_eq!(*attempt_counter.lock().await, 1);
    }

    #[tokio::test]
    async fn test_storage_errors_keep_their_message() {
        let config = RetryConfig::none();
        let result: Result<(), StorageError> = with_retry(&config, || async {
            Err(StorageError::Read {
                path: PathBuf::from("shared-files.json"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            })
        })
        .await;

        assert!(result.unwrap_err().to_string().contains("shared-files.json"));
    }
}
