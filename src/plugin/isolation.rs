//! Panic isolation for provider factories and plugin calls
//!
//! Constructors and message plugins are third-party code from the runtime's
//! point of view. A panic inside one must surface as an error on that call,
//! never unwind through the session task.
//!
//! - `catch_unwind` only catches unwinding panics, not aborts
//! - Panics in tasks spawned by the callee are not caught

use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, UnwindSafe, catch_unwind};

use futures::FutureExt;

/// Call a synchronous function, converting a panic into the caller's error type
///
/// The original error type is preserved on normal failure.
///
/// # Example
///
/// ```ignore
/// let provider = call_isolated(
///     AssertUnwindSafe(|| factory(config)),
///     ProviderError::Panicked,
/// )?;
/// ```
pub fn call_isolated<F, T, E, PC>(f: F, panic_to_error: PC) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E> + UnwindSafe,
    PC: FnOnce(String) -> E,
{
    match catch_unwind(f) {
        Ok(result) => result,
        Err(panic_info) => {
            let msg = extract_panic_message(&panic_info);
            tracing::error!(message = %msg, "Isolated call panicked");
            Err(panic_to_error(msg))
        }
    }
}

/// Await a future, converting a panic during polling into the caller's error type
pub async fn call_isolated_async<Fut, T, E, PC>(fut: Fut, panic_to_error: PC) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    PC: FnOnce(String) -> E,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(panic_info) => {
            let msg = extract_panic_message(&panic_info);
            tracing::error!(message = %msg, "Isolated async call panicked");
            Err(panic_to_error(msg))
        }
    }
}

/// Extract a human-readable message from a panic payload
fn extract_panic_message(panic_info: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic (non-string payload)".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Failed(&'static str),
        Panicked(String),
    }

    #[test]
    fn test_call_isolated_success() {
        let result = call_isolated(|| Ok::<_, TestError>(42), TestError::Panicked);
        assert_eq!(result, Ok(42));
    }

    #[test]
    fn test_call_isolated_preserves_error() {
        let result: Result<i32, _> =
            call_isolated(|| Err(TestError::Failed("nope")), TestError::Panicked);
        assert_eq!(result, Err(TestError::Failed("nope")));
    }

    #[test]
    fn test_call_isolated_panic_str() {
        let result: Result<i32, TestError> = call_isolated(
            || {
                panic!("factory exploded");
                #[allow(unreachable_code)]
                Ok(1)
            },
            TestError::Panicked,
        );
        match result {
            Err(TestError::Panicked(msg)) => assert!(msg.contains("factory exploded")),
            other => panic!("Expected panic error, got {other:?}"),
        }
    }

    #[test]
    fn test_call_isolated_panic_string() {
        let result: Result<i32, TestError> = call_isolated(
            || {
                panic!("{}", "dynamic panic message".to_string());
                #[allow(unreachable_code)]
                Ok(1)
            },
            TestError::Panicked,
        );
        assert!(matches!(result, Err(TestError::Panicked(msg)) if msg.contains("dynamic")));
    }

    #[tokio::test]
    async fn test_call_isolated_async_success() {
        let result = call_isolated_async(async { Ok::<_, TestError>("done") }, TestError::Panicked)
            .await;
        assert_eq!(result, Ok("done"));
    }

    #[tokio::test]
    async fn test_call_isolated_async_panic() {
        let result: Result<(), TestError> = call_isolated_async(
            async {
                tokio::task::yield_now().await;
                panic!("async plugin panic");
            },
            TestError::Panicked,
        )
        .await;
        assert!(matches!(result, Err(TestError::Panicked(msg)) if msg.contains("async plugin")));
    }
}
