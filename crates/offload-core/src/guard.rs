//! # Panic guard
//!
//! Converts a panic raised while polling a task future into a [`PanicError`] instead of
//! tearing down the tokio task hosting it.
//!
//! ## Payload conversion
//! - `anyhow::Error` / `Box<dyn Error + Send + Sync>` (raised with `std::panic::panic_any`)
//!   → kept as the error source.
//! - `&'static str` / `String` (regular `panic!`) → message.
//! - anything else → `"unknown panic"`.
//!
//! **Warning**: `AssertUnwindSafe` is used, so state shared with the panicking task
//! (e.g. through `Arc<Mutex<T>>`) may be left inconsistent or poisoned.

use std::any::Any;
use std::error::Error as StdError;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::error::PanicError;

/// Polls `fut` to completion, returning `Err` if it panicked.
pub async fn catch<F>(fut: F) -> Result<F::Output, PanicError>
where
    F: Future,
{
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .map_err(from_payload)
}

/// Converts a raw panic payload into a [`PanicError`].
pub fn from_payload(payload: Box<dyn Any + Send + 'static>) -> PanicError {
    let payload = match payload.downcast::<anyhow::Error>() {
        Ok(err) => return PanicError::from_error((*err).into()),
        Err(other) => other,
    };
    let payload = match payload.downcast::<Box<dyn StdError + Send + Sync + 'static>>() {
        Ok(err) => return PanicError::from_error(*err),
        Err(other) => other,
    };

    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        PanicError::from_message(*msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        PanicError::from_message(msg.clone())
    } else {
        PanicError::from_message("unknown panic")
    }
}

#[cfg(test)]
mod tests {
    use std::panic::panic_any;

    use super::*;

    #[tokio::test]
    async fn passes_output_through() {
        let out = catch(async { 7 }).await.expect("no panic");
        assert_eq!(out, 7);
    }

    #[tokio::test]
    async fn str_payload_becomes_message() {
        let err = catch(async { panic!("aaaa") }).await.unwrap_err();
        assert_eq!(err.message(), "aaaa");
        assert!(!err.is_error_payload());
    }

    #[tokio::test]
    async fn formatted_payload_becomes_message() {
        let n = 3;
        let err = catch(async move { panic!("bad item {n}") }).await.unwrap_err();
        assert_eq!(err.message(), "bad item 3");
    }

    #[tokio::test]
    async fn error_payloads_are_kept_as_source() {
        let err = catch(async { panic_any(anyhow::anyhow!("typed failure")) })
            .await
            .unwrap_err();
        assert_eq!(err.message(), "typed failure");
        assert!(err.is_error_payload());

        let boxed: Box<dyn StdError + Send + Sync> = Box::new(std::io::Error::other("io down"));
        let err = catch(async move { panic_any(boxed) }).await.unwrap_err();
        assert_eq!(err.message(), "io down");
        assert!(err.is_error_payload());
    }

    #[tokio::test]
    async fn unknown_payload() {
        let err = catch(async { panic_any(42_u8) }).await.unwrap_err();
        assert_eq!(err.message(), "unknown panic");
    }
}
