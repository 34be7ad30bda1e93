//! Guarded invocation of plugin hooks
//!
//! A hook may fail, panic or never return. None of that may escape into the host:
//! panics are caught, an optional timeout bounds the call, and every outcome is
//! reduced to `Ok(())` or a cause string.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use hotswap_plugin_api::PluginError;

use crate::error::Hook;

/// Run a hook future with panic isolation and an optional timeout.
pub(crate) async fn invoke<F>(
    id: &str,
    hook: Hook,
    timeout: Option<Duration>,
    call: F,
) -> Result<(), String>
where
    F: Future<Output = Result<(), PluginError>>,
{
    let guarded = AssertUnwindSafe(call).catch_unwind();

    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!(plugin = %id, %hook, timeout = ?limit, "Plugin hook timed out");
                return Err(format!("timed out after {:?}", limit));
            }
        },
        None => guarded.await,
    };

    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            tracing::error!(plugin = %id, %hook, error = %e, "Plugin hook returned error");
            Err(e.to_string())
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(plugin = %id, %hook, panic = %message, "Plugin hook panicked");
            Err(format!("panicked: {}", message))
        }
    }
}

/// Run a synchronous plugin call (constructor, `identity`, `mountable`) with
/// panic isolation.
pub(crate) fn call<T>(id: &str, what: &str, f: impl FnOnce() -> T) -> Result<T, String> {
    std::panic::catch_unwind(AssertUnwindSafe(f)).map_err(|panic| {
        let message = panic_message(panic.as_ref());
        tracing::error!(plugin = %id, call = what, panic = %message, "Plugin call panicked");
        format!("panicked: {}", message)
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
