//! Isolated script execution with a wall-clock budget.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use boa_engine::context::ContextBuilder;
use boa_engine::{Context, JsString, JsValue, Source};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::script::{EntryPoint, ScriptHandle};

/// Configuration for the script host.
#[derive(Debug, Clone)]
pub struct ScriptHostConfig {
    /// Wall-clock budget per load or invocation.
    pub timeout: Duration,

    /// Interpreter loop-iteration limit. Bounds an abandoned runaway
    /// context so it terminates instead of pinning a core forever.
    pub loop_iteration_limit: u64,

    /// Interpreter recursion limit.
    pub recursion_limit: usize,
}

impl Default for ScriptHostConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            loop_iteration_limit: 50_000_000,
            recursion_limit: 512,
        }
    }
}

/// Executes untrusted mapping scripts in an isolated JavaScript
/// interpreter.
///
/// Every load and invocation runs on its own worker thread with a fresh
/// interpreter context, so no state carries over between invocations and a
/// hanging script cannot block the harness: when the budget expires the
/// worker is abandoned rather than waited on, since untrusted code cannot
/// be trusted to yield.
///
/// The interpreter exposes no filesystem, network, or host bindings; the
/// only values reachable from script code are the entry-point arguments.
#[derive(Debug, Clone, Default)]
pub struct ScriptHost {
    config: ScriptHostConfig,
}

impl ScriptHost {
    /// Create a host with the given configuration.
    pub fn new(config: ScriptHostConfig) -> Self {
        Self { config }
    }

    /// Create a host with a custom execution budget.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(ScriptHostConfig {
            timeout,
            ..ScriptHostConfig::default()
        })
    }

    pub fn config(&self) -> &ScriptHostConfig {
        &self.config
    }

    /// Validate and load a script.
    ///
    /// Fails with [`Error::Load`] when the source does not parse or
    /// evaluate, or when neither entry point is defined as a function.
    /// Top-level code is untrusted too, so validation runs under the same
    /// wall-clock budget as invocations.
    pub fn load(&self, source: &str) -> Result<ScriptHandle> {
        let source: Arc<str> = Arc::from(source);
        let probe = Arc::clone(&source);
        let config = self.config.clone();

        debug!(bytes = source.len(), "loading mapping script");
        let (has_from_external, has_to_external) =
            self.run_bounded(move || validate(&probe, &config))?;

        if !has_from_external && !has_to_external {
            return Err(Error::Load(format!(
                "script defines neither `{}` nor `{}`",
                EntryPoint::FromExternal.function_name(),
                EntryPoint::ToExternal.function_name(),
            )));
        }

        Ok(ScriptHandle::new(source, has_from_external, has_to_external))
    }

    /// Invoke an entry point with JSON-tree arguments, producing a JSON
    /// tree result.
    ///
    /// A fresh interpreter context is built per invocation, so given the
    /// same script and arguments the result is repeatable. Fails with
    /// [`Error::Runtime`] when the script raises, [`Error::Timeout`] when
    /// the budget expires, and [`Error::InvalidResult`] when the script
    /// returns nothing usable.
    pub fn invoke(
        &self,
        handle: &ScriptHandle,
        entry: EntryPoint,
        args: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let source = handle.source_arc();
        let config = self.config.clone();

        debug!(entry = entry.function_name(), "invoking mapping script");
        self.run_bounded(move || execute(&source, entry, args, &config))
    }

    /// Run a job on a worker thread, abandoning it when the budget
    /// expires. The interpreter is not `Send`, so each job builds its own
    /// context inside the worker.
    fn run_bounded<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let budget = self.config.timeout;

        thread::Builder::new()
            .name("mapcheck-script".to_string())
            .spawn(move || {
                let _ = tx.send(job());
            })
            .map_err(|e| Error::Runtime {
                message: format!("failed to spawn script worker: {e}"),
            })?;

        match rx.recv_timeout(budget) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                let budget_ms = budget.as_millis() as u64;
                warn!(budget_ms, "script execution exceeded its budget, abandoning worker");
                Err(Error::Timeout { budget_ms })
            }
            Err(RecvTimeoutError::Disconnected) => Err(Error::Runtime {
                message: "script worker terminated without a result".to_string(),
            }),
        }
    }
}

/// Apply the interpreter resource limits to a fresh context.
fn apply_limits(context: &mut Context<'_>, config: &ScriptHostConfig) {
    let mut limits = context.runtime_limits();
    limits.set_loop_iteration_limit(config.loop_iteration_limit);
    limits.set_recursion_limit(config.recursion_limit);
    context.set_runtime_limits(limits);
}

fn build_failed(e: impl std::fmt::Display) -> Error {
    Error::Runtime {
        message: format!("failed to build interpreter context: {e}"),
    }
}

fn validate(source: &str, config: &ScriptHostConfig) -> Result<(bool, bool)> {
    let mut context = ContextBuilder::default().build().map_err(build_failed)?;
    apply_limits(&mut context, config);
    context
        .eval(Source::from_bytes(source.as_bytes()))
        .map_err(|e| Error::Load(e.to_string()))?;

    let has_from_external = defines_function(&mut context, EntryPoint::FromExternal);
    let has_to_external = defines_function(&mut context, EntryPoint::ToExternal);
    Ok((has_from_external, has_to_external))
}

fn defines_function(context: &mut Context<'_>, entry: EntryPoint) -> bool {
    let global = context.global_object().clone();
    global
        .get(JsString::from(entry.function_name()), context)
        .map(|value| value.is_callable())
        .unwrap_or(false)
}

fn execute(
    source: &str,
    entry: EntryPoint,
    args: Vec<serde_json::Value>,
    config: &ScriptHostConfig,
) -> Result<serde_json::Value> {
    let mut context = ContextBuilder::default().build().map_err(build_failed)?;
    apply_limits(&mut context, config);
    context
        .eval(Source::from_bytes(source.as_bytes()))
        .map_err(|e| Error::Runtime {
            message: e.to_string(),
        })?;

    let global = context.global_object().clone();
    let function = global
        .get(JsString::from(entry.function_name()), &mut context)
        .map_err(|e| Error::Runtime {
            message: e.to_string(),
        })?;
    let function = function.as_callable().ok_or_else(|| Error::Runtime {
        message: format!(
            "entry point `{}` is not defined as a function",
            entry.function_name()
        ),
    })?;

    let mut js_args = Vec::with_capacity(args.len());
    for arg in &args {
        let value = JsValue::from_json(arg, &mut context).map_err(|e| Error::Runtime {
            message: format!("failed to marshal argument: {e}"),
        })?;
        js_args.push(value);
    }

    let result = function
        .call(&JsValue::undefined(), &js_args, &mut context)
        .map_err(|e| Error::Runtime {
            message: e.to_string(),
        })?;

    if result.is_undefined() || result.is_null() {
        return Err(Error::InvalidResult(
            "script returned no message".to_string(),
        ));
    }

    result.to_json(&mut context).map_err(|e| {
        Error::InvalidResult(format!("mapping result is not JSON-representable: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_rejects_syntax_error() {
        let host = ScriptHost::default();
        let result = host.load("function mapFromExternal( {");
        assert!(matches!(result, Err(Error::Load(_))));
    }

    #[test]
    fn test_load_rejects_missing_entry_points() {
        let host = ScriptHost::default();
        let result = host.load("function unrelated() { return 1; }");
        assert!(matches!(result, Err(Error::Load(_))));
    }

    #[test]
    fn test_load_records_entry_points() {
        let host = ScriptHost::default();
        let handle = host
            .load("function mapFromExternal(headers) { return { topic: 't', path: '/' }; }")
            .unwrap();

        assert!(handle.defines(EntryPoint::FromExternal));
        assert!(!handle.defines(EntryPoint::ToExternal));
    }

    #[test]
    fn test_invoke_passes_arguments() {
        let host = ScriptHost::default();
        let handle = host
            .load(
                "function mapFromExternal(headers, textPayload) {\
                   return { topic: headers['device_id'], path: textPayload };\
                 }",
            )
            .unwrap();

        let result = host
            .invoke(
                &handle,
                EntryPoint::FromExternal,
                vec![json!({"device_id": "d1"}), json!("/features")],
            )
            .unwrap();

        assert_eq!(result, json!({"topic": "d1", "path": "/features"}));
    }

    #[test]
    fn test_invoke_missing_entry_point_is_runtime_error() {
        let host = ScriptHost::default();
        let handle = host
            .load("function mapFromExternal() { return {}; }")
            .unwrap();

        let result = host.invoke(&handle, EntryPoint::ToExternal, vec![]);
        assert!(matches!(result, Err(Error::Runtime { .. })));
    }

    #[test]
    fn test_null_result_is_invalid() {
        let host = ScriptHost::default();
        let handle = host
            .load("function mapFromExternal() { return null; }")
            .unwrap();

        let result = host.invoke(&handle, EntryPoint::FromExternal, vec![]);
        assert!(matches!(result, Err(Error::InvalidResult(_))));
    }
}
