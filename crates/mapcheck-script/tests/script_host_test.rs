//! Isolation, determinism, and timeout tests for the script host.

use std::time::{Duration, Instant};

use mapcheck_script::{EntryPoint, Error, ScriptHost};
use serde_json::json;

#[test]
fn test_determinism_across_invocations() {
    let host = ScriptHost::default();
    let handle = host
        .load(
            "function mapFromExternal(headers, textPayload) {\
               var parsed = JSON.parse(textPayload);\
               parsed.doubled = parsed.temperature * 2;\
               return { topic: 't', path: '/', value: parsed };\
             }",
        )
        .unwrap();

    let args = || vec![json!({}), json!("{\"temperature\":21.5}"), json!(null), json!(null)];

    let first = host.invoke(&handle, EntryPoint::FromExternal, args()).unwrap();
    let second = host.invoke(&handle, EntryPoint::FromExternal, args()).unwrap();

    assert_eq!(first, second);
    assert_eq!(first["value"]["doubled"].as_f64(), Some(43.0));
}

#[test]
fn test_no_state_leaks_between_invocations() {
    // The script counts invocations in a global; a fresh context per
    // invocation must always observe the initial value.
    let host = ScriptHost::default();
    let handle = host
        .load(
            "var counter = 0;\
             function mapFromExternal() {\
               counter = counter + 1;\
               return { topic: 't', path: '/', value: counter };\
             }",
        )
        .unwrap();

    for _ in 0..3 {
        let result = host.invoke(&handle, EntryPoint::FromExternal, vec![]).unwrap();
        assert_eq!(result["value"].as_f64(), Some(1.0));
    }
}

#[test]
fn test_runaway_script_times_out() {
    let host = ScriptHost::with_timeout(Duration::from_millis(250));
    let handle = host
        .load("function mapFromExternal() { while (true) {} }")
        .unwrap();

    let started = Instant::now();
    let result = host.invoke(&handle, EntryPoint::FromExternal, vec![]);

    match result {
        Err(Error::Timeout { budget_ms }) => assert_eq!(budget_ms, 250),
        other => panic!("expected timeout, got {other:?}"),
    }
    // Abandonment, not cooperative completion: the caller returns promptly.
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[test]
fn test_timeout_and_runtime_errors_render_differently() {
    let host = ScriptHost::with_timeout(Duration::from_millis(250));
    let handle = host
        .load(
            "function mapFromExternal(headers) {\
               if (headers['mode'] === 'hang') { while (true) {} }\
               throw new Error('bad payload');\
             }",
        )
        .unwrap();

    let timeout = host
        .invoke(&handle, EntryPoint::FromExternal, vec![json!({"mode": "hang"})])
        .unwrap_err();
    let runtime = host
        .invoke(&handle, EntryPoint::FromExternal, vec![json!({})])
        .unwrap_err();

    assert!(timeout.to_string().contains("budget"));
    assert!(runtime.to_string().contains("bad payload"));
    assert_ne!(timeout.to_string(), runtime.to_string());
}

#[test]
fn test_script_exception_carries_message() {
    let host = ScriptHost::default();
    let handle = host
        .load("function mapFromExternal() { throw new Error('boom'); }")
        .unwrap();

    let result = host.invoke(&handle, EntryPoint::FromExternal, vec![]);
    match result {
        Err(Error::Runtime { message }) => assert!(message.contains("boom")),
        other => panic!("expected runtime error, got {other:?}"),
    }
}

#[test]
fn test_no_ambient_authority_in_sandbox() {
    // Filesystem/process facilities are simply not bound; touching them is
    // a runtime error, never a silent no-op success.
    let host = ScriptHost::default();
    let handle = host
        .load("function mapFromExternal() { return require('fs').readFileSync('/etc/passwd'); }")
        .unwrap();

    let result = host.invoke(&handle, EntryPoint::FromExternal, vec![]);
    assert!(matches!(result, Err(Error::Runtime { .. })));
}

#[test]
fn test_handle_shared_across_hosts() {
    let host_a = ScriptHost::default();
    let host_b = ScriptHost::default();
    let handle = host_a
        .load("function mapFromExternal() { return { topic: 't', path: '/' }; }")
        .unwrap();

    let from_a = host_a.invoke(&handle, EntryPoint::FromExternal, vec![]).unwrap();
    let from_b = host_b.invoke(&handle.clone(), EntryPoint::FromExternal, vec![]).unwrap();
    assert_eq!(from_a, from_b);
}

#[test]
fn test_load_bounds_top_level_code() {
    let host = ScriptHost::with_timeout(Duration::from_millis(250));
    let result = host.load("while (true) {} function mapFromExternal() {}");

    assert!(matches!(result, Err(Error::Timeout { .. })));
}
