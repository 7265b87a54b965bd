use super::*;
use crate::intercept;
use parking_lot::Mutex;
use serde_json::json;

fn real_time(_: &[Value]) -> Result<Value, MockError> {
    Ok(json!(1000))
}

mod billing {
    use super::*;

    pub fn now() -> Result<Value, MockError> {
        intercept!("time", [], real_time)
    }

    pub fn round(value: f64) -> Result<Value, MockError> {
        intercept!("round", [value], |args: &[Value]| {
            Ok(json!(args[0].as_f64().unwrap_or_default().round()))
        })
    }
}

mod billing_v2 {
    use super::*;

    pub fn now() -> Result<Value, MockError> {
        intercept!("time", [], real_time)
    }
}

mod reporting {
    use super::*;

    pub fn now() -> Result<Value, MockError> {
        intercept!("time", [], real_time)
    }
}

#[test]
fn test_without_mocker_real_function_runs() {
    assert_eq!(billing::now().unwrap(), json!(1000));
}

#[test]
fn test_in_scope_calls_are_mocked() {
    let mocker = ScopedFunctionMocker::new();
    mocker.add("time", 5);

    mocker.scope(None);
    assert_eq!(billing::now().unwrap(), json!(5));
    assert_eq!(reporting::now().unwrap(), json!(5));
    mocker.end_scope();
    assert_eq!(billing::now().unwrap(), json!(1000));

    assert_eq!(
        mocker.get_called_count("time"),
        CallCount {
            in_scope: 2,
            out_scope: 1
        }
    );
    assert_eq!(mocker.get_total_count("time"), 3);
    mocker.uninstall();
}

#[test]
fn test_module_hint_limits_scope() {
    let mocker = ScopedFunctionMocker::new();
    mocker.add("time", 5);
    let hint = format!("{}::billing", module_path!());

    let _guard = mocker.enter_scope(Some(&hint));
    assert_eq!(billing::now().unwrap(), json!(5));
    assert_eq!(reporting::now().unwrap(), json!(1000));
    assert_eq!(mocker.get_called_count_in_scope("time"), 1);
    assert_eq!(mocker.get_called_count_out_scope("time"), 1);
}

#[test]
fn test_unmocked_function_in_scope_runs_real() {
    let mocker = ScopedFunctionMocker::new();
    let value = mocker.run_scoped(None, || billing::round(2.6));
    assert_eq!(value.unwrap(), json!(3.0));
    assert_eq!(mocker.get_called_count_in_scope("round"), 1);
}

#[test]
fn test_guard_ends_scope() {
    let mocker = ScopedFunctionMocker::new();
    {
        let guard = mocker.enter_scope(None);
        assert!(guard.mocker().is_in_scope());
        assert!(mocker.is_installed());
    }
    assert!(!mocker.is_in_scope());
    assert!(mocker.is_installed());

    mocker.uninstall();
    assert!(!mocker.is_installed());
    billing::now().unwrap();
    assert_eq!(mocker.get_total_count("time"), 0);
}

#[test]
fn test_installation_is_per_thread() {
    let mocker = ScopedFunctionMocker::new();
    mocker.add("time", 5);
    mocker.scope(None);

    let other = std::thread::spawn(billing::now).join().unwrap();
    assert_eq!(other.unwrap(), json!(1000));
    assert_eq!(billing::now().unwrap(), json!(5));
    mocker.uninstall();
}

#[test]
fn test_once_function() {
    let mocker = ScopedFunctionMocker::new();
    mocker.once(|m| m.add("time", 1));

    mocker.run_scoped(None, || {
        assert_eq!(billing::now().unwrap(), json!(1));
        assert!(matches!(
            billing::now(),
            Err(MockError::OnceViolation { .. })
        ));
    });
    // Only the successful call counts.
    assert_eq!(mocker.get_called_count_in_scope("time"), 1);
}

#[test]
fn test_consecutive_and_restore() {
    let mocker = ScopedFunctionMocker::new();
    mocker.add_consecutive("time", [1, 2]);
    let _guard = mocker.enter_scope(None);

    assert_eq!(billing::now().unwrap(), json!(1));
    assert_eq!(billing::now().unwrap(), json!(2));
    assert!(mocker.restore_original_function("time"));
    assert!(!mocker.has("time"));
    assert_eq!(billing::now().unwrap(), json!(1000));
    assert!(!mocker.restore_original_function("time"));
}

#[test]
fn test_mock_can_delegate_to_real() {
    let mocker = ScopedFunctionMocker::new();
    mocker.real("time", real_time);
    let inner = mocker.clone();
    mocker.add(
        "time",
        Response::from_fn(move |call| {
            let real = inner.call_real("time", call.args)?;
            Ok(json!(real.as_i64().unwrap_or_default() + 1))
        }),
    );

    let value = mocker.run_scoped(None, billing::now).unwrap();
    assert_eq!(value, json!(1001));
    assert!(matches!(
        mocker.call_real("missing", &[]),
        Err(MockError::UndefinedMethod { .. })
    ));
    mocker.uninstall();
}

#[test]
fn test_monitoring_sees_unbound_calls() {
    let mocker = ScopedFunctionMocker::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    mocker.add("round", 9.0);
    mocker.monitoring("round", move |event| {
        sink.lock()
            .push((event.type_name.is_none(), event.args.to_vec()))
    });

    mocker.run_scoped(None, || billing::round(1.2)).unwrap();
    assert_eq!(*seen.lock(), vec![(true, vec![json!(1.2)])]);
}

#[test]
fn test_monitoring_sees_real_and_out_of_scope_calls() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("functions.log");
    let mocker = ScopedFunctionMocker::new();
    let timed = Arc::new(Mutex::new(Vec::new()));
    let every = Arc::new(Mutex::new(Vec::new()));
    let timed_sink = timed.clone();
    let every_sink = every.clone();
    mocker.monitoring("time", move |event| timed_sink.lock().push(event.result.clone()));
    mocker.monitoring_all(move |event| every_sink.lock().push(event.method.to_string()));
    mocker.log(&path);

    // `time` is not mocked, so both calls run the real function.
    mocker.scope(None);
    billing::now().unwrap();
    billing::round(1.4).unwrap();
    mocker.end_scope();
    billing::now().unwrap();

    assert_eq!(*timed.lock(), vec![json!(1000), json!(1000)]);
    assert_eq!(*every.lock(), vec!["time", "round", "time"]);
    assert_eq!(
        mocker.get_called_count("time"),
        CallCount {
            in_scope: 1,
            out_scope: 1
        }
    );

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("unbound::time args=[] returned=1000"));
    assert!(lines[1].ends_with("unbound::round args=[1.4] returned=1.0"));

    mocker.reset();
    billing::now().unwrap();
    assert_eq!(timed.lock().len(), 2);
    mocker.uninstall();
}

#[test]
fn test_module_hint_stops_at_path_boundary() {
    let mocker = ScopedFunctionMocker::new();
    mocker.add("time", 5);
    let hint = format!("{}::billing", module_path!());

    let _guard = mocker.enter_scope(Some(&hint));
    assert_eq!(billing::now().unwrap(), json!(5));
    assert_eq!(billing_v2::now().unwrap(), json!(1000));
    assert!(mocker.covers(&format!("{hint}::ledger")));
    assert!(!mocker.covers(&format!("{hint}_v2")));
    assert!(within("app::billing", "app::billing::"));
}

#[test]
fn test_log_writes_function_calls() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("functions.log");
    let mocker = ScopedFunctionMocker::new();
    mocker.log(&path);
    mocker.add("time", 3);

    mocker.run_scoped(None, billing::now).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.trim_end().ends_with("unbound::time args=[] returned=3"));
}

#[test]
fn test_environments() {
    let mocker = ScopedFunctionMocker::new();
    mocker.add_environment("epoch", |m| m.add("time", 0));
    mocker.add_environment("future", |m| m.add("time", 4_102_444_800_i64));

    let value = mocker
        .execute_in_environment("epoch", None, billing::now)
        .unwrap();
    assert_eq!(value.unwrap(), json!(0));
    assert!(!mocker.is_in_scope());

    let value = mocker
        .execute_in_environment("future", None, billing::now)
        .unwrap();
    assert_eq!(value.unwrap(), json!(4_102_444_800_i64));

    let err = mocker
        .execute_in_environment("missing", None, billing::now)
        .unwrap_err();
    assert!(matches!(err, MockError::UnknownEnvironment(_)));
    mocker.uninstall();
}

#[test]
fn test_reset() {
    let mocker = ScopedFunctionMocker::new();
    mocker.add("time", 5);
    mocker.run_scoped(None, billing::now).unwrap();

    mocker.reset_counts();
    assert_eq!(mocker.get_called_count("time"), CallCount::default());
    assert!(mocker.has("time"));

    mocker.reset();
    assert!(!mocker.has("time"));
    mocker.uninstall();
}
