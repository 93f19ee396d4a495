//! Language behaviour tests run through the public `Engine` API.

use quill_engine::{Engine, EngineConfig, Error, Value};
use std::time::Duration;

fn engine() -> Engine {
    Engine::with_config(EngineConfig {
        console_echo: false,
        ..EngineConfig::default()
    })
}

/// Runs `source` and renders the result as a string.
fn eval(source: &str) -> String {
    engine().execute(source).unwrap().to_string()
}

#[test]
fn test_plus_concatenates_with_strings() {
    assert_eq!(eval("'1' + 2"), "12");
    assert_eq!(eval("1 + '2'"), "12");
    assert_eq!(eval("1 + 2"), "3");
    assert_eq!(eval("typeof (1.5 + '')"), "string");
    for (a, b) in [(0.0, 1.0), (-3.5, 7.0), (1e21, 2.0)] {
        let mut engine = engine();
        engine.define_global("a", Value::from(a));
        engine.define_global("b", Value::from(b));
        let joined = engine.execute("'' + a + b").unwrap().to_string();
        assert_eq!(joined, format!("{}{}", Value::from(a), Value::from(b)));
    }
}

#[test]
fn test_equality() {
    assert_eq!(eval("null == undefined"), "true");
    assert_eq!(eval("null === undefined"), "false");
    assert_eq!(eval("'2' == 2"), "true");
    assert_eq!(eval("'2' === 2"), "false");
    assert_eq!(eval("NaN == NaN"), "false");
    assert_eq!(eval("const o = {}; o == o && o !== {}"), "true");
}

#[test]
fn test_hoisting_and_block_scope() {
    assert_eq!(eval("{ const r = early(); function early() { return 'hoisted'; } r }"), "hoisted");
    assert_eq!(
        eval("{ let inner = 1; } typeof inner"),
        "undefined"
    );
    let err = engine().execute("{ let inner = 1; } inner").unwrap_err();
    assert!(err.message().contains("inner is not defined"));
}

#[test]
fn test_closures_share_captured_state() {
    let source = "
        function pair() {
            let n = 0;
            return { inc: () => ++n, get: () => n };
        }
        const p = pair();
        p.inc(); p.inc();
        p.get()
    ";
    assert_eq!(eval(source), "2");
}

#[test]
fn test_break_and_continue_target_innermost_loop() {
    let source = "
        let log = [];
        for (let i = 0; i < 3; i++) {
            for (let j = 0; j < 3; j++) {
                if (j == 1) continue;
                if (j == 2) break;
                log.push(i + ':' + j);
            }
        }
        log.join(' ')
    ";
    assert_eq!(eval(source), "0:0 1:0 2:0");
    assert_eq!(
        eval("let n = 0; outer: for (;;) { for (;;) { n++; break outer; } } n"),
        "1"
    );
}

#[test]
fn test_try_finally_runs_once() {
    let source = "
        let result, ran = 0;
        try { throw 'boom'; } catch (e) { result = e; } finally { ran++; }
        result + ':' + ran
    ";
    assert_eq!(eval(source), "boom:1");

    let source = "
        let ran = 0;
        function f() { try { return 'body'; } finally { ran++; } }
        f() + ':' + ran
    ";
    assert_eq!(eval(source), "body:1");

    let source = "
        let ran = 0;
        for (let i = 0; i < 3; i++) { try { continue; } finally { ran++; } }
        ran
    ";
    assert_eq!(eval(source), "3");
}

#[test]
fn test_scenarios() {
    assert_eq!(eval("var x = 0; function f(){ x++; return x; } f(); f();"), "2");
    assert_eq!(
        eval("let sum = 0; for (let i=0;i<3;i++){ if (i==1) continue; sum += i; } sum"),
        "2"
    );
    assert_eq!(eval("`hi ${1+2}!`"), "hi 3!");
}

#[test]
fn test_unbound_call_reports_one_error() {
    let mut engine = engine();
    let mut reports = Vec::new();
    if let Err(err) = engine.execute("let a = 1;\nmissingFunction();\na = 2;") {
        reports.push(err);
    }
    assert_eq!(reports.len(), 1);
    assert!(matches!(reports[0], Error::Runtime { .. }));
    assert_eq!(reports[0].line(), Some(2));
    assert_eq!(engine.get_global("a"), Value::from(1));
}

#[test]
fn test_uncaught_throw() {
    let err = engine().execute("throw new Error('bad input');").unwrap_err();
    assert!(matches!(err, Error::Thrown { .. }));
    assert_eq!(err.to_string(), "Uncaught Error: bad input (line 1)");
}

#[test]
fn test_runtime_errors_are_catchable() {
    assert_eq!(
        eval("try { null.x } catch (e) { e.name + ': ' + e.message }"),
        "TypeError: Cannot read properties of null (reading 'x')"
    );
}

#[test]
fn test_implicit_globals_can_be_disabled() {
    let mut engine = engine();
    engine.execute("function f() { leaked = 1; } f();").unwrap();
    assert_eq!(engine.get_global("leaked"), Value::from(1));

    let mut strict = Engine::with_config(EngineConfig {
        implicit_globals: false,
        console_echo: false,
        ..EngineConfig::default()
    });
    let err = strict.execute("function f() { leaked = 1; } f();").unwrap_err();
    assert!(err.message().contains("leaked is not defined"));
}

#[test]
fn test_step_budget_stops_runaway_loops() {
    let mut engine = Engine::with_config(EngineConfig {
        console_echo: false,
        ..EngineConfig::sandboxed(10_000, Duration::from_secs(5))
    });
    let err = engine.execute("while (true) {}").unwrap_err();
    assert!(matches!(err, Error::Interrupted { .. }));

    // The budget restarts for each entry into the engine.
    engine.execute("function work() { let n = 0; for (let i = 0; i < 100; i++) n += i; return n; }").unwrap();
    let work = engine.get_global("work");
    for _ in 0..5 {
        assert_eq!(engine.call(&work, Value::Undefined, &[]).unwrap(), Value::from(4950));
    }
}

#[test]
fn test_budget_is_not_catchable() {
    let mut engine = Engine::with_config(EngineConfig {
        console_echo: false,
        ..EngineConfig::sandboxed(1_000, Duration::from_secs(5))
    });
    let err = engine
        .execute("let caught = false; try { for (;;) {} } catch (e) { caught = true; }")
        .unwrap_err();
    assert!(matches!(err, Error::Interrupted { .. }));
    assert_eq!(engine.get_global("caught"), Value::from(false));
}

#[test]
fn test_call_depth_limit() {
    let mut engine = Engine::with_config(EngineConfig {
        max_call_depth: 64,
        console_echo: false,
        ..EngineConfig::default()
    });
    let err = engine.execute("function down(n) { return down(n + 1); } down(0)").unwrap_err();
    assert!(err.message().contains("Maximum call stack size exceeded"));
    assert_eq!(
        engine
            .execute("function down(n) { return n > 10 ? n : down(n + 1); } down(0)")
            .unwrap(),
        Value::from(11)
    );
}

#[test]
fn test_constructors_and_prototypes() {
    let source = "
        function Point(x, y) { this.x = x; this.y = y; }
        Point.prototype.norm1 = function () { return Math.abs(this.x) + Math.abs(this.y); };
        const p = new Point(3, -4);
        [p.norm1(), p instanceof Point, p instanceof Object].join()
    ";
    assert_eq!(eval(source), "7,true,true");
}

#[test]
fn test_runtime_library() {
    assert_eq!(eval("[3, 1, 10].sort().join()"), "1,3,10");
    assert_eq!(eval("[3, 1, 10].sort((a, b) => b - a).join()"), "10,3,1");
    assert_eq!(eval("JSON.stringify(JSON.parse('{\"a\":[1,2]}'))"), r#"{"a":[1,2]}"#);
    assert_eq!(eval("'a-b-c'.split('-').map(s => s.toUpperCase()).join('')"), "ABC");
    assert_eq!(eval("(255).toString(16)"), "ff");
    assert_eq!(eval("Object.entries({ a: 1, b: 2 }).map(e => e[0] + e[1]).join()"), "a1,b2");
}
