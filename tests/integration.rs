//! Integration tests for perchjs.

use perchjs::{Context, Error, Isolate, Primitive};

#[test]
fn test_run_script_and_call() {
    let ctx = Context::new(None).unwrap();
    ctx.run_script("const add = (a, b) => a + b", "math.js")
        .unwrap();
    let result = ctx.run_script("add(3, 4)", "math.js").unwrap();
    assert_eq!(result.as_string(), "7");
    assert_eq!(result.as_int64(), 7);
}

#[test]
fn test_contexts_are_isolated() {
    let iso = Isolate::new().unwrap();
    let ctx1 = Context::new(Some(&iso)).unwrap();
    let ctx2 = Context::new(Some(&iso)).unwrap();

    ctx1.run_script("const shared = 'only here'", "iso.js").unwrap();
    assert_eq!(
        ctx1.run_script("shared", "iso.js").unwrap().as_string(),
        "only here"
    );

    let err = ctx2.run_script("shared", "iso.js").unwrap_err();
    match err {
        Error::Script(js) => {
            assert_eq!(js.message, "ReferenceError: shared is not defined");
        }
        other => panic!("expected script error, got {other:?}"),
    }
}

#[test]
fn test_globals_persist_across_runs() {
    let ctx = Context::new(None).unwrap();
    ctx.run_script("var counter = 0", "state.js").unwrap();
    ctx.run_script("counter = counter + 1", "state.js").unwrap();
    let value = ctx.run_script("counter", "state.js").unwrap();
    assert_eq!(value.as_int64(), 1);
}

#[test]
fn test_syntax_error_fields() {
    let ctx = Context::new(None).unwrap();
    let err = ctx.run_script("bad js syntax", "bad.js").unwrap_err();
    match err {
        Error::Script(js) => {
            assert_eq!(js.message, "SyntaxError: Unexpected identifier");
            assert_eq!(js.location.as_deref(), Some("bad.js:1:5"));
            assert!(js.stack.is_none());
        }
        other => panic!("expected script error, got {other:?}"),
    }
}

#[test]
fn test_thrown_error_has_location_and_stack() {
    let ctx = Context::new(None).unwrap();
    let err = ctx.run_script("missing()", "oops.js").unwrap_err();
    match err {
        Error::Script(js) => {
            assert_eq!(js.message, "ReferenceError: missing is not defined");
            assert_eq!(js.location.as_deref(), Some("oops.js:1:1"));
            assert_eq!(
                js.stack.as_deref(),
                Some("ReferenceError: missing is not defined\n    at oops.js:1:1")
            );
        }
        other => panic!("expected script error, got {other:?}"),
    }
}

#[test]
fn test_create_primitives() {
    let ctx = Context::new(None).unwrap();

    let v = ctx.create(()).unwrap();
    assert_eq!(v.as_string(), "undefined");

    let v = ctx.create(true).unwrap();
    assert!(v.as_bool());
    assert_eq!(v.as_string(), "true");

    let v = ctx.create(10).unwrap();
    assert_eq!(v.as_int64(), 10);
    assert_eq!(v.as_string(), "10");

    let v = ctx.create(10.1).unwrap();
    assert_eq!(v.as_float64(), 10.1);
    assert_eq!(v.as_string(), "10.1");

    let v = ctx.create("test-string").unwrap();
    assert_eq!(v.as_string(), "test-string");
}

#[test]
fn test_create_optional() {
    let ctx = Context::new(None).unwrap();
    let v = ctx.create(None::<&str>).unwrap();
    assert_eq!(v.as_string(), "undefined");
    let v = ctx.create(Some(5)).unwrap();
    assert_eq!(v.as_int64(), 5);
}

#[cfg(feature = "serde-support")]
#[test]
fn test_create_json_rejects_composites() {
    let ctx = Context::new(None).unwrap();

    let scalar = serde_json::json!(26);
    assert_eq!(ctx.create_json(&scalar).unwrap().as_int64(), 26);

    let arr = serde_json::json!([1, 2, 3]);
    assert!(matches!(
        ctx.create_json(&arr),
        Err(Error::UnsupportedValue(_))
    ));

    let obj = serde_json::json!({"a": 1});
    assert!(matches!(
        ctx.create_json(&obj),
        Err(Error::UnsupportedValue(_))
    ));
}

#[test]
fn test_value_string_forms() {
    let ctx = Context::new(None).unwrap();
    let cases = [
        ("26", "26"),
        ("'a string'", "a string"),
        ("({})", "[object Object]"),
        ("function(){}", "function(){}"),
    ];
    for (source, want) in cases {
        let value = ctx.run_script(source, "strings.js").unwrap();
        assert_eq!(value.as_string(), want, "source: {source}");
        assert_eq!(value.to_string(), want, "source: {source}");
    }
}

#[test]
fn test_global_get_set() {
    let ctx = Context::new(None).unwrap();
    let global = ctx.global().unwrap();

    let answer = ctx.create(42).unwrap();
    global.set("answer", &answer).unwrap();
    let read = ctx.run_script("answer", "globals.js").unwrap();
    assert_eq!(read.as_int64(), 42);

    ctx.run_script("var fromScript = 'hello'", "globals.js").unwrap();
    let value = global.get("fromScript").unwrap();
    assert_eq!(value.as_string(), "hello");
}

#[test]
fn test_get_on_non_object_fails() {
    let ctx = Context::new(None).unwrap();
    let num = ctx.create(7).unwrap();
    let err = num.get("x").unwrap_err();
    match err {
        Error::Script(js) => assert_eq!(js.message, "Not an object"),
        other => panic!("expected script error, got {other:?}"),
    }
}

#[test]
fn test_call_with_receiver() {
    let ctx = Context::new(None).unwrap();
    ctx.run_script(
        "const obj = { z: 3, sum: function(a, b) { return a + b + this.z } }",
        "recv.js",
    )
    .unwrap();
    let obj = ctx.global().unwrap().get("obj").unwrap();
    let func = obj.get("sum").unwrap();

    let one = ctx.create(1).unwrap();
    let two = ctx.create(2).unwrap();
    let result = func.call(&ctx, Some(&obj), &[&one, &two]).unwrap();
    assert_eq!(result.as_int64(), 6);
}

#[test]
fn test_call_with_no_arguments() {
    let ctx = Context::new(None).unwrap();
    let func = ctx
        .run_script("function ping() { return 'pong' }; ping", "call.js")
        .unwrap();
    let result = func.call(&ctx, None, &[]).unwrap();
    assert_eq!(result.as_string(), "pong");
}

#[test]
fn test_call_non_function_fails() {
    let ctx = Context::new(None).unwrap();
    let num = ctx.create(9).unwrap();
    let err = num.call(&ctx, None, &[]).unwrap_err();
    match err {
        Error::Script(js) => assert_eq!(js.message, "Not a function"),
        other => panic!("expected script error, got {other:?}"),
    }
}

#[test]
fn test_stack_overflow_is_reported() {
    let ctx = Context::new(None).unwrap();
    let err = ctx
        .run_script("function loop() { return loop() }; loop()", "deep.js")
        .unwrap_err();
    match err {
        Error::Script(js) => {
            assert_eq!(js.message, "RangeError: Maximum call stack size exceeded");
        }
        other => panic!("expected script error, got {other:?}"),
    }
}

#[test]
fn test_isolate_dispose_revokes_contexts() {
    let iso = Isolate::new().unwrap();
    let ctx = Context::new(Some(&iso)).unwrap();
    let obj = ctx.run_script("({ a: 1 })", "dead.js").unwrap();
    iso.dispose();
    iso.dispose();
    assert!(iso.is_disposed());
    assert!(matches!(
        ctx.run_script("1", "dead.js"),
        Err(Error::IsolateDisposed)
    ));
    assert!(matches!(ctx.global(), Err(Error::IsolateDisposed)));
    assert!(matches!(ctx.isolate(), Err(Error::IsolateDisposed)));
    assert!(matches!(obj.get("a"), Err(Error::IsolateDisposed)));
    assert_eq!(obj.as_string(), "undefined");
}

#[test]
fn test_disposed_value_is_inert() {
    let ctx = Context::new(None).unwrap();
    let value = ctx.run_script("'gone'", "drop.js").unwrap();
    value.dispose();
    value.dispose();
    assert_eq!(value.as_string(), "undefined");
    assert!(matches!(value.get("x"), Err(Error::ValueDisposed)));
}

#[test]
fn test_create_primitive_directly() {
    let ctx = Context::new(None).unwrap();
    let v = ctx.create_primitive(Primitive::Number(1.5)).unwrap();
    assert_eq!(v.as_float64(), 1.5);
    let v = ctx
        .create_primitive(Primitive::String("direct".into()))
        .unwrap();
    assert_eq!(v.as_string(), "direct");
}
