//! Tree-walking evaluator.
//!
//! Top-level bindings live on the context's global object, so they persist
//! across scripts run against the same context and are visible to the
//! boundary's get/set calls. Function calls get a fresh local scope whose
//! lookups fall back to the global object.

use std::collections::HashMap;
use std::rc::Rc;

use super::lexer::SyntaxError;
use super::parser::{parse, BinOp, Expr, ExprKind, Stmt, UnOp};
use super::value::{FuncBody, JsFunction, JsObject, JsValue};

const MAX_CALL_DEPTH: u32 = 256;

/// A runtime throw, positioned in the script that raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Throw {
    pub message: String,
    pub origin: String,
    pub line: u32,
    pub col: u32,
}

impl Throw {
    fn new(message: impl Into<String>, origin: &str, line: u32, col: u32) -> Self {
        Self {
            message: message.into(),
            origin: origin.to_string(),
            line,
            col,
        }
    }

    pub fn location(&self) -> String {
        format!("{}:{}:{}", self.origin, self.line, self.col)
    }

    pub fn stack(&self) -> String {
        format!("{}\n    at {}", self.message, self.location())
    }
}

/// A script failure: either the source never compiled, or evaluation threw.
#[derive(Debug)]
pub(crate) enum ExecError {
    Syntax(SyntaxError),
    Throw(Throw),
}

/// Compile and run a script against a global object. The result is the value
/// of the last expression statement.
pub(crate) fn run_script(
    global: &Rc<JsObject>,
    source: &str,
    origin: &str,
) -> Result<JsValue, ExecError> {
    let program = parse(source, origin).map_err(ExecError::Syntax)?;
    let mut interp = Interp {
        global: Rc::clone(global),
        depth: 0,
    };
    let mut frame = Frame {
        locals: None,
        this: JsValue::Object(Rc::clone(global)),
        origin,
    };
    match interp.eval_stmts(&mut frame, &program) {
        Ok(Completion::Normal(value)) | Ok(Completion::Return(value)) => Ok(value),
        Err(throw) => Err(ExecError::Throw(throw)),
    }
}

/// Invoke a function value from the boundary. `this` is the receiver the
/// caller supplied, or the global object when absent.
pub(crate) fn call_function(
    global: &Rc<JsObject>,
    func: &Rc<JsFunction>,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, Throw> {
    let mut interp = Interp {
        global: Rc::clone(global),
        depth: 0,
    };
    interp.invoke(func, this, args)
}

enum Completion {
    Normal(JsValue),
    Return(JsValue),
}

struct Frame<'a> {
    /// `None` at top level, where declarations target the global object.
    locals: Option<HashMap<String, JsValue>>,
    this: JsValue,
    origin: &'a str,
}

struct Interp {
    global: Rc<JsObject>,
    depth: u32,
}

impl Interp {
    fn eval_stmts(&mut self, frame: &mut Frame<'_>, stmts: &[Stmt]) -> Result<Completion, Throw> {
        let mut last = JsValue::Undefined;
        for stmt in stmts {
            match stmt {
                Stmt::Empty => {}
                Stmt::Decl { name, init } => {
                    let value = match init {
                        Some(expr) => self.eval(frame, expr)?,
                        None => JsValue::Undefined,
                    };
                    self.declare(frame, name, value);
                }
                Stmt::Expr(expr) => {
                    last = self.eval(frame, expr)?;
                }
                Stmt::Return(value) => {
                    let value = match value {
                        Some(expr) => self.eval(frame, expr)?,
                        None => JsValue::Undefined,
                    };
                    return Ok(Completion::Return(value));
                }
            }
        }
        Ok(Completion::Normal(last))
    }

    fn declare(&mut self, frame: &mut Frame<'_>, name: &str, value: JsValue) {
        match &mut frame.locals {
            Some(locals) => {
                locals.insert(name.to_string(), value);
            }
            None => self.global.set(name, value),
        }
    }

    fn eval(&mut self, frame: &mut Frame<'_>, expr: &Expr) -> Result<JsValue, Throw> {
        match &expr.kind {
            ExprKind::Number(n) => Ok(JsValue::Number(*n)),
            ExprKind::Str(s) => Ok(JsValue::string(s)),
            ExprKind::Bool(b) => Ok(JsValue::Bool(*b)),
            ExprKind::Null => Ok(JsValue::Null),
            ExprKind::Undefined => Ok(JsValue::Undefined),
            ExprKind::This => Ok(frame.this.clone()),
            ExprKind::Ident(name) => self.lookup(frame, name, expr),
            ExprKind::Object(props) => {
                let object = JsObject::new();
                for (key, value_expr) in props {
                    let value = self.eval(frame, value_expr)?;
                    object.set(key.clone(), value);
                }
                Ok(JsValue::Object(object))
            }
            ExprKind::Member { object, property } => {
                let target = self.eval(frame, object)?;
                self.member(frame, &target, property, expr, "read")
            }
            ExprKind::Call { callee, args } => {
                let (func, this, desc) = match &callee.kind {
                    ExprKind::Member { object, property } => {
                        let target = self.eval(frame, object)?;
                        let func = self.member(frame, &target, property, callee, "read")?;
                        (func, target, property.clone())
                    }
                    other => {
                        let desc = match other {
                            ExprKind::Ident(name) => name.clone(),
                            _ => String::new(),
                        };
                        let func = self.eval(frame, callee)?;
                        let desc = if desc.is_empty() {
                            func.to_js_string()
                        } else {
                            desc
                        };
                        (func, JsValue::Object(Rc::clone(&self.global)), desc)
                    }
                };
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval(frame, arg)?);
                }
                match func {
                    JsValue::Function(f) => self.invoke(&f, this, arg_values),
                    _ => Err(Throw::new(
                        format!("TypeError: {} is not a function", desc),
                        frame.origin,
                        expr.line,
                        expr.col,
                    )),
                }
            }
            ExprKind::Assign { target, value } => {
                let value = self.eval(frame, value)?;
                match &target.kind {
                    ExprKind::Ident(name) => {
                        match &mut frame.locals {
                            Some(locals) if locals.contains_key(name.as_str()) => {
                                locals.insert(name.clone(), value.clone());
                            }
                            // Undeclared assignment targets the global
                            // object, sloppy-mode style.
                            _ => self.global.set(name.clone(), value.clone()),
                        }
                    }
                    ExprKind::Member { object, property } => {
                        let target_value = self.eval(frame, object)?;
                        match target_value {
                            JsValue::Object(obj) => obj.set(property.clone(), value.clone()),
                            JsValue::Undefined | JsValue::Null => {
                                return Err(Throw::new(
                                    format!(
                                        "TypeError: Cannot set properties of {} (setting '{}')",
                                        target_value.to_js_string(),
                                        property
                                    ),
                                    frame.origin,
                                    target.line,
                                    target.col,
                                ));
                            }
                            // Property writes on other primitives are
                            // silently dropped.
                            _ => {}
                        }
                    }
                    _ => {}
                }
                Ok(value)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let left = self.eval(frame, lhs)?;
                let right = self.eval(frame, rhs)?;
                Ok(match op {
                    BinOp::Add => {
                        if left.prefers_string_concat() || right.prefers_string_concat() {
                            JsValue::string(format!(
                                "{}{}",
                                left.to_js_string(),
                                right.to_js_string()
                            ))
                        } else {
                            JsValue::Number(left.to_number() + right.to_number())
                        }
                    }
                    BinOp::Sub => JsValue::Number(left.to_number() - right.to_number()),
                    BinOp::Mul => JsValue::Number(left.to_number() * right.to_number()),
                    BinOp::Div => JsValue::Number(left.to_number() / right.to_number()),
                })
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval(frame, operand)?;
                Ok(match op {
                    UnOp::Neg => JsValue::Number(-value.to_number()),
                    UnOp::Not => JsValue::Bool(!value.truthy()),
                })
            }
            ExprKind::Function(f) => Ok(JsValue::Function(Rc::clone(f))),
        }
    }

    fn lookup(&self, frame: &Frame<'_>, name: &str, expr: &Expr) -> Result<JsValue, Throw> {
        if let Some(locals) = &frame.locals {
            if let Some(value) = locals.get(name) {
                return Ok(value.clone());
            }
        }
        if let Some(value) = self.global.get(name) {
            return Ok(value);
        }
        Err(Throw::new(
            format!("ReferenceError: {} is not defined", name),
            frame.origin,
            expr.line,
            expr.col,
        ))
    }

    fn member(
        &self,
        frame: &Frame<'_>,
        target: &JsValue,
        property: &str,
        expr: &Expr,
        action: &str,
    ) -> Result<JsValue, Throw> {
        match target {
            JsValue::Object(obj) => Ok(obj.get(property).unwrap_or(JsValue::Undefined)),
            JsValue::Undefined | JsValue::Null => Err(Throw::new(
                format!(
                    "TypeError: Cannot {} properties of {} (reading '{}')",
                    action,
                    target.to_js_string(),
                    property
                ),
                frame.origin,
                expr.line,
                expr.col,
            )),
            _ => Ok(JsValue::Undefined),
        }
    }

    fn invoke(
        &mut self,
        func: &Rc<JsFunction>,
        this: JsValue,
        args: Vec<JsValue>,
    ) -> Result<JsValue, Throw> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(Throw::new(
                "RangeError: Maximum call stack size exceeded",
                &func.origin,
                1,
                1,
            ));
        }
        self.depth += 1;

        let mut locals = HashMap::with_capacity(func.params.len());
        for (i, param) in func.params.iter().enumerate() {
            locals.insert(
                param.clone(),
                args.get(i).cloned().unwrap_or(JsValue::Undefined),
            );
        }
        let mut frame = Frame {
            locals: Some(locals),
            this,
            origin: &func.origin,
        };

        let result = match &func.body {
            FuncBody::Expr(expr) => self.eval(&mut frame, expr),
            FuncBody::Block(stmts) => self.eval_stmts(&mut frame, stmts).map(|c| match c {
                Completion::Return(value) => value,
                Completion::Normal(_) => JsValue::Undefined,
            }),
        };

        self.depth -= 1;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(global: &Rc<JsObject>, src: &str) -> Result<JsValue, ExecError> {
        run_script(global, src, "test.js")
    }

    fn run_ok(global: &Rc<JsObject>, src: &str) -> JsValue {
        run(global, src).unwrap()
    }

    #[test]
    fn test_last_expression_value() {
        let global = JsObject::new();
        assert_eq!(run_ok(&global, "13 * 2").to_js_string(), "26");
        assert_eq!(run_ok(&global, "\"str\"").to_js_string(), "str");
        assert_eq!(run_ok(&global, "let x = 5").to_js_string(), "undefined");
    }

    #[test]
    fn test_bindings_persist_on_global() {
        let global = JsObject::new();
        run_ok(&global, "const add = (a, b) => a + b");
        let result = run_ok(&global, "add(3, 4)");
        assert_eq!(result.to_js_string(), "7");
        assert!(global.has("add"));
    }

    #[test]
    fn test_reference_error() {
        let global = JsObject::new();
        let err = run(&global, "add()").unwrap_err();
        match err {
            ExecError::Throw(throw) => {
                assert_eq!(throw.message, "ReferenceError: add is not defined");
                assert_eq!(throw.location(), "test.js:1:1");
                assert_eq!(
                    throw.stack(),
                    "ReferenceError: add is not defined\n    at test.js:1:1"
                );
            }
            other => panic!("expected throw, got {:?}", other),
        }
    }

    #[test]
    fn test_not_a_function() {
        let global = JsObject::new();
        let err = run(&global, "let x = 5; x()").unwrap_err();
        match err {
            ExecError::Throw(throw) => {
                assert_eq!(throw.message, "TypeError: x is not a function");
            }
            other => panic!("expected throw, got {:?}", other),
        }
    }

    #[test]
    fn test_this_in_function_body() {
        let global = JsObject::new();
        let result = run_ok(&global, "(function(){ this.z = 3; return this; })()");
        match &result {
            JsValue::Object(obj) => assert_eq!(obj.get("z").unwrap().to_number(), 3.0),
            other => panic!("expected object, got {:?}", other),
        }
        // Sloppy-mode receiver defaults to the global object.
        assert!(global.has("z"));
    }

    #[test]
    fn test_boundary_call_with_receiver() {
        let global = JsObject::new();
        let func = match run_ok(&global, "((x,y)=>(x+y+this.z))") {
            JsValue::Function(f) => f,
            other => panic!("expected function, got {:?}", other),
        };
        let receiver = JsObject::new();
        receiver.set("z", JsValue::Number(3.0));
        let result = call_function(
            &global,
            &func,
            JsValue::Object(receiver),
            vec![JsValue::Number(1.0), JsValue::Number(2.0)],
        )
        .unwrap();
        assert_eq!(result.to_int64(), 6);
    }

    #[test]
    fn test_string_concat() {
        let global = JsObject::new();
        assert_eq!(run_ok(&global, "\"a\" + 1").to_js_string(), "a1");
        assert_eq!(run_ok(&global, "1 + 2 + \"3\"").to_js_string(), "33");
    }

    #[test]
    fn test_object_literal_and_members() {
        let global = JsObject::new();
        let result = run_ok(&global, "let o = { a: 1 }; o.b = o.a + 1; o.b");
        assert_eq!(result.to_int64(), 2);
    }

    #[test]
    fn test_member_of_undefined_throws() {
        let global = JsObject::new();
        let err = run(&global, "let u = undefined; u.x").unwrap_err();
        match err {
            ExecError::Throw(throw) => assert_eq!(
                throw.message,
                "TypeError: Cannot read properties of undefined (reading 'x')"
            ),
            other => panic!("expected throw, got {:?}", other),
        }
    }

    #[test]
    fn test_stack_overflow_guard() {
        let global = JsObject::new();
        run_ok(&global, "const loop = () => loop()");
        let err = run(&global, "loop()").unwrap_err();
        match err {
            ExecError::Throw(throw) => {
                assert_eq!(throw.message, "RangeError: Maximum call stack size exceeded");
            }
            other => panic!("expected throw, got {:?}", other),
        }
    }

    #[test]
    fn test_locals_shadow_globals() {
        let global = JsObject::new();
        run_ok(&global, "var x = 1; const f = (x) => x + 10");
        assert_eq!(run_ok(&global, "f(5)").to_int64(), 15);
        assert_eq!(run_ok(&global, "x").to_int64(), 1);
    }

    #[test]
    fn test_function_declaration_statement() {
        let global = JsObject::new();
        run_ok(&global, "function double(n) { return n * 2 }");
        assert_eq!(run_ok(&global, "double(21)").to_int64(), 42);
    }
}
