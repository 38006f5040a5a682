//! Tree-walking interpreter

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::builtins::{lookup_builtin, Builtin, CallArgs, MethodKind};
use super::exception::{Exception, ExceptionKind, ExceptionObject, TraceFrame};
use super::io::{GuestIo, StreamRole};
use super::namespace::Namespace;
use super::ops;
use super::value::{BoundMethod, Function, Module, Value};
use crate::frontend::parser::ast::*;
use crate::frontend::CompiledUnit;

/// Execution limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum call depth, counting the module frame
    pub recursion_limit: usize,
    /// Longest list (in items) or string (in bytes) a repeat or
    /// concatenation may build
    pub max_sequence_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            recursion_limit: 500,
            max_sequence_len: 1 << 24,
        }
    }
}

/// Statement completion
#[derive(Debug)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

struct Frame {
    name: String,
    /// `None` for the module frame, which binds straight into the namespace
    locals: Option<HashMap<String, Value>>,
    declared_global: HashSet<String>,
    line: usize,
    source: Arc<str>,
}

impl Frame {
    fn trace(&self) -> TraceFrame {
        TraceFrame {
            name: self.name.clone(),
            line: self.line,
            source: self.source.clone(),
        }
    }
}

/// Interpreter state for one execution
pub struct Interpreter<'a> {
    globals: &'a Namespace,
    io: &'a dyn GuestIo,
    limits: Limits,
    /// Innermost frame; callers are held on the Rust stack by `call_function`
    frame: Frame,
    depth: usize,
    /// Exceptions whose handlers are running, for bare `raise`
    handling: Vec<Arc<ExceptionObject>>,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        globals: &'a Namespace,
        io: &'a dyn GuestIo,
        limits: Limits,
    ) -> Self {
        Self {
            globals,
            io,
            limits,
            frame: Frame {
                name: "<module>".to_string(),
                locals: None,
                declared_global: HashSet::new(),
                line: 1,
                source: Arc::from(""),
            },
            depth: 1,
            handling: Vec::new(),
        }
    }

    /// Execute a compiled unit at module level
    pub fn run(
        &mut self,
        unit: &CompiledUnit,
    ) -> Result<(), Exception> {
        self.frame.source = Arc::from(unit.source());
        self.frame.line = 1;
        match self.exec_block(unit.body()) {
            Ok(_) => Ok(()),
            Err(mut exc) => {
                exc.push_frame(self.frame.trace());
                Err(exc)
            }
        }
    }

    fn set_line(
        &mut self,
        stmt: &Stmt,
    ) {
        self.frame.line = stmt.span.start.line;
    }

    fn check_cancel(&self) -> Result<(), Exception> {
        if self.io.is_cancelled() {
            Err(Exception::new(
                ExceptionKind::KeyboardInterrupt,
                "execution cancelled",
            ))
        } else {
            Ok(())
        }
    }

    // ---- scopes ----

    fn lookup(
        &self,
        name: &str,
    ) -> Result<Value, Exception> {
        let frame = &self.frame;
        if let Some(locals) = &frame.locals {
            if !frame.declared_global.contains(name) {
                if let Some(value) = locals.get(name) {
                    return Ok(value.clone());
                }
            }
        }
        if let Some(value) = self.globals.get(name) {
            return Ok(value);
        }
        lookup_builtin(name).ok_or_else(|| Exception::name_error(name))
    }

    fn assign(
        &mut self,
        name: &str,
        value: Value,
    ) {
        if !self.frame.declared_global.contains(name) {
            if let Some(locals) = &mut self.frame.locals {
                locals.insert(name.to_string(), value);
                return;
            }
        }
        self.globals.set(name, value);
    }

    fn delete(
        &mut self,
        name: &str,
    ) -> Result<(), Exception> {
        let removed = match &mut self.frame.locals {
            Some(locals) if !self.frame.declared_global.contains(name) => locals.remove(name),
            _ => self.globals.remove(name),
        };
        removed.map(|_| ()).ok_or_else(|| Exception::name_error(name))
    }

    fn assign_target(
        &mut self,
        target: &Target,
        value: Value,
    ) -> Result<(), Exception> {
        match target {
            Target::Name(name) => {
                self.assign(name, value);
                Ok(())
            }
            Target::Index { value: obj, index } => {
                let container = self.eval(obj)?;
                let index = self.eval(index)?;
                ops::set_item(&container, &index, value)
            }
        }
    }

    // ---- statements ----

    pub fn exec_block(
        &mut self,
        stmts: &[Stmt],
    ) -> Result<Flow, Exception> {
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(
        &mut self,
        stmt: &Stmt,
    ) -> Result<Flow, Exception> {
        self.check_cancel()?;
        self.set_line(stmt);

        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::Assign { targets, value } => {
                let value = self.eval(value)?;
                for target in targets {
                    self.assign_target(target, value.clone())?;
                }
            }
            StmtKind::AugAssign { target, op, value } => self.exec_aug_assign(target, *op, value)?,
            StmtKind::If { branches, orelse } => {
                for (condition, body) in branches {
                    if self.eval(condition)?.truthy() {
                        return self.exec_block(body);
                    }
                }
                return self.exec_block(orelse);
            }
            StmtKind::While { condition, body } => loop {
                self.check_cancel()?;
                self.set_line(stmt);
                if !self.eval(condition)?.truthy() {
                    break;
                }
                match self.exec_block(body)? {
                    Flow::Break => break,
                    Flow::Return(value) => return Ok(Flow::Return(value)),
                    Flow::Normal | Flow::Continue => {}
                }
            },
            StmtKind::For {
                var,
                iterable,
                body,
            } => return self.exec_for(stmt, var, iterable, body),
            StmtKind::Def(def) => {
                let mut defaults = Vec::with_capacity(def.params.len());
                for param in &def.params {
                    defaults.push(match &param.default {
                        Some(expr) => Some(self.eval(expr)?),
                        None => None,
                    });
                }
                let function = Function {
                    def: def.clone(),
                    defaults,
                    source: self.frame.source.clone(),
                };
                self.assign(&def.name, Value::Function(Arc::new(function)));
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Pass => {}
            StmtKind::Global(names) => {
                if self.frame.locals.is_some() {
                    self.frame.declared_global.extend(names.iter().cloned());
                }
            }
            StmtKind::Import(names) => {
                for name in names {
                    let module = Module::from_name(name).ok_or_else(|| {
                        Exception::new(
                            ExceptionKind::ImportError,
                            format!("No module named '{}'", name),
                        )
                    })?;
                    self.assign(name, Value::Module(module));
                }
            }
            StmtKind::Raise(value) => return Err(self.exec_raise(value.as_ref())?),
            StmtKind::Assert { test, message } => {
                if !self.eval(test)?.truthy() {
                    let message = match message {
                        Some(expr) => self.eval(expr)?.try_to_str()?,
                        None => String::new(),
                    };
                    return Err(Exception::new(ExceptionKind::AssertionError, message));
                }
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finally,
            } => return self.exec_try(body, handlers, orelse, finally),
            StmtKind::Del(names) => {
                for name in names {
                    self.delete(name)?;
                }
            }
        }

        Ok(Flow::Normal)
    }

    fn exec_aug_assign(
        &mut self,
        target: &Target,
        op: BinOp,
        value: &Expr,
    ) -> Result<(), Exception> {
        match target {
            Target::Name(name) => {
                let current = self.lookup(name)?;
                let rhs = self.eval(value)?;
                // `lst += other` extends in place
                if let (BinOp::Add, Value::List(items)) = (op, &current) {
                    let extra = ops::iterate(&rhs)?;
                    items.lock().extend(extra);
                    return Ok(());
                }
                let updated = ops::binary(op, &current, &rhs, &self.limits)?;
                self.assign(name, updated);
                Ok(())
            }
            Target::Index { value: obj, index } => {
                let container = self.eval(obj)?;
                let index = self.eval(index)?;
                let current = ops::get_item(&container, &index)?;
                let rhs = self.eval(value)?;
                let updated = ops::binary(op, &current, &rhs, &self.limits)?;
                ops::set_item(&container, &index, updated)
            }
        }
    }

    fn exec_for(
        &mut self,
        stmt: &Stmt,
        var: &str,
        iterable: &Expr,
        body: &[Stmt],
    ) -> Result<Flow, Exception> {
        let iterable = match self.eval(iterable)? {
            v @ (Value::Range(_) | Value::List(_)) => v,
            other => Value::list(ops::iterate(&other)?),
        };

        // Lists are read by index so appends during iteration are seen.
        let mut index = 0usize;
        loop {
            self.check_cancel()?;
            let item = match &iterable {
                Value::Range(r) => r.get(index).map(Value::Int),
                Value::List(items) => items.lock().get(index).cloned(),
                _ => None,
            };
            let Some(item) = item else {
                break;
            };
            index += 1;
            self.set_line(stmt);
            self.assign(var, item);
            match self.exec_block(body)? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_raise(
        &mut self,
        value: Option<&Expr>,
    ) -> Result<Exception, Exception> {
        let Some(expr) = value else {
            return match self.handling.last() {
                Some(object) => Ok(Exception::from_shared(object.clone())),
                None => Err(Exception::new(
                    ExceptionKind::RuntimeError,
                    "No active exception to reraise",
                )),
            };
        };
        match self.eval(expr)? {
            Value::ExceptionType(kind) => Ok(Exception::new(kind, "")),
            Value::Exception(object) => Ok(Exception::from_shared(object)),
            _ => Err(Exception::type_error(
                "exceptions must derive from BaseException",
            )),
        }
    }

    fn exec_try(
        &mut self,
        body: &[Stmt],
        handlers: &[Handler],
        orelse: &[Stmt],
        finally: &[Stmt],
    ) -> Result<Flow, Exception> {
        let mut outcome = match self.exec_block(body) {
            Ok(Flow::Normal) => self.exec_block(orelse),
            Ok(flow) => Ok(flow),
            Err(exc) => self.handle(handlers, exc),
        };

        if !finally.is_empty() {
            match self.exec_block(finally)? {
                Flow::Normal => {}
                flow => outcome = Ok(flow),
            }
        }
        outcome
    }

    fn handle(
        &mut self,
        handlers: &[Handler],
        exc: Exception,
    ) -> Result<Flow, Exception> {
        for handler in handlers {
            let matched = match &handler.kind {
                None => true,
                Some(expr) => {
                    let class = self.eval(expr)?;
                    exception_matches(&exc, &class)?
                }
            };
            if !matched {
                continue;
            }
            if let Some(name) = &handler.binding {
                self.assign(name, Value::Exception(exc.object.clone()));
            }
            self.handling.push(exc.object.clone());
            let result = self.exec_block(&handler.body);
            self.handling.pop();
            return result;
        }
        Err(exc)
    }

    // ---- expressions ----

    pub fn eval(
        &mut self,
        expr: &Expr,
    ) -> Result<Value, Exception> {
        match expr {
            Expr::Lit(lit, _) => Ok(match lit {
                Literal::None => Value::None,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(i) => Value::Int(*i),
                Literal::Float(f) => Value::Float(*f),
                Literal::Str(s) => Value::str(s),
            }),
            Expr::Name(name, _) => self.lookup(name),
            Expr::List(items, _) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Ok(Value::list(values))
            }
            Expr::BinOp {
                op, left, right, ..
            } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                ops::binary(*op, &left, &right, &self.limits)
            }
            Expr::Compare { left, rest, .. } => {
                let mut left = self.eval(left)?;
                for (op, right) in rest {
                    let right = self.eval(right)?;
                    if !ops::compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::BoolOp {
                op, left, right, ..
            } => {
                let left = self.eval(left)?;
                let short_circuit = match op {
                    BoolOp::And => !left.truthy(),
                    BoolOp::Or => left.truthy(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            Expr::UnOp { op, expr, .. } => {
                let value = self.eval(expr)?;
                ops::unary(*op, &value)
            }
            Expr::Call { func, args, .. } => {
                let callee = self.eval(func)?;
                let mut call_args = CallArgs::default();
                for arg in args {
                    match arg {
                        Arg::Positional(expr) => call_args.positional.push(self.eval(expr)?),
                        Arg::Keyword(name, expr) => {
                            let value = self.eval(expr)?;
                            call_args.keywords.push((name.clone(), value));
                        }
                    }
                }
                self.call(callee, call_args)
            }
            Expr::Attribute { value, name, .. } => {
                let value = self.eval(value)?;
                get_attribute(value, name)
            }
            Expr::Index { value, index, .. } => {
                let value = self.eval(value)?;
                let index = self.eval(index)?;
                ops::get_item(&value, &index)
            }
        }
    }

    /// Call any callable value
    pub fn call(
        &mut self,
        callee: Value,
        args: CallArgs,
    ) -> Result<Value, Exception> {
        match callee {
            Value::Builtin(builtin) => builtin.call(self.io, args, &self.limits),
            Value::Method(bound) => bound.method.call(&bound.receiver, self.io, args),
            Value::Function(function) => self.call_function(function, args),
            Value::ExceptionType(kind) => {
                if let Some((name, _)) = args.keywords.first() {
                    return Err(Exception::type_error(format!(
                        "{}() takes no keyword arguments, got '{}'",
                        kind, name
                    )));
                }
                Ok(Value::Exception(Arc::new(ExceptionObject {
                    kind,
                    payload: args.positional.into_iter().next(),
                })))
            }
            other => Err(Exception::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    fn call_function(
        &mut self,
        function: Arc<Function>,
        args: CallArgs,
    ) -> Result<Value, Exception> {
        if self.depth >= self.limits.recursion_limit {
            return Err(Exception::new(
                ExceptionKind::RecursionError,
                "maximum recursion depth exceeded",
            ));
        }

        let def = &function.def;
        let locals = bind_arguments(&function, args)?;
        let callee = Frame {
            name: def.name.clone(),
            locals: Some(locals),
            declared_global: HashSet::new(),
            line: def.span.start.line,
            source: function.source.clone(),
        };
        let caller = std::mem::replace(&mut self.frame, callee);
        self.depth += 1;
        let result = self.exec_block(&def.body);
        self.depth -= 1;
        let callee = std::mem::replace(&mut self.frame, caller);

        match result {
            Ok(Flow::Return(value)) => Ok(value),
            Ok(_) => Ok(Value::None),
            Err(mut exc) => {
                exc.push_frame(callee.trace());
                Err(exc)
            }
        }
    }
}

fn bind_arguments(
    function: &Function,
    args: CallArgs,
) -> Result<HashMap<String, Value>, Exception> {
    let def = &function.def;
    let params = &def.params;
    if args.positional.len() > params.len() {
        return Err(Exception::type_error(format!(
            "{}() takes {} positional argument{} but {} were given",
            def.name,
            params.len(),
            if params.len() == 1 { "" } else { "s" },
            args.positional.len()
        )));
    }

    let mut slots: Vec<Option<Value>> = vec![None; params.len()];
    for (slot, value) in slots.iter_mut().zip(args.positional) {
        *slot = Some(value);
    }
    for (name, value) in args.keywords {
        let Some(index) = params.iter().position(|p| p.name == name) else {
            return Err(Exception::type_error(format!(
                "{}() got an unexpected keyword argument '{}'",
                def.name, name
            )));
        };
        if slots[index].is_some() {
            return Err(Exception::type_error(format!(
                "{}() got multiple values for argument '{}'",
                def.name, name
            )));
        }
        slots[index] = Some(value);
    }

    let mut locals = HashMap::with_capacity(params.len());
    for ((param, slot), default) in params.iter().zip(slots).zip(&function.defaults) {
        let value = match slot.or_else(|| default.clone()) {
            Some(value) => value,
            None => {
                return Err(Exception::type_error(format!(
                    "{}() missing required argument: '{}'",
                    def.name, param.name
                )))
            }
        };
        locals.insert(param.name.clone(), value);
    }
    Ok(locals)
}

fn exception_matches(
    exc: &Exception,
    class: &Value,
) -> Result<bool, Exception> {
    match class {
        Value::ExceptionType(kind) => Ok(exc.is(*kind)),
        Value::List(classes) => {
            let classes = classes.lock().clone();
            for class in &classes {
                if exception_matches(exc, class)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(Exception::type_error(
            "catching classes that do not inherit from BaseException is not allowed",
        )),
    }
}

fn get_attribute(
    value: Value,
    name: &str,
) -> Result<Value, Exception> {
    match (&value, name) {
        (Value::Module(Module::Sys), "stdout") => return Ok(Value::Stream(StreamRole::Output)),
        (Value::Module(Module::Sys), "stderr") => return Ok(Value::Stream(StreamRole::Error)),
        (Value::Module(Module::Sys), "stdin") => return Ok(Value::Stream(StreamRole::Input)),
        (Value::Module(Module::Sys), "exit") => return Ok(Value::Builtin(Builtin::Exit)),
        (Value::Module(Module::Sys), "argv") => return Ok(Value::list(vec![Value::str("")])),
        (Value::Exception(object), "args") => {
            return Ok(Value::list(object.payload.iter().cloned().collect()))
        }
        _ => {}
    }
    match MethodKind::lookup(&value, name) {
        Some(method) => Ok(Value::Method(Arc::new(BoundMethod {
            receiver: value,
            method,
        }))),
        None => Err(Exception::attribute_error(&value, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::compile;
    use crate::runtime::io::testing::CaptureIo;

    fn run_with(
        source: &str,
        ns: &Namespace,
        io: &CaptureIo,
    ) -> Result<(), Exception> {
        let unit = compile(source).unwrap();
        let limits = Limits {
            recursion_limit: 20,
            ..Limits::default()
        };
        Interpreter::new(ns, io, limits).run(&unit)
    }

    fn run(source: &str) -> (String, Result<(), Exception>) {
        let io = CaptureIo::default();
        let ns = Namespace::new();
        let result = run_with(source, &ns, &io);
        (io.out(), result)
    }

    fn output(source: &str) -> String {
        let (out, result) = run(source);
        if let Err(exc) = result {
            panic!("unexpected exception: {}", exc.render());
        }
        out
    }

    #[test]
    fn test_print_and_arithmetic() {
        assert_eq!(output("print(1 + 2 * 3, 7 // 2, 7 / 2)"), "7 3 3.5\n");
        assert_eq!(output("print('a', 'b', sep='-', end='.')"), "a-b.");
    }

    #[test]
    fn test_namespace_persists_between_runs() {
        let io = CaptureIo::default();
        let ns = Namespace::new();
        run_with("x = 1", &ns, &io).unwrap();
        assert_eq!(ns.get("x"), Some(Value::Int(1)));
        run_with("print(x)", &ns, &io).unwrap();
        assert_eq!(io.out(), "1\n");
    }

    #[test]
    fn test_control_flow() {
        let src = "total = 0\nfor i in range(10):\n    if i % 2 == 0:\n        continue\n    if i > 7:\n        break\n    total += i\nprint(total)";
        assert_eq!(output(src), "16\n");

        let src = "n = 0\nwhile True:\n    n += 1\n    if n == 3:\n        break\nprint(n)";
        assert_eq!(output(src), "3\n");
    }

    #[test]
    fn test_functions_defaults_and_keywords() {
        let src = "def greet(name, greeting='hello'):\n    return greeting + ', ' + name\nprint(greet('bob'))\nprint(greet(greeting='hi', name='amy'))";
        assert_eq!(output(src), "hello, bob\nhi, amy\n");

        let (_, result) = run("def f(a):\n    pass\nf(1, 2)");
        assert_eq!(
            result.unwrap_err().summary(),
            "TypeError: f() takes 1 positional argument but 2 were given"
        );
    }

    #[test]
    fn test_recursion_and_globals() {
        let src = "def fact(n):\n    if n <= 1:\n        return 1\n    return n * fact(n - 1)\nprint(fact(10))";
        assert_eq!(output(src), "3628800\n");

        let src = "count = 0\ndef bump():\n    global count\n    count += 1\nbump()\nbump()\nprint(count)";
        assert_eq!(output(src), "2\n");
    }

    #[test]
    fn test_recursion_limit() {
        let (_, result) = run("def f():\n    return f()\nf()");
        assert_eq!(result.unwrap_err().kind(), ExceptionKind::RecursionError);
    }

    #[test]
    fn test_try_except_finally() {
        let src = "try:\n    1 / 0\nexcept ZeroDivisionError as e:\n    print('caught', e)\nelse:\n    print('no')\nfinally:\n    print('done')";
        assert_eq!(output(src), "caught division by zero\ndone\n");

        let src = "try:\n    x = 1\nexcept ValueError:\n    pass\nelse:\n    print('else', x)";
        assert_eq!(output(src), "else 1\n");

        let src = "def f():\n    try:\n        return 'body'\n    finally:\n        print('cleanup')\nprint(f())";
        assert_eq!(output(src), "cleanup\nbody\n");
    }

    #[test]
    fn test_exception_hierarchy_in_handlers() {
        let src = "try:\n    int('x')\nexcept Exception:\n    print('exception')";
        assert_eq!(output(src), "exception\n");

        let (_, result) = run("try:\n    exit(2)\nexcept Exception:\n    print('wrong')");
        assert_eq!(result.unwrap_err().kind(), ExceptionKind::SystemExit);
    }

    #[test]
    fn test_reraise() {
        let (out, result) =
            run("try:\n    raise ValueError('bad')\nexcept ValueError:\n    print('seen')\n    raise");
        assert_eq!(out, "seen\n");
        assert_eq!(result.unwrap_err().summary(), "ValueError: bad");
    }

    #[test]
    fn test_traceback_frames() {
        let (_, result) = run("def f():\n    return 1 / 0\nf()");
        let rendered = result.unwrap_err().render();
        assert_eq!(
            rendered,
            "Traceback (most recent call last):\n  File \"<snippet>\", line 3, in <module>\n    f()\n  File \"<snippet>\", line 2, in f\n    return 1 / 0\nZeroDivisionError: division by zero\n"
        );
    }

    #[test]
    fn test_sys_streams() {
        let io = CaptureIo::default();
        let ns = Namespace::new();
        run_with(
            "import sys\nsys.stdout.write('out\\n')\nsys.stderr.write('err\\n')\nprint('e2', file=sys.stderr)",
            &ns,
            &io,
        )
        .unwrap();
        assert_eq!(io.out(), "out\n");
        assert_eq!(io.err(), "err\ne2\n");
    }

    #[test]
    fn test_input_reads_lines() {
        let io = CaptureIo::with_input(&["3", "4"]);
        let ns = Namespace::new();
        run_with(
            "a = int(input())\nb = int(input('b? '))\nprint(a * b)",
            &ns,
            &io,
        )
        .unwrap();
        assert_eq!(io.out(), "b? 12\n");
    }

    #[test]
    fn test_lists_and_methods() {
        let src = "xs = [3, 1]\nxs.append(2)\nys = xs\nys[0] = 9\nprint(xs, len(xs), xs.pop())\nprint(' '.join(['a', 'B'.lower()]))";
        assert_eq!(output(src), "[9, 1] 3 2\na b\n");

        let src = "xs = [1]\nfor x in xs:\n    if x < 3:\n        xs.append(x + 1)\nprint(xs)";
        assert_eq!(output(src), "[1, 2, 3]\n");
    }

    #[test]
    fn test_name_error_and_del() {
        let (_, result) = run("x = 1\ndel x\nprint(x)");
        assert_eq!(
            result.unwrap_err().summary(),
            "NameError: name 'x' is not defined"
        );
    }

    #[test]
    fn test_assert_and_import_errors() {
        let (_, result) = run("assert 1 == 2, 'nope'");
        assert_eq!(result.unwrap_err().summary(), "AssertionError: nope");
        let (_, result) = run("import os");
        assert_eq!(
            result.unwrap_err().summary(),
            "ImportError: No module named 'os'"
        );
    }

    #[test]
    fn test_cancellation_raises_keyboard_interrupt() {
        let io = CaptureIo::default();
        io.cancel();
        let ns = Namespace::new();
        let err = run_with("while True:\n    pass", &ns, &io).unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::KeyboardInterrupt);
    }

    #[test]
    fn test_boolean_and_comparison_chains() {
        assert_eq!(
            output("print(1 < 2 < 3, 1 < 3 < 2, 0 or 'x', 1 and None, not [])"),
            "True False x None True\n"
        );
        assert_eq!(output("print(2 in [1, 2], 'z' not in 'abc', None is None)"), "True True True\n");
    }
}
