//! Guest values
//!
//! Values are cheap to clone: scalars are copied, strings share an
//! `Arc<str>`, lists share one `Arc<Mutex<Vec<Value>>>` so every alias sees
//! mutation. All values are `Send + Sync`; a namespace may be touched by
//! several execution tasks.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;

use super::builtins::{Builtin, MethodKind};
use super::exception::{Exception, ExceptionKind, ExceptionObject};
use super::io::StreamRole;
use crate::frontend::parser::ast::FunctionDef;

/// Deepest list or exception nesting that `repr` and `==` walk into
pub const MAX_VALUE_DEPTH: usize = 200;

/// Shared, mutable list storage
#[derive(Clone, Default)]
pub struct ListRef(Arc<Mutex<Vec<Value>>>);

impl ListRef {
    pub fn new(items: Vec<Value>) -> Self {
        Self(Arc::new(Mutex::new(items)))
    }

    pub fn ptr_eq(
        &self,
        other: &ListRef,
    ) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn as_ptr(&self) -> *const Mutex<Vec<Value>> {
        Arc::as_ptr(&self.0)
    }
}

impl Deref for ListRef {
    type Target = Mutex<Vec<Value>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for ListRef {
    // Lists nested deeper than the thread stack allows are torn down
    // without recursing
    fn drop(&mut self) {
        if Arc::strong_count(&self.0) != 1 {
            return;
        }
        let mut pending = std::mem::take(&mut *self.0.lock());
        while let Some(value) = pending.pop() {
            if let Value::List(inner) = value {
                if Arc::strong_count(&inner.0) == 1 {
                    pending.append(&mut inner.0.lock());
                }
            }
        }
    }
}

/// A guest value
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(ListRef),
    Range(RangeValue),
    Function(Arc<Function>),
    Builtin(Builtin),
    Method(Arc<BoundMethod>),
    ExceptionType(ExceptionKind),
    Exception(Arc<ExceptionObject>),
    Module(Module),
    Stream(StreamRole),
}

/// `range(start, stop, step)`, iterated lazily
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeValue {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeValue {
    pub fn len(&self) -> usize {
        let (lo, hi, step) = if self.step > 0 {
            (self.start as i128, self.stop as i128, self.step as i128)
        } else {
            (self.stop as i128, self.start as i128, -(self.step as i128))
        };
        if hi <= lo {
            0
        } else {
            ((hi - lo + step - 1) / step) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(
        &self,
        index: usize,
    ) -> Option<i64> {
        if index < self.len() {
            Some(self.start + index as i64 * self.step)
        } else {
            None
        }
    }

    pub fn contains(
        &self,
        value: i64,
    ) -> bool {
        let offset = value as i128 - self.start as i128;
        let step = self.step as i128;
        offset % step == 0 && {
            let index = offset / step;
            index >= 0 && (index as usize) < self.len()
        }
    }
}

/// A user-defined function with its evaluated defaults
#[derive(Debug)]
pub struct Function {
    pub def: Arc<FunctionDef>,
    /// One slot per parameter; `Some` when it has a default
    pub defaults: Vec<Option<Value>>,
    /// Source of the snippet that defined it, for tracebacks
    pub source: Arc<str>,
}

/// A method looked up on a receiver, `lst.append`
#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: Value,
    pub method: MethodKind,
}

/// Importable modules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Sys,
}

impl Module {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sys" => Some(Module::Sys),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Module::Sys => "sys",
        }
    }
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Value {
        Value::Str(Arc::from(s.as_ref()))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(ListRef::new(items))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Range(_) => "range",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::Method(_) => "method",
            Value::ExceptionType(_) => "type",
            Value::Exception(obj) => obj.kind.name(),
            Value::Module(_) => "module",
            Value::Stream(_) => "TextIOWrapper",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.lock().is_empty(),
            Value::Range(r) => !r.is_empty(),
            _ => true,
        }
    }

    /// Integer view of ints and bools
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Float view of any number
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            other => other.as_int().map(|i| i as f64),
        }
    }

    /// `str(value)`
    pub fn to_str(&self) -> String {
        match self {
            Value::Str(s) => s.to_string(),
            Value::Exception(obj) => obj.message(),
            other => other.repr(),
        }
    }

    /// `str(value)` as guest code sees it, failing on runaway nesting
    pub fn try_to_str(&self) -> Result<String, Exception> {
        match self {
            Value::Str(s) => Ok(s.to_string()),
            Value::Exception(obj) => match &obj.payload {
                None => Ok(String::new()),
                Some(payload) => payload.try_to_str(),
            },
            other => other.try_repr(),
        }
    }

    /// `repr(value)`; nesting past `MAX_VALUE_DEPTH` prints as `...`
    pub fn repr(&self) -> String {
        let mut out = String::new();
        if self.write_repr(&mut out, &mut Vec::new()).is_err() {
            out.push_str("...");
        }
        out
    }

    /// `repr(value)` as guest code sees it, failing on runaway nesting
    pub fn try_repr(&self) -> Result<String, Exception> {
        let mut out = String::new();
        self.write_repr(&mut out, &mut Vec::new())?;
        Ok(out)
    }

    fn write_repr(
        &self,
        out: &mut String,
        seen: &mut Vec<*const Mutex<Vec<Value>>>,
    ) -> Result<(), Exception> {
        match self {
            Value::None => out.push_str("None"),
            Value::Bool(true) => out.push_str("True"),
            Value::Bool(false) => out.push_str("False"),
            Value::Int(i) => out.push_str(&i.to_string()),
            Value::Float(f) => out.push_str(&format_float(*f)),
            Value::Str(s) => out.push_str(&quote_str(s)),
            Value::List(items) => {
                let ptr = items.as_ptr();
                if seen.contains(&ptr) {
                    out.push_str("[...]");
                    return Ok(());
                }
                if seen.len() >= MAX_VALUE_DEPTH {
                    return Err(too_deep("while getting the repr of an object"));
                }
                seen.push(ptr);
                let snapshot = items.lock().clone();
                out.push('[');
                for (i, item) in snapshot.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_repr(out, seen)?;
                }
                out.push(']');
                seen.pop();
            }
            Value::Range(r) => {
                if r.step == 1 {
                    out.push_str(&format!("range({}, {})", r.start, r.stop));
                } else {
                    out.push_str(&format!("range({}, {}, {})", r.start, r.stop, r.step));
                }
            }
            Value::Function(func) => out.push_str(&format!("<function {}>", func.def.name)),
            Value::Builtin(b) if b.is_class() => {
                out.push_str(&format!("<class '{}'>", b.name()))
            }
            Value::Builtin(b) => out.push_str(&format!("<built-in function {}>", b.name())),
            Value::Method(m) => out.push_str(&format!(
                "<built-in method {} of {} object>",
                m.method.name(),
                m.receiver.type_name()
            )),
            Value::ExceptionType(kind) => out.push_str(&format!("<class '{}'>", kind.name())),
            Value::Exception(obj) => {
                out.push_str(obj.kind.name());
                out.push('(');
                if let Some(payload) = &obj.payload {
                    // Exception payloads count as a level; the null entry
                    // never matches a list
                    if seen.len() >= MAX_VALUE_DEPTH {
                        return Err(too_deep("while getting the repr of an object"));
                    }
                    seen.push(std::ptr::null());
                    payload.write_repr(out, seen)?;
                    seen.pop();
                }
                out.push(')');
            }
            Value::Module(m) => out.push_str(&format!("<module '{}'>", m.name())),
            Value::Stream(role) => out.push_str(&format!("<{}>", role.sys_name())),
        }
        Ok(())
    }

    /// `==`; nesting past `MAX_VALUE_DEPTH` compares unequal
    pub fn py_eq(
        &self,
        other: &Value,
    ) -> bool {
        self.try_eq(other).unwrap_or(false)
    }

    /// `==` as guest code sees it, failing on runaway nesting
    pub fn try_eq(
        &self,
        other: &Value,
    ) -> Result<bool, Exception> {
        self.eq_at(other, 0)
    }

    fn eq_at(
        &self,
        other: &Value,
        depth: usize,
    ) -> Result<bool, Exception> {
        let equal = match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                if a.ptr_eq(b) {
                    return Ok(true);
                }
                if depth >= MAX_VALUE_DEPTH {
                    return Err(too_deep("in comparison"));
                }
                let a = a.lock().clone();
                let b = b.lock().clone();
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if !x.eq_at(y, depth + 1)? {
                        return Ok(false);
                    }
                }
                true
            }
            (Value::Range(a), Value::Range(b)) => {
                a.len() == b.len() && (0..a.len()).all(|i| a.get(i) == b.get(i))
            }
            (Value::Float(_), _) | (_, Value::Float(_)) => {
                match (self.as_float(), other.as_float()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => {
                self.as_int() == other.as_int()
            }
            (Value::ExceptionType(a), Value::ExceptionType(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Module(a), Value::Module(b)) => a == b,
            (Value::Stream(a), Value::Stream(b)) => a == b,
            _ => self.is_same(other),
        };
        Ok(equal)
    }

    /// `is`
    pub fn is_same(
        &self,
        other: &Value,
    ) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Method(a), Value::Method(b)) => Arc::ptr_eq(a, b),
            (Value::Exception(a), Value::Exception(b)) => Arc::ptr_eq(a, b),
            (Value::ExceptionType(a), Value::ExceptionType(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Module(a), Value::Module(b)) => a == b,
            (Value::Stream(a), Value::Stream(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.py_eq(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl fmt::Display for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.to_str())
    }
}

fn too_deep(context: &str) -> Exception {
    Exception::new(
        ExceptionKind::RecursionError,
        format!("maximum recursion depth exceeded {}", context),
    )
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

/// Shortest float text that reads back the same, in the guest's notation
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let abs = f.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        // 1e20 -> 1e+20, 1e-5 -> 1e-05
        let text = format!("{:e}", f);
        let (mantissa, exponent) = text.split_once('e').unwrap_or((&text, "0"));
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(d) => ('-', d),
            None => ('+', exponent),
        };
        return format!("{}e{}{:0>2}", mantissa, sign, digits);
    }
    if f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

/// Guest-style quoting: single quotes unless the text holds one and no double quote
pub fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_format() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(-2.5), "-2.5");
        assert_eq!(format_float(1e20), "1e+20");
        assert_eq!(format_float(1e-5), "1e-05");
        assert_eq!(format_float(1.5e-7), "1.5e-07");
        assert_eq!(format_float(f64::INFINITY), "inf");
    }

    #[test]
    fn test_repr_and_str() {
        let v = Value::list(vec![Value::Int(1), Value::str("a'b"), Value::None]);
        assert_eq!(v.repr(), "[1, \"a'b\", None]");
        assert_eq!(Value::str("hi").to_str(), "hi");
        assert_eq!(Value::str("hi").repr(), "'hi'");
        assert_eq!(Value::Bool(true).to_str(), "True");
    }

    #[test]
    fn test_self_referencing_list() {
        let v = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &v {
            items.lock().push(v.clone());
        }
        assert_eq!(v.repr(), "[1, [...]]");
    }

    #[test]
    fn test_deep_nesting_is_recursion_error() {
        let mut v = Value::list(Vec::new());
        for _ in 0..100_000 {
            v = Value::list(vec![v]);
        }
        let err = v.try_repr().unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::RecursionError);
        assert_eq!(
            err.summary(),
            "RecursionError: maximum recursion depth exceeded while getting the repr of an object"
        );
        assert!(v.try_to_str().is_err());
        assert!(v.repr().starts_with("[[[["));
        assert!(v.repr().ends_with("..."));

        let wrapped = Value::Exception(Arc::new(ExceptionObject {
            kind: ExceptionKind::ValueError,
            payload: Some(v.clone()),
        }));
        assert!(wrapped.try_repr().is_err());
        assert!(!v.py_eq(&Value::list(vec![v.clone()])));
        // dropping the last handle must not recurse
        drop(wrapped);
        drop(v);
    }

    #[test]
    fn test_nesting_within_limit() {
        let nested = |depth| {
            let mut v = Value::Int(1);
            for _ in 0..depth {
                v = Value::list(vec![v]);
            }
            v
        };
        let v = nested(MAX_VALUE_DEPTH);
        let text = v.try_repr().unwrap();
        assert_eq!(text.len(), 2 * MAX_VALUE_DEPTH + 1);
        assert!(v.try_eq(&nested(MAX_VALUE_DEPTH)).unwrap());
        assert!(!v.try_eq(&nested(MAX_VALUE_DEPTH - 1)).unwrap());
    }

    #[test]
    fn test_equality_across_numbers() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::Bool(true), Value::Int(1));
        assert_ne!(Value::Int(1), Value::str("1"));
        assert_eq!(
            Value::list(vec![Value::Int(1)]),
            Value::list(vec![Value::Float(1.0)])
        );
    }

    #[test]
    fn test_range() {
        let r = RangeValue {
            start: 0,
            stop: 10,
            step: 3,
        };
        assert_eq!(r.len(), 4);
        assert_eq!(r.get(3), Some(9));
        assert!(r.contains(6));
        assert!(!r.contains(7));
        let down = RangeValue {
            start: 5,
            stop: 0,
            step: -2,
        };
        assert_eq!(down.len(), 3);
        assert_eq!(down.get(2), Some(1));
    }

    #[test]
    fn test_values_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Value>();
    }
}
