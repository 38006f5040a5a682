//! Builtin functions and methods
//!
//! Builtins reach the outside world only through the [`GuestIo`] of the
//! current run.

use std::cmp::Ordering;

use smallvec::SmallVec;

use super::exception::{Exception, ExceptionKind, ExceptionObject};
use super::interp::Limits;
use super::io::{GuestIo, StreamError, StreamRole};
use super::ops;
use super::value::{RangeValue, Value};
use crate::frontend::parser::ast::BinOp;

/// Evaluated call arguments
#[derive(Debug, Default, Clone)]
pub struct CallArgs {
    pub positional: SmallVec<[Value; 4]>,
    pub keywords: SmallVec<[(String, Value); 2]>,
}

impl CallArgs {
    pub fn positional(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            positional: values.into_iter().collect(),
            keywords: SmallVec::new(),
        }
    }

    fn no_keywords(
        &self,
        func: &str,
    ) -> Result<(), Exception> {
        match self.keywords.first() {
            Some((name, _)) => Err(Exception::type_error(format!(
                "{}() got an unexpected keyword argument '{}'",
                func, name
            ))),
            None => Ok(()),
        }
    }

    fn arity(
        &self,
        func: &str,
        min: usize,
        max: usize,
    ) -> Result<(), Exception> {
        let n = self.positional.len();
        if n < min || n > max {
            let expected = if min == max {
                format!("exactly {}", min)
            } else if n < min {
                format!("at least {}", min)
            } else {
                format!("at most {}", max)
            };
            return Err(Exception::type_error(format!(
                "{}() takes {} argument{} ({} given)",
                func,
                expected,
                if (if n < min { min } else { max }) == 1 { "" } else { "s" },
                n
            )));
        }
        Ok(())
    }

    /// Take a keyword argument, rejecting any the function does not know
    fn keyword(
        &self,
        name: &str,
    ) -> Option<&Value> {
        self.keywords
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    fn only_keywords(
        &self,
        func: &str,
        allowed: &[&str],
    ) -> Result<(), Exception> {
        match self
            .keywords
            .iter()
            .find(|(k, _)| !allowed.contains(&k.as_str()))
        {
            Some((name, _)) => Err(Exception::type_error(format!(
                "'{}' is an invalid keyword argument for {}()",
                name, func
            ))),
            None => Ok(()),
        }
    }
}

/// Builtin functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Print,
    Input,
    Len,
    Str,
    Repr,
    Int,
    Float,
    Bool,
    List,
    Range,
    Abs,
    Min,
    Max,
    Sum,
    Type,
    Isinstance,
    Exit,
    Quit,
}

impl Builtin {
    pub const ALL: [Builtin; 18] = [
        Builtin::Print,
        Builtin::Input,
        Builtin::Len,
        Builtin::Str,
        Builtin::Repr,
        Builtin::Int,
        Builtin::Float,
        Builtin::Bool,
        Builtin::List,
        Builtin::Range,
        Builtin::Abs,
        Builtin::Min,
        Builtin::Max,
        Builtin::Sum,
        Builtin::Type,
        Builtin::Isinstance,
        Builtin::Exit,
        Builtin::Quit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Input => "input",
            Builtin::Len => "len",
            Builtin::Str => "str",
            Builtin::Repr => "repr",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Bool => "bool",
            Builtin::List => "list",
            Builtin::Range => "range",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Sum => "sum",
            Builtin::Type => "type",
            Builtin::Isinstance => "isinstance",
            Builtin::Exit => "exit",
            Builtin::Quit => "quit",
        }
    }

    /// Builtins that double as type objects
    pub fn is_class(self) -> bool {
        matches!(
            self,
            Builtin::Str
                | Builtin::Int
                | Builtin::Float
                | Builtin::Bool
                | Builtin::List
                | Builtin::Range
                | Builtin::Type
        )
    }

    pub fn call(
        self,
        io: &dyn GuestIo,
        args: CallArgs,
        limits: &Limits,
    ) -> Result<Value, Exception> {
        let name = self.name();
        match self {
            Builtin::Print => print(io, args),
            Builtin::Input => {
                args.no_keywords(name)?;
                args.arity(name, 0, 1)?;
                if let Some(prompt) = args.positional.first() {
                    io.write(StreamRole::Output, &prompt.try_to_str()?);
                }
                match read_line(io)? {
                    Some(line) => Ok(Value::str(strip_newline(&line))),
                    None => Err(Exception::new(
                        ExceptionKind::EOFError,
                        "EOF when reading a line",
                    )),
                }
            }
            Builtin::Len => {
                args.no_keywords(name)?;
                args.arity(name, 1, 1)?;
                let len = match &args.positional[0] {
                    Value::Str(s) => s.chars().count(),
                    Value::List(items) => items.lock().len(),
                    Value::Range(r) => r.len(),
                    other => {
                        return Err(Exception::type_error(format!(
                            "object of type '{}' has no len()",
                            other.type_name()
                        )))
                    }
                };
                i64::try_from(len).map(Value::Int).map_err(|_| {
                    Exception::new(
                        ExceptionKind::OverflowError,
                        "cannot fit 'int' into an index-sized integer",
                    )
                })
            }
            Builtin::Str => {
                args.no_keywords(name)?;
                args.arity(name, 0, 1)?;
                match args.positional.first() {
                    Some(value) => value.try_to_str().map(Value::str),
                    None => Ok(Value::str("")),
                }
            }
            Builtin::Repr => {
                args.no_keywords(name)?;
                args.arity(name, 1, 1)?;
                args.positional[0].try_repr().map(Value::str)
            }
            Builtin::Int => to_int(args),
            Builtin::Float => {
                args.no_keywords(name)?;
                args.arity(name, 0, 1)?;
                match args.positional.first() {
                    None => Ok(Value::Float(0.0)),
                    Some(Value::Str(s)) => s
                        .trim()
                        .replace('_', "")
                        .parse::<f64>()
                        .map(Value::Float)
                        .map_err(|_| {
                            Exception::value_error(format!(
                                "could not convert string to float: {}",
                                Value::Str(s.clone()).repr()
                            ))
                        }),
                    Some(other) => other.as_float().map(Value::Float).ok_or_else(|| {
                        Exception::type_error(format!(
                            "float() argument must be a string or a number, not '{}'",
                            other.type_name()
                        ))
                    }),
                }
            }
            Builtin::Bool => {
                args.no_keywords(name)?;
                args.arity(name, 0, 1)?;
                Ok(Value::Bool(
                    args.positional.first().is_some_and(Value::truthy),
                ))
            }
            Builtin::List => {
                args.no_keywords(name)?;
                args.arity(name, 0, 1)?;
                match args.positional.first() {
                    None => Ok(Value::list(Vec::new())),
                    Some(Value::Range(r)) if r.len() > limits.max_sequence_len => {
                        Err(Exception::memory_error())
                    }
                    Some(v) => Ok(Value::list(ops::iterate(v)?)),
                }
            }
            Builtin::Range => range(args),
            Builtin::Abs => {
                args.no_keywords(name)?;
                args.arity(name, 1, 1)?;
                match &args.positional[0] {
                    Value::Float(f) => Ok(Value::Float(f.abs())),
                    other => match other.as_int() {
                        Some(i) => i.checked_abs().map(Value::Int).ok_or_else(Exception::overflow),
                        None => Err(Exception::type_error(format!(
                            "bad operand type for abs(): '{}'",
                            other.type_name()
                        ))),
                    },
                }
            }
            Builtin::Min => extreme(args, name, Ordering::Less),
            Builtin::Max => extreme(args, name, Ordering::Greater),
            Builtin::Sum => {
                args.only_keywords(name, &["start"])?;
                args.arity(name, 1, 2)?;
                let mut total = args
                    .positional
                    .get(1)
                    .or_else(|| args.keyword("start"))
                    .cloned()
                    .unwrap_or(Value::Int(0));
                if matches!(total, Value::Str(_)) {
                    return Err(Exception::type_error(
                        "sum() can't sum strings [use ''.join(seq) instead]",
                    ));
                }
                for item in ops::iterate(&args.positional[0])? {
                    total = ops::binary(BinOp::Add, &total, &item, limits)?;
                }
                Ok(total)
            }
            Builtin::Type => {
                args.no_keywords(name)?;
                args.arity(name, 1, 1)?;
                Ok(type_of(&args.positional[0]))
            }
            Builtin::Isinstance => {
                args.no_keywords(name)?;
                args.arity(name, 2, 2)?;
                isinstance(&args.positional[0], &args.positional[1]).map(Value::Bool)
            }
            Builtin::Exit | Builtin::Quit => {
                args.only_keywords(name, &["code"])?;
                args.arity(name, 0, 1)?;
                let code = args
                    .positional
                    .first()
                    .or_else(|| args.keyword("code"))
                    .cloned()
                    .filter(|v| !matches!(v, Value::None));
                Err(Exception::from_object(ExceptionObject {
                    kind: ExceptionKind::SystemExit,
                    payload: code,
                }))
            }
        }
    }
}

/// Resolve a name in the builtin scope
pub fn lookup_builtin(name: &str) -> Option<Value> {
    if let Some(builtin) = Builtin::ALL.iter().find(|b| b.name() == name) {
        return Some(Value::Builtin(*builtin));
    }
    ExceptionKind::from_name(name).map(Value::ExceptionType)
}

fn print(
    io: &dyn GuestIo,
    args: CallArgs,
) -> Result<Value, Exception> {
    args.only_keywords("print", &["sep", "end", "file", "flush"])?;
    let text_arg = |key: &str, default: &str| -> Result<String, Exception> {
        match args.keyword(key) {
            None | Some(Value::None) => Ok(default.to_string()),
            Some(Value::Str(s)) => Ok(s.to_string()),
            Some(other) => Err(Exception::type_error(format!(
                "{} must be None or a string, not {}",
                key,
                other.type_name()
            ))),
        }
    };
    let sep = text_arg("sep", " ")?;
    let end = text_arg("end", "\n")?;
    let role = match args.keyword("file") {
        None | Some(Value::None) => StreamRole::Output,
        Some(Value::Stream(role)) => writable(*role)?,
        Some(other) => return Err(Exception::attribute_error(other, "write")),
    };

    let mut text = args
        .positional
        .iter()
        .map(Value::try_to_str)
        .collect::<Result<Vec<_>, _>>()?
        .join(sep.as_str());
    text.push_str(&end);
    io.write(role, &text);
    Ok(Value::None)
}

fn writable(role: StreamRole) -> Result<StreamRole, Exception> {
    match role {
        StreamRole::Input => Err(Exception::value_error("not writable")),
        other => Ok(other),
    }
}

fn read_line(io: &dyn GuestIo) -> Result<Option<String>, Exception> {
    match io.read_line() {
        Ok(line) => Ok(line),
        Err(StreamError::Cancelled) => Err(Exception::new(
            ExceptionKind::KeyboardInterrupt,
            "execution cancelled",
        )),
        Err(StreamError::Unbound) => Err(Exception::new(
            ExceptionKind::EOFError,
            "stdin is not attached",
        )),
    }
}

fn strip_newline(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line)
}

fn to_int(args: CallArgs) -> Result<Value, Exception> {
    args.only_keywords("int", &["base"])?;
    args.arity("int", 0, 2)?;
    let base = args.positional.get(1).or_else(|| args.keyword("base"));
    let Some(value) = args.positional.first() else {
        return Ok(Value::Int(0));
    };

    if let Some(base) = base {
        let Value::Str(s) = value else {
            return Err(Exception::type_error(
                "int() can't convert non-string with explicit base",
            ));
        };
        let radix = base
            .as_int()
            .filter(|b| (2..=36).contains(b))
            .ok_or_else(|| Exception::value_error("int() base must be >= 2 and <= 36"))?;
        return parse_int(s, radix as u32);
    }

    match value {
        Value::Str(s) => parse_int(s, 10),
        Value::Float(f) => {
            if f.is_nan() {
                Err(Exception::value_error("cannot convert float NaN to integer"))
            } else if f.is_infinite() || f.abs() >= 9.223372036854776e18 {
                Err(Exception::new(
                    ExceptionKind::OverflowError,
                    "cannot convert float infinity to integer",
                ))
            } else {
                Ok(Value::Int(f.trunc() as i64))
            }
        }
        other => other.as_int().map(Value::Int).ok_or_else(|| {
            Exception::type_error(format!(
                "int() argument must be a string or a number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn parse_int(
    s: &str,
    radix: u32,
) -> Result<Value, Exception> {
    let cleaned = s.trim().replace('_', "");
    i64::from_str_radix(&cleaned, radix)
        .map(Value::Int)
        .map_err(|_| {
            Exception::value_error(format!(
                "invalid literal for int() with base {}: {}",
                radix,
                Value::str(s).repr()
            ))
        })
}

fn range(args: CallArgs) -> Result<Value, Exception> {
    args.no_keywords("range")?;
    args.arity("range", 1, 3)?;
    let ints = args
        .positional
        .iter()
        .map(|v| {
            v.as_int().ok_or_else(|| {
                Exception::type_error(format!(
                    "'{}' object cannot be interpreted as an integer",
                    v.type_name()
                ))
            })
        })
        .collect::<Result<SmallVec<[i64; 3]>, _>>()?;
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => unreachable!("arity checked"),
    };
    if step == 0 {
        return Err(Exception::value_error("range() arg 3 must not be zero"));
    }
    Ok(Value::Range(RangeValue { start, stop, step }))
}

fn extreme(
    args: CallArgs,
    name: &str,
    wanted: Ordering,
) -> Result<Value, Exception> {
    args.no_keywords(name)?;
    let items = match args.positional.len() {
        0 => {
            return Err(Exception::type_error(format!(
                "{} expected at least 1 argument, got 0",
                name
            )))
        }
        1 => ops::iterate(&args.positional[0])?,
        _ => args.positional.to_vec(),
    };
    let mut iter = items.into_iter();
    let mut best = iter.next().ok_or_else(|| {
        Exception::value_error(format!("{}() arg is an empty sequence", name))
    })?;
    let symbol = if wanted == Ordering::Less { "<" } else { ">" };
    for item in iter {
        if ops::ordering(&item, &best, symbol)? == wanted {
            best = item;
        }
    }
    Ok(best)
}

fn type_of(value: &Value) -> Value {
    match value {
        Value::Bool(_) => Value::Builtin(Builtin::Bool),
        Value::Int(_) => Value::Builtin(Builtin::Int),
        Value::Float(_) => Value::Builtin(Builtin::Float),
        Value::Str(_) => Value::Builtin(Builtin::Str),
        Value::List(_) => Value::Builtin(Builtin::List),
        Value::Range(_) => Value::Builtin(Builtin::Range),
        Value::Exception(obj) => Value::ExceptionType(obj.kind),
        Value::ExceptionType(_) => Value::Builtin(Builtin::Type),
        other => Value::str(format!("<class '{}'>", other.type_name())),
    }
}

fn isinstance(
    value: &Value,
    class: &Value,
) -> Result<bool, Exception> {
    match class {
        Value::ExceptionType(kind) => Ok(matches!(
            value,
            Value::Exception(obj) if obj.kind.is_subclass_of(*kind)
        )),
        Value::Builtin(Builtin::Int) => Ok(matches!(value, Value::Int(_) | Value::Bool(_))),
        Value::Builtin(b) if b.is_class() => Ok(type_of(value).is_same(class)),
        Value::List(classes) => {
            let classes = classes.lock().clone();
            for class in &classes {
                if isinstance(value, class)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(Exception::type_error(
            "isinstance() arg 2 must be a type or list of types",
        )),
    }
}

/// Methods reachable through attribute lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    ListAppend,
    ListPop,
    ListExtend,
    ListInsert,
    StrUpper,
    StrLower,
    StrStrip,
    StrSplit,
    StrJoin,
    StrStartswith,
    StrEndswith,
    StrReplace,
    StreamWrite,
    StreamFlush,
    StreamReadline,
}

impl MethodKind {
    /// Resolve `receiver.name`
    pub fn lookup(
        receiver: &Value,
        name: &str,
    ) -> Option<Self> {
        let method = match (receiver, name) {
            (Value::List(_), "append") => MethodKind::ListAppend,
            (Value::List(_), "pop") => MethodKind::ListPop,
            (Value::List(_), "extend") => MethodKind::ListExtend,
            (Value::List(_), "insert") => MethodKind::ListInsert,
            (Value::Str(_), "upper") => MethodKind::StrUpper,
            (Value::Str(_), "lower") => MethodKind::StrLower,
            (Value::Str(_), "strip") => MethodKind::StrStrip,
            (Value::Str(_), "split") => MethodKind::StrSplit,
            (Value::Str(_), "join") => MethodKind::StrJoin,
            (Value::Str(_), "startswith") => MethodKind::StrStartswith,
            (Value::Str(_), "endswith") => MethodKind::StrEndswith,
            (Value::Str(_), "replace") => MethodKind::StrReplace,
            (Value::Stream(_), "write") => MethodKind::StreamWrite,
            (Value::Stream(_), "flush") => MethodKind::StreamFlush,
            (Value::Stream(_), "readline") => MethodKind::StreamReadline,
            _ => return None,
        };
        Some(method)
    }

    pub fn name(self) -> &'static str {
        match self {
            MethodKind::ListAppend => "append",
            MethodKind::ListPop => "pop",
            MethodKind::ListExtend => "extend",
            MethodKind::ListInsert => "insert",
            MethodKind::StrUpper => "upper",
            MethodKind::StrLower => "lower",
            MethodKind::StrStrip => "strip",
            MethodKind::StrSplit => "split",
            MethodKind::StrJoin => "join",
            MethodKind::StrStartswith => "startswith",
            MethodKind::StrEndswith => "endswith",
            MethodKind::StrReplace => "replace",
            MethodKind::StreamWrite => "write",
            MethodKind::StreamFlush => "flush",
            MethodKind::StreamReadline => "readline",
        }
    }

    pub fn call(
        self,
        receiver: &Value,
        io: &dyn GuestIo,
        args: CallArgs,
    ) -> Result<Value, Exception> {
        let name = self.name();
        match (self, receiver) {
            (MethodKind::ListAppend, Value::List(items)) => {
                args.no_keywords(name)?;
                args.arity(name, 1, 1)?;
                items.lock().push(args.positional[0].clone());
                Ok(Value::None)
            }
            (MethodKind::ListPop, Value::List(items)) => {
                args.no_keywords(name)?;
                args.arity(name, 0, 1)?;
                let mut items = items.lock();
                if items.is_empty() {
                    return Err(Exception::index_error("pop from empty list"));
                }
                let len = items.len() as i64;
                let index = match args.positional.first() {
                    None => len - 1,
                    Some(v) => v.as_int().ok_or_else(|| {
                        Exception::type_error(format!(
                            "'{}' object cannot be interpreted as an integer",
                            v.type_name()
                        ))
                    })?,
                };
                let resolved = if index < 0 { index + len } else { index };
                if resolved < 0 || resolved >= len {
                    return Err(Exception::index_error("pop index out of range"));
                }
                Ok(items.remove(resolved as usize))
            }
            (MethodKind::ListExtend, Value::List(items)) => {
                args.no_keywords(name)?;
                args.arity(name, 1, 1)?;
                let extra = ops::iterate(&args.positional[0])?;
                items.lock().extend(extra);
                Ok(Value::None)
            }
            (MethodKind::ListInsert, Value::List(items)) => {
                args.no_keywords(name)?;
                args.arity(name, 2, 2)?;
                let mut items = items.lock();
                let len = items.len() as i64;
                let index = args.positional[0].as_int().ok_or_else(|| {
                    Exception::type_error("list indices must be integers")
                })?;
                let resolved = if index < 0 { (index + len).max(0) } else { index.min(len) };
                items.insert(resolved as usize, args.positional[1].clone());
                Ok(Value::None)
            }
            (MethodKind::StrUpper, Value::Str(s)) => {
                args.arity(name, 0, 0)?;
                Ok(Value::str(s.to_uppercase()))
            }
            (MethodKind::StrLower, Value::Str(s)) => {
                args.arity(name, 0, 0)?;
                Ok(Value::str(s.to_lowercase()))
            }
            (MethodKind::StrStrip, Value::Str(s)) => {
                args.no_keywords(name)?;
                args.arity(name, 0, 1)?;
                match args.positional.first() {
                    None | Some(Value::None) => Ok(Value::str(s.trim())),
                    Some(Value::Str(chars)) => {
                        Ok(Value::str(s.trim_matches(|c: char| chars.contains(c))))
                    }
                    Some(other) => Err(Exception::type_error(format!(
                        "strip arg must be None or str, not {}",
                        other.type_name()
                    ))),
                }
            }
            (MethodKind::StrSplit, Value::Str(s)) => {
                args.only_keywords(name, &["sep", "maxsplit"])?;
                args.arity(name, 0, 2)?;
                let sep = args.positional.first().or_else(|| args.keyword("sep"));
                let maxsplit = args
                    .positional
                    .get(1)
                    .or_else(|| args.keyword("maxsplit"))
                    .and_then(Value::as_int)
                    .filter(|n| *n >= 0)
                    .map(|n| n as usize);
                let parts: Vec<Value> = match sep {
                    None | Some(Value::None) => split_whitespace(s, maxsplit),
                    Some(Value::Str(sep)) if sep.is_empty() => {
                        return Err(Exception::value_error("empty separator"))
                    }
                    Some(Value::Str(sep)) => match maxsplit {
                        Some(n) => s.splitn(n + 1, &**sep).map(Value::str).collect(),
                        None => s.split(&**sep).map(Value::str).collect(),
                    },
                    Some(other) => {
                        return Err(Exception::type_error(format!(
                            "must be str or None, not {}",
                            other.type_name()
                        )))
                    }
                };
                Ok(Value::list(parts))
            }
            (MethodKind::StrJoin, Value::Str(sep)) => {
                args.no_keywords(name)?;
                args.arity(name, 1, 1)?;
                let mut parts = Vec::new();
                for (i, item) in ops::iterate(&args.positional[0])?.into_iter().enumerate() {
                    match item {
                        Value::Str(s) => parts.push(s),
                        other => {
                            return Err(Exception::type_error(format!(
                                "sequence item {}: expected str instance, {} found",
                                i,
                                other.type_name()
                            )))
                        }
                    }
                }
                let parts: Vec<&str> = parts.iter().map(|s| &**s).collect();
                Ok(Value::str(parts.join(&**sep)))
            }
            (MethodKind::StrStartswith | MethodKind::StrEndswith, Value::Str(s)) => {
                args.no_keywords(name)?;
                args.arity(name, 1, 1)?;
                let Value::Str(affix) = &args.positional[0] else {
                    return Err(Exception::type_error(format!(
                        "{} arg must be str, not {}",
                        name,
                        args.positional[0].type_name()
                    )));
                };
                Ok(Value::Bool(if self == MethodKind::StrStartswith {
                    s.starts_with(&**affix)
                } else {
                    s.ends_with(&**affix)
                }))
            }
            (MethodKind::StrReplace, Value::Str(s)) => {
                args.no_keywords(name)?;
                args.arity(name, 2, 2)?;
                match (&args.positional[0], &args.positional[1]) {
                    (Value::Str(old), Value::Str(new)) => Ok(Value::str(s.replace(&**old, new))),
                    _ => Err(Exception::type_error("replace() arguments must be str")),
                }
            }
            (MethodKind::StreamWrite, Value::Stream(role)) => {
                args.no_keywords(name)?;
                args.arity(name, 1, 1)?;
                let role = writable(*role)?;
                let Value::Str(text) = &args.positional[0] else {
                    return Err(Exception::type_error(format!(
                        "write() argument must be str, not {}",
                        args.positional[0].type_name()
                    )));
                };
                io.write(role, text);
                Ok(Value::Int(text.chars().count() as i64))
            }
            (MethodKind::StreamFlush, Value::Stream(_)) => {
                args.arity(name, 0, 0)?;
                Ok(Value::None)
            }
            (MethodKind::StreamReadline, Value::Stream(role)) => {
                args.arity(name, 0, 0)?;
                if *role != StreamRole::Input {
                    return Err(Exception::value_error("not readable"));
                }
                Ok(Value::str(read_line(io)?.unwrap_or_default()))
            }
            (_, other) => Err(Exception::attribute_error(other, name)),
        }
    }
}

fn split_whitespace(
    s: &str,
    maxsplit: Option<usize>,
) -> Vec<Value> {
    let Some(max) = maxsplit else {
        return s.split_whitespace().map(Value::str).collect();
    };
    let mut parts = Vec::new();
    let mut rest = s.trim_start();
    while !rest.is_empty() {
        if parts.len() == max {
            parts.push(Value::str(rest));
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                parts.push(Value::str(&rest[..end]));
                rest = rest[end..].trim_start();
            }
            None => {
                parts.push(Value::str(rest));
                break;
            }
        }
    }
    parts
}
