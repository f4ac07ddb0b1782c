//! Dynamic values and callable members
//!
//! [`Value`] is what attribute reads return and what method calls take.
//! Objects are shared handles, so two values holding the same
//! [`ObjectRef`] compare equal by identity, never by content.

use std::fmt;
use std::rc::Rc;

use crate::error::{ProxyError, Result};
use crate::object::ObjectRef;

/// Native method body.
///
/// Receives the receiver object and the positional arguments.
pub type MethodFn = dyn Fn(&ObjectRef, &[Value]) -> Result<Value>;

/// An unbound method stored in a class member table.
#[derive(Clone)]
pub struct Method {
    name: Rc<str>,
    func: Rc<MethodFn>,
}

impl Method {
    /// Create a method from a closure
    pub fn new<F>(name: impl Into<Rc<str>>, func: F) -> Self
    where
        F: Fn(&ObjectRef, &[Value]) -> Result<Value> + 'static,
    {
        Method {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the body against `receiver`
    pub fn invoke(&self, receiver: &ObjectRef, args: &[Value]) -> Result<Value> {
        (self.func)(receiver, args)
    }

    /// Bind to a receiver
    pub fn bind(&self, receiver: &ObjectRef) -> BoundMethod {
        BoundMethod {
            receiver: receiver.clone(),
            method: self.clone(),
        }
    }

    /// Two methods are the same if they share a body
    pub fn ptr_eq(&self, other: &Method) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.func), Rc::as_ptr(&other.func))
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<method {}>", self.name)
    }
}

/// A method together with the object it was looked up on.
///
/// Delegated lookups bind to the proxied object, not the proxy, so the
/// body always sees the object that actually declares it.
#[derive(Clone)]
pub struct BoundMethod {
    receiver: ObjectRef,
    method: Method,
}

impl BoundMethod {
    /// The object `self` refers to inside the body
    pub fn receiver(&self) -> &ObjectRef {
        &self.receiver
    }

    /// The underlying method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Call with positional arguments
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        self.method.invoke(&self.receiver, args)
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<bound method {}.{}>",
            self.receiver.class().name(),
            self.method.name
        )
    }
}

/// Dynamic value
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absence of a value
    #[default]
    None,
    /// Boolean
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Immutable string
    Str(Rc<str>),
    /// Immutable list
    List(Rc<[Value]>),
    /// Shared object handle
    Object(ObjectRef),
    /// Method bound to its receiver
    Method(BoundMethod),
}

impl Value {
    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Method(_) => "method",
        }
    }

    /// Check if this is [`Value::None`]
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as float; integers widen
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get as list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get as object handle
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Get as bound method
    pub fn as_method(&self) -> Option<&BoundMethod> {
        match self {
            Value::Method(m) => Some(m),
            _ => None,
        }
    }

    /// Convert into a Rust type
    pub fn extract<T: FromValue>(&self) -> Result<T> {
        T::from_value(self)
    }

    /// Call this value if it is a bound method
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        match self {
            Value::Method(m) => m.call(args),
            other => Err(ProxyError::NotCallable {
                member: other.to_string(),
                kind: other.type_name(),
            }),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Method(a), Value::Method(b)) => {
                a.receiver.ptr_eq(&b.receiver) && a.method.ptr_eq(&b.method)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(obj) => write!(f, "<{} object>", obj.class().name()),
            Value::Method(m) => write!(f, "{:?}", m),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::None
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Rc::from(items))
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<BoundMethod> for Value {
    fn from(m: BoundMethod) -> Self {
        Value::Method(m)
    }
}

/// Convert from [`Value`] to a Rust type.
pub trait FromValue: Sized {
    /// Convert, failing with [`ProxyError::TypeMismatch`]
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch(expected: &'static str, value: &Value) -> ProxyError {
    ProxyError::TypeMismatch {
        expected,
        got: value.type_name(),
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch("bool", value))
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_int().ok_or_else(|| mismatch("int", value))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_float().ok_or_else(|| mismatch("float", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("str", value))
    }
}

impl FromValue for ObjectRef {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_object()
            .cloned()
            .ok_or_else(|| mismatch("object", value))
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

/// Fail with [`ProxyError::MethodArgumentMismatch`] unless `args` has
/// exactly `expected` elements.
pub fn check_arity(method: &str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ProxyError::MethodArgumentMismatch {
            method: method.to_string(),
            expected,
            got: args.len(),
        })
    }
}
