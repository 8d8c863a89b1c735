//! Dynamic values passed to constructors and methods
//!
//! Scalars are stored inline; strings and lists are shared `Arc` slices so
//! cloning a `Value` never copies payload data. Instances, classes and
//! functions are reference handles.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::class::Class;
use crate::error::{Error, Result};
use crate::instance::Instance;

// ============================================================================
// Symbol
// ============================================================================

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(0);

/// Unique symbol-like member key.
///
/// Two symbols with the same description are still distinct keys. For
/// comparison and storage in discovery output a symbol is stringified as
/// `Symbol(<description>)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Symbol {
    id: u64,
    description: Arc<str>,
}

impl Symbol {
    /// Create a fresh symbol
    pub fn new(description: impl Into<Arc<str>>) -> Self {
        Self {
            id: NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed),
            description: description.into(),
        }
    }

    /// Symbol description
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}

// ============================================================================
// Native Function
// ============================================================================

/// Plain function body (no receiver)
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// Named, shareable function value
#[derive(Clone)]
pub struct NativeFunction {
    name: Arc<str>,
    func: Arc<NativeFn>,
}

impl NativeFunction {
    /// Wrap a closure as a function value
    pub fn new(
        name: impl Into<Arc<str>>,
        func: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the function
    #[inline]
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.func)(args)
    }

    /// Check whether both handles point at the same function body
    pub fn ptr_eq(&self, other: &NativeFunction) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

// ============================================================================
// Value
// ============================================================================

/// Dynamic value
#[derive(Clone)]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Immutable UTF-8 string
    Str(Arc<str>),
    /// Immutable ordered list
    List(Arc<[Value]>),
    /// Class instance
    Object(Instance),
    /// Class descriptor
    Class(Arc<Class>),
    /// Plain function
    Function(NativeFunction),
    /// Opaque host value (credential providers, clients, ...)
    Host(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Create a null value
    #[inline]
    pub const fn null() -> Self {
        Value::Null
    }

    /// Create a boolean value
    #[inline]
    pub const fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    /// Create an integer value
    #[inline]
    pub const fn int(i: i64) -> Self {
        Value::Int(i)
    }

    /// Create a float value
    #[inline]
    pub const fn float(f: f64) -> Self {
        Value::Float(f)
    }

    /// Create a string value
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// Create a list value
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    /// Wrap an arbitrary host value
    pub fn host<T: Any + Send + Sync>(value: T) -> Self {
        Value::Host(Arc::new(value))
    }

    /// Wrap a closure as a function value
    pub fn function(
        name: impl Into<Arc<str>>,
        func: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Value::Function(NativeFunction::new(name, func))
    }

    /// Check if this is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if the value can be called directly
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Get as boolean if this is a bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer if this is an int
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

    /// Get as string slice if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(&**s),
            _ => None,
        }
    }

    /// Get list elements if this is a list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(&items[..]),
            _ => None,
        }
    }

    /// Get the instance handle if this is an object
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// Get the class descriptor if this is a class
    pub fn as_class(&self) -> Option<&Arc<Class>> {
        match self {
            Value::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Get the function if this is a function
    pub fn as_function(&self) -> Option<&NativeFunction> {
        match self {
            Value::Function(func) => Some(func),
            _ => None,
        }
    }

    /// Borrow a host value of a concrete type
    pub fn downcast_host<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Host(host) => host.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Short type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Class(_) => "class",
            Value::Function(_) => "function",
            Value::Host(_) => "host",
        }
    }

    /// Human-readable description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => format!("boolean {b}"),
            Value::Int(i) => format!("int {i}"),
            Value::Float(f) => format!("float {f}"),
            Value::Str(s) => format!("string {s:?}"),
            Value::List(items) => format!("list of {} items", items.len()),
            Value::Object(instance) => format!("instance of {}", instance.class().name()),
            Value::Class(class) => format!("class {}", class.name()),
            Value::Function(func) => format!("function {}", func.name()),
            Value::Host(_) => "host value".to_string(),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Class(a), Value::Class(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Host(a), Value::Host(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Object(instance) => write!(f, "Object({})", instance.class().name()),
            Value::Class(class) => write!(f, "Class({})", class.name()),
            Value::Function(func) => write!(f, "Function({})", func.name()),
            Value::Host(_) => write!(f, "Host(..)"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Object(instance) => write!(f, "[object {}]", instance.class().name()),
            Value::Class(class) => write!(f, "class {}", class.name()),
            Value::Function(func) => write!(f, "function {}", func.name()),
            Value::Host(_) => write!(f, "[host]"),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
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
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items.into())
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Object(instance)
    }
}

impl From<Arc<Class>> for Value {
    fn from(class: Arc<Class>) -> Self {
        Value::Class(class)
    }
}

impl From<NativeFunction> for Value {
    fn from(func: NativeFunction) -> Self {
        Value::Function(func)
    }
}

// ============================================================================
// Value Conversion
// ============================================================================

/// Convert from a `Value` to a Rust type.
///
/// Implemented for the types method bodies commonly pull out of their
/// argument slice.
pub trait FromValue: Sized {
    /// Convert, returning `TypeMismatch` if the variant doesn't match
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch(expected: &str, got: &Value) -> Error {
    Error::TypeMismatch {
        expected: expected.to_string(),
        got: got.type_name().to_string(),
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch("boolean", value))
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
            .ok_or_else(|| mismatch("string", value))
    }
}

impl FromValue for Instance {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_instance().cloned().ok_or_else(|| mismatch("object", value))
    }
}

/// Extract the argument at `index`, converting it to `T`
pub fn arg<T: FromValue>(args: &[Value], index: usize) -> Result<T> {
    let value = args.get(index).ok_or_else(|| {
        Error::ArgumentError(format!(
            "missing argument {} (got {} arguments)",
            index,
            args.len()
        ))
    })?;
    T::from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_accessors() {
        assert!(Value::null().is_null());
        assert_eq!(Value::bool(true).as_bool(), Some(true));
        assert_eq!(Value::int(42).as_int(), Some(42));
        assert_eq!(Value::int(2).as_float(), Some(2.0));
        assert_eq!(Value::string("hello").as_str(), Some("hello"));
        assert_eq!(Value::int(1).as_str(), None);
    }

    #[test]
    fn test_symbols_are_unique() {
        let a = Symbol::new("iterator");
        let b = Symbol::new("iterator");
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "Symbol(iterator)");
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_function_value() {
        let double = Value::function("double", |args| Ok(Value::int(arg::<i64>(args, 0)? * 2)));
        assert!(double.is_callable());
        let result = double.as_function().unwrap().call(&[Value::int(21)]).unwrap();
        assert_eq!(result, Value::int(42));
    }

    #[test]
    fn test_host_downcast() {
        struct Token(&'static str);
        let value = Value::host(Token("secret"));
        assert_eq!(value.downcast_host::<Token>().map(|t| t.0), Some("secret"));
        assert!(value.downcast_host::<String>().is_none());
    }

    #[test]
    fn test_arg_errors() {
        let args = [Value::string("x")];
        assert!(matches!(arg::<i64>(&args, 0), Err(Error::TypeMismatch { .. })));
        assert!(matches!(arg::<String>(&args, 1), Err(Error::ArgumentError(_))));
        assert_eq!(arg::<String>(&args, 0).unwrap(), "x");
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::list(vec![Value::int(1), Value::string("a")]).to_string(), "1,a");
        assert_eq!(Value::null().to_string(), "null");
    }
}
