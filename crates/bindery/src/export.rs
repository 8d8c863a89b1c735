//! Export factory
//!
//! Turns an instance into a plain, ordered map of bound methods, and
//! constructs classes from captured dependencies before doing so. The map
//! holds the live instance and never the class it came from.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::class::{Class, FxIndexMap, MemberKind};
use crate::config::DiscoveryConfig;
use crate::discovery::{discover, Discovered};
use crate::error::{Error, Result};
use crate::instance::{Callable, Instance};
use crate::value::{NativeFunction, Value};

// ============================================================================
// Bound methods
// ============================================================================

/// A method permanently fixed to its receiver
#[derive(Clone)]
pub struct BoundMethod {
    name: Arc<str>,
    receiver: Instance,
    target: Callable,
}

impl BoundMethod {
    /// Exported name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check whether both methods run against the same instance
    pub fn same_receiver(&self, other: &BoundMethod) -> bool {
        self.receiver.ptr_eq(&other.receiver)
    }

    /// Invoke the method. Errors raised by the body are returned as raised.
    #[inline]
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        self.target.invoke(&self.receiver, args)
    }

    /// Convert into a plain function value
    pub fn to_function(&self) -> NativeFunction {
        let method = self.clone();
        NativeFunction::new(Arc::clone(&self.name), move |args| method.call(args))
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Exported method map
// ============================================================================

/// Method name → bound method, in discovery order
#[derive(Clone, Default)]
pub struct ExportedMethods {
    methods: FxIndexMap<String, BoundMethod>,
}

impl ExportedMethods {
    /// Get a bound method by name
    pub fn get(&self, name: &str) -> Option<&BoundMethod> {
        self.methods.get(name)
    }

    /// Invoke an exported method by name
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        match self.methods.get(name) {
            Some(method) => method.call(args),
            None => Err(Error::MemberNotFound {
                owner: "exports".to_string(),
                name: name.to_string(),
            }),
        }
    }

    /// Check if a method is exported
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Exported names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Iterate name/method pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoundMethod)> {
        self.methods.iter().map(|(name, method)| (name.as_str(), method))
    }

    /// Get number of exported methods
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Check if nothing was exported
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl IntoIterator for ExportedMethods {
    type Item = (String, BoundMethod);
    type IntoIter = indexmap::map::IntoIter<String, BoundMethod>;

    fn into_iter(self) -> Self::IntoIter {
        self.methods.into_iter()
    }
}

impl fmt::Debug for ExportedMethods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.methods.keys()).finish()
    }
}

/// Export the public methods of an existing instance
pub fn export_methods(instance: &Instance) -> ExportedMethods {
    export_methods_with(instance, &DiscoveryConfig::default())
}

/// Export the public methods of an existing instance under a custom config
pub fn export_methods_with(instance: &Instance, config: &DiscoveryConfig) -> ExportedMethods {
    let mut methods = FxIndexMap::default();
    for found in discover(instance, config) {
        match resolve(instance, &found) {
            Some(target) => {
                let method = BoundMethod {
                    name: found.name.as_str().into(),
                    receiver: instance.clone(),
                    target,
                };
                methods.insert(found.name, method);
            }
            // Own property replaced between discovery and binding
            None => debug!(name = %found.name, "discovered member no longer callable"),
        }
    }
    ExportedMethods { methods }
}

// Binds the member found at the level it was discovered on, so an own data
// property cannot hide a discovered class method.
fn resolve(instance: &Instance, found: &Discovered) -> Option<Callable> {
    match &found.origin {
        None => instance
            .field(found.key.clone())
            .and_then(|value| value.as_function().cloned())
            .map(Callable::Function),
        Some(class) => match class.members().get(&found.key).map(|member| &member.kind) {
            Some(MemberKind::Method(body)) => Some(Callable::Method {
                owner: Arc::clone(class),
                body: Arc::clone(body),
            }),
            Some(MemberKind::Data(Value::Function(func))) => Some(Callable::Function(func.clone())),
            _ => None,
        },
    }
}

// ============================================================================
// Dependencies
// ============================================================================

/// Ordered constructor arguments
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dependencies {
    values: Vec<Value>,
}

impl Dependencies {
    /// Use `values` as the argument list, as given
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// No dependencies
    pub fn none() -> Self {
        Self::default()
    }

    /// Variadic form: a single non-empty list argument is the list itself,
    /// anything else is taken positionally
    pub fn from_args(args: Vec<Value>) -> Self {
        if let [Value::List(items)] = args.as_slice() {
            if !items.is_empty() {
                return Self {
                    values: items.to_vec(),
                };
            }
        }
        Self { values: args }
    }

    /// Arguments in order
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    /// Get number of dependencies
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no dependencies
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Take the argument list
    pub fn into_vec(self) -> Vec<Value> {
        self.values
    }
}

impl From<Vec<Value>> for Dependencies {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl<const N: usize> From<[Value; N]> for Dependencies {
    fn from(values: [Value; N]) -> Self {
        Self::new(values.into())
    }
}

impl FromIterator<Value> for Dependencies {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

// ============================================================================
// Type exporter
// ============================================================================

/// Check whether `value` can be handed to [`TypeExporter::export`]
pub fn is_class_like(value: &Value) -> bool {
    matches!(value, Value::Class(_))
}

/// First stage of [`export_type`]: dependencies captured, class pending
#[derive(Clone, Debug)]
pub struct TypeExporter {
    dependencies: Dependencies,
    config: DiscoveryConfig,
}

/// Capture dependencies for a later one-shot construction and export
pub fn export_type(dependencies: impl Into<Dependencies>) -> TypeExporter {
    TypeExporter {
        dependencies: dependencies.into(),
        config: DiscoveryConfig::default(),
    }
}

impl TypeExporter {
    /// Use a custom discovery config
    pub fn with_config(mut self, config: DiscoveryConfig) -> Self {
        self.config = config;
        self
    }

    /// Captured dependencies
    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    /// Validate `ty`, construct it with the captured dependencies and export
    /// the new instance. Anything but a class fails with `NotAClass` before
    /// construction is attempted.
    pub fn export(&self, ty: &Value) -> Result<ExportedMethods> {
        match ty {
            Value::Class(class) => self.export_class(class),
            other => {
                debug!(found = %other.describe(), "rejected export target");
                Err(Error::NotAClass {
                    found: other.describe(),
                })
            }
        }
    }

    /// Construct `class` with the captured dependencies and export the new
    /// instance. Every call builds a fresh instance.
    pub fn export_class(&self, class: &Arc<Class>) -> Result<ExportedMethods> {
        let instance = class.construct(self.dependencies.as_slice())?;
        let methods = export_methods_with(&instance, &self.config);
        debug!(
            class = class.name(),
            dependencies = self.dependencies.len(),
            methods = methods.len(),
            "exported class"
        );
        Ok(methods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_args_flattens_single_list() {
        let deps = Dependencies::from_args(vec![Value::list(vec![Value::int(1), Value::int(2)])]);
        assert_eq!(deps.as_slice(), &[Value::int(1), Value::int(2)]);
    }

    #[test]
    fn test_from_args_positional() {
        let deps = Dependencies::from_args(vec![Value::int(1), Value::int(2)]);
        assert_eq!(deps.len(), 2);

        let two_lists = Dependencies::from_args(vec![
            Value::list(vec![Value::int(1)]),
            Value::list(vec![Value::int(2)]),
        ]);
        assert_eq!(two_lists.len(), 2);
        assert!(two_lists.as_slice()[0].as_list().is_some());
    }

    #[test]
    fn test_from_args_empty_list_is_scalar() {
        let deps = Dependencies::from_args(vec![Value::list(Vec::new())]);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps.as_slice()[0].as_list().map(<[Value]>::len), Some(0));

        assert!(Dependencies::from_args(Vec::new()).is_empty());
    }

    #[test]
    fn test_explicit_list_not_flattened() {
        let list = Value::list(vec![Value::int(1), Value::int(2)]);
        let deps = Dependencies::new(vec![list.clone()]);
        assert_eq!(deps.as_slice(), &[list]);
    }

    #[test]
    fn test_is_class_like() {
        assert!(is_class_like(&Value::Class(Class::builder("A").build())));
        assert!(!is_class_like(&Value::function("f", |_| Ok(Value::Null))));
        assert!(!is_class_like(&Value::int(1)));
        assert!(!is_class_like(&Value::Null));
    }

    #[test]
    fn test_export_rejects_values() {
        let exporter = export_type(Dependencies::none());
        let plain_function = Value::function("badClass", |_| Ok(Value::Null));
        match exporter.export(&plain_function) {
            Err(Error::NotAClass { found }) => assert_eq!(found, "function badClass"),
            other => panic!("expected NotAClass, got {:?}", other.map(|m| m.len())),
        }

        let instance = Class::builder("A").build().construct(&[]).unwrap();
        assert!(matches!(
            exporter.export(&Value::Object(instance)),
            Err(Error::NotAClass { .. })
        ));
    }

    #[test]
    fn test_same_receiver() {
        let class = Class::builder("Pair")
            .method("left", |_, _| Ok(Value::int(1)))
            .method("right", |_, _| Ok(Value::int(2)))
            .build();
        let exporter = export_type(Dependencies::none());
        let first = exporter.export_class(&class).unwrap();
        let second = exporter.export_class(&class).unwrap();

        let left = first.get("left").unwrap();
        assert!(left.same_receiver(first.get("right").unwrap()));
        assert!(!left.same_receiver(second.get("left").unwrap()));
        assert!(left.receiver.is_instance_of(&class));
    }

    #[test]
    fn test_debug_hides_class() {
        let class = Class::builder("HiddenService")
            .method("run", |_, _| Ok(Value::Null))
            .build();
        let methods = export_type(Dependencies::none()).export_class(&class).unwrap();
        let rendered = format!("{:?} {:?}", methods, methods.get("run").unwrap());
        assert!(rendered.contains("run"));
        assert!(!rendered.contains("HiddenService"));
    }

    #[test]
    fn test_missing_export_call() {
        let methods = ExportedMethods::default();
        assert!(methods.is_empty());
        assert!(matches!(
            methods.call("nothing", &[]),
            Err(Error::MemberNotFound { .. })
        ));
    }

    #[test]
    fn test_own_data_does_not_hide_class_method() {
        let class = Class::builder("Shadowed")
            .constructor(|ctx, _| ctx.set("run", 1i64))
            .method("run", |_, _| Ok(Value::string("method")))
            .build();
        let instance = class.construct(&[]).unwrap();
        let methods = export_methods(&instance);
        assert_eq!(methods.names().collect::<Vec<_>>(), vec!["run"]);
        assert_eq!(methods.call("run", &[]).unwrap(), Value::string("method"));
    }
}
