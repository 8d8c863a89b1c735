//! Class registry
//!
//! Named lookup for classes handed over at runtime (plugin tables, script
//! loaders). This is the one place where export targets arrive untyped, so
//! exporting by name goes through the class-likeness check.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::class::Class;
use crate::error::{Error, Result};
use crate::export::{export_type, Dependencies, ExportedMethods};
use crate::value::Value;

/// Registry of classes and other named bindings
#[derive(Default)]
pub struct ClassRegistry {
    /// Classes indexed by ID
    classes: Vec<Arc<Class>>,
    /// Class name to ID mapping
    name_to_id: FxHashMap<String, usize>,
    /// Non-class values bound by name
    bindings: FxHashMap<String, Value>,
}

impl ClassRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class under its own name. Re-registering a name points it
    /// at the new class; IDs are never reused and an old ID keeps resolving
    /// to the class it was issued for.
    pub fn register_class(&mut self, class: Arc<Class>) -> usize {
        let id = self.classes.len();
        let name = class.name().to_string();

        self.bindings.remove(&name);
        self.classes.push(class);
        self.name_to_id.insert(name, id);

        id
    }

    /// Bind an arbitrary value under `name`. Class values are registered as
    /// classes.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match value {
            Value::Class(class) => {
                let id = self.classes.len();
                self.classes.push(class);
                self.bindings.remove(&name);
                self.name_to_id.insert(name, id);
            }
            other => {
                self.name_to_id.remove(&name);
                self.bindings.insert(name, other);
            }
        }
    }

    /// Get class by ID
    pub fn get_class(&self, id: usize) -> Option<&Arc<Class>> {
        self.classes.get(id)
    }

    /// Get class by name
    pub fn get_class_by_name(&self, name: &str) -> Option<&Arc<Class>> {
        self.name_to_id
            .get(name)
            .and_then(|id| self.classes.get(*id))
    }

    /// Whatever is bound under `name`
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.get_class_by_name(name)
            .map(|class| Value::Class(Arc::clone(class)))
            .or_else(|| self.bindings.get(name).cloned())
    }

    /// Construct the class bound under `name` and export its methods
    pub fn export(
        &self,
        name: &str,
        dependencies: impl Into<Dependencies>,
    ) -> Result<ExportedMethods> {
        let target = self
            .lookup(name)
            .ok_or_else(|| Error::UnknownClass(name.to_string()))?;
        export_type(dependencies).export(&target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn greeter() -> Arc<Class> {
        Class::builder("Greeter")
            .constructor(|ctx, args| ctx.set("name", args.first().cloned().unwrap_or_default()))
            .method("greet", |ctx, _| Ok(Value::string(format!("hello {}", ctx.get("name")?))))
            .build()
    }

    #[test]
    fn test_register_class() {
        let mut registry = ClassRegistry::new();
        let id = registry.register_class(greeter());
        assert_eq!(id, 0);
        assert_eq!(registry.get_class(0).unwrap().name(), "Greeter");
        assert!(registry.get_class_by_name("Greeter").is_some());
    }

    #[test]
    fn test_reregister_replaces_name() {
        let mut registry = ClassRegistry::new();
        registry.register_class(greeter());
        let replacement = Class::builder("Greeter").build();
        let id = registry.register_class(Arc::clone(&replacement));
        assert_eq!(id, 1);
        assert!(Arc::ptr_eq(registry.get_class_by_name("Greeter").unwrap(), &replacement));
        assert_eq!(registry.get_class(0).unwrap().members().len(), 1);
    }

    #[test]
    fn test_export_by_name() {
        let mut registry = ClassRegistry::new();
        registry.register_class(greeter());
        let methods = registry.export("Greeter", vec![Value::string("bob")]).unwrap();
        assert_eq!(methods.call("greet", &[]).unwrap(), Value::string("hello bob"));
    }

    #[test]
    fn test_export_unknown_name() {
        let registry = ClassRegistry::new();
        assert!(matches!(
            registry.export("Missing", Dependencies::none()),
            Err(Error::UnknownClass(name)) if name == "Missing"
        ));
    }

    #[test]
    fn test_export_non_class_binding() {
        let mut registry = ClassRegistry::new();
        registry.bind("factory", Value::function("factory", |_| Ok(Value::Null)));
        assert!(matches!(
            registry.export("factory", Dependencies::none()),
            Err(Error::NotAClass { .. })
        ));
        assert!(registry.get_class_by_name("factory").is_none());
        assert!(registry.get_class(0).is_none());
    }

    #[test]
    fn test_rebinding_name_keeps_old_id() {
        let mut registry = ClassRegistry::new();
        let old_id = registry.register_class(greeter());
        registry.bind("Greeter", Value::int(1));

        assert!(registry.get_class_by_name("Greeter").is_none());
        assert_eq!(registry.get_class(old_id).unwrap().name(), "Greeter");
        assert!(matches!(
            registry.export("Greeter", Dependencies::none()),
            Err(Error::NotAClass { .. })
        ));
    }

    #[test]
    fn test_bind_class_value() {
        let mut registry = ClassRegistry::new();
        registry.bind("Alias", Value::Class(greeter()));
        assert_eq!(registry.get_class_by_name("Alias").unwrap().name(), "Greeter");
        assert!(registry.lookup("Alias").unwrap().as_class().is_some());
    }
}
