//! Bindery - method discovery and one-shot export of class instances
//!
//! Bindery carries a small dynamic object model (classes with parent links
//! and ordered member tables, instances with own properties) and two
//! operations on top of it:
//!
//! - [`discover_public_methods`] walks an instance's chain and lists its
//!   public method names, most-derived first.
//! - [`export_type`] captures constructor dependencies, then constructs a
//!   class with them and returns its public methods as [`BoundMethod`]s keyed
//!   by name. The caller never sees the class or how it was built.
//!
//! # Example
//!
//! ```ignore
//! use bindery::{export_type, Class, Value};
//!
//! let service = Class::builder("ExampleService")
//!     .constructor(|ctx, args| {
//!         ctx.set("token", args[0].clone())?;
//!         ctx.set("salt", "$salt_")
//!     })
//!     .method("generateSaltedToken", |ctx, _| {
//!         let token = ctx.get("token")?;
//!         let token = token.as_instance().unwrap().call("generateToken", &[])?;
//!         Ok(Value::string(format!("{}{}", ctx.get("salt")?, token)))
//!     })
//!     .build();
//!
//! let exported = export_type(vec![token_provider]).export_class(&service)?;
//! exported.call("generateSaltedToken", &[])?;
//! ```

#![warn(missing_docs)]

pub mod class;
pub mod config;
pub mod discovery;
pub mod error;
pub mod export;
pub mod instance;
pub mod registry;
pub mod value;

pub use class::{
    Class, ClassBuilder, ConstructorFn, GetterFn, Member, MemberKey, MemberKind, MemberTable,
    MethodFn, SetterFn, Visibility, CONSTRUCTOR,
};
pub use config::DiscoveryConfig;
pub use discovery::{discover_public_methods, discover_public_methods_with};
pub use error::{Error, Result};
pub use export::{
    export_methods, export_methods_with, export_type, is_class_like, BoundMethod, Dependencies,
    ExportedMethods, TypeExporter,
};
pub use instance::{CallContext, Instance};
pub use registry::ClassRegistry;
pub use value::{arg, FromValue, NativeFn, NativeFunction, Symbol, Value};
