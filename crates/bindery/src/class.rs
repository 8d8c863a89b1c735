//! Class model
//!
//! A [`Class`] is a runtime descriptor: a name, an optional constructor, a
//! parent link and a [`MemberTable`] holding the members declared directly on
//! it, in declaration order. Every hierarchy is rooted at the sentinel returned
//! by [`Class::root`], which carries the universal built-ins.

use std::fmt;
use std::hash::BuildHasherDefault;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use rustc_hash::FxHasher;

use crate::error::Result;
use crate::instance::{construct, CallContext, Instance};
use crate::value::{arg, Symbol, Value};

pub(crate) type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Reserved member name for constructors
pub const CONSTRUCTOR: &str = "constructor";

/// Method body: receives the call context (receiver + defining class) and arguments
pub type MethodFn = dyn Fn(&CallContext<'_>, &[Value]) -> Result<Value> + Send + Sync;

/// Constructor body: initializes the receiver from the constructor arguments
pub type ConstructorFn = dyn Fn(&CallContext<'_>, &[Value]) -> Result<()> + Send + Sync;

/// Getter body
pub type GetterFn = dyn Fn(&CallContext<'_>) -> Result<Value> + Send + Sync;

/// Setter body
pub type SetterFn = dyn Fn(&CallContext<'_>, Value) -> Result<()> + Send + Sync;

// ============================================================================
// Member keys and members
// ============================================================================

/// Member identifier: a string name or a symbol
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemberKey {
    /// String-named member
    Name(String),
    /// Symbol-keyed member
    Symbol(Symbol),
}

impl MemberKey {
    /// The string name, if this is not a symbol key
    pub fn as_name(&self) -> Option<&str> {
        match self {
            MemberKey::Name(name) => Some(name),
            MemberKey::Symbol(_) => None,
        }
    }

    /// Check if this is a symbol key
    pub fn is_symbol(&self) -> bool {
        matches!(self, MemberKey::Symbol(_))
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKey::Name(name) => f.write_str(name),
            MemberKey::Symbol(symbol) => write!(f, "{symbol}"),
        }
    }
}

impl From<&str> for MemberKey {
    fn from(name: &str) -> Self {
        MemberKey::Name(name.to_string())
    }
}

impl From<String> for MemberKey {
    fn from(name: String) -> Self {
        MemberKey::Name(name)
    }
}

impl From<&String> for MemberKey {
    fn from(name: &String) -> Self {
        MemberKey::Name(name.clone())
    }
}

impl From<Symbol> for MemberKey {
    fn from(symbol: Symbol) -> Self {
        MemberKey::Symbol(symbol)
    }
}

impl From<&Symbol> for MemberKey {
    fn from(symbol: &Symbol) -> Self {
        MemberKey::Symbol(symbol.clone())
    }
}

/// Member access control
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Visibility {
    /// Visible to discovery and export
    #[default]
    Public,
    /// Callable on the instance, never exported
    Private,
}

/// What a member is
#[derive(Clone)]
pub enum MemberKind {
    /// Directly invocable method
    Method(Arc<MethodFn>),
    /// Computed read accessor
    Getter(Arc<GetterFn>),
    /// Computed write accessor
    Setter(Arc<SetterFn>),
    /// Getter and setter pair under one key
    Accessor {
        /// Read half
        get: Arc<GetterFn>,
        /// Write half
        set: Arc<SetterFn>,
    },
    /// Plain data value stored on the class
    Data(Value),
}

/// A class member
#[derive(Clone)]
pub struct Member {
    /// Member kind
    pub kind: MemberKind,
    /// Access control
    pub visibility: Visibility,
}

impl Member {
    /// Create a public member
    pub fn new(kind: MemberKind) -> Self {
        Self {
            kind,
            visibility: Visibility::Public,
        }
    }

    /// Create a private member
    pub fn private(kind: MemberKind) -> Self {
        Self {
            kind,
            visibility: Visibility::Private,
        }
    }

    /// Only plain methods count; accessors never do, data only when callable
    pub fn is_method(&self) -> bool {
        match &self.kind {
            MemberKind::Method(_) => true,
            MemberKind::Data(value) => value.is_callable(),
            _ => false,
        }
    }

    /// Check if the member is a getter, setter or accessor pair
    pub fn is_accessor(&self) -> bool {
        matches!(
            self.kind,
            MemberKind::Getter(_) | MemberKind::Setter(_) | MemberKind::Accessor { .. }
        )
    }

    fn kind_name(&self) -> &'static str {
        match self.kind {
            MemberKind::Method(_) => "method",
            MemberKind::Getter(_) => "getter",
            MemberKind::Setter(_) => "setter",
            MemberKind::Accessor { .. } => "accessor",
            MemberKind::Data(_) => "data",
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("kind", &self.kind_name())
            .field("visibility", &self.visibility)
            .finish()
    }
}

// ============================================================================
// Member table
// ============================================================================

/// Members declared directly on one class, in declaration order
#[derive(Clone, Default)]
pub struct MemberTable {
    members: FxIndexMap<MemberKey, Member>,
}

impl MemberTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a member. Redeclaring a key replaces the member but keeps
    /// the key at its first position.
    pub fn insert(&mut self, key: MemberKey, member: Member) {
        self.members.insert(key, member);
    }

    /// Get a member by key
    pub fn get(&self, key: &MemberKey) -> Option<&Member> {
        self.members.get(key)
    }

    /// Check if a key is declared
    pub fn contains(&self, key: &MemberKey) -> bool {
        self.members.contains_key(key)
    }

    /// Iterate members in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&MemberKey, &Member)> {
        self.members.iter()
    }

    /// Get number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

// ============================================================================
// Class
// ============================================================================

/// Class descriptor
pub struct Class {
    name: String,
    parent: Option<Arc<Class>>,
    constructor: Option<Arc<ConstructorFn>>,
    members: MemberTable,
    root: bool,
}

fn builtin(
    body: impl Fn(&CallContext<'_>, &[Value]) -> Result<Value> + Send + Sync + 'static,
) -> Member {
    Member::new(MemberKind::Method(Arc::new(body)))
}

static ROOT: Lazy<Arc<Class>> = Lazy::new(|| {
    let mut members = MemberTable::new();
    members.insert(
        "toString".into(),
        builtin(|ctx, _| Ok(Value::string(format!("[object {}]", ctx.this().class().name())))),
    );
    members.insert(
        "valueOf".into(),
        builtin(|ctx, _| Ok(Value::Object(ctx.this().clone()))),
    );
    members.insert(
        "hasOwnProperty".into(),
        builtin(|ctx, args| {
            let name: String = arg(args, 0)?;
            Ok(Value::bool(ctx.this().has_own(&MemberKey::Name(name))))
        }),
    );
    Arc::new(Class {
        name: "Object".to_string(),
        parent: None,
        constructor: None,
        members,
        root: true,
    })
});

impl Class {
    /// Start declaring a class extending the root sentinel
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(name)
    }

    /// The root sentinel every hierarchy ends in
    pub fn root() -> Arc<Class> {
        Arc::clone(&ROOT)
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct parent. Only the root sentinel has none.
    pub fn parent(&self) -> Option<&Arc<Class>> {
        self.parent.as_ref()
    }

    /// Check if this is the root sentinel
    pub fn is_root(&self) -> bool {
        self.root
    }

    /// Members declared directly on this class
    pub fn members(&self) -> &MemberTable {
        &self.members
    }

    /// Constructor declared directly on this class
    pub fn constructor(&self) -> Option<&Arc<ConstructorFn>> {
        self.constructor.as_ref()
    }

    /// This class followed by each ancestor up to and including the root
    pub fn ancestors(self: &Arc<Self>) -> impl Iterator<Item = Arc<Class>> {
        std::iter::successors(Some(Arc::clone(self)), |class| class.parent.clone())
    }

    /// Resolve a member along the chain, most-derived first. Returns the
    /// declaring class together with the member.
    pub fn lookup(self: &Arc<Self>, key: &MemberKey) -> Option<(Arc<Class>, Member)> {
        self.ancestors().find_map(|class| {
            let member = class.members.get(key).cloned();
            member.map(|member| (class, member))
        })
    }

    /// Check whether `other` appears in this class's chain
    pub fn is_subclass_of(self: &Arc<Self>, other: &Arc<Class>) -> bool {
        self.ancestors().any(|class| Arc::ptr_eq(&class, other))
    }

    /// Instantiate the class, running the constructor chain with `args`.
    /// Constructor errors are returned as raised.
    pub fn construct(self: &Arc<Self>, args: &[Value]) -> Result<Instance> {
        construct(self, args)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("members", &self.members.len())
            .field("has_constructor", &self.constructor.is_some())
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Declares a class member by member
pub struct ClassBuilder {
    name: String,
    parent: Arc<Class>,
    constructor: Option<Arc<ConstructorFn>>,
    members: MemberTable,
}

impl ClassBuilder {
    /// Create a builder for a class extending the root sentinel
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: Class::root(),
            constructor: None,
            members: MemberTable::new(),
        }
    }

    /// Set the parent class
    pub fn extends(mut self, parent: &Arc<Class>) -> Self {
        self.parent = Arc::clone(parent);
        self
    }

    /// Set the constructor
    pub fn constructor(
        mut self,
        body: impl Fn(&CallContext<'_>, &[Value]) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.constructor = Some(Arc::new(body));
        self
    }

    /// Declare a public method
    pub fn method(
        mut self,
        key: impl Into<MemberKey>,
        body: impl Fn(&CallContext<'_>, &[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.members
            .insert(key.into(), Member::new(MemberKind::Method(Arc::new(body))));
        self
    }

    /// Declare a private method
    pub fn private_method(
        mut self,
        key: impl Into<MemberKey>,
        body: impl Fn(&CallContext<'_>, &[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.members
            .insert(key.into(), Member::private(MemberKind::Method(Arc::new(body))));
        self
    }

    /// Declare a getter. Combines with an existing setter of the same key.
    pub fn getter(
        mut self,
        key: impl Into<MemberKey>,
        body: impl Fn(&CallContext<'_>) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        let key = key.into();
        let get: Arc<GetterFn> = Arc::new(body);
        let kind = match self.members.get(&key).map(|m| &m.kind) {
            Some(MemberKind::Setter(set)) | Some(MemberKind::Accessor { set, .. }) => {
                MemberKind::Accessor {
                    get,
                    set: Arc::clone(set),
                }
            }
            _ => MemberKind::Getter(get),
        };
        self.members.insert(key, Member::new(kind));
        self
    }

    /// Declare a setter. Combines with an existing getter of the same key.
    pub fn setter(
        mut self,
        key: impl Into<MemberKey>,
        body: impl Fn(&CallContext<'_>, Value) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        let key = key.into();
        let set: Arc<SetterFn> = Arc::new(body);
        let kind = match self.members.get(&key).map(|m| &m.kind) {
            Some(MemberKind::Getter(get)) | Some(MemberKind::Accessor { get, .. }) => {
                MemberKind::Accessor {
                    get: Arc::clone(get),
                    set,
                }
            }
            _ => MemberKind::Setter(set),
        };
        self.members.insert(key, Member::new(kind));
        self
    }

    /// Declare a data member on the class
    pub fn data(mut self, key: impl Into<MemberKey>, value: impl Into<Value>) -> Self {
        self.members
            .insert(key.into(), Member::new(MemberKind::Data(value.into())));
        self
    }

    /// Declare an arbitrary member
    pub fn member(mut self, key: impl Into<MemberKey>, member: Member) -> Self {
        self.members.insert(key.into(), member);
        self
    }

    /// Finish the class
    pub fn build(self) -> Arc<Class> {
        Arc::new(Class {
            name: self.name,
            parent: Some(self.parent),
            constructor: self.constructor,
            members: self.members,
            root: false,
        })
    }
}
