//! Object instances and the call context handed to member bodies

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::trace;

use crate::class::{Class, FxIndexMap, Member, MemberKey, MemberKind, MethodFn};
use crate::error::{Error, Result};
use crate::value::{NativeFunction, Value};

/// Object instance (reference-counted handle)
///
/// Cloning the handle shares the instance. Own properties live behind a
/// lock so bound methods stay usable from several threads; no lock is held
/// while user code runs.
#[derive(Clone)]
pub struct Instance {
    inner: Arc<InstanceInner>,
}

struct InstanceInner {
    class: Arc<Class>,
    properties: RwLock<FxIndexMap<MemberKey, Value>>,
}

impl Instance {
    /// Allocate an instance with no own properties, without running constructors
    pub(crate) fn allocate(class: &Arc<Class>) -> Self {
        Self {
            inner: Arc::new(InstanceInner {
                class: Arc::clone(class),
                properties: RwLock::new(FxIndexMap::default()),
            }),
        }
    }

    /// Class this instance was constructed from
    pub fn class(&self) -> &Arc<Class> {
        &self.inner.class
    }

    /// Read an own property, bypassing accessors and the class chain
    pub fn field(&self, key: impl Into<MemberKey>) -> Option<Value> {
        self.own(&key.into())
    }

    /// Write an own property, bypassing setters
    pub fn define(&self, key: impl Into<MemberKey>, value: impl Into<Value>) {
        self.inner.properties.write().insert(key.into(), value.into());
    }

    /// Check if the instance itself has the property
    pub fn has_own(&self, key: &MemberKey) -> bool {
        self.inner.properties.read().contains_key(key)
    }

    /// Snapshot of own properties in insertion order
    pub fn own_properties(&self) -> Vec<(MemberKey, Value)> {
        self.inner
            .properties
            .read()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Property read: own properties first, then the class chain. Methods
    /// come back as functions bound to this instance, getters are invoked,
    /// absent members read as null.
    ///
    /// A method read this way does not keep the instance alive, so storing it
    /// back on the instance creates no cycle.
    pub fn get(&self, key: impl Into<MemberKey>) -> Result<Value> {
        let key = key.into();
        if let Some(value) = self.own(&key) {
            return Ok(value);
        }
        match self.inner.class.lookup(&key) {
            Some((owner, member)) => match member.kind {
                MemberKind::Method(body) => {
                    let callable = Callable::Method { owner, body };
                    Ok(Value::Function(callable.bind(self, &key)))
                }
                MemberKind::Getter(get) | MemberKind::Accessor { get, .. } => {
                    get(&CallContext::new(self, &owner))
                }
                MemberKind::Setter(_) => Ok(Value::Null),
                MemberKind::Data(value) => Ok(value),
            },
            None => Ok(Value::Null),
        }
    }

    /// Property write: runs a setter declared on the chain, otherwise stores
    /// an own property
    pub fn set(&self, key: impl Into<MemberKey>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        match self.inner.class.lookup(&key) {
            Some((
                owner,
                Member {
                    kind: MemberKind::Setter(set) | MemberKind::Accessor { set, .. },
                    ..
                },
            )) => set(&CallContext::new(self, &owner), value),
            Some((
                owner,
                Member {
                    kind: MemberKind::Getter(_),
                    ..
                },
            )) => Err(Error::ReadOnlyProperty {
                owner: owner.name().to_string(),
                name: key.to_string(),
            }),
            _ => {
                self.inner.properties.write().insert(key, value);
                Ok(())
            }
        }
    }

    /// Invoke a member with this instance as receiver
    pub fn call(&self, key: impl Into<MemberKey>, args: &[Value]) -> Result<Value> {
        let key = key.into();
        match self.resolve(&key) {
            Some(callable) => callable.invoke(self, args),
            None if self.has_own(&key) || self.inner.class.lookup(&key).is_some() => {
                Err(Error::NotCallable {
                    owner: self.inner.class.name().to_string(),
                    name: key.to_string(),
                })
            }
            None => Err(Error::MemberNotFound {
                owner: self.inner.class.name().to_string(),
                name: key.to_string(),
            }),
        }
    }

    /// Check if the instance was constructed from `class` or a subclass
    pub fn is_instance_of(&self, class: &Arc<Class>) -> bool {
        self.inner.class.is_subclass_of(class)
    }

    /// Check whether both handles point at the same instance
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Resolve the directly invocable member behind `key`. A non-function
    /// own property shadows class methods and resolves to nothing.
    pub(crate) fn resolve(&self, key: &MemberKey) -> Option<Callable> {
        if let Some(value) = self.own(key) {
            return value.as_function().cloned().map(Callable::Function);
        }
        let (owner, member) = self.inner.class.lookup(key)?;
        match member.kind {
            MemberKind::Method(body) => Some(Callable::Method { owner, body }),
            MemberKind::Data(Value::Function(func)) => Some(Callable::Function(func)),
            _ => None,
        }
    }

    fn upgrade(weak: &Weak<InstanceInner>) -> Option<Instance> {
        weak.upgrade().map(|inner| Instance { inner })
    }

    fn own(&self, key: &MemberKey) -> Option<Value> {
        self.inner.properties.read().get(key).cloned()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let properties = self.inner.properties.read();
        f.debug_struct("Instance")
            .field("class", &self.inner.class.name())
            .field(
                "properties",
                &properties.keys().map(ToString::to_string).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A resolved invocable member
#[derive(Clone)]
pub(crate) enum Callable {
    /// Class method with the class that declared it
    Method {
        owner: Arc<Class>,
        body: Arc<MethodFn>,
    },
    /// Function stored as a property
    Function(NativeFunction),
}

impl Callable {
    pub(crate) fn invoke(&self, receiver: &Instance, args: &[Value]) -> Result<Value> {
        match self {
            Callable::Method { owner, body } => body(&CallContext::new(receiver, owner), args),
            Callable::Function(func) => func.call(args),
        }
    }

    /// Fix the receiver, producing a plain function value. The function
    /// holds the receiver weakly and fails once it has been dropped.
    pub(crate) fn bind(self, receiver: &Instance, key: &MemberKey) -> NativeFunction {
        match self {
            Callable::Function(func) => func,
            method => {
                let weak = Arc::downgrade(&receiver.inner);
                let name = key.to_string();
                NativeFunction::new(name.clone(), move |args| {
                    let receiver = Instance::upgrade(&weak).ok_or_else(|| {
                        Error::InstanceDropped { name: name.clone() }
                    })?;
                    method.invoke(&receiver, args)
                })
            }
        }
    }
}

// ============================================================================
// Call context
// ============================================================================

/// Receiver and declaring class of the running constructor or method
pub struct CallContext<'a> {
    this: &'a Instance,
    owner: &'a Arc<Class>,
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(this: &'a Instance, owner: &'a Arc<Class>) -> Self {
        Self { this, owner }
    }

    /// The receiver
    pub fn this(&self) -> &'a Instance {
        self.this
    }

    /// Class declaring the running body
    pub fn owner(&self) -> &'a Arc<Class> {
        self.owner
    }

    /// Read a property of the receiver
    pub fn get(&self, key: impl Into<MemberKey>) -> Result<Value> {
        self.this.get(key)
    }

    /// Write a property of the receiver
    pub fn set(&self, key: impl Into<MemberKey>, value: impl Into<Value>) -> Result<()> {
        self.this.set(key, value)
    }

    /// Invoke a member of the receiver
    pub fn call(&self, key: impl Into<MemberKey>, args: &[Value]) -> Result<Value> {
        self.this.call(key, args)
    }

    /// Invoke the parent class's version of a method on the receiver
    pub fn call_super(&self, key: impl Into<MemberKey>, args: &[Value]) -> Result<Value> {
        let key = key.into();
        let parent = self.owner.parent().ok_or_else(|| Error::MemberNotFound {
            owner: self.owner.name().to_string(),
            name: key.to_string(),
        })?;
        match parent.lookup(&key) {
            Some((
                owner,
                Member {
                    kind: MemberKind::Method(body),
                    ..
                },
            )) => body(&CallContext::new(self.this, &owner), args),
            Some((
                _,
                Member {
                    kind: MemberKind::Data(Value::Function(func)),
                    ..
                },
            )) => func.call(args),
            Some((owner, _)) => Err(Error::NotCallable {
                owner: owner.name().to_string(),
                name: key.to_string(),
            }),
            None => Err(Error::MemberNotFound {
                owner: parent.name().to_string(),
                name: key.to_string(),
            }),
        }
    }

    /// Run the parent class's constructor on the receiver
    pub fn super_construct(&self, args: &[Value]) -> Result<()> {
        match self.owner.parent() {
            Some(parent) => run_constructor(parent, self.this, args),
            None => Ok(()),
        }
    }
}

pub(crate) fn construct(class: &Arc<Class>, args: &[Value]) -> Result<Instance> {
    let instance = Instance::allocate(class);
    run_constructor(class, &instance, args)?;
    trace!(class = class.name(), args = args.len(), "constructed instance");
    Ok(instance)
}

// A class without its own constructor forwards every argument to its parent.
fn run_constructor(class: &Arc<Class>, this: &Instance, args: &[Value]) -> Result<()> {
    match (class.constructor(), class.parent()) {
        (Some(body), _) => body(&CallContext::new(this, class), args),
        (None, Some(parent)) => run_constructor(parent, this, args),
        (None, None) => Ok(()),
    }
}
