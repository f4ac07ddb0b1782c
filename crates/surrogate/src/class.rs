//! Class definitions: member tables, bases and constructors
//!
//! A class is immutable once built and shared as a [`ClassRef`]. Member
//! lookup walks the class itself and then its bases depth-first, left to
//! right; the first hit wins.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{ProxyError, Result};
use crate::object::ObjectRef;
use crate::signature::{Args, BoundArgs, Signature};
use crate::value::{Method, Value};

/// Shared handle to a class
pub type ClassRef = Rc<Class>;

/// Constructor body.
///
/// Runs against a freshly allocated instance with arguments already
/// bound to the constructor's [`Signature`].
pub type ConstructorFn = dyn Fn(&ObjectRef, &BoundArgs) -> Result<()>;

/// Class-level member
#[derive(Clone, Debug)]
pub enum Member {
    /// Method, bound to the receiver when read
    Method(Method),
    /// Class-level data, returned as is
    Data(Value),
}

impl Member {
    /// The value a read through `receiver` produces
    pub fn resolve(&self, receiver: &ObjectRef) -> Value {
        match self {
            Member::Method(method) => Value::Method(method.bind(receiver)),
            Member::Data(value) => value.clone(),
        }
    }
}

/// Constructor: a signature plus a body.
#[derive(Clone)]
pub struct Constructor {
    signature: Signature,
    body: Rc<ConstructorFn>,
}

impl Constructor {
    /// Create a constructor
    pub fn new<F>(signature: Signature, body: F) -> Self
    where
        F: Fn(&ObjectRef, &BoundArgs) -> Result<()> + 'static,
    {
        Constructor {
            signature,
            body: Rc::new(body),
        }
    }

    /// Parameter list
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Run the body
    pub fn run(&self, this: &ObjectRef, args: &BoundArgs) -> Result<()> {
        (self.body)(this, args)
    }

    /// Identity comparison of the bodies
    pub fn ptr_eq(&self, other: &Constructor) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.body), Rc::as_ptr(&other.body))
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Extra metadata carried by classes produced by the proxy factory
#[derive(Debug)]
pub(crate) struct ProxyInfo {
    pub(crate) proxied: ClassRef,
    pub(crate) declared: ClassRef,
}

/// Class definition
pub struct Class {
    pub(crate) name: String,
    pub(crate) bases: Vec<ClassRef>,
    pub(crate) members: FxHashMap<String, Member>,
    pub(crate) constructor: Option<Constructor>,
    pub(crate) proxy: Option<ProxyInfo>,
}

impl Class {
    /// Start building a class
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            bases: Vec::new(),
            members: FxHashMap::default(),
            constructor: None,
        }
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct bases, in declaration order
    pub fn bases(&self) -> &[ClassRef] {
        &self.bases
    }

    /// True if the member is declared on this class itself
    pub fn declares(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    /// Members declared on this class itself
    pub fn own_members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Find a member on this class or its bases
    pub fn lookup(&self, name: &str) -> Option<Member> {
        if let Some(member) = self.members.get(name) {
            return Some(member.clone());
        }
        self.bases.iter().find_map(|base| base.lookup(name))
    }

    /// Constructor of this class, or the first one found along its bases
    pub fn constructor(&self) -> Option<Constructor> {
        if let Some(ctor) = &self.constructor {
            return Some(ctor.clone());
        }
        self.bases.iter().find_map(|base| base.constructor())
    }

    /// Nominal subtyping check by class identity
    pub fn is_subclass_of(&self, other: &ClassRef) -> bool {
        std::ptr::eq(self, Rc::as_ptr(other)) || self.bases.iter().any(|b| b.is_subclass_of(other))
    }

    /// True for classes produced by [`make_proxy_type`](crate::proxy::make_proxy_type)
    pub fn is_proxy(&self) -> bool {
        self.proxy.is_some()
    }

    /// The base type a proxy class forwards to
    pub fn proxied_class(&self) -> Option<&ClassRef> {
        self.proxy.as_ref().map(|info| &info.proxied)
    }

    /// The declared type a proxy class was synthesized from
    pub fn declared_class(&self) -> Option<&ClassRef> {
        self.proxy.as_ref().map(|info| &info.declared)
    }

    /// Member names reachable through this class.
    ///
    /// For proxy classes this includes every name of the proxied class.
    pub fn dir(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self.members.keys().cloned().collect();
        for base in &self.bases {
            names.extend(base.dir());
        }
        if let Some(info) = &self.proxy {
            names.extend(info.proxied.dir());
        }
        names
    }

    /// Create a plain instance, running the resolved constructor.
    ///
    /// Proxy classes cannot be instantiated this way; they need an object
    /// to bind first (see [`proxy::create`](crate::proxy::create)).
    pub fn instantiate(class: &ClassRef, args: Args) -> Result<ObjectRef> {
        if class.is_proxy() {
            return Err(ProxyError::unbound(
                &class.name,
                "proxy instances must be created through proxy::create",
            ));
        }

        match class.constructor() {
            Some(ctor) => {
                let bound = ctor.signature().bind(&args).map_err(|reason| {
                    ProxyError::ConstructorArgumentMismatch {
                        type_name: class.name.clone(),
                        reason,
                    }
                })?;
                let instance = ObjectRef::allocate(class.clone(), None);
                ctor.run(&instance, &bound)?;
                Ok(instance)
            }
            None if !args.is_empty() => Err(ProxyError::ConstructorArgumentMismatch {
                type_name: class.name.clone(),
                reason: "takes no arguments".to_string(),
            }),
            None => Ok(ObjectRef::allocate(class.clone(), None)),
        }
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field(
                "bases",
                &self.bases.iter().map(|b| b.name()).collect::<Vec<_>>(),
            )
            .field("members", &self.members.keys().collect::<BTreeSet<_>>())
            .field("proxy", &self.proxied_class().map(|c| c.name()))
            .finish()
    }
}

/// Builder for [`Class`]
pub struct ClassBuilder {
    name: String,
    bases: Vec<ClassRef>,
    members: FxHashMap<String, Member>,
    constructor: Option<Constructor>,
}

impl ClassBuilder {
    /// Add a base class
    pub fn base(mut self, base: &ClassRef) -> Self {
        self.bases.push(base.clone());
        self
    }

    /// Add a method
    pub fn method<F>(mut self, name: &str, func: F) -> Self
    where
        F: Fn(&ObjectRef, &[Value]) -> Result<Value> + 'static,
    {
        self.members
            .insert(name.to_string(), Member::Method(Method::new(name, func)));
        self
    }

    /// Add a class-level data member
    pub fn data(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.members
            .insert(name.to_string(), Member::Data(value.into()));
        self
    }

    /// Set the constructor
    pub fn constructor<F>(mut self, signature: Signature, body: F) -> Self
    where
        F: Fn(&ObjectRef, &BoundArgs) -> Result<()> + 'static,
    {
        self.constructor = Some(Constructor::new(signature, body));
        self
    }

    /// Reuse an existing constructor
    pub fn constructor_from(mut self, ctor: Constructor) -> Self {
        self.constructor = Some(ctor);
        self
    }

    /// Finish the class
    pub fn build(self) -> ClassRef {
        Rc::new(Class {
            name: self.name,
            bases: self.bases,
            members: self.members,
            constructor: self.constructor,
            proxy: None,
        })
    }
}
