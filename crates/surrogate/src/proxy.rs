//! Proxy factory and entry points
//!
//! [`make_proxy_type`] turns a declared class (written with the base class
//! among its bases, purely so tooling offers the base's members) into a
//! proxy class:
//!
//! - the base class is removed from the proxy's bases, so proxy instances
//!   are never nominally instances of the base;
//! - the declared members are kept, and a synthesized `__getattr__`
//!   (forward to the bound object) and `__dir__` (enumerate) overwrite any
//!   declared members of the same name;
//! - the declared constructor, if distinct from the base constructor, runs
//!   inside the synthesized one after the binding is in place.
//!
//! Instances are created with [`create`], which binds the proxied object
//! at allocation time. The two-step form ([`allocate`], [`set`],
//! [`initialize`]) exists for callers that need the bare instance first.

use tracing::{debug, trace};

use crate::class::{Class, ClassRef, Constructor, Member, ProxyInfo};
use crate::error::{ProxyError, Result};
use crate::object::ObjectRef;
use crate::signature::{Args, Signature};
use crate::value::{Method, Value};

/// Resolution accessor member name
pub const GETATTR: &str = "__getattr__";
/// Enumerator member name
pub const DIR: &str = "__dir__";
/// Reserved name of the synthesized constructor
pub const INIT: &str = "__init__";
/// Reserved name of the synthesized allocator
pub const NEW: &str = "__new__";

const SYNTHESIZED: [&str; 4] = [INIT, NEW, GETATTR, DIR];

/// Build a proxy class from `declared` that forwards to instances of `base`.
///
/// Declared members named like a synthesized member are dropped; this is
/// not an error.
pub fn make_proxy_type(base: &ClassRef, declared: &ClassRef) -> ClassRef {
    let bases: Vec<ClassRef> = declared
        .bases()
        .iter()
        .filter(|b| !ClassRef::ptr_eq(*b, base))
        .cloned()
        .collect();

    let mut members = declared.members.clone();
    for name in SYNTHESIZED {
        if members.remove(name).is_some() {
            debug!(
                proxy = declared.name(),
                member = name,
                "declared member overwritten by synthesized member"
            );
        }
    }
    members.insert(
        GETATTR.to_string(),
        Member::Method(Method::new(GETATTR, resolve_through_binding)),
    );
    members.insert(DIR.to_string(), Member::Method(Method::new(DIR, enumerate)));

    let declared_init = match (declared.constructor(), base.constructor()) {
        (Some(d), Some(b)) if d.ptr_eq(&b) => None,
        (d, _) => d,
    };

    debug!(
        proxy = declared.name(),
        base = base.name(),
        bases = bases.len(),
        own_constructor = declared_init.is_some(),
        "synthesized proxy type"
    );

    ClassRef::new(Class {
        name: declared.name().to_string(),
        bases,
        members,
        constructor: Some(synthesize_constructor(declared_init)),
        proxy: Some(ProxyInfo {
            proxied: base.clone(),
            declared: declared.clone(),
        }),
    })
}

fn synthesize_constructor(declared_init: Option<Constructor>) -> Constructor {
    match declared_init {
        Some(init) => {
            let signature = init.signature().clone();
            Constructor::new(signature, move |this, args| {
                ensure_bound(this)?;
                init.run(this, args)
            })
        }
        None => Constructor::new(Signature::new(), |_, _| Ok(())),
    }
}

fn ensure_bound(this: &ObjectRef) -> Result<ObjectRef> {
    this.binding().ok_or_else(|| {
        ProxyError::unbound(this.class().name(), "no object is bound to this proxy")
    })
}

/// Synthesized `__getattr__`: answer a failed lookup from the bound object.
fn resolve_through_binding(this: &ObjectRef, args: &[Value]) -> Result<Value> {
    let name = match args.first().and_then(Value::as_str) {
        Some(name) => name,
        None => {
            return Err(ProxyError::MethodArgumentMismatch {
                method: GETATTR.to_string(),
                expected: 1,
                got: args.len(),
            })
        }
    };
    let proxied = ensure_bound(this)?;
    trace!(proxy = this.class().name(), member = name, "forwarding lookup");
    proxied.get_attr(name)
}

/// Synthesized `__dir__`: proxy class names, own storage and bound object.
fn enumerate(this: &ObjectRef, _args: &[Value]) -> Result<Value> {
    let mut names = this.class().dir();
    names.extend(this.own_attr_names());
    if let Some(proxied) = this.binding() {
        names.extend(proxied.dir()?);
    }
    Ok(Value::from(
        names.into_iter().map(Value::from).collect::<Vec<_>>(),
    ))
}

fn proxy_constructor(proxy_type: &ClassRef) -> Result<Constructor> {
    if !proxy_type.is_proxy() {
        return Err(ProxyError::NotAProxyType {
            type_name: proxy_type.name().to_string(),
        });
    }
    proxy_type.constructor.clone().ok_or_else(|| {
        ProxyError::unbound(proxy_type.name(), "proxy type has no synthesized constructor")
    })
}

/// Create a proxy instance bound to `proxied`.
///
/// Arguments are checked against the declared constructor before anything
/// is allocated. The binding is in place before the constructor runs.
pub fn create(proxy_type: &ClassRef, proxied: ObjectRef, args: Args) -> Result<ObjectRef> {
    let ctor = proxy_constructor(proxy_type)?;
    let bound = ctor
        .signature()
        .bind(&args)
        .map_err(|reason| ProxyError::ConstructorArgumentMismatch {
            type_name: proxy_type.name().to_string(),
            reason,
        })?;

    debug!(
        proxy = proxy_type.name(),
        proxied = proxied.class().name(),
        "creating proxy instance"
    );
    let instance = ObjectRef::allocate(proxy_type.clone(), Some(proxied));
    ctor.run(&instance, &bound)?;
    Ok(instance)
}

/// Allocate a proxy instance with an empty binding slot.
///
/// Any delegated read fails with [`ProxyError::InvalidBindingState`] until
/// [`set`] binds an object. Follow with [`initialize`] to run the declared
/// constructor.
pub fn allocate(proxy_type: &ClassRef) -> Result<ObjectRef> {
    proxy_constructor(proxy_type)?;
    Ok(ObjectRef::allocate(proxy_type.clone(), None))
}

/// Run the declared constructor on an allocated and bound proxy instance.
pub fn initialize(instance: &ObjectRef, args: Args) -> Result<()> {
    let ctor = proxy_constructor(instance.class())?;
    ensure_bound(instance)?;
    let bound = ctor
        .signature()
        .bind(&args)
        .map_err(|reason| ProxyError::ConstructorArgumentMismatch {
            type_name: instance.class().name().to_string(),
            reason,
        })?;
    ctor.run(instance, &bound)
}

/// The object bound inside `proxy`, by identity.
///
/// `base` names the expected type at the call site; it is not checked.
pub fn get(base: &ClassRef, proxy: &ObjectRef) -> Result<ObjectRef> {
    if !proxy.class().is_proxy() {
        return Err(ProxyError::unbound(
            proxy.class().name(),
            "object was not created by the proxy factory",
        ));
    }
    trace!(proxy = proxy.class().name(), base = base.name(), "retrieving bound object");
    ensure_bound(proxy)
}

/// Replace the object bound inside `proxy`.
///
/// No type compatibility check. Binding a proxy to itself, or to a chain
/// of proxies leading back to it, fails with
/// [`ProxyError::InvalidBindingState`].
pub fn set(proxy: &ObjectRef, proxied: ObjectRef) -> Result<()> {
    if !proxy.class().is_proxy() {
        return Err(ProxyError::unbound(
            proxy.class().name(),
            "object was not created by the proxy factory",
        ));
    }
    if binds_back_to(&proxied, proxy) {
        return Err(ProxyError::unbound(
            proxy.class().name(),
            "binding would make the proxy forward to itself",
        ));
    }
    trace!(
        proxy = proxy.class().name(),
        proxied = proxied.class().name(),
        "rebinding proxy"
    );
    proxy.replace_binding(proxied);
    Ok(())
}

// Existing chains are acyclic, so the walk terminates.
fn binds_back_to(start: &ObjectRef, proxy: &ObjectRef) -> bool {
    let mut current = Some(start.clone());
    while let Some(obj) = current {
        if obj.ptr_eq(proxy) {
            return true;
        }
        current = obj.binding();
    }
    false
}

/// True if `obj` is an instance of a proxy class
pub fn is_proxy(obj: &ObjectRef) -> bool {
    obj.class().is_proxy()
}
