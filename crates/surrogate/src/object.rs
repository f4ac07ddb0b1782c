//! Object instances and member resolution
//!
//! Every read goes through the same chain:
//!
//! 1. class methods (own class, then bases),
//! 2. the instance's own attribute storage,
//! 3. class-level data,
//! 4. the class's `__getattr__` hook, if it has one.
//!
//! Writes and deletes only ever touch the instance's own storage.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::class::{ClassRef, Member};
use crate::error::{ProxyError, Result};
use crate::proxy::{DIR, GETATTR};
use crate::value::Value;

struct ObjectData {
    class: ClassRef,
    storage: RefCell<FxHashMap<String, Value>>,
    /// Binding slot; only meaningful for proxy instances
    binding: RefCell<Option<ObjectRef>>,
}

/// Shared handle to an object.
///
/// Cloning the handle does not copy the object; use [`ObjectRef::ptr_eq`]
/// to compare identities.
#[derive(Clone)]
pub struct ObjectRef(Rc<ObjectData>);

impl ObjectRef {
    pub(crate) fn allocate(class: ClassRef, binding: Option<ObjectRef>) -> Self {
        ObjectRef(Rc::new(ObjectData {
            class,
            storage: RefCell::new(FxHashMap::default()),
            binding: RefCell::new(binding),
        }))
    }

    /// The object's class
    pub fn class(&self) -> &ClassRef {
        &self.0.class
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Nominal type check by class identity
    pub fn is_instance_of(&self, class: &ClassRef) -> bool {
        self.0.class.is_subclass_of(class)
    }

    /// Read a member.
    ///
    /// Instance storage shadows class data but never class methods.
    pub fn get_attr(&self, name: &str) -> Result<Value> {
        let member = self.0.class.lookup(name);
        if let Some(method @ Member::Method(_)) = &member {
            return Ok(method.resolve(self));
        }

        if let Some(value) = self.0.storage.borrow().get(name) {
            return Ok(value.clone());
        }

        if let Some(data) = member {
            return Ok(data.resolve(self));
        }

        if let Some(Member::Method(hook)) = self.0.class.lookup(GETATTR) {
            return hook.invoke(self, &[Value::from(name)]);
        }

        Err(ProxyError::member_not_found(self.0.class.name(), name))
    }

    /// Write into the instance's own storage
    pub fn set_attr(&self, name: &str, value: impl Into<Value>) {
        self.0
            .storage
            .borrow_mut()
            .insert(name.to_string(), value.into());
    }

    /// Remove from the instance's own storage, returning the old value
    pub fn del_attr(&self, name: &str) -> Result<Value> {
        self.0
            .storage
            .borrow_mut()
            .remove(name)
            .ok_or_else(|| ProxyError::member_not_found(self.0.class.name(), name))
    }

    /// True if `name` is present in the instance's own storage
    pub fn has_own_attr(&self, name: &str) -> bool {
        self.0.storage.borrow().contains_key(name)
    }

    /// Keys of the instance's own storage
    pub fn own_attr_names(&self) -> BTreeSet<String> {
        self.0.storage.borrow().keys().cloned().collect()
    }

    /// Read a member and call it with positional arguments
    pub fn call_method(&self, name: &str, args: &[Value]) -> Result<Value> {
        match self.get_attr(name)? {
            Value::Method(method) => method.call(args),
            other => Err(ProxyError::NotCallable {
                member: name.to_string(),
                kind: other.type_name(),
            }),
        }
    }

    /// Names reachable on this object.
    ///
    /// Uses the class's `__dir__` member when present, otherwise the class
    /// names plus the own storage keys. Advisory only.
    pub fn dir(&self) -> Result<BTreeSet<String>> {
        if let Some(Member::Method(enumerate)) = self.0.class.lookup(DIR) {
            let listed = enumerate.invoke(self, &[])?;
            let items = listed.as_list().ok_or(ProxyError::TypeMismatch {
                expected: "list",
                got: listed.type_name(),
            })?;
            return items.iter().map(|item| item.extract::<String>()).collect();
        }

        let mut names = self.0.class.dir();
        names.extend(self.own_attr_names());
        Ok(names)
    }

    pub(crate) fn binding(&self) -> Option<ObjectRef> {
        self.0.binding.borrow().clone()
    }

    pub(crate) fn replace_binding(&self, proxied: ObjectRef) -> Option<ObjectRef> {
        self.0.binding.borrow_mut().replace(proxied)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{} object at {:p}>",
            self.0.class.name(),
            Rc::as_ptr(&self.0)
        )
    }
}
