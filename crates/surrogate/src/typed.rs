//! Statically typed proxies
//!
//! [`Proxy`] pairs a bound instance (the *slot*) with the declared type's
//! own state. The `#[delegatable]` attribute on a trait generates the rest:
//! an `<Trait>Overrides<Slot>` trait whose every method forwards to the
//! slot by default, and the impl of the trait for `Proxy<Declared, Slot>`
//! that routes each call through the declared type's overrides.
//!
//! ```ignore
//! #[delegatable]
//! pub trait Database {
//!     fn connect(&mut self) -> String;
//!     fn execute_query(&mut self, query: &str) -> String;
//! }
//!
//! #[derive(Default)]
//! struct Counting { queries: usize }
//!
//! impl<S: Database> DatabaseOverrides<S> for Counting {
//!     fn execute_query(this: &mut Proxy<Self, S>, query: &str) -> String {
//!         this.queries += 1;
//!         this.get_mut().execute_query(query)
//!     }
//! }
//!
//! let mut db = Proxy::new(RealDatabase::new(), Counting::default());
//! db.connect();              // forwarded
//! db.execute_query("...");   // overridden
//! ```
//!
//! `Proxy<D, S>` is never nominally an `S`: it only implements the
//! delegatable traits whose overrides `D` provides.

use std::fmt;
use std::ops::{Deref, DerefMut};

/// A declared type `D` bound to an instance `S`.
///
/// Dereferences to `D`, so the declared type's fields read like fields of
/// the proxy. The slot is reached through [`Proxy::get`] and friends;
/// those inherent methods shadow same-named trait methods in method-call
/// syntax, so call such trait methods as `Trait::get(&proxy)`.
pub struct Proxy<D, S> {
    proxied: S,
    declared: D,
}

impl<D, S> Proxy<D, S> {
    /// Bind `proxied` and attach the declared state
    pub fn new(proxied: S, declared: D) -> Self {
        Proxy { proxied, declared }
    }

    /// Bind `proxied` with the declared type's default state
    pub fn wrap(proxied: S) -> Self
    where
        D: Default,
    {
        Proxy::new(proxied, D::default())
    }

    /// The bound instance
    pub fn get(&self) -> &S {
        &self.proxied
    }

    /// The bound instance, mutably
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.proxied
    }

    /// Bind a new instance, returning the previous one
    pub fn set(&mut self, proxied: S) -> S {
        std::mem::replace(&mut self.proxied, proxied)
    }

    /// The declared type's state
    pub fn declared(&self) -> &D {
        &self.declared
    }

    /// The declared type's state, mutably
    pub fn declared_mut(&mut self) -> &mut D {
        &mut self.declared
    }

    /// Split into the bound instance and the declared state
    pub fn into_parts(self) -> (S, D) {
        (self.proxied, self.declared)
    }
}

impl<D, S> Deref for Proxy<D, S> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.declared
    }
}

impl<D, S> DerefMut for Proxy<D, S> {
    fn deref_mut(&mut self) -> &mut D {
        &mut self.declared
    }
}

impl<D: fmt::Debug, S: fmt::Debug> fmt::Debug for Proxy<D, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("declared", &self.declared)
            .field("proxied", &self.proxied)
            .finish()
    }
}

/// Instance-level override of a forwarded value.
///
/// Empty means "answer from the delegate"; [`Override::clear`] restores
/// delegation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override<T> {
    value: Option<T>,
}

impl<T> Default for Override<T> {
    fn default() -> Self {
        Override { value: None }
    }
}

impl<T> Override<T> {
    /// No override
    pub fn new() -> Self {
        Self::default()
    }

    /// Override with `value`, returning the previous override
    pub fn set(&mut self, value: T) -> Option<T> {
        self.value.replace(value)
    }

    /// Drop the override, returning it
    pub fn clear(&mut self) -> Option<T> {
        self.value.take()
    }

    /// True if an override is in place
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// The override, if any
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// The override, or the delegate's value
    pub fn resolve<'a>(&'a self, delegate: &'a T) -> &'a T {
        self.value.as_ref().unwrap_or(delegate)
    }

    /// The override, or a value computed from the delegate
    pub fn resolve_with(&self, delegate: impl FnOnce() -> T) -> T
    where
        T: Clone,
    {
        match &self.value {
            Some(value) => value.clone(),
            None => delegate(),
        }
    }
}
