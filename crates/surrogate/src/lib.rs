//! Surrogate - delegating proxy types
//!
//! A proxy wraps an instance of some base type, redefines a handful of its
//! members and forwards everything else to the wrapped instance. Typical
//! uses are tracing, instrumentation and access control around an object
//! whose surface must stay the same for callers.
//!
//! Two layers are provided:
//!
//! - **Dynamic** ([`class`], [`object`], [`proxy`]): a small object model
//!   with classes, instance storage and bound methods. [`proxy::make_proxy_type`]
//!   builds a proxy class from a declared class, [`proxy::create`] binds an
//!   instance, and every read resolves through
//!   *class methods → own storage → class data → bound instance*.
//! - **Typed** ([`typed`] + [`delegatable`]): the same idea with
//!   composition. `#[delegatable]` on a trait generates forwarding
//!   defaults, and the declared type overrides only what it redefines.
//!
//! # Example
//!
//! ```ignore
//! use surrogate::{proxy, Args, Class, Signature, Value};
//!
//! let counter = Class::builder("Counter")
//!     .method("get_value", |this, _| this.get_attr("value"))
//!     .constructor(Signature::new().param("value"), |this, args| {
//!         this.set_attr("value", args.value("value"));
//!         Ok(())
//!     })
//!     .build();
//!
//! let doubler = Class::builder("Doubler")
//!     .base(&counter)
//!     .method("get_value", |this, _| {
//!         let inner = proxy::get(&counter, this)?;
//!         let value = inner.call_method("get_value", &[])?.extract::<i64>()?;
//!         Ok(Value::Int(value * 2))
//!     })
//!     .build();
//!
//! let doubler = proxy::make_proxy_type(&counter, &doubler);
//! let inner = Class::instantiate(&counter, Args::new().arg(5))?;
//! let p = proxy::create(&doubler, inner, Args::new())?;
//! assert_eq!(p.call_method("get_value", &[])?, Value::Int(10));
//! assert_eq!(p.get_attr("value")?, Value::Int(5));
//! ```
//!
//! # Threading
//!
//! Everything here is single-threaded. Dynamic objects are `Rc`-based and
//! therefore neither `Send` nor `Sync`; wrap them in your own
//! synchronization if they must cross threads.

#![warn(missing_docs)]

pub mod class;
pub mod error;
pub mod object;
pub mod proxy;
pub mod signature;
pub mod typed;
pub mod value;

pub use class::{Class, ClassBuilder, ClassRef, Constructor, Member};
pub use error::{ProxyError, Result};
pub use object::ObjectRef;
pub use signature::{Args, BoundArgs, Param, ParamKind, Signature};
pub use typed::{Override, Proxy};
pub use value::{check_arity, BoundMethod, FromValue, Method, Value};

/// Generate forwarding overrides for a trait.
///
/// See [`typed`] for the generated items.
pub use surrogate_macros::delegatable;
