//! Dynamic proxy tests
//!
//! Covers creation, resolution, rebinding and enumeration through
//! `surrogate::proxy` using the dynamic object model.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use surrogate::proxy::{self, DIR, GETATTR};
use surrogate::{Args, Class, ClassRef, ObjectRef, ProxyError, Signature, Value};

// ============================================================================
// Fixtures
// ============================================================================

/// `Counter(value)` with `get_value()`
fn counter_class() -> ClassRef {
    Class::builder("Counter")
        .method("get_value", |this, _| this.get_attr("value"))
        .constructor(Signature::new().param("value"), |this, args| {
            this.set_attr("value", args.value("value"));
            Ok(())
        })
        .build()
}

/// Proxy over `Counter` adding `get_doubled_value()`
fn doubler_type(counter: &ClassRef) -> ClassRef {
    let base = counter.clone();
    let declared = Class::builder("Doubler")
        .base(counter)
        .method("get_doubled_value", move |this, _| {
            let inner = proxy::get(&base, this)?;
            let value = inner.call_method("get_value", &[])?.extract::<i64>()?;
            Ok(Value::Int(value * 2))
        })
        .build();
    proxy::make_proxy_type(counter, &declared)
}

fn counter(counter: &ClassRef, value: i64) -> ObjectRef {
    Class::instantiate(counter, Args::new().arg(value)).unwrap()
}

// ============================================================================
// Creation and resolution
// ============================================================================

#[test_log::test]
fn test_create_and_resolve() {
    let counter_type = counter_class();
    let doubler = doubler_type(&counter_type);
    let inner = counter(&counter_type, 10);
    let p = proxy::create(&doubler, inner, Args::new()).unwrap();

    assert!(p.is_instance_of(&doubler));
    assert!(proxy::is_proxy(&p));
    assert_eq!(
        p.call_method("get_doubled_value", &[]).unwrap(),
        Value::Int(20)
    );
    assert_eq!(p.call_method("get_value", &[]).unwrap(), Value::Int(10));
    assert_eq!(p.get_attr("value").unwrap(), Value::Int(10));
}

#[test]
fn test_override_doubles_delegate_value() {
    let counter_type = counter_class();
    let base = counter_type.clone();
    let declared = Class::builder("Doubler")
        .base(&counter_type)
        .method("get_value", move |this, _| {
            let inner = proxy::get(&base, this)?;
            let value = inner.call_method("get_value", &[])?.extract::<i64>()?;
            Ok(Value::Int(value * 2))
        })
        .build();
    let doubler = proxy::make_proxy_type(&counter_type, &declared);
    let inner = counter(&counter_type, 5);
    let p = proxy::create(&doubler, inner.clone(), Args::new()).unwrap();

    assert_eq!(p.call_method("get_value", &[]).unwrap(), Value::Int(10));
    assert_eq!(p.get_attr("value").unwrap(), Value::Int(5));
    assert_eq!(inner.call_method("get_value", &[]).unwrap(), Value::Int(5));
}

#[test]
fn test_not_nominally_a_base_instance() {
    let counter_type = counter_class();
    let doubler = doubler_type(&counter_type);
    let p = proxy::create(&doubler, counter(&counter_type, 1), Args::new()).unwrap();

    assert!(!p.is_instance_of(&counter_type));
    assert!(doubler.bases().is_empty());
    assert!(!doubler.is_subclass_of(&counter_type));
    assert!(ClassRef::ptr_eq(doubler.proxied_class().unwrap(), &counter_type));
    assert_eq!(doubler.declared_class().unwrap().name(), "Doubler");
}

#[test]
fn test_other_bases_are_kept() {
    let counter_type = counter_class();
    let mixin = Class::builder("Named")
        .method("label", |_, _| Ok(Value::from("named")))
        .build();
    let declared = Class::builder("Labelled")
        .base(&counter_type)
        .base(&mixin)
        .build();
    let proxy_type = proxy::make_proxy_type(&counter_type, &declared);

    assert_eq!(proxy_type.bases().len(), 1);
    assert!(proxy_type.is_subclass_of(&mixin));

    let p = proxy::create(&proxy_type, counter(&counter_type, 3), Args::new()).unwrap();
    assert!(p.is_instance_of(&mixin));
    assert_eq!(p.call_method("label", &[]).unwrap(), Value::from("named"));
    assert_eq!(p.call_method("get_value", &[]).unwrap(), Value::Int(3));
}

#[test]
fn test_forwarded_method_binds_to_proxied_object() {
    let counter_type = counter_class();
    let doubler = doubler_type(&counter_type);
    let inner = counter(&counter_type, 4);
    let p = proxy::create(&doubler, inner.clone(), Args::new()).unwrap();

    // Shadowing `value` on the proxy does not change what the forwarded
    // method sees; it runs against the proxied object.
    p.set_attr("value", 100);
    let method = p.get_attr("get_value").unwrap();
    let bound = method.as_method().unwrap();
    assert!(bound.receiver().ptr_eq(&inner));
    assert_eq!(method.call(&[]).unwrap(), Value::Int(4));
}

#[test]
fn test_missing_member_propagates_from_proxied() {
    let counter_type = counter_class();
    let doubler = doubler_type(&counter_type);
    let p = proxy::create(&doubler, counter(&counter_type, 1), Args::new()).unwrap();

    let err = p.get_attr("nonexistent").unwrap_err();
    assert!(err.is_member_not_found());
    assert_eq!(
        err,
        ProxyError::MemberNotFound {
            type_name: "Counter".to_string(),
            member: "nonexistent".to_string(),
        }
    );
}

#[test]
fn test_declared_members_win_over_proxied() {
    let counter_type = counter_class();
    let declared = Class::builder("Fixed")
        .base(&counter_type)
        .method("get_value", |_, _| Ok(Value::Int(-1)))
        .build();
    let proxy_type = proxy::make_proxy_type(&counter_type, &declared);
    let inner = counter(&counter_type, 7);
    let p = proxy::create(&proxy_type, inner.clone(), Args::new()).unwrap();

    assert_eq!(p.call_method("get_value", &[]).unwrap(), Value::Int(-1));
    assert_eq!(inner.call_method("get_value", &[]).unwrap(), Value::Int(7));
}

// ============================================================================
// Attribute writes and deletes
// ============================================================================

#[test]
fn test_set_and_delete_are_local() {
    let counter_type = counter_class();
    let doubler = doubler_type(&counter_type);
    let inner = counter(&counter_type, 10);
    let p = proxy::create(&doubler, inner.clone(), Args::new()).unwrap();

    assert_eq!(p.get_attr("value").unwrap(), Value::Int(10));

    p.set_attr("value", 20);
    assert_eq!(p.get_attr("value").unwrap(), Value::Int(20));
    assert_eq!(inner.get_attr("value").unwrap(), Value::Int(10));

    inner.set_attr("value", 30);
    assert_eq!(p.get_attr("value").unwrap(), Value::Int(20));

    assert_eq!(p.del_attr("value").unwrap(), Value::Int(20));
    assert_eq!(p.get_attr("value").unwrap(), Value::Int(30));
}

#[test]
fn test_delete_without_own_value_fails() {
    let counter_type = counter_class();
    let doubler = doubler_type(&counter_type);
    let inner = counter(&counter_type, 10);
    let p = proxy::create(&doubler, inner.clone(), Args::new()).unwrap();

    let err = p.del_attr("value").unwrap_err();
    assert!(err.is_member_not_found());
    assert_eq!(inner.get_attr("value").unwrap(), Value::Int(10));
}

// ============================================================================
// Identity and rebinding
// ============================================================================

#[test]
fn test_get_returns_same_object() {
    let counter_type = counter_class();
    let declared = Class::builder("Another").base(&counter_type).build();
    let proxy_type = proxy::make_proxy_type(&counter_type, &declared);
    let inner = counter(&counter_type, 5);
    let p = proxy::create(&proxy_type, inner.clone(), Args::new()).unwrap();

    let retrieved = proxy::get(&counter_type, &p).unwrap();
    assert!(retrieved.ptr_eq(&inner));
    assert_eq!(retrieved.call_method("get_value", &[]).unwrap(), Value::Int(5));
    assert_eq!(retrieved.get_attr("value").unwrap(), Value::Int(5));
}

#[test]
fn test_rebinding_redirects_delegation() {
    let counter_type = counter_class();
    let doubler = doubler_type(&counter_type);
    let first = counter(&counter_type, 1);
    let second = counter(&counter_type, 2);
    let p = proxy::create(&doubler, first, Args::new()).unwrap();

    proxy::set(&p, second.clone()).unwrap();
    assert!(proxy::get(&counter_type, &p).unwrap().ptr_eq(&second));
    assert_eq!(p.get_attr("value").unwrap(), Value::Int(2));
    assert_eq!(
        p.call_method("get_doubled_value", &[]).unwrap(),
        Value::Int(4)
    );
}

#[test]
fn test_set_accepts_unrelated_object() {
    let counter_type = counter_class();
    let doubler = doubler_type(&counter_type);
    let p = proxy::create(&doubler, counter(&counter_type, 1), Args::new()).unwrap();

    let other = Class::builder("Other").data("flavour", "plain").build();
    let stranger = Class::instantiate(&other, Args::new()).unwrap();
    proxy::set(&p, stranger).unwrap();

    assert_eq!(p.get_attr("flavour").unwrap(), Value::from("plain"));
    assert!(p.get_attr("value").unwrap_err().is_member_not_found());
}

#[test]
fn test_set_rejects_binding_cycles() {
    let counter_type = counter_class();
    let doubler = doubler_type(&counter_type);
    let inner = counter(&counter_type, 1);
    let a = proxy::create(&doubler, inner.clone(), Args::new()).unwrap();
    let b = proxy::create(&doubler, a.clone(), Args::new()).unwrap();

    let err = proxy::set(&a, a.clone()).unwrap_err();
    assert!(matches!(err, ProxyError::InvalidBindingState { .. }));
    let err = proxy::set(&a, b.clone()).unwrap_err();
    assert!(matches!(err, ProxyError::InvalidBindingState { .. }));

    // Bindings are unchanged and lookups still terminate.
    assert!(proxy::get(&counter_type, &a).unwrap().ptr_eq(&inner));
    assert!(b.get_attr("missing").unwrap_err().is_member_not_found());
    assert_eq!(b.get_attr("value").unwrap(), Value::Int(1));
}

#[test]
fn test_storage_shadows_declared_data() {
    let counter_type = counter_class();
    let declared = Class::builder("Limited")
        .base(&counter_type)
        .data("limit", 1)
        .build();
    let proxy_type = proxy::make_proxy_type(&counter_type, &declared);
    let p = proxy::create(&proxy_type, counter(&counter_type, 3), Args::new()).unwrap();

    p.set_attr("limit", 2);
    assert_eq!(p.get_attr("limit").unwrap(), Value::Int(2));
    p.del_attr("limit").unwrap();
    assert_eq!(p.get_attr("limit").unwrap(), Value::Int(1));
}

#[test]
fn test_get_and_set_reject_plain_objects() {
    let counter_type = counter_class();
    let plain = counter(&counter_type, 1);

    let err = proxy::get(&counter_type, &plain).unwrap_err();
    assert!(matches!(err, ProxyError::InvalidBindingState { .. }));

    let err = proxy::set(&plain, counter(&counter_type, 2)).unwrap_err();
    assert!(matches!(err, ProxyError::InvalidBindingState { .. }));
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_declared_constructor_with_extra_keyword() {
    let pair = Class::builder("Pair")
        .constructor(Signature::new().param("a").param("b"), |this, args| {
            let a = args.value("a").extract::<i64>()?;
            let b = args.value("b").extract::<i64>()?;
            this.set_attr("sum", a + b);
            Ok(())
        })
        .build();
    let declared = Class::builder("WithExtra")
        .base(&pair)
        .constructor(
            Signature::new()
                .var_positional("args")
                .keyword_only("extra_arg", Some(Value::Int(0)))
                .var_keyword("kwargs"),
            |this, args| {
                this.set_attr("extra_arg", args.value("extra_arg"));
                Ok(())
            },
        )
        .build();
    let proxy_type = proxy::make_proxy_type(&pair, &declared);
    let inner = Class::instantiate(&pair, Args::new().arg(2).arg(3)).unwrap();

    let p = proxy::create(&proxy_type, inner.clone(), Args::new().kwarg("extra_arg", 10)).unwrap();
    assert_eq!(p.get_attr("sum").unwrap(), Value::Int(5));
    assert_eq!(p.get_attr("extra_arg").unwrap(), Value::Int(10));

    let p = proxy::create(&proxy_type, inner, Args::new()).unwrap();
    assert_eq!(p.get_attr("extra_arg").unwrap(), Value::Int(0));
}

#[test]
fn test_constructor_sets_own_attributes() {
    let holder = Class::builder("Holder")
        .constructor(Signature::new().param("value"), |this, args| {
            this.set_attr("value", args.value("value"));
            Ok(())
        })
        .build();
    let declared = Class::builder("OwnAttrs")
        .base(&holder)
        .constructor(Signature::new().var_positional("args").var_keyword("kwargs"), |this, _| {
            this.set_attr("proxy_specific_value", "proxy_value");
            this.set_attr("value", "proxy_overridden_value");
            Ok(())
        })
        .build();
    let proxy_type = proxy::make_proxy_type(&holder, &declared);
    let inner = Class::instantiate(&holder, Args::new().arg("original_value")).unwrap();
    let p = proxy::create(&proxy_type, inner, Args::new()).unwrap();

    assert_eq!(
        p.get_attr("proxy_specific_value").unwrap(),
        Value::from("proxy_value")
    );
    assert_eq!(
        p.get_attr("value").unwrap(),
        Value::from("proxy_overridden_value")
    );
    let original = proxy::get(&holder, &p).unwrap();
    assert_eq!(
        original.get_attr("value").unwrap(),
        Value::from("original_value")
    );
    assert_ne!(p.get_attr("value").unwrap(), original.get_attr("value").unwrap());
}

#[test]
fn test_constructor_sees_binding() {
    let counter_type = counter_class();
    let base = counter_type.clone();
    let declared = Class::builder("Snapshot")
        .base(&counter_type)
        .constructor(Signature::new(), move |this, _| {
            let inner = proxy::get(&base, this)?;
            this.set_attr("initial", inner.get_attr("value")?);
            // Delegated reads already work here too.
            this.set_attr("via_proxy", this.get_attr("value")?);
            Ok(())
        })
        .build();
    let proxy_type = proxy::make_proxy_type(&counter_type, &declared);
    let p = proxy::create(&proxy_type, counter(&counter_type, 8), Args::new()).unwrap();

    assert_eq!(p.get_attr("initial").unwrap(), Value::Int(8));
    assert_eq!(p.get_attr("via_proxy").unwrap(), Value::Int(8));
}

#[test]
fn test_argument_mismatch_runs_nothing() {
    let counter_type = counter_class();
    let runs = Rc::new(Cell::new(0));
    let seen = runs.clone();
    let declared = Class::builder("Strict")
        .base(&counter_type)
        .constructor(Signature::new().param("label"), move |this, args| {
            seen.set(seen.get() + 1);
            this.set_attr("label", args.value("label"));
            Ok(())
        })
        .build();
    let proxy_type = proxy::make_proxy_type(&counter_type, &declared);
    let inner = counter(&counter_type, 1);

    let err = proxy::create(&proxy_type, inner.clone(), Args::new()).unwrap_err();
    assert!(matches!(err, ProxyError::ConstructorArgumentMismatch { .. }));
    let err = proxy::create(&proxy_type, inner.clone(), Args::new().kwarg("nope", 1)).unwrap_err();
    assert!(matches!(err, ProxyError::ConstructorArgumentMismatch { .. }));
    assert_eq!(runs.get(), 0);

    let p = proxy::create(&proxy_type, inner, Args::new().arg("x")).unwrap();
    assert_eq!(runs.get(), 1);
    assert_eq!(p.get_attr("label").unwrap(), Value::from("x"));
}

#[test]
fn test_constructor_error_propagates() {
    let counter_type = counter_class();
    let declared = Class::builder("Failing")
        .base(&counter_type)
        .constructor(Signature::new(), |this, _| {
            this.get_attr("missing_on_both")?;
            Ok(())
        })
        .build();
    let proxy_type = proxy::make_proxy_type(&counter_type, &declared);
    let err = proxy::create(&proxy_type, counter(&counter_type, 1), Args::new()).unwrap_err();
    assert!(err.is_member_not_found());
}

#[test]
fn test_proxy_class_cannot_be_instantiated_directly() {
    let counter_type = counter_class();
    let doubler = doubler_type(&counter_type);
    let err = Class::instantiate(&doubler, Args::new()).unwrap_err();
    assert!(matches!(err, ProxyError::InvalidBindingState { .. }));
}

#[test]
fn test_two_step_creation() {
    let counter_type = counter_class();
    let declared = Class::builder("Late")
        .base(&counter_type)
        .constructor(Signature::new().param_with_default("tag", "late"), |this, args| {
            this.set_attr("tag", args.value("tag"));
            Ok(())
        })
        .build();
    let proxy_type = proxy::make_proxy_type(&counter_type, &declared);

    let p = proxy::allocate(&proxy_type).unwrap();
    let err = p.get_attr("value").unwrap_err();
    assert!(matches!(err, ProxyError::InvalidBindingState { .. }));
    assert!(proxy::get(&counter_type, &p).is_err());
    assert!(proxy::initialize(&p, Args::new()).is_err());

    proxy::set(&p, counter(&counter_type, 6)).unwrap();
    proxy::initialize(&p, Args::new()).unwrap();
    assert_eq!(p.get_attr("value").unwrap(), Value::Int(6));
    assert_eq!(p.get_attr("tag").unwrap(), Value::from("late"));
}

#[test]
fn test_allocate_rejects_plain_class() {
    let counter_type = counter_class();
    let err = proxy::allocate(&counter_type).unwrap_err();
    assert_eq!(
        err,
        ProxyError::NotAProxyType {
            type_name: "Counter".to_string()
        }
    );
}

// ============================================================================
// Enumeration
// ============================================================================

#[test]
fn test_dir_is_superset() {
    let counter_type = counter_class();
    let doubler = doubler_type(&counter_type);
    let inner = counter(&counter_type, 1);
    inner.set_attr("inner_only", true);
    let p = proxy::create(&doubler, inner, Args::new()).unwrap();
    p.set_attr("proxy_only", true);

    let names = p.dir().unwrap();
    for name in [
        "get_value",
        "get_doubled_value",
        "value",
        "inner_only",
        "proxy_only",
        GETATTR,
        DIR,
    ] {
        assert!(names.contains(name), "missing {name}");
    }
}

#[test]
fn test_dir_on_unbound_proxy() {
    let counter_type = counter_class();
    let doubler = doubler_type(&counter_type);
    let p = proxy::allocate(&doubler).unwrap();

    let names = p.dir().unwrap();
    assert!(names.contains("get_doubled_value"));
    // Class-level names of the proxied type are still advertised.
    assert!(names.contains("get_value"));
    assert!(!names.contains("value"));
}

// ============================================================================
// Worked example: counting database calls
// ============================================================================

fn mock_database(calls: Rc<RefCell<Vec<String>>>) -> ClassRef {
    let on_connect = calls.clone();
    let on_disconnect = calls.clone();
    Class::builder("MockDatabase")
        .method("connect", move |_, _| {
            on_connect.borrow_mut().push("connect".to_string());
            Ok(Value::from("Connected"))
        })
        .method("disconnect", move |_, _| {
            on_disconnect.borrow_mut().push("disconnect".to_string());
            Ok(Value::None)
        })
        .method("execute_query", move |_, args| {
            surrogate::check_arity("execute_query", args, 1)?;
            let query = args[0].extract::<String>()?;
            calls.borrow_mut().push(format!("execute_query({query})"));
            Ok(Value::from("Mocked Result"))
        })
        .build()
}

#[test_log::test]
fn test_database_tracer() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let database = mock_database(calls.clone());
    let base = database.clone();
    let declared = Class::builder("Tracer")
        .base(&database)
        .method("execute_query", move |this, args| {
            let traced = this.get_attr("traced")?.extract::<i64>()?;
            this.set_attr("traced", traced + 1);
            proxy::get(&base, this)?.call_method("execute_query", args)
        })
        .constructor(Signature::new(), |this, _| {
            this.set_attr("traced", 0);
            Ok(())
        })
        .build();
    let tracer = proxy::make_proxy_type(&database, &declared);
    let real = Class::instantiate(&database, Args::new()).unwrap();
    let db = proxy::create(&tracer, real.clone(), Args::new()).unwrap();

    assert_eq!(db.call_method("connect", &[]).unwrap(), Value::from("Connected"));
    assert_eq!(db.call_method("disconnect", &[]).unwrap(), Value::None);
    let result = db
        .call_method("execute_query", &[Value::from("SELECT * FROM users;")])
        .unwrap();
    assert_eq!(result, Value::from("Mocked Result"));

    assert_eq!(
        *calls.borrow(),
        vec![
            "connect".to_string(),
            "disconnect".to_string(),
            "execute_query(SELECT * FROM users;)".to_string(),
        ]
    );
    assert_eq!(db.get_attr("traced").unwrap(), Value::Int(1));
    assert!(proxy::get(&database, &db).unwrap().ptr_eq(&real));

    let err = db.call_method("execute_query", &[]).unwrap_err();
    assert!(matches!(err, ProxyError::MethodArgumentMismatch { .. }));
}
