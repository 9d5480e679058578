mod common;

use common::{adapt, Fixture};
use dotnet_duck::{
    duck::DuckProxy,
    duck_shape,
    types::{
        builder::{MethodBuilder, PropertyBuilder},
        TypeDescription,
    },
    DuckShape, DuckType, DuckTypeError, DuckTypeExtensions, RuntimeType, Value,
};
use std::sync::{Arc, OnceLock};

fn greeter_fixture() -> &'static (TypeDescription, TypeDescription, TypeDescription) {
    static TYPES: OnceLock<(TypeDescription, TypeDescription, TypeDescription)> = OnceLock::new();
    TYPES.get_or_init(|| {
        let fx = Fixture::new("Caching.Greeter");
        let shape = fx
            .interface("IGreeter")
            .method(
                MethodBuilder::new("Greet")
                    .param("name", RuntimeType::String)
                    .returns(RuntimeType::String),
            )
            .build()
            .unwrap();
        let greeter = fx
            .class("Greeter")
            .method(
                MethodBuilder::new("Greet")
                    .param("name", RuntimeType::String)
                    .returns(RuntimeType::String)
                    .private()
                    .body(|ctx| {
                        let name = ctx.arg(0)?;
                        Ok(Value::from(format!("hi {}", name.as_str().unwrap_or_default())))
                    }),
            )
            .build()
            .unwrap();
        let mute = fx.class("Mute").build().unwrap();
        (shape, greeter, mute)
    })
}

duck_shape!(pub Greeter => greeter_fixture().0);

#[test]
fn failures_are_cached_and_replayed() {
    let fx = Fixture::new("Caching.Failures");
    let shape = fx
        .interface("IRun")
        .method(MethodBuilder::new("Run"))
        .build()
        .unwrap();
    let target = fx.class("Target").build().unwrap();

    let first = DuckType::global().get_or_create_proxy_type(shape, target);
    let second = DuckType::global().get_or_create_proxy_type(shape, target);
    assert!(Arc::ptr_eq(&first, &second));
    assert!(!first.can_create());

    let a = DuckType::global()
        .create(shape, &Value::new_object(target))
        .unwrap_err();
    let b = DuckType::global()
        .create(shape, &Value::new_object(target))
        .unwrap_err();
    assert_eq!(a, b);
    assert_eq!(Some(&a), first.error());
}

#[test]
fn adapter_types_are_generated_once_per_pair() {
    let fx = Fixture::new("Caching.Stable");
    let shape = fx
        .interface("IValue")
        .property(PropertyBuilder::new("Value", RuntimeType::Int32).readable())
        .build()
        .unwrap();
    let target = fx
        .class("Target")
        .auto_property(PropertyBuilder::new("Value", RuntimeType::Int32))
        .build()
        .unwrap();

    let a = adapt(shape, &Value::new_object(target));
    let b = adapt(shape, &Value::new_object(target));
    assert_eq!(a.proxy_type(), b.proxy_type());
    assert_ne!(a.instance().unwrap(), b.instance().unwrap());
}

#[test]
fn concurrent_requests_share_one_generation() {
    let fx = Fixture::new("Caching.Concurrent");
    let shape = fx
        .interface("IValue")
        .property(PropertyBuilder::new("Value", RuntimeType::Int32).readable())
        .build()
        .unwrap();
    let target = fx
        .class("Target")
        .auto_property(PropertyBuilder::new("Value", RuntimeType::Int32).private())
        .build()
        .unwrap();

    let proxies: Vec<TypeDescription> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    let adapter = adapt(shape, &Value::new_object(target));
                    assert_eq!(adapter.get("Value").unwrap(), Value::Int32(0));
                    adapter.proxy_type()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(proxies.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn shape_handles_cast_and_test_values() {
    let (_, greeter, mute) = *greeter_fixture();
    let value = Value::new_object(greeter);

    let handle: Greeter = value.duck_cast().unwrap();
    assert_eq!(
        handle.call("Greet", &mut [Value::from("Bob")]).unwrap(),
        Value::from("hi Bob")
    );
    assert_eq!(handle.instance().unwrap(), value);

    assert!(value.duck_is::<Greeter>());
    assert!(value.duck_as::<Greeter>().is_some());
    assert!(DuckType::global().can_create_as::<Greeter>(&value));
    assert_eq!(
        Greeter::create_cache().get_proxy(greeter).proxy_type().unwrap().shape(),
        Greeter::shape()
    );

    let silent = Value::new_object(mute);
    assert!(!silent.duck_is::<Greeter>());
    assert!(silent.duck_as::<Greeter>().is_none());
    assert!(matches!(silent.try_duck_cast::<Greeter>(), Ok(None)));
    assert!(matches!(
        silent.duck_cast::<Greeter>(),
        Err(DuckTypeError::TargetMethodNotFound { .. })
    ));
}

#[test]
fn null_values_are_rejected() {
    assert!(!Value::Null.duck_is::<Greeter>());
    assert!(Value::Null.duck_as::<Greeter>().is_none());
    assert_eq!(
        Value::Null.try_duck_cast::<Greeter>(),
        Err(DuckTypeError::ArgumentNull)
    );
    assert_eq!(
        DuckType::global().create(TypeDescription::NULL, &Value::from("x")),
        Err(DuckTypeError::ArgumentNull)
    );
    assert!(DuckProxy::new(Value::from("not an adapter")).is_err());
}

#[test]
fn statistics_serialize_to_json() {
    let (shape, greeter, _) = *greeter_fixture();
    DuckType::global()
        .create(shape, &Value::new_object(greeter))
        .unwrap();

    let stats = DuckType::global().stats();
    let json = serde_json::to_value(stats).unwrap();
    for key in ["proxy_types", "fast_path", "assembly_type", "generations", "trampolines"] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }
    if DuckType::global().metrics().is_enabled() {
        assert!(stats.generations >= 1);
        assert!(stats.proxy_types.size >= 1);
    }
    assert!(stats.to_string().starts_with("Duck Type Statistics:"));
}
