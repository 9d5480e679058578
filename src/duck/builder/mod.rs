//! Construction of adapter types.
//!
//! An adapter is a sealed public class registered into the target's
//! code-generation arena. It implements (or, for abstract classes, extends)
//! the shape plus `IDuckType`, keeps the target in a single instance field,
//! and implements every forwarded member with a native body that runs the
//! member's [`ForwardingRoutine`] against that field.
use crate::{
    assemblies::AssemblyLoader,
    duck::{
        config::DuckTypeConfig,
        emit::{executor::execute, ForwardingRoutine},
        module::{ModuleBuilder, ModuleRegistry},
        proxy::ProxyType,
    },
    error::{DuckTypeError, RuntimeError},
    types::{
        attributes::BindingFlags,
        builder::{FieldBuilder, MethodBuilder, PropertyBuilder, TypeBuilder},
        members::{CallContext, MethodBody, MethodDescription, PropertyDescription},
        runtime::RuntimeType,
        TypeDescription,
    },
    utils::sync::Arc,
    value::Value,
};
use tracing::{debug, trace};

mod fields;
mod methods;
mod properties;
mod structs;

use properties::PropertyRoutines;

/// Name of the adapter field holding the target instance.
pub const INSTANCE_FIELD: &str = "_currentInstance";

pub(crate) struct AdapterContext<'a> {
    pub loader: &'static AssemblyLoader,
    pub module: Arc<ModuleBuilder>,
    pub shape: TypeDescription,
    pub target: TypeDescription,
    pub config: &'a DuckTypeConfig,
}

impl AdapterContext<'_> {
    fn routine_name(&self, member: &str) -> String {
        format!("{}::{}", self.target.type_name(), member)
    }
}

/// Generates the adapter of `shape` over `target`.
pub(crate) fn build_proxy_type(
    loader: &'static AssemblyLoader,
    modules: &ModuleRegistry,
    config: &DuckTypeConfig,
    shape: TypeDescription,
    target: TypeDescription,
) -> Result<ProxyType, DuckTypeError> {
    validate_shape(shape)?;

    let module = modules.module_for(loader, target)?;
    module.ensure_type_visibility(target);

    let ctx = AdapterContext {
        loader,
        module,
        shape,
        target,
        config,
    };
    if shape.is_duck_copy() {
        structs::build_copy_proxy(&ctx)
    } else {
        build_live_proxy(&ctx)
    }
}

fn validate_shape(shape: TypeDescription) -> Result<(), DuckTypeError> {
    let invalid = |reason: &str| DuckTypeError::TypeIsNotValid {
        name: shape.type_name(),
        reason: reason.to_string(),
    };

    if !shape.is_visible() {
        return Err(DuckTypeError::TypeIsNotPublic(shape.type_name()));
    }
    if shape.is_value_type() {
        if !shape.is_duck_copy() {
            return Err(invalid("value type shapes must be marked as data-copy"));
        }
    } else if shape.is_sealed() {
        return Err(invalid("sealed types can't be extended"));
    }
    Ok(())
}

/// A shape member to implement; `optional` ones have a body on the shape
/// that stays in place if no target member is found.
struct ShapeMember<T> {
    member: T,
    optional: bool,
}

fn overridable(method: Option<MethodDescription>) -> bool {
    method.is_some_and(|m| m.method.is_abstract || m.method.is_virtual)
}

fn same_property(a: &PropertyDescription, b: &PropertyDescription) -> bool {
    a.name() == b.name()
        && a.index_parameters()
            .iter()
            .map(|p| &p.parameter_type)
            .eq(b.index_parameters().iter().map(|p| &p.parameter_type))
}

fn shape_members(
    loader: &AssemblyLoader,
    shape: TypeDescription,
) -> (
    Vec<ShapeMember<PropertyDescription>>,
    Vec<ShapeMember<MethodDescription>>,
) {
    let object = loader.object_type();
    let duck_type = loader.duck_type_interface();
    let flags = BindingFlags::INSTANCE | BindingFlags::PUBLIC | BindingFlags::NON_PUBLIC;

    let mut owners = vec![shape];
    if !shape.is_interface() {
        owners.extend(shape.interfaces());
    }
    let skipped = |owner: TypeDescription| owner == object || owner == duck_type;

    // Interface members a class shape already implements with a body.
    let concrete: Vec<MethodDescription> = match shape.is_interface() {
        true => vec![],
        false => shape
            .methods(flags)
            .into_iter()
            .filter(|m| m.method.body.is_some())
            .collect(),
    };
    let implemented = |m: Option<MethodDescription>| {
        m.is_some_and(|m| m.parent.is_interface() && concrete.iter().any(|c| c.has_same_signature(&m)))
    };

    let mut properties: Vec<ShapeMember<PropertyDescription>> = vec![];
    for p in owners.iter().flat_map(|o| o.properties(flags)) {
        if skipped(p.parent) || p.property.attributes.ignore {
            continue;
        }
        if !overridable(p.getter()) && !overridable(p.setter()) {
            continue;
        }
        if implemented(p.getter()) || implemented(p.setter()) {
            continue;
        }
        if properties.iter().any(|seen| same_property(&seen.member, &p)) {
            continue;
        }
        let is_abstract = |m: Option<MethodDescription>| m.is_some_and(|m| m.method.is_abstract);
        properties.push(ShapeMember {
            member: p,
            optional: !is_abstract(p.getter()) && !is_abstract(p.setter()),
        });
    }

    let mut methods: Vec<ShapeMember<MethodDescription>> = vec![];
    for m in owners.iter().flat_map(|o| o.methods(flags)) {
        if skipped(m.parent) || m.method.special_name || m.method.attributes.ignore {
            continue;
        }
        if !overridable(Some(m)) || implemented(Some(m)) {
            continue;
        }
        let object_member = object.declared_methods().any(|o| o.has_same_signature(&m));
        if object_member && !m.method.attributes.include {
            continue;
        }
        if methods.iter().any(|seen| seen.member.has_same_signature(&m)) {
            continue;
        }
        methods.push(ShapeMember {
            member: m,
            optional: !m.method.is_abstract,
        });
    }

    (properties, methods)
}

fn is_not_found(error: &DuckTypeError) -> bool {
    matches!(
        error,
        DuckTypeError::TargetMethodNotFound { .. } | DuckTypeError::PropertyOrFieldNotFound { .. }
    )
}

fn build_live_proxy(ctx: &AdapterContext<'_>) -> Result<ProxyType, DuckTypeError> {
    let (properties, methods) = shape_members(ctx.loader, ctx.shape);

    let mut adapter = if ctx.shape.is_interface() {
        AdapterDefinition::new(ctx, ctx.loader.object_type(), Some(ctx.shape))
    } else {
        AdapterDefinition::new(ctx, ctx.shape, None)
    };

    for ShapeMember { member, optional } in properties {
        match properties::write_property(ctx, member) {
            Ok(routines) => adapter = adapter.property(member, routines),
            Err(e) if optional && is_not_found(&e) => {
                debug!("keeping the shape's own {:?}: {}", member, e)
            }
            Err(e) => return Err(e),
        }
    }
    for ShapeMember { member, optional } in methods {
        match methods::write_method(ctx, member) {
            Ok(routine) => adapter = adapter.method(member, routine),
            Err(e) if optional && is_not_found(&e) => {
                debug!("keeping the shape's own {:?}: {}", member, e)
            }
            Err(e) => return Err(e),
        }
    }

    let instance_slot = adapter.instance_slot;
    let description = adapter.define()?;
    Ok(ProxyType {
        description,
        shape: ctx.shape,
        target: ctx.target,
        module: ctx.module.clone(),
        instance_slot,
        copy: None,
    })
}

fn read_instance(ctx: &CallContext<'_>, slot: usize) -> Result<Value, RuntimeError> {
    match ctx.this()? {
        Value::Object(adapter) => adapter.read_field(slot),
        _ => Err(RuntimeError::NullReference),
    }
}

/// The adapter class being assembled.
struct AdapterDefinition {
    builder: TypeBuilder,
    instance_slot: usize,
    trace_routines: bool,
}

impl AdapterDefinition {
    fn new(
        ctx: &AdapterContext<'_>,
        base: TypeDescription,
        shape_interface: Option<TypeDescription>,
    ) -> Self {
        let name = ctx.module.next_type_name(ctx.shape, ctx.target);
        let mut builder = TypeBuilder::class(ctx.module.assembly(), &name)
            .sealed()
            .extends(base);
        if let Some(iface) = shape_interface {
            builder = builder.implements(iface);
        }

        let instance_slot = base.instance_field_count();
        let target_name = ctx.target.type_name();
        let builder = builder
            .implements(ctx.loader.duck_type_interface())
            .field(FieldBuilder::new(INSTANCE_FIELD, RuntimeType::Object).private().read_only())
            .property(
                PropertyBuilder::new("Instance", RuntimeType::Object).get_shared(Arc::new(
                    move |call: &mut CallContext<'_>| read_instance(call, instance_slot),
                )),
            )
            .property(
                PropertyBuilder::new("Type", RuntimeType::String).get_shared(Arc::new(
                    move |_: &mut CallContext<'_>| Ok(Value::from(target_name.as_str())),
                )),
            );

        debug!("declaring adapter {}", name);
        Self {
            builder,
            instance_slot,
            trace_routines: ctx.config.trace_routines,
        }
    }

    fn forward(&self, routine: ForwardingRoutine) -> MethodBody {
        if self.trace_routines {
            trace!("{}", routine);
        }
        let slot = self.instance_slot;
        Arc::new(move |call: &mut CallContext<'_>| {
            let instance = read_instance(call, slot)?;
            execute(&routine, &instance, call.args, call.generics)
        })
    }

    fn property(mut self, shape_property: PropertyDescription, routines: PropertyRoutines) -> Self {
        let mut property =
            PropertyBuilder::new(shape_property.name(), shape_property.property_type().clone())
                .indices(shape_property.index_parameters().iter().cloned())
                .virtual_member();
        if let Some(getter) = routines.getter {
            property = property.get_shared(self.forward(getter));
        }
        if let Some(setter) = routines.setter {
            property = property.set_shared(self.forward(setter));
        }
        self.builder = self.builder.property(property);
        self
    }

    /// A read-only property with no shape counterpart.
    fn getter(mut self, name: &str, property_type: &RuntimeType, routine: ForwardingRoutine) -> Self {
        let property =
            PropertyBuilder::new(name, property_type.clone()).get_shared(self.forward(routine));
        self.builder = self.builder.property(property);
        self
    }

    fn method(mut self, shape_method: MethodDescription, routine: ForwardingRoutine) -> Self {
        let method = MethodBuilder::new(shape_method.name())
            .params(shape_method.parameters().iter().cloned())
            .returns(shape_method.return_type().clone())
            .generic(shape_method.method.generic_parameters.iter().cloned())
            .virtual_member()
            .shared_body(self.forward(routine));
        self.builder = self.builder.method(method);
        self
    }

    fn define(self) -> Result<TypeDescription, DuckTypeError> {
        Ok(self.builder.build()?)
    }
}
