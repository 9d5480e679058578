//! Declaration API for host types.
//!
//! Types are declared in two steps so member signatures can refer to the type
//! being defined: [`TypeBuilder::declare`] registers the header and hands back
//! a [`MembersBuilder`], whose [`define`](MembersBuilder::define) attaches the
//! member tables. [`TypeBuilder::build`] does both at once.
use crate::{
    assemblies::{Assembly, AssemblyLoader},
    error::{RuntimeError, TypeResolutionError},
    types::{
        attributes::{DuckAttribute, MemberAttributes, TypeAttributes},
        members::{
            Accessibility, CallContext, FieldDefinition, MethodBody, MethodDefinition,
            ParameterDefinition, ParameterKind, PropertyDefinition,
        },
        runtime::RuntimeType,
        TypeDefinition, TypeDescription, TypeKind, TypeMembers, TypeVisibility,
    },
    value::Value,
};
use std::sync::Arc;

fn split_name(full_name: &str) -> (Option<String>, String) {
    match full_name.rsplit_once('.') {
        Some((ns, name)) => (Some(ns.to_string()), name.to_string()),
        None => (None, full_name.to_string()),
    }
}

pub struct TypeBuilder {
    assembly: &'static Assembly,
    namespace: Option<String>,
    name: String,
    kind: TypeKind,
    visibility: TypeVisibility,
    declaring_type: Option<TypeDescription>,
    is_abstract: bool,
    is_sealed: bool,
    extends: Option<TypeDescription>,
    root: bool,
    implements: Vec<TypeDescription>,
    attributes: TypeAttributes,
    members: MembersBuilder,
}

impl TypeBuilder {
    fn new(assembly: &'static Assembly, full_name: &str, kind: TypeKind) -> Self {
        let (namespace, name) = split_name(full_name);
        Self {
            assembly,
            namespace,
            name,
            kind,
            visibility: TypeVisibility::Public,
            declaring_type: None,
            is_abstract: false,
            is_sealed: false,
            extends: None,
            root: false,
            implements: vec![],
            attributes: TypeAttributes::default(),
            members: MembersBuilder::new(),
        }
    }

    pub fn class(assembly: &'static Assembly, full_name: &str) -> Self {
        Self::new(assembly, full_name, TypeKind::Class)
    }

    pub fn interface(assembly: &'static Assembly, full_name: &str) -> Self {
        Self::new(assembly, full_name, TypeKind::Interface)
    }

    pub fn structure(assembly: &'static Assembly, full_name: &str) -> Self {
        Self::new(assembly, full_name, TypeKind::Struct)
    }

    pub fn enumeration(assembly: &'static Assembly, full_name: &str, underlying: RuntimeType) -> Self {
        Self::new(assembly, full_name, TypeKind::Enum(underlying))
    }

    pub fn visibility(mut self, visibility: TypeVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn internal(self) -> Self {
        self.visibility(TypeVisibility::Internal)
    }

    /// Nests this type inside `outer`; the name is then relative to it.
    pub fn nested_in(mut self, outer: TypeDescription, visibility: TypeVisibility) -> Self {
        self.declaring_type = Some(outer);
        self.namespace = None;
        self.visibility = visibility;
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn sealed(mut self) -> Self {
        self.is_sealed = true;
        self
    }

    pub fn extends(mut self, base: TypeDescription) -> Self {
        self.extends = Some(base);
        self
    }

    /// Declares a type without a base class. Only `System.Object` is one.
    pub(crate) fn root(mut self) -> Self {
        self.root = true;
        self
    }

    pub fn implements(mut self, iface: TypeDescription) -> Self {
        self.implements.push(iface);
        self
    }

    pub fn duck_copy(mut self) -> Self {
        self.attributes.duck_copy = true;
        self
    }

    pub fn field(mut self, field: FieldBuilder) -> Self {
        self.members = self.members.field(field);
        self
    }

    pub fn method(mut self, method: MethodBuilder) -> Self {
        self.members = self.members.method(method);
        self
    }

    pub fn property(mut self, property: PropertyBuilder) -> Self {
        self.members = self.members.property(property);
        self
    }

    pub fn auto_property(mut self, property: PropertyBuilder) -> Self {
        self.members = self.members.auto_property(property);
        self
    }

    fn full_name(&self) -> String {
        match (&self.declaring_type, &self.namespace) {
            (Some(outer), _) => format!("{}+{}", outer.type_name(), self.name),
            (None, Some(ns)) => format!("{}.{}", ns, self.name),
            (None, None) => self.name.clone(),
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> TypeResolutionError {
        TypeResolutionError::InvalidDefinition {
            name: self.full_name(),
            reason: reason.into(),
        }
    }

    /// Registers the type header; the members are attached by the returned builder.
    pub fn declare(self) -> Result<(TypeDescription, MembersBuilder), TypeResolutionError> {
        let nested = matches!(
            self.visibility,
            TypeVisibility::NestedPublic | TypeVisibility::NestedInternal | TypeVisibility::NestedPrivate
        );
        if nested != self.declaring_type.is_some() {
            return Err(self.invalid("nested visibility requires a declaring type"));
        }
        if let Some(base) = self.extends {
            if !base.is_class() || base.is_sealed() {
                return Err(self.invalid(format!("cannot derive from {:?}", base)));
            }
        }
        if let Some(iface) = self.implements.iter().find(|i| !i.is_interface()) {
            return Err(self.invalid(format!("{:?} is not an interface", iface)));
        }
        if self.attributes.duck_copy && !matches!(self.kind, TypeKind::Struct) {
            return Err(self.invalid("only structs can be data-copy shapes"));
        }

        let extends = match (self.extends, &self.kind) {
            (Some(base), _) => Some(base),
            (None, _) if self.root => None,
            (None, TypeKind::Interface) => None,
            (None, TypeKind::Class) => Some(AssemblyLoader::global().object_type()),
            (None, TypeKind::Struct) => Some(AssemblyLoader::global().corlib_type("System.ValueType")?),
            (None, TypeKind::Enum(_)) => Some(AssemblyLoader::global().corlib_type("System.Enum")?),
        };

        let mut definition = TypeDefinition::new(self.namespace, self.name, self.assembly, self.kind);
        definition.visibility = self.visibility;
        definition.declaring_type = self.declaring_type;
        definition.is_abstract = self.is_abstract;
        definition.is_sealed = self.is_sealed;
        definition.extends = extends;
        definition.implements = self.implements;
        definition.attributes = self.attributes;

        let td = self.assembly.register(definition)?;
        Ok((td, self.members))
    }

    pub fn build(self) -> Result<TypeDescription, TypeResolutionError> {
        let (td, members) = self.declare()?;
        members.define(td)?;
        Ok(td)
    }
}

#[derive(Default)]
pub struct MembersBuilder {
    fields: Vec<FieldBuilder>,
    methods: Vec<MethodBuilder>,
    properties: Vec<PropertyBuilder>,
}

impl MembersBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: FieldBuilder) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodBuilder) -> Self {
        self.methods.push(method);
        self
    }

    pub fn property(mut self, property: PropertyBuilder) -> Self {
        self.properties.push(property);
        self
    }

    /// A property backed by a generated private field.
    pub fn auto_property(mut self, mut property: PropertyBuilder) -> Self {
        let backing = format!("<{}>k__BackingField", property.name);
        let mut field = FieldBuilder::new(&backing, property.property_type.clone()).private();
        if property.is_static {
            field = field.static_member();
        }
        self.fields.push(field);

        let read = backing.clone();
        property.get = Some(AccessorBuilder {
            accessibility: property.get.as_ref().and_then(|a| a.accessibility),
            body: Some(Arc::new(move |ctx: &mut CallContext<'_>| ctx.field(&read))),
        });
        property.set = Some(AccessorBuilder {
            accessibility: property.set.as_ref().and_then(|a| a.accessibility),
            body: Some(Arc::new(move |ctx: &mut CallContext<'_>| {
                let value = ctx.arg(0)?;
                ctx.set_field(&backing, value)?;
                Ok(Value::Null)
            })),
        });
        self.properties.push(property);
        self
    }

    /// Attaches the members to a declared type.
    ///
    /// Base classes must have their members defined first, since instance
    /// field slots continue after the inherited ones.
    pub fn define(self, td: TypeDescription) -> Result<(), TypeResolutionError> {
        let is_interface = td.is_interface();
        let invalid = |reason: String| TypeResolutionError::InvalidDefinition {
            name: td.type_name(),
            reason,
        };

        let mut instance_slot = td
            .definition()
            .extends
            .map_or(0, |base| base.instance_field_count());
        let mut statics = vec![];
        let mut fields = Vec::with_capacity(self.fields.len());
        for f in self.fields {
            if is_interface && !f.is_static {
                return Err(invalid(format!("interface field {} must be static", f.name)));
            }
            let slot = if f.is_static {
                statics.push(Value::default_for(&f.field_type));
                statics.len() - 1
            } else {
                instance_slot += 1;
                instance_slot - 1
            };
            fields.push(FieldDefinition {
                name: f.name,
                field_type: f.field_type,
                accessibility: f.accessibility,
                is_static: f.is_static,
                is_read_only: f.is_read_only,
                attributes: f.attributes,
                slot,
            });
        }

        let mut methods: Vec<MethodDefinition> = vec![];
        for m in self.methods {
            methods.push(m.finish(td, is_interface, false)?);
        }

        let mut properties = Vec::with_capacity(self.properties.len());
        for p in self.properties {
            let (definition, accessors) = p.finish(td, is_interface, methods.len())?;
            methods.extend(accessors);
            properties.push(definition);
        }

        for (i, m) in methods.iter().enumerate() {
            if methods[..i].iter().any(|earlier| earlier.same_signature_as(m)) {
                return Err(invalid(format!("duplicate method {}", m.name)));
            }
        }

        td.define_members(TypeMembers::new(
            fields,
            methods,
            properties,
            instance_slot,
            statics,
        ))
    }
}

impl MethodDefinition {
    fn same_signature_as(&self, other: &MethodDefinition) -> bool {
        self.name == other.name
            && self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(&other.parameters)
                .all(|(a, b)| a.parameter_type == b.parameter_type && a.kind == b.kind)
    }
}

pub struct FieldBuilder {
    name: String,
    field_type: RuntimeType,
    accessibility: Accessibility,
    is_static: bool,
    is_read_only: bool,
    attributes: MemberAttributes,
}

impl FieldBuilder {
    pub fn new(name: &str, field_type: RuntimeType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            accessibility: Accessibility::Public,
            is_static: false,
            is_read_only: false,
            attributes: MemberAttributes::default(),
        }
    }

    pub fn accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    pub fn private(self) -> Self {
        self.accessibility(Accessibility::Private)
    }

    pub fn internal(self) -> Self {
        self.accessibility(Accessibility::Internal)
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.is_read_only = true;
        self
    }

    pub fn duck(mut self, duck: DuckAttribute) -> Self {
        self.attributes.duck = Some(duck);
        self
    }

    pub fn ignore(mut self) -> Self {
        self.attributes.ignore = true;
        self
    }
}

pub struct MethodBuilder {
    name: String,
    accessibility: Accessibility,
    is_static: bool,
    is_abstract: bool,
    is_virtual: bool,
    parameters: Vec<ParameterDefinition>,
    return_type: RuntimeType,
    generic_parameters: Vec<String>,
    attributes: MemberAttributes,
    body: Option<MethodBody>,
}

impl MethodBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            accessibility: Accessibility::Public,
            is_static: false,
            is_abstract: false,
            is_virtual: false,
            parameters: vec![],
            return_type: RuntimeType::Void,
            generic_parameters: vec![],
            attributes: MemberAttributes::default(),
            body: None,
        }
    }

    pub fn accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    pub fn private(self) -> Self {
        self.accessibility(Accessibility::Private)
    }

    pub fn internal(self) -> Self {
        self.accessibility(Accessibility::Internal)
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn abstract_member(mut self) -> Self {
        self.is_abstract = true;
        self.is_virtual = true;
        self
    }

    pub fn virtual_member(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    fn parameter(mut self, name: &str, ty: RuntimeType, kind: ParameterKind) -> Self {
        self.parameters.push(ParameterDefinition {
            kind,
            ..ParameterDefinition::new(name, ty)
        });
        self
    }

    pub fn param(self, name: &str, ty: RuntimeType) -> Self {
        self.parameter(name, ty, ParameterKind::Value)
    }

    pub fn ref_param(self, name: &str, ty: RuntimeType) -> Self {
        self.parameter(name, ty, ParameterKind::Ref)
    }

    pub fn out_param(self, name: &str, ty: RuntimeType) -> Self {
        self.parameter(name, ty, ParameterKind::Out)
    }

    pub fn in_param(self, name: &str, ty: RuntimeType) -> Self {
        self.parameter(name, ty, ParameterKind::In)
    }

    pub fn optional_param(mut self, name: &str, ty: RuntimeType, default: impl Into<Value>) -> Self {
        self.parameters.push(ParameterDefinition {
            default: Some(default.into()),
            ..ParameterDefinition::new(name, ty)
        });
        self
    }

    /// Copies a parameter list verbatim, directions and defaults included.
    pub fn params(mut self, parameters: impl IntoIterator<Item = ParameterDefinition>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn returns(mut self, ty: RuntimeType) -> Self {
        self.return_type = ty;
        self
    }

    pub fn generic<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generic_parameters = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn duck(mut self, duck: DuckAttribute) -> Self {
        self.attributes.duck = Some(duck);
        self
    }

    pub fn ignore(mut self) -> Self {
        self.attributes.ignore = true;
        self
    }

    pub fn include(mut self) -> Self {
        self.attributes.include = true;
        self
    }

    pub fn reverse<I, S>(mut self, argument_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.reverse_arguments =
            Some(argument_names.into_iter().map(Into::into).collect());
        self
    }

    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }

    pub fn shared_body(mut self, body: MethodBody) -> Self {
        self.body = Some(body);
        self
    }

    fn finish(
        self,
        owner: TypeDescription,
        is_interface: bool,
        special_name: bool,
    ) -> Result<MethodDefinition, TypeResolutionError> {
        let mut definition = MethodDefinition {
            name: self.name,
            accessibility: self.accessibility,
            is_static: self.is_static,
            is_abstract: self.is_abstract,
            is_virtual: self.is_virtual,
            special_name,
            parameters: self.parameters,
            return_type: self.return_type,
            generic_parameters: self.generic_parameters,
            attributes: self.attributes,
            body: self.body,
        };

        if is_interface && !definition.is_static {
            definition.is_abstract = true;
            definition.is_virtual = true;
            definition.body = None;
        }
        if definition.is_abstract {
            if definition.is_static {
                return Err(TypeResolutionError::InvalidDefinition {
                    name: owner.type_name(),
                    reason: format!("static method {} cannot be abstract", definition.name),
                });
            }
            if !owner.is_abstract() {
                return Err(TypeResolutionError::InvalidDefinition {
                    name: owner.type_name(),
                    reason: format!("abstract method {} on a concrete type", definition.name),
                });
            }
            definition.body = None;
        } else if definition.body.is_none() {
            return Err(TypeResolutionError::InvalidDefinition {
                name: owner.type_name(),
                reason: format!("method {} has no body", definition.name),
            });
        }
        Ok(definition)
    }
}

struct AccessorBuilder {
    accessibility: Option<Accessibility>,
    body: Option<MethodBody>,
}

pub struct PropertyBuilder {
    name: String,
    property_type: RuntimeType,
    parameters: Vec<ParameterDefinition>,
    accessibility: Accessibility,
    is_static: bool,
    is_abstract: bool,
    is_virtual: bool,
    get: Option<AccessorBuilder>,
    set: Option<AccessorBuilder>,
    attributes: MemberAttributes,
}

impl PropertyBuilder {
    pub fn new(name: &str, property_type: RuntimeType) -> Self {
        Self {
            name: name.to_string(),
            property_type,
            parameters: vec![],
            accessibility: Accessibility::Public,
            is_static: false,
            is_abstract: false,
            is_virtual: false,
            get: None,
            set: None,
            attributes: MemberAttributes::default(),
        }
    }

    /// An indexer (`this[...]`), conventionally named `Item`.
    pub fn indexer(property_type: RuntimeType) -> Self {
        Self::new("Item", property_type)
    }

    pub fn index(mut self, name: &str, ty: RuntimeType) -> Self {
        self.parameters.push(ParameterDefinition::new(name, ty));
        self
    }

    /// Copies index parameters verbatim.
    pub fn indices(mut self, parameters: impl IntoIterator<Item = ParameterDefinition>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    pub fn private(self) -> Self {
        self.accessibility(Accessibility::Private)
    }

    pub fn internal(self) -> Self {
        self.accessibility(Accessibility::Internal)
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn abstract_member(mut self) -> Self {
        self.is_abstract = true;
        self.is_virtual = true;
        self
    }

    pub fn virtual_member(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    /// Declares a getter without a body (interfaces, abstract properties).
    pub fn readable(mut self) -> Self {
        self.get.get_or_insert(AccessorBuilder {
            accessibility: None,
            body: None,
        });
        self
    }

    /// Declares a setter without a body (interfaces, abstract properties).
    pub fn writable(mut self) -> Self {
        self.set.get_or_insert(AccessorBuilder {
            accessibility: None,
            body: None,
        });
        self
    }

    pub fn get<F>(mut self, body: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        let accessibility = self.get.take().and_then(|g| g.accessibility);
        self.get = Some(AccessorBuilder {
            accessibility,
            body: Some(Arc::new(body)),
        });
        self
    }

    pub fn set<F>(mut self, body: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        let accessibility = self.set.take().and_then(|s| s.accessibility);
        self.set = Some(AccessorBuilder {
            accessibility,
            body: Some(Arc::new(body)),
        });
        self
    }

    pub(crate) fn get_shared(mut self, body: MethodBody) -> Self {
        self.get = Some(AccessorBuilder {
            accessibility: None,
            body: Some(body),
        });
        self
    }

    pub(crate) fn set_shared(mut self, body: MethodBody) -> Self {
        self.set = Some(AccessorBuilder {
            accessibility: None,
            body: Some(body),
        });
        self
    }

    /// Narrows the getter's accessibility below the property's.
    pub fn getter_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.get
            .get_or_insert(AccessorBuilder {
                accessibility: None,
                body: None,
            })
            .accessibility = Some(accessibility);
        self
    }

    /// Narrows the setter's accessibility below the property's.
    pub fn setter_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.set
            .get_or_insert(AccessorBuilder {
                accessibility: None,
                body: None,
            })
            .accessibility = Some(accessibility);
        self
    }

    pub fn duck(mut self, duck: DuckAttribute) -> Self {
        self.attributes.duck = Some(duck);
        self
    }

    pub fn ignore(mut self) -> Self {
        self.attributes.ignore = true;
        self
    }

    pub fn include(mut self) -> Self {
        self.attributes.include = true;
        self
    }

    fn accessor(&self, name: String, accessor: AccessorBuilder, setter: bool) -> MethodBuilder {
        let mut method = MethodBuilder::new(&name)
            .accessibility(accessor.accessibility.unwrap_or(self.accessibility))
            .params(self.parameters.iter().cloned());
        if setter {
            method = method.param("value", self.property_type.clone());
        } else {
            method = method.returns(self.property_type.clone());
        }
        method.is_static = self.is_static;
        method.is_abstract = self.is_abstract;
        method.is_virtual = self.is_virtual;
        method.body = accessor.body;
        method
    }

    fn finish(
        mut self,
        owner: TypeDescription,
        is_interface: bool,
        first_index: usize,
    ) -> Result<(PropertyDefinition, Vec<MethodDefinition>), TypeResolutionError> {
        if self.get.is_none() && self.set.is_none() {
            return Err(TypeResolutionError::InvalidDefinition {
                name: owner.type_name(),
                reason: format!("property {} has no accessors", self.name),
            });
        }
        let mut accessors = vec![];
        let mut getter = None;
        let mut setter = None;
        if let Some(get) = self.get.take() {
            let method = self.accessor(format!("get_{}", self.name), get, false);
            getter = Some(first_index + accessors.len());
            accessors.push(method.finish(owner, is_interface, true)?);
        }
        if let Some(set) = self.set.take() {
            let method = self.accessor(format!("set_{}", self.name), set, true);
            setter = Some(first_index + accessors.len());
            accessors.push(method.finish(owner, is_interface, true)?);
        }
        let definition = PropertyDefinition {
            name: self.name,
            property_type: self.property_type,
            parameters: self.parameters,
            is_static: self.is_static,
            getter,
            setter,
            attributes: self.attributes,
        };
        Ok((definition, accessors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{access::AccessContext, attributes::BindingFlags};

    fn assembly() -> &'static Assembly {
        AssemblyLoader::global().load_assembly("Builder.Tests")
    }

    #[test]
    fn auto_property_round_trips_through_backing_field() {
        let td = TypeBuilder::class(assembly(), "Builder.Tests.Counter")
            .auto_property(PropertyBuilder::new("Count", RuntimeType::Int32))
            .build()
            .unwrap();

        let instance = Value::new_object(td);
        let count = td.property_named("Count").unwrap();
        let access = AccessContext::Public;
        count
            .setter()
            .unwrap()
            .invoke(&access, Some(instance.clone()), &mut [Value::Int32(7)], &[])
            .unwrap();
        let read = count
            .getter()
            .unwrap()
            .invoke(&access, Some(instance), &mut [], &[])
            .unwrap();
        assert_eq!(read, Value::Int32(7));
    }

    #[test]
    fn derived_fields_follow_base_slots() {
        let base = TypeBuilder::class(assembly(), "Builder.Tests.Base")
            .field(FieldBuilder::new("a", RuntimeType::Int32))
            .field(FieldBuilder::new("s", RuntimeType::Int32).static_member())
            .build()
            .unwrap();
        let derived = TypeBuilder::class(assembly(), "Builder.Tests.Derived")
            .extends(base)
            .field(FieldBuilder::new("b", RuntimeType::Int32))
            .build()
            .unwrap();

        assert_eq!(base.instance_field_count(), 1);
        assert_eq!(derived.instance_field_count(), 2);
        assert_eq!(derived.find_field("b", BindingFlags::DEFAULT).unwrap().field.slot, 1);
        assert!(derived.find_field("a", BindingFlags::DEFAULT).is_some());
    }

    #[test]
    fn concrete_methods_need_bodies() {
        let err = TypeBuilder::class(assembly(), "Builder.Tests.NoBody")
            .method(MethodBuilder::new("Run"))
            .build()
            .unwrap_err();
        assert!(matches!(err, TypeResolutionError::InvalidDefinition { .. }));
    }

    #[test]
    fn interface_members_are_abstract() {
        let iface = TypeBuilder::interface(assembly(), "Builder.Tests.IThing")
            .method(MethodBuilder::new("Run").returns(RuntimeType::Int32))
            .property(PropertyBuilder::new("Name", RuntimeType::String).readable())
            .build()
            .unwrap();
        let methods = iface.methods(BindingFlags::DEFAULT);
        assert_eq!(methods.len(), 2);
        assert!(methods.iter().all(|m| m.method.is_abstract && m.method.body.is_none()));
    }

    #[test]
    fn duplicate_type_names_are_rejected() {
        TypeBuilder::class(assembly(), "Builder.Tests.Twice").build().unwrap();
        let err = TypeBuilder::class(assembly(), "Builder.Tests.Twice")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            TypeResolutionError::DuplicateType("Builder.Tests.Twice".to_string())
        );
    }
}
