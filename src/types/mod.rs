//! Host type model: type and member descriptors, with the lookups the duck
//! typing engine matches shapes against.
//!
//! ## Core Types
//!
//! - **[`TypeDescription`]**: Copyable handle to a registered type.
//! - **[`MethodDescription`]**, **[`FieldDescription`]**,
//!   **[`PropertyDescription`]**: Handles to members of a type.
//! - **[`TypeComparer`](comparer::TypeComparer)**: Type equality and assignability.
//! - **[`TypeBuilder`](builder::TypeBuilder)**: Declares new types.
use crate::{
    assemblies::Assembly,
    error::{RuntimeError, TypeResolutionError},
    types::{
        attributes::{BindingFlags, TypeAttributes},
        members::{
            Accessibility, FieldDefinition, FieldDescription, MethodDefinition, MethodDescription,
            PropertyDefinition, PropertyDescription,
        },
        runtime::RuntimeType,
    },
    utils::sync::{OnceLock, RwLock},
    value::Value,
};
use std::{
    fmt::{Debug, Formatter},
    hash::{Hash, Hasher},
};

#[macro_use]
mod macros;

pub mod access;
pub mod attributes;
pub mod builder;
pub mod comparer;
pub mod members;
pub mod runtime;

#[derive(Clone, Debug, PartialEq)]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Enum(RuntimeType),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TypeVisibility {
    #[default]
    Public,
    Internal,
    NestedPublic,
    NestedInternal,
    NestedPrivate,
}

pub struct TypeDefinition {
    pub namespace: Option<String>,
    pub name: String,
    pub assembly: &'static Assembly,
    pub kind: TypeKind,
    pub visibility: TypeVisibility,
    pub declaring_type: Option<TypeDescription>,
    pub is_abstract: bool,
    pub is_sealed: bool,
    pub extends: Option<TypeDescription>,
    pub implements: Vec<TypeDescription>,
    pub attributes: TypeAttributes,
    members: OnceLock<TypeMembers>,
}

impl TypeDefinition {
    pub(crate) fn new(
        namespace: Option<String>,
        name: String,
        assembly: &'static Assembly,
        kind: TypeKind,
    ) -> Self {
        Self {
            namespace,
            name,
            assembly,
            kind,
            visibility: TypeVisibility::Public,
            declaring_type: None,
            is_abstract: false,
            is_sealed: false,
            extends: None,
            implements: vec![],
            attributes: TypeAttributes::default(),
            members: OnceLock::new(),
        }
    }
}

/// The member tables of a type, attached once after its header is registered.
#[derive(Default)]
pub struct TypeMembers {
    pub fields: Vec<FieldDefinition>,
    pub methods: Vec<MethodDefinition>,
    pub properties: Vec<PropertyDefinition>,
    /// Instance slots including those inherited from base classes.
    pub instance_field_count: usize,
    statics: RwLock<Vec<Value>>,
}

impl TypeMembers {
    pub(crate) fn new(
        fields: Vec<FieldDefinition>,
        methods: Vec<MethodDefinition>,
        properties: Vec<PropertyDefinition>,
        instance_field_count: usize,
        statics: Vec<Value>,
    ) -> Self {
        Self {
            fields,
            methods,
            properties,
            instance_field_count,
            statics: RwLock::new(statics),
        }
    }
}

#[derive(Clone, Copy)]
pub struct TypeDescription {
    definition_ptr: Option<&'static TypeDefinition>,
}

impl TypeDescription {
    pub const NULL: Self = Self {
        definition_ptr: None,
    };

    pub const fn new(definition: &'static TypeDefinition) -> Self {
        Self {
            definition_ptr: Some(definition),
        }
    }

    pub fn definition(&self) -> &'static TypeDefinition {
        match self.definition_ptr {
            Some(d) => d,
            None => {
                panic!("Attempted to access definition of a null TypeDescription")
            }
        }
    }

    pub const fn is_null(&self) -> bool {
        self.definition_ptr.is_none()
    }

    pub fn name(&self) -> &'static str {
        &self.definition().name
    }

    pub fn assembly(&self) -> &'static Assembly {
        self.definition().assembly
    }

    /// Full name; nested types are joined to their declaring type with `+`.
    pub fn type_name(&self) -> String {
        let def = self.definition();
        match (&def.declaring_type, &def.namespace) {
            (Some(outer), _) => format!("{}+{}", outer.type_name(), def.name),
            (None, Some(ns)) if !ns.is_empty() => format!("{}.{}", ns, def.name),
            _ => def.name.clone(),
        }
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.definition().kind, TypeKind::Interface)
    }

    pub fn is_class(&self) -> bool {
        matches!(self.definition().kind, TypeKind::Class)
    }

    pub fn is_value_type(&self) -> bool {
        matches!(
            self.definition().kind,
            TypeKind::Struct | TypeKind::Enum(_)
        )
    }

    pub fn is_enum(&self) -> Option<&'static RuntimeType> {
        match &self.definition().kind {
            TypeKind::Enum(underlying) => Some(underlying),
            _ => None,
        }
    }

    pub fn is_abstract(&self) -> bool {
        self.definition().is_abstract || self.is_interface()
    }

    pub fn is_sealed(&self) -> bool {
        self.definition().is_sealed || self.is_value_type()
    }

    pub fn is_duck_copy(&self) -> bool {
        self.is_value_type() && self.definition().attributes.duck_copy
    }

    /// Public, or nested-public inside a visible type.
    pub fn is_visible(&self) -> bool {
        let def = self.definition();
        match def.visibility {
            TypeVisibility::Public => true,
            TypeVisibility::NestedPublic => def.declaring_type.is_some_and(|d| d.is_visible()),
            _ => false,
        }
    }

    pub fn members(&self) -> &'static TypeMembers {
        self.definition().members.get_or_init(TypeMembers::default)
    }

    pub fn has_members(&self) -> bool {
        self.definition().members.get().is_some()
    }

    pub(crate) fn define_members(&self, members: TypeMembers) -> Result<(), TypeResolutionError> {
        self.definition()
            .members
            .set(members)
            .map_err(|_| TypeResolutionError::MembersAlreadyDefined(self.type_name()))
    }

    pub fn instance_field_count(&self) -> usize {
        self.members().instance_field_count
    }

    pub(crate) fn read_static(&self, slot: usize) -> Result<Value, RuntimeError> {
        self.members().statics.read().get(slot).cloned().ok_or_else(|| {
            RuntimeError::InvalidProgram(format!(
                "static slot {} out of range on {}",
                slot,
                self.type_name()
            ))
        })
    }

    pub(crate) fn write_static(&self, slot: usize, value: Value) -> Result<(), RuntimeError> {
        let mut statics = self.members().statics.write();
        match statics.get_mut(slot) {
            Some(s) => {
                *s = value;
                Ok(())
            }
            None => Err(RuntimeError::InvalidProgram(format!(
                "static slot {} out of range on {}",
                slot,
                self.type_name()
            ))),
        }
    }

    /// This type followed by its base class chain.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors {
            child: (!self.is_null()).then_some(*self),
        }
    }

    /// Every interface implemented by this type, its bases, and their base
    /// interfaces, without duplicates, in declaration order.
    pub fn interfaces(&self) -> Vec<TypeDescription> {
        fn visit(iface: TypeDescription, out: &mut Vec<TypeDescription>) {
            if out.contains(&iface) {
                return;
            }
            out.push(iface);
            for base in &iface.definition().implements {
                visit(*base, out);
            }
        }

        let mut out = vec![];
        for ancestor in self.ancestors() {
            for iface in &ancestor.definition().implements {
                visit(*iface, &mut out);
            }
        }
        out
    }

    pub fn implements(&self, iface: TypeDescription) -> bool {
        self.interfaces().contains(&iface)
    }

    /// Types whose members this type exposes: base classes for classes and
    /// structs, base interfaces for interfaces.
    fn hierarchy(&self) -> Vec<TypeDescription> {
        if self.is_interface() {
            std::iter::once(*self).chain(self.interfaces()).collect()
        } else {
            self.ancestors().collect()
        }
    }

    pub fn declared_methods(&self) -> impl Iterator<Item = MethodDescription> {
        let parent = *self;
        self.members()
            .methods
            .iter()
            .map(move |method| MethodDescription { parent, method })
    }

    pub fn declared_fields(&self) -> impl Iterator<Item = FieldDescription> {
        let parent = *self;
        self.members()
            .fields
            .iter()
            .map(move |field| FieldDescription { parent, field })
    }

    pub fn declared_properties(&self) -> impl Iterator<Item = PropertyDescription> {
        let parent = *self;
        self.members()
            .properties
            .iter()
            .map(move |property| PropertyDescription { parent, property })
    }

    pub(crate) fn method_at(&self, index: usize) -> MethodDescription {
        MethodDescription {
            parent: *self,
            method: &self.members().methods[index],
        }
    }

    /// Methods visible on this type, most derived first. Overridden or hidden
    /// base methods and private members of base types are left out.
    pub fn methods(&self, flags: BindingFlags) -> Vec<MethodDescription> {
        let mut found: Vec<MethodDescription> = vec![];
        for (depth, owner) in self.hierarchy().into_iter().enumerate() {
            for m in owner.declared_methods() {
                if depth > 0 && m.method.accessibility == Accessibility::Private {
                    continue;
                }
                if !flags.admits(m.is_static(), m.is_public()) {
                    continue;
                }
                if found.iter().any(|f| f.has_same_signature(&m)) {
                    continue;
                }
                found.push(m);
            }
        }
        found
    }

    pub fn fields(&self, flags: BindingFlags) -> Vec<FieldDescription> {
        let mut found: Vec<FieldDescription> = vec![];
        for (depth, owner) in self.hierarchy().into_iter().enumerate() {
            for f in owner.declared_fields() {
                if depth > 0 && f.field.accessibility == Accessibility::Private {
                    continue;
                }
                if !flags.admits(f.is_static(), f.is_public()) {
                    continue;
                }
                if found.iter().any(|existing| existing.name() == f.name()) {
                    continue;
                }
                found.push(f);
            }
        }
        found
    }

    pub fn properties(&self, flags: BindingFlags) -> Vec<PropertyDescription> {
        let mut found: Vec<PropertyDescription> = vec![];
        for (depth, owner) in self.hierarchy().into_iter().enumerate() {
            for p in owner.declared_properties() {
                let is_private = p.getter().map_or(true, |m| m.method.accessibility == Accessibility::Private)
                    && p.setter().map_or(true, |m| m.method.accessibility == Accessibility::Private);
                if depth > 0 && is_private {
                    continue;
                }
                if !flags.admits(p.property.is_static, p.is_public()) {
                    continue;
                }
                let shadowed = found.iter().any(|existing| {
                    existing.name() == p.name()
                        && existing
                            .index_parameters()
                            .iter()
                            .map(|i| &i.parameter_type)
                            .eq(p.index_parameters().iter().map(|i| &i.parameter_type))
                });
                if shadowed {
                    continue;
                }
                found.push(p);
            }
        }
        found
    }

    /// Exact lookup by name and parameter types.
    pub fn find_method(
        &self,
        name: &str,
        flags: BindingFlags,
        parameter_types: &[RuntimeType],
    ) -> Option<MethodDescription> {
        self.methods(flags).into_iter().find(|m| {
            m.name() == name && m.method.parameter_types().eq(parameter_types.iter())
        })
    }

    /// Lookup by name; `index_types` selects a specific indexer overload.
    /// Without it a non-indexed property is preferred.
    pub fn find_property(
        &self,
        name: &str,
        flags: BindingFlags,
        index_types: Option<&[RuntimeType]>,
    ) -> Option<PropertyDescription> {
        let candidates: Vec<_> = self
            .properties(flags)
            .into_iter()
            .filter(|p| p.name() == name)
            .collect();
        match index_types {
            Some(types) => candidates.into_iter().find(|p| {
                p.index_parameters()
                    .iter()
                    .map(|i| &i.parameter_type)
                    .eq(types.iter())
            }),
            None => candidates
                .iter()
                .find(|p| p.index_parameters().is_empty())
                .or(candidates.first())
                .copied(),
        }
    }

    pub fn find_field(&self, name: &str, flags: BindingFlags) -> Option<FieldDescription> {
        self.fields(flags).into_iter().find(|f| f.name() == name)
    }

    /// Any field reachable from this type by name, including base privates.
    pub fn field_named(&self, name: &str) -> Option<FieldDescription> {
        self.ancestors()
            .flat_map(|a| a.declared_fields())
            .find(|f| f.name() == name)
    }

    pub fn property_named(&self, name: &str) -> Option<PropertyDescription> {
        self.find_property(name, BindingFlags::DEFAULT, None)
    }
}

impl Debug for TypeDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.definition_ptr {
            None => write!(f, "NULL"),
            Some(_) => write!(f, "{}", self.type_name()),
        }
    }
}

impl PartialEq for TypeDescription {
    fn eq(&self, other: &Self) -> bool {
        match (self.definition_ptr, other.definition_ptr) {
            (Some(a), Some(b)) => std::ptr::eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for TypeDescription {}

impl Hash for TypeDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.definition_ptr
            .map_or(std::ptr::null(), |d| d as *const TypeDefinition)
            .hash(state);
    }
}

pub struct Ancestors {
    child: Option<TypeDescription>,
}

impl Iterator for Ancestors {
    type Item = TypeDescription;

    fn next(&mut self) -> Option<Self::Item> {
        let child = self.child?;
        self.child = child.definition().extends;
        Some(child)
    }
}
