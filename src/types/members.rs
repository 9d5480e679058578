use crate::{
    error::RuntimeError,
    types::{
        access::AccessContext, attributes::MemberAttributes, runtime::RuntimeType,
        TypeDescription,
    },
    value::Value,
};
use std::{
    fmt::{Debug, Formatter},
    hash::{Hash, Hasher},
    sync::Arc,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Accessibility {
    #[default]
    Public,
    Internal,
    Protected,
    Private,
}

impl Accessibility {
    pub fn is_public(self) -> bool {
        matches!(self, Accessibility::Public)
    }
}

/// How an argument is passed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    #[default]
    Value,
    Ref,
    Out,
    In,
}

impl ParameterKind {
    pub fn is_by_ref(self) -> bool {
        !matches!(self, ParameterKind::Value)
    }

    pub fn is_out(self) -> bool {
        matches!(self, ParameterKind::Out)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParameterDefinition {
    pub name: String,
    pub parameter_type: RuntimeType,
    pub kind: ParameterKind,
    /// Present for optional parameters.
    pub default: Option<Value>,
}

impl ParameterDefinition {
    pub fn new(name: impl Into<String>, parameter_type: RuntimeType) -> Self {
        Self {
            name: name.into(),
            parameter_type,
            kind: ParameterKind::Value,
            default: None,
        }
    }

    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

pub type MethodBody =
    Arc<dyn Fn(&mut CallContext<'_>) -> Result<Value, RuntimeError> + Send + Sync>;

pub struct MethodDefinition {
    pub name: String,
    pub accessibility: Accessibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_virtual: bool,
    /// Property accessors.
    pub special_name: bool,
    pub parameters: Vec<ParameterDefinition>,
    pub return_type: RuntimeType,
    pub generic_parameters: Vec<String>,
    pub attributes: MemberAttributes,
    pub body: Option<MethodBody>,
}

impl MethodDefinition {
    pub fn parameter_types(&self) -> impl Iterator<Item = &RuntimeType> {
        self.parameters.iter().map(|p| &p.parameter_type)
    }

    pub fn is_generic(&self) -> bool {
        !self.generic_parameters.is_empty()
    }

    fn same_signature(&self, other: &MethodDefinition) -> bool {
        self.name == other.name
            && self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(&other.parameters)
                .all(|(a, b)| {
                    a.parameter_type == b.parameter_type
                        && a.kind.is_by_ref() == b.kind.is_by_ref()
                })
    }
}

pub struct FieldDefinition {
    pub name: String,
    pub field_type: RuntimeType,
    pub accessibility: Accessibility,
    pub is_static: bool,
    pub is_read_only: bool,
    pub attributes: MemberAttributes,
    /// Index into the instance field slots, or into the owner's static slots.
    pub slot: usize,
}

pub struct PropertyDefinition {
    pub name: String,
    pub property_type: RuntimeType,
    pub parameters: Vec<ParameterDefinition>,
    pub is_static: bool,
    pub getter: Option<usize>,
    pub setter: Option<usize>,
    pub attributes: MemberAttributes,
}

#[derive(Clone, Copy)]
pub struct MethodDescription {
    pub parent: TypeDescription,
    pub method: &'static MethodDefinition,
}

impl MethodDescription {
    pub fn name(&self) -> &'static str {
        &self.method.name
    }

    pub fn is_public(&self) -> bool {
        self.method.accessibility.is_public()
    }

    pub fn is_static(&self) -> bool {
        self.method.is_static
    }

    pub fn parameters(&self) -> &'static [ParameterDefinition] {
        &self.method.parameters
    }

    pub fn return_type(&self) -> &'static RuntimeType {
        &self.method.return_type
    }

    pub fn has_same_signature(&self, other: &MethodDescription) -> bool {
        self.method.same_signature(other.method)
    }

    /// Picks the override of a virtual method declared by the runtime type of `this`.
    pub fn resolve_virtual(&self, runtime: TypeDescription) -> MethodDescription {
        if !(self.method.is_virtual || self.method.is_abstract) || runtime == self.parent {
            return *self;
        }
        runtime
            .ancestors()
            .take_while(|a| *a != self.parent)
            .flat_map(|a| a.declared_methods())
            .find(|m| m.method.body.is_some() && m.has_same_signature(self))
            .unwrap_or(*self)
    }

    pub fn invoke(
        &self,
        access: &AccessContext,
        this: Option<Value>,
        args: &mut [Value],
        generics: &[RuntimeType],
    ) -> Result<Value, RuntimeError> {
        access.check_member(self.parent, self.method.accessibility, || {
            format!("{:?}", self)
        })?;

        if args.len() != self.method.parameters.len() {
            return Err(RuntimeError::ArgumentCount {
                member: format!("{:?}", self),
                expected: self.method.parameters.len(),
                actual: args.len(),
            });
        }

        let (target, this) = if self.method.is_static {
            (*self, None)
        } else {
            match this {
                Some(v) if !v.is_null() => {
                    let target = match v.type_handle() {
                        Some(runtime) => self.resolve_virtual(runtime),
                        None => *self,
                    };
                    (target, Some(v))
                }
                _ => return Err(RuntimeError::NullReference),
            }
        };

        let Some(body) = target.method.body.as_ref() else {
            return Err(RuntimeError::AbstractMember(format!("{:?}", target)));
        };

        let mut ctx = CallContext {
            method: target,
            this,
            args,
            generics,
        };
        body(&mut ctx)
    }
}

fn write_parameters(f: &mut Formatter<'_>, parameters: &[ParameterDefinition]) -> std::fmt::Result {
    write!(f, "(")?;
    for (i, p) in parameters.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        match p.kind {
            ParameterKind::Value => {}
            ParameterKind::Ref => write!(f, "ref ")?,
            ParameterKind::Out => write!(f, "out ")?,
            ParameterKind::In => write!(f, "in ")?,
        }
        write!(f, "{}", p.parameter_type.get_name())?;
    }
    write!(f, ")")
}

impl Debug for MethodDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.method.is_static {
            write!(f, "static ")?;
        }
        write!(
            f,
            "{} {}::{}",
            self.method.return_type.get_name(),
            self.parent.type_name(),
            self.method.name
        )?;
        if self.method.is_generic() {
            write!(f, "<{}>", self.method.generic_parameters.join(", "))?;
        }
        write_parameters(f, &self.method.parameters)
    }
}

impl PartialEq for MethodDescription {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.method, other.method)
    }
}

impl Eq for MethodDescription {}

impl Hash for MethodDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.method as *const MethodDefinition).hash(state);
    }
}

#[derive(Clone, Copy)]
pub struct FieldDescription {
    pub parent: TypeDescription,
    pub field: &'static FieldDefinition,
}

impl FieldDescription {
    pub fn name(&self) -> &'static str {
        &self.field.name
    }

    pub fn is_public(&self) -> bool {
        self.field.accessibility.is_public()
    }

    pub fn is_static(&self) -> bool {
        self.field.is_static
    }

    pub fn get(&self, access: &AccessContext, instance: Option<&Value>) -> Result<Value, RuntimeError> {
        access.check_member(self.parent, self.field.accessibility, || {
            format!("{:?}", self)
        })?;
        if self.field.is_static {
            return self.parent.read_static(self.field.slot);
        }
        match instance {
            Some(Value::Object(o)) => o.read_field(self.field.slot),
            Some(Value::Struct(s)) => s.get(self.field.slot),
            Some(Value::Null) | None => Err(RuntimeError::NullReference),
            Some(other) => Err(RuntimeError::InvalidProgram(format!(
                "cannot load field {:?} from {:?}",
                self, other
            ))),
        }
    }

    pub fn set(
        &self,
        access: &AccessContext,
        instance: Option<&Value>,
        value: Value,
    ) -> Result<(), RuntimeError> {
        access.check_member(self.parent, self.field.accessibility, || {
            format!("{:?}", self)
        })?;
        if self.field.is_static {
            return self.parent.write_static(self.field.slot, value);
        }
        match instance {
            Some(Value::Object(o)) => o.write_field(self.field.slot, value),
            Some(Value::Null) | None => Err(RuntimeError::NullReference),
            Some(other) => Err(RuntimeError::InvalidProgram(format!(
                "cannot store field {:?} into a copy of {:?}",
                self, other
            ))),
        }
    }
}

impl Debug for FieldDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.field.is_static {
            write!(f, "static ")?;
        }

        write!(
            f,
            "{} {}::{}",
            self.field.field_type.get_name(),
            self.parent.type_name(),
            self.field.name
        )
    }
}

impl PartialEq for FieldDescription {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.field, other.field)
    }
}

impl Eq for FieldDescription {}

impl Hash for FieldDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.field as *const FieldDefinition).hash(state);
    }
}

#[derive(Clone, Copy)]
pub struct PropertyDescription {
    pub parent: TypeDescription,
    pub property: &'static PropertyDefinition,
}

impl PropertyDescription {
    pub fn name(&self) -> &'static str {
        &self.property.name
    }

    pub fn property_type(&self) -> &'static RuntimeType {
        &self.property.property_type
    }

    pub fn index_parameters(&self) -> &'static [ParameterDefinition] {
        &self.property.parameters
    }

    pub fn getter(&self) -> Option<MethodDescription> {
        self.property.getter.map(|i| self.parent.method_at(i))
    }

    pub fn setter(&self) -> Option<MethodDescription> {
        self.property.setter.map(|i| self.parent.method_at(i))
    }

    pub fn is_public(&self) -> bool {
        self.getter().is_some_and(|m| m.is_public()) || self.setter().is_some_and(|m| m.is_public())
    }
}

impl Debug for PropertyDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.property.is_static {
            write!(f, "static ")?;
        }
        write!(
            f,
            "{} {}::{}",
            self.property.property_type.get_name(),
            self.parent.type_name(),
            self.property.name
        )?;
        if !self.property.parameters.is_empty() {
            write_parameters(f, &self.property.parameters)?;
        }
        Ok(())
    }
}

impl PartialEq for PropertyDescription {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.property, other.property)
    }
}

impl Eq for PropertyDescription {}

impl Hash for PropertyDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.property as *const PropertyDefinition).hash(state);
    }
}

/// State handed to a native method body.
pub struct CallContext<'a> {
    pub method: MethodDescription,
    pub this: Option<Value>,
    /// Argument slots; by-ref parameters are written back through these.
    pub args: &'a mut [Value],
    pub generics: &'a [RuntimeType],
}

impl CallContext<'_> {
    pub fn this(&self) -> Result<&Value, RuntimeError> {
        self.this.as_ref().ok_or(RuntimeError::NullReference)
    }

    pub fn arg(&self, index: usize) -> Result<Value, RuntimeError> {
        self.args.get(index).cloned().ok_or_else(|| {
            RuntimeError::InvalidProgram(format!("argument {} out of range", index))
        })
    }

    pub fn set_arg(&mut self, index: usize, value: Value) -> Result<(), RuntimeError> {
        match self.args.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::InvalidProgram(format!(
                "argument {} out of range",
                index
            ))),
        }
    }

    fn owner(&self) -> TypeDescription {
        self.this
            .as_ref()
            .and_then(Value::type_handle)
            .unwrap_or(self.method.parent)
    }

    fn resolve_field(&self, name: &str) -> Result<FieldDescription, RuntimeError> {
        self.owner()
            .field_named(name)
            .ok_or_else(|| RuntimeError::MemberNotFound(format!("{}::{}", self.owner().type_name(), name)))
    }

    /// Reads a field of `this` (or a static field of the declaring type) by name.
    pub fn field(&self, name: &str) -> Result<Value, RuntimeError> {
        let field = self.resolve_field(name)?;
        let instance = if field.is_static() { None } else { Some(self.this()?) };
        field.get(&AccessContext::SkipVisibility, instance)
    }

    pub fn set_field(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let field = self.resolve_field(name)?;
        let instance = if field.is_static() { None } else { Some(self.this()?) };
        field.set(&AccessContext::SkipVisibility, instance, value)
    }
}
