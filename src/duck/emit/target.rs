use crate::{
    error::RuntimeError,
    types::{
        access::AccessContext,
        members::{Accessibility, FieldDescription, MethodDescription},
        runtime::RuntimeType,
        TypeDescription,
    },
    value::Value,
};
use enum_dispatch::enum_dispatch;
use std::fmt::{Debug, Formatter};

/// Something a forwarding routine can call on the target.
#[enum_dispatch]
pub trait Invocable {
    fn invoke(
        &self,
        access: &AccessContext,
        this: Option<Value>,
        args: &mut [Value],
        generics: &[RuntimeType],
    ) -> Result<Value, RuntimeError>;

    fn declaring_type(&self) -> TypeDescription;

    fn accessibility(&self) -> Accessibility;

    fn is_static(&self) -> bool;
}

#[enum_dispatch(Invocable)]
#[derive(Clone, PartialEq)]
pub enum TargetMember {
    MethodTarget,
    FieldGetter,
    FieldSetter,
}

impl Debug for TargetMember {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetMember::MethodTarget(MethodTarget(m)) => write!(f, "{:?}", m),
            TargetMember::FieldGetter(FieldGetter(field)) => write!(f, "ldfld {:?}", field),
            TargetMember::FieldSetter(FieldSetter(field)) => write!(f, "stfld {:?}", field),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MethodTarget(pub MethodDescription);

impl Invocable for MethodTarget {
    fn invoke(
        &self,
        access: &AccessContext,
        this: Option<Value>,
        args: &mut [Value],
        generics: &[RuntimeType],
    ) -> Result<Value, RuntimeError> {
        self.0.invoke(access, this, args, generics)
    }

    fn declaring_type(&self) -> TypeDescription {
        self.0.parent
    }

    fn accessibility(&self) -> Accessibility {
        self.0.method.accessibility
    }

    fn is_static(&self) -> bool {
        self.0.is_static()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldGetter(pub FieldDescription);

impl Invocable for FieldGetter {
    fn invoke(
        &self,
        access: &AccessContext,
        this: Option<Value>,
        _args: &mut [Value],
        _generics: &[RuntimeType],
    ) -> Result<Value, RuntimeError> {
        self.0.get(access, this.as_ref())
    }

    fn declaring_type(&self) -> TypeDescription {
        self.0.parent
    }

    fn accessibility(&self) -> Accessibility {
        self.0.field.accessibility
    }

    fn is_static(&self) -> bool {
        self.0.is_static()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldSetter(pub FieldDescription);

impl Invocable for FieldSetter {
    fn invoke(
        &self,
        access: &AccessContext,
        this: Option<Value>,
        args: &mut [Value],
        _generics: &[RuntimeType],
    ) -> Result<Value, RuntimeError> {
        let value = args.first().cloned().ok_or_else(|| RuntimeError::ArgumentCount {
            member: format!("{:?}", self.0),
            expected: 1,
            actual: 0,
        })?;
        self.0.set(access, this.as_ref(), value)?;
        Ok(Value::Null)
    }

    fn declaring_type(&self) -> TypeDescription {
        self.0.parent
    }

    fn accessibility(&self) -> Accessibility {
        self.0.field.accessibility
    }

    fn is_static(&self) -> bool {
        self.0.is_static()
    }
}

/// A privileged invoker for a member the adapter module may not call directly.
#[derive(Debug)]
pub struct Trampoline {
    pub name: String,
    pub target: TargetMember,
}

impl Trampoline {
    pub fn invoke(
        &self,
        this: Option<Value>,
        args: &mut [Value],
        generics: &[RuntimeType],
    ) -> Result<Value, RuntimeError> {
        self.target
            .invoke(&AccessContext::SkipVisibility, this, args, generics)
    }
}
