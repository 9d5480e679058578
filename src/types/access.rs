use crate::{
    assemblies::Assembly,
    error::RuntimeError,
    types::{members::Accessibility, TypeDescription},
};
use std::sync::Arc;

/// The vantage point a member is invoked from.
#[derive(Clone, Debug)]
pub enum AccessContext {
    /// Reflection-style privileged access, used by trampolines.
    SkipVisibility,
    /// Arbitrary outside code: only public members of visible types.
    Public,
    /// Code living in `assembly`, which may additionally reach into the
    /// assemblies it was granted "ignores access checks to".
    Assembly {
        assembly: &'static Assembly,
        ignores_access_checks_to: Arc<[String]>,
    },
}

impl AccessContext {
    pub fn for_assembly(assembly: &'static Assembly) -> Self {
        AccessContext::Assembly {
            assembly,
            ignores_access_checks_to: Arc::from(Vec::new()),
        }
    }

    pub fn can_access_type(&self, td: TypeDescription) -> bool {
        match self {
            AccessContext::SkipVisibility => true,
            AccessContext::Public => td.is_visible(),
            AccessContext::Assembly {
                assembly,
                ignores_access_checks_to,
            } => {
                td.is_visible()
                    || std::ptr::eq(td.assembly(), *assembly)
                    || ignores_access_checks_to
                        .iter()
                        .any(|granted| *granted == td.assembly().name)
            }
        }
    }

    pub fn can_access_member(&self, parent: TypeDescription, accessibility: Accessibility) -> bool {
        if matches!(self, AccessContext::SkipVisibility) {
            return true;
        }
        if !self.can_access_type(parent) {
            return false;
        }
        match (accessibility, self) {
            (Accessibility::Public, _) => true,
            (Accessibility::Internal, AccessContext::Assembly { assembly, .. }) => {
                std::ptr::eq(parent.assembly(), *assembly)
            }
            _ => false,
        }
    }

    pub fn check_member(
        &self,
        parent: TypeDescription,
        accessibility: Accessibility,
        member: impl FnOnce() -> String,
    ) -> Result<(), RuntimeError> {
        if self.can_access_member(parent, accessibility) {
            Ok(())
        } else {
            Err(RuntimeError::MethodAccess {
                caller: self.caller_name(),
                member: member(),
            })
        }
    }

    pub fn caller_name(&self) -> String {
        match self {
            AccessContext::SkipVisibility => "<trampoline>".to_string(),
            AccessContext::Public => "<public>".to_string(),
            AccessContext::Assembly { assembly, .. } => assembly.name.clone(),
        }
    }
}
