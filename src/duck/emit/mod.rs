//! Forwarding routine synthesis.
//!
//! Adapter members are implemented by small instruction streams built with a
//! [`LazyEmitter`] at generation time and interpreted by the [`executor`] on
//! every call. Calls into the target go either straight to the member,
//! access-checked from the adapter's module, or through a [`Trampoline`] that
//! skips visibility checks.
pub mod emitter;
pub mod executor;
pub mod instructions;
pub mod target;

pub use emitter::LazyEmitter;
pub use instructions::{CallSite, ForwardingRoutine, GenericArguments, Instruction};
pub use target::{FieldGetter, FieldSetter, Invocable, MethodTarget, TargetMember, Trampoline};

use crate::duck::module::ModuleBuilder;
use std::sync::Arc;

/// Emits a call to `target`, directly when the module may access it and
/// through a trampoline otherwise. The declaring type is made visible to the
/// module first, so public members of internal types are still called
/// directly.
pub fn write_safe_call(
    em: &mut LazyEmitter,
    module: &ModuleBuilder,
    target: TargetMember,
    argc: usize,
    pushes_result: bool,
    generics: GenericArguments,
) {
    module.ensure_type_visibility(target.declaring_type());
    let site = Arc::new(CallSite {
        has_this: !target.is_static(),
        target,
        argc,
        pushes_result,
        generics,
    });
    if module.can_call_directly(&site.target) {
        em.emit(Instruction::Call {
            site,
            access: module.access_context(),
        });
    } else {
        let trampoline = module.trampoline_for(&site.target);
        em.emit(Instruction::CallTrampoline { site, trampoline });
    }
}
