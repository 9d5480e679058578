use crate::{
    duck::{cache::CreateCache, emit::target::{TargetMember, Trampoline}},
    types::{access::AccessContext, runtime::RuntimeType, TypeDescription},
    value::Value,
};
use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};

/// Where the generic arguments of a target call come from.
#[derive(Clone, Debug, PartialEq)]
pub enum GenericArguments {
    None,
    /// Closing types named by the shape member.
    Closed(Arc<[RuntimeType]>),
    /// The shape method's own generic arguments, as supplied by the caller.
    Forwarded,
}

#[derive(Debug)]
pub struct CallSite {
    pub target: TargetMember,
    pub has_this: bool,
    /// Stack entries consumed as arguments, not counting `this`.
    pub argc: usize,
    pub pushes_result: bool,
    pub generics: GenericArguments,
}

#[derive(Clone, Debug)]
pub enum Instruction {
    /// Pushes the wrapped target instance.
    LoadInstance,
    LoadArgument(u16),
    LoadArgumentAddress(u16),
    StoreArgument(u16),
    LoadLocal(u16),
    LoadLocalAddress(u16),
    StoreLocal(u16),
    LoadConstant(Value),
    Box(RuntimeType),
    UnboxAny(RuntimeType),
    CastClass(RuntimeType),
    /// Replaces an adapter with the instance it wraps.
    ExtractInstance,
    /// Replaces a value with an adapter of the cache's shape over it.
    Chain(Arc<CreateCache>),
    Call {
        site: Arc<CallSite>,
        access: AccessContext,
    },
    CallTrampoline {
        site: Arc<CallSite>,
        trampoline: Arc<Trampoline>,
    },
    NewStruct(TypeDescription),
    /// Pops a value and a struct, pushes the struct with the field slot updated.
    StoreStructField(usize),
    Pop,
    Return,
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use Instruction::*;
        match self {
            LoadInstance => write!(f, "ldinst"),
            LoadArgument(i) => write!(f, "ldarg.{}", i),
            LoadArgumentAddress(i) => write!(f, "ldarga.{}", i),
            StoreArgument(i) => write!(f, "starg.{}", i),
            LoadLocal(i) => write!(f, "ldloc.{}", i),
            LoadLocalAddress(i) => write!(f, "ldloca.{}", i),
            StoreLocal(i) => write!(f, "stloc.{}", i),
            LoadConstant(v) => write!(f, "ldc {:?}", v),
            Box(t) => write!(f, "box {}", t.full_name()),
            UnboxAny(t) => write!(f, "unbox.any {}", t.full_name()),
            CastClass(t) => write!(f, "castclass {}", t.full_name()),
            ExtractInstance => write!(f, "ldduckinst"),
            Chain(cache) => write!(f, "duckchain {:?}", cache.shape()),
            Call { site, .. } => write!(f, "call {:?}", site.target),
            CallTrampoline { trampoline, .. } => {
                write!(f, "call {} -> {:?}", trampoline.name, trampoline.target)
            }
            NewStruct(td) => write!(f, "newstruct {:?}", td),
            StoreStructField(slot) => write!(f, "stsfld.{}", slot),
            Pop => write!(f, "pop"),
            Return => write!(f, "ret"),
        }
    }
}

/// A finished, immutable forwarding routine.
#[derive(Debug)]
pub struct ForwardingRoutine {
    pub name: String,
    pub instructions: Box<[Instruction]>,
    pub locals: Box<[RuntimeType]>,
}

impl Display for ForwardingRoutine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, ".routine {}", self.name)?;
        if !self.locals.is_empty() {
            let locals: Vec<_> = self.locals.iter().map(|l| l.get_name()).collect();
            writeln!(f, "  .locals ({})", locals.join(", "))?;
        }
        for (i, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "  IL_{:04x}: {}", i, instruction)?;
        }
        Ok(())
    }
}
