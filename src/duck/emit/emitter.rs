use crate::{
    duck::emit::instructions::{ForwardingRoutine, Instruction},
    types::runtime::RuntimeType,
};

/// Deferred instruction stream.
///
/// Instructions are appended at the end unless an insertion offset is set, in
/// which case they are spliced in there and the offset advances. Argument
/// preparation for by-ref parameters uses this to place local setup code in
/// front of the instance load.
#[derive(Debug)]
pub struct LazyEmitter {
    name: String,
    instructions: Vec<Instruction>,
    locals: Vec<RuntimeType>,
    offset: Option<usize>,
}

impl LazyEmitter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: vec![],
            locals: vec![],
            offset: None,
        }
    }

    pub fn emit(&mut self, instruction: Instruction) {
        match self.offset {
            Some(offset) => {
                self.instructions.insert(offset, instruction);
                self.offset = Some(offset + 1);
            }
            None => self.instructions.push(instruction),
        }
    }

    pub fn declare_local(&mut self, ty: RuntimeType) -> u16 {
        self.locals.push(ty);
        (self.locals.len() - 1) as u16
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = Some(offset.min(self.instructions.len()));
    }

    pub fn reset_offset(&mut self) {
        self.offset = None;
    }

    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    pub fn flush(self) -> ForwardingRoutine {
        ForwardingRoutine {
            name: self.name,
            instructions: self.instructions.into_boxed_slice(),
            locals: self.locals.into_boxed_slice(),
        }
    }
}
