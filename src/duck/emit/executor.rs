use crate::{
    assemblies::AssemblyLoader,
    duck::{
        emit::{
            instructions::{CallSite, ForwardingRoutine, GenericArguments, Instruction},
            target::Invocable,
        },
        proxy::duck_instance,
    },
    error::RuntimeError,
    types::{comparer::TypeComparer, runtime::RuntimeType},
    value::{StructValue, Value},
};
use tracing::trace;

#[derive(Clone, Copy, Debug)]
enum Slot {
    Argument(u16),
    Local(u16),
}

#[derive(Debug)]
enum StackEntry {
    Value(Value),
    Address(Slot),
}

struct Frame<'a> {
    instance: &'a Value,
    args: &'a mut [Value],
    locals: Vec<Value>,
    generics: &'a [RuntimeType],
    stack: Vec<StackEntry>,
}

fn invalid_cast(value: &Value, expected: &RuntimeType) -> RuntimeError {
    RuntimeError::InvalidCast {
        actual: value
            .runtime_type()
            .map_or_else(|| "null".to_string(), |t| t.full_name()),
        expected: expected.full_name(),
    }
}

impl Frame<'_> {
    fn load(&self, slot: Slot) -> Result<Value, RuntimeError> {
        let value = match slot {
            Slot::Argument(i) => self.args.get(i as usize),
            Slot::Local(i) => self.locals.get(i as usize),
        };
        value
            .cloned()
            .ok_or_else(|| RuntimeError::InvalidProgram(format!("{:?} out of range", slot)))
    }

    fn store(&mut self, slot: Slot, value: Value) -> Result<(), RuntimeError> {
        let target = match slot {
            Slot::Argument(i) => self.args.get_mut(i as usize),
            Slot::Local(i) => self.locals.get_mut(i as usize),
        };
        match target {
            Some(s) => {
                *s = value;
                Ok(())
            }
            None => Err(RuntimeError::InvalidProgram(format!(
                "{:?} out of range",
                slot
            ))),
        }
    }

    fn push(&mut self, value: Value) {
        self.stack.push(StackEntry::Value(value));
    }

    fn pop_entry(&mut self) -> Result<StackEntry, RuntimeError> {
        self.stack
            .pop()
            .ok_or_else(|| RuntimeError::InvalidProgram("evaluation stack underflow".to_string()))
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        match self.pop_entry()? {
            StackEntry::Value(v) => Ok(v),
            StackEntry::Address(slot) => self.load(slot),
        }
    }

    fn call(
        &mut self,
        site: &CallSite,
        invoke: impl FnOnce(Option<Value>, &mut [Value], &[RuntimeType]) -> Result<Value, RuntimeError>,
    ) -> Result<(), RuntimeError> {
        if self.stack.len() < site.argc {
            return Err(RuntimeError::InvalidProgram(
                "evaluation stack underflow".to_string(),
            ));
        }
        let entries = self.stack.split_off(self.stack.len() - site.argc);
        let this = if site.has_this { Some(self.pop()?) } else { None };

        let mut args = entries
            .iter()
            .map(|e| match e {
                StackEntry::Value(v) => Ok(v.clone()),
                StackEntry::Address(slot) => self.load(*slot),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let generics: &[RuntimeType] = match &site.generics {
            GenericArguments::None => &[],
            GenericArguments::Closed(types) => &types[..],
            GenericArguments::Forwarded => self.generics,
        };
        let result = invoke(this, &mut args, generics)?;

        for (entry, value) in entries.iter().zip(args) {
            if let StackEntry::Address(slot) = entry {
                self.store(*slot, value)?;
            }
        }
        if site.pushes_result {
            self.push(result);
        }
        Ok(())
    }
}

/// Runs a forwarding routine against a target instance.
///
/// `args` are the caller's argument slots; `ref`/`out` results are written
/// back into them.
pub fn execute(
    routine: &ForwardingRoutine,
    instance: &Value,
    args: &mut [Value],
    generics: &[RuntimeType],
) -> Result<Value, RuntimeError> {
    let mut frame = Frame {
        instance,
        args,
        locals: routine.locals.iter().map(Value::default_for).collect(),
        generics,
        stack: vec![],
    };

    for instruction in routine.instructions.iter() {
        match instruction {
            Instruction::LoadInstance => frame.push(frame.instance.clone()),
            Instruction::LoadArgument(i) => {
                let v = frame.load(Slot::Argument(*i))?;
                frame.push(v);
            }
            Instruction::LoadArgumentAddress(i) => {
                frame.stack.push(StackEntry::Address(Slot::Argument(*i)))
            }
            Instruction::StoreArgument(i) => {
                let v = frame.pop()?;
                frame.store(Slot::Argument(*i), v)?;
            }
            Instruction::LoadLocal(i) => {
                let v = frame.load(Slot::Local(*i))?;
                frame.push(v);
            }
            Instruction::LoadLocalAddress(i) => {
                frame.stack.push(StackEntry::Address(Slot::Local(*i)))
            }
            Instruction::StoreLocal(i) => {
                let v = frame.pop()?;
                frame.store(Slot::Local(*i), v)?;
            }
            Instruction::LoadConstant(v) => frame.push(v.clone()),
            Instruction::Box(_) => {
                let v = frame.pop()?;
                frame.push(v.boxed());
            }
            Instruction::UnboxAny(ty) => {
                let v = frame.pop()?;
                if v.is_null() {
                    return Err(RuntimeError::NullReference);
                }
                let inner = v.unboxed();
                let matches = ty.is_generic_parameter()
                    || inner
                        .runtime_type()
                        .is_some_and(|actual| TypeComparer::types_equal_decayed(&actual, ty));
                if !matches {
                    return Err(invalid_cast(&v, ty));
                }
                frame.push(inner);
            }
            Instruction::CastClass(ty) => {
                let v = frame.pop()?;
                let passes = match v.runtime_type() {
                    None => true,
                    Some(_) if ty.is_generic_parameter() => true,
                    Some(actual) => TypeComparer::is_assignable_from(ty, &actual),
                };
                if !passes {
                    return Err(invalid_cast(&v, ty));
                }
                frame.push(v);
            }
            Instruction::ExtractInstance => {
                let v = frame.pop()?;
                let inner = match &v {
                    Value::Null => Value::Null,
                    Value::Object(o) => match duck_instance(o)? {
                        Some(inner) => inner,
                        None => {
                            let expected = AssemblyLoader::global().duck_type_interface();
                            return Err(invalid_cast(&v, &RuntimeType::Type(expected)));
                        }
                    },
                    other => {
                        let expected = AssemblyLoader::global().duck_type_interface();
                        return Err(invalid_cast(other, &RuntimeType::Type(expected)));
                    }
                };
                frame.push(inner);
            }
            Instruction::Chain(cache) => {
                let v = frame.pop()?;
                let chained = if v.is_null() {
                    Value::Null
                } else {
                    cache.create(&v)?
                };
                frame.push(chained);
            }
            Instruction::Call { site, access } => {
                frame.call(site, |this, args, generics| {
                    site.target.invoke(access, this, args, generics)
                })?;
            }
            Instruction::CallTrampoline { site, trampoline } => {
                frame.call(site, |this, args, generics| {
                    trampoline.invoke(this, args, generics)
                })?;
            }
            Instruction::NewStruct(td) => frame.push(Value::Struct(StructValue::new(*td))),
            Instruction::StoreStructField(slot) => {
                let v = frame.pop()?;
                let mut target = match frame.pop()? {
                    Value::Struct(s) => s,
                    other => {
                        return Err(RuntimeError::InvalidProgram(format!(
                            "cannot store a field into {:?}",
                            other
                        )))
                    }
                };
                target.set(*slot, v)?;
                frame.push(Value::Struct(target));
            }
            Instruction::Pop => {
                frame.pop_entry()?;
            }
            Instruction::Return => {
                let result = match frame.stack.is_empty() {
                    true => Value::Null,
                    false => frame.pop()?,
                };
                trace!("{} returned {:?}", routine.name, result);
                return Ok(result);
            }
        }
    }

    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assemblies::AssemblyLoader,
        duck::emit::{emitter::LazyEmitter, target::MethodTarget},
        types::{
            access::AccessContext,
            attributes::BindingFlags,
            builder::{MethodBuilder, TypeBuilder},
        },
    };
    use std::sync::Arc;

    #[test]
    fn by_ref_arguments_are_written_back() {
        let asm = AssemblyLoader::global().load_assembly("Executor.Tests");
        let td = TypeBuilder::class(asm, "Executor.Tests.Doubler")
            .method(
                MethodBuilder::new("Double")
                    .ref_param("x", RuntimeType::Int32)
                    .body(|ctx| {
                        let x = ctx.arg(0)?.as_i32().unwrap_or_default();
                        ctx.set_arg(0, Value::Int32(x * 2))?;
                        Ok(Value::Null)
                    }),
            )
            .build()
            .unwrap();
        let method = td
            .find_method("Double", BindingFlags::DEFAULT, &[RuntimeType::Int32])
            .unwrap();

        let mut em = LazyEmitter::new("double");
        em.emit(Instruction::LoadInstance);
        em.emit(Instruction::LoadArgumentAddress(0));
        em.emit(Instruction::Call {
            site: Arc::new(CallSite {
                target: MethodTarget(method).into(),
                has_this: true,
                argc: 1,
                pushes_result: false,
                generics: GenericArguments::None,
            }),
            access: AccessContext::Public,
        });
        em.emit(Instruction::Return);
        let routine = em.flush();

        let instance = Value::new_object(td);
        let mut args = [Value::Int32(21)];
        execute(&routine, &instance, &mut args, &[]).unwrap();
        assert_eq!(args[0], Value::Int32(42));
    }

    #[test]
    fn unbox_checks_the_runtime_type() {
        let mut em = LazyEmitter::new("unbox");
        em.emit(Instruction::LoadArgument(0));
        em.emit(Instruction::UnboxAny(RuntimeType::Int32));
        em.emit(Instruction::Return);
        let routine = em.flush();

        let mut ok = [Value::Int32(3).boxed()];
        assert_eq!(execute(&routine, &Value::Null, &mut ok, &[]).unwrap(), Value::Int32(3));

        let mut wrong = [Value::from("three")];
        assert_eq!(
            execute(&routine, &Value::Null, &mut wrong, &[]).unwrap_err(),
            RuntimeError::InvalidCast {
                actual: "System.String".to_string(),
                expected: "System.Int32".to_string(),
            }
        );

        let mut null = [Value::Null];
        assert_eq!(
            execute(&routine, &Value::Null, &mut null, &[]).unwrap_err(),
            RuntimeError::NullReference
        );
    }

    #[test]
    fn underflow_is_an_invalid_program() {
        let mut em = LazyEmitter::new("underflow");
        em.emit(Instruction::Pop);
        let routine = em.flush();
        assert!(matches!(
            execute(&routine, &Value::Null, &mut [], &[]),
            Err(RuntimeError::InvalidProgram(_))
        ));
    }
}
