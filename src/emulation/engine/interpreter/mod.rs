//! Core JVM bytecode interpreter.
//!
//! [`MethodExecutor`] runs one method body to completion: it pushes a synthetic frame on
//! the [`Context`], dispatches instructions one at a time against a private operand stack
//! and local variable array, and routes every call, reference comparison and type check
//! through the context's provider chain. Whatever happens, the frame it pushed is popped
//! before it returns.

mod handlers;


use std::sync::Arc;

use log::trace;

use crate::{
    assembly::{Constant, Instruction, MemberRef, Opcode, Operand},
    emulation::{
        runtime::provider::{InvokeKind, MethodCall},
        Context, EmulationError, HostObject, JavaArray, JavaClass, JavaInstance, JavaValue,
        LocalVariables, OperandStack,
    },
    metadata::{ClassFile, FieldDef, FieldType, MethodDef, MethodDescriptor},
    Result,
};

/// Outcome of executing a single instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
enum StepResult {
    /// Continue with the next instruction.
    Continue,
    /// Transfer control to the instruction at `target`.
    Branch {
        /// Instruction index to continue at
        target: usize,
    },
    /// Leave the method.
    Return {
        /// Returned value, [`JavaValue::Void`] for `void` methods
        value: JavaValue,
    },
}

/// State of the method currently being interpreted.
struct ActiveFrame<'a> {
    class: &'a ClassFile,
    method: &'a MethodDef,
    stack: OperandStack,
    locals: LocalVariables,
    return_type: FieldType,
}

/// Interpreter for program-defined methods.
///
/// The executor is stateless: all state lives in the [`Context`] (call stack, heap,
/// statics, budget) and in the frame it builds for the duration of one
/// [`MethodExecutor::execute`] call. Nested program calls re-enter `execute` through the
/// mapped provider.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use jvmscope::{
///     assembly::InstructionAssembler,
///     emulation::{Context, JavaValue, MethodExecutor, ProviderChain},
///     metadata::{ClassDictionary, ClassFile, MethodAccessFlags, MethodDef},
/// };
///
/// let mut asm = InstructionAssembler::new();
/// asm.iload(0).iconst(1).op(jvmscope::assembly::Opcode::Iadd).ireturn();
/// let method = MethodDef::new(
///     "next",
///     "(I)I",
///     MethodAccessFlags::STATIC,
///     asm.finish()?,
/// );
/// let class = ClassFile::new("a/Counter").with_method(method.clone());
///
/// let dictionary = Arc::new(ClassDictionary::new());
/// let chain = Arc::new(ProviderChain::jdk(dictionary.clone())?);
/// let mut context = Context::new(chain, dictionary);
///
/// let value = MethodExecutor::execute(&class, &method, vec![JavaValue::Int(41)], None, &mut context)?;
/// assert_eq!(value, JavaValue::Int(42));
/// assert_eq!(context.depth(), 0);
/// # Ok::<(), jvmscope::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodExecutor;

impl MethodExecutor {
    /// Executes `method` of `class` with `args` (in declaration order) and, for instance
    /// methods, `receiver`.
    ///
    /// Returns the method's value, or [`JavaValue::Void`] for `void` methods.
    ///
    /// # Errors
    ///
    /// Returns an emulation fault if the method has no body, the arguments do not match
    /// the descriptor, any instruction faults, or the step or call depth budget runs out.
    /// The context's call stack is left as it was on entry.
    pub fn execute(
        class: &ClassFile,
        method: &MethodDef,
        args: Vec<JavaValue>,
        receiver: Option<JavaValue>,
        context: &mut Context,
    ) -> Result<JavaValue> {
        let Some(body) = &method.body else {
            return Err(EmulationError::MissingMethodBody {
                owner: class.name.clone(),
                name: method.name.clone(),
                descriptor: method.descriptor.clone(),
            }
            .into());
        };
        let descriptor = method_descriptor(&method.descriptor)?;
        if args.len() != descriptor.parameters.len() {
            return Err(EmulationError::ArgumentCountMismatch {
                expected: descriptor.parameters.len(),
                found: args.len(),
            }
            .into());
        }

        context.push(&class.name, &method.name, i32::from(class.constant_pool_size))?;
        trace!(
            "execute {}.{}{} (depth {})",
            class.name,
            method.name,
            method.descriptor,
            context.depth()
        );

        let result = Self::prepare(class, method, &descriptor, args, receiver, context)
            .and_then(|mut frame| Self::run(&mut frame, body.instructions(), context));
        let popped = context.pop();
        let value = result?;
        popped?;
        Ok(value)
    }

    /// Runs the static initializer of `class_name` (and of its superclasses) if it is a
    /// program class that was not initialized in this context yet.
    ///
    /// The class is marked before its initializer runs, so an initializer that touches its
    /// own class does not re-enter itself.
    ///
    /// # Errors
    /// Returns any fault raised by an initializer.
    pub fn initialize_class(class_name: &str, context: &mut Context) -> Result<()> {
        let Some(class) = context.dictionary().get(class_name) else {
            return Ok(());
        };
        if !context.mark_class_initialized(class_name) {
            return Ok(());
        }
        if let Some(super_name) = &class.super_name {
            Self::initialize_class(super_name, context)?;
        }
        if let Some(initializer) = class.static_initializer() {
            trace!("initialize {}", class.name);
            Self::execute(&class, initializer, Vec::new(), None, context)?;
        }
        Ok(())
    }

    fn prepare<'a>(
        class: &'a ClassFile,
        method: &'a MethodDef,
        descriptor: &MethodDescriptor,
        args: Vec<JavaValue>,
        receiver: Option<JavaValue>,
        context: &Context,
    ) -> Result<ActiveFrame<'a>> {
        let receiver_slots = usize::from(!method.is_static());
        let required = descriptor.argument_slots() + receiver_slots;
        let body_locals = method
            .body
            .as_ref()
            .map_or(0, |body| usize::from(body.max_locals()));
        let mut locals = LocalVariables::new(body_locals.max(required));

        let mut slot = 0;
        if !method.is_static() {
            let this = receiver
                .ok_or(EmulationError::TypeMismatch {
                    operation: "receiver",
                    expected: "reference",
                    found: "none",
                })?
                .expect_reference("receiver")?;
            locals.store(0, this)?;
            slot = 1;
        }
        for (value, parameter) in args.into_iter().zip(&descriptor.parameters) {
            locals.store(slot, value.expect_type(parameter, "argument")?)?;
            slot += parameter.slot_size();
        }

        Ok(ActiveFrame {
            class,
            method,
            stack: OperandStack::new(context.limits().max_stack_depth),
            locals,
            return_type: descriptor.return_type.clone(),
        })
    }

    fn run(
        frame: &mut ActiveFrame<'_>,
        instructions: &[Instruction],
        context: &mut Context,
    ) -> Result<JavaValue> {
        let mut pc = 0;
        loop {
            let Some(instruction) = instructions.get(pc) else {
                return Err(EmulationError::FellOffEnd {
                    owner: frame.class.name.clone(),
                    method: frame.method.name.clone(),
                }
                .into());
            };
            context.tick()?;

            match Self::step(frame, instruction, context)? {
                StepResult::Continue => pc += 1,
                StepResult::Branch { target } => {
                    if target >= instructions.len() {
                        return Err(EmulationError::InvalidBranchTarget { target }.into());
                    }
                    pc = target;
                }
                StepResult::Return { value } => return Ok(value),
            }
        }
    }

    /// Executes a single instruction.
    fn step(
        frame: &mut ActiveFrame<'_>,
        instruction: &Instruction,
        context: &mut Context,
    ) -> Result<StepResult> {
        let opcode = instruction.opcode;
        let name = opcode.mnemonic();
        let stack = &mut frame.stack;

        match opcode {
            // ================================================================
            // Constants
            // ================================================================
            Opcode::Nop => {}
            Opcode::AconstNull => stack.push(JavaValue::Null)?,
            Opcode::IconstM1
            | Opcode::Iconst0
            | Opcode::Iconst1
            | Opcode::Iconst2
            | Opcode::Iconst3
            | Opcode::Iconst4
            | Opcode::Iconst5 => {
                let value = i32::from(opcode.code()) - i32::from(Opcode::Iconst0.code());
                stack.push(JavaValue::Int(value))?;
            }
            Opcode::Lconst0 | Opcode::Lconst1 => {
                let value = opcode.code() - Opcode::Lconst0.code();
                stack.push(JavaValue::Long(i64::from(value)))?;
            }
            Opcode::Fconst0 | Opcode::Fconst1 | Opcode::Fconst2 => {
                let value = opcode.code() - Opcode::Fconst0.code();
                stack.push(JavaValue::Float(f32::from(value)))?;
            }
            Opcode::Dconst0 | Opcode::Dconst1 => {
                let value = opcode.code() - Opcode::Dconst0.code();
                stack.push(JavaValue::Double(f64::from(value)))?;
            }
            Opcode::Bipush | Opcode::Sipush => {
                let Operand::Int(value) = instruction.operand else {
                    return Err(Self::invalid_operand(instruction, "immediate"));
                };
                stack.push(JavaValue::Int(value))?;
            }
            Opcode::Ldc => {
                let constant = instruction
                    .constant()
                    .ok_or_else(|| Self::invalid_operand(instruction, "constant"))?;
                let value = Self::constant_value(constant, context)?;
                frame.stack.push(value)?;
            }

            // ================================================================
            // Locals
            // ================================================================
            Opcode::Iload | Opcode::Lload | Opcode::Fload | Opcode::Dload | Opcode::Aload => {
                let value = frame.locals.load(Self::local_index(instruction)?)?;
                stack.push(Self::check_slot(opcode, value)?)?;
            }
            Opcode::Istore | Opcode::Lstore | Opcode::Fstore | Opcode::Dstore | Opcode::Astore => {
                let value = Self::check_slot(opcode, stack.pop()?)?;
                frame.locals.store(Self::local_index(instruction)?, value)?;
            }
            Opcode::Iinc => {
                let Operand::Increment { local, delta } = instruction.operand else {
                    return Err(Self::invalid_operand(instruction, "increment"));
                };
                let index = usize::from(local);
                let current = frame.locals.load(index)?.as_int(name)?;
                frame
                    .locals
                    .store(index, JavaValue::Int(current.wrapping_add(i32::from(delta))))?;
            }

            // ================================================================
            // Arrays
            // ================================================================
            Opcode::Iaload
            | Opcode::Laload
            | Opcode::Faload
            | Opcode::Daload
            | Opcode::Aaload
            | Opcode::Baload
            | Opcode::Caload
            | Opcode::Saload => {
                let index = stack.pop_int(name)?;
                let array = stack.pop_reference(name)?;
                let array = context.heap().narrow::<JavaArray>(array)?;
                Self::check_element(opcode, array)?;
                let value = array.load(index)?;
                frame.stack.push(value)?;
            }
            Opcode::Iastore
            | Opcode::Lastore
            | Opcode::Fastore
            | Opcode::Dastore
            | Opcode::Aastore
            | Opcode::Bastore
            | Opcode::Castore
            | Opcode::Sastore => {
                let value = stack.pop()?;
                let index = stack.pop_int(name)?;
                let array = stack.pop_reference(name)?;
                let array = context.heap_mut().narrow_mut::<JavaArray>(array)?;
                Self::check_element(opcode, array)?;
                array.store(index, value)?;
            }
            Opcode::Arraylength => {
                let array = stack.pop_reference(name)?;
                let length = context.heap().narrow::<JavaArray>(array)?.len();
                frame
                    .stack
                    .push(JavaValue::Int(i32::try_from(length).unwrap_or(i32::MAX)))?;
            }
            Opcode::Newarray => {
                let Operand::NewArray(kind) = instruction.operand else {
                    return Err(Self::invalid_operand(instruction, "array type"));
                };
                let length = Self::array_length(stack.pop_int(name)?)?;
                let array = context
                    .heap_mut()
                    .wrap(HostObject::Array(JavaArray::primitive(kind, length)))?;
                frame.stack.push(array)?;
            }
            Opcode::Anewarray => {
                let component = field_type_operand(Self::type_operand(instruction)?)?;
                let length = Self::array_length(stack.pop_int(name)?)?;
                let array = context
                    .heap_mut()
                    .wrap(HostObject::Array(JavaArray::of_component(&component, length)))?;
                frame.stack.push(array)?;
            }
            Opcode::Multianewarray => {
                let Operand::MultiArray {
                    descriptor,
                    dimensions,
                } = &instruction.operand
                else {
                    return Err(Self::invalid_operand(instruction, "array descriptor"));
                };
                let array_type = field_type(descriptor)?;
                let counts = stack.pop_n(usize::from(*dimensions))?;
                let lengths = counts
                    .into_iter()
                    .map(|count| Self::array_length(count.as_int(name)?))
                    .collect::<Result<Vec<_>>>()?;
                let array = Self::allocate_dimensions(&array_type, &lengths, context)?;
                frame.stack.push(array)?;
            }

            // ================================================================
            // Stack shuffles
            // ================================================================
            Opcode::Pop => stack.pop_words(1, name)?,
            Opcode::Pop2 => stack.pop_words(2, name)?,
            Opcode::Dup => stack.dup_words(1, 0, name)?,
            Opcode::DupX1 => stack.dup_words(1, 1, name)?,
            Opcode::DupX2 => stack.dup_words(1, 2, name)?,
            Opcode::Dup2 => stack.dup_words(2, 0, name)?,
            Opcode::Dup2X1 => stack.dup_words(2, 1, name)?,
            Opcode::Dup2X2 => stack.dup_words(2, 2, name)?,
            Opcode::Swap => stack.swap()?,

            // ================================================================
            // Arithmetic, conversions and comparisons
            // ================================================================
            Opcode::Iadd
            | Opcode::Isub
            | Opcode::Imul
            | Opcode::Idiv
            | Opcode::Irem
            | Opcode::Ishl
            | Opcode::Ishr
            | Opcode::Iushr
            | Opcode::Iand
            | Opcode::Ior
            | Opcode::Ixor => handlers::int_binary(opcode, stack)?,
            Opcode::Ladd
            | Opcode::Lsub
            | Opcode::Lmul
            | Opcode::Ldiv
            | Opcode::Lrem
            | Opcode::Lshl
            | Opcode::Lshr
            | Opcode::Lushr
            | Opcode::Land
            | Opcode::Lor
            | Opcode::Lxor => handlers::long_binary(opcode, stack)?,
            Opcode::Fadd | Opcode::Fsub | Opcode::Fmul | Opcode::Fdiv | Opcode::Frem => {
                handlers::float_binary(opcode, stack)?;
            }
            Opcode::Dadd | Opcode::Dsub | Opcode::Dmul | Opcode::Ddiv | Opcode::Drem => {
                handlers::double_binary(opcode, stack)?;
            }
            Opcode::Ineg | Opcode::Lneg | Opcode::Fneg | Opcode::Dneg => {
                handlers::negate(opcode, stack)?;
            }
            Opcode::I2l
            | Opcode::I2f
            | Opcode::I2d
            | Opcode::L2i
            | Opcode::L2f
            | Opcode::L2d
            | Opcode::F2i
            | Opcode::F2l
            | Opcode::F2d
            | Opcode::D2i
            | Opcode::D2l
            | Opcode::D2f
            | Opcode::I2b
            | Opcode::I2c
            | Opcode::I2s => handlers::convert(opcode, stack)?,
            Opcode::Lcmp | Opcode::Fcmpl | Opcode::Fcmpg | Opcode::Dcmpl | Opcode::Dcmpg => {
                handlers::compare(opcode, stack)?;
            }

            // ================================================================
            // Control flow
            // ================================================================
            Opcode::Ifeq
            | Opcode::Ifne
            | Opcode::Iflt
            | Opcode::Ifge
            | Opcode::Ifgt
            | Opcode::Ifle
            | Opcode::IfIcmpeq
            | Opcode::IfIcmpne
            | Opcode::IfIcmplt
            | Opcode::IfIcmpge
            | Opcode::IfIcmpgt
            | Opcode::IfIcmple => {
                let taken = handlers::int_condition(opcode, stack)?;
                return Self::branch_if(taken, instruction);
            }
            Opcode::IfAcmpeq | Opcode::IfAcmpne => {
                let second = stack.pop_reference(name)?;
                let first = stack.pop_reference(name)?;
                let chain = Arc::clone(context.provider());
                let equal = chain.compare(first, second, context)?;
                return Self::branch_if(equal == (opcode == Opcode::IfAcmpeq), instruction);
            }
            Opcode::Ifnull | Opcode::Ifnonnull => {
                let value = stack.pop_reference(name)?;
                return Self::branch_if(value.is_null() == (opcode == Opcode::Ifnull), instruction);
            }
            Opcode::Goto => {
                return Ok(StepResult::Branch {
                    target: Self::jump_target(instruction)?,
                });
            }
            Opcode::Tableswitch => {
                let Operand::TableSwitch {
                    low,
                    high,
                    default,
                    targets,
                } = &instruction.operand
                else {
                    return Err(Self::invalid_operand(instruction, "table switch"));
                };
                let key = stack.pop_int(name)?;
                let target = if (*low..=*high).contains(&key) {
                    usize::try_from(i64::from(key) - i64::from(*low))
                        .ok()
                        .and_then(|offset| targets.get(offset))
                        .copied()
                        .unwrap_or(*default)
                } else {
                    *default
                };
                return Ok(StepResult::Branch { target });
            }
            Opcode::Lookupswitch => {
                let Operand::LookupSwitch { default, pairs } = &instruction.operand else {
                    return Err(Self::invalid_operand(instruction, "lookup switch"));
                };
                let key = stack.pop_int(name)?;
                let target = pairs
                    .iter()
                    .find(|(candidate, _)| *candidate == key)
                    .map_or(*default, |(_, target)| *target);
                return Ok(StepResult::Branch { target });
            }
            Opcode::Ireturn
            | Opcode::Lreturn
            | Opcode::Freturn
            | Opcode::Dreturn
            | Opcode::Areturn => {
                let value = stack.pop()?.expect_type(&frame.return_type, name)?;
                return Ok(StepResult::Return { value });
            }
            Opcode::Return => {
                if !frame.return_type.is_void() {
                    return Err(EmulationError::TypeMismatch {
                        operation: name,
                        expected: "value return",
                        found: "void",
                    }
                    .into());
                }
                return Ok(StepResult::Return {
                    value: JavaValue::Void,
                });
            }

            // ================================================================
            // Fields
            // ================================================================
            Opcode::Getstatic => {
                let member = Self::member(instruction)?;
                let value = Self::get_static(member, context)?;
                frame.stack.push(value)?;
            }
            Opcode::Putstatic => {
                let member = Self::member(instruction)?;
                let value = stack
                    .pop()?
                    .expect_type(&field_type(&member.descriptor)?, name)?;
                Self::put_static(member, value, context)?;
            }
            Opcode::Getfield => {
                let member = Self::member(instruction)?;
                let declared = field_type(&member.descriptor)?;
                let receiver = stack.pop_reference(name)?;
                let value = context
                    .heap()
                    .narrow::<JavaInstance>(receiver)?
                    .fields
                    .get(&member.name)
                    .copied()
                    .unwrap_or_else(|| JavaValue::default_for(&declared));
                frame.stack.push(value)?;
            }
            Opcode::Putfield => {
                let member = Self::member(instruction)?;
                let value = stack
                    .pop()?
                    .expect_type(&field_type(&member.descriptor)?, name)?;
                let receiver = stack.pop_reference(name)?;
                context
                    .heap_mut()
                    .narrow_mut::<JavaInstance>(receiver)?
                    .fields
                    .insert(member.name.clone(), value);
            }

            // ================================================================
            // Calls
            // ================================================================
            Opcode::Invokevirtual => Self::invoke(frame, instruction, InvokeKind::Virtual, context)?,
            Opcode::Invokespecial => Self::invoke(frame, instruction, InvokeKind::Special, context)?,
            Opcode::Invokestatic => Self::invoke(frame, instruction, InvokeKind::Static, context)?,
            Opcode::Invokeinterface => {
                Self::invoke(frame, instruction, InvokeKind::Interface, context)?;
            }

            // ================================================================
            // Objects and type checks
            // ================================================================
            Opcode::New => {
                let class_name = Self::type_operand(instruction)?;
                Self::initialize_class(class_name, context)?;
                let object = context.heap_mut().placeholder(class_name)?;
                frame.stack.push(object)?;
            }
            Opcode::Checkcast => {
                let target = Self::type_operand(instruction)?;
                let value = stack.peek()?.expect_reference(name)?;
                if !value.is_null() {
                    let chain = Arc::clone(context.provider());
                    if !chain.instance_of(value, target, context)? {
                        return Err(EmulationError::ClassCast {
                            from_type: context.heap().class_name(value)?.to_string(),
                            to_type: target.to_string(),
                        }
                        .into());
                    }
                }
            }
            Opcode::Instanceof => {
                let target = Self::type_operand(instruction)?;
                let value = stack.pop_reference(name)?;
                let chain = Arc::clone(context.provider());
                let result = chain.instance_of(value, target, context)?;
                frame.stack.push(JavaValue::from(result))?;
            }
            Opcode::Monitorenter | Opcode::Monitorexit => {
                if stack.pop_reference(name)?.is_null() {
                    return Err(EmulationError::NullReference.into());
                }
            }

            // ================================================================
            // Not modeled
            // ================================================================
            Opcode::Athrow => {
                let throwable = stack.pop_reference(name)?;
                return Err(EmulationError::ExceptionThrown {
                    class_name: context.heap().class_name(throwable)?.to_string(),
                }
                .into());
            }
            Opcode::Invokedynamic | Opcode::Jsr | Opcode::Ret => {
                return Err(EmulationError::UnsupportedOpcode { opcode }.into());
            }
        }

        Ok(StepResult::Continue)
    }

    fn invoke(
        frame: &mut ActiveFrame<'_>,
        instruction: &Instruction,
        kind: InvokeKind,
        context: &mut Context,
    ) -> Result<()> {
        let member = Self::member(instruction)?;
        let descriptor = method_descriptor(&member.descriptor)?;
        let args = frame.stack.pop_n(descriptor.parameters.len())?;
        let chain = Arc::clone(context.provider());

        let value = if kind == InvokeKind::Static {
            Self::initialize_class(&member.owner, context)?;
            let call = MethodCall::new_static(&member.owner, &member.name, &member.descriptor, &args);
            chain.invoke(&call, context)?
        } else {
            let receiver = frame.stack.pop_reference(instruction.opcode.mnemonic())?;
            if receiver.is_null() {
                return Err(EmulationError::NullReference.into());
            }
            let call = MethodCall::new_instance(
                kind,
                &member.owner,
                &member.name,
                &member.descriptor,
                receiver,
                &args,
            );
            chain.invoke(&call, context)?
        };

        if !descriptor.return_type.is_void() {
            let value = value.expect_type(&descriptor.return_type, "invoke")?;
            frame.stack.push(value)?;
        }
        Ok(())
    }

    fn get_static(member: &MemberRef, context: &mut Context) -> Result<JavaValue> {
        Self::initialize_class(&member.owner, context)?;
        let (declaring, field) = Self::resolve_static(member, context)?;
        match context.get_static(&declaring, &field.name) {
            Some(value) => Ok(value),
            None => match &field.constant_value {
                Some(constant) => Self::constant_value(constant, context),
                None => Ok(JavaValue::default_for(&field_type(&field.descriptor)?)),
            },
        }
    }

    fn put_static(member: &MemberRef, value: JavaValue, context: &mut Context) -> Result<()> {
        Self::initialize_class(&member.owner, context)?;
        let (declaring, field) = Self::resolve_static(member, context)?;
        context.put_static(&declaring, &field.name, value);
        Ok(())
    }

    /// Finds the class declaring static field `member`, searching superclasses.
    fn resolve_static(member: &MemberRef, context: &Context) -> Result<(String, FieldDef)> {
        let mut current = Some(member.owner.clone());
        while let Some(name) = current {
            let Some(class) = context.dictionary().get(&name) else {
                break;
            };
            if let Some(field) = class.field(&member.name).filter(|field| field.is_static()) {
                return Ok((class.name.clone(), field.clone()));
            }
            current = class.super_name.clone();
        }
        Err(EmulationError::UnresolvedField {
            owner: member.owner.clone(),
            name: member.name.clone(),
        }
        .into())
    }

    fn constant_value(constant: &Constant, context: &mut Context) -> Result<JavaValue> {
        Ok(match constant {
            Constant::Int(value) => JavaValue::Int(*value),
            Constant::Long(value) => JavaValue::Long(*value),
            Constant::Float(value) => JavaValue::Float(*value),
            Constant::Double(value) => JavaValue::Double(*value),
            Constant::String(value) => context.intern(value)?,
            Constant::Type(name) => context
                .heap_mut()
                .wrap(HostObject::Class(JavaClass { name: name.clone() }))?,
        })
    }

    fn allocate_dimensions(
        array_type: &FieldType,
        lengths: &[usize],
        context: &mut Context,
    ) -> Result<JavaValue> {
        let (FieldType::Array(component), Some((&length, rest))) = (array_type, lengths.split_first())
        else {
            return Err(EmulationError::InvalidDescriptor {
                descriptor: array_type.descriptor(),
            }
            .into());
        };

        let array = if rest.is_empty() {
            JavaArray::of_component(component, length)
        } else {
            let mut elements = Vec::with_capacity(length);
            for _ in 0..length {
                elements.push(Self::allocate_dimensions(component, rest, context)?);
            }
            JavaArray::Reference {
                component: component.descriptor(),
                elements,
            }
        };
        context.heap_mut().wrap(HostObject::Array(array))
    }

    fn array_length(count: i32) -> Result<usize> {
        usize::try_from(count).map_err(|_| EmulationError::NegativeArraySize { size: count }.into())
    }

    /// Checks the shape of a value moving between a local slot and the stack.
    fn check_slot(opcode: Opcode, value: JavaValue) -> Result<JavaValue> {
        let name = opcode.mnemonic();
        match opcode {
            Opcode::Iload | Opcode::Istore => value.as_int(name).map(JavaValue::Int),
            Opcode::Lload | Opcode::Lstore => value.as_long(name).map(JavaValue::Long),
            Opcode::Fload | Opcode::Fstore => value.as_float(name).map(JavaValue::Float),
            Opcode::Dload | Opcode::Dstore => value.as_double(name).map(JavaValue::Double),
            _ => value.expect_reference(name),
        }
    }

    /// Checks that an array instruction matches the array's element type.
    fn check_element(opcode: Opcode, array: &JavaArray) -> Result<()> {
        let (expected, matches) = match opcode {
            Opcode::Iaload | Opcode::Iastore => ("int", matches!(array, JavaArray::Int(_))),
            Opcode::Laload | Opcode::Lastore => ("long", matches!(array, JavaArray::Long(_))),
            Opcode::Faload | Opcode::Fastore => ("float", matches!(array, JavaArray::Float(_))),
            Opcode::Daload | Opcode::Dastore => ("double", matches!(array, JavaArray::Double(_))),
            Opcode::Baload | Opcode::Bastore => (
                "byte",
                matches!(array, JavaArray::Byte(_) | JavaArray::Boolean(_)),
            ),
            Opcode::Caload | Opcode::Castore => ("char", matches!(array, JavaArray::Char(_))),
            Opcode::Saload | Opcode::Sastore => ("short", matches!(array, JavaArray::Short(_))),
            _ => ("reference", matches!(array, JavaArray::Reference { .. })),
        };
        if matches {
            Ok(())
        } else {
            Err(EmulationError::ArrayElementTypeMismatch {
                expected,
                found: array.element_kind(),
            }
            .into())
        }
    }

    fn branch_if(taken: bool, instruction: &Instruction) -> Result<StepResult> {
        if taken {
            Ok(StepResult::Branch {
                target: Self::jump_target(instruction)?,
            })
        } else {
            Ok(StepResult::Continue)
        }
    }

    fn jump_target(instruction: &Instruction) -> Result<usize> {
        match instruction.operand {
            Operand::Jump(target) => Ok(target),
            _ => Err(Self::invalid_operand(instruction, "jump target")),
        }
    }

    fn local_index(instruction: &Instruction) -> Result<usize> {
        match instruction.operand {
            Operand::Local(index) => Ok(usize::from(index)),
            _ => Err(Self::invalid_operand(instruction, "local index")),
        }
    }

    fn member(instruction: &Instruction) -> Result<&MemberRef> {
        instruction
            .member()
            .ok_or_else(|| Self::invalid_operand(instruction, "member reference"))
    }

    fn type_operand(instruction: &Instruction) -> Result<&str> {
        match &instruction.operand {
            Operand::Type(name) => Ok(name),
            _ => Err(Self::invalid_operand(instruction, "class name")),
        }
    }

    fn invalid_operand(instruction: &Instruction, expected: &'static str) -> crate::Error {
        EmulationError::InvalidOperand {
            instruction: instruction.opcode.mnemonic(),
            expected,
        }
        .into()
    }
}

fn method_descriptor(descriptor: &str) -> Result<MethodDescriptor> {
    MethodDescriptor::parse(descriptor).map_err(|_| {
        EmulationError::InvalidDescriptor {
            descriptor: descriptor.to_string(),
        }
        .into()
    })
}

fn field_type(descriptor: &str) -> Result<FieldType> {
    FieldType::parse(descriptor).map_err(|_| {
        EmulationError::InvalidDescriptor {
            descriptor: descriptor.to_string(),
        }
        .into()
    })
}

fn field_type_operand(name: &str) -> Result<FieldType> {
    FieldType::from_class_operand(name).map_err(|_| {
        EmulationError::InvalidDescriptor {
            descriptor: name.to_string(),
        }
        .into()
    })
}
