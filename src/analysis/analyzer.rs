//! Per-instruction provenance of operand-stack values.
//!
//! [`MethodAnalyzer`] walks a method body forward with a stack of [`Frame`]s instead of
//! values. It runs a worklist to a fixpoint: each instruction's incoming stack is the
//! meet of the stacks flowing into it, and a target reached by a backward jump always
//! starts from a stack of unknown frames. The result says, for every reachable
//! instruction, which frames it consumed and which frame it produced.

use std::collections::BTreeSet;

use log::trace;

use crate::{
    analysis::{Frame, FrameKind},
    assembly::{Constant, Instruction, MethodBody, Opcode, Operand},
    emulation::shuffle,
    metadata::{ClassFile, FieldType, MethodDescriptor},
    Result,
};

/// Stack effect of one reachable instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameEntry {
    /// Frames popped by the instruction, bottom to top
    pub consumed: Vec<Frame>,
    /// Frame pushed by the instruction; invocations record their
    /// [`FrameKind::Call`] frame even when the method returns `void`
    pub produced: Option<Frame>,
}

/// The frame map of one method body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalyzerResult {
    entries: Vec<Option<FrameEntry>>,
}

impl AnalyzerResult {
    /// Entry for the instruction at `index`, `None` if it is unreachable.
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&FrameEntry> {
        self.entries.get(index).and_then(Option::as_ref)
    }

    /// All entries in instruction order.
    #[must_use]
    pub fn entries(&self) -> &[Option<FrameEntry>] {
        &self.entries
    }

    /// Number of instructions covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` for an empty body.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` if the instruction at `index` can be reached from the entry point.
    #[must_use]
    pub fn is_reachable(&self, index: usize) -> bool {
        self.entry(index).is_some()
    }

    /// Receiver and argument frames of the invocation at `index`.
    #[must_use]
    pub fn call_arguments(&self, index: usize) -> Option<&[Frame]> {
        match &self.entry(index)?.produced.as_ref()?.kind {
            FrameKind::Call { arguments, .. } => Some(arguments),
            _ => None,
        }
    }
}

/// Builds [`AnalyzerResult`]s.
///
/// # Example
///
/// ```rust
/// use jvmscope::{
///     analysis::MethodAnalyzer,
///     assembly::InstructionAssembler,
///     metadata::ClassFile,
/// };
///
/// let mut asm = InstructionAssembler::new();
/// asm.ldc_string("cipher")
///     .invokestatic("a/A", "d", "(Ljava/lang/String;)Ljava/lang/String;")
///     .areturn();
/// let body = asm.finish()?;
///
/// let result = MethodAnalyzer::analyze(&ClassFile::new("a/B"), &body)?;
/// let arguments = result.call_arguments(1).unwrap();
/// assert_eq!(arguments[0].literal_string().unwrap().to_string_lossy(), "cipher");
/// # Ok::<(), jvmscope::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodAnalyzer;

impl MethodAnalyzer {
    /// Analyzes `body`, a method of `class`.
    ///
    /// Pure and deterministic: the same body always yields an equal result.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] when the body cannot be typed as a stack
    /// machine: underflow, stacks of different shape meeting at a join, a branch outside
    /// the body or control falling off its end.
    pub fn analyze(class: &ClassFile, body: &MethodBody) -> Result<AnalyzerResult> {
        let instructions = body.instructions();
        let mut entries: Vec<Option<FrameEntry>> = vec![None; instructions.len()];
        if instructions.is_empty() {
            return Ok(AnalyzerResult { entries });
        }

        let mut incoming: Vec<Option<Vec<Frame>>> = vec![None; instructions.len()];
        incoming[0] = Some(Vec::new());
        let mut worklist = BTreeSet::from([0usize]);
        let mut iterations = 0usize;

        while let Some(index) = worklist.pop_first() {
            iterations += 1;
            let Some(mut stack) = incoming[index].clone() else {
                continue;
            };
            let instruction = &instructions[index];
            let entry = Self::transfer(index, instruction, &mut stack)
                .map_err(|error| match error {
                    crate::Error::Malformed { .. } => error,
                    other => malformed_error!(
                        "{} at instruction {} ({}) of {}",
                        other,
                        index,
                        instruction.opcode,
                        class.name
                    ),
                })?;
            entries[index] = Some(entry);

            for (target, state) in Self::successors(index, instruction, &stack) {
                if target >= instructions.len() {
                    return Err(malformed_error!(
                        "Control leaves the body of {} at instruction {} ({})",
                        class.name,
                        index,
                        instruction.opcode
                    ));
                }
                // loop headers start from nothing known
                let state = if target <= index {
                    state.iter().map(Frame::forget).collect()
                } else {
                    state
                };
                let merged = match &incoming[target] {
                    None => state,
                    Some(existing) => Self::meet(existing, &state, target, class)?,
                };
                if incoming[target].as_ref() != Some(&merged) {
                    incoming[target] = Some(merged);
                    worklist.insert(target);
                }
            }
        }

        trace!(
            "analyzed {} instructions of {} in {} iterations",
            instructions.len(),
            class.name,
            iterations
        );
        Ok(AnalyzerResult { entries })
    }

    fn meet(existing: &[Frame], incoming: &[Frame], target: usize, class: &ClassFile) -> Result<Vec<Frame>> {
        if existing.len() != incoming.len() {
            return Err(malformed_error!(
                "Stacks of depth {} and {} meet at instruction {} of {}",
                existing.len(),
                incoming.len(),
                target,
                class.name
            ));
        }
        existing
            .iter()
            .zip(incoming)
            .map(|(left, right)| {
                if left.category == right.category {
                    Ok(left.meet(right))
                } else {
                    Err(malformed_error!(
                        "Stack categories disagree at instruction {} of {}",
                        target,
                        class.name
                    ))
                }
            })
            .collect()
    }

    /// Control transfers out of `instruction` with the stack each one carries.
    fn successors(index: usize, instruction: &Instruction, stack: &[Frame]) -> Vec<(usize, Vec<Frame>)> {
        let mut result: Vec<(usize, Vec<Frame>)> = instruction
            .branch_targets()
            .into_iter()
            .map(|target| (target, stack.to_vec()))
            .collect();
        if instruction.falls_through() {
            if instruction.opcode == Opcode::Jsr {
                // the return address is only on the stack inside the subroutine
                result.push((index + 1, stack[..stack.len().saturating_sub(1)].to_vec()));
            } else {
                result.push((index + 1, stack.to_vec()));
            }
        }
        result
    }

    fn pop(stack: &mut Vec<Frame>) -> Result<Frame> {
        stack
            .pop()
            .ok_or_else(|| malformed_error!("Operand stack underflow"))
    }

    fn pop_n(stack: &mut Vec<Frame>, count: usize) -> Result<Vec<Frame>> {
        if stack.len() < count {
            return Err(malformed_error!("Operand stack underflow"));
        }
        Ok(stack.split_off(stack.len() - count))
    }

    fn category_of(field_type: &FieldType) -> u8 {
        if field_type.slot_size() == 2 {
            2
        } else {
            1
        }
    }

    fn descriptor_category(descriptor: &str) -> Result<u8> {
        Ok(Self::category_of(&FieldType::parse(descriptor)?))
    }

    /// Applies the stack effect of `instruction` and records it.
    fn transfer(index: usize, instruction: &Instruction, stack: &mut Vec<Frame>) -> Result<FrameEntry> {
        let opcode = instruction.opcode;
        let computed = |category: u8| {
            Frame::new(
                FrameKind::Computed {
                    opcode: opcode.mnemonic(),
                    source: index,
                },
                category,
            )
        };

        let (consumed, produced) = match opcode {
            Opcode::Nop | Opcode::Iinc | Opcode::Goto | Opcode::Return | Opcode::Ret => (Vec::new(), None),

            // constants
            Opcode::AconstNull => (Vec::new(), Some(computed(1))),
            Opcode::IconstM1
            | Opcode::Iconst0
            | Opcode::Iconst1
            | Opcode::Iconst2
            | Opcode::Iconst3
            | Opcode::Iconst4
            | Opcode::Iconst5 => {
                let value = i32::from(opcode.code()) - i32::from(Opcode::Iconst0.code());
                (Vec::new(), Some(Frame::literal(Constant::Int(value), index)))
            }
            Opcode::Lconst0 | Opcode::Lconst1 => {
                let value = i64::from(opcode.code() - Opcode::Lconst0.code());
                (Vec::new(), Some(Frame::literal(Constant::Long(value), index)))
            }
            Opcode::Fconst0 | Opcode::Fconst1 | Opcode::Fconst2 => {
                let value = f32::from(opcode.code() - Opcode::Fconst0.code());
                (Vec::new(), Some(Frame::literal(Constant::Float(value), index)))
            }
            Opcode::Dconst0 | Opcode::Dconst1 => {
                let value = f64::from(opcode.code() - Opcode::Dconst0.code());
                (Vec::new(), Some(Frame::literal(Constant::Double(value), index)))
            }
            Opcode::Bipush | Opcode::Sipush => {
                let Operand::Int(value) = instruction.operand else {
                    return Err(malformed_error!("{} without an immediate", opcode));
                };
                (Vec::new(), Some(Frame::literal(Constant::Int(value), index)))
            }
            Opcode::Ldc => {
                let constant = instruction
                    .constant()
                    .ok_or_else(|| malformed_error!("ldc without a constant"))?;
                (Vec::new(), Some(Frame::literal(constant.clone(), index)))
            }

            // locals
            Opcode::Iload | Opcode::Lload | Opcode::Fload | Opcode::Dload | Opcode::Aload => {
                let Operand::Local(slot) = instruction.operand else {
                    return Err(malformed_error!("{} without a local index", opcode));
                };
                let category = if matches!(opcode, Opcode::Lload | Opcode::Dload) { 2 } else { 1 };
                let frame = Frame::new(FrameKind::Local { index: slot, source: index }, category);
                (Vec::new(), Some(frame))
            }
            Opcode::Istore | Opcode::Lstore | Opcode::Fstore | Opcode::Dstore | Opcode::Astore => {
                (vec![Self::pop(stack)?], None)
            }

            // arrays
            Opcode::Iaload
            | Opcode::Laload
            | Opcode::Faload
            | Opcode::Daload
            | Opcode::Aaload
            | Opcode::Baload
            | Opcode::Caload
            | Opcode::Saload => {
                let category = if matches!(opcode, Opcode::Laload | Opcode::Daload) { 2 } else { 1 };
                let consumed = Self::pop_n(stack, 2)?;
                (consumed, Some(Frame::new(FrameKind::ArrayLoad { source: index }, category)))
            }
            Opcode::Iastore
            | Opcode::Lastore
            | Opcode::Fastore
            | Opcode::Dastore
            | Opcode::Aastore
            | Opcode::Bastore
            | Opcode::Castore
            | Opcode::Sastore => (Self::pop_n(stack, 3)?, None),
            Opcode::Arraylength => (vec![Self::pop(stack)?], Some(computed(1))),
            Opcode::Newarray => {
                let Operand::NewArray(kind) = instruction.operand else {
                    return Err(malformed_error!("newarray without an array type"));
                };
                let frame = Frame::new(
                    FrameKind::New {
                        class_name: format!("[{}", kind.descriptor()),
                        source: index,
                    },
                    1,
                );
                (vec![Self::pop(stack)?], Some(frame))
            }
            Opcode::Anewarray => {
                let Operand::Type(component) = &instruction.operand else {
                    return Err(malformed_error!("anewarray without a class operand"));
                };
                let component = FieldType::from_class_operand(component)?;
                let frame = Frame::new(
                    FrameKind::New {
                        class_name: format!("[{}", component.descriptor()),
                        source: index,
                    },
                    1,
                );
                (vec![Self::pop(stack)?], Some(frame))
            }
            Opcode::Multianewarray => {
                let Operand::MultiArray { descriptor, dimensions } = &instruction.operand else {
                    return Err(malformed_error!("multianewarray without a descriptor"));
                };
                let consumed = Self::pop_n(stack, usize::from(*dimensions))?;
                let frame = Frame::new(
                    FrameKind::New {
                        class_name: descriptor.clone(),
                        source: index,
                    },
                    1,
                );
                (consumed, Some(frame))
            }

            // duplicates and swaps move existing frames and record nothing
            Opcode::Pop | Opcode::Pop2 => {
                let words = if opcode == Opcode::Pop { 1 } else { 2 };
                let before = stack.clone();
                shuffle::pop_words(stack, words, opcode.mnemonic())?;
                (before[stack.len()..].to_vec(), None)
            }
            Opcode::Dup => {
                shuffle::dup_words(stack, 1, 0, "dup")?;
                (Vec::new(), None)
            }
            Opcode::DupX1 => {
                shuffle::dup_words(stack, 1, 1, "dup_x1")?;
                (Vec::new(), None)
            }
            Opcode::DupX2 => {
                shuffle::dup_words(stack, 1, 2, "dup_x2")?;
                (Vec::new(), None)
            }
            Opcode::Dup2 => {
                shuffle::dup_words(stack, 2, 0, "dup2")?;
                (Vec::new(), None)
            }
            Opcode::Dup2X1 => {
                shuffle::dup_words(stack, 2, 1, "dup2_x1")?;
                (Vec::new(), None)
            }
            Opcode::Dup2X2 => {
                shuffle::dup_words(stack, 2, 2, "dup2_x2")?;
                (Vec::new(), None)
            }
            Opcode::Swap => {
                shuffle::swap(stack)?;
                (Vec::new(), None)
            }

            // arithmetic
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
            | Opcode::Ixor
            | Opcode::Fadd
            | Opcode::Fsub
            | Opcode::Fmul
            | Opcode::Fdiv
            | Opcode::Frem
            | Opcode::Lcmp
            | Opcode::Fcmpl
            | Opcode::Fcmpg
            | Opcode::Dcmpl
            | Opcode::Dcmpg => (Self::pop_n(stack, 2)?, Some(computed(1))),
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
            | Opcode::Lxor
            | Opcode::Dadd
            | Opcode::Dsub
            | Opcode::Dmul
            | Opcode::Ddiv
            | Opcode::Drem => (Self::pop_n(stack, 2)?, Some(computed(2))),
            Opcode::Ineg
            | Opcode::Fneg
            | Opcode::L2i
            | Opcode::L2f
            | Opcode::I2f
            | Opcode::F2i
            | Opcode::D2i
            | Opcode::D2f
            | Opcode::I2b
            | Opcode::I2c
            | Opcode::I2s => (vec![Self::pop(stack)?], Some(computed(1))),
            Opcode::Lneg
            | Opcode::Dneg
            | Opcode::I2l
            | Opcode::I2d
            | Opcode::L2d
            | Opcode::F2l
            | Opcode::F2d
            | Opcode::D2l => (vec![Self::pop(stack)?], Some(computed(2))),

            // control
            Opcode::Ifeq
            | Opcode::Ifne
            | Opcode::Iflt
            | Opcode::Ifge
            | Opcode::Ifgt
            | Opcode::Ifle
            | Opcode::Ifnull
            | Opcode::Ifnonnull
            | Opcode::Tableswitch
            | Opcode::Lookupswitch
            | Opcode::Ireturn
            | Opcode::Lreturn
            | Opcode::Freturn
            | Opcode::Dreturn
            | Opcode::Areturn
            | Opcode::Athrow
            | Opcode::Monitorenter
            | Opcode::Monitorexit
            | Opcode::Putstatic => (vec![Self::pop(stack)?], None),
            Opcode::IfIcmpeq
            | Opcode::IfIcmpne
            | Opcode::IfIcmplt
            | Opcode::IfIcmpge
            | Opcode::IfIcmpgt
            | Opcode::IfIcmple
            | Opcode::IfAcmpeq
            | Opcode::IfAcmpne
            | Opcode::Putfield => (Self::pop_n(stack, 2)?, None),
            Opcode::Jsr => (Vec::new(), Some(computed(1))),

            // fields
            Opcode::Getstatic | Opcode::Getfield => {
                let Operand::Field(member) = &instruction.operand else {
                    return Err(malformed_error!("{} without a field reference", opcode));
                };
                let consumed = if opcode == Opcode::Getfield {
                    vec![Self::pop(stack)?]
                } else {
                    Vec::new()
                };
                let frame = Frame::new(
                    FrameKind::Field {
                        owner: member.owner.clone(),
                        name: member.name.clone(),
                        source: index,
                    },
                    Self::descriptor_category(&member.descriptor)?,
                );
                (consumed, Some(frame))
            }

            // calls
            Opcode::Invokevirtual | Opcode::Invokespecial | Opcode::Invokestatic | Opcode::Invokeinterface => {
                let Operand::Method(member) = &instruction.operand else {
                    return Err(malformed_error!("{} without a method reference", opcode));
                };
                let descriptor = MethodDescriptor::parse(&member.descriptor)?;
                let receiver = usize::from(opcode != Opcode::Invokestatic);
                let arguments = Self::pop_n(stack, descriptor.parameters.len() + receiver)?;
                let frame = Frame::new(
                    FrameKind::Call {
                        owner: member.owner.clone(),
                        name: member.name.clone(),
                        descriptor: member.descriptor.clone(),
                        arguments: arguments.clone(),
                        source: index,
                    },
                    Self::category_of(&descriptor.return_type),
                );
                if !descriptor.return_type.is_void() {
                    stack.push(frame.clone());
                }
                return Ok(FrameEntry {
                    consumed: arguments,
                    produced: Some(frame),
                });
            }
            Opcode::Invokedynamic => {
                let Operand::Dynamic { descriptor, .. } = &instruction.operand else {
                    return Err(malformed_error!("invokedynamic without a call site"));
                };
                let descriptor = MethodDescriptor::parse(descriptor)?;
                let consumed = Self::pop_n(stack, descriptor.parameters.len())?;
                let produced =
                    (!descriptor.return_type.is_void()).then(|| computed(Self::category_of(&descriptor.return_type)));
                (consumed, produced)
            }

            // objects
            Opcode::New => {
                let Operand::Type(class_name) = &instruction.operand else {
                    return Err(malformed_error!("new without a class operand"));
                };
                let frame = Frame::new(
                    FrameKind::New {
                        class_name: class_name.clone(),
                        source: index,
                    },
                    1,
                );
                (Vec::new(), Some(frame))
            }
            Opcode::Checkcast => {
                let value = Self::pop(stack)?;
                (vec![value.clone()], Some(value))
            }
            Opcode::Instanceof => (vec![Self::pop(stack)?], Some(computed(1))),
        };

        if let Some(frame) = &produced {
            stack.push(frame.clone());
        }
        Ok(FrameEntry { consumed, produced })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::InstructionAssembler;

    const DECRYPT: &str = "(Ljava/lang/String;)Ljava/lang/String;";

    fn analyze(asm: InstructionAssembler) -> AnalyzerResult {
        MethodAnalyzer::analyze(&ClassFile::new("t/Test"), &asm.finish().unwrap()).unwrap()
    }

    #[test]
    fn test_literal_argument() {
        let mut asm = InstructionAssembler::new();
        asm.ldc_string("enc")
            .invokestatic("t/Key", "d", DECRYPT)
            .astore(0)
            .return_void();
        let result = analyze(asm);

        let arguments = result.call_arguments(1).unwrap();
        assert_eq!(arguments.len(), 1);
        assert_eq!(arguments[0].source(), Some(0));
        assert_eq!(arguments[0].literal_string().unwrap().to_string_lossy(), "enc");

        let stored = &result.entry(2).unwrap().consumed[0];
        assert!(matches!(&stored.kind, FrameKind::Call { name, .. } if name == "d"));
    }

    #[test]
    fn test_void_call_records_frame() {
        let mut asm = InstructionAssembler::new();
        asm.getstatic("java/lang/System", "out", "Ljava/io/PrintStream;")
            .ldc_string("hi")
            .invokevirtual("java/io/PrintStream", "println", "(Ljava/lang/String;)V")
            .return_void();
        let result = analyze(asm);

        let entry = result.entry(2).unwrap();
        assert_eq!(entry.consumed.len(), 2);
        assert!(matches!(entry.consumed[0].kind, FrameKind::Field { .. }));
        assert!(entry.consumed[1].is_literal());
        assert!(matches!(entry.produced.as_ref().unwrap().kind, FrameKind::Call { .. }));
        // nothing left on the stack for the return
        assert!(result.entry(3).unwrap().consumed.is_empty());
    }

    #[test]
    fn test_provenance_kinds() {
        let mut asm = InstructionAssembler::new();
        asm.aload(0)
            .iconst(1)
            .op(Opcode::Aaload)
            .new_object("java/lang/StringBuilder")
            .iload(1)
            .iconst(2)
            .op(Opcode::Iadd)
            .invokestatic("t/T", "f", "(Ljava/lang/String;Ljava/lang/Object;I)V")
            .return_void();
        let result = analyze(asm);

        let arguments = result.call_arguments(7).unwrap();
        assert!(matches!(arguments[0].kind, FrameKind::ArrayLoad { source: 2 }));
        assert!(matches!(&arguments[1].kind, FrameKind::New { class_name, source: 3 } if class_name == "java/lang/StringBuilder"));
        assert!(matches!(arguments[2].kind, FrameKind::Computed { opcode: "iadd", source: 6 }));

        let loaded = &result.entry(2).unwrap().consumed;
        assert!(matches!(loaded[0].kind, FrameKind::Local { index: 0, source: 0 }));
        assert_eq!(loaded[1].constant(), Some(&Constant::Int(1)));
    }

    #[test]
    fn test_join_keeps_agreeing_literal() {
        // both paths push the same ldc before the join
        let mut asm = InstructionAssembler::new();
        asm.ldc_string("same")
            .iload(0)
            .jump(Opcode::Ifeq, "join")
            .nop()
            .label("join")
            .invokestatic("t/Key", "d", DECRYPT)
            .areturn();
        let result = analyze(asm);
        assert!(result.call_arguments(4).unwrap()[0].is_literal());
    }

    #[test]
    fn test_join_forgets_disagreeing_values() {
        let mut asm = InstructionAssembler::new();
        asm.iload(0)
            .jump(Opcode::Ifeq, "other")
            .ldc_string("a")
            .goto("join")
            .label("other")
            .ldc_string("b")
            .label("join")
            .invokestatic("t/Key", "d", DECRYPT)
            .areturn();
        let result = analyze(asm);
        assert!(result.call_arguments(5).unwrap()[0].is_unknown());
    }

    #[test]
    fn test_loop_header_is_conservative() {
        // for (;;) { d("x"); } with the literal pushed before the loop
        let mut asm = InstructionAssembler::new();
        asm.ldc_string("x")
            .label("loop")
            .op(Opcode::Dup)
            .invokestatic("t/Key", "d", DECRYPT)
            .op(Opcode::Pop)
            .goto("loop");
        let result = analyze(asm);
        let argument = &result.call_arguments(2).unwrap()[0];
        assert!(argument.is_unknown());
        assert!(argument.may_come_from(0));
    }

    #[test]
    fn test_loop_copy_keeps_producer() {
        let mut asm = InstructionAssembler::new();
        asm.ldc_string("c")
            .op(Opcode::Dup)
            .invokestatic("t/Key", "d", DECRYPT)
            .op(Opcode::Pop)
            .label("loop")
            .op(Opcode::Dup)
            .astore(1)
            .iconst(0)
            .jump(Opcode::Ifne, "loop")
            .op(Opcode::Pop)
            .aload(1)
            .areturn();
        let result = analyze(asm);

        assert!(result.call_arguments(2).unwrap()[0].is_literal());
        let stored = &result.entry(5).unwrap().consumed[0];
        assert!(stored.is_unknown());
        assert_eq!(stored.origins(), vec![0]);
        let popped = &result.entry(8).unwrap().consumed[0];
        assert!(popped.may_come_from(0));
    }

    #[test]
    fn test_join_unions_producers() {
        let mut asm = InstructionAssembler::new();
        asm.iload(0)
            .jump(Opcode::Ifeq, "other")
            .ldc_string("a")
            .goto("join")
            .label("other")
            .ldc_string("b")
            .label("join")
            .astore(1)
            .return_void();
        let result = analyze(asm);
        assert_eq!(result.entry(5).unwrap().consumed[0].origins(), vec![2, 4]);
    }

    #[test]
    fn test_wide_values_and_shuffles() {
        let mut asm = InstructionAssembler::new();
        asm.lconst(1)
            .op(Opcode::Dup2)
            .op(Opcode::Ladd)
            .op(Opcode::Pop2)
            .ldc(Constant::Double(2.0))
            .op(Opcode::Dreturn);
        let result = analyze(asm);
        let added = &result.entry(2).unwrap();
        assert_eq!(added.consumed.len(), 2);
        assert!(added.consumed.iter().all(|frame| frame.category == 2 && frame.source() == Some(0)));
        assert_eq!(added.produced.as_ref().unwrap().category, 2);
        assert_eq!(result.entry(5).unwrap().consumed[0].category, 2);
    }

    #[test]
    fn test_unreachable_code() {
        let mut asm = InstructionAssembler::new();
        asm.goto("end")
            .ldc_string("dead")
            .op(Opcode::Pop)
            .label("end")
            .return_void();
        let result = analyze(asm);
        assert!(!result.is_reachable(1));
        assert!(!result.is_reachable(2));
        assert!(result.is_reachable(3));
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_deterministic() {
        let build = || {
            let mut asm = InstructionAssembler::new();
            asm.iload(0)
                .tableswitch(0, "out", &["a", "b"])
                .label("a")
                .ldc_string("one")
                .goto("call")
                .label("b")
                .ldc_string("two")
                .goto("call")
                .label("out")
                .ldc_string("one")
                .label("call")
                .invokestatic("t/Key", "d", DECRYPT)
                .areturn();
            asm.finish().unwrap()
        };
        let class = ClassFile::new("t/Test");
        let first = MethodAnalyzer::analyze(&class, &build()).unwrap();
        let second = MethodAnalyzer::analyze(&class, &build()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_bodies() {
        let class = ClassFile::new("t/Test");

        let mut asm = InstructionAssembler::new();
        asm.op(Opcode::Pop).return_void();
        let error = MethodAnalyzer::analyze(&class, &asm.finish().unwrap()).unwrap_err();
        assert!(matches!(error, crate::Error::Malformed { .. }));

        // stack depth differs at the join
        let mut asm = InstructionAssembler::new();
        asm.iload(0)
            .jump(Opcode::Ifeq, "join")
            .iconst(1)
            .label("join")
            .return_void();
        let error = MethodAnalyzer::analyze(&class, &asm.finish().unwrap()).unwrap_err();
        assert!(matches!(error, crate::Error::Malformed { .. }));

        let mut asm = InstructionAssembler::new();
        asm.nop();
        let error = MethodAnalyzer::analyze(&class, &asm.finish().unwrap()).unwrap_err();
        assert!(matches!(error, crate::Error::Malformed { .. }));

        let empty = MethodAnalyzer::analyze(&class, &InstructionAssembler::new().finish().unwrap()).unwrap();
        assert!(empty.is_empty());
    }
}
