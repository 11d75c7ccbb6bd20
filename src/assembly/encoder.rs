//! Label-based construction of method bodies.
//!
//! [`InstructionAssembler`] is the in-memory counterpart of a class file reader: it builds
//! [`MethodBody`] values instruction by instruction, with symbolic labels for branch
//! targets that are resolved to instruction indices when the body is finished.
//!
//! # Usage Examples
//!
//! ```rust
//! use jvmscope::assembly::InstructionAssembler;
//!
//! let mut asm = InstructionAssembler::new();
//! asm.aload(0)
//!     .invokevirtual("java/lang/String", "trim", "()Ljava/lang/String;")
//!     .areturn();
//! let body = asm.finish()?;
//! assert_eq!(body.len(), 3);
//! # Ok::<(), jvmscope::Error>(())
//! ```
//!
//! # Label Resolution
//!
//! ```rust
//! use jvmscope::assembly::{InstructionAssembler, Opcode};
//!
//! let mut asm = InstructionAssembler::new();
//! asm.iload(0)
//!     .jump(Opcode::Ifeq, "zero")
//!     .iconst(1)
//!     .ireturn()
//!     .label("zero")
//!     .iconst(0)
//!     .ireturn();
//! let body = asm.finish()?;
//! assert_eq!(body.get(1).unwrap().branch_targets(), vec![4]);
//! # Ok::<(), jvmscope::Error>(())
//! ```

use std::collections::HashMap;

use crate::{
    assembly::{ArrayType, Constant, Instruction, MemberRef, MethodBody, Opcode, Operand},
    Error, Result,
};

/// Label references awaiting resolution.
#[derive(Debug, Clone)]
enum LabelFixup {
    Jump(String),
    Table {
        default: String,
        targets: Vec<String>,
    },
    Lookup {
        default: String,
        keys: Vec<(i32, String)>,
    },
}

/// Builder for [`MethodBody`] with symbolic branch labels.
///
/// Emission methods are infallible and chainable; label problems (duplicates, references
/// to labels never defined) are reported by [`InstructionAssembler::finish`].
#[derive(Debug, Default)]
pub struct InstructionAssembler {
    instructions: Vec<Instruction>,
    labels: HashMap<String, usize>,
    fixups: Vec<(usize, LabelFixup)>,
    duplicate: Option<String>,
    max_locals: Option<u16>,
}

impl InstructionAssembler {
    /// Creates an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the size of the local variable frame.
    ///
    /// Without a declaration the frame is sized from the highest slot the code touches.
    pub fn max_locals(&mut self, max_locals: u16) -> &mut Self {
        self.max_locals = Some(max_locals);
        self
    }

    /// Index the next emitted instruction will have.
    #[must_use]
    pub fn position(&self) -> usize {
        self.instructions.len()
    }

    /// Binds `name` to the next emitted instruction.
    pub fn label(&mut self, name: &str) -> &mut Self {
        if self
            .labels
            .insert(name.to_string(), self.instructions.len())
            .is_some()
            && self.duplicate.is_none()
        {
            self.duplicate = Some(name.to_string());
        }
        self
    }

    /// Emits an already built instruction.
    pub fn emit(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.push(instruction);
        self
    }

    /// Emits an operand-less instruction.
    pub fn op(&mut self, opcode: Opcode) -> &mut Self {
        self.emit(Instruction::new(opcode))
    }

    /// Emits `nop`.
    pub fn nop(&mut self) -> &mut Self {
        self.op(Opcode::Nop)
    }

    /// Emits `aconst_null`.
    pub fn aconst_null(&mut self) -> &mut Self {
        self.op(Opcode::AconstNull)
    }

    /// Pushes an `int` using the shortest encoding (`iconst_*`, `bipush`, `sipush`, `ldc`).
    pub fn iconst(&mut self, value: i32) -> &mut Self {
        match value {
            -1 => self.op(Opcode::IconstM1),
            0 => self.op(Opcode::Iconst0),
            1 => self.op(Opcode::Iconst1),
            2 => self.op(Opcode::Iconst2),
            3 => self.op(Opcode::Iconst3),
            4 => self.op(Opcode::Iconst4),
            5 => self.op(Opcode::Iconst5),
            -128..=127 => self.emit(Instruction::with_operand(Opcode::Bipush, Operand::Int(value))),
            -32768..=32767 => {
                self.emit(Instruction::with_operand(Opcode::Sipush, Operand::Int(value)))
            }
            _ => self.ldc(Constant::Int(value)),
        }
    }

    /// Pushes a `long` using `lconst_*` or `ldc`.
    pub fn lconst(&mut self, value: i64) -> &mut Self {
        match value {
            0 => self.op(Opcode::Lconst0),
            1 => self.op(Opcode::Lconst1),
            _ => self.ldc(Constant::Long(value)),
        }
    }

    /// Emits `ldc` with an arbitrary constant.
    pub fn ldc(&mut self, constant: Constant) -> &mut Self {
        self.emit(Instruction::with_operand(Opcode::Ldc, Operand::Constant(constant)))
    }

    /// Emits `ldc` of a string constant.
    pub fn ldc_string(&mut self, value: &str) -> &mut Self {
        self.ldc(Constant::string(value))
    }

    /// Emits a load or store with a local slot operand.
    pub fn local(&mut self, opcode: Opcode, index: u16) -> &mut Self {
        self.emit(Instruction::with_operand(opcode, Operand::Local(index)))
    }

    /// Emits `iload`.
    pub fn iload(&mut self, index: u16) -> &mut Self {
        self.local(Opcode::Iload, index)
    }

    /// Emits `lload`.
    pub fn lload(&mut self, index: u16) -> &mut Self {
        self.local(Opcode::Lload, index)
    }

    /// Emits `aload`.
    pub fn aload(&mut self, index: u16) -> &mut Self {
        self.local(Opcode::Aload, index)
    }

    /// Emits `istore`.
    pub fn istore(&mut self, index: u16) -> &mut Self {
        self.local(Opcode::Istore, index)
    }

    /// Emits `lstore`.
    pub fn lstore(&mut self, index: u16) -> &mut Self {
        self.local(Opcode::Lstore, index)
    }

    /// Emits `astore`.
    pub fn astore(&mut self, index: u16) -> &mut Self {
        self.local(Opcode::Astore, index)
    }

    /// Emits `iinc`.
    pub fn iinc(&mut self, local: u16, delta: i16) -> &mut Self {
        self.emit(Instruction::with_operand(
            Opcode::Iinc,
            Operand::Increment { local, delta },
        ))
    }

    /// Emits a branch (`goto`, `if*`) to `label`.
    pub fn jump(&mut self, opcode: Opcode, label: &str) -> &mut Self {
        self.fixups
            .push((self.instructions.len(), LabelFixup::Jump(label.to_string())));
        self.emit(Instruction::with_operand(opcode, Operand::Jump(usize::MAX)))
    }

    /// Emits `goto` to `label`.
    pub fn goto(&mut self, label: &str) -> &mut Self {
        self.jump(Opcode::Goto, label)
    }

    /// Emits `tableswitch` over `low..` with one label per key.
    pub fn tableswitch(&mut self, low: i32, default: &str, labels: &[&str]) -> &mut Self {
        let count = i32::try_from(labels.len()).unwrap_or(i32::MAX);
        let high = low.saturating_add(count).saturating_sub(1);
        self.fixups.push((
            self.instructions.len(),
            LabelFixup::Table {
                default: default.to_string(),
                targets: labels.iter().map(ToString::to_string).collect(),
            },
        ));
        self.emit(Instruction::with_operand(
            Opcode::Tableswitch,
            Operand::TableSwitch {
                low,
                high,
                default: usize::MAX,
                targets: vec![usize::MAX; labels.len()],
            },
        ))
    }

    /// Emits `lookupswitch` with `(key, label)` pairs.
    pub fn lookupswitch(&mut self, default: &str, keys: &[(i32, &str)]) -> &mut Self {
        self.fixups.push((
            self.instructions.len(),
            LabelFixup::Lookup {
                default: default.to_string(),
                keys: keys
                    .iter()
                    .map(|(key, label)| (*key, (*label).to_string()))
                    .collect(),
            },
        ));
        self.emit(Instruction::with_operand(
            Opcode::Lookupswitch,
            Operand::LookupSwitch {
                default: usize::MAX,
                pairs: keys.iter().map(|(key, _)| (*key, usize::MAX)).collect(),
            },
        ))
    }

    /// Emits a method invocation.
    pub fn invoke(&mut self, opcode: Opcode, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        self.emit(Instruction::with_operand(
            opcode,
            Operand::Method(MemberRef::new(owner, name, descriptor)),
        ))
    }

    /// Emits `invokestatic`.
    pub fn invokestatic(&mut self, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        self.invoke(Opcode::Invokestatic, owner, name, descriptor)
    }

    /// Emits `invokevirtual`.
    pub fn invokevirtual(&mut self, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        self.invoke(Opcode::Invokevirtual, owner, name, descriptor)
    }

    /// Emits `invokespecial`.
    pub fn invokespecial(&mut self, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        self.invoke(Opcode::Invokespecial, owner, name, descriptor)
    }

    /// Emits `invokeinterface`.
    pub fn invokeinterface(&mut self, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        self.invoke(Opcode::Invokeinterface, owner, name, descriptor)
    }

    /// Emits a field access.
    pub fn field(&mut self, opcode: Opcode, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        self.emit(Instruction::with_operand(
            opcode,
            Operand::Field(MemberRef::new(owner, name, descriptor)),
        ))
    }

    /// Emits `getstatic`.
    pub fn getstatic(&mut self, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        self.field(Opcode::Getstatic, owner, name, descriptor)
    }

    /// Emits `putstatic`.
    pub fn putstatic(&mut self, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        self.field(Opcode::Putstatic, owner, name, descriptor)
    }

    /// Emits an instruction with a class operand (`new`, `anewarray`, `checkcast`, `instanceof`).
    pub fn type_op(&mut self, opcode: Opcode, class_name: &str) -> &mut Self {
        self.emit(Instruction::with_operand(
            opcode,
            Operand::Type(class_name.to_string()),
        ))
    }

    /// Emits `new`.
    pub fn new_object(&mut self, class_name: &str) -> &mut Self {
        self.type_op(Opcode::New, class_name)
    }

    /// Emits `newarray`.
    pub fn newarray(&mut self, kind: ArrayType) -> &mut Self {
        self.emit(Instruction::with_operand(
            Opcode::Newarray,
            Operand::NewArray(kind),
        ))
    }

    /// Emits `anewarray`.
    pub fn anewarray(&mut self, component: &str) -> &mut Self {
        self.type_op(Opcode::Anewarray, component)
    }

    /// Emits `multianewarray`.
    pub fn multianewarray(&mut self, descriptor: &str, dimensions: u8) -> &mut Self {
        self.emit(Instruction::with_operand(
            Opcode::Multianewarray,
            Operand::MultiArray {
                descriptor: descriptor.to_string(),
                dimensions,
            },
        ))
    }

    /// Emits `dup`.
    pub fn dup(&mut self) -> &mut Self {
        self.op(Opcode::Dup)
    }

    /// Emits `ireturn`.
    pub fn ireturn(&mut self) -> &mut Self {
        self.op(Opcode::Ireturn)
    }

    /// Emits `areturn`.
    pub fn areturn(&mut self) -> &mut Self {
        self.op(Opcode::Areturn)
    }

    /// Emits `return`.
    pub fn return_void(&mut self) -> &mut Self {
        self.op(Opcode::Return)
    }

    /// Resolves labels and produces the method body.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateLabel`] if a label was bound twice and
    /// [`Error::UndefinedLabel`] if a branch names a label that was never bound.
    pub fn finish(self) -> Result<MethodBody> {
        if let Some(name) = self.duplicate {
            return Err(Error::DuplicateLabel(name));
        }

        let labels = self.labels;
        let resolve = |name: &str| -> Result<usize> {
            labels
                .get(name)
                .copied()
                .ok_or_else(|| Error::UndefinedLabel(name.to_string()))
        };

        let mut instructions = self.instructions;
        for (index, fixup) in self.fixups {
            let Some(instruction) = instructions.get_mut(index) else {
                return Err(malformed_error!("Label fixup for missing instruction {}", index));
            };
            match (fixup, &mut instruction.operand) {
                (LabelFixup::Jump(label), Operand::Jump(target)) => *target = resolve(&label)?,
                (
                    LabelFixup::Table {
                        default: default_label,
                        targets: target_labels,
                    },
                    Operand::TableSwitch {
                        default, targets, ..
                    },
                ) => {
                    *default = resolve(&default_label)?;
                    for (target, label) in targets.iter_mut().zip(&target_labels) {
                        *target = resolve(label)?;
                    }
                }
                (
                    LabelFixup::Lookup {
                        default: default_label,
                        keys,
                    },
                    Operand::LookupSwitch { default, pairs },
                ) => {
                    *default = resolve(&default_label)?;
                    for ((_, target), (_, label)) in pairs.iter_mut().zip(&keys) {
                        *target = resolve(label)?;
                    }
                }
                _ => {
                    return Err(malformed_error!(
                        "Label fixup does not match operand of instruction {}",
                        index
                    ))
                }
            }
        }

        let body = match self.max_locals {
            Some(max_locals) => MethodBody::with_max_locals(instructions, max_locals),
            None => MethodBody::new(instructions),
        };
        body.validate()?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iconst_encoding() {
        let mut asm = InstructionAssembler::new();
        asm.iconst(-1).iconst(5).iconst(100).iconst(1000).iconst(100_000);
        let body = asm.finish().unwrap();
        let opcodes: Vec<Opcode> = body.iter().map(|instruction| instruction.opcode).collect();
        assert_eq!(
            opcodes,
            vec![
                Opcode::IconstM1,
                Opcode::Iconst5,
                Opcode::Bipush,
                Opcode::Sipush,
                Opcode::Ldc
            ]
        );
        assert_eq!(body.get(4).unwrap().constant(), Some(&Constant::Int(100_000)));
    }

    #[test]
    fn test_backward_and_forward_labels() {
        let mut asm = InstructionAssembler::new();
        asm.label("top")
            .iload(0)
            .jump(Opcode::Ifeq, "done")
            .iinc(0, -1)
            .goto("top")
            .label("done")
            .return_void();
        let body = asm.finish().unwrap();
        assert_eq!(body.get(1).unwrap().branch_targets(), vec![4]);
        assert_eq!(body.get(3).unwrap().branch_targets(), vec![0]);
        assert_eq!(body.max_locals(), 1);
    }

    #[test]
    fn test_switch_labels() {
        let mut asm = InstructionAssembler::new();
        asm.iload(0)
            .tableswitch(3, "other", &["three", "four"])
            .label("three")
            .iconst(3)
            .ireturn()
            .label("four")
            .iconst(4)
            .ireturn()
            .label("other")
            .iconst(0)
            .ireturn();
        let body = asm.finish().unwrap();
        match &body.get(1).unwrap().operand {
            Operand::TableSwitch {
                low,
                high,
                default,
                targets,
            } => {
                assert_eq!((*low, *high, *default), (3, 4, 6));
                assert_eq!(targets, &vec![2, 4]);
            }
            other => panic!("unexpected operand {other:?}"),
        }
    }

    #[test]
    fn test_label_errors() {
        let mut asm = InstructionAssembler::new();
        asm.goto("nowhere");
        assert!(matches!(asm.finish(), Err(Error::UndefinedLabel(name)) if name == "nowhere"));

        let mut asm = InstructionAssembler::new();
        asm.label("a").nop().label("a").return_void();
        assert!(matches!(asm.finish(), Err(Error::DuplicateLabel(name)) if name == "a"));
    }
}
