//! Method bodies: an ordered instruction list plus the local variable frame size.

use crate::{
    assembly::{Instruction, Opcode, Operand},
    Result,
};

/// The code of a single method.
///
/// Instructions are addressed by index. Removing an instruction shifts every branch
/// target behind it so control flow keeps pointing at the same instructions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MethodBody {
    instructions: Vec<Instruction>,
    max_locals: u16,
}

impl MethodBody {
    /// Creates a body, computing the number of local slots the instructions touch.
    #[must_use]
    pub fn new(instructions: Vec<Instruction>) -> Self {
        let max_locals = required_locals(&instructions);
        MethodBody {
            instructions,
            max_locals,
        }
    }

    /// Creates a body with an explicit `max_locals`, as declared by a `Code` attribute.
    ///
    /// The stored value is never smaller than what the instructions touch.
    #[must_use]
    pub fn with_max_locals(instructions: Vec<Instruction>, max_locals: u16) -> Self {
        let required = required_locals(&instructions);
        MethodBody {
            instructions,
            max_locals: max_locals.max(required),
        }
    }

    /// Number of local variable slots.
    #[must_use]
    pub fn max_locals(&self) -> u16 {
        self.max_locals
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// `true` if the body has no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Instruction at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Mutable instruction at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Instruction> {
        self.instructions.get_mut(index)
    }

    /// All instructions in order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Iterates over the instructions.
    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Removes the instruction at `index` and re-indexes branch targets.
    ///
    /// Targets that pointed at the removed instruction now point at its successor.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `index` is past the end.
    pub fn remove(&mut self, index: usize) -> Result<Instruction> {
        if index >= self.instructions.len() {
            return Err(crate::Error::OutOfBounds);
        }

        let removed = self.instructions.remove(index);
        for instruction in &mut self.instructions {
            instruction.retarget(|target| if target > index { target - 1 } else { target });
        }
        Ok(removed)
    }

    /// Checks that every branch target is inside the body.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] naming the first offending instruction.
    pub fn validate(&self) -> Result<()> {
        for (index, instruction) in self.instructions.iter().enumerate() {
            if let Some(target) = instruction
                .branch_targets()
                .into_iter()
                .find(|target| *target >= self.instructions.len())
            {
                return Err(malformed_error!(
                    "Instruction {} ({}) branches to {} outside of a {} instruction body",
                    index,
                    instruction.opcode,
                    target,
                    self.instructions.len()
                ));
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a MethodBody {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

fn required_locals(instructions: &[Instruction]) -> u16 {
    instructions
        .iter()
        .filter_map(|instruction| {
            let width = match instruction.opcode {
                Opcode::Lload | Opcode::Dload | Opcode::Lstore | Opcode::Dstore => 2,
                _ => 1,
            };
            match instruction.operand {
                Operand::Local(local) | Operand::Increment { local, .. } => {
                    Some(local.saturating_add(width))
                }
                _ => None,
            }
        })
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jump(opcode: Opcode, target: usize) -> Instruction {
        Instruction::with_operand(opcode, Operand::Jump(target))
    }

    #[test]
    fn test_required_locals() {
        let body = MethodBody::new(vec![
            Instruction::with_operand(Opcode::Lstore, Operand::Local(3)),
            Instruction::with_operand(Opcode::Iinc, Operand::Increment { local: 1, delta: 1 }),
            Instruction::new(Opcode::Return),
        ]);
        assert_eq!(body.max_locals(), 5);

        let body = MethodBody::with_max_locals(vec![Instruction::new(Opcode::Return)], 2);
        assert_eq!(body.max_locals(), 2);
    }

    #[test]
    fn test_remove_reindexes_targets() {
        let mut body = MethodBody::new(vec![
            jump(Opcode::Goto, 3),
            Instruction::new(Opcode::Nop),
            Instruction::new(Opcode::Nop),
            Instruction::new(Opcode::Return),
            jump(Opcode::Ifeq, 2),
        ]);

        let removed = body.remove(2).unwrap();
        assert_eq!(removed.opcode, Opcode::Nop);
        assert_eq!(body.len(), 4);
        assert_eq!(body.get(0).unwrap().branch_targets(), vec![2]);
        // the target that pointed at the removed instruction now points at its successor
        assert_eq!(body.get(3).unwrap().branch_targets(), vec![2]);
        assert_eq!(body.get(2).unwrap().opcode, Opcode::Return);
        body.validate().unwrap();
    }

    #[test]
    fn test_remove_out_of_bounds() {
        let mut body = MethodBody::new(vec![Instruction::new(Opcode::Return)]);
        assert!(matches!(body.remove(1), Err(crate::Error::OutOfBounds)));
    }

    #[test]
    fn test_validate_rejects_dangling_target() {
        let body = MethodBody::new(vec![jump(Opcode::Goto, 7)]);
        assert!(matches!(body.validate(), Err(crate::Error::Malformed { .. })));
    }
}
