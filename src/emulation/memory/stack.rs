//! JVM operand stack.
//!
//! This module provides [`OperandStack`], the per-frame working area of the interpreter.
//! Each entry holds one [`JavaValue`]; `long` and `double` values occupy a single entry
//! but count as two words for the stack manipulation instructions (`pop2`, `dup2`,
//! `dup_x2`, ...). The word-based shuffles are implemented once, generically, in
//! [`shuffle`] so that the dataflow analyzer applies exactly the same rules to its
//! symbolic frames.
//!
//! # Overflow Protection
//!
//! The stack has a configurable maximum depth. Exceeding it returns
//! [`EmulationError::StackOverflow`].

use std::fmt;

use crate::{
    emulation::{EmulationError, JavaValue},
    Result,
};

/// Anything that can sit on an operand stack and has a JVM stack category.
pub trait StackEntry: Clone {
    /// 1 for single-word values, 2 for `long` and `double`.
    fn words(&self) -> usize;
}

impl StackEntry for JavaValue {
    fn words(&self) -> usize {
        self.category()
    }
}

/// Word-based stack manipulation shared by the interpreter and the analyzer.
pub mod shuffle {
    use super::StackEntry;
    use crate::{emulation::EmulationError, Result};

    /// Number of entries at the top of `stack` that make up exactly `words` words,
    /// starting `skip` entries below the top.
    fn entries_for_words<T: StackEntry>(
        stack: &[T],
        skip: usize,
        words: usize,
        instruction: &'static str,
    ) -> Result<usize> {
        let mut count = 0;
        let mut total = 0;
        while total < words {
            let index = stack
                .len()
                .checked_sub(skip + count + 1)
                .ok_or(EmulationError::StackUnderflow)?;
            total += stack[index].words();
            count += 1;
        }
        if total != words {
            return Err(EmulationError::StackShapeMismatch { instruction }.into());
        }
        Ok(count)
    }

    /// Removes `words` words from the top of the stack (`pop` = 1, `pop2` = 2).
    ///
    /// # Errors
    /// Returns an underflow fault, or a shape fault if a category-2 value would be split.
    pub fn pop_words<T: StackEntry>(stack: &mut Vec<T>, words: usize, instruction: &'static str) -> Result<()> {
        let count = entries_for_words(stack, 0, words, instruction)?;
        stack.truncate(stack.len() - count);
        Ok(())
    }

    /// Duplicates the top `top_words` words and inserts the copy below the next
    /// `under_words` words.
    ///
    /// | Instruction | `top_words` | `under_words` |
    /// |-------------|-------------|---------------|
    /// | `dup`       | 1 | 0 |
    /// | `dup_x1`    | 1 | 1 |
    /// | `dup_x2`    | 1 | 2 |
    /// | `dup2`      | 2 | 0 |
    /// | `dup2_x1`   | 2 | 1 |
    /// | `dup2_x2`   | 2 | 2 |
    ///
    /// # Errors
    /// Returns an underflow fault, or a shape fault if a category-2 value would be split.
    pub fn dup_words<T: StackEntry>(
        stack: &mut Vec<T>,
        top_words: usize,
        under_words: usize,
        instruction: &'static str,
    ) -> Result<()> {
        let top = entries_for_words(stack, 0, top_words, instruction)?;
        let under = if under_words == 0 {
            0
        } else {
            entries_for_words(stack, top, under_words, instruction)?
        };
        let copy: Vec<T> = stack[stack.len() - top..].to_vec();
        let insert_at = stack.len() - top - under;
        stack.splice(insert_at..insert_at, copy);
        Ok(())
    }

    /// Exchanges the two single-word values at the top.
    ///
    /// # Errors
    /// Returns an underflow fault, or a shape fault if either value is category 2.
    pub fn swap<T: StackEntry>(stack: &mut [T]) -> Result<()> {
        let length = stack.len();
        if length < 2 {
            return Err(EmulationError::StackUnderflow.into());
        }
        if stack[length - 1].words() != 1 || stack[length - 2].words() != 1 {
            return Err(EmulationError::StackShapeMismatch { instruction: "swap" }.into());
        }
        stack.swap(length - 1, length - 2);
        Ok(())
    }
}

/// Operand stack of a single interpreter frame.
///
/// # Example
///
/// ```rust
/// use jvmscope::emulation::{JavaValue, OperandStack};
///
/// let mut stack = OperandStack::new(2);
/// stack.push(JavaValue::Int(1))?;
/// stack.push(JavaValue::Long(2))?;
/// assert!(stack.push(JavaValue::Null).is_err());
/// assert_eq!(stack.pop_long("test")?, 2);
/// # Ok::<(), jvmscope::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct OperandStack {
    values: Vec<JavaValue>,
    max_depth: usize,
}

impl OperandStack {
    /// Creates an empty stack holding at most `max_depth` entries.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        OperandStack {
            values: Vec::with_capacity(max_depth.min(64)),
            max_depth,
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.values.len()
    }

    /// `true` if the stack holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Pushes a value.
    ///
    /// # Errors
    /// Returns [`EmulationError::StackOverflow`] when the stack is full and a type fault
    /// for `void` and `top`, which never live on the operand stack.
    pub fn push(&mut self, value: JavaValue) -> Result<()> {
        if matches!(value, JavaValue::Void | JavaValue::Top) {
            return Err(EmulationError::TypeMismatch {
                operation: "push",
                expected: "value",
                found: value.type_name(),
            }
            .into());
        }
        if self.values.len() >= self.max_depth {
            return Err(EmulationError::StackOverflow {
                limit: self.max_depth,
            }
            .into());
        }
        self.values.push(value);
        Ok(())
    }

    /// Pops the top value.
    ///
    /// # Errors
    /// Returns [`EmulationError::StackUnderflow`] if the stack is empty.
    pub fn pop(&mut self) -> Result<JavaValue> {
        self.values
            .pop()
            .ok_or_else(|| EmulationError::StackUnderflow.into())
    }

    /// Pops `count` values, returned bottom to top.
    ///
    /// # Errors
    /// Returns [`EmulationError::StackUnderflow`] if fewer than `count` values are present.
    pub fn pop_n(&mut self, count: usize) -> Result<Vec<JavaValue>> {
        if count > self.values.len() {
            return Err(EmulationError::StackUnderflow.into());
        }
        Ok(self.values.split_off(self.values.len() - count))
    }

    /// Returns the top value without removing it.
    ///
    /// # Errors
    /// Returns [`EmulationError::StackUnderflow`] if the stack is empty.
    pub fn peek(&self) -> Result<JavaValue> {
        self.values
            .last()
            .copied()
            .ok_or_else(|| EmulationError::StackUnderflow.into())
    }

    /// Pops an `int`.
    ///
    /// # Errors
    /// Underflow or type fault.
    pub fn pop_int(&mut self, operation: &'static str) -> Result<i32> {
        self.pop()?.as_int(operation)
    }

    /// Pops a `long`.
    ///
    /// # Errors
    /// Underflow or type fault.
    pub fn pop_long(&mut self, operation: &'static str) -> Result<i64> {
        self.pop()?.as_long(operation)
    }

    /// Pops a `float`.
    ///
    /// # Errors
    /// Underflow or type fault.
    pub fn pop_float(&mut self, operation: &'static str) -> Result<f32> {
        self.pop()?.as_float(operation)
    }

    /// Pops a `double`.
    ///
    /// # Errors
    /// Underflow or type fault.
    pub fn pop_double(&mut self, operation: &'static str) -> Result<f64> {
        self.pop()?.as_double(operation)
    }

    /// Pops a reference or `null`.
    ///
    /// # Errors
    /// Underflow or type fault.
    pub fn pop_reference(&mut self, operation: &'static str) -> Result<JavaValue> {
        self.pop()?.expect_reference(operation)
    }

    /// Applies a `pop`/`pop2` of `words` words.
    ///
    /// # Errors
    /// See [`shuffle::pop_words`].
    pub fn pop_words(&mut self, words: usize, instruction: &'static str) -> Result<()> {
        shuffle::pop_words(&mut self.values, words, instruction)
    }

    /// Applies one of the `dup` family.
    ///
    /// # Errors
    /// See [`shuffle::dup_words`]; additionally an overflow fault.
    pub fn dup_words(&mut self, top_words: usize, under_words: usize, instruction: &'static str) -> Result<()> {
        shuffle::dup_words(&mut self.values, top_words, under_words, instruction)?;
        if self.values.len() > self.max_depth {
            return Err(EmulationError::StackOverflow {
                limit: self.max_depth,
            }
            .into());
        }
        Ok(())
    }

    /// Applies `swap`.
    ///
    /// # Errors
    /// See [`shuffle::swap`].
    pub fn swap(&mut self) -> Result<()> {
        shuffle::swap(&mut self.values)
    }

    /// All entries, bottom to top.
    #[must_use]
    pub fn as_slice(&self) -> &[JavaValue] {
        &self.values
    }
}

impl fmt::Display for OperandStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (index, value) in self.values.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulation::FaultKind;

    fn stack_of(values: &[JavaValue]) -> OperandStack {
        let mut stack = OperandStack::new(16);
        for value in values {
            stack.push(*value).unwrap();
        }
        stack
    }

    #[test]
    fn test_dup_x1() {
        let mut stack = stack_of(&[JavaValue::Int(1), JavaValue::Int(2)]);
        stack.dup_words(1, 1, "dup_x1").unwrap();
        assert_eq!(
            stack.as_slice(),
            &[JavaValue::Int(2), JavaValue::Int(1), JavaValue::Int(2)]
        );
    }

    #[test]
    fn test_dup_x2_over_long() {
        let mut stack = stack_of(&[JavaValue::Long(9), JavaValue::Int(1)]);
        stack.dup_words(1, 2, "dup_x2").unwrap();
        assert_eq!(
            stack.as_slice(),
            &[JavaValue::Int(1), JavaValue::Long(9), JavaValue::Int(1)]
        );
    }

    #[test]
    fn test_dup2_forms() {
        let mut stack = stack_of(&[JavaValue::Int(1), JavaValue::Int(2)]);
        stack.dup_words(2, 0, "dup2").unwrap();
        assert_eq!(stack.depth(), 4);

        let mut stack = stack_of(&[JavaValue::Int(1), JavaValue::Double(2.0)]);
        stack.dup_words(2, 1, "dup2_x1").unwrap();
        assert_eq!(
            stack.as_slice(),
            &[JavaValue::Double(2.0), JavaValue::Int(1), JavaValue::Double(2.0)]
        );

        let mut stack = stack_of(&[JavaValue::Long(1), JavaValue::Long(2)]);
        stack.dup_words(2, 2, "dup2_x2").unwrap();
        assert_eq!(
            stack.as_slice(),
            &[JavaValue::Long(2), JavaValue::Long(1), JavaValue::Long(2)]
        );
    }

    #[test]
    fn test_split_category_two_is_rejected() {
        let mut stack = stack_of(&[JavaValue::Long(1)]);
        let error = stack.pop_words(1, "pop").unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Unsupported));
        stack.pop_words(2, "pop2").unwrap();
        assert!(stack.is_empty());

        let mut stack = stack_of(&[JavaValue::Int(1), JavaValue::Long(1)]);
        assert!(stack.swap().is_err());
    }

    #[test]
    fn test_overflow_and_underflow() {
        let mut stack = OperandStack::new(1);
        stack.push(JavaValue::Int(1)).unwrap();
        let error = stack.dup_words(1, 0, "dup").unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::StepBudget));

        let mut stack = OperandStack::new(4);
        assert!(stack.pop().is_err());
        assert!(stack.pop_n(1).is_err());
        assert!(stack.push(JavaValue::Void).is_err());
    }
}
