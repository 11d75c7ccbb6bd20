//! Local variable slots of an interpreter frame.

use crate::{
    emulation::{EmulationError, JavaValue},
    Result,
};

/// Local variable array.
///
/// `long` and `double` values occupy two slots: the value sits in the lower slot and the
/// upper slot holds [`JavaValue::Top`]. Overwriting either half of a category-2 value
/// invalidates the other half.
#[derive(Clone, Debug)]
pub struct LocalVariables {
    slots: Vec<JavaValue>,
}

impl LocalVariables {
    /// Creates `count` unset slots.
    #[must_use]
    pub fn new(count: usize) -> Self {
        LocalVariables {
            slots: vec![JavaValue::Top; count],
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` if there are no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn check(&self, index: usize, width: usize) -> Result<()> {
        if index + width > self.slots.len() {
            return Err(EmulationError::LocalIndexOutOfBounds {
                index: index + width - 1,
                count: self.slots.len(),
            }
            .into());
        }
        Ok(())
    }

    /// Reads slot `index`.
    ///
    /// # Errors
    /// Returns an out-of-bounds fault, or a type fault when the slot was never written or
    /// holds the upper half of a category-2 value.
    pub fn load(&self, index: usize) -> Result<JavaValue> {
        self.check(index, 1)?;
        match self.slots[index] {
            JavaValue::Top | JavaValue::Void => Err(EmulationError::TypeMismatch {
                operation: "load",
                expected: "initialized local",
                found: "top",
            }
            .into()),
            value => Ok(value),
        }
    }

    /// Writes slot `index` (and `index + 1` for category-2 values).
    ///
    /// # Errors
    /// Returns an out-of-bounds fault.
    pub fn store(&mut self, index: usize, value: JavaValue) -> Result<()> {
        let width = value.category();
        self.check(index, width)?;

        // storing into the upper half of a wide value invalidates its lower half
        if index > 0 && self.slots[index - 1].category() == 2 {
            self.slots[index - 1] = JavaValue::Top;
        }
        self.slots[index] = value;
        if width == 2 {
            self.slots[index + 1] = JavaValue::Top;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulation::FaultKind;

    #[test]
    fn test_wide_values() {
        let mut locals = LocalVariables::new(3);
        locals.store(0, JavaValue::Long(5)).unwrap();
        assert_eq!(locals.load(0).unwrap(), JavaValue::Long(5));
        assert!(locals.load(1).is_err());

        locals.store(1, JavaValue::Int(3)).unwrap();
        assert_eq!(locals.load(1).unwrap(), JavaValue::Int(3));
        assert!(locals.load(0).is_err());
    }

    #[test]
    fn test_bounds() {
        let mut locals = LocalVariables::new(2);
        let error = locals.store(1, JavaValue::Double(1.0)).unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Unsupported));
        assert!(locals.load(2).is_err());
        assert_eq!(
            locals.load(0).unwrap_err().fault_kind(),
            Some(FaultKind::Type)
        );
    }
}
