//! Resource ceilings for a single emulation.
//!
//! Every [`crate::emulation::Context`] carries an [`EmulationLimits`] value. The interpreter
//! charges one step per executed instruction against `max_instructions`, refuses to push
//! call frames past `max_call_depth`, bounds each operand stack by `max_stack_depth` and
//! each heap by `max_heap_objects`. Exceeding any of them is a
//! [`crate::emulation::FaultKind::StepBudget`] fault; the step ceiling is the only way a
//! non-terminating decryption routine is stopped.

/// Execution limits for an emulation.
///
/// # Builder Pattern
///
/// ```rust
/// use jvmscope::emulation::EmulationLimits;
///
/// let limits = EmulationLimits::new()
///     .with_max_instructions(50_000)
///     .with_max_call_depth(32);
/// assert_eq!(limits.max_call_depth, 32);
/// ```
///
/// # Default Values
///
/// | Limit | Default Value |
/// |-------|---------------|
/// | `max_instructions` | 10,000,000 |
/// | `max_call_depth` | 512 |
/// | `max_stack_depth` | 65,535 |
/// | `max_heap_objects` | 100,000 |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmulationLimits {
    /// Maximum instructions to execute across all frames of one emulation.
    ///
    /// Set to 0 for unlimited execution.
    pub max_instructions: u64,

    /// Maximum number of synthetic call frames.
    pub max_call_depth: usize,

    /// Maximum operand stack entries of a single frame.
    pub max_stack_depth: usize,

    /// Maximum number of heap objects.
    pub max_heap_objects: usize,
}

impl Default for EmulationLimits {
    fn default() -> Self {
        Self {
            max_instructions: 10_000_000,
            max_call_depth: 512,
            max_stack_depth: 65_535,
            max_heap_objects: 100_000,
        }
    }
}

impl EmulationLimits {
    /// Creates new limits with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits tuned for string decryption routines: short, shallow and allocation light.
    #[must_use]
    pub fn decryption() -> Self {
        Self {
            max_instructions: 2_000_000,
            max_call_depth: 128,
            max_stack_depth: 4_096,
            max_heap_objects: 50_000,
        }
    }

    /// Sets the maximum instruction count (0 for unlimited).
    #[must_use]
    pub fn with_max_instructions(mut self, max: u64) -> Self {
        self.max_instructions = max;
        self
    }

    /// Sets the maximum call depth.
    #[must_use]
    pub fn with_max_call_depth(mut self, max: usize) -> Self {
        self.max_call_depth = max;
        self
    }

    /// Sets the maximum operand stack depth.
    #[must_use]
    pub fn with_max_stack_depth(mut self, max: usize) -> Self {
        self.max_stack_depth = max;
        self
    }

    /// Sets the maximum number of heap objects.
    #[must_use]
    pub fn with_max_heap_objects(mut self, max: usize) -> Self {
        self.max_heap_objects = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let limits = EmulationLimits::new()
            .with_max_instructions(1)
            .with_max_call_depth(2)
            .with_max_stack_depth(3)
            .with_max_heap_objects(4);
        assert_eq!(
            limits,
            EmulationLimits {
                max_instructions: 1,
                max_call_depth: 2,
                max_stack_depth: 3,
                max_heap_objects: 4,
            }
        );
        assert!(EmulationLimits::decryption().max_instructions < EmulationLimits::default().max_instructions);
    }
}
