//! Symbolic operand-stack entries.
//!
//! A [`Frame`] records where a stack value came from rather than what it is. The analyzer
//! builds one per pushed value; merging two frames that disagree yields
//! [`FrameKind::Unknown`], so a [`FrameKind::Literal`] that survives analysis is a
//! constant-pool literal along every path that reaches its consumer. Unknown frames
//! still remember which instructions may have produced them.

use widestring::U16String;

use crate::{assembly::Constant, emulation::StackEntry};

/// Provenance of a symbolic stack value.
///
/// Every kind except [`FrameKind::Unknown`] keeps the index of the instruction that
/// produced it; an unknown frame keeps every candidate producer instead.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameKind {
    /// Constant load (`ldc`, `iconst_*`, `bipush`, ...)
    Literal {
        /// Loaded constant
        value: Constant,
        /// Producing instruction
        source: usize,
    },
    /// Result of a method invocation
    Call {
        /// Internal name of the declaring class
        owner: String,
        /// Method name
        name: String,
        /// Method descriptor
        descriptor: String,
        /// Receiver (for instance calls) followed by the arguments, bottom to top
        arguments: Vec<Frame>,
        /// Invoking instruction
        source: usize,
    },
    /// Field read (`getstatic`, `getfield`)
    Field {
        /// Internal name of the declaring class
        owner: String,
        /// Field name
        name: String,
        /// Reading instruction
        source: usize,
    },
    /// Array element read (`iaload`, `aaload`, ...)
    ArrayLoad {
        /// Reading instruction
        source: usize,
    },
    /// Local variable read
    Local {
        /// Slot index
        index: u16,
        /// Reading instruction
        source: usize,
    },
    /// Fresh object or array
    New {
        /// Internal name of the class, or array descriptor
        class_name: String,
        /// Allocating instruction
        source: usize,
    },
    /// Any other computed value (arithmetic, comparisons, `aconst_null`, ...)
    Computed {
        /// Mnemonic of the producing instruction
        opcode: &'static str,
        /// Producing instruction
        source: usize,
    },
    /// Disagreeing provenance at a join, or a value entering a loop header
    Unknown {
        /// Instructions that may have produced the value, sorted
        origins: Vec<usize>,
    },
}

/// A symbolic stack value with its JVM stack category.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Provenance
    pub kind: FrameKind,
    /// 1, or 2 for `long` and `double`
    pub category: u8,
}

impl Frame {
    /// Creates a frame of the given category.
    #[must_use]
    pub fn new(kind: FrameKind, category: u8) -> Self {
        Frame { kind, category }
    }

    /// Literal frame; the category follows the constant.
    #[must_use]
    pub fn literal(value: Constant, source: usize) -> Self {
        let category = if value.category() == 2 { 2 } else { 1 };
        Frame {
            kind: FrameKind::Literal { value, source },
            category,
        }
    }

    /// Unknown frame of the given category with no known producer.
    #[must_use]
    pub fn unknown(category: u8) -> Self {
        Frame {
            kind: FrameKind::Unknown { origins: Vec::new() },
            category,
        }
    }

    /// `true` for [`FrameKind::Literal`].
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self.kind, FrameKind::Literal { .. })
    }

    /// `true` for [`FrameKind::Unknown`].
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self.kind, FrameKind::Unknown { .. })
    }

    /// The constant of a literal frame.
    #[must_use]
    pub fn constant(&self) -> Option<&Constant> {
        match &self.kind {
            FrameKind::Literal { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The string of a literal string frame.
    #[must_use]
    pub fn literal_string(&self) -> Option<&U16String> {
        self.constant().and_then(Constant::as_string)
    }

    /// Index of the producing instruction, `None` for unknown frames.
    #[must_use]
    pub fn source(&self) -> Option<usize> {
        match &self.kind {
            FrameKind::Literal { source, .. }
            | FrameKind::Call { source, .. }
            | FrameKind::Field { source, .. }
            | FrameKind::ArrayLoad { source }
            | FrameKind::Local { source, .. }
            | FrameKind::New { source, .. }
            | FrameKind::Computed { source, .. } => Some(*source),
            FrameKind::Unknown { .. } => None,
        }
    }

    /// Every instruction that may have produced this value, sorted.
    #[must_use]
    pub fn origins(&self) -> Vec<usize> {
        match &self.kind {
            FrameKind::Unknown { origins } => origins.clone(),
            _ => self.source().into_iter().collect(),
        }
    }

    /// `true` if the instruction at `source` may have produced this value.
    #[must_use]
    pub fn may_come_from(&self, source: usize) -> bool {
        match &self.kind {
            FrameKind::Unknown { origins } => origins.binary_search(&source).is_ok(),
            _ => self.source() == Some(source),
        }
    }

    /// Greatest common provenance of two frames: identical frames are kept, anything
    /// else becomes [`FrameKind::Unknown`] over the producers of both.
    ///
    /// Callers check that the categories agree before meeting.
    #[must_use]
    pub fn meet(&self, other: &Self) -> Self {
        if self == other {
            return self.clone();
        }
        let mut origins = self.origins();
        origins.extend(other.origins());
        origins.sort_unstable();
        origins.dedup();
        Frame {
            kind: FrameKind::Unknown { origins },
            category: self.category,
        }
    }

    /// The same slot with its provenance forgotten but its producers kept.
    #[must_use]
    pub fn forget(&self) -> Self {
        Frame {
            kind: FrameKind::Unknown {
                origins: self.origins(),
            },
            category: self.category,
        }
    }
}

impl StackEntry for Frame {
    fn words(&self) -> usize {
        usize::from(self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_category() {
        assert_eq!(Frame::literal(Constant::Long(1), 0).category, 2);
        assert_eq!(Frame::literal(Constant::Double(1.0), 0).category, 2);
        assert_eq!(Frame::literal(Constant::string("x"), 0).category, 1);
    }

    #[test]
    fn test_meet() {
        let a = Frame::literal(Constant::string("a"), 3);
        let same = Frame::literal(Constant::string("a"), 3);
        let other_source = Frame::literal(Constant::string("a"), 4);

        assert_eq!(a.meet(&same), a);
        assert!(a.meet(&other_source).is_unknown());
        assert!(Frame::unknown(1).meet(&a).is_unknown());
        assert_eq!(a.meet(&other_source).source(), None);
        assert_eq!(a.literal_string().unwrap().to_string_lossy(), "a");
    }

    #[test]
    fn test_unknown_keeps_producers() {
        let a = Frame::literal(Constant::string("a"), 3);
        let b = Frame::literal(Constant::string("b"), 7);

        let forgotten = a.forget();
        assert!(forgotten.is_unknown());
        assert_eq!(forgotten.origins(), vec![3]);
        assert!(forgotten.may_come_from(3));

        let joined = forgotten.meet(&b).meet(&a);
        assert_eq!(joined.origins(), vec![3, 7]);
        assert!(joined.may_come_from(7));
        assert!(!joined.may_come_from(5));
        assert!(Frame::unknown(1).origins().is_empty());
    }
}
