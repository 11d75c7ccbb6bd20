//! Decoded instructions and their operands.

use std::fmt;

use widestring::U16String;

use crate::assembly::Opcode;

/// A constant pool entry loadable through `ldc`, or carried as a field's `ConstantValue`.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// `CONSTANT_Integer`
    Int(i32),
    /// `CONSTANT_Long`
    Long(i64),
    /// `CONSTANT_Float`
    Float(f32),
    /// `CONSTANT_Double`
    Double(f64),
    /// `CONSTANT_String`, kept as UTF-16 code units
    String(U16String),
    /// `CONSTANT_Class`, as an internal name or array descriptor
    Type(String),
}

impl Constant {
    /// Builds a string constant from a Rust string.
    pub fn string(value: &str) -> Self {
        Constant::String(U16String::from_str(value))
    }

    /// Returns the string payload for string constants.
    #[must_use]
    pub fn as_string(&self) -> Option<&U16String> {
        match self {
            Constant::String(value) => Some(value),
            _ => None,
        }
    }

    /// Stack category of the loaded value (2 for `long` and `double`).
    #[must_use]
    pub fn category(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(value) => write!(f, "{value}"),
            Constant::Long(value) => write!(f, "{value}L"),
            Constant::Float(value) => write!(f, "{value}F"),
            Constant::Double(value) => write!(f, "{value}D"),
            Constant::String(value) => write!(f, "{:?}", value.to_string_lossy()),
            Constant::Type(value) => write!(f, "{value}.class"),
        }
    }
}

/// A symbolic reference to a field or method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    /// Internal name of the owning class (`java/lang/String`)
    pub owner: String,
    /// Member name
    pub name: String,
    /// Field or method descriptor
    pub descriptor: String,
}

impl MemberRef {
    /// Creates a new member reference.
    pub fn new(owner: impl Into<String>, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        MemberRef {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// Name followed by descriptor, the key native methods are registered under.
    #[must_use]
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

/// Element type operand of `newarray`, with the JVM `atype` codes as discriminants.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ArrayType {
    Boolean = 4,
    Char = 5,
    Float = 6,
    Double = 7,
    Byte = 8,
    Short = 9,
    Int = 10,
    Long = 11,
}

impl ArrayType {
    /// Decodes a JVM `atype` value.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            4 => Some(ArrayType::Boolean),
            5 => Some(ArrayType::Char),
            6 => Some(ArrayType::Float),
            7 => Some(ArrayType::Double),
            8 => Some(ArrayType::Byte),
            9 => Some(ArrayType::Short),
            10 => Some(ArrayType::Int),
            11 => Some(ArrayType::Long),
            _ => None,
        }
    }

    /// Field descriptor of the element type.
    #[must_use]
    pub fn descriptor(self) -> &'static str {
        match self {
            ArrayType::Boolean => "Z",
            ArrayType::Char => "C",
            ArrayType::Float => "F",
            ArrayType::Double => "D",
            ArrayType::Byte => "B",
            ArrayType::Short => "S",
            ArrayType::Int => "I",
            ArrayType::Long => "J",
        }
    }
}

/// Instruction operand.
///
/// Branch targets are instruction indices into the owning [`crate::assembly::MethodBody`],
/// not byte offsets.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// Immediate value of `bipush` / `sipush`
    Int(i32),
    /// Constant of `ldc`
    Constant(Constant),
    /// Local variable slot of loads, stores and `ret`
    Local(u16),
    /// Operand of `iinc`
    Increment {
        /// Local variable slot
        local: u16,
        /// Signed increment
        delta: i16,
    },
    /// Branch target of jumps
    Jump(usize),
    /// Operand of `tableswitch`
    TableSwitch {
        /// Lowest matched key
        low: i32,
        /// Highest matched key
        high: i32,
        /// Target if the key is outside `low..=high`
        default: usize,
        /// One target per key in `low..=high`
        targets: Vec<usize>,
    },
    /// Operand of `lookupswitch`
    LookupSwitch {
        /// Target if no key matches
        default: usize,
        /// `(key, target)` pairs
        pairs: Vec<(i32, usize)>,
    },
    /// Field reference of `getstatic` / `putstatic` / `getfield` / `putfield`
    Field(MemberRef),
    /// Method reference of the invoke instructions
    Method(MemberRef),
    /// Call site of `invokedynamic`
    Dynamic {
        /// Call site name
        name: String,
        /// Call site descriptor
        descriptor: String,
    },
    /// Class operand of `new`, `anewarray`, `checkcast` and `instanceof`
    Type(String),
    /// Element type of `newarray`
    NewArray(ArrayType),
    /// Operand of `multianewarray`
    MultiArray {
        /// Array descriptor (`[[I`)
        descriptor: String,
        /// Number of dimensions taken from the stack
        dimensions: u8,
    },
}

/// A single decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The opcode
    pub opcode: Opcode,
    /// The operand, [`Operand::None`] for operand-less opcodes
    pub operand: Operand,
}

impl Instruction {
    /// Creates an operand-less instruction.
    #[must_use]
    pub fn new(opcode: Opcode) -> Self {
        Instruction {
            opcode,
            operand: Operand::None,
        }
    }

    /// Creates an instruction with an operand.
    #[must_use]
    pub fn with_operand(opcode: Opcode, operand: Operand) -> Self {
        Instruction { opcode, operand }
    }

    /// The field or method reference, if the operand carries one.
    #[must_use]
    pub fn member(&self) -> Option<&MemberRef> {
        match &self.operand {
            Operand::Field(member) | Operand::Method(member) => Some(member),
            _ => None,
        }
    }

    /// The constant of an `ldc`.
    #[must_use]
    pub fn constant(&self) -> Option<&Constant> {
        match &self.operand {
            Operand::Constant(constant) => Some(constant),
            _ => None,
        }
    }

    /// All instruction indices control can transfer to, besides the next instruction.
    #[must_use]
    pub fn branch_targets(&self) -> Vec<usize> {
        match &self.operand {
            Operand::Jump(target) => vec![*target],
            Operand::TableSwitch {
                default, targets, ..
            } => std::iter::once(*default).chain(targets.iter().copied()).collect(),
            Operand::LookupSwitch { default, pairs } => std::iter::once(*default)
                .chain(pairs.iter().map(|(_, target)| *target))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Applies `map` to every branch target of this instruction.
    pub fn retarget(&mut self, mut map: impl FnMut(usize) -> usize) {
        match &mut self.operand {
            Operand::Jump(target) => *target = map(*target),
            Operand::TableSwitch {
                default, targets, ..
            } => {
                *default = map(*default);
                for target in targets {
                    *target = map(*target);
                }
            }
            Operand::LookupSwitch { default, pairs } => {
                *default = map(*default);
                for (_, target) in pairs {
                    *target = map(*target);
                }
            }
            _ => {}
        }
    }

    /// `true` if control can continue with the next instruction in sequence.
    #[must_use]
    pub fn falls_through(&self) -> bool {
        !self.opcode.ends_block()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Int(value) => write!(f, " {value}"),
            Operand::Constant(constant) => write!(f, " {constant}"),
            Operand::Local(index) => write!(f, " {index}"),
            Operand::Increment { local, delta } => write!(f, " {local} {delta}"),
            Operand::Jump(target) => write!(f, " @{target}"),
            Operand::TableSwitch {
                low,
                high,
                default,
                targets,
            } => write!(f, " {low}..{high} {targets:?} default @{default}"),
            Operand::LookupSwitch { default, pairs } => {
                write!(f, " {pairs:?} default @{default}")
            }
            Operand::Field(member) | Operand::Method(member) => write!(f, " {member}"),
            Operand::Dynamic { name, descriptor } => write!(f, " {name}{descriptor}"),
            Operand::Type(name) => write!(f, " {name}"),
            Operand::NewArray(kind) => write!(f, " {}", kind.descriptor()),
            Operand::MultiArray {
                descriptor,
                dimensions,
            } => write!(f, " {descriptor} {dimensions}"),
        }
    }
}
