//! Pure arithmetic, conversion and comparison semantics.
//!
//! These functions implement the JVM rules for wrapping integer arithmetic, masked shift
//! distances, IEEE float remainder, saturating float-to-integer conversion and the NaN
//! bias of `fcmpl`/`fcmpg`. They operate on the operand stack only.

use crate::{
    assembly::Opcode,
    emulation::{EmulationError, JavaValue, OperandStack},
    Result,
};

fn mnemonic(opcode: Opcode) -> &'static str {
    opcode.mnemonic()
}

/// Executes an `int` binary operation (`iadd` ... `ixor`).
pub(super) fn int_binary(opcode: Opcode, stack: &mut OperandStack) -> Result<()> {
    let name = mnemonic(opcode);
    let right = stack.pop_int(name)?;
    let left = stack.pop_int(name)?;
    let result = match opcode {
        Opcode::Iadd => left.wrapping_add(right),
        Opcode::Isub => left.wrapping_sub(right),
        Opcode::Imul => left.wrapping_mul(right),
        Opcode::Idiv => {
            if right == 0 {
                return Err(EmulationError::DivisionByZero.into());
            }
            left.wrapping_div(right)
        }
        Opcode::Irem => {
            if right == 0 {
                return Err(EmulationError::DivisionByZero.into());
            }
            left.wrapping_rem(right)
        }
        Opcode::Ishl => left.wrapping_shl((right & 0x1f) as u32),
        Opcode::Ishr => left.wrapping_shr((right & 0x1f) as u32),
        Opcode::Iushr => ((left as u32) >> (right & 0x1f)) as i32,
        Opcode::Iand => left & right,
        Opcode::Ior => left | right,
        Opcode::Ixor => left ^ right,
        other => return Err(EmulationError::UnsupportedOpcode { opcode: other }.into()),
    };
    stack.push(JavaValue::Int(result))
}

/// Executes a `long` binary operation (`ladd` ... `lxor`, including the shifts whose
/// distance operand is an `int`).
pub(super) fn long_binary(opcode: Opcode, stack: &mut OperandStack) -> Result<()> {
    let name = mnemonic(opcode);
    if matches!(opcode, Opcode::Lshl | Opcode::Lshr | Opcode::Lushr) {
        let distance = (stack.pop_int(name)? & 0x3f) as u32;
        let value = stack.pop_long(name)?;
        let result = match opcode {
            Opcode::Lshl => value.wrapping_shl(distance),
            Opcode::Lshr => value.wrapping_shr(distance),
            _ => ((value as u64) >> distance) as i64,
        };
        return stack.push(JavaValue::Long(result));
    }

    let right = stack.pop_long(name)?;
    let left = stack.pop_long(name)?;
    let result = match opcode {
        Opcode::Ladd => left.wrapping_add(right),
        Opcode::Lsub => left.wrapping_sub(right),
        Opcode::Lmul => left.wrapping_mul(right),
        Opcode::Ldiv => {
            if right == 0 {
                return Err(EmulationError::DivisionByZero.into());
            }
            left.wrapping_div(right)
        }
        Opcode::Lrem => {
            if right == 0 {
                return Err(EmulationError::DivisionByZero.into());
            }
            left.wrapping_rem(right)
        }
        Opcode::Land => left & right,
        Opcode::Lor => left | right,
        Opcode::Lxor => left ^ right,
        other => return Err(EmulationError::UnsupportedOpcode { opcode: other }.into()),
    };
    stack.push(JavaValue::Long(result))
}

/// Executes a `float` binary operation.
pub(super) fn float_binary(opcode: Opcode, stack: &mut OperandStack) -> Result<()> {
    let name = mnemonic(opcode);
    let right = stack.pop_float(name)?;
    let left = stack.pop_float(name)?;
    let result = match opcode {
        Opcode::Fadd => left + right,
        Opcode::Fsub => left - right,
        Opcode::Fmul => left * right,
        Opcode::Fdiv => left / right,
        Opcode::Frem => left % right,
        other => return Err(EmulationError::UnsupportedOpcode { opcode: other }.into()),
    };
    stack.push(JavaValue::Float(result))
}

/// Executes a `double` binary operation.
pub(super) fn double_binary(opcode: Opcode, stack: &mut OperandStack) -> Result<()> {
    let name = mnemonic(opcode);
    let right = stack.pop_double(name)?;
    let left = stack.pop_double(name)?;
    let result = match opcode {
        Opcode::Dadd => left + right,
        Opcode::Dsub => left - right,
        Opcode::Dmul => left * right,
        Opcode::Ddiv => left / right,
        Opcode::Drem => left % right,
        other => return Err(EmulationError::UnsupportedOpcode { opcode: other }.into()),
    };
    stack.push(JavaValue::Double(result))
}

/// Executes `ineg`, `lneg`, `fneg` or `dneg`.
pub(super) fn negate(opcode: Opcode, stack: &mut OperandStack) -> Result<()> {
    let name = mnemonic(opcode);
    let result = match opcode {
        Opcode::Ineg => JavaValue::Int(stack.pop_int(name)?.wrapping_neg()),
        Opcode::Lneg => JavaValue::Long(stack.pop_long(name)?.wrapping_neg()),
        Opcode::Fneg => JavaValue::Float(-stack.pop_float(name)?),
        Opcode::Dneg => JavaValue::Double(-stack.pop_double(name)?),
        other => return Err(EmulationError::UnsupportedOpcode { opcode: other }.into()),
    };
    stack.push(result)
}

/// Executes a primitive conversion (`i2l` ... `i2s`).
///
/// Float-to-integer conversions saturate and map NaN to zero, which is what Rust's `as`
/// casts do as well.
pub(super) fn convert(opcode: Opcode, stack: &mut OperandStack) -> Result<()> {
    let name = mnemonic(opcode);
    let result = match opcode {
        Opcode::I2l => JavaValue::Long(i64::from(stack.pop_int(name)?)),
        Opcode::I2f => JavaValue::Float(stack.pop_int(name)? as f32),
        Opcode::I2d => JavaValue::Double(f64::from(stack.pop_int(name)?)),
        Opcode::L2i => JavaValue::Int(stack.pop_long(name)? as i32),
        Opcode::L2f => JavaValue::Float(stack.pop_long(name)? as f32),
        Opcode::L2d => JavaValue::Double(stack.pop_long(name)? as f64),
        Opcode::F2i => JavaValue::Int(stack.pop_float(name)? as i32),
        Opcode::F2l => JavaValue::Long(stack.pop_float(name)? as i64),
        Opcode::F2d => JavaValue::Double(f64::from(stack.pop_float(name)?)),
        Opcode::D2i => JavaValue::Int(stack.pop_double(name)? as i32),
        Opcode::D2l => JavaValue::Long(stack.pop_double(name)? as i64),
        Opcode::D2f => JavaValue::Float(stack.pop_double(name)? as f32),
        Opcode::I2b => JavaValue::Int(i32::from(stack.pop_int(name)? as i8)),
        Opcode::I2c => JavaValue::Int(i32::from(stack.pop_int(name)? as u16)),
        Opcode::I2s => JavaValue::Int(i32::from(stack.pop_int(name)? as i16)),
        other => return Err(EmulationError::UnsupportedOpcode { opcode: other }.into()),
    };
    stack.push(result)
}

/// Executes `lcmp`, `fcmpl`, `fcmpg`, `dcmpl` or `dcmpg`.
pub(super) fn compare(opcode: Opcode, stack: &mut OperandStack) -> Result<()> {
    let name = mnemonic(opcode);
    let ordering = match opcode {
        Opcode::Lcmp => {
            let right = stack.pop_long(name)?;
            let left = stack.pop_long(name)?;
            Some(left.cmp(&right))
        }
        Opcode::Fcmpl | Opcode::Fcmpg => {
            let right = stack.pop_float(name)?;
            let left = stack.pop_float(name)?;
            left.partial_cmp(&right)
        }
        Opcode::Dcmpl | Opcode::Dcmpg => {
            let right = stack.pop_double(name)?;
            let left = stack.pop_double(name)?;
            left.partial_cmp(&right)
        }
        other => return Err(EmulationError::UnsupportedOpcode { opcode: other }.into()),
    };
    let result = match ordering {
        Some(std::cmp::Ordering::Less) => -1,
        Some(std::cmp::Ordering::Equal) => 0,
        Some(std::cmp::Ordering::Greater) => 1,
        // NaN: the `l` variants push -1, the `g` variants push 1
        None if matches!(opcode, Opcode::Fcmpl | Opcode::Dcmpl) => -1,
        None => 1,
    };
    stack.push(JavaValue::Int(result))
}

/// Evaluates the condition of an `int` branch (`ifeq` ... `if_icmple`).
pub(super) fn int_condition(opcode: Opcode, stack: &mut OperandStack) -> Result<bool> {
    let name = mnemonic(opcode);
    let (left, right) = match opcode {
        Opcode::Ifeq | Opcode::Ifne | Opcode::Iflt | Opcode::Ifge | Opcode::Ifgt | Opcode::Ifle => {
            (stack.pop_int(name)?, 0)
        }
        _ => {
            let right = stack.pop_int(name)?;
            (stack.pop_int(name)?, right)
        }
    };
    Ok(match opcode {
        Opcode::Ifeq | Opcode::IfIcmpeq => left == right,
        Opcode::Ifne | Opcode::IfIcmpne => left != right,
        Opcode::Iflt | Opcode::IfIcmplt => left < right,
        Opcode::Ifge | Opcode::IfIcmpge => left >= right,
        Opcode::Ifgt | Opcode::IfIcmpgt => left > right,
        Opcode::Ifle | Opcode::IfIcmple => left <= right,
        other => return Err(EmulationError::UnsupportedOpcode { opcode: other }.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulation::FaultKind;

    fn run(values: &[JavaValue], op: impl Fn(&mut OperandStack) -> Result<()>) -> Result<JavaValue> {
        let mut stack = OperandStack::new(8);
        for value in values {
            stack.push(*value)?;
        }
        op(&mut stack)?;
        stack.pop()
    }

    #[test]
    fn test_int_wrapping() {
        let result = run(&[JavaValue::Int(i32::MAX), JavaValue::Int(1)], |s| {
            int_binary(Opcode::Iadd, s)
        });
        assert_eq!(result.unwrap(), JavaValue::Int(i32::MIN));

        let result = run(&[JavaValue::Int(i32::MIN), JavaValue::Int(-1)], |s| {
            int_binary(Opcode::Idiv, s)
        });
        assert_eq!(result.unwrap(), JavaValue::Int(i32::MIN));

        let result = run(&[JavaValue::Int(-7), JavaValue::Int(2)], |s| int_binary(Opcode::Irem, s));
        assert_eq!(result.unwrap(), JavaValue::Int(-1));
    }

    #[test]
    fn test_division_by_zero() {
        let error = run(&[JavaValue::Int(1), JavaValue::Int(0)], |s| int_binary(Opcode::Idiv, s))
            .unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Runtime));
        let error = run(&[JavaValue::Long(1), JavaValue::Long(0)], |s| {
            long_binary(Opcode::Lrem, s)
        })
        .unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Runtime));
    }

    #[test]
    fn test_shifts_mask_distance() {
        let result = run(&[JavaValue::Int(1), JavaValue::Int(33)], |s| int_binary(Opcode::Ishl, s));
        assert_eq!(result.unwrap(), JavaValue::Int(2));

        let result = run(&[JavaValue::Int(-8), JavaValue::Int(1)], |s| int_binary(Opcode::Iushr, s));
        assert_eq!(result.unwrap(), JavaValue::Int(0x7fff_fffc));

        let result = run(&[JavaValue::Long(-1), JavaValue::Int(60)], |s| {
            long_binary(Opcode::Lushr, s)
        });
        assert_eq!(result.unwrap(), JavaValue::Long(0xf));
    }

    #[test]
    fn test_conversions() {
        let result = run(&[JavaValue::Int(0x1234_5680)], |s| convert(Opcode::I2b, s));
        assert_eq!(result.unwrap(), JavaValue::Int(-128));
        let result = run(&[JavaValue::Int(-1)], |s| convert(Opcode::I2c, s));
        assert_eq!(result.unwrap(), JavaValue::Int(0xffff));
        let result = run(&[JavaValue::Float(f32::NAN)], |s| convert(Opcode::F2i, s));
        assert_eq!(result.unwrap(), JavaValue::Int(0));
        let result = run(&[JavaValue::Double(1e20)], |s| convert(Opcode::D2i, s));
        assert_eq!(result.unwrap(), JavaValue::Int(i32::MAX));
    }

    #[test]
    fn test_nan_bias() {
        let values = [JavaValue::Float(f32::NAN), JavaValue::Float(1.0)];
        assert_eq!(run(&values, |s| compare(Opcode::Fcmpl, s)).unwrap(), JavaValue::Int(-1));
        assert_eq!(run(&values, |s| compare(Opcode::Fcmpg, s)).unwrap(), JavaValue::Int(1));
        let values = [JavaValue::Long(2), JavaValue::Long(5)];
        assert_eq!(run(&values, |s| compare(Opcode::Lcmp, s)).unwrap(), JavaValue::Int(-1));
    }

    #[test]
    fn test_conditions() {
        let mut stack = OperandStack::new(4);
        stack.push(JavaValue::Int(3)).unwrap();
        stack.push(JavaValue::Int(5)).unwrap();
        assert!(int_condition(Opcode::IfIcmplt, &mut stack).unwrap());
        stack.push(JavaValue::Int(0)).unwrap();
        assert!(int_condition(Opcode::Ifeq, &mut stack).unwrap());
        assert!(stack.is_empty());
    }
}
