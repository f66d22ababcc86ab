//! Runtime values for the Rill virtual machine
//!
//! The operand stack and memory hold integers, floats, and strings.
//! Booleans are represented as the integers 1 and 0; comparison results
//! follow the same convention. Mixed int/float arithmetic promotes to
//! float.

use crate::error::VmError;
use std::fmt;

/// A value on the stack or in memory
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Falsy values are zero and the empty string.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::Str(s) => !s.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
        }
    }

    fn is_zero(&self) -> bool {
        matches!(self, Value::Int(0)) || matches!(self, Value::Float(v) if *v == 0.0)
    }

    /// Addition; string + string concatenates.
    pub fn add(&self, other: &Value) -> Result<Value, VmError> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
            (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 + b)),
            (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a + *b as f64)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
            _ => Err(VmError::TypeError(format!(
                "cannot add {} and {}",
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    pub fn sub(&self, other: &Value) -> Result<Value, VmError> {
        self.numeric_op(other, "subtract", |a, b| a.wrapping_sub(b), |a, b| a - b)
    }

    pub fn mul(&self, other: &Value) -> Result<Value, VmError> {
        self.numeric_op(other, "multiply", |a, b| a.wrapping_mul(b), |a, b| a * b)
    }

    /// Division; int / int truncates toward zero.
    pub fn div(&self, other: &Value) -> Result<Value, VmError> {
        if other.is_zero() {
            return Err(VmError::DivisionByZero);
        }
        self.numeric_op(other, "divide", |a, b| a.wrapping_div(b), |a, b| a / b)
    }

    fn numeric_op(
        &self,
        other: &Value,
        verb: &str,
        int_op: impl Fn(i64, i64) -> i64,
        float_op: impl Fn(f64, f64) -> f64,
    ) -> Result<Value, VmError> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(int_op(*a, *b))),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float_op(*a, *b))),
            (Value::Int(a), Value::Float(b)) => Ok(Value::Float(float_op(*a as f64, *b))),
            (Value::Float(a), Value::Int(b)) => Ok(Value::Float(float_op(*a, *b as f64))),
            _ => Err(VmError::TypeError(format!(
                "cannot {} {} and {}",
                verb,
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    /// Equality across representations: ints and floats compare
    /// numerically; values of unrelated kinds are simply unequal.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => false,
        }
    }

    /// Relational comparison; numeric operands only.
    pub fn compare(&self, other: &Value, opcode: &'static str) -> Result<std::cmp::Ordering, VmError> {
        let (a, b) = match (self, other) {
            (Value::Int(a), Value::Int(b)) => {
                return Ok(a.cmp(b));
            }
            (Value::Float(a), Value::Float(b)) => (*a, *b),
            (Value::Int(a), Value::Float(b)) => (*a as f64, *b),
            (Value::Float(a), Value::Int(b)) => (*a, *b as f64),
            _ => {
                return Err(VmError::TypeError(format!(
                    "{} requires numeric operands, got {} and {}",
                    opcode,
                    self.type_name(),
                    other.type_name()
                )));
            }
        };
        a.partial_cmp(&b).ok_or_else(|| {
            VmError::TypeError(format!("{} on unordered float operands", opcode))
        })
    }

    /// Coerce to int: floats truncate, strings parse.
    pub fn cast_int(&self) -> Result<Value, VmError> {
        match self {
            Value::Int(v) => Ok(Value::Int(*v)),
            Value::Float(v) => Ok(Value::Int(*v as i64)),
            Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                VmError::TypeError(format!("cannot cast '{}' to int", s))
            }),
        }
    }

    /// Coerce to float: ints widen, strings parse.
    pub fn cast_float(&self) -> Result<Value, VmError> {
        match self {
            Value::Int(v) => Ok(Value::Float(*v as f64)),
            Value::Float(v) => Ok(Value::Float(*v)),
            Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                VmError::TypeError(format!("cannot cast '{}' to float", s))
            }),
        }
    }

    /// Coerce to bool: truthiness as 1 or 0.
    pub fn cast_bool(&self) -> Value {
        Value::Int(if self.is_truthy() { 1 } else { 0 })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => {
                if v.is_finite() && v.fract() == 0.0 {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_arithmetic() {
        assert_eq!(Value::Int(5).add(&Value::Int(2)).unwrap(), Value::Int(7));
        assert_eq!(Value::Int(10).sub(&Value::Int(3)).unwrap(), Value::Int(7));
        assert_eq!(Value::Int(3).mul(&Value::Int(4)).unwrap(), Value::Int(12));
    }

    #[test]
    fn test_int_division_truncates() {
        assert_eq!(Value::Int(7).div(&Value::Int(2)).unwrap(), Value::Int(3));
        assert_eq!(Value::Int(-7).div(&Value::Int(2)).unwrap(), Value::Int(-3));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            Value::Int(1).div(&Value::Int(0)),
            Err(VmError::DivisionByZero)
        );
        assert_eq!(
            Value::Float(1.0).div(&Value::Float(0.0)),
            Err(VmError::DivisionByZero)
        );
    }

    #[test]
    fn test_mixed_numeric_promotes_to_float() {
        assert_eq!(
            Value::Int(1).add(&Value::Float(0.5)).unwrap(),
            Value::Float(1.5)
        );
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(
            Value::Str("ho".into()).add(&Value::Str("la".into())).unwrap(),
            Value::Str("hola".into())
        );
    }

    #[test]
    fn test_string_plus_number_is_type_error() {
        assert!(matches!(
            Value::Str("a".into()).add(&Value::Int(1)),
            Err(VmError::TypeError(_))
        ));
    }

    #[test]
    fn test_loose_equality() {
        assert!(Value::Int(2).loose_eq(&Value::Float(2.0)));
        assert!(Value::Str("x".into()).loose_eq(&Value::Str("x".into())));
        assert!(!Value::Str("2".into()).loose_eq(&Value::Int(2)));
    }

    #[test]
    fn test_relational_comparison() {
        use std::cmp::Ordering;
        assert_eq!(
            Value::Int(1).compare(&Value::Float(2.0), "LT").unwrap(),
            Ordering::Less
        );
        assert!(Value::Str("a".into()).compare(&Value::Int(1), "LT").is_err());
    }

    #[test]
    fn test_casts() {
        assert_eq!(Value::Str("5".into()).cast_int().unwrap(), Value::Int(5));
        assert_eq!(Value::Float(3.9).cast_int().unwrap(), Value::Int(3));
        assert_eq!(Value::Int(2).cast_float().unwrap(), Value::Float(2.0));
        assert_eq!(Value::Int(7).cast_bool(), Value::Int(1));
        assert_eq!(Value::Str("".into()).cast_bool(), Value::Int(0));
        assert!(Value::Str("abc".into()).cast_int().is_err());
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Int(1).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::Str("".into()).is_truthy());
        assert!(Value::Str("x".into()).is_truthy());
    }

    #[test]
    fn test_display_keeps_float_point() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(2.75).to_string(), "2.75");
        assert_eq!(Value::Int(7).to_string(), "7");
    }
}
