//! The arithmetic methods that the server exposes.
//!
//! This is the business logic that clock propagation wraps. It never looks at clocks.

use crate::RpcError;
use serde_json::{Number, Value};
use std::{fmt, str::FromStr};

/// The callable methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    /// `x + y`
    Add,
    /// `x * y`
    Multiply,
}

impl Method {
    /// The name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Add => "add",
            Method::Multiply => "multiply",
        }
    }

    fn apply(self, x: f64, y: f64) -> f64 {
        match self {
            Method::Add => x + y,
            Method::Multiply => x * y,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" | "ADD" => Ok(Method::Add),
            "multiply" | "MULTIPLY" => Ok(Method::Multiply),
            _ => Err(RpcError::UnknownMethod),
        }
    }
}

/// Validates both operands and applies `method` to them.
///
/// Operands may be JSON numbers or strings that parse as floats. Integral results are
/// returned as JSON integers, so `add(2, 3)` yields `5` rather than `5.0`.
pub fn evaluate(method: Method, x: Option<&Value>, y: Option<&Value>) -> Result<Number, RpcError> {
    let (x, y) = match (x, y) {
        (Some(x), Some(y)) => (operand(x)?, operand(y)?),
        _ => return Err(RpcError::MissingOperands),
    };
    to_number(method.apply(x, y))
}

fn operand(value: &Value) -> Result<f64, RpcError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or(RpcError::NonNumericOperands),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| RpcError::NonNumericOperands),
        _ => Err(RpcError::NonNumericOperands),
    }
}

fn to_number(value: f64) -> Result<Number, RpcError> {
    // i64::MAX is not exactly representable, hence the strict upper bound
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        return Ok(Number::from(value as i64));
    }
    Number::from_f64(value).ok_or(RpcError::NonFiniteResult)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(method: Method, x: Value, y: Value) -> Result<Value, RpcError> {
        evaluate(method, Some(&x), Some(&y)).map(Value::Number)
    }

    #[test]
    fn integral_results_are_integers() {
        assert_eq!(eval(Method::Add, json!(2), json!(3)), Ok(json!(5)));
        assert_eq!(eval(Method::Multiply, json!(4), json!(5)), Ok(json!(20)));
        assert_eq!(eval(Method::Add, json!(0.5), json!(1.5)), Ok(json!(2)));
    }

    #[test]
    fn fractional_results_stay_floats() {
        assert_eq!(eval(Method::Add, json!(0.25), json!(1)), Ok(json!(1.25)));
        assert_eq!(eval(Method::Multiply, json!(-1.5), json!(3)), Ok(json!(-4.5)));
    }

    #[test]
    fn numeric_strings_are_accepted() {
        assert_eq!(eval(Method::Add, json!("2"), json!(" 3.5 ")), Ok(json!(5.5)));
    }

    #[test]
    fn invalid_operands() {
        assert_eq!(
            evaluate(Method::Add, Some(&json!(1)), None),
            Err(RpcError::MissingOperands)
        );
        assert_eq!(
            eval(Method::Add, json!("two"), json!(3)),
            Err(RpcError::NonNumericOperands)
        );
        assert_eq!(
            eval(Method::Multiply, json!([1]), json!(3)),
            Err(RpcError::NonNumericOperands)
        );
        assert_eq!(
            eval(Method::Multiply, json!(1e308), json!(10)),
            Err(RpcError::NonFiniteResult)
        );
    }

    #[test]
    fn method_names() {
        assert_eq!("add".parse::<Method>(), Ok(Method::Add));
        assert_eq!("MULTIPLY".parse::<Method>(), Ok(Method::Multiply));
        assert_eq!("divide".parse::<Method>(), Err(RpcError::UnknownMethod));
        assert_eq!(Method::Multiply.to_string(), "multiply");
    }
}
