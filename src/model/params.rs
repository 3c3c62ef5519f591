//! Training keyword arguments
//!
//! Experiments forward a `TrainParams` map to every `Model::fit` call.
//! The parameter sweep builds one map per point of the cartesian product.

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A single training hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl FromStr for ParamValue {
    type Err = Infallible;

    /// Integers, then floats, then booleans; anything else is text
    fn from_str(s: &str) -> std::result::Result<Self, Infallible> {
        let s = s.trim();
        if let Ok(i) = s.parse::<i64>() {
            return Ok(ParamValue::Int(i));
        }
        if let Ok(x) = s.parse::<f64>() {
            return Ok(ParamValue::Float(x));
        }
        if let Ok(b) = s.parse::<bool>() {
            return Ok(ParamValue::Bool(b));
        }
        Ok(ParamValue::Text(s.to_string()))
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

/// Keyword arguments passed to `Model::fit`, ordered by name
pub type TrainParams = BTreeMap<String, ParamValue>;

/// Read a non-negative integer parameter, falling back to `default`
pub fn param_usize(params: &TrainParams, key: &str, default: usize) -> Result<usize> {
    match params.get(key) {
        None => Ok(default),
        Some(ParamValue::Int(v)) if *v >= 0 => Ok(*v as usize),
        Some(other) => Err(BenchError::Model(format!(
            "parameter '{}' must be a non-negative integer, got {}",
            key, other
        ))),
    }
}

/// Read a float parameter; integers are widened
pub fn param_f64(params: &TrainParams, key: &str, default: f64) -> Result<f64> {
    match params.get(key) {
        None => Ok(default),
        Some(ParamValue::Float(v)) => Ok(*v),
        Some(ParamValue::Int(v)) => Ok(*v as f64),
        Some(other) => Err(BenchError::Model(format!(
            "parameter '{}' must be numeric, got {}",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_defaults() {
        let params = TrainParams::new();
        assert_eq!(param_usize(&params, "epochs", 7).unwrap(), 7);
        assert_eq!(param_f64(&params, "lr", 0.5).unwrap(), 0.5);
    }

    #[test]
    fn test_param_int_widens_to_float() {
        let mut params = TrainParams::new();
        params.insert("lr".to_string(), ParamValue::Int(1));
        assert_eq!(param_f64(&params, "lr", 0.1).unwrap(), 1.0);
    }

    #[test]
    fn test_param_type_mismatch() {
        let mut params = TrainParams::new();
        params.insert("epochs".to_string(), ParamValue::Float(2.5));
        assert!(param_usize(&params, "epochs", 10).is_err());

        params.insert("epochs".to_string(), ParamValue::Int(-1));
        assert!(param_usize(&params, "epochs", 10).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ParamValue::Int(3).to_string(), "3");
        assert_eq!(ParamValue::Text("adam".into()).to_string(), "'adam'");
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!("20".parse::<ParamValue>().unwrap(), ParamValue::Int(20));
        assert_eq!("0.5".parse::<ParamValue>().unwrap(), ParamValue::Float(0.5));
        assert_eq!("false".parse::<ParamValue>().unwrap(), ParamValue::Bool(false));
        assert_eq!(
            " adam ".parse::<ParamValue>().unwrap(),
            ParamValue::Text("adam".to_string())
        );
    }

    #[test]
    fn test_untagged_toml_parse() {
        #[derive(Deserialize)]
        struct Wrapper {
            params: TrainParams,
        }
        let w: Wrapper = toml::from_str("[params]\nepochs = 20\nlr = 0.05\nshuffle = true\n").unwrap();
        assert_eq!(w.params["epochs"], ParamValue::Int(20));
        assert_eq!(w.params["lr"], ParamValue::Float(0.05));
        assert_eq!(w.params["shuffle"], ParamValue::Bool(true));
    }
}
