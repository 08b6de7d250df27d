//! Tree-walking evaluator
//!
//! Values are plain `serde_json::Value`s so a seeded JSON object can be
//! mutated in place and handed back without conversion. Operators follow
//! the host language's coercion rules closely enough for the two dialects
//! in use: `+` concatenates when either side is a string, bitwise operators
//! work on 32-bit integers, and reading a missing property yields `null`.

use std::collections::HashMap;

use serde_json::{Map, Number, Value};

use super::parser::{BinOp, Expr, Program, Stmt, Target, UnaryOp};
use crate::error::{PhubError, Result};

fn runtime(msg: impl Into<String>) -> PhubError {
    PhubError::Parsing(format!("script evaluation: {}", msg.into()))
}

/// Variable bindings a program runs against
#[derive(Debug, Default, Clone)]
pub struct Env {
    vars: HashMap<String, Value>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style binding
    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Removes a binding and returns its value
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.vars.remove(name)
    }

    /// Numeric value of a binding
    pub fn number(&self, name: &str) -> Option<f64> {
        self.vars.get(name).map(to_number)
    }

    /// Runs every statement of `program` in order
    pub fn run(&mut self, program: &Program) -> Result<()> {
        for stmt in &program.body {
            self.exec(stmt)?;
        }
        Ok(())
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Empty => Ok(()),
            // A lone name is a leftover declaration (`var n;` with `var` stripped).
            Stmt::Expr(Expr::Ident(_)) => Ok(()),
            Stmt::Expr(expr) => self.eval(expr).map(|_| ()),
            Stmt::Block(body) => body.iter().try_for_each(|s| self.exec(s)),
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                if truthy(&self.eval(cond)?) {
                    self.exec(then)
                } else if let Some(otherwise) = otherwise {
                    self.exec(otherwise)
                } else {
                    Ok(())
                }
            }
            Stmt::Assign { target, op, value } => {
                let rhs = self.eval(value)?;
                let value = match op {
                    Some(op) => binary(*op, self.read(target)?, rhs),
                    None => rhs,
                };
                self.write(target, value)
            }
        }
    }

    fn eval(&self, expr: &Expr) -> Result<Value> {
        Ok(match expr {
            Expr::Number(n) => number(*n),
            Expr::Str(s) => Value::String(s.clone()),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Null => Value::Null,
            Expr::Ident(name) => self
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| runtime(format!("`{}` is not defined", name)))?,
            Expr::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<_>>()?,
            ),
            Expr::Object(fields) => {
                let mut map = Map::new();
                for (key, value) in fields {
                    map.insert(key.clone(), self.eval(value)?);
                }
                Value::Object(map)
            }
            Expr::Member(object, key) => {
                let object = self.eval(object)?;
                let key = self.eval(key)?;
                member(&object, &key)?
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Neg => number(-to_number(&value)),
                    UnaryOp::Plus => number(to_number(&value)),
                    UnaryOp::Not => Value::Bool(!truthy(&value)),
                }
            }
            Expr::Binary(op, left, right) => binary(*op, self.eval(left)?, self.eval(right)?),
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if truthy(&left) { self.eval(right)? } else { left }
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if truthy(&left) { left } else { self.eval(right)? }
            }
            Expr::Ternary(cond, then, otherwise) => {
                if truthy(&self.eval(cond)?) {
                    self.eval(then)?
                } else {
                    self.eval(otherwise)?
                }
            }
        })
    }

    /// Current value at `target`, `null` for a missing final property
    fn read(&self, target: &Target) -> Result<Value> {
        let mut value = self
            .vars
            .get(&target.root)
            .cloned()
            .ok_or_else(|| runtime(format!("`{}` is not defined", target.root)))?;
        for key in &target.path {
            let key = self.eval(key)?;
            value = member(&value, &key)?;
        }
        Ok(value)
    }

    fn write(&mut self, target: &Target, value: Value) -> Result<()> {
        let Some((last, parents)) = target.path.split_last() else {
            self.set(&target.root, value);
            return Ok(());
        };

        let keys = parents
            .iter()
            .map(|key| self.eval(key))
            .collect::<Result<Vec<_>>>()?;
        let last = self.eval(last)?;

        let mut slot = self
            .vars
            .get_mut(&target.root)
            .ok_or_else(|| runtime(format!("`{}` is not defined", target.root)))?;
        for key in &keys {
            slot = child_mut(slot, key)?;
        }

        match slot {
            Value::Object(map) => {
                map.insert(property_name(&last), value);
                Ok(())
            }
            Value::Array(items) => {
                let index = array_index(&last)
                    .ok_or_else(|| runtime(format!("bad array index {}", last)))?;
                // Arrays only grow by appending
                match index.cmp(&items.len()) {
                    std::cmp::Ordering::Less => items[index] = value,
                    std::cmp::Ordering::Equal => items.push(value),
                    std::cmp::Ordering::Greater => {
                        return Err(runtime(format!(
                            "array index {} is past the end ({})",
                            last,
                            items.len()
                        )));
                    }
                }
                Ok(())
            }
            other => Err(runtime(format!("cannot set property on {}", other))),
        }
    }
}

fn child_mut<'v>(value: &'v mut Value, key: &Value) -> Result<&'v mut Value> {
    match value {
        Value::Object(map) => map
            .get_mut(&property_name(key))
            .ok_or_else(|| runtime(format!("property {} is undefined", key))),
        Value::Array(items) => array_index(key)
            .and_then(|i| items.get_mut(i))
            .ok_or_else(|| runtime(format!("index {} is out of range", key))),
        other => Err(runtime(format!("cannot read property of {}", other))),
    }
}

fn member(object: &Value, key: &Value) -> Result<Value> {
    let name = property_name(key);
    Ok(match object {
        Value::Object(map) => map.get(&name).cloned().unwrap_or(Value::Null),
        Value::Array(items) if name == "length" => Value::from(items.len()),
        Value::Array(items) => array_index(key)
            .and_then(|i| items.get(i).cloned())
            .unwrap_or(Value::Null),
        Value::String(s) if name == "length" => Value::from(s.chars().count()),
        Value::String(s) => array_index(key)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Null),
        Value::Null => return Err(runtime(format!("cannot read property `{}` of null", name))),
        _ => Value::Null,
    })
}

fn property_name(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => to_js_string(other),
    }
}

fn array_index(key: &Value) -> Option<usize> {
    let n = to_number(key);
    (n.is_finite() && n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
}

fn binary(op: BinOp, left: Value, right: Value) -> Value {
    match op {
        BinOp::Add => {
            if is_stringish(&left) || is_stringish(&right) {
                Value::String(to_js_string(&left) + &to_js_string(&right))
            } else {
                number(to_number(&left) + to_number(&right))
            }
        }
        BinOp::Sub => number(to_number(&left) - to_number(&right)),
        BinOp::Mul => number(to_number(&left) * to_number(&right)),
        BinOp::Div => number(to_number(&left) / to_number(&right)),
        BinOp::Rem => number(to_number(&left) % to_number(&right)),
        BinOp::BitAnd => number(f64::from(to_int32(&left) & to_int32(&right))),
        BinOp::BitOr => number(f64::from(to_int32(&left) | to_int32(&right))),
        BinOp::BitXor => number(f64::from(to_int32(&left) ^ to_int32(&right))),
        BinOp::Shl => number(f64::from(to_int32(&left).wrapping_shl(shift(&right)))),
        BinOp::Shr => number(f64::from(to_int32(&left) >> shift(&right))),
        BinOp::UShr => number(f64::from((to_int32(&left) as u32) >> shift(&right))),
        BinOp::Eq => Value::Bool(loose_eq(&left, &right)),
        BinOp::NotEq => Value::Bool(!loose_eq(&left, &right)),
        BinOp::StrictEq => Value::Bool(strict_eq(&left, &right)),
        BinOp::StrictNotEq => Value::Bool(!strict_eq(&left, &right)),
        BinOp::Lt => compare(&left, &right, |o| o.is_lt()),
        BinOp::Gt => compare(&left, &right, |o| o.is_gt()),
        BinOp::Le => compare(&left, &right, |o| o.is_le()),
        BinOp::Ge => compare(&left, &right, |o| o.is_ge()),
    }
}

fn compare(left: &Value, right: &Value, test: fn(std::cmp::Ordering) -> bool) -> Value {
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => to_number(left).partial_cmp(&to_number(right)),
    };
    Value::Bool(ordering.is_some_and(test))
}

fn strict_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => to_number(left) == to_number(right),
        _ => left == right,
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(_) | Value::String(_) | Value::Bool(_), Value::Number(_) | Value::String(_) | Value::Bool(_)) => {
            to_number(left) == to_number(right)
        }
        _ => left == right,
    }
}

fn is_stringish(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Array(_) | Value::Object(_))
}

fn shift(value: &Value) -> u32 {
    (to_int32(value) as u32) & 31
}

/// Wraps a float into a JSON number, keeping whole values integral
pub fn number(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Two's-complement 32-bit view of a number
pub fn to_int32(value: &Value) -> i32 {
    let n = to_number(value);
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32 as i32
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(_) => {
            let n = to_number(value);
            n != 0.0 && !n.is_nan()
        }
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn to_js_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => {
                let f = n.as_f64().unwrap_or(f64::NAN);
                if f.fract() == 0.0 && f.abs() < 1e21 {
                    format!("{:.0}", f)
                } else {
                    f.to_string()
                }
            }
        },
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}
