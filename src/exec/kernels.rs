// src/exec/kernels.rs

//! Integer kernels for every [`OpKind`].
//!
//! Kernels see the node's data inputs in declaration order and return one
//! entry per output slot. Transfer ops (enter, exit, next_iteration) forward
//! their input unchanged, deadness included.

use crate::errors::{LoopflowError, Result};
use crate::graph::NodeItem;
use crate::propagator::Entry;
use crate::types::{OpKind, Value};

pub fn compute(item: &NodeItem, inputs: &[Entry<Value>]) -> Result<Vec<Entry<Value>>> {
    let outputs = match item.op {
        OpKind::Const => {
            let value = item.value.ok_or_else(|| kernel_error(item, "const node has no value"))?;
            vec![Entry::Value(value)]
        }
        OpKind::Enter | OpKind::Exit | OpKind::NextIteration => {
            vec![inputs.first().cloned().unwrap_or_default()]
        }
        OpKind::Identity | OpKind::LoopCond => vec![Entry::Value(live(item, inputs, 0)?)],
        OpKind::Add => {
            let (a, b) = binary(item, inputs)?;
            let sum = a
                .checked_add(b)
                .ok_or_else(|| kernel_error(item, "integer overflow"))?;
            vec![Entry::Value(sum)]
        }
        OpKind::Sub => {
            let (a, b) = binary(item, inputs)?;
            let diff = a
                .checked_sub(b)
                .ok_or_else(|| kernel_error(item, "integer overflow"))?;
            vec![Entry::Value(diff)]
        }
        OpKind::Mul => {
            let (a, b) = binary(item, inputs)?;
            let product = a
                .checked_mul(b)
                .ok_or_else(|| kernel_error(item, "integer overflow"))?;
            vec![Entry::Value(product)]
        }
        OpKind::Less => compare(item, inputs, |a, b| a < b)?,
        OpKind::Greater => compare(item, inputs, |a, b| a > b)?,
        OpKind::Equal => compare(item, inputs, |a, b| a == b)?,
        OpKind::Switch => {
            let data = live(item, inputs, 0)?;
            let pred = live(item, inputs, 1)?;
            if pred != 0 {
                vec![Entry::NoValue, Entry::Value(data)]
            } else {
                vec![Entry::Value(data), Entry::NoValue]
            }
        }
        OpKind::Merge => {
            let (index, value) = inputs
                .iter()
                .enumerate()
                .find_map(|(i, e)| e.value().map(|v| (i, *v)))
                .ok_or_else(|| kernel_error(item, "merge ran without a live input"))?;
            vec![Entry::Value(value), Entry::Value(index as Value)]
        }
        OpKind::ControlTrigger | OpKind::NoOp => Vec::new(),
    };
    Ok(outputs)
}

fn live(item: &NodeItem, inputs: &[Entry<Value>], slot: usize) -> Result<Value> {
    inputs
        .get(slot)
        .and_then(|e| e.value().copied())
        .ok_or_else(|| kernel_error(item, &format!("input {slot} has no live value")))
}

fn binary(item: &NodeItem, inputs: &[Entry<Value>]) -> Result<(Value, Value)> {
    Ok((live(item, inputs, 0)?, live(item, inputs, 1)?))
}

fn compare(
    item: &NodeItem,
    inputs: &[Entry<Value>],
    op: impl Fn(Value, Value) -> bool,
) -> Result<Vec<Entry<Value>>> {
    let (a, b) = binary(item, inputs)?;
    Ok(vec![Entry::Value(Value::from(op(a, b)))])
}

fn kernel_error(item: &NodeItem, message: &str) -> LoopflowError {
    LoopflowError::KernelError {
        node: item.name.clone(),
        message: message.to_string(),
    }
}
