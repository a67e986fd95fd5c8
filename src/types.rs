use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Value type carried along edges by the bundled kernels.
pub type Value = i64;

/// Operation performed by a node.
///
/// The propagator only cares about the control-flow kinds (`Merge`, `Enter`,
/// `Exit`, `NextIteration`, `ControlTrigger`); everything else is an ordinary
/// node whose computation is delegated to [`crate::exec::kernels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Const,
    Identity,
    Add,
    Sub,
    Mul,
    Less,
    Greater,
    Equal,
    LoopCond,
    /// Forwards input 0 to output 1 if the predicate (input 1) is non-zero,
    /// otherwise to output 0. The other output is dead.
    Switch,
    /// Forwards the first live data input on output 0 and its index on
    /// output 1.
    Merge,
    Enter,
    Exit,
    NextIteration,
    /// Runs once all inputs arrived, regardless of their deadness.
    ControlTrigger,
    NoOp,
}

impl OpKind {
    /// Number of outputs the op produces.
    pub fn num_outputs(self) -> usize {
        match self {
            OpKind::Switch | OpKind::Merge => 2,
            OpKind::ControlTrigger | OpKind::NoOp => 0,
            _ => 1,
        }
    }

    /// Accepted number of data inputs as an inclusive range.
    pub fn data_arity(self) -> (usize, Option<usize>) {
        match self {
            OpKind::Const | OpKind::ControlTrigger | OpKind::NoOp => (0, Some(0)),
            OpKind::Identity
            | OpKind::LoopCond
            | OpKind::Enter
            | OpKind::Exit
            | OpKind::NextIteration => (1, Some(1)),
            OpKind::Add
            | OpKind::Sub
            | OpKind::Mul
            | OpKind::Less
            | OpKind::Greater
            | OpKind::Equal
            | OpKind::Switch => (2, Some(2)),
            OpKind::Merge => (1, None),
        }
    }

    /// Enter, Exit and NextIteration still run when dead so that deadness
    /// crosses frame and iteration boundaries.
    pub fn is_transfer(self) -> bool {
        matches!(self, OpKind::Enter | OpKind::Exit | OpKind::NextIteration)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Const => "const",
            OpKind::Identity => "identity",
            OpKind::Add => "add",
            OpKind::Sub => "sub",
            OpKind::Mul => "mul",
            OpKind::Less => "less",
            OpKind::Greater => "greater",
            OpKind::Equal => "equal",
            OpKind::LoopCond => "loop_cond",
            OpKind::Switch => "switch",
            OpKind::Merge => "merge",
            OpKind::Enter => "enter",
            OpKind::Exit => "exit",
            OpKind::NextIteration => "next_iteration",
            OpKind::ControlTrigger => "control_trigger",
            OpKind::NoOp => "no_op",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_lowercase().as_str() {
            "const" => OpKind::Const,
            "identity" => OpKind::Identity,
            "add" => OpKind::Add,
            "sub" => OpKind::Sub,
            "mul" => OpKind::Mul,
            "less" => OpKind::Less,
            "greater" => OpKind::Greater,
            "equal" => OpKind::Equal,
            "loop_cond" => OpKind::LoopCond,
            "switch" => OpKind::Switch,
            "merge" => OpKind::Merge,
            "enter" => OpKind::Enter,
            "exit" => OpKind::Exit,
            "next_iteration" => OpKind::NextIteration,
            "control_trigger" => OpKind::ControlTrigger,
            "no_op" => OpKind::NoOp,
            other => return Err(format!("invalid op: {other}")),
        };
        Ok(op)
    }
}

/// Reference to a node output (or control output) as written in `inputs`.
///
/// - `"name"` is output 0 of `name`
/// - `"name:k"` is output `k` of `name`
/// - `"^name"` is a control dependency on `name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputRef {
    Data { node: String, slot: usize },
    Control { node: String },
}

impl InputRef {
    pub fn node(&self) -> &str {
        match self {
            InputRef::Data { node, .. } | InputRef::Control { node } => node,
        }
    }

    pub fn is_control(&self) -> bool {
        matches!(self, InputRef::Control { .. })
    }
}

impl FromStr for InputRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(node) = s.strip_prefix('^') {
            if node.is_empty() {
                return Err("empty control input".to_string());
            }
            return Ok(InputRef::Control {
                node: node.to_string(),
            });
        }

        match s.rsplit_once(':') {
            Some((node, slot)) => {
                let slot = slot
                    .parse::<usize>()
                    .map_err(|_| format!("invalid output slot in input '{s}'"))?;
                if node.is_empty() {
                    return Err(format!("empty node name in input '{s}'"));
                }
                Ok(InputRef::Data {
                    node: node.to_string(),
                    slot,
                })
            }
            None if s.is_empty() => Err("empty input".to_string()),
            None => Ok(InputRef::Data {
                node: s.to_string(),
                slot: 0,
            }),
        }
    }
}
