use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{GraphFile, NodeConfig, RawGraphFile};
use crate::errors::{LoopflowError, Result};
use crate::types::{InputRef, OpKind};

impl TryFrom<RawGraphFile> for GraphFile {
    type Error = LoopflowError;

    fn try_from(raw: RawGraphFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_graph(&raw)?;
        Ok(GraphFile::new_unchecked(raw.config, raw.node))
    }
}

fn validate_raw_graph(cfg: &RawGraphFile) -> Result<()> {
    ensure_has_nodes(cfg)?;
    validate_global_config(cfg)?;
    for (name, node) in cfg.node.iter() {
        validate_node_attrs(name, node)?;
        validate_node_inputs(cfg, name, node)?;
    }
    validate_acyclic(cfg)?;
    Ok(())
}

fn ensure_has_nodes(cfg: &RawGraphFile) -> Result<()> {
    if cfg.node.is_empty() {
        return Err(LoopflowError::ConfigError(
            "graph must contain at least one [node.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawGraphFile) -> Result<()> {
    if cfg.config.default_parallel_iterations == 0 {
        return Err(LoopflowError::ConfigError(
            "[config].default_parallel_iterations must be >= 1 (got 0)".to_string(),
        ));
    }

    for fetch in cfg.config.fetch.iter() {
        match cfg.node.get(fetch) {
            None => return Err(LoopflowError::UnknownNode(fetch.clone())),
            Some(node) if node.op.num_outputs() == 0 => {
                return Err(LoopflowError::ConfigError(format!(
                    "cannot fetch node '{}': op '{}' has no outputs",
                    fetch, node.op
                )));
            }
            Some(_) => {}
        }
    }

    Ok(())
}

fn validate_node_attrs(name: &str, node: &NodeConfig) -> Result<()> {
    match (node.op, node.value) {
        (OpKind::Const, None) => {
            return Err(LoopflowError::ConfigError(format!(
                "node '{name}': const requires `value`"
            )));
        }
        (op, Some(_)) if op != OpKind::Const => {
            return Err(LoopflowError::ConfigError(format!(
                "node '{name}': `value` is only valid on const nodes (op is '{op}')"
            )));
        }
        _ => {}
    }

    if node.op == OpKind::Enter {
        match node.frame_name.as_deref() {
            Some(frame) if !frame.trim().is_empty() => {}
            _ => {
                return Err(LoopflowError::ConfigError(format!(
                    "enter node '{name}' requires a non-empty `frame_name`"
                )));
            }
        }
        if node.parallel_iterations == Some(0) {
            return Err(LoopflowError::ConfigError(format!(
                "enter node '{name}': `parallel_iterations` must be >= 1 (got 0)"
            )));
        }
    } else if node.frame_name.is_some() || node.parallel_iterations.is_some() || node.is_constant
    {
        return Err(LoopflowError::ConfigError(format!(
            "node '{name}': `frame_name`, `parallel_iterations` and `is_constant` \
             are only valid on enter nodes (op is '{}')",
            node.op
        )));
    }

    Ok(())
}

fn validate_node_inputs(cfg: &RawGraphFile, name: &str, node: &NodeConfig) -> Result<()> {
    let inputs = node
        .parsed_inputs()
        .map_err(|msg| LoopflowError::ConfigError(format!("node '{name}': {msg}")))?;

    let mut data_inputs = 0usize;
    for input in inputs.iter() {
        let src_name = input.node();
        if src_name == name {
            return Err(LoopflowError::ConfigError(format!(
                "node '{name}' cannot use itself as an input"
            )));
        }
        let Some(src) = cfg.node.get(src_name) else {
            return Err(LoopflowError::ConfigError(format!(
                "node '{name}' has unknown input '{src_name}'"
            )));
        };

        if let InputRef::Data { slot, .. } = input {
            data_inputs += 1;
            let num_outputs = src.op.num_outputs();
            if *slot >= num_outputs {
                return Err(LoopflowError::ConfigError(format!(
                    "node '{name}' reads output {slot} of '{src_name}', \
                     but op '{}' has {num_outputs} output(s)",
                    src.op
                )));
            }
        }
    }

    let (min, max) = node.op.data_arity();
    let too_many = max.is_some_and(|max| data_inputs > max);
    if data_inputs < min || too_many {
        let expected = match max {
            Some(max) if max == min => format!("{min}"),
            Some(max) => format!("{min}..={max}"),
            None => format!("at least {min}"),
        };
        return Err(LoopflowError::ConfigError(format!(
            "node '{name}': op '{}' expects {expected} data input(s), got {data_inputs}",
            node.op
        )));
    }

    Ok(())
}

/// Loops are closed by NextIteration -> Merge back edges. With those edges
/// removed the graph must be a DAG.
fn validate_acyclic(cfg: &RawGraphFile) -> Result<()> {
    // Edge direction: input -> consumer.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.node.keys() {
        graph.add_node(name.as_str());
    }

    for (name, node) in cfg.node.iter() {
        for raw in node.inputs.iter() {
            // Inputs were already parsed successfully in validate_node_inputs.
            let Ok(input) = raw.parse::<InputRef>() else {
                continue;
            };
            let Some((src_name, src)) = cfg.node.get_key_value(input.node()) else {
                continue;
            };
            if src.op == OpKind::NextIteration {
                continue;
            }
            graph.add_edge(src_name.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(LoopflowError::DagCycle(format!(
            "cycle detected involving node '{}' (loops must be closed through a next_iteration node)",
            cycle.node_id()
        ))),
    }
}
