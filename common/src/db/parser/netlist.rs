//! Reader for the textual protobuf-style netlist: a flat sequence of
//! `node { name input* attr* }` records whose `type` attribute selects the
//! module kind.

use crate::db::core::PlacementDb;
use crate::db::indices::NodeId;
use crate::db::module::{
    add_connections, add_sinks, HardMacro, MacroPin, Module, Port, SoftMacro,
};
use crate::error::PlcError;
use crate::geom::point::Point;
use std::collections::HashMap;
use std::path::PathBuf;

const METADATA_NODE: &str = "__metadata__";

#[derive(Default)]
struct RawNode {
    name: String,
    inputs: Vec<String>,
    attrs: HashMap<String, String>,
}

pub fn read_netlist_file(path: PathBuf) -> Result<PlacementDb, PlcError> {
    log::info!("reading netlist from {}", path.display());
    let source = std::fs::read_to_string(&path)
        .map_err(|e| PlcError::Parse(format!("cannot read {}: {e}", path.display())))?;

    let mut db = read_netlist_source(&source)?;
    // Block name follows the testcase directory holding the netlist.
    if let Some(block) = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
    {
        db.block_name = block.to_string();
    }
    db.netlist_file = Some(path);
    Ok(db)
}

pub fn read_netlist_source(source: &str) -> Result<PlacementDb, PlcError> {
    let mut db = PlacementDb::empty();

    let mut current: Option<RawNode> = None;
    let mut pending_key: Option<String> = None;
    let mut depth = 0usize;

    for (lineno, raw_line) in source.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fail = |msg: String| PlcError::Parse(format!("line {}: {msg}", lineno + 1));

        if line.starts_with("node") && line.ends_with('{') {
            if current.is_some() {
                return Err(fail("nested node record".to_string()));
            }
            current = Some(RawNode::default());
            depth = 1;
            continue;
        }

        if line == "}" {
            if current.is_none() || depth == 0 {
                return Err(fail("unbalanced braces".to_string()));
            }
            depth -= 1;
            if depth == 0 {
                let node = current.take().ok_or_else(|| fail("unbalanced braces".into()))?;
                if node.name != METADATA_NODE {
                    insert_node(&mut db, node)?;
                }
            }
            continue;
        }

        let Some(node) = current.as_mut() else {
            return Err(fail(format!(
                "unexpected token outside node record: '{line}'"
            )));
        };

        if line.starts_with("attr") && line.ends_with('{') {
            depth += 1;
            pending_key = None;
            continue;
        }
        if line.starts_with("value") && line.ends_with('{') {
            depth += 1;
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            return Err(fail(format!("malformed line '{line}'")));
        };
        let value = value.trim();
        match key.trim() {
            "name" => node.name = unquote(value).to_string(),
            "input" => node.inputs.push(unquote(value).to_string()),
            "key" => pending_key = Some(unquote(value).to_string()),
            "f" | "placeholder" => {
                let attr_key = pending_key
                    .clone()
                    .ok_or_else(|| fail("attribute value without key".to_string()))?;
                node.attrs.insert(attr_key, unquote(value).to_string());
            }
            other => return Err(fail(format!("unrecognized field '{other}'"))),
        }
    }

    if current.is_some() {
        return Err(PlcError::Parse("unterminated node record".to_string()));
    }
    if db.modules.is_empty() {
        return Err(PlcError::Parse("netlist contains no nodes".to_string()));
    }

    resolve_pin_parents(&mut db)?;
    update_connections(&mut db)?;
    mark_initial_placement(&mut db);
    db.finish_init();

    log::info!(
        "netlist loaded: {} ports, {} hard macros, {} soft macros, {} pins",
        db.ports_count(),
        db.hard_macro_count(),
        db.soft_macro_count(),
        db.hard_macro_pin_count() + db.soft_macro_pin_count()
    );
    Ok(db)
}

fn unquote(token: &str) -> &str {
    token.trim_matches('"')
}

fn req_f(node: &RawNode, key: &str) -> Result<f64, PlcError> {
    let raw = node.attrs.get(key).ok_or_else(|| {
        PlcError::Parse(format!("node '{}' is missing attribute '{key}'", node.name))
    })?;
    raw.parse::<f64>().map_err(|_| {
        PlcError::Parse(format!(
            "node '{}' attribute '{key}' is not a number: '{raw}'",
            node.name
        ))
    })
}

fn req_s<'a>(node: &'a RawNode, key: &str) -> Result<&'a str, PlcError> {
    node.attrs
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| PlcError::Parse(format!("node '{}' is missing attribute '{key}'", node.name)))
}

fn opt_weight(node: &RawNode) -> Result<Option<f64>, PlcError> {
    match node.attrs.get("weight") {
        None => Ok(None),
        Some(raw) => raw.parse::<f64>().map(Some).map_err(|_| {
            PlcError::Parse(format!(
                "node '{}' attribute 'weight' is not a number: '{raw}'",
                node.name
            ))
        }),
    }
}

fn insert_node(db: &mut PlacementDb, node: RawNode) -> Result<(), PlcError> {
    let id = NodeId::new(db.modules.len());
    if db.name_to_index.contains_key(&node.name) {
        return Err(PlcError::Parse(format!("duplicate node name '{}'", node.name)));
    }

    let kind = req_s(&node, "type")?;
    let module = match kind {
        "macro" => {
            let pos = Point::new(req_f(&node, "x")?, req_f(&node, "y")?);
            db.soft_macro_indices.push(id);
            Module::SoftMacro(SoftMacro::new(
                node.name.clone(),
                pos,
                req_f(&node, "width")?,
                req_f(&node, "height")?,
            ))
        }
        "MACRO" => {
            let pos = Point::new(req_f(&node, "x")?, req_f(&node, "y")?);
            let orientation = req_s(&node, "orientation")?.parse()?;
            db.hard_macro_indices.push(id);
            Module::HardMacro(HardMacro::new(
                node.name.clone(),
                pos,
                req_f(&node, "width")?,
                req_f(&node, "height")?,
                orientation,
            ))
        }
        "macro_pin" => {
            let pos = Point::new(req_f(&node, "x")?, req_f(&node, "y")?);
            let mut pin = MacroPin::new(
                node.name.clone(),
                pos,
                Point::default(),
                req_s(&node, "macro_name")?.to_string(),
            );
            if let Some(weight) = opt_weight(&node)? {
                pin.weight = weight;
            }
            if !node.inputs.is_empty() {
                db.net_count += pin.weight;
                add_sinks(&mut pin.sink, &node.inputs);
            }
            db.soft_macro_pin_indices.push(id);
            Module::SoftMacroPin(pin)
        }
        "MACRO_PIN" => {
            let pos = Point::new(req_f(&node, "x")?, req_f(&node, "y")?);
            let offset = Point::new(req_f(&node, "x_offset")?, req_f(&node, "y_offset")?);
            let mut pin = MacroPin::new(
                node.name.clone(),
                pos,
                offset,
                req_s(&node, "macro_name")?.to_string(),
            );
            if let Some(weight) = opt_weight(&node)? {
                pin.weight = weight;
            }
            if !node.inputs.is_empty() {
                db.net_count += pin.weight;
                add_sinks(&mut pin.sink, &node.inputs);
            }
            db.hard_macro_pin_indices.push(id);
            Module::HardMacroPin(pin)
        }
        "PORT" => {
            let pos = Point::new(req_f(&node, "x")?, req_f(&node, "y")?);
            let side = req_s(&node, "side")?.parse()?;
            let mut port = Port::new(node.name.clone(), pos, side);
            if !node.inputs.is_empty() {
                db.net_count += 1.0;
                add_sinks(&mut port.sink, &node.inputs);
                // Ports carry no pins, so connections aggregate immediately.
                add_connections(&mut port.connection, &node.inputs, 1.0);
            }
            db.port_indices.push(id);
            Module::Port(port)
        }
        other => {
            return Err(PlcError::Parse(format!(
                "node '{}' has unrecognized type '{other}'",
                node.name
            )));
        }
    };

    db.name_to_index.insert(node.name, id);
    db.modules.push(module);
    Ok(())
}

/// Resolve each pin's parent macro to its index and register the pin under
/// its macro. A pin naming an unknown macro is a parse failure.
fn resolve_pin_parents(db: &mut PlacementDb) -> Result<(), PlcError> {
    for idx in 0..db.modules.len() {
        let (pin_name, macro_name) = match &db.modules[idx] {
            Module::SoftMacroPin(pin) | Module::HardMacroPin(pin) => {
                (pin.name.clone(), pin.macro_name.clone())
            }
            _ => continue,
        };
        let parent = *db.name_to_index.get(&macro_name).ok_or_else(|| {
            PlcError::Parse(format!(
                "pin '{pin_name}' references unknown macro '{macro_name}'"
            ))
        })?;
        if let Module::SoftMacroPin(pin) | Module::HardMacroPin(pin) = &mut db.modules[idx] {
            pin.parent = Some(parent);
        }
        db.macro_to_pins.entry(macro_name).or_default().push(pin_name);
    }
    Ok(())
}

/// Aggregate per-macro connection multiplicities from every pin's sinks and
/// rotate hard-macro pin offsets into their stored orientation.
fn update_connections(db: &mut PlacementDb) -> Result<(), PlcError> {
    let macro_ids: Vec<NodeId> = db
        .hard_macro_indices
        .iter()
        .chain(db.soft_macro_indices.iter())
        .copied()
        .collect();

    for macro_idx in macro_ids {
        let macro_name = db.modules[macro_idx.index()].name().to_string();
        let Some(pin_names) = db.macro_to_pins.get(&macro_name).cloned() else {
            log::debug!("macro '{macro_name}' has no pins");
            continue;
        };

        if db.modules[macro_idx.index()].is_hard_macro() {
            let orientation = db.get_macro_orientation(macro_idx)?;
            db.update_macro_orientation(macro_idx, orientation)?;
        }

        for pin_name in &pin_names {
            let pin_idx = *db
                .name_to_index
                .get(pin_name)
                .ok_or_else(|| PlcError::Parse(format!("pin '{pin_name}' not indexed")))?;
            let (sinks, weight) = {
                let pin = &db.modules[pin_idx.index()];
                (pin.sink().cloned(), pin.weight())
            };
            let Some(sinks) = sinks else { continue };
            for sink_names in sinks.values() {
                if let Some(conn) = db.modules[macro_idx.index()].connection_mut() {
                    add_connections(conn, sink_names, weight);
                }
            }
        }
    }
    Ok(())
}

/// Every macro starts out placed at its netlist position.
fn mark_initial_placement(db: &mut PlacementDb) {
    let macro_ids: Vec<NodeId> = db
        .hard_macro_indices
        .iter()
        .chain(db.soft_macro_indices.iter())
        .copied()
        .collect();
    db.placed_macro.extend(macro_ids);
}
