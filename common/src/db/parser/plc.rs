//! Plain-text placement file support. Data lines carry five fields,
//! `<index> <x> <y> <orientation|-> <fixed>`; engine metadata travels in
//! `#` comment lines with recognized keys.

use crate::db::core::{DirtyFlags, PlacementDb};
use crate::db::indices::NodeId;
use crate::db::module::Module;
use crate::error::PlcError;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct PlcMeta {
    pub columns: usize,
    pub rows: usize,
    pub width: f64,
    pub height: f64,
    pub area: f64,
    pub block: Option<String>,
    pub routes_per_micron_hor: f64,
    pub routes_per_micron_ver: f64,
    pub macro_routes_hor: f64,
    pub macro_routes_ver: f64,
    pub smoothing_factor: f64,
    pub overlap_threshold: f64,
    pub hard_macros_cnt: usize,
    pub hard_macro_pins_cnt: usize,
    pub ports_cnt: usize,
    pub soft_macros_cnt: usize,
    pub soft_macro_pins_cnt: usize,
}

#[derive(Debug)]
pub struct PlcRecord {
    pub x: f64,
    pub y: f64,
    pub orientation: String,
    pub fixed: bool,
}

#[derive(Debug, Default)]
pub struct PlcFile {
    pub meta: PlcMeta,
    pub records: BTreeMap<usize, PlcRecord>,
}

pub fn parse_plc_source(source: &str) -> Result<PlcFile, PlcError> {
    let mut plc = PlcFile::default();

    for (lineno, raw_line) in source.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix('#') {
            read_meta_line(&mut plc.meta, comment);
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            log::debug!("skipping unrecognized placement line {}", lineno + 1);
            continue;
        }

        let fail = |what: &str| {
            PlcError::Parse(format!(
                "placement line {}: bad {what}: '{line}'",
                lineno + 1
            ))
        };
        let index: usize = fields[0].parse().map_err(|_| fail("node index"))?;
        let x: f64 = fields[1].parse().map_err(|_| fail("x coordinate"))?;
        let y: f64 = fields[2].parse().map_err(|_| fail("y coordinate"))?;
        let fixed = match fields[4] {
            "0" => false,
            "1" => true,
            _ => return Err(fail("fixed flag")),
        };
        plc.records.insert(
            index,
            PlcRecord {
                x,
                y,
                orientation: fields[3].to_string(),
                fixed,
            },
        );
    }

    Ok(plc)
}

/// Recognize the metadata keys carried in comment lines. Unknown or
/// malformed comments are left alone.
fn read_meta_line(meta: &mut PlcMeta, comment: &str) {
    let normalized = comment.replace([':', ','], " ");
    let tok: Vec<&str> = normalized.split_whitespace().collect();
    if tok.is_empty() {
        return;
    }

    let fnum = |i: usize| tok.get(i).and_then(|t| t.parse::<f64>().ok());
    let inum = |i: usize| tok.get(i).and_then(|t| t.parse::<usize>().ok());

    match tok[0] {
        "Columns" if tok.get(2) == Some(&"Rows") => {
            if let (Some(c), Some(r)) = (inum(1), inum(3)) {
                meta.columns = c;
                meta.rows = r;
            }
        }
        "Width" if tok.get(2) == Some(&"Height") => {
            if let (Some(w), Some(h)) = (fnum(1), fnum(3)) {
                meta.width = w;
                meta.height = h;
            }
        }
        "Area" => {
            let slot = if tok.contains(&"stdcell") && tok.contains(&"macros") {
                3
            } else {
                1
            };
            if let Some(a) = fnum(slot) {
                meta.area = a;
            }
        }
        "Block" => {
            if let Some(b) = tok.get(1) {
                meta.block = Some((*b).to_string());
            }
        }
        "Routes" if tok.get(1) == Some(&"per") => {
            if let (Some(h), Some(v)) = (fnum(4), fnum(6)) {
                meta.routes_per_micron_hor = h;
                meta.routes_per_micron_ver = v;
            }
        }
        "Routes" if tok.get(1) == Some(&"used") => {
            if let (Some(h), Some(v)) = (fnum(5), fnum(7)) {
                meta.macro_routes_hor = h;
                meta.macro_routes_ver = v;
            }
        }
        "Smoothing" => {
            if let Some(s) = fnum(2) {
                meta.smoothing_factor = s;
            }
        }
        "Overlap" => {
            if let Some(t) = fnum(2) {
                meta.overlap_threshold = t;
            }
        }
        "HARD" if tok.get(1) == Some(&"MACROs") && tok.len() == 3 => {
            if let Some(n) = inum(2) {
                meta.hard_macros_cnt = n;
            }
        }
        "HARD" if tok.get(1) == Some(&"MACRO") && tok.len() == 4 => {
            if let Some(n) = inum(3) {
                meta.hard_macro_pins_cnt = n;
            }
        }
        "PORTs" if tok.len() == 2 => {
            if let Some(n) = inum(1) {
                meta.ports_cnt = n;
            }
        }
        "SOFT" if tok.get(1) == Some(&"MACROs") && tok.len() == 3 => {
            if let Some(n) = inum(2) {
                meta.soft_macros_cnt = n;
            }
        }
        "SOFT" if tok.get(1) == Some(&"MACRO") && tok.len() == 4 => {
            if let Some(n) = inum(3) {
                meta.soft_macro_pins_cnt = n;
            }
        }
        _ => {}
    }
}

/// Restore positions, orientations, and fixed flags from a placement file.
///
/// With `validate`, the module counts and the set of placed indices must
/// agree with the netlist. With `read_comment`, metadata comments are
/// applied to the engine configuration. `is_initial` remembers the file as
/// the initial placement.
pub fn restore_placement(
    db: &mut PlacementDb,
    path: impl Into<PathBuf>,
    is_initial: bool,
    validate: bool,
    read_comment: bool,
) -> Result<(), PlcError> {
    let path = path.into();
    let source = std::fs::read_to_string(&path)
        .map_err(|e| PlcError::Parse(format!("cannot read {}: {e}", path.display())))?;
    let plc = parse_plc_source(&source)?;

    if validate {
        validate_counts(db, &plc)?;
    }

    db.dirty.set(DirtyFlags::ALL);

    for (&index, record) in &plc.records {
        if index >= db.modules.len() {
            log::warn!("placement index {index} not in netlist; skipped");
            continue;
        }
        let idx = NodeId::new(index);
        db.modules[index].set_pos(crate::geom::point::Point::new(record.x, record.y));

        if record.orientation != "-" {
            let orientation = record.orientation.parse()?;
            if db.modules[index].is_hard_macro() {
                db.update_macro_orientation(idx, orientation)?;
            } else if let Module::SoftMacro(m) = &mut db.modules[index] {
                m.orientation = Some(orientation);
            } else {
                let m = &db.modules[index];
                log::warn!(
                    "orientation '{}' on {} '{}' ignored",
                    record.orientation,
                    m.kind(),
                    m.name()
                );
            }
        }

        db.modules[index].set_fixed(record.fixed);
    }

    if read_comment {
        log::info!("retrieving engine configuration from placement comments");
        db.set_canvas_size(plc.meta.width, plc.meta.height);
        db.set_placement_grid(plc.meta.columns, plc.meta.rows);
        if let Some(block) = &plc.meta.block {
            db.set_block_name(block.clone());
        }
        db.set_routes_per_micron(
            plc.meta.routes_per_micron_hor,
            plc.meta.routes_per_micron_ver,
        );
        db.set_macro_routing_allocation(plc.meta.macro_routes_hor, plc.meta.macro_routes_ver);
        db.set_congestion_smooth_range(plc.meta.smoothing_factor);
        db.set_overlap_threshold(plc.meta.overlap_threshold);
    }

    if is_initial {
        db.init_plc = Some(path);
    }
    Ok(())
}

fn validate_counts(db: &PlacementDb, plc: &PlcFile) -> Result<(), PlcError> {
    let checks = [
        ("HARD MACROs", db.hard_macro_count(), plc.meta.hard_macros_cnt),
        (
            "HARD MACRO PINs",
            db.hard_macro_pin_count(),
            plc.meta.hard_macro_pins_cnt,
        ),
        ("SOFT MACROs", db.soft_macro_count(), plc.meta.soft_macros_cnt),
        (
            "SOFT MACRO PINs",
            db.soft_macro_pin_count(),
            plc.meta.soft_macro_pins_cnt,
        ),
        ("PORTs", db.ports_count(), plc.meta.ports_cnt),
    ];
    for (what, netlist, placement) in checks {
        if netlist != placement {
            return Err(PlcError::Validation(format!(
                "{what} mismatch: netlist has {netlist}, placement file has {placement}"
            )));
        }
    }

    let expected: Vec<usize> = db.placeable_indices().iter().map(|id| id.index()).collect();
    let got: Vec<usize> = plc.records.keys().copied().collect();
    if expected != got {
        return Err(PlcError::Validation(format!(
            "placement lists {} indices, netlist has {} placeable modules",
            got.len(),
            expected.len()
        )));
    }
    Ok(())
}

/// Write the placement: `info` lines as `#` comments, then one data line per
/// placeable index in ascending order.
pub fn save_placement(db: &PlacementDb, path: impl AsRef<Path>, info: &str) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    for line in info.split('\n') {
        writeln!(file, "# {line}")?;
    }

    let mut first = true;
    for idx in db.placeable_indices() {
        let m = &db.modules[idx.index()];
        let orientation = m
            .orientation()
            .map(|o| o.as_str())
            .unwrap_or("-");
        let sep = if first { "" } else { "\n" };
        write!(
            file,
            "{sep}{} {} {} {} {}",
            idx.index(),
            m.pos().x,
            m.pos().y,
            orientation,
            if m.fixed() { "1" } else { "0" }
        )?;
        first = false;
    }
    Ok(())
}

/// Standard metadata comment block understood by `restore_placement` with
/// `read_comment`.
pub fn placement_metadata(db: &PlacementDb) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Placement file for {}", db.project_name);
    let _ = writeln!(out, "Block : {}", db.block_name);
    let _ = writeln!(out, "Columns : {}  Rows : {}", db.grid_col, db.grid_row);
    let _ = writeln!(out, "Width : {}  Height : {}", db.width, db.height);
    let _ = writeln!(out, "Area : {}", db.total_area());
    let _ = writeln!(
        out,
        "Routes per micron, hor : {} ver : {}",
        db.hroutes_per_micron, db.vroutes_per_micron
    );
    let _ = writeln!(
        out,
        "Routes used by macros, hor : {} ver : {}",
        db.hrouting_alloc, db.vrouting_alloc
    );
    let _ = writeln!(out, "Smoothing factor : {}", db.smooth_range);
    let _ = writeln!(out, "Overlap threshold : {}", db.overlap_threshold);
    let _ = writeln!(out, "HARD MACROs : {}", db.hard_macro_count());
    let _ = writeln!(out, "HARD MACRO PINs : {}", db.hard_macro_pin_count());
    let _ = writeln!(out, "PORTs : {}", db.ports_count());
    let _ = writeln!(out, "SOFT MACROs : {}", db.soft_macro_count());
    let _ = write!(out, "SOFT MACRO PINs : {}", db.soft_macro_pin_count());
    out
}
