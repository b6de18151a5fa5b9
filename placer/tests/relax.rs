use plc_common::db::core::{DirtyFlags, PlacementDb};
use plc_common::db::parser::plc::parse_plc_source;
use plc_placer::relax::{fd_iteration, optimize_stdcells, randomize_soft_macros, FdParams};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn node(name: &str, inputs: &[&str], sattrs: &[(&str, &str)], fattrs: &[(&str, f64)]) -> String {
    let mut out = format!("node {{\n  name: \"{name}\"\n");
    for input in inputs {
        out.push_str(&format!("  input: \"{input}\"\n"));
    }
    for (key, value) in sattrs {
        out.push_str(&format!(
            "  attr {{\n    key: \"{key}\"\n    value {{\n      placeholder: \"{value}\"\n    }}\n  }}\n"
        ));
    }
    for (key, value) in fattrs {
        out.push_str(&format!(
            "  attr {{\n    key: \"{key}\"\n    value {{\n      f: {value}\n    }}\n  }}\n"
        ));
    }
    out.push_str("}\n");
    out
}

fn soft_macro(name: &str, x: f64, y: f64) -> String {
    node(
        name,
        &[],
        &[("type", "macro")],
        &[("height", 1.0), ("width", 1.0), ("x", x), ("y", y)],
    )
}

fn two_soft_macros(ax: f64, ay: f64, bx: f64, by: f64) -> PlacementDb {
    let mut src = String::new();
    src += &soft_macro("Grp_a", ax, ay);
    src += &soft_macro("Grp_b", bx, by);
    let mut db = PlacementDb::from_netlist_source(&src).unwrap();
    db.set_canvas_size(10.0, 10.0);
    db.set_placement_grid(10, 10);
    db
}

#[test]
fn coincident_soft_macros_separate_along_the_tie_break_axes() {
    let mut db = two_soft_macros(5.0, 5.0, 5.0, 5.0);

    fd_iteration(&mut db, 0.0, 0.0, 1.0, 1);

    // The tie-break force is (sqrt(rf), sqrt(rf)); after max-normalization
    // each macro moves exactly 2.0 per axis, the higher index positively.
    let a = db.modules[db.node_index("Grp_a").unwrap().index()].pos();
    let b = db.modules[db.node_index("Grp_b").unwrap().index()].pos();
    assert_eq!((a.x, a.y), (3.0, 3.0));
    assert_eq!((b.x, b.y), (7.0, 7.0));
    assert!(db.dirty.contains(
        DirtyFlags::WIRELENGTH | DirtyFlags::DENSITY | DirtyFlags::CONGESTION
    ));
}

#[test]
fn separation_respects_the_canvas_clamp() {
    let mut db = two_soft_macros(9.0, 9.0, 9.0, 9.0);

    fd_iteration(&mut db, 0.0, 0.0, 1.0, 1);

    let b = db.modules[db.node_index("Grp_b").unwrap().index()].pos();
    assert_eq!((b.x, b.y), (10.0, 10.0));
    for &idx in &db.soft_macro_indices {
        let pos = db.modules[idx.index()].pos();
        assert!(pos.x >= 0.0 && pos.x <= db.width);
        assert!(pos.y >= 0.0 && pos.y <= db.height);
    }
}

#[test]
fn soft_macro_escapes_an_overlapping_hard_macro() {
    let mut src = String::new();
    src += &soft_macro("Grp_a", 4.0, 4.0);
    src += &node(
        "mem0",
        &[],
        &[("orientation", "N"), ("type", "MACRO")],
        &[("height", 4.0), ("width", 4.0), ("x", 5.0), ("y", 5.0)],
    );
    let mut db = PlacementDb::from_netlist_source(&src).unwrap();
    db.set_canvas_size(10.0, 10.0);

    fd_iteration(&mut db, 0.0, 0.0, 1.0, 1);

    // The push is 4.0-scaled after normalization, so the lone pair drives
    // the soft macro straight into the lower-left corner.
    let a = db.modules[db.node_index("Grp_a").unwrap().index()].pos();
    assert_eq!((a.x, a.y), (0.0, 0.0));
    // The hard macro never moves.
    let m = db.modules[db.node_index("mem0").unwrap().index()].pos();
    assert_eq!((m.x, m.y), (5.0, 5.0));
}

#[test]
fn attraction_pulls_the_driver_toward_its_port_sink() {
    let mut src = String::new();
    src += &node(
        "io",
        &[],
        &[("side", "LEFT"), ("type", "PORT")],
        &[("x", 0.0), ("y", 5.0)],
    );
    src += &soft_macro("Grp_a", 8.0, 5.0);
    src += &node(
        "Grp_a/Pout",
        &["io"],
        &[("macro_name", "Grp_a"), ("type", "macro_pin")],
        &[("x", 8.0), ("y", 5.0)],
    );
    let mut db = PlacementDb::from_netlist_source(&src).unwrap();
    db.set_canvas_size(10.0, 10.0);

    fd_iteration(&mut db, 1.0, 1.0, 0.0, 1);

    // A single attraction term normalizes to the 0.1 step.
    let a = db.modules[db.node_index("Grp_a").unwrap().index()].pos();
    assert!((a.x - 7.9).abs() < 1e-9, "x = {}", a.x);
    assert!((a.y - 5.1).abs() < 1e-9, "y = {}", a.y);
}

#[test]
fn randomize_scatters_over_the_center_unit_disk() {
    let mut db = two_soft_macros(1.0, 1.0, 9.0, 9.0);
    let mut rng = StdRng::seed_from_u64(42);

    randomize_soft_macros(&mut db, &mut rng);

    for &idx in &db.soft_macro_indices.clone() {
        let pos = db.modules[idx.index()].pos();
        let dx = pos.x - 5.0;
        let dy = pos.y - 5.0;
        assert!(dx * dx + dy * dy <= 1.0 + 1e-12);
    }
}

#[test]
fn epoch_schedule_writes_snapshots() {
    let mut db = two_soft_macros(2.0, 2.0, 8.0, 8.0);
    let dir = tempfile::tempdir().unwrap();

    let params = FdParams {
        num_steps: vec![2, 2],
        max_move_distance: vec![10.0, 10.0],
        attract_factor: vec![1.0, 1.0e-3],
        repel_factor: vec![0.0, 1.0e2],
        ..FdParams::default()
    };
    optimize_stdcells(&mut db, &params, dir.path()).unwrap();

    for epoch in 0..2 {
        let path = dir.path().join(format!("epoch_{epoch}.plc"));
        let source = std::fs::read_to_string(&path).unwrap();
        let plc = parse_plc_source(&source).unwrap();
        assert_eq!(plc.records.len(), 2);
        assert_eq!((plc.meta.columns, plc.meta.rows), (10, 10));
    }
}

#[test]
fn mismatched_epoch_schedules_are_rejected() {
    let mut db = two_soft_macros(2.0, 2.0, 8.0, 8.0);
    let dir = tempfile::tempdir().unwrap();

    let params = FdParams {
        num_steps: vec![2, 2],
        repel_factor: vec![1.0],
        ..FdParams::default()
    };
    assert!(optimize_stdcells(&mut db, &params, dir.path()).is_err());
}
