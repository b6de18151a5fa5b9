use plc_common::db::core::PlacementDb;
use plc_common::util::config::Config;
use plc_common::util::generator::generate_random_netlist;

#[test]
fn config_fills_unset_fields_with_defaults() {
    let config: Config = toml::from_str(
        r#"
[canvas]
grid_cols = 24
grid_rows = 30

[routing]
routes_per_micron_hor = 10.0
"#,
    )
    .unwrap();

    assert_eq!(config.canvas.grid_cols, 24);
    assert_eq!(config.canvas.grid_rows, 30);
    assert_eq!(config.canvas.width, None);
    assert!(config.canvas.boundary_check);
    assert_eq!(config.routing.routes_per_micron_hor, 10.0);
    assert_eq!(config.routing.routes_per_micron_ver, 12.605);
    assert_eq!(config.relax.num_steps, vec![100, 100, 100]);
    assert_eq!(config.project.name, "macro_place");
}

#[test]
fn config_applies_engine_settings() {
    let config: Config = toml::from_str(
        r#"
[canvas]
width = 300.0
height = 301.5
grid_cols = 12
grid_rows = 14
boundary_check = false

[routing]
smooth_range = 3.0

[project]
block = "testblock"
"#,
    )
    .unwrap();

    let netlist = "\
node {
  name: \"Grp\"
  attr {
    key: \"height\"
    value {
      f: 1
    }
  }
  attr {
    key: \"type\"
    value {
      placeholder: \"macro\"
    }
  }
  attr {
    key: \"width\"
    value {
      f: 1
    }
  }
  attr {
    key: \"x\"
    value {
      f: 0.5
    }
  }
  attr {
    key: \"y\"
    value {
      f: 0.5
    }
  }
}
";
    let mut db = PlacementDb::from_netlist_source(netlist).unwrap();
    config.apply_to(&mut db);

    assert_eq!((db.width, db.height), (300.0, 301.5));
    assert_eq!((db.grid_col, db.grid_row), (12, 14));
    assert!(!db.canvas_boundary_check);
    assert_eq!(db.smooth_range, 3);
    assert_eq!(db.block_name, "testblock");
    assert_eq!(db.node_mask.len(), 12 * 14);
}

#[test]
fn generated_benchmarks_parse_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("random_netlist.pb.txt");
    let path_str = path.to_str().unwrap();

    generate_random_netlist(path_str, 3, 12, 6, 0.5).unwrap();
    let db = PlacementDb::from_netlist_file(path_str).unwrap();

    assert_eq!(db.hard_macro_count(), 3);
    assert_eq!(db.soft_macro_count(), 12);
    assert_eq!(db.ports_count(), 6);
    assert_eq!(db.hard_macro_pin_count(), 6);
    assert_eq!(db.soft_macro_pin_count(), 24);
    assert!(db.net_count > 0.0);
    assert!(db.width > 0.0);
}
