use plc_common::db::core::PlacementDb;
use plc_common::db::indices::NodeId;
use plc_common::db::module::{Module, Orientation, Side};
use plc_common::error::PlcError;

const NETLIST: &str = r#"
# small mixed testcase
node {
  name: "clk"
  input: "Grp_a/Pinput"
  attr {
    key: "side"
    value {
      placeholder: "LEFT"
    }
  }
  attr {
    key: "type"
    value {
      placeholder: "PORT"
    }
  }
  attr {
    key: "x"
    value {
      f: 0
    }
  }
  attr {
    key: "y"
    value {
      f: 5
    }
  }
}
node {
  name: "mem0"
  attr {
    key: "height"
    value {
      f: 2
    }
  }
  attr {
    key: "orientation"
    value {
      placeholder: "N"
    }
  }
  attr {
    key: "type"
    value {
      placeholder: "MACRO"
    }
  }
  attr {
    key: "width"
    value {
      f: 2
    }
  }
  attr {
    key: "x"
    value {
      f: 5
    }
  }
  attr {
    key: "y"
    value {
      f: 5
    }
  }
}
node {
  name: "mem0/in"
  attr {
    key: "macro_name"
    value {
      placeholder: "mem0"
    }
  }
  attr {
    key: "type"
    value {
      placeholder: "MACRO_PIN"
    }
  }
  attr {
    key: "x_offset"
    value {
      f: -0.5
    }
  }
  attr {
    key: "y_offset"
    value {
      f: 0.25
    }
  }
  attr {
    key: "x"
    value {
      f: 4.5
    }
  }
  attr {
    key: "y"
    value {
      f: 5.25
    }
  }
}
node {
  name: "mem0/out"
  input: "Grp_b/Pinput"
  attr {
    key: "macro_name"
    value {
      placeholder: "mem0"
    }
  }
  attr {
    key: "type"
    value {
      placeholder: "MACRO_PIN"
    }
  }
  attr {
    key: "weight"
    value {
      f: 2
    }
  }
  attr {
    key: "x_offset"
    value {
      f: 0.5
    }
  }
  attr {
    key: "y_offset"
    value {
      f: -0.25
    }
  }
  attr {
    key: "x"
    value {
      f: 5.5
    }
  }
  attr {
    key: "y"
    value {
      f: 4.75
    }
  }
}
node {
  name: "Grp_a"
  attr {
    key: "height"
    value {
      f: 1
    }
  }
  attr {
    key: "type"
    value {
      placeholder: "macro"
    }
  }
  attr {
    key: "width"
    value {
      f: 1
    }
  }
  attr {
    key: "x"
    value {
      f: 2
    }
  }
  attr {
    key: "y"
    value {
      f: 2
    }
  }
}
node {
  name: "Grp_a/Pinput"
  attr {
    key: "macro_name"
    value {
      placeholder: "Grp_a"
    }
  }
  attr {
    key: "type"
    value {
      placeholder: "macro_pin"
    }
  }
  attr {
    key: "x"
    value {
      f: 2
    }
  }
  attr {
    key: "y"
    value {
      f: 2
    }
  }
}
node {
  name: "Grp_a/Poutput"
  input: "mem0/in"
  attr {
    key: "macro_name"
    value {
      placeholder: "Grp_a"
    }
  }
  attr {
    key: "type"
    value {
      placeholder: "macro_pin"
    }
  }
  attr {
    key: "x"
    value {
      f: 2
    }
  }
  attr {
    key: "y"
    value {
      f: 2
    }
  }
}
node {
  name: "Grp_b"
  attr {
    key: "height"
    value {
      f: 1
    }
  }
  attr {
    key: "type"
    value {
      placeholder: "macro"
    }
  }
  attr {
    key: "width"
    value {
      f: 1
    }
  }
  attr {
    key: "x"
    value {
      f: 8
    }
  }
  attr {
    key: "y"
    value {
      f: 8
    }
  }
}
node {
  name: "Grp_b/Pinput"
  attr {
    key: "macro_name"
    value {
      placeholder: "Grp_b"
    }
  }
  attr {
    key: "type"
    value {
      placeholder: "macro_pin"
    }
  }
  attr {
    key: "x"
    value {
      f: 8
    }
  }
  attr {
    key: "y"
    value {
      f: 8
    }
  }
}
"#;

#[test]
fn parses_partitions_and_counts() {
    let db = PlacementDb::from_netlist_source(NETLIST).unwrap();

    assert_eq!(db.ports_count(), 1);
    assert_eq!(db.hard_macro_count(), 1);
    assert_eq!(db.soft_macro_count(), 2);
    assert_eq!(db.hard_macro_pin_count(), 2);
    assert_eq!(db.soft_macro_pin_count(), 3);
    assert_eq!(db.mod_count(), 4);
    assert_eq!(db.modules.len(), 9);

    assert_eq!(db.port_indices, vec![NodeId::new(0)]);
    assert_eq!(db.hard_macro_indices, vec![NodeId::new(1)]);
    assert_eq!(db.soft_macro_indices, vec![NodeId::new(4), NodeId::new(7)]);
    assert_eq!(
        db.placeable_indices(),
        vec![NodeId::new(0), NodeId::new(1), NodeId::new(4), NodeId::new(7)]
    );
}

#[test]
fn name_index_mapping_is_bijective() {
    let db = PlacementDb::from_netlist_source(NETLIST).unwrap();

    assert_eq!(db.name_to_index.len(), db.modules.len());
    for (i, module) in db.modules.iter().enumerate() {
        assert_eq!(db.name_to_index[module.name()], NodeId::new(i));
        assert_eq!(db.node_name(NodeId::new(i)).unwrap(), module.name());
    }
}

#[test]
fn weighted_net_count_and_connections() {
    let db = PlacementDb::from_netlist_source(NETLIST).unwrap();

    // clk drives 1 net, mem0/out drives with weight 2, Grp_a/Poutput with 1.
    assert_eq!(db.net_count, 4.0);

    let clk = db.module(NodeId::new(0)).unwrap();
    assert_eq!(clk.connection().unwrap()["Grp_a"], 1.0);

    let mem0 = db.module(NodeId::new(1)).unwrap();
    assert_eq!(mem0.connection().unwrap()["Grp_b"], 2.0);

    let grp_a = db.module(NodeId::new(4)).unwrap();
    assert_eq!(grp_a.connection().unwrap()["mem0"], 1.0);
}

#[test]
fn pins_resolve_their_parents() {
    let db = PlacementDb::from_netlist_source(NETLIST).unwrap();

    let in_pin = db.node_index("mem0/in").unwrap();
    assert_eq!(db.ref_node_id(in_pin), Some(NodeId::new(1)));
    assert_eq!(db.ref_node_id(NodeId::new(1)), None);

    assert_eq!(
        db.macro_to_pins["mem0"],
        vec!["mem0/in".to_string(), "mem0/out".to_string()]
    );
    assert_eq!(
        db.macro_to_pins["Grp_a"],
        vec!["Grp_a/Pinput".to_string(), "Grp_a/Poutput".to_string()]
    );
}

#[test]
fn all_macros_start_placed() {
    let db = PlacementDb::from_netlist_source(NETLIST).unwrap();

    assert_eq!(
        db.placed_macro,
        vec![NodeId::new(1), NodeId::new(4), NodeId::new(7)]
    );
    for idx in db.macro_indices() {
        assert!(db.is_node_placed(idx).unwrap());
    }
    // Ports are fixed from the start, macros are not.
    assert!(db.is_node_fixed(NodeId::new(0)).unwrap());
    assert!(!db.is_node_fixed(NodeId::new(1)).unwrap());
}

#[test]
fn default_canvas_targets_sixty_percent_utilization() {
    let db = PlacementDb::from_netlist_source(NETLIST).unwrap();

    // 2x2 + 1x1 + 1x1 of macro area.
    assert!((db.total_area() - 6.0).abs() < 1e-12);
    let side = (6.0_f64 / 0.6).sqrt();
    assert!((db.width - side).abs() < 1e-12);
    assert!((db.height - side).abs() < 1e-12);
    assert_eq!((db.grid_col, db.grid_row), (10, 10));
}

#[test]
fn stored_orientation_rotates_pin_offsets_at_parse() {
    // Same macro, stored orientation FW: offset (1, 2) becomes (2, 1).
    let netlist = NETLIST.replace("placeholder: \"N\"", "placeholder: \"FW\"");
    let netlist = netlist
        .replace("f: -0.5", "f: 1")
        .replace("f: 0.25", "f: 2");
    let db = PlacementDb::from_netlist_source(&netlist).unwrap();

    let pin = db.module(db.node_index("mem0/in").unwrap()).unwrap();
    assert_eq!(pin.offset().x, 2.0);
    assert_eq!(pin.offset().y, 1.0);
    assert_eq!(
        db.get_macro_orientation(NodeId::new(1)).unwrap(),
        Orientation::FW
    );
}

#[test]
fn port_side_is_parsed() {
    let db = PlacementDb::from_netlist_source(NETLIST).unwrap();
    match db.module(NodeId::new(0)).unwrap() {
        Module::Port(p) => assert_eq!(p.side, Side::Left),
        other => panic!("expected port, got {}", other.kind()),
    }
}

#[test]
fn missing_required_attribute_fails() {
    let netlist = r#"
node {
  name: "Grp_x"
  attr {
    key: "type"
    value {
      placeholder: "macro"
    }
  }
  attr {
    key: "x"
    value {
      f: 1
    }
  }
}
"#;
    match PlacementDb::from_netlist_source(netlist) {
        Err(PlcError::Parse(msg)) => assert!(msg.contains("'y'"), "unexpected message: {msg}"),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn unknown_pin_parent_fails() {
    let netlist = r#"
node {
  name: "ghost/P0"
  attr {
    key: "macro_name"
    value {
      placeholder: "ghost"
    }
  }
  attr {
    key: "type"
    value {
      placeholder: "macro_pin"
    }
  }
  attr {
    key: "x"
    value {
      f: 1
    }
  }
  attr {
    key: "y"
    value {
      f: 1
    }
  }
}
"#;
    match PlacementDb::from_netlist_source(netlist) {
        Err(PlcError::Parse(msg)) => {
            assert!(msg.contains("unknown macro"), "unexpected message: {msg}")
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn empty_netlist_fails() {
    assert!(matches!(
        PlacementDb::from_netlist_source("# nothing here\n"),
        Err(PlcError::Parse(_))
    ));
    assert!(matches!(
        PlacementDb::from_netlist_source(""),
        Err(PlcError::Parse(_))
    ));
}

#[test]
fn metadata_nodes_are_skipped() {
    let mut netlist = String::from(
        r#"
node {
  name: "__metadata__"
  attr {
    key: "type"
    value {
      placeholder: "anything"
    }
  }
}
"#,
    );
    netlist.push_str(NETLIST);
    let db = PlacementDb::from_netlist_source(&netlist).unwrap();
    assert_eq!(db.modules.len(), 9);
    assert_eq!(db.node_index("clk").unwrap(), NodeId::new(0));
}
