//! Half-perimeter wirelength over all nets driven by ports and macro pins.

use plc_common::db::core::{DirtyFlags, PlacementDb};
use plc_common::db::indices::NodeId;
use plc_common::db::module::Module;

/// Total HPWL: for each driver, the bounding box over the driver and all of
/// its resolved sinks, weighted by the driver-pin weight.
pub fn wirelength(db: &PlacementDb) -> f64 {
    let mut total_hpwl = 0.0;

    for (idx, module) in db.modules.iter().enumerate() {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        let mut weight = 1.0;
        let mut has_endpoints = false;

        let mut extend = |x: f64, y: f64| {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        };

        let sinks = match module {
            Module::Port(port) => {
                if port.sink.is_empty() {
                    continue;
                }
                extend(port.pos.x, port.pos.y);
                has_endpoints = true;
                &port.sink
            }
            Module::SoftMacroPin(pin) | Module::HardMacroPin(pin) => {
                weight = pin.weight;
                let pos = db.pin_position(NodeId::new(idx));
                extend(pos.x, pos.y);
                has_endpoints = true;
                &pin.sink
            }
            _ => continue,
        };

        for sink_names in sinks.values() {
            for sink_name in sink_names {
                let Some(&sink_idx) = db.name_to_index.get(sink_name) else {
                    log::warn!("wirelength: unknown sink '{sink_name}'");
                    continue;
                };
                let pos = db.pin_position(sink_idx);
                extend(pos.x, pos.y);
            }
        }

        if has_endpoints {
            total_hpwl += weight * ((max_x - min_x).abs() + (max_y - min_y).abs());
        }
    }

    total_hpwl
}

/// HPWL normalized by half the canvas perimeter and the weighted net count.
pub fn wirelength_cost(db: &mut PlacementDb) -> f64 {
    db.dirty.clear(DirtyFlags::WIRELENGTH);
    let denom = (db.width + db.height) * db.net_count;
    if denom <= 0.0 {
        return 0.0;
    }
    wirelength(db) / denom
}
