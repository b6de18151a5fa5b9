//! Force-directed relaxation of soft macros: per-iteration repulsive,
//! attractive, and normalization passes followed by a canvas clamp, driven
//! over an epoch schedule with placement snapshots between epochs.

use crate::forces;
use anyhow::ensure;
use plc_common::db::core::{DirtyFlags, PlacementDb};
use plc_common::db::indices::NodeId;
use plc_common::db::parser::plc::{placement_metadata, save_placement};
use plc_common::geom::point::Point;
use rand::Rng;
use std::f64::consts::PI;
use std::path::Path;

pub struct FdParams {
    pub io_factor: f64,
    pub attract_exponent: i32,
    /// Per-epoch schedules; all four run in lockstep.
    pub num_steps: Vec<usize>,
    pub max_move_distance: Vec<f64>,
    pub attract_factor: Vec<f64>,
    pub repel_factor: Vec<f64>,
}

impl Default for FdParams {
    fn default() -> Self {
        Self {
            io_factor: 1.0,
            attract_exponent: 1,
            num_steps: vec![100, 100, 100],
            max_move_distance: vec![100.0, 100.0, 100.0],
            attract_factor: vec![100.0, 1.0e-3, 1.0e-5],
            repel_factor: vec![0.0, 1.0e6, 1.0e7],
        }
    }
}

/// One relaxation step. Only soft macros move; every displacement field is
/// normalized by its observed per-axis maximum before scaling.
pub fn fd_iteration(
    db: &mut PlacementDb,
    io_factor: f64,
    attract_factor: f64,
    repel_factor: f64,
    attract_exponent: i32,
) {
    let n = db.modules.len();
    let soft = db.soft_macro_indices.clone();
    let mut disp = vec![(0.0_f64, 0.0_f64); n];

    // Soft-soft repulsion over all unordered pairs.
    if repel_factor != 0.0 {
        let mut xr = vec![0.0; n];
        let mut yr = vec![0.0; n];
        for &i in &soft {
            for &j in &soft {
                if i <= j {
                    continue;
                }
                let (fx, fy) = forces::repulsive_force(repel_factor, db, i, j);
                xr[i.index()] += fx;
                yr[i.index()] += fy;
                xr[j.index()] -= fx;
                yr[j.index()] -= fy;
            }
        }
        accumulate_normalized(&mut disp, &xr, &yr, &soft, 2.0);
    }

    // Soft macros evade placed hard macros they overlap.
    if repel_factor != 0.0 {
        let hard = db.hard_macro_indices.clone();
        let mut xr = vec![0.0; n];
        let mut yr = vec![0.0; n];
        for &i in &soft {
            for &j in &hard {
                let (fx, fy) = forces::soft_hard_repulsive_force(db, i, j);
                xr[i.index()] += fx;
                yr[i.index()] += fy;
            }
        }
        accumulate_normalized(&mut disp, &xr, &yr, &soft, 4.0);
    }

    // Net attraction: each soft-macro driver pin pulls its parent toward
    // every sink group, damped through the shifted sigmoid.
    if attract_factor != 0.0 {
        let mut xr = vec![0.0; n];
        let mut yr = vec![0.0; n];
        let pins = db.soft_macro_pin_indices.clone();
        for pin_idx in pins {
            let (driver, sink_groups) = {
                let pin = &db.modules[pin_idx.index()];
                let Some(sinks) = pin.sink() else { continue };
                if sinks.is_empty() {
                    continue;
                }
                let Some(parent) = pin.parent() else { continue };
                (parent, sinks.keys().cloned().collect::<Vec<_>>())
            };

            for group in sink_groups {
                let Some(&sink_idx) = db.name_to_index.get(&group) else {
                    log::warn!("relax: unknown sink group '{group}'");
                    continue;
                };
                if forces::squares_overlap(db, driver, sink_idx, (0.0, 0.0), (0.0, 0.0)) {
                    continue;
                }
                let factor = if db.modules[sink_idx.index()].is_port() {
                    io_factor
                } else {
                    attract_factor
                };
                let (fx, fy) =
                    forces::attractive_force(factor, attract_exponent, db, driver, sink_idx);
                // Skip pulls that would push the pair into overlap.
                if forces::squares_overlap(db, driver, sink_idx, (fx, fy), (0.0, 0.0)) {
                    continue;
                }
                xr[driver.index()] += forces::shifted_sigmoid(-fx);
                yr[driver.index()] += forces::shifted_sigmoid(-fy);
            }
        }
        accumulate_normalized(&mut disp, &xr, &yr, &soft, 0.1);
    }

    // Apply the accumulated displacement and clamp centers to the canvas.
    for &idx in &soft {
        let pos = db.modules[idx.index()].pos();
        let x = (pos.x + disp[idx.index()].0).clamp(0.0, db.width);
        let y = (pos.y + disp[idx.index()].1).clamp(0.0, db.height);
        db.modules[idx.index()].set_pos(Point::new(x, y));
    }
    db.dirty
        .set(DirtyFlags::WIRELENGTH | DirtyFlags::DENSITY | DirtyFlags::CONGESTION);
}

/// Scale a force field by `scale / max|axis|` and fold it into the
/// displacement accumulator. A zero maximum normalizes to 1.
fn accumulate_normalized(
    disp: &mut [(f64, f64)],
    xr: &[f64],
    yr: &[f64],
    soft: &[NodeId],
    scale: f64,
) {
    let mut max_x = 0.0_f64;
    let mut max_y = 0.0_f64;
    for (&x, &y) in xr.iter().zip(yr.iter()) {
        max_x = max_x.max(x.abs());
        max_y = max_y.max(y.abs());
    }
    if max_x == 0.0 {
        max_x = 1.0;
    }
    if max_y == 0.0 {
        max_y = 1.0;
    }
    for &idx in soft {
        disp[idx.index()].0 += scale * xr[idx.index()] / max_x;
        disp[idx.index()].1 += scale * yr[idx.index()] / max_y;
    }
}

/// Scatter every soft macro uniformly over the unit disk at the canvas
/// center.
pub fn randomize_soft_macros(db: &mut PlacementDb, rng: &mut impl Rng) {
    let center_x = db.width / 2.0;
    let center_y = db.height / 2.0;
    for idx in db.soft_macro_indices.clone() {
        let r = rng.r#gen::<f64>().sqrt();
        let theta = rng.r#gen::<f64>() * 2.0 * PI;
        db.modules[idx.index()].set_pos(Point::new(
            center_x + r * theta.cos(),
            center_y + r * theta.sin(),
        ));
    }
    db.dirty
        .set(DirtyFlags::WIRELENGTH | DirtyFlags::DENSITY | DirtyFlags::CONGESTION);
}

/// Run the epoch schedule, saving an `epoch_<n>.plc` snapshot after each
/// epoch. Control returns between epochs, so callers can stop early.
pub fn optimize_stdcells(
    db: &mut PlacementDb,
    params: &FdParams,
    snapshot_dir: &Path,
) -> anyhow::Result<()> {
    let epochs = params.num_steps.len();
    ensure!(
        params.max_move_distance.len() == epochs
            && params.attract_factor.len() == epochs
            && params.repel_factor.len() == epochs,
        "epoch schedules must have equal lengths"
    );

    let mut rng = rand::thread_rng();
    randomize_soft_macros(db, &mut rng);

    for (epoch, &steps) in params.num_steps.iter().enumerate() {
        log::info!(
            "relax epoch {epoch}: {steps} steps, attract {}, repel {}, io {}, max move {}",
            params.attract_factor[epoch],
            params.repel_factor[epoch],
            params.io_factor,
            params.max_move_distance[epoch]
        );
        for _ in 0..steps {
            fd_iteration(
                db,
                params.io_factor,
                params.attract_factor[epoch],
                params.repel_factor[epoch],
                params.attract_exponent,
            );
        }
        let snapshot = snapshot_dir.join(format!("epoch_{epoch}.plc"));
        save_placement(db, &snapshot, &placement_metadata(db))?;
        log::info!("saved {}", snapshot.display());
    }
    Ok(())
}
