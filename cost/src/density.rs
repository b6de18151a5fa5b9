//! Per-grid-cell area occupation and the top-k density cost.

use plc_common::db::core::{DirtyFlags, PlacementDb};
use plc_common::geom::point::Point;
use plc_common::geom::rect::Rect;

/// Rasterize every macro's bounding box into the grid, accumulating overlap
/// area per cell, then derive per-cell density. Out-of-bound boxes are
/// clipped; wholly off-canvas macros contribute nothing.
pub fn compute_grid_density(db: &mut PlacementDb) {
    let cols = db.grid_col;
    let rows = db.grid_row;
    let gw = db.grid_width();
    let gh = db.grid_height();
    let cell_area = gw * gh;

    let mut occupied = vec![0.0; cols * rows];

    if cell_area > 0.0 {
        let macro_ids: Vec<_> = db
            .soft_macro_indices
            .iter()
            .chain(db.hard_macro_indices.iter())
            .copied()
            .collect();
        for idx in macro_ids {
            let m = &db.modules[idx.index()];
            rasterize(&mut occupied, cols, rows, gw, gh, m.pos(), m.width(), m.height());
        }
    }

    db.grid_cells = if cell_area > 0.0 {
        occupied.iter().map(|o| o / cell_area).collect()
    } else {
        vec![0.0; occupied.len()]
    };
    db.grid_occupied = occupied;
}

fn rasterize(
    occupied: &mut [f64],
    cols: usize,
    rows: usize,
    gw: f64,
    gh: f64,
    pos: Point<f64>,
    width: f64,
    height: f64,
) {
    let block = Rect::centered(pos, width, height);

    let ur_row = (block.max.y / gh).floor() as i64;
    let ur_col = (block.max.x / gw).floor() as i64;
    let bl_row = (block.min.y / gh).floor() as i64;
    let bl_col = (block.min.x / gw).floor() as i64;

    // Below or left of the canvas entirely.
    if ur_row < 0 || ur_col < 0 {
        return;
    }
    let bl_row = bl_row.max(0);
    let bl_col = bl_col.max(0);
    let ur_row = ur_row.min(rows as i64 - 1);
    let ur_col = ur_col.min(cols as i64 - 1);

    for r in bl_row..=ur_row {
        for c in bl_col..=ur_col {
            let cell = Rect::new(
                Point::new(c as f64 * gw, r as f64 * gh),
                Point::new((c + 1) as f64 * gw, (r + 1) as f64 * gh),
            );
            occupied[r as usize * cols + c as usize] += cell.overlap_area(&block);
        }
    }
}

/// Half the average of the top-10% densest cells. The top-k sum divides by
/// the bucket size even when fewer cells are occupied; grids under 10 cells
/// average over the occupied cells instead.
pub fn density_cost(db: &mut PlacementDb) -> f64 {
    if db.dirty.contains(DirtyFlags::DENSITY) {
        compute_grid_density(db);
        db.dirty.clear(DirtyFlags::DENSITY);
    }

    let mut occupied: Vec<f64> = db
        .grid_cells
        .iter()
        .copied()
        .filter(|&c| c != 0.0)
        .collect();
    if occupied.is_empty() {
        return 0.0;
    }
    occupied.sort_by(|a, b| b.total_cmp(a));

    if db.grid_cells.len() < 10 {
        return 0.5 * (occupied.iter().sum::<f64>() / occupied.len() as f64);
    }

    let bucket = (db.grid_cells.len() as f64 * 0.1).floor() as usize;
    let top: f64 = occupied.iter().take(bucket).sum();
    0.5 * (top / bucket as f64)
}
