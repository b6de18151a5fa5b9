//! Routing-congestion model: every net is decomposed into rectilinear H/V
//! segments on the grid, placed hard macros consume routing resources over
//! the cells they cover, and both demands are normalized against the
//! per-cell route supply.

use plc_common::db::core::{DirtyFlags, PlacementDb};
use plc_common::db::indices::NodeId;
use plc_common::db::module::Module;
use plc_common::geom::point::Point;
use plc_common::geom::rect::Rect;

/// Grid cell as (row, col); unclamped, so off-canvas endpoints stay
/// representable and their out-of-grid segments are dropped on write.
type GCell = (i64, i64);

struct Grids {
    cols: usize,
    rows: usize,
    v_net: Vec<f64>,
    h_net: Vec<f64>,
    v_macro: Vec<f64>,
    h_macro: Vec<f64>,
}

impl Grids {
    fn bump_h(&mut self, row: i64, col: i64, weight: f64) {
        if row >= 0 && (row as usize) < self.rows && col >= 0 && (col as usize) < self.cols {
            self.h_net[row as usize * self.cols + col as usize] += weight;
        }
    }

    fn bump_v(&mut self, row: i64, col: i64, weight: f64) {
        if row >= 0 && (row as usize) < self.rows && col >= 0 && (col as usize) < self.cols {
            self.v_net[row as usize * self.cols + col as usize] += weight;
        }
    }
}

/// Recompute all four congestion grids and clear the congestion flag.
pub fn compute_routing(db: &mut PlacementDb) {
    let cols = db.grid_col;
    let rows = db.grid_row;
    let gw = db.grid_width();
    let gh = db.grid_height();
    let v_supply = gw * db.vroutes_per_micron;
    let h_supply = gh * db.hroutes_per_micron;

    let mut grids = Grids {
        cols,
        rows,
        v_net: vec![0.0; cols * rows],
        h_net: vec![0.0; cols * rows],
        v_macro: vec![0.0; cols * rows],
        h_macro: vec![0.0; cols * rows],
    };

    for idx in 0..db.modules.len() {
        match &db.modules[idx] {
            Module::Port(port) => {
                if port.sink.is_empty() {
                    continue;
                }
                let source = db.cell_of(port.pos);
                let cells = net_cells(db, source, &port.sink);
                route_net(&mut grids, source, &cells, 1.0);
            }
            Module::SoftMacroPin(pin) | Module::HardMacroPin(pin) => {
                if pin.sink.is_empty() {
                    continue;
                }
                let source = db.cell_of(db.pin_position(NodeId::new(idx)));
                let weight = if pin.weight > 1.0 { pin.weight } else { 1.0 };
                let cells = net_cells(db, source, &pin.sink);
                route_net(&mut grids, source, &cells, weight);
            }
            Module::HardMacro(m) => {
                if m.placed {
                    route_macro(&mut grids, gw, gh, m.pos, m.width, m.height,
                        db.vrouting_alloc, db.hrouting_alloc);
                }
            }
            _ => {}
        }
    }

    if v_supply > 0.0 {
        for x in grids.v_net.iter_mut().chain(grids.v_macro.iter_mut()) {
            *x /= v_supply;
        }
    }
    if h_supply > 0.0 {
        for x in grids.h_net.iter_mut().chain(grids.h_macro.iter_mut()) {
            *x /= h_supply;
        }
    }

    // Smooth the net demand only; macro occupancy stays sharp.
    let smooth = db.smooth_range;
    grids.v_net = smooth_rowwise(&grids.v_net, cols, rows, smooth);
    grids.h_net = smooth_columnwise(&grids.h_net, cols, rows, smooth);

    for i in 0..cols * rows {
        grids.v_net[i] += grids.v_macro[i];
        grids.h_net[i] += grids.h_macro[i];
    }

    db.v_routing_cong = grids.v_net;
    db.h_routing_cong = grids.h_net;
    db.v_macro_routing_cong = grids.v_macro;
    db.h_macro_routing_cong = grids.h_macro;
    db.dirty.clear(DirtyFlags::CONGESTION);
}

/// Distinct grid cells of a net: the driver cell plus every resolved sink
/// cell, in first-seen order.
fn net_cells(
    db: &PlacementDb,
    source: GCell,
    sinks: &plc_common::db::module::SinkMap,
) -> Vec<GCell> {
    let mut cells = vec![source];
    for sink_names in sinks.values() {
        for sink_name in sink_names {
            let Some(&sink_idx) = db.name_to_index.get(sink_name) else {
                log::warn!("routing: unknown sink '{sink_name}'");
                continue;
            };
            let cell = db.cell_of(db.pin_position(sink_idx));
            if !cells.contains(&cell) {
                cells.push(cell);
            }
        }
    }
    cells
}

fn route_net(grids: &mut Grids, source: GCell, cells: &[GCell], weight: f64) {
    match cells.len() {
        0 | 1 => {}
        2 => {
            let sink = if cells[0] == source { cells[1] } else { cells[0] };
            route_two_pin(grids, source, sink, weight);
        }
        3 => route_three_pin(grids, cells, weight),
        // Larger nets decompose into a star of two-pin nets at the driver.
        _ => {
            for &cell in cells {
                if cell != source {
                    route_two_pin(grids, source, cell, weight);
                }
            }
        }
    }
}

/// Horizontal along the driver's row, vertical along the sink's column.
fn route_two_pin(grids: &mut Grids, source: GCell, sink: GCell, weight: f64) {
    let row_min = source.0.min(sink.0);
    let row_max = source.0.max(sink.0);
    let col_min = source.1.min(sink.1);
    let col_max = source.1.max(sink.1);

    for col in col_min..col_max {
        grids.bump_h(source.0, col, weight);
    }
    for row in row_min..row_max {
        grids.bump_v(row, sink.1, weight);
    }
}

fn route_three_pin(grids: &mut Grids, cells: &[GCell], weight: f64) {
    let mut sorted = cells.to_vec();
    // Sort by (x, y).
    sorted.sort_by_key(|&(row, col)| (col, row));
    let (y1, x1) = sorted[0];
    let (y2, x2) = sorted[1];
    let (y3, x3) = sorted[2];

    if x1 < x2 && x2 < x3 && y1.min(y3) < y2 && y1.max(y3) > y2 {
        route_l_shape(grids, &sorted, weight);
    } else if x2 == x3 && x1 < x2 && y1 < y2.min(y3) {
        for col in x1..x2 {
            grids.bump_h(y1, col, weight);
        }
        for row in y1..y2.max(y3) {
            grids.bump_v(row, x2, weight);
        }
    } else if y2 == y3 {
        for col in x1..x2 {
            grids.bump_h(y1, col, weight);
        }
        for col in x2..x3 {
            grids.bump_h(y2, col, weight);
        }
        for row in y1.min(y2)..y1.max(y2) {
            grids.bump_v(row, x2, weight);
        }
    } else {
        route_t_shape(grids, &sorted, weight);
    }
}

fn route_l_shape(grids: &mut Grids, sorted: &[GCell], weight: f64) {
    let (y1, x1) = sorted[0];
    let (y2, x2) = sorted[1];
    let (y3, x3) = sorted[2];

    for col in x1..x2 {
        grids.bump_h(y1, col, weight);
    }
    for col in x2..x3 {
        grids.bump_h(y2, col, weight);
    }
    for row in y1.min(y2)..y1.max(y2) {
        grids.bump_v(row, x2, weight);
    }
    for row in y2.min(y3)..y2.max(y3) {
        grids.bump_v(row, x3, weight);
    }
}

fn route_t_shape(grids: &mut Grids, cells: &[GCell], weight: f64) {
    let mut sorted = cells.to_vec();
    // Sort by (y, x): the trunk runs on the middle row.
    sorted.sort();
    let (y1, x1) = sorted[0];
    let (y2, x2) = sorted[1];
    let (y3, x3) = sorted[2];
    let xmin = x1.min(x2).min(x3);
    let xmax = x1.max(x2).max(x3);

    for col in xmin..xmax {
        grids.bump_h(y2, col, weight);
    }
    for row in y1.min(y2)..y1.max(y2) {
        grids.bump_v(row, x1, weight);
    }
    for row in y2.min(y3)..y2.max(y3) {
        grids.bump_v(row, x3, weight);
    }
}

/// Occupancy of a placed hard macro: every covered cell consumes routing
/// proportional to the per-axis overlap extent. When the box splits a cell
/// boundary partially, the top row's vertical share (and the right column's
/// horizontal share) is handed back once, approximating route continuity
/// across cells.
fn route_macro(
    grids: &mut Grids,
    gw: f64,
    gh: f64,
    pos: Point<f64>,
    width: f64,
    height: f64,
    v_alloc: f64,
    h_alloc: f64,
) {
    let block = Rect::centered(pos, width, height);

    let ur_row = (block.max.y / gh).floor() as i64;
    let ur_col = (block.max.x / gw).floor() as i64;
    let bl_row = (block.min.y / gh).floor() as i64;
    let bl_col = (block.min.x / gw).floor() as i64;

    if ur_row < 0 || ur_col < 0 {
        return;
    }
    let bl_row = bl_row.max(0);
    let bl_col = bl_col.max(0);
    let ur_row = ur_row.min(grids.rows as i64 - 1);
    let ur_col = ur_col.min(grids.cols as i64 - 1);
    if bl_row > ur_row || bl_col > ur_col {
        return;
    }

    let cell_rect = |r: i64, c: i64| {
        Rect::new(
            Point::new(c as f64 * gw, r as f64 * gh),
            Point::new((c + 1) as f64 * gw, (r + 1) as f64 * gh),
        )
    };

    let mut partial_vertical = false;
    let mut partial_horizontal = false;

    for r in bl_row..=ur_row {
        for c in bl_col..=ur_col {
            let (x_dist, y_dist) = block.overlap_dist(&cell_rect(r, c));

            if ur_row != bl_row
                && (r == bl_row || r == ur_row)
                && (y_dist - gh).abs() > 1e-5
            {
                partial_vertical = true;
            }
            if ur_col != bl_col
                && (c == bl_col || c == ur_col)
                && (x_dist - gw).abs() > 1e-5
            {
                partial_horizontal = true;
            }

            let cell = r as usize * grids.cols + c as usize;
            grids.v_macro[cell] += x_dist * v_alloc;
            grids.h_macro[cell] += y_dist * h_alloc;
        }
    }

    if partial_vertical {
        for c in bl_col..=ur_col {
            let (x_dist, _) = block.overlap_dist(&cell_rect(ur_row, c));
            grids.v_macro[ur_row as usize * grids.cols + c as usize] -= x_dist * v_alloc;
        }
    }
    if partial_horizontal {
        for r in bl_row..=ur_row {
            let (_, y_dist) = block.overlap_dist(&cell_rect(r, ur_col));
            grids.h_macro[r as usize * grids.cols + ur_col as usize] -= y_dist * h_alloc;
        }
    }
}

/// 1-D box filter along rows; the divisor is the in-bounds window width.
fn smooth_rowwise(grid: &[f64], cols: usize, rows: usize, range: usize) -> Vec<f64> {
    let mut out = vec![0.0; grid.len()];
    for row in 0..rows {
        for col in 0..cols {
            let lo = col.saturating_sub(range);
            let hi = (col + range).min(cols - 1);
            let val = grid[row * cols + col] / (hi - lo + 1) as f64;
            for ptr in lo..=hi {
                out[row * cols + ptr] += val;
            }
        }
    }
    out
}

/// 1-D box filter along columns.
fn smooth_columnwise(grid: &[f64], cols: usize, rows: usize, range: usize) -> Vec<f64> {
    let mut out = vec![0.0; grid.len()];
    for row in 0..rows {
        for col in 0..cols {
            let lo = row.saturating_sub(range);
            let hi = (row + range).min(rows - 1);
            let val = grid[row * cols + col] / (hi - lo + 1) as f64;
            for ptr in lo..=hi {
                out[ptr * cols + col] += val;
            }
        }
    }
    out
}

fn ensure_routing(db: &mut PlacementDb) {
    if db.dirty.contains(DirtyFlags::CONGESTION) {
        compute_routing(db);
    }
}

pub fn vertical_routing_congestion(db: &mut PlacementDb) -> &[f64] {
    ensure_routing(db);
    &db.v_routing_cong
}

pub fn horizontal_routing_congestion(db: &mut PlacementDb) -> &[f64] {
    ensure_routing(db);
    &db.h_routing_cong
}

/// Mean of the top 5% cells over both axes combined.
pub fn congestion_cost(db: &mut PlacementDb) -> f64 {
    ensure_routing(db);
    let mut all: Vec<f64> = db
        .v_routing_cong
        .iter()
        .chain(db.h_routing_cong.iter())
        .copied()
        .collect();
    if all.is_empty() {
        return 0.0;
    }
    all.sort_by(|a, b| b.total_cmp(a));
    let count = (all.len() as f64 * 0.05).floor() as usize;
    if count == 0 {
        return all[0];
    }
    all[..count].iter().sum::<f64>() / count as f64
}

pub fn vertical_congestion_cost(db: &mut PlacementDb) -> f64 {
    ensure_routing(db);
    axis_cost(&db.v_routing_cong)
}

pub fn horizontal_congestion_cost(db: &mut PlacementDb) -> f64 {
    ensure_routing(db);
    axis_cost(&db.h_routing_cong)
}

/// Mean of the top 10% cells on one axis, counting only occupied cells but
/// dividing by the bucket size; small grids average the occupied cells.
fn axis_cost(grid: &[f64]) -> f64 {
    let mut occupied: Vec<f64> = grid.iter().copied().filter(|&g| g != 0.0).collect();
    if occupied.is_empty() {
        return 0.0;
    }
    occupied.sort_by(|a, b| b.total_cmp(a));

    if grid.len() < 10 {
        return occupied.iter().sum::<f64>() / occupied.len() as f64;
    }

    let count = (grid.len() as f64 * 0.1).floor() as usize;
    occupied.iter().take(count).sum::<f64>() / count as f64
}
