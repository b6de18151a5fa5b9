//! Pairwise force terms of the relaxer. Macros are approximated as squares
//! with their height as the side length.

use plc_common::db::core::PlacementDb;
use plc_common::db::indices::NodeId;

/// Distances below this count as coincident centers.
pub const TOUCH_EPS: f64 = 1e-10;

const SIGMOID_SHIFT: f64 = 50.0;

/// Overlap test on the square approximations, with optional displacements
/// applied to either module.
pub fn squares_overlap(
    db: &PlacementDb,
    u: NodeId,
    v: NodeId,
    u_disp: (f64, f64),
    v_disp: (f64, f64),
) -> bool {
    let mu = &db.modules[u.index()];
    let mv = &db.modules[v.index()];
    let u_side = mu.height();
    let v_side = mv.height();
    let u_pos = mu.pos();
    let v_pos = mv.pos();

    let u_x1 = u_pos.x + u_disp.0 - u_side / 2.0;
    let u_x2 = u_pos.x + u_disp.0 + u_side / 2.0;
    let u_y1 = u_pos.y + u_disp.1 + u_side / 2.0;
    let u_y2 = u_pos.y + u_disp.1 - u_side / 2.0;

    let v_x1 = v_pos.x + v_disp.0 - v_side / 2.0;
    let v_x2 = v_pos.x + v_disp.0 + v_side / 2.0;
    let v_y1 = v_pos.y + v_disp.1 + v_side / 2.0;
    let v_y2 = v_pos.y + v_disp.1 - v_side / 2.0;

    u_x1 < v_x2 && u_x2 > v_x1 && u_y1 > v_y2 && u_y2 < v_y1
}

/// Unit-direction repulsion between two soft macros, applied to every pair
/// regardless of separation. Coincident centers break the tie along both
/// axes with `sqrt(repel_factor)`.
pub fn repulsive_force(
    repel_factor: f64,
    db: &PlacementDb,
    node_i: NodeId,
    node_j: NodeId,
) -> (f64, f64) {
    if repel_factor == 0.0 {
        return (0.0, 0.0);
    }
    let d = db.modules[node_i.index()].pos() - db.modules[node_j.index()].pos();
    let r = d.norm();
    if r <= TOUCH_EPS {
        return (repel_factor.sqrt(), repel_factor.sqrt());
    }
    (repel_factor * d.x / r, repel_factor * d.y / r)
}

/// Push a soft macro out of an overlapping hard macro by the sum of the
/// half-sides along the center-to-center direction. Non-overlapping pairs
/// contribute nothing, as do coincident centers (no usable direction).
pub fn soft_hard_repulsive_force(
    db: &PlacementDb,
    soft: NodeId,
    hard: NodeId,
) -> (f64, f64) {
    let d = db.modules[soft.index()].pos() - db.modules[hard.index()].pos();
    let r = d.norm();

    if r > TOUCH_EPS && squares_overlap(db, soft, hard, (0.0, 0.0), (0.0, 0.0)) {
        let push = db.modules[soft.index()].height() / 2.0
            + db.modules[hard.index()].height() / 2.0;
        return (d.x / r * push, d.y / r * push);
    }
    (0.0, 0.0)
}

/// Attraction over the edge-to-edge gap between two macros, scaled by
/// `factor * gap^exponent`. Overlapping or corner-touching pairs contribute
/// nothing.
pub fn attractive_force(
    factor: f64,
    exponent: i32,
    db: &PlacementDb,
    node_i: NodeId,
    node_j: NodeId,
) -> (f64, f64) {
    let m_i = &db.modules[node_i.index()];
    let m_j = &db.modules[node_j.index()];

    let x_dist = m_i.pos().x - m_j.pos().x - m_i.height() / 2.0 - m_j.height() / 2.0;
    let y_dist = m_i.pos().y - m_j.pos().y - m_i.height() / 2.0 - m_j.height() / 2.0;
    let r = x_dist.hypot(y_dist);

    if r <= 0.0 || squares_overlap(db, node_i, node_j, (0.0, 0.0), (0.0, 0.0)) {
        return (0.0, 0.0);
    }
    let f = factor * r.powi(exponent);
    (x_dist / r * f, y_dist / r * f)
}

/// Shifted sigmoid damping an axis force: sign(x) / (exp(-|x| + 50) + 1).
pub fn shifted_sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / ((-x + SIGMOID_SHIFT).exp() + 1.0)
    } else {
        -1.0 / ((x + SIGMOID_SHIFT).exp() + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_odd_and_saturates() {
        assert!(shifted_sigmoid(0.0) > 0.0);
        assert!(shifted_sigmoid(0.0) < 1e-20);
        assert_eq!(shifted_sigmoid(5.0), -shifted_sigmoid(-5.0));
        assert!((shifted_sigmoid(100.0) - 1.0).abs() < 1e-10);
        assert!((shifted_sigmoid(-100.0) + 1.0).abs() < 1e-10);
    }
}
