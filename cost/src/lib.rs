pub mod congestion;
pub mod density;
pub mod wirelength;

use plc_common::db::core::PlacementDb;

/// All proxy metrics of one placement, as reported to the reward signal.
#[derive(Clone, Copy, Debug)]
pub struct CostSummary {
    pub wirelength: f64,
    pub wirelength_cost: f64,
    pub density_cost: f64,
    pub congestion_cost: f64,
}

pub fn compute_all(db: &mut PlacementDb) -> CostSummary {
    CostSummary {
        wirelength: wirelength::wirelength(db),
        wirelength_cost: wirelength::wirelength_cost(db),
        density_cost: density::density_cost(db),
        congestion_cost: congestion::congestion_cost(db),
    }
}
