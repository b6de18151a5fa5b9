use crate::db::core::PlacementDb;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub relax: RelaxConfig,
    #[serde(default)]
    pub project: ProjectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            canvas: CanvasConfig::default(),
            routing: RoutingConfig::default(),
            relax: RelaxConfig::default(),
            project: ProjectConfig::default(),
        }
    }
}

impl Config {
    /// Push the configured engine settings onto a freshly-loaded database.
    /// Unset canvas dimensions keep the area-derived default.
    pub fn apply_to(&self, db: &mut PlacementDb) {
        if let (Some(width), Some(height)) = (self.canvas.width, self.canvas.height) {
            db.set_canvas_size(width, height);
        }
        db.set_placement_grid(self.canvas.grid_cols, self.canvas.grid_rows);
        db.set_canvas_boundary_check(self.canvas.boundary_check);
        db.set_routes_per_micron(
            self.routing.routes_per_micron_hor,
            self.routing.routes_per_micron_ver,
        );
        db.set_macro_routing_allocation(
            self.routing.macro_routes_hor,
            self.routing.macro_routes_ver,
        );
        db.set_congestion_smooth_range(self.routing.smooth_range);
        db.set_overlap_threshold(self.routing.overlap_threshold);
        db.set_project_name(self.project.name.clone());
        if let Some(block) = &self.project.block {
            db.set_block_name(block.clone());
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CanvasConfig {
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default = "default_grid_cols")]
    pub grid_cols: usize,
    #[serde(default = "default_grid_rows")]
    pub grid_rows: usize,
    #[serde(default = "default_boundary_check")]
    pub boundary_check: bool,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            grid_cols: default_grid_cols(),
            grid_rows: default_grid_rows(),
            boundary_check: default_boundary_check(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RoutingConfig {
    #[serde(default = "default_routes_hor")]
    pub routes_per_micron_hor: f64,
    #[serde(default = "default_routes_ver")]
    pub routes_per_micron_ver: f64,
    #[serde(default = "default_macro_routes_hor")]
    pub macro_routes_hor: f64,
    #[serde(default = "default_macro_routes_ver")]
    pub macro_routes_ver: f64,
    #[serde(default = "default_smooth_range")]
    pub smooth_range: f64,
    #[serde(default = "default_overlap_threshold")]
    pub overlap_threshold: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            routes_per_micron_hor: default_routes_hor(),
            routes_per_micron_ver: default_routes_ver(),
            macro_routes_hor: default_macro_routes_hor(),
            macro_routes_ver: default_macro_routes_ver(),
            smooth_range: default_smooth_range(),
            overlap_threshold: default_overlap_threshold(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RelaxConfig {
    #[serde(default = "default_io_factor")]
    pub io_factor: f64,
    #[serde(default = "default_attract_exponent")]
    pub attract_exponent: i32,
    #[serde(default = "default_num_steps")]
    pub num_steps: Vec<usize>,
    #[serde(default = "default_max_move_distance")]
    pub max_move_distance: Vec<f64>,
    #[serde(default = "default_attract_factor")]
    pub attract_factor: Vec<f64>,
    #[serde(default = "default_repel_factor")]
    pub repel_factor: Vec<f64>,
}

impl Default for RelaxConfig {
    fn default() -> Self {
        Self {
            io_factor: default_io_factor(),
            attract_exponent: default_attract_exponent(),
            num_steps: default_num_steps(),
            max_move_distance: default_max_move_distance(),
            attract_factor: default_attract_factor(),
            repel_factor: default_repel_factor(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_project_name")]
    pub name: String,
    #[serde(default)]
    pub block: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            block: None,
        }
    }
}

fn default_grid_cols() -> usize {
    10
}

fn default_grid_rows() -> usize {
    10
}

fn default_boundary_check() -> bool {
    true
}

fn default_routes_hor() -> f64 {
    11.285
}

fn default_routes_ver() -> f64 {
    12.605
}

fn default_macro_routes_hor() -> f64 {
    7.143
}

fn default_macro_routes_ver() -> f64 {
    8.339
}

fn default_smooth_range() -> f64 {
    2.0
}

fn default_overlap_threshold() -> f64 {
    0.004
}

fn default_io_factor() -> f64 {
    1.0
}

fn default_attract_exponent() -> i32 {
    1
}

fn default_num_steps() -> Vec<usize> {
    vec![100, 100, 100]
}

fn default_max_move_distance() -> Vec<f64> {
    vec![100.0, 100.0, 100.0]
}

fn default_attract_factor() -> Vec<f64> {
    vec![100.0, 1.0e-3, 1.0e-5]
}

fn default_repel_factor() -> Vec<f64> {
    vec![0.0, 1.0e6, 1.0e7]
}

fn default_project_name() -> String {
    "macro_place".to_string()
}
