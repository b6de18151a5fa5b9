use crate::db::indices::{CellId, NodeId};
use crate::db::module::{Module, Orientation};
use crate::error::PlcError;
use crate::geom::point::Point;
use crate::geom::rect::Rect;
use std::collections::HashMap;
use std::ops::BitOr;
use std::path::PathBuf;

/// Footprint used for mask queries on point-like modules (ports, pins).
const POINT_FOOTPRINT: f64 = 1e-3;

/// Bitset of cached results invalidated by mutations. Cost getters clear
/// the matching bit after recomputing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirtyFlags(u8);

impl DirtyFlags {
    pub const WIRELENGTH: DirtyFlags = DirtyFlags(1 << 0);
    pub const DENSITY: DirtyFlags = DirtyFlags(1 << 1);
    pub const CONGESTION: DirtyFlags = DirtyFlags(1 << 2);
    pub const NODE_MASK: DirtyFlags = DirtyFlags(1 << 3);
    pub const ALL: DirtyFlags = DirtyFlags(0b1111);

    pub fn set(&mut self, flags: DirtyFlags) {
        self.0 |= flags.0;
    }

    pub fn clear(&mut self, flags: DirtyFlags) {
        self.0 &= !flags.0;
    }

    pub fn contains(&self, flags: DirtyFlags) -> bool {
        self.0 & flags.0 == flags.0
    }
}

impl BitOr for DirtyFlags {
    type Output = DirtyFlags;
    fn bitor(self, rhs: DirtyFlags) -> DirtyFlags {
        DirtyFlags(self.0 | rhs.0)
    }
}

/// Placement database: the module table, canvas/grid model, placement
/// state, and the scratch grids the cost engines fill in.
#[derive(Debug)]
pub struct PlacementDb {
    pub netlist_file: Option<PathBuf>,
    pub init_plc: Option<PathBuf>,
    pub project_name: String,
    pub block_name: String,

    // Canvas and grid.
    pub width: f64,
    pub height: f64,
    pub grid_col: usize,
    pub grid_row: usize,

    // Routing model configuration.
    pub hroutes_per_micron: f64,
    pub vroutes_per_micron: f64,
    pub hrouting_alloc: f64,
    pub vrouting_alloc: f64,
    pub smooth_range: usize,
    pub overlap_threshold: f64,
    pub canvas_boundary_check: bool,

    /// Weighted net count accumulated at parse time.
    pub net_count: f64,

    /// Every module including pins, in netlist insertion order.
    pub modules: Vec<Module>,
    pub name_to_index: HashMap<String, NodeId>,

    pub port_indices: Vec<NodeId>,
    pub hard_macro_indices: Vec<NodeId>,
    pub soft_macro_indices: Vec<NodeId>,
    pub hard_macro_pin_indices: Vec<NodeId>,
    pub soft_macro_pin_indices: Vec<NodeId>,

    /// Macro name to its pin names.
    pub macro_to_pins: HashMap<String, Vec<String>>,

    /// Modules placed through `place_node`, in placement order.
    pub placed_macro: Vec<NodeId>,

    /// Per-cell legality bitmap, row-major, seeded to all ones.
    pub node_mask: Vec<u8>,

    // Scratch grids owned here, filled by the cost engines.
    pub grid_occupied: Vec<f64>,
    pub grid_cells: Vec<f64>,
    pub v_routing_cong: Vec<f64>,
    pub h_routing_cong: Vec<f64>,
    pub v_macro_routing_cong: Vec<f64>,
    pub h_macro_routing_cong: Vec<f64>,

    pub dirty: DirtyFlags,
}

impl PlacementDb {
    pub(crate) fn empty() -> Self {
        Self {
            netlist_file: None,
            init_plc: None,
            project_name: "macro_place".to_string(),
            block_name: "unknown".to_string(),
            width: 0.0,
            height: 0.0,
            grid_col: 10,
            grid_row: 10,
            hroutes_per_micron: 0.0,
            vroutes_per_micron: 0.0,
            hrouting_alloc: 0.0,
            vrouting_alloc: 0.0,
            smooth_range: 0,
            overlap_threshold: 0.0,
            canvas_boundary_check: true,
            net_count: 0.0,
            modules: Vec::new(),
            name_to_index: HashMap::new(),
            port_indices: Vec::new(),
            hard_macro_indices: Vec::new(),
            soft_macro_indices: Vec::new(),
            hard_macro_pin_indices: Vec::new(),
            soft_macro_pin_indices: Vec::new(),
            macro_to_pins: HashMap::new(),
            placed_macro: Vec::new(),
            node_mask: Vec::new(),
            grid_occupied: Vec::new(),
            grid_cells: Vec::new(),
            v_routing_cong: Vec::new(),
            h_routing_cong: Vec::new(),
            v_macro_routing_cong: Vec::new(),
            h_macro_routing_cong: Vec::new(),
            dirty: DirtyFlags::ALL,
        }
    }

    /// Sizes the default canvas from total module area at 60% utilization
    /// and allocates the grids. Called once after parsing.
    pub(crate) fn finish_init(&mut self) {
        let side = (self.total_area() / 0.6).sqrt();
        self.width = side;
        self.height = side;
        let cells = self.num_cells();
        self.v_routing_cong = vec![0.0; cells];
        self.h_routing_cong = vec![0.0; cells];
        self.v_macro_routing_cong = vec![0.0; cells];
        self.h_macro_routing_cong = vec![0.0; cells];
        self.node_mask = vec![1; cells];
    }

    pub fn from_netlist_file(path: impl Into<PathBuf>) -> Result<Self, PlcError> {
        crate::db::parser::netlist::read_netlist_file(path.into())
    }

    pub fn from_netlist_source(source: &str) -> Result<Self, PlcError> {
        crate::db::parser::netlist::read_netlist_source(source)
    }

    // ------------------------------------------------------------------
    // Counts and index partitions
    // ------------------------------------------------------------------

    pub fn mod_count(&self) -> usize {
        self.port_indices.len() + self.hard_macro_indices.len() + self.soft_macro_indices.len()
    }

    pub fn ports_count(&self) -> usize {
        self.port_indices.len()
    }
    pub fn hard_macro_count(&self) -> usize {
        self.hard_macro_indices.len()
    }
    pub fn soft_macro_count(&self) -> usize {
        self.soft_macro_indices.len()
    }
    pub fn hard_macro_pin_count(&self) -> usize {
        self.hard_macro_pin_indices.len()
    }
    pub fn soft_macro_pin_count(&self) -> usize {
        self.soft_macro_pin_indices.len()
    }

    /// Hard and soft macro indices, ascending.
    pub fn macro_indices(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .hard_macro_indices
            .iter()
            .chain(self.soft_macro_indices.iter())
            .copied()
            .collect();
        ids.sort();
        ids
    }

    /// Ports plus hard and soft macros, ascending. Pins are not placeable.
    pub fn placeable_indices(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .port_indices
            .iter()
            .chain(self.hard_macro_indices.iter())
            .chain(self.soft_macro_indices.iter())
            .copied()
            .collect();
        ids.sort();
        ids
    }

    pub fn total_area(&self) -> f64 {
        self.modules.iter().map(|m| m.area()).sum()
    }

    // ------------------------------------------------------------------
    // Module access
    // ------------------------------------------------------------------

    pub fn module(&self, idx: NodeId) -> Result<&Module, PlcError> {
        self.modules
            .get(idx.index())
            .ok_or(PlcError::IndexOutOfRange(idx.index()))
    }

    pub fn module_mut(&mut self, idx: NodeId) -> Result<&mut Module, PlcError> {
        self.modules
            .get_mut(idx.index())
            .ok_or(PlcError::IndexOutOfRange(idx.index()))
    }

    pub fn node_name(&self, idx: NodeId) -> Result<&str, PlcError> {
        Ok(self.module(idx)?.name())
    }

    pub fn node_index(&self, name: &str) -> Result<NodeId, PlcError> {
        self.name_to_index
            .get(name)
            .copied()
            .ok_or_else(|| PlcError::Parse(format!("module '{name}' not found")))
    }

    pub fn is_node_soft_macro(&self, idx: NodeId) -> Result<bool, PlcError> {
        Ok(self.module(idx)?.is_soft_macro())
    }

    pub fn is_node_hard_macro(&self, idx: NodeId) -> Result<bool, PlcError> {
        Ok(self.module(idx)?.is_hard_macro())
    }

    pub fn is_node_fixed(&self, idx: NodeId) -> Result<bool, PlcError> {
        let m = self.placeable(idx, "query the fixed flag of")?;
        Ok(m.fixed())
    }

    pub fn is_node_placed(&self, idx: NodeId) -> Result<bool, PlcError> {
        let m = self.placeable(idx, "query the placed flag of")?;
        Ok(m.placed())
    }

    /// Parent macro of a pin; `None` for every other module kind.
    pub fn ref_node_id(&self, idx: NodeId) -> Option<NodeId> {
        self.modules.get(idx.index()).and_then(|m| m.parent())
    }

    /// Resolved position of a pin or port: ports sit at their own position,
    /// hard-macro pins at parent position plus rotated offset, soft-macro
    /// pins at the parent position.
    pub fn pin_position(&self, idx: NodeId) -> Point<f64> {
        let m = &self.modules[idx.index()];
        match m.parent() {
            Some(parent) => self.modules[parent.index()].pos() + m.offset(),
            None => m.pos(),
        }
    }

    fn placeable(&self, idx: NodeId, action: &str) -> Result<&Module, PlcError> {
        let m = self.module(idx)?;
        if !m.is_placeable() {
            return Err(PlcError::TypeMismatch(format!(
                "cannot {action} {} '{}'; only ports and macros are placeable",
                m.kind(),
                m.name()
            )));
        }
        Ok(m)
    }

    // ------------------------------------------------------------------
    // Grid model
    // ------------------------------------------------------------------

    pub fn num_cells(&self) -> usize {
        self.grid_col * self.grid_row
    }

    pub fn grid_width(&self) -> f64 {
        self.width / self.grid_col as f64
    }

    pub fn grid_height(&self) -> f64 {
        self.height / self.grid_row as f64
    }

    /// (row, col) of the cell containing a position. Unclamped: positions
    /// off the canvas map to out-of-range coordinates.
    pub fn cell_of(&self, pos: Point<f64>) -> (i64, i64) {
        let row = (pos.y / self.grid_height()).floor() as i64;
        let col = (pos.x / self.grid_width()).floor() as i64;
        (row, col)
    }

    pub fn cell_center(&self, row: usize, col: usize) -> Point<f64> {
        Point::new(
            (col as f64 + 0.5) * self.grid_width(),
            (row as f64 + 0.5) * self.grid_height(),
        )
    }

    pub fn cell_index(&self, row: usize, col: usize) -> CellId {
        CellId::new(row * self.grid_col + col)
    }

    pub fn cell_position(&self, cell: CellId) -> Point<f64> {
        let row = cell.index() / self.grid_col;
        let col = cell.index() % self.grid_col;
        self.cell_center(row, col)
    }

    /// Grid cell of a macro's center, ties broken toward the upper right.
    pub fn grid_cell_of_node(&self, idx: NodeId) -> Result<CellId, PlcError> {
        let m = self.module(idx)?;
        if !m.is_soft_macro() && !m.is_hard_macro() {
            return Err(PlcError::TypeMismatch(format!(
                "cannot resolve the grid cell of {} '{}'; only macros occupy cells",
                m.kind(),
                m.name()
            )));
        }
        let (row, col) = self.cell_of(m.pos());
        Ok(CellId::new((row * self.grid_col as i64 + col) as usize))
    }

    pub fn reset_node_mask(&mut self) {
        self.node_mask = vec![1; self.num_cells()];
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    pub fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.dirty
            .set(DirtyFlags::CONGESTION | DirtyFlags::DENSITY | DirtyFlags::NODE_MASK);
        self.reset_node_mask();
    }

    pub fn set_placement_grid(&mut self, grid_col: usize, grid_row: usize) {
        log::info!("placement grid: {grid_col} cols x {grid_row} rows");
        self.grid_col = grid_col;
        self.grid_row = grid_row;
        self.dirty
            .set(DirtyFlags::CONGESTION | DirtyFlags::DENSITY | DirtyFlags::NODE_MASK);
        let cells = self.num_cells();
        self.v_routing_cong = vec![0.0; cells];
        self.h_routing_cong = vec![0.0; cells];
        self.v_macro_routing_cong = vec![0.0; cells];
        self.h_macro_routing_cong = vec![0.0; cells];
        self.reset_node_mask();
    }

    pub fn set_routes_per_micron(&mut self, hroutes: f64, vroutes: f64) {
        self.dirty.set(DirtyFlags::CONGESTION);
        self.hroutes_per_micron = hroutes;
        self.vroutes_per_micron = vroutes;
    }

    pub fn set_macro_routing_allocation(&mut self, hrouting: f64, vrouting: f64) {
        self.dirty.set(DirtyFlags::CONGESTION);
        self.hrouting_alloc = hrouting;
        self.vrouting_alloc = vrouting;
    }

    pub fn set_congestion_smooth_range(&mut self, smooth_range: f64) {
        self.dirty.set(DirtyFlags::CONGESTION);
        self.smooth_range = smooth_range.floor() as usize;
    }

    pub fn set_overlap_threshold(&mut self, threshold: f64) {
        self.overlap_threshold = threshold;
    }

    pub fn set_canvas_boundary_check(&mut self, check: bool) {
        self.canvas_boundary_check = check;
    }

    pub fn set_block_name(&mut self, name: impl Into<String>) {
        self.block_name = name.into();
    }

    pub fn set_project_name(&mut self, name: impl Into<String>) {
        self.project_name = name.into();
    }

    // ------------------------------------------------------------------
    // Placement mutation
    // ------------------------------------------------------------------

    /// Place a node at the center of a grid cell and stamp its footprint
    /// out of the node mask. Fixed nodes and out-of-range cells leave the
    /// database untouched.
    pub fn place_node(&mut self, idx: NodeId, cell: CellId) -> Result<(), PlcError> {
        self.placeable(idx, "place")?;
        if cell.index() >= self.num_cells() {
            log::warn!(
                "invalid grid cell {} for '{}'; no node placed",
                cell.index(),
                self.modules[idx.index()].name()
            );
            return Ok(());
        }
        if self.modules[idx.index()].fixed() {
            return Ok(());
        }

        let pos = self.cell_position(cell);
        let width = self.modules[idx.index()].width();
        let height = self.modules[idx.index()].height();
        self.modules[idx.index()].set_pos(pos);
        self.modules[idx.index()].set_placed(true);
        self.placed_macro.push(idx);

        self.dirty
            .set(DirtyFlags::CONGESTION | DirtyFlags::DENSITY | DirtyFlags::WIRELENGTH);
        self.stamp_node_mask(cell, width, height);
        Ok(())
    }

    pub fn can_place_node(&self, idx: NodeId, cell: CellId) -> Result<bool, PlcError> {
        if cell.index() >= self.num_cells() {
            return Err(PlcError::IndexOutOfRange(cell.index()));
        }
        Ok(self.get_node_mask(idx)?[cell.index()] == 1)
    }

    pub fn unplace_node(&mut self, idx: NodeId) -> Result<(), PlcError> {
        self.placeable(idx, "unplace")?;
        if self.modules[idx.index()].fixed() {
            log::warn!(
                "trying to unplace fixed node '{}'",
                self.modules[idx.index()].name()
            );
            return Ok(());
        }
        match &self.modules[idx.index()] {
            Module::HardMacro(_) => {
                self.modules[idx.index()].set_placed(false);
                if let Some(at) = self.placed_macro.iter().position(|&p| p == idx) {
                    self.placed_macro.remove(at);
                }
                self.dirty
                    .set(DirtyFlags::CONGESTION | DirtyFlags::DENSITY | DirtyFlags::WIRELENGTH);
            }
            Module::SoftMacro(_) => {
                self.modules[idx.index()].set_placed(false);
                self.dirty
                    .set(DirtyFlags::CONGESTION | DirtyFlags::DENSITY | DirtyFlags::WIRELENGTH);
            }
            _ => {}
        }
        Ok(())
    }

    /// Clear the placed flag on every non-fixed module and reset the
    /// placement bookkeeping.
    pub fn unplace_all_nodes(&mut self) {
        for idx in self.placeable_indices() {
            let m = &mut self.modules[idx.index()];
            if m.fixed() {
                continue;
            }
            m.set_placed(false);
        }
        self.placed_macro.clear();
        self.dirty
            .set(DirtyFlags::CONGESTION | DirtyFlags::DENSITY | DirtyFlags::WIRELENGTH);
        self.reset_node_mask();
    }

    pub fn fix_node_coord(&mut self, idx: NodeId) -> Result<(), PlcError> {
        self.placeable(idx, "fix")?;
        self.modules[idx.index()].set_fixed(true);
        Ok(())
    }

    pub fn unfix_node_coord(&mut self, idx: NodeId) -> Result<(), PlcError> {
        self.placeable(idx, "unfix")?;
        self.modules[idx.index()].set_fixed(false);
        Ok(())
    }

    pub fn update_node_coords(&mut self, idx: NodeId, x: f64, y: f64) -> Result<(), PlcError> {
        self.placeable(idx, "move")?;
        self.modules[idx.index()].set_pos(Point::new(x, y));
        self.dirty
            .set(DirtyFlags::CONGESTION | DirtyFlags::DENSITY | DirtyFlags::WIRELENGTH);
        Ok(())
    }

    pub fn set_soft_macro_position(&mut self, idx: NodeId, x: f64, y: f64) -> Result<(), PlcError> {
        let m = self.module(idx)?;
        if !m.is_soft_macro() {
            return Err(PlcError::TypeMismatch(format!(
                "cannot reposition {} '{}'; only soft macros move freely",
                m.kind(),
                m.name()
            )));
        }
        self.modules[idx.index()].set_pos(Point::new(x, y));
        self.dirty
            .set(DirtyFlags::CONGESTION | DirtyFlags::DENSITY | DirtyFlags::WIRELENGTH);
        Ok(())
    }

    pub fn get_macro_orientation(&self, idx: NodeId) -> Result<Orientation, PlcError> {
        let m = self.module(idx)?;
        match m {
            Module::HardMacro(hm) => Ok(hm.orientation),
            _ => Err(PlcError::TypeMismatch(format!(
                "{} '{}' carries no orientation",
                m.kind(),
                m.name()
            ))),
        }
    }

    /// Set a hard macro's orientation and rotate its pin offsets in place.
    pub fn update_macro_orientation(
        &mut self,
        idx: NodeId,
        orientation: Orientation,
    ) -> Result<(), PlcError> {
        let name = {
            let m = self.module(idx)?;
            match m {
                Module::HardMacro(hm) => hm.name.clone(),
                _ => {
                    return Err(PlcError::TypeMismatch(format!(
                        "cannot orient {} '{}'; only hard macros are oriented",
                        m.kind(),
                        m.name()
                    )));
                }
            }
        };

        if let Module::HardMacro(hm) = &mut self.modules[idx.index()] {
            hm.orientation = orientation;
        }

        let pin_names = self.macro_to_pins.get(&name).cloned().unwrap_or_default();
        for pin_name in &pin_names {
            let Some(&pin_idx) = self.name_to_index.get(pin_name) else {
                continue;
            };
            if let Module::HardMacroPin(pin) = &mut self.modules[pin_idx.index()] {
                pin.offset = orientation.rotate_offset(pin.offset);
            }
        }

        self.dirty
            .set(DirtyFlags::CONGESTION | DirtyFlags::WIRELENGTH);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Node mask
    // ------------------------------------------------------------------

    fn node_pad_cells(&self, width: f64, height: f64) -> (i64, i64) {
        let hor = ((width / 2.0 - self.grid_width() / 2.0) / self.grid_width()).ceil() as i64;
        let ver = ((height / 2.0 - self.grid_height() / 2.0) / self.grid_height()).ceil() as i64;
        (hor.max(0), ver.max(0))
    }

    /// Zero out the mask cells covered by a footprint centered on `cell`,
    /// padded to whole cells.
    fn stamp_node_mask(&mut self, cell: CellId, width: f64, height: f64) {
        let row = (cell.index() / self.grid_col) as i64;
        let col = (cell.index() % self.grid_col) as i64;
        let (hor_pad, ver_pad) = self.node_pad_cells(width, height);

        let r0 = (row - ver_pad).max(0) as usize;
        let r1 = ((row + ver_pad) as usize).min(self.grid_row - 1);
        let c0 = (col - hor_pad).max(0) as usize;
        let c1 = ((col + hor_pad) as usize).min(self.grid_col - 1);
        for r in r0..=r1 {
            for c in c0..=c1 {
                self.node_mask[r * self.grid_col + c] = 0;
            }
        }
    }

    /// Legality bitmap for placing `idx` at each grid cell: the footprint
    /// must lie on the canvas (when boundary checking is enabled) and must
    /// not overlap any currently-placed macro. Ports and pins probe with a
    /// point-sized footprint.
    pub fn get_node_mask(&self, idx: NodeId) -> Result<Vec<u8>, PlcError> {
        let m = self.module(idx)?;
        let (mod_w, mod_h) = if m.is_port() || m.is_pin() {
            (POINT_FOOTPRINT, POINT_FOOTPRINT)
        } else {
            (m.width(), m.height())
        };

        let canvas = Rect::new(Point::new(0.0, 0.0), Point::new(self.width, self.height));
        let mut mask = vec![1u8; self.num_cells()];

        for i in 0..self.grid_row {
            for j in 0..self.grid_col {
                let mod_block = Rect::centered(self.cell_center(i, j), mod_w, mod_h);

                let out_of_bounds = self.canvas_boundary_check
                    && (canvas.overlap_area(&mod_block) - mod_w * mod_h).abs() > 1e-8;
                if out_of_bounds {
                    mask[i * self.grid_col + j] = 0;
                    continue;
                }

                for &placed_idx in &self.placed_macro {
                    let placed = &self.modules[placed_idx.index()];
                    if !placed.placed() {
                        continue;
                    }
                    let placed_block =
                        Rect::centered(placed.pos(), placed.width(), placed.height());
                    if placed_block.overlap_area(&mod_block) > 0.0 {
                        mask[i * self.grid_col + j] = 0;
                    }
                }
            }
        }
        Ok(mask)
    }

    // ------------------------------------------------------------------
    // Adjacency
    // ------------------------------------------------------------------

    /// Symmetric macro-to-macro connection matrix, flattened row-major over
    /// the sorted macro indices.
    pub fn get_macro_adjacency(&self) -> Vec<f64> {
        let macros = self.macro_indices();
        let n = macros.len();
        let mut adj = vec![0.0; n * n];

        for (row, &i) in macros.iter().enumerate() {
            for (col, &j) in macros.iter().enumerate() {
                let entry = self.connection_weight(i, j);
                adj[row * n + col] = entry;
                adj[col * n + row] = entry;
            }
        }
        adj
    }

    /// Macro adjacency extended with one row/column per occupied grid cell
    /// containing ports. Returns the flattened matrix and the occupied cell
    /// indices in ascending order.
    pub fn get_macro_and_clustered_port_adjacency(&self) -> (Vec<f64>, Vec<usize>) {
        let macros = self.macro_indices();

        // Cluster ports into their (clamped) grid cells, ordered by column.
        let mut clusters: Vec<((usize, usize), Vec<NodeId>)> = Vec::new();
        for &port_idx in &self.port_indices {
            let (row, col) = self.cell_of(self.modules[port_idx.index()].pos());
            let row = row.clamp(0, self.grid_row as i64 - 1) as usize;
            let col = col.clamp(0, self.grid_col as i64 - 1) as usize;
            match clusters.iter_mut().find(|(cell, _)| *cell == (col, row)) {
                Some((_, ports)) => ports.push(port_idx),
                None => clusters.push(((col, row), vec![port_idx])),
            }
        }
        clusters.sort_by_key(|(cell, _)| *cell);

        let n = macros.len() + clusters.len();
        let mut adj = vec![0.0; n * n];
        let mut cell_location = Vec::with_capacity(clusters.len());

        for (row, &i) in macros.iter().enumerate() {
            for (col, &j) in macros.iter().enumerate() {
                let entry = self.connection_weight(i, j);
                adj[row * n + col] = entry;
                adj[col * n + row] = entry;
            }
        }

        for (k, ((col, row), ports)) in clusters.iter().enumerate() {
            cell_location.push(row * self.grid_col + col);
            let cluster_row = macros.len() + k;
            for &port_idx in ports {
                for (col_idx, &macro_idx) in macros.iter().enumerate() {
                    let entry = self.connection_weight(port_idx, macro_idx);
                    adj[cluster_row * n + col_idx] += entry;
                    adj[col_idx * n + cluster_row] += entry;
                }
            }
        }

        cell_location.sort();
        (adj, cell_location)
    }

    /// Aggregated connection multiplicity between two modules, counting
    /// both directions.
    fn connection_weight(&self, i: NodeId, j: NodeId) -> f64 {
        let m_i = &self.modules[i.index()];
        let m_j = &self.modules[j.index()];
        let mut entry = 0.0;
        if let Some(conn) = m_j.connection() {
            entry += conn.get(m_i.name()).copied().unwrap_or(0.0);
        }
        if let Some(conn) = m_i.connection() {
            entry += conn.get(m_j.name()).copied().unwrap_or(0.0);
        }
        entry
    }
}
