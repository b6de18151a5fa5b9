use crate::db::indices::NodeId;
use crate::error::PlcError;
use crate::geom::point::Point;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Canvas edge a port is pinned to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl FromStr for Side {
    type Err = PlcError;

    fn from_str(s: &str) -> Result<Self, PlcError> {
        match s {
            "TOP" => Ok(Side::Top),
            "BOTTOM" => Ok(Side::Bottom),
            "LEFT" => Ok(Side::Left),
            "RIGHT" => Ok(Side::Right),
            other => Err(PlcError::Parse(format!("unknown port side '{other}'"))),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Side::Top => "TOP",
            Side::Bottom => "BOTTOM",
            Side::Left => "LEFT",
            Side::Right => "RIGHT",
        };
        write!(f, "{s}")
    }
}

/// Macro orientation: the four rotations and their mirrored variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    N,
    FN,
    S,
    FS,
    E,
    FE,
    W,
    FW,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::N => "N",
            Orientation::FN => "FN",
            Orientation::S => "S",
            Orientation::FS => "FS",
            Orientation::E => "E",
            Orientation::FE => "FE",
            Orientation::W => "W",
            Orientation::FW => "FW",
        }
    }

    /// Rotate a pin offset by this orientation. Applied in place to the
    /// current offset, so consecutive applications compose.
    pub fn rotate_offset(&self, offset: Point<f64>) -> Point<f64> {
        let Point { x: dx, y: dy } = offset;
        match self {
            Orientation::N => Point::new(dx, dy),
            Orientation::FN => Point::new(-dx, dy),
            Orientation::S => Point::new(-dx, -dy),
            Orientation::FS => Point::new(dx, -dy),
            Orientation::E => Point::new(dy, -dx),
            Orientation::FE => Point::new(-dy, -dx),
            Orientation::W => Point::new(-dy, dx),
            Orientation::FW => Point::new(dy, dx),
        }
    }
}

impl FromStr for Orientation {
    type Err = PlcError;

    fn from_str(s: &str) -> Result<Self, PlcError> {
        match s {
            "N" => Ok(Orientation::N),
            "FN" => Ok(Orientation::FN),
            "S" => Ok(Orientation::S),
            "FS" => Ok(Orientation::FS),
            "E" => Ok(Orientation::E),
            "FE" => Ok(Orientation::FE),
            "W" => Ok(Orientation::W),
            "FW" => Ok(Orientation::FW),
            other => Err(PlcError::Parse(format!("unknown orientation '{other}'"))),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sink lists keyed by parent group: the sink's parent macro name, or the
/// port name itself for slash-free sink names.
pub type SinkMap = BTreeMap<String, Vec<String>>;

/// Aggregated connection multiplicities keyed by macro/port name.
pub type ConnectionMap = BTreeMap<String, f64>;

fn sink_group(name: &str) -> &str {
    match name.rsplit_once('/') {
        Some((parent, _)) => parent,
        None => name,
    }
}

pub fn add_sink(sinks: &mut SinkMap, sink_name: &str) {
    match sink_name.rsplit_once('/') {
        // Macro pin sink: append under its parent macro.
        Some((parent, _)) => sinks
            .entry(parent.to_string())
            .or_default()
            .push(sink_name.to_string()),
        // Port sink: the group holds exactly the port itself.
        None => {
            sinks.insert(sink_name.to_string(), vec![sink_name.to_string()]);
        }
    }
}

pub fn add_sinks(sinks: &mut SinkMap, sink_names: &[String]) {
    for name in sink_names {
        add_sink(sinks, name);
    }
}

/// Port-named groups are assigned the weight, macro-named groups accumulate
/// it.
pub fn add_connection(conn: &mut ConnectionMap, module_name: &str, weight: f64) {
    let group = sink_group(module_name);
    if group == module_name {
        conn.insert(module_name.to_string(), weight);
    } else {
        *conn.entry(group.to_string()).or_insert(0.0) += weight;
    }
}

pub fn add_connections(conn: &mut ConnectionMap, module_names: &[String], weight: f64) {
    for name in module_names {
        add_connection(conn, name, weight);
    }
}

#[derive(Clone, Debug)]
pub struct Port {
    pub name: String,
    pub pos: Point<f64>,
    pub side: Side,
    pub sink: SinkMap,
    pub connection: ConnectionMap,
    pub fixed: bool,
    pub placed: bool,
}

impl Port {
    pub fn new(name: String, pos: Point<f64>, side: Side) -> Self {
        Self {
            name,
            pos,
            side,
            sink: SinkMap::new(),
            connection: ConnectionMap::new(),
            // Ports are pinned to the boundary.
            fixed: true,
            placed: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SoftMacro {
    pub name: String,
    pub pos: Point<f64>,
    pub width: f64,
    pub height: f64,
    pub orientation: Option<Orientation>,
    pub connection: ConnectionMap,
    pub fixed: bool,
    pub placed: bool,
}

impl SoftMacro {
    pub fn new(name: String, pos: Point<f64>, width: f64, height: f64) -> Self {
        Self {
            name,
            pos,
            width,
            height,
            orientation: None,
            connection: ConnectionMap::new(),
            fixed: false,
            placed: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HardMacro {
    pub name: String,
    pub pos: Point<f64>,
    pub width: f64,
    pub height: f64,
    pub orientation: Orientation,
    pub connection: ConnectionMap,
    pub fixed: bool,
    pub placed: bool,
}

impl HardMacro {
    pub fn new(
        name: String,
        pos: Point<f64>,
        width: f64,
        height: f64,
        orientation: Orientation,
    ) -> Self {
        Self {
            name,
            pos,
            width,
            height,
            orientation,
            connection: ConnectionMap::new(),
            fixed: false,
            placed: true,
        }
    }
}

/// Pin of a soft or hard macro. Soft-macro pins carry a zero offset; the
/// parent index is resolved once after parse, the name is kept for
/// serialization.
#[derive(Clone, Debug)]
pub struct MacroPin {
    pub name: String,
    pub pos: Point<f64>,
    pub offset: Point<f64>,
    pub macro_name: String,
    pub parent: Option<NodeId>,
    pub weight: f64,
    pub sink: SinkMap,
}

impl MacroPin {
    pub fn new(name: String, pos: Point<f64>, offset: Point<f64>, macro_name: String) -> Self {
        Self {
            name,
            pos,
            offset,
            macro_name,
            parent: None,
            weight: 1.0,
            sink: SinkMap::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Module {
    Port(Port),
    SoftMacro(SoftMacro),
    HardMacro(HardMacro),
    SoftMacroPin(MacroPin),
    HardMacroPin(MacroPin),
}

impl Module {
    pub fn name(&self) -> &str {
        match self {
            Module::Port(p) => &p.name,
            Module::SoftMacro(m) => &m.name,
            Module::HardMacro(m) => &m.name,
            Module::SoftMacroPin(p) | Module::HardMacroPin(p) => &p.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Module::Port(_) => "PORT",
            Module::SoftMacro(_) => "macro",
            Module::HardMacro(_) => "MACRO",
            Module::SoftMacroPin(_) => "macro_pin",
            Module::HardMacroPin(_) => "MACRO_PIN",
        }
    }

    pub fn pos(&self) -> Point<f64> {
        match self {
            Module::Port(p) => p.pos,
            Module::SoftMacro(m) => m.pos,
            Module::HardMacro(m) => m.pos,
            Module::SoftMacroPin(p) | Module::HardMacroPin(p) => p.pos,
        }
    }

    pub fn set_pos(&mut self, pos: Point<f64>) {
        match self {
            Module::Port(p) => p.pos = pos,
            Module::SoftMacro(m) => m.pos = pos,
            Module::HardMacro(m) => m.pos = pos,
            Module::SoftMacroPin(p) | Module::HardMacroPin(p) => p.pos = pos,
        }
    }

    pub fn width(&self) -> f64 {
        match self {
            Module::SoftMacro(m) => m.width,
            Module::HardMacro(m) => m.width,
            _ => 0.0,
        }
    }

    pub fn height(&self) -> f64 {
        match self {
            Module::SoftMacro(m) => m.height,
            Module::HardMacro(m) => m.height,
            _ => 0.0,
        }
    }

    pub fn area(&self) -> f64 {
        match self {
            Module::SoftMacro(m) => m.width * m.height,
            Module::HardMacro(m) => m.width * m.height,
            _ => 0.0,
        }
    }

    pub fn is_placeable(&self) -> bool {
        matches!(
            self,
            Module::Port(_) | Module::SoftMacro(_) | Module::HardMacro(_)
        )
    }

    pub fn is_pin(&self) -> bool {
        matches!(self, Module::SoftMacroPin(_) | Module::HardMacroPin(_))
    }

    pub fn is_port(&self) -> bool {
        matches!(self, Module::Port(_))
    }

    pub fn is_soft_macro(&self) -> bool {
        matches!(self, Module::SoftMacro(_))
    }

    pub fn is_hard_macro(&self) -> bool {
        matches!(self, Module::HardMacro(_))
    }

    pub fn fixed(&self) -> bool {
        match self {
            Module::Port(p) => p.fixed,
            Module::SoftMacro(m) => m.fixed,
            Module::HardMacro(m) => m.fixed,
            _ => false,
        }
    }

    pub fn set_fixed(&mut self, fixed: bool) {
        match self {
            Module::Port(p) => p.fixed = fixed,
            Module::SoftMacro(m) => m.fixed = fixed,
            Module::HardMacro(m) => m.fixed = fixed,
            _ => {}
        }
    }

    pub fn placed(&self) -> bool {
        match self {
            Module::Port(p) => p.placed,
            Module::SoftMacro(m) => m.placed,
            Module::HardMacro(m) => m.placed,
            _ => true,
        }
    }

    pub fn set_placed(&mut self, placed: bool) {
        match self {
            Module::Port(p) => p.placed = placed,
            Module::SoftMacro(m) => m.placed = placed,
            Module::HardMacro(m) => m.placed = placed,
            _ => {}
        }
    }

    pub fn orientation(&self) -> Option<Orientation> {
        match self {
            Module::SoftMacro(m) => m.orientation,
            Module::HardMacro(m) => Some(m.orientation),
            _ => None,
        }
    }

    pub fn sink(&self) -> Option<&SinkMap> {
        match self {
            Module::Port(p) => Some(&p.sink),
            Module::SoftMacroPin(p) | Module::HardMacroPin(p) => Some(&p.sink),
            _ => None,
        }
    }

    pub fn connection(&self) -> Option<&ConnectionMap> {
        match self {
            Module::Port(p) => Some(&p.connection),
            Module::SoftMacro(m) => Some(&m.connection),
            Module::HardMacro(m) => Some(&m.connection),
            _ => None,
        }
    }

    pub fn connection_mut(&mut self) -> Option<&mut ConnectionMap> {
        match self {
            Module::Port(p) => Some(&mut p.connection),
            Module::SoftMacro(m) => Some(&mut m.connection),
            Module::HardMacro(m) => Some(&mut m.connection),
            _ => None,
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            Module::SoftMacroPin(p) | Module::HardMacroPin(p) => p.weight,
            _ => 1.0,
        }
    }

    pub fn offset(&self) -> Point<f64> {
        match self {
            Module::SoftMacroPin(p) | Module::HardMacroPin(p) => p.offset,
            _ => Point::default(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        match self {
            Module::SoftMacroPin(p) | Module::HardMacroPin(p) => p.parent,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_rotation_table() {
        let offs = Point::new(1.0, 2.0);
        assert_eq!(Orientation::N.rotate_offset(offs), Point::new(1.0, 2.0));
        assert_eq!(Orientation::FN.rotate_offset(offs), Point::new(-1.0, 2.0));
        assert_eq!(Orientation::S.rotate_offset(offs), Point::new(-1.0, -2.0));
        assert_eq!(Orientation::FS.rotate_offset(offs), Point::new(1.0, -2.0));
        assert_eq!(Orientation::E.rotate_offset(offs), Point::new(2.0, -1.0));
        assert_eq!(Orientation::FE.rotate_offset(offs), Point::new(-2.0, -1.0));
        assert_eq!(Orientation::W.rotate_offset(offs), Point::new(-2.0, 1.0));
        assert_eq!(Orientation::FW.rotate_offset(offs), Point::new(2.0, 1.0));
    }

    #[test]
    fn sink_groups_split_on_parent() {
        let mut sinks = SinkMap::new();
        add_sink(&mut sinks, "M1/pin_a");
        add_sink(&mut sinks, "M1/pin_b");
        add_sink(&mut sinks, "clk_port");
        assert_eq!(sinks["M1"], vec!["M1/pin_a", "M1/pin_b"]);
        assert_eq!(sinks["clk_port"], vec!["clk_port"]);
    }

    #[test]
    fn port_connections_assign_macro_connections_accumulate() {
        let mut conn = ConnectionMap::new();
        add_connection(&mut conn, "M1/pin_a", 2.0);
        add_connection(&mut conn, "M1/pin_b", 2.0);
        add_connection(&mut conn, "out_port", 3.0);
        add_connection(&mut conn, "out_port", 3.0);
        assert_eq!(conn["M1"], 4.0);
        assert_eq!(conn["out_port"], 3.0);
    }
}
