use rand::Rng;
use std::fs::File;
use std::io::Write;

/// Emit a random benchmark netlist in the textual protobuf grammar: ports on
/// the canvas edges, hard macros with offset pins, soft stdcell clusters,
/// and randomly wired driver pins.
pub fn generate_random_netlist(
    filename: &str,
    num_hard: usize,
    num_soft: usize,
    num_ports: usize,
    target_utilization: f64,
) -> std::io::Result<()> {
    let mut file = File::create(filename)?;
    let mut rng = rand::thread_rng();

    let hard_side = 40.0;
    let soft_side = 15.0;
    let total_area =
        num_hard as f64 * hard_side * hard_side + num_soft as f64 * soft_side * soft_side;
    let util = target_utilization.clamp(0.01, 0.99);
    let canvas = (total_area / util).sqrt().max(1.0);

    log::info!(
        "generating benchmark: {} hard macros, {} soft macros, {} ports, canvas {:.1}x{:.1}",
        num_hard,
        num_soft,
        num_ports,
        canvas,
        canvas
    );

    // Sink candidates for driver pins: one input pin per macro.
    let mut sink_pins = Vec::new();
    for i in 0..num_hard {
        sink_pins.push(format!("HardMacro_{i}/in_0"));
    }
    for i in 0..num_soft {
        sink_pins.push(format!("Grp_{i}/Pinput_0"));
    }

    let pick_sinks = |rng: &mut rand::rngs::ThreadRng| -> Vec<String> {
        if sink_pins.is_empty() {
            return Vec::new();
        }
        let count = rng.gen_range(1..=3.min(sink_pins.len()));
        let mut chosen = Vec::with_capacity(count);
        while chosen.len() < count {
            let pin = &sink_pins[rng.gen_range(0..sink_pins.len())];
            if !chosen.contains(pin) {
                chosen.push(pin.clone());
            }
        }
        chosen
    };

    for i in 0..num_ports {
        let (x, y, side) = match i % 4 {
            0 => (0.0, rng.gen_range(0.0..canvas), "LEFT"),
            1 => (canvas, rng.gen_range(0.0..canvas), "RIGHT"),
            2 => (rng.gen_range(0.0..canvas), 0.0, "BOTTOM"),
            _ => (rng.gen_range(0.0..canvas), canvas, "TOP"),
        };
        let inputs = if i % 2 == 0 {
            pick_sinks(&mut rng)
        } else {
            Vec::new()
        };
        write_node(&mut file, &format!("P_{i}"), &inputs, &[
            ("side", Attr::Placeholder(side.to_string())),
            ("type", Attr::Placeholder("PORT".to_string())),
            ("x", Attr::F(x)),
            ("y", Attr::F(y)),
        ])?;
    }

    for i in 0..num_hard {
        let name = format!("HardMacro_{i}");
        let x = rng.gen_range(hard_side / 2.0..canvas - hard_side / 2.0);
        let y = rng.gen_range(hard_side / 2.0..canvas - hard_side / 2.0);
        write_node(&mut file, &name, &[], &[
            ("height", Attr::F(hard_side)),
            ("orientation", Attr::Placeholder("N".to_string())),
            ("type", Attr::Placeholder("MACRO".to_string())),
            ("width", Attr::F(hard_side)),
            ("x", Attr::F(x)),
            ("y", Attr::F(y)),
        ])?;
        write_node(&mut file, &format!("{name}/in_0"), &[], &[
            ("macro_name", Attr::Placeholder(name.clone())),
            ("type", Attr::Placeholder("MACRO_PIN".to_string())),
            ("x_offset", Attr::F(-hard_side / 4.0)),
            ("y_offset", Attr::F(0.0)),
            ("x", Attr::F(x - hard_side / 4.0)),
            ("y", Attr::F(y)),
        ])?;
        write_node(&mut file, &format!("{name}/out_0"), &pick_sinks(&mut rng), &[
            ("macro_name", Attr::Placeholder(name.clone())),
            ("type", Attr::Placeholder("MACRO_PIN".to_string())),
            ("x_offset", Attr::F(hard_side / 4.0)),
            ("y_offset", Attr::F(0.0)),
            ("x", Attr::F(x + hard_side / 4.0)),
            ("y", Attr::F(y)),
        ])?;
    }

    for i in 0..num_soft {
        let name = format!("Grp_{i}");
        let x = rng.gen_range(0.0..canvas);
        let y = rng.gen_range(0.0..canvas);
        write_node(&mut file, &name, &[], &[
            ("height", Attr::F(soft_side)),
            ("type", Attr::Placeholder("macro".to_string())),
            ("width", Attr::F(soft_side)),
            ("x", Attr::F(x)),
            ("y", Attr::F(y)),
        ])?;
        write_node(&mut file, &format!("{name}/Pinput_0"), &[], &[
            ("macro_name", Attr::Placeholder(name.clone())),
            ("type", Attr::Placeholder("macro_pin".to_string())),
            ("x", Attr::F(x)),
            ("y", Attr::F(y)),
        ])?;
        write_node(&mut file, &format!("{name}/Poutput_0"), &pick_sinks(&mut rng), &[
            ("macro_name", Attr::Placeholder(name.clone())),
            ("type", Attr::Placeholder("macro_pin".to_string())),
            ("weight", Attr::F(rng.gen_range(1..=2) as f64)),
            ("x", Attr::F(x)),
            ("y", Attr::F(y)),
        ])?;
    }

    Ok(())
}

enum Attr {
    F(f64),
    Placeholder(String),
}

fn write_node(
    file: &mut File,
    name: &str,
    inputs: &[String],
    attrs: &[(&str, Attr)],
) -> std::io::Result<()> {
    writeln!(file, "node {{")?;
    writeln!(file, "  name: \"{name}\"")?;
    for input in inputs {
        writeln!(file, "  input: \"{input}\"")?;
    }
    for (key, value) in attrs {
        writeln!(file, "  attr {{")?;
        writeln!(file, "    key: \"{key}\"")?;
        writeln!(file, "    value {{")?;
        match value {
            Attr::F(f) => writeln!(file, "      f: {f}")?,
            Attr::Placeholder(s) => writeln!(file, "      placeholder: \"{s}\"")?,
        }
        writeln!(file, "    }}")?;
        writeln!(file, "  }}")?;
    }
    writeln!(file, "}}")?;
    Ok(())
}
