use clap::{Parser, Subcommand};
use plc_common::db::core::PlacementDb;
use plc_common::db::parser::plc::{placement_metadata, restore_placement, save_placement};
use plc_common::util::config::Config;
use plc_common::util::{generator, logger};
use plc_common::util::profiler::ScopedTimer;
use plc_placer::relax::FdParams;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a netlist (and optionally a placement) and report the proxy
    /// metrics.
    Cost {
        netlist: PathBuf,
        #[arg(long)]
        placement: Option<PathBuf>,
        /// Check placement counts against the netlist.
        #[arg(long)]
        validate: bool,
        /// Apply engine settings from the placement file's comments.
        #[arg(long)]
        read_comment: bool,
    },
    /// Relax soft macros with the force-directed schedule and write epoch
    /// snapshots plus a final placement.
    Relax {
        netlist: PathBuf,
        #[arg(long)]
        placement: Option<PathBuf>,
        #[arg(long, default_value = "output")]
        output: PathBuf,
    },
    /// Emit a random benchmark netlist.
    Generate {
        #[arg(long, default_value_t = 4)]
        hard: usize,
        #[arg(long, default_value_t = 20)]
        soft: usize,
        #[arg(long, default_value_t = 8)]
        ports: usize,
        #[arg(long, default_value_t = 0.50)]
        utilization: f64,
        #[arg(long, default_value = "inputs/random_netlist.pb.txt")]
        output: String,
    },
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse();

    let config = if args.config.exists() {
        log::info!("loading configuration from {:?}", args.config);
        let config_str = std::fs::read_to_string(&args.config)
            .map_err(|e| anyhow::anyhow!("failed to read config file: {e}"))?;
        toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("failed to parse config TOML: {e}"))?
    } else {
        log::warn!(
            "configuration file {:?} not found, using internal defaults",
            args.config
        );
        Config::default()
    };

    match args.command {
        Commands::Cost {
            netlist,
            placement,
            validate,
            read_comment,
        } => {
            let mut db = load_database(&config, &netlist, placement.as_deref(), validate, read_comment)?;
            report_costs(&mut db);
        }
        Commands::Relax {
            netlist,
            placement,
            output,
        } => {
            let mut db = load_database(&config, &netlist, placement.as_deref(), false, false)?;
            std::fs::create_dir_all(&output)?;

            let params = FdParams {
                io_factor: config.relax.io_factor,
                attract_exponent: config.relax.attract_exponent,
                num_steps: config.relax.num_steps.clone(),
                max_move_distance: config.relax.max_move_distance.clone(),
                attract_factor: config.relax.attract_factor.clone(),
                repel_factor: config.relax.repel_factor.clone(),
            };
            plc_placer::relax::optimize_stdcells(&mut db, &params, &output)?;

            let final_plc = output.join("final.plc");
            save_placement(&db, &final_plc, &placement_metadata(&db))?;
            log::info!("final placement written to {}", final_plc.display());
            report_costs(&mut db);
        }
        Commands::Generate {
            hard,
            soft,
            ports,
            utilization,
            output,
        } => {
            if let Some(parent) = Path::new(&output).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            generator::generate_random_netlist(&output, hard, soft, ports, utilization)?;
            log::info!("generated {output}");
        }
    }

    Ok(())
}

fn load_database(
    config: &Config,
    netlist: &Path,
    placement: Option<&Path>,
    validate: bool,
    read_comment: bool,
) -> anyhow::Result<PlacementDb> {
    anyhow::ensure!(netlist.exists(), "netlist file missing: {netlist:?}");

    let mut db = PlacementDb::from_netlist_file(netlist)?;
    config.apply_to(&mut db);

    if let Some(plc) = placement {
        anyhow::ensure!(plc.exists(), "placement file missing: {plc:?}");
        restore_placement(&mut db, plc, true, validate, read_comment)?;
    }
    Ok(db)
}

fn report_costs(db: &mut PlacementDb) {
    let _timer = ScopedTimer::new("proxy cost evaluation");
    let summary = plc_cost::compute_all(db);

    log::info!("block               : {}", db.block_name);
    log::info!("canvas              : {:.3} x {:.3}", db.width, db.height);
    log::info!("total module area   : {:.3}", db.total_area());
    log::info!("ports               : {}", db.ports_count());
    log::info!("hard macros         : {}", db.hard_macro_count());
    log::info!("hard macro pins     : {}", db.hard_macro_pin_count());
    log::info!("soft macros         : {}", db.soft_macro_count());
    log::info!("soft macro pins     : {}", db.soft_macro_pin_count());
    log::info!("wirelength          : {:.3}", summary.wirelength);
    log::info!("wirelength cost     : {:.6}", summary.wirelength_cost);
    log::info!("density cost        : {:.6}", summary.density_cost);
    log::info!("congestion cost     : {:.6}", summary.congestion_cost);
    log::info!(
        "vertical congestion : {:.6}",
        plc_cost::congestion::vertical_congestion_cost(db)
    );
    log::info!(
        "horizontal congestion: {:.6}",
        plc_cost::congestion::horizontal_congestion_cost(db)
    );
}
