use clap::{Parser, Subcommand, ValueEnum};
use hf_core::SubPipeId;
use hf_sim::{
    EngineConfig, FixedStepOptions, SimError, SimulationEngine, SystemSnapshot, SystemState,
    TickLoop, run_fixed,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hf-cli")]
#[command(about = "HydroFlow CLI - tank, pump and valve rig simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration (defaults merged with a file)
    Config {
        /// Path to an engine YAML file
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },
    /// Check a configuration file without running it
    Validate {
        /// Path to an engine YAML file
        config_path: PathBuf,
    },
    /// Run the rig for a fixed duration and report the final state
    Run(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Path to an engine YAML file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Simulated duration in seconds (wall time with --realtime)
    #[arg(long, default_value_t = 10.0)]
    duration: f64,
    /// Fixed step in seconds (ignored with --realtime)
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f64,
    /// Print every N-th recorded step in table output
    #[arg(long, default_value_t = 60)]
    record_every: usize,
    /// Initial tank level override in percent
    #[arg(long)]
    level: Option<f64>,
    /// Enable flow through the sub-pipes
    #[arg(long)]
    flow: bool,
    /// Start the pump
    #[arg(long)]
    pump: bool,
    /// Start the inlet motor
    #[arg(long)]
    inlet: bool,
    /// Sub-pipes to open fully, e.g. `--open 1,3`
    #[arg(long, value_delimiter = ',')]
    open: Vec<SubPipeId>,
    /// Main valve target in percent
    #[arg(long)]
    main_valve: Option<f64>,
    /// Route pump delivery around the main valve
    #[arg(long)]
    bypass: bool,
    /// Tick against the wall clock instead of fixed steps
    #[arg(long)]
    realtime: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Yaml,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid argument: {0}")]
    Arg(String),
}

type CliResult<T> = Result<T, CliError>;

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { config, format } => cmd_config(config.as_deref(), format),
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Run(args) => cmd_run(args),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::load_yaml(path)?),
        None => Ok(EngineConfig::default()),
    }
}

fn cmd_config(path: Option<&Path>, format: OutputFormat) -> CliResult<()> {
    let config = load_config(path)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Yaml | OutputFormat::Table => print!("{}", config.to_yaml()?),
    }
    Ok(())
}

fn cmd_validate(path: &Path) -> CliResult<()> {
    println!("Validating config: {}", path.display());
    let config = EngineConfig::load_yaml(path)?;
    SimulationEngine::new(config.clone())?;
    println!("✓ Config is valid");
    println!("  Sub-pipes: {}", config.sub_pipes.len());
    println!(
        "  Tank: {:.2} m x r {:.2} m, start at {:.1}%",
        config.tank.height_m, config.tank.radius_m, config.tank.initial_level_percent
    );
    Ok(())
}

fn cmd_run(args: RunArgs) -> CliResult<()> {
    if !(args.duration.is_finite() && args.duration >= 0.0) {
        return Err(CliError::Arg(format!(
            "duration must be non-negative, got {}",
            args.duration
        )));
    }
    let config = load_config(args.config.as_deref())?;
    let target_hz = config.integration.target_tick_hz;
    let mut engine = SimulationEngine::new(config)?;
    apply_commands(&mut engine, &args)?;

    if args.format == OutputFormat::Table {
        engine.subscribe_select(
            |s| s.system_state,
            |state: &SystemState| println!("  system -> {}", state.name()),
        );
    }

    let started = Instant::now();
    let final_snapshot = if args.realtime {
        let stats = TickLoop::new(target_hz)?
            .with_max_duration(wall_duration(args.duration)?)
            .run(&mut engine);
        if args.format == OutputFormat::Table {
            println!(
                "  {} ticks, {:.3}s simulated, {} overruns, mean tick {:.3} ms",
                stats.ticks,
                stats.simulated_s,
                stats.overruns,
                stats.mean_tick_cost_s() * 1000.0
            );
        }
        engine.full_state()
    } else {
        let opts = FixedStepOptions {
            dt_s: args.dt,
            duration_s: args.duration,
            record_every: args.record_every,
        };
        let record = run_fixed(&mut engine, &opts)?;
        if args.format == OutputFormat::Table {
            print_table_header();
            for snapshot in &record.snapshots {
                print_table_row(snapshot);
            }
        }
        engine.full_state()
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&*final_snapshot)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&*final_snapshot)?),
        OutputFormat::Table => print_summary(&final_snapshot, started.elapsed()),
    }
    Ok(())
}

fn wall_duration(seconds: f64) -> CliResult<Duration> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| CliError::Arg(format!("duration {seconds} is out of range")))
}

fn apply_commands(engine: &mut SimulationEngine, args: &RunArgs) -> CliResult<()> {
    if let Some(level) = args.level {
        engine.set_tank_level(level);
    }
    if args.flow {
        engine.enable_flow();
    }
    if args.pump {
        engine.start_pump();
    }
    if args.inlet {
        engine.start_inlet_motor();
    }
    if let Some(position) = args.main_valve {
        engine.set_main_valve_position(position);
    }
    if args.bypass {
        engine.set_bypass(true);
    }
    for &id in &args.open {
        if engine.open_sub_pipe(id).is_none() {
            return Err(CliError::Arg(format!("no sub-pipe {id} in this rig")));
        }
    }
    // make the commanded state visible before the first step
    engine.advance(0.0);
    Ok(())
}

fn print_table_header() {
    println!(
        "{:>8}  {:>9}  {:>8}  {:>10}  {:>11}  {:>9}  {:>9}",
        "t [s]", "state", "level %", "v_exit m/s", "Q_out m3/h", "pump", "ratio"
    );
}

fn print_table_row(s: &SystemSnapshot) {
    println!(
        "{:>8.2}  {:>9}  {:>8.3}  {:>10.3}  {:>11.3}  {:>9}  {:>9.3}",
        s.elapsed_simulated_s,
        s.system_state.name(),
        s.tank.level_percent,
        s.bernoulli.exit_velocity_mps,
        s.outlet_flow_m3_per_h,
        s.pump.state.name(),
        s.pump.output_ratio,
    );
}

fn print_summary(s: &SystemSnapshot, wall: Duration) {
    println!(
        "\nFinal state after {:.2}s simulated ({:.3}s wall):",
        s.elapsed_simulated_s,
        wall.as_secs_f64()
    );
    println!("  System:      {}", s.system_state.name());
    println!("  Tank level:  {:.3}% ({:.3} m3)", s.tank.level_percent, s.tank.volume_m3());
    println!("  Pump:        {} ({:.3})", s.pump.state.name(), s.pump.output_ratio);
    println!(
        "  Inlet motor: {} ({:.3})",
        s.inlet_motor.state.name(),
        s.inlet_motor.output_ratio
    );
    println!("  Main valve:  {:.1}%", s.main_valve.current_position);
    println!("  Flow value:  {:.3} m3/h", s.flow_value_m3_per_h);
    println!("  Pressure:    {:.1} Pa", s.pressure_value_pa);
    match s.bernoulli.estimated_drain_time_s {
        Some(t) => println!("  Drain time:  {t:.1} s"),
        None => println!("  Drain time:  no flow"),
    }
    for pipe in &s.sub_pipes {
        println!(
            "  {}: {:>5.1}%  {:.4} m3/s  {:?}",
            pipe.id, pipe.valve_position, pipe.flow_rate_m3_per_s, pipe.regime
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_duration_rejects_unrepresentable_seconds() {
        assert_eq!(wall_duration(2.5).unwrap(), Duration::from_millis(2500));
        assert_eq!(wall_duration(0.0).unwrap(), Duration::ZERO);
        assert!(matches!(wall_duration(1.0e300), Err(CliError::Arg(_))));
        assert!(matches!(wall_duration(-1.0), Err(CliError::Arg(_))));
        assert!(matches!(wall_duration(f64::NAN), Err(CliError::Arg(_))));
    }
}
