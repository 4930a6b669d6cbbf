//! OLSR simulator
//!
//! Runs OLSR nodes over a scheduled link layer and prints what each node
//! learned and received.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use olsr_logging::{FileConfig, LogConfig, OlsrSubscriberBuilder, WorkerGuard};
use olsr_simulation::scenarios::{self, Scenario, SendSpec};
use olsr_simulation::{LinkSchedule, NodeId, SimConfig, SimReport, Simulation, Tick, TopologyBuilder};

#[derive(Parser)]
#[command(
    name = "olsr-sim",
    about = "Ad-hoc network simulation with OLSR routing",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write JSONL logs into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run nodes over a link schedule file
    Run {
        /// Schedule file with `<tick> <UP|DOWN> <from> <to>` lines
        #[arg(short, long)]
        schedule: PathBuf,

        /// Nodes to run besides those named in the schedule
        #[arg(short, long = "node", num_args = 1..)]
        nodes: Vec<NodeId>,

        /// Payload to originate, as SRC:DST:AT:PAYLOAD
        #[arg(long = "send")]
        sends: Vec<SendSpec>,

        #[command(flatten)]
        timing: Timing,

        /// Write `<id>received.txt` for every node into this directory
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Run a built-in or JSON-described scenario
    Scenario {
        /// Built-in scenario: line, star, ring, cut
        #[arg(default_value = "line")]
        name: String,

        /// Load the scenario from a JSON file instead
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[command(flatten)]
        timing: Timing,

        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Print a topology and its link schedule
    Topology {
        #[arg(short, long, value_enum, default_value = "line")]
        shape: Shape,

        /// Number of nodes (max 26)
        #[arg(short, long, default_value = "6")]
        nodes: usize,

        /// Connection probability for random topology
        #[arg(short, long, default_value = "0.4")]
        probability: f64,
    },
}

#[derive(clap::Args)]
struct Timing {
    /// Last tick on which nodes run their epoch actions
    #[arg(long)]
    horizon: Option<Tick>,

    /// Milliseconds per tick
    #[arg(long)]
    epoch_ms: Option<u64>,
}

impl Timing {
    fn apply(&self, mut config: SimConfig) -> anyhow::Result<SimConfig> {
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if let Some(ms) = self.epoch_ms {
            anyhow::ensure!(ms > 0, "--epoch-ms must be greater than zero");
            config.epoch = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Shape {
    Line,
    Ring,
    Star,
    Full,
    Random,
}

fn init_logging(cli: &Cli) -> anyhow::Result<Option<WorkerGuard>> {
    let level = if cli.verbose { "debug" } else { "info" };
    let mut builder = OlsrSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .with_level(level);
    if let Some(dir) = &cli.log_dir {
        builder = builder.with_file_output(FileConfig {
            directory: dir.clone(),
            ..FileConfig::default()
        });
    }
    Ok(builder.try_init()?)
}

fn print_report(report: &SimReport, out_dir: Option<&PathBuf>) -> anyhow::Result<()> {
    println!("{}", report.summary());
    if let Some(dir) = out_dir {
        let written = report
            .write_received(dir)
            .with_context(|| format!("writing received logs to {}", dir.display()))?;
        println!("Wrote {} received logs to {}", written.len(), dir.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(&cli)?;

    match cli.command {
        Commands::Run {
            schedule,
            nodes,
            sends,
            timing,
            out_dir,
        } => {
            let schedule = LinkSchedule::from_file(&schedule)
                .with_context(|| format!("reading schedule {}", schedule.display()))?;
            let mut sim = Simulation::new(timing.apply(SimConfig::default())?, schedule);
            for id in nodes {
                sim.add_node(id)?;
            }
            sim.add_scheduled_nodes();
            for send in &sends {
                sim.schedule_send(&send.from, send.scheduled())?;
            }

            let report = sim.run().await?;
            print_report(&report, out_dir.as_ref())?;
        }
        Commands::Scenario {
            name,
            file,
            timing,
            out_dir,
        } => {
            let mut scenario = match file {
                Some(path) => Scenario::from_file(&path)?,
                None => scenarios::builtin(&name).with_context(|| {
                    format!(
                        "unknown scenario {name:?}, expected one of {}",
                        scenarios::BUILTIN.join(", ")
                    )
                })?,
            };
            println!("Scenario {}: {}", scenario.name, scenario.description);

            // Command-line timing wins over the scenario's own
            if timing.horizon.is_some() {
                scenario.horizon = timing.horizon;
            }
            if timing.epoch_ms.is_some() {
                scenario.epoch_ms = timing.epoch_ms;
            }
            let sim = scenario.into_simulation(SimConfig::default())?;
            let report = sim.run().await?;
            print_report(&report, out_dir.as_ref())?;
        }
        Commands::Topology {
            shape,
            nodes,
            probability,
        } => {
            anyhow::ensure!((1..=26).contains(&nodes), "nodes must be between 1 and 26");
            let builder = TopologyBuilder::new(nodes);
            let topology = match shape {
                Shape::Line => builder.line(),
                Shape::Ring => builder.ring(),
                Shape::Star => builder.star(),
                Shape::Full => builder.full_mesh(),
                Shape::Random => builder.random(probability),
            };
            println!("{}", topology.visualize());
            print!("{}", topology.schedule());
        }
    }

    Ok(())
}
