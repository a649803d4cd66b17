use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use resmon::config::{Config, load_config, load_config_from_path};
use resmon::emit::{CsvEmitter, Destination, SampleEmitter};
use resmon::monitor::{Monitor, NicMonitor, ProcessSetMonitor, SystemMonitor};
use resmon::schedule::{FailurePolicy, Scheduler, Shutdown, epoch_secs};
use resmon::shutdown::ShutdownListener;
use resmon::system::probe::{SysinfoNicProbe, SysinfoProcessProbe, SysinfoSystemProbe};

#[derive(Parser)]
#[command(
    name = "resmon",
    version,
    about = "Monitor system-wide resource usage. Optionally monitor processes that match the given criteria and their children."
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Interval, in seconds, between samples
    #[arg(short, long)]
    delay: Option<f64>,

    /// Flush output files after every record
    #[arg(short, long)]
    flush: bool,

    /// System monitor output file; stdout if unset
    #[arg(short, long)]
    outfile: Option<PathBuf>,

    /// Comma separated NICs to monitor
    #[arg(short, long, value_delimiter = ',')]
    nic: Option<Vec<String>>,

    /// NIC output file name; "{nic}" is replaced by the interface name
    #[arg(long)]
    nic_outfile: Option<String>,

    /// Enable the process-set monitor
    #[arg(short = 'p', long)]
    enable_ps: bool,

    /// Include processes whose name contains a keyword, and their children
    #[arg(long, num_args = 0..)]
    ps_keywords: Option<Vec<String>>,

    /// Include these PIDs and their children
    #[arg(long, num_args = 0..)]
    ps_pids: Option<Vec<u32>>,

    /// Process-set monitor output file
    #[arg(long)]
    ps_outfile: Option<PathBuf>,

    /// What to do when a monitor fails while sampling
    #[arg(long, value_enum)]
    on_collector_error: Option<FailurePolicy>,

    /// Stop after this many samples
    #[arg(short, long)]
    count: Option<u64>,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = load_config_for_cli(&cli)?;
    config.validate()?;

    let mut scheduler = build_scheduler(&config)?;
    let shutdown = ShutdownListener::spawn();

    info!(delay = ?config.delay(), order = ?scheduler.order(), "sampling started");
    match scheduler.run(shutdown.subscribe()).await {
        Ok(Shutdown::Interrupted) => info!("stopped on interrupt"),
        Ok(Shutdown::Completed) => info!("sample count reached"),
        Err(err) => {
            error!(%err, "sampling aborted");
            return Err(err.into());
        }
    }
    Ok(())
}

/// Logs go to stderr; stdout may carry the system stream.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();
}

fn load_config_for_cli(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path)?,
        None => load_config()?,
    };

    if let Some(delay) = cli.delay {
        config.general.delay_secs = delay;
    }
    if cli.flush {
        config.general.flush = true;
    }
    if let Some(policy) = cli.on_collector_error {
        config.general.on_collector_error = policy;
    }
    if cli.count.is_some() {
        config.general.count = cli.count;
    }
    if let Some(ref path) = cli.outfile {
        config.system.outfile = Some(path.clone());
    }
    if let Some(ref nics) = cli.nic {
        config.nic.interfaces = nics.clone();
    }
    if let Some(ref pattern) = cli.nic_outfile {
        config.nic.outfile_pattern = pattern.clone();
    }
    if cli.enable_ps {
        config.process_set.enabled = true;
    }
    if let Some(ref keywords) = cli.ps_keywords {
        config.process_set.keywords = keywords.clone();
    }
    if let Some(ref pids) = cli.ps_pids {
        config.process_set.pids = pids.clone();
    }
    if let Some(ref path) = cli.ps_outfile {
        config.process_set.outfile = path.clone();
    }

    Ok(config)
}

fn build_scheduler(config: &Config) -> Result<Scheduler> {
    let flush = config.general.flush;
    let open = |destination: Destination| -> std::io::Result<Box<dyn SampleEmitter>> {
        Ok(Box::new(CsvEmitter::open(&destination, flush)?))
    };

    let mut scheduler = Scheduler::new(config.delay(), config.general.on_collector_error)
        .with_max_ticks(config.general.count);

    let destination = config.system_destination();
    let system = SystemMonitor::new(
        Box::new(SysinfoSystemProbe::new()),
        open(destination.clone()).wrap_err_with(|| format!("cannot open {destination}"))?,
        epoch_secs(),
    )?;
    scheduler.register(Monitor::System(system));

    let interfaces = config.interfaces();
    if !interfaces.is_empty() {
        let nic = NicMonitor::new(
            Box::new(SysinfoNicProbe::new()),
            &interfaces,
            |name| open(config.nic_destination(name)),
            epoch_secs(),
        )?;
        match nic {
            Some(nic) => scheduler.register(Monitor::Nic(nic)),
            None => error!("no NIC to monitor, NIC monitoring disabled"),
        }
    }

    if config.process_set.enabled {
        let destination = config.process_set_destination();
        let process_set = ProcessSetMonitor::new(
            Box::new(SysinfoProcessProbe::new()),
            open(destination.clone()).wrap_err_with(|| format!("cannot open {destination}"))?,
            config.root_selectors(),
            epoch_secs(),
        )?;
        scheduler.register(Monitor::ProcessSet(process_set));
    }

    Ok(scheduler)
}
