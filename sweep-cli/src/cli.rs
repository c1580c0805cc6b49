//! Application definition.

extern crate simplelog;

use std::env;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Error, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use colored::*;

use sweep_core::{sweep, ExperimentDesign, Persister, SensitivityTable, SweepConfig, SweepPlan};
use sweep_net::{ClientConfig, Encoding, RemoteSim};

use crate::{init, inspect, util};

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &'static str = env!("CARGO_PKG_AUTHORS");

/// Address of the simulation server used when none is given.
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:9123";

/// How many directory levels up to look for a sweep manifest.
const MANIFEST_SEARCH_DEPTH: usize = 4;

pub fn app<'a, 'b>() -> App<'a, 'b> {
    App::new("sweep")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .version(VERSION)
        .author(AUTHORS)
        .about("Run replicated experiments and sensitivity sweeps against external simulations.")
        .arg(Arg::with_name("verbosity")
            .long("verbosity")
            .short("v")
            .takes_value(true)
            .default_value("info")
            .value_name("verb")
            .global(true)
            .help("Set the verbosity of the log output"))

        // new subcommand
        .subcommand(SubCommand::with_name("new")
            .display_order(10)
            .about("Create new sweep project")
            .arg(Arg::with_name("path")
                .required(true)
                .value_name("path"))
            .arg(Arg::with_name("template")
                .possible_values(&["commented", "minimal"])
                .takes_value(true)
                .default_value("commented")
                .help("Init with a template")
                .long("template")
                .short("t")))

        // run subcommand
        .subcommand(SubCommand::with_name("run")
            .setting(AppSettings::SubcommandRequiredElseHelp)
            .display_order(20)
            .about("Run an experiment variant or a sensitivity entry")
            .arg(Arg::with_name("manifest")
                .long("manifest")
                .short("m")
                .takes_value(true)
                .value_name("path")
                .help("Path to the sweep manifest (looked up from the current directory by default)"))
            .arg(Arg::with_name("server")
                .long("server")
                .short("s")
                .takes_value(true)
                .value_name("address")
                .default_value(DEFAULT_SERVER_ADDR)
                .help("Address of the simulation server"))
            .arg(Arg::with_name("encoding")
                .long("encoding")
                .short("e")
                .takes_value(true)
                .default_value("bincode")
                .possible_values(&["bincode", "msgpack", "json"])
                .help("Encoding used when talking to the simulation server"))
            .arg(Arg::with_name("timeout")
                .long("timeout")
                .takes_value(true)
                .value_name("secs")
                .default_value("60")
                .help("Seconds to wait for the simulation to respond, 0 waits forever"))
            .arg(Arg::with_name("replications")
                .long("replications")
                .short("r")
                .takes_value(true)
                .value_name("count")
                .help("Override the number of replications"))
            .arg(Arg::with_name("ticks")
                .long("ticks")
                .takes_value(true)
                .value_name("count")
                .help("Override the number of ticks per replication"))
            .arg(Arg::with_name("output")
                .long("output")
                .short("o")
                .takes_value(true)
                .value_name("path")
                .help("Override the artifact output directory"))
            .arg(Arg::with_name("no-compress")
                .long("no-compress")
                .help("Store artifacts uncompressed"))
            .subcommand(SubCommand::with_name("experiment")
                .about("Run a single design variant")
                .arg(Arg::with_name("variant")
                    .required(true)
                    .value_name("variant")
                    .help("Index of the design variant")))
            .subcommand(SubCommand::with_name("sensitivity")
                .about("Run the low and high level of a sensitivity table entry")
                .arg(Arg::with_name("index")
                    .required(true)
                    .value_name("index")
                    .help("Index of the sensitivity table entry"))))

        // inspect subcommand
        .subcommand(SubCommand::with_name("inspect")
            .display_order(30)
            .about("Print the contents of a persisted artifact")
            .arg(Arg::with_name("path")
                .required(true)
                .value_name("path"))
            .arg(Arg::with_name("rows")
                .long("rows")
                .short("n")
                .takes_value(true)
                .default_value("10")
                .help("Number of rows to print"))
            .arg(Arg::with_name("json")
                .long("json")
                .help("Print the whole artifact as json")))
}

pub fn app_matches<'a>() -> ArgMatches<'a> {
    app().get_matches()
}

/// Runs the program based on the matched subcommand.
pub fn start(matches: ArgMatches) -> Result<()> {
    match matches.subcommand() {
        ("new", Some(m)) => start_new(m),
        ("run", Some(m)) => start_run(m),
        ("inspect", Some(m)) => start_inspect(m),
        _ => Ok(()),
    }
}

fn start_new(matches: &ArgMatches) -> Result<()> {
    let path = matches
        .value_of("path")
        .ok_or_else(|| Error::msg("missing path"))?;
    let template = matches.value_of("template").unwrap_or("commented");
    init::init_at_path(path, template)?;
    println!("created new sweep project at {}", path.green());
    Ok(())
}

fn start_run(matches: &ArgMatches) -> Result<()> {
    let plan = match matches.subcommand() {
        ("experiment", Some(m)) => SweepPlan::Experiment {
            variant: parse_arg(m, "variant")?,
        },
        ("sensitivity", Some(m)) => SweepPlan::Sensitivity {
            index: parse_arg(m, "index")?,
        },
        _ => return Err(Error::msg("missing run subcommand")),
    };
    setup_log_verbosity(matches);

    let manifest = match matches.value_of("manifest") {
        Some(p) => PathBuf::from(p),
        None => util::find_manifest(env::current_dir()?, MANIFEST_SEARCH_DEPTH)?,
    };
    let config = apply_overrides(SweepConfig::from_path(manifest.clone())?, matches)?;
    info!("using sweep manifest: {}", manifest.to_string_lossy());

    let design = match &config.design {
        Some(path) => Some(ExperimentDesign::from_path(path)?),
        None => None,
    };
    let table = match (&plan, &config.sensitivity) {
        (SweepPlan::Sensitivity { .. }, Some(path)) => Some(SensitivityTable::from_path(path)?),
        _ => None,
    };

    // fail on bad configuration before a connection gets opened
    sweep::check(&config, design.as_ref(), table.as_ref(), plan)?;

    let client_config = ClientConfig {
        encoding: matches
            .value_of("encoding")
            .unwrap_or("bincode")
            .parse::<Encoding>()?,
        compress: false,
        timeout: match parse_arg::<u64>(matches, "timeout")? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        },
    };
    let addr = matches.value_of("server").unwrap_or(DEFAULT_SERVER_ADDR);
    let sim = RemoteSim::connect(addr, client_config)?;

    // stop gracefully between replications
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let handles = sweep::execute(
        sim,
        &config,
        design.as_ref(),
        table.as_ref(),
        plan,
        Some(running),
    )?;
    for handle in handles {
        println!("{} {}", "saved".green(), handle.path.to_string_lossy());
    }
    Ok(())
}

/// Applies command line overrides on top of the manifest config.
fn apply_overrides(mut config: SweepConfig, matches: &ArgMatches) -> Result<SweepConfig> {
    if matches.is_present("replications") {
        config = config.with_replications(parse_arg(matches, "replications")?);
    }
    if matches.is_present("ticks") {
        config = config.with_ticks(parse_arg(matches, "ticks")?);
    }
    if let Some(output) = matches.value_of("output") {
        config = config.with_output(output);
    }
    if matches.is_present("no-compress") {
        config = config.with_compress(false);
    }
    Ok(config)
}

fn start_inspect(matches: &ArgMatches) -> Result<()> {
    let path = matches
        .value_of("path")
        .ok_or_else(|| Error::msg("missing path"))?;
    let artifact = Persister::load(Path::new(path))?;
    if matches.is_present("json") {
        println!("{}", serde_json::to_string_pretty(&artifact)?);
    } else {
        print!("{}", inspect::render(&artifact, parse_arg(matches, "rows")?));
    }
    Ok(())
}

fn parse_arg<T>(matches: &ArgMatches, name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let s = matches
        .value_of(name)
        .ok_or_else(|| Error::msg(format!("missing argument: {}", name)))?;
    s.parse::<T>()
        .map_err(|e| Error::msg(format!("invalid {} `{}`: {}", name, s, e)))
}

fn setup_log_verbosity(matches: &ArgMatches) {
    use self::simplelog::{LevelFilter, TermLogger};
    let level_filter = match matches.value_of("verbosity") {
        Some(s) => match s {
            "0" | "none" => LevelFilter::Off,
            "1" | "err" | "error" | "min" => LevelFilter::Error,
            "2" | "warn" | "warning" | "default" => LevelFilter::Warn,
            "3" | "info" => LevelFilter::Info,
            "4" | "debug" => LevelFilter::Debug,
            "5" | "trace" | "max" | "all" => LevelFilter::Trace,
            _ => LevelFilter::Warn,
        },
        _ => LevelFilter::Warn,
    };
    let mut config_builder = simplelog::ConfigBuilder::new();
    let logger_conf = config_builder
        .set_time_level(LevelFilter::Error)
        .set_target_level(LevelFilter::Debug)
        .set_location_level(LevelFilter::Error)
        .set_time_format_str("%H:%M:%S%.6f")
        .build();
    if TermLogger::init(level_filter, logger_conf, simplelog::TerminalMode::Mixed).is_err() {
        eprintln!("failed initializing terminal logger");
    }
}
