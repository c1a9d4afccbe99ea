use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use walkdir::WalkDir;

use mission_core::{
    load_compressed, save_compressed, CodecOptions, FilenameKind, Mission, Shared,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Parser)]
#[command(name = "missioned", version, about = "Inspect and validate mission files")]
struct Args {
    /// Mission files are zlib-compressed.
    #[arg(long, global = true)]
    compressed: bool,

    /// Refuse short files and the legacy ship count.
    #[arg(long, global = true)]
    strict: bool,

    /// More log output; repeat for debug and trace.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a summary of a mission.
    Info { file: PathBuf },

    /// Print a mission as JSON.
    Dump { file: PathBuf },

    /// Read a mission and write it back out, then check the copy reads
    /// back the same.
    Roundtrip { input: PathBuf, output: PathBuf },

    /// Validate every mission file under a directory.
    Check {
        dir: PathBuf,

        #[arg(long, default_value = "msn")]
        extension: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct CliConfig {
    log_level: String,
    compressed: bool,
    codec: CodecOptions,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            compressed: false,
            codec: CodecOptions::default(),
        }
    }
}

fn config_path() -> Option<PathBuf> {
    let mut base = dirs::config_dir().or_else(dirs::data_dir)?;
    base.push("missioned");
    base.push("config.json");
    Some(base)
}

fn parse_config(data: &str) -> Option<CliConfig> {
    serde_json::from_str::<CliConfig>(data).ok()
}

fn load_config() -> CliConfig {
    if let Some(path) = config_path() {
        if let Ok(data) = fs::read_to_string(&path) {
            if let Some(cfg) = parse_config(&data) {
                return cfg;
            }
        }
    }
    CliConfig::default()
}

fn log_level(verbose: u8, configured: &str) -> LevelFilter {
    match verbose {
        0 => LevelFilter::from_str(configured).unwrap_or(LevelFilter::Warn),
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn init_logging(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {:<5} {}: {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
}

/// Options resolved from the command line over the config file.
struct Settings {
    compressed: bool,
    codec: CodecOptions,
}

impl Settings {
    fn new(args: &Args, cfg: &CliConfig) -> Self {
        let mut codec = cfg.codec;
        if args.strict {
            codec.accept_short_files = false;
            codec.accept_legacy_ship_count = false;
        }
        Self {
            compressed: args.compressed || cfg.compressed,
            codec,
        }
    }

    fn open(&self, path: &Path) -> CliResult<Mission> {
        if self.compressed {
            if self.codec != CodecOptions::default() {
                log::warn!("codec options are not applied to compressed files");
            }
            let res = Shared::new(Mission::new());
            load_compressed(&res, path)?;
            let mission = res.get().clone();
            return Ok(mission);
        }
        let file = File::open(path)?;
        Ok(Mission::read_with(BufReader::new(file), &self.codec)?)
    }

    fn save(&self, mission: Mission, path: &Path) -> CliResult<()> {
        if self.compressed {
            save_compressed(&Shared::new(mission), path)?;
            return Ok(());
        }
        let mut out = BufWriter::new(File::create(path)?);
        mission.write(&mut out)?;
        out.flush()?;
        Ok(())
    }
}

fn info(mission: &Mission) {
    println!("title:        {}", mission.briefing.title.string());
    println!("type:         {:?}", mission.mission_type);
    println!(
        "player:       ({}, {}, {}) shields {}",
        mission.player.pos.x, mission.player.pos.y, mission.player.pos.z, mission.player.shields
    );
    match mission.time_limit() {
        Some(limit) => println!("time limit:   {limit}s"),
        None => println!("time limit:   none"),
    }
    println!("triggers:     {}", mission.triggers.len());
    println!("target infos: {}", mission.target_infos.len());
    println!("paths:        {}", mission.paths.len());
    println!("ships:        {}", mission.ships.len());
    for (i, (id, ship)) in mission.ships.iter().enumerate() {
        let docked = if mission.player.docked_ship == Some(id) {
            " (player docked)"
        } else {
            ""
        };
        println!("  {i:2} {:?} {:?}{docked}", ship.kind, ship.mode());
    }
    println!("briefing:     {} blocks", mission.briefing.blocks().len());
    for kind in FilenameKind::ALL {
        println!("{:<13} {}", format!("{}:", kind.name()), mission.filenames.get(kind));
    }
}

fn roundtrip(settings: &Settings, input: &Path, output: &Path) -> CliResult<()> {
    let mission = settings.open(input)?;
    settings.save(mission.clone(), output)?;
    let copy = settings.open(output)?;
    if copy != mission {
        return Err(format!("{} does not read back the same", output.display()).into());
    }
    println!("{} -> {}", input.display(), output.display());
    Ok(())
}

fn check(settings: &Settings, dir: &Path, extension: &str) -> CliResult<()> {
    let mut checked = 0usize;
    let mut failed = 0usize;
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        let wanted = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if !entry.file_type().is_file() || !wanted {
            continue;
        }
        checked += 1;
        match settings.open(path) {
            Ok(_) => log::info!("ok {}", path.display()),
            Err(err) => {
                failed += 1;
                println!("{}: {err}", path.display());
            }
        }
    }
    println!("{checked} checked, {failed} failed");
    if failed > 0 {
        return Err(format!("{failed} invalid mission files").into());
    }
    Ok(())
}

fn run(args: Args, cfg: CliConfig) -> CliResult<()> {
    let settings = Settings::new(&args, &cfg);
    match &args.command {
        Command::Info { file } => info(&settings.open(file)?),
        Command::Dump { file } => {
            let mission = settings.open(file)?;
            println!("{}", serde_json::to_string_pretty(&mission)?);
        }
        Command::Roundtrip { input, output } => roundtrip(&settings, input, output)?,
        Command::Check { dir, extension } => check(&settings, dir, extension)?,
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    let cfg = load_config();

    if let Err(err) = init_logging(log_level(args.verbose, &cfg.log_level)) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
    if let Some(path) = config_path() {
        log::debug!("config {}", path.display());
    }

    if let Err(err) = run(args, cfg) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
