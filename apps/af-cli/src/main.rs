use anyhow::{Context, Result};
use attribute_registry as reg;
use clap::{ArgAction, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use time::OffsetDateTime;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    name = "af",
    version,
    about = "Device profile attribute registry CLI",
    disable_help_subcommand = true
)]
struct Cli {
    /// Load profiles from this directory instead of the built-in tables
    #[arg(long, global = true, env = "AF_PROFILES_DIR")]
    profiles_dir: Option<PathBuf>,

    /// Print Prometheus metrics to stderr after the command
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List loaded profiles
    Profiles,
    /// Show every attribute of a profile
    Show {
        profile: String,
        /// Emit JSON instead of a table
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Look up one attribute
    Lookup {
        profile: String,
        id: u16,
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Decode raw bytes (hex) for an attribute
    Decode {
        profile: String,
        id: u16,
        /// Data bytes as hex, e.g. `00 00 01 00` or `0x00000100`
        #[arg(required = true, num_args = 1..)]
        data: Vec<String>,
        /// Stamp the record with the current time
        #[arg(long, action = ArgAction::SetTrue)]
        ts: bool,
    },
    /// Encode a value for an attribute and print it as hex
    Encode {
        profile: String,
        id: u16,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Convert a generated device-description.h into a YAML profile
    ImportHeader {
        path: PathBuf,
        /// Profile name
        #[arg(long)]
        name: String,
        /// Keep system attributes identical to the shared base table
        #[arg(long, action = ArgAction::SetTrue)]
        keep_system: bool,
        /// Write YAML here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Validate a profile file or directory
    Validate {
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        dir: Option<PathBuf>,
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();
    let hub = reg::MetricsHub::new().map_err(|e| anyhow::anyhow!(e))?;

    let res = run(&cli, &hub);
    if cli.metrics {
        eprint!("{}", hub.encode_text());
    }
    res
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: &Cli, hub: &reg::MetricsHub) -> Result<()> {
    match &cli.command {
        Commands::Validate { file, dir, json } => {
            validate(cli, file.as_ref(), dir.as_ref(), *json)
        }
        Commands::ImportHeader {
            path,
            name,
            keep_system,
            out,
        } => {
            let registry = load_registry(cli, hub)?;
            import_header(&registry, path, name, *keep_system, out.as_ref())
        }
        Commands::Profiles => {
            let registry = load_registry(cli, hub)?;
            list_profiles(&registry);
            Ok(())
        }
        Commands::Show { profile, json } => {
            let registry = load_registry(cli, hub)?;
            show(&registry, profile, *json)
        }
        Commands::Lookup { profile, id, json } => {
            let registry = load_registry(cli, hub)?;
            lookup(&registry, hub, profile, *id, *json)
        }
        Commands::Decode {
            profile,
            id,
            data,
            ts,
        } => {
            let registry = load_registry(cli, hub)?;
            decode(&registry, hub, profile, *id, data, *ts)
        }
        Commands::Encode { profile, id, value } => {
            let registry = load_registry(cli, hub)?;
            encode(&registry, hub, profile, *id, value)
        }
    }
}

fn load_registry(cli: &Cli, hub: &reg::MetricsHub) -> Result<reg::ProfileRegistry> {
    let registry = match &cli.profiles_dir {
        Some(dir) => reg::load_profiles_dir(dir)?,
        None => reg::load_builtin().context("loading built-in profiles")?,
    };
    hub.codec.profiles_loaded.set(registry.len() as i64);
    Ok(registry)
}

fn find_profile<'a>(registry: &'a reg::ProfileRegistry, name: &str) -> Result<&'a reg::DeviceProfile> {
    registry.get(name).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown profile: {name} (available: {})",
            registry.names().join(", ")
        )
    })
}

fn list_profiles(registry: &reg::ProfileRegistry) {
    for name in registry.names() {
        if let Some(p) = registry.get(name) {
            println!(
                "{name}\tboard={}\tattributes={}",
                p.board,
                p.len()
            );
        }
    }
}

fn show(registry: &reg::ProfileRegistry, name: &str, json: bool) -> Result<()> {
    let p = find_profile(registry, name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&p.attributes())?);
        return Ok(());
    }
    println!("# {} (board {} = {})", p.name, p.board, p.board.id());
    for d in p.attributes() {
        println!("{:>5}\t{:>3}\t{:<7}\t{}", d.id, d.size, d.ty, d.name);
    }
    Ok(())
}

fn lookup(
    registry: &reg::ProfileRegistry,
    hub: &reg::MetricsHub,
    name: &str,
    id: u16,
    json: bool,
) -> Result<()> {
    let p = find_profile(registry, name)?;
    let d = p.lookup(id).inspect_err(|_| hub.codec.codec_errors.inc())?;
    if json {
        println!("{}", serde_json::to_string_pretty(d)?);
    } else {
        println!("{}\t{}\tsize={}\ttype={}", d.id, d.name, d.size, d.ty);
    }
    Ok(())
}

fn decode(
    registry: &reg::ProfileRegistry,
    hub: &reg::MetricsHub,
    name: &str,
    id: u16,
    data_hex: &[String],
    stamp: bool,
) -> Result<()> {
    let p = find_profile(registry, name)?;
    let d = p.lookup(id).inspect_err(|_| hub.codec.codec_errors.inc())?;
    let joined = data_hex.join(" ");
    let bytes =
        reg::parse_hex(&joined).ok_or_else(|| anyhow::anyhow!("invalid hex data: {joined}"))?;
    debug!(profile = name, id, len = bytes.len(), "decoding");
    let value = hub.decode(d, &bytes)?;
    let ts = if stamp {
        Some(OffsetDateTime::now_utc())
    } else {
        None
    };
    let rec = reg::AttributeRecord {
        profile: p.name.clone(),
        id,
        name: d.name.clone(),
        ty: d.ty,
        value,
        ts: ts.and_then(|t| {
            t.format(&time::format_description::well_known::Rfc3339)
                .ok()
        }),
    };
    println!("{}", serde_json::to_string_pretty(&rec)?);
    Ok(())
}

fn encode(
    registry: &reg::ProfileRegistry,
    hub: &reg::MetricsHub,
    name: &str,
    id: u16,
    literal: &str,
) -> Result<()> {
    let p = find_profile(registry, name)?;
    let d = p.lookup(id).inspect_err(|_| hub.codec.codec_errors.inc())?;
    let value = reg::Value::parse(d, literal)?;
    let bytes = hub.encode(d, &value)?;
    println!("{}", reg::to_hex(&bytes));
    Ok(())
}

fn import_header(
    registry: &reg::ProfileRegistry,
    path: &PathBuf,
    name: &str,
    keep_system: bool,
    out: Option<&PathBuf>,
) -> Result<()> {
    let src = fs::read_to_string(path)
        .with_context(|| format!("reading header: {}", path.display()))?;
    let mut file = reg::parse_header(&src, name)
        .with_context(|| format!("parsing header: {}", path.display()))?;
    if !keep_system {
        file = reg::strip_base(file, &registry.system);
    }
    // Reject anything the loader would reject before writing it out.
    reg::DeviceProfile::from_file(file.clone(), &registry.system)?;
    let yaml = serde_yaml::to_string(&file)?;
    match out {
        Some(dest) => {
            fs::write(dest, yaml).with_context(|| format!("writing {}", dest.display()))?;
            info!(profile = name, dest = %dest.display(), attributes = file.attributes.len(), "imported header");
        }
        None => print!("{yaml}"),
    }
    Ok(())
}

fn validate(
    cli: &Cli,
    file: Option<&PathBuf>,
    dir: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    match (file, dir) {
        (Some(f), None) => {
            let system = match &cli.profiles_dir {
                Some(d) => reg::load_system_table(d.join(reg::SYSTEM_TABLE_FILE))?,
                None => reg::load_builtin()?.system,
            };
            let p = reg::load_profile_file(f, &system)?;
            println!(
                "ok: {} (board={}, attributes={})",
                p.name,
                p.board,
                p.len()
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&p.attributes())?);
            }
        }
        (None, Some(d)) => {
            let registry = reg::load_profiles_dir(d)?;
            println!("ok: loaded {} profiles", registry.len());
            if json {
                let summary: Vec<_> = registry
                    .names()
                    .into_iter()
                    .filter_map(|n| registry.get(n))
                    .map(|p| {
                        serde_json::json!({
                            "name": p.name,
                            "board": p.board,
                            "attributes": p.attributes(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
        }
        _ => {
            return Err(anyhow::anyhow!("provide --file <path> or --dir <dir>"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_decode_with_split_hex() {
        let cli = Cli::try_parse_from(["af", "decode", "MCUUpdateAll1B", "1", "e7", "00"]).unwrap();
        match cli.command {
            Commands::Decode { profile, id, data, ts } => {
                assert_eq!(profile, "MCUUpdateAll1B");
                assert_eq!(id, 1);
                assert_eq!(data, vec!["e7", "00"]);
                assert!(!ts);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn encode_against_builtin_tables() {
        let cli = Cli::try_parse_from(["af", "encode", "MCUUpdateAll2", "65012", "7"]).unwrap();
        let hub = reg::MetricsHub::new().unwrap();
        run(&cli, &hub).unwrap();
        assert_eq!(hub.codec.values_encoded.get(), 1);
        assert_eq!(hub.codec.profiles_loaded.get(), 3);

        let cli = Cli::try_parse_from(["af", "lookup", "MCUUpdateAll1B", "1202"]).unwrap();
        assert!(run(&cli, &hub).is_err());
        assert_eq!(hub.codec.codec_errors.get(), 1);
    }
}
