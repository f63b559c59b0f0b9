use anyhow::{bail, Context, Result};
use cgopy_weld::build::{BindConfig, BindingBuilder};
use cgopy_weld::codegen::HostAbi;
use std::env;
use std::path::PathBuf;

const USAGE: &str =
    "usage: cgopy <package.json> [--out DIR] [--config FILE] [--abi cpython2|cpython3]";

/// Parsed command line
#[derive(Debug, Default, PartialEq)]
struct Args {
    package: PathBuf,
    out_dir: PathBuf,
    config: Option<PathBuf>,
    abi: Option<HostAbi>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut package = None;
    let mut parsed = Args {
        out_dir: PathBuf::from("."),
        ..Args::default()
    };

    while let Some(a) = args.next() {
        match a.as_str() {
            "--out" => {
                parsed.out_dir = PathBuf::from(args.next().context("--out requires a directory")?);
            }
            "--config" => {
                parsed.config = Some(PathBuf::from(
                    args.next().context("--config requires a path")?,
                ));
            }
            "--abi" => {
                let abi = args.next().context("--abi requires a value")?;
                parsed.abi = Some(abi.parse::<HostAbi>().map_err(anyhow::Error::msg)?);
            }
            "-h" | "--help" => bail!(USAGE),
            flag if flag.starts_with("--") => bail!("unknown flag {}\n{}", flag, USAGE),
            path => {
                if package.replace(PathBuf::from(path)).is_some() {
                    bail!("more than one package description given\n{}", USAGE);
                }
            }
        }
    }

    parsed.package = package.with_context(|| format!("missing package description\n{}", USAGE))?;
    Ok(parsed)
}

fn main() -> Result<()> {
    // CGOPY_LOG selects the log level, default "info"
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("CGOPY_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = parse_args(env::args().skip(1))?;

    let mut config = match &args.config {
        Some(path) => BindConfig::load(path)
            .with_context(|| format!("loading config at {}", path.display()))?,
        None => BindConfig::default(),
    };
    if let Some(abi) = args.abi {
        config.abi = abi;
    }

    let output = BindingBuilder::from_json_file(&args.package)
        .with_context(|| format!("reading package description at {}", args.package.display()))?
        .config(config)
        .out_dir(&args.out_dir)
        .build()
        .context("generating bindings")?;

    tracing::info!(
        "Wrote {} and {}",
        output.header.display(),
        output.source.display()
    );
    Ok(())
}
