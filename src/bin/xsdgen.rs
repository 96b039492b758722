//! Command-line front end: resolve schema documents and emit the model as
//! JSON for a downstream renderer.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use xsdgen::overrides::{PackageOverrides, TypeOverrides};
use xsdgen::{Error, ResolverConfig, Result, Workspace};

#[derive(Parser, Debug)]
#[command(
    name = "xsdgen",
    version,
    about = "Resolve XSD schema workspaces into a renderer-ready model"
)]
struct Cli {
    /// Schema documents to load, in order.
    #[arg(required = true, value_name = "SCHEMA")]
    schemas: Vec<PathBuf>,

    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root module path used to qualify cross-namespace imports.
    #[arg(long, value_name = "PATH")]
    module_path: Option<String>,

    /// Rename the package derived for a namespace.
    #[arg(long = "package-override", value_name = "NS=PKG")]
    package_overrides: Vec<String>,

    /// Map a type to an explicit target primitive.
    #[arg(long = "type-override", value_name = "NS:NAME=TARGET")]
    type_overrides: Vec<String>,

    /// Write the model to a file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ResolverConfig::from_toml_file(path)?,
        None => ResolverConfig::default(),
    };
    if let Some(module_path) = cli.module_path {
        config.module_path = module_path;
    }
    config
        .package_overrides
        .merge(PackageOverrides::parse_args(&cli.package_overrides)?);
    config
        .type_overrides
        .merge(TypeOverrides::parse_args(&cli.type_overrides)?);

    let mut workspace = Workspace::new(config);
    workspace.load_all(&cli.schemas)?;
    let model = workspace.export()?;

    let json = serde_json::to_string_pretty(&model)?;
    match cli.output {
        Some(path) => fs::write(&path, json).map_err(|source| Error::Io { path, source })?,
        None => println!("{json}"),
    }
    Ok(())
}
