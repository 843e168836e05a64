// src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use plugin_resolver::{
    Configuration, ConfigurationProvider, FileResource, ResolverContext, SettingsLocator,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "plugin-resolver")]
#[command(author, version, about = "Resolve plugin artifacts and their dependencies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the plugins of a configuration file
    Resolve {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Resolver settings file (default: ivysettings.xml in the usual places)
        #[arg(short, long)]
        settings: Option<String>,

        /// Only use artifacts already in the local cache
        #[arg(long)]
        offline: bool,

        /// Report resolution progress
        #[arg(short, long)]
        verbose: bool,
    },

    /// List the files selected by a file resource
    Files {
        /// Root file or directory
        path: PathBuf,

        /// File extensions to select (repeatable)
        #[arg(long = "ext")]
        extensions: Vec<String>,

        /// Include patterns (repeatable)
        #[arg(long = "include")]
        includes: Vec<String>,

        /// Exclude patterns (repeatable)
        #[arg(long = "exclude")]
        excludes: Vec<String>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            config,
            settings,
            offline,
            verbose,
        } => {
            init_logging(verbose);

            let mut configuration = Configuration::from_toml_file(&config)?;
            info!(
                "Loaded {} plugin(s) from {}",
                configuration.plugins().len(),
                config.display()
            );

            let mut locator = SettingsLocator::new();
            if let Some(file) = settings {
                locator = locator.with_file_name(file);
            }
            let context = Arc::new(ResolverContext::new(locator));
            let mut session = context.session().offline(offline).verbose(verbose);

            session
                .load(&mut configuration)
                .with_context(|| format!("Failed to resolve plugins of {}", config.display()))?;

            for entry in configuration.scope().search_path() {
                println!("{}", entry.display());
            }
            Ok(())
        }
        Commands::Files {
            path,
            extensions,
            includes,
            excludes,
        } => {
            init_logging(false);

            let resource = FileResource::new(path)
                .with_extensions(extensions)
                .with_includes(includes)
                .with_excludes(excludes);
            for file in resource.iter()? {
                println!("{}", file.display());
            }
            Ok(())
        }
    }
}
