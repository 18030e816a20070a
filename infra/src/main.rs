use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use infra::config::SynthConfig;
use infra::{App, ItemsStack};

#[derive(Parser)]
#[command(
    name = "synth",
    about = "Synthesize the items stack into a CloudFormation cloud assembly",
    version
)]
struct Cli {
    /// JSON config file (default: infra.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write templates, manifests and staged assets
    Synth {
        /// Output directory, overrides `output_dir` from the config
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print the stack template to stdout
    Template,
    /// List the stacks in the app
    List,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("infra=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = SynthConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    let mut app = App::new();
    let items = ItemsStack::with_asset_path(
        &mut app,
        &config.stack_name,
        Some(config.stack_props()),
        config.asset_path(),
    )
    .context("failed to declare the items stack")?;

    match cli.command {
        Commands::Synth { out } => {
            let out = out.unwrap_or(config.output_dir);
            let assembly = app.synth(&out)?;
            tracing::info!(
                stacks = assembly.manifest.stacks().count(),
                dir = %assembly.directory.display(),
                "cloud assembly written"
            );
        }
        Commands::Template => {
            let stack = items
                .stack(&app)
                .context("items stack missing from the app")?;
            println!("{}", stack.template().to_json_pretty()?);
        }
        Commands::List => {
            for stack in app.stacks() {
                println!("{}", stack.stack_name());
            }
        }
    }

    Ok(())
}
