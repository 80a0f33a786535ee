use clap::{Parser, Subcommand};
use env_logger::Env;
use log::debug;
use std::path::PathBuf;
use std::time::Duration;

use relpack::compile::{self, PassthroughCompiler};
use relpack::config::Config;
use relpack::pipeline;
use relpack::tasks::TaskGraph;
use relpack::watch;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Remove the compiled-output directory
    CleanOut,
    /// Clean, then recompile every source module
    Compile,
    /// Recompile only modules whose output is stale
    CompileIncremental,
    /// Recompile incrementally whenever a source module changes
    Watch,
    /// Remove the release directory
    CleanRelease,
    /// Produce the dev and min release artifacts
    Release,
}

fn task_graph() -> anyhow::Result<TaskGraph> {
    let mut graph = TaskGraph::new();
    graph.add_task("clean-out", compile::clean_out);
    graph.add_task("compile", |config| {
        compile::compile(config, &PassthroughCompiler, false)
    });
    graph.add_task("compile-incremental", |config| {
        compile::compile(config, &PassthroughCompiler, true)
    });
    graph.add_task("clean-release", compile::clean_release);
    graph.add_task("release", pipeline::release);

    graph.add_prerequisite("compile", "clean-out")?;
    graph.add_prerequisite("release", "clean-release")?;
    graph.add_prerequisite("release", "compile")?;
    Ok(graph)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.verbose {
        config.verbose_compile = true;
    }
    debug!("Configuration: {:?}", config);

    let graph = task_graph()?;

    match cli.command {
        Command::CleanOut => graph.run("clean-out", &config),
        Command::Compile => graph.run("compile", &config),
        Command::CompileIncremental => graph.run("compile-incremental", &config),
        Command::CleanRelease => graph.run("clean-release", &config),
        Command::Release => graph.run("release", &config),
        Command::Watch => {
            graph.run("compile", &config)?;
            watch::watch(&config, Duration::from_secs(1))
        }
    }
}
