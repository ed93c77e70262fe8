use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use aoc_race::config::Config;
use aoc_race::orchestration::{RaceService, ServiceSettings};
use aoc_race::pipeline::{ClaudePipeline, PipelineJob, SolvingPipeline, StageReporter, Strategy};
use aoc_race::race::{Part, StageEvent};
use aoc_race::source::{AocConnector, SourceConnector};
use aoc_race::{rlog, server, Error, Result};

/// aoc-race - race an autonomous Claude pipeline on Advent of Code puzzles
#[derive(Parser, Debug)]
#[command(name = "aoc-race")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    AOC_SESSION=...     Default puzzle-site session token\n    AOC_RACE_DEBUG=1    Enable debug logging (alternative to --debug)")]
pub struct Cli {
    /// Enable debug logging (writes to ~/.aoc-race/race.log)
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Serve the race API (default)
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the solving pipeline on one puzzle part, outside a race
    Solve {
        #[arg(long)]
        year: u16,

        #[arg(long)]
        day: u8,

        /// Puzzle part (1 or 2)
        #[arg(long, default_value_t = 1)]
        part: u8,

        /// Use the one-shot solver instead of the multi-agent pipeline
        #[arg(long)]
        fast: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    aoc_race::log::init(cli.debug);

    let config = Config::load()?;
    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => run_serve(&config, host, port),
        Command::Solve {
            year,
            day,
            part,
            fast,
        } => run_solve(&config, year, day, Part::try_from(part)?, fast),
    }
}

fn run_serve(config: &Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| config.host().to_string());
    let port = port.unwrap_or(config.port());
    rlog!("Serve: host={} port={} base_url={}", host, port, config.base_url());

    let pipeline = ClaudePipeline::from_config(config)?;
    let service = RaceService::new(
        Arc::new(AocConnector::new(config.base_url())),
        Arc::new(pipeline),
        ServiceSettings::from_config(config)?,
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(server::serve(&host, port, service))
}

/// Prints stage events as they arrive.
struct PrintReporter {
    started: Instant,
}

impl StageReporter for PrintReporter {
    fn report(&self, event: StageEvent) {
        println!(
            "[{:>7.1}s] {:<11} {}",
            self.started.elapsed().as_secs_f64(),
            event.stage,
            event.message
        );
    }
}

fn run_solve(config: &Config, year: u16, day: u8, part: Part, fast: bool) -> Result<()> {
    let session = Config::env_session().ok_or(Error::MissingSession)?;
    let strategy = if fast {
        Strategy::OneShot
    } else {
        config.strategy()
    };
    rlog!("Solve: {}/{} part {} strategy={}", year, day, part, strategy);

    let pipeline = ClaudePipeline::from_config(config)?;
    let source = AocConnector::new(config.base_url()).connect(&session)?;
    let workspace_root = config.workspace_dir()?;

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async move {
        // A part the account already solved is verified locally.
        let completion = source.fetch_completion_status(year, day).await?;
        let known_answer = completion.answer(part).map(str::to_string);
        if known_answer.is_some() {
            println!("Part {part} already solved on this account; verifying locally.");
        }

        let job = PipelineJob {
            year,
            day,
            part,
            strategy,
            workspace_root,
            known_answer,
            source,
            cancel: CancellationToken::new(),
        };
        let reporter = Arc::new(PrintReporter {
            started: Instant::now(),
        });
        pipeline.run(job, reporter).await
    })?;

    let json_output = serde_json::json!({
        "year": year,
        "day": day,
        "part": part,
        "success": result.success,
        "answer": result.answer,
        "message": result.message,
    });
    println!("{}", serde_json::to_string_pretty(&json_output)?);
    Ok(())
}
