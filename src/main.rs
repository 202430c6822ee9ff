use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use ssq::analysis::DEFAULT_TOP_N;
use ssq::config::{DEFAULT_CONFIG_PATH, load_config};
use ssq::fetch::Fetcher;
use ssq::model::{SortOrder, sort_records};
use ssq::pipeline::{
    DEFAULT_ANALYSIS_LIMIT, DEFAULT_RECENT_LIMIT, DrawList, draw_by_issue, draws_in_range,
    frequency_analysis, frequency_of, missing_analysis, missing_of, proxy_status, recent_draws,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ssq", about = "Double color ball draw history scraper and analyzer")]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print results as JSON instead of markdown tables
    #[arg(long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Most recent draws
    Recent {
        #[arg(long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
        #[arg(long, default_value_t = false)]
        analyze: bool,
    },
    /// Draws within an inclusive issue range, given as `START END` or `START-END`
    Range {
        start: String,
        end: Option<String>,
        #[arg(long, default_value_t = false)]
        analyze: bool,
    },
    /// A single draw
    Issue { issue: String },
    /// Ball frequency over the most recent draws
    Frequency {
        #[arg(long, default_value_t = DEFAULT_ANALYSIS_LIMIT)]
        limit: usize,
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top: usize,
    },
    /// Draws since each ball was last seen
    Missing {
        #[arg(long, default_value_t = DEFAULT_ANALYSIS_LIMIT)]
        limit: usize,
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top: usize,
    },
    /// Configured proxy
    Proxy,
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    let command = cli.command.unwrap_or(Commands::Recent {
        limit: DEFAULT_RECENT_LIMIT,
        analyze: true,
    });

    if let Commands::Proxy = command {
        let status = proxy_status(&config);
        if cli.json {
            print_json(&status)?;
        } else {
            match &status.proxy {
                Some(proxy) => println!("proxy: {proxy} (enabled)"),
                None => println!("proxy: none (disabled)"),
            }
        }
        return Ok(());
    }

    let fetcher = Fetcher::new(config.fetch)?;

    match command {
        Commands::Recent { limit, analyze } => {
            info!(limit, "fetching recent draws");
            let draws = recent_draws(&fetcher, limit);
            print_draws(&format!("Most recent {limit} draws"), draws, analyze, cli.json)?;
        }
        Commands::Range {
            start,
            end,
            analyze,
        } => {
            let (start, end) = parse_range(&start, end.as_deref())?;
            let draws = draws_in_range(&fetcher, &start, &end);
            print_draws(
                &format!("Draws {start} to {end}"),
                draws,
                analyze,
                cli.json,
            )?;
        }
        Commands::Issue { issue } => {
            let draws = draw_by_issue(&fetcher, &issue);
            print_draws(&format!("Draw {issue}"), draws, false, cli.json)?;
        }
        Commands::Frequency { limit, top } => {
            let analysis = frequency_analysis(&fetcher, limit, top);
            if cli.json {
                print_json(&analysis)?;
            } else {
                println!("{}", analysis.markdown);
            }
        }
        Commands::Missing { limit, top } => {
            let analysis = missing_analysis(&fetcher, limit, top);
            if cli.json {
                print_json(&analysis)?;
            } else {
                println!("{}", analysis.markdown);
            }
        }
        Commands::Proxy => {}
    }

    Ok(())
}

fn print_draws(title: &str, draws: DrawList, analyze: bool, json: bool) -> Result<()> {
    // Frequency ties resolve by first appearance, so analyze newest first.
    let mut window = draws.data.clone();
    sort_records(&mut window, SortOrder::Descending);

    if json {
        if analyze {
            let frequency = frequency_of(&window, DEFAULT_TOP_N);
            let missing = missing_of(&window, DEFAULT_TOP_N);
            return print_json(&serde_json::json!({
                "draws": draws,
                "frequency": frequency,
                "missing": missing,
            }));
        }
        return print_json(&draws);
    }

    println!("## {title}\n");
    println!("{}", draws.markdown);
    if analyze {
        println!("\n{}", frequency_of(&window, DEFAULT_TOP_N).markdown);
        println!("\n{}", missing_of(&window, DEFAULT_TOP_N).markdown);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_range(start: &str, end: Option<&str>) -> Result<(String, String)> {
    if let Some(end) = end {
        return Ok((start.to_string(), end.to_string()));
    }
    match start.split_once('-') {
        Some((a, b)) if !a.is_empty() && !b.is_empty() => Ok((a.to_string(), b.to_string())),
        _ => bail!("issue range must look like START-END, got {start}"),
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}
