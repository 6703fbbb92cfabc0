use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use award_oracle::chart::{load_chart, AwardChart, ChartResolver, ProgramId, Route};
use award_oracle::config::{Config, ConfigOverrides};
use award_oracle::evaluator::{evaluate_route, RouteEvaluation};
use award_oracle::output::csv::{evaluation_to_csv, wallets_to_csv};
use award_oracle::output::render_json;
use award_oracle::output::table::{
    render_balances_table, render_evaluation_table, render_routes_table, render_topup_table,
    render_wallets_table,
};
use award_oracle::server::run_server;
use award_oracle::simulator::{simulate_top_up, TopUp, TopUpOutcome};
use award_oracle::wallet::{aggregate, BalanceSheet, WalletRecord, WalletSource, WalletStore};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "award-oracle",
    about = "Award redemption intelligence for loyalty point wallets"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long)]
    user: Option<String>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    /// Override an aggregated balance, e.g. --balance amex_mr=40000.
    /// Repeatable; replaces the stored balance for that program.
    #[arg(short = 'b', long = "balance", value_name = "PROGRAM=POINTS")]
    balances: Vec<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Evaluate every priced program for a route
    Evaluate {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Re-evaluate a route under a hypothetical top-up
    Topup {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        program: String,
        #[arg(long)]
        amount: u64,
    },
    /// Manage stored wallet balances
    Wallets {
        #[command(subcommand)]
        command: WalletsCommand,
    },
    /// List the routes the chart prices
    Routes,
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 3001)]
        port: u16,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[derive(Debug, Subcommand)]
enum WalletsCommand {
    List,
    Add {
        #[arg(long)]
        program: String,
        #[arg(long)]
        points: u64,
    },
    Remove {
        #[arg(long)]
        program: String,
    },
    /// Reset the user's wallets to the canonical demo balances
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        user_email: cli.user.clone(),
        db_path: None,
    });

    if matches!(cli.command, Commands::Config { .. }) {
        return handle_config_command(&cli.command, &config, &config_path);
    }
    if let Commands::Serve { host, port } = &cli.command {
        let bind = format!("{host}:{port}");
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
        return run_server(config, addr).await;
    }

    let resolver = build_resolver(&config)?;
    let graph = config.transfer_graph();
    let store = WalletStore::open(&config.resolved_db_path())?;
    let user = config.user.email.clone();
    let overrides = parse_balance_overrides(&cli.balances)?;

    match &cli.command {
        Commands::Evaluate { from, to } => {
            let route = Route::new(from, to)?;
            let balances = load_balances(&store, &user, &overrides)?;
            let evaluation = evaluate_route(&route, &balances, &resolver, &graph);
            print_evaluation(&evaluation, &balances, &config, cli.output)?;
        }
        Commands::Topup {
            from,
            to,
            program,
            amount,
        } => {
            let route = Route::new(from, to)?;
            let program = ProgramId::from_str(program)?;
            let balances = load_balances(&store, &user, &overrides)?;
            let outcome = simulate_top_up(
                Some(TopUp {
                    program,
                    amount: *amount,
                }),
                &route,
                &balances,
                &resolver,
                &graph,
            );
            print_topup(&outcome, cli.output)?;
        }
        Commands::Wallets { command } => match command {
            WalletsCommand::List => {
                let records = store.load_wallets(&user)?;
                print_wallets(&records, cli.output)?;
            }
            WalletsCommand::Add { program, points } => {
                let slug = program.trim().to_ascii_lowercase();
                if slug.is_empty() {
                    return Err(anyhow!("program is required"));
                }
                if ProgramId::from_str(&slug).is_err() {
                    warn!("program {slug} is not recognized; it will be stored for display only");
                }
                store.upsert_wallet(&user, &slug, *points)?;
                let records = store.load_wallets(&user)?;
                print_wallets(&records, cli.output)?;
            }
            WalletsCommand::Remove { program } => {
                let removed = store.delete_wallet(&user, program.trim())?;
                if !removed {
                    warn!("no wallet found for {user} / {program}");
                }
                let records = store.load_wallets(&user)?;
                print_wallets(&records, cli.output)?;
            }
            WalletsCommand::Seed => {
                let count = store.seed_demo(&user)?;
                println!("Seeded {count} wallets for {user}");
                let records = store.load_wallets(&user)?;
                print_wallets(&records, cli.output)?;
            }
        },
        Commands::Routes => {
            print_routes(&resolver, cli.output)?;
        }
        Commands::Config { .. } => {}
        Commands::Serve { .. } => unreachable!("serve command handled before dispatch"),
    }

    Ok(())
}

fn handle_config_command(command: &Commands, config: &Config, config_path: &PathBuf) -> Result<()> {
    let Commands::Config { init, show } = command else {
        return Ok(());
    };
    if *init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if *show || !*init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn build_resolver(config: &Config) -> Result<ChartResolver> {
    let chart = match config.resolved_chart_path() {
        Some(path) => load_chart(&path)?,
        None => AwardChart::builtin(),
    };
    Ok(ChartResolver::new(chart, config.chart.policy))
}

fn parse_balance_overrides(raw: &[String]) -> Result<Vec<(ProgramId, u64)>> {
    let mut out = Vec::new();
    for entry in raw {
        let (slug, points) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("expected PROGRAM=POINTS, got {entry}"))?;
        let program = ProgramId::from_str(slug)?;
        let points: u64 = points
            .trim()
            .parse()
            .map_err(|e| anyhow!("bad points in {entry}: {e}"))?;
        out.push((program, points));
    }
    Ok(out)
}

fn load_balances(
    store: &WalletStore,
    user: &str,
    overrides: &[(ProgramId, u64)],
) -> Result<BalanceSheet> {
    let records = store.load_wallets(user)?;
    let mut balances = aggregate(&records);
    for (program, points) in overrides {
        balances.set_points(*program, *points);
    }
    Ok(balances)
}

fn print_evaluation(
    evaluation: &RouteEvaluation,
    balances: &BalanceSheet,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!(
                "{}",
                render_evaluation_table(evaluation, config.valuation.top_up_cents_per_point)
            );
            println!("Your balances:");
            println!(
                "{}",
                render_balances_table(balances, evaluation.best_bookable_now)
            );
        }
        OutputFormat::Json => println!("{}", render_json(evaluation)?),
        OutputFormat::Csv => println!("{}", evaluation_to_csv(evaluation)?),
    }
    Ok(())
}

fn print_topup(outcome: &TopUpOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_topup_table(outcome)),
        OutputFormat::Json => println!("{}", render_json(outcome)?),
        OutputFormat::Csv => {
            warn!("CSV output for topup not implemented, using JSON");
            println!("{}", render_json(outcome)?);
        }
    }
    Ok(())
}

fn print_wallets(records: &[WalletRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", render_wallets_table(records));
            let total = aggregate(records).total_points();
            println!("Total: {total} pts");
        }
        OutputFormat::Json => println!("{}", render_json(records)?),
        OutputFormat::Csv => println!("{}", wallets_to_csv(records)?),
    }
    Ok(())
}

fn print_routes(resolver: &ChartResolver, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_routes_table(resolver)),
        OutputFormat::Json => {
            let listings: BTreeMap<String, BTreeMap<ProgramId, u64>> = resolver
                .routes()
                .map(|(route, prices)| (route.to_string(), prices.clone()))
                .collect();
            println!("{}", render_json(&listings)?);
        }
        OutputFormat::Csv => {
            warn!("CSV output for routes not implemented, using JSON");
            let listings: BTreeMap<String, BTreeMap<ProgramId, u64>> = resolver
                .routes()
                .map(|(route, prices)| (route.to_string(), prices.clone()))
                .collect();
            println!("{}", render_json(&listings)?);
        }
    }
    Ok(())
}
