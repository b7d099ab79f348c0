use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use stocklens::cli::dashboard::Page;
use stocklens::core::ViewMode;
use stocklens::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Args)]
struct TickerArgs {
    /// Ticker symbol, e.g. AAPL
    ticker: String,

    /// Statement granularity for charts
    #[arg(long, value_enum, default_value_t = ViewMode::Ttm)]
    view: ViewMode,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Company overview with key stats, growth charts and earnings
    Main(TickerArgs),
    /// Cash page
    Cash(TickerArgs),
    /// Debt page
    Debt(TickerArgs),
    /// Valuation page
    Valuation(TickerArgs),
    /// Intrinsic value page
    Intrinsic(TickerArgs),
    /// Shares page
    Shares(TickerArgs),
    /// Drop cached company data for one ticker, or all of it
    ClearCache {
        ticker: Option<String>,
    },
}

impl From<Commands> for stocklens::AppCommand {
    fn from(cmd: Commands) -> stocklens::AppCommand {
        let dashboard = |page: Page, args: TickerArgs| stocklens::AppCommand::Dashboard {
            page,
            ticker: args.ticker,
            view: args.view,
        };
        match cmd {
            Commands::Main(args) => dashboard(Page::Main, args),
            Commands::Cash(args) => dashboard(Page::Cash, args),
            Commands::Debt(args) => dashboard(Page::Debt, args),
            Commands::Valuation(args) => dashboard(Page::Valuation, args),
            Commands::Intrinsic(args) => dashboard(Page::IntrinsicValue, args),
            Commands::Shares(args) => dashboard(Page::Shares, args),
            Commands::ClearCache { ticker } => stocklens::AppCommand::ClearCache { ticker },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => stocklens::cli::setup::setup(),
        Some(cmd) => stocklens::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
