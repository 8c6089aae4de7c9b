//! Gavel: command-line front end for token-gated treasury governance.
//!
//! Each invocation opens the LMDB state under the data directory, performs
//! one operation, and exits.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use gavel_governance::{
    Collaborators, FixedPriceMarketplace, GovernanceEngine, Proposal, SystemClock, VoteChoice,
};
use gavel_store::GovernanceStore;
use gavel_store_lmdb::LmdbEnvironment;
use gavel_types::{Amount, AssetId, EntityId, ProposalId, Timestamp};
use gavel_utils::{format_duration, init_logging, LogFormat};

use crate::config::DaemonConfig;

#[derive(Parser)]
#[command(name = "gavel", about = "Token-gated treasury governance")]
struct Cli {
    /// Data directory for governance state.
    #[arg(long, env = "GAVEL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "GAVEL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "GAVEL_LOG_FORMAT")]
    log_format: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "GAVEL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Create the treasury. Fails if state already exists.
    Init {
        /// Treasury owner (defaults to `owner` from the config file).
        #[arg(long)]
        owner: Option<EntityId>,
        /// Initial funding in raw units (defaults to `params.initial_treasury`).
        #[arg(long)]
        fund: Option<Amount>,
    },
    /// Deposit raw units into the treasury.
    Fund { amount: Amount },
    /// Propose buying an asset.
    Propose {
        #[arg(long = "as", value_name = "ENTITY")]
        requester: EntityId,
        asset: AssetId,
    },
    /// Vote yay or nay on an open proposal.
    Vote {
        #[arg(long = "as", value_name = "ENTITY")]
        voter: EntityId,
        proposal: ProposalId,
        choice: VoteChoice,
    },
    /// Execute a proposal whose voting window has closed.
    Execute { proposal: ProposalId },
    /// Withdraw treasury funds to the owner (everything available when no
    /// amount is given).
    Withdraw {
        #[arg(long = "as", value_name = "ENTITY")]
        requester: EntityId,
        amount: Option<Amount>,
    },
    /// List every proposal in creation order.
    List,
    /// Show one proposal in detail.
    Show { proposal: ProposalId },
    /// Show the treasury.
    Treasury,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DaemonConfig::from_toml_file(path)?,
        None => DaemonConfig::default(),
    };
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    let format: LogFormat = config.log_format.parse().map_err(anyhow::Error::msg)?;
    init_logging(format, &config.log_level);
    tracing::debug!(data_dir = %config.data_dir.display(), "configuration loaded");

    let env = LmdbEnvironment::open_default(&config.data_dir)
        .with_context(|| format!("opening state in {}", config.data_dir.display()))?;
    let store: Arc<dyn GovernanceStore> = Arc::new(env.governance_store());
    let market = Arc::new(config.marketplace());

    if let Command::Init { owner, fund } = cli.command {
        let owner = match owner.or_else(|| config.owner.as_deref().map(EntityId::new)) {
            Some(owner) => owner,
            None => bail!("no treasury owner: pass --owner or set `owner` in the config file"),
        };
        if !owner.is_valid() {
            bail!("invalid owner id {owner:?}");
        }
        let mut params = config.params.clone();
        if let Some(fund) = fund {
            params.initial_treasury = fund;
        }
        let engine =
            GovernanceEngine::initialize(params, owner, collaborators(&config, market), store)?;
        let record = engine.treasury().record();
        println!("treasury initialized: owner {}, balance {}", record.owner, record.balance);
        return Ok(());
    }

    let engine = GovernanceEngine::restore(
        config.params.clone(),
        collaborators(&config, Arc::clone(&market)),
        store,
    )
    .context("loading governance state (run `gavel init` first)")?;
    market.mark_sold(
        engine
            .list_all()
            .filter(|p| p.outcome.as_ref().is_some_and(|o| o.is_purchase()))
            .map(|p| p.target),
    );

    run(&engine, cli.command).await
}

fn collaborators(config: &DaemonConfig, market: Arc<FixedPriceMarketplace>) -> Collaborators {
    Collaborators {
        oracle: Arc::new(config.balance_oracle()),
        marketplace: market,
        clock: Arc::new(SystemClock),
    }
}

async fn run(engine: &GovernanceEngine, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Init { .. } => bail!("governance state is already initialized"),
        Command::Fund { amount } => {
            let balance = engine.fund(amount)?;
            println!("treasury balance: {balance}");
        }
        Command::Propose { requester, asset } => {
            let id = engine.create_proposal(asset, &requester).await?;
            let proposal = engine.get(id)?;
            println!("created proposal {id} for {asset}, voting closes at {}", proposal.deadline);
        }
        Command::Vote {
            voter,
            proposal,
            choice,
        } => {
            engine.vote(proposal, &voter, choice).await?;
            let p = engine.get(proposal)?;
            println!(
                "{voter} voted {choice} on {proposal}: yay {} / nay {}",
                p.yay_weight, p.nay_weight
            );
        }
        Command::Execute { proposal } => {
            let outcome = engine.execute(proposal).await?;
            println!("proposal {proposal}: {outcome}");
        }
        Command::Withdraw { requester, amount } => {
            let transfer = match amount {
                Some(amount) => engine.withdraw(&requester, amount)?,
                None => engine.withdraw_all(&requester)?,
            };
            println!(
                "withdrew {} to {}, treasury balance: {}",
                transfer.amount,
                transfer.to,
                engine.treasury().balance()
            );
        }
        Command::List => {
            let now = Timestamp::now();
            if engine.proposal_count() == 0 {
                println!("no proposals");
            }
            for proposal in engine.list_all() {
                println!("{}", summary(&proposal, now));
            }
        }
        Command::Show { proposal } => {
            let p = engine.get(proposal)?;
            let now = Timestamp::now();
            println!("{}", summary(&p, now));
            println!("  proposer:   {}", p.proposer);
            println!("  created at: {}", p.created_at);
            println!("  deadline:   {}", p.deadline);
            println!("  verdict:    {:?}", engine.preview(proposal)?);
            for voter in p.voters() {
                if let Some(ballot) = p.ballot(voter) {
                    println!("  {voter}: {} ({})", ballot.choice, ballot.weight);
                }
            }
        }
        Command::Treasury => {
            let treasury = engine.treasury();
            println!("owner:     {}", treasury.owner());
            println!("balance:   {}", treasury.balance());
            println!("proposals: {}", engine.proposal_count());
        }
    }
    Ok(())
}

fn summary(proposal: &Proposal, now: Timestamp) -> String {
    let status = match &proposal.outcome {
        Some(outcome) => format!("executed: {outcome}"),
        None if proposal.is_open(now) => format!(
            "open, {} left",
            format_duration(proposal.deadline.remaining_from(now))
        ),
        None => "awaiting execution".to_string(),
    };
    format!(
        "{} {} yay {} / nay {} [{}]",
        proposal.id, proposal.target, proposal.yay_weight, proposal.nay_weight, status
    )
}
