use std::{fs, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ed25519_dalek::SigningKey;
use rand::{rngs::OsRng, RngCore};
use tracing::info;

use table_ladder::{
    ledger::Asset,
    units::{format_units, parse_units},
    Address, CallReceipt, Game, GameConfig, GameEvent,
};

/// Table ladder: verification, sequential table purchases and reward splits
/// over a local JSON state file.
#[derive(Parser)]
#[command(name = "table-ladder")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Game state file (JSON)
    #[arg(
        short,
        long,
        global = true,
        env = "TABLE_LADDER_STATE",
        default_value = "table-ladder.state.json"
    )]
    state: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a fresh game into the state file
    Init {
        /// Config file (JSON); overrides the address flags
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long, required_unless_present = "config")]
        root: Option<Address>,

        #[arg(long, required_unless_present = "config")]
        charity: Option<Address>,

        #[arg(long, required_unless_present = "config")]
        stable_token: Option<Address>,

        /// Engine account; derived from the other addresses when omitted
        #[arg(long)]
        engine: Option<Address>,

        /// Overwrite an existing state file
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Generate an ed25519 keypair and print its participant address
    Keygen {
        /// Directory for sk.hex / pk.hex / address.txt
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Credit an address from the simulation faucet
    Mint {
        address: Address,
        /// Decimal amount, e.g. 0.1
        amount: String,
        #[arg(long, value_enum, default_value = "native")]
        asset: AssetArg,
    },

    /// Approve the engine to pull stable tokens from OWNER
    Approve { owner: Address, amount: String },

    /// Pay the verification fee
    Verify { caller: Address },

    /// Buy the caller's next table
    Buy {
        caller: Address,
        /// Decimal amount; must equal the next table threshold
        amount: String,
        /// Referrer recorded on first entry (defaults to root)
        #[arg(short, long)]
        referrer: Option<Address>,
    },

    /// Plain value transfer to the engine
    Send { caller: Address, amount: String },

    /// Make an address refuse (or accept again) native transfers
    RejectNative {
        address: Address,
        #[arg(long, default_value_t = false)]
        off: bool,
    },

    /// Show a participant
    Info { address: Address },

    /// Show a participant's membership of one table
    InfoTable { table: usize, address: Address },

    /// List tables with thresholds and roster sizes
    Tables,

    /// Print balances, height and the state root
    Snapshot,
}

#[derive(Clone, Copy, ValueEnum)]
enum AssetArg {
    Native,
    Stable,
}

impl From<AssetArg> for Asset {
    fn from(value: AssetArg) -> Self {
        match value {
            AssetArg::Native => Asset::Native,
            AssetArg::Stable => Asset::Stable,
        }
    }
}

//==================== helpers ====================//

fn amount_arg(text: &str) -> Result<u128> {
    parse_units(text).with_context(|| format!("invalid amount {text:?}"))
}

fn load(cli: &Cli) -> Result<Game> {
    Game::load(&cli.state).with_context(|| format!("load state {}", cli.state.display()))
}

fn store(cli: &Cli, game: &Game) -> Result<()> {
    game.save(&cli.state)
        .with_context(|| format!("save state {}", cli.state.display()))
}

fn print_receipt(receipt: &CallReceipt) {
    println!("#{} caller={} digest={}", receipt.height, receipt.caller, hex::encode(receipt.digest));
    for event in &receipt.events {
        match event {
            GameEvent::UserVerification { user } => println!("  {} user={user}", event.name()),
            GameEvent::InvestmentReceived { user, value, table } => println!(
                "  {} user={user} value={} table={table}",
                event.name(),
                format_units(*value)
            ),
            GameEvent::ReferralRewardSent { to, value, table }
            | GameEvent::DonationRewardSent { to, value, table }
            | GameEvent::DonationReferralRewardSent { to, value, table }
            | GameEvent::CharitySent { to, value, table } => println!(
                "  {} to={to} value={} table={table}",
                event.name(),
                format_units(*value)
            ),
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

//==================== commands ====================//

fn init_cmd(
    cli: &Cli,
    config_path: Option<&PathBuf>,
    addresses: (Option<Address>, Option<Address>, Option<Address>),
    engine: Option<Address>,
    force: bool,
) -> Result<()> {
    if cli.state.exists() && !force {
        bail!("{} already exists (use --force)", cli.state.display());
    }
    let config = match (config_path, addresses) {
        (Some(path), _) => {
            GameConfig::load(path).with_context(|| format!("load config {}", path.display()))?
        }
        (None, (Some(root), Some(charity), Some(stable_token))) => {
            let engine = engine.unwrap_or_else(|| {
                let mut seed = Vec::with_capacity(60);
                seed.extend_from_slice(root.as_bytes());
                seed.extend_from_slice(charity.as_bytes());
                seed.extend_from_slice(stable_token.as_bytes());
                Address::derive(&seed)
            });
            GameConfig::new(root, charity, stable_token, engine)
        }
        _ => bail!("either --config or --root/--charity/--stable-token is required"),
    };
    let game = Game::new(config)?;
    store(cli, &game)?;
    info!(engine = %game.engine_address(), tables = game.get_tables_count(), "game deployed");
    println!("engine {}", game.engine_address());
    Ok(())
}

fn keygen_cmd(out_dir: Option<&PathBuf>) -> Result<()> {
    let mut sk_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut sk_bytes);
    let sk = SigningKey::from_bytes(&sk_bytes);
    let pk = sk.verifying_key();
    let address = Address::from_verifying_key(&pk);

    if let Some(dir) = out_dir {
        fs::create_dir_all(dir).with_context(|| format!("mkdir {}", dir.display()))?;
        fs::write(dir.join("sk.hex"), hex::encode(sk_bytes))?;
        fs::write(dir.join("pk.hex"), hex::encode(pk.as_bytes()))?;
        fs::write(dir.join("address.txt"), address.to_string())?;
        println!("keypair written → {}", dir.display());
    }
    println!("{address}");
    Ok(())
}

fn tables_cmd(game: &Game) -> Result<()> {
    for table in 1..=game.get_tables_count() {
        println!(
            "table {table:>2}  threshold={:<8} addresses={}",
            format_units(game.get_table_threshold(table)?),
            game.get_table_addresses_count(table)?
        );
    }
    println!("retained pool {}", format_units(game.retained_pool()));
    Ok(())
}

//==================== main ====================//

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Init {
            config,
            root,
            charity,
            stable_token,
            engine,
            force,
        } => init_cmd(
            cli,
            config.as_ref(),
            (*root, *charity, *stable_token),
            *engine,
            *force,
        ),
        Commands::Keygen { out_dir } => keygen_cmd(out_dir.as_ref()),
        Commands::Mint {
            address,
            amount,
            asset,
        } => {
            let mut game = load(cli)?;
            game.mint(*address, (*asset).into(), amount_arg(amount)?)?;
            store(cli, &game)
        }
        Commands::Approve { owner, amount } => {
            let mut game = load(cli)?;
            game.approve(*owner, amount_arg(amount)?);
            store(cli, &game)
        }
        Commands::Verify { caller } => {
            let mut game = load(cli)?;
            let receipt = game.verify(*caller)?;
            store(cli, &game)?;
            print_receipt(&receipt);
            Ok(())
        }
        Commands::Buy {
            caller,
            amount,
            referrer,
        } => {
            let mut game = load(cli)?;
            let referrer = referrer.unwrap_or(Address::ZERO);
            let receipt = game.buy(*caller, referrer, amount_arg(amount)?)?;
            store(cli, &game)?;
            print_receipt(&receipt);
            Ok(())
        }
        Commands::Send { caller, amount } => {
            let mut game = load(cli)?;
            let receipt = game.send(*caller, amount_arg(amount)?)?;
            store(cli, &game)?;
            print_receipt(&receipt);
            Ok(())
        }
        Commands::RejectNative { address, off } => {
            let mut game = load(cli)?;
            game.set_rejects_native(*address, !*off);
            store(cli, &game)
        }
        Commands::Info { address } => print_json(&load(cli)?.info(address)),
        Commands::InfoTable { table, address } => {
            print_json(&load(cli)?.info_table(*table, address)?)
        }
        Commands::Tables => tables_cmd(&load(cli)?),
        Commands::Snapshot => {
            let snapshot = load(cli)?.snapshot();
            println!("height {}", snapshot.meta.height);
            for (account, balance) in &snapshot.accounts {
                println!(
                    "{account}  native={} stable={}",
                    format_units(balance.native),
                    format_units(balance.stable)
                );
            }
            println!("root {}", hex::encode(snapshot.merkle_root));
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    run(&cli)
}
