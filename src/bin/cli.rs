use alloy::primitives::Address;
use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wallet_engine::{
    Account, ApiKeys, Network, SessionContext, TokenDescriptor, WalletFacade,
};

#[derive(Parser, Debug)]
#[command(name = "wallet-cli")]
#[command(
    about = "Query balances, list transfers and send transactions for an Ethereum wallet",
    long_about = None
)]
struct Args {
    /// Network to operate on (mainnet, ropsten, kovan, rinkeby)
    #[arg(short, long, default_value = "ropsten")]
    network: String,

    /// Hex-encoded private key; falls back to $WALLET_PRIVATE_KEY
    #[arg(long)]
    private_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the balance of the native coin or an ERC20 token
    Balance {
        #[command(flatten)]
        token: TokenArgs,
    },
    /// List token transfers for the wallet, newest first
    History {
        #[command(flatten)]
        token: TokenArgs,
    },
    /// Send a transfer
    Send {
        #[command(flatten)]
        token: TokenArgs,
        /// Recipient address
        #[arg(long)]
        to: Address,
        /// Amount in whole tokens, e.g. 1.5
        #[arg(long)]
        amount: String,
    },
    /// List tokens the wallet holds (mainnet only)
    Discover,
    /// Generate a fresh account and print its address
    Generate,
}

#[derive(ClapArgs, Debug)]
struct TokenArgs {
    /// ERC20 contract address; omit for the native coin
    #[arg(long)]
    contract: Option<Address>,

    /// Token symbol
    #[arg(long, default_value = "native")]
    symbol: String,

    /// Token decimals
    #[arg(long, default_value_t = 18)]
    decimals: u8,
}

impl TokenArgs {
    fn descriptor(&self) -> Result<TokenDescriptor> {
        Ok(match self.contract {
            Some(contract) => TokenDescriptor::erc20(self.symbol.clone(), contract, self.decimals)?,
            None => TokenDescriptor::native(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if let Command::Generate = args.command {
        let account = Account::generate();
        println!("address: {}", account.address());
        return Ok(());
    }

    let key = args
        .private_key
        .clone()
        .or_else(|| std::env::var("WALLET_PRIVATE_KEY").ok())
        .context("pass --private-key or set WALLET_PRIVATE_KEY")?;
    let session = SessionContext {
        network: Network::parse(&args.network),
        account: Account::from_private_key_hex(&key)?,
    };
    println!(
        "wallet {} on {}\n",
        session.account.address(),
        session.network
    );
    let facade = WalletFacade::new(session, &ApiKeys::from_env())?;

    match args.command {
        Command::Balance { token } => {
            let token = token.descriptor()?;
            let record = facade.get_balance(&token).await?;
            match record.usd_balance {
                Some(usd) => println!("{:6} | {:>20} (${usd:.2})", token.symbol, record.balance),
                None => println!(
                    "{:6} | {:>20} (usd price unavailable)",
                    token.symbol, record.balance
                ),
            }
        }
        Command::History { token } => {
            let token = token.descriptor()?;
            let records = facade.get_transactions(&token).await?;
            println!("{}", "=".repeat(60));
            for record in &records {
                println!(
                    "{} | {} -> {} | {:>14} | {}",
                    record.timestamp, record.from, record.to, record.value, record.transaction_hash
                );
            }
            println!("{}", "=".repeat(60));
            println!("{} transfers", records.len());
        }
        Command::Send { token, to, amount } => {
            let token = token.descriptor()?;
            let hash = facade.send_transaction(&token, to, &amount).await?;
            println!("submitted: {hash}");
        }
        Command::Discover => {
            for token in facade.discover_tokens(&[]).await? {
                let contract = token
                    .contract_address
                    .map(|a| a.to_string())
                    .unwrap_or_default();
                println!(
                    "{:6} | decimals {:2} | {contract}",
                    token.symbol, token.decimals
                );
            }
        }
        Command::Generate => unreachable!("handled before session setup"),
    }

    Ok(())
}
