use clap::{Parser, Subcommand};
use faucet_sdk::{FaucetClient, FaucetClientError};
use serde_json::json;

#[derive(Parser)]
#[command(name = "faucet-cli")]
#[command(about = "Command line client for the faucet service", long_about = None)]
struct Cli {
    #[arg(short, long, env = "FAUCET_URL", default_value = "http://localhost:8090")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fund an address with the configured amount
    Fund {
        address: String,
        /// Wait for the transaction to resolve
        #[arg(long)]
        wait: bool,
    },
    /// Generate a fresh account and fund it
    GenFunded {
        #[arg(long)]
        wait: bool,
    },
    /// Show the tracking state of a transaction
    Tx {
        tx_hash: String,
        #[arg(long)]
        wait: bool,
    },
    /// Show faucet status
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let client = FaucetClient::new(&cli.url);

    if let Err(e) = run(&client, cli.command).await {
        match e.body() {
            Some(body) => eprintln!("Error: {} ({})", body.message, body.error),
            None => eprintln!("Error: {}", e),
        }
        std::process::exit(1);
    }
}

async fn run(client: &FaucetClient, command: Commands) -> Result<(), FaucetClientError> {
    match command {
        Commands::Fund { address, wait } => {
            let funded = client.fund(&address).await?;
            print_json(&json!({ "txHash": funded.tx_hash }));
            if wait {
                show_tx(client, &funded.tx_hash, true).await?;
            }
        }
        Commands::GenFunded { wait } => {
            let funded = client.gen_funded().await?;
            print_json(&json!({ "address": funded.address, "txHash": funded.tx_hash }));
            if wait {
                show_tx(client, &funded.tx_hash, true).await?;
            }
        }
        Commands::Tx { tx_hash, wait } => show_tx(client, &tx_hash, wait).await?,
        Commands::Status => {
            let status = client.status().await?;
            print_json(&json!({
                "fundingAddress": status.funding_address,
                "chainId": status.chain_id,
                "denom": status.denom,
                "transferAmount": status.transfer_amount,
                "nextSequence": status.next_sequence,
                "balance": status.balance,
                "pendingTransactions": status.pending_transactions,
            }));
        }
    }
    Ok(())
}

async fn show_tx(client: &FaucetClient, tx_hash: &str, wait: bool) -> Result<(), FaucetClientError> {
    let tx = if wait {
        client.await_tx(tx_hash).await?
    } else {
        client.tx_status(tx_hash).await?
    };
    print_json(&json!({
        "txHash": tx.tx_hash,
        "status": tx.status,
        "blockHeight": tx.block_height,
        "reason": tx.reason,
        "sequence": tx.sequence,
        "recipient": tx.recipient,
    }));
    Ok(())
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}
