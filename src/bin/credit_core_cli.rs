use std::{
    env,
    io::{self, BufRead, Write},
    process,
};

use colored::Colorize;
use credit_core::{
    approval::ApprovalResponse,
    config::ConfigManager,
    core::utils::store_dir_in,
    init,
    ledger::BuyerProfile,
    storage::{JsonFileStore, LedgerStore},
    LedgerManager,
};

fn main() {
    init();

    if let Err(err) = run() {
        eprintln!("{} {err}", "Error:".red().bold());
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        print_usage();
        process::exit(1);
    };

    let config_manager = ConfigManager::new()?;
    let config = config_manager.load()?;
    if command == "config" {
        println!("{}", config_manager.path().display());
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let store = JsonFileStore::with_retention(
        store_dir_in(config_manager.base_dir()),
        config.backup_retention,
    )?;
    let manager = LedgerManager::open(
        LedgerStore::new(Box::new(store), config.storage_key.clone()),
        &config,
    );
    for warning in manager.load_warnings() {
        eprintln!("{} {warning}", "Warning:".yellow().bold());
    }

    match (command.as_str(), &args[1..]) {
        ("credit", [buyer, seller, amount]) => {
            let amount: f64 = amount
                .parse()
                .map_err(|_| format!("`{amount}` is not a number"))?;
            let id = manager.record_credit_with(buyer, seller, amount, |challenge| {
                prompt_for_code(challenge.pending().buyer.as_str(), challenge.code())
            })?;
            println!("{} transaction {id}", "Recorded".green().bold());
        }
        ("settle", [buyer, transaction]) => {
            let settlement = manager.settle(buyer, transaction)?;
            println!(
                "{} transaction {transaction} (+{} points)",
                "Settled".green().bold(),
                settlement.points_awarded
            );
            print_profile(&settlement.profile);
        }
        ("show", [buyer]) => match manager.profile(buyer)? {
            Some(profile) => print_profile(&profile),
            None => println!("No profile for {}", buyer.to_uppercase()),
        },
        ("list", []) => {
            let rows = manager.summaries();
            if rows.is_empty() {
                println!("No buyers recorded.");
            }
            for row in rows {
                println!(
                    "{:<12} outstanding {:>12.2}  score {:>3}  points {:>5}",
                    row.buyer.as_str(),
                    row.outstanding,
                    row.score,
                    row.reward_points
                );
            }
            let totals = manager.totals();
            println!(
                "{} buyers, {} transactions, {:.2} outstanding",
                totals.buyers, totals.transactions, totals.outstanding
            );
        }
        ("remove", [buyer]) => {
            let removed = manager.remove_buyer(buyer)?;
            println!("Removed {} ({} transactions)", removed.id, removed.transactions.len());
        }
        _ => {
            print_usage();
            process::exit(1);
        }
    }

    Ok(())
}

/// Simulated delivery: the code is shown here and the buyer's answer read from stdin.
fn prompt_for_code(buyer: &str, code: &str) -> ApprovalResponse {
    println!("Approval code for {buyer}: {}", code.cyan().bold());
    print!("Enter the code to approve (empty line declines): ");
    let _ = io::stdout().flush();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) if !line.trim().is_empty() => ApprovalResponse::Code(line.trim().to_string()),
        _ => ApprovalResponse::Declined,
    }
}

fn print_profile(profile: &BuyerProfile) {
    println!(
        "{}  score {}  points {}  outstanding {:.2}",
        profile.id.as_str().bold(),
        profile.score,
        profile.reward_points,
        profile.outstanding()
    );
    for txn in &profile.transactions {
        let status = if txn.paid {
            "paid".green()
        } else {
            "open".yellow()
        };
        println!(
            "  {}  {}  {:<20} {:>12.2}  {}",
            txn.id,
            txn.date.format("%Y-%m-%d"),
            txn.seller,
            txn.amount,
            status
        );
    }
}

fn print_usage() {
    eprintln!(
        "Usage: credit_core_cli <command>\n\
         Commands:\n  \
         credit <buyer> <seller> <amount>\n  \
         settle <buyer> <transaction>\n  \
         show <buyer>\n  \
         list\n  \
         remove <buyer>\n  \
         config"
    );
}
