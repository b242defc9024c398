//! Command-line interface for Orbit.
//!
//! Presentation only: every data operation goes through the session's
//! backend, and import/export goes through the reconciler. The CLI supplies
//! no remote client, so a configured remote store is logged and the session
//! falls back to local-only mode.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::io::Write;
use std::path::PathBuf;

use orbit_core::{
    views, AppConfig, ImportMode, ImportOutcome, Reconciler, Session, TransactionDraft,
};
use shared::{Category, JournalEntry, Mood, Transaction, TransactionType};

#[derive(Parser)]
#[command(name = "orbit", about = "Personal journal and expense tracker", version)]
struct Cli {
    /// Instance identifier; overrides config and ORBIT_APP_ID.
    #[arg(long, global = true)]
    app_id: Option<String>,

    /// Data directory; overrides config and ORBIT_DATA_DIR.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Journal reflections
    #[command(subcommand)]
    Journal(JournalCommand),
    /// Income and expense transactions
    #[command(subcommand)]
    Tx(TxCommand),
    /// Mode, balance, totals and recent mood
    Status,
    /// Write a portable export file
    Export {
        /// Target directory; defaults to the current directory.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Import an export file (or a bare state document)
    Import {
        file: PathBuf,
        /// Merge with existing records or replace them.
        #[arg(long, value_enum, default_value_t = ModeArg::Merge)]
        mode: ModeArg,
        /// Skip the confirmation when the file comes from another instance.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum JournalCommand {
    /// Record a reflection
    Add {
        text: String,
        #[arg(long, default_value = "neutral")]
        mood: Mood,
    },
    /// Delete a reflection by id
    Rm { id: String },
    /// List reflections, newest first
    List {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum TxCommand {
    /// Record a transaction
    Add {
        amount: f64,
        description: String,
        #[arg(long = "type", default_value = "expense")]
        kind: TransactionType,
        #[arg(long, default_value = "other")]
        category: Category,
    },
    /// Delete a transaction by id
    Rm { id: String },
    /// List transactions, newest first
    List {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Merge,
    Replace,
}

impl From<ModeArg> for ImportMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Merge => ImportMode::Merge,
            ModeArg::Replace => ImportMode::Replace,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let mut config = AppConfig::load();
    if let Some(app_id) = cli.app_id {
        config.app_id = app_id;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = Some(data_dir);
    }

    let session = Session::init(&config, None).await?;
    info!("Session started in {} mode", session.mode());

    let result = run(&cli.command, &session, &config).await;
    session.dispose();
    result
}

async fn run(command: &Command, session: &Session, config: &AppConfig) -> anyhow::Result<()> {
    let backend = session.backend();

    match command {
        Command::Journal(JournalCommand::Add { text, mood }) => {
            let entry = backend.add_entry(text, *mood).await?;
            println!("Added entry {} ({})", entry.id, entry.mood);
        }
        Command::Journal(JournalCommand::Rm { id }) => {
            backend.remove_entry(id).await?;
            println!("Removed entry {} (if it existed)", id);
        }
        Command::Journal(JournalCommand::List { limit }) => {
            let state = backend.snapshot().await?;
            for entry in views::recent(&state.entries, *limit) {
                print_entry(entry);
            }
            if state.entries.is_empty() {
                println!("No journal entries yet");
            }
        }
        Command::Tx(TxCommand::Add {
            amount,
            description,
            kind,
            category,
        }) => {
            let tx = backend
                .add_transaction(TransactionDraft {
                    amount: *amount,
                    description: description.clone(),
                    kind: *kind,
                    category: *category,
                })
                .await?;
            println!("Added {} {} of {:.2} ({})", tx.kind, tx.category, tx.amount, tx.id);
        }
        Command::Tx(TxCommand::Rm { id }) => {
            backend.remove_transaction(id).await?;
            println!("Removed transaction {} (if it existed)", id);
        }
        Command::Tx(TxCommand::List { limit }) => {
            let state = backend.snapshot().await?;
            for tx in views::recent(&state.transactions, *limit) {
                print_transaction(tx);
            }
            if state.transactions.is_empty() {
                println!("No transactions yet");
            }
        }
        Command::Status => {
            let state = backend.snapshot().await?;
            println!("Mode:        {}", session.mode());
            println!("Identity:    {}", session.identity().user_id());
            println!("Entries:     {}", state.entries.len());
            println!("Transactions:{:>2}", state.transactions.len());
            println!(
                "Income:      {:.2}",
                views::totals(&state.transactions, TransactionType::Income)
            );
            println!(
                "Expenses:    {:.2}",
                views::totals(&state.transactions, TransactionType::Expense)
            );
            println!("Net balance: {:.2}", views::net_balance(&state.transactions));
            println!("Recent mood: {}", views::recent_mood(&state.entries));
        }
        Command::Export { out } => {
            let state = backend.snapshot().await?;
            let reconciler = Reconciler::new(session.local_store(), &config.app_id);
            let path = reconciler
                .export_to_dir(out, &state)
                .context("export failed")?;
            println!("Exported to {}", path.display());
        }
        Command::Import { file, mode, yes } => {
            let reconciler = Reconciler::new(session.local_store(), &config.app_id);
            let confirm = |foreign_id: &str| {
                if *yes {
                    return true;
                }
                prompt_yes_no(&format!(
                    "This file was exported by instance '{}' (you are '{}'). Import anyway?",
                    foreign_id, config.app_id
                ))
            };

            match reconciler.import_file(file, (*mode).into(), &confirm)? {
                ImportOutcome::Applied(state) => {
                    println!(
                        "Imported {} entries and {} transactions",
                        state.entries.len(),
                        state.transactions.len()
                    );
                }
                ImportOutcome::Declined => {
                    println!("Import cancelled; nothing changed");
                }
            }
        }
    }

    Ok(())
}

fn print_entry(entry: &JournalEntry) {
    println!(
        "{}  [{:7}]  {}  {}",
        format_timestamp(entry.created_at),
        entry.mood.to_string(),
        entry.id,
        entry.text
    );
}

fn print_transaction(tx: &Transaction) {
    let sign = match tx.kind {
        TransactionType::Income => '+',
        TransactionType::Expense => '-',
    };
    println!(
        "{}  {}{:>10.2}  [{:9}]  {}  {}",
        format_timestamp(tx.created_at),
        sign,
        tx.amount,
        tx.category.to_string(),
        tx.id,
        tx.description
    );
}

fn format_timestamp(epoch_secs: i64) -> String {
    chrono::DateTime::from_timestamp(epoch_secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| epoch_secs.to_string())
}

fn prompt_yes_no(question: &str) -> bool {
    print!("{} [y/N] ", question);
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
