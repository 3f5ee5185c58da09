use std::process::ExitCode;

use clap::Parser;
use engine::{
    BalanceSnapshot, Category, Engine, EngineError, Entry, EntryListFilter, ErrorKind, IfOpen,
    NewEntry, OpenSessionCmd, Session, SessionBalanceFilter, UpdateEntryCmd,
};
use migration::{Migrator, MigratorTrait};

use cli::{CategoryCommand, Cli, Command, EntryCommand, SessionCommand};

mod cli;
mod settings;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = match settings::Settings::new(&cli.config) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("invalid settings: {err}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "caja={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let url = cli
        .database_url
        .clone()
        .unwrap_or_else(|| settings.database.url());
    let engine = match build_engine(&url, &settings.ledger).await {
        Ok(engine) => engine,
        Err(err) => {
            tracing::error!("failed to initialize ledger: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(&engine, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            exit_code(&err)
        }
    }
}

async fn build_engine(
    url: &str,
    ledger: &settings::Ledger,
) -> Result<Engine, Box<dyn std::error::Error + Send + Sync>> {
    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;

    let mut builder = Engine::builder()
        .database(database)
        .opening_balance(ledger.opening_balance);
    if let Some(timeout) = ledger.operation_timeout() {
        builder = builder.operation_timeout(timeout);
    }
    Ok(builder.build().await?)
}

fn exit_code(err: &EngineError) -> ExitCode {
    match err.kind() {
        ErrorKind::Validation => ExitCode::from(2),
        ErrorKind::NotFound => ExitCode::from(3),
        ErrorKind::Forbidden => ExitCode::from(4),
        ErrorKind::Conflict => ExitCode::from(5),
        ErrorKind::Store => ExitCode::FAILURE,
    }
}

async fn run(engine: &Engine, cli: Cli) -> Result<(), EngineError> {
    let actor = cli.actor.as_str();
    match cli.command {
        Command::Session(cli::Session { command }) => match command {
            SessionCommand::Open(args) => {
                let if_open = if args.no_auto_close {
                    IfOpen::RequireConfirmation
                } else {
                    IfOpen::CloseIt
                };
                let session = engine
                    .open_session(OpenSessionCmd::new(actor, args.shift).if_open(if_open))
                    .await?;
                println!("opened session {}", session.id);
                print_session(&session);
            }
            SessionCommand::Close(args) => {
                let session = match args.withdraw {
                    Some(amount) => {
                        engine
                            .close_session_with_withdrawal(args.id, actor, amount)
                            .await?
                    }
                    None => engine.close_session(args.id, actor).await?,
                };
                println!("closed session {}", session.id);
                print_session(&session);
            }
            SessionCommand::Status => match engine.last_session().await? {
                Some(session) => print_session(&session),
                None => println!("no session recorded"),
            },
            SessionCommand::Balance(args) => {
                let snapshot = match args.id {
                    Some(id) => engine.session_balance(id).await?,
                    None => engine.latest_session_balance().await?,
                };
                print_balance(&snapshot);
            }
            SessionCommand::Report(args) => {
                let filter = SessionBalanceFilter {
                    from: args.from,
                    to: args.to,
                    shift: args.shift,
                    negative_only: args.negative_only,
                };
                for snapshot in engine.session_balances(&filter).await? {
                    print_balance(&snapshot);
                }
            }
        },
        Command::Entry(cli::Entry { command }) => match command {
            EntryCommand::Add(args) => {
                let mut item = NewEntry::new(args.kind, args.amount, args.shift, args.category);
                if let Some(details) = args.details {
                    item = item.details(details);
                }
                for entry in engine.create_entries(actor, vec![item]).await? {
                    print_entry(&entry);
                }
            }
            EntryCommand::List(args) => {
                let filter = EntryListFilter {
                    date: args.date,
                    actor_id: args.by,
                    shift: args.shift,
                    category_id: args.category,
                    session_id: args.session,
                    kind: args.kind,
                    ..Default::default()
                };
                let (entries, total) = engine
                    .list_entries(&filter, args.limit, args.offset)
                    .await?;
                for entry in &entries {
                    print_entry(entry);
                }
                println!("{} of {total}", entries.len());
            }
            EntryCommand::Last(args) => {
                for entry in engine.last_entries(args.limit).await? {
                    print_entry(&entry);
                }
            }
            EntryCommand::Delete(args) => {
                engine.soft_delete_entry(args.id, actor).await?;
                println!("deleted entry {}", args.id);
            }
            EntryCommand::Update(args) => {
                let mut cmd = UpdateEntryCmd::new(args.id, actor);
                if let Some(category_id) = args.category {
                    cmd = cmd.category_id(category_id);
                }
                if args.clear_details {
                    cmd = cmd.details(None);
                } else if let Some(details) = args.details {
                    cmd = cmd.details(Some(details));
                }
                print_entry(&engine.update_entry(cmd).await?);
            }
        },
        Command::Category(cli::Category { command }) => match command {
            CategoryCommand::Add(args) => {
                let category = engine.create_category(&args.name, args.scope, actor).await?;
                print_category(&category);
            }
            CategoryCommand::List(args) => {
                let categories = match args.kind {
                    Some(kind) => engine.categories_for(kind).await?,
                    None => engine.list_categories(!args.all).await?,
                };
                for category in &categories {
                    print_category(category);
                }
            }
            CategoryCommand::Enable(args) => {
                print_category(&engine.set_category_active(args.id, true).await?);
            }
            CategoryCommand::Disable(args) => {
                print_category(&engine.set_category_active(args.id, false).await?);
            }
        },
    }
    Ok(())
}

fn print_session(session: &Session) {
    let state = if session.is_open() { "open" } else { "closed" };
    let closing = session
        .closing_balance
        .map(|b| b.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "#{} {} shift={} actor={} opened={} opening={} closing={}",
        session.id,
        state,
        session.shift,
        session.actor_id,
        session.opened_at.format("%Y-%m-%d %H:%M"),
        session.opening_balance,
        closing,
    );
}

fn print_balance(snapshot: &BalanceSnapshot) {
    let session = &snapshot.session;
    println!(
        "#{} {} {} income={} expense={} withdrawal={} balance={}",
        session.id,
        session.business_date,
        session.shift,
        snapshot.totals.income,
        snapshot.totals.expense,
        snapshot.totals.withdrawal,
        snapshot.balance,
    );
}

fn print_entry(entry: &Entry) {
    println!(
        "#{} {} {} {} {} category={} session={} {}",
        entry.id,
        entry.reference,
        entry.entry_date.format("%Y-%m-%d %H:%M"),
        entry.kind,
        entry.amount,
        entry.category_id,
        entry.session_id,
        entry.details.as_deref().unwrap_or(""),
    );
}

fn print_category(category: &Category) {
    let state = if category.active { "" } else { " (retired)" };
    println!(
        "#{} {} [{}]{state}",
        category.id, category.name, category.scope
    );
}
