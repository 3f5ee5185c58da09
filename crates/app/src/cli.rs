use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use engine::{CategoryScope, EntryKind, MoneyCents, Shift};

use crate::settings::DEFAULT_SETTINGS_PATH;

/// Entries shown by `entry last` when no limit is given.
pub const DEFAULT_LAST_LIMIT: u64 = 15;

#[derive(Parser, Debug)]
#[command(name = "caja")]
#[command(about = "Cash-box session ledger: open and close sessions, record movements")]
pub struct Cli {
    /// Settings file, without extension.
    #[arg(long, default_value = DEFAULT_SETTINGS_PATH)]
    pub config: String,

    /// Database connection string; overrides the settings file.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Operator performing the command.
    #[arg(long, env = "CAJA_ACTOR", default_value = "")]
    pub actor: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Session(Session),
    Entry(Entry),
    Category(Category),
}

#[derive(Args, Debug)]
pub struct Session {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Open a session, closing the previous one if still active.
    Open(SessionOpenArgs),
    /// Close a session, optionally withdrawing cash first.
    Close(SessionCloseArgs),
    /// Show the latest session.
    Status,
    /// Balance of a session (latest by default).
    Balance(SessionBalanceArgs),
    /// Balances of all sessions in a date range.
    Report(SessionReportArgs),
}

#[derive(Args, Debug)]
pub struct SessionOpenArgs {
    /// `M` (morning) or `T` (afternoon).
    #[arg(long)]
    pub shift: Shift,
    /// Fail instead of closing a session that is still open.
    #[arg(long)]
    pub no_auto_close: bool,
}

#[derive(Args, Debug)]
pub struct SessionCloseArgs {
    #[arg(long)]
    pub id: i64,
    /// Cash taken out of the box at close.
    #[arg(long)]
    pub withdraw: Option<MoneyCents>,
}

#[derive(Args, Debug)]
pub struct SessionBalanceArgs {
    #[arg(long)]
    pub id: Option<i64>,
}

#[derive(Args, Debug)]
pub struct SessionReportArgs {
    /// First business date, inclusive.
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Last business date, exclusive.
    #[arg(long)]
    pub to: Option<NaiveDate>,
    #[arg(long)]
    pub shift: Option<Shift>,
    #[arg(long)]
    pub negative_only: bool,
}

#[derive(Args, Debug)]
pub struct Entry {
    #[command(subcommand)]
    pub command: EntryCommand,
}

#[derive(Subcommand, Debug)]
pub enum EntryCommand {
    /// Record an entry in the actor's open session.
    Add(EntryAddArgs),
    List(EntryListArgs),
    /// Most recent entries.
    Last(EntryLastArgs),
    Delete(EntryIdArgs),
    Update(EntryUpdateArgs),
}

#[derive(Args, Debug)]
pub struct EntryAddArgs {
    /// `income`, `expense` or `withdrawal`.
    #[arg(long)]
    pub kind: EntryKind,
    /// Amount, `12.50` or `12,50`.
    #[arg(long)]
    pub amount: MoneyCents,
    #[arg(long)]
    pub shift: Shift,
    #[arg(long)]
    pub category: i64,
    #[arg(long)]
    pub details: Option<String>,
}

#[derive(Args, Debug)]
pub struct EntryListArgs {
    /// Local calendar day.
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub by: Option<String>,
    #[arg(long)]
    pub shift: Option<Shift>,
    #[arg(long)]
    pub category: Option<i64>,
    #[arg(long)]
    pub session: Option<i64>,
    #[arg(long)]
    pub kind: Option<EntryKind>,
    #[arg(long, default_value_t = engine::DEFAULT_PAGE_LIMIT)]
    pub limit: u64,
    #[arg(long, default_value_t = 0)]
    pub offset: u64,
}

#[derive(Args, Debug)]
pub struct EntryLastArgs {
    #[arg(long, default_value_t = DEFAULT_LAST_LIMIT)]
    pub limit: u64,
}

#[derive(Args, Debug)]
pub struct EntryIdArgs {
    #[arg(long)]
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct EntryUpdateArgs {
    #[arg(long)]
    pub id: i64,
    #[arg(long)]
    pub category: Option<i64>,
    #[arg(long, conflicts_with = "clear_details")]
    pub details: Option<String>,
    #[arg(long)]
    pub clear_details: bool,
}

#[derive(Args, Debug)]
pub struct Category {
    #[command(subcommand)]
    pub command: CategoryCommand,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    Add(CategoryAddArgs),
    List(CategoryListArgs),
    Enable(CategoryIdArgs),
    Disable(CategoryIdArgs),
}

#[derive(Args, Debug)]
pub struct CategoryAddArgs {
    #[arg(long)]
    pub name: String,
    /// `income`, `expense`, `withdrawal` or `both`.
    #[arg(long)]
    pub scope: CategoryScope,
}

#[derive(Args, Debug)]
pub struct CategoryListArgs {
    /// Include retired categories.
    #[arg(long, conflicts_with = "kind")]
    pub all: bool,
    /// Only categories usable with this entry kind.
    #[arg(long)]
    pub kind: Option<EntryKind>,
}

#[derive(Args, Debug)]
pub struct CategoryIdArgs {
    #[arg(long)]
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_close_with_withdrawal() {
        let cli = Cli::try_parse_from([
            "caja", "--actor", "ana", "session", "close", "--id", "4", "--withdraw", "50,25",
        ])
        .unwrap();
        let Command::Session(Session {
            command: SessionCommand::Close(args),
        }) = cli.command
        else {
            panic!("expected session close");
        };
        assert_eq!(args.id, 4);
        assert_eq!(args.withdraw, Some(MoneyCents::new(5025)));
    }
}
