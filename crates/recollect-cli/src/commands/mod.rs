pub mod activity;
pub mod digests;
pub mod episodes;
pub mod history;

pub use activity::ActivityCommand;
pub use digests::DigestsCommand;
pub use episodes::EpisodesCommand;
pub use history::HistoryCommand;

use recollect::memory::Identifier;

use crate::error::CliResult;

/// Validate a user or session id given on the command line
pub(crate) fn identifier(value: &str) -> CliResult<Identifier> {
    Ok(Identifier::try_from(value)?)
}
