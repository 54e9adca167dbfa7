use std::sync::Arc;

use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use recollect::memory::{DEFAULT_SESSION, MessageLedger, views::TurnView};
use recollect::storage::MemoryStore;

use crate::commands::identifier;
use crate::error::CliResult;
use crate::output::{OutputFormat, format_timestamp, single_line, truncate_string};

#[derive(Parser)]
pub struct HistoryCommand {
    #[clap(help = "User ID")]
    pub user_id: String,

    #[clap(long, short, help = "Session ID (defaults to the user's latest session)")]
    pub session: Option<String>,

    #[clap(
        long,
        short,
        default_value = "16",
        help = "Maximum number of turns to display"
    )]
    pub limit: usize,
}

impl HistoryCommand {
    pub async fn execute(
        &self,
        store: &Arc<dyn MemoryStore>,
        format: OutputFormat,
    ) -> CliResult<()> {
        let user = identifier(&self.user_id)?;
        let ledger = MessageLedger::new(Arc::clone(store));

        let session_id = match &self.session {
            Some(session) => identifier(session)?.to_string(),
            None => ledger
                .latest_session(user.as_str())
                .await?
                .unwrap_or_else(|| DEFAULT_SESSION.to_string()),
        };

        let turns: Vec<TurnView> = ledger
            .recent(user.as_str(), &session_id, self.limit)
            .await?
            .into_iter()
            .map(TurnView::from)
            .collect();

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "user_id": user.as_str(),
                    "session_id": session_id,
                    "turns": turns,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                if turns.is_empty() {
                    println!("No turns in session {session_id}.");
                    return Ok(());
                }

                println!("Session {} of {}\n", session_id, user);

                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Time", "Role", "Text"]);

                for turn in &turns {
                    table.add_row([
                        format_timestamp(&turn.created_at),
                        turn.role.to_string(),
                        truncate_string(&single_line(&turn.text), 80),
                    ]);
                }

                println!("{table}");
                println!("\nShowing {} turns", turns.len());
            }
        }

        Ok(())
    }
}
