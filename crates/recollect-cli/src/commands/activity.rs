use std::sync::Arc;

use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use recollect::storage::MemoryStore;

use crate::commands::identifier;
use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct ActivityCommand {
    #[clap(help = "User ID")]
    pub user_id: String,

    #[clap(
        long,
        default_value = "30",
        help = "Number of most recent active days to show"
    )]
    pub days: usize,
}

impl ActivityCommand {
    pub async fn execute(
        &self,
        store: &Arc<dyn MemoryStore>,
        format: OutputFormat,
    ) -> CliResult<()> {
        let user = identifier(&self.user_id)?;
        let counts = store.daily_turn_counts(user.as_str(), self.days).await?;
        let total: usize = counts.iter().map(|c| c.count).sum();

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "user_id": user.as_str(),
                    "total_turns": total,
                    "daily_turn_counts": counts,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                println!("Activity for {user}");
                println!("======================\n");

                if counts.is_empty() {
                    println!("No turns recorded.");
                    return Ok(());
                }

                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Date", "Turns"]);

                for day in &counts {
                    table.add_row([day.date.clone(), day.count.to_string()]);
                }

                println!("{table}\n");
                println!("Total: {} turns over {} days", total, counts.len());
            }
        }

        Ok(())
    }
}
