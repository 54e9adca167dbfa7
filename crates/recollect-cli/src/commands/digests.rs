use std::sync::Arc;

use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use recollect::memory::views::{PREVIEW_CHARS, preview};
use recollect::storage::{DigestFilter, MemoryStore};

use crate::commands::identifier;
use crate::error::CliResult;
use crate::output::{OutputFormat, format_timestamp, single_line};

#[derive(Parser)]
pub struct DigestsCommand {
    #[clap(help = "User ID")]
    pub user_id: String,

    #[clap(long, short, help = "Only digests of this session")]
    pub session: Option<String>,

    #[clap(
        long,
        help = "Only lifetime digests",
        conflicts_with = "session"
    )]
    pub lifetime: bool,

    #[clap(
        long,
        short,
        default_value = "10",
        help = "Maximum number of digests to display"
    )]
    pub limit: usize,

    #[clap(long, help = "Print full digest text instead of a preview")]
    pub full: bool,
}

impl DigestsCommand {
    pub async fn execute(
        &self,
        store: &Arc<dyn MemoryStore>,
        format: OutputFormat,
    ) -> CliResult<()> {
        let user = identifier(&self.user_id)?;

        let filter = match (&self.session, self.lifetime) {
            (Some(session), _) => {
                DigestFilter::sessions(user.as_str(), Some(identifier(session)?.as_str()))
            }
            (None, true) => DigestFilter::lifetime(user.as_str()),
            (None, false) => DigestFilter::user(user.as_str()),
        };

        let digests = store.recent_digests(&filter, self.limit).await?;

        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&digests)?);
            }
            OutputFormat::Table => {
                if digests.is_empty() {
                    println!("No digests found.");
                    return Ok(());
                }

                if self.full {
                    for digest in &digests {
                        let scope = match digest.scope.session_id() {
                            Some(session) => format!("session {session}"),
                            None => "lifetime".to_string(),
                        };
                        let created = format_timestamp(&digest.created_at);
                        println!("── {created} ({scope}) ──");
                        println!("{}\n", digest.text);
                    }
                    return Ok(());
                }

                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Created", "Scope", "Session", "Preview"]);

                for digest in &digests {
                    table.add_row([
                        format_timestamp(&digest.created_at),
                        digest.scope.kind().as_str().to_string(),
                        digest.scope.session_id().unwrap_or("-").to_string(),
                        preview(&single_line(&digest.text), PREVIEW_CHARS),
                    ]);
                }

                println!("{table}");
                println!("\nShowing {} digests", digests.len());
            }
        }

        Ok(())
    }
}
