use std::sync::Arc;

use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use recollect::memory::views::EpisodeView;
use recollect::storage::MemoryStore;

use crate::commands::identifier;
use crate::error::CliResult;
use crate::output::{OutputFormat, format_timestamp, truncate_string};

#[derive(Parser)]
pub struct EpisodesCommand {
    #[clap(help = "User ID")]
    pub user_id: String,

    #[clap(long, short, help = "Only facts extracted in this session")]
    pub session: Option<String>,

    #[clap(
        long,
        short,
        default_value = "20",
        help = "Maximum number of facts to display"
    )]
    pub limit: usize,
}

impl EpisodesCommand {
    pub async fn execute(
        &self,
        store: &Arc<dyn MemoryStore>,
        format: OutputFormat,
    ) -> CliResult<()> {
        let user = identifier(&self.user_id)?;

        let episodes = match &self.session {
            Some(session) => {
                let session = identifier(session)?;
                let mut episodes = store.episodes_for_user(user.as_str()).await?;
                episodes.retain(|e| e.session_id == session.as_str());
                episodes.reverse();
                episodes.truncate(self.limit);
                episodes
            }
            None => store.recent_episodes(user.as_str(), self.limit).await?,
        };
        let episodes: Vec<EpisodeView> = episodes.into_iter().map(EpisodeView::from).collect();

        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&episodes)?);
            }
            OutputFormat::Table => {
                if episodes.is_empty() {
                    println!("No episodic facts found.");
                    return Ok(());
                }

                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Created", "Session", "Importance", "Fact"]);

                for episode in &episodes {
                    table.add_row([
                        format_timestamp(&episode.created_at),
                        episode.session_id.clone(),
                        format!("{:.1}", episode.importance),
                        truncate_string(&episode.fact, 80),
                    ]);
                }

                println!("{table}");
                println!("\nShowing {} facts", episodes.len());
            }
        }

        Ok(())
    }
}
