use super::say_ephemeral;
use crate::{Context, Error};
use chrono::NaiveDate;
use poise::serenity_prelude as serenity;
use tracing::{error, info};

const MAX_NAME_CHARS: usize = 100;
const MAX_FIELD_CHARS: usize = 1000;

/// A validated daily submission.
#[derive(Debug, PartialEq, Eq)]
pub struct Submission {
    pub name: String,
    pub date: NaiveDate,
    pub completed: String,
    pub planned: String,
    pub blockers: String,
}

impl Submission {
    pub fn parse(
        name: &str,
        date: &str,
        completed: &str,
        planned: &str,
        blockers: &str,
    ) -> Result<Self, String> {
        let name = required_text("Name", name, MAX_NAME_CHARS)?;
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| "❌ Date must look like `2026-01-31`.".to_string())?;
        Ok(Self {
            name,
            date,
            completed: required_text("Completed", completed, MAX_FIELD_CHARS)?,
            planned: required_text("Planned", planned, MAX_FIELD_CHARS)?,
            blockers: required_text("Blockers", blockers, MAX_FIELD_CHARS)?,
        })
    }

    fn embed(&self, author: &serenity::User, submitted_at: i64) -> serenity::CreateEmbed {
        serenity::CreateEmbed::new()
            .title(format!("📝 Submission from {}", self.name))
            .description(format!(
                "For **{}** by <@{}>, submitted <t:{}:f>",
                self.date, author.id, submitted_at
            ))
            .field("Completed", &self.completed, false)
            .field("Planned", &self.planned, false)
            .field("Blockers", &self.blockers, false)
            .color(0x5865F2)
    }
}

fn required_text(label: &str, value: &str, max_chars: usize) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("❌ {} cannot be empty.", label));
    }
    if trimmed.chars().count() > max_chars {
        return Err(format!(
            "❌ {} is too long (max {} characters).",
            label, max_chars
        ));
    }
    Ok(trimmed.to_string())
}

/// Share your daily update
#[poise::command(slash_command, guild_only)]
pub async fn submit(
    ctx: Context<'_>,
    #[description = "Your name"] name: String,
    #[description = "Date of the update (YYYY-MM-DD)"] date: String,
    #[description = "What you completed"] completed: String,
    #[description = "What you plan to do next"] planned: String,
    #[description = "Anything blocking you (or \"none\")"] blockers: String,
) -> Result<(), Error> {
    let submission = match Submission::parse(&name, &date, &completed, &planned, &blockers) {
        Ok(submission) => submission,
        Err(message) => return say_ephemeral(ctx, message).await,
    };

    let submitted_at = match ctx.data().submissions.record_submission(ctx.author().id).await {
        Ok(ts) => ts,
        Err(e) => {
            error!("Failed to record submission for {}: {}", ctx.author().id, e);
            return say_ephemeral(ctx, "❌ Could not save your submission, try again later.").await;
        }
    };
    info!("Recorded submission from {} for {}", ctx.author().id, submission.date);

    ctx.send(poise::CreateReply::default().embed(submission.embed(ctx.author(), submitted_at)))
        .await?;
    Ok(())
}
