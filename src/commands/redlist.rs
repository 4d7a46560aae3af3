use super::say_ephemeral;
use crate::config::DISCORD_MESSAGE_SOFT_LIMIT;
use crate::error::ModerationError;
use crate::{Context, Error};
use tracing::{error, info};

/// Owner-only: Red list & auto-ban by user ID
#[poise::command(slash_command, guild_only)]
pub async fn redban(
    ctx: Context<'_>,
    #[description = "Discord User ID to red-list"] userid: String,
) -> Result<(), Error> {
    let data = ctx.data();
    let privileged = data.config.is_owner(ctx.author().id.get());

    match data.denylist.add(&userid, privileged).await {
        Ok(outcome) => {
            info!(
                "{} red-listed {} (banned now: {})",
                ctx.author().name,
                userid.trim(),
                outcome.enforced
            );
            ctx.say(format!(
                "🚫 User **{}** added to red list.\nAuto-ban enabled.",
                userid.trim()
            ))
            .await?;
        }
        Err(e) => {
            if !e.is_user_facing() {
                error!("/redban from {} failed: {}", ctx.author().name, e);
            }
            say_ephemeral(ctx, error_message(&e)).await?
        }
    }
    Ok(())
}

/// Owner-only: Show the IDs in the red list
#[poise::command(slash_command, guild_only)]
pub async fn redlist(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let privileged = data.config.is_owner(ctx.author().id.get());

    let content = match data.denylist.list(privileged).await {
        Ok(entries) => format_redlist(&entries),
        Err(e) => {
            if !e.is_user_facing() {
                error!("/redlist from {} failed: {}", ctx.author().name, e);
            }
            error_message(&e)
        }
    };
    say_ephemeral(ctx, content).await
}

fn error_message(error: &ModerationError) -> String {
    match error {
        ModerationError::Unauthorized => "❌ You are not authorized to use this command.".to_string(),
        ModerationError::InvalidIdentity(_) => "❌ Invalid Discord User ID.".to_string(),
        ModerationError::AlreadyListed(_) => "⚠️ User already exists in red list.".to_string(),
        _ => "❌ The red list is unavailable right now, try again later.".to_string(),
    }
}

fn format_redlist(entries: &[String]) -> String {
    if entries.is_empty() {
        return "📋 The red list is currently empty.".to_string();
    }

    let lines: Vec<String> = entries.iter().map(|id| format!("- {}", id)).collect();
    let message = format!("📋 Red List IDs:\n{}", lines.join("\n"));
    if message.chars().count() > DISCORD_MESSAGE_SOFT_LIMIT {
        return "📋 The red list is too long to display in one message. Check the file directly."
            .to_string();
    }
    message
}
