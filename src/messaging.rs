//! Outbound side of the bot: sending notifications, banning and member lookups.
//!
//! Components talk to Discord only through [`Messenger`], so the gate, the sweeper
//! and the red list can be driven by a recording fake in tests.

use crate::error::ModerationError;
use async_trait::async_trait;
use serenity::all::{
    ChannelId, CreateAllowedMentions, CreateMessage, GuildId, RoleId, UserId,
};
use serenity::http::{Http, HttpError};
use std::sync::Arc;
use tracing::debug;

/// Who a message is allowed to notify. Nothing outside the scope is pinged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MentionScope {
    Role(RoleId),
    User(UserId),
}

impl MentionScope {
    pub fn allowed_mentions(self) -> CreateAllowedMentions {
        match self {
            MentionScope::Role(role) => CreateAllowedMentions::new().roles(vec![role]),
            MentionScope::User(user) => CreateAllowedMentions::new().users(vec![user]),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberStatus {
    /// A human member of the guild
    Present,
    /// A bot account, never reminded
    Automated,
    /// Not in the guild (left, banned, or never joined)
    Absent,
}

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(
        &self,
        channel: ChannelId,
        content: String,
        mentions: MentionScope,
    ) -> Result<(), ModerationError>;

    async fn ban(&self, user: UserId, reason: &str) -> Result<(), ModerationError>;

    async fn resolve_member(&self, user: UserId) -> Result<MemberStatus, ModerationError>;
}

/// [`Messenger`] backed by the serenity HTTP client for a single guild.
pub struct DiscordMessenger {
    http: Arc<Http>,
    guild_id: GuildId,
}

impl DiscordMessenger {
    pub fn new(http: Arc<Http>, guild_id: GuildId) -> Self {
        Self { http, guild_id }
    }
}

#[async_trait]
impl Messenger for DiscordMessenger {
    async fn send_message(
        &self,
        channel: ChannelId,
        content: String,
        mentions: MentionScope,
    ) -> Result<(), ModerationError> {
        let builder = CreateMessage::new()
            .content(content)
            .allowed_mentions(mentions.allowed_mentions());

        debug!("Sending message to channel {} ({:?})", channel, mentions);
        channel
            .send_message(&self.http, builder)
            .await
            .map_err(|e| ModerationError::SendFailed {
                channel: channel.get(),
                source: Box::new(e),
            })?;
        Ok(())
    }

    async fn ban(&self, user: UserId, reason: &str) -> Result<(), ModerationError> {
        self.guild_id
            .ban_with_reason(&self.http, user, 0, reason)
            .await
            .map_err(|e| ModerationError::EnforcementFailed {
                user: user.get(),
                source: Box::new(e),
            })
    }

    async fn resolve_member(&self, user: UserId) -> Result<MemberStatus, ModerationError> {
        match self.http.get_member(self.guild_id, user).await {
            Ok(member) if member.user.bot => Ok(MemberStatus::Automated),
            Ok(_) => Ok(MemberStatus::Present),
            Err(e) if is_not_found(&e) => Ok(MemberStatus::Absent),
            Err(e) => Err(ModerationError::EnforcementFailed {
                user: user.get(),
                source: Box::new(e),
            }),
        }
    }
}

fn is_not_found(error: &serenity::Error) -> bool {
    matches!(
        error,
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 404
    )
}

/// Parse a stored identity into a user ID. Zero and non-numeric strings are rejected.
pub fn parse_user_id(identity: &str) -> Option<UserId> {
    identity
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(UserId::new)
}
