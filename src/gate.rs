//! Role ping notifier.
//!
//! The first qualifying message in a monitored channel pings the designated role
//! once. Further messages stay silent until someone holding that role speaks in
//! the channel, which re-arms the ping.

use crate::config::Config;
use crate::messaging::{MentionScope, Messenger};
use serenity::all::{ChannelId, Message, RoleId, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct GateSettings {
    pub channels: HashSet<ChannelId>,
    pub role_id: RoleId,
    /// An automated sender that does not carry the bot flag
    pub ignored_sender: Option<UserId>,
    pub message: String,
}

impl GateSettings {
    /// `None` when no role or no channel is configured, which disables the gate.
    pub fn from_config(config: &Config) -> Option<Self> {
        let role_id = RoleId::new(config.ping_role_id?);
        if config.ping_channel_ids.is_empty() {
            return None;
        }
        Some(Self {
            channels: config
                .ping_channel_ids
                .iter()
                .copied()
                .map(ChannelId::new)
                .collect(),
            role_id,
            ignored_sender: config.ignored_bot_id.map(UserId::new),
            message: config.ping_message.clone(),
        })
    }
}

/// The parts of an inbound message the gate decides on.
#[derive(Clone, Copy, Debug)]
pub struct CandidateEvent {
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub author_is_bot: bool,
    pub is_webhook: bool,
    /// The author holds the designated role
    pub is_reset: bool,
}

impl CandidateEvent {
    pub fn from_message(message: &Message, role_id: RoleId) -> Self {
        Self {
            channel_id: message.channel_id,
            author_id: message.author.id,
            author_is_bot: message.author.bot,
            is_webhook: message.webhook_id.is_some(),
            is_reset: message
                .member
                .as_ref()
                .is_some_and(|member| member.roles.contains(&role_id)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    /// Automated sender or unmonitored channel
    Ignored,
    /// The role holder spoke, the next qualifying message may ping again
    Reset,
    /// Already pinged since the last reset
    Suppressed,
    Pinged,
    /// The ping was attempted and failed; the gate stays closed
    PingFailed,
}

pub struct NotificationGate {
    settings: GateSettings,
    ping_allowed: Mutex<HashMap<ChannelId, bool>>,
}

impl NotificationGate {
    pub fn new(settings: GateSettings) -> Self {
        Self {
            settings,
            ping_allowed: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &GateSettings {
        &self.settings
    }

    pub fn is_ping_allowed(&self, channel_id: ChannelId) -> bool {
        self.states()
            .get(&channel_id)
            .copied()
            .unwrap_or(true)
    }

    pub async fn on_candidate_event(
        &self,
        event: &CandidateEvent,
        messenger: &dyn Messenger,
    ) -> GateOutcome {
        if event.author_is_bot
            || event.is_webhook
            || Some(event.author_id) == self.settings.ignored_sender
        {
            return GateOutcome::Ignored;
        }
        if !self.settings.channels.contains(&event.channel_id) {
            return GateOutcome::Ignored;
        }

        // Claim the ping while holding the lock; it is released before the send.
        {
            let mut states = self.states();
            let allowed = states.entry(event.channel_id).or_insert(true);
            if event.is_reset {
                if !*allowed {
                    debug!("Gate re-armed in channel {} by {}", event.channel_id, event.author_id);
                }
                *allowed = true;
                return GateOutcome::Reset;
            }
            if !*allowed {
                return GateOutcome::Suppressed;
            }
            *allowed = false;
        }

        let content = format!("<@&{}> {}", self.settings.role_id, self.settings.message);
        match messenger
            .send_message(
                event.channel_id,
                content,
                MentionScope::Role(self.settings.role_id),
            )
            .await
        {
            Ok(()) => {
                info!(
                    "Pinged role {} in channel {} after message from {}",
                    self.settings.role_id, event.channel_id, event.author_id
                );
                GateOutcome::Pinged
            }
            Err(e) => {
                warn!("Role ping in channel {} failed, gate stays closed: {}", event.channel_id, e);
                GateOutcome::PingFailed
            }
        }
    }

    fn states(&self) -> std::sync::MutexGuard<'_, HashMap<ChannelId, bool>> {
        self.ping_allowed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
