use crate::gate::{CandidateEvent, GateOutcome};
use crate::services::denylist::JoinOutcome;
use crate::{Data, Error};
use poise::serenity_prelude as serenity;
use tracing::{debug, info};

/// Gateway events the bot reacts to. Failures are logged by the components,
/// nothing here is propagated back into the event loop.
pub async fn handle_event(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!("🔥 RedBan Bot logged in as {}", data_about_bot.user.name);
        }
        serenity::FullEvent::Message { new_message } => {
            handle_message(new_message, data).await;
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            handle_member_join(new_member.guild_id, new_member.user.id, data).await;
        }
        _ => {}
    }
    Ok(())
}

pub async fn handle_message(message: &serenity::Message, data: &Data) -> Option<GateOutcome> {
    let gate = data.gate.as_ref()?;
    let event = CandidateEvent::from_message(message, gate.settings().role_id);
    let outcome = gate.on_candidate_event(&event, data.messenger.as_ref()).await;
    if outcome != GateOutcome::Ignored {
        debug!("Gate outcome for message {}: {:?}", message.id, outcome);
    }
    Some(outcome)
}

pub async fn handle_member_join(
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    data: &Data,
) -> Option<JoinOutcome> {
    if guild_id.get() != data.config.guild_id {
        return None;
    }
    Some(data.denylist.on_member_join(user_id).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Config;
    use crate::messaging::fake::RecordingMessenger;
    use crate::store::{Document, Documents, MemoryStore, Roster, SubmissionRecords};
    use std::sync::Arc;

    fn memory_documents() -> Documents {
        Documents {
            denylist: Arc::new(Document::new("redlist", Arc::new(MemoryStore::new(vec![
                "140631350327876417".to_string(),
            ])))),
            roster: Arc::new(Document::new(
                "roster",
                Arc::new(MemoryStore::<Roster>::default()),
            )),
            submissions: Arc::new(Document::new(
                "submissions",
                Arc::new(MemoryStore::<SubmissionRecords>::default()),
            )),
        }
    }

    fn data(config: Config) -> (Data, Arc<RecordingMessenger>) {
        let messenger = Arc::new(RecordingMessenger::default());
        let data = Data::new(
            config,
            &memory_documents(),
            messenger.clone(),
            Arc::new(ManualClock::new(0)),
        );
        (data, messenger)
    }

    fn message(channel: u64, author: u64, bot: bool) -> serenity::Message {
        let mut msg = serenity::Message::default();
        msg.id = serenity::MessageId::new(1);
        msg.channel_id = serenity::ChannelId::new(channel);
        msg.author = serenity::User::default();
        msg.author.id = serenity::UserId::new(author);
        msg.author.bot = bot;
        msg
    }

    #[tokio::test]
    async fn test_message_routing() {
        let (data, messenger) = data(Config::for_tests());

        assert_eq!(handle_message(&message(100, 5, true), &data).await, Some(GateOutcome::Ignored));
        assert_eq!(handle_message(&message(999, 5, false), &data).await, Some(GateOutcome::Ignored));
        assert_eq!(handle_message(&message(100, 5, false), &data).await, Some(GateOutcome::Pinged));
        assert_eq!(handle_message(&message(100, 6, false), &data).await, Some(GateOutcome::Suppressed));
        assert_eq!(messenger.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_gate_disabled_without_role() {
        let mut config = Config::for_tests();
        config.ping_role_id = None;
        let (data, messenger) = data(config);

        assert_eq!(handle_message(&message(100, 5, false), &data).await, None);
        assert!(messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn test_member_join_routing() {
        let (data, messenger) = data(Config::for_tests());
        let listed = serenity::UserId::new(140631350327876417);

        let other_guild = handle_member_join(serenity::GuildId::new(2), listed, &data).await;
        assert_eq!(other_guild, None);
        assert!(messenger.bans().is_empty());

        let home = handle_member_join(serenity::GuildId::new(1), listed, &data).await;
        assert_eq!(home, Some(JoinOutcome::Banned));
        assert_eq!(messenger.bans(), vec![listed]);
    }
}
