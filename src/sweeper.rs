use crate::clock::Clock;
use crate::config::Config;
use crate::messaging::{parse_user_id, MemberStatus, MentionScope, Messenger};
use crate::store::{Document, Documents, Roster, SubmissionRecords};
use serenity::all::{ChannelId, UserId};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::{interval_at, Duration, Instant};
use tracing::{debug, error, info, warn};

/// Reminds roster members who have not submitted within the staleness threshold.
pub struct ReminderSweeper {
    roster: Arc<Document<Roster>>,
    submissions: Arc<Document<SubmissionRecords>>,
    messenger: Arc<dyn Messenger>,
    clock: Arc<dyn Clock>,
    channel_id: ChannelId,
    threshold_secs: i64,
    sweep_interval: Duration,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub reminded: Vec<UserId>,
    /// Unparseable, absent or automated identities
    pub skipped: usize,
    pub failed: usize,
}

impl ReminderSweeper {
    pub fn new(
        roster: Arc<Document<Roster>>,
        submissions: Arc<Document<SubmissionRecords>>,
        messenger: Arc<dyn Messenger>,
        clock: Arc<dyn Clock>,
        channel_id: ChannelId,
        threshold_secs: i64,
        sweep_interval_secs: u64,
    ) -> Self {
        Self {
            roster,
            submissions,
            messenger,
            clock,
            channel_id,
            threshold_secs,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
        }
    }

    /// `None` when no reminder channel is configured.
    pub fn from_config(
        config: &Config,
        documents: &Documents,
        messenger: Arc<dyn Messenger>,
        clock: Arc<dyn Clock>,
    ) -> Option<Self> {
        let channel_id = ChannelId::new(config.reminder_channel_id?);
        Some(Self::new(
            documents.roster.clone(),
            documents.submissions.clone(),
            messenger,
            clock,
            channel_id,
            config.staleness_threshold_secs,
            config.sweep_interval_secs,
        ))
    }

    pub async fn run(self) {
        info!(
            "Starting reminder sweeper: every {:?}, threshold {}s, channel {}",
            self.sweep_interval, self.threshold_secs, self.channel_id
        );
        // The first sweep fires one interval after startup.
        let mut ticker = interval_at(Instant::now() + self.sweep_interval, self.sweep_interval);
        loop {
            ticker.tick().await;
            let report = self.sweep().await;
            if report.checked > 0 {
                info!(
                    "Reminder sweep: checked {}, reminded {}, skipped {}, failed {}",
                    report.checked,
                    report.reminded.len(),
                    report.skipped,
                    report.failed
                );
            }
            if report.failed > 0 {
                error!("Reminder sweep could not deliver {} reminders", report.failed);
            }
        }
    }

    pub async fn sweep(&self) -> SweepReport {
        // An unreadable document skips the whole sweep.
        let roster = match self.roster.read().await {
            Ok(roster) => roster,
            Err(e) => {
                warn!("Reminder sweep skipped, roster unavailable: {}", e);
                return SweepReport::default();
            }
        };
        if roster.is_empty() {
            debug!("Reminder sweep: roster is empty");
            return SweepReport::default();
        }
        let records = match self.submissions.read().await {
            Ok(records) => records,
            Err(e) => {
                warn!("Reminder sweep skipped, submission records unavailable: {}", e);
                return SweepReport::default();
            }
        };
        let now = self.clock.now();

        let mut report = SweepReport::default();
        let mut seen = HashSet::new();
        for identity in &roster {
            if !seen.insert(identity.as_str()) {
                continue;
            }
            report.checked += 1;

            let Some(user) = parse_user_id(identity) else {
                warn!("Roster entry '{}' is not a user ID", identity);
                report.skipped += 1;
                continue;
            };

            let last = records.get(identity.as_str()).copied().unwrap_or(0);
            let elapsed = now.saturating_sub(last);
            if elapsed < self.threshold_secs {
                continue;
            }

            match self.messenger.resolve_member(user).await {
                Ok(MemberStatus::Present) => {}
                Ok(status) => {
                    debug!("Skipping roster entry {}: {:?}", user, status);
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Could not resolve roster entry {}: {}", user, e);
                    report.skipped += 1;
                    continue;
                }
            }

            let content = reminder_message(user, last, self.threshold_secs);
            match self
                .messenger
                .send_message(self.channel_id, content, MentionScope::User(user))
                .await
            {
                Ok(()) => report.reminded.push(user),
                Err(e) => {
                    error!("Failed to send reminder to {}: {}", user, e);
                    report.failed += 1;
                }
            }
        }

        report
    }
}

fn reminder_message(user: UserId, last: i64, threshold_secs: i64) -> String {
    let hours = threshold_secs / 3600;
    if last == 0 {
        format!("⏰ <@{user}> you have not shared a submission yet. Use `/submit` to post your update.")
    } else {
        format!(
            "⏰ <@{user}> no submission from you in the last {hours}h (last: <t:{last}:R>). Use `/submit` to post your update."
        )
    }
}
