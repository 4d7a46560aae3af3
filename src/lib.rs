pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod gate;
pub mod messaging;
pub mod services;
pub mod store;
pub mod sweeper;

use std::sync::Arc;

/// Custom data passed to all commands
pub struct Data {
    pub config: config::Config,
    pub messenger: Arc<dyn messaging::Messenger>,
    pub denylist: services::denylist::DenylistService,
    pub submissions: services::submission::SubmissionService,
    /// Absent when no ping role or channel is configured
    pub gate: Option<gate::NotificationGate>,
}

impl Data {
    pub fn new(
        config: config::Config,
        documents: &store::Documents,
        messenger: Arc<dyn messaging::Messenger>,
        clock: Arc<dyn clock::Clock>,
    ) -> Self {
        let gate = gate::GateSettings::from_config(&config).map(gate::NotificationGate::new);
        Self {
            denylist: services::denylist::DenylistService::new(
                documents.denylist.clone(),
                messenger.clone(),
            ),
            submissions: services::submission::SubmissionService::new(
                documents.submissions.clone(),
                clock,
            ),
            gate,
            messenger,
            config,
        }
    }
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
