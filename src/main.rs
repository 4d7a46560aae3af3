use poise::serenity_prelude as serenity;
use redban::clock::{Clock, SystemClock};
use redban::commands::{redlist, submit};
use redban::messaging::{DiscordMessenger, Messenger};
use redban::store::Documents;
use redban::sweeper::ReminderSweeper;
use redban::{config::Config, Data};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded {:?}", config);
    let discord_token = config.discord_token.clone();
    let documents = Documents::open(&config)?;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![redlist::redban(), redlist::redlist(), submit::submit()],
            event_handler: |ctx, event, _framework, data| {
                Box::pin(redban::events::handle_event(ctx, event, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                let guild_id = serenity::GuildId::new(config.guild_id);
                if let Err(e) =
                    poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id)
                        .await
                {
                    error!(
                        "Command sync failed: {}. Check bot invite scopes (applications.commands required).",
                        e
                    );
                } else {
                    info!("Commands synced to guild {}", guild_id);
                }

                let messenger: Arc<dyn Messenger> =
                    Arc::new(DiscordMessenger::new(ctx.http.clone(), guild_id));
                let clock: Arc<dyn Clock> = Arc::new(SystemClock);

                match ReminderSweeper::from_config(&config, &documents, messenger.clone(), clock.clone())
                {
                    Some(sweeper) => {
                        tokio::spawn(sweeper.run());
                    }
                    None => info!("REMINDER_CHANNEL_ID not set, reminder sweeper disabled"),
                }

                Ok(Data::new(config, &documents, messenger, clock))
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_MESSAGES;

    let mut client = serenity::ClientBuilder::new(&discord_token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    info!("Starting bot...");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}
