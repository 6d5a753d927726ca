//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for the mess ledger, including
//! all slash commands, autocomplete handlers, and bot context management.
//! One Discord server maps to one mess.

/// Discord command implementations (mess, costs, meals, bazar, payments, months)
pub mod commands;
/// Discord interaction handlers (autocomplete, etc.)
pub mod handlers;
/// Parsing of free-text command arguments
pub mod input;

use crate::{
    config::settings::Settings,
    core::{mess, roles::Actor},
    entities::MessModel,
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Shared data available to all bot commands.
/// This structure holds the database connection and the loaded settings.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Settings from `config.toml`
    pub settings: Arc<Settings>,
}

impl BotData {
    /// Creates a new `BotData` instance with the given database connection
    /// and settings.
    #[must_use]
    pub const fn new(database: DatabaseConnection, settings: Arc<Settings>) -> Self {
        Self { database, settings }
    }

    /// Currency symbol for replies.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.settings.ledger.currency_symbol
    }
}

/// The mess bound to the server a command was used in, with the caller's
/// actor. Replies with a hint and returns `None` when there is none.
pub async fn mess_and_actor(
    ctx: poise::Context<'_, BotData, Error>,
) -> Result<Option<(MessModel, Actor)>> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say("❌ This command only works inside a server.").await?;
        return Ok(None);
    };
    let db = &ctx.data().database;
    let Some(found) = mess::get_mess_by_guild(db, &guild_id.to_string()).await? else {
        ctx.say("❌ This server has no mess yet. Create one with `/mess create`.")
            .await?;
        return Ok(None);
    };
    let actor = mess::actor_for(db, found.id, &ctx.author().id.to_string()).await?;
    Ok(Some((found, actor)))
}

/// Every command the bot registers.
#[must_use]
pub fn all_commands() -> Vec<poise::Command<BotData, Error>> {
    vec![
        commands::mess(),
        commands::cost(),
        commands::meals(),
        commands::bazar(),
        commands::payment(),
        commands::summary(),
        commands::month(),
        commands::ping(),
        commands::help(),
    ]
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            if error.is_user_facing() {
                warn!("Command `{}` rejected: {}", ctx.command().name, error);
                if let Err(e) = ctx.say(format!("❌ {error}")).await {
                    error!("Failed to send error message: {}", e);
                }
            } else {
                error!("Error in command `{}`: {:?}", ctx.command().name, error);
                if let Err(e) = ctx
                    .say("❌ Something went wrong. Please try again later.")
                    .await
                {
                    error!("Failed to send error message: {}", e);
                }
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Builds the framework and runs the Discord client until it stops.
#[instrument(skip(token, database, settings))]
pub async fn run_bot(token: String, database: DatabaseConnection, settings: Arc<Settings>) -> Result<()> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: all_commands(),
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(BotData::new(database, settings))
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {:?}", e))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {:?}", e))?;
    Ok(())
}
