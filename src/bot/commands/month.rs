//! Month Discord commands - locking a month's ledger once it is settled.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, input, mess_and_actor},
        core::{lock, report::format_lock_status},
        errors::{Error, Result},
    };

    /// Parent command for month locks.
    #[poise::command(
        slash_command,
        subcommands(
            "month_lock",
            "month_unlock",
            "month_request_unlock",
            "month_decide",
            "month_status"
        )
    )]
    pub async fn month(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Month commands. Available subcommands:\n\
            `/month lock` - Freeze a month's ledger (admin)\n\
            `/month unlock` - Reopen a month (admin)\n\
            `/month request_unlock` - Ask an admin to reopen a month\n\
            `/month decide` - Approve or deny an unlock request (admin)\n\
            `/month status` - Show whether a month is locked";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Locks a month so its entries can no longer change.
    #[poise::command(slash_command, guild_only, rename = "lock")]
    pub async fn month_lock(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Month (YYYY-MM), defaults to this month"]
        #[autocomplete = "crate::bot::handlers::autocomplete::autocomplete_month"]
        month: Option<String>,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let month = input::month_or_current(month.as_deref())?;
        let status = lock::lock_month(&ctx.data().database, &actor, found.id, month).await?;

        ctx.say(format_lock_status(&status)).await?;
        Ok(())
    }

    /// Reopens a locked month.
    #[poise::command(slash_command, guild_only, rename = "unlock")]
    pub async fn month_unlock(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Month (YYYY-MM), defaults to this month"]
        #[autocomplete = "crate::bot::handlers::autocomplete::autocomplete_month"]
        month: Option<String>,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let month = input::month_or_current(month.as_deref())?;
        let status = lock::unlock_month(
            &data.database,
            &actor,
            found.id,
            month,
            data.settings.ledger.unlock_window(),
        )
        .await?;

        ctx.say(format_lock_status(&status)).await?;
        Ok(())
    }

    /// Asks the admins to reopen a locked month.
    #[poise::command(slash_command, guild_only, rename = "request_unlock")]
    pub async fn month_request_unlock(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Month (YYYY-MM)"]
        #[autocomplete = "crate::bot::handlers::autocomplete::autocomplete_month"]
        month: String,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let month = month.parse()?;
        let status = lock::request_unlock(&ctx.data().database, &actor, found.id, month).await?;

        ctx.say(format_lock_status(&status)).await?;
        Ok(())
    }

    /// Approves or denies a pending unlock request.
    #[poise::command(slash_command, guild_only, rename = "decide")]
    pub async fn month_decide(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Month (YYYY-MM)"]
        #[autocomplete = "crate::bot::handlers::autocomplete::autocomplete_month"]
        month: String,
        #[description = "Reopen the month?"] approve: bool,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let status = lock::decide_unlock(
            &data.database,
            &actor,
            found.id,
            month.parse()?,
            approve,
            data.settings.ledger.unlock_window(),
        )
        .await?;

        ctx.say(format_lock_status(&status)).await?;
        Ok(())
    }

    /// Shows whether a month is locked.
    #[poise::command(slash_command, guild_only, rename = "status")]
    pub async fn month_status(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Month (YYYY-MM), defaults to this month"]
        #[autocomplete = "crate::bot::handlers::autocomplete::autocomplete_month"]
        month: Option<String>,
    ) -> Result<()> {
        let Some((found, _)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let month = input::month_or_current(month.as_deref())?;
        let status = lock::get_lock_status(&ctx.data().database, found.id, month).await?;

        ctx.say(format_lock_status(&status)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
