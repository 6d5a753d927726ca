//! Payment Discord commands - money members hand over to the mess.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::choices::PaymentKind, input, mess_and_actor},
        core::{
            payment::{self, NewPayment},
            report::format_payment_line,
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// How many payments `/payment history` shows.
    const HISTORY_LIMIT: usize = 20;

    /// Parent command for payments.
    #[poise::command(
        slash_command,
        subcommands(
            "payment_add",
            "payment_verify",
            "payment_reject",
            "payment_list",
            "payment_pending",
            "payment_history"
        )
    )]
    pub async fn payment(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Payment commands. Available subcommands:\n\
            `/payment add` - Record a payment\n\
            `/payment verify` / `/payment reject` - Decide on a pending payment\n\
            `/payment list` - List a month's payments\n\
            `/payment pending` - List payments waiting for a decision\n\
            `/payment history` - A member's recent payments";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Records a payment to the house or meal account.
    #[poise::command(slash_command, guild_only, rename = "add")]
    pub async fn payment_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount paid"] amount: f64,
        #[description = "Account credited"] account: PaymentKind,
        #[description = "Month (YYYY-MM), defaults to this month"]
        #[autocomplete = "crate::bot::handlers::autocomplete::autocomplete_month"]
        month: Option<String>,
        #[description = "Who paid (managers only), defaults to you"] user: Option<serenity::User>,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let new = NewPayment {
            mess_id: found.id,
            user_id: user.map(|u| u.id.to_string()),
            amount: input::amount(amount)?,
            payment_type: account.into(),
            month: input::month_or_current(month.as_deref())?,
        };
        let recorded = payment::submit_payment(&data.database, &actor, new).await?;

        ctx.say(format!(
            "✅ Recorded {}",
            format_payment_line(data.currency(), &recorded)
        ))
        .await?;
        Ok(())
    }

    /// Verifies a pending payment so it counts toward settlement.
    #[poise::command(slash_command, guild_only, rename = "verify")]
    pub async fn payment_verify(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Payment number (from /payment pending)"] id: i64,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let decided = payment::verify_payment(&data.database, &actor, found.id, id).await?;

        ctx.say(format!(
            "✅ Verified {}",
            format_payment_line(data.currency(), &decided)
        ))
        .await?;
        Ok(())
    }

    /// Rejects a pending payment.
    #[poise::command(slash_command, guild_only, rename = "reject")]
    pub async fn payment_reject(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Payment number (from /payment pending)"] id: i64,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let decided = payment::reject_payment(&data.database, &actor, found.id, id).await?;

        ctx.say(format!(
            "🚫 Rejected {}",
            format_payment_line(data.currency(), &decided)
        ))
        .await?;
        Ok(())
    }

    /// Lists a month's payments.
    #[poise::command(slash_command, guild_only, rename = "list")]
    pub async fn payment_list(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Month (YYYY-MM), defaults to this month"]
        #[autocomplete = "crate::bot::handlers::autocomplete::autocomplete_month"]
        month: Option<String>,
    ) -> Result<()> {
        let Some((found, _)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let month = input::month_or_current(month.as_deref())?;
        let payments = payment::list_payments(&data.database, found.id, month).await?;

        if payments.is_empty() {
            ctx.say(format!("No payments for {month}.")).await?;
            return Ok(());
        }

        let mut response = format!("💵 **Payments for {month}**\n\n");
        for p in &payments {
            writeln!(&mut response, "{}", format_payment_line(data.currency(), p))?;
        }
        ctx.say(response).await?;
        Ok(())
    }

    /// Lists payments waiting for verification.
    #[poise::command(slash_command, guild_only, rename = "pending")]
    pub async fn payment_pending(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Month (YYYY-MM), defaults to this month"]
        #[autocomplete = "crate::bot::handlers::autocomplete::autocomplete_month"]
        month: Option<String>,
    ) -> Result<()> {
        let Some((found, _)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let month = input::month_or_current(month.as_deref())?;
        let payments = payment::list_pending_payments(&data.database, found.id, month).await?;

        if payments.is_empty() {
            ctx.say(format!("No payments waiting in {month}.")).await?;
            return Ok(());
        }

        let mut response = format!("⏳ **Pending payments for {month}**\n\n");
        for p in &payments {
            writeln!(&mut response, "{}", format_payment_line(data.currency(), p))?;
        }
        ctx.say(response).await?;
        Ok(())
    }

    /// Shows a member's most recent payments across months.
    #[poise::command(slash_command, guild_only, rename = "history")]
    pub async fn payment_history(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Member, defaults to you"] user: Option<serenity::User>,
    ) -> Result<()> {
        let Some((found, _)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let user_id = user.map_or_else(|| ctx.author().id.to_string(), |u| u.id.to_string());
        let payments = payment::list_member_payments(&data.database, found.id, &user_id).await?;

        if payments.is_empty() {
            ctx.say(format!("<@{user_id}> has no payments yet.")).await?;
            return Ok(());
        }

        let mut response = format!("📜 **Payments by <@{user_id}>**\n\n");
        for p in payments.iter().take(HISTORY_LIMIT) {
            writeln!(&mut response, "{}", format_payment_line(data.currency(), p))?;
        }
        ctx.say(response).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
