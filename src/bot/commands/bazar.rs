//! Bazar Discord commands - grocery purchases that feed the meal rate.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, input, mess_and_actor},
        core::{
            bazar::{self, BazarUpdate, NewBazar},
            report::{format_amount, format_bazar_line},
            status::EntryStatus,
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use rust_decimal::Decimal;
    use std::fmt::Write;

    /// Parent command for bazar entries.
    #[poise::command(
        slash_command,
        subcommands(
            "bazar_add",
            "bazar_approve",
            "bazar_edit",
            "bazar_delete",
            "bazar_list",
            "bazar_pending"
        )
    )]
    pub async fn bazar(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Bazar commands. Available subcommands:\n\
            `/bazar add` - Record a purchase\n\
            `/bazar approve` - Approve a pending purchase\n\
            `/bazar edit` - Change a purchase\n\
            `/bazar delete` - Delete a purchase\n\
            `/bazar list` - List a month's purchases\n\
            `/bazar pending` - List purchases waiting for approval";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Records a bazar purchase. Managers' entries count immediately.
    #[poise::command(slash_command, guild_only, rename = "add")]
    pub async fn bazar_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount spent"] amount: f64,
        #[description = "What was bought"] items: Option<String>,
        #[description = "Day (YYYY-MM-DD), defaults to today"] date: Option<String>,
        #[description = "Who paid (managers only), defaults to you"] buyer: Option<serenity::User>,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let new = NewBazar {
            mess_id: found.id,
            buyer_id: buyer.map(|u| u.id.to_string()),
            amount: input::amount(amount)?,
            items: items.unwrap_or_default(),
            date: input::date_or_today(date.as_deref())?,
        };
        let entry = bazar::create_bazar(&data.database, &actor, new).await?;

        ctx.say(format!("✅ Recorded {}", format_bazar_line(data.currency(), &entry)))
            .await?;
        Ok(())
    }

    /// Approves a pending bazar entry.
    #[poise::command(slash_command, guild_only, rename = "approve")]
    pub async fn bazar_approve(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Entry number (from /bazar list)"] id: i64,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let entry = bazar::approve_bazar(&data.database, &actor, found.id, id).await?;

        ctx.say(format!("✅ Approved {}", format_bazar_line(data.currency(), &entry)))
            .await?;
        Ok(())
    }

    /// Changes a bazar entry. Members can edit their own while it is pending.
    #[poise::command(slash_command, guild_only, rename = "edit")]
    pub async fn bazar_edit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Entry number (from /bazar list)"] id: i64,
        #[description = "New amount"] amount: Option<f64>,
        #[description = "New item list"] items: Option<String>,
        #[description = "New day (YYYY-MM-DD)"] date: Option<String>,
        #[description = "New buyer (managers only)"] buyer: Option<serenity::User>,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let update = BazarUpdate {
            buyer_id: buyer.map(|u| u.id.to_string()),
            amount: amount.map(input::amount).transpose()?,
            items,
            date: date.as_deref().map(input::date).transpose()?,
        };
        let entry = bazar::update_bazar(&data.database, &actor, found.id, id, update).await?;

        ctx.say(format!("✅ Updated {}", format_bazar_line(data.currency(), &entry)))
            .await?;
        Ok(())
    }

    /// Deletes a bazar entry.
    #[poise::command(slash_command, guild_only, rename = "delete")]
    pub async fn bazar_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Entry number (from /bazar list)"] id: i64,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        bazar::delete_bazar(&ctx.data().database, &actor, found.id, id).await?;

        ctx.say(format!("🗑️ Deleted bazar entry #{id}")).await?;
        Ok(())
    }

    /// Lists a month's bazar entries.
    #[poise::command(slash_command, guild_only, rename = "list")]
    pub async fn bazar_list(
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
        let entries = bazar::list_bazars(&data.database, found.id, month).await?;

        if entries.is_empty() {
            ctx.say(format!("No bazar entries for {month}.")).await?;
            return Ok(());
        }

        let mut response = format!("🛒 **Bazar for {month}**\n\n");
        for entry in &entries {
            writeln!(&mut response, "{}", format_bazar_line(data.currency(), entry))?;
        }
        let approved: Decimal = entries
            .iter()
            .filter(|e| e.status == EntryStatus::Approved.as_str())
            .map(|e| e.amount)
            .sum();
        write!(
            &mut response,
            "\n**Approved total:** {}",
            format_amount(data.currency(), approved)
        )?;
        ctx.say(response).await?;
        Ok(())
    }

    /// Lists bazar entries waiting for approval.
    #[poise::command(slash_command, guild_only, rename = "pending")]
    pub async fn bazar_pending(
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
        let entries = bazar::list_pending_bazars(&data.database, found.id, month).await?;

        if entries.is_empty() {
            ctx.say(format!("Nothing waiting for approval in {month}.")).await?;
            return Ok(());
        }

        let mut response = format!("⏳ **Pending bazar for {month}**\n\n");
        for entry in &entries {
            writeln!(&mut response, "{}", format_bazar_line(data.currency(), entry))?;
        }
        ctx.say(response).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
