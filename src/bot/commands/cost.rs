//! Service cost Discord commands - shared bills like rent, utilities, and staff.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, input, mess_and_actor},
        core::{
            report::{format_amount, format_cost_line},
            service_cost::{self, NewServiceCost},
        },
        errors::{Error, Result},
    };
    use std::fmt::Write;

    /// Parent command for service costs.
    #[poise::command(
        slash_command,
        subcommands("cost_add", "cost_approve", "cost_shares", "cost_delete", "cost_list")
    )]
    pub async fn cost(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Service cost commands. Available subcommands:\n\
            `/cost add` - Add a bill for a month\n\
            `/cost approve` - Approve a pending bill\n\
            `/cost shares` - Change how a bill is split\n\
            `/cost delete` - Delete a bill\n\
            `/cost list` - List a month's bills";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Adds a service cost. Leave shares empty to split it equally.
    #[poise::command(slash_command, guild_only, rename = "add")]
    pub async fn cost_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Bill name, e.g. Rent"] name: String,
        #[description = "Total amount"] amount: f64,
        #[description = "Month (YYYY-MM), defaults to this month"]
        #[autocomplete = "crate::bot::handlers::autocomplete::autocomplete_month"]
        month: Option<String>,
        #[description = "Explicit shares: @alice=600, @bob=400"] shares: Option<String>,
        #[description = "Keep it pending instead of approving now"] pending: Option<bool>,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let new = NewServiceCost {
            mess_id: found.id,
            month: input::month_or_current(month.as_deref())?,
            name,
            amount: input::amount(amount)?,
            shares: shares.as_deref().map(input::shares).transpose()?.unwrap_or_default(),
            approved: !pending.unwrap_or(false),
        };
        let record = service_cost::add_service_cost(&data.database, &actor, new).await?;

        ctx.say(format!(
            "✅ Added {} for {}",
            format_cost_line(data.currency(), &record),
            record.cost.month
        ))
        .await?;
        Ok(())
    }

    /// Approves a pending service cost.
    #[poise::command(slash_command, guild_only, rename = "approve")]
    pub async fn cost_approve(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Cost number (from /cost list)"] id: i64,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let cost =
            service_cost::approve_service_cost(&ctx.data().database, &actor, found.id, id).await?;

        ctx.say(format!(
            "✅ Approved {} ({})",
            cost.name,
            format_amount(ctx.data().currency(), cost.amount)
        ))
        .await?;
        Ok(())
    }

    /// Replaces the shares of a service cost. Leave empty for an equal split.
    #[poise::command(slash_command, guild_only, rename = "shares")]
    pub async fn cost_shares(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Cost number (from /cost list)"] id: i64,
        #[description = "Explicit shares: @alice=600, @bob=400"] shares: Option<String>,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let shares = shares.as_deref().map(input::shares).transpose()?.unwrap_or_default();
        let record =
            service_cost::update_cost_shares(&data.database, &actor, found.id, id, shares).await?;

        ctx.say(format!("✅ Updated {}", format_cost_line(data.currency(), &record)))
            .await?;
        Ok(())
    }

    /// Deletes a service cost.
    #[poise::command(slash_command, guild_only, rename = "delete")]
    pub async fn cost_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Cost number (from /cost list)"] id: i64,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        service_cost::delete_service_cost(&ctx.data().database, &actor, found.id, id).await?;

        ctx.say(format!("🗑️ Deleted cost #{id}")).await?;
        Ok(())
    }

    /// Lists the service costs of a month.
    #[poise::command(slash_command, guild_only, rename = "list")]
    pub async fn cost_list(
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
        let records = service_cost::list_service_costs(&data.database, found.id, month).await?;

        if records.is_empty() {
            ctx.say(format!("No service costs for {month}.")).await?;
            return Ok(());
        }

        let mut response = format!("🧾 **Service costs for {month}**\n\n");
        for record in &records {
            writeln!(&mut response, "{}", format_cost_line(data.currency(), record))?;
        }
        ctx.say(response).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
