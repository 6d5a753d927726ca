//! Meal Discord commands - recording daily meal counts.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, input, mess_and_actor},
        core::{
            meal::{self, MealEntry},
            report::format_meal_line,
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use rust_decimal::Decimal;
    use std::fmt::Write;

    /// Parent command for daily meals.
    #[poise::command(slash_command, subcommands("meals_set", "meals_batch", "meals_list"))]
    pub async fn meals(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Meal commands. Available subcommands:\n\
            `/meals set` - Set one member's meals for a day\n\
            `/meals batch` - Set a whole day's sheet at once\n\
            `/meals list` - Show a month's meal sheet";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Sets one member's meals for a day. Halves are allowed (0.5).
    #[poise::command(slash_command, guild_only, rename = "set")]
    pub async fn meals_set(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Member"] user: serenity::User,
        #[description = "Breakfast count"] breakfast: f64,
        #[description = "Lunch count"] lunch: f64,
        #[description = "Dinner count"] dinner: f64,
        #[description = "Guest meals"] guests: Option<i32>,
        #[description = "Day (YYYY-MM-DD), defaults to today"] date: Option<String>,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let entry = MealEntry {
            user_id: user.id.to_string(),
            date: input::date_or_today(date.as_deref())?,
            breakfast: input::amount(breakfast)?,
            lunch: input::amount(lunch)?,
            dinner: input::amount(dinner)?,
            guest_meals: guests.unwrap_or(0),
        };
        let rows = meal::batch_update_meals(&ctx.data().database, &actor, found.id, &[entry]).await?;

        let mut response = String::from("✅ Saved\n");
        for row in &rows {
            writeln!(&mut response, "{}", format_meal_line(row))?;
        }
        ctx.say(response).await?;
        Ok(())
    }

    /// Sets a whole day's meals: @alice=1/1/1; @bob=0/1/0.5+2
    #[poise::command(slash_command, guild_only, rename = "batch")]
    pub async fn meals_batch(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Entries: @user=breakfast/lunch/dinner[+guests]; ..."] entries: String,
        #[description = "Day (YYYY-MM-DD), defaults to today"] date: Option<String>,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let day = input::date_or_today(date.as_deref())?;
        let entries = input::meal_batch(&entries, day)?;
        let rows = meal::batch_update_meals(&ctx.data().database, &actor, found.id, &entries).await?;

        let mut response = format!("✅ Saved {} entries for {day}\n", rows.len());
        for row in &rows {
            writeln!(&mut response, "{}", format_meal_line(row))?;
        }
        ctx.say(response).await?;
        Ok(())
    }

    /// Shows the meal sheet of a month.
    #[poise::command(slash_command, guild_only, rename = "list")]
    pub async fn meals_list(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Month (YYYY-MM), defaults to this month"]
        #[autocomplete = "crate::bot::handlers::autocomplete::autocomplete_month"]
        month: Option<String>,
        #[description = "Only this member"] user: Option<serenity::User>,
    ) -> Result<()> {
        let Some((found, _)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let month = input::month_or_current(month.as_deref())?;
        let user_id = user.map(|u| u.id.to_string());
        let rows: Vec<_> = meal::list_daily_meals(&ctx.data().database, found.id, month)
            .await?
            .into_iter()
            .filter(|row| user_id.as_deref().is_none_or(|id| row.user_id == id))
            .collect();

        if rows.is_empty() {
            ctx.say(format!("No meals recorded for {month}.")).await?;
            return Ok(());
        }

        let total: Decimal = rows.iter().map(meal::row_units).sum();
        let mut response = format!("🍽️ **Meals for {month}**\n\n");
        for row in &rows {
            writeln!(&mut response, "{}", format_meal_line(row))?;
        }
        write!(&mut response, "\n**Total:** {} meals", total.normalize())?;
        ctx.say(response).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
