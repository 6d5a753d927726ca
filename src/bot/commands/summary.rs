//! Summary Discord command - the monthly settlement report.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, mess_and_actor},
        core::{
            month::Month,
            report::{self, format_amount},
            settlement,
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;

    /// Discord allows at most this many fields per embed.
    const MAX_EMBED_FIELDS: usize = 25;

    /// Shows who owes what for a month.
    #[poise::command(slash_command, guild_only)]
    pub async fn summary(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Month (YYYY-MM), defaults to this month"]
        #[autocomplete = "crate::bot::handlers::autocomplete::autocomplete_month"]
        month: Option<String>,
        #[description = "Only this member"] user: Option<serenity::User>,
    ) -> Result<()> {
        let Some((found, _)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let symbol = data.currency();
        let month = month.unwrap_or_else(|| Month::current().to_string());
        let summary = settlement::generate_monthly_summary(&data.database, found.id, &month).await?;

        if let Some(user) = user {
            let user_id = user.id.to_string();
            let Some(member) = summary.member_summaries.get(&user_id) else {
                ctx.say(format!("<@{user_id}> has nothing to settle in {}.", summary.month))
                    .await?;
                return Ok(());
            };
            ctx.say(report::format_member_summary(symbol, member)?).await?;
            return Ok(());
        }

        let description = format!(
            "Service costs: {}\nMeal cost: {}\nMeals: {}\nMeal rate: {}",
            format_amount(symbol, summary.total_service_cost),
            format_amount(symbol, summary.total_meal_cost),
            summary.total_meals.normalize(),
            format_amount(symbol, summary.meal_rate)
        );

        let mut fields = Vec::new();
        for member in summary.member_summaries.values().take(MAX_EMBED_FIELDS) {
            let block = report::format_member_summary(symbol, member)?;
            // The first line carries the name; the rest goes in the field body
            let (title, body) = block.split_once('\n').unwrap_or((block.as_str(), ""));
            fields.push((title.replace("**", ""), body.to_string(), false));
        }

        let embed = serenity::CreateEmbed::default()
            .title(format!("📊 {} - {}", found.name, summary.month))
            .description(description)
            .fields(fields)
            .color(if summary.is_conserved() {
                serenity::Colour::DARK_GREEN
            } else {
                serenity::Colour::ORANGE
            });

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
