//! General Discord commands - ping and help.
//! These don't touch the database.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**Mess Ledger Help**\n\
        Keeps the books of a shared mess: bills, groceries, meals and payments.\n\n\
        **Getting started**\n\
        • `/mess create <name>` - Create the mess for this server.\n\
        • `/mess join` - Ask to join; an admin approves with `/mess approve`.\n\n\
        **Recording**\n\
        • `/cost add <name> <amount> [month] [shares]` - Add a shared bill.\n\
        • `/bazar add <amount> [items] [date]` - Record a grocery purchase.\n\
        • `/meals set` / `/meals batch` - Record meals eaten.\n\
        • `/payment add <amount> <account>` - Record a payment.\n\n\
        **Settling**\n\
        • `/summary [month] [user]` - Who owes what.\n\
        • `/month lock` / `/month unlock` - Freeze a settled month.\n\n\
        **Utility**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.\n\n\
        Each group has more subcommands; run the group name alone to list them.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
