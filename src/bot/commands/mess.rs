//! Mess Discord commands - creating a mess, joining it, and managing roles.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::choices::RoleChoice, mess_and_actor},
        core::{
            mess::{self as registry, MemberStatus},
            roles::{Role, RoleSet},
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Parent command for the mess bound to this server.
    #[poise::command(
        slash_command,
        subcommands(
            "mess_create",
            "mess_join",
            "mess_approve",
            "mess_leave",
            "mess_members",
            "mess_role_add",
            "mess_role_remove"
        )
    )]
    pub async fn mess(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Mess commands. Available subcommands:\n\
            `/mess create` - Create a mess for this server\n\
            `/mess join` - Ask to join\n\
            `/mess approve` - Approve a join request (admin)\n\
            `/mess leave` - Leave the mess\n\
            `/mess members` - List members and requests\n\
            `/mess role_add` / `/mess role_remove` - Manage roles (admin)";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Creates a mess for this server. You become its admin.
    #[poise::command(slash_command, guild_only, rename = "create")]
    pub async fn mess_create(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Name of the mess"] name: String,
    ) -> Result<()> {
        let guild_id = ctx.guild_id().map(|g| g.to_string());
        let author = ctx.author();
        let created = registry::create_mess(
            &ctx.data().database,
            &name,
            guild_id,
            &author.id.to_string(),
            &author.name,
        )
        .await?;

        ctx.say(format!(
            "✅ Created mess **{}**. You are its admin. Others can join with `/mess join`.",
            created.name
        ))
        .await?;
        Ok(())
    }

    /// Asks to join the mess of this server.
    #[poise::command(slash_command, guild_only, rename = "join")]
    pub async fn mess_join(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let Some((found, _)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let author = ctx.author();
        registry::request_join(
            &ctx.data().database,
            found.id,
            &author.id.to_string(),
            &author.name,
        )
        .await?;

        ctx.say(format!(
            "✅ Asked to join **{}**. An admin needs to approve you.",
            found.name
        ))
        .await?;
        Ok(())
    }

    /// Approves a pending join request.
    #[poise::command(slash_command, guild_only, rename = "approve")]
    pub async fn mess_approve(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Member to approve"] user: serenity::User,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let approved =
            registry::approve_member(&ctx.data().database, &actor, found.id, &user.id.to_string())
                .await?;

        ctx.say(format!("✅ {} is now a member of **{}**.", approved.name, found.name))
            .await?;
        Ok(())
    }

    /// Leaves the mess. Your past entries still settle.
    #[poise::command(slash_command, guild_only, rename = "leave")]
    pub async fn mess_leave(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let Some((found, _)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        registry::leave_mess(&ctx.data().database, found.id, &ctx.author().id.to_string()).await?;

        ctx.say(format!("👋 You left **{}**.", found.name)).await?;
        Ok(())
    }

    /// Lists members with their roles, and pending join requests.
    #[poise::command(slash_command, guild_only, rename = "members")]
    pub async fn mess_members(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let Some((found, _)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let members = registry::list_members(&ctx.data().database, found.id, None).await?;

        let mut response = format!("👥 **{}**\n\n", found.name);
        let mut pending = Vec::new();
        for member in &members {
            match member.status.parse::<MemberStatus>() {
                Ok(MemberStatus::Active) => writeln!(
                    &mut response,
                    "• {} (<@{}>) - {}",
                    member.name,
                    member.user_id,
                    RoleSet::from_stored(&member.roles)
                )?,
                Ok(MemberStatus::Pending) => pending.push(member),
                _ => {}
            }
        }
        if !pending.is_empty() {
            response.push_str("\n**Waiting for approval:**\n");
            for member in pending {
                writeln!(&mut response, "• {} (<@{}>)", member.name, member.user_id)?;
            }
        }

        ctx.say(response).await?;
        Ok(())
    }

    /// Grants a role to a member.
    #[poise::command(slash_command, guild_only, rename = "role_add")]
    pub async fn mess_role_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Member to promote"] user: serenity::User,
        #[description = "Role to grant"] role: RoleChoice,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let role = Role::from(role);
        let updated = registry::assign_role(
            &ctx.data().database,
            &actor,
            found.id,
            &user.id.to_string(),
            role,
        )
        .await?;

        ctx.say(format!(
            "✅ {} now has roles: {}",
            updated.name,
            RoleSet::from_stored(&updated.roles)
        ))
        .await?;
        Ok(())
    }

    /// Revokes a role from a member.
    #[poise::command(slash_command, guild_only, rename = "role_remove")]
    pub async fn mess_role_remove(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Member to demote"] user: serenity::User,
        #[description = "Role to revoke"] role: RoleChoice,
    ) -> Result<()> {
        let Some((found, actor)) = mess_and_actor(ctx).await? else {
            return Ok(());
        };
        let updated = registry::remove_role(
            &ctx.data().database,
            &actor,
            found.id,
            &user.id.to_string(),
            Role::from(role),
        )
        .await?;

        ctx.say(format!(
            "✅ {} now has roles: {}",
            updated.name,
            RoleSet::from_stored(&updated.roles)
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
