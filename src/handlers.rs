use crate::consent::{
    AcceptButton, ConsentResult, Confirmation, Decision, Invocation, confirmation_message,
    language_from_locale, private_confirmation_message, record_failed_message, unavailable_reply,
};
use crate::{Data, ERROR_TARGET, EVENT_TARGET, Error, logging};
use poise::serenity_prelude::{
    self as serenity, ComponentInteraction, ConnectionStage, CreateEmbed,
    CreateInteractionResponse, CreateMessage, EventHandler, GuildId, Interaction, Permissions,
    Ready, ResumedEvent, ShardStageUpdateEvent,
};
use poise::{CreateReply, FrameworkError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const NOTICE_COLOR: u32 = 0xFF_FFFF;

/// Gateway event handler
pub struct Handler {
    data: Data,
}

impl Handler {
    #[must_use]
    pub fn new(data: Data) -> Self {
        Self { data }
    }

    async fn on_component(&self, ctx: &serenity::Context, component: &ComponentInteraction) {
        let Some(button) = AcceptButton::parse(&component.data.custom_id) else {
            return;
        };
        let presser = component.user.id.get();

        let outcome = self.data.acceptance.on_accept(presser).await;
        let response = acceptance_response(&button, presser, &outcome);

        if let Err(e) = component.create_response(ctx, response).await {
            warn!(target: EVENT_TARGET, user_id = presser, error = %e, "Failed to answer Accept button");
        }
    }
}

#[serenity::async_trait]
impl EventHandler for Handler {
    /// Called when the bot is ready, but the cache may not be fully populated yet.
    async fn ready(&self, ctx: serenity::Context, ready: Ready) {
        let user_name = &ready.user.name;
        let shard_id = ctx.shard_id;
        info!(target: EVENT_TARGET, "Connected as {user_name}, shard {shard_id}");
        self.data.gateway.set_connected(true);
    }

    async fn resume(&self, _ctx: serenity::Context, _event: ResumedEvent) {
        info!(target: EVENT_TARGET, "Gateway session resumed");
        self.data.gateway.set_connected(true);
    }

    async fn shard_stage_update(&self, _ctx: serenity::Context, event: ShardStageUpdateEvent) {
        debug!(
            target: EVENT_TARGET,
            shard = ?event.shard_id,
            old = ?event.old,
            new = ?event.new,
            "Shard stage changed"
        );
        match (event.old, event.new) {
            (_, ConnectionStage::Connected) => self.data.gateway.set_connected(true),
            (ConnectionStage::Connected, _) => {
                warn!(target: EVENT_TARGET, shard = ?event.shard_id, "Gateway connection lost");
                self.data.gateway.set_connected(false);
            }
            _ => {}
        }
    }

    /// Called when the cache is fully populated.
    async fn cache_ready(&self, ctx: serenity::Context, guilds: Vec<GuildId>) {
        let guild_count_cache = ctx.cache.guild_count();
        let guild_count = guilds.len();
        if guild_count != guild_count_cache {
            warn!(
                target: EVENT_TARGET,
                "Cache guild count mismatch: {guild_count_cache} (cache) vs {guild_count} (actual)"
            );
        }
        info!(target: EVENT_TARGET, "Cache ready! The bot is in {guild_count} guild(s)");
    }

    async fn interaction_create(&self, ctx: serenity::Context, interaction: Interaction) {
        if let Interaction::Component(component) = interaction {
            self.on_component(&ctx, &component).await;
        }
    }
}

/// Response to an Accept button press.
///
/// Only the prompted user's own message is edited; anyone else pressing the
/// button gets a private confirmation.
#[must_use]
pub fn acceptance_response(
    button: &AcceptButton,
    presser: u64,
    outcome: &ConsentResult<Confirmation>,
) -> CreateInteractionResponse {
    let language = button.language.as_str();
    match outcome {
        Err(_) => CreateInteractionResponse::Message(record_failed_message(language)),
        Ok(_) if presser == button.user_id => {
            CreateInteractionResponse::UpdateMessage(confirmation_message(language))
        }
        Ok(_) => CreateInteractionResponse::Message(private_confirmation_message(language)),
    }
}

/// Framework-wide command check backed by the consent gate
///
/// # Errors
///
/// Returns an error if the prompt or the notice could not be sent.
pub async fn consent_check(ctx: crate::Context<'_>) -> Result<bool, Error> {
    let invocation = Invocation::new(
        ctx.author().id.get(),
        ctx.command().qualified_name.as_str(),
        ctx.locale(),
    );

    match ctx.data().gate.authorize(&invocation).await {
        Decision::Allow => Ok(true),
        Decision::Deny(prompt) => {
            ctx.send(prompt.reply()).await?;
            Ok(false)
        }
        Decision::Unavailable => {
            let language = language_from_locale(ctx.locale());
            ctx.send(unavailable_reply(&language)).await?;
            Ok(false)
        }
    }
}

/// Whole seconds left on a cooldown, rounded to nearest
#[must_use]
pub fn cooldown_seconds(remaining: Duration) -> u64 {
    u64::try_from((remaining.as_millis() + 500) / 1000).unwrap_or(u64::MAX)
}

fn notice_embed(title: &str, description: impl Into<String>) -> CreateEmbed {
    CreateEmbed::default()
        .title(title)
        .description(description)
        .color(NOTICE_COLOR)
}

fn notice_reply(title: &str, description: impl Into<String>) -> CreateReply {
    CreateReply::default()
        .embed(notice_embed(title, description))
        .ephemeral(true)
}

#[must_use]
pub fn cooldown_reply(remaining: Duration) -> CreateReply {
    notice_reply(
        "Cooldown",
        format!(
            "You must wait `{}` seconds before using this command again.",
            cooldown_seconds(remaining)
        ),
    )
}

/// Command name as typed, without its arguments
#[must_use]
pub fn invoked_name(msg_content: &str) -> &str {
    msg_content.split_whitespace().next().unwrap_or(msg_content)
}

#[must_use]
pub fn unknown_command_message(prefix: &str, invoked: &str) -> CreateMessage {
    CreateMessage::new().embed(notice_embed(
        "Search",
        format!("The command `{invoked}` was not found. Use `{prefix}help` to see all commands"),
    ))
}

/// Reply to arguments that failed to parse. Without `input` an argument
/// was missing altogether.
#[must_use]
pub fn argument_reply(input: Option<&str>) -> CreateReply {
    let description = match input {
        Some(input) => format!("Argument `{input}` is invalid for this command."),
        None => "An argument is missing to execute the command.".to_string(),
    };
    notice_reply("Arguments", description)
}

#[must_use]
pub fn guild_only_reply() -> CreateReply {
    notice_reply("Guild", "This command can only be used in `guild` messages.")
}

#[must_use]
pub fn dm_only_reply() -> CreateReply {
    notice_reply("DM", "This command can only be used in `DM` messages.")
}

#[must_use]
pub fn missing_permissions_reply(missing: Permissions) -> CreateReply {
    notice_reply(
        "Permissions",
        format!(
            "I don't have the permission `{}` to process the command.",
            missing.get_permission_names().join(", ")
        ),
    )
}

/// Sent by DM to non-owners invoking an owner command
#[must_use]
pub fn not_owner_message() -> CreateMessage {
    CreateMessage::new().embed(notice_embed("Restricted", "You `aren't` the owner of me."))
}

async fn send_notice(ctx: crate::Context<'_>, reply: CreateReply, kind: &str) {
    if let Err(e) = ctx.send(reply).await {
        warn!(
            target: EVENT_TARGET,
            user_id = ctx.author().id.get(),
            kind,
            error = %e,
            "Failed to send notice"
        );
    }
}

/// Framework error hook: log, then answer the user
pub async fn on_error(error: FrameworkError<'_, Data, Error>) {
    logging::log_command_error(&error);

    match error {
        FrameworkError::CooldownHit {
            remaining_cooldown,
            ctx,
            ..
        } => {
            let user_id = ctx.author().id.get();
            if !ctx
                .data()
                .debouncer
                .should_notify(user_id, &ctx.command().qualified_name)
                .await
            {
                return;
            }
            send_notice(ctx, cooldown_reply(remaining_cooldown), "cooldown").await;
        }
        // Already answered by consent_check
        FrameworkError::CommandCheckFailed { error: None, .. } => {}
        FrameworkError::UnknownCommand {
            ctx,
            msg,
            prefix,
            msg_content,
            ..
        } => {
            let message = unknown_command_message(prefix, invoked_name(msg_content));
            if let Err(e) = msg.channel_id.send_message(ctx, message).await {
                warn!(
                    target: EVENT_TARGET,
                    user_id = msg.author.id.get(),
                    kind = "unknown_command",
                    error = %e,
                    "Failed to send notice"
                );
            }
        }
        FrameworkError::ArgumentParse { input, ctx, .. } => {
            send_notice(ctx, argument_reply(input.as_deref()), "arguments").await;
        }
        FrameworkError::GuildOnly { ctx, .. } => {
            send_notice(ctx, guild_only_reply(), "guild_only").await;
        }
        FrameworkError::DmOnly { ctx, .. } => {
            send_notice(ctx, dm_only_reply(), "dm_only").await;
        }
        FrameworkError::MissingBotPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            send_notice(ctx, missing_permissions_reply(missing_permissions), "permissions").await;
        }
        FrameworkError::NotAnOwner { ctx, .. } => {
            let author = ctx.author();
            if let Err(e) = author
                .direct_message(ctx.serenity_context(), not_owner_message())
                .await
            {
                warn!(
                    target: EVENT_TARGET,
                    user_id = author.id.get(),
                    kind = "not_owner",
                    error = %e,
                    "Failed to send notice"
                );
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!(target: ERROR_TARGET, error = %e, "Error while handling error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::{AcceptanceFlow, ConsentError, MemoryCache, MemoryConsentStore, StoreError};
    use std::sync::Arc;

    fn button() -> AcceptButton {
        AcceptButton {
            user_id: 42,
            language: "fr".to_string(),
        }
    }

    #[test]
    fn test_handler_implements_event_handler() {
        fn assert_impl<T: EventHandler>() {}
        assert_impl::<Handler>();
    }

    #[test]
    fn test_prompted_user_gets_message_edit() {
        let response = acceptance_response(&button(), 42, &Ok(Confirmation { user_id: 42 }));
        assert!(matches!(response, CreateInteractionResponse::UpdateMessage(_)));
    }

    #[test]
    fn test_other_user_gets_private_confirmation() {
        let response = acceptance_response(&button(), 7, &Ok(Confirmation { user_id: 7 }));
        assert!(matches!(response, CreateInteractionResponse::Message(_)));
    }

    #[test]
    fn test_failed_record_never_edits_prompt() {
        let outcome = Err(ConsentError::Store(StoreError::Database(
            sqlx::Error::PoolTimedOut,
        )));
        let response = acceptance_response(&button(), 42, &outcome);
        assert!(matches!(response, CreateInteractionResponse::Message(_)));
    }

    #[tokio::test]
    async fn test_button_press_records_presser() {
        let store = Arc::new(MemoryConsentStore::default());
        let flow = AcceptanceFlow::new(store.clone(), Arc::new(MemoryCache::new()));

        let outcome = flow.on_accept(7).await;
        let response = acceptance_response(&button(), 7, &outcome);

        assert!(matches!(response, CreateInteractionResponse::Message(_)));
        assert!(store.record(7).is_some_and(|r| r.accepted));
        assert!(store.record(42).is_none());
    }

    #[test]
    fn test_cooldown_seconds_rounds() {
        assert_eq!(cooldown_seconds(Duration::from_millis(4_400)), 4);
        assert_eq!(cooldown_seconds(Duration::from_millis(4_500)), 5);
        assert_eq!(cooldown_seconds(Duration::from_secs(30)), 30);
        assert_eq!(cooldown_seconds(Duration::ZERO), 0);
    }

    #[test]
    fn test_cooldown_reply_is_private_embed() {
        let reply = cooldown_reply(Duration::from_secs(3));
        assert_eq!(reply.ephemeral, Some(true));
        assert_eq!(reply.embeds.len(), 1);
        assert!(reply.content.is_none());
        assert!(format!("{:?}", reply.embeds).contains("You must wait `3` seconds"));
    }

    #[test]
    fn test_invoked_name_drops_arguments() {
        assert_eq!(invoked_name("pnig now please"), "pnig");
        assert_eq!(invoked_name("pnig"), "pnig");
        assert_eq!(invoked_name(""), "");
    }

    #[test]
    fn test_unknown_command_message_points_to_help() {
        let debug = format!("{:?}", unknown_command_message(";", "pnig"));
        assert!(debug.contains("Search"));
        assert!(debug.contains("The command `pnig` was not found. Use `;help` to see all commands"));
    }

    #[test]
    fn test_argument_reply_with_and_without_input() {
        let missing = argument_reply(None);
        assert_eq!(missing.ephemeral, Some(true));
        assert_eq!(missing.embeds.len(), 1);
        let debug = format!("{:?}", missing.embeds);
        assert!(debug.contains("Arguments"));
        assert!(debug.contains("An argument is missing"));

        let invalid = format!("{:?}", argument_reply(Some("abc")).embeds);
        assert!(invalid.contains("Argument `abc` is invalid"));
    }

    #[test]
    fn test_channel_kind_replies() {
        let guild = guild_only_reply();
        assert_eq!(guild.ephemeral, Some(true));
        assert!(format!("{:?}", guild.embeds).contains("only be used in `guild` messages"));

        let dm = dm_only_reply();
        assert_eq!(dm.ephemeral, Some(true));
        assert!(format!("{:?}", dm.embeds).contains("only be used in `DM` messages"));
    }

    #[test]
    fn test_missing_permissions_reply_names_permissions() {
        let reply = missing_permissions_reply(Permissions::SEND_MESSAGES | Permissions::EMBED_LINKS);
        assert_eq!(reply.embeds.len(), 1);
        let debug = format!("{:?}", reply.embeds);
        assert!(debug.contains("Permissions"));
        assert!(debug.contains("Send Messages"));
        assert!(debug.contains("Embed Links"));
    }

    #[test]
    fn test_not_owner_message_is_restricted_embed() {
        let debug = format!("{:?}", not_owner_message());
        assert!(debug.contains("Restricted"));
        assert!(debug.contains("You `aren't` the owner of me."));
    }
}
