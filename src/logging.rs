use crate::{COMMAND_TARGET, CONSOLE_TARGET, Data, ERROR_TARGET, Error};
use poise::{Context, FrameworkError};
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Log directory name
pub const LOG_DIR: &str = "logs";
/// Command log file name
pub const COMMAND_LOG_FILE: &str = "commands";

/// Initialize the logging system with console and file outputs
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or the default
/// filter directives do not parse.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if !Path::new(LOG_DIR).exists() {
        std::fs::create_dir_all(LOG_DIR)?;
    }

    let command_file = RollingFileAppender::new(Rotation::DAILY, LOG_DIR, COMMAND_LOG_FILE);

    // Human-readable console output
    let console_layer = fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_ansi(true);

    // JSON lines for the command log
    let command_layer = fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_ansi(false)
        .json()
        .with_writer(command_file);

    // RUST_LOG wins; otherwise info, with serenity's gateway chatter muted
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info").add_directive("serenity=error".parse()?),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(command_layer)
        .init();

    info!("Logging system initialized");
    Ok(())
}

fn guild_label(ctx: Context<'_, Data, Error>) -> String {
    ctx.guild_id()
        .map_or_else(|| "DM".to_string(), |id| id.get().to_string())
}

/// Log the start of a command execution (pre-command hook)
pub async fn log_command_start(ctx: Context<'_, Data, Error>) {
    // Read back by log_command_end for the duration
    ctx.set_invocation_data(Instant::now()).await;

    let command_name = &ctx.command().qualified_name;
    let guild_id = guild_label(ctx);
    let user_id = ctx.author().id.get();

    let args = if ctx.command().parameters.is_empty() {
        String::new()
    } else {
        format!("{:?}", ctx.invocation_string())
    };

    info!(
        target: COMMAND_TARGET,
        command = %command_name,
        guild_id = %guild_id,
        user_id,
        arguments = %args,
        event = "start",
        "Command execution started"
    );
}

/// Log the end of a command execution (post-command hook)
pub async fn log_command_end(ctx: Context<'_, Data, Error>) {
    let duration = ctx
        .invocation_data::<Instant>()
        .await
        .map(|start| start.elapsed());

    let command_name = &ctx.command().qualified_name;
    let guild_id = guild_label(ctx);
    let user_id = ctx.author().id.get();

    let duration_ms = u64::try_from(duration.map_or(0, |d| d.as_millis())).unwrap_or_default();
    info!(
        target: COMMAND_TARGET,
        command = %command_name,
        guild_id = %guild_id,
        user_id,
        duration_ms,
        event = "end",
        "Command execution completed"
    );
}

/// Log errors that occur during command execution
pub fn log_command_error(error: &FrameworkError<'_, Data, Error>) {
    match error {
        FrameworkError::Command { error, ctx, .. } => {
            error!(
                target: ERROR_TARGET,
                command = %ctx.command().qualified_name,
                guild_id = %guild_label(*ctx),
                user_id = ctx.author().id.get(),
                error = %error,
                "Command error"
            );
        }
        // Consent denials are answered with the prompt, not an error
        FrameworkError::CommandCheckFailed { error: None, .. } => {}
        FrameworkError::CommandCheckFailed {
            error: Some(error),
            ctx,
            ..
        } => {
            error!(
                target: ERROR_TARGET,
                command = %ctx.command().qualified_name,
                guild_id = %guild_label(*ctx),
                user_id = ctx.author().id.get(),
                error = %error,
                "Command check failed"
            );
        }
        FrameworkError::CooldownHit {
            remaining_cooldown,
            ctx,
            ..
        } => {
            info!(
                target: COMMAND_TARGET,
                command = %ctx.command().qualified_name,
                user_id = ctx.author().id.get(),
                remaining_secs = remaining_cooldown.as_secs(),
                event = "cooldown",
                "Command on cooldown"
            );
        }
        FrameworkError::UnknownCommand {
            msg, msg_content, ..
        } => {
            info!(
                target: COMMAND_TARGET,
                user_id = msg.author.id.get(),
                content = %msg_content,
                event = "unknown_command",
                "Unknown command"
            );
        }
        FrameworkError::ArgumentParse { error, ctx, .. } => {
            info!(
                target: COMMAND_TARGET,
                command = %ctx.command().qualified_name,
                user_id = ctx.author().id.get(),
                error = %error,
                event = "arguments",
                "Invalid command arguments"
            );
        }
        FrameworkError::GuildOnly { ctx, .. } => log_refusal(*ctx, "guild_only"),
        FrameworkError::DmOnly { ctx, .. } => log_refusal(*ctx, "dm_only"),
        FrameworkError::NotAnOwner { ctx, .. } => log_refusal(*ctx, "not_owner"),
        FrameworkError::MissingBotPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            warn!(
                target: COMMAND_TARGET,
                command = %ctx.command().qualified_name,
                guild_id = %guild_label(*ctx),
                missing = ?missing_permissions,
                event = "permissions",
                "Bot lacks permissions for command"
            );
        }
        err => {
            error!(
                target: ERROR_TARGET,
                error = ?err,
                "Other framework error"
            );
        }
    }
}

fn log_refusal(ctx: Context<'_, Data, Error>, reason: &'static str) {
    info!(
        target: COMMAND_TARGET,
        command = %ctx.command().qualified_name,
        guild_id = %guild_label(ctx),
        user_id = ctx.author().id.get(),
        event = reason,
        "Command refused"
    );
}

pub fn log_console(message: &str) {
    info!(
        target: CONSOLE_TARGET,
        message = %message,
        event = "console",
    );
}
