use crate::{Context, Data, Error};
use poise::serenity_prelude::CreateEmbed;
use poise::{CreateReply, command};
use std::fmt::Display;
use std::time::{Duration, Instant};

const EMBED_COLOR: u32 = 0xFF_FFFF;

/// Check the bot's latency
#[command(prefix_command, slash_command, aliases("latency", "rtt"), user_cooldown = 5)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let gateway = ctx.ping().await;

    let started = Instant::now();
    let rest = ctx.http().get_current_user().await.map(|_| started.elapsed());

    let started = Instant::now();
    let store = ctx.data().store.ping().await.map(|()| started.elapsed());

    let started = Instant::now();
    let cache = ctx.data().cache.ping().await.map(|()| started.elapsed());

    let embed = latency_embed([
        ("Gateway", format_latency::<&str>(Ok(gateway))),
        ("REST", format_latency(rest)),
        ("Database", format_latency(store)),
        ("Cache", format_latency(cache)),
    ]);

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// One inline field per measured dependency
#[must_use]
pub fn latency_embed<const N: usize>(fields: [(&str, String); N]) -> CreateEmbed {
    fields.into_iter().fold(
        CreateEmbed::default().title("Latency").color(EMBED_COLOR),
        |embed, (name, value)| embed.field(name, value, true),
    )
}

/// Displays a list of available commands
#[command(prefix_command, slash_command, user_cooldown = 5)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let embed = help_entries(&ctx.framework().options().commands)
        .into_iter()
        .fold(
            CreateEmbed::default()
                .title("Commands")
                .description("Here's a list of all available commands:")
                .color(EMBED_COLOR),
            |embed, (name, description)| embed.field(format!("/{name}"), description, false),
        );

    ctx.send(CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Shows the bot version and uptime
#[command(prefix_command, slash_command)]
pub async fn about(ctx: Context<'_>) -> Result<(), Error> {
    let embed = CreateEmbed::default()
        .title("About")
        .color(EMBED_COLOR)
        .field("Version", env!("CARGO_PKG_VERSION"), true)
        .field("Uptime", format_uptime(ctx.data().start_time.elapsed()), true);

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Re-register slash commands globally
#[command(prefix_command, owners_only, hide_in_help, user_cooldown = 30)]
pub async fn sync(ctx: Context<'_>) -> Result<(), Error> {
    let commands = &ctx.framework().options().commands;
    poise::builtins::register_globally(ctx.http(), commands).await?;
    ctx.say(format!("Synced {} command(s)", commands.len()))
        .await?;
    Ok(())
}

/// Every command registered with the framework
#[must_use]
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![ping(), help(), about(), sync()]
}

/// Visible commands and their descriptions, in registration order
#[must_use]
pub fn help_entries(commands: &[poise::Command<Data, Error>]) -> Vec<(String, String)> {
    commands
        .iter()
        .filter(|cmd| !cmd.hide_in_help)
        .filter_map(|cmd| Some((cmd.name.clone(), cmd.description.clone()?)))
        .collect()
}

#[must_use]
pub fn format_latency<E: Display>(result: Result<Duration, E>) -> String {
    match result {
        Ok(latency) => format!("{}ms", latency.as_millis()),
        Err(_) => "Error".to_string(),
    }
}

#[must_use]
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}
