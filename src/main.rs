use std::sync::Arc;

use drew_bot::config::Config;
use drew_bot::consent::{ConsentStore, KeyValueCache, MemoryCache, PgConsentStore, RedisCache};
use drew_bot::health::{self, HealthScheduler, HttpHeartbeat};
use drew_bot::{CONSOLE_TARGET, Data, ERROR_TARGET, Error, commands, handlers, logging};
use poise::serenity_prelude::{self as serenity, ActivityData, GatewayIntents, GuildId, UserId};
use tracing::{error, info, warn};

/// Main function to run the bot
async fn async_main() -> Result<(), Error> {
    logging::init()?;

    let config = Config::load().inspect_err(|e| {
        error!(target: ERROR_TARGET, error = %e, "Failed to load configuration");
    })?;

    // Lazy pool, the bot starts even while the database is down
    let store: Arc<dyn ConsentStore> = Arc::new(PgConsentStore::connect_lazy(
        &config.database_url,
        config.store_timeout(),
    )?);
    let cache = connect_cache(&config).await;

    let token = config.discord_token.clone();
    let data = Data::new(config, store, cache);

    let heartbeat = Arc::new(HttpHeartbeat::new(data.config.health.heartbeat_timeout())?);
    let scheduler = HealthScheduler::start(
        health::schedules(
            &data.config.health,
            data.gateway.clone(),
            data.store.clone(),
            data.cache.clone(),
        ),
        heartbeat,
        data.gateway.clone(),
    );

    let owners = data.config.owners().into_iter().map(UserId::new).collect();
    let guild_id = data.config.guild_id.map(GuildId::new);
    let setup_data = data.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            owners,
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(data.config.prefix.clone()),
                mention_as_prefix: true,
                case_insensitive_commands: true,
                ..Default::default()
            },
            command_check: Some(|ctx| Box::pin(handlers::consent_check(ctx))),
            pre_command: |ctx| Box::pin(logging::log_command_start(ctx)),
            post_command: |ctx| Box::pin(logging::log_command_end(ctx)),
            on_error: |error| Box::pin(handlers::on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!(bot = %ready.user.name, guilds = ready.guilds.len(), "Bot is ready");

                let commands = &framework.options().commands;
                if let Some(guild_id) = guild_id {
                    poise::builtins::register_in_guild(ctx, commands, guild_id).await?;
                    logging::log_console(&format!("Slash commands registered to guild {guild_id}"));
                } else {
                    poise::builtins::register_globally(ctx, commands).await?;
                    logging::log_console("Slash commands registered globally");
                }

                ctx.set_activity(Some(ActivityData::listening("/help")));
                Ok(setup_data)
            })
        })
        .build();

    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;
    let mut client = serenity::ClientBuilder::new(token, intents)
        .event_handler(handlers::Handler::new(data))
        .framework(framework)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!(target: CONSOLE_TARGET, "Shutdown signal received, stopping bot...");
        shard_manager.shutdown_all().await;
    });

    info!(target: CONSOLE_TARGET, "Starting bot...");
    let result = client.start().await;

    scheduler.shutdown();
    if let Err(err) = result {
        error!(target: ERROR_TARGET, error = %err, "Client error");
        return Err(err.into());
    }

    info!(target: CONSOLE_TARGET, "Bot has shut down cleanly");
    Ok(())
}

/// Redis when configured and reachable, otherwise an in-process cache
async fn connect_cache(config: &Config) -> Arc<dyn KeyValueCache> {
    let Some(url) = config.redis_url.as_deref() else {
        warn!(target: CONSOLE_TARGET, "REDIS_URL not set, using in-process cache");
        return Arc::new(MemoryCache::new());
    };

    match RedisCache::connect(url, config.cache_timeout()).await {
        Ok(cache) => {
            info!(target: CONSOLE_TARGET, "Connected to Redis");
            Arc::new(cache)
        }
        Err(e) => {
            warn!(target: ERROR_TARGET, error = %e, "Redis unavailable, using in-process cache");
            Arc::new(MemoryCache::new())
        }
    }
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(target: ERROR_TARGET, error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(target: ERROR_TARGET, error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

fn main() {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Failed to build runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(async_main()) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
