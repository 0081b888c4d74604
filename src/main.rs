use poise::serenity_prelude as serenity;
use store::QuoteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
pub struct Data {
    pub store: QuoteStore,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

mod commands;
mod init;
mod models;
mod store;

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(
                err = ?error,
                command = %ctx.command().qualified_name,
                "an error occurred when running command"
            );
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                tracing::error!(err = ?e, "an error occurred when handling error");
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("initializing... please wait warmly.");
    let token = std::env::var("DISCORD_TOKEN").expect("missing DISCORD_TOKEN");
    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    let db = init::init_database().await?;
    let data = Data {
        store: QuoteStore::new(db),
    };

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::help::help(),
                commands::quotes::addquote(),
                commands::quotes::quote(),
                commands::quotes::addhistory(),
                commands::quotes::viewquotes(),
                commands::quotes::clearquotes(),
                commands::quotes::deletequote(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("!".into()),
                ..Default::default()
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|_ctx, ready, _framework| {
            Box::pin(async move {
                tracing::info!("{} has connected to discord!", ready.user.name);

                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await?;

    tracing::info!("finished initializing!");
    client.start().await?;

    Ok(())
}
