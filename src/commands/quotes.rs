use std::time::Duration;

use futures::StreamExt;
use poise::serenity_prelude::MessageCollector;
use rand::seq::SliceRandom;

use crate::models::quotes::Quote;
use crate::{Context, Error};

/// How long the viewquotes dialogue waits for an answer from the invoking
/// user before giving up.
const ANSWER_TIMEOUT: Duration = Duration::from_secs(60);

/// add a quote to the list.
#[poise::command(prefix_command, guild_only)]
#[tracing::instrument(skip(ctx))]
pub async fn addquote(ctx: Context<'_>, #[rest] quote: String) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let id = ctx
        .data()
        .store
        .insert(
            &guild_id.to_string(),
            &ctx.channel_id().to_string(),
            &quote,
        )
        .await
        .inspect_err(|e| {
            tracing::error!(err = ?e, quote = %quote, "an error occurred when adding quote");
        })?;

    tracing::debug!(id, "stored quote");

    ctx.send(poise::CreateReply::default().content(format!("quote: {quote} added!")))
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

    Ok(())
}

/// get a random quote.
#[poise::command(prefix_command, guild_only)]
#[tracing::instrument(skip_all)]
pub async fn quote(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let quotes = ctx
        .data()
        .store
        .list_all(&guild_id.to_string())
        .await
        .inspect_err(
            |e| tracing::error!(err = ?e, "an error occurred when fetching quotes from database"),
        )?;

    let content = match pick_random(&quotes) {
        Some(picked) => picked.quote.clone(),
        None => "no quotes available".to_string(),
    };

    ctx.send(poise::CreateReply::default().content(content))
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

    Ok(())
}

/// add all messages starting with " in this channel to the quote list.
#[poise::command(prefix_command, guild_only)]
#[tracing::instrument(skip_all)]
pub async fn addhistory(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    ctx.send(poise::CreateReply::default().content("adding all quotes from this channel..."))
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

    let server_id = guild_id.to_string();
    let channel_id = ctx.channel_id().to_string();
    let mut added_count: u64 = 0;

    let mut messages = ctx.channel_id().messages_iter(ctx.http()).boxed();
    while let Some(message) = messages.next().await {
        let message = message.inspect_err(
            |e| tracing::error!(err = ?e, "an error occurred when fetching channel history"),
        )?;

        if message.content.starts_with('"')
            && ctx
                .data()
                .store
                .add_if_missing(&server_id, &channel_id, &message.content)
                .await
                .inspect_err(|e| {
                    tracing::error!(err = ?e, "an error occurred when importing quote");
                })?
        {
            added_count += 1;
        }
    }

    tracing::info!(added_count, server = %server_id, "finished history import");

    ctx.send(
        poise::CreateReply::default()
            .content(format!("added {added_count} messages to the quote list")),
    )
    .await
    .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

    Ok(())
}

/// view the quotes in the list.
#[poise::command(prefix_command, guild_only)]
#[tracing::instrument(skip_all)]
pub async fn viewquotes(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let quotes = ctx
        .data()
        .store
        .list_all(&guild_id.to_string())
        .await
        .inspect_err(
            |e| tracing::error!(err = ?e, "an error occurred when fetching quotes from database"),
        )?;

    if quotes.len() <= 2 {
        ctx.send(
            poise::CreateReply::default()
                .content(format!("quote list:\n{}", format_quote_list(&quotes))),
        )
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

        ctx.send(poise::CreateReply::default().content("end of quotes"))
            .await
            .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

        return Ok(());
    }

    ctx.send(poise::CreateReply::default().content(format!(
        "there are {} quotes, do you want to view them all?",
        quotes.len()
    )))
    .await
    .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

    let Some(answer) = await_answer(ctx).await else {
        ctx.send(poise::CreateReply::default().content("no response, returning"))
            .await
            .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

        return Ok(());
    };

    match parse_confirmation(&answer) {
        Confirmation::Yes => {
            ctx.send(
                poise::CreateReply::default()
                    .content(format!("quotes list:\n\n{}", format_quote_list(&quotes))),
            )
            .await
            .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;
        }
        Confirmation::No => {
            ctx.send(
                poise::CreateReply::default()
                    .content("how many quotes would you like to view? type a number:"),
            )
            .await
            .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

            let Some(answer) = await_answer(ctx).await else {
                ctx.send(poise::CreateReply::default().content("no response, returning"))
                    .await
                    .inspect_err(
                        |e| tracing::error!(err = ?e, "an error occurred when sending reply"),
                    )?;

                return Ok(());
            };

            match parse_view_count(&answer, quotes.len()) {
                Some(count) => {
                    ctx.send(
                        poise::CreateReply::default()
                            .content(format_quote_list(&quotes[..count])),
                    )
                    .await
                    .inspect_err(
                        |e| tracing::error!(err = ?e, "an error occurred when sending reply"),
                    )?;
                }
                None => {
                    ctx.send(poise::CreateReply::default().content("invalid response, returning"))
                        .await
                        .inspect_err(
                            |e| tracing::error!(err = ?e, "an error occurred when sending reply"),
                        )?;
                }
            }
        }
        // anything else ends the dialogue silently.
        Confirmation::Other => {}
    }

    Ok(())
}

/// clear all quotes in the list.
#[poise::command(prefix_command, guild_only)]
#[tracing::instrument(skip_all)]
pub async fn clearquotes(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let server_id = guild_id.to_string();
    let deleted = ctx
        .data()
        .store
        .delete_all(&server_id)
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when clearing quotes"))?;

    tracing::info!(deleted, server = %server_id, "cleared quotes");

    ctx.send(poise::CreateReply::default().content("quotes cleared"))
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

    Ok(())
}

/// delete a quote from the list.
#[poise::command(prefix_command, guild_only)]
#[tracing::instrument(skip(ctx))]
pub async fn deletequote(ctx: Context<'_>, #[rest] quote: String) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let deleted = ctx
        .data()
        .store
        .delete_matching(&guild_id.to_string(), &quote)
        .await
        .inspect_err(|e| {
            tracing::error!(err = ?e, quote = %quote, "an error occurred when deleting quote");
        })?;

    let content = if deleted > 0 {
        format!("quote: {quote} deleted!")
    } else {
        format!("quote: {quote} not found.")
    };

    ctx.send(poise::CreateReply::default().content(content))
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

    Ok(())
}

/// Wait for the next message from the invoking user in the invoking channel.
/// Returns None once [`ANSWER_TIMEOUT`] elapses without one.
async fn await_answer(ctx: Context<'_>) -> Option<String> {
    MessageCollector::new(ctx)
        .channel_id(ctx.channel_id())
        .author_id(ctx.author().id)
        .timeout(ANSWER_TIMEOUT)
        .await
        .map(|message| message.content.clone())
}

fn pick_random(quotes: &[Quote]) -> Option<&Quote> {
    quotes.choose(&mut rand::thread_rng())
}

enum Confirmation {
    Yes,
    No,
    Other,
}

fn parse_confirmation(answer: &str) -> Confirmation {
    match answer.trim().to_lowercase().as_str() {
        "yes" => Confirmation::Yes,
        "no" => Confirmation::No,
        _ => Confirmation::Other,
    }
}

/// Parse the "how many" answer. Only an integer between 1 and the number of
/// stored quotes is accepted.
fn parse_view_count(answer: &str, total: usize) -> Option<usize> {
    answer
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|count| (1..=total).contains(count))
}

fn format_quote_list(quotes: &[Quote]) -> String {
    quotes
        .iter()
        .map(|q| q.quote.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
