use crate::chunk::{self, MAX_MESSAGE_LEN};
use crate::dispatch::{Dispatcher, Message};
use crate::qbittorrent::TorrentApi;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serenity::all::{ChannelId, Context, EventHandler, GatewayIntents, Http, Ready};

/// Somewhere replies can be posted.
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn send_plain(&self, content: &str) -> Result<()>;
}

/// Posts `response` in as many messages as the length limit requires.
pub async fn respond<S: ChatSink + ?Sized>(sink: &S, response: &str) -> Result<()> {
    for segment in chunk::segments(response, MAX_MESSAGE_LEN) {
        sink.send_plain(segment).await?;
    }
    Ok(())
}

pub struct ChannelSink {
    http: Arc<Http>,
    channel: ChannelId,
}

#[async_trait]
impl ChatSink for ChannelSink {
    async fn send_plain(&self, content: &str) -> Result<()> {
        self.channel
            .say(&self.http, content)
            .await
            .with_context(|| format!("Failed to post in channel {}", self.channel))?;
        Ok(())
    }
}

pub struct Handler<A> {
    dispatcher: Dispatcher<A>,
}

impl<A> Handler<A> {
    pub fn new(dispatcher: Dispatcher<A>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl<A: TorrentApi + 'static> EventHandler for Handler<A> {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        log::info!("We have logged in as {}", ready.user.name);
    }

    async fn message(&self, ctx: Context, msg: serenity::all::Message) {
        let from_self = msg.author.id == ctx.cache.current_user().id;
        let attachments: Vec<String> = msg.attachments.iter().map(|a| a.url.clone()).collect();
        let message = Message {
            from_self,
            content: &msg.content,
            attachments: &attachments,
        };

        let response = self.dispatcher.dispatch(&message).await;
        let sink = ChannelSink {
            http: Arc::clone(&ctx.http),
            channel: msg.channel_id,
        };
        if let Err(err) = respond(&sink, &response).await {
            log::error!("{err:#}");
        }
    }
}

/// Connects to the Discord gateway and serves commands until the
/// connection is lost for good.
pub async fn run<A: TorrentApi + 'static>(token: &str, dispatcher: Dispatcher<A>) -> Result<()> {
    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = serenity::Client::builder(token, intents)
        .event_handler(Handler::new(dispatcher))
        .await
        .context("Unable to create the Discord client")?;

    client.start().await.context("Discord connection closed")
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatSink for RecordingSink {
        async fn send_plain(&self, content: &str) -> Result<()> {
            self.sent.lock().unwrap().push(content.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn long_responses_are_split() {
        let sink = RecordingSink::default();
        let response = "line\n".repeat(900);

        respond(&sink, &response).await.unwrap();

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent.concat(), response);
    }

    #[tokio::test]
    async fn empty_response_sends_nothing() {
        let sink = RecordingSink::default();

        respond(&sink, "").await.unwrap();

        assert!(sink.sent.lock().unwrap().is_empty());
    }
}
