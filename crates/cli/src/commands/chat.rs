//! `cnbchat chat`: interactive session.
//!
//! Each line is one command. Ctrl+C while an answer is being produced
//! cancels that answer only; Ctrl+C at the prompt ends the session.

use std::io::Write;
use std::sync::Arc;

use cnbchat_agent::{ChannelReply, ChatService, Outcome, strip_command};
use cnbchat_channels::CliChannel;
use cnbchat_core::channel::Channel;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::load_config;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let service = ChatService::from_config(&config)?;

    println!();
    println!("  cnbchat: Interactive Mode");
    println!();
    println!("  Repository: {}", config.repository);
    println!("  Model:      {}", config.model);
    println!("  Think mode: {}", if config.think_mode { "on" } else { "off" });
    println!();
    println!("  Ask a question, or `owner/repo question` for another repository.");
    println!("  `think on` / `think off` toggles the reasoning output.");
    println!("  Type 'exit' or press Ctrl+C to quit.");
    println!();

    let channel: Arc<dyn Channel> = Arc::new(CliChannel::new());
    let mut rx = channel
        .start()
        .await
        .map_err(|e| format!("Channel error: {e}"))?;

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let next = tokio::select! {
            next = rx.recv() => next,
            _ = tokio::signal::ctrl_c() => break,
        };

        let msg = match next {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                eprintln!("  [Channel Error] {e}");
                break;
            }
            None => break,
        };

        let reply = ChannelReply::new(channel.clone(), msg.chat_id.clone());
        let cancel = CancellationToken::new();
        let invocation = service.handle(strip_command(&msg.content), &reply, &cancel);
        tokio::pin!(invocation);

        let outcome = tokio::select! {
            outcome = &mut invocation => outcome,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                invocation.await
            }
        };

        match outcome {
            Outcome::Cancelled => eprintln!("  [Cancelled]"),
            other => debug!(?other, "Invocation finished"),
        }
        println!();
    }

    channel.stop().await?;
    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}
