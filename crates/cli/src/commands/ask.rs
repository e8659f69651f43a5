//! `cnbchat ask`: answer one question and exit.

use cnbchat_agent::{ChatService, Outcome, strip_command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::load_config;

pub async fn run(message: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let service = ChatService::from_config(&config)?;

    let (tx, mut rx) = mpsc::channel::<String>(16);
    let printer = tokio::spawn(async move {
        while let Some(reply) = rx.recv().await {
            println!("{reply}");
        }
    });

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let outcome = service.handle(strip_command(&message), &tx, &cancel).await;
    interrupt.abort();
    drop(tx);
    printer.await?;

    match outcome {
        Outcome::Failed(kind) => Err(format!("question failed ({kind:?})").into()),
        Outcome::Cancelled => {
            eprintln!("  Cancelled.");
            Ok(())
        }
        Outcome::Answered | Outcome::ThinkModeChanged(_) => Ok(()),
    }
}
