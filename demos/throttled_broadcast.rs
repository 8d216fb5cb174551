use keyed_queue::{ApiErrorResponse, KeyedDispatcher, QueueError, QueueOptions, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Stand-in for a chat API that rejects every third request with a 429.
#[derive(Default)]
struct FakeChatApi {
    requests: AtomicU32,
}

impl FakeChatApi {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        let n = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        if n % 3 == 0 {
            let body = r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 1","parameters":{"retry_after":1}}"#;
            return Err(ApiErrorResponse::from_json(body)?.into());
        }
        if chat_id == "blocked" {
            let body = r#"{"ok":false,"error_code":403,"description":"Forbidden: bot was blocked by the user"}"#;
            return Err(ApiErrorResponse::from_json(body)?.into());
        }
        println!("[api] -> {chat_id}: {text}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("keyed_queue=debug")),
        )
        .try_init()
        .ok();

    let api = Arc::new(FakeChatApi::default());
    let dispatcher = KeyedDispatcher::new(
        QueueOptions::default()
            .with_delay_between_messages_ms(250)
            .with_max_retries(3),
    )?;

    let mut handles = Vec::new();
    for chat_id in ["alice", "bob", "blocked"] {
        for i in 1..=3 {
            let api = Arc::clone(&api);
            let text = format!("update #{i}");
            handles.push(dispatcher.submit_tracked(chat_id, move || {
                let api = Arc::clone(&api);
                let text = text.clone();
                async move { api.send_message(chat_id, &text).await }
            }));
        }
    }

    for handle in handles {
        let job_id = handle.job_id().clone();
        match handle.outcome().await {
            Ok(outcome) => println!("[broadcast] job {job_id}: {outcome:?}"),
            Err(QueueError::Canceled) => println!("[broadcast] job {job_id} canceled"),
            Err(e) => return Err(e.into()),
        }
    }

    for key in dispatcher.keys() {
        if let Some(stats) = dispatcher.stats(&key) {
            println!("[broadcast] {stats:?}");
        }
    }

    Ok(())
}
