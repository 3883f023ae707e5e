use std::sync::Arc;

pub trait Notifier: Send + Sync {
    fn notify(&self, message: String);
}

/// Used when no webhook is configured.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: String) {
        tracing::info!(%message, "notification (no webhook configured)");
    }
}

pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: String) -> Self {
        SlackNotifier {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }
}

impl Notifier for SlackNotifier {
    fn notify(&self, message: String) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(%message, "no async runtime, dropping notification");
            return;
        };
        let client = self.client.clone();
        let url = self.webhook_url.clone();
        runtime.spawn(async move {
            let payload = serde_json::json!({ "text": message });
            match client.post(&url).json(&payload).send().await {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => {
                    tracing::warn!(status = %resp.status(), "slack notification rejected")
                }
                Err(e) => tracing::warn!(error = %e, "failed to send slack notification"),
            }
        });
    }
}

pub fn from_webhook(webhook_url: Option<String>) -> Arc<dyn Notifier> {
    match webhook_url {
        Some(url) => Arc::new(SlackNotifier::new(url)),
        None => Arc::new(LogNotifier),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slack_outside_runtime_does_not_panic() {
        let notifier = SlackNotifier::new("http://127.0.0.1:9/hook".into());
        notifier.notify("hello".into());
    }
}
