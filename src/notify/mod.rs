//! Outbound notifications.

mod twilio;

use async_trait::async_trait;
use tracing::info;

pub use twilio::TwilioNotifier;

/// Delivers a text message to a phone number in E.164 form.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str, phone: &str) -> anyhow::Result<()>;
}

/// Used when no SMS provider is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str, phone: &str) -> anyhow::Result<()> {
        info!(%phone, chars = message.chars().count(), "sms provider disabled; message not sent");
        Ok(())
    }
}

/// Prefixes a locally stored number with the country code.
pub fn e164(country_code: &str, phone: &str) -> String {
    let phone = phone.trim();
    if phone.starts_with('+') {
        return phone.to_string();
    }
    format!("+{}{}", country_code.trim_start_matches('+'), phone)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records every message; optionally fails after recording.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<(String, String)>>,
        pub fail: bool,
    }

    impl RecordingNotifier {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn messages(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }

        /// Yields to the runtime until `n` sends were recorded, so detached
        /// sends spawned by the code under test get to run.
        pub async fn wait_for(&self, n: usize) -> Vec<(String, String)> {
            for _ in 0..100 {
                let sent = self.messages();
                if sent.len() >= n {
                    return sent;
                }
                tokio::task::yield_now().await;
            }
            self.messages()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: &str, phone: &str) -> anyhow::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((message.to_string(), phone.to_string()));
            if self.fail {
                anyhow::bail!("provider unavailable");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn e164_prefixes_country_code() {
        assert_eq!(e164("55", "11999990000"), "+5511999990000");
        assert_eq!(e164("+1", "5551234"), "+15551234");
    }

    #[test]
    fn e164_keeps_already_prefixed_numbers() {
        assert_eq!(e164("55", "+4420000000"), "+4420000000");
    }

    #[tokio::test]
    async fn log_notifier_never_fails() {
        assert!(LogNotifier.send("hi", "+5511999990000").await.is_ok());
    }
}
