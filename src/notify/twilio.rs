//! Twilio Programmable Messaging adapter.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::Notifier;
use crate::config::SmsConfig;

pub struct TwilioNotifier {
    client: Client,
    messages_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

impl TwilioNotifier {
    pub fn new(config: &SmsConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("build sms http client")?;
        Ok(Self {
            client,
            messages_url: messages_url(&config.api_base, &config.account_sid),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
        })
    }
}

fn messages_url(api_base: &str, account_sid: &str) -> String {
    format!(
        "{}/2010-04-01/Accounts/{}/Messages.json",
        api_base.trim_end_matches('/'),
        account_sid
    )
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, message: &str, phone: &str) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.messages_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("From", self.from_number.as_str()),
                ("To", phone),
                ("Body", message),
            ])
            .send()
            .await
            .context("sms request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("sms provider returned {status}: {body}");
        }

        let resource: MessageResource = response.json().await.context("decode sms response")?;
        info!(sid = %resource.sid, %phone, "sms sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_messages_endpoint() {
        assert_eq!(
            messages_url("https://api.twilio.com/", "AC123"),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn client_builds_from_config() {
        let config = SmsConfig {
            account_sid: "AC123".into(),
            auth_token: "token".into(),
            from_number: "+15550000000".into(),
            api_base: "http://localhost:9".into(),
            timeout_secs: 1,
        };
        let notifier = TwilioNotifier::new(&config).expect("client");
        assert_eq!(
            notifier.messages_url,
            "http://localhost:9/2010-04-01/Accounts/AC123/Messages.json"
        );
    }
}
