use reqwest::Client;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{LinePushRequest, LineTextMessage, MessagingError};

/// LINE Messaging API client for patient notifications and rich menu control.
/// Based on: https://developers.line.biz/en/reference/messaging-api/
pub struct LineClient {
    client: Client,
    access_token: String,
    base_url: String,
    admin_group_id: String,
}

impl LineClient {
    pub fn new(config: &AppConfig) -> Result<Self, MessagingError> {
        if !config.is_messaging_configured() {
            return Err(MessagingError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            access_token: config.line_channel_access_token.clone(),
            base_url: config.line_api_base_url.clone(),
            admin_group_id: config.line_admin_group_id.clone(),
        })
    }

    /// Push a text message to a single user or group.
    /// POST /message/push
    pub async fn push_text(&self, to: &str, text: &str) -> Result<(), MessagingError> {
        debug!("Pushing LINE message to {}", to);

        let url = format!("{}/message/push", self.base_url);
        let body = LinePushRequest {
            to: to.to_string(),
            messages: vec![LineTextMessage::new(text)],
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let response_text = response.text().await.unwrap_or_default();
            error!("LINE push failed: {} - {}", status, response_text);
            return Err(MessagingError::LineApiError {
                message: format!("HTTP {}: {}", status, response_text),
            });
        }

        Ok(())
    }

    /// Notify the clinic's administrative group chat.
    pub async fn notify_admin_group(&self, text: &str) -> Result<(), MessagingError> {
        if self.admin_group_id.is_empty() {
            return Err(MessagingError::NotConfigured);
        }
        let group_id = self.admin_group_id.clone();
        self.push_text(&group_id, text).await
    }

    /// Link a rich menu to a user.
    /// POST /user/{userId}/richmenu/{richMenuId}
    pub async fn link_rich_menu(
        &self,
        user_id: &str,
        rich_menu_id: &str,
    ) -> Result<(), MessagingError> {
        info!("Linking rich menu {} to user {}", rich_menu_id, user_id);

        let url = format!("{}/user/{}/richmenu/{}", self.base_url, user_id, rich_menu_id);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let response_text = response.text().await.unwrap_or_default();
            error!("Rich menu link failed: {} - {}", status, response_text);
            return Err(MessagingError::LineApiError {
                message: format!("HTTP {}: {}", status, response_text),
            });
        }

        Ok(())
    }

    /// Unlink the user's rich menu, falling back to the channel default.
    /// DELETE /user/{userId}/richmenu
    pub async fn unlink_rich_menu(&self, user_id: &str) -> Result<(), MessagingError> {
        info!("Unlinking rich menu from user {}", user_id);

        let url = format!("{}/user/{}/richmenu", self.base_url, user_id);

        let response = self
            .client
            .delete(&url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let response_text = response.text().await.unwrap_or_default();
            error!("Rich menu unlink failed: {} - {}", status, response_text);
            return Err(MessagingError::LineApiError {
                message: format!("HTTP {}: {}", status, response_text),
            });
        }

        Ok(())
    }
}
