use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub line_channel_access_token: String,
    pub line_api_base_url: String,
    pub line_admin_group_id: String,
    pub payment_webhook_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            line_channel_access_token: env::var("LINE_CHANNEL_ACCESS_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("LINE_CHANNEL_ACCESS_TOKEN not set, using empty value");
                    String::new()
                }),
            line_api_base_url: env::var("LINE_API_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("LINE_API_BASE_URL not set, using default");
                    "https://api.line.me/v2/bot".to_string()
                }),
            line_admin_group_id: env::var("LINE_ADMIN_GROUP_ID")
                .unwrap_or_else(|_| {
                    warn!("LINE_ADMIN_GROUP_ID not set, using empty value");
                    String::new()
                }),
            payment_webhook_secret: env::var("PAYMENT_WEBHOOK_SECRET")
                .unwrap_or_else(|_| {
                    warn!("PAYMENT_WEBHOOK_SECRET not set, using empty value");
                    String::new()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_messaging_configured(&self) -> bool {
        !self.line_channel_access_token.is_empty()
            && !self.line_api_base_url.is_empty()
    }

    pub fn is_payment_webhook_configured(&self) -> bool {
        !self.payment_webhook_secret.is_empty()
    }
}
