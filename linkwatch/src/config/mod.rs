//! Startup configuration.
//!
//! Everything is read once from the process environment (after `.env` has
//! been loaded by the binary). Missing or malformed values are a fatal
//! [`Error::Configuration`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::connectivity::{PingCheck, ReachabilityCheck, TcpCheck};
use crate::notification::channels::{EmailConfig, TelegramConfig, WebhookConfig};
use crate::{Error, Result};

/// How reachability is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    /// System `ping`, one echo request.
    #[default]
    Ping,
    /// TCP connect to `host:port`.
    Tcp,
}

impl FromStr for ProbeMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ping" | "icmp" => Ok(Self::Ping),
            "tcp" => Ok(Self::Tcp),
            other => Err(Error::config(format!(
                "PROBE_METHOD must be `ping` or `tcp`, got `{other}`"
            ))),
        }
    }
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ping => f.write_str("ping"),
            Self::Tcp => f.write_str("tcp"),
        }
    }
}

/// Reachability probe settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub method: ProbeMethod,
    pub host: String,
    /// Only used by [`ProbeMethod::Tcp`].
    pub port: u16,
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            method: ProbeMethod::Ping,
            host: "8.8.8.8".to_string(),
            port: 53,
            interval: Duration::from_secs(600),
            timeout: Duration::from_secs(5),
        }
    }
}

impl ProbeConfig {
    pub fn build_check(&self) -> Arc<dyn ReachabilityCheck> {
        match self.method {
            ProbeMethod::Ping => Arc::new(PingCheck::new(&self.host, self.timeout)),
            ProbeMethod::Tcp => Arc::new(TcpCheck::new(&self.host, self.port, self.timeout)),
        }
    }
}

/// Heartbeat settings. Absent when no monitoring endpoint is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatConfig {
    pub url: String,
    pub bot_id: String,
    pub interval: Duration,
}

/// Fully validated application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Tag used in every notification text.
    pub instance_name: String,
    pub email: EmailConfig,
    pub telegram: TelegramConfig,
    pub webhook: WebhookConfig,
    pub heartbeat: Option<HeartbeatConfig>,
    pub probe: ProbeConfig,
    /// Bound on every channel send. `None` means unbounded.
    pub send_timeout: Option<Duration>,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        let mut missing = Vec::new();
        let mut required = |names: &[&'static str]| {
            let value = names.iter().find_map(|name| env.get(name));
            if value.is_none() {
                missing.push(names.join(" or "));
            }
            value.unwrap_or_default()
        };

        let email_user = required(&["EMAIL_USER"]);
        let email_pass = required(&["EMAIL_PASS"]);
        let bot_token = required(&["TELEGRAM_BOT_TOKEN"]);
        let chat_id = required(&["TELEGRAM_CHAT_ID"]);
        let webhook_url = required(&["WEBHOOK_URL", "DISCORD_WEBHOOK_URL"]);

        if !missing.is_empty() {
            return Err(Error::config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let instance_name = env
            .get("INSTANCE_NAME")
            .unwrap_or_else(|| "linkwatch".to_string());

        let email = EmailConfig {
            smtp_host: env
                .get("SMTP_HOST")
                .unwrap_or_else(|| EmailConfig::default().smtp_host),
            smtp_port: env.parse("SMTP_PORT", 587)?,
            use_starttls: env.flag("SMTP_STARTTLS", true)?,
            to_address: env.get("EMAIL_TO").unwrap_or_else(|| email_user.clone()),
            username: email_user,
            password: email_pass,
        };

        let telegram = TelegramConfig {
            bot_token,
            chat_id,
            api_base: env.url_or("TELEGRAM_API_BASE", "https://api.telegram.org")?,
        };

        let webhook = WebhookConfig {
            url: validate_url("WEBHOOK_URL", &webhook_url)?,
        };

        let heartbeat = match env.get("MONITOR_URL") {
            Some(url) => Some(HeartbeatConfig {
                url: validate_url("MONITOR_URL", &url)?,
                bot_id: env.get("BOT_ID").unwrap_or_else(|| instance_name.clone()),
                interval: env.period("HEARTBEAT_INTERVAL_SECS", 60)?,
            }),
            None => None,
        };

        let probe = ProbeConfig {
            method: env
                .get("PROBE_METHOD")
                .map(|m| m.parse::<ProbeMethod>())
                .transpose()?
                .unwrap_or_default(),
            host: env
                .get("PROBE_HOST")
                .unwrap_or_else(|| ProbeConfig::default().host),
            port: env.parse("PROBE_PORT", 53)?,
            interval: env.period("PROBE_INTERVAL_SECS", 600)?,
            timeout: env.period("PROBE_TIMEOUT_SECS", 5)?,
        };

        let send_timeout = match env.parse::<u64>("SEND_TIMEOUT_SECS", 30)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            instance_name,
            email,
            telegram,
            webhook,
            heartbeat,
            probe,
            send_timeout,
        })
    }
}

fn validate_url(name: &str, value: &str) -> Result<String> {
    let url = Url::parse(value).map_err(|e| Error::config(format!("{name} is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(value.to_string()),
        scheme => Err(Error::config(format!(
            "{name} must be an http(s) URL, got scheme `{scheme}`"
        ))),
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Trimmed value; empty counts as unset.
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(name) {
            Some(raw) => raw
                .parse()
                .map_err(|e| Error::config(format!("{name}=`{raw}` is invalid: {e}"))),
            None => Ok(default),
        }
    }

    fn flag(&self, name: &str, default: bool) -> Result<bool> {
        match self.get(name).map(|v| v.to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
            Some(v) => Err(Error::config(format!("{name}=`{v}` is not a boolean"))),
        }
    }

    /// Non-zero number of seconds.
    fn period(&self, name: &str, default_secs: u64) -> Result<Duration> {
        match self.parse::<u64>(name, default_secs)? {
            0 => Err(Error::config(format!("{name} must be greater than zero"))),
            secs => Ok(Duration::from_secs(secs)),
        }
    }

    fn url_or(&self, name: &str, default: &str) -> Result<String> {
        match self.get(name) {
            Some(value) => validate_url(name, &value),
            None => Ok(default.to_string()),
        }
    }
}
