use crate::error::ConfigError;
use crate::net::DeviceTarget;
use crate::protocol::Registration;
use crate::session::{SessionSettings, OPEN_URL, PLUGIN_ACTION};
use clap::Parser;
use serde_json::Value;
use std::ffi::OsString;
use tracing::warn;
use url::Url;

pub const DEFAULT_BOARD_URL: &str = "wss://display.stamsite.nu/server";

/// Launch parameters. The device host passes them as `-port 28196
/// -pluginUUID <uuid> -registerEvent registerPlugin -info <json>`.
#[derive(Parser, Debug)]
#[command(name = "pixeldisplay", version, about = "Mirrors the shared pixel board onto a Stream Deck key")]
pub struct Args {
    #[arg(long)]
    pub port: u16,

    #[arg(long = "pluginUUID", allow_hyphen_values = true)]
    pub plugin_uuid: String,

    #[arg(long = "registerEvent", allow_hyphen_values = true)]
    pub register_event: String,

    /// Host/application info as JSON. Logged, otherwise unused.
    #[arg(long, default_value = "{}", allow_hyphen_values = true)]
    pub info: String,

    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "PIXELDISPLAY_BOARD_URL", default_value = DEFAULT_BOARD_URL)]
    pub board_url: String,

    /// Page opened when the key is pressed.
    #[arg(long, env = "PIXELDISPLAY_OPEN_URL", default_value = OPEN_URL)]
    pub open_url: String,
}

impl Args {
    /// Parses after rewriting the host's single-dash flags (`-port`) to the
    /// `--port` form clap expects.
    pub fn parse_host_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }
}

/// Flags the device host passes in single-dash form.
const HOST_FLAGS: &[&str] = &["-port", "-pluginUUID", "-registerEvent", "-info"];

/// Rewrites known single-dash host flags; values are never touched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut value_next = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if std::mem::take(&mut value_next) {
                return arg;
            }
            match arg.to_str() {
                Some(s) if HOST_FLAGS.contains(&s) => {
                    value_next = true;
                    OsString::from(format!("-{s}"))
                }
                _ => arg,
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct PluginConfig {
    pub device: DeviceTarget,
    pub registration: Registration,
    pub info: Value,
    pub board_url: Url,
    pub session: SessionSettings,
}

impl TryFrom<Args> for PluginConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let board_url = parse_board_url(&args.board_url)?;
        Ok(Self {
            device: DeviceTarget {
                host: args.host,
                port: args.port,
            },
            registration: Registration {
                event: args.register_event,
                uuid: args.plugin_uuid,
            },
            info: parse_info(&args.info),
            board_url,
            session: SessionSettings {
                action: PLUGIN_ACTION.to_string(),
                open_url: args.open_url,
            },
        })
    }
}

pub fn parse_board_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::BoardUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ConfigError::BoardUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}

/// The info blob is passed through untouched when it is not valid JSON.
fn parse_info(raw: &str) -> Value {
    match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "-info is not valid json; keeping it as a string");
            Value::String(raw.to_string())
        }
    }
}

/// `(application version, plugin version)` from the host's info blob.
pub fn info_versions(info: &Value) -> (Option<&str>, Option<&str>) {
    let version = |section: &str| info.get(section)?.get("version")?.as_str();
    (version("application"), version("plugin"))
}
