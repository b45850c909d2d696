use crate::record::{LogRecord, MetaEncoding};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_INGEST_URL: &str = "https://logs.logdna.com/logs/ingest";
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_MAX_BUFFER_LEN: usize = 50;

/// Longest accepted value, in bytes, for app, env, hostname and level.
pub const MAX_FIELD_LEN: usize = 32;

/// Logger-wide settings.
///
/// `app`, `env`, `level` and `meta` are defaults for every record and can
/// be overridden per message with [`MessageOptions`]. Zero durations, a
/// zero buffer length and an empty URL are replaced by the defaults in
/// [`Options::with_defaults`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    pub app: String,
    pub env: String,
    pub level: String,
    pub hostname: String,
    pub ip_address: String,
    pub mac_address: String,
    pub tags: String,
    pub meta: String,
    /// Embed `meta` as raw JSON instead of as a string.
    pub index_meta: bool,
    pub ingest_url: String,
    pub flush_interval: Duration,
    pub send_timeout: Duration,
    pub max_buffer_len: usize,
}

/// Per-message overrides. Empty fields fall back to the logger's [`Options`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageOptions {
    pub app: String,
    pub env: String,
    pub level: String,
    pub meta: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A single rejected option.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidOption {
    pub option: &'static str,
    pub message: &'static str,
}

impl fmt::Display for InvalidOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Options.{}: {}", self.option, self.message)
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum OptionsError {
    #[error("{}", join(.0))]
    Invalid(Vec<InvalidOption>),
}

impl OptionsError {
    pub fn problems(&self) -> &[InvalidOption] {
        match self {
            OptionsError::Invalid(problems) => problems,
        }
    }
}

fn join(problems: &[InvalidOption]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn mac_address_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9a-fA-F]{2}:){5}[0-9a-fA-F]{2}$").expect("valid MAC regex"))
}

fn hostname_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let label = r"([a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])";
        Regex::new(&format!(r"^{label}(\.{label})*$")).expect("valid hostname regex")
    })
}

fn ip_address_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let octet = r"(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)";
        Regex::new(&format!(r"^{octet}(\.{octet}){{3}}$")).expect("valid IPv4 regex")
    })
}

fn check_length(option: &'static str, value: &str, problems: &mut Vec<InvalidOption>) {
    if value.len() > MAX_FIELD_LEN {
        problems.push(InvalidOption {
            option,
            message: "length must be at most 32",
        });
    }
}

fn check_format(option: &'static str, value: &str, re: &Regex, problems: &mut Vec<InvalidOption>) {
    if !value.is_empty() && !re.is_match(value) {
        problems.push(InvalidOption {
            option,
            message: "invalid format",
        });
    }
}

fn finish(problems: Vec<InvalidOption>) -> Result<(), OptionsError> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(OptionsError::Invalid(problems))
    }
}

impl Options {
    /// Check every field and report all problems at once.
    pub fn validate(&self) -> Result<(), OptionsError> {
        let mut problems = Vec::new();

        check_length("App", &self.app, &mut problems);
        check_length("Env", &self.env, &mut problems);
        check_length("Hostname", &self.hostname, &mut problems);
        check_length("Level", &self.level, &mut problems);

        check_format("MacAddress", &self.mac_address, mac_address_re(), &mut problems);
        check_format("Hostname", &self.hostname, hostname_re(), &mut problems);
        check_format("IPAddress", &self.ip_address, ip_address_re(), &mut problems);

        finish(problems)
    }

    /// Fill unset transport settings with their defaults.
    pub fn with_defaults(mut self) -> Self {
        if self.send_timeout.is_zero() {
            self.send_timeout = DEFAULT_SEND_TIMEOUT;
        }
        if self.flush_interval.is_zero() {
            self.flush_interval = DEFAULT_FLUSH_INTERVAL;
        }
        if self.max_buffer_len == 0 {
            self.max_buffer_len = DEFAULT_MAX_BUFFER_LEN;
        }
        if self.ingest_url.is_empty() {
            self.ingest_url = DEFAULT_INGEST_URL.to_string();
        }
        self
    }

    /// Build a record for `body`, letting non-empty message fields win.
    pub fn record(&self, body: impl Into<String>, message: &MessageOptions) -> LogRecord {
        fn pick(over: &str, base: &str) -> String {
            let value = if over.is_empty() { base } else { over };
            value.to_string()
        }

        let meta = pick(&message.meta, &self.meta);
        LogRecord {
            body: body.into(),
            app: pick(&message.app, &self.app),
            env: pick(&message.env, &self.env),
            level: pick(&message.level, &self.level),
            meta: (!meta.is_empty()).then_some(meta),
            meta_encoding: MetaEncoding::from_indexed(self.index_meta),
            timestamp: message.timestamp,
        }
    }
}

impl MessageOptions {
    pub fn validate(&self) -> Result<(), OptionsError> {
        let mut problems = Vec::new();

        check_length("App", &self.app, &mut problems);
        check_length("Env", &self.env, &mut problems);
        check_length("Level", &self.level, &mut problems);

        finish(problems)
    }
}
