//! Structured Logging with Sensitive Data Redaction
//!
//! Builds `key=value` log lines and hands them to the `log` facade, using the
//! emitting subsystem as the log target. Values are redacted by key name:
//! - Private keys and seeds are fully hidden
//! - Addresses, hashes and signature blobs are shortened

use std::fmt;

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_log_level(self) -> log::Level {
        match self {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Structured log entry
#[derive(Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: &'static str,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, module: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            module,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field to the log entry (auto-redacts sensitive data)
    pub fn field(mut self, key: &'static str, value: impl fmt::Debug) -> Self {
        let value_str = format!("{:?}", value);
        let redacted = redact_if_sensitive(key, &value_str);
        self.fields.push((key, redacted));
        self
    }

    /// Render `message | k=v k=v`
    pub fn render(&self) -> String {
        if self.fields.is_empty() {
            return self.message.clone();
        }

        let fields_str = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{} | {}", self.message, fields_str)
    }

    /// Emit through the `log` facade
    pub fn log(self) {
        let level = self.level.as_log_level();
        if !log::log_enabled!(target: self.module, level) {
            return;
        }
        log::log!(target: self.module, level, "{}", self.render());
    }
}

/// Redact a value if the key suggests it's sensitive
fn redact_if_sensitive(key: &str, value: &str) -> String {
    let key_lower = key.to_lowercase();
    let value = value.trim_matches('"');

    let fully_redacted_keys = ["private_key", "privatekey", "secret", "seed", "signing_key"];
    if fully_redacted_keys.iter().any(|k| key_lower.contains(k)) {
        return redact_value(value);
    }

    let address_keys = ["address", "signer", "owner", "account", "module", "factory", "cursor"];
    if address_keys.iter().any(|k| key_lower.contains(k)) {
        return redact_address(value);
    }

    let hex_blob_keys = ["hash", "signature", "salt", "blob"];
    if hex_blob_keys.iter().any(|k| key_lower.contains(k)) {
        return redact_hash(value);
    }

    value.to_string()
}

/// Fully redact a sensitive value
fn redact_value(value: &str) -> String {
    if value.is_empty() {
        return "[EMPTY]".to_string();
    }

    let len = value.len();
    if len <= 4 {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED:{}chars]", len)
    }
}

/// Shorten an address to its first 6 and last 4 hex digits
fn redact_address(address: &str) -> String {
    let trimmed = address.trim();

    if trimmed.is_empty() {
        return "[EMPTY]".to_string();
    }
    if !trimmed.starts_with("0x") || trimmed.len() <= 15 {
        return trimmed.to_string();
    }

    format!("{}...{}", &trimmed[..8], &trimmed[trimmed.len() - 4..])
}

/// Shorten a hash or blob to its first 10 and last 6 hex digits
fn redact_hash(hash: &str) -> String {
    let trimmed = hash.trim();

    if trimmed.is_empty() {
        return "[EMPTY]".to_string();
    }
    if trimmed.len() <= 20 {
        return trimmed.to_string();
    }

    let prefix_len = if trimmed.starts_with("0x") { 12 } else { 10 };
    format!("{}...{}", &trimmed[..prefix_len], &trimmed[trimmed.len() - 6..])
}

/// Convenience macro for debug logging
#[macro_export]
macro_rules! log_debug {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Debug,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Debug,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

/// Convenience macro for info logging
#[macro_export]
macro_rules! log_info {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Info,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Info,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

/// Convenience macro for warning logging
#[macro_export]
macro_rules! log_warn {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Warn,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Warn,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_value() {
        assert_eq!(redact_value(""), "[EMPTY]");
        assert_eq!(redact_value("abc"), "[REDACTED]");
        assert_eq!(redact_value("secret_key_12345"), "[REDACTED:16chars]");
    }

    #[test]
    fn test_redact_address() {
        let addr = "0xd8da6bf26964af9d7eed9e03e53415d37aa96045";
        let redacted = redact_address(addr);
        assert_eq!(redacted, "0xd8da6b...6045");
        assert_eq!(redact_address("0x01"), "0x01");
    }

    #[test]
    fn test_field_redaction_by_key() {
        let entry = LogEntry::new(LogLevel::Debug, "test", "signed")
            .field("private_key", "0x4c0883a69102937d6231471b5dbb6204")
            .field("signer", "0xd8da6bf26964af9d7eed9e03e53415d37aa96045")
            .field("threshold", 2);

        assert_eq!(entry.fields[0].1, "[REDACTED:34chars]");
        assert_eq!(entry.fields[1].1, "0xd8da6b...6045");
        assert_eq!(entry.fields[2].1, "2");
    }

    #[test]
    fn test_render() {
        let entry = LogEntry::new(LogLevel::Info, "test", "page fetched").field("count", 3usize);
        assert_eq!(entry.render(), "page fetched | count=3");
        assert_eq!(LogEntry::new(LogLevel::Warn, "test", "bare").render(), "bare");
    }
}
