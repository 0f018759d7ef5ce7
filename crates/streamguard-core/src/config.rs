use std::collections::HashMap;
use std::path::Path;

use crate::error::{GuardError, GuardResult};

pub const KEY_APPLICATION_ID: &str = "application.id";
pub const KEY_INPUT_TOPIC: &str = "input.topic.name";
pub const KEY_OUTPUT_TOPIC: &str = "output.topic.name";
pub const KEY_MAX_FAILURES: &str = "max.failures";
pub const KEY_MAX_TIME_MILLIS: &str = "max.time.millis";

const ENV_PREFIX: &str = "STREAMGUARD";

/// Threshold and window for [`crate::EscalationPolicy`]. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationConfig {
    max_failures: u32,
    max_time_interval_ms: i64,
}

impl EscalationConfig {
    /// Both values must be strictly positive.
    pub fn new(max_failures: i64, max_time_interval_ms: i64) -> GuardResult<Self> {
        if max_failures <= 0 {
            return Err(GuardError::InvalidConfig(format!(
                "{KEY_MAX_FAILURES} must be > 0, got {max_failures}"
            )));
        }
        let max_failures = u32::try_from(max_failures).map_err(|_| {
            GuardError::InvalidConfig(format!("{KEY_MAX_FAILURES} out of range: {max_failures}"))
        })?;
        if max_time_interval_ms <= 0 {
            return Err(GuardError::InvalidConfig(format!(
                "{KEY_MAX_TIME_MILLIS} must be > 0, got {max_time_interval_ms}"
            )));
        }
        Ok(Self { max_failures, max_time_interval_ms })
    }

    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    pub fn max_time_interval_ms(&self) -> i64 {
        self.max_time_interval_ms
    }
}

/// Application settings as read from a config file plus `STREAMGUARD_*` overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub application_id: String,
    pub input_topic: String,
    pub output_topic: String,
    pub max_failures: i64,
    pub max_time_millis: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            application_id: "streams-uncaught-exception-handling".into(),
            input_topic: "input-topic".into(),
            output_topic: "output-topic".into(),
            max_failures: 3,
            max_time_millis: 10_000, // 10s
        }
    }
}

impl Settings {
    /// Load from `path` (format inferred from the extension) with process env overrides.
    pub fn load(path: impl AsRef<Path>) -> GuardResult<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`Settings::load`], but reads overrides from `env` instead of the
    /// process environment when given.
    pub fn load_with_env(
        path: impl AsRef<Path>,
        env: Option<HashMap<String, String>>,
    ) -> GuardResult<Self> {
        let path = path.as_ref();
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("properties")) {
            return Err(GuardError::InvalidConfig(format!(
                "{}: .properties files are not supported; use TOML with dotted keys (max.failures = 3)",
                path.display()
            )));
        }
        let defaults = Settings::default();
        let cfg = config::Config::builder()
            .set_default(KEY_APPLICATION_ID, defaults.application_id)?
            .set_default(KEY_INPUT_TOPIC, defaults.input_topic)?
            .set_default(KEY_OUTPUT_TOPIC, defaults.output_topic)?
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("_")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let settings = Self {
            application_id: cfg.get_string(KEY_APPLICATION_ID)?,
            input_topic: cfg.get_string(KEY_INPUT_TOPIC)?,
            output_topic: cfg.get_string(KEY_OUTPUT_TOPIC)?,
            max_failures: required_int(&cfg, KEY_MAX_FAILURES)?,
            max_time_millis: required_int(&cfg, KEY_MAX_TIME_MILLIS)?,
        };
        // fail fast on a bad threshold or window
        settings.escalation()?;
        Ok(settings)
    }

    pub fn escalation(&self) -> GuardResult<EscalationConfig> {
        EscalationConfig::new(self.max_failures, self.max_time_millis)
    }

    /// Render as TOML that [`Settings::load`] reads back unchanged.
    pub fn to_toml_string(&self) -> GuardResult<String> {
        let mut root = toml::Table::new();
        insert_path(&mut root, KEY_APPLICATION_ID, self.application_id.clone().into());
        insert_path(&mut root, KEY_INPUT_TOPIC, self.input_topic.clone().into());
        insert_path(&mut root, KEY_OUTPUT_TOPIC, self.output_topic.clone().into());
        insert_path(&mut root, KEY_MAX_FAILURES, self.max_failures.into());
        insert_path(&mut root, KEY_MAX_TIME_MILLIS, self.max_time_millis.into());
        Ok(toml::to_string_pretty(&root)?)
    }
}

fn required_int(cfg: &config::Config, key: &str) -> GuardResult<i64> {
    match cfg.get_int(key) {
        Ok(v) => Ok(v),
        Err(config::ConfigError::NotFound(_)) => {
            Err(GuardError::InvalidConfig(format!("missing required key {key}")))
        }
        Err(e) => Err(e.into()),
    }
}

fn insert_path(root: &mut toml::Table, dotted: &str, value: toml::Value) {
    let mut parts: Vec<&str> = dotted.split('.').collect();
    let Some(leaf) = parts.pop() else { return };
    let mut table = root;
    for part in parts {
        let entry = table
            .entry(part.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if !entry.is_table() {
            *entry = toml::Value::Table(toml::Table::new());
        }
        let Some(next) = entry.as_table_mut() else { return };
        table = next;
    }
    table.insert(leaf.to_string(), value);
}
