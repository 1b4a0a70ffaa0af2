//! Per-invocation agent configuration.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How the agent should be configured for a single run.
///
/// Unset optional fields inherit the agent default. Older clients send
/// `""` for "use the default", so empty strings are read as unset.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfiguration {
    /// Execute generated code without asking for confirmation.
    #[serde(default)]
    pub auto_run: bool,

    /// Give the agent operating-system level tool access.
    #[serde(default)]
    pub os_mode: bool,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub model: Option<String>,

    #[serde(default)]
    pub context_window: Option<u32>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub api_base: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub api_key: Option<String>,

    /// Custom instructions appended to the agent's system prompt.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub system_prompt: Option<String>,
}

impl RunConfiguration {
    /// Fill every unset field from `defaults`.
    pub fn or(&self, defaults: &RunConfiguration) -> RunConfiguration {
        RunConfiguration {
            auto_run: self.auto_run,
            os_mode: self.os_mode,
            model: self.model.clone().or_else(|| defaults.model.clone()),
            context_window: self.context_window.or(defaults.context_window),
            api_base: self.api_base.clone().or_else(|| defaults.api_base.clone()),
            api_key: self.api_key.clone().or_else(|| defaults.api_key.clone()),
            system_prompt: self
                .system_prompt
                .clone()
                .or_else(|| defaults.system_prompt.clone()),
        }
    }

    /// Copy without the api key, for anything that is stored or served.
    pub fn redacted(&self) -> RunConfiguration {
        RunConfiguration {
            api_key: None,
            ..self.clone()
        }
    }
}

/// `serialize_with` helper that never writes the api key.
pub fn serialize_redacted<S>(config: &RunConfiguration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    config.redacted().serialize(serializer)
}

impl fmt::Debug for RunConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfiguration")
            .field("auto_run", &self.auto_run)
            .field("os_mode", &self.os_mode)
            .field("model", &self.model)
            .field("context_window", &self.context_window)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
