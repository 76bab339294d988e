//! Selects which collaborators the server is wired with.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// `Production` resolves through `yt-dlp` and merges with `ffmpeg`.
/// `Development` serves the demo fixture through the canned remuxer, offline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum RuntimeMode {
    #[default]
    #[value(alias = "prod")]
    Production,
    #[value(alias = "dev")]
    Development,
}

impl RuntimeMode {
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Production => "PRODUCTION",
            Self::Development => "DEVELOPMENT",
        })
    }
}

/// Case-insensitive, accepting the same names and aliases as the CLI flag.
impl FromStr for RuntimeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s.trim(), true)
            .map_err(|_| format!("unknown runtime mode '{s}', expected production or development"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_mode_parsing() {
        assert_eq!("prod".parse::<RuntimeMode>(), Ok(RuntimeMode::Production));
        assert_eq!("Development".parse::<RuntimeMode>(), Ok(RuntimeMode::Development));
        assert_eq!(" DEV ".parse::<RuntimeMode>(), Ok(RuntimeMode::Development));
        assert!("staging".parse::<RuntimeMode>().is_err());
        assert!(RuntimeMode::default().is_production());
    }

    #[test]
    fn test_cli_values_include_aliases() {
        let names: Vec<String> = RuntimeMode::value_variants()
            .iter()
            .filter_map(|mode| mode.to_possible_value())
            .map(|value| value.get_name().to_string())
            .collect();
        assert_eq!(names, vec!["production", "development"]);

        let dev = RuntimeMode::Development.to_possible_value();
        assert!(dev.is_some_and(|value| value.matches("dev", false)));
    }
}
