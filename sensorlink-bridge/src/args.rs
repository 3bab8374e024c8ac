//! CLI argument parsing.

use clap::Parser;
use std::path::PathBuf;

/// Forwards hardware sensor telemetry to a serial display.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "sensorlink-bridge")]
#[command(about = "Polls a sensor HTTP endpoint and streams a summary to a serial display")]
#[command(version)]
pub struct BridgeArgs {
    /// Path to configuration file (JSON5 format). Built-in defaults when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override the device description substring to look for.
    #[arg(long)]
    pub target: Option<String>,

    /// List serial ports with their descriptions and exit.
    #[arg(long)]
    pub list_ports: bool,

    /// Fetch one snapshot, print it to stdout and exit.
    #[arg(long, conflicts_with = "list_ports")]
    pub once: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let args = BridgeArgs::try_parse_from(["sensorlink-bridge"]).unwrap();
        assert_eq!(args.config, None);
        assert!(!args.list_ports);
        assert!(!args.once);
    }

    #[test]
    fn test_parse_overrides() {
        let args = BridgeArgs::try_parse_from([
            "sensorlink-bridge",
            "-c",
            "display.json5",
            "--log-level",
            "debug",
            "--target",
            "Arduino Micro",
            "--once",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("display.json5")));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(args.target.as_deref(), Some("Arduino Micro"));
        assert!(args.once);
    }

    #[test]
    fn test_once_conflicts_with_list_ports() {
        assert!(
            BridgeArgs::try_parse_from(["sensorlink-bridge", "--once", "--list-ports"]).is_err()
        );
    }
}
