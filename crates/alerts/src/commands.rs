//! Text command parsing.
//!
//! Commands are matched exactly as typed; no trimming or case folding.

use regex::Regex;
use spread_core::ScanParams;
use std::sync::LazyLock;
use thiserror::Error;

/// Label of the reply-keyboard button that shows the instructions.
pub const HELP_KEYWORD: &str = "Instructions";

static RANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s(\d+(?:\.\d+)?)\s(\d+(?:\.\d+)?)$").expect("valid range pattern")
});

static LEGACY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s(\d+(?:\.\d+)?)$").expect("valid legacy pattern")
});

/// Numeric input that matched a start pattern but cannot start a scan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidParams {
    #[error("The USDT amount must be greater than zero")]
    ZeroAmount,
    #[error("The minimum spread must not exceed the maximum spread")]
    InvertedRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Start(ScanParams),
    Invalid(InvalidParams),
    Stop,
    ListAll,
    Unknown,
}

impl Command {
    pub fn parse(text: &str) -> Command {
        match text {
            HELP_KEYWORD | "/start" | "/help" => return Command::Help,
            "stop" | "s" => return Command::Stop,
            "all" => return Command::ListAll,
            _ => {}
        }

        if let Some(caps) = RANGE_PATTERN.captures(text) {
            let parsed = (
                caps[1].parse::<u64>(),
                caps[2].parse::<f64>(),
                caps[3].parse::<f64>(),
            );
            return match parsed {
                (Ok(usdt), Ok(min), Ok(max)) => validate(ScanParams::range(usdt, min, max)),
                _ => Command::Unknown,
            };
        }

        if let Some(caps) = LEGACY_PATTERN.captures(text) {
            return match (caps[1].parse::<u64>(), caps[2].parse::<f64>()) {
                (Ok(usdt), Ok(spread)) => validate(ScanParams::legacy(usdt, spread)),
                _ => Command::Unknown,
            };
        }

        Command::Unknown
    }
}

fn validate(params: ScanParams) -> Command {
    if params.usdt == 0 {
        return Command::Invalid(InvalidParams::ZeroAmount);
    }
    if matches!(params.spread_max, Some(max) if params.spread_min > max) {
        return Command::Invalid(InvalidParams::InvertedRange);
    }
    Command::Start(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_range_command() {
        assert_eq!(
            Command::parse("100 0.3 0.8"),
            Command::Start(ScanParams::range(100, 0.3, 0.8))
        );
        assert_eq!(
            Command::parse("2500 1 3"),
            Command::Start(ScanParams::range(2500, 1.0, 3.0))
        );
    }

    #[test]
    fn test_legacy_command() {
        assert_eq!(
            Command::parse("100 0.3"),
            Command::Start(ScanParams::legacy(100, 0.3))
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(Command::parse(HELP_KEYWORD), Command::Help);
        assert_eq!(Command::parse("/start"), Command::Help);
        assert_eq!(Command::parse("stop"), Command::Stop);
        assert_eq!(Command::parse("s"), Command::Stop);
        assert_eq!(Command::parse("all"), Command::ListAll);
    }

    #[test]
    fn test_rejects_malformed_input() {
        for text in [
            "abc",
            "",
            "100",
            "100.5 0.3 0.8",
            "100 .3 0.8",
            "100  0.3 0.8",
            " 100 0.3 0.8",
            "100 0.3 0.8 1",
            "-100 0.3",
            "STOP",
            "All",
            "99999999999999999999999 1 2",
        ] {
            assert_eq!(Command::parse(text), Command::Unknown, "input {text:?}");
        }
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert_eq!(
            Command::parse("0 0.3 0.8"),
            Command::Invalid(InvalidParams::ZeroAmount)
        );
        assert_eq!(
            Command::parse("100 0.8 0.3"),
            Command::Invalid(InvalidParams::InvertedRange)
        );
        assert_eq!(
            Command::parse("100 0.5 0.5"),
            Command::Start(ScanParams::range(100, 0.5, 0.5))
        );
    }
}
