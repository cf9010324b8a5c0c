//! Tests for logging configuration and format parsing
//!
//! Tests the pure functions in the logging module that turn environment
//! variables and `-v` flags into a level and output format.

use taskcrew::observability::logging::{parse_level, raise_level, LogFormat};
use tracing::Level;

#[test]
fn test_log_format_parse_json() {
    assert!(matches!(LogFormat::parse("json"), LogFormat::Json));
    assert!(matches!(LogFormat::parse("JSON"), LogFormat::Json));
    assert!(matches!(LogFormat::parse("Json"), LogFormat::Json));
}

#[test]
fn test_log_format_parse_pretty() {
    assert!(matches!(LogFormat::parse("pretty"), LogFormat::Pretty));
    assert!(matches!(LogFormat::parse("PRETTY"), LogFormat::Pretty));
}

#[test]
fn test_log_format_parse_invalid_defaults_to_compact() {
    // Console tool: a readable single line unless asked otherwise
    assert!(matches!(LogFormat::parse("invalid"), LogFormat::Compact));
    assert!(matches!(LogFormat::parse(""), LogFormat::Compact));
    assert!(matches!(LogFormat::parse("xml"), LogFormat::Compact));
    assert!(matches!(LogFormat::parse("123"), LogFormat::Compact));
}

#[test]
fn test_log_format_parse_whitespace() {
    assert!(matches!(LogFormat::parse("  json  "), LogFormat::Json));
    assert!(matches!(LogFormat::parse("json\n"), LogFormat::Json));
    assert!(matches!(LogFormat::parse("\tpretty"), LogFormat::Pretty));
}

#[test]
fn test_log_level_parsing() {
    let test_cases = vec![
        ("ERROR", Level::ERROR),
        ("WARN", Level::WARN),
        ("INFO", Level::INFO),
        ("debug", Level::DEBUG),
        ("Trace", Level::TRACE),
        (" warn ", Level::WARN),
        ("verbose", Level::INFO),
        ("", Level::INFO),
    ];

    for (input, expected) in test_cases {
        assert_eq!(parse_level(input), expected, "Failed for input: {input:?}");
    }
}

#[test]
fn test_verbosity_raises_level() {
    assert_eq!(raise_level(Level::ERROR, 0), Level::ERROR);
    assert_eq!(raise_level(Level::ERROR, 1), Level::WARN);
    assert_eq!(raise_level(Level::INFO, 1), Level::DEBUG);
    assert_eq!(raise_level(Level::DEBUG, 1), Level::TRACE);
}

#[test]
fn test_verbosity_saturates_at_trace() {
    assert_eq!(raise_level(Level::TRACE, 1), Level::TRACE);
    assert_eq!(raise_level(Level::INFO, u8::MAX), Level::TRACE);
}
