use std::io::Write;
use std::time::Duration;

use wicket::config::{ConfigError, ServerConfig};
use wicket::server::ServerOptions;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_config_file() {
    let file = write_config("address: \"127.0.0.1:9000\"\ntimeout_ms: 1500\nmax_body_bytes: 64\n");
    let config = ServerConfig::from_file(file.path()).unwrap();
    assert_eq!(config.address, "127.0.0.1:9000");
    assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));

    let options = ServerOptions::from_config(&config);
    assert_eq!(options.timeout, Some(Duration::from_millis(1500)));
    assert_eq!(options.max_body_bytes, 64);
}

#[test]
fn test_shipped_sample_config_parses() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/server.yaml");
    let config = ServerConfig::from_file(path).unwrap();
    assert_eq!(config.timeout_ms, 5000);
}

#[test]
fn test_missing_file_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ServerConfig::from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn test_bad_yaml_is_parse_error() {
    let file = write_config("timeout_ms: [not, a, number]\n");
    let err = ServerConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_empty_file_is_default() {
    let file = write_config("");
    assert_eq!(
        ServerConfig::from_file(file.path()).unwrap(),
        ServerConfig::default()
    );
    assert!(ServerOptions::from_config(&ServerConfig::default()).timeout.is_none());
}

#[test]
fn test_release_profile_keeps_unwinding() {
    let manifest =
        std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml")).unwrap();
    let release = manifest
        .split("[profile.release]")
        .nth(1)
        .and_then(|rest| rest.split("\n[").next())
        .unwrap();
    let aborts = release
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .any(|line| line.replace(' ', "") == "panic=\"abort\"");
    assert!(!aborts, "handler panics must unwind to be answered with 500");
}
