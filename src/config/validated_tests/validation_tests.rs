//! Tests for value validation.

use std::path::{Path, PathBuf};

use super::*;
use crate::config::expand_tilde;

#[test]
fn invalid_endpoint_url() {
    let mut cli = base_cli(&[]);
    cli.endpoint = Some("not a url".to_string());

    let result = ValidatedConfig::from_raw(&cli, None);

    assert!(matches!(
        result,
        Err(ConfigError::InvalidUrl {
            field: "endpoint",
            ..
        })
    ));
}

#[test]
fn plain_http_endpoint_is_not_a_config_error() {
    let mut cli = base_cli(&[]);
    cli.endpoint = Some("http://status.example.com".to_string());

    // The transport policy is enforced by the poll loop, not here.
    assert!(ValidatedConfig::from_raw(&cli, None).is_ok());
}

#[test]
fn invalid_api_base() {
    let result = ValidatedConfig::from_raw(&base_cli(&["--api-base", "::"]), None);

    assert!(matches!(
        result,
        Err(ConfigError::InvalidUrl {
            field: "api_base",
            ..
        })
    ));
}

#[test]
fn zero_poll_interval_rejected() {
    let result = ValidatedConfig::from_raw(&base_cli(&["--poll-interval", "0"]), None);

    assert!(matches!(
        result,
        Err(ConfigError::InvalidDuration {
            field: "poll_interval",
            ..
        })
    ));
}

#[test]
fn zero_request_timeout_rejected() {
    let toml = toml("[upstream]\nrequest_timeout = 0");

    let result = ValidatedConfig::from_raw(&base_cli(&[]), Some(&toml));

    assert!(matches!(
        result,
        Err(ConfigError::InvalidDuration {
            field: "request_timeout",
            ..
        })
    ));
}

#[test]
fn negative_threshold_rejected() {
    let toml = toml("[alerts]\nhealth_threshold = -1.0");

    let result = ValidatedConfig::from_raw(&base_cli(&[]), Some(&toml));

    assert!(matches!(result, Err(ConfigError::InvalidThreshold(_))));
}

#[test]
fn nan_threshold_rejected() {
    let toml = toml("[alerts]\nhealth_threshold = nan");

    let result = ValidatedConfig::from_raw(&base_cli(&[]), Some(&toml));

    assert!(matches!(result, Err(ConfigError::InvalidThreshold(_))));
}

#[test]
fn zero_threshold_allowed() {
    let config = ValidatedConfig::from_raw(&base_cli(&["--health-threshold", "0"]), None).unwrap();

    assert!(config.rules.health_drop_threshold.abs() < f64::EPSILON);
}

#[test]
fn blank_station_list_tracks_everything() {
    let config = ValidatedConfig::from_raw(&base_cli(&["--stations", " , "]), None).unwrap();

    assert!(config.stations.is_none());
}

#[test]
fn tilde_expands_to_home() {
    let Some(home) = dirs::home_dir() else {
        return;
    };

    assert_eq!(expand_tilde(Path::new("~/subs.json")), home.join("subs.json"));
}

#[test]
fn tilde_only_expands_leading_component() {
    assert_eq!(
        expand_tilde(Path::new("data/~/subs.json")),
        PathBuf::from("data/~/subs.json")
    );
    assert_eq!(expand_tilde(Path::new("~other/x")), PathBuf::from("~other/x"));
}

#[test]
fn ca_file_is_tilde_expanded() {
    let Some(home) = dirs::home_dir() else {
        return;
    };

    let config = ValidatedConfig::from_raw(&base_cli(&["--ca-file", "~/ca.pem"]), None).unwrap();

    assert_eq!(config.tls.ca_file, Some(home.join("ca.pem")));
}
