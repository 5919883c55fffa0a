//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides. Note that Config::from_env() also loads
//! from .env file via dotenvy, so these tests focus on override behavior.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use instinct_search::config::{Config, LogFormat};
use serial_test::serial;
use std::env;

fn set_required_vars() {
    env::set_var("GENERATOR_API_KEY", "test-key");
}

#[test]
#[serial]
fn test_config_requires_api_key() {
    env::remove_var("GENERATOR_API_KEY");

    let result = Config::from_env();
    assert!(result.is_err(), "Config must fail without GENERATOR_API_KEY");

    set_required_vars();
}

#[test]
#[serial]
fn test_config_from_env_defaults() {
    set_required_vars();

    let config = Config::from_env().unwrap();
    assert_eq!(config.generator.base_url, "http://localhost:8080");
    assert_eq!(config.generator.model, "openai:gpt-4o-mini");
    assert_eq!(config.request.timeout_ms, 30000);
    assert!((config.search.exploration_weight - 1.4).abs() < f64::EPSILON);
    assert!((config.search.instinct_ratio - 0.6).abs() < f64::EPSILON);
    assert_eq!(config.search.iterations, 3);
    assert_eq!(config.search.simulations_per_iteration, 5);
    assert!(config.search.seed.is_none());
}

#[test]
#[serial]
fn test_config_from_env_custom_base_url() {
    set_required_vars();
    env::set_var("GENERATOR_BASE_URL", "https://custom.api.com");

    let config = Config::from_env().unwrap();
    assert_eq!(config.generator.base_url, "https://custom.api.com");

    env::remove_var("GENERATOR_BASE_URL");
}

#[test]
#[serial]
fn test_config_from_env_custom_request() {
    set_required_vars();
    env::set_var("REQUEST_TIMEOUT_MS", "60000");
    env::set_var("MAX_RETRIES", "5");
    env::set_var("RETRY_DELAY_MS", "2000");

    let config = Config::from_env().unwrap();
    assert_eq!(config.request.timeout_ms, 60000);
    assert_eq!(config.request.max_retries, 5);
    assert_eq!(config.request.retry_delay_ms, 2000);

    env::remove_var("REQUEST_TIMEOUT_MS");
    env::remove_var("MAX_RETRIES");
    env::remove_var("RETRY_DELAY_MS");
}

#[test]
#[serial]
fn test_config_from_env_custom_search_tunables() {
    set_required_vars();
    env::set_var("EXPLORATION_WEIGHT", "2.0");
    env::set_var("INSTINCT_RATIO", "0.25");
    env::set_var("CONFIDENCE_BIAS", "0.4");
    env::set_var("PERSEVERANCE_FACTOR", "0.9");
    env::set_var("SEARCH_ITERATIONS", "7");
    env::set_var("SIMULATIONS_PER_ITERATION", "11");
    env::set_var("CHILDREN_PER_EXPANSION", "4");
    env::set_var("SEARCH_SEED", "12345");

    let config = Config::from_env().unwrap();
    assert!((config.search.exploration_weight - 2.0).abs() < f64::EPSILON);
    assert!((config.search.instinct_ratio - 0.25).abs() < f64::EPSILON);
    assert!((config.search.confidence_bias - 0.4).abs() < f64::EPSILON);
    assert!((config.search.perseverance_factor - 0.9).abs() < f64::EPSILON);
    assert_eq!(config.search.iterations, 7);
    assert_eq!(config.search.simulations_per_iteration, 11);
    assert_eq!(config.search.children_per_expansion, 4);
    assert_eq!(config.search.seed, Some(12345));

    env::remove_var("EXPLORATION_WEIGHT");
    env::remove_var("INSTINCT_RATIO");
    env::remove_var("CONFIDENCE_BIAS");
    env::remove_var("PERSEVERANCE_FACTOR");
    env::remove_var("SEARCH_ITERATIONS");
    env::remove_var("SIMULATIONS_PER_ITERATION");
    env::remove_var("CHILDREN_PER_EXPANSION");
    env::remove_var("SEARCH_SEED");
}

#[test]
#[serial]
fn test_config_rejects_out_of_range_instinct_ratio() {
    set_required_vars();
    env::set_var("INSTINCT_RATIO", "1.5");

    let result = Config::from_env();
    assert!(result.is_err());

    env::remove_var("INSTINCT_RATIO");
}

#[test]
#[serial]
fn test_config_invalid_number_uses_default() {
    set_required_vars();
    env::set_var("GENERATOR_MAX_TOKENS", "not-a-number");

    let config = Config::from_env().unwrap();
    // Should fall back to default
    assert_eq!(config.generator.max_tokens, 1024);

    env::remove_var("GENERATOR_MAX_TOKENS");
}

#[test]
#[serial]
fn test_config_from_env_json_log_format() {
    set_required_vars();
    env::set_var("LOG_FORMAT", "json");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);

    env::remove_var("LOG_FORMAT");
}

#[test]
#[serial]
fn test_config_from_env_log_level() {
    set_required_vars();
    env::set_var("LOG_LEVEL", "debug");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.level, "debug");

    env::remove_var("LOG_LEVEL");
}
