use std::collections::HashMap;
use std::time::Duration;

use hellobench::config::Config;
use hellobench::server::Strategy;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_config_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.listen_addr(), "0.0.0.0:8080");
    assert_eq!(cfg.strategy, Strategy::EventLoop);
    assert_eq!(cfg.delay(), Duration::from_millis(200));
    assert_eq!(cfg.threads, 10);
    assert_eq!(cfg.read_buffer, 1024);
}

#[test]
fn test_config_from_yaml_partial() {
    let cfg = Config::from_yaml_str(
        "port: 9090\nstrategy: thread-pool\nthreads: 32\n",
    )
    .unwrap();

    assert_eq!(cfg.port, 9090);
    assert_eq!(cfg.strategy, Strategy::ThreadPool);
    assert_eq!(cfg.threads, 32);
    // Unspecified fields keep their defaults
    assert_eq!(cfg.delay_ms, 200);
    assert_eq!(cfg.host, "0.0.0.0");
}

#[test]
fn test_config_from_yaml_rejects_unknown_strategy() {
    assert!(Config::from_yaml_str("strategy: fibers\n").is_err());
}

#[test]
fn test_config_from_missing_file() {
    let err = Config::from_file("/definitely/not/here.yaml").unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here.yaml"));
}

#[test]
fn test_config_env_overrides() {
    let mut cfg = Config::default();
    cfg.apply_overrides(lookup(&[
        ("HOST", "127.0.0.1"),
        ("PORT", "3000"),
        ("STRATEGY", "task-per-connection"),
        ("DELAY_MS", "50"),
    ]))
    .unwrap();

    assert_eq!(cfg.listen_addr(), "127.0.0.1:3000");
    assert_eq!(cfg.strategy, Strategy::TaskPerConnection);
    assert_eq!(cfg.delay(), Duration::from_millis(50));
}

#[test]
fn test_config_overrides_take_precedence_over_yaml() {
    let mut cfg = Config::from_yaml_str("port: 9090\n").unwrap();
    cfg.apply_overrides(lookup(&[("PORT", "7070")])).unwrap();

    assert_eq!(cfg.port, 7070);
}

#[test]
fn test_config_invalid_override_names_variable() {
    let mut cfg = Config::default();
    let err = cfg
        .apply_overrides(lookup(&[("PORT", "eighty")]))
        .unwrap_err();

    assert!(err.to_string().contains("PORT"));
    assert_eq!(cfg.port, 8080);
}

#[test]
fn test_config_socket_addr() {
    let mut cfg = Config::default();
    cfg.apply_overrides(lookup(&[("HOST", "127.0.0.1"), ("PORT", "0")]))
        .unwrap();

    let addr = cfg.socket_addr().unwrap();
    assert!(addr.ip().is_loopback());
    assert_eq!(addr.port(), 0);
}

#[test]
fn test_strategy_parse_and_display() {
    for strategy in [
        Strategy::SingleThread,
        Strategy::ThreadPool,
        Strategy::TaskPerConnection,
        Strategy::EventLoop,
    ] {
        assert_eq!(strategy.to_string().parse::<Strategy>().unwrap(), strategy);
    }
    assert_eq!("EVENT-LOOP".parse::<Strategy>().unwrap(), Strategy::EventLoop);
    assert!("green-threads".parse::<Strategy>().is_err());
}
