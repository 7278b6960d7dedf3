use super::helpers::parse_endpoint_to_transport;
use super::types::FanoutConfig;
use crate::transport::Transport;

#[test]
fn parse_minimal_toml() {
    let cfg = FanoutConfig::from_toml("").unwrap();
    assert_eq!(cfg, FanoutConfig::local());
    assert_eq!(cfg.space_transport().unwrap(), Transport::ipc("space"));
}

#[test]
fn parse_full_toml() {
    let toml = r#"
[space]
endpoint = "tcp://10.0.0.1:17100"
take_wait_ms = 500
call_timeout_ms = 4000

[computer]
endpoint = "tcp://10.0.0.2:17101"
threads = 6
call_timeout_ms = 2000

[transport]
kind = "tcp"
"#;
    let cfg = FanoutConfig::from_toml(toml).unwrap();
    assert_eq!(cfg.space_transport().unwrap(), Transport::tcp("10.0.0.1", 17100));
    assert_eq!(cfg.computer.threads, 6);
    assert_eq!(cfg.take_wait().as_millis(), 500);
    assert_eq!(cfg.computer_call_timeout().as_millis(), 2000);
}

#[test]
fn distributed_preset_is_valid() {
    let cfg = FanoutConfig::distributed("192.168.1.10", 17200);
    cfg.validate().unwrap();
    assert_eq!(cfg.computer_transport().unwrap(), Transport::tcp("192.168.1.10", 17201));
}

#[test]
fn rejects_unknown_transport_kind() {
    let err = FanoutConfig::from_toml("[transport]\nkind = \"udp\"\n").unwrap_err();
    assert!(err.to_string().contains("udp"));
}

#[test]
fn rejects_endpoint_of_other_kind() {
    let toml = r#"
[space]
endpoint = "tcp://127.0.0.1:17000"
"#;
    assert!(FanoutConfig::from_toml(toml).is_err());
}

#[test]
fn rejects_zero_timeout() {
    let toml = r#"
[computer]
call_timeout_ms = 0
"#;
    assert!(FanoutConfig::from_toml(toml).is_err());
}

#[test]
fn rejects_take_wait_longer_than_call_timeout() {
    let toml = r#"
[space]
take_wait_ms = 20000
call_timeout_ms = 1000
"#;
    assert!(FanoutConfig::from_toml(toml).is_err());
}

#[test]
fn helper_names_the_key() {
    let err = parse_endpoint_to_transport("space.endpoint", "nowhere").unwrap_err();
    assert!(err.to_string().contains("space.endpoint"));
}

#[test]
fn resolved_threads() {
    let mut cfg = FanoutConfig::local();
    assert!(cfg.computer.resolved_threads() > 0);

    cfg.computer.threads = 3;
    assert_eq!(cfg.computer.resolved_threads(), 3);
}
