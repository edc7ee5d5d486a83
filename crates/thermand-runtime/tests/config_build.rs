//! Configuration round trips: TOML text to a ticking tree.

use thermand_runtime::{BuiltRunner, ConfigError, ProcessConfig, RunnerConfig};
use thermand_types::ErrorCode;

const DAEMON_TOML: &str = r#"
name = "main"
variant = "fast"
stop_timeout_ns = 5000000000

[root]
kind = "system"
name = "host"

[[root.children]]
kind = "pipeline"
name = "cpu_zone"
interval_ns = 10000000

[[root.children.children]]
kind = "pid"
name = "cpu_pid"
sensor = "cpu_temp"
actuator = "fan1"
setpoint = 65.0
kp = -4.0
kd = -1.0

[[root.children]]
kind = "pipeline"
name = "gpu_zone"
interval_ns = 30000000

[[root.children.children]]
kind = "fixed_speed"
name = "gpu_fixed"

[root.children.children.settings]
gpu_fan = 192.0
"#;

#[test]
fn daemon_toml_builds_and_ticks() {
    let config = RunnerConfig::from_toml(DAEMON_TOML).expect("parse");
    assert_eq!(config.root.children().len(), 2);

    let BuiltRunner::Fast(mut runner) = thermand_runtime::config::build_runner(&config).expect("build")
    else {
        panic!("expected a fast runner");
    };

    // 100 ms of simulated time: the zones come due at 10 ms multiples,
    // so the root system executes at each of the 10 distinct instants.
    runner.run_for(100_000_000).expect("run");
    assert_eq!(runner.ticks(), 10);
    assert_eq!(runner.now_ns(), 100_000_000);
}

#[test]
fn parsed_config_round_trips() {
    let config = RunnerConfig::from_toml(DAEMON_TOML).expect("parse");
    let emitted = config.to_toml().expect("emit");
    let back = RunnerConfig::from_toml(&emitted).expect("re-parse");
    assert_eq!(back, config);
}

#[test]
fn validation_errors_carry_config_codes() {
    let duplicate = r#"
        name = "main"
        variant = "fast"

        [root]
        kind = "pipeline"
        name = "zone"

        [[root.children]]
        kind = "fixed_speed"
        name = "same"

        [[root.children]]
        kind = "fixed_speed"
        name = "same"
    "#;
    let config = RunnerConfig::from_toml(duplicate).expect("parse");
    let err = thermand_runtime::config::build_runner(&config).expect_err("duplicate");
    assert_eq!(err, ConfigError::DuplicateName("same".into()));
    assert_eq!(err.code(), "CONFIG_DUPLICATE_NAME");
}

#[test]
fn process_config_alone_round_trips() {
    let config = RunnerConfig::from_toml(DAEMON_TOML).expect("parse");
    let toml = config.root.to_toml().expect("emit");
    let back = ProcessConfig::from_toml(&toml).expect("re-parse");
    assert_eq!(back, config.root);
}
