//! End-to-end pipeline behaviour under the simulation runner.

use thermand_process::testing::{FailingProcess, NoopProcess, RecordingProcess, StubEnvironment};
use thermand_process::{Collection, Pipeline, Process};
use thermand_runtime::{FastRunner, FixedSpeedController, MemoryEnvironment};
use thermand_state::{Device, State, StateMap};

fn value_of(map: &StateMap, name: &str) -> Option<f64> {
    map.actual().and_then(|s| s.device(name)).map(Device::value)
}

fn stamp_of(map: &StateMap, name: &str) -> Option<u64> {
    map.actual()
        .and_then(|s| s.device(name))
        .map(Device::timestamp_ns)
}

/// One environment, one fixed controller: after a tick the snapshot
/// carries the fresh reading and the commanded actuator value.
#[test]
fn environment_and_controller_one_tick() {
    let env = StubEnvironment::new(
        "env",
        vec![
            Device::sensor("cpu_temp").with_value(50.0, 0),
            Device::actuator("fan1").with_value(0.0, 0),
        ],
    );
    let controller = FixedSpeedController::new("fixed", 0).with_setting("fan1", 128.0);
    let probe = RecordingProcess::new("probe", 0);
    let log = probe.log();

    let mut pipeline = Pipeline::new("cpu_zone", 100_000_000);
    pipeline.append(Box::new(env)).unwrap();
    pipeline.append(Box::new(controller)).unwrap();
    pipeline.append(Box::new(probe)).unwrap();

    let mut runner = FastRunner::new("sim", Box::new(pipeline));
    runner.run_for(100_000_000).unwrap();

    let observed = log.lock();
    assert_eq!(observed.len(), 1);
    assert_eq!(value_of(&observed[0], "cpu_temp"), Some(50.0));
    assert_eq!(value_of(&observed[0], "fan1"), Some(128.0));
}

/// Ten ticks: the reading holds, the command holds, and every
/// device's timestamps strictly increase.
#[test]
fn environment_and_controller_ten_ticks() {
    let env = StubEnvironment::new(
        "env",
        vec![
            Device::sensor("cpu_temp").with_value(50.0, 0),
            Device::actuator("fan1").with_value(0.0, 0),
        ],
    );
    let controller = FixedSpeedController::new("fixed", 0).with_setting("fan1", 128.0);
    let probe = RecordingProcess::new("probe", 0);
    let log = probe.log();

    let mut pipeline = Pipeline::new("cpu_zone", 100_000_000);
    pipeline.append(Box::new(env)).unwrap();
    pipeline.append(Box::new(controller)).unwrap();
    pipeline.append(Box::new(probe)).unwrap();

    let mut runner = FastRunner::new("sim", Box::new(pipeline));
    runner.run_for(1_000_000_000).unwrap();

    let observed = log.lock();
    assert_eq!(observed.len(), 10);
    for map in observed.iter() {
        assert_eq!(value_of(map, "cpu_temp"), Some(50.0));
        assert_eq!(value_of(map, "fan1"), Some(128.0));
    }
    for name in ["cpu_temp", "fan1"] {
        let stamps: Vec<u64> = observed.iter().filter_map(|m| stamp_of(m, name)).collect();
        assert_eq!(stamps.len(), 10);
        assert!(stamps.windows(2).all(|w| w[0] < w[1]), "{name} timestamps");
    }
}

/// A broken stage yields its input: the next stage and the pipeline
/// output both see the upstream data, and the loop keeps ticking.
#[test]
fn failing_stage_passes_through_and_loop_continues() {
    let env = StubEnvironment::new(
        "env",
        vec![Device::sensor("cpu_temp").with_value(50.0, 0)],
    );
    let probe = RecordingProcess::new("probe", 0);
    let log = probe.log();

    let mut pipeline = Pipeline::new("cpu_zone", 10_000_000);
    pipeline.append(Box::new(env)).unwrap();
    pipeline.append(Box::new(FailingProcess::new("broken"))).unwrap();
    pipeline.append(Box::new(probe)).unwrap();

    let mut runner = FastRunner::new("sim", Box::new(pipeline));
    runner.run_for(50_000_000).unwrap();

    let observed = log.lock();
    assert_eq!(observed.len(), 5, "runner kept ticking past the failure");
    for map in observed.iter() {
        assert_eq!(value_of(map, "cpu_temp"), Some(50.0));
    }
}

/// An all-identity pipeline is itself the identity.
#[test]
fn identity_pipeline_laws() {
    let input = StateMap::new().with_actual(
        State::new().with_device(Device::sensor("cpu_temp").with_value(50.0, 1)),
    );

    let mut empty = Pipeline::new("empty", 0);
    empty.initialize(0);
    assert_eq!(empty.run(input.clone()).unwrap(), input);

    let mut single = Pipeline::new("single", 0);
    single.append(Box::new(NoopProcess::new("noop"))).unwrap();
    single.initialize(0);
    assert_eq!(single.run(input.clone()).unwrap(), input);
}

/// Read-write round trip: the same hardware at head and tail. The
/// head publishes sensors; the tail applies whatever "desired" the
/// stages in between produced.
#[test]
fn environment_round_trip() {
    let head = MemoryEnvironment::new(
        "env_read",
        0,
        vec![
            Device::sensor("cpu_temp").with_value(50.0, 0),
            Device::actuator("fan1").with_value(0.0, 0),
        ],
    );
    let handle = head.alias("observer");
    let tail = head.alias("env_write");

    // no controller: actual is published, nothing applied
    let mut bare = Pipeline::new("bare", 10_000_000);
    bare.append(Box::new(head)).unwrap();
    bare.append(Box::new(tail)).unwrap();
    bare.initialize(0);
    let out = bare.run(StateMap::new()).unwrap();
    assert_eq!(value_of(&out, "cpu_temp"), Some(50.0));
    assert_eq!(handle.applied("fan1"), Some(0.0));

    // with a controller in between: the command lands on the hardware
    let mut flow = Pipeline::new("flow", 10_000_000);
    flow.append(Box::new(handle.alias("read"))).unwrap();
    flow.append(Box::new(
        FixedSpeedController::new("fixed", 0).with_setting("fan1", 200.0),
    ))
    .unwrap();
    flow.append(Box::new(handle.alias("write"))).unwrap();
    flow.initialize(0);
    flow.run(StateMap::new()).unwrap();
    assert_eq!(handle.applied("fan1"), Some(200.0));
}
