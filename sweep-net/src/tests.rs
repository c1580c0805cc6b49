//! Loopback tests running `RemoteSim` against a local `Server`.

use std::net::TcpListener;
use std::path::Path;
use std::thread;
use std::time::Duration;

use sweep_core::{Call, Error as CoreError, Float, ParameterSet, Runner, SampleRow, SimAdapter, Value};

use crate::{ClientConfig, RemoteSim, Server, ServerConfig};

/// Reports `x = t` and `y = 2t`, counting ticks from the last reset.
#[derive(Default)]
struct Linear {
    model: Option<String>,
    params: Vec<(String, Value)>,
    closed: bool,
}

impl SimAdapter for Linear {
    fn load_model(&mut self, path: &Path) -> sweep_core::Result<()> {
        self.model = Some(path.to_string_lossy().to_string());
        Ok(())
    }
    fn apply_parameter(&mut self, name: &str, value: &Value) -> sweep_core::Result<()> {
        if name == "forbidden" {
            return Err(CoreError::command(
                Call::ApplyParameter(name.to_string()),
                "nothing named this way",
            ));
        }
        self.params.push((name.to_string(), value.clone()));
        Ok(())
    }
    fn reset(&mut self) -> sweep_core::Result<()> {
        Ok(())
    }
    fn sample_over_steps(
        &mut self,
        reporters: &[String],
        steps: usize,
    ) -> sweep_core::Result<Vec<SampleRow>> {
        let mut rows = Vec::new();
        for tick in 0..steps {
            let mut row = SampleRow::new();
            for reporter in reporters {
                let v = match reporter.as_str() {
                    "x" => tick as Float,
                    "y" => 2.0 * tick as Float,
                    r => {
                        return Err(CoreError::command(
                            Call::SampleOverSteps,
                            format!("unknown reporter: {}", r),
                        ))
                    }
                };
                row.insert(reporter.clone(), v);
            }
            rows.push(row);
        }
        Ok(rows)
    }
    fn close(&mut self) -> sweep_core::Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Spawns a server handling a single client, returning the address to
/// connect to and a handle yielding the served simulation.
fn spawn_server(config: ServerConfig) -> (String, thread::JoinHandle<Linear>) {
    let server = Server::bind("127.0.0.1:0", config).unwrap();
    let addr = server.local_addr().unwrap().to_string();
    let handle = thread::spawn(move || {
        let mut sim = Linear::default();
        server.serve_one(&mut sim).unwrap();
        sim
    });
    (addr, handle)
}

fn params() -> ParameterSet {
    let mut overrides = linked_hash_map::LinkedHashMap::new();
    overrides.insert("amount-of-shared-cars".to_string(), Value::Int(32));
    ParameterSet::merge(&Default::default(), &overrides)
}

#[test]
fn remote_batch_matches_local_semantics() {
    let (addr, handle) = spawn_server(ServerConfig {
        compress: true,
        ..Default::default()
    });
    let mut sim = RemoteSim::connect(
        addr.as_str(),
        ClientConfig {
            compress: true,
            ..Default::default()
        },
    )
    .unwrap();
    sim.load_model(Path::new("models/parking.nlogo")).unwrap();
    let reporters = vec!["x".to_string(), "y".to_string()];
    let out = Runner::new(2, 3).run(&mut sim, &params(), &reporters).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[&1].column("y").unwrap(), &[0., 2., 4.]);
    sim.close().unwrap();

    let served = handle.join().unwrap();
    assert_eq!(served.model.as_deref(), Some("models/parking.nlogo"));
    assert_eq!(served.params.len(), 2);
    assert!(served.closed);
}

#[test]
fn remote_errors_carry_the_call() {
    let (addr, handle) = spawn_server(ServerConfig::default());
    let mut sim = RemoteSim::connect(addr.as_str(), ClientConfig::default()).unwrap();

    match sim.apply_parameter("forbidden", &Value::Bool(true)) {
        Err(CoreError::SimulationCommand { call, reason }) => {
            assert_eq!(call, Call::ApplyParameter("forbidden".to_string()));
            assert!(reason.contains("nothing named this way"));
        }
        other => panic!("unexpected: {:?}", other),
    }
    let err = sim
        .sample_over_steps(&["nope".to_string()], 2)
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::SimulationCommand {
            call: Call::SampleOverSteps,
            ..
        }
    ));
    sim.close().unwrap();
    handle.join().unwrap();
}

#[test]
fn sweep_over_network() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, handle) = spawn_server(ServerConfig::default());
    let sim = RemoteSim::connect(addr.as_str(), ClientConfig::default()).unwrap();
    let config = sweep_core::SweepConfig::new(
        "model.nlogo",
        vec!["x".to_string(), "y".to_string()],
        4,
        5,
    )
    .with_output(dir.path());
    let table = sweep_core::SensitivityTable {
        entries: vec![sweep_core::SensitivityEntry {
            variable: "amount-of-shared-cars".to_string(),
            low: Value::Int(5),
            high: Value::Int(50),
        }],
    };
    let handles = sweep_core::sweep::execute(
        sim,
        &config,
        None,
        Some(&table),
        sweep_core::SweepPlan::Sensitivity { index: 0 },
        None,
    )
    .unwrap();
    assert_eq!(handles.len(), 2);
    assert!(handles.iter().all(|h| h.path.exists()));
    assert!(handle.join().unwrap().closed);
}

#[test]
fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        // hold the connection open without ever responding
        let (stream, _) = listener.accept().unwrap();
        thread::sleep(Duration::from_millis(600));
        drop(stream);
    });
    let mut sim = RemoteSim::connect(
        addr,
        ClientConfig {
            timeout: Some(Duration::from_millis(100)),
            ..Default::default()
        },
    )
    .unwrap();
    match sim.reset() {
        Err(CoreError::SimulationTimeout { call }) => assert_eq!(call, Call::Reset),
        other => panic!("unexpected: {:?}", other),
    }
    handle.join().unwrap();
}
