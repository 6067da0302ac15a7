//! Demo entrypoint: wires a synthetic sensor to a gesture expression and
//! logs every recognized completion.
//!
//! Plays the part a real host application (the windowed shell, in the
//! system this engine is distilled from) would play: it owns the sensor,
//! generates a scripted stream of events on a background thread, and
//! serializes them onto a single-consumer queue before feeding them into the
//! engine one at a time — the discipline spec §5's "Thread-safety note"
//! requires of any multi-threaded host.

mod sensor;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use gesture_core::{Expression, Sensor};
use sensor::{DemoSensor, Feature};
use std::rc::Rc;
use std::thread;
use std::time::Duration;
use tracing::info;

/// Which combinator the demo should exercise.
#[derive(Copy, Clone, Debug, ValueEnum)]
enum Scenario {
    /// `Ground(A) ; Ground(B)` — spec §8 scenario S2.
    Sequence,
    /// `Ground(A) ‖ Ground(B)` — spec §8 scenario S3.
    Parallel,
    /// `Ground(A) ⊕ Ground(B)` — spec §8 scenario S4.
    Choice,
    /// `Iter(Ground(A)) ; Ground(B)` — spec §8 scenario S5.
    Iter,
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scenario::Sequence => write!(f, "sequence"),
            Scenario::Parallel => write!(f, "parallel"),
            Scenario::Choice => write!(f, "choice"),
            Scenario::Iter => write!(f, "iter"),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "gesture-demo", version, about = "Gesture recognition engine demo")]
struct Args {
    /// Which combinator to demonstrate against a scripted event stream.
    #[arg(long, value_enum, default_value_t = Scenario::Sequence)]
    scenario: Scenario,

    /// Delay between scripted events, in milliseconds.
    #[arg(long, default_value_t = 150)]
    step_ms: u64,
}

fn build_expression(scenario: Scenario) -> Rc<Expression<Feature, i32>> {
    let a = Expression::ground(Feature::A);
    let b = Expression::ground(Feature::B);
    match scenario {
        Scenario::Sequence => a.then(&b),
        Scenario::Parallel => a.and(&b),
        Scenario::Choice => a.or(&b),
        Scenario::Iter => a.repeated().then(&b),
    }
}

/// The scripted event traces from spec §8's end-to-end scenarios, so the
/// demo's log output can be read against the spec directly.
fn script_for(scenario: Scenario) -> Vec<(Feature, i32)> {
    match scenario {
        Scenario::Sequence => vec![
            (Feature::B, 0),
            (Feature::A, 0),
            (Feature::B, 0),
            (Feature::A, 0),
            (Feature::A, 0),
        ],
        Scenario::Parallel => vec![(Feature::A, 0), (Feature::A, 0), (Feature::B, 0)],
        Scenario::Choice => vec![(Feature::A, 0), (Feature::B, 0)],
        Scenario::Iter => vec![
            (Feature::A, 0),
            (Feature::A, 0),
            (Feature::A, 0),
            (Feature::B, 0),
        ],
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let sensor = DemoSensor::new();
    let sensor_handle: Rc<dyn Sensor<Feature, i32>> = Rc::new(sensor.clone());

    let expr = build_expression(args.scenario);
    expr.gesture.subscribe(|tokens| {
        info!(target: "gesture.demo", tokens = tokens.len(), "gesture_recognized");
    });

    let network = expr.compile(sensor_handle)?;
    info!(
        target: "gesture.demo",
        scenario = ?args.scenario,
        subscriptions = sensor.subscription_count(),
        "armed"
    );

    let (tx, rx) = crossbeam_channel::unbounded::<(Feature, i32)>();
    let script = script_for(args.scenario);
    let step = Duration::from_millis(args.step_ms);
    let producer = thread::spawn(move || {
        for event in script {
            thread::sleep(step);
            if tx.send(event).is_err() {
                break;
            }
        }
    });

    // Single-consumer loop: the main thread is the only place events ever
    // enter the engine, regardless of which thread generated them.
    for (feature, payload) in rx.iter() {
        info!(target: "gesture.demo", feature = ?feature, payload, "event");
        sensor.dispatch(feature, payload);
    }

    producer.join().expect("producer thread panicked");
    // Keep the compiled network alive for the whole run: dropping it early
    // would drop the root's completion wiring before the script finishes.
    drop(network);
    Ok(())
}
