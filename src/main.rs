// This file is a small example of how to use the `siesta` library.
// The main library entry point is `src/lib.rs`.

use siesta::{SchedulerConfig, SensorNode, SleepScheduler};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // A toy cluster: one head plus three redundant sensors stacked around
    // the center of a 100 m × 100 m field.
    let mut cluster = vec![
        SensorNode::new(0, 50.0, 50.0, 2.0),
        SensorNode::new(1, 52.0, 50.0, 1.8),
        SensorNode::new(2, 48.0, 52.0, 1.5),
        SensorNode::new(3, 50.0, 47.0, 1.9),
    ];
    cluster[0].is_head = true;

    let config = SchedulerConfig {
        field_width: 100.0,
        field_height: 100.0,
        ..SchedulerConfig::default()
    };
    let scheduler = SleepScheduler::new(config);

    match scheduler.schedule(&mut cluster) {
        Ok(Some(log)) => {
            println!(
                "coverage {:.3}, overlap {:.3}, sleeping {:.0}%",
                log.coverage_ratio,
                log.overlap_ratio,
                log.sleeping_fraction * 100.0
            );
            for node in &cluster {
                println!(
                    "node {}: {}",
                    node.id,
                    if node.is_sleeping { "sleeping" } else { "awake" }
                );
            }
        }
        Ok(None) => println!("degenerate cluster, nothing to schedule"),
        Err(err) => eprintln!("scheduling failed: {err}"),
    }
}
