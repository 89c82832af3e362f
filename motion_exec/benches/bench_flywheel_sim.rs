//! # Flywheel Simulator Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use motion_lib::{
    flywheel_sim::{FlywheelSimParams, FlywheelSimulator},
    tuning::{TuningParams, TuningSession},
    vel_pid::VelPidParams,
};

fn flywheel_sim_benchmark(c: &mut Criterion) {
    // ---- Free running simulator ----

    let mut sim = FlywheelSimulator::from_params(&FlywheelSimParams::default());
    sim.set_torque(1.0);

    c.bench_function("flywheel_sim_step", |b| b.iter(|| black_box(sim.step())));

    // ---- Simulator in closed loop with a velocity controller ----

    let params = TuningParams {
        target_rpm: 100.0,
        trace_path: None,
        vel_pid: VelPidParams {
            k_p: 0.0001,
            k_d: 0.5,
            ..Default::default()
        },
        ..Default::default()
    };

    c.bench_function("closed_loop_1000_steps", |b| {
        b.iter(|| {
            let mut session = TuningSession::new(&params).unwrap();
            for _ in 0..1000 {
                black_box(session.step());
            }
        })
    });
}

criterion_group!(benches, flywheel_sim_benchmark);
criterion_main!(benches);
