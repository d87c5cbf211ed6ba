//! Undamped periodic runs: the discrete energy should stay flat.

use approx::assert_abs_diff_eq;
use gauge_wave_modeller::{
    BoundaryPolicy, EnergyScheme, InitialCondition, Integrator, SimulationParams, SpatialOperator,
    Wavefield,
};

fn packet_params(steps: usize) -> SimulationParams {
    SimulationParams {
        c: 1.0,
        steps,
        initial: InitialCondition::gaussian(0.6, 3.0, 3.0),
        ..SimulationParams::periodic(64, 64, 6.4, 6.4)
    }
}

#[test]
fn test_gaussian_packet_energy_within_one_percent() {
    let mut sim = Integrator::new(packet_params(150)).unwrap();
    let dx = sim.grid().dx;
    assert_abs_diff_eq!(sim.dt(), 0.65 * dx / 2f64.sqrt(), epsilon = 1e-15);

    sim.run_to_end().unwrap();
    let total = sim.energy_trace().total();
    assert_eq!(total.len(), 150);

    let first = total[0];
    let last = total[149];
    assert!(first > 0.0);
    assert!(
        ((last - first) / first).abs() < 0.01,
        "energy drifted from {} to {}",
        first,
        last
    );
}

#[test]
fn test_energy_bounded_every_step() {
    let mut sim = Integrator::new(packet_params(150)).unwrap();
    sim.run_to_end().unwrap();
    let total = sim.energy_trace().total();
    let max = total.iter().copied().fold(f64::MIN, f64::max);
    let min = total.iter().copied().fold(f64::MAX, f64::min);
    assert!(max / min - 1.0 < 0.02, "spread {}", max / min - 1.0);

    // Without a sponge the interior mask covers everything
    assert_eq!(sim.energy_trace().total(), sim.energy_trace().interior());
}

#[test]
fn test_staggered_energy_beats_collocated() {
    let drift = |scheme| {
        let params = SimulationParams {
            energy_scheme: scheme,
            ..packet_params(150)
        };
        let mut sim = Integrator::new(params).unwrap();
        sim.run_to_end().unwrap();
        sim.energy_trace().relative_drift().unwrap()
    };
    assert!(drift(EnergyScheme::Staggered) < drift(EnergyScheme::Collocated));
}

#[test]
fn test_energy_density_non_negative_each_step() {
    let mut sim = Integrator::new(packet_params(60)).unwrap();
    while !sim.is_finished() {
        sim.advance().unwrap();
        assert!(sim.energy_density().iter().all(|&e| e >= 0.0));
    }
}

#[test]
fn test_matches_two_level_leapfrog() {
    // A_new = 2A - A_prev + (c dt)² ∇²A, started from rest
    let params = packet_params(25);
    let mut sim = Integrator::new(params.clone()).unwrap();
    let dt = sim.dt();
    let op = SpatialOperator::new(sim.grid(), BoundaryPolicy::Periodic);

    let (ax0, ay0) = params.initial.generate(sim.grid()).unwrap();
    // First step of the velocity form from rest: A1 = A0 + dt² ∇²A0
    let mut ax = &ax0 + &(op.laplacian(&ax0) * (dt * dt));
    let mut ay = &ay0 + &(op.laplacian(&ay0) * (dt * dt));
    let (mut ax_prev, mut ay_prev) = (ax0, ay0);
    sim.advance().unwrap();

    for _ in 1..25 {
        let ax_new = &ax * 2.0 - &ax_prev + op.laplacian(&ax) * (dt * dt);
        let ay_new = &ay * 2.0 - &ay_prev + op.laplacian(&ay) * (dt * dt);
        ax_prev = std::mem::replace(&mut ax, ax_new);
        ay_prev = std::mem::replace(&mut ay, ay_new);
        sim.advance().unwrap();
    }

    for (a, b) in sim.ax().iter().zip(ax.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
    }
    for (a, b) in sim.ay().iter().zip(ay.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
    }

    // And the previous level is recoverable from the velocity form
    let (px, _) = sim.wavefield().previous(dt);
    for (a, b) in px.iter().zip(ax_prev.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
    }
}

#[test]
fn test_resume_from_leapfrog_state() {
    let params = packet_params(40);
    let mut reference = Integrator::new(params.clone()).unwrap();
    reference.run(20).unwrap();

    let dt = reference.dt();
    let (ax_prev, ay_prev) = reference.wavefield().previous(dt);
    let field = Wavefield::from_previous(
        reference.ax().clone(),
        reference.ay().clone(),
        &ax_prev,
        &ay_prev,
        dt,
    )
    .unwrap();
    let mut resumed = Integrator::with_wavefield(params, field).unwrap();

    reference.run(10).unwrap();
    resumed.run(10).unwrap();
    for (a, b) in reference.ax().iter().zip(resumed.ax().iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
    }
}
