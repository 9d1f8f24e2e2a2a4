use ndarray::{array, Array1, Array2};
use pgopf_algo::*;
use pgopf_core::SolveState;

fn case6ww_pipeline() -> FeatureConstructionPipeline {
    let network = pgopf_io::case6ww().expect("embedded case parses");
    FeatureConstructionPipeline::new(network, &NewtonRaphsonEngine::new(), &SolveOptions::default())
        .expect("pipeline builds")
}

#[test]
fn case6ww_power_flow_converges() {
    let pipeline = case6ww_pipeline();
    assert!(matches!(
        pipeline.network().solve_state,
        SolveState::Converged { .. }
    ));
    assert!(pipeline.diagnostics().is_empty());

    let slack = &pipeline.network().bus_order()[0];
    assert!((slack.voltage_pu.value() - 1.05).abs() < 1e-9);
    assert_eq!(slack.angle_rad.value(), 0.0);
}

#[test]
fn case6ww_admittance_is_6x6_and_partitions_ybus() {
    let network = pgopf_io::case6ww().unwrap();
    let ybus = SparseYBus::from_network(&network).unwrap().to_dense();
    let adm = extract_admittance_components(&network).unwrap();

    for m in [&adm.g_diag, &adm.b_diag, &adm.g_nd, &adm.b_nd] {
        assert_eq!(m.dim(), (6, 6));
    }
    let (g, b) = (adm.g_full(), adm.b_full());
    for ((i, j), y) in ybus.indexed_iter() {
        assert!((g[[i, j]] - y.re).abs() < 1e-10);
        assert!((b[[i, j]] - y.im).abs() < 1e-10);
    }
    // 11 branches, no parallel lines: 22 off-diagonal couplings
    assert_eq!(adm.g_nd.iter().filter(|v| **v != 0.0).count(), 22);
}

#[test]
fn case6ww_k4_features() {
    let pipeline = case6ww_pipeline();
    let features = pipeline.stacked_features(4).unwrap();
    assert_eq!(features.dim(), (6, 8));
    assert!(features.column(0).iter().all(|&v| v == 1.0));
    assert!(features.column(4).iter().all(|&v| v == 0.0));
    assert!(features.iter().all(|v| v.is_finite()));

    // Every iterate after the flat start lies on the unit circle or at the origin
    for k in 1..4 {
        for bus in 0..6 {
            let (e, f) = (features[[bus, k]], features[[bus, 4 + k]]);
            let mag2 = e * e + f * f;
            assert!(mag2 == 0.0 || (mag2 - 1.0).abs() < 1e-6, "bus {bus} k {k}");
        }
    }
}

#[test]
fn stacking_preserves_column_order() {
    let pipeline = case6ww_pipeline();
    let history = pipeline.run(3).unwrap();
    let stacked = pipeline.stacked_features(3).unwrap();
    for k in 0..3 {
        assert_eq!(stacked.column(k), history.e.column(k));
        assert_eq!(stacked.column(3 + k), history.f.column(k));
    }
}

#[test]
fn shape_contract_for_several_k() {
    let pipeline = case6ww_pipeline();
    for k in [1, 2, 5, 8] {
        let history = pipeline.run(k).unwrap();
        assert_eq!(history.e.dim(), (6, k));
        assert_eq!(history.f.dim(), (6, k));
        assert_eq!(history.num_iterations(), k);
        assert_eq!(history.stacked().dim(), (6, 2 * k));
    }
}

#[test]
fn gcnn_input_bundles_physics() {
    let pipeline = case6ww_pipeline();
    let input = GcnnInput::from_pipeline(&pipeline, 4).unwrap();
    assert_eq!(input.node_features.dim(), (6, 8));
    assert_eq!(input.n_buses, 6);

    let physics = input.physics();
    assert_eq!(physics.n_buses(), 6);
    // 3 x 70 MW on a 100 MVA base
    assert!((physics.pd.sum() - 2.1).abs() < 1e-12);

    let summary = input.summary();
    assert_eq!(summary.feature_shape, (6, 8));
    assert_eq!(summary.mutual_couplings, 22);
    assert!(summary.to_string().starts_with("6 buses, K=4"));
}

#[test]
fn batch_matches_individual_runs() {
    let networks: Vec<_> = (0..4).map(|_| pgopf_io::case6ww().unwrap()).collect();
    let engine = NewtonRaphsonEngine::new();
    let options = SolveOptions::default();
    let batch = construct_features_batch(networks, 4, &engine, &options);
    let single = case6ww_pipeline().stacked_features(4).unwrap();
    for result in batch {
        let features = result.unwrap();
        let max_diff = (&features - &single)
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        assert!(max_diff < 1e-12);
    }
}

#[test]
fn zero_admittance_returns_demand() {
    let pd = array![0.3, -0.1, 2.0];
    let qd = array![0.05, 0.0, -1.0];
    let zero = Array2::zeros((3, 3));
    let (e, f): (Array1<f64>, Array1<f64>) = (array![0.9, 1.1, 0.3], array![0.2, -0.4, 0.0]);
    let (pg, qg) = compute_pg_qg(&e, &f, &zero, &zero, &pd, &qd);
    assert_eq!(pg, pd);
    assert_eq!(qg, qd);
}

#[test]
fn clipping_boundaries_are_exact() {
    let limits = PowerLimits {
        pg_min: array![0.0],
        pg_max: array![1.0],
        qg_min: array![-0.5],
        qg_max: array![0.5],
    };
    let (pg, qg) = apply_power_limits(&array![1.5], &array![-0.6], &limits);
    assert_eq!(pg[0], 1.0);
    assert_eq!(qg[0], -0.5);
}

#[test]
fn degenerate_merge_absorbs_any_numerator() {
    let zero = array![0.0, 0.0, 0.0];
    let delta = array![1e300, f64::MAX, -7.0];
    let lambda = array![-1e300, 3.0, f64::MIN];
    let (e, f) = aggregate_features(&zero, &zero, &delta, &lambda);
    assert!(e.iter().chain(f.iter()).all(|&v| v == 0.0));
}

#[test]
fn repeated_bus_id_fails_construction() {
    let case = "\
mpc.baseMVA = 100;
mpc.bus = [
1 3 0 0 0 0 1 1 0 230 1 1.1 0.9;
2 1 50 10 0 0 1 1 0 230 1 1.1 0.9;
2 1 20 5 0 0 1 1 0 230 1 1.1 0.9;
];
mpc.gen = [
1 0 0 100 -100 1.0 100 1 200 0;
];
mpc.branch = [
1 2 0.01 0.1 0 0 0 0 0 0 1 -360 360;
];
";
    let network = pgopf_io::network_from_matpower_str(case).unwrap().network;

    let unsolved = FeatureConstructionPipeline::without_solve(network.clone());
    assert!(matches!(
        unsolved,
        Err(FeatureError::Admittance(YBusError::DuplicateBus(2)))
    ));
    assert!(BusInjections::from_network(&network).is_err());

    let solved = FeatureConstructionPipeline::new(
        network,
        &NewtonRaphsonEngine::new(),
        &SolveOptions::default(),
    );
    assert!(matches!(
        solved,
        Err(FeatureError::Admittance(YBusError::DuplicateBus(2)))
    ));
}
