//! Unit tests for ca-core primitives.

#[cfg(test)]
mod ids {
    use crate::{LaneId, VehicleId};

    #[test]
    fn index_roundtrip() {
        let id = VehicleId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(VehicleId::try_from(42usize).unwrap(), id);
        assert_eq!(id.next(), VehicleId(43));
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(VehicleId::INVALID.0, u64::MAX);
        assert_eq!(LaneId::INVALID.0, u32::MAX);
        assert_eq!(LaneId::default(), LaneId::INVALID);
    }

    #[test]
    fn display() {
        assert_eq!(LaneId(1).to_string(), "LaneId(1)");
    }
}

#[cfg(test)]
mod time {
    use crate::{StepClock, Tick};

    #[test]
    fn tick_arithmetic() {
        assert_eq!(Tick(15) - Tick(10), 5u64);
    }

    #[test]
    fn clock_elapsed() {
        let mut clock = StepClock::new(0.5);
        clock.advance();
        clock.advance();
        clock.advance();
        assert_eq!(clock.current_tick, Tick(3));
        assert!((clock.elapsed_secs() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn steps_for_secs_rounds_down() {
        let clock = StepClock::new(0.5);
        assert_eq!(clock.steps_for_secs(5.0), 10);
        assert_eq!(clock.steps_for_secs(5.4), 10);
        assert_eq!(clock.steps_for_secs(0.0), 0);
        assert_eq!(clock.steps_for_secs(-2.0), 0);
    }
}

#[cfg(test)]
mod rng {
    use crate::{SimRng, VehicleId, VehicleRng};

    #[test]
    fn deterministic_same_seed() {
        let mut r1 = VehicleRng::new(12345, VehicleId(7));
        let mut r2 = VehicleRng::new(12345, VehicleId(7));
        for _ in 0..100 {
            assert_eq!(r1.uniform(), r2.uniform());
        }
    }

    #[test]
    fn clone_continues_the_same_stream() {
        let mut original = VehicleRng::new(1, VehicleId(3));
        original.uniform();
        let mut copy = original.clone();
        assert_eq!(original.uniform(), copy.uniform());
    }

    #[test]
    fn different_vehicles_differ() {
        let mut r0 = VehicleRng::new(1, VehicleId(0));
        let mut r1 = VehicleRng::new(1, VehicleId(1));
        assert_ne!(r0.uniform(), r1.uniform());
    }

    #[test]
    fn keyed_streams_are_reproducible() {
        let a = SimRng::keyed(9, 100).uniform();
        let b = SimRng::keyed(9, 100).uniform();
        let c = SimRng::keyed(9, 101).uniform();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    fn first_draws(mut next: impl FnMut() -> f64) -> Vec<f64> {
        (0..5).map(|_| next()).collect()
    }

    #[test]
    fn stream_families_do_not_overlap() {
        for seed in [0, 1, 7, u64::MAX] {
            let mut spawn = SimRng::new(seed);
            let spawn = first_draws(|| spawn.uniform());
            for k in 0..8 {
                let mut vehicle = VehicleRng::new(seed, VehicleId(k));
                let vehicle = first_draws(|| vehicle.uniform());
                assert_ne!(spawn, vehicle, "seed {seed}: spawn stream is vehicle {k}'s");

                let mut fill = SimRng::keyed(seed, k);
                let fill = first_draws(|| fill.uniform());
                assert_ne!(fill, spawn, "seed {seed}: fill site {k} is the spawn stream");
                for id in [k, k + 1] {
                    let mut other = VehicleRng::new(seed, VehicleId(id));
                    let other = first_draws(|| other.uniform());
                    assert_ne!(fill, other, "seed {seed}: fill site {k} is vehicle {id}'s");
                }
            }
        }
    }

    #[test]
    fn gen_bool_extremes() {
        let mut rng = SimRng::new(0);
        assert!(!rng.gen_bool(0.0));
        assert!(rng.gen_bool(1.0));
        assert!(rng.gen_bool(7.0), "p is clamped to 1");
    }
}

#[cfg(test)]
mod cdf {
    use std::io::Cursor;

    use crate::{CaError, EmpiricalCdf, SimRng};

    fn table() -> EmpiricalCdf {
        EmpiricalCdf::from_points(&[(0.0, 0.0), (2.0, 0.4), (6.0, 0.9), (12.0, 1.0)]).unwrap()
    }

    #[test]
    fn first_entry_returns_its_x() {
        let cdf = EmpiricalCdf::from_points(&[(1.5, 0.1), (3.0, 1.0)]).unwrap();
        assert_eq!(cdf.quantile(0.1), 1.5);
        assert_eq!(cdf.quantile(0.0), 1.5, "below the table clamps to the first x");
    }

    #[test]
    fn interpolates_between_entries() {
        let cdf = table();
        assert!((cdf.quantile(0.2) - 1.0).abs() < 1e-9);
        assert!((cdf.quantile(0.65) - 4.0).abs() < 1e-9);
        assert!((cdf.quantile(0.95) - 9.0).abs() < 1e-9);
    }

    #[test]
    fn exact_interior_point() {
        assert!((table().quantile(0.4) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn top_of_table_clamps() {
        assert_eq!(table().quantile(1.0), 12.0);
    }

    #[test]
    fn samples_stay_within_support() {
        let cdf = table();
        let mut rng = SimRng::new(3);
        for _ in 0..1_000 {
            let v = cdf.sample(&mut rng);
            assert!((0.0..=12.0).contains(&v), "got {v}");
        }
    }

    #[test]
    fn loads_from_csv() {
        let csv = "x,cdf\n0.0,0.0\n 2.0 , 0.4\n6.0,0.9\n12.0,1.0\n";
        let cdf = EmpiricalCdf::from_reader(Cursor::new(csv)).unwrap();
        assert_eq!(cdf, table());
    }

    #[test]
    fn empty_table_is_rejected() {
        let err = EmpiricalCdf::from_reader(Cursor::new("x,cdf\n")).unwrap_err();
        assert!(matches!(err, CaError::Distribution(_)), "{err}");
    }

    #[test]
    fn unsorted_table_is_rejected() {
        let err = EmpiricalCdf::from_points(&[(0.0, 0.5), (1.0, 0.2)]).unwrap_err();
        assert!(matches!(err, CaError::Distribution(_)));
    }

    #[test]
    fn probability_out_of_range_is_rejected() {
        assert!(EmpiricalCdf::from_points(&[(0.0, 0.0), (1.0, 1.5)]).is_err());
    }

    #[test]
    fn malformed_csv_is_an_error() {
        let err = EmpiricalCdf::from_reader(Cursor::new("x,cdf\nabc,0.1\n")).unwrap_err();
        assert!(matches!(err, CaError::Csv(_)), "{err}");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = EmpiricalCdf::load_csv(std::path::Path::new("/nonexistent/cdf.csv")).unwrap_err();
        assert!(matches!(err, CaError::Io(_)));
    }
}

#[cfg(test)]
mod stats {
    use crate::Statistic;

    #[test]
    fn mean_variance_count() {
        let mut s = Statistic::new();
        for v in [1.0, 2.0, 3.0] {
            s.add(v);
        }
        assert_eq!(s.count(), 3);
        assert!((s.mean().unwrap() - 2.0).abs() < 1e-12);
        assert!((s.variance().unwrap() - 1.0).abs() < 1e-12);
        assert!((s.std_dev().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_and_single_sample() {
        let mut s = Statistic::new();
        assert_eq!(s.mean(), None);
        assert_eq!(s.variance(), None);
        s.add(4.0);
        assert_eq!(s.mean(), Some(4.0));
        assert_eq!(s.variance(), None);
    }

    #[test]
    fn merge_matches_single_stream() {
        let values = [3.0, 7.5, 1.25, 9.0, 4.0, 4.0, 12.5];
        let mut whole = Statistic::new();
        values.iter().for_each(|&v| whole.add(v));

        let mut left = Statistic::new();
        let mut right = Statistic::new();
        values[..3].iter().for_each(|&v| left.add(v));
        values[3..].iter().for_each(|&v| right.add(v));
        left.merge(&right);

        assert_eq!(left.count(), whole.count());
        assert!((left.mean().unwrap() - whole.mean().unwrap()).abs() < 1e-9);
        assert!((left.variance().unwrap() - whole.variance().unwrap()).abs() < 1e-9);
    }

    #[test]
    fn merge_into_empty() {
        let mut other = Statistic::new();
        other.add(2.0);
        let mut s = Statistic::new();
        s.merge(&other);
        assert_eq!(s, other);
    }
}

#[cfg(test)]
mod topology {
    use crate::ProcessTopology;

    #[test]
    fn single_owns_everything() {
        let t = ProcessTopology::single();
        assert_eq!(t.shard(103), 0..103);
        assert!(t.is_first() && t.is_last());
        assert_eq!(t.left(), None);
        assert_eq!(t.right(), None);
    }

    #[test]
    fn remainder_goes_to_last_shard() {
        let shards: Vec<_> = (0..4).map(|r| ProcessTopology::new(r, 4).shard(103)).collect();
        assert_eq!(shards, vec![0..25, 25..50, 50..75, 75..103]);
    }

    #[test]
    fn neighbors() {
        let mid = ProcessTopology::new(1, 3);
        assert_eq!(mid.left(), Some(0));
        assert_eq!(mid.right(), Some(2));
        assert_eq!(ProcessTopology::new(2, 3).right(), None);
    }
}

#[cfg(test)]
mod config {
    use std::io::{Cursor, Write};

    use crate::{CaConfig, CaError, Strategy, Tick};

    #[test]
    fn defaults_are_valid() {
        CaConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_uses_defaults() {
        let json = r#"{ "road_length": 300, "num_lanes": 3, "strategy": "shared_memory", "num_workers": 4 }"#;
        let cfg = CaConfig::from_reader(Cursor::new(json)).unwrap();
        assert_eq!(cfg.road_length, 300);
        assert_eq!(cfg.num_lanes, 3);
        assert_eq!(cfg.strategy, Strategy::SharedMemory);
        assert_eq!(cfg.num_workers, Some(4));
        assert_eq!(cfg.max_speed, CaConfig::default().max_speed);
        assert_eq!(cfg.end_tick(), Tick(10_000));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = CaConfig::from_reader(Cursor::new(r#"{ "lanes": 3 }"#)).unwrap_err();
        assert!(matches!(err, CaError::Json(_)));
    }

    #[test]
    fn non_positive_dimensions_are_fatal() {
        for cfg in [
            CaConfig { road_length: 0, ..CaConfig::default() },
            CaConfig { num_lanes: 0, ..CaConfig::default() },
            CaConfig { step_secs: 0.0, ..CaConfig::default() },
            CaConfig { step_secs: -1.0, ..CaConfig::default() },
        ] {
            assert!(matches!(cfg.validate(), Err(CaError::Config(_))), "{cfg:?}");
        }
    }

    #[test]
    fn probabilities_must_be_in_unit_range() {
        let cfg = CaConfig { prob_change: 1.2, ..CaConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = CaConfig { initial_density: -0.1, ..CaConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn shards_must_fit_the_halo() {
        let cfg = CaConfig {
            road_length:   20,
            strategy:      Strategy::Distributed,
            num_processes: 5,
            ..CaConfig::default()
        };
        // 4-site shards cannot hold a 5-site halo.
        assert!(cfg.validate().is_err());
        let cfg = CaConfig { num_processes: 4, ..cfg };
        cfg.validate().unwrap();
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_time": 50, "seed": 7 }}"#).unwrap();
        let cfg = CaConfig::load_json(file.path()).unwrap();
        assert_eq!(cfg.max_time, 50);
        assert_eq!(cfg.seed, 7);
    }
}
