//! Unit tests for ca-road.

#[cfg(test)]
mod fixtures {
    use std::sync::Arc;

    use ca_core::{CaConfig, EmpiricalCdf, LaneId, ProcessTopology, VehicleId, VehicleRng};

    use crate::{Road, Vehicle, VehicleParams};

    /// No randomness: never slow down, always switch when eligible.
    pub fn config(road_length: usize, num_lanes: usize) -> CaConfig {
        CaConfig {
            road_length,
            num_lanes,
            max_speed: 2,
            prob_slow_down: 0.0,
            prob_change: 1.0,
            look_forward: 5,
            look_other_forward: 5,
            look_other_backward: 5,
            ..CaConfig::default()
        }
    }

    /// Every interarrival is exactly 5 s.
    pub fn constant_cdf() -> Arc<EmpiricalCdf> {
        Arc::new(EmpiricalCdf::from_points(&[(5.0, 0.0), (5.0, 1.0)]).unwrap())
    }

    pub fn road(config: &CaConfig) -> Road {
        Road::new(config, ProcessTopology::single(), constant_cdf()).unwrap()
    }

    pub fn sharded(config: &CaConfig, rank: usize, size: usize) -> Road {
        Road::new(config, ProcessTopology::new(rank, size), constant_cdf()).unwrap()
    }

    /// Create a vehicle and register it on the road.
    pub fn put(road: &mut Road, config: &CaConfig, id: u64, lane: u32, site: usize, speed: u32) -> Vehicle {
        let id = VehicleId(id);
        let v = Vehicle::new(
            id,
            LaneId(lane),
            site,
            speed,
            VehicleParams::from_config(config),
            VehicleRng::new(config.seed, id),
        );
        road.place(&v);
        v
    }
}

#[cfg(test)]
mod gaps {
    use ca_core::LaneId;

    use super::fixtures::{config, put, road};
    use crate::Side;

    #[test]
    fn forward_gap_stops_at_next_vehicle() {
        let cfg = config(10, 1);
        let mut road = road(&cfg);
        let mut v = put(&mut road, &cfg, 0, 0, 2, 0);
        put(&mut road, &cfg, 1, 0, 5, 0);
        v.update_gaps(&road);
        assert_eq!(v.gaps.forward, 2);
    }

    #[test]
    fn off_road_sites_count_as_empty() {
        let cfg = config(10, 1);
        let mut road = road(&cfg);
        let mut v = put(&mut road, &cfg, 0, 0, 8, 0);
        v.update_gaps(&road);
        assert_eq!(v.gaps.forward, 5);
        assert_eq!(road.gap_behind(LaneId(0), 1, 5), 5);
    }

    #[test]
    fn adjacent_vehicle_blocks_side() {
        let cfg = config(10, 2);
        let mut road = road(&cfg);
        let mut v = put(&mut road, &cfg, 0, 0, 3, 0);
        put(&mut road, &cfg, 1, 1, 3, 0);
        v.update_gaps(&road);
        assert!(v.gaps.other(Side::Passing).is_none());
        assert!(v.gaps.other(Side::Inner).is_none(), "lane 0 has no inner neighbor");
    }

    #[test]
    fn other_lane_gaps_measured_from_beside_the_vehicle() {
        let cfg = config(20, 2);
        let mut road = road(&cfg);
        let mut v = put(&mut road, &cfg, 0, 0, 10, 0);
        put(&mut road, &cfg, 1, 1, 13, 0);
        put(&mut road, &cfg, 2, 1, 8, 0);
        v.update_gaps(&road);
        let other = v.gaps.other(Side::Passing).unwrap();
        assert_eq!(other.lane, LaneId(1));
        assert_eq!(other.forward, 2);
        assert_eq!(other.backward, 1);
    }

    #[test]
    fn neighbors_respect_lane_bounds() {
        let cfg = config(10, 3);
        let road = road(&cfg);
        assert_eq!(road.neighbor(LaneId(0), Side::Inner), None);
        assert_eq!(road.neighbor(LaneId(0), Side::Passing), Some(LaneId(1)));
        assert_eq!(road.neighbor(LaneId(2), Side::Passing), None);
        assert_eq!(road.neighbor(LaneId(2), Side::Inner), Some(LaneId(1)));
    }
}

#[cfg(test)]
mod lane_switch {
    use ca_core::{CaConfig, LaneId};

    use super::fixtures::{config, put, road};

    #[test]
    fn blocked_vehicle_moves_to_free_lane() {
        let cfg = config(20, 2);
        let mut road = road(&cfg);
        let mut v = put(&mut road, &cfg, 0, 0, 0, 0);
        put(&mut road, &cfg, 1, 0, 1, 0);
        v.update_gaps(&road);
        assert_eq!(v.gaps.forward, 0);
        assert_eq!(v.switch_candidate(), Some(LaneId(1)));
        assert!(v.perform_lane_switch(&mut road));
        assert_eq!(v.lane, LaneId(1));
        assert!(road.has_vehicle_in_site(LaneId(1), 0));
        assert!(!road.has_vehicle_in_site(LaneId(0), 0));
    }

    #[test]
    fn free_road_ahead_means_no_switch() {
        let cfg = config(20, 2);
        let mut road = road(&cfg);
        let mut v = put(&mut road, &cfg, 0, 0, 0, 0);
        v.update_gaps(&road);
        assert_eq!(v.switch_candidate(), None);
    }

    #[test]
    fn short_backward_window_blocks_switch() {
        let cfg = config(20, 2);
        let mut road = road(&cfg);
        let mut v = put(&mut road, &cfg, 0, 0, 6, 0);
        put(&mut road, &cfg, 1, 0, 7, 0);
        put(&mut road, &cfg, 2, 1, 4, 0);
        v.update_gaps(&road);
        assert_eq!(v.switch_candidate(), None);
    }

    #[test]
    fn zero_change_probability_never_switches() {
        let cfg = CaConfig { prob_change: 0.0, ..config(20, 2) };
        let mut road = road(&cfg);
        let mut v = put(&mut road, &cfg, 0, 0, 0, 0);
        put(&mut road, &cfg, 1, 0, 1, 0);
        v.update_gaps(&road);
        assert!(v.switch_candidate().is_some());
        assert_eq!(v.plan_lane_switch(), None);
    }

    #[test]
    fn passing_side_preferred() {
        let cfg = config(20, 3);
        let mut road = road(&cfg);
        let mut v = put(&mut road, &cfg, 0, 1, 0, 0);
        put(&mut road, &cfg, 1, 1, 1, 0);
        v.update_gaps(&road);
        assert_eq!(v.switch_candidate(), Some(LaneId(2)));
    }

    #[test]
    fn second_claim_on_a_site_is_refused() {
        let cfg = config(20, 3);
        let mut road = road(&cfg);
        let mut a = put(&mut road, &cfg, 0, 0, 3, 0);
        let mut b = put(&mut road, &cfg, 1, 2, 3, 0);
        assert!(a.switch_lane(&mut road, LaneId(1)));
        assert!(!b.switch_lane(&mut road, LaneId(1)));
        assert_eq!(b.lane, LaneId(2));
        assert_eq!(road.max_site_occupancy(), 1);
    }
}

#[cfg(test)]
mod movement {
    use ca_core::LaneId;

    use super::fixtures::{config, put, road};

    #[test]
    fn accelerates_one_site_per_step() {
        let cfg = config(10, 1);
        let mut road = road(&cfg);
        let mut v = put(&mut road, &cfg, 0, 0, 0, 0);

        v.update_gaps(&road);
        v.perform_lane_move(&mut road);
        assert_eq!((v.speed, v.position), (1, 1));

        v.update_gaps(&road);
        v.perform_lane_move(&mut road);
        assert_eq!((v.speed, v.position), (2, 3));
        assert_eq!(v.time_on_road, 2);
        assert!(road.has_vehicle_in_site(LaneId(0), 3));
        assert!(!road.has_vehicle_in_site(LaneId(0), 0));
    }

    #[test]
    fn speed_limited_by_gap() {
        let cfg = config(10, 1);
        let mut road = road(&cfg);
        let mut v = put(&mut road, &cfg, 0, 0, 0, 2);
        put(&mut road, &cfg, 1, 0, 2, 0);
        v.update_gaps(&road);
        let mv = v.perform_lane_move(&mut road);
        assert_eq!(v.speed, 1);
        assert_eq!((mv.from, mv.to, mv.exits), (0, 1, false));
    }

    #[test]
    fn moving_past_the_end_exits() {
        let cfg = config(10, 1);
        let mut road = road(&cfg);
        let mut v = put(&mut road, &cfg, 0, 0, 9, 2);
        v.update_gaps(&road);
        let mv = v.perform_lane_move(&mut road);
        assert!(mv.exits);
        assert_eq!(v.position, 11);
        assert_eq!(road.max_site_occupancy(), 0);
    }

    #[test]
    fn certain_slow_down_keeps_stopped_vehicle_stopped() {
        let cfg = ca_core::CaConfig { prob_slow_down: 1.0, ..config(10, 1) };
        let mut road = road(&cfg);
        let mut v = put(&mut road, &cfg, 0, 0, 0, 0);
        v.update_gaps(&road);
        v.perform_lane_move(&mut road);
        assert_eq!((v.speed, v.position), (0, 0));
        assert_eq!(v.time_on_road, 1);
    }

    #[test]
    fn travel_time_in_seconds() {
        let cfg = config(10, 1);
        let mut road = road(&cfg);
        let mut v = put(&mut road, &cfg, 0, 0, 0, 0);
        v.time_on_road = 8;
        assert!((v.travel_time(0.5) - 4.0).abs() < 1e-12);
    }
}

#[cfg(test)]
mod spawn {
    use ca_core::{CaConfig, LaneId, SimRng, VehicleId};

    use super::fixtures::{config, put, road};
    use crate::VehicleParams;

    fn spawn_once(road: &mut crate::Road, cfg: &CaConfig, rng: &mut SimRng, next: &mut VehicleId) -> Vec<crate::Vehicle> {
        let clock = cfg.make_clock();
        road.attempt_spawn(rng, next, VehicleParams::from_config(cfg), cfg.seed, &clock)
    }

    #[test]
    fn countdown_from_interarrival_sample() {
        let cfg = CaConfig { step_secs: 0.5, ..config(10, 1) };
        let mut road = road(&cfg);
        let mut rng = SimRng::new(cfg.seed);
        let mut next = VehicleId(0);

        let spawned = spawn_once(&mut road, &cfg, &mut rng, &mut next);
        assert_eq!(spawned.len(), 1);
        assert_eq!(spawned[0].id, VehicleId(0));
        assert_eq!(spawned[0].speed, cfg.max_speed);
        assert_eq!(next, VehicleId(1));
        assert_eq!(road.lane(LaneId(0)).spawn_countdown(), 10);

        road.lane_mut(LaneId(0)).remove_vehicle(0, VehicleId(0));
        for remaining in (0..10).rev() {
            assert!(spawn_once(&mut road, &cfg, &mut rng, &mut next).is_empty());
            assert_eq!(road.lane(LaneId(0)).spawn_countdown(), remaining);
        }
        assert_eq!(spawn_once(&mut road, &cfg, &mut rng, &mut next).len(), 1);
    }

    #[test]
    fn blocked_entrance_defers_without_consuming_countdown() {
        let cfg = config(10, 1);
        let mut road = road(&cfg);
        put(&mut road, &cfg, 99, 0, 0, 0);
        let mut rng = SimRng::new(cfg.seed);
        let mut next = VehicleId(0);

        assert!(spawn_once(&mut road, &cfg, &mut rng, &mut next).is_empty());
        assert_eq!(road.lane(LaneId(0)).spawn_countdown(), 0);
        assert_eq!(next, VehicleId(0));

        road.lane_mut(LaneId(0)).remove_vehicle(0, VehicleId(99));
        assert_eq!(spawn_once(&mut road, &cfg, &mut rng, &mut next).len(), 1);
    }

    #[test]
    fn every_lane_spawns_in_lane_order() {
        let cfg = config(10, 3);
        let mut road = road(&cfg);
        let mut rng = SimRng::new(cfg.seed);
        let mut next = VehicleId(7);
        let spawned = spawn_once(&mut road, &cfg, &mut rng, &mut next);
        let lanes: Vec<_> = spawned.iter().map(|v| (v.id, v.lane)).collect();
        assert_eq!(
            lanes,
            vec![
                (VehicleId(7), LaneId(0)),
                (VehicleId(8), LaneId(1)),
                (VehicleId(9), LaneId(2)),
            ]
        );
    }

    #[test]
    fn certain_slow_down_spawns_stopped() {
        let cfg = CaConfig { prob_slow_down: 1.0, ..config(10, 1) };
        let mut road = road(&cfg);
        let mut rng = SimRng::new(cfg.seed);
        let mut next = VehicleId(0);
        let spawned = spawn_once(&mut road, &cfg, &mut rng, &mut next);
        assert_eq!(spawned[0].speed, 0);
    }

    #[test]
    fn only_first_rank_spawns() {
        let cfg = config(20, 1);
        let mut road = super::fixtures::sharded(&cfg, 1, 2);
        let mut rng = SimRng::new(cfg.seed);
        let mut next = VehicleId(0);
        assert!(spawn_once(&mut road, &cfg, &mut rng, &mut next).is_empty());
    }
}

#[cfg(test)]
mod sharding {
    use ca_core::{CaConfig, LaneId, ProcessTopology, VehicleId};

    use super::fixtures::{config, constant_cdf, put, sharded};
    use crate::{Halo, Road, VehicleParams};

    #[test]
    fn halo_extends_forward_scan() {
        let cfg = config(20, 1);
        let mut road = sharded(&cfg, 0, 2);
        assert_eq!(road.len(), 10);
        road.set_halo(Halo {
            ahead:  Some(vec![vec![false, true, false, false, false]]),
            behind: None,
        });
        assert_eq!(road.gap_ahead(LaneId(0), 9, 5), 1);
        assert!(road.is_occupied(LaneId(0), 11));
        assert!(!road.is_occupied(LaneId(0), -1));
    }

    #[test]
    fn halo_extends_backward_scan() {
        let cfg = config(20, 1);
        let mut road = sharded(&cfg, 1, 2);
        assert_eq!(road.global_site(0), 10);
        road.set_halo(Halo { ahead: None, behind: Some(vec![vec![false, false, true]]) });
        assert_eq!(road.gap_behind(LaneId(0), 0, 5), 2);
    }

    #[test]
    fn edges_report_boundary_sites() {
        let cfg = config(20, 1);
        let mut road = sharded(&cfg, 0, 2);
        put(&mut road, &cfg, 0, 0, 0, 0);
        put(&mut road, &cfg, 1, 0, 8, 0);
        let edges = road.edges();
        assert_eq!(edges.leading, vec![vec![true, false, false, false, false]]);
        assert_eq!(edges.trailing, vec![vec![false, true, false, false, false]]);
    }

    #[test]
    fn narrow_shards_rejected() {
        let cfg = config(8, 1);
        let err = Road::new(&cfg, ProcessTopology::new(0, 2), constant_cdf());
        assert!(err.is_err());
    }

    #[test]
    fn prefill_ids_do_not_depend_on_sharding() {
        let cfg = CaConfig { initial_density: 0.3, ..config(40, 2) };
        let params = VehicleParams::from_config(&cfg);

        let mut whole = super::fixtures::road(&cfg);
        let mut ids: Vec<VehicleId> = whole.prefill(cfg.initial_density, params, cfg.seed).iter().map(|v| v.id).collect();
        ids.sort();

        let mut split = Vec::new();
        for rank in 0..2 {
            let mut shard = sharded(&cfg, rank, 2);
            split.extend(shard.prefill(cfg.initial_density, params, cfg.seed).iter().map(|v| v.id));
        }
        split.sort();

        assert!(!ids.is_empty());
        assert_eq!(ids, split);
        assert_eq!(whole.first_spawn_id(cfg.initial_density), VehicleId(80));
    }

    #[test]
    fn full_density_fills_every_site() {
        let cfg = CaConfig { initial_density: 1.0, ..config(10, 2) };
        let mut road = super::fixtures::road(&cfg);
        let vehicles = road.prefill(1.0, VehicleParams::from_config(&cfg), cfg.seed);
        assert_eq!(vehicles.len(), 20);
        assert_eq!(vehicles[13].id, VehicleId(13));
        assert_eq!(vehicles[13].lane, LaneId(1));
        assert_eq!(vehicles[13].position, 3);
        assert_eq!(road.lane(LaneId(1)).to_string(), "oooooooooo");
    }

    #[test]
    fn zero_density_starts_ids_at_zero() {
        let cfg = config(10, 2);
        let road = super::fixtures::road(&cfg);
        assert_eq!(road.first_spawn_id(0.0), VehicleId(0));
    }
}

#[cfg(test)]
mod lane {
    use ca_core::{LaneId, VehicleId};

    use crate::Lane;

    #[test]
    fn display_marks_occupancy() {
        let mut lane = Lane::new(LaneId(0), 5);
        lane.add_vehicle(1, VehicleId(0));
        lane.add_vehicle(3, VehicleId(1));
        lane.add_vehicle(3, VehicleId(2));
        assert_eq!(lane.to_string(), ".o.*.");
    }

    #[test]
    fn removal_keeps_arrival_order() {
        let mut lane = Lane::new(LaneId(0), 3);
        for id in 0..3 {
            lane.add_vehicle(2, VehicleId(id));
        }
        assert!(lane.remove_vehicle(2, VehicleId(0)));
        assert_eq!(lane.front(2), Some(VehicleId(1)));
        assert!(!lane.remove_vehicle(2, VehicleId(0)));
        assert!(!lane.remove_vehicle(7, VehicleId(1)));
        assert_eq!(lane.occupancy(2), 2);
    }

    #[test]
    fn out_of_range_site_is_empty() {
        let lane = Lane::new(LaneId(0), 3);
        assert!(!lane.has_vehicle_in_site(3));
        assert_eq!(lane.occupancy(99), 0);
    }
}

#[cfg(test)]
mod registry {
    use ca_core::VehicleId;

    use super::fixtures::{config, put, road};
    use crate::VehicleRegistry;

    #[test]
    fn keeps_id_order() {
        let cfg = config(10, 1);
        let mut road = road(&cfg);
        let mut reg = VehicleRegistry::new();
        for (id, site) in [(5, 1), (2, 3), (9, 5), (0, 7)] {
            reg.insert(put(&mut road, &cfg, id, 0, site, 0));
        }
        let ids: Vec<_> = reg.iter().map(|v| v.id.0).collect();
        assert_eq!(ids, vec![0, 2, 5, 9]);
        assert_eq!(reg.get(VehicleId(9)).unwrap().position, 5);
        assert!(reg.get(VehicleId(3)).is_none());
    }

    #[test]
    fn drain_past_splits_by_position() {
        let cfg = config(10, 1);
        let mut road = road(&cfg);
        let mut reg = VehicleRegistry::new();
        reg.extend((0..4).map(|i| put(&mut road, &cfg, i, 0, i as usize * 2, 0)));
        reg.get_mut(VehicleId(1)).unwrap().position = 12;
        reg.get_mut(VehicleId(3)).unwrap().position = 10;

        let gone: Vec<_> = reg.drain_past(10).iter().map(|v| v.id.0).collect();
        assert_eq!(gone, vec![1, 3]);
        let kept: Vec<_> = reg.iter().map(|v| v.id.0).collect();
        assert_eq!(kept, vec![0, 2]);

        assert!(reg.drain_past(10).is_empty());
        assert_eq!(reg.len(), 2);
    }
}
