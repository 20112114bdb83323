//! A single vehicle: gap sensing, lane switching, and car-following movement.
//!
//! # Per-step protocol
//!
//! ```text
//! update_gaps        read-only scan of the road → gap fields
//! plan_lane_switch   eligibility + one prob_change draw → Option<target lane>
//! switch_lane        relocate on the road (coordinator only)
//! update_gaps        again, after every switch has been applied
//! advance            new speed / position from gap_forward (+ slow-down draw)
//! Road::apply_move   move the handle between sites (coordinator only)
//! ```
//!
//! `update_gaps`, `plan_lane_switch` and `advance` touch only the vehicle
//! itself and may run on any worker thread.  `perform_lane_switch` and
//! `perform_lane_move` bundle both halves for single-threaded callers.

use ca_core::{CaConfig, LaneId, VehicleId, VehicleRng};

use crate::Road;

// ── Parameters ───────────────────────────────────────────────────────────────

/// Driver behavior shared by every vehicle of a run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VehicleParams {
    pub max_speed:           u32,
    pub look_forward:        u32,
    pub look_other_forward:  u32,
    pub look_other_backward: u32,
    pub prob_slow_down:      f64,
    pub prob_change:         f64,
}

impl VehicleParams {
    pub fn from_config(config: &CaConfig) -> Self {
        Self {
            max_speed:           config.max_speed,
            look_forward:        config.look_forward,
            look_other_forward:  config.look_other_forward,
            look_other_backward: config.look_other_backward,
            prob_slow_down:      config.prob_slow_down,
            prob_change:         config.prob_change,
        }
    }
}

// ── Gaps ─────────────────────────────────────────────────────────────────────

/// Which adjacent lane.  The passing side is checked first.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Side {
    /// Next-higher lane ordinal.
    Passing,
    /// Next-lower lane ordinal.
    Inner,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Passing, Side::Inner];

    #[inline]
    fn slot(self) -> usize {
        match self {
            Side::Passing => 0,
            Side::Inner   => 1,
        }
    }
}

/// Gaps seen in one adjacent lane.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct OtherLaneGap {
    pub lane:     LaneId,
    pub forward:  u32,
    pub backward: u32,
}

/// Transient sensing results, rewritten by every `update_gaps`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Gaps {
    /// Empty sites ahead in the vehicle's own lane, capped at `look_forward`.
    pub forward: u32,
    /// Per side; `None` is the blocked sentinel (no lane there, or the site
    /// beside the vehicle is taken).
    other: [Option<OtherLaneGap>; 2],
}

impl Gaps {
    #[inline]
    pub fn other(&self, side: Side) -> Option<OtherLaneGap> {
        self.other[side.slot()]
    }
}

// ── Movement result ──────────────────────────────────────────────────────────

/// Outcome of one movement step, applied to the road by the coordinator.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct LaneMove {
    pub vehicle: VehicleId,
    pub lane:    LaneId,
    pub from:    usize,
    pub to:      usize,
    /// `to` is past the end of the lane: the vehicle leaves the road (or, on
    /// a non-final shard, migrates downstream).
    pub exits:   bool,
}

// ── Vehicle ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Vehicle {
    pub id:           VehicleId,
    /// Handle of the lane the vehicle currently occupies.
    pub lane:         LaneId,
    /// Site index within the lane (local to the shard).
    pub position:     usize,
    pub speed:        u32,
    pub params:       VehicleParams,
    /// Steps since spawn.
    pub time_on_road: u64,
    pub gaps:         Gaps,
    rng:              VehicleRng,
}

impl Vehicle {
    pub fn new(
        id:       VehicleId,
        lane:     LaneId,
        position: usize,
        speed:    u32,
        params:   VehicleParams,
        rng:      VehicleRng,
    ) -> Self {
        Self {
            id,
            lane,
            position,
            speed: speed.min(params.max_speed),
            params,
            time_on_road: 0,
            gaps: Gaps::default(),
            rng,
        }
    }

    /// Refresh all gap fields from the current road state.
    pub fn update_gaps(&mut self, road: &Road) {
        let p = self.params;
        self.gaps.forward = road.gap_ahead(self.lane, self.position, p.look_forward);

        for side in Side::ALL {
            self.gaps.other[side.slot()] = road.neighbor(self.lane, side).and_then(|other| {
                if road.has_vehicle_in_site(other, self.position) {
                    return None;
                }
                Some(OtherLaneGap {
                    lane:     other,
                    forward:  road.gap_ahead(other, self.position, p.look_other_forward),
                    backward: road.gap_behind(other, self.position, p.look_other_backward),
                })
            });
        }
    }

    /// Speed the vehicle would like to reach this step.
    #[inline]
    pub fn desired_speed(&self) -> u32 {
        (self.speed + 1).min(self.params.max_speed)
    }

    /// First side whose gaps make a switch worthwhile and safe.
    pub fn switch_candidate(&self) -> Option<LaneId> {
        let gap = self.gaps.forward;
        if gap >= self.desired_speed() {
            return None;
        }
        Side::ALL.into_iter().find_map(|side| {
            self.gaps
                .other(side)
                .filter(|o| o.forward > gap && o.backward >= self.params.look_other_backward)
                .map(|o| o.lane)
        })
    }

    /// Decide this step's lane switch from the current gaps.
    ///
    /// Draws from the vehicle's RNG only when a switch is eligible, so the
    /// draw sequence depends on nothing but this vehicle's own history.
    pub fn plan_lane_switch(&mut self) -> Option<LaneId> {
        let target = self.switch_candidate()?;
        self.rng.gen_bool(self.params.prob_change).then_some(target)
    }

    /// Relocate to `target` at the same site index.
    ///
    /// Returns `false` (and leaves everything unchanged) if the destination
    /// site is already taken.
    pub fn switch_lane(&mut self, road: &mut Road, target: LaneId) -> bool {
        if !road.relocate(self.id, self.lane, target, self.position) {
            return false;
        }
        self.lane = target;
        true
    }

    /// Plan and apply in one go.
    pub fn perform_lane_switch(&mut self, road: &mut Road) -> bool {
        match self.plan_lane_switch() {
            Some(target) => self.switch_lane(road, target),
            None => false,
        }
    }

    /// Car-following update of speed and position.
    ///
    /// Does not touch the road; apply the returned move with
    /// [`Road::apply_move`].
    pub fn advance(&mut self, lane_len: usize) -> LaneMove {
        let mut speed = self.desired_speed().min(self.gaps.forward);
        if self.rng.gen_bool(self.params.prob_slow_down) {
            speed = speed.saturating_sub(1);
        }
        let from = self.position;
        self.speed = speed;
        self.position += speed as usize;
        self.time_on_road += 1;

        LaneMove {
            vehicle: self.id,
            lane:    self.lane,
            from,
            to:      self.position,
            exits:   self.position >= lane_len,
        }
    }

    /// Advance and update the road in one go.
    pub fn perform_lane_move(&mut self, road: &mut Road) -> LaneMove {
        let mv = self.advance(road.len());
        road.apply_move(&mv);
        mv
    }

    /// Simulated seconds spent on the road.
    #[inline]
    pub fn travel_time(&self, step_secs: f64) -> f64 {
        self.time_on_road as f64 * step_secs
    }
}
