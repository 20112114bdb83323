//! `VehicleRegistry`: the owning collection of every vehicle on a shard.
//!
//! Vehicles are kept sorted by `VehicleId`.  Ids are issued in increasing
//! order, so a spawn is almost always a push; migrants and prefilled
//! vehicles fall back to a binary-search insert.  Because the order is the
//! id order, the parallel phases can hand out `&mut [Vehicle]` chunks and
//! the coordinator still applies results deterministically by walking the
//! slice front to back.

use ca_core::VehicleId;

use crate::Vehicle;

#[derive(Clone, Debug, Default)]
pub struct VehicleRegistry {
    vehicles: Vec<Vehicle>,
}

impl VehicleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Add a vehicle, keeping id order.  A vehicle whose id is already
    /// present replaces the old entry.
    pub fn insert(&mut self, vehicle: Vehicle) {
        match self.vehicles.last() {
            Some(last) if last.id < vehicle.id => self.vehicles.push(vehicle),
            None => self.vehicles.push(vehicle),
            Some(_) => match self.vehicles.binary_search_by_key(&vehicle.id, |v| v.id) {
                Ok(i) => self.vehicles[i] = vehicle,
                Err(i) => self.vehicles.insert(i, vehicle),
            },
        }
    }

    pub fn extend(&mut self, vehicles: impl IntoIterator<Item = Vehicle>) {
        for v in vehicles {
            self.insert(v);
        }
    }

    pub fn get(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles
            .binary_search_by_key(&id, |v| v.id)
            .ok()
            .map(|i| &self.vehicles[i])
    }

    pub fn get_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles
            .binary_search_by_key(&id, |v| v.id)
            .ok()
            .map(|i| &mut self.vehicles[i])
    }

    #[inline]
    pub fn as_slice(&self) -> &[Vehicle] {
        &self.vehicles
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Vehicle] {
        &mut self.vehicles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vehicle> {
        self.vehicles.iter()
    }

    /// Remove and return, in id order, every vehicle whose position is at or
    /// past `lane_len`.
    pub fn drain_past(&mut self, lane_len: usize) -> Vec<Vehicle> {
        self.vehicles
            .extract_if(.., |v| v.position >= lane_len)
            .collect()
    }
}

impl<'a> IntoIterator for &'a VehicleRegistry {
    type Item = &'a Vehicle;
    type IntoIter = std::slice::Iter<'a, Vehicle>;

    fn into_iter(self) -> Self::IntoIter {
        self.vehicles.iter()
    }
}
