//! Capacity aggregation
//!
//! Decides how many overlapping bookings a candidate can absorb and how much
//! of that is already used. Three regimes exist:
//!
//! - **Solo** (no team): capacity 1, every live reservation of the profile counts
//! - **User pick**: the chosen staff member's own capacity, only their
//!   reservations count
//! - **Auto assign**: capacities of the eligible pool are summed and usage is
//!   `Σ min(overlaps(staff), capacity(staff))`; reservations without a staff
//!   member add to usage uncapped

use crate::models::{AssignmentMode, Profile, Reservation, StaffMember};

use super::overlap::{Interval, OverlapResolver, SlotStatus};

// ============================================================================
// Capacity Mode
// ============================================================================

/// Capacity regime of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapacityMode {
    /// The profile itself is the only resource
    Solo,

    /// Isolated capacity per staff member
    UserPick,

    /// Pooled capacity across eligible staff
    AutoAssign,
}

impl CapacityMode {
    /// Regime implied by the team settings of a profile
    pub fn for_profile(profile: &Profile) -> Self {
        if !profile.has_team() {
            return Self::Solo;
        }
        match profile.team.assignment_mode {
            AssignmentMode::UserPick => Self::UserPick,
            AssignmentMode::AutoAssign => Self::AutoAssign,
        }
    }

    /// Check if slots of different staff share one pool
    pub fn is_pooled(&self) -> bool {
        matches!(self, Self::AutoAssign)
    }
}

// ============================================================================
// Pool Members
// ============================================================================

/// One bookable resource together with its candidate interval
#[derive(Debug, Clone, Copy)]
pub struct PoolMember<'a> {
    /// `None` when the profile itself is the resource
    pub staff: Option<&'a StaffMember>,
    pub interval: Interval,
}

impl<'a> PoolMember<'a> {
    /// Resource of a solo profile
    pub fn solo(interval: Interval) -> Self {
        Self {
            staff: None,
            interval,
        }
    }

    /// Resource backed by a staff member
    pub fn staff(staff: &'a StaffMember, interval: Interval) -> Self {
        Self {
            staff: Some(staff),
            interval,
        }
    }

    /// Staff id, if any
    pub fn staff_id(&self) -> Option<&'a str> {
        self.staff.map(|s| s.id.as_str())
    }

    /// Own capacity of the resource
    pub fn capacity(&self) -> u32 {
        self.staff.map_or(1, StaffMember::capacity)
    }

    fn owns(&self, reservation: &Reservation) -> bool {
        match (self.staff, reservation.staff_id.as_deref()) {
            (Some(staff), Some(id)) => staff.id == id,
            _ => false,
        }
    }
}

/// Usage of a pool at one candidate
#[derive(Debug, Clone, Default)]
pub struct Occupancy<'a> {
    pub used: u32,
    pub total: u32,

    /// Reservations counted toward `used`
    pub conflicting: Vec<&'a Reservation>,
}

impl Occupancy<'_> {
    /// Check if no capacity is left
    pub fn is_exhausted(&self) -> bool {
        self.used >= self.total
    }

    /// Remaining capacity
    pub fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.used)
    }
}

// ============================================================================
// Capacity Aggregator
// ============================================================================

/// Computes capacity and usage for candidate slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityAggregator {
    mode: CapacityMode,
}

impl CapacityAggregator {
    /// Create an aggregator for a regime
    pub fn new(mode: CapacityMode) -> Self {
        Self { mode }
    }

    /// Aggregator for the regime of a profile
    pub fn for_profile(profile: &Profile) -> Self {
        Self::new(CapacityMode::for_profile(profile))
    }

    /// Active regime
    pub fn mode(&self) -> CapacityMode {
        self.mode
    }

    /// Capacity of a single staff member
    pub fn per_staff_capacity(staff: &StaffMember) -> u32 {
        staff.capacity()
    }

    /// Total capacity of a pool
    pub fn effective_capacity(&self, pool: &[PoolMember<'_>]) -> u32 {
        match self.mode {
            CapacityMode::Solo => 1,
            CapacityMode::UserPick | CapacityMode::AutoAssign => {
                pool.iter().map(PoolMember::capacity).sum()
            }
        }
    }

    /// Usage of a pool given the reservations of the day
    pub fn occupancy<'a>(
        &self,
        pool: &[PoolMember<'_>],
        reservations: &'a [Reservation],
        resolver: &OverlapResolver,
    ) -> Occupancy<'a> {
        let total = self.effective_capacity(pool);

        match self.mode {
            CapacityMode::Solo => {
                let conflicting: Vec<&Reservation> = pool
                    .first()
                    .map(|member| resolver.conflicting(&member.interval, reservations))
                    .unwrap_or_default();
                Occupancy {
                    used: conflicting.len() as u32,
                    total,
                    conflicting,
                }
            }
            CapacityMode::UserPick => {
                let mut occupancy = Occupancy {
                    total,
                    ..Default::default()
                };
                for member in pool {
                    let own = Self::own_conflicts(member, reservations, resolver);
                    occupancy.used += own.len() as u32;
                    occupancy.conflicting.extend(own);
                }
                occupancy
            }
            CapacityMode::AutoAssign => {
                let mut occupancy = Occupancy {
                    total,
                    ..Default::default()
                };
                for member in pool {
                    let own = Self::own_conflicts(member, reservations, resolver);
                    occupancy.used += (own.len() as u32).min(member.capacity());
                    occupancy.conflicting.extend(own);
                }

                // Unassigned bookings hold pooled capacity without a staff cap
                let unassigned = reservations.iter().filter(|r| {
                    r.staff_id.is_none()
                        && pool
                            .iter()
                            .any(|member| resolver.conflicts(&member.interval, r))
                });
                for reservation in unassigned {
                    occupancy.used += 1;
                    occupancy.conflicting.push(reservation);
                }
                occupancy
            }
        }
    }

    /// Status of a slot given the pool usage at its start
    pub fn status(
        &self,
        slot: &Interval,
        occupancy: &Occupancy<'_>,
        resolver: &OverlapResolver,
    ) -> SlotStatus {
        if occupancy.is_exhausted() {
            resolver.classify_exhausted(slot, &occupancy.conflicting)
        } else {
            SlotStatus::Free
        }
    }

    /// Pick the pool member with the fewest overlapping bookings that still
    /// has own capacity; ties go to the lighter day, then to pool order
    pub fn least_loaded<'p, 'a>(
        pool: &'p [PoolMember<'a>],
        reservations: &[Reservation],
        resolver: &OverlapResolver,
    ) -> Option<&'p PoolMember<'a>> {
        pool.iter()
            .filter_map(|member| {
                let overlapping = Self::own_conflicts(member, reservations, resolver).len() as u32;
                (overlapping < member.capacity()).then(|| {
                    let day_load = reservations
                        .iter()
                        .filter(|r| r.status.is_live() && member.owns(r))
                        .count();
                    (member, overlapping, day_load)
                })
            })
            .min_by_key(|(_, overlapping, day_load)| (*overlapping, *day_load))
            .map(|(member, _, _)| member)
    }

    fn own_conflicts<'a>(
        member: &PoolMember<'_>,
        reservations: &'a [Reservation],
        resolver: &OverlapResolver,
    ) -> Vec<&'a Reservation> {
        resolver.conflicting(
            &member.interval,
            reservations.iter().filter(|r| member.owns(r)),
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
