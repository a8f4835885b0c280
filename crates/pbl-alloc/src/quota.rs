//! Teaching-lecturer quota per course.

use pbl_core::config::AllocationConfig;
use pbl_core::model::Module;
use serde::Serialize;

/// `max(0, modules × groups − core_slots) + coordinator_shortfall + team_shortfall`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Quota {
    pub base: u32,
    pub coordinator_shortfall: u32,
    pub team_shortfall: u32,
}

impl Quota {
    /// `team_found` above `team_size` is clamped, so the shortfall never
    /// goes negative.
    #[must_use]
    pub fn compute(
        modules: usize,
        groups: usize,
        config: &AllocationConfig,
        coordinator_found: bool,
        team_found: usize,
    ) -> Self {
        let core_slots = u64::from(config.core_slots());
        let demand = (modules as u64).saturating_mul(groups as u64);
        let base = u32::try_from(demand.saturating_sub(core_slots)).unwrap_or(u32::MAX);
        let team_found = u32::try_from(team_found).unwrap_or(u32::MAX);
        Self {
            base,
            coordinator_shortfall: u32::from(!coordinator_found),
            team_shortfall: config.team_size.saturating_sub(team_found),
        }
    }

    #[must_use]
    pub const fn total(&self) -> u32 {
        self.base
            .saturating_add(self.coordinator_shortfall)
            .saturating_add(self.team_shortfall)
    }
}

/// One teaching seat, labelled for the warning list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotTarget {
    pub pbl_id: u64,
    pub modul_ke: u32,
    pub label: String,
}

/// Spread `count` seats round-robin over the course's modules.
///
/// Seat `i` lands on module `i % modules` with label `Kelompok {i / modules + 1}`.
#[must_use]
pub fn slot_targets(modules: &[Module], count: u32) -> Vec<SlotTarget> {
    if modules.is_empty() {
        return Vec::new();
    }
    (0..count as usize)
        .map(|i| {
            let module = &modules[i % modules.len()];
            SlotTarget {
                pbl_id: module.id,
                modul_ke: module.modul_ke,
                label: format!("Kelompok {}", i / modules.len() + 1),
            }
        })
        .collect()
}
