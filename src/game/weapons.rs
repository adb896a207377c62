//! Weapon slots and the per-team activation state machine

use serde::{Deserialize, Serialize};

/// Weapon types a team carries into a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    Bazooka,
    Shotgun,
    Minigun,
    HandGrenade,
    HolyGrenade,
    Dynamite,
    Jetpack,
    Drill,
    NinjaRope,
}

impl WeaponKind {
    /// Toggleable weapons can be switched off by firing again while active;
    /// everything else stays active until the turn transition deactivates it.
    pub fn is_toggleable(self) -> bool {
        matches!(self, WeaponKind::Jetpack | WeaponKind::NinjaRope)
    }
}

/// Default armament every team starts the match with
pub const DEFAULT_LOADOUT: &[(WeaponKind, u32)] = &[
    (WeaponKind::Bazooka, 15),
    (WeaponKind::Shotgun, 99),
    (WeaponKind::Minigun, 5),
    (WeaponKind::HandGrenade, 2),
    (WeaponKind::HolyGrenade, 1),
    (WeaponKind::Dynamite, 2),
    (WeaponKind::Jetpack, 1),
    (WeaponKind::Drill, 5),
    (WeaponKind::NinjaRope, 1),
];

/// Weapon activation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponStatus {
    Inactive,
    Powerup,
    Active,
}

/// One armament slot: a weapon type and its remaining ammo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponSlot {
    pub kind: WeaponKind,
    pub ammo: u32,
}

/// Per-team weapon state machine.
///
/// Transitions: inactive -> (select) -> inactive -> (fire) -> active
/// -> (turn transition, or toggle-off fire) -> inactive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponsState {
    pub slots: Vec<WeaponSlot>,
    /// Currently selected slot index
    pub selected: usize,
    pub status: WeaponStatus,
    /// Impulse recorded at the last activation
    pub impulse: f32,
}

impl WeaponsState {
    /// Build the state with the default match loadout
    pub fn with_default_loadout() -> Self {
        Self {
            slots: DEFAULT_LOADOUT
                .iter()
                .map(|&(kind, ammo)| WeaponSlot { kind, ammo })
                .collect(),
            selected: 0,
            status: WeaponStatus::Inactive,
            impulse: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == WeaponStatus::Active
    }

    /// The currently selected slot
    pub fn current(&self) -> &WeaponSlot {
        &self.slots[self.selected]
    }

    /// Select a weapon slot.
    ///
    /// Fails while a weapon is active, for out-of-range slots and for slots
    /// with no ammo left; the selection is unchanged on failure.
    pub fn select(&mut self, slot: usize) -> bool {
        if self.is_active() {
            return false;
        }
        if slot >= self.slots.len() {
            return false;
        }
        if self.slots[slot].ammo == 0 {
            return false;
        }

        self.selected = slot;
        true
    }

    /// Fire the selected weapon.
    ///
    /// Returns true iff a fresh activation occurred. Firing an active
    /// toggleable weapon switches it off instead (no ammo consumed) and
    /// returns false, as does firing a depleted slot.
    pub fn fire(&mut self, impulse: f32) -> bool {
        if self.is_active() && self.current().kind.is_toggleable() {
            self.deactivate();
            return false;
        }

        if self.current().ammo == 0 {
            return false;
        }

        self.status = WeaponStatus::Active;
        self.impulse = impulse;
        self.slots[self.selected].ammo -= 1;

        true
    }

    /// Reset activation; invoked unconditionally at each turn transition
    pub fn deactivate(&mut self) {
        self.impulse = 0.0;
        self.status = WeaponStatus::Inactive;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JETPACK: usize = 6;
    const HOLY_GRENADE: usize = 4;

    fn depleted(weapons: &mut WeaponsState, slot: usize) {
        weapons.slots[slot].ammo = 0;
    }

    #[test]
    fn test_select_empty_slot_fails() {
        let mut weapons = WeaponsState::with_default_loadout();
        depleted(&mut weapons, 2);

        assert!(!weapons.select(2));
        assert_eq!(weapons.selected, 0);
    }

    #[test]
    fn test_select_out_of_range_fails() {
        let mut weapons = WeaponsState::with_default_loadout();

        assert!(!weapons.select(99));
        assert_eq!(weapons.selected, 0);
    }

    #[test]
    fn test_select_rejected_while_active() {
        let mut weapons = WeaponsState::with_default_loadout();
        assert!(weapons.fire(0.7));

        assert!(!weapons.select(1));
        assert_eq!(weapons.selected, 0);
    }

    #[test]
    fn test_fire_consumes_ammo_and_activates() {
        let mut weapons = WeaponsState::with_default_loadout();
        assert!(weapons.select(HOLY_GRENADE));

        assert!(weapons.fire(0.5));
        assert_eq!(weapons.status, WeaponStatus::Active);
        assert_eq!(weapons.impulse, 0.5);
        assert_eq!(weapons.current().ammo, 0);
    }

    #[test]
    fn test_fire_with_no_ammo_fails() {
        let mut weapons = WeaponsState::with_default_loadout();
        assert!(weapons.select(HOLY_GRENADE));
        assert!(weapons.fire(0.5));
        weapons.deactivate();

        assert!(!weapons.fire(0.5));
        assert_eq!(weapons.status, WeaponStatus::Inactive);
    }

    #[test]
    fn test_toggleable_fire_again_deactivates_without_ammo_cost() {
        let mut weapons = WeaponsState::with_default_loadout();
        assert!(weapons.select(JETPACK));
        assert!(weapons.fire(1.0));
        let ammo_after_activation = weapons.current().ammo;

        // Second fire toggles off: no activation, no ammo consumed.
        assert!(!weapons.fire(1.0));
        assert_eq!(weapons.status, WeaponStatus::Inactive);
        assert_eq!(weapons.impulse, 0.0);
        assert_eq!(weapons.current().ammo, ammo_after_activation);
    }

    #[test]
    fn test_deactivate_resets_status_and_impulse() {
        let mut weapons = WeaponsState::with_default_loadout();
        assert!(weapons.fire(0.9));

        weapons.deactivate();
        assert_eq!(weapons.status, WeaponStatus::Inactive);
        assert_eq!(weapons.impulse, 0.0);
    }
}
