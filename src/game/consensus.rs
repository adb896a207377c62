//! Untrusted-client consensus over reported combat events.
//!
//! Every connected client runs its own physics and reports the hits and
//! explosions it saw; the server applies exactly one outcome per physical
//! event. Resolution is an optimistic-majority scheme: a designated authority
//! corroborating at least one earlier report resolves immediately, and full
//! unanimity resolves regardless of who reports. Records only make sense
//! within the turn they were created in and are discarded on turn advance.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::ws::protocol::{DamageClaim, ExplosionArgs};

/// Counter value marking a record as already applied
const APPLIED_SENTINEL: i32 = -999;

/// Outcome of observing one report
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict<P> {
    /// Not enough corroboration yet
    Pending,
    /// This report resolved the event; apply the payload exactly once
    Resolved(P),
    /// The event was already applied; ignore
    AlreadyApplied,
}

#[derive(Debug, Clone)]
struct ConsensusRecord<P> {
    count: i32,
    payload: P,
}

/// Per-turn corroboration ledger for one event family
#[derive(Debug)]
pub struct ConsensusLedger<P> {
    records: HashMap<String, ConsensusRecord<P>>,
    /// Unanimity threshold: the session's participant capacity
    capacity: usize,
}

impl<P: Clone> ConsensusLedger<P> {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: HashMap::new(),
            capacity,
        }
    }

    /// Record one report and decide whether it resolves the event.
    ///
    /// `from_authority` marks a report from the currently drawn authority
    /// participant; the authority fast path additionally requires that at
    /// least one prior report exists for the fingerprint. The stored payload
    /// is always the most recently reported one.
    pub fn observe(&mut self, fingerprint: String, payload: P, from_authority: bool) -> Verdict<P> {
        let record = match self.records.entry(fingerprint) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(ConsensusRecord {
                count: 0,
                payload: payload.clone(),
            }),
        };

        if record.count == APPLIED_SENTINEL {
            return Verdict::AlreadyApplied;
        }

        let prior = record.count;
        record.count += 1;
        record.payload = payload;

        if (from_authority && prior >= 1) || record.count >= self.capacity as i32 {
            record.count = APPLIED_SENTINEL;
            return Verdict::Resolved(record.payload.clone());
        }

        Verdict::Pending
    }

    /// Forget everything; fingerprints are only valid within one turn
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Canonical fingerprint of a damage claim
pub fn damage_fingerprint(claim: &DamageClaim) -> String {
    format!("{}-{}-{}", claim.participant_id, claim.bird_slot, claim.damage)
}

/// Canonical fingerprint of an explosion: the impact position collapses onto
/// a coarse grid (summed coordinates rounded up to a multiple of 10) so that
/// slightly divergent client simulations still agree on the same event.
pub fn explosion_fingerprint(args: &ExplosionArgs) -> String {
    let bucket = ((args.origin.x + args.origin.y) / 10.0).ceil() as i64 * 10;
    format!("{}-{}-{}", bucket, args.shape, args.kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::Point;
    use uuid::Uuid;

    fn claim(damage: u16) -> DamageClaim {
        DamageClaim {
            participant_id: Uuid::nil(),
            bird_slot: 0,
            damage,
        }
    }

    #[test]
    fn test_unanimity_resolves_exactly_once() {
        let mut ledger: ConsensusLedger<DamageClaim> = ConsensusLedger::new(2);
        let fp = damage_fingerprint(&claim(40));

        assert_eq!(
            ledger.observe(fp.clone(), claim(40), false),
            Verdict::Pending
        );
        assert!(matches!(
            ledger.observe(fp.clone(), claim(40), false),
            Verdict::Resolved(_)
        ));
        // Any further report, authority or not, is a stale duplicate.
        assert_eq!(
            ledger.observe(fp.clone(), claim(40), true),
            Verdict::AlreadyApplied
        );
        assert_eq!(
            ledger.observe(fp, claim(40), false),
            Verdict::AlreadyApplied
        );
    }

    #[test]
    fn test_authority_never_resolves_first_report() {
        let mut ledger: ConsensusLedger<DamageClaim> = ConsensusLedger::new(4);
        let fp = damage_fingerprint(&claim(25));

        // Fresh fingerprint: even the authority only files a first report.
        assert_eq!(ledger.observe(fp, claim(25), true), Verdict::Pending);
    }

    #[test]
    fn test_authority_with_prior_report_resolves_early() {
        let mut ledger: ConsensusLedger<DamageClaim> = ConsensusLedger::new(4);
        let fp = damage_fingerprint(&claim(25));

        assert_eq!(
            ledger.observe(fp.clone(), claim(25), false),
            Verdict::Pending
        );
        // Second report from the authority: resolved well below unanimity.
        assert!(matches!(
            ledger.observe(fp, claim(25), true),
            Verdict::Resolved(_)
        ));
    }

    #[test]
    fn test_resolution_carries_latest_payload() {
        let mut ledger: ConsensusLedger<u32> = ConsensusLedger::new(2);

        assert_eq!(ledger.observe("fp".to_string(), 1, false), Verdict::Pending);
        assert_eq!(
            ledger.observe("fp".to_string(), 2, false),
            Verdict::Resolved(2)
        );
    }

    #[test]
    fn test_clear_forgets_applied_records() {
        let mut ledger: ConsensusLedger<u32> = ConsensusLedger::new(2);
        ledger.observe("fp".to_string(), 1, false);
        ledger.observe("fp".to_string(), 1, false);
        assert_eq!(
            ledger.observe("fp".to_string(), 1, false),
            Verdict::AlreadyApplied
        );

        ledger.clear();
        assert!(ledger.is_empty());
        // After a turn transition the same fingerprint is a fresh event.
        assert_eq!(ledger.observe("fp".to_string(), 1, false), Verdict::Pending);
    }

    #[test]
    fn test_explosion_fingerprint_buckets_nearby_impacts() {
        let near = |x: f32, y: f32| ExplosionArgs {
            origin: Point { x, y },
            shape: 2,
            kind: 1,
            radius: 60.0,
            power: 0.8,
            caused_by: "bazooka".to_string(),
        };

        assert_eq!(
            explosion_fingerprint(&near(101.0, 52.0)),
            explosion_fingerprint(&near(103.5, 55.0))
        );
        assert_ne!(
            explosion_fingerprint(&near(101.0, 52.0)),
            explosion_fingerprint(&near(300.0, 52.0))
        );
    }
}
