//! Roster cache with TTL.
//!
//! The bootstrap endpoint deposits each credential's playable characters
//! here; sessions read them back exactly once per join. Entries live for an
//! hour and are pruned opportunistically on insert.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::bird::{Attribute, SkinAttributes};
use crate::util::draw::DrawPool;

/// Cached rosters are normalized to this many characters
pub const ROSTER_CHUNK: usize = 10;

const ROSTER_TTL_SECS: i64 = 3600;

/// Placeholder names for characters that arrive without one
const NAME_POOL: &[&str] = &[
    "Anders Hejlsberg",
    "Grace Hopper",
    "Rich Hickey",
    "Barbara Liskov",
    "Dennis Ritchie",
    "Brian Kernighan",
    "Leslie Lamport",
    "Butler Lampson",
    "Alan Kay",
    "Ada Lovelace",
    "Niklaus Wirth",
    "Bjarne Stroustrup",
    "Guido van Rossum",
    "Roberto Ierusalimschy",
    "Chris Lattner",
    "Graydon Hoare",
    "Sam Lantinga",
    "John Carmack",
    "Margaret Hamilton",
    "Ken Thompson",
    "Rasmus Lerdorf",
    "Linus Torvalds",
];

const BODY_SKINS: &[&str] = &["Banana", "Beast", "Black", "Brock", "Electro", "Ferro", "Gold"];
const EYE_SKINS: &[&str] = &["Aqua Prince", "Banana", "Bloso", "Brock", "Gold", "LootSquad"];
const ACCESSORY_SKINS: &[&str] = &["Aubergi", "Bloso", "Fluxred", "Merit Circle", "Polemos", "Skeletony"];
const BEAK_SKINS: &[&str] = &["Amphibian", "Aubergi", "Bloso", "Frima", "Peacock", "Santa"];
const HEAD_SKINS: &[&str] = &["BAYZ", "BreederDAO", "Elvis", "Gayra", "Mr. Frog", "Polemos", "Shade"];
const WING_SKINS: &[&str] = &["Aqua Prince", "Banana", "Cyborg", "Dreamy", "Felipe", "Gold", "Merit Circle"];

/// One playable character as delivered by the birds API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterBird {
    #[serde(default)]
    pub bird_type: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_egg: bool,
    #[serde(default)]
    pub attributes: SkinAttributes,
}

#[derive(Debug, Clone)]
struct CachedRoster {
    birds: Vec<RosterBird>,
    cached_at: DateTime<Utc>,
}

/// In-memory roster store shared by the bootstrap endpoint and all sessions
pub struct RosterStore {
    rosters: DashMap<String, CachedRoster>,
    names: Mutex<DrawPool<String>>,
}

impl RosterStore {
    pub fn new() -> Self {
        Self {
            rosters: DashMap::new(),
            names: Mutex::new(DrawPool::new(
                NAME_POOL.iter().map(|n| n.to_string()).collect(),
            )),
        }
    }

    /// Normalize and cache a roster under a session credential.
    ///
    /// Eggs are filtered out first; the remainder is chunked to `limit`
    /// characters. Returns the cached roster size.
    pub fn cache_roster(&self, credential: &str, birds: Vec<RosterBird>, limit: usize) -> usize {
        let playable: Vec<RosterBird> = birds.into_iter().filter(|b| !b.is_egg).collect();
        let chunked = self.chunk(playable, limit);
        let size = chunked.len();

        self.rosters.insert(
            credential.to_string(),
            CachedRoster {
                birds: chunked,
                cached_at: Utc::now(),
            },
        );

        let now = Utc::now();
        self.rosters.retain(|_, entry| {
            now.signed_duration_since(entry.cached_at).num_seconds() <= ROSTER_TTL_SECS
        });

        size
    }

    /// Chunk a roster to exactly `limit` characters: truncate oversize,
    /// fill undersize by random repetition, generate placeholders when the
    /// caller owns no playable characters at all.
    fn chunk(&self, birds: Vec<RosterBird>, limit: usize) -> Vec<RosterBird> {
        let mut rng = rand::thread_rng();

        if birds.len() == limit {
            return birds;
        }

        if birds.len() > limit {
            let mut birds = birds;
            birds.truncate(limit);
            return birds;
        }

        if !birds.is_empty() {
            return (0..limit)
                .map(|_| birds[rng.gen_range(0..birds.len())].clone())
                .collect();
        }

        (0..limit).map(|_| self.placeholder_bird(&mut rng)).collect()
    }

    /// Retrieve `count` characters for a cached credential, or not-found.
    ///
    /// Characters are drawn uniformly (with replacement) from the cached
    /// roster; expired entries are dropped here.
    pub async fn fetch_roster(&self, credential: &str, count: usize) -> Option<Vec<RosterBird>> {
        {
            let entry = self.rosters.get(credential)?;
            let age = Utc::now().signed_duration_since(entry.cached_at);
            if age.num_seconds() <= ROSTER_TTL_SECS && !entry.birds.is_empty() {
                let mut rng = rand::thread_rng();
                return Some(
                    (0..count)
                        .map(|_| entry.birds[rng.gen_range(0..entry.birds.len())].clone())
                        .collect(),
                );
            }
        }

        self.rosters.remove(credential);
        None
    }

    /// Draw a placeholder name; the pool recycles once exhausted
    pub fn placeholder_name(&self) -> String {
        let mut rng = rand::thread_rng();
        self.names.lock().draw(&mut rng)
    }

    fn placeholder_bird<R: Rng>(&self, rng: &mut R) -> RosterBird {
        RosterBird {
            bird_type: 0,
            name: Some(self.names.lock().draw(rng)),
            is_egg: false,
            attributes: random_skin(rng),
        }
    }

    pub fn cached_count(&self) -> usize {
        self.rosters.len()
    }
}

impl Default for RosterStore {
    fn default() -> Self {
        Self::new()
    }
}

fn pick<R: Rng>(rng: &mut R, values: &[&str]) -> Attribute {
    Attribute {
        display: values[rng.gen_range(0..values.len())].to_string(),
    }
}

/// Generate a random visual skin for a placeholder character
pub fn random_skin<R: Rng>(rng: &mut R) -> SkinAttributes {
    SkinAttributes {
        body: pick(rng, BODY_SKINS),
        eyes: pick(rng, EYE_SKINS),
        accessory: pick(rng, ACCESSORY_SKINS),
        beak: pick(rng, BEAK_SKINS),
        head: pick(rng, HEAD_SKINS),
        wings: pick(rng, WING_SKINS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named_birds(count: usize) -> Vec<RosterBird> {
        (0..count)
            .map(|i| RosterBird {
                bird_type: 1,
                name: Some(format!("Bird {}", i)),
                is_egg: false,
                attributes: SkinAttributes::default(),
            })
            .collect()
    }

    #[test]
    fn test_cache_keeps_exact_roster() {
        let store = RosterStore::new();
        assert_eq!(store.cache_roster("cred", named_birds(10), 10), 10);
    }

    #[test]
    fn test_cache_truncates_oversize_roster() {
        let store = RosterStore::new();
        store.cache_roster("cred", named_birds(14), 10);

        let entry = store.rosters.get("cred").unwrap();
        assert_eq!(entry.birds.len(), 10);
        assert_eq!(entry.birds[0].name.as_deref(), Some("Bird 0"));
    }

    #[test]
    fn test_cache_fills_undersize_roster_by_repetition() {
        let store = RosterStore::new();
        store.cache_roster("cred", named_birds(3), 10);

        let entry = store.rosters.get("cred").unwrap();
        assert_eq!(entry.birds.len(), 10);
        for bird in &entry.birds {
            assert!(bird.name.as_deref().unwrap().starts_with("Bird "));
        }
    }

    #[test]
    fn test_cache_generates_placeholders_for_empty_roster() {
        let store = RosterStore::new();
        store.cache_roster("cred", Vec::new(), 10);

        let entry = store.rosters.get("cred").unwrap();
        assert_eq!(entry.birds.len(), 10);
        for bird in &entry.birds {
            assert!(bird.name.is_some());
            assert!(!bird.attributes.body.display.is_empty());
        }
    }

    #[test]
    fn test_eggs_are_filtered_before_chunking() {
        let store = RosterStore::new();
        let mut birds = named_birds(10);
        for bird in birds.iter_mut().take(10) {
            bird.is_egg = true;
        }
        store.cache_roster("cred", birds, 10);

        // All eggs: the roster falls back to generated placeholders.
        let entry = store.rosters.get("cred").unwrap();
        assert!(entry.birds.iter().all(|b| !b.is_egg));
    }

    #[tokio::test]
    async fn test_fetch_unknown_credential_is_not_found() {
        let store = RosterStore::new();
        assert!(store.fetch_roster("nope", 2).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_returns_requested_count() {
        let store = RosterStore::new();
        store.cache_roster("cred", named_birds(10), 10);

        let roster = store.fetch_roster("cred", 2).await.unwrap();
        assert_eq!(roster.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_drops_expired_entries() {
        let store = RosterStore::new();
        store.cache_roster("cred", named_birds(10), 10);
        store.rosters.get_mut("cred").unwrap().cached_at =
            Utc::now() - chrono::Duration::seconds(ROSTER_TTL_SECS + 60);

        assert!(store.fetch_roster("cred", 2).await.is_none());
        assert_eq!(store.cached_count(), 0);
    }

    #[test]
    fn test_placeholder_names_unique_until_pool_recycles() {
        let store = RosterStore::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..NAME_POOL.len() {
            assert!(seen.insert(store.placeholder_name()));
        }
        // Exhausted pool recycles rather than failing.
        assert!(seen.contains(&store.placeholder_name()));
    }
}
