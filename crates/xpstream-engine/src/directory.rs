//! Player name lookup for the command layer.
//!
//! The engine never talks to the host's player database directly. It
//! learns names from presence updates and spawn candidates, and the
//! command layer resolves names through the [`Directory`] trait.

use std::collections::{BTreeMap, BTreeSet};

use xpstream_types::{Candidate, RecipientId};

use crate::protocol::PlayerRef;

/// Name resolution as the command layer needs it.
pub trait Directory {
    /// An online player whose name matches `name` ignoring ASCII case.
    fn find_online(&self, name: &str) -> Option<PlayerRef>;

    /// Any player ever seen whose name matches `name` ignoring ASCII case,
    /// online or not.
    fn find_known(&self, name: &str) -> Option<PlayerRef>;

    /// The name of `id` if that player is online.
    fn online_name(&self, id: RecipientId) -> Option<String>;

    /// Names of everyone online.
    fn online_names(&self) -> Vec<String>;
}

/// Directory built from what the host has told the engine.
#[derive(Debug, Clone, Default)]
pub struct PlayerDirectory {
    names: BTreeMap<RecipientId, String>,
    online: BTreeSet<RecipientId>,
}

impl PlayerDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the online set with `players`, remembering their names.
    pub fn set_online(&mut self, players: &[PlayerRef]) {
        self.online.clear();
        for player in players {
            self.online.insert(player.id);
            self.names.insert(player.id, player.name.clone());
        }
    }

    /// Remember the names of spawn candidates.
    pub fn observe(&mut self, candidates: &[Candidate]) {
        for candidate in candidates.iter().filter(|c| !c.name.is_empty()) {
            self.names
                .entry(candidate.id)
                .or_insert_with(|| candidate.name.clone());
        }
    }

    fn lookup<'a>(&self, ids: impl Iterator<Item = &'a RecipientId>, name: &str) -> Option<PlayerRef> {
        ids.filter_map(|id| self.names.get(id).map(|known| (id, known)))
            .find(|(_, known)| known.eq_ignore_ascii_case(name))
            .map(|(id, known)| PlayerRef {
                id: *id,
                name: known.clone(),
            })
    }
}

impl Directory for PlayerDirectory {
    fn find_online(&self, name: &str) -> Option<PlayerRef> {
        self.lookup(self.online.iter(), name)
    }

    fn find_known(&self, name: &str) -> Option<PlayerRef> {
        self.lookup(self.names.keys(), name)
    }

    fn online_name(&self, id: RecipientId) -> Option<String> {
        if self.online.contains(&id) {
            self.names.get(&id).cloned()
        } else {
            None
        }
    }

    fn online_names(&self) -> Vec<String> {
        self.online
            .iter()
            .filter_map(|id| self.names.get(id).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use xpstream_types::{ObservationMode, Position};

    use super::*;

    fn player(name: &str) -> PlayerRef {
        PlayerRef {
            id: RecipientId::new(),
            name: name.to_owned(),
        }
    }

    #[test]
    fn online_lookup_ignores_case() {
        let mut directory = PlayerDirectory::new();
        let alex = player("Alex");
        directory.set_online(std::slice::from_ref(&alex));

        assert_eq!(directory.find_online("alex"), Some(alex.clone()));
        assert_eq!(directory.online_name(alex.id).as_deref(), Some("Alex"));
    }

    #[test]
    fn players_who_leave_stay_known() {
        let mut directory = PlayerDirectory::new();
        let alex = player("Alex");
        directory.set_online(std::slice::from_ref(&alex));
        directory.set_online(&[]);

        assert!(directory.find_online("Alex").is_none());
        assert_eq!(directory.find_known("ALEX").map(|p| p.id), Some(alex.id));
        assert!(directory.online_name(alex.id).is_none());
        assert!(directory.online_names().is_empty());
    }

    #[test]
    fn candidates_teach_names() {
        let mut directory = PlayerDirectory::new();
        let id = RecipientId::new();
        directory.observe(&[Candidate {
            id,
            name: String::from("Sam"),
            position: Position::default(),
            mode: ObservationMode::Survival,
        }]);

        assert_eq!(directory.find_known("sam").map(|p| p.id), Some(id));
        assert!(directory.find_online("sam").is_none());
    }
}
