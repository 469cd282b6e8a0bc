//! Big Reveal podium ceremony
//!
//! Places are revealed third, then second, then first.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TournamentError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodiumPlace {
    Third,
    Second,
    First,
}

impl PodiumPlace {
    /// Ceremony order
    pub const ORDER: [PodiumPlace; 3] = [PodiumPlace::Third, PodiumPlace::Second, PodiumPlace::First];

    /// Final rank shown on the podium (1 = winner)
    pub fn rank(self) -> usize {
        match self {
            PodiumPlace::First => 1,
            PodiumPlace::Second => 2,
            PodiumPlace::Third => 3,
        }
    }
}

impl fmt::Display for PodiumPlace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PodiumPlace::Third => f.write_str("third"),
            PodiumPlace::Second => f.write_str("second"),
            PodiumPlace::First => f.write_str("first"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealState {
    revealed: Vec<PodiumPlace>,
}

impl RevealState {
    pub fn revealed(&self) -> &[PodiumPlace] {
        &self.revealed
    }

    pub fn next(&self) -> Option<PodiumPlace> {
        PodiumPlace::ORDER.get(self.revealed.len()).copied()
    }

    pub fn is_finished(&self) -> bool {
        self.next().is_none()
    }

    /// Reveal a place. Returns false if it was already revealed.
    pub fn reveal(&mut self, place: PodiumPlace) -> Result<bool, TournamentError> {
        if self.revealed.contains(&place) {
            return Ok(false);
        }
        match self.next() {
            Some(expected) if expected == place => {
                self.revealed.push(place);
                Ok(true)
            }
            Some(expected) => Err(TournamentError::RevealOutOfOrder {
                requested: place,
                expected,
            }),
            // every place is revealed, so `place` was caught above
            None => Ok(false),
        }
    }

    pub fn reset(&mut self) {
        self.revealed.clear();
    }
}
