//! Which ailments a patient can become immune to.

use rustc_hash::FxHashSet;

use crate::sim::Ailment;

/// Ailments that build up immunity, collected once when the session starts.
#[derive(Debug, Clone, Default)]
pub struct ImmunizableCache {
    immunizable: FxHashSet<Ailment>,
}

impl ImmunizableCache {
    pub fn new(immunizable: impl IntoIterator<Item = Ailment>) -> Self {
        Self {
            immunizable: immunizable.into_iter().collect(),
        }
    }

    /// Scan every known ailment for the ones that develop immunity.
    pub fn from_known_ailments() -> Self {
        Self::new(Ailment::ALL.into_iter().filter(|a| a.develops_immunity()))
    }

    pub fn is_immunizable(&self, ailment: Ailment) -> bool {
        self.immunizable.contains(&ailment)
    }

    pub fn len(&self) -> usize {
        self.immunizable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.immunizable.is_empty()
    }
}
