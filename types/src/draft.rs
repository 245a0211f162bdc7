use serde::{Deserialize, Serialize};

use crate::player_state::PlayerId;

/// Actor and chosen target for one special role.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleChoice {
    pub actor: Option<PlayerId>,
    pub target: Option<PlayerId>,
}

impl RoleChoice {
    pub fn actor(actor: Option<PlayerId>) -> Self {
        Self {
            actor,
            target: None,
        }
    }

    /// Target, only when the role has a living holder this night.
    pub fn active_target(&self) -> Option<PlayerId> {
        self.actor.and(self.target)
    }
}

/// Choice for an ability the moderator has to switch on explicitly.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionalChoice {
    pub actor: Option<PlayerId>,
    pub used: bool,
    pub target: Option<PlayerId>,
}

impl OptionalChoice {
    pub fn actor(actor: Option<PlayerId>) -> Self {
        Self {
            actor,
            used: false,
            target: None,
        }
    }

    pub fn requested(&self) -> bool {
        self.actor.is_some() && self.used
    }
}

/// The moderator's working sheet for one night. Lives on the Host only.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightDraft {
    pub mafia: RoleChoice,
    pub doctor: RoleChoice,
    pub police: RoleChoice,
    pub terrorist: RoleChoice,
    pub werewolf: RoleChoice,
    pub madam: RoleChoice,
    pub reporter: OptionalChoice,
    pub vigilante: OptionalChoice,
}
