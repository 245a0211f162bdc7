use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

use crate::role::Role;

pub type PlayerId = usize;

/// Per-player ability usage. Picked from the dealt role, so a player can only
/// ever carry the record that matches their card.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Ability {
    #[default]
    Inert,
    /// One-shot defense against a mafia attack.
    Armor { used: bool },
    /// Sticky mark used by the self-destruct.
    Detonator { target: Option<PlayerId> },
}

impl Ability {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Army => Ability::Armor { used: false },
            Role::Terrorist => Ability::Detonator { target: None },
            _ => Ability::Inert,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    pub role: Option<Role>,
    pub public_card: Role,
    pub alive: bool,
    pub assigned: bool,
    pub ability: Ability,
    pub sealed_until_night: u32,
}

/// The slice of a player that is safe to show on a Display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPlayerState {
    pub id: PlayerId,
    pub name: String,
    pub alive: bool,
    pub assigned: bool,
    pub public_card: Role,
}

impl From<&PlayerState> for PublicPlayerState {
    fn from(value: &PlayerState) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            alive: value.alive,
            assigned: value.assigned,
            public_card: value.public_card,
        }
    }
}

impl Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}){}",
            self.name,
            self.role
                .map_or_else(|| "Unassigned".to_string(), |role| role.to_string()),
            if self.alive { "" } else { " [dead]" }
        )
    }
}

impl PlayerState {
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            role: None,
            public_card: Role::Citizen,
            alive: true,
            assigned: false,
            ability: Ability::Inert,
            sealed_until_night: 0,
        }
    }

    /// Back to the undealt state, keeping identity.
    pub fn reset(&mut self) {
        self.role = None;
        self.public_card = Role::Citizen;
        self.alive = true;
        self.assigned = false;
        self.ability = Ability::Inert;
        self.sealed_until_night = 0;
    }

    pub fn deal(&mut self, role: Role) {
        self.role = Some(role);
        self.assigned = true;
        self.ability = Ability::for_role(role);
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }

    pub fn is_mafia_aligned(&self) -> bool {
        self.role.is_some_and(Role::is_mafia_aligned)
    }

    /// Turns the public card face up. No-op for unassigned players.
    pub fn reveal(&mut self) {
        if let Some(role) = self.role {
            self.public_card = role;
        }
    }

    pub fn armor_used(&self) -> bool {
        matches!(self.ability, Ability::Armor { used: true })
    }

    pub fn terrorist_target(&self) -> Option<PlayerId> {
        match self.ability {
            Ability::Detonator { target } => target,
            _ => None,
        }
    }

    pub fn is_sealed(&self, night: u32) -> bool {
        night < self.sealed_until_night
    }

    /// Raises the seal; never lowers it.
    pub fn seal_until(&mut self, night: u32) {
        self.sealed_until_night = self.sealed_until_night.max(night);
    }
}
