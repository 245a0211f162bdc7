//! Simultaneous night actions, resolved in a fixed priority order.
//!
//! [`resolve_night`] only reads the state and returns a [`NightOutcome`]; the
//! outcome is applied separately so the same inputs always give the same result.

use itertools::Itertools;
use types::{
    Ability, Charge, GameState, NarrativeEvent, NightDraft, PlayerId, Role, RoleChoice,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NightOutcome {
    pub dead: Vec<PlayerId>,
    pub events: Vec<NarrativeEvent>,
    pub reporter_reveal_target: Option<PlayerId>,
    /// Player sealed by the Madam and the night the seal lifts.
    pub seal: Option<(PlayerId, u32)>,
    pub armor_spent: Option<PlayerId>,
    pub revealed: Vec<PlayerId>,
    pub werewolf_contact: bool,
    pub reporter_charge: Charge,
    pub vigilante_charge: Charge,
    /// New sticky mark for the Terrorist, when one was chosen tonight.
    pub terrorist_mark: Option<(PlayerId, PlayerId)>,
}

impl NightOutcome {
    pub fn apply(&self, state: &mut GameState) {
        if let Some((terrorist, target)) = self.terrorist_mark {
            if let Some(player) = state.player_mut(terrorist) {
                player.ability = Ability::Detonator {
                    target: Some(target),
                };
            }
        }
        if let Some(id) = self.armor_spent {
            if let Some(player) = state.player_mut(id) {
                player.ability = Ability::Armor { used: true };
            }
        }
        if let Some((id, until)) = self.seal {
            if let Some(player) = state.player_mut(id) {
                player.seal_until(until);
            }
        }
        for &id in self.dead.iter() {
            if let Some(player) = state.player_mut(id) {
                player.alive = false;
            }
        }
        for &id in self.revealed.iter() {
            if let Some(player) = state.player_mut(id) {
                player.reveal();
            }
        }
        if let Some(id) = self.reporter_reveal_target {
            if let Some(player) = state.player_mut(id) {
                player.reveal();
            }
            state.journalist_reveals.insert(id);
        }
        state.werewolf_contact = self.werewolf_contact;
        state.reporter_charge = self.reporter_charge;
        state.vigilante_charge = self.vigilante_charge;
    }
}

/// Target of a role choice whose actor is a living holder of `role`.
fn acting(state: &GameState, choice: &RoleChoice, role: Role) -> Option<(PlayerId, PlayerId)> {
    let actor = choice.actor?;
    let target = choice.active_target()?;
    let holder = state.player(actor)?;
    (holder.alive && holder.has_role(role)).then_some((actor, target))
}

fn living_holder(state: &GameState, actor: Option<PlayerId>, role: Role) -> Option<PlayerId> {
    actor.filter(|&id| state.player(id).is_some_and(|p| p.alive && p.has_role(role)))
}

pub fn resolve_night(state: &GameState, draft: &NightDraft) -> NightOutcome {
    let night = state.night;
    let mut outcome = NightOutcome {
        reporter_charge: state.reporter_charge,
        vigilante_charge: state.vigilante_charge,
        ..Default::default()
    };

    if let Some((terrorist, target)) = acting(state, &draft.terrorist, Role::Terrorist) {
        outcome.terrorist_mark = Some((terrorist, target));
    }

    let mafia_target = acting(state, &draft.mafia, Role::Mafia)
        .map(|(_, target)| target)
        .filter(|&target| state.is_alive(target));

    // Contact persists across nights but only while the Werewolf lives.
    let werewolf_mark = acting(state, &draft.werewolf, Role::Werewolf).map(|(_, t)| t);
    let werewolf_alive = state.holder_of(Role::Werewolf).is_some();
    outcome.werewolf_contact = werewolf_alive
        && (state.werewolf_contact || (werewolf_mark.is_some() && werewolf_mark == mafia_target));

    if let Some(victim_id) = mafia_target {
        let Some(victim) = state.player(victim_id) else {
            return outcome;
        };
        let doctor_target = acting(state, &draft.doctor, Role::Doctor).map(|(_, t)| t);
        let kill_event = if outcome.werewolf_contact {
            if victim.has_role(Role::Werewolf) {
                outcome.events.push(NarrativeEvent::Nothing);
                None
            } else {
                Some(NarrativeEvent::WerewolfThirst {
                    target_id: victim_id,
                })
            }
        } else if doctor_target == Some(victim_id) {
            outcome.events.push(NarrativeEvent::DoctorSave {
                target_id: victim_id,
            });
            None
        } else if matches!(victim.ability, Ability::Armor { used: false }) {
            outcome.armor_spent = Some(victim_id);
            outcome.revealed.push(victim_id);
            outcome.events.push(NarrativeEvent::ArmySave {
                target_id: victim_id,
            });
            None
        } else if victim.has_role(Role::Werewolf) {
            outcome.events.push(NarrativeEvent::Nothing);
            None
        } else {
            Some(NarrativeEvent::MafiaKill {
                target_id: victim_id,
            })
        };

        if let Some(event) = kill_event {
            outcome.dead.push(victim_id);
            let sticky = outcome
                .terrorist_mark
                .filter(|&(terrorist, _)| terrorist == victim_id)
                .map(|(_, target)| target)
                .or_else(|| victim.terrorist_target());
            let partner = sticky.filter(|&target| {
                target != victim_id
                    && state
                        .player(target)
                        .is_some_and(|p| p.alive && p.is_mafia_aligned())
            });
            match partner {
                Some(target_id) if victim.has_role(Role::Terrorist) => {
                    outcome.dead.push(target_id);
                    outcome.revealed.push(victim_id);
                    outcome.revealed.push(target_id);
                    outcome.events.push(NarrativeEvent::TerrorSelfDestruct {
                        terrorist_id: victim_id,
                        target_id,
                    });
                }
                _ => outcome.events.push(event),
            }
        }
    }
    let dies_tonight = |id: PlayerId, outcome: &NightOutcome| outcome.dead.contains(&id);

    if let Some((madam, target)) = acting(state, &draft.madam, Role::Madam) {
        if !dies_tonight(madam, &outcome) && state.is_alive(target) {
            outcome.seal = Some((target, night + 1));
        }
    }

    if draft.vigilante.requested() && !state.vigilante_charge.is_spent() {
        let vigilante = living_holder(state, draft.vigilante.actor, Role::Vigilante);
        outcome.vigilante_charge = Charge::Spent;
        let target = draft.vigilante.target.filter(|&target| {
            !dies_tonight(target, &outcome)
                && state
                    .player(target)
                    .is_some_and(|p| p.alive && p.is_mafia_aligned())
        });
        match (vigilante, target) {
            (Some(vigilante), Some(target_id)) if mafia_target != Some(vigilante) => {
                outcome.dead.push(target_id);
                outcome
                    .events
                    .push(NarrativeEvent::VigilantePurge { target_id });
            }
            _ => log::debug!("Vigilante purge request had no effect"),
        }
    }

    if night >= 2 && draft.reporter.requested() && !state.reporter_charge.is_spent() {
        let reporter = living_holder(state, draft.reporter.actor, Role::Reporter)
            .filter(|&id| !dies_tonight(id, &outcome));
        let target = draft.reporter.target.filter(|&target| {
            !dies_tonight(target, &outcome)
                && state.player(target).is_some_and(|p| p.alive && p.assigned)
        });
        if let (Some(_), Some(target_id)) = (reporter, target) {
            if let Some(role) = state.player(target_id).and_then(|p| p.role) {
                outcome.reporter_charge = Charge::Spent;
                outcome.reporter_reveal_target = Some(target_id);
                outcome
                    .events
                    .push(NarrativeEvent::ReporterNews { target_id, role });
            }
        }
    }

    if outcome.events.is_empty() {
        outcome.events.push(NarrativeEvent::Nothing);
    }
    outcome.dead = outcome.dead.into_iter().unique().collect();
    log::debug!(
        "Night {night} resolved: dead={:?} events={:?}",
        outcome.dead,
        outcome.events
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::OptionalChoice;

    // P1 Mafia, P2 Doctor, P3 Army, P4 Terrorist, P5 Werewolf, P6 Madam,
    // P7 Vigilante, P8 Reporter, P9 Citizen
    const TABLE: [Role; 9] = [
        Role::Mafia,
        Role::Doctor,
        Role::Army,
        Role::Terrorist,
        Role::Werewolf,
        Role::Madam,
        Role::Vigilante,
        Role::Reporter,
        Role::Citizen,
    ];

    fn dealt_state() -> GameState {
        let names = (1..=TABLE.len()).map(|i| format!("P{i}")).collect_vec();
        let mut state = GameState::new(&names);
        for (player, role) in state.players.iter_mut().zip(TABLE) {
            player.deal(role);
        }
        state
    }

    fn choice(actor: PlayerId, target: PlayerId) -> RoleChoice {
        RoleChoice {
            actor: Some(actor),
            target: Some(target),
        }
    }

    fn attack(target: PlayerId) -> NightDraft {
        NightDraft {
            mafia: choice(0, target),
            ..Default::default()
        }
    }

    #[test]
    fn test_quiet_night_is_nothing() {
        let state = dealt_state();
        let outcome = resolve_night(&state, &NightDraft::default());
        assert_eq!(outcome.events, vec![NarrativeEvent::Nothing]);
        assert!(outcome.dead.is_empty());
    }

    #[test]
    fn test_plain_kill() {
        let state = dealt_state();
        let outcome = resolve_night(&state, &attack(8));
        assert_eq!(outcome.dead, vec![8]);
        assert_eq!(
            outcome.events,
            vec![NarrativeEvent::MafiaKill { target_id: 8 }]
        );
    }

    #[test]
    fn test_dead_mafia_cannot_attack() {
        let mut state = dealt_state();
        state.players[0].alive = false;
        let outcome = resolve_night(&state, &attack(8));
        assert!(outcome.dead.is_empty());
    }

    #[test]
    fn test_doctor_save_is_single_event() {
        let state = dealt_state();
        let draft = NightDraft {
            doctor: choice(1, 8),
            ..attack(8)
        };
        let outcome = resolve_night(&state, &draft);
        assert!(outcome.dead.is_empty());
        assert_eq!(
            outcome.events,
            vec![NarrativeEvent::DoctorSave { target_id: 8 }]
        );
    }

    #[test]
    fn test_armor_saves_once_and_reveals() {
        let mut state = dealt_state();
        let outcome = resolve_night(&state, &attack(2));
        assert_eq!(
            outcome.events,
            vec![NarrativeEvent::ArmySave { target_id: 2 }]
        );
        outcome.apply(&mut state);
        assert!(state.players[2].armor_used());
        assert_eq!(state.players[2].public_card, Role::Army);

        let second = resolve_night(&state, &attack(2));
        assert_eq!(
            second.events,
            vec![NarrativeEvent::MafiaKill { target_id: 2 }]
        );
    }

    #[test]
    fn test_werewolf_is_immune_to_plain_attack() {
        let state = dealt_state();
        let outcome = resolve_night(&state, &attack(4));
        assert!(outcome.dead.is_empty());
        assert_eq!(outcome.events, vec![NarrativeEvent::Nothing]);
    }

    #[test]
    fn test_thirst_ignores_doctor() {
        let state = dealt_state();
        let draft = NightDraft {
            doctor: choice(1, 8),
            werewolf: choice(4, 8),
            ..attack(8)
        };
        let outcome = resolve_night(&state, &draft);
        assert!(outcome.werewolf_contact);
        assert_eq!(outcome.dead, vec![8]);
        assert_eq!(
            outcome.events,
            vec![NarrativeEvent::WerewolfThirst { target_id: 8 }]
        );
    }

    #[test]
    fn test_thirst_spares_the_werewolf() {
        let mut state = dealt_state();
        state.werewolf_contact = true;
        let outcome = resolve_night(&state, &attack(4));
        assert!(outcome.dead.is_empty());
        assert_eq!(outcome.events, vec![NarrativeEvent::Nothing]);
    }

    #[test]
    fn test_contact_clears_when_werewolf_is_dead() {
        let mut state = dealt_state();
        state.werewolf_contact = true;
        state.players[4].alive = false;
        let draft = NightDraft {
            doctor: choice(1, 8),
            ..attack(8)
        };
        let outcome = resolve_night(&state, &draft);
        assert!(!outcome.werewolf_contact);
        assert_eq!(
            outcome.events,
            vec![NarrativeEvent::DoctorSave { target_id: 8 }]
        );
    }

    #[test]
    fn test_terrorist_self_destruct_takes_mafia_aligned_mark() {
        let mut state = dealt_state();
        state.players[3].ability = Ability::Detonator { target: Some(5) };
        let mut outcome = resolve_night(&state, &attack(3));
        outcome.dead.sort();
        assert_eq!(outcome.dead, vec![3, 5]);
        assert_eq!(
            outcome.events,
            vec![NarrativeEvent::TerrorSelfDestruct {
                terrorist_id: 3,
                target_id: 5
            }]
        );
        outcome.apply(&mut state);
        assert_eq!(state.players[3].public_card, Role::Terrorist);
        assert_eq!(state.players[5].public_card, Role::Madam);
    }

    #[test]
    fn test_terrorist_mark_on_citizen_does_not_fire() {
        let mut state = dealt_state();
        state.players[3].ability = Ability::Detonator { target: Some(8) };
        let outcome = resolve_night(&state, &attack(3));
        assert_eq!(outcome.dead, vec![3]);
        assert_eq!(
            outcome.events,
            vec![NarrativeEvent::MafiaKill { target_id: 3 }]
        );
    }

    #[test]
    fn test_saved_terrorist_does_not_fire() {
        let mut state = dealt_state();
        state.players[3].ability = Ability::Detonator { target: Some(0) };
        let draft = NightDraft {
            doctor: choice(1, 3),
            ..attack(3)
        };
        let outcome = resolve_night(&state, &draft);
        assert!(outcome.dead.is_empty());
    }

    #[test]
    fn test_terrorist_uses_mark_chosen_tonight() {
        let state = dealt_state();
        let draft = NightDraft {
            terrorist: choice(3, 0),
            ..attack(3)
        };
        let mut outcome = resolve_night(&state, &draft);
        outcome.dead.sort();
        assert_eq!(outcome.dead, vec![0, 3]);
        assert_eq!(outcome.terrorist_mark, Some((3, 0)));
    }

    #[test]
    fn test_vigilante_charge_consumed_on_invalid_target() {
        let state = dealt_state();
        let draft = NightDraft {
            vigilante: OptionalChoice {
                actor: Some(6),
                used: true,
                target: Some(8),
            },
            ..Default::default()
        };
        let outcome = resolve_night(&state, &draft);
        assert!(outcome.dead.is_empty());
        assert_eq!(outcome.vigilante_charge, Charge::Spent);
        assert_eq!(outcome.events, vec![NarrativeEvent::Nothing]);
    }

    #[test]
    fn test_vigilante_purge() {
        let state = dealt_state();
        let draft = NightDraft {
            vigilante: OptionalChoice {
                actor: Some(6),
                used: true,
                target: Some(5),
            },
            ..attack(8)
        };
        let outcome = resolve_night(&state, &draft);
        assert_eq!(outcome.dead, vec![8, 5]);
        assert_eq!(
            outcome.events,
            vec![
                NarrativeEvent::MafiaKill { target_id: 8 },
                NarrativeEvent::VigilantePurge { target_id: 5 }
            ]
        );
    }

    #[test]
    fn test_attacked_vigilante_cannot_purge() {
        let state = dealt_state();
        let draft = NightDraft {
            vigilante: OptionalChoice {
                actor: Some(6),
                used: true,
                target: Some(5),
            },
            ..attack(6)
        };
        let outcome = resolve_night(&state, &draft);
        assert_eq!(outcome.dead, vec![6]);
        assert_eq!(outcome.vigilante_charge, Charge::Spent);
    }

    #[test]
    fn test_reporter_waits_for_second_night() {
        let mut state = dealt_state();
        let draft = NightDraft {
            reporter: OptionalChoice {
                actor: Some(7),
                used: true,
                target: Some(0),
            },
            ..Default::default()
        };
        let first = resolve_night(&state, &draft);
        assert_eq!(first.reporter_reveal_target, None);
        assert_eq!(first.reporter_charge, Charge::Ready);

        state.night = 2;
        let outcome = resolve_night(&state, &draft.clone());
        assert_eq!(outcome.reporter_reveal_target, Some(0));
        assert_eq!(outcome.reporter_charge, Charge::Spent);
        outcome.apply(&mut state);
        assert_eq!(state.players[0].public_card, Role::Mafia);
        assert!(state.journalist_reveals.contains(&0));
    }

    #[test]
    fn test_reporter_news_comes_last() {
        let mut state = dealt_state();
        state.night = 2;
        let draft = NightDraft {
            reporter: OptionalChoice {
                actor: Some(7),
                used: true,
                target: Some(1),
            },
            ..attack(8)
        };
        let outcome = resolve_night(&state, &draft);
        assert_eq!(
            outcome.events.last(),
            Some(&NarrativeEvent::ReporterNews {
                target_id: 1,
                role: Role::Doctor
            })
        );
    }

    #[test]
    fn test_werewolf_immunity_is_narrated_alongside_news() {
        let mut state = dealt_state();
        state.night = 2;
        let draft = NightDraft {
            reporter: OptionalChoice {
                actor: Some(7),
                used: true,
                target: Some(3),
            },
            ..attack(4)
        };
        let outcome = resolve_night(&state, &draft);
        assert!(outcome.dead.is_empty());
        assert_eq!(
            outcome.events,
            vec![
                NarrativeEvent::Nothing,
                NarrativeEvent::ReporterNews {
                    target_id: 3,
                    role: Role::Terrorist
                }
            ]
        );
    }

    #[test]
    fn test_killed_reporter_cannot_reveal() {
        let mut state = dealt_state();
        state.night = 2;
        let draft = NightDraft {
            reporter: OptionalChoice {
                actor: Some(7),
                used: true,
                target: Some(0),
            },
            ..attack(7)
        };
        let outcome = resolve_night(&state, &draft);
        assert_eq!(outcome.reporter_reveal_target, None);
        assert_eq!(outcome.reporter_charge, Charge::Ready);
    }

    #[test]
    fn test_madam_seal_lasts_through_next_day() {
        let mut state = dealt_state();
        state.night = 3;
        let draft = NightDraft {
            madam: choice(5, 3),
            ..Default::default()
        };
        let outcome = resolve_night(&state, &draft);
        assert_eq!(outcome.seal, Some((3, 4)));
        outcome.apply(&mut state);
        assert!(state.players[3].is_sealed(3));
        assert!(!state.players[3].is_sealed(4));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let state = dealt_state();
        let draft = NightDraft {
            doctor: choice(1, 2),
            werewolf: choice(4, 3),
            madam: choice(5, 6),
            ..attack(3)
        };
        assert_eq!(resolve_night(&state, &draft), resolve_night(&state, &draft));
    }
}
