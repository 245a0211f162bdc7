pub mod action;
pub mod deck;
pub mod draft;
pub mod event;
pub mod game_state;
pub mod player;
pub mod player_state;
pub mod role;
pub mod timer;

pub use action::{ActionMessage, Intent};
pub use deck::{DeckBook, DeckConfig};
pub use draft::{NightDraft, OptionalChoice, RoleChoice};
pub use event::{EventQueue, NarrativeEvent};
pub use game_state::{Charge, DeckInfo, GameState, Phase, PrivateState, PublicState};
pub use player::{Prompt, Strategy};
pub use player_state::{Ability, PlayerId, PlayerState, PublicPlayerState};
pub use role::{Role, Team};
pub use timer::{Timer, TimerMode};
