//! Battle domain: фазы, выбор, исполнение, gauge, движение, победа.

pub mod context;
pub mod effects_tick;
pub mod execution;
pub mod gauge;
pub mod history;
pub mod movement;
pub mod phase;
pub mod selection;
pub mod setup;
pub mod win;

pub use context::{BattleContext, BattleHistory, BattlePhase, SelectionQueue, TeamConfig, TurnState};
pub use setup::{spawn_battle, BattleLoadout, MemberLoadout, TeamLoadout};
