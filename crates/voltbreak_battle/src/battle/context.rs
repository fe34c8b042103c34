//! Battle singletons: глобальная фаза, счётчик ходов, история боя.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::components::combatant::{AttackRecord, TeamId};

/// Глобальная фаза боя
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattlePhase {
    Idle,
    InitialSelection,
    BattleStartConfirm,
    BattleStart,
    TurnStart,
    ActionSelection,
    ActionExecution,
    TurnEnd,
    GameOver,
}

/// Состояние хода
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnState {
    pub number: u32,
    /// Боец, чьё действие исполняется
    pub current_actor: Option<Entity>,
    /// Боец, ожидающий выбора действия (голова очереди)
    pub current_selector: Option<Entity>,
}

/// Singleton-контекст боя
#[derive(Resource, Debug, Clone)]
pub struct BattleContext {
    pub phase: BattlePhase,
    pub turn: TurnState,
    pub is_paused: bool,
    pub winning_team: Option<TeamId>,
}

impl Default for BattleContext {
    fn default() -> Self {
        Self {
            phase: BattlePhase::Idle,
            turn: TurnState::default(),
            is_paused: false,
            winning_team: None,
        }
    }
}

impl BattleContext {
    pub fn is_over(&self) -> bool {
        self.phase == BattlePhase::GameOver
    }
}

/// История боя по командам
#[derive(Resource, Debug, Clone, Default)]
pub struct BattleHistory {
    pub team_last_attack: [Option<AttackRecord>; 2],
    pub leader_last_attacked_by: [Option<Entity>; 2],
}

/// Очередь бойцов, ожидающих выбора действия
#[derive(Resource, Debug, Clone, Default)]
pub struct SelectionQueue {
    pub queue: VecDeque<Entity>,
}

impl SelectionQueue {
    pub fn enqueue(&mut self, entity: Entity) {
        if !self.queue.contains(&entity) {
            self.queue.push_back(entity);
        }
    }

    pub fn remove(&mut self, entity: Entity) {
        self.queue.retain(|&e| e != entity);
    }
}

/// Кто управляется AI (по индексу команды)
#[derive(Resource, Debug, Clone)]
pub struct TeamConfig {
    pub ai_controlled: [bool; 2],
}

impl Default for TeamConfig {
    fn default() -> Self {
        // Headless по умолчанию: обе команды — AI
        Self {
            ai_controlled: [true, true],
        }
    }
}

impl TeamConfig {
    pub fn is_ai(&self, team: TeamId) -> bool {
        self.ai_controlled[team.index()]
    }
}
