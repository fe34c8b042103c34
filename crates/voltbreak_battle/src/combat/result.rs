//! Resolution result types.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::catalog::messages::RenderedMessage;
use crate::combat::effects::EffectKind;
use crate::components::part::PartKey;

/// Почему действие не состоялось
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    /// Состояние атакующего потеряно (глитч, недостающие компоненты)
    Interrupted,
    /// Цель или её часть больше не валидна
    TargetLost,
    /// Атакующая часть разбита к моменту исполнения
    PartBroken,
}

/// Исход броска попадания
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub is_hit: bool,
    pub is_critical: bool,
    pub is_defended: bool,
    /// Часть, в которую в итоге летит эффект (после защиты)
    pub final_target_part: PartKey,
}

/// Перехвативший союзник
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardianInfo {
    pub guardian: Entity,
    pub part_key: PartKey,
}

/// Результат применения одного эффекта
#[derive(Debug, Clone)]
pub struct EffectResult {
    pub kind: EffectKind,
    pub target: Entity,
    pub part_key: Option<PartKey>,
    /// Фактически применённое значение (снятый урон, лечение, заряды guard)
    pub value: i32,
    /// Запрошенное значение до клампа по HP
    pub raw_value: i32,
    /// raw − actual для damage
    pub overkill: i32,
    pub broke_part: bool,
    /// Голова разбита этим эффектом
    pub broke_combatant: bool,
    pub is_guard_broken: bool,
    pub is_guard_expired: bool,
    pub was_successful: bool,
    pub message: Option<RenderedMessage>,
}

impl EffectResult {
    pub fn new(kind: EffectKind, target: Entity, part_key: Option<PartKey>) -> Self {
        Self {
            kind,
            target,
            part_key,
            value: 0,
            raw_value: 0,
            overkill: 0,
            broke_part: false,
            broke_combatant: false,
            is_guard_broken: false,
            is_guard_expired: false,
            was_successful: true,
            message: None,
        }
    }
}

/// Сводка по результату
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResultSummary {
    pub is_guard_broken: bool,
    pub is_guard_expired: bool,
}

/// Полный результат разрешения одного действия
#[derive(Debug, Clone)]
pub struct CombatResult {
    pub attacker: Entity,
    pub intended_target: Option<Entity>,
    pub final_target: Option<Entity>,
    pub attacking_part: PartKey,
    pub is_support: bool,
    pub guardian: Option<GuardianInfo>,
    pub outcome: Option<Outcome>,
    pub applied: Vec<EffectResult>,
    pub summary: ResultSummary,
    pub cancelled: Option<CancelReason>,
}

impl CombatResult {
    pub fn cancelled(attacker: Entity, attacking_part: PartKey, reason: CancelReason) -> Self {
        Self {
            attacker,
            intended_target: None,
            final_target: None,
            attacking_part,
            is_support: false,
            guardian: None,
            outcome: None,
            applied: Vec::new(),
            summary: ResultSummary::default(),
            cancelled: Some(reason),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.is_some()
    }
}
