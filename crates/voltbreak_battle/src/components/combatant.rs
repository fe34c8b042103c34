//! Combatant entity components.
//!
//! Боец — entity с инфо-блоком, gauge, выбранным действием, четырьмя
//! ссылками на part entities и списком активных эффектов.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::part::PartKey;
use super::state::CombatantState;
use crate::ai::Personality;
use crate::components::part::StatKind;

// ============================================================================
// Identity
// ============================================================================

/// Команда. Ровно две, по три бойца.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamId {
    Alpha,
    Beta,
}

impl TeamId {
    pub fn opponent(&self) -> TeamId {
        match self {
            TeamId::Alpha => TeamId::Beta,
            TeamId::Beta => TeamId::Alpha,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            TeamId::Alpha => 0,
            TeamId::Beta => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TeamId::Alpha => "alpha",
            TeamId::Beta => "beta",
        }
    }
}

/// Неизменяемая после создания карточка бойца
#[derive(Component, Debug, Clone)]
pub struct PlayerInfo {
    pub name: String,
    pub team: TeamId,
    pub is_leader: bool,
    pub color: String,
}

/// Медаль: носитель личности для выбора стратегии AI
#[derive(Component, Debug, Clone)]
pub struct Medal {
    pub medal_id: String,
    pub personality: Personality,
}

// ============================================================================
// Gauge
// ============================================================================

/// Шкала заряда действия.
///
/// Инвариант: 0 ≤ value ≤ max. На максимуме в charging-состоянии боец
/// обязан сменить состояние в тот же кадр (см. gauge систему).
#[derive(Component, Debug, Clone, Copy)]
pub struct Gauge {
    pub value: f32,
    pub max: f32,
    /// Единиц заряда за миллисекунду
    pub base_speed: f32,
    /// base_speed × speed_multiplier (кэш для UI)
    pub current_speed: f32,
    pub speed_multiplier: f32,
}

impl Gauge {
    pub const DEFAULT_MAX: f32 = 100.0;

    pub fn new(base_speed: f32) -> Self {
        Self {
            value: 0.0,
            max: Self::DEFAULT_MAX,
            base_speed,
            current_speed: base_speed,
            speed_multiplier: 1.0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.value >= self.max
    }

    /// Продвигает шкалу, возвращает true если достигнут максимум
    pub fn advance(&mut self, delta_ms: f32) -> bool {
        self.value = (self.value + delta_ms * self.base_speed * self.speed_multiplier)
            .clamp(0.0, self.max);
        self.is_full()
    }

    /// Сбрасывает в ноль и ставит новый множитель скорости
    pub fn reset(&mut self, speed_multiplier: f32) {
        self.value = 0.0;
        self.set_multiplier(speed_multiplier);
    }

    pub fn set_multiplier(&mut self, speed_multiplier: f32) {
        self.speed_multiplier = speed_multiplier;
        self.current_speed = self.base_speed * speed_multiplier;
    }
}

// ============================================================================
// Action selection
// ============================================================================

/// Выбранное действие. Присутствует только между выбором и входом в cooldown.
#[derive(Component, Debug, Clone)]
pub struct ActionIntent {
    pub part_key: PartKey,
    pub target: Option<Entity>,
    pub target_part: Option<PartKey>,
}

// ============================================================================
// Parts
// ============================================================================

/// Четыре part entities бойца
#[derive(Component, Debug, Clone, Copy)]
pub struct PartSet {
    pub head: Entity,
    pub right_arm: Entity,
    pub left_arm: Entity,
    pub legs: Entity,
}

impl PartSet {
    pub fn get(&self, key: PartKey) -> Entity {
        match key {
            PartKey::Head => self.head,
            PartKey::RightArm => self.right_arm,
            PartKey::LeftArm => self.left_arm,
            PartKey::Legs => self.legs,
        }
    }

    pub fn iter(&self) -> [(PartKey, Entity); 4] {
        [
            (PartKey::Head, self.head),
            (PartKey::RightArm, self.right_arm),
            (PartKey::LeftArm, self.left_arm),
            (PartKey::Legs, self.legs),
        ]
    }
}

// ============================================================================
// Active effects
// ============================================================================

/// Вид активного эффекта на бойце
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActiveEffectKind {
    Scan,
    Guard,
    Stun,
}

/// Таймер эффекта: по времени или по счётчику срабатываний
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectTiming {
    Duration { ms: f32 },
    Count { left: u32 },
}

/// Один активный эффект
#[derive(Debug, Clone)]
pub struct TimedEffect {
    pub kind: ActiveEffectKind,
    pub value: i32,
    /// Часть, к которой эффект привязан (guard-часть и т.п.)
    pub part_key: Option<PartKey>,
    pub timing: EffectTiming,
    pub elapsed_ms: f32,
    /// Какой стат модифицирует (scan)
    pub stat: Option<StatKind>,
    /// Состояние, прерванное эффектом (stun восстанавливает его)
    pub resume: Option<CombatantState>,
}

/// Упорядоченный список активных эффектов.
///
/// Инвариант: не более одной записи на пару (kind, part_key);
/// повторное наложение перезаписывает.
#[derive(Component, Debug, Clone, Default)]
pub struct ActiveEffects {
    pub effects: Vec<TimedEffect>,
}

impl ActiveEffects {
    /// Вставка с перезаписью по (kind, part_key)
    pub fn upsert(&mut self, effect: TimedEffect) {
        if let Some(slot) = self
            .effects
            .iter_mut()
            .find(|e| e.kind == effect.kind && e.part_key == effect.part_key)
        {
            *slot = effect;
        } else {
            self.effects.push(effect);
        }
    }

    pub fn find(&self, kind: ActiveEffectKind) -> Option<&TimedEffect> {
        self.effects.iter().find(|e| e.kind == kind)
    }

    pub fn find_mut(&mut self, kind: ActiveEffectKind) -> Option<&mut TimedEffect> {
        self.effects.iter_mut().find(|e| e.kind == kind)
    }

    pub fn remove(&mut self, kind: ActiveEffectKind, part_key: Option<PartKey>) -> bool {
        let before = self.effects.len();
        self.effects
            .retain(|e| !(e.kind == kind && e.part_key == part_key));
        self.effects.len() != before
    }

    pub fn remove_all(&mut self, kind: ActiveEffectKind) {
        self.effects.retain(|e| e.kind != kind);
    }

    /// Суммарный бонус ко стату от активных эффектов (scan)
    pub fn stat_bonus(&self, stat: StatKind) -> i32 {
        self.effects
            .iter()
            .filter(|e| e.kind == ActiveEffectKind::Scan && e.stat == Some(stat))
            .map(|e| e.value)
            .sum()
    }
}

// ============================================================================
// Battlefield position & history
// ============================================================================

/// Логическая позиция на поле: x ∈ [0,1], y ∈ [0,100]
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldPosition {
    pub x: f32,
    pub y: f32,
}

/// Домашняя точка бойца (возврат после действия)
#[derive(Component, Debug, Clone, Copy)]
pub struct HomePosition {
    pub x: f32,
    pub y: f32,
}

/// Запись "кого и во что бил"
#[derive(Debug, Clone, Copy)]
pub struct AttackRecord {
    pub target: Entity,
    pub part_key: PartKey,
}

/// Последние атаки бойца (для стратегий AI и UI)
#[derive(Component, Debug, Clone, Default)]
pub struct BattleLog {
    pub last_attack: Option<AttackRecord>,
    pub last_attacked_by: Option<Entity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_advance_clamps_at_max() {
        let mut gauge = Gauge::new(0.02);
        assert!(!gauge.advance(1000.0)); // +20
        assert_eq!(gauge.value, 20.0);

        assert!(gauge.advance(100_000.0));
        assert_eq!(gauge.value, gauge.max);
    }

    #[test]
    fn test_gauge_multiplier_slows_charge() {
        let mut gauge = Gauge::new(0.02);
        gauge.reset(0.75);
        gauge.advance(1000.0);
        assert!((gauge.value - 15.0).abs() < 1e-3);
        assert!((gauge.current_speed - 0.015).abs() < 1e-6);
    }

    #[test]
    fn test_active_effects_upsert_overwrites() {
        let mut effects = ActiveEffects::default();
        let scan = TimedEffect {
            kind: ActiveEffectKind::Scan,
            value: 5,
            part_key: None,
            timing: EffectTiming::Duration { ms: 1000.0 },
            elapsed_ms: 0.0,
            stat: Some(StatKind::Success),
            resume: None,
        };
        effects.upsert(scan.clone());
        effects.upsert(TimedEffect {
            value: 9,
            ..scan.clone()
        });

        assert_eq!(effects.effects.len(), 1);
        assert_eq!(effects.find(ActiveEffectKind::Scan).unwrap().value, 9);
        assert_eq!(effects.stat_bonus(StatKind::Success), 9);
        assert_eq!(effects.stat_bonus(StatKind::Might), 0);
    }
}
