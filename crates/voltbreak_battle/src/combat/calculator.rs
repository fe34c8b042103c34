//! Combat calculator: исход попадания, формула урона, множитель заряда.
//!
//! Все броски идут через [`crate::DeterministicRng`]; все константы — в
//! [`CombatTuning`] (tunable master data, не код).

use bevy::prelude::*;

use crate::catalog::attack_types::{AttackTypeTable, ModifierSource};
use crate::combat::result::Outcome;
use crate::components::combatant::{ActiveEffects, PartSet};
use crate::components::part::{
    AccuracyBehavior, ActionLogic, PartKey, PartStats, PartStatus, StatKind, TraitCriticalBonus,
};
use crate::targeting;
use crate::DeterministicRng;

/// Настраиваемые константы боя
#[derive(Resource, Debug, Clone, Copy)]
pub struct CombatTuning {
    /// Шанс уклонения на единицу превышения mobility над success
    pub k_evasion: f32,
    /// Шанс защиты на единицу armor
    pub k_defense: f32,
    pub base_critical: f32,
    pub crit_multiplier: f32,
    pub k_pow: f32,
    pub k_def: f32,
    /// Потолок любого шанса
    pub chance_cap: f32,
    /// Миллисекунд стана за единицу фактического урона
    pub stun_ms_per_point: f32,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            k_evasion: 0.01,
            k_defense: 0.01,
            base_critical: 0.1,
            crit_multiplier: 1.5,
            k_pow: 1.0,
            k_def: 1.0,
            chance_cap: 0.95,
            stun_ms_per_point: 250.0,
        }
    }
}

/// Модификаторы стата для атакующей части: тип атаки + активные эффекты (scan).
///
/// Hook-точка StatCalc: новые типы атак добавляются записью в
/// [`AttackTypeTable`], калькулятор не меняется.
pub fn stat_modifiers(
    world: &World,
    attacker: Entity,
    part_entity: Entity,
    stat: StatKind,
    table: &AttackTypeTable,
) -> i32 {
    let mut bonus = 0i32;

    if let Some(logic) = world.get::<ActionLogic>(part_entity) {
        let def = table.get(logic.attack_type);
        for modifier in def.modifiers.iter().filter(|m| m.stat == stat) {
            bonus += match modifier.source {
                ModifierSource::AttackerLegs { stat, factor } => {
                    legs_stat(world, attacker, stat) as f32 * factor
                }
                ModifierSource::AttackingPart { stat, factor } => world
                    .get::<PartStats>(part_entity)
                    .map(|s| s.get(stat) as f32 * factor)
                    .unwrap_or(0.0),
                ModifierSource::Flat { value } => value as f32,
            }
            .floor() as i32;
        }
    }

    if let Some(effects) = world.get::<ActiveEffects>(attacker) {
        bonus += effects.stat_bonus(stat);
    }

    bonus
}

/// Стат части с учётом модификаторов
pub fn effective_stat(
    world: &World,
    attacker: Entity,
    part_entity: Entity,
    stat: StatKind,
    table: &AttackTypeTable,
) -> i32 {
    let base = world
        .get::<PartStats>(part_entity)
        .map(|s| s.get(stat) as i32)
        .unwrap_or(0);
    base + stat_modifiers(world, attacker, part_entity, stat, table)
}

/// Стат ног бойца; разбитые ноги не дают ничего
fn legs_stat(world: &World, combatant: Entity, stat: StatKind) -> u32 {
    let Some(parts) = world.get::<PartSet>(combatant) else {
        return 0;
    };
    let legs = parts.legs;
    let usable = world
        .get::<PartStatus>(legs)
        .map(|s| s.is_usable())
        .unwrap_or(false);
    if !usable {
        return 0;
    }
    world
        .get::<PartStats>(legs)
        .map(|s| s.get(stat))
        .unwrap_or(0)
}

/// Множитель скорости заряда для выбранной части
pub fn speed_multiplier_for(world: &World, part_entity: Entity, table: &AttackTypeTable) -> f32 {
    world
        .get::<ActionLogic>(part_entity)
        .map(|logic| table.get(logic.attack_type).speed_multiplier)
        .unwrap_or(1.0)
}

/// Бросает исход попадания: hit → critical → defended.
///
/// Perfect accuracy пропускает бросок уклонения; критическое попадание
/// пропускает бросок защиты.
pub fn roll_outcome(
    world: &World,
    rng: &mut DeterministicRng,
    tuning: &CombatTuning,
    table: &AttackTypeTable,
    attacker: Entity,
    part_entity: Entity,
    target: Entity,
    intended_part: PartKey,
) -> Outcome {
    let accuracy = world
        .get::<AccuracyBehavior>(part_entity)
        .copied()
        .unwrap_or(AccuracyBehavior::Standard);

    let is_hit = match accuracy {
        AccuracyBehavior::Perfect => true,
        AccuracyBehavior::Standard => {
            let success = effective_stat(world, attacker, part_entity, StatKind::Success, table);
            let mobility = legs_stat(world, target, StatKind::Mobility) as i32;
            let evasion =
                ((mobility - success).max(0) as f32 * tuning.k_evasion).min(tuning.chance_cap);
            !rng.chance(evasion)
        }
    };

    if !is_hit {
        return Outcome {
            is_hit: false,
            is_critical: false,
            is_defended: false,
            final_target_part: intended_part,
        };
    }

    let mut critical = tuning.base_critical;
    if let Some(bonus) = world.get::<TraitCriticalBonus>(part_entity) {
        critical += bonus.rate;
    }
    if let Some(logic) = world.get::<ActionLogic>(part_entity) {
        critical += table.get(logic.attack_type).critical_bonus;
    }
    let is_critical = rng.chance(critical.min(tuning.chance_cap));

    let mut is_defended = false;
    let mut final_target_part = intended_part;
    if !is_critical {
        let armor = legs_stat(world, target, StatKind::Armor) as f32;
        if rng.chance((armor * tuning.k_defense).min(tuning.chance_cap)) {
            if let Some(part) = targeting::find_best_defense_part(world, target) {
                is_defended = true;
                final_target_part = part;
            }
        }
    }

    Outcome {
        is_hit,
        is_critical,
        is_defended,
        final_target_part,
    }
}

/// Формула урона.
///
/// damage = max(1, floor(power × k_pow − totalDefense × k_def)), где
/// totalDefense = legsDefense + floor(legsStability / 2); критическое
/// попадание обнуляет защиту и умножает на crit_multiplier.
pub fn compute_damage(
    tuning: &CombatTuning,
    effective_power: i32,
    legs_defense: u32,
    legs_stability: u32,
    is_critical: bool,
) -> u32 {
    let total_defense = if is_critical {
        0.0
    } else {
        (legs_defense + legs_stability / 2) as f32
    };
    let mut base = effective_power.max(0) as f32 * tuning.k_pow - total_defense * tuning.k_def;
    if is_critical {
        base *= tuning.crit_multiplier;
    }
    (base.floor() as i64).max(1) as u32
}

/// Защитные статы ног цели для формулы урона
pub fn target_defense(world: &World, target: Entity) -> (u32, u32) {
    (
        legs_stat(world, target, StatKind::Defense),
        legs_stat(world, target, StatKind::Stability),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_formula_basic() {
        let tuning = CombatTuning::default();
        // power 25 против defense 2 + stability 10/2 = 7
        assert_eq!(compute_damage(&tuning, 25, 2, 10, false), 18);
    }

    #[test]
    fn test_damage_floors_at_one() {
        let tuning = CombatTuning::default();
        assert_eq!(compute_damage(&tuning, 0, 50, 40, false), 1);
    }

    #[test]
    fn test_critical_bypasses_defense() {
        let tuning = CombatTuning::default();
        // 20 × 1.5 = 30, защита не вычитается
        assert_eq!(compute_damage(&tuning, 20, 50, 40, true), 30);
    }
}
