//! Attack-type definitions: модификаторы статов, крит-бонус, множитель заряда.
//!
//! Таблица — master data (read-only): новые типы атак расширяются записью
//! в таблице, калькулятор не трогаем.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::components::part::{AttackType, StatKind};

/// Откуда берётся величина модификатора
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ModifierSource {
    /// floor(stat ног атакующего × factor)
    AttackerLegs { stat: StatKind, factor: f32 },
    /// floor(stat атакующей части × factor)
    AttackingPart { stat: StatKind, factor: f32 },
    /// Константа
    Flat { value: i32 },
}

/// Один модификатор стата от типа атаки
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatModifierDef {
    /// Какой стат усиливается
    pub stat: StatKind,
    pub source: ModifierSource,
}

/// Определение типа атаки
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackTypeDef {
    /// Множитель скорости заряда при выбранном действии этого типа
    pub speed_multiplier: f32,
    /// Добавка к шансу критического попадания
    pub critical_bonus: f32,
    pub modifiers: Vec<StatModifierDef>,
}

impl Default for AttackTypeDef {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            critical_bonus: 0.0,
            modifiers: Vec::new(),
        }
    }
}

/// Таблица типов атак (resource; master data)
#[derive(Resource, Debug, Clone)]
pub struct AttackTypeTable {
    pub defs: HashMap<AttackType, AttackTypeDef>,
}

impl AttackTypeTable {
    pub fn get(&self, attack_type: AttackType) -> AttackTypeDef {
        self.defs.get(&attack_type).cloned().unwrap_or_default()
    }
}

impl Default for AttackTypeTable {
    fn default() -> Self {
        let mut defs = HashMap::new();
        // Стрельба заряжается медленнее
        defs.insert(
            AttackType::Rifle,
            AttackTypeDef {
                speed_multiplier: 0.75,
                critical_bonus: 0.0,
                modifiers: Vec::new(),
            },
        );
        // Прицельный выстрел: точность от устойчивости ног, высокий крит
        defs.insert(
            AttackType::AimedShot,
            AttackTypeDef {
                speed_multiplier: 0.75,
                critical_bonus: 0.5,
                modifiers: vec![StatModifierDef {
                    stat: StatKind::Success,
                    source: ModifierSource::AttackerLegs {
                        stat: StatKind::Stability,
                        factor: 0.5,
                    },
                }],
            },
        );
        defs.insert(
            AttackType::Sword,
            AttackTypeDef {
                speed_multiplier: 1.0,
                critical_bonus: 0.25,
                modifiers: Vec::new(),
            },
        );
        // Молот: тяжёлый замах, мощность от устойчивости
        defs.insert(
            AttackType::Hammer,
            AttackTypeDef {
                speed_multiplier: 1.0,
                critical_bonus: 0.0,
                modifiers: vec![StatModifierDef {
                    stat: StatKind::Might,
                    source: ModifierSource::AttackerLegs {
                        stat: StatKind::Stability,
                        factor: 0.25,
                    },
                }],
            },
        );
        defs.insert(AttackType::Assist, AttackTypeDef::default());
        Self { defs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shoot_types_charge_slower() {
        let table = AttackTypeTable::default();
        assert_eq!(table.get(AttackType::Rifle).speed_multiplier, 0.75);
        assert_eq!(table.get(AttackType::AimedShot).speed_multiplier, 0.75);
        assert_eq!(table.get(AttackType::Sword).speed_multiplier, 1.0);
    }

    #[test]
    fn test_aimed_shot_has_stability_modifier() {
        let table = AttackTypeTable::default();
        let def = table.get(AttackType::AimedShot);
        assert_eq!(def.modifiers.len(), 1);
        assert_eq!(def.modifiers[0].stat, StatKind::Success);
        assert!(def.critical_bonus > 0.0);
    }
}
