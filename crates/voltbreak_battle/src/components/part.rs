//! Part sub-entity components.
//!
//! Каждая часть робота — отдельная entity, принадлежащая бойцу:
//! статы, статус HP, поведение действия и trait tags живут на ней.
//! Боец хранит четыре id в `PartSet`, часть — обратную ссылку
//! `AttachedToOwner`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// Part keys & stats
// ============================================================================

/// Слот части: голова, правая рука, левая рука, ноги
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartKey {
    Head,
    RightArm,
    LeftArm,
    Legs,
}

impl PartKey {
    pub const ALL: [PartKey; 4] = [
        PartKey::Head,
        PartKey::RightArm,
        PartKey::LeftArm,
        PartKey::Legs,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PartKey::Head => "head",
            PartKey::RightArm => "right arm",
            PartKey::LeftArm => "left arm",
            PartKey::Legs => "legs",
        }
    }
}

/// Закрытый список статов части
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    Might,
    Success,
    Armor,
    Mobility,
    Propulsion,
    Stability,
    Defense,
}

/// Статический блок статов части (неизменен в бою)
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PartStats {
    pub might: u32,
    pub success: u32,
    pub armor: u32,
    pub mobility: u32,
    pub propulsion: u32,
    pub stability: u32,
    pub defense: u32,
}

impl PartStats {
    pub fn get(&self, stat: StatKind) -> u32 {
        match stat {
            StatKind::Might => self.might,
            StatKind::Success => self.success,
            StatKind::Armor => self.armor,
            StatKind::Mobility => self.mobility,
            StatKind::Propulsion => self.propulsion,
            StatKind::Stability => self.stability,
            StatKind::Defense => self.defense,
        }
    }
}

// ============================================================================
// Part status
// ============================================================================

/// Динамический статус части
///
/// Инварианты: 0 ≤ hp ≤ max_hp; is_broken однажды выставлен — не снимается
/// до конца боя (лечение разбитую часть не воскрешает).
#[derive(Component, Debug, Clone, Copy)]
pub struct PartStatus {
    pub hp: u32,
    pub max_hp: u32,
    pub is_broken: bool,
}

impl PartStatus {
    pub fn new(max_hp: u32) -> Self {
        Self {
            hp: max_hp,
            max_hp,
            is_broken: false,
        }
    }

    pub fn is_usable(&self) -> bool {
        !self.is_broken && self.hp > 0
    }

    /// Снимает HP, возвращает фактически снятое. Ломает часть на нуле.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.hp);
        self.hp -= actual;
        if self.hp == 0 {
            self.is_broken = true;
        }
        actual
    }

    /// Лечит до max_hp, возвращает фактическое лечение. Разбитую часть не трогает.
    pub fn heal(&mut self, amount: u32) -> u32 {
        if self.is_broken {
            return 0;
        }
        let actual = amount.min(self.max_hp - self.hp);
        self.hp += actual;
        actual
    }
}

// ============================================================================
// Behaviour descriptors
// ============================================================================

/// Категория действия части
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionCategory {
    Shoot,
    Melee,
    Heal,
    Support,
    Interrupt,
    Defend,
}

/// Тип атаки (ссылка в каталог attack-type определений)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackType {
    Rifle,
    AimedShot,
    Sword,
    Hammer,
    Assist,
}

/// Что делает часть при исполнении
#[derive(Component, Debug, Clone, Copy)]
pub struct ActionLogic {
    pub category: ActionCategory,
    pub attack_type: AttackType,
    pub is_support: bool,
}

/// Когда выбирается цель
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetTiming {
    /// Цель фиксируется при выборе действия
    PreMove,
    /// Цель выбирается в момент исполнения
    PostMove,
}

/// Кого может выбрать часть
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetScope {
    EnemySingle,
    AllySingle,
    AllyTeam,
    SelfOnly,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct TargetingBehavior {
    pub timing: TargetTiming,
    pub scope: TargetScope,
}

/// Перехват попадания: Standard бросает evasion, Perfect — нет
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccuracyBehavior {
    Standard,
    Perfect,
}

/// Список эффектов, генерируемых частью при исполнении
#[derive(Component, Debug, Clone, Default)]
pub struct ImpactBehavior {
    pub effects: Vec<crate::catalog::parts::EffectDef>,
}

/// Обратная ссылка части на владельца
#[derive(Component, Debug, Clone, Copy)]
pub struct AttachedToOwner {
    pub owner: Entity,
    pub part_key: PartKey,
}

// ============================================================================
// Trait tags
// ============================================================================

/// Overkill-урон переносится на случайную живую часть
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct TraitPenetrate;

/// Бонус к шансу критического попадания
#[derive(Component, Debug, Clone, Copy)]
pub struct TraitCriticalBonus {
    pub rate: f32,
}

/// Часть может держать стойку Guard; count — базовый запас перехватов
#[derive(Component, Debug, Clone, Copy)]
pub struct TraitGuard {
    pub count: u32,
}

/// Подсказки презентации для деклараций и сообщений об эффекте
#[derive(Component, Debug, Clone)]
pub struct PartVisualConfig {
    pub display_name: String,
    pub vfx_class: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_damage_clamps_and_breaks() {
        let mut status = PartStatus::new(30);
        assert_eq!(status.take_damage(20), 20);
        assert_eq!(status.hp, 10);
        assert!(!status.is_broken);

        // Overkill: снимается только остаток
        assert_eq!(status.take_damage(50), 10);
        assert_eq!(status.hp, 0);
        assert!(status.is_broken);
    }

    #[test]
    fn test_heal_refuses_broken_part() {
        let mut status = PartStatus::new(30);
        status.take_damage(30);
        assert!(status.is_broken);
        assert_eq!(status.heal(10), 0);
        assert_eq!(status.hp, 0);
    }

    #[test]
    fn test_heal_at_max_is_zero() {
        let mut status = PartStatus::new(30);
        assert_eq!(status.heal(10), 0);

        status.take_damage(5);
        assert_eq!(status.heal(10), 5);
        assert_eq!(status.hp, 30);
    }
}
