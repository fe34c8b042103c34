//! Part catalog: статические определения частей.
//!
//! Каталог читается из данных (serde) или берётся встроенный набор
//! [`builtin_parts`] — достаточно для двух команд по три робота и всех
//! видов эффектов.

use serde::{Deserialize, Serialize};

use crate::combat::effects::EffectKind;
use crate::components::part::{
    AccuracyBehavior, ActionCategory, AttackType, PartStats, StatKind, TargetScope, TargetTiming,
};

/// Слот, в который ставится часть
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartSlot {
    Head,
    Arm,
    Legs,
}

/// Как вычисляется величина эффекта
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CalculationDef {
    /// Полная формула урона от стата мощности атакующей части
    PowerFormula { power_stat: StatKind },
    /// Фиксированное значение (penetration-цепочка)
    Fixed { value: i32 },
    /// floor(stat × factor) атакующей части
    StatScaled { source: StatKind, factor: f32 },
}

/// Параметры эффекта (закрытая грамматика, без замыканий)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectParams {
    pub duration_ms: Option<f32>,
    /// Какой стат модифицирует scan
    pub stat: Option<StatKind>,
    /// floor(might × count_factor) перехватов у guard
    pub count_factor: Option<f32>,
}

/// Одно определение эффекта на части
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDef {
    pub kind: EffectKind,
    pub calculation: Option<CalculationDef>,
    #[serde(default)]
    pub params: EffectParams,
}

/// Поведение действия части
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDef {
    pub category: ActionCategory,
    pub attack_type: AttackType,
    pub accuracy: AccuracyBehavior,
    pub timing: TargetTiming,
    pub scope: TargetScope,
    pub effects: Vec<EffectDef>,
    #[serde(default)]
    pub penetrate: bool,
    #[serde(default)]
    pub critical_bonus: Option<f32>,
    #[serde(default)]
    pub guard_count: Option<u32>,
}

/// Полное определение части в каталоге
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartDef {
    pub id: String,
    pub name: String,
    pub slot: PartSlot,
    pub hp: u32,
    pub stats: PartStats,
    pub action: Option<ActionDef>,
    #[serde(default)]
    pub vfx_class: String,
}

fn damage_action(
    attack_type: AttackType,
    accuracy: AccuracyBehavior,
    timing: TargetTiming,
    penetrate: bool,
) -> ActionDef {
    let category = match attack_type {
        AttackType::Rifle | AttackType::AimedShot => ActionCategory::Shoot,
        _ => ActionCategory::Melee,
    };
    ActionDef {
        category,
        attack_type,
        accuracy,
        timing,
        scope: TargetScope::EnemySingle,
        effects: vec![EffectDef {
            kind: EffectKind::Damage,
            calculation: Some(CalculationDef::PowerFormula {
                power_stat: StatKind::Might,
            }),
            params: EffectParams::default(),
        }],
        penetrate,
        critical_bonus: None,
        guard_count: None,
    }
}

/// Встроенный каталог частей
pub fn builtin_parts() -> Vec<PartDef> {
    vec![
        // --- Heads ---
        PartDef {
            id: "head-watchman".into(),
            name: "Watchman".into(),
            slot: PartSlot::Head,
            hp: 40,
            stats: PartStats {
                might: 12,
                success: 30,
                armor: 10,
                stability: 10,
                ..Default::default()
            },
            action: Some(ActionDef {
                category: ActionCategory::Support,
                attack_type: AttackType::Assist,
                accuracy: AccuracyBehavior::Perfect,
                timing: TargetTiming::PreMove,
                scope: TargetScope::AllyTeam,
                effects: vec![EffectDef {
                    kind: EffectKind::ApplyScan,
                    calculation: Some(CalculationDef::StatScaled {
                        source: StatKind::Success,
                        factor: 0.5,
                    }),
                    params: EffectParams {
                        duration_ms: Some(15_000.0),
                        stat: Some(StatKind::Success),
                        ..Default::default()
                    },
                }],
                penetrate: false,
                critical_bonus: None,
                guard_count: None,
            }),
            vfx_class: "fx-scan".into(),
        },
        PartDef {
            id: "head-vanguard".into(),
            name: "Vanguard".into(),
            slot: PartSlot::Head,
            hp: 45,
            stats: PartStats {
                armor: 12,
                stability: 12,
                ..Default::default()
            },
            action: None,
            vfx_class: String::new(),
        },
        // --- Arms: damage ---
        PartDef {
            id: "arm-rifle".into(),
            name: "Volt Rifle".into(),
            slot: PartSlot::Arm,
            hp: 35,
            stats: PartStats {
                might: 22,
                success: 55,
                armor: 8,
                ..Default::default()
            },
            action: Some(damage_action(
                AttackType::Rifle,
                AccuracyBehavior::Standard,
                TargetTiming::PreMove,
                false,
            )),
            vfx_class: "fx-shot".into(),
        },
        PartDef {
            id: "arm-longshot".into(),
            name: "Longshot".into(),
            slot: PartSlot::Arm,
            hp: 30,
            stats: PartStats {
                might: 25,
                success: 70,
                armor: 6,
                ..Default::default()
            },
            action: Some(damage_action(
                AttackType::AimedShot,
                AccuracyBehavior::Standard,
                TargetTiming::PreMove,
                false,
            )),
            vfx_class: "fx-snipe".into(),
        },
        PartDef {
            id: "arm-blade".into(),
            name: "Arc Blade".into(),
            slot: PartSlot::Arm,
            hp: 38,
            stats: PartStats {
                might: 28,
                success: 60,
                armor: 10,
                ..Default::default()
            },
            action: Some(damage_action(
                AttackType::Sword,
                AccuracyBehavior::Standard,
                TargetTiming::PostMove,
                true,
            )),
            vfx_class: "fx-slash".into(),
        },
        // --- Arms: utility ---
        PartDef {
            id: "arm-repair".into(),
            name: "Repair Kit".into(),
            slot: PartSlot::Arm,
            hp: 32,
            stats: PartStats {
                might: 18,
                success: 50,
                armor: 8,
                ..Default::default()
            },
            action: Some(ActionDef {
                category: ActionCategory::Heal,
                attack_type: AttackType::Assist,
                accuracy: AccuracyBehavior::Perfect,
                timing: TargetTiming::PostMove,
                scope: TargetScope::AllySingle,
                effects: vec![EffectDef {
                    kind: EffectKind::Heal,
                    calculation: Some(CalculationDef::PowerFormula {
                        power_stat: StatKind::Might,
                    }),
                    params: EffectParams::default(),
                }],
                penetrate: false,
                critical_bonus: None,
                guard_count: None,
            }),
            vfx_class: "fx-repair".into(),
        },
        PartDef {
            id: "arm-aegis".into(),
            name: "Aegis Plate".into(),
            slot: PartSlot::Arm,
            hp: 42,
            stats: PartStats {
                might: 20,
                armor: 14,
                ..Default::default()
            },
            action: Some(ActionDef {
                category: ActionCategory::Defend,
                attack_type: AttackType::Assist,
                accuracy: AccuracyBehavior::Perfect,
                timing: TargetTiming::PreMove,
                scope: TargetScope::SelfOnly,
                effects: vec![EffectDef {
                    kind: EffectKind::ApplyGuard,
                    calculation: None,
                    params: EffectParams {
                        count_factor: Some(0.1),
                        ..Default::default()
                    },
                }],
                penetrate: false,
                critical_bonus: None,
                guard_count: Some(2),
            }),
            vfx_class: "fx-guard".into(),
        },
        PartDef {
            id: "arm-jammer".into(),
            name: "Jammer".into(),
            slot: PartSlot::Arm,
            hp: 28,
            stats: PartStats {
                might: 10,
                success: 65,
                ..Default::default()
            },
            action: Some(ActionDef {
                category: ActionCategory::Interrupt,
                attack_type: AttackType::Rifle,
                accuracy: AccuracyBehavior::Standard,
                timing: TargetTiming::PreMove,
                scope: TargetScope::EnemySingle,
                effects: vec![EffectDef {
                    kind: EffectKind::ApplyGlitch,
                    calculation: None,
                    params: EffectParams::default(),
                }],
                penetrate: false,
                critical_bonus: None,
                guard_count: None,
            }),
            vfx_class: "fx-glitch".into(),
        },
        PartDef {
            id: "arm-shockmaul".into(),
            name: "Shock Maul".into(),
            slot: PartSlot::Arm,
            hp: 36,
            stats: PartStats {
                might: 24,
                success: 50,
                armor: 9,
                ..Default::default()
            },
            action: Some(ActionDef {
                category: ActionCategory::Melee,
                attack_type: AttackType::Hammer,
                accuracy: AccuracyBehavior::Standard,
                timing: TargetTiming::PostMove,
                scope: TargetScope::EnemySingle,
                effects: vec![EffectDef {
                    kind: EffectKind::ApplyStun,
                    calculation: Some(CalculationDef::PowerFormula {
                        power_stat: StatKind::Might,
                    }),
                    params: EffectParams::default(),
                }],
                penetrate: false,
                critical_bonus: None,
                guard_count: None,
            }),
            vfx_class: "fx-shock".into(),
        },
        // --- Legs ---
        PartDef {
            id: "legs-strider".into(),
            name: "Strider".into(),
            slot: PartSlot::Legs,
            hp: 30,
            stats: PartStats {
                mobility: 20,
                propulsion: 30,
                stability: 10,
                defense: 2,
                armor: 15,
                ..Default::default()
            },
            action: None,
            vfx_class: String::new(),
        },
        PartDef {
            id: "legs-bulwark".into(),
            name: "Bulwark".into(),
            slot: PartSlot::Legs,
            hp: 40,
            stats: PartStats {
                mobility: 10,
                propulsion: 20,
                stability: 30,
                defense: 8,
                armor: 20,
                ..Default::default()
            },
            action: None,
            vfx_class: String::new(),
        },
    ]
}
