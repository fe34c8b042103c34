//! Battle integration tests
//!
//! Сценарии end-to-end: попадание, перехват, слом guard, penetration,
//! глитч, нокаут лидера. Разрешение действия гоняется через настоящий
//! резолвер и командный интерпретатор; полный бой — через headless app.

use bevy::prelude::*;

use voltbreak_battle::battle::context::{
    BattleContext, BattleHistory, SelectionQueue, TeamConfig,
};
use voltbreak_battle::battle::setup::{spawn_battle, BattleLoadout, MemberLoadout, TeamLoadout};
use voltbreak_battle::catalog::attack_types::AttackTypeTable;
use voltbreak_battle::catalog::parts::{
    ActionDef, CalculationDef, EffectDef, EffectParams, PartDef, PartSlot,
};
use voltbreak_battle::catalog::MasterData;
use voltbreak_battle::combat::calculator::CombatTuning;
use voltbreak_battle::combat::effects::{self, EffectKind};
use voltbreak_battle::combat::resolver::{resolve_action, ResolvedAction};
use voltbreak_battle::commands::execute_commands;
use voltbreak_battle::components::combatant::{
    ActionIntent, ActiveEffectKind, ActiveEffects, EffectTiming, Gauge, PartSet, TimedEffect,
};
use voltbreak_battle::components::part::{
    AccuracyBehavior, ActionCategory, AttackType, PartKey, PartStats, PartStatus, TargetScope,
    TargetTiming,
};
use voltbreak_battle::components::state::{current_state, transition_to, CombatantState};
use voltbreak_battle::events::{ActionCancelledEvent, HpChanged, PartBrokenEvent};
use voltbreak_battle::sequence::{builder, TaskDef};
use voltbreak_battle::{DeterministicRng, FrameClock};

// --- Catalog builders ---

fn head_part(id: &str, hp: u32) -> PartDef {
    PartDef {
        id: id.into(),
        name: id.into(),
        slot: PartSlot::Head,
        hp,
        stats: PartStats::default(),
        action: None,
        vfx_class: String::new(),
    }
}

fn legs_part(
    id: &str,
    hp: u32,
    mobility: u32,
    armor: u32,
    stability: u32,
    defense: u32,
) -> PartDef {
    PartDef {
        id: id.into(),
        name: id.into(),
        slot: PartSlot::Legs,
        hp,
        stats: PartStats {
            mobility,
            armor,
            stability,
            defense,
            propulsion: 30,
            ..Default::default()
        },
        action: None,
        vfx_class: String::new(),
    }
}

fn damage_arm(
    id: &str,
    hp: u32,
    might: u32,
    success: u32,
    attack_type: AttackType,
    accuracy: AccuracyBehavior,
    penetrate: bool,
) -> PartDef {
    let category = match attack_type {
        AttackType::Rifle | AttackType::AimedShot => ActionCategory::Shoot,
        _ => ActionCategory::Melee,
    };
    PartDef {
        id: id.into(),
        name: id.into(),
        slot: PartSlot::Arm,
        hp,
        stats: PartStats {
            might,
            success,
            ..Default::default()
        },
        action: Some(ActionDef {
            category,
            attack_type,
            accuracy,
            timing: TargetTiming::PreMove,
            scope: TargetScope::EnemySingle,
            effects: vec![EffectDef {
                kind: EffectKind::Damage,
                calculation: Some(CalculationDef::PowerFormula {
                    power_stat: voltbreak_battle::components::part::StatKind::Might,
                }),
                params: EffectParams::default(),
            }],
            penetrate,
            critical_bonus: None,
            guard_count: None,
        }),
        vfx_class: String::new(),
    }
}

fn effect_arm(id: &str, hp: u32, might: u32, kind: EffectKind) -> PartDef {
    let (category, effects) = match kind {
        EffectKind::ApplyGlitch => (
            ActionCategory::Interrupt,
            vec![EffectDef {
                kind,
                calculation: None,
                params: EffectParams::default(),
            }],
        ),
        EffectKind::ApplyStun => (
            ActionCategory::Melee,
            vec![EffectDef {
                kind,
                calculation: Some(CalculationDef::PowerFormula {
                    power_stat: voltbreak_battle::components::part::StatKind::Might,
                }),
                params: EffectParams::default(),
            }],
        ),
        _ => (ActionCategory::Melee, Vec::new()),
    };
    PartDef {
        id: id.into(),
        name: id.into(),
        slot: PartSlot::Arm,
        hp,
        stats: PartStats {
            might,
            success: 60,
            ..Default::default()
        },
        action: Some(ActionDef {
            category,
            attack_type: AttackType::Hammer,
            accuracy: AccuracyBehavior::Perfect,
            timing: TargetTiming::PreMove,
            scope: TargetScope::EnemySingle,
            effects,
            penetrate: false,
            critical_bonus: None,
            guard_count: None,
        }),
        vfx_class: String::new(),
    }
}

fn heal_arm(id: &str, hp: u32, might: u32) -> PartDef {
    PartDef {
        id: id.into(),
        name: id.into(),
        slot: PartSlot::Arm,
        hp,
        stats: PartStats {
            might,
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
                    power_stat: voltbreak_battle::components::part::StatKind::Might,
                }),
                params: EffectParams::default(),
            }],
            penetrate: false,
            critical_bonus: None,
            guard_count: None,
        }),
        vfx_class: String::new(),
    }
}

fn scan_head(id: &str, hp: u32, success: u32) -> PartDef {
    PartDef {
        id: id.into(),
        name: id.into(),
        slot: PartSlot::Head,
        hp,
        stats: PartStats {
            success,
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
                    source: voltbreak_battle::components::part::StatKind::Success,
                    factor: 0.5,
                }),
                params: EffectParams {
                    duration_ms: Some(10_000.0),
                    stat: Some(voltbreak_battle::components::part::StatKind::Success),
                    ..Default::default()
                },
            }],
            penetrate: false,
            critical_bonus: None,
            guard_count: None,
        }),
        vfx_class: String::new(),
    }
}

fn member(name: &str, head: &str, right: &str, left: &str, legs: &str, leader: bool) -> MemberLoadout {
    MemberLoadout {
        name: name.into(),
        medal: "none".into(),
        head: head.into(),
        right_arm: right.into(),
        left_arm: left.into(),
        legs: legs.into(),
        is_leader: leader,
        color: String::new(),
    }
}

/// Tuning без случайности: крит и защита выключены
fn flat_tuning() -> CombatTuning {
    CombatTuning {
        base_critical: 0.0,
        k_defense: 0.0,
        ..Default::default()
    }
}

/// Таблица типов атак без крит-бонусов (детерминизм сценариев)
fn flat_attack_table() -> AttackTypeTable {
    let mut table = AttackTypeTable::default();
    for def in table.defs.values_mut() {
        def.critical_bonus = 0.0;
    }
    table
}

/// Мир с ресурсами ядра + заспавненный бой из заданного каталога
fn setup_world(parts: Vec<PartDef>, loadout: &BattleLoadout, seed: u64) -> (World, Vec<Entity>) {
    let mut world = World::new();
    world.insert_resource(FrameClock::default());
    world.insert_resource(DeterministicRng::new(seed));
    world.insert_resource(flat_tuning());
    world.insert_resource(flat_attack_table());
    world.insert_resource(BattleContext::default());
    world.insert_resource(SelectionQueue::default());
    world.insert_resource(BattleHistory::default());
    world.insert_resource(TeamConfig::default());

    let mut data = MasterData::default();
    for part in parts {
        data.parts.insert(part.id.clone(), part);
    }
    world.insert_resource(data);

    let combatants = spawn_battle(&mut world, loadout);
    (world, combatants)
}

fn one_vs_one(parts: Vec<PartDef>, alpha: MemberLoadout, beta: MemberLoadout) -> (World, Entity, Entity) {
    let loadout = BattleLoadout {
        alpha: TeamLoadout {
            ai: true,
            members: vec![alpha],
        },
        beta: TeamLoadout {
            ai: true,
            members: vec![beta],
        },
    };
    let (world, combatants) = setup_world(parts, &loadout, 7);
    assert_eq!(combatants.len(), 2);
    (world, combatants[0], combatants[1])
}

fn set_intent(world: &mut World, attacker: Entity, part_key: PartKey, target: Entity, target_part: PartKey) {
    world.entity_mut(attacker).insert(ActionIntent {
        part_key,
        target: Some(target),
        target_part: Some(target_part),
    });
}

/// Исполняет ApplyState последовательности (как это сделал бы task runner)
fn finish_action(world: &mut World, resolved: &ResolvedAction) {
    let tasks = builder::build_sequence(world, resolved);
    for task in tasks {
        if let TaskDef::ApplyState { commands } = task {
            execute_commands(world, &commands);
        }
    }
}

fn part_hp(world: &World, combatant: Entity, key: PartKey) -> u32 {
    let parts = world.get::<PartSet>(combatant).unwrap();
    world.get::<PartStatus>(parts.get(key)).unwrap().hp
}

fn count_events<E: Component>(world: &mut World) -> usize {
    let mut query = world.query::<&E>();
    query.iter(world).count()
}

// --- Scenario 1: simple hit ---

#[test]
fn test_simple_aimed_hit() {
    let parts = vec![
        head_part("t-head", 40),
        damage_arm(
            "t-aimed",
            30,
            25,
            70,
            AttackType::AimedShot,
            AccuracyBehavior::Standard,
            false,
        ),
        legs_part("t-legs-fast", 30, 5, 5, 30, 1),
        legs_part("t-legs-def", 30, 20, 15, 10, 2),
    ];
    let (mut world, attacker, target) = one_vs_one(
        parts,
        member("Sniper", "t-head", "t-aimed", "t-aimed", "t-legs-fast", true),
        member("Dummy", "t-head", "t-aimed", "t-aimed", "t-legs-def", true),
    );

    set_intent(&mut world, attacker, PartKey::RightArm, target, PartKey::Head);
    let resolved = resolve_action(&mut world, attacker);

    let outcome = resolved.result.outcome.expect("outcome");
    assert!(outcome.is_hit);
    assert!(!outcome.is_critical);

    // effectiveSuccess = 70 + floor(30 × 0.5) = 85 ≥ mobility 20 → hit;
    // damage = floor(25 − (2 + 10/2)) = 18
    assert_eq!(resolved.result.applied.len(), 1);
    let damage = &resolved.result.applied[0];
    assert_eq!(damage.value, 18);
    assert!(!damage.broke_part);
    assert_eq!(part_hp(&world, target, PartKey::Head), 40 - 18);
    assert_eq!(count_events::<HpChanged>(&mut world), 1);
    assert_eq!(count_events::<PartBrokenEvent>(&mut world), 0);

    finish_action(&mut world, &resolved);
    assert_eq!(
        current_state(&world, attacker),
        Some(CombatantState::Cooldown)
    );
    assert!(world.get::<ActionIntent>(attacker).is_none());
}

// --- Scenarios 2 & 3: guardian intercept and guard break ---

fn guardian_setup(attacker_might: u32) -> (World, Entity, Entity, Entity) {
    let parts = vec![
        head_part("t-head", 30),
        head_part("t-head-big", 40),
        damage_arm(
            "t-cannon",
            30,
            attacker_might,
            60,
            AttackType::Rifle,
            AccuracyBehavior::Perfect,
            false,
        ),
        damage_arm(
            "t-guard-arm",
            40,
            10,
            40,
            AttackType::Sword,
            AccuracyBehavior::Standard,
            false,
        ),
        legs_part("t-legs-plain", 30, 0, 0, 0, 0),
    ];
    let loadout = BattleLoadout {
        alpha: TeamLoadout {
            ai: true,
            members: vec![member(
                "Gunner",
                "t-head-big",
                "t-cannon",
                "t-cannon",
                "t-legs-plain",
                true,
            )],
        },
        beta: TeamLoadout {
            ai: true,
            members: vec![
                member("Fragile", "t-head", "t-guard-arm", "t-guard-arm", "t-legs-plain", true),
                member("Shield", "t-head-big", "t-guard-arm", "t-guard-arm", "t-legs-plain", false),
            ],
        },
    };
    let (mut world, combatants) = setup_world(parts, &loadout, 11);
    let (attacker, target, guardian) = (combatants[0], combatants[1], combatants[2]);

    // Перехватчик стоит в стойке: правая рука, 2 заряда
    world
        .get_mut::<ActiveEffects>(guardian)
        .unwrap()
        .upsert(TimedEffect {
            kind: ActiveEffectKind::Guard,
            value: 2,
            part_key: Some(PartKey::RightArm),
            timing: EffectTiming::Count { left: 2 },
            elapsed_ms: 0.0,
            stat: None,
            resume: None,
        });
    transition_to(&mut world, guardian, CombatantState::Guarding);

    (world, attacker, target, guardian)
}

#[test]
fn test_guardian_intercepts_attack() {
    let (mut world, attacker, target, guardian) = guardian_setup(35);
    set_intent(&mut world, attacker, PartKey::RightArm, target, PartKey::Head);

    let resolved = resolve_action(&mut world, attacker);
    let result = &resolved.result;

    assert_eq!(result.intended_target, Some(target));
    assert_eq!(result.final_target, Some(guardian));
    assert_eq!(
        result.guardian.map(|g| (g.guardian, g.part_key)),
        Some((guardian, PartKey::RightArm))
    );

    // 35 урона в guard-руку (40 HP → 5), заряд 2 → 1, стойка держится
    assert_eq!(part_hp(&world, guardian, PartKey::RightArm), 5);
    assert_eq!(part_hp(&world, target, PartKey::Head), 30);
    assert!(!result.summary.is_guard_broken);
    assert!(!result.summary.is_guard_expired);
    let guard = world
        .get::<ActiveEffects>(guardian)
        .unwrap()
        .find(ActiveEffectKind::Guard)
        .cloned()
        .expect("guard effect");
    assert_eq!(guard.timing, EffectTiming::Count { left: 1 });

    finish_action(&mut world, &resolved);
    assert_eq!(
        current_state(&world, guardian),
        Some(CombatantState::Guarding)
    );
}

#[test]
fn test_guard_break_resets_guardian() {
    let (mut world, attacker, target, guardian) = guardian_setup(45);
    // Перехватчику даём выбранное действие, чтобы проверить его очистку
    world.entity_mut(guardian).insert(ActionIntent {
        part_key: PartKey::LeftArm,
        target: None,
        target_part: None,
    });
    set_intent(&mut world, attacker, PartKey::RightArm, target, PartKey::Head);

    let resolved = resolve_action(&mut world, attacker);
    let result = &resolved.result;

    // 45 ≥ 40: guard-рука сломана, стойка разбита
    assert_eq!(part_hp(&world, guardian, PartKey::RightArm), 0);
    assert!(result.summary.is_guard_broken);
    assert!(result.applied.iter().any(|r| r.broke_part));

    finish_action(&mut world, &resolved);
    assert_eq!(
        current_state(&world, guardian),
        Some(CombatantState::Cooldown)
    );
    assert!(world.get::<ActionIntent>(guardian).is_none());
    assert!(world
        .get::<ActiveEffects>(guardian)
        .unwrap()
        .find(ActiveEffectKind::Guard)
        .is_none());
}

// --- Scenario 4: penetration ---

#[test]
fn test_penetration_carries_overkill() {
    let parts = vec![
        head_part("t-head-big", 40),
        damage_arm(
            "t-drill",
            30,
            50,
            60,
            AttackType::Sword,
            AccuracyBehavior::Perfect,
            true,
        ),
        damage_arm(
            "t-weak-arm",
            20,
            10,
            40,
            AttackType::Sword,
            AccuracyBehavior::Standard,
            false,
        ),
        damage_arm(
            "t-tough-arm",
            40,
            10,
            40,
            AttackType::Sword,
            AccuracyBehavior::Standard,
            false,
        ),
        legs_part("t-legs-plain", 40, 0, 0, 0, 0),
    ];
    // Все части, кроме пробиваемой руки, держат 30 overkill — цепь ровно из двух шагов
    let (mut world, attacker, target) = one_vs_one(
        parts,
        member("Driller", "t-head-big", "t-drill", "t-drill", "t-legs-plain", true),
        member("Husk", "t-head-big", "t-weak-arm", "t-tough-arm", "t-legs-plain", true),
    );

    set_intent(&mut world, attacker, PartKey::RightArm, target, PartKey::RightArm);
    let resolved = resolve_action(&mut world, attacker);
    let result = &resolved.result;

    // 50 в руку с 20 HP: рука ломается, 30 overkill уходит в случайную часть
    assert_eq!(part_hp(&world, target, PartKey::RightArm), 0);
    assert_eq!(result.applied.len(), 2);
    let first = &result.applied[0];
    assert!(first.broke_part);
    assert_eq!(first.value, 20);
    assert_eq!(first.overkill, 30);

    let second = &result.applied[1];
    assert_eq!(second.raw_value, 30);
    assert_ne!(second.part_key, Some(PartKey::RightArm));
    let struck = second.part_key.expect("penetration part");
    // Вторая часть (40 HP) получила 30 и выжила — цепь остановилась
    assert_eq!(part_hp(&world, target, struck), 10);
}

// --- Scenario 5: glitch ---

#[test]
fn test_glitch_cancels_charging_action() {
    let parts = vec![
        head_part("t-head-big", 40),
        effect_arm("t-jammer", 25, 10, EffectKind::ApplyGlitch),
        damage_arm(
            "t-basic-arm",
            30,
            15,
            50,
            AttackType::Rifle,
            AccuracyBehavior::Standard,
            false,
        ),
        legs_part("t-legs-plain", 30, 0, 0, 0, 0),
    ];
    let (mut world, attacker, target) = one_vs_one(
        parts,
        member("Hacker", "t-head-big", "t-jammer", "t-jammer", "t-legs-plain", true),
        member("Victim", "t-head-big", "t-basic-arm", "t-basic-arm", "t-legs-plain", true),
    );

    // Цель заряжает выбранное действие
    world.entity_mut(target).insert(ActionIntent {
        part_key: PartKey::RightArm,
        target: Some(attacker),
        target_part: Some(PartKey::Head),
    });
    transition_to(&mut world, target, CombatantState::SelectedCharging);

    set_intent(&mut world, attacker, PartKey::RightArm, target, PartKey::Head);
    let resolved = resolve_action(&mut world, attacker);

    let glitch = resolved
        .result
        .applied
        .iter()
        .find(|r| r.kind == EffectKind::ApplyGlitch)
        .expect("glitch result");
    assert!(glitch.was_successful);
    assert_eq!(count_events::<ActionCancelledEvent>(&mut world), 1);

    finish_action(&mut world, &resolved);
    assert_eq!(current_state(&world, target), Some(CombatantState::Cooldown));
    assert!(world.get::<ActionIntent>(target).is_none());
    // HP не тронуто: глитч не наносит урона
    assert_eq!(part_hp(&world, target, PartKey::Head), 40);
}

#[test]
fn test_glitch_fizzles_on_idle_target() {
    let parts = vec![
        head_part("t-head-big", 40),
        effect_arm("t-jammer", 25, 10, EffectKind::ApplyGlitch),
        damage_arm(
            "t-basic-arm",
            30,
            15,
            50,
            AttackType::Rifle,
            AccuracyBehavior::Standard,
            false,
        ),
        legs_part("t-legs-plain", 30, 0, 0, 0, 0),
    ];
    let (mut world, attacker, target) = one_vs_one(
        parts,
        member("Hacker", "t-head-big", "t-jammer", "t-jammer", "t-legs-plain", true),
        member("Idler", "t-head-big", "t-basic-arm", "t-basic-arm", "t-legs-plain", true),
    );

    set_intent(&mut world, attacker, PartKey::RightArm, target, PartKey::Head);
    let resolved = resolve_action(&mut world, attacker);
    let glitch = &resolved.result.applied[0];
    assert!(!glitch.was_successful);
    assert_eq!(count_events::<ActionCancelledEvent>(&mut world), 0);
}

// --- Stun ---

#[test]
fn test_stun_freezes_and_recovers() {
    let parts = vec![
        head_part("t-head-big", 40),
        effect_arm("t-maul", 30, 24, EffectKind::ApplyStun),
        damage_arm(
            "t-basic-arm",
            30,
            15,
            50,
            AttackType::Rifle,
            AccuracyBehavior::Standard,
            false,
        ),
        legs_part("t-legs-plain", 30, 0, 0, 0, 0),
    ];
    let (mut world, attacker, target) = one_vs_one(
        parts,
        member("Basher", "t-head-big", "t-maul", "t-maul", "t-legs-plain", true),
        member("Numb", "t-head-big", "t-basic-arm", "t-basic-arm", "t-legs-plain", true),
    );

    world.entity_mut(target).insert(ActionIntent {
        part_key: PartKey::RightArm,
        target: Some(attacker),
        target_part: Some(PartKey::Head),
    });
    transition_to(&mut world, target, CombatantState::SelectedCharging);

    set_intent(&mut world, attacker, PartKey::RightArm, target, PartKey::Head);
    let resolved = resolve_action(&mut world, attacker);
    finish_action(&mut world, &resolved);

    // Половинный урон: floor(24/2) = 12; стан 12 × 250 = 3000 мс
    assert_eq!(part_hp(&world, target, PartKey::Head), 40 - 12);
    assert_eq!(current_state(&world, target), Some(CombatantState::Stunned));
    let stun = world
        .get::<ActiveEffects>(target)
        .unwrap()
        .find(ActiveEffectKind::Stun)
        .cloned()
        .expect("stun effect");
    assert_eq!(stun.timing, EffectTiming::Duration { ms: 3000.0 });

    // Таймер отыгрывает — боец возвращается в прерванное состояние
    world.resource_mut::<FrameClock>().delta_ms = 3500.0;
    voltbreak_battle::battle::effects_tick::tick_active_effects(&mut world);
    assert_eq!(
        current_state(&world, target),
        Some(CombatantState::SelectedCharging)
    );
    assert!(world
        .get::<ActiveEffects>(target)
        .unwrap()
        .find(ActiveEffectKind::Stun)
        .is_none());
}

// --- Heal & scan ---

#[test]
fn test_heal_restores_damaged_ally_part() {
    let parts = vec![
        head_part("t-head-big", 40),
        heal_arm("t-welder", 30, 18),
        damage_arm(
            "t-basic-arm",
            30,
            15,
            50,
            AttackType::Rifle,
            AccuracyBehavior::Standard,
            false,
        ),
        legs_part("t-legs-plain", 30, 0, 0, 0, 0),
    ];
    let loadout = BattleLoadout {
        alpha: TeamLoadout {
            ai: true,
            members: vec![
                member("Medic", "t-head-big", "t-welder", "t-welder", "t-legs-plain", true),
                member("Hurt", "t-head-big", "t-basic-arm", "t-basic-arm", "t-legs-plain", false),
            ],
        },
        beta: TeamLoadout {
            ai: true,
            members: vec![member(
                "Bystander",
                "t-head-big",
                "t-basic-arm",
                "t-basic-arm",
                "t-legs-plain",
                true,
            )],
        },
    };
    let (mut world, combatants) = setup_world(parts, &loadout, 3);
    let (medic, hurt) = (combatants[0], combatants[1]);

    // Повреждаем руку союзника на 10
    {
        let arm = world.get::<PartSet>(hurt).unwrap().right_arm;
        world.get_mut::<PartStatus>(arm).unwrap().take_damage(10);
    }

    // PostMove: цель лечения выбирается при исполнении
    world.entity_mut(medic).insert(ActionIntent {
        part_key: PartKey::RightArm,
        target: None,
        target_part: None,
    });
    let resolved = resolve_action(&mut world, medic);

    let heal = &resolved.result.applied[0];
    assert_eq!(heal.kind, EffectKind::Heal);
    assert_eq!(heal.target, hurt);
    assert_eq!(heal.part_key, Some(PartKey::RightArm));
    // might 18, не хватает 10 → лечим ровно 10
    assert_eq!(heal.value, 10);
    assert_eq!(part_hp(&world, hurt, PartKey::RightArm), 30);
}

#[test]
fn test_scan_buffs_whole_team_and_overwrites() {
    let parts = vec![
        scan_head("t-radar", 40, 30),
        head_part("t-head-big", 40),
        damage_arm(
            "t-basic-arm",
            30,
            15,
            50,
            AttackType::Rifle,
            AccuracyBehavior::Standard,
            false,
        ),
        legs_part("t-legs-plain", 30, 0, 0, 0, 0),
    ];
    let loadout = BattleLoadout {
        alpha: TeamLoadout {
            ai: true,
            members: vec![
                member("Scout", "t-radar", "t-basic-arm", "t-basic-arm", "t-legs-plain", true),
                member("Buddy", "t-head-big", "t-basic-arm", "t-basic-arm", "t-legs-plain", false),
            ],
        },
        beta: TeamLoadout {
            ai: true,
            members: vec![member(
                "Foe",
                "t-head-big",
                "t-basic-arm",
                "t-basic-arm",
                "t-legs-plain",
                true,
            )],
        },
    };
    let (mut world, combatants) = setup_world(parts, &loadout, 3);
    let (scout, buddy, foe) = (combatants[0], combatants[1], combatants[2]);

    world.entity_mut(scout).insert(ActionIntent {
        part_key: PartKey::Head,
        target: None,
        target_part: None,
    });
    let resolved = resolve_action(&mut world, scout);
    assert_eq!(resolved.result.applied[0].value, 15); // floor(30 × 0.5)

    for ally in [scout, buddy] {
        let effects = world.get::<ActiveEffects>(ally).unwrap();
        let scan = effects.find(ActiveEffectKind::Scan).expect("scan on ally");
        assert_eq!(scan.value, 15);
    }
    assert!(world
        .get::<ActiveEffects>(foe)
        .unwrap()
        .find(ActiveEffectKind::Scan)
        .is_none());

    // Повторное применение перезаписывает, не накапливает
    finish_action(&mut world, &resolved);
    world.entity_mut(scout).insert(ActionIntent {
        part_key: PartKey::Head,
        target: None,
        target_part: None,
    });
    let _ = resolve_action(&mut world, scout);
    let effects = world.get::<ActiveEffects>(buddy).unwrap();
    let scans: Vec<_> = effects
        .effects
        .iter()
        .filter(|e| e.kind == ActiveEffectKind::Scan)
        .collect();
    assert_eq!(scans.len(), 1);
    assert_eq!(scans[0].value, 15);
}

// --- Consume-guard idempotence & empty result ---

#[test]
fn test_consume_guard_on_expired_guard_is_noop() {
    let (mut world, attacker, _target, guardian) = guardian_setup(35);
    let _ = attacker;

    // Вручную истощаем guard до нуля
    world
        .get_mut::<ActiveEffects>(guardian)
        .unwrap()
        .remove_all(ActiveEffectKind::Guard);

    let tuning = flat_tuning();
    let effect = effects::consume_guard_effect(guardian, PartKey::RightArm);
    let ctx = voltbreak_battle::combat::EffectContext {
        attacker: guardian,
        attacking_part_entity: world.get::<PartSet>(guardian).unwrap().right_arm,
        attacking_part: PartKey::RightArm,
        final_target: Some(guardian),
        outcome: None,
    };
    let applied = effects::apply(&mut world, &tuning, &effect, &ctx);
    assert_eq!(applied.results.len(), 1);
    assert!(!applied.results[0].was_successful);
    assert!(applied.commands.is_empty());
}

#[test]
fn test_empty_result_only_transitions_attacker() {
    let parts = vec![
        head_part("t-head-big", 40),
        effect_arm("t-stub", 30, 10, EffectKind::ConsumeGuard), // пустой список эффектов
        legs_part("t-legs-plain", 30, 0, 0, 0, 0),
    ];
    let (mut world, attacker, target) = one_vs_one(
        parts,
        member("Poker", "t-head-big", "t-stub", "t-stub", "t-legs-plain", true),
        member("Wall", "t-head-big", "t-stub", "t-stub", "t-legs-plain", true),
    );

    let before: Vec<u32> = PartKey::ALL
        .into_iter()
        .map(|k| part_hp(&world, target, k))
        .collect();

    set_intent(&mut world, attacker, PartKey::RightArm, target, PartKey::Head);
    let resolved = resolve_action(&mut world, attacker);
    assert!(resolved.result.applied.is_empty());
    assert!(!resolved.result.is_cancelled());

    finish_action(&mut world, &resolved);
    let after: Vec<u32> = PartKey::ALL
        .into_iter()
        .map(|k| part_hp(&world, target, k))
        .collect();
    assert_eq!(before, after);
    assert_eq!(
        current_state(&world, attacker),
        Some(CombatantState::Cooldown)
    );
}

// --- Cancellation ---

#[test]
fn test_target_lost_cancels_action() {
    let parts = vec![
        head_part("t-head", 30),
        damage_arm(
            "t-cannon",
            30,
            35,
            60,
            AttackType::Rifle,
            AccuracyBehavior::Perfect,
            false,
        ),
        legs_part("t-legs-plain", 30, 0, 0, 0, 0),
    ];
    let (mut world, attacker, target) = one_vs_one(
        parts,
        member("Gunner", "t-head", "t-cannon", "t-cannon", "t-legs-plain", true),
        member("Ghost", "t-head", "t-cannon", "t-cannon", "t-legs-plain", true),
    );

    // Цель теряет голову до исполнения
    {
        let head = world.get::<PartSet>(target).unwrap().head;
        world.get_mut::<PartStatus>(head).unwrap().take_damage(30);
    }

    set_intent(&mut world, attacker, PartKey::RightArm, target, PartKey::Head);
    let resolved = resolve_action(&mut world, attacker);
    assert_eq!(
        resolved.result.cancelled,
        Some(voltbreak_battle::combat::CancelReason::TargetLost)
    );
    assert!(resolved.result.applied.is_empty());

    finish_action(&mut world, &resolved);
    assert_eq!(
        current_state(&world, attacker),
        Some(CombatantState::Cooldown)
    );
}

// --- Scenario 6: leader KO via full headless battle ---

#[test]
fn test_leader_head_break_ends_battle() {
    use voltbreak_battle::battle::context::BattlePhase;
    use voltbreak_battle::components::state::IsBroken;
    use voltbreak_battle::{create_headless_app, step_frame, TeamId};

    let mut app = create_headless_app(42);

    // Каталог: альфа бьёт сильно, у беты хрупкие части
    let mut data = MasterData::default();
    for part in [
        head_part("t-head-strong", 60),
        head_part("t-head-weak", 12),
        damage_arm(
            "t-cannon",
            40,
            35,
            70,
            AttackType::Rifle,
            AccuracyBehavior::Perfect,
            true,
        ),
        damage_arm(
            "t-pea",
            12,
            3,
            30,
            AttackType::Rifle,
            AccuracyBehavior::Standard,
            false,
        ),
        legs_part("t-legs-strong", 40, 10, 10, 10, 5),
        legs_part("t-legs-weak", 12, 0, 0, 0, 0),
    ] {
        data.parts.insert(part.id.clone(), part);
    }
    for medal in voltbreak_battle::catalog::medals::builtin_medals() {
        data.medals.insert(medal.id.clone(), medal);
    }
    app.insert_resource(data);
    app.insert_resource(flat_tuning());
    app.insert_resource(flat_attack_table());

    fn alpha_member(name: &str, leader: bool) -> MemberLoadout {
        MemberLoadout {
            name: name.into(),
            medal: "medal-hawk".into(), // бьют по лидеру
            head: "t-head-strong".into(),
            right_arm: "t-cannon".into(),
            left_arm: "t-cannon".into(),
            legs: "t-legs-strong".into(),
            is_leader: leader,
            color: String::new(),
        }
    }
    fn beta_member(name: &str, leader: bool) -> MemberLoadout {
        MemberLoadout {
            name: name.into(),
            medal: "medal-imp".into(),
            head: "t-head-weak".into(),
            right_arm: "t-pea".into(),
            left_arm: "t-pea".into(),
            legs: "t-legs-weak".into(),
            is_leader: leader,
            color: String::new(),
        }
    }
    let loadout = BattleLoadout {
        alpha: TeamLoadout {
            ai: true,
            members: vec![
                alpha_member("Anvil", true),
                alpha_member("Hammer", false),
                alpha_member("Tongs", false),
            ],
        },
        beta: TeamLoadout {
            ai: true,
            members: vec![
                beta_member("Tin", true),
                beta_member("Foil", false),
                beta_member("Rust", false),
            ],
        },
    };
    let combatants = spawn_battle(app.world_mut(), &loadout);
    let beta_leader = combatants[3];

    const MAX_FRAMES: u32 = 120_000;
    let mut frames = 0;
    loop {
        step_frame(&mut app, 16.67);
        frames += 1;

        // Инварианты по ходу боя
        if frames % 500 == 0 {
            check_battle_invariants(app.world_mut(), &combatants);
        }

        let context = app.world().resource::<BattleContext>();
        if context.is_over() {
            break;
        }
        assert!(frames < MAX_FRAMES, "battle did not finish in {} frames", MAX_FRAMES);
    }

    let context = app.world().resource::<BattleContext>();
    assert_eq!(context.phase, BattlePhase::GameOver);
    assert_eq!(context.winning_team, Some(TeamId::Alpha));
    assert!(app.world().get::<IsBroken>(beta_leader).is_some());

    let head = app.world().get::<PartSet>(beta_leader).unwrap().head;
    assert!(app.world().get::<PartStatus>(head).unwrap().is_broken);

    // После конца боя шкалы заморожены
    let gauges: Vec<f32> = combatants
        .iter()
        .map(|&c| app.world().get::<Gauge>(c).unwrap().value)
        .collect();
    for _ in 0..50 {
        step_frame(&mut app, 16.67);
    }
    let gauges_after: Vec<f32> = combatants
        .iter()
        .map(|&c| app.world().get::<Gauge>(c).unwrap().value)
        .collect();
    assert_eq!(gauges, gauges_after);
}

/// Сквозные инварианты: один primary tag, шкала в пределах, HP ≤ max
fn check_battle_invariants(world: &mut World, combatants: &[Entity]) {
    for &combatant in combatants {
        let state = current_state(world, combatant);
        assert!(state.is_some(), "{:?} lost its primary state tag", combatant);

        let gauge = world.get::<Gauge>(combatant).unwrap();
        assert!(
            gauge.value >= 0.0 && gauge.value <= gauge.max,
            "{:?} gauge out of bounds: {}",
            combatant,
            gauge.value
        );

        let parts = *world.get::<PartSet>(combatant).unwrap();
        for (_, part_entity) in parts.iter() {
            let status = world.get::<PartStatus>(part_entity).unwrap();
            assert!(status.hp <= status.max_hp);
            if status.hp == 0 {
                assert!(status.is_broken);
            }
        }
    }
}
