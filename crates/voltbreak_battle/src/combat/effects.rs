//! Effect handlers: по одному на [`EffectKind`].
//!
//! Каждый вид реализует три шага:
//! - `process` — чистый: решает, применим ли эффект, и считает величину;
//! - `apply` — мутирует PartStatus/ActiveEffects, спавнит event entities и
//!   копит [`StateCommand`] (state tags напрямую не трогает);
//! - сообщение для диалога собирается прямо в `apply` (resolve-visual шаг).
//!
//! Диспетчеризация — исчерпывающий match по закрытому enum: неизвестный вид
//! эффекта не существует как класс ошибок.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::catalog::attack_types::AttackTypeTable;
use crate::catalog::messages::{render, MessageKey};
use crate::catalog::parts::{CalculationDef, EffectDef};
use crate::combat::calculator::{self, CombatTuning};
use crate::combat::result::{EffectResult, Outcome};
use crate::commands::StateCommand;
use crate::components::combatant::{
    ActiveEffectKind, ActiveEffects, EffectTiming, PartSet, PlayerInfo, TimedEffect,
};
use crate::components::part::{
    PartKey, PartStats, PartStatus, PartVisualConfig, StatKind, TraitGuard,
};
use crate::components::state::{current_state, CombatantState, IsGuarding};
use crate::events::{spawn_event_world, ActionCancelledEvent, HpChanged, PartBrokenEvent};
use crate::targeting;

/// Закрытый список видов эффектов
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    Damage,
    Heal,
    ApplyScan,
    ApplyGuard,
    ConsumeGuard,
    ApplyGlitch,
    ApplyStun,
}

/// Контекст применения: кто, чем, в кого, с каким исходом
#[derive(Debug, Clone, Copy)]
pub struct EffectContext {
    pub attacker: Entity,
    pub attacking_part_entity: Entity,
    pub attacking_part: PartKey,
    pub final_target: Option<Entity>,
    pub outcome: Option<Outcome>,
}

/// Сырой эффект, готовый к применению
#[derive(Debug, Clone, Copy)]
pub struct PendingEffect {
    pub kind: EffectKind,
    pub target: Entity,
    pub part_key: Option<PartKey>,
    pub value: i32,
    pub duration_ms: Option<f32>,
    pub stat: Option<StatKind>,
    /// value финален (penetration-цепочка), формулу не пересчитывать
    pub fixed: bool,
}

/// Итог применения: результат + отложенные команды + цепные эффекты
#[derive(Debug, Clone, Default)]
pub struct Applied {
    pub results: Vec<EffectResult>,
    pub commands: Vec<StateCommand>,
    /// Вставляются в НАЧАЛО очереди оставшихся эффектов
    pub chained: Vec<PendingEffect>,
}

// ============================================================================
// process
// ============================================================================

/// Шаг process: превращает определение эффекта в сырой эффект (или ничего).
///
/// Промах по конкретной цели не порождает эффектов.
pub fn process(
    world: &World,
    tuning: &CombatTuning,
    table: &AttackTypeTable,
    def: &EffectDef,
    ctx: &EffectContext,
) -> Option<PendingEffect> {
    match def.kind {
        EffectKind::Damage => {
            let (target, outcome) = hit_target(ctx)?;
            let power = power_value(world, table, def.calculation, ctx);
            let (defense, stability) = calculator::target_defense(world, target);
            let value =
                calculator::compute_damage(tuning, power, defense, stability, outcome.is_critical)
                    as i32;
            Some(PendingEffect {
                kind: EffectKind::Damage,
                target,
                part_key: Some(outcome.final_target_part),
                value,
                duration_ms: None,
                stat: None,
                fixed: false,
            })
        }
        EffectKind::Heal => {
            let target = ctx.final_target?;
            let part_key = ctx.outcome.map(|o| o.final_target_part)?;
            let value = power_value(world, table, def.calculation, ctx);
            Some(PendingEffect {
                kind: EffectKind::Heal,
                target,
                part_key: Some(part_key),
                value,
                duration_ms: None,
                stat: None,
                fixed: false,
            })
        }
        EffectKind::ApplyScan => {
            let value = power_value(world, table, def.calculation, ctx);
            Some(PendingEffect {
                kind: EffectKind::ApplyScan,
                target: ctx.attacker,
                part_key: None,
                value,
                duration_ms: def.params.duration_ms.or(Some(15_000.0)),
                stat: def.params.stat.or(Some(StatKind::Success)),
                fixed: false,
            })
        }
        EffectKind::ApplyGuard => {
            let might = world
                .get::<PartStats>(ctx.attacking_part_entity)
                .map(|s| s.might)
                .unwrap_or(0);
            let count = match def.params.count_factor {
                Some(factor) => (might as f32 * factor).floor() as u32,
                None => world
                    .get::<TraitGuard>(ctx.attacking_part_entity)
                    .map(|t| t.count)
                    .unwrap_or(1),
            }
            .max(1);
            Some(PendingEffect {
                kind: EffectKind::ApplyGuard,
                target: ctx.attacker,
                part_key: Some(ctx.attacking_part),
                value: count as i32,
                duration_ms: None,
                stat: None,
                fixed: false,
            })
        }
        // ConsumeGuard порождается только синтетически (резолвером)
        EffectKind::ConsumeGuard => None,
        EffectKind::ApplyGlitch => {
            let (target, _) = hit_target(ctx)?;
            Some(PendingEffect {
                kind: EffectKind::ApplyGlitch,
                target,
                part_key: None,
                value: 0,
                duration_ms: None,
                stat: None,
                fixed: false,
            })
        }
        EffectKind::ApplyStun => {
            let (target, outcome) = hit_target(ctx)?;
            let power = power_value(world, table, def.calculation, ctx);
            let (defense, stability) = calculator::target_defense(world, target);
            let damage =
                calculator::compute_damage(tuning, power, defense, stability, outcome.is_critical);
            Some(PendingEffect {
                kind: EffectKind::ApplyStun,
                target,
                part_key: Some(outcome.final_target_part),
                value: (damage / 2) as i32,
                duration_ms: None,
                stat: None,
                fixed: false,
            })
        }
    }
}

/// Синтетический CONSUME_GUARD на guard-часть перехватчика
pub fn consume_guard_effect(guardian: Entity, part_key: PartKey) -> PendingEffect {
    PendingEffect {
        kind: EffectKind::ConsumeGuard,
        target: guardian,
        part_key: Some(part_key),
        value: 1,
        duration_ms: None,
        stat: None,
        fixed: true,
    }
}

fn hit_target(ctx: &EffectContext) -> Option<(Entity, Outcome)> {
    let target = ctx.final_target?;
    let outcome = ctx.outcome?;
    if !outcome.is_hit {
        return None;
    }
    Some((target, outcome))
}

/// Величина из CalculationDef (с модификаторами типа атаки и баффов)
fn power_value(
    world: &World,
    table: &AttackTypeTable,
    calculation: Option<CalculationDef>,
    ctx: &EffectContext,
) -> i32 {
    match calculation {
        Some(CalculationDef::PowerFormula { power_stat }) => calculator::effective_stat(
            world,
            ctx.attacker,
            ctx.attacking_part_entity,
            power_stat,
            table,
        ),
        Some(CalculationDef::Fixed { value }) => value,
        Some(CalculationDef::StatScaled { source, factor }) => {
            let base = world
                .get::<PartStats>(ctx.attacking_part_entity)
                .map(|s| s.get(source))
                .unwrap_or(0);
            (base as f32 * factor).floor() as i32
        }
        None => 0,
    }
}

// ============================================================================
// apply
// ============================================================================

/// Шаг apply: мутирует мир, возвращает результат + команды + цепные эффекты
pub fn apply(
    world: &mut World,
    tuning: &CombatTuning,
    effect: &PendingEffect,
    ctx: &EffectContext,
) -> Applied {
    match effect.kind {
        EffectKind::Damage => apply_damage(world, effect, ctx),
        EffectKind::Heal => apply_heal(world, effect, ctx),
        EffectKind::ApplyScan => apply_scan(world, effect, ctx),
        EffectKind::ApplyGuard => apply_guard(world, effect, ctx),
        EffectKind::ConsumeGuard => apply_consume_guard(world, effect),
        EffectKind::ApplyGlitch => apply_glitch(world, effect),
        EffectKind::ApplyStun => apply_stun(world, tuning, effect, ctx),
    }
}

fn apply_damage(world: &mut World, effect: &PendingEffect, ctx: &EffectContext) -> Applied {
    let mut applied = Applied::default();
    let target = effect.target;
    let Some(part_key) = effect.part_key else {
        crate::logger::log_error("damage effect without part key, skipping");
        return applied;
    };
    let Some(part_entity) = world.get::<PartSet>(target).map(|p| p.get(part_key)) else {
        crate::logger::log_error(&format!("damage target {:?} has no parts", target));
        return applied;
    };

    let raw = effect.value.max(0) as u32;
    let mut result = EffectResult::new(EffectKind::Damage, target, Some(part_key));
    result.raw_value = raw as i32;

    let (actual, broke, new_hp, max_hp) = {
        let Some(mut status) = world.get_mut::<PartStatus>(part_entity) else {
            crate::logger::log_error(&format!("part {:?} has no status", part_entity));
            return applied;
        };
        let was_broken = status.is_broken;
        let actual = status.take_damage(raw);
        (
            actual,
            !was_broken && status.is_broken,
            status.hp,
            status.max_hp,
        )
    };

    result.value = actual as i32;
    result.overkill = (raw - actual) as i32;
    result.broke_part = broke;

    if actual > 0 {
        spawn_event_world(
            world,
            HpChanged {
                source: Some(ctx.attacker),
                target,
                part_key,
                change: -(actual as i32),
                new_hp,
                max_hp,
            },
        );
    }

    if broke {
        spawn_event_world(world, PartBrokenEvent {
            owner: target,
            part_key,
        });
        if part_key == PartKey::Head {
            result.broke_combatant = true;
            applied.commands.push(StateCommand::SetPlayerBroken { target });
        }
    }

    // Удар по guard-части ломает стойку
    if broke && world.get::<IsGuarding>(target).is_some() {
        let guarding_this_part = world
            .get::<ActiveEffects>(target)
            .and_then(|e| e.find(ActiveEffectKind::Guard))
            .map(|g| g.part_key == Some(part_key))
            .unwrap_or(false);
        if guarding_this_part {
            result.is_guard_broken = true;
            if let Some(mut effects) = world.get_mut::<ActiveEffects>(target) {
                effects.remove_all(ActiveEffectKind::Guard);
            }
            applied.commands.push(StateCommand::ResetToCooldown {
                target,
                interrupted: false,
            });
        }
    }

    // Ненулевой урон снимает стан
    if actual > 0 && !result.broke_combatant {
        clear_stun(world, target, &mut applied.commands);
    }

    let key = match ctx.outcome {
        Some(outcome) if outcome.is_critical => MessageKey::CriticalHit,
        _ => MessageKey::DamageDealt,
    };
    result.message = Some(render(
        key,
        &[
            ("target", combatant_name(world, target)),
            ("part", part_label(world, target, part_key)),
            ("value", actual.to_string()),
        ],
    ));

    applied.results.push(result);
    applied
}

fn apply_heal(world: &mut World, effect: &PendingEffect, ctx: &EffectContext) -> Applied {
    let mut applied = Applied::default();
    let target = effect.target;
    let Some(part_key) = effect.part_key else {
        return applied;
    };
    let Some(part_entity) = world.get::<PartSet>(target).map(|p| p.get(part_key)) else {
        return applied;
    };

    let mut result = EffectResult::new(EffectKind::Heal, target, Some(part_key));
    result.raw_value = effect.value;

    let (actual, new_hp, max_hp) = {
        let Some(mut status) = world.get_mut::<PartStatus>(part_entity) else {
            return applied;
        };
        let actual = status.heal(effect.value.max(0) as u32);
        (actual, status.hp, status.max_hp)
    };

    result.value = actual as i32;
    result.was_successful = actual > 0;

    if actual > 0 {
        spawn_event_world(
            world,
            HpChanged {
                source: Some(ctx.attacker),
                target,
                part_key,
                change: actual as i32,
                new_hp,
                max_hp,
            },
        );
    }

    let key = if actual > 0 {
        MessageKey::Healed
    } else {
        MessageKey::HealNoEffect
    };
    result.message = Some(render(
        key,
        &[
            ("target", combatant_name(world, target)),
            ("part", part_label(world, target, part_key)),
            ("value", actual.to_string()),
        ],
    ));

    applied.results.push(result);
    applied
}

/// Scan вешается на всю команду источника (включая его самого)
fn apply_scan(world: &mut World, effect: &PendingEffect, ctx: &EffectContext) -> Applied {
    let mut applied = Applied::default();
    let bonus = effect.value;
    let stat = effect.stat.unwrap_or(StatKind::Success);
    let duration = effect.duration_ms.unwrap_or(15_000.0);

    let allies = targeting::get_valid_allies(world, ctx.attacker, true);
    for &ally in &allies {
        if let Some(mut effects) = world.get_mut::<ActiveEffects>(ally) {
            effects.upsert(TimedEffect {
                kind: ActiveEffectKind::Scan,
                value: bonus,
                part_key: None,
                timing: EffectTiming::Duration { ms: duration },
                elapsed_ms: 0.0,
                stat: Some(stat),
                resume: None,
            });
        }
    }

    let mut result = EffectResult::new(EffectKind::ApplyScan, ctx.attacker, None);
    result.value = bonus;
    result.raw_value = bonus;
    result.was_successful = !allies.is_empty();
    result.message = Some(render(
        MessageKey::ScanApplied,
        &[
            ("attacker", combatant_name(world, ctx.attacker)),
            ("value", bonus.to_string()),
            ("stat", format!("{:?}", stat).to_lowercase()),
        ],
    ));
    applied.results.push(result);
    applied
}

fn apply_guard(world: &mut World, effect: &PendingEffect, _ctx: &EffectContext) -> Applied {
    let mut applied = Applied::default();
    let target = effect.target;
    let count = effect.value.max(1) as u32;

    if let Some(mut effects) = world.get_mut::<ActiveEffects>(target) {
        effects.upsert(TimedEffect {
            kind: ActiveEffectKind::Guard,
            value: count as i32,
            part_key: effect.part_key,
            timing: EffectTiming::Count { left: count },
            elapsed_ms: 0.0,
            stat: None,
            resume: None,
        });
    }
    applied.commands.push(StateCommand::TransitionState {
        target,
        state: CombatantState::Guarding,
    });
    applied.commands.push(StateCommand::SnapToActionLine { target });

    let mut result = EffectResult::new(EffectKind::ApplyGuard, target, effect.part_key);
    result.value = count as i32;
    result.raw_value = count as i32;
    result.message = Some(render(
        MessageKey::GuardRaised,
        &[
            ("attacker", combatant_name(world, target)),
            (
                "part",
                effect
                    .part_key
                    .map(|k| part_label(world, target, k))
                    .unwrap_or_default(),
            ),
            ("value", count.to_string()),
        ],
    ));
    applied.results.push(result);
    applied
}

/// Списывает один перехват; на нуле guard истекает и перехватчик уходит в откат
fn apply_consume_guard(world: &mut World, effect: &PendingEffect) -> Applied {
    let mut applied = Applied::default();
    let target = effect.target;
    let mut result = EffectResult::new(EffectKind::ConsumeGuard, target, effect.part_key);

    let remaining = {
        let Some(mut effects) = world.get_mut::<ActiveEffects>(target) else {
            result.was_successful = false;
            applied.results.push(result);
            return applied;
        };
        match effects.find_mut(ActiveEffectKind::Guard) {
            Some(guard) => {
                if let EffectTiming::Count { left } = &mut guard.timing {
                    *left = left.saturating_sub(1);
                    guard.value = *left as i32;
                    Some(*left)
                } else {
                    None
                }
            }
            // Guard уже истёк/сломан — no-op
            None => None,
        }
    };

    match remaining {
        Some(0) => {
            if let Some(mut effects) = world.get_mut::<ActiveEffects>(target) {
                effects.remove_all(ActiveEffectKind::Guard);
            }
            result.is_guard_expired = true;
            result.value = 0;
            applied.commands.push(StateCommand::ResetToCooldown {
                target,
                interrupted: false,
            });
            result.message = Some(render(
                MessageKey::GuardConsumed,
                &[
                    ("target", combatant_name(world, target)),
                    ("value", "0".to_string()),
                ],
            ));
        }
        Some(left) => {
            result.value = left as i32;
            result.message = Some(render(
                MessageKey::GuardConsumed,
                &[
                    ("target", combatant_name(world, target)),
                    ("value", left.to_string()),
                ],
            ));
        }
        None => {
            result.was_successful = false;
        }
    }

    applied.results.push(result);
    applied
}

/// Глитч срывает действие только у заряжающейся или стоящей в guard цели
fn apply_glitch(world: &mut World, effect: &PendingEffect) -> Applied {
    let mut applied = Applied::default();
    let target = effect.target;
    let mut result = EffectResult::new(EffectKind::ApplyGlitch, target, None);

    let susceptible = matches!(
        current_state(world, target),
        Some(CombatantState::SelectedCharging) | Some(CombatantState::Guarding)
    );

    if susceptible {
        spawn_event_world(
            world,
            ActionCancelledEvent {
                combatant: target,
                reason: crate::combat::result::CancelReason::Interrupted,
            },
        );
        applied.commands.push(StateCommand::ResetToCooldown {
            target,
            interrupted: true,
        });
        result.was_successful = true;
        result.message = Some(render(
            MessageKey::GlitchSuccess,
            &[("target", combatant_name(world, target))],
        ));
    } else {
        result.was_successful = false;
        result.message = Some(render(
            MessageKey::GlitchNoEffect,
            &[("target", combatant_name(world, target))],
        ));
    }

    applied.results.push(result);
    applied
}

/// Стан: половинный урон + заморозка gauge на value × stun_ms_per_point
fn apply_stun(
    world: &mut World,
    tuning: &CombatTuning,
    effect: &PendingEffect,
    ctx: &EffectContext,
) -> Applied {
    // Урон идёт обычным damage-путём (он же снимет уже висящий стан)
    let damage_effect = PendingEffect {
        kind: EffectKind::Damage,
        ..*effect
    };
    let mut applied = apply_damage(world, &damage_effect, ctx);
    let Some(damage_result) = applied.results.pop() else {
        return applied;
    };

    let actual = damage_result.value.max(0);
    let mut result = EffectResult {
        kind: EffectKind::ApplyStun,
        ..damage_result
    };

    let target = effect.target;
    let target_alive = !result.broke_combatant && targeting::is_valid_target(world, target, None);
    if target_alive && actual > 0 {
        let duration = actual as f32 * tuning.stun_ms_per_point;
        let resume = match current_state(world, target) {
            Some(CombatantState::Stunned) | None => Some(CombatantState::Cooldown),
            state => state,
        };
        if let Some(mut effects) = world.get_mut::<ActiveEffects>(target) {
            effects.upsert(TimedEffect {
                kind: ActiveEffectKind::Stun,
                value: actual,
                part_key: None,
                timing: EffectTiming::Duration { ms: duration },
                elapsed_ms: 0.0,
                stat: None,
                resume,
            });
        }
        // Урон выше уже мог поставить команду снятия стана; Stunned ставится
        // последней и перекрывает её
        applied.commands.push(StateCommand::TransitionState {
            target,
            state: CombatantState::Stunned,
        });
        result.message = Some(render(
            MessageKey::Stunned,
            &[
                ("target", combatant_name(world, target)),
                ("value", (duration as i64).to_string()),
            ],
        ));
    }

    applied.results.push(result);
    applied
}

/// Снимает стан после ненулевого урона, восстанавливая прерванное состояние
fn clear_stun(world: &mut World, target: Entity, commands: &mut Vec<StateCommand>) {
    let resume = {
        let Some(effects) = world.get::<ActiveEffects>(target) else {
            return;
        };
        match effects.find(ActiveEffectKind::Stun) {
            Some(stun) => stun.resume,
            None => return,
        }
    };
    if let Some(mut effects) = world.get_mut::<ActiveEffects>(target) {
        effects.remove_all(ActiveEffectKind::Stun);
    }
    if current_state(world, target) == Some(CombatantState::Stunned) {
        commands.push(StateCommand::TransitionState {
            target,
            state: resume.unwrap_or(CombatantState::Cooldown),
        });
    }
}

// ============================================================================
// Visual helpers
// ============================================================================

pub fn combatant_name(world: &World, entity: Entity) -> String {
    world
        .get::<PlayerInfo>(entity)
        .map(|info| info.name.clone())
        .unwrap_or_else(|| format!("{:?}", entity))
}

pub fn part_label(world: &World, combatant: Entity, part_key: PartKey) -> String {
    world
        .get::<PartSet>(combatant)
        .and_then(|parts| world.get::<PartVisualConfig>(parts.get(part_key)))
        .map(|cfg| cfg.display_name.clone())
        .unwrap_or_else(|| part_key.label().to_string())
}
