//! Battle resolver: одно действие от снапшота до применённых эффектов.
//!
//! Пайплайн фиксированного порядка: снапшот, валидность, перехватчик, исход,
//! генерация эффектов, guard-consume, FIFO-применение с front-inject,
//! after-hooks, сводка. Данные (HP, списки эффектов) мутируются здесь же; все
//! переходы состояний копятся как [`StateCommand`] и применяются задачей
//! `ApplyState`.

use bevy::prelude::*;
use std::collections::VecDeque;

use crate::ai;
use crate::catalog::attack_types::AttackTypeTable;
use crate::combat::calculator::{self, CombatTuning};
use crate::combat::effects::{self, EffectContext, PendingEffect};
use crate::combat::hooks;
use crate::combat::result::{
    CancelReason, CombatResult, GuardianInfo, Outcome, ResultSummary,
};
use crate::commands::StateCommand;
use crate::components::combatant::{ActionIntent, PartSet};
use crate::components::part::{
    ActionLogic, ImpactBehavior, PartKey, PartStatus, TargetScope, TargetTiming, TargetingBehavior,
};
use crate::targeting;
use crate::DeterministicRng;

/// Результат разрешения + отложенные команды для ApplyState
#[derive(Debug, Clone)]
pub struct ResolvedAction {
    pub result: CombatResult,
    pub commands: Vec<StateCommand>,
}

impl ResolvedAction {
    fn cancelled(attacker: Entity, part: PartKey, reason: CancelReason) -> Self {
        Self {
            result: CombatResult::cancelled(attacker, part, reason),
            commands: Vec::new(),
        }
    }
}

/// Разрешает действие атакующего целиком
pub fn resolve_action(world: &mut World, attacker: Entity) -> ResolvedAction {
    world.resource_scope(|world, mut rng: Mut<DeterministicRng>| {
        resolve_inner(world, &mut rng, attacker)
    })
}

fn resolve_inner(
    world: &mut World,
    rng: &mut DeterministicRng,
    attacker: Entity,
) -> ResolvedAction {
    let tuning = world
        .get_resource::<CombatTuning>()
        .copied()
        .unwrap_or_default();
    let table = world
        .get_resource::<AttackTypeTable>()
        .cloned()
        .unwrap_or_default();

    // --- Снапшот ---
    let Some(intent) = world.get::<ActionIntent>(attacker).cloned() else {
        crate::logger::log_error(&format!("resolver: {:?} has no action intent", attacker));
        return ResolvedAction::cancelled(attacker, PartKey::Head, CancelReason::Interrupted);
    };
    let part_key = intent.part_key;
    let Some(parts) = world.get::<PartSet>(attacker).copied() else {
        return ResolvedAction::cancelled(attacker, part_key, CancelReason::Interrupted);
    };
    let part_entity = parts.get(part_key);
    let Some(logic) = world.get::<ActionLogic>(part_entity).copied() else {
        crate::logger::log_error(&format!(
            "resolver: part {:?} has no action logic",
            part_entity
        ));
        return ResolvedAction::cancelled(attacker, part_key, CancelReason::Interrupted);
    };
    let Some(behavior) = world.get::<TargetingBehavior>(part_entity).copied() else {
        return ResolvedAction::cancelled(attacker, part_key, CancelReason::Interrupted);
    };
    let Some(impact) = world.get::<ImpactBehavior>(part_entity).cloned() else {
        return ResolvedAction::cancelled(attacker, part_key, CancelReason::Interrupted);
    };

    // --- Валидность ---
    let part_usable = world
        .get::<PartStatus>(part_entity)
        .map(|s| s.is_usable())
        .unwrap_or(false);
    if !part_usable {
        return ResolvedAction::cancelled(attacker, part_key, CancelReason::PartBroken);
    }

    let resolved_target = match resolve_target(world, rng, attacker, &intent, &behavior) {
        Ok(target) => target,
        Err(reason) => return ResolvedAction::cancelled(attacker, part_key, reason),
    };
    let intended_target = resolved_target.map(|(entity, _)| entity);

    // --- Перехватчик ---
    let mut final_target = intended_target;
    let mut intended_part = resolved_target.map(|(_, part)| part);
    let mut guardian: Option<GuardianInfo> = None;
    if !logic.is_support && behavior.scope == TargetScope::EnemySingle {
        if let Some(target) = intended_target {
            if let Some(info) = targeting::find_guardian(world, target) {
                final_target = Some(info.guardian);
                intended_part = Some(info.part_key);
                guardian = Some(info);
            }
        }
    }

    // --- Исход ---
    let outcome = match (final_target, intended_part) {
        (Some(target), Some(target_part)) if !logic.is_support => {
            let mut outcome = calculator::roll_outcome(
                world,
                rng,
                &tuning,
                &table,
                attacker,
                part_entity,
                target,
                target_part,
            );
            // Перехват фиксирует guard-часть: защита не переключает её
            if guardian.is_some() {
                outcome.is_defended = false;
                outcome.final_target_part = target_part;
            }
            Some(outcome)
        }
        (Some(_), Some(target_part)) => Some(Outcome {
            is_hit: true,
            is_critical: false,
            is_defended: false,
            final_target_part: target_part,
        }),
        _ => None,
    };

    let ctx = EffectContext {
        attacker,
        attacking_part_entity: part_entity,
        attacking_part: part_key,
        final_target,
        outcome,
    };

    // --- Генерация эффектов ---
    let mut queue: VecDeque<PendingEffect> = impact
        .effects
        .iter()
        .filter_map(|def| effects::process(world, &tuning, &table, def, &ctx))
        .collect();

    // --- Guard consume ---
    if let Some(info) = guardian {
        queue.push_back(effects::consume_guard_effect(info.guardian, info.part_key));
    }

    // --- Применение с front-inject + after-hooks ---
    let part_hooks = hooks::hooks_for_part(world, part_entity);
    let mut applied_results = Vec::new();
    let mut commands: Vec<StateCommand> = Vec::new();
    while let Some(effect) = queue.pop_front() {
        let applied = effects::apply(world, &tuning, &effect, &ctx);
        commands.extend(applied.commands);
        for (index, chain) in applied.chained.into_iter().enumerate() {
            queue.insert(index, chain);
        }
        for result in applied.results {
            for hook in &part_hooks {
                if let Some(chain) = hooks::run_after_effect_hook(*hook, world, rng, &result, &ctx)
                {
                    queue.push_front(chain);
                }
            }
            applied_results.push(result);
        }
    }

    // --- Сводка ---
    let summary = ResultSummary {
        is_guard_broken: applied_results.iter().any(|r| r.is_guard_broken),
        is_guard_expired: applied_results.iter().any(|r| r.is_guard_expired),
    };

    ResolvedAction {
        result: CombatResult {
            attacker,
            intended_target,
            final_target,
            attacking_part: part_key,
            is_support: logic.is_support,
            guardian,
            outcome,
            applied: applied_results,
            summary,
            cancelled: None,
        },
        commands,
    }
}

/// Разрешение цели с учётом scope и времени выбора.
///
/// PostMove-части выбирают цель в момент исполнения; PreMove-выбор,
/// потерявший актуальность, отменяет действие.
fn resolve_target(
    world: &World,
    rng: &mut DeterministicRng,
    attacker: Entity,
    intent: &ActionIntent,
    behavior: &TargetingBehavior,
) -> Result<Option<(Entity, PartKey)>, CancelReason> {
    match behavior.scope {
        TargetScope::SelfOnly | TargetScope::AllyTeam => {
            Ok(Some((attacker, intent.part_key)))
        }
        TargetScope::AllySingle => {
            let target = match (behavior.timing, intent.target) {
                (TargetTiming::PreMove, Some(target)) => Some((target, intent.target_part)),
                _ => {
                    let allies = targeting::get_valid_allies(world, attacker, true);
                    targeting::find_most_damaged_ally_part(world, &allies)
                        .map(|(ally, part)| (ally, Some(part)))
                }
            };
            let Some((target, part)) = target else {
                return Err(CancelReason::TargetLost);
            };
            let part = match part {
                Some(part) => part,
                None => {
                    targeting::find_most_damaged_ally_part(world, &[target])
                        .map(|(_, p)| p)
                        .ok_or(CancelReason::TargetLost)?
                }
            };
            if !targeting::is_valid_target(world, target, Some(part)) {
                return Err(CancelReason::TargetLost);
            }
            Ok(Some((target, part)))
        }
        TargetScope::EnemySingle => {
            let chosen = match (behavior.timing, intent.target) {
                (TargetTiming::PreMove, Some(target)) => {
                    Some((target, intent.target_part))
                }
                _ => ai::select_enemy_target(world, rng, attacker)
                    .map(|(target, part)| (target, Some(part))),
            };
            let Some((target, part)) = chosen else {
                return Err(CancelReason::TargetLost);
            };
            let part = match part {
                Some(part) => part,
                None => targeting::random_usable_part(world, rng, target)
                    .ok_or(CancelReason::TargetLost)?,
            };
            if !targeting::is_valid_target(world, target, Some(part)) {
                return Err(CancelReason::TargetLost);
            }
            Ok(Some((target, part)))
        }
    }
}
