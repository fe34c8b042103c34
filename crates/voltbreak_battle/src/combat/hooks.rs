//! Trait hooks: подключаемые шаги пайплайна разрешения.
//!
//! Две точки: StatCalc (модификаторы статов — живут в
//! [`crate::catalog::attack_types::AttackTypeTable`] и применяются
//! калькулятором) и AfterEffectApplied (цепные эффекты после применения).
//! Сами hooks — закрытый enum: новый trait добавляется вариантом + веткой
//! match, а не строковым ключом в карту замыканий.

use bevy::prelude::*;

use crate::combat::effects::{EffectContext, EffectKind, PendingEffect};
use crate::combat::result::EffectResult;
use crate::components::part::TraitPenetrate;
use crate::targeting;
use crate::DeterministicRng;

/// Hook, срабатывающий после применения эффекта
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterEffectHook {
    /// Overkill переносится на случайную живую часть цели
    Penetrate,
}

/// Hooks атакующей части (из её trait tags)
pub fn hooks_for_part(world: &World, part_entity: Entity) -> Vec<AfterEffectHook> {
    let mut hooks = Vec::new();
    if world.get::<TraitPenetrate>(part_entity).is_some() {
        hooks.push(AfterEffectHook::Penetrate);
    }
    hooks
}

/// Запускает hook над применённым результатом; возвращает цепной эффект
/// для вставки в начало очереди.
pub fn run_after_effect_hook(
    hook: AfterEffectHook,
    world: &World,
    rng: &mut DeterministicRng,
    result: &EffectResult,
    ctx: &EffectContext,
) -> Option<PendingEffect> {
    match hook {
        AfterEffectHook::Penetrate => penetrate(world, rng, result, ctx),
    }
}

/// Penetration: только если часть сломана с излишком урона, голова цели жива
/// и есть живая часть помимо пробитой.
fn penetrate(
    world: &World,
    rng: &mut DeterministicRng,
    result: &EffectResult,
    _ctx: &EffectContext,
) -> Option<PendingEffect> {
    if result.kind != EffectKind::Damage || !result.broke_part || result.overkill <= 0 {
        return None;
    }
    let struck = result.part_key?;
    let next_part = targeting::find_random_penetration_target(world, rng, result.target, struck)?;

    crate::logger::log(&format!(
        "⚡ penetrate: {} overkill carries to {}",
        result.overkill,
        next_part.label()
    ));
    Some(PendingEffect {
        kind: EffectKind::Damage,
        target: result.target,
        part_key: Some(next_part),
        value: result.overkill,
        duration_ms: None,
        stat: None,
        fixed: true,
    })
}
