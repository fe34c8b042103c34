//! Active-effect timers: тик длительностей, истечение scan, выход из стана.
//!
//! Guard живёт по счётчику и здесь не тикает; его списывает CONSUME_GUARD.

use bevy::prelude::*;

use crate::battle::context::BattleContext;
use crate::commands::{execute_commands, StateCommand};
use crate::components::combatant::{ActiveEffectKind, ActiveEffects, EffectTiming};
use crate::components::state::{current_state, CombatantState};
use crate::targeting::BattleRoster;
use crate::FrameClock;

/// Система: продвигает таймеры активных эффектов
pub fn tick_active_effects(world: &mut World) {
    let (delta, paused) = {
        let clock = world.resource::<FrameClock>();
        let context = world.resource::<BattleContext>();
        (clock.delta_ms, context.is_paused || context.is_over())
    };
    if paused || delta <= 0.0 {
        return;
    }

    let combatants = world
        .get_resource::<BattleRoster>()
        .map(|roster| roster.combatants.clone())
        .unwrap_or_default();

    for combatant in combatants {
        if current_state(world, combatant) == Some(CombatantState::Broken) {
            continue;
        }

        let mut expired: Vec<ActiveEffectKind> = Vec::new();
        let mut stun_resume: Option<CombatantState> = None;
        {
            let Some(mut effects) = world.get_mut::<ActiveEffects>(combatant) else {
                continue;
            };
            for effect in effects.effects.iter_mut() {
                let EffectTiming::Duration { ms } = effect.timing else {
                    continue;
                };
                effect.elapsed_ms += delta;
                if effect.elapsed_ms >= ms {
                    expired.push(effect.kind);
                    if effect.kind == ActiveEffectKind::Stun {
                        stun_resume = effect.resume;
                    }
                }
            }
            for kind in &expired {
                effects.remove_all(*kind);
            }
        }

        if expired.contains(&ActiveEffectKind::Stun)
            && current_state(world, combatant) == Some(CombatantState::Stunned)
        {
            // Стан закончился: возвращаем прерванное состояние
            execute_commands(
                world,
                &[StateCommand::TransitionState {
                    target: combatant,
                    state: stun_resume.unwrap_or(CombatantState::Cooldown),
                }],
            );
            crate::logger::log(&format!("{:?} recovers from stun", combatant));
        }
    }
}
