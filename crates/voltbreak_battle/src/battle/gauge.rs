//! Gauge system: продвижение шкал заряда и переходы на максимуме.

use bevy::prelude::*;

use crate::battle::context::BattleContext;
use crate::components::combatant::{ActionIntent, Gauge};
use crate::components::state::{
    push_transition, CombatantState, IsAwaitingAnimation, IsBroken, IsCharging, IsCooldown,
    IsSelectedCharging, IsStunned,
};
use crate::FrameClock;

/// Система: каждый кадр двигает gauge всех не замороженных бойцов.
///
/// На максимуме в тот же кадр: Charging → ReadyToSelect,
/// SelectedCharging → ReadyToExecute, Cooldown → ReadyToSelect (+ сброс
/// выбранного действия). Пауза и конец боя замораживают все шкалы.
pub fn advance_gauges(
    clock: Res<FrameClock>,
    context: Res<BattleContext>,
    mut commands: Commands,
    mut combatants: Query<
        (
            Entity,
            &mut Gauge,
            Has<IsCharging>,
            Has<IsSelectedCharging>,
            Has<IsCooldown>,
        ),
        (
            Without<IsBroken>,
            Without<IsAwaitingAnimation>,
            Without<IsStunned>,
        ),
    >,
) {
    if context.is_paused || context.is_over() {
        return;
    }
    let delta = clock.delta_ms;
    if delta <= 0.0 {
        return;
    }

    for (entity, mut gauge, charging, selected_charging, cooldown) in combatants.iter_mut() {
        if !gauge.advance(delta) {
            continue;
        }
        if charging {
            push_transition(
                &mut commands,
                clock.frame,
                entity,
                Some(CombatantState::Charging),
                CombatantState::ReadyToSelect,
            );
        } else if selected_charging {
            push_transition(
                &mut commands,
                clock.frame,
                entity,
                Some(CombatantState::SelectedCharging),
                CombatantState::ReadyToExecute,
            );
        } else if cooldown {
            push_transition(
                &mut commands,
                clock.frame,
                entity,
                Some(CombatantState::Cooldown),
                CombatantState::ReadyToSelect,
            );
            commands.entity(entity).remove::<ActionIntent>();
        }
        // Остальные состояния держат полную шкалу без перехода
    }
}
