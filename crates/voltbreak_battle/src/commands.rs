//! Deferred state mutations: закрытая грамматика команд + исполнитель.
//!
//! Обработчики эффектов не трогают state tags напрямую — они накапливают
//! [`StateCommand`] записи, которые исполняет [`execute_commands`]
//! (вызывается задачей `ApplyState` в конце визуальной последовательности).
//! Команды применяются атомарно в порядке списка; любую мутацию, нужную
//! обработчику, можно выразить одной из записей ниже.

use bevy::prelude::*;

use crate::battle::movement;
use crate::catalog::attack_types::AttackTypeTable;
use crate::combat::calculator;
use crate::components::combatant::{
    ActionIntent, ActiveEffectKind, ActiveEffects, FieldPosition, Gauge, PartSet, PlayerInfo,
    TimedEffect,
};
use crate::components::state::{current_state, transition_to, CombatantState};

/// Закрытый список точечных обновлений компонентов
#[derive(Debug, Clone)]
pub enum ComponentUpdate {
    SetGaugeValue(f32),
    SetSpeedMultiplier(f32),
    ClearActionIntent,
    AppendActiveEffect(TimedEffect),
    RemoveActiveEffect {
        kind: ActiveEffectKind,
        part_key: Option<crate::components::part::PartKey>,
    },
}

/// Одна отложенная мутация состояния
#[derive(Debug, Clone)]
pub enum StateCommand {
    TransitionState {
        target: Entity,
        state: CombatantState,
    },
    ResetToCooldown {
        target: Entity,
        interrupted: bool,
    },
    SetPlayerBroken {
        target: Entity,
    },
    UpdateComponent {
        target: Entity,
        update: ComponentUpdate,
    },
    SnapToActionLine {
        target: Entity,
    },
    HandleGaugeFull {
        target: Entity,
    },
}

impl StateCommand {
    /// Переводит ли команда бойца в другое primary состояние
    pub fn transitions(&self, entity: Entity) -> bool {
        match self {
            StateCommand::TransitionState { target, .. }
            | StateCommand::ResetToCooldown { target, .. }
            | StateCommand::SetPlayerBroken { target } => *target == entity,
            _ => false,
        }
    }
}

/// Применяет список команд в порядке записи
pub fn execute_commands(world: &mut World, commands: &[StateCommand]) {
    for command in commands {
        execute_one(world, command);
    }
}

fn execute_one(world: &mut World, command: &StateCommand) {
    match command {
        StateCommand::TransitionState { target, state } => {
            transition_to(world, *target, *state);
        }
        StateCommand::ResetToCooldown {
            target,
            interrupted,
        } => reset_to_cooldown(world, *target, *interrupted),
        StateCommand::SetPlayerBroken { target } => set_player_broken(world, *target),
        StateCommand::UpdateComponent { target, update } => {
            update_component(world, *target, update)
        }
        StateCommand::SnapToActionLine { target } => snap_to_action_line(world, *target),
        StateCommand::HandleGaugeFull { target } => handle_gauge_full(world, *target),
    }
}

/// Откат: сброс gauge, очистка действия и guard-состояния
fn reset_to_cooldown(world: &mut World, target: Entity, interrupted: bool) {
    if current_state(world, target) == Some(CombatantState::Broken) {
        return;
    }

    // Множитель отката — от типа атаки части, которой действовали
    let multiplier = world
        .get::<ActionIntent>(target)
        .and_then(|intent| {
            let parts = world.get::<PartSet>(target)?;
            let table = world.get_resource::<AttackTypeTable>()?;
            Some(calculator::speed_multiplier_for(
                world,
                parts.get(intent.part_key),
                table,
            ))
        })
        .unwrap_or(1.0);

    if !transition_to(world, target, CombatantState::Cooldown) {
        return;
    }
    if let Some(mut gauge) = world.get_mut::<Gauge>(target) {
        gauge.reset(multiplier);
    }
    // Cooldown-вход снимает выбранное действие и остатки guard-стойки
    if let Ok(mut entity) = world.get_entity_mut(target) {
        entity.remove::<ActionIntent>();
    }
    if let Some(mut effects) = world.get_mut::<ActiveEffects>(target) {
        effects.remove_all(ActiveEffectKind::Guard);
    }

    if interrupted {
        crate::logger::log_info(&format!("{:?} interrupted, reset to cooldown", target));
    }
}

/// Голова разбита: поглощающее состояние Broken
fn set_player_broken(world: &mut World, target: Entity) {
    if !transition_to(world, target, CombatantState::Broken) {
        return;
    }
    if let Ok(mut entity) = world.get_entity_mut(target) {
        entity.remove::<ActionIntent>();
    }
    if let Some(mut effects) = world.get_mut::<ActiveEffects>(target) {
        effects.effects.clear();
    }
    let name = world
        .get::<PlayerInfo>(target)
        .map(|info| info.name.clone())
        .unwrap_or_else(|| format!("{:?}", target));
    crate::logger::log_info(&format!("💀 {} is broken", name));
}

fn update_component(world: &mut World, target: Entity, update: &ComponentUpdate) {
    match update {
        ComponentUpdate::SetGaugeValue(value) => {
            if let Some(mut gauge) = world.get_mut::<Gauge>(target) {
                gauge.value = value.clamp(0.0, gauge.max);
            }
        }
        ComponentUpdate::SetSpeedMultiplier(multiplier) => {
            if let Some(mut gauge) = world.get_mut::<Gauge>(target) {
                gauge.set_multiplier(*multiplier);
            }
        }
        ComponentUpdate::ClearActionIntent => {
            if let Ok(mut entity) = world.get_entity_mut(target) {
                entity.remove::<ActionIntent>();
            }
        }
        ComponentUpdate::AppendActiveEffect(effect) => {
            if let Some(mut effects) = world.get_mut::<ActiveEffects>(target) {
                effects.upsert(effect.clone());
            }
        }
        ComponentUpdate::RemoveActiveEffect { kind, part_key } => {
            if let Some(mut effects) = world.get_mut::<ActiveEffects>(target) {
                effects.remove(*kind, *part_key);
            }
        }
    }
}

fn snap_to_action_line(world: &mut World, target: Entity) {
    let Some(team) = world.get::<PlayerInfo>(target).map(|info| info.team) else {
        crate::logger::log_error(&format!("SnapToActionLine: {:?} has no PlayerInfo", target));
        return;
    };
    if let Some(mut position) = world.get_mut::<FieldPosition>(target) {
        position.x = movement::action_line_x(team);
    }
}

/// Форсирует полный gauge и соответствующий переход (как gauge система)
fn handle_gauge_full(world: &mut World, target: Entity) {
    let state = current_state(world, target);
    if let Some(mut gauge) = world.get_mut::<Gauge>(target) {
        gauge.value = gauge.max;
    }
    match state {
        Some(CombatantState::Charging) | Some(CombatantState::Cooldown) => {
            transition_to(world, target, CombatantState::ReadyToSelect);
            if let Ok(mut entity) = world.get_entity_mut(target) {
                entity.remove::<ActionIntent>();
            }
        }
        Some(CombatantState::SelectedCharging) => {
            transition_to(world, target, CombatantState::ReadyToExecute);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::combatant::EffectTiming;
    use crate::components::part::PartKey;
    use crate::components::state::{IsGuarding, IsSelectedCharging};

    fn guard_effect() -> TimedEffect {
        TimedEffect {
            kind: ActiveEffectKind::Guard,
            value: 2,
            part_key: Some(PartKey::RightArm),
            timing: EffectTiming::Count { left: 2 },
            elapsed_ms: 0.0,
            stat: None,
            resume: None,
        }
    }

    #[test]
    fn test_reset_to_cooldown_clears_action_and_guard() {
        let mut world = World::new();
        let mut effects = ActiveEffects::default();
        effects.upsert(guard_effect());
        let entity = world
            .spawn((
                IsGuarding,
                Gauge::new(0.02),
                ActionIntent {
                    part_key: PartKey::RightArm,
                    target: None,
                    target_part: None,
                },
                effects,
            ))
            .id();
        world.get_mut::<Gauge>(entity).unwrap().value = 80.0;

        execute_commands(
            &mut world,
            &[StateCommand::ResetToCooldown {
                target: entity,
                interrupted: false,
            }],
        );

        assert_eq!(
            current_state(&world, entity),
            Some(CombatantState::Cooldown)
        );
        assert!(world.get::<ActionIntent>(entity).is_none());
        assert_eq!(world.get::<Gauge>(entity).unwrap().value, 0.0);
        assert!(world
            .get::<ActiveEffects>(entity)
            .unwrap()
            .find(ActiveEffectKind::Guard)
            .is_none());
    }

    #[test]
    fn test_handle_gauge_full_promotes_selected_charging() {
        let mut world = World::new();
        let entity = world.spawn((IsSelectedCharging, Gauge::new(0.02))).id();

        execute_commands(&mut world, &[StateCommand::HandleGaugeFull { target: entity }]);

        assert_eq!(
            current_state(&world, entity),
            Some(CombatantState::ReadyToExecute)
        );
        let gauge = world.get::<Gauge>(entity).unwrap();
        assert_eq!(gauge.value, gauge.max);
    }

    #[test]
    fn test_broken_target_ignores_cooldown_reset() {
        use crate::components::state::IsBroken;
        let mut world = World::new();
        let entity = world.spawn((IsBroken, Gauge::new(0.02))).id();

        execute_commands(
            &mut world,
            &[StateCommand::ResetToCooldown {
                target: entity,
                interrupted: true,
            }],
        );
        assert_eq!(current_state(&world, entity), Some(CombatantState::Broken));
    }
}
