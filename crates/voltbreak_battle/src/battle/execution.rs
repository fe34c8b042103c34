//! Execution gating: выбор действующего бойца, запуск резолвера,
//! завершение по SequenceFinished.
//!
//! Одновременно исполняется ровно одно действие. При нескольких готовых
//! бойцах порядок: propulsion ног (больше — раньше), затем entity id.

use bevy::prelude::*;

use crate::battle::context::{BattleContext, BattlePhase};
use crate::combat::resolver::resolve_action;
use crate::components::combatant::PartSet;
use crate::components::part::PartStats;
use crate::components::state::{transition_to, CombatantState, IsReadyToExecute};
use crate::events::{
    spawn_event_world, ActionExecutionCompleted, ActionExecutionStarted, SequenceFinished,
    TurnEnded,
};
use crate::sequence::{builder, VisualSequence};

/// Система: если фаза исполнения и актёр не выбран — берём самого быстрого
/// готового бойца и прогоняем его действие через резолвер.
pub fn begin_action_execution(world: &mut World) {
    {
        let context = world.resource::<BattleContext>();
        if context.is_paused
            || context.is_over()
            || context.phase != BattlePhase::ActionExecution
            || context.turn.current_actor.is_some()
        {
            return;
        }
    }

    let Some(actor) = pick_next_actor(world) else {
        // Готовых не осталось — возвращаемся к выбору
        world.resource_mut::<BattleContext>().phase = BattlePhase::ActionSelection;
        return;
    };

    world.resource_mut::<BattleContext>().turn.current_actor = Some(actor);
    transition_to(world, actor, CombatantState::AwaitingAnimation);
    spawn_event_world(world, ActionExecutionStarted { combatant: actor });

    let resolved = resolve_action(world, actor);
    if let Some(reason) = resolved.result.cancelled {
        crate::logger::log_info(&format!("action of {:?} cancelled: {:?}", actor, reason));
    }
    let tasks = builder::build_sequence(world, &resolved);
    if let Ok(mut entity) = world.get_entity_mut(actor) {
        entity.insert(VisualSequence::new(tasks));
    }
}

/// Готовые к исполнению, отсортированные по propulsion ног (desc), затем id
fn pick_next_actor(world: &mut World) -> Option<Entity> {
    let mut query = world.query_filtered::<Entity, With<IsReadyToExecute>>();
    let mut candidates: Vec<(Entity, u32)> = query
        .iter(world)
        .collect::<Vec<_>>()
        .into_iter()
        .map(|entity| (entity, legs_propulsion(world, entity)))
        .collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.index().cmp(&b.0.index())));
    candidates.first().map(|&(entity, _)| entity)
}

fn legs_propulsion(world: &World, combatant: Entity) -> u32 {
    world
        .get::<PartSet>(combatant)
        .and_then(|parts| world.get::<PartStats>(parts.legs))
        .map(|stats| stats.propulsion)
        .unwrap_or(0)
}

/// Система: обрабатывает завершение последовательностей текущего актёра
pub fn finish_action_execution(world: &mut World) {
    let mut query = world.query::<(Entity, &SequenceFinished)>();
    let finished: Vec<(Entity, SequenceFinished)> = query
        .iter(world)
        .map(|(e, f)| (e, f.clone()))
        .collect();
    if finished.is_empty() {
        return;
    }

    for (event_entity, event) in finished {
        world.despawn(event_entity);

        let is_current = {
            let context = world.resource::<BattleContext>();
            context.turn.current_actor == Some(event.combatant)
        };
        if !is_current {
            continue;
        }

        world.resource_mut::<BattleContext>().turn.current_actor = None;
        spawn_event_world(
            world,
            ActionExecutionCompleted {
                combatant: event.combatant,
            },
        );

        let (phase, paused) = {
            let context = world.resource::<BattleContext>();
            (context.phase, context.is_paused || context.is_over())
        };
        if paused || phase != BattlePhase::ActionExecution {
            continue;
        }

        if anyone_still_charging(world) {
            world.resource_mut::<BattleContext>().phase = BattlePhase::ActionSelection;
        } else {
            let number = {
                let mut context = world.resource_mut::<BattleContext>();
                context.phase = BattlePhase::TurnEnd;
                context.turn.number
            };
            spawn_event_world(world, TurnEnded { number });
        }
    }
}

fn anyone_still_charging(world: &mut World) -> bool {
    use crate::components::state::{IsCharging, IsSelectedCharging};
    let mut charging = world.query_filtered::<Entity, With<IsCharging>>();
    if charging.iter(world).next().is_some() {
        return true;
    }
    let mut selected = world.query_filtered::<Entity, With<IsSelectedCharging>>();
    if selected.iter(world).next().is_some() {
        return true;
    }
    let mut ready = world.query_filtered::<Entity, With<IsReadyToExecute>>();
    ready.iter(world).next().is_some()
}
