//! Selection sub-protocol: очередь выбора, запросы к UI/AI, применение
//! выбора, повторная постановка при отказе.

use bevy::prelude::*;

use crate::ai;
use crate::battle::context::{BattleContext, SelectionQueue, TeamConfig};
use crate::catalog::attack_types::AttackTypeTable;
use crate::combat::calculator;
use crate::components::combatant::{ActionIntent, Gauge, PartSet, PlayerInfo};
use crate::components::part::{ActionLogic, PartStatus};
use crate::components::state::{
    current_state, transition_to, CombatantState, IsBroken, IsReadyToSelect,
};
use crate::events::{spawn_event, ActionChosen, SelectionRequest};
use crate::FrameClock;

/// Система: новые ready-to-select бойцы встают в очередь выбора
pub fn enqueue_ready_selectors(
    mut queue: ResMut<SelectionQueue>,
    newly_ready: Query<Entity, (Added<IsReadyToSelect>, Without<IsBroken>)>,
) {
    for entity in newly_ready.iter() {
        queue.enqueue(entity);
    }
}

/// Система: голова очереди становится текущим выбирающим; человеческой
/// команде отправляется SelectionRequest (AI отвечает своей системой).
pub fn dispatch_selection(
    clock: Res<FrameClock>,
    mut context: ResMut<BattleContext>,
    mut queue: ResMut<SelectionQueue>,
    team_config: Res<TeamConfig>,
    mut commands: Commands,
    ready: Query<Has<IsReadyToSelect>, Without<IsBroken>>,
    infos: Query<&PlayerInfo>,
) {
    if context.is_paused || context.is_over() {
        return;
    }
    if let Some(selector) = context.turn.current_selector {
        // Выбирающий потерял право выбора (сломан, оглушён) — снимаем его
        let still_ready = ready.get(selector).unwrap_or(false);
        if still_ready {
            return;
        }
        context.turn.current_selector = None;
        queue.remove(selector);
    }

    // Сдвигаем головы, потерявшие право выбора (сломаны, состояние ушло)
    while let Some(&head) = queue.queue.front() {
        let still_ready = ready.get(head).unwrap_or(false);
        if still_ready {
            break;
        }
        queue.queue.pop_front();
    }

    let Some(&head) = queue.queue.front() else {
        return;
    };
    context.turn.current_selector = Some(head);

    let is_ai = infos
        .get(head)
        .map(|info| team_config.is_ai(info.team))
        .unwrap_or(true);
    if !is_ai {
        spawn_event(&mut commands, clock.frame, SelectionRequest { combatant: head });
    }
}

/// Система: AI-ход выбора — строит ActionChosen для текущего выбирающего
pub fn ai_make_selection(world: &mut World) {
    let selector = {
        let context = world.resource::<BattleContext>();
        if context.is_paused || context.is_over() {
            return;
        }
        let Some(selector) = context.turn.current_selector else {
            return;
        };
        selector
    };

    let is_ai = {
        let Some(info) = world.get::<PlayerInfo>(selector) else {
            return;
        };
        let team = info.team;
        world.resource::<TeamConfig>().is_ai(team)
    };
    if !is_ai {
        return;
    }

    // Выбор уже в полёте — не дублируем
    let mut pending = world.query::<&ActionChosen>();
    if pending.iter(world).any(|c| c.combatant == selector) {
        return;
    }

    let chosen = world.resource_scope(|world, mut rng: Mut<crate::DeterministicRng>| {
        ai::choose_action(world, &mut rng, selector)
    });

    match chosen {
        Some(chosen) => {
            crate::events::spawn_event_world(world, chosen);
        }
        None => {
            // Нечем действовать: пропуск хода через откат
            crate::logger::log_warning(&format!(
                "{:?} has no usable action part, skipping turn",
                selector
            ));
            transition_to(world, selector, CombatantState::Cooldown);
            if let Some(mut gauge) = world.get_mut::<Gauge>(selector) {
                gauge.reset(1.0);
            }
            world.resource_mut::<BattleContext>().turn.current_selector = None;
            world.resource_mut::<SelectionQueue>().remove(selector);
        }
    }
}

/// Система: применяет пришедшие ActionChosen.
///
/// Невалидный выбор (часть сломана, состояние ушло) отклоняется: боец
/// остаётся в очереди и выбор запрашивается заново.
pub fn apply_selection(world: &mut World) {
    let mut query = world.query::<(Entity, &ActionChosen)>();
    let chosen: Vec<(Entity, ActionChosen)> = query
        .iter(world)
        .map(|(e, c)| (e, c.clone()))
        .collect();
    if chosen.is_empty() {
        return;
    }

    for (event_entity, selection) in chosen {
        world.despawn(event_entity);
        let combatant = selection.combatant;

        if current_state(world, combatant) != Some(CombatantState::ReadyToSelect) {
            crate::logger::log(&format!(
                "stale selection for {:?}, dropping",
                combatant
            ));
            continue;
        }

        let part_entity = world
            .get::<PartSet>(combatant)
            .map(|parts| parts.get(selection.part_key));
        let part_ok = part_entity
            .map(|part| {
                world.get::<ActionLogic>(part).is_some()
                    && world
                        .get::<PartStatus>(part)
                        .map(|s| s.is_usable())
                        .unwrap_or(false)
            })
            .unwrap_or(false);

        if !part_ok {
            // ACTION_REQUEUE: выбор отклонён, боец остаётся головой очереди
            crate::logger::log_warning(&format!(
                "selection rejected for {:?}: part {:?} unusable",
                combatant, selection.part_key
            ));
            {
                let mut context = world.resource_mut::<BattleContext>();
                if context.turn.current_selector == Some(combatant) {
                    context.turn.current_selector = None;
                }
            }
            world.resource_mut::<SelectionQueue>().enqueue(combatant);
            continue;
        }

        let multiplier = {
            let table = world.resource::<AttackTypeTable>().clone();
            part_entity
                .map(|part| calculator::speed_multiplier_for(world, part, &table))
                .unwrap_or(1.0)
        };

        if let Ok(mut entity) = world.get_entity_mut(combatant) {
            entity.insert(ActionIntent {
                part_key: selection.part_key,
                target: selection.target,
                target_part: selection.target_part,
            });
        }
        transition_to(world, combatant, CombatantState::SelectedCharging);
        if let Some(mut gauge) = world.get_mut::<Gauge>(combatant) {
            gauge.reset(multiplier);
        }

        world.resource_mut::<SelectionQueue>().remove(combatant);
        {
            let mut context = world.resource_mut::<BattleContext>();
            if context.turn.current_selector == Some(combatant) {
                context.turn.current_selector = None;
            }
        }
        crate::events::spawn_event_world(
            world,
            crate::events::ActionSelectionCompleted { combatant },
        );
    }
}
