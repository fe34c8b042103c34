//! Task runner: кооперативное исполнение визуальных последовательностей.
//!
//! Приостановка — только между задачами; внутри задачи — только опрос
//! завершения раз в кадр. Делегированные задачи держат request-компонент,
//! пока презентация его не снимет; по таймауту задача считается завершённой,
//! чтобы не заблокировать бой.

use bevy::prelude::*;

use crate::commands::execute_commands;
use crate::components::combatant::FieldPosition;
use crate::components::state::IsBroken;
use crate::events::{spawn_event_world, RefreshUi, SequenceFinished};
use crate::sequence::{
    ActiveTask, AnimationRequest, CameraRequest, DialogRequest, NotifyKind, TaskDef,
    UiAnimationRequest, VfxRequest, VisualSequence,
};
use crate::FrameClock;

/// Дедлайн делегированной задачи
pub const DELEGATED_TASK_TIMEOUT_MS: f32 = 10_000.0;

/// Режим презентации: headless-заглушка сама подтверждает запросы
#[derive(Resource, Debug, Clone, Copy)]
pub struct PresentationConfig {
    pub auto_acknowledge: bool,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            auto_acknowledge: true,
        }
    }
}

/// Система-заглушка внешней презентации: снимает request-компоненты так,
/// как это делал бы рендерер по окончании анимации/диалога.
pub fn acknowledge_presentation_requests(
    config: Res<PresentationConfig>,
    mut commands: Commands,
    requests: Query<
        Entity,
        Or<(
            With<DialogRequest>,
            With<AnimationRequest>,
            With<VfxRequest>,
            With<UiAnimationRequest>,
            With<CameraRequest>,
        )>,
    >,
) {
    if !config.auto_acknowledge {
        return;
    }
    for entity in requests.iter() {
        commands.entity(entity).remove::<(
            DialogRequest,
            AnimationRequest,
            VfxRequest,
            UiAnimationRequest,
            CameraRequest,
        )>();
    }
}

/// Система: продвигает все активные последовательности на один кадр
pub fn run_visual_sequences(world: &mut World) {
    let delta = world.resource::<FrameClock>().delta_ms;
    let mut query = world.query_filtered::<Entity, With<VisualSequence>>();
    let entities: Vec<Entity> = query.iter(world).collect();

    for entity in entities {
        // Сломанный боец: прерываем последовательность, снимаем requests
        if world.get::<IsBroken>(entity).is_some() {
            abort_sequence(world, entity);
            continue;
        }
        advance_sequence(world, entity, delta);
    }
}

fn advance_sequence(world: &mut World, entity: Entity, delta: f32) {
    loop {
        if world.get::<ActiveTask>(entity).is_some() {
            if !tick_active_task(world, entity, delta) {
                return;
            }
            remove_task_attachments(world, entity);
            continue;
        }

        // Очередь пуста — последовательность завершена
        let next = world
            .get_mut::<VisualSequence>(entity)
            .and_then(|mut seq| seq.tasks.pop_front());
        let Some(def) = next else {
            if let Ok(mut entity_mut) = world.get_entity_mut(entity) {
                entity_mut.remove::<VisualSequence>();
            }
            spawn_event_world(
                world,
                SequenceFinished {
                    combatant: entity,
                    aborted: false,
                },
            );
            return;
        };

        if !start_task(world, entity, def) {
            // Задача заняла кадр — дальше в следующий раз
            return;
        }
    }
}

/// Запускает задачу. true — мгновенная (продолжаем очередь в том же кадре).
fn start_task(world: &mut World, entity: Entity, def: TaskDef) -> bool {
    let instant = match &def {
        TaskDef::Wait { ms } => *ms <= 0.0,
        TaskDef::Move { to, ms } => {
            if *ms <= 0.0 {
                set_position(world, entity, *to);
                true
            } else {
                false
            }
        }
        TaskDef::Dialog { message, modal } => {
            let request = DialogRequest {
                message: message.clone(),
                modal: *modal,
            };
            if let Ok(mut entity_mut) = world.get_entity_mut(entity) {
                entity_mut.insert(request);
            }
            false
        }
        TaskDef::Animate { animation, target } => {
            if let Ok(mut entity_mut) = world.get_entity_mut(entity) {
                entity_mut.insert(AnimationRequest {
                    animation: *animation,
                    target: *target,
                });
            }
            false
        }
        TaskDef::Vfx { target, class } => {
            let request = VfxRequest {
                target: *target,
                class: class.clone(),
            };
            if let Ok(mut entity_mut) = world.get_entity_mut(entity) {
                entity_mut.insert(request);
            }
            false
        }
        TaskDef::UiAnimation { kind, changes } => {
            let request = UiAnimationRequest {
                kind: *kind,
                changes: changes.clone(),
            };
            if let Ok(mut entity_mut) = world.get_entity_mut(entity) {
                entity_mut.insert(request);
            }
            false
        }
        TaskDef::Camera { focus } => {
            if let Ok(mut entity_mut) = world.get_entity_mut(entity) {
                entity_mut.insert(CameraRequest { focus: *focus });
            }
            false
        }
        TaskDef::ApplyState { commands } => {
            let commands = commands.clone();
            execute_commands(world, &commands);
            true
        }
        TaskDef::Notify { kind } => {
            match kind {
                NotifyKind::RefreshUi => spawn_event_world(world, RefreshUi),
            }
            true
        }
    };

    if instant {
        return true;
    }

    let move_from = match &def {
        TaskDef::Move { .. } => world.get::<FieldPosition>(entity).map(|p| (p.x, p.y)),
        _ => None,
    };
    insert_active(world, entity, def, move_from);
    false
}

fn insert_active(world: &mut World, entity: Entity, def: TaskDef, move_from: Option<(f32, f32)>) {
    if let Ok(mut entity_mut) = world.get_entity_mut(entity) {
        entity_mut.insert(ActiveTask {
            def,
            elapsed_ms: 0.0,
            move_from,
        });
    }
}

/// Опрашивает активную задачу. true — завершена.
fn tick_active_task(world: &mut World, entity: Entity, delta: f32) -> bool {
    let (def, elapsed) = {
        let Some(mut task) = world.get_mut::<ActiveTask>(entity) else {
            return true;
        };
        task.elapsed_ms += delta;
        (task.def.clone(), task.elapsed_ms)
    };

    match def {
        TaskDef::Wait { ms } => elapsed >= ms,
        TaskDef::Move { to, ms } => {
            if elapsed >= ms {
                set_position(world, entity, to);
                true
            } else {
                false
            }
        }
        TaskDef::Dialog { .. } => {
            delegated_done::<DialogRequest>(world, entity, elapsed, "dialog")
        }
        TaskDef::Animate { .. } => {
            delegated_done::<AnimationRequest>(world, entity, elapsed, "animation")
        }
        TaskDef::Vfx { .. } => delegated_done::<VfxRequest>(world, entity, elapsed, "vfx"),
        TaskDef::UiAnimation { .. } => {
            delegated_done::<UiAnimationRequest>(world, entity, elapsed, "ui animation")
        }
        TaskDef::Camera { .. } => {
            delegated_done::<CameraRequest>(world, entity, elapsed, "camera")
        }
        // Мгновенные задачи не бывают активными
        TaskDef::ApplyState { .. } | TaskDef::Notify { .. } => true,
    }
}

/// Делегированная задача завершена, когда презентация сняла request.
/// По дедлайну считаем её завершённой, чтобы не зависнуть.
fn delegated_done<R: Component>(
    world: &mut World,
    entity: Entity,
    elapsed: f32,
    label: &str,
) -> bool {
    if world.get::<R>(entity).is_none() {
        return true;
    }
    if elapsed >= DELEGATED_TASK_TIMEOUT_MS {
        crate::logger::log_warning(&format!(
            "{} task timed out on {:?}, forcing completion",
            label, entity
        ));
        if let Ok(mut entity_mut) = world.get_entity_mut(entity) {
            entity_mut.remove::<R>();
        }
        return true;
    }
    false
}

fn set_position(world: &mut World, entity: Entity, to: (f32, f32)) {
    if let Some(mut position) = world.get_mut::<FieldPosition>(entity) {
        position.x = to.0;
        position.y = to.1;
    }
}

fn remove_task_attachments(world: &mut World, entity: Entity) {
    if let Ok(mut entity_mut) = world.get_entity_mut(entity) {
        entity_mut.remove::<ActiveTask>();
        entity_mut.remove::<(
            DialogRequest,
            AnimationRequest,
            VfxRequest,
            UiAnimationRequest,
            CameraRequest,
        )>();
    }
}

/// Прерывание: снимаем текущую задачу и остаток очереди
fn abort_sequence(world: &mut World, entity: Entity) {
    remove_task_attachments(world, entity);
    if let Ok(mut entity_mut) = world.get_entity_mut(entity) {
        entity_mut.remove::<VisualSequence>();
    }
    spawn_event_world(
        world,
        SequenceFinished {
            combatant: entity,
            aborted: true,
        },
    );
    crate::logger::log_info(&format!("sequence aborted for broken {:?}", entity));
}
