//! Primary combatant state machine.
//!
//! Каждое состояние — zero-sized tag компонент; переход = "снять старый tag,
//! повесить новый". Инвариант: у живого бойца ровно один primary tag.
//! Все переходы идут через [`transition_to`] / [`push_transition`], которые
//! снимают весь набор и публикуют `StateChanged` event entity для наблюдателей.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::events::{spawn_event, spawn_event_world};

// ============================================================================
// State tags
// ============================================================================

/// Ждёт выбора действия (голова очереди выбора)
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct IsReadyToSelect;

/// Копит gauge без выбранного действия (начальная зарядка)
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct IsCharging;

/// Действие выбрано, gauge копится до исполнения
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct IsSelectedCharging;

/// Gauge полон, боец ждёт своей очереди на исполнение
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct IsReadyToExecute;

/// Откат после действия
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct IsCooldown;

/// Голова разбита — боец выведен из строя до конца боя
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct IsBroken;

/// Исполняет действие (визуальная последовательность активна)
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct IsAwaitingAnimation;

/// Стоит на линии действия и перехватывает атаки по союзникам
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct IsGuarding;

/// Оглушён — gauge заморожен до конца стана
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct IsStunned;

/// Bundle всех primary tags — чтобы снять их одним `remove::<…>()`
pub type StateTagSet = (
    IsReadyToSelect,
    IsCharging,
    IsSelectedCharging,
    IsReadyToExecute,
    IsCooldown,
    IsBroken,
    IsAwaitingAnimation,
    IsGuarding,
    IsStunned,
);

// ============================================================================
// CombatantState enum
// ============================================================================

/// Закрытый список primary состояний (для команд, событий, снапшотов)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatantState {
    ReadyToSelect,
    Charging,
    SelectedCharging,
    ReadyToExecute,
    Cooldown,
    Broken,
    AwaitingAnimation,
    Guarding,
    Stunned,
}

impl CombatantState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CombatantState::ReadyToSelect => "ready_to_select",
            CombatantState::Charging => "charging",
            CombatantState::SelectedCharging => "selected_charging",
            CombatantState::ReadyToExecute => "ready_to_execute",
            CombatantState::Cooldown => "cooldown",
            CombatantState::Broken => "broken",
            CombatantState::AwaitingAnimation => "awaiting_animation",
            CombatantState::Guarding => "guarding",
            CombatantState::Stunned => "stunned",
        }
    }
}

/// Event entity: боец сменил primary состояние
#[derive(Component, Debug, Clone)]
pub struct StateChanged {
    pub combatant: Entity,
    pub from: Option<CombatantState>,
    pub to: CombatantState,
}

// ============================================================================
// Transition helpers
// ============================================================================

/// Текущее primary состояние бойца (None если entity без tag — не боец)
pub fn current_state(world: &World, entity: Entity) -> Option<CombatantState> {
    if world.get::<IsBroken>(entity).is_some() {
        return Some(CombatantState::Broken);
    }
    if world.get::<IsReadyToSelect>(entity).is_some() {
        return Some(CombatantState::ReadyToSelect);
    }
    if world.get::<IsCharging>(entity).is_some() {
        return Some(CombatantState::Charging);
    }
    if world.get::<IsSelectedCharging>(entity).is_some() {
        return Some(CombatantState::SelectedCharging);
    }
    if world.get::<IsReadyToExecute>(entity).is_some() {
        return Some(CombatantState::ReadyToExecute);
    }
    if world.get::<IsCooldown>(entity).is_some() {
        return Some(CombatantState::Cooldown);
    }
    if world.get::<IsAwaitingAnimation>(entity).is_some() {
        return Some(CombatantState::AwaitingAnimation);
    }
    if world.get::<IsGuarding>(entity).is_some() {
        return Some(CombatantState::Guarding);
    }
    if world.get::<IsStunned>(entity).is_some() {
        return Some(CombatantState::Stunned);
    }
    None
}

fn insert_tag(entity: &mut EntityWorldMut, state: CombatantState) {
    match state {
        CombatantState::ReadyToSelect => entity.insert(IsReadyToSelect),
        CombatantState::Charging => entity.insert(IsCharging),
        CombatantState::SelectedCharging => entity.insert(IsSelectedCharging),
        CombatantState::ReadyToExecute => entity.insert(IsReadyToExecute),
        CombatantState::Cooldown => entity.insert(IsCooldown),
        CombatantState::Broken => entity.insert(IsBroken),
        CombatantState::AwaitingAnimation => entity.insert(IsAwaitingAnimation),
        CombatantState::Guarding => entity.insert(IsGuarding),
        CombatantState::Stunned => entity.insert(IsStunned),
    };
}

/// Переводит бойца в новое состояние (exclusive-путь).
///
/// `Broken` — поглощающее состояние: любой переход из него отклоняется.
/// Возвращает false если переход не состоялся.
pub fn transition_to(world: &mut World, entity: Entity, next: CombatantState) -> bool {
    let from = current_state(world, entity);
    if from == Some(CombatantState::Broken) && next != CombatantState::Broken {
        crate::logger::log_warning(&format!(
            "transition_to: {:?} is broken, refusing transition to {}",
            entity,
            next.as_str()
        ));
        return false;
    }
    if from == Some(next) {
        return true;
    }

    let Ok(mut entity_mut) = world.get_entity_mut(entity) else {
        crate::logger::log_error(&format!(
            "transition_to: entity {:?} does not exist",
            entity
        ));
        return false;
    };
    entity_mut.remove::<StateTagSet>();
    insert_tag(&mut entity_mut, next);

    spawn_event_world(
        world,
        StateChanged {
            combatant: entity,
            from,
            to: next,
        },
    );
    true
}

/// Commands-путь перехода (для обычных систем, например gauge).
///
/// Снимает весь набор tags отложенно; вызывающая система отвечает за то,
/// что боец не `Broken` (фильтр `Without<IsBroken>` в её query).
pub fn push_transition(
    commands: &mut Commands,
    frame: u64,
    entity: Entity,
    from: Option<CombatantState>,
    next: CombatantState,
) {
    let mut entity_commands = match commands.get_entity(entity) {
        Ok(ec) => ec,
        Err(_) => return,
    };
    entity_commands.remove::<StateTagSet>();
    match next {
        CombatantState::ReadyToSelect => entity_commands.insert(IsReadyToSelect),
        CombatantState::Charging => entity_commands.insert(IsCharging),
        CombatantState::SelectedCharging => entity_commands.insert(IsSelectedCharging),
        CombatantState::ReadyToExecute => entity_commands.insert(IsReadyToExecute),
        CombatantState::Cooldown => entity_commands.insert(IsCooldown),
        CombatantState::Broken => entity_commands.insert(IsBroken),
        CombatantState::AwaitingAnimation => entity_commands.insert(IsAwaitingAnimation),
        CombatantState::Guarding => entity_commands.insert(IsGuarding),
        CombatantState::Stunned => entity_commands.insert(IsStunned),
    };
    spawn_event(
        commands,
        frame,
        StateChanged {
            combatant: entity,
            from,
            to: next,
        },
    );
}

/// true если у entity есть хотя бы один primary tag (живой участник боя)
pub fn has_any_state(world: &World, entity: Entity) -> bool {
    current_state(world, entity).is_some()
}
