//! Event-as-entity: события боя как эфемерные entity.
//!
//! Producer спавнит entity с event-компонентом и [`EventLifetime`];
//! потребители читают его query-ами (история, UI, координатор), сборщик
//! [`expire_event_entities`] уничтожает entity в начале кадра, когда срок
//! жизни вышел. Потребители обязаны быть идемпотентными к повторному
//! чтению в пределах срока жизни (запись-перезапись, а не накопление).

use bevy::prelude::*;

use crate::combat::result::CancelReason;
use crate::components::combatant::TeamId;
use crate::components::part::PartKey;
use crate::FrameClock;

/// Сколько кадров event entity живёт после кадра создания
const EVENT_LIFETIME_FRAMES: u64 = 2;

/// Срок жизни эфемерного event entity
#[derive(Component, Debug, Clone, Copy)]
pub struct EventLifetime {
    pub expires_at_frame: u64,
}

impl EventLifetime {
    pub fn starting_at(frame: u64) -> Self {
        Self {
            expires_at_frame: frame + EVENT_LIFETIME_FRAMES,
        }
    }
}

/// Спавн event entity через Commands
pub fn spawn_event<E: Component>(commands: &mut Commands, frame: u64, event: E) {
    commands.spawn((event, EventLifetime::starting_at(frame)));
}

/// Спавн event entity напрямую в World (exclusive-путь)
pub fn spawn_event_world<E: Component>(world: &mut World, event: E) {
    let frame = world
        .get_resource::<FrameClock>()
        .map(|clock| clock.frame)
        .unwrap_or(0);
    world.spawn((event, EventLifetime::starting_at(frame)));
}

/// Система: уничтожение просроченных event entities (начало кадра)
pub fn expire_event_entities(
    mut commands: Commands,
    clock: Res<FrameClock>,
    events: Query<(Entity, &EventLifetime)>,
) {
    for (entity, lifetime) in events.iter() {
        if clock.frame >= lifetime.expires_at_frame {
            commands.entity(entity).despawn();
        }
    }
}

// ============================================================================
// Display deltas
// ============================================================================

/// HP части изменилось (урон или лечение)
#[derive(Component, Debug, Clone)]
pub struct HpChanged {
    /// Кто нанёс изменение (None для внешних/системных источников)
    pub source: Option<Entity>,
    pub target: Entity,
    pub part_key: PartKey,
    /// Отрицательное — урон, положительное — лечение
    pub change: i32,
    pub new_hp: u32,
    pub max_hp: u32,
}

/// Часть разбита (HP достигло нуля)
#[derive(Component, Debug, Clone)]
pub struct PartBrokenEvent {
    pub owner: Entity,
    pub part_key: PartKey,
}

/// Действие бойца отменено (глитч, потеря цели, поломка части)
#[derive(Component, Debug, Clone)]
pub struct ActionCancelledEvent {
    pub combatant: Entity,
    pub reason: CancelReason,
}

// ============================================================================
// Selection protocol
// ============================================================================

/// Вход от игрока или AI: выбранное действие
#[derive(Component, Debug, Clone)]
pub struct ActionChosen {
    pub combatant: Entity,
    pub part_key: PartKey,
    pub target: Option<Entity>,
    pub target_part: Option<PartKey>,
}

/// Запрос выбора действия к внешнему UI (человеческая команда)
#[derive(Component, Debug, Clone)]
pub struct SelectionRequest {
    pub combatant: Entity,
}

// ============================================================================
// Phase notifications
// ============================================================================

#[derive(Component, Debug, Clone)]
pub struct BattleStarted;

#[derive(Component, Debug, Clone)]
pub struct TurnStarted {
    pub number: u32,
}

#[derive(Component, Debug, Clone)]
pub struct TurnEnded {
    pub number: u32,
}

/// Выбор действия бойца принят координатором
#[derive(Component, Debug, Clone)]
pub struct ActionSelectionCompleted {
    pub combatant: Entity,
}

#[derive(Component, Debug, Clone)]
pub struct ActionExecutionStarted {
    pub combatant: Entity,
}

#[derive(Component, Debug, Clone)]
pub struct ActionExecutionCompleted {
    pub combatant: Entity,
}

/// Визуальная последовательность бойца завершилась (или была прервана)
#[derive(Component, Debug, Clone)]
pub struct SequenceFinished {
    pub combatant: Entity,
    pub aborted: bool,
}

/// Бой окончен
#[derive(Component, Debug, Clone)]
pub struct GameOverDeclared {
    pub winning_team: TeamId,
}

/// Просьба к UI перечитать состояние боя
#[derive(Component, Debug, Clone)]
pub struct RefreshUi;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expire_after_lifetime() {
        let mut world = World::new();
        world.insert_resource(FrameClock::default());
        spawn_event_world(&mut world, RefreshUi);

        let mut schedule = Schedule::default();
        schedule.add_systems(expire_event_entities);

        // Кадр 0 и 1: событие живо
        schedule.run(&mut world);
        let mut events = world.query::<&RefreshUi>();
        assert_eq!(events.iter(&world).count(), 1);
        world.resource_mut::<FrameClock>().frame = 1;
        schedule.run(&mut world);
        assert_eq!(events.iter(&world).count(), 1);

        // Кадр 2: GC уничтожает
        world.resource_mut::<FrameClock>().frame = 2;
        schedule.run(&mut world);
        assert_eq!(events.iter(&world).count(), 0);
    }
}
