//! Phase coordinator: глобальная машина фаз боя.
//!
//! Переходы наблюдаются раз в кадр. ActionExecution завершает отдельная
//! система исполнения (по SequenceFinished); GameOver ставит win-система.

use bevy::prelude::*;

use crate::battle::context::{BattleContext, BattlePhase, SelectionQueue};
use crate::components::state::{
    IsBroken, IsCharging, IsReadyToExecute, IsReadyToSelect, IsSelectedCharging,
};
use crate::events::{spawn_event, BattleStarted, TurnEnded, TurnStarted};
use crate::targeting::BattleRoster;
use crate::FrameClock;

/// Система: переходы глобальной фазы
pub fn advance_battle_phase(
    clock: Res<FrameClock>,
    mut context: ResMut<BattleContext>,
    queue: Res<SelectionQueue>,
    roster: Option<Res<BattleRoster>>,
    mut commands: Commands,
    ready_select: Query<Entity, (With<IsReadyToSelect>, Without<IsBroken>)>,
    charging: Query<Entity, (With<IsCharging>, Without<IsBroken>)>,
    selected: Query<Entity, (With<IsSelectedCharging>, Without<IsBroken>)>,
    ready_execute: Query<Entity, (With<IsReadyToExecute>, Without<IsBroken>)>,
) {
    if context.is_paused || context.is_over() {
        return;
    }
    let frame = clock.frame;

    match context.phase {
        BattlePhase::Idle => {
            let has_combatants = roster.map(|r| !r.combatants.is_empty()).unwrap_or(false);
            if has_combatants {
                context.phase = BattlePhase::InitialSelection;
            }
        }
        BattlePhase::InitialSelection => {
            // Начальный выбор завершён: никто больше не ждёт выбора
            let selection_pending = !ready_select.is_empty()
                || !queue.queue.is_empty()
                || context.turn.current_selector.is_some();
            if !selection_pending {
                context.phase = BattlePhase::BattleStartConfirm;
            }
        }
        BattlePhase::BattleStartConfirm => {
            context.phase = BattlePhase::BattleStart;
            spawn_event(&mut commands, frame, BattleStarted);
            crate::logger::log_info("⚔️ battle start");
        }
        BattlePhase::BattleStart => {
            context.turn.number = 1;
            context.phase = BattlePhase::TurnStart;
            spawn_event(&mut commands, frame, TurnStarted { number: 1 });
        }
        BattlePhase::TurnStart => {
            context.phase = BattlePhase::ActionSelection;
        }
        BattlePhase::ActionSelection => {
            if !ready_execute.is_empty() {
                context.phase = BattlePhase::ActionExecution;
            } else if charging.is_empty()
                && selected.is_empty()
                && ready_select.is_empty()
                && queue.queue.is_empty()
            {
                let number = context.turn.number;
                context.phase = BattlePhase::TurnEnd;
                spawn_event(&mut commands, frame, TurnEnded { number });
            }
        }
        BattlePhase::ActionExecution => {
            // Завершение хода исполнения — в execution системе
        }
        BattlePhase::TurnEnd => {
            // Ждём, пока кто-то снова сможет действовать, затем новый ход
            let someone_active = !ready_select.is_empty()
                || !charging.is_empty()
                || !selected.is_empty()
                || !ready_execute.is_empty();
            if someone_active {
                context.turn.number += 1;
                let number = context.turn.number;
                context.phase = BattlePhase::TurnStart;
                spawn_event(&mut commands, frame, TurnStarted { number });
            }
        }
        BattlePhase::GameOver => {}
    }
}
