//! Win condition: разбитая голова лидера завершает бой.

use bevy::prelude::*;

use crate::battle::context::{BattleContext, BattlePhase};
use crate::components::combatant::{PartSet, PlayerInfo};
use crate::components::part::PartStatus;
use crate::events::{spawn_event, GameOverDeclared};
use crate::FrameClock;

/// Система: проверка голов лидеров; победитель — противоположная команда
pub fn check_win_condition(
    clock: Res<FrameClock>,
    mut context: ResMut<BattleContext>,
    mut commands: Commands,
    leaders: Query<(&PlayerInfo, &PartSet)>,
    statuses: Query<&PartStatus>,
) {
    if context.is_over() || context.phase == BattlePhase::Idle {
        return;
    }

    for (info, parts) in leaders.iter() {
        if !info.is_leader {
            continue;
        }
        let head_broken = statuses
            .get(parts.head)
            .map(|status| status.is_broken)
            .unwrap_or(true);
        if !head_broken {
            continue;
        }

        let winner = info.team.opponent();
        context.phase = BattlePhase::GameOver;
        context.winning_team = Some(winner);
        spawn_event(
            &mut commands,
            clock.frame,
            GameOverDeclared {
                winning_team: winner,
            },
        );
        crate::logger::log_info(&format!(
            "🏁 game over: leader of {} team is down, {} team wins",
            info.team.label(),
            winner.label()
        ));
        return;
    }
}
