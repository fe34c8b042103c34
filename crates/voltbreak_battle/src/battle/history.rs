//! Battle history: запись последних атак из HpChanged событий.
//!
//! Повторное чтение события в пределах его срока жизни безопасно: записи
//! перезаписываются, ничего не накапливается.

use bevy::prelude::*;

use crate::battle::context::BattleHistory;
use crate::components::combatant::{AttackRecord, BattleLog, PlayerInfo};
use crate::events::HpChanged;

/// Система: HpChanged → BattleLog обеих сторон + история команд
pub fn record_battle_history(
    mut history: ResMut<BattleHistory>,
    events: Query<&HpChanged>,
    infos: Query<&PlayerInfo>,
    mut logs: Query<&mut BattleLog>,
) {
    for event in events.iter() {
        // Лечение историю атак не меняет
        if event.change >= 0 {
            continue;
        }
        let Some(source) = event.source else {
            continue;
        };

        let record = AttackRecord {
            target: event.target,
            part_key: event.part_key,
        };

        if let Ok(mut log) = logs.get_mut(source) {
            log.last_attack = Some(record);
        }
        if let Ok(mut log) = logs.get_mut(event.target) {
            log.last_attacked_by = Some(source);
        }

        if let Ok(info) = infos.get(source) {
            history.team_last_attack[info.team.index()] = Some(record);
        }
        if let Ok(info) = infos.get(event.target) {
            if info.is_leader {
                history.leader_last_attacked_by[info.team.index()] = Some(source);
            }
        }
    }
}
