//! Battlefield movement: логические координаты и Move-интерполяция.
//!
//! Поле — x ∈ [0,1] (команды друг напротив друга), y ∈ [0,100] (ряды).
//! Боец выходит из домашней точки на линию действия и возвращается; сами
//! перемещения — Move-задачи последовательности, здесь только интерполяция.

use bevy::prelude::*;

use crate::components::combatant::{FieldPosition, TeamId};
use crate::sequence::{ActiveTask, TaskDef};

pub const MOVE_TASK_MS: f32 = 250.0;

const HOME_X_ALPHA: f32 = 0.08;
const HOME_X_BETA: f32 = 0.92;
const ACTION_LINE_X_ALPHA: f32 = 0.45;
const ACTION_LINE_X_BETA: f32 = 0.55;

/// Линия действия команды
pub fn action_line_x(team: TeamId) -> f32 {
    match team {
        TeamId::Alpha => ACTION_LINE_X_ALPHA,
        TeamId::Beta => ACTION_LINE_X_BETA,
    }
}

pub fn home_x(team: TeamId) -> f32 {
    match team {
        TeamId::Alpha => HOME_X_ALPHA,
        TeamId::Beta => HOME_X_BETA,
    }
}

/// Ряд бойца по слоту в команде (0..3)
pub fn home_y(slot: usize) -> f32 {
    25.0 + 25.0 * slot as f32
}

/// Система: интерполяция позиций для активных Move-задач.
///
/// Снап в конечную точку делает runner при завершении задачи; здесь только
/// промежуточные кадры.
pub fn advance_move_tasks(mut movers: Query<(&mut FieldPosition, &ActiveTask)>) {
    for (mut position, task) in movers.iter_mut() {
        let TaskDef::Move { to, ms } = &task.def else {
            continue;
        };
        let (to, ms) = (*to, *ms);
        let Some((from_x, from_y)) = task.move_from else {
            continue;
        };
        if ms <= 0.0 {
            continue;
        }
        let t = (task.elapsed_ms / ms).clamp(0.0, 1.0);
        position.x = from_x + (to.0 - from_x) * t;
        position.y = from_y + (to.1 - from_y) * t;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teams_face_each_other() {
        assert!(home_x(TeamId::Alpha) < action_line_x(TeamId::Alpha));
        assert!(home_x(TeamId::Beta) > action_line_x(TeamId::Beta));
        assert!(action_line_x(TeamId::Alpha) < action_line_x(TeamId::Beta));
    }
}
