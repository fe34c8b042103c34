//! Targeting service: чистые запросы по миру боя.
//!
//! Обход участников идёт по [`BattleRoster`] (фиксируется при спавне боя),
//! поэтому порядок детерминирован и не зависит от внутренностей ECS.

use bevy::prelude::*;

use crate::combat::result::GuardianInfo;
use crate::components::combatant::{ActiveEffectKind, ActiveEffects, PartSet, PlayerInfo, TeamId};
use crate::components::part::{ActionLogic, PartKey, PartStatus};
use crate::components::state::{IsBroken, IsGuarding};
use crate::DeterministicRng;

/// Список бойцов в порядке спавна (resource)
#[derive(Resource, Debug, Clone, Default)]
pub struct BattleRoster {
    pub combatants: Vec<Entity>,
}

impl BattleRoster {
    pub fn team(&self, world: &World, team: TeamId) -> Vec<Entity> {
        self.combatants
            .iter()
            .copied()
            .filter(|&e| {
                world
                    .get::<PlayerInfo>(e)
                    .map(|info| info.team == team)
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn leader(&self, world: &World, team: TeamId) -> Option<Entity> {
        self.combatants.iter().copied().find(|&e| {
            world
                .get::<PlayerInfo>(e)
                .map(|info| info.team == team && info.is_leader)
                .unwrap_or(false)
        })
    }
}

fn part_status(world: &World, combatant: Entity, key: PartKey) -> Option<PartStatus> {
    let parts = world.get::<PartSet>(combatant)?;
    world.get::<PartStatus>(parts.get(key)).copied()
}

/// Валидна ли цель: голова жива и (если задана) часть жива
pub fn is_valid_target(world: &World, target: Entity, part_key: Option<PartKey>) -> bool {
    if world.get::<IsBroken>(target).is_some() {
        return false;
    }
    let head_ok = part_status(world, target, PartKey::Head)
        .map(|s| s.is_usable())
        .unwrap_or(false);
    if !head_ok {
        return false;
    }
    match part_key {
        Some(key) => part_status(world, target, key)
            .map(|s| s.is_usable())
            .unwrap_or(false),
        None => true,
    }
}

/// Живые враги атакующего в порядке roster
pub fn get_valid_enemies(world: &World, attacker: Entity) -> Vec<Entity> {
    let Some(info) = world.get::<PlayerInfo>(attacker) else {
        return Vec::new();
    };
    let enemy_team = info.team.opponent();
    let Some(roster) = world.get_resource::<BattleRoster>() else {
        return Vec::new();
    };
    roster
        .team(world, enemy_team)
        .into_iter()
        .filter(|&e| is_valid_target(world, e, None))
        .collect()
}

/// Живые союзники источника
pub fn get_valid_allies(world: &World, source: Entity, include_self: bool) -> Vec<Entity> {
    let Some(info) = world.get::<PlayerInfo>(source) else {
        return Vec::new();
    };
    let Some(roster) = world.get_resource::<BattleRoster>() else {
        return Vec::new();
    };
    roster
        .team(world, info.team)
        .into_iter()
        .filter(|&e| (include_self || e != source) && is_valid_target(world, e, None))
        .collect()
}

/// Ищет перехватчика в команде цели: IsGuarding + живая guard-часть
pub fn find_guardian(world: &World, target: Entity) -> Option<GuardianInfo> {
    let info = world.get::<PlayerInfo>(target)?;
    let roster = world.get_resource::<BattleRoster>()?;
    for candidate in roster.team(world, info.team) {
        if world.get::<IsGuarding>(candidate).is_none() {
            continue;
        }
        let Some(effects) = world.get::<ActiveEffects>(candidate) else {
            continue;
        };
        let Some(guard) = effects.find(ActiveEffectKind::Guard) else {
            continue;
        };
        let Some(part_key) = guard.part_key else {
            continue;
        };
        let alive = part_status(world, candidate, part_key)
            .map(|s| s.is_usable())
            .unwrap_or(false);
        if alive && is_valid_target(world, candidate, None) {
            return Some(GuardianInfo {
                guardian: candidate,
                part_key,
            });
        }
    }
    None
}

/// Самая живая неразбитая часть из {правая рука, левая рука, ноги}
pub fn find_best_defense_part(world: &World, target: Entity) -> Option<PartKey> {
    [PartKey::RightArm, PartKey::LeftArm, PartKey::Legs]
        .into_iter()
        .filter_map(|key| {
            part_status(world, target, key)
                .filter(|s| s.is_usable())
                .map(|s| (key, s.hp))
        })
        .max_by_key(|&(_, hp)| hp)
        .map(|(key, _)| key)
}

/// Случайная живая часть цели, исключая заданную; голова обязана быть живой
pub fn find_random_penetration_target(
    world: &World,
    rng: &mut DeterministicRng,
    target: Entity,
    excluded: PartKey,
) -> Option<PartKey> {
    if !is_valid_target(world, target, None) {
        return None;
    }
    let candidates: Vec<PartKey> = PartKey::ALL
        .into_iter()
        .filter(|&key| key != excluded)
        .filter(|&key| {
            part_status(world, target, key)
                .map(|s| s.is_usable())
                .unwrap_or(false)
        })
        .collect();
    rng.pick(&candidates).copied()
}

/// Самая повреждённая живая часть среди кандидатов (максимум потерянного HP)
pub fn find_most_damaged_ally_part(
    world: &World,
    candidates: &[Entity],
) -> Option<(Entity, PartKey)> {
    let mut best: Option<(Entity, PartKey, u32)> = None;
    for &ally in candidates {
        let Some(parts) = world.get::<PartSet>(ally) else {
            continue;
        };
        for (key, part_entity) in parts.iter() {
            let Some(status) = world.get::<PartStatus>(part_entity) else {
                continue;
            };
            if !status.is_usable() {
                continue;
            }
            let missing = status.max_hp - status.hp;
            if missing == 0 {
                continue;
            }
            if best.map(|(_, _, m)| missing > m).unwrap_or(true) {
                best = Some((ally, key, missing));
            }
        }
    }
    best.map(|(ally, key, _)| (ally, key))
}

/// Случайная живая часть бойца (любая, включая голову)
pub fn random_usable_part(
    world: &World,
    rng: &mut DeterministicRng,
    combatant: Entity,
) -> Option<PartKey> {
    let parts = world.get::<PartSet>(combatant)?;
    let candidates: Vec<PartKey> = parts
        .iter()
        .into_iter()
        .filter(|&(_, part_entity)| {
            world
                .get::<PartStatus>(part_entity)
                .map(|s| s.is_usable())
                .unwrap_or(false)
        })
        .map(|(key, _)| key)
        .collect();
    rng.pick(&candidates).copied()
}

/// Случайная живая часть бойца с действием (для AI и PostMove выбора)
pub fn random_usable_action_part(
    world: &World,
    rng: &mut DeterministicRng,
    combatant: Entity,
) -> Option<PartKey> {
    let parts = world.get::<PartSet>(combatant)?;
    let candidates: Vec<PartKey> = parts
        .iter()
        .into_iter()
        .filter(|&(_, part_entity)| {
            world.get::<ActionLogic>(part_entity).is_some()
                && world
                    .get::<PartStatus>(part_entity)
                    .map(|s| s.is_usable())
                    .unwrap_or(false)
        })
        .map(|(key, _)| key)
        .collect();
    rng.pick(&candidates).copied()
}
