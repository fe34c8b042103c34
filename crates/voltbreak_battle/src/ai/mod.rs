//! AI selection: личность медали → стратегия выбора части и цели.
//!
//! Ядро потребляет только итоговый выбор `{part, target, target_part}` —
//! тот же ActionChosen, что присылает человеческий UI.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::combatant::{ActiveEffectKind, ActiveEffects, Medal, PartSet, PlayerInfo};
use crate::components::part::{
    ActionCategory, ActionLogic, PartKey, PartStatus, TargetScope, TargetTiming, TargetingBehavior,
};
use crate::events::ActionChosen;
use crate::targeting;
use crate::DeterministicRng;

/// Закрытый список личностей
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Personality {
    /// Бьёт по лидеру противника
    Leader,
    /// Добивает самую повреждённую часть
    Wrecker,
    /// Случайная цель, случайная часть
    Joker,
    /// Чинит союзников при первой возможности
    Mender,
    /// Держит guard-стойку
    Sentinel,
}

struct UsablePart {
    key: PartKey,
    category: ActionCategory,
    behavior: TargetingBehavior,
}

fn usable_parts(world: &World, combatant: Entity) -> Vec<UsablePart> {
    let Some(parts) = world.get::<PartSet>(combatant) else {
        return Vec::new();
    };
    parts
        .iter()
        .into_iter()
        .filter_map(|(key, part_entity)| {
            let logic = world.get::<ActionLogic>(part_entity)?;
            let behavior = world.get::<TargetingBehavior>(part_entity)?;
            let usable = world
                .get::<PartStatus>(part_entity)
                .map(|s| s.is_usable())
                .unwrap_or(false);
            usable.then(|| UsablePart {
                key,
                category: logic.category,
                behavior: *behavior,
            })
        })
        .collect()
}

/// Полный ход выбора AI: часть + цель по личности
pub fn choose_action(
    world: &World,
    rng: &mut DeterministicRng,
    combatant: Entity,
) -> Option<ActionChosen> {
    let personality = world
        .get::<Medal>(combatant)
        .map(|medal| medal.personality)
        .unwrap_or(Personality::Joker);
    let parts = usable_parts(world, combatant);
    if parts.is_empty() {
        return None;
    }

    let pick = select_part(world, rng, combatant, personality, &parts)?;
    let (target, target_part) = match (pick.behavior.scope, pick.behavior.timing) {
        (TargetScope::EnemySingle, TargetTiming::PreMove) => {
            match select_enemy_target(world, rng, combatant) {
                Some((target, part)) => (Some(target), Some(part)),
                None => return None,
            }
        }
        (TargetScope::AllySingle, TargetTiming::PreMove) => {
            let allies = targeting::get_valid_allies(world, combatant, true);
            match targeting::find_most_damaged_ally_part(world, &allies) {
                Some((ally, part)) => (Some(ally), Some(part)),
                None => (None, None),
            }
        }
        // PostMove и self/team-цели разрешаются в момент исполнения
        _ => (None, None),
    };

    Some(ActionChosen {
        combatant,
        part_key: pick.key,
        target,
        target_part,
    })
}

fn select_part<'a>(
    world: &World,
    rng: &mut DeterministicRng,
    combatant: Entity,
    personality: Personality,
    parts: &'a [UsablePart],
) -> Option<&'a UsablePart> {
    // Mender чинит, когда есть что чинить
    if personality == Personality::Mender {
        let allies = targeting::get_valid_allies(world, combatant, true);
        let has_damage = targeting::find_most_damaged_ally_part(world, &allies).is_some();
        if has_damage {
            if let Some(heal) = parts.iter().find(|p| p.category == ActionCategory::Heal) {
                return Some(heal);
            }
        }
    }

    // Sentinel встаёт в стойку, пока она не висит
    if personality == Personality::Sentinel {
        let already_guarding = world
            .get::<ActiveEffects>(combatant)
            .map(|e| e.find(ActiveEffectKind::Guard).is_some())
            .unwrap_or(false);
        if !already_guarding {
            if let Some(guard) = parts.iter().find(|p| p.category == ActionCategory::Defend) {
                return Some(guard);
            }
        }
    }

    let offensive: Vec<&UsablePart> = parts
        .iter()
        .filter(|p| {
            matches!(
                p.category,
                ActionCategory::Shoot | ActionCategory::Melee | ActionCategory::Interrupt
            )
        })
        .collect();
    if !offensive.is_empty() {
        let index = rng.index(offensive.len())?;
        return Some(offensive[index]);
    }

    let index = rng.index(parts.len())?;
    Some(&parts[index])
}

/// Выбор вражеской цели по личности атакующего
pub fn select_enemy_target(
    world: &World,
    rng: &mut DeterministicRng,
    attacker: Entity,
) -> Option<(Entity, PartKey)> {
    let enemies = targeting::get_valid_enemies(world, attacker);
    if enemies.is_empty() {
        return None;
    }
    let personality = world
        .get::<Medal>(attacker)
        .map(|medal| medal.personality)
        .unwrap_or(Personality::Joker);

    match personality {
        Personality::Leader => {
            let enemy_team = world.get::<PlayerInfo>(attacker)?.team.opponent();
            let roster = world.get_resource::<targeting::BattleRoster>()?;
            let leader = roster
                .leader(world, enemy_team)
                .filter(|&e| targeting::is_valid_target(world, e, None));
            let target = match leader {
                Some(leader) => leader,
                None => *rng.pick(&enemies)?,
            };
            let part = targeting::random_usable_part(world, rng, target)?;
            Some((target, part))
        }
        Personality::Wrecker => {
            // Самая повреждённая часть по всем врагам
            match targeting::find_most_damaged_ally_part(world, &enemies) {
                Some(found) => Some(found),
                None => {
                    let target = *rng.pick(&enemies)?;
                    let part = targeting::random_usable_part(world, rng, target)?;
                    Some((target, part))
                }
            }
        }
        _ => {
            let target = *rng.pick(&enemies)?;
            let part = targeting::random_usable_part(world, rng, target)?;
            Some((target, part))
        }
    }
}
