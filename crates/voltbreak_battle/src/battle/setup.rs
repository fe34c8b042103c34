//! Battle setup: сборка бойцов и частей из loadout + каталога.
//!
//! Все entity боя создаются здесь один раз; в бою ничего не спавнится,
//! кроме эфемерных событий и задач.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ai::Personality;
use crate::battle::context::{BattleContext, BattlePhase, TeamConfig};
use crate::battle::movement;
use crate::catalog::parts::{PartDef, PartSlot};
use crate::catalog::MasterData;
use crate::components::combatant::{
    ActiveEffects, BattleLog, FieldPosition, Gauge, HomePosition, Medal, PartSet, PlayerInfo,
    TeamId,
};
use crate::components::part::{
    AccuracyBehavior, ActionCategory, ActionLogic, AttachedToOwner, ImpactBehavior, PartKey,
    PartStats, PartStatus, PartVisualConfig, TargetingBehavior, TraitCriticalBonus, TraitGuard,
    TraitPenetrate,
};
use crate::components::state::IsReadyToSelect;
use crate::targeting::BattleRoster;

/// Базовая скорость заряда: (константа + propulsion ног) единиц за 3000 мс
const GAUGE_SPEED_BASE: f32 = 20.0;
const GAUGE_SPEED_DIVISOR: f32 = 3000.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberLoadout {
    pub name: String,
    pub medal: String,
    pub head: String,
    pub right_arm: String,
    pub left_arm: String,
    pub legs: String,
    pub is_leader: bool,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamLoadout {
    pub ai: bool,
    pub members: Vec<MemberLoadout>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleLoadout {
    pub alpha: TeamLoadout,
    pub beta: TeamLoadout,
}

impl BattleLoadout {
    /// Демо-состав на встроенном каталоге: две полные команды по три
    pub fn demo() -> Self {
        fn member(
            name: &str,
            medal: &str,
            right_arm: &str,
            left_arm: &str,
            legs: &str,
            is_leader: bool,
        ) -> MemberLoadout {
            MemberLoadout {
                name: name.into(),
                medal: medal.into(),
                head: if is_leader {
                    "head-watchman".into()
                } else {
                    "head-vanguard".into()
                },
                right_arm: right_arm.into(),
                left_arm: left_arm.into(),
                legs: legs.into(),
                is_leader,
                color: String::new(),
            }
        }
        Self {
            alpha: TeamLoadout {
                ai: true,
                members: vec![
                    member("Ironclad", "medal-hawk", "arm-longshot", "arm-rifle", "legs-strider", true),
                    member("Bracer", "medal-tortoise", "arm-aegis", "arm-rifle", "legs-bulwark", false),
                    member("Tinker", "medal-dove", "arm-repair", "arm-jammer", "legs-strider", false),
                ],
            },
            beta: TeamLoadout {
                ai: true,
                members: vec![
                    member("Razorback", "medal-bear", "arm-blade", "arm-shockmaul", "legs-bulwark", true),
                    member("Slingshot", "medal-imp", "arm-rifle", "arm-longshot", "legs-strider", false),
                    member("Patch", "medal-dove", "arm-repair", "arm-rifle", "legs-strider", false),
                ],
            },
        }
    }
}

/// Спавнит часть из определения каталога
fn spawn_part(world: &mut World, def: &PartDef) -> Entity {
    let mut entity = world.spawn((
        PartStatus::new(def.hp),
        def.stats,
        PartVisualConfig {
            display_name: def.name.clone(),
            vfx_class: def.vfx_class.clone(),
        },
    ));

    if let Some(action) = &def.action {
        let is_support = matches!(
            action.category,
            ActionCategory::Heal | ActionCategory::Support | ActionCategory::Defend
        );
        entity.insert((
            ActionLogic {
                category: action.category,
                attack_type: action.attack_type,
                is_support,
            },
            TargetingBehavior {
                timing: action.timing,
                scope: action.scope,
            },
            action.accuracy,
            ImpactBehavior {
                effects: action.effects.clone(),
            },
        ));
        if action.penetrate {
            entity.insert(TraitPenetrate);
        }
        if let Some(rate) = action.critical_bonus {
            entity.insert(TraitCriticalBonus { rate });
        }
        if let Some(count) = action.guard_count {
            entity.insert(TraitGuard { count });
        }
    }

    entity.id()
}

fn part_def<'a>(data: &'a MasterData, id: &str, slot: PartSlot) -> Option<&'a PartDef> {
    let def = data.part(id)?;
    if def.slot != slot {
        crate::logger::log_error(&format!("part {} is not a {:?} part", id, slot));
        return None;
    }
    Some(def)
}

fn spawn_member(
    world: &mut World,
    member: &MemberLoadout,
    team: TeamId,
    slot: usize,
) -> Option<Entity> {
    let (head_def, right_def, left_def, legs_def, personality) = {
        let data = world.resource::<MasterData>();
        let head = part_def(data, &member.head, PartSlot::Head)?.clone();
        let right = part_def(data, &member.right_arm, PartSlot::Arm)?.clone();
        let left = part_def(data, &member.left_arm, PartSlot::Arm)?.clone();
        let legs = part_def(data, &member.legs, PartSlot::Legs)?.clone();
        let personality = data
            .medal(&member.medal)
            .map(|m| m.personality)
            .unwrap_or(Personality::Joker);
        (head, right, left, legs, personality)
    };

    let head = spawn_part(world, &head_def);
    let right_arm = spawn_part(world, &right_def);
    let left_arm = spawn_part(world, &left_def);
    let legs = spawn_part(world, &legs_def);

    let base_speed = (GAUGE_SPEED_BASE + legs_def.stats.propulsion as f32) / GAUGE_SPEED_DIVISOR;
    let home = FieldPosition {
        x: movement::home_x(team),
        y: movement::home_y(slot),
    };

    let combatant = world
        .spawn((
            PlayerInfo {
                name: member.name.clone(),
                team,
                is_leader: member.is_leader,
                color: member.color.clone(),
            },
            Medal {
                medal_id: member.medal.clone(),
                personality,
            },
            Gauge::new(base_speed),
            PartSet {
                head,
                right_arm,
                left_arm,
                legs,
            },
            ActiveEffects::default(),
            home,
            HomePosition { x: home.x, y: home.y },
            BattleLog::default(),
            // Бой открывается начальным выбором действий
            IsReadyToSelect,
        ))
        .id();

    for (part_key, part_entity) in [
        (PartKey::Head, head),
        (PartKey::RightArm, right_arm),
        (PartKey::LeftArm, left_arm),
        (PartKey::Legs, legs),
    ] {
        if let Ok(mut entity) = world.get_entity_mut(part_entity) {
            entity.insert(AttachedToOwner {
                owner: combatant,
                part_key,
            });
        }
    }

    Some(combatant)
}

/// Спавнит весь бой; возвращает бойцов в порядке спавна
pub fn spawn_battle(world: &mut World, loadout: &BattleLoadout) -> Vec<Entity> {
    let mut combatants = Vec::new();
    for (team, team_loadout) in [
        (TeamId::Alpha, &loadout.alpha),
        (TeamId::Beta, &loadout.beta),
    ] {
        for (slot, member) in team_loadout.members.iter().enumerate() {
            match spawn_member(world, member, team, slot) {
                Some(entity) => combatants.push(entity),
                None => {
                    crate::logger::log_error(&format!(
                        "failed to assemble {} ({} team): missing catalog parts",
                        member.name,
                        team.label()
                    ));
                }
            }
        }
    }

    world.insert_resource(BattleRoster {
        combatants: combatants.clone(),
    });
    world.insert_resource(TeamConfig {
        ai_controlled: [loadout.alpha.ai, loadout.beta.ai],
    });
    let mut context = world.resource_mut::<BattleContext>();
    context.phase = BattlePhase::InitialSelection;
    context.turn.number = 0;

    crate::logger::log_info(&format!(
        "⚔️ battle spawned: {} combatants",
        combatants.len()
    ));
    combatants
}
