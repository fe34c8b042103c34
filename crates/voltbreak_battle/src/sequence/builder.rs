//! Sequence builder: CombatResult → упорядоченный TaskList.
//!
//! Порядок фиксирован: выход на линию действия → анимация → декларация →
//! перехват → сообщения/полоски по каждому эффекту → поражённые → возврат →
//! refresh UI → отложенные команды. Никакого переупорядочивания дальше по
//! конвейеру не происходит.

use bevy::prelude::*;

use crate::battle::movement::{self, MOVE_TASK_MS};
use crate::catalog::messages::{render, MessageKey};
use crate::combat::effects::{combatant_name, part_label, EffectKind};
use crate::combat::result::CancelReason;
use crate::combat::ResolvedAction;
use crate::commands::StateCommand;
use crate::components::combatant::{HomePosition, PartSet, PlayerInfo};
use crate::components::part::{ActionCategory, ActionLogic, PartVisualConfig};
use crate::sequence::{
    AnimationKind, HpBarChange, ModalType, NotifyKind, TaskDef, TaskList, UiAnimationKind,
};

/// Собирает последовательность для разрешённого действия
pub fn build_sequence(world: &World, resolved: &ResolvedAction) -> TaskList {
    let result = &resolved.result;
    if let Some(reason) = result.cancelled {
        return build_cancel_sequence(world, result.attacker, reason);
    }

    let attacker = result.attacker;
    let mut tasks: TaskList = Vec::new();

    // Выход на линию действия
    if let (Some(info), Some(home)) = (
        world.get::<PlayerInfo>(attacker),
        world.get::<HomePosition>(attacker),
    ) {
        tasks.push(TaskDef::Move {
            to: (movement::action_line_x(info.team), home.y),
            ms: MOVE_TASK_MS,
        });
    }

    tasks.push(TaskDef::Animate {
        animation: animation_for(world, attacker, result.attacking_part),
        target: result.final_target,
    });

    tasks.push(TaskDef::Dialog {
        message: render(
            MessageKey::ActionDeclaration,
            &[
                ("attacker", combatant_name(world, attacker)),
                ("part", part_label(world, attacker, result.attacking_part)),
            ],
        ),
        modal: ModalType::Banner,
    });

    if let Some(guardian) = result.guardian {
        tasks.push(TaskDef::Dialog {
            message: render(
                MessageKey::GuardianIntercept,
                &[
                    ("guardian", combatant_name(world, guardian.guardian)),
                    (
                        "target",
                        result
                            .intended_target
                            .map(|t| combatant_name(world, t))
                            .unwrap_or_default(),
                    ),
                ],
            ),
            modal: ModalType::Banner,
        });
    }

    match result.outcome {
        Some(outcome) if !outcome.is_hit => {
            if let Some(target) = result.final_target {
                tasks.push(TaskDef::Dialog {
                    message: render(
                        MessageKey::AttackMissed,
                        &[("target", combatant_name(world, target))],
                    ),
                    modal: ModalType::Banner,
                });
            }
        }
        Some(outcome) if outcome.is_defended => {
            if let Some(target) = result.final_target {
                tasks.push(TaskDef::Dialog {
                    message: render(
                        MessageKey::AttackDefended,
                        &[
                            ("target", combatant_name(world, target)),
                            ("part", part_label(world, target, outcome.final_target_part)),
                        ],
                    ),
                    modal: ModalType::Banner,
                });
            }
        }
        _ => {}
    }

    // По каждому применённому эффекту: сообщение, полоска HP, vfx
    let mut defeated: Vec<Entity> = Vec::new();
    for applied in &result.applied {
        if let Some(message) = &applied.message {
            tasks.push(TaskDef::Dialog {
                message: message.clone(),
                modal: ModalType::Banner,
            });
        }

        let hp_delta = match applied.kind {
            EffectKind::Damage | EffectKind::ApplyStun => -applied.value,
            EffectKind::Heal => applied.value,
            _ => 0,
        };
        if hp_delta != 0 {
            if let Some(part_key) = applied.part_key {
                let new_hp = part_hp(world, applied.target, part_key);
                tasks.push(TaskDef::UiAnimation {
                    kind: UiAnimationKind::HpBar,
                    changes: vec![HpBarChange {
                        combatant: applied.target,
                        part_key,
                        delta: hp_delta,
                        new_hp,
                    }],
                });
            }
        }

        if let Some(class) = vfx_class_for(world, resolved, applied.kind) {
            tasks.push(TaskDef::Vfx {
                target: applied.target,
                class,
            });
        }

        if applied.broke_part {
            if let Some(part_key) = applied.part_key {
                tasks.push(TaskDef::Dialog {
                    message: render(
                        MessageKey::PartBroken,
                        &[
                            ("target", combatant_name(world, applied.target)),
                            ("part", part_label(world, applied.target, part_key)),
                        ],
                    ),
                    modal: ModalType::Banner,
                });
            }
        }
        if applied.broke_combatant {
            defeated.push(applied.target);
        }
        if applied.is_guard_broken {
            tasks.push(TaskDef::Dialog {
                message: render(
                    MessageKey::GuardBroken,
                    &[("target", combatant_name(world, applied.target))],
                ),
                modal: ModalType::Banner,
            });
        }
    }

    for combatant in defeated {
        tasks.push(TaskDef::Vfx {
            target: combatant,
            class: "is-defeated".into(),
        });
        tasks.push(TaskDef::Dialog {
            message: render(
                MessageKey::CombatantDefeated,
                &[("target", combatant_name(world, combatant))],
            ),
            modal: ModalType::Banner,
        });
    }

    // Возврат домой
    if let Some(home) = world.get::<HomePosition>(attacker) {
        tasks.push(TaskDef::Move {
            to: (home.x, home.y),
            ms: MOVE_TASK_MS,
        });
    }

    tasks.push(TaskDef::Notify {
        kind: NotifyKind::RefreshUi,
    });

    // Отложенные мутации состояния; атакующий уходит в откат, если ни одна
    // команда не перевела его сама (guard оставляет его в стойке)
    let mut commands = resolved.commands.clone();
    if !commands.iter().any(|c| c.transitions(attacker)) {
        commands.push(StateCommand::ResetToCooldown {
            target: attacker,
            interrupted: false,
        });
    }
    tasks.push(TaskDef::ApplyState { commands });

    tasks
}

/// Последовательность отмены: сообщение + откат
pub fn build_cancel_sequence(
    world: &World,
    attacker: Entity,
    reason: CancelReason,
) -> TaskList {
    let key = match reason {
        CancelReason::TargetLost => MessageKey::CancelTargetLost,
        CancelReason::PartBroken => MessageKey::CancelPartBroken,
        CancelReason::Interrupted => MessageKey::CancelInterrupted,
    };
    vec![
        TaskDef::Animate {
            animation: AnimationKind::Cancelled,
            target: None,
        },
        TaskDef::Dialog {
            message: render(key, &[("attacker", combatant_name(world, attacker))]),
            modal: ModalType::Banner,
        },
        TaskDef::Notify {
            kind: NotifyKind::RefreshUi,
        },
        TaskDef::ApplyState {
            commands: vec![StateCommand::ResetToCooldown {
                target: attacker,
                interrupted: true,
            }],
        },
    ]
}

fn animation_for(world: &World, attacker: Entity, part_key: crate::components::part::PartKey) -> AnimationKind {
    let category = world
        .get::<PartSet>(attacker)
        .and_then(|parts| world.get::<ActionLogic>(parts.get(part_key)))
        .map(|logic| logic.category);
    match category {
        Some(ActionCategory::Shoot) | Some(ActionCategory::Interrupt) => AnimationKind::Shoot,
        Some(ActionCategory::Melee) => AnimationKind::Melee,
        Some(ActionCategory::Heal)
        | Some(ActionCategory::Support)
        | Some(ActionCategory::Defend) => AnimationKind::Support,
        None => AnimationKind::Support,
    }
}

fn vfx_class_for(world: &World, resolved: &ResolvedAction, kind: EffectKind) -> Option<String> {
    match kind {
        EffectKind::ApplyGlitch => Some("is-glitched".into()),
        EffectKind::ApplyStun => Some("is-stunned".into()),
        EffectKind::ApplyGuard => Some("is-guarding".into()),
        EffectKind::Damage | EffectKind::Heal | EffectKind::ApplyScan => {
            let attacker = resolved.result.attacker;
            let parts = world.get::<PartSet>(attacker)?;
            let config = world
                .get::<PartVisualConfig>(parts.get(resolved.result.attacking_part))?;
            if config.vfx_class.is_empty() {
                None
            } else {
                Some(config.vfx_class.clone())
            }
        }
        EffectKind::ConsumeGuard => None,
    }
}

fn part_hp(world: &World, combatant: Entity, part_key: crate::components::part::PartKey) -> u32 {
    world
        .get::<PartSet>(combatant)
        .and_then(|parts| {
            world.get::<crate::components::part::PartStatus>(parts.get(part_key))
        })
        .map(|status| status.hp)
        .unwrap_or(0)
}
