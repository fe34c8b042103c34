//! Visual sequence: упорядоченный список задач одного действия.
//!
//! Задачи исполняются кооперативно против кадрового цикла: делегированные
//! (диалог, анимация, vfx, камера) держат request-компонент на бойце, пока
//! внешний презентационный слой его не снимет.

use bevy::prelude::*;
use std::collections::VecDeque;

use crate::catalog::messages::RenderedMessage;
use crate::commands::StateCommand;
use crate::components::part::PartKey;

pub mod builder;
pub mod runner;


/// Стиль показа диалога
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalType {
    /// Плашка, закрывается презентацией сама
    Banner,
    /// Ждёт подтверждения игрока
    Confirm,
}

/// Какую анимацию играть
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationKind {
    Shoot,
    Melee,
    Support,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAnimationKind {
    HpBar,
}

/// Уведомление внешнему слою
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    RefreshUi,
}

/// Дельта HP для анимации полоски
#[derive(Debug, Clone, Copy)]
pub struct HpBarChange {
    pub combatant: Entity,
    pub part_key: PartKey,
    pub delta: i32,
    pub new_hp: u32,
}

/// Одна задача последовательности
#[derive(Debug, Clone)]
pub enum TaskDef {
    Wait {
        ms: f32,
    },
    Move {
        to: (f32, f32),
        ms: f32,
    },
    Dialog {
        message: RenderedMessage,
        modal: ModalType,
    },
    Animate {
        animation: AnimationKind,
        target: Option<Entity>,
    },
    Vfx {
        target: Entity,
        class: String,
    },
    UiAnimation {
        kind: UiAnimationKind,
        changes: Vec<HpBarChange>,
    },
    Camera {
        focus: Entity,
    },
    /// Отложенные мутации состояния (исполняются командным интерпретатором)
    ApplyState {
        commands: Vec<StateCommand>,
    },
    Notify {
        kind: NotifyKind,
    },
}

pub type TaskList = Vec<TaskDef>;

/// Очередь задач бойца
#[derive(Component, Debug, Clone, Default)]
pub struct VisualSequence {
    pub tasks: VecDeque<TaskDef>,
}

impl VisualSequence {
    pub fn new(tasks: TaskList) -> Self {
        Self {
            tasks: tasks.into(),
        }
    }
}

/// Текущая задача (прикреплена, пока не завершится)
#[derive(Component, Debug, Clone)]
pub struct ActiveTask {
    pub def: TaskDef,
    pub elapsed_ms: f32,
    /// Точка старта для Move-интерполяции
    pub move_from: Option<(f32, f32)>,
}

impl ActiveTask {
    pub fn new(def: TaskDef) -> Self {
        Self {
            def,
            elapsed_ms: 0.0,
            move_from: None,
        }
    }
}

// ============================================================================
// Presentation request components
// ============================================================================

/// Запрос диалога: презентация снимает компонент по подтверждению
#[derive(Component, Debug, Clone)]
pub struct DialogRequest {
    pub message: RenderedMessage,
    pub modal: ModalType,
}

#[derive(Component, Debug, Clone)]
pub struct AnimationRequest {
    pub animation: AnimationKind,
    pub target: Option<Entity>,
}

#[derive(Component, Debug, Clone)]
pub struct VfxRequest {
    pub target: Entity,
    pub class: String,
}

#[derive(Component, Debug, Clone)]
pub struct UiAnimationRequest {
    pub kind: UiAnimationKind,
    pub changes: Vec<HpBarChange>,
}

#[derive(Component, Debug, Clone)]
pub struct CameraRequest {
    pub focus: Entity,
}
