//! VOLTBREAK Battle Core
//!
//! Headless ECS-ядро пошагово-перемежающегося боя роботов на Bevy 0.16:
//! шкалы заряда в реальном времени, выбор частей, перехватчики, цепной
//! penetration-урон и кооперативный task runner визуальных
//! последовательностей. Рендер, ввод и мастер-данные — внешние
//! коллабораторы; ядро обменивается с ними компонентами-запросами и
//! эфемерными event entities.

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

// Публичные модули
pub mod ai;
pub mod battle;
pub mod catalog;
pub mod combat;
pub mod commands;
pub mod components;
pub mod events;
pub mod logger;
pub mod sequence;
pub mod targeting;

// Re-export базовых типов для удобства
pub use battle::{spawn_battle, BattleContext, BattleLoadout, BattlePhase};
pub use catalog::MasterData;
pub use combat::{CombatResult, CombatTuning};
pub use components::combatant::{Gauge, PartSet, PlayerInfo, TeamId};
pub use components::part::{PartKey, PartStatus};
pub use components::state::CombatantState;
pub use logger::{init_logger, log, log_error, log_info, log_warning, set_logger};

const DEFAULT_SEED: u64 = 42;

/// Кадровые часы: Δt текущего кадра и номер кадра.
///
/// Хост зовёт [`step_frame`] с любым положительным Δt; внутри кадра все
/// системы читают одно и то же значение.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct FrameClock {
    pub delta_ms: f32,
    pub frame: u64,
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Бросок с шансом p ∈ [0,1]
    pub fn chance(&mut self, p: f32) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        self.rng.gen::<f32>() < p
    }

    /// Равномерный индекс 0..len
    pub fn index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.rng.gen_range(0..len))
    }

    /// Равномерный выбор из среза
    pub fn pick<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        let index = self.index(slice.len())?;
        Some(&slice[index])
    }
}

/// Главный plugin боевого ядра: ресурсы + все системы одним chain-ом
/// в порядке конвейера (ввод → фаза → выбор → исполнение → runner →
/// победа → таймеры → gauge → движение → история → GC).
pub struct BattlePlugin;

impl Plugin for BattlePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(FrameClock::default())
            .insert_resource(DeterministicRng::new(DEFAULT_SEED))
            .insert_resource(battle::BattleContext::default())
            .insert_resource(battle::BattleHistory::default())
            .insert_resource(battle::SelectionQueue::default())
            .insert_resource(battle::TeamConfig::default())
            .insert_resource(combat::CombatTuning::default())
            .insert_resource(catalog::AttackTypeTable::default())
            .insert_resource(MasterData::builtin())
            .insert_resource(sequence::runner::PresentationConfig::default());

        app.add_systems(
            Update,
            (
                // Ввод-заглушка презентации + GC прошлых событий
                sequence::runner::acknowledge_presentation_requests,
                events::expire_event_entities,
                // Координатор
                battle::phase::advance_battle_phase,
                battle::selection::enqueue_ready_selectors,
                battle::selection::dispatch_selection,
                battle::selection::ai_make_selection,
                battle::selection::apply_selection,
                // Исполнение действий
                battle::execution::begin_action_execution,
                sequence::runner::run_visual_sequences,
                battle::execution::finish_action_execution,
                // Состояние мира
                battle::win::check_win_condition,
                battle::effects_tick::tick_active_effects,
                battle::gauge::advance_gauges,
                battle::movement::advance_move_tasks,
                battle::history::record_battle_history,
            )
                .chain(),
        );
    }
}

/// Создаёт minimal Bevy App для headless боя
pub fn create_headless_app(seed: u64) -> App {
    init_logger();
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(BattlePlugin)
        .insert_resource(DeterministicRng::new(seed));
    app
}

/// Один кадр боя: фиксирует Δt и прогоняет все системы
pub fn step_frame(app: &mut App, delta_ms: f32) {
    {
        let mut clock = app.world_mut().resource_mut::<FrameClock>();
        clock.delta_ms = delta_ms.max(0.0);
    }
    app.update();
    app.world_mut().resource_mut::<FrameClock>().frame += 1;
}

// ============================================================================
// Snapshot & view
// ============================================================================

/// Сериализуемый вид части для UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartView {
    pub part_key: PartKey,
    pub hp: u32,
    pub max_hp: u32,
    pub is_broken: bool,
}

/// Сериализуемый вид бойца для UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatantView {
    pub name: String,
    pub team: TeamId,
    pub is_leader: bool,
    pub color: String,
    pub state: Option<CombatantState>,
    pub gauge_value: f32,
    pub gauge_max: f32,
    pub guard_count: Option<u32>,
    pub position: components::combatant::FieldPosition,
    pub parts: Vec<PartView>,
}

/// Снимок боя для UI (читается каждый кадр)
pub fn battle_view(world: &World) -> Vec<CombatantView> {
    use components::combatant::{ActiveEffectKind, ActiveEffects, EffectTiming, FieldPosition};

    let Some(roster) = world.get_resource::<targeting::BattleRoster>() else {
        return Vec::new();
    };
    roster
        .combatants
        .iter()
        .filter_map(|&combatant| {
            let info = world.get::<PlayerInfo>(combatant)?;
            let gauge = world.get::<Gauge>(combatant)?;
            let parts = world.get::<PartSet>(combatant)?;
            let position = world
                .get::<FieldPosition>(combatant)
                .copied()
                .unwrap_or(FieldPosition { x: 0.0, y: 0.0 });
            let guard_count = world
                .get::<ActiveEffects>(combatant)
                .and_then(|effects| effects.find(ActiveEffectKind::Guard))
                .and_then(|guard| match guard.timing {
                    EffectTiming::Count { left } => Some(left),
                    EffectTiming::Duration { .. } => None,
                });
            let part_views = parts
                .iter()
                .into_iter()
                .filter_map(|(part_key, part_entity)| {
                    let status = world.get::<PartStatus>(part_entity)?;
                    Some(PartView {
                        part_key,
                        hp: status.hp,
                        max_hp: status.max_hp,
                        is_broken: status.is_broken,
                    })
                })
                .collect();
            Some(CombatantView {
                name: info.name.clone(),
                team: info.team,
                is_leader: info.is_leader,
                color: info.color.clone(),
                state: components::state::current_state(world, combatant),
                gauge_value: gauge.value,
                gauge_max: gauge.max,
                guard_count,
                position,
                parts: part_views,
            })
        })
        .collect()
}

/// Снимок мира для сравнения детерминизма (байтовый, сортирован по roster)
pub fn snapshot_battle(world: &World) -> Vec<u8> {
    let mut snapshot = Vec::new();
    for view in battle_view(world) {
        snapshot.extend_from_slice(view.name.as_bytes());
        snapshot.extend_from_slice(&view.gauge_value.to_le_bytes());
        if let Some(state) = view.state {
            snapshot.extend_from_slice(state.as_str().as_bytes());
        }
        snapshot.extend_from_slice(&view.position.x.to_le_bytes());
        snapshot.extend_from_slice(&view.position.y.to_le_bytes());
        for part in view.parts {
            snapshot.push(part.is_broken as u8);
            snapshot.extend_from_slice(&part.hp.to_le_bytes());
        }
    }
    snapshot
}
