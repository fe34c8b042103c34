//! Master data: каталоги частей и медалей, типы атак, шаблоны сообщений.
//!
//! Всё — read-only входные данные боя. Встроенный набор покрывает демо и
//! тесты; хост может загрузить свой через serde.

use bevy::prelude::*;
use std::collections::HashMap;

pub mod attack_types;
pub mod medals;
pub mod messages;
pub mod parts;

pub use attack_types::{AttackTypeDef, AttackTypeTable, ModifierSource, StatModifierDef};
pub use medals::MedalDef;
pub use messages::{render, MessageKey, RenderedMessage};
pub use parts::{ActionDef, CalculationDef, EffectDef, EffectParams, PartDef, PartSlot};

/// Каталоги частей и медалей (resource)
#[derive(Resource, Debug, Clone, Default)]
pub struct MasterData {
    pub parts: HashMap<String, PartDef>,
    pub medals: HashMap<String, MedalDef>,
}

impl MasterData {
    pub fn builtin() -> Self {
        let mut data = Self::default();
        for part in parts::builtin_parts() {
            data.parts.insert(part.id.clone(), part);
        }
        for medal in medals::builtin_medals() {
            data.medals.insert(medal.id.clone(), medal);
        }
        data
    }

    pub fn part(&self, id: &str) -> Option<&PartDef> {
        self.parts.get(id)
    }

    pub fn medal(&self, id: &str) -> Option<&MedalDef> {
        self.medals.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::parts::PartSlot;

    #[test]
    fn test_builtin_catalog_is_complete() {
        let data = MasterData::builtin();
        assert!(data.parts.len() >= 10);
        assert!(data.medals.len() >= 5);

        // Хватает слотов для сборки робота
        assert!(data
            .parts
            .values()
            .any(|p| p.slot == PartSlot::Head && p.action.is_some()));
        assert!(data.parts.values().any(|p| p.slot == PartSlot::Arm));
        assert!(data.parts.values().any(|p| p.slot == PartSlot::Legs));
    }
}
