//! Medal catalog: медаль → личность AI.

use serde::{Deserialize, Serialize};

use crate::ai::Personality;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedalDef {
    pub id: String,
    pub name: String,
    pub personality: Personality,
}

pub fn builtin_medals() -> Vec<MedalDef> {
    vec![
        MedalDef {
            id: "medal-hawk".into(),
            name: "Hawk".into(),
            personality: Personality::Leader,
        },
        MedalDef {
            id: "medal-bear".into(),
            name: "Bear".into(),
            personality: Personality::Wrecker,
        },
        MedalDef {
            id: "medal-imp".into(),
            name: "Imp".into(),
            personality: Personality::Joker,
        },
        MedalDef {
            id: "medal-dove".into(),
            name: "Dove".into(),
            personality: Personality::Mender,
        },
        MedalDef {
            id: "medal-tortoise".into(),
            name: "Tortoise".into(),
            personality: Personality::Sentinel,
        },
    ]
}
