//! Combat domain: калькулятор, обработчики эффектов, hooks, резолвер.

pub mod calculator;
pub mod effects;
pub mod hooks;
pub mod resolver;
pub mod result;

pub use calculator::CombatTuning;
pub use effects::{EffectContext, EffectKind, PendingEffect};
pub use resolver::{resolve_action, ResolvedAction};
pub use result::{CancelReason, CombatResult, EffectResult, GuardianInfo, Outcome, ResultSummary};
