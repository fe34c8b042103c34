//! Message repository: ключ → шаблон строки.
//!
//! Шаблоны с плейсхолдерами вида `{attacker}`; подстановка — простой
//! построчный replace, без форматных мини-языков.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKey {
    ActionDeclaration,
    GuardianIntercept,
    DamageDealt,
    CriticalHit,
    AttackMissed,
    AttackDefended,
    PartBroken,
    Healed,
    HealNoEffect,
    ScanApplied,
    GuardRaised,
    GuardConsumed,
    GuardBroken,
    GlitchSuccess,
    GlitchNoEffect,
    Stunned,
    CombatantDefeated,
    CancelTargetLost,
    CancelPartBroken,
    CancelInterrupted,
}

/// Шаблон для ключа
pub fn template(key: MessageKey) -> &'static str {
    match key {
        MessageKey::ActionDeclaration => "{attacker} readies {part}!",
        MessageKey::GuardianIntercept => "{guardian} steps in to cover {target}!",
        MessageKey::DamageDealt => "{target}'s {part} takes {value} damage!",
        MessageKey::CriticalHit => "Critical! {target}'s {part} takes {value} damage!",
        MessageKey::AttackMissed => "{target} evades the attack!",
        MessageKey::AttackDefended => "{target} blocks with {part}!",
        MessageKey::PartBroken => "{target}'s {part} is destroyed!",
        MessageKey::Healed => "{target}'s {part} recovers {value} HP!",
        MessageKey::HealNoEffect => "{target}'s {part} cannot be repaired!",
        MessageKey::ScanApplied => "{attacker} scans the field: +{value} {stat} for the team!",
        MessageKey::GuardRaised => "{attacker} raises guard with {part} ({value} charges)!",
        MessageKey::GuardConsumed => "{target}'s guard absorbs the blow ({value} left)!",
        MessageKey::GuardBroken => "{target}'s guard is smashed!",
        MessageKey::GlitchSuccess => "{target}'s action is scrambled!",
        MessageKey::GlitchNoEffect => "The glitch fizzles — {target} was not charging!",
        MessageKey::Stunned => "{target} is stunned for {value} ms!",
        MessageKey::CombatantDefeated => "{target} is out of the fight!",
        MessageKey::CancelTargetLost => "{attacker} lost the target — action cancelled!",
        MessageKey::CancelPartBroken => "{attacker}'s part is broken — action cancelled!",
        MessageKey::CancelInterrupted => "{attacker}'s action was interrupted!",
    }
}

/// Отрендеренное сообщение для диалоговой задачи
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMessage {
    pub key: MessageKey,
    pub text: String,
}

/// Подстановка параметров в шаблон ключа
pub fn render(key: MessageKey, params: &[(&str, String)]) -> RenderedMessage {
    let mut text = template(key).to_string();
    for (name, value) in params {
        text = text.replace(&format!("{{{}}}", name), value);
    }
    RenderedMessage { key, text }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_params() {
        let msg = render(
            MessageKey::DamageDealt,
            &[
                ("target", "Ironclad".to_string()),
                ("part", "right arm".to_string()),
                ("value", "18".to_string()),
            ],
        );
        assert_eq!(msg.text, "Ironclad's right arm takes 18 damage!");
        assert_eq!(msg.key, MessageKey::DamageDealt);
    }

    #[test]
    fn test_unknown_placeholder_left_intact() {
        let msg = render(MessageKey::AttackMissed, &[]);
        assert!(msg.text.contains("{target}"));
    }
}
