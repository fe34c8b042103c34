//! Headless демо-бой VOLTBREAK
//!
//! Собирает две команды из встроенного каталога и гоняет бой до победы.

use voltbreak_battle::battle::BattleLoadout;
use voltbreak_battle::{battle_view, create_headless_app, spawn_battle, step_frame, BattleContext};

fn main() {
    let seed = 42;
    println!("Starting VOLTBREAK headless battle (seed: {})", seed);

    let mut app = create_headless_app(seed);
    spawn_battle(app.world_mut(), &BattleLoadout::demo());

    const FRAME_MS: f32 = 16.67;
    const MAX_FRAMES: u32 = 200_000;

    let mut frames = 0;
    loop {
        step_frame(&mut app, FRAME_MS);
        frames += 1;

        if frames % 2000 == 0 {
            let context = app.world().resource::<BattleContext>();
            println!(
                "frame {}: turn {}, phase {:?}",
                frames, context.turn.number, context.phase
            );
        }

        let context = app.world().resource::<BattleContext>();
        if context.is_over() {
            println!(
                "Battle over in {} frames: {:?} wins (turn {})",
                frames, context.winning_team, context.turn.number
            );
            break;
        }
        if frames >= MAX_FRAMES {
            println!("Frame cap reached, stopping");
            break;
        }
    }

    for view in battle_view(app.world()) {
        let parts: Vec<String> = view
            .parts
            .iter()
            .map(|p| format!("{}:{}/{}", p.part_key.label(), p.hp, p.max_hp))
            .collect();
        println!(
            "  [{}] {} {:?} — {}",
            view.team.label(),
            view.name,
            view.state,
            parts.join(", ")
        );
    }
}
