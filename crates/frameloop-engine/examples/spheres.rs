//! Headless spheres demo: a system-driven player, two event-driven
//! wanderers (one leaves after five seconds), and a prop whose patrol
//! behavior stops after ten.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example spheres -p frameloop-engine [config.json]
//!
//! The optional JSON file may set any of `fixed_dt`, `seed` and
//! `max_frames`.

use std::rc::Rc;

use anyhow::Context;
use frameloop_engine::prelude::*;

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => TickConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {path}"))?,
        None => TickConfig::default(),
    };

    let headless = Rc::new(HeadlessRenderer::new(config.seed));
    let renderer: Rc<dyn Renderer> = headless.clone();
    let mut game = Game::new(config, renderer);
    let demo = game.setup_demo()?;

    let _departures = game.lifecycle().bus().on(GameEvent::ENTITY_REMOVED, |event| {
        if let GameEvent::EntityRemoved(id) = event {
            tracing::info!(entity = %id, "left the game");
        }
    })?;

    game.run();

    let player_x = game
        .scheduler()
        .world()
        .get::<Position>(demo.player)
        .map(|p| p.x);
    println!("frames simulated: {}", game.clock().frames());
    println!("simulated seconds: {:.3}", game.clock().elapsed());
    println!("player x: {player_x:?}");
    println!(
        "event entities left: {} ({})",
        game.lifecycle().entity_count(),
        if game.lifecycle().is_registered(demo.expiring) {
            "expiring sphere still present"
        } else {
            "expiring sphere removed"
        }
    );
    println!(
        "patrol: {} at {:?}",
        if game.behaviors().iter().any(|b| b.is_attached()) {
            "still moving"
        } else {
            "stopped"
        },
        headless.position(demo.patrol)
    );
    println!("live visuals: {:?}", headless.live_names());
    Ok(())
}
