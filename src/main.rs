//! Block Shape native entry point
//!
//! Headless demo: loads a level pack, autoplays every level by dropping
//! spheres over the target's cells, and logs progress. The browser build
//! drives `WasmSession` from the page instead.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::fs;
    use std::path::PathBuf;

    use anyhow::{Context, Result, bail};
    use clap::Parser;

    use block_shape::Settings;
    use block_shape::autoplay;
    use block_shape::sim::{GameEvent, LevelPack, Session};

    #[derive(Parser, Debug)]
    #[command(name = "block-shape")]
    #[command(about = "Autoplay a block-shape level pack headlessly")]
    struct Cli {
        /// Level pack JSON (defaults to the built-in pack)
        #[arg(long)]
        levels: Option<PathBuf>,
        /// Settings JSON (defaults to built-in settings)
        #[arg(long)]
        settings: Option<PathBuf>,
        /// RNG seed for sphere skins
        #[arg(long, default_value_t = 0x5EED)]
        seed: u64,
        /// Stop after this many simulation ticks
        #[arg(long, default_value_t = 20_000)]
        max_frames: u64,
    }

    fn load_pack(path: Option<&PathBuf>) -> Result<LevelPack> {
        let Some(path) = path else {
            return Ok(LevelPack::builtin());
        };
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed reading level pack {}", path.display()))?;
        LevelPack::from_json(&json).with_context(|| format!("loading {}", path.display()))
    }

    fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
        let Some(path) = path else {
            return Ok(Settings::load());
        };
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed reading settings {}", path.display()))?;
        Settings::from_json(&json).with_context(|| format!("loading {}", path.display()))
    }

    fn log_event(event: &GameEvent) {
        match event {
            GameEvent::LevelStarted {
                index,
                name,
                target,
            } => log::info!("Level {} '{}' started, target {}", index, name, target),
            GameEvent::SphereSpawned { id, skin } => {
                log::debug!("Sphere {} ready ({})", id, skin.texture_file())
            }
            GameEvent::SphereLaunched { id, shots } => {
                log::debug!("Sphere {} dropped, shot {}", id, shots)
            }
            GameEvent::SphereLost { id } => log::warn!("Sphere {} fell off the map", id),
            GameEvent::LevelComplete {
                index,
                variant,
                shots,
            } => log::info!("Level {} matched {} with {} shots", index, variant, shots),
            GameEvent::OutOfShots { index } => log::warn!("Level {} ran out of shots", index),
            GameEvent::SessionComplete { levels } => {
                log::info!("Session complete: {} levels", levels)
            }
        }
    }

    pub fn run() -> Result<()> {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        let cli = Cli::parse();

        let pack = load_pack(cli.levels.as_ref())?;
        let settings = load_settings(cli.settings.as_ref())?;
        log::info!(
            "Block Shape (native) starting: {} levels, seed {:#x}",
            pack.len(),
            cli.seed
        );

        let mut session: Session =
            Session::new(pack, settings, cli.seed).context("creating session")?;
        let summary =
            autoplay::run(&mut session, cli.max_frames, log_event).context("autoplay failed")?;

        println!(
            "{} levels cleared in {} shots over {} frames",
            summary.levels_cleared, summary.shots, summary.frames
        );
        if summary.out_of_shots {
            bail!("level ran out of shots");
        }
        if !summary.completed {
            bail!("session not finished after {} frames", summary.frames);
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is WasmSession, this is just to satisfy the compiler
}
