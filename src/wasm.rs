//! Browser handle around [`Session`]
//!
//! The host page renders and gathers input; this side owns the simulation and
//! runs it through a [`FrameDriver`] from the page's animation frame callback.

use glam::Vec3;
use wasm_bindgen::prelude::*;

use crate::driver::FrameDriver;
use crate::settings::Settings;
use crate::sim::grid::CellCoord;
use crate::sim::{LevelPack, Session};

fn init_logging() {
    console_error_panic_hook::set_once();
    // Fails if a previous session already installed the logger
    let _ = console_log::init_with_level(log::Level::Info);
}

#[wasm_bindgen]
pub struct WasmSession {
    driver: FrameDriver,
}

#[wasm_bindgen]
impl WasmSession {
    /// Session over a JSON level pack; an empty string plays the built-in pack
    #[wasm_bindgen(constructor)]
    pub fn new(levels_json: &str, seed: u64) -> Result<WasmSession, JsError> {
        init_logging();
        let pack = if levels_json.trim().is_empty() {
            LevelPack::builtin()
        } else {
            LevelPack::from_json(levels_json)?
        };
        let settings = Settings::load();
        log::info!("Block Shape starting: {} levels, seed {}", pack.len(), seed);
        Ok(Self {
            driver: FrameDriver::new(Session::new(pack, settings, seed)?),
        })
    }

    /// Pointer pressed on the waiting sphere
    pub fn begin_charge(&mut self) {
        self.driver.begin_charge();
    }

    /// Pointer released; `x, y, z` is the clicked point on the sphere surface
    pub fn release(&mut self, x: f32, y: f32, z: f32) {
        self.driver.release(Vec3::new(x, y, z));
    }

    pub fn drop_at(&mut self, x: f32, y: f32, z: f32) {
        self.driver.drop_at(Vec3::new(x, y, z));
    }

    pub fn restart(&mut self) {
        self.driver.restart();
    }

    /// Jump to a level (level select)
    pub fn select_level(&mut self, index: usize) -> Result<(), JsError> {
        self.driver.session_mut().request_level(index)?;
        Ok(())
    }

    /// Run simulation ticks for `dt` seconds of wall time; returns ticks run
    pub fn frame(&mut self, dt: f32) -> Result<u32, JsError> {
        Ok(self.driver.frame(dt)?)
    }

    #[wasm_bindgen(getter)]
    pub fn phase(&self) -> String {
        self.driver.session().phase().as_str().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn power_fraction(&self) -> f32 {
        self.driver.session().power_fraction()
    }

    #[wasm_bindgen(getter)]
    pub fn level_index(&self) -> Option<usize> {
        self.driver.session().current_index()
    }

    #[wasm_bindgen(getter)]
    pub fn shots(&self) -> u32 {
        self.driver.session().level().map_or(0, |l| l.shots)
    }

    /// Flat `[id, x, y, z, waiting]` per tracked sphere
    pub fn sphere_positions(&self) -> Vec<f32> {
        let Some(level) = self.driver.session().level() else {
            return Vec::new();
        };
        level
            .spheres
            .iter()
            .flat_map(|s| {
                [
                    s.id as f32,
                    s.position.x,
                    s.position.y,
                    s.position.z,
                    if s.waiting { 1.0 } else { 0.0 },
                ]
            })
            .collect()
    }

    /// Texture file for a sphere id, if tracked
    pub fn sphere_texture(&self, id: u32) -> Option<String> {
        let level = self.driver.session().level()?;
        level
            .spheres
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.skin.texture_file().to_string())
    }

    /// Row-major occupancy, one byte per cell
    pub fn occupancy(&self) -> Vec<u8> {
        self.driver
            .session()
            .occupancy()
            .map(|o| o.to_bytes())
            .unwrap_or_default()
    }

    /// Row-major helper colors (0xRRGGBB), empty when helpers are off
    pub fn helper_colors(&self) -> Vec<u32> {
        let Some(level) = self.driver.session().level() else {
            return Vec::new();
        };
        if !self.driver.session().settings().cell_helpers {
            return Vec::new();
        }
        let size = level.grid.size();
        (0..size)
            .flat_map(|row| (0..size).map(move |col| CellCoord::new(row, col)))
            .map(|coord| level.grid.helper_color(coord))
            .collect()
    }

    /// Row-major cell centers as flat `[x, y, z]`
    pub fn cell_centers(&self) -> Vec<f32> {
        let Some(level) = self.driver.session().level() else {
            return Vec::new();
        };
        level
            .grid
            .cells()
            .flat_map(|(_, cell)| cell.bounds.center().to_array())
            .collect()
    }

    /// Queued events as a JSON array
    pub fn drain_events(&mut self) -> Result<String, JsError> {
        let events = self.driver.session_mut().drain_events();
        Ok(serde_json::to_string(&events)?)
    }

    pub fn settings_json(&self) -> Result<String, JsError> {
        Ok(serde_json::to_string(self.driver.session().settings())?)
    }

    /// Replace and persist settings; applied to the running session immediately
    pub fn apply_settings(&mut self, json: &str) -> Result<(), JsError> {
        let settings = Settings::from_json(json)?;
        settings.save();
        self.driver.session_mut().set_settings(settings);
        Ok(())
    }
}
