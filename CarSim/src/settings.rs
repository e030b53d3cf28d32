//! Translation of the configuration into device settings.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use carsimconfig::Config;
use carsimengine::EngineSettings;
use carsimradio::{Catalog, RadioSettings, SongTiming};
use tracing::info;

pub fn radio_settings(config: &Config) -> Result<RadioSettings> {
    let song_min = config.get_radio_song_min_ms()?;
    if song_min == 0 {
        bail!("radio.song_min_ms must be positive");
    }
    Ok(RadioSettings {
        default_volume: volume(config.get_radio_default_volume()?, "radio.default_volume")?,
        reverse_volume: volume(config.get_radio_reverse_volume()?, "radio.reverse_volume")?,
        autoplay: config.get_radio_autoplay()?,
        verbose: config.get_radio_verbose()?,
        song_timing: SongTiming {
            min: Duration::from_millis(song_min),
            jitter: Duration::from_millis(config.get_radio_song_jitter_ms()?),
        },
        rng_seed: None,
    })
}

pub fn engine_settings(config: &Config) -> Result<EngineSettings> {
    let forward = config.get_engine_forward_ms()?;
    let reverse = config.get_engine_reverse_ms()?;
    if forward == 0 || reverse == 0 {
        bail!("engine.forward_ms and engine.reverse_ms must be positive");
    }
    Ok(EngineSettings {
        forward: Duration::from_millis(forward),
        reverse: Duration::from_millis(reverse),
    })
}

/// Volume step of the client `+`/`-` keys.
pub fn volume_step(config: &Config) -> Result<i32> {
    let step = config.get_radio_volume_step()?;
    Ok(i32::try_from(volume(step, "radio.volume_step")?)?)
}

/// The configured catalog file, or the built-in catalog.
pub fn load_catalog(config: &Config) -> Result<Catalog> {
    match config.get_radio_catalog_path() {
        Some(path) => {
            let catalog = Catalog::from_file(&path)
                .with_context(|| format!("Cannot load station catalog {path}"))?;
            info!(path = %path, stations = catalog.len(), "Loaded station catalog");
            Ok(catalog)
        }
        None => Ok(Catalog::builtin()),
    }
}

fn volume(value: u64, key: &str) -> Result<u32> {
    if value > 100 {
        bail!("{key} must be within 0..=100, got {value}");
    }
    Ok(value as u32)
}
