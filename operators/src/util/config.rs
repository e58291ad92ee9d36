use crate::error::{self, Error};
use crate::util::Result;
use config::{Config, Environment, File, FileFormat};
use hydrogrid_datatypes::primitives::CellSizeUnit;
use hydrogrid_datatypes::raster::ResamplingMethod;
use serde::Deserialize;
use snafu::ResultExt;
use std::sync::{LazyLock, RwLock};

const DEFAULT_SETTINGS: &str = include_str!("../../../Settings-default.toml");

static SETTINGS: LazyLock<RwLock<Config>> = LazyLock::new(init_settings);

fn init_settings() -> RwLock<Config> {
    let mut settings =
        Config::builder().add_source(File::from_str(DEFAULT_SETTINGS, FileFormat::Toml));

    if let Ok(dir) = std::env::current_dir() {
        let files: Vec<File<_, _>> = ["Settings.toml"]
            .iter()
            .map(|f| dir.join(f))
            .filter(|p| p.exists())
            .map(File::from)
            .collect();

        settings = settings.add_source(files);
    }

    // Override config with environment variables that start with `HYDROGRID__`,
    // e.g. `HYDROGRID__ENVELOPE_CACHE__CAPACITY=4096`
    // Note: Since variables contain underscores, we need to use something different
    // for separating groups, for instance double underscores `__`
    settings = settings.add_source(Environment::with_prefix("hydrogrid").separator("__"));

    let config = settings.build().unwrap_or_else(|error| {
        tracing::error!("invalid settings, falling back to the defaults: {error}");

        Config::builder()
            .add_source(File::from_str(DEFAULT_SETTINGS, FileFormat::Toml))
            .build()
            .unwrap_or_default()
    });

    RwLock::new(config)
}

#[cfg(test)]
pub fn set_config<T>(key: &str, value: T) -> Result<()>
where
    T: Into<config::Value>,
{
    let mut settings = SETTINGS.write().map_err(|_error| Error::ConfigLockFailed)?;

    let builder = Config::builder()
        .add_source(settings.clone())
        .set_override(key, value)
        .context(error::Config)?;

    *settings = builder.build().context(error::Config)?;
    Ok(())
}

pub fn get_config<'a, T>(key: &str) -> Result<T>
where
    T: Deserialize<'a>,
{
    SETTINGS
        .read()
        .map_err(|_error| Error::ConfigLockFailed)?
        .get::<T>(key)
        .context(error::Config)
}

pub fn get_config_element<'a, T>() -> Result<T>
where
    T: ConfigElement + Deserialize<'a>,
{
    get_config(T::KEY)
}

pub trait ConfigElement {
    const KEY: &'static str;
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EnvelopeCache {
    pub capacity: usize,
}

impl ConfigElement for EnvelopeCache {
    const KEY: &'static str = "envelope_cache";
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IndexSearcher {
    pub point_cache_capacity: usize,
}

impl ConfigElement for IndexSearcher {
    const KEY: &'static str = "index_searcher";
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Resampling {
    pub default_method: ResamplingMethod,
    pub default_cell_size_unit: CellSizeUnit,
}

impl ConfigElement for Resampling {
    const KEY: &'static str = "resampling";
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ZonalStatistics {
    pub mask_cache_capacity: usize,
}

impl ConfigElement for ZonalStatistics {
    const KEY: &'static str = "zonal_statistics";
}
