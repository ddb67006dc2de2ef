use anyhow::Context;
use once_cell::sync::Lazy;
use serde::Deserialize;

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_static_dir() -> String {
    "frontend/pkg".to_string()
}

fn default_max_upload_size() -> usize {
    10 * 1024 * 1024
}

fn default_file_id_length() -> usize {
    8
}

fn default_city_altitude_msnm() -> f64 {
    1737.0
}

fn default_sensor_zero_altitude() -> f64 {
    163.0
}

#[derive(Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    pub s3_bucket_name: String,

    /// Directory holding the `wasm-pack --target web` output of the frontend.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// Largest accepted data file, in bytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: usize,

    #[serde(default = "default_file_id_length")]
    pub file_id_length: usize,

    /// Launch site elevation above sea level, in meters.
    #[serde(default = "default_city_altitude_msnm")]
    pub city_altitude_msnm: f64,

    /// What the altitude sensor reads while sitting on the launch pad.
    #[serde(default = "default_sensor_zero_altitude")]
    pub sensor_zero_altitude: f64,
}

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    envy::from_env()
        .context("failed to parse config from environment variables")
        .unwrap()
});
