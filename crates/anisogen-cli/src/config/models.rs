use anisogen::engine::config::LookupConfig;
use std::path::PathBuf;

pub struct LookupSettings {
    pub lookup: LookupConfig,
    pub target: f64,
    pub work_dir: PathBuf,
}

pub struct IndexSettings {
    pub lookup: LookupConfig,
    pub output: PathBuf,
}
