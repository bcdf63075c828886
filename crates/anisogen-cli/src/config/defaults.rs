use anisogen::core::io::artifacts::LIGAND_DONOR_MODES;
use anisogen::engine::config::Profile;
use std::path::PathBuf;

pub struct DefaultsConfig {
    pub profile: Profile,
    pub data_dir: PathBuf,
    pub work_dir: PathBuf,
    pub index_output: PathBuf,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Crystal,
            data_dir: PathBuf::from("data"),
            work_dir: PathBuf::from("."),
            index_output: PathBuf::from(LIGAND_DONOR_MODES),
        }
    }
}
