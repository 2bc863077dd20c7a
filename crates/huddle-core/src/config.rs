use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        let dir = dirs::data_dir()
            .map(|d| d.join("huddle"))
            .unwrap_or_else(|| PathBuf::from("huddle_data"));
        Self::new(dir)
    }
}
