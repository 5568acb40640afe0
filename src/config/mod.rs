use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    pub url: Option<String>,
    // PLACEHOLDER:path entries, in declaration order
    pub wordlists: Option<Vec<String>>,
    #[serde(alias = "concurrency")]
    pub threads: Option<usize>,
    pub timeout: Option<u64>,
    pub method: Option<String>,
    pub headers: Option<Vec<String>>,
    pub data: Option<String>,
    pub skip_after: Option<String>,
    pub filter_codes: Option<String>,
    pub exclude_codes: Option<String>,
    pub filter_size: Option<String>,
    pub exclude_size: Option<String>,
    pub match_text: Option<String>,
    pub match_regex: Option<String>,
    pub exclude_text: Option<String>,
    pub exclude_regex: Option<String>,
    pub proxy: Option<String>,
    pub rate: Option<u32>,
    pub output: Option<String>,
    pub output_format: Option<String>,
    pub no_color: Option<bool>,
    pub debug: Option<bool>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".combfuzz").join("config.yml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn expand_tilde_string(path: &str) -> String {
    expand_tilde(path).to_string_lossy().to_string()
}

pub fn load_config(path: &PathBuf, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_yaml::from_str::<ConfigFile>(&contents)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}
