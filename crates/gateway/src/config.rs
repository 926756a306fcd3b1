use clap::Parser;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "gateway", about = "Streaming ASR WebSocket gateway")]
pub struct Config {
    #[arg(long, env = "GATEWAY_BIND", default_value = "127.0.0.1:10095")]
    pub bind: SocketAddr,

    /// Worker threads backing the socket I/O runtime. `0` means "available
    /// parallelism", resolved at startup.
    #[arg(long, env = "GATEWAY_IO_THREADS", default_value_t = 0)]
    pub io_threads: usize,

    #[arg(long, env = "GATEWAY_DECODE_LANES", default_value_t = 4)]
    pub decode_lanes: usize,

    #[arg(long, env = "GATEWAY_HOTWORDS_FILE")]
    pub hotwords_file: Option<PathBuf>,

    #[arg(long, env = "GATEWAY_FST_INC_WTS", default_value_t = 20)]
    pub fst_inc_wts: i64,

    #[arg(long, default_value_t = 10.0)]
    pub global_beam: f32,

    #[arg(long, default_value_t = 2.0)]
    pub lattice_beam: f32,

    #[arg(long, default_value_t = 1.0)]
    pub am_scale: f32,

    #[arg(long, env = "GATEWAY_MAX_SAMPLES_BYTES", default_value_t = 0)]
    pub max_samples_bytes: usize,

    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    HotwordsFile { path: PathBuf, source: std::io::Error },
    HotwordsParse { path: PathBuf, source: serde_json::Error },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::HotwordsFile { path, source } => {
                write!(f, "failed to read hotwords file {}: {}", path.display(), source)
            }
            ConfigError::HotwordsParse { path, source } => {
                write!(f, "failed to parse hotwords file {} as a JSON object: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Loads the server-global FST hotword map. A missing file is not an error
/// (treated as an empty map); a present-but-unreadable or malformed file is.
pub fn load_global_hotwords(path: Option<&PathBuf>) -> Result<HashMap<String, i64>, ConfigError> {
    let Some(path) = path else {
        return Ok(HashMap::new());
    };
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(source) => return Err(ConfigError::HotwordsFile { path: path.clone(), source }),
    };
    serde_json::from_str(&contents).map_err(|source| ConfigError::HotwordsParse { path: path.clone(), source })
}
