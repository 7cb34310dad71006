// Configuration module for srcgraph
// Reads from environment variables with sensible defaults

use std::env;
use std::sync::OnceLock;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Worker pool size for parallel parsing (SRCGRAPH_POOL_SIZE)
    pub pool_size: usize,

    /// Maximum file size in megabytes before a file is skipped (SRCGRAPH_MAX_FILE_SIZE_MB)
    pub max_file_size_mb: u64,

    /// Language assumed for ambiguous `.h` headers (SRCGRAPH_HEADER_LANGUAGE)
    pub header_language: HeaderLanguage,

    /// Maximum bytes kept for flow-node source snippets (SRCGRAPH_SNIPPET_MAX_BYTES)
    pub snippet_max_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLanguage {
    C,
    Cpp,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool_size: 3,
            max_file_size_mb: 10,
            header_language: HeaderLanguage::C,
            snippet_max_bytes: 200,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(val) = env::var("SRCGRAPH_POOL_SIZE") {
            match val.parse::<usize>() {
                Ok(parsed) if parsed > 0 => config.pool_size = parsed,
                _ => eprintln!(
                    "srcgraph: Warning: Invalid SRCGRAPH_POOL_SIZE value: {}, using default: {}",
                    val, config.pool_size
                ),
            }
        }

        if let Ok(val) = env::var("SRCGRAPH_MAX_FILE_SIZE_MB") {
            if let Ok(parsed) = val.parse() {
                config.max_file_size_mb = parsed;
            } else {
                eprintln!(
                    "srcgraph: Warning: Invalid SRCGRAPH_MAX_FILE_SIZE_MB value: {}, using default: {}",
                    val, config.max_file_size_mb
                );
            }
        }

        if let Ok(val) = env::var("SRCGRAPH_HEADER_LANGUAGE") {
            match val.trim().to_ascii_lowercase().as_str() {
                "c" => config.header_language = HeaderLanguage::C,
                "cpp" | "c++" => config.header_language = HeaderLanguage::Cpp,
                _ => eprintln!(
                    "srcgraph: Warning: Invalid SRCGRAPH_HEADER_LANGUAGE value: {}, using default: c",
                    val
                ),
            }
        }

        if let Ok(val) = env::var("SRCGRAPH_SNIPPET_MAX_BYTES") {
            if let Ok(parsed) = val.parse() {
                config.snippet_max_bytes = parsed;
            } else {
                eprintln!(
                    "srcgraph: Warning: Invalid SRCGRAPH_SNIPPET_MAX_BYTES value: {}, using default: {}",
                    val, config.snippet_max_bytes
                );
            }
        }

        config
    }

    /// Get the global configuration instance
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::from_env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pool_size, 3);
        assert_eq!(config.max_file_size_mb, 10);
        assert_eq!(config.header_language, HeaderLanguage::C);
        assert_eq!(config.snippet_max_bytes, 200);
    }
}
