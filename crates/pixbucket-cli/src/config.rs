use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use pixbucket_codec::CodecConfig;
use pixbucket_gateway::DirectoryGatewayConfig;
use pixbucket_index::FsIndexConfig;

/// Contents of `pixbucket.toml`.
///
/// ```toml
/// [codec]
/// compression_level = 3
///
/// [gateway]
/// root = ".pixbucket/remote"
/// max_image_bytes = 20971520
/// request_timeout_ms = 30000
///
/// [index]
/// root = ".pixbucket/index"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub codec: CodecConfig,
    pub gateway: DirectoryGatewayConfig,
    pub index: FsIndexConfig,
}

impl CliConfig {
    /// Read the config at `path`, or the defaults if there is no such file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixbucket.toml");
        std::fs::write(
            &path,
            "[codec]\ncompression_level = 9\n\n[index]\nroot = \"/srv/index\"\n",
        )
        .unwrap();

        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.codec.compression_level, 9);
        assert_eq!(config.index.root, PathBuf::from("/srv/index"));
        assert_eq!(config.gateway, DirectoryGatewayConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[codec\n").unwrap();
        let err = CliConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("parsing"));
    }
}
