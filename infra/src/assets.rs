use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{InfraError, Result};
use crate::token::Token;

/// Qualifier of the default bootstrap stack.
pub const BOOTSTRAP_QUALIFIER: &str = "hnb659fds";

/// Bootstrap bucket the deploy tooling publishes file assets to.
pub const ASSET_BUCKET: &str = "cdk-hnb659fds-assets-${AWS::AccountId}-${AWS::Region}";

/// A zip archive shipped alongside the template, addressed by the SHA-256
/// of its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAsset {
    source: PathBuf,
    hash: String,
}

impl FileAsset {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(InfraError::AssetNotFound(path.to_path_buf()));
        }
        if path.extension().and_then(|e| e.to_str()) != Some("zip") {
            return Err(InfraError::UnsupportedAsset(path.to_path_buf()));
        }

        let bytes = fs::read(path)?;
        let hash = hex::encode(Sha256::digest(&bytes));
        tracing::debug!(source = %path.display(), %hash, "fingerprinted asset");

        Ok(Self {
            source: path.to_path_buf(),
            hash,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn object_key(&self) -> String {
        format!("{}.zip", self.hash)
    }

    pub fn staged_file_name(&self) -> String {
        format!("asset.{}.zip", self.hash)
    }

    pub fn bucket_name(&self) -> Token {
        Token::sub(ASSET_BUCKET)
    }

    /// Copies the archive into the assembly directory. Already staged
    /// archives are left untouched since the name carries the content hash.
    pub fn stage(&self, out_dir: &Path) -> Result<PathBuf> {
        let target = out_dir.join(self.staged_file_name());
        if !target.exists() {
            fs::copy(&self.source, &target)?;
        }
        Ok(target)
    }
}
