//! Object storage settings (S3-compatible, Cloudflare R2 layout).
//!
//! Nothing uploads yet. The configuration is loaded so asset rows can be
//! turned into object URLs, and so a missing credential is caught at startup
//! rather than at first upload.

use std::fmt;
use uuid::Uuid;

use crate::jobs::model::AssetKind;

const ACCOUNT_ID: &str = "R2_ACCOUNT_ID";
const ACCESS_KEY_ID: &str = "R2_ACCESS_KEY_ID";
const SECRET_ACCESS_KEY: &str = "R2_SECRET_ACCESS_KEY";
const BUCKET_NAME: &str = "R2_BUCKET_NAME";

#[derive(Clone, PartialEq)]
pub struct BlobStoreConfig {
    pub account_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
}

impl fmt::Debug for BlobStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobStoreConfig")
            .field("account_id", &self.account_id)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl BlobStoreConfig {
    /// `Ok(None)` when none of the variables are set. Setting only some of
    /// them is an error.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let vars = [ACCOUNT_ID, ACCESS_KEY_ID, SECRET_ACCESS_KEY, BUCKET_NAME];
        let values: Vec<Option<String>> = vars.iter().map(|k| get(*k)).collect();

        if values.iter().all(Option::is_none) {
            return Ok(None);
        }

        let missing: Vec<&str> = vars
            .iter()
            .zip(&values)
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| *k)
            .collect();
        if !missing.is_empty() {
            anyhow::bail!("blob store partially configured, missing {}", missing.join(", "));
        }

        let mut values = values.into_iter().flatten();
        let mut next = || values.next().unwrap_or_default();
        Ok(Some(Self {
            account_id: next(),
            access_key_id: next(),
            secret_access_key: next(),
            bucket: next(),
        }))
    }

    pub fn endpoint(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }

    /// Path-style URL of an object in the configured bucket.
    pub fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint(),
            self.bucket,
            key.trim_start_matches('/')
        )
    }
}

/// Object key for a generated asset: `jobs/<job_id>/<type>.<ext>`.
pub fn asset_key(job_id: Uuid, kind: AssetKind) -> String {
    format!("jobs/{}/{}.{}", job_id, kind.as_str(), kind.extension())
}
