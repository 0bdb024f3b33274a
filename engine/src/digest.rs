//! SHA-256 content digests, hex encoded when serialised.

use std::{io::Write, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{IoContext, Result};

type HashAlgo = sha::sha256::Sha256;

const HASH_DIGEST_LEN: usize = 32;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "OwnString")]
pub struct HashDigest([u8; HASH_DIGEST_LEN]);

impl HashDigest {
    /// Digests the full byte content of the file at `path`.
    pub fn of_file(path: &Path) -> Result<Self> {
        let mut f = std::fs::File::open(path)
            .io_context(|| format!("opening file {:?} for hashing", path))?;
        let mut hash = HashAlgo::default();
        std::io::copy(&mut f, &mut hash)
            .io_context(|| format!("reading file {:?} for hashing", path))?;
        hash_digest(&mut hash).io_context(|| format!("generating content hash of {:?}", path))
    }

    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hash = HashAlgo::default();
        std::hash::Hasher::write(&mut hash, data);
        hash_digest(&mut hash).expect("flushing an in-memory hash cannot fail")
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for HashDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for HashDigest {
    type Error = hex::FromHexError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        let mut digest = HashDigest::default();
        hex::decode_to_slice(value, &mut digest.0)?;
        Ok(digest)
    }
}

#[derive(Serialize)]
struct OwnString(String);

impl From<HashDigest> for OwnString {
    fn from(value: HashDigest) -> Self {
        OwnString(value.to_hex())
    }
}

fn hash_digest(hash: &mut HashAlgo) -> std::io::Result<HashDigest> {
    hash.flush()?;
    let digest_vec = sha::utils::DigestExt::to_bytes(hash);
    let mut digest = HashDigest::default();
    digest.0.copy_from_slice(&digest_vec);
    Ok(digest)
}
