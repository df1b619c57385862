//! Persistent client identifier.
//!
//! Every request carries `uniqueid=<16 hex chars>`. The host associates the
//! pairing with this value, so it is generated once and kept in
//! `uniqueid.dat` inside the key directory (raw ASCII, no header).

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use gsc_crypto::encoding::to_hex;
use gsc_crypto::random::random_bytes;

pub const UNIQUE_ID_FILE_NAME: &str = "uniqueid.dat";

const UNIQUE_ID_BYTES: usize = 8;
/// Length of the identifier in hex characters.
pub const UNIQUE_ID_LEN: usize = UNIQUE_ID_BYTES * 2;

/// The client's unique id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Load the identifier from `dir`, creating the directory and a new
    /// identifier when none exists yet.
    pub fn load_or_create(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(UNIQUE_ID_FILE_NAME);

        match fs::read(&path) {
            Ok(contents) => Self::from_file_contents(&contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let identity = Self::generate()?;
                let mut file = fs::File::create(&path)?;
                file.write_all(identity.0.as_bytes())?;
                file.sync_all()?;
                tracing::info!(path = %path.display(), "created client unique id");
                Ok(identity)
            }
            Err(e) => Err(e),
        }
    }

    /// Generate a new random identifier without persisting it.
    pub fn generate() -> io::Result<Self> {
        let bytes = random_bytes::<UNIQUE_ID_BYTES>()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        Ok(Self(to_hex(&bytes).to_uppercase()))
    }

    /// Wrap an existing identifier, validating its format.
    pub fn from_string(id: impl Into<String>) -> io::Result<Self> {
        let id = id.into();
        if id.len() != UNIQUE_ID_LEN || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unique id must be {UNIQUE_ID_LEN} hex characters"),
            ));
        }
        Ok(Self(id))
    }

    fn from_file_contents(contents: &[u8]) -> io::Result<Self> {
        let head = contents.get(..UNIQUE_ID_LEN).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "unique id file is truncated")
        })?;
        let id = std::str::from_utf8(head)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "unique id is not ASCII"))?;
        Self::from_string(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
