use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Multibase prefix for lowercase base16.
pub const MULTIBASE_BASE16: char = 'f';
/// The only CID version produced and accepted.
pub const CID_VERSION: u8 = 0x01;
/// Multihash code for BLAKE3.
pub const MULTIHASH_BLAKE3: u8 = 0x1e;
/// Digest length of a BLAKE3 multihash.
pub const DIGEST_LEN: usize = 32;

const HEADER_LEN: usize = 4;

/// The content codec tag carried in an identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Codec {
    /// Raw bytes (file contents).
    Raw,
    /// Directory node with named links.
    DagPb,
}

impl Codec {
    /// Multicodec value.
    pub fn code(&self) -> u8 {
        match self {
            Self::Raw => 0x55,
            Self::DagPb => 0x70,
        }
    }

    /// Parse from a multicodec value.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x55 => Some(Self::Raw),
            0x70 => Some(Self::DagPb),
            _ => None,
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::DagPb => write!(f, "dag-pb"),
        }
    }
}

/// Self-describing content identifier.
///
/// Renders as a CIDv1 in lowercase base16 multibase:
/// `f` + hex(`version`, `codec`, `0x1e`, `0x20`, 32-byte BLAKE3 digest).
/// Identical content with the same codec always produces the same
/// `ContentId`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId {
    codec: Codec,
    digest: [u8; DIGEST_LEN],
}

impl ContentId {
    /// Compute the identifier for encoded node bytes.
    pub fn for_content(codec: Codec, data: &[u8]) -> Self {
        Self {
            codec,
            digest: *blake3::hash(data).as_bytes(),
        }
    }

    /// Build an identifier from a pre-computed digest.
    pub fn from_digest(codec: Codec, digest: [u8; DIGEST_LEN]) -> Self {
        Self { codec, digest }
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    /// Binary form: version, codec, multihash header, digest.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + DIGEST_LEN);
        out.extend_from_slice(&[
            CID_VERSION,
            self.codec.code(),
            MULTIHASH_BLAKE3,
            DIGEST_LEN as u8,
        ]);
        out.extend_from_slice(&self.digest);
        out
    }

    /// Decode the binary form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() < HEADER_LEN {
            return Err(TypeError::InvalidLength {
                expected: HEADER_LEN + DIGEST_LEN,
                actual: bytes.len(),
            });
        }
        if bytes[0] != CID_VERSION {
            return Err(TypeError::UnsupportedVersion(bytes[0]));
        }
        let codec = Codec::from_code(bytes[1]).ok_or(TypeError::UnknownCodec(bytes[1]))?;
        if bytes[2] != MULTIHASH_BLAKE3 {
            return Err(TypeError::UnsupportedHash(bytes[2]));
        }
        let declared = bytes[3] as usize;
        let digest = &bytes[HEADER_LEN..];
        if declared != DIGEST_LEN || digest.len() != DIGEST_LEN {
            return Err(TypeError::InvalidLength {
                expected: DIGEST_LEN,
                actual: digest.len(),
            });
        }
        let mut arr = [0u8; DIGEST_LEN];
        arr.copy_from_slice(digest);
        Ok(Self { codec, digest: arr })
    }

    /// Short form used in logs (codec plus first 8 hex digits of the digest).
    pub fn short(&self) -> String {
        format!("{}:{}", self.codec, hex::encode(&self.digest[..4]))
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.short())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", MULTIBASE_BASE16, hex::encode(self.to_bytes()))
    }
}

impl FromStr for ContentId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let prefix = chars.next().ok_or(TypeError::MissingMultibase)?;
        if prefix != MULTIBASE_BASE16 {
            return Err(TypeError::UnsupportedMultibase(prefix));
        }
        let bytes = hex::decode(chars.as_str()).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl TryFrom<String> for ContentId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.to_string()
    }
}
