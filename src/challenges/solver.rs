//! Session-token recovery from the verification page.
//!
//! When the service interposes its browser check, the returned page embeds
//! three hex strings as `toNumbers("…")` arguments: an AES key, an IV, and
//! the ciphertext of the cookie value the data endpoint expects. Pages may
//! carry additional hex arguments earlier in the document; the *last three*
//! are the meaningful triple. That ordering is a contract of the page
//! format — pinned by a fixture test below, not filtered heuristically.

use aes::Aes128;
use aes::cipher::block_padding::{NoPadding, Pkcs7};
use aes::cipher::{BlockDecryptMut, KeyIvInit};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

type Aes128CbcDec = cbc::Decryptor<Aes128>;

static HEX_ARG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"toNumbers\(\s*"([0-9a-fA-F]+)"\s*\)"#).unwrap());

/// Token recovered from a solved challenge, ready to ride a cookie header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    hex_digest: String,
}

impl ResolvedToken {
    pub fn as_hex(&self) -> &str {
        &self.hex_digest
    }

    pub fn into_hex(self) -> String {
        self.hex_digest
    }
}

/// Why a page could not be turned into a token.
///
/// `TooFewTokens` is the ordinary "this page is not solvable" outcome; the
/// remaining variants are decode diagnostics. The orchestrator collapses
/// all of them into a single unsolvable failure after logging the detail.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("found {found} embedded hex tokens, need 3")]
    TooFewTokens { found: usize },
    #[error("hex decoding failed: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("key or iv has an invalid length")]
    BadKeyLength,
    #[error("ciphertext is not a whole number of cipher blocks")]
    BadCiphertextLength,
}

/// Solves the embedded-triple verification challenge.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChallengeSolver;

impl ChallengeSolver {
    pub fn new() -> Self {
        Self
    }

    /// Recover the session token from a challenge page body.
    ///
    /// Decrypts the last embedded (key, iv, ciphertext) triple under
    /// AES-128-CBC and returns the plaintext re-encoded as lower-case hex.
    pub fn solve(&self, page_body: &str) -> Result<ResolvedToken, SolverError> {
        let args: Vec<&str> = HEX_ARG_RE
            .captures_iter(page_body)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .collect();

        if args.len() < 3 {
            return Err(SolverError::TooFewTokens { found: args.len() });
        }

        let key = hex::decode(args[args.len() - 3])?;
        let iv = hex::decode(args[args.len() - 2])?;
        let ciphertext = hex::decode(args[args.len() - 1])?;

        let cipher =
            Aes128CbcDec::new_from_slices(&key, &iv).map_err(|_| SolverError::BadKeyLength)?;

        let plaintext = match cipher.clone().decrypt_padded_vec_mut::<Pkcs7>(&ciphertext) {
            Ok(unpadded) => unpadded,
            // The page's own script tolerates sloppy padding; mirror it by
            // trimming trailing NULs and whitespace instead of failing.
            Err(_) => {
                let raw = cipher
                    .decrypt_padded_vec_mut::<NoPadding>(&ciphertext)
                    .map_err(|_| SolverError::BadCiphertextLength)?;
                trim_loose_padding(raw)
            }
        };

        Ok(ResolvedToken {
            hex_digest: hex::encode(plaintext),
        })
    }
}

fn trim_loose_padding(mut bytes: Vec<u8>) -> Vec<u8> {
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    while bytes.last().is_some_and(|b| b.is_ascii_whitespace()) {
        bytes.pop();
    }
    bytes
}
