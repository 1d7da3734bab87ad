//! OS-backed randomness.

use rand::rngs::OsRng;
use rand::RngCore;
use swiftvault_types::{Result, SwiftvaultError};

/// Fills `buf` from the OS CSPRNG.
///
/// # Errors
///
/// [`SwiftvaultError::EntropySourceUnavailable`] if the generator
/// cannot be read. There is no fallback source.
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| SwiftvaultError::EntropySourceUnavailable {
            reason: e.to_string(),
        })
}

/// Returns `N` fresh random bytes.
pub fn random_array<const N: usize>() -> Result<[u8; N]> {
    let mut out = [0u8; N];
    fill_random(&mut out)?;
    Ok(out)
}
