//! Opaque token generation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;

/// Generate a cryptographically random URL-safe token from `n_bytes` of OS
/// entropy. 32 bytes encodes to 43 characters, inside the 32..=64 range the
/// invite validator enforces.
pub fn generate_token(n_bytes: usize) -> String {
    let mut buf = vec![0u8; n_bytes];
    OsRng.fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}
