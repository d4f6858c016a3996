//! Secure PSN source.
//!
//! Draws a 32-bit value from a cryptographic random source and returns the
//! low 24 bits with bit 0 forced to 1, so the transport's "unset" sentinel
//! (zero) is never produced.

use rand::rngs::OsRng;
use rand::RngCore;

const PSN_MASK: u32 = 0x00FF_FFFF;

/// Draw a secure PSN. Uses the OS CSPRNG; falls back to a time-seeded
/// generator only if the OS source is unavailable, logging a warning when it
/// does. The fallback is a last resort, never the default.
pub fn generate_psn() -> u32 {
    draw_psn().0
}

/// Like [`generate_psn`], but also reports whether the non-cryptographic
/// fallback was used, so callers with a counters handle can record it as
/// `psn_draws_total`/`psn_fallback_rng_total`.
pub fn draw_psn() -> (u32, bool) {
    match draw_from_os_rng() {
        Some(raw) => (mask_psn(raw), false),
        None => {
            tracing::warn!("OS entropy source unavailable, falling back to a non-cryptographic PSN generator");
            (mask_psn(draw_from_fallback_rng()), true)
        }
    }
}

fn mask_psn(raw: u32) -> u32 {
    (raw & PSN_MASK) | 0x0000_0001
}

fn draw_from_os_rng() -> Option<u32> {
    let mut rng = OsRng;
    Some(rng.next_u32())
}

/// Time-seeded fallback. Never cryptographically secure; used only when the
/// OS entropy device cannot be reached at all.
fn draw_from_fallback_rng() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u32)
        .unwrap_or(0);
    let pid = std::process::id();
    nanos ^ pid.wrapping_mul(2_654_435_761)
}
