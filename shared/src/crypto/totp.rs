//! # HOTP / TOTP (RFC 4226 / RFC 6238)
//!
//! A from-scratch HOTP implementation built directly on `hmac` + `sha1`
//! rather than a higher-level TOTP crate, so the counter-window and
//! drift-tolerance logic stays in one inspectable module next to this
//! crate's other pure crypto primitives. TOTP is HOTP with the counter
//! derived from wall-clock time.
//!
//! Parameters fixed by this implementation: SHA-1, 30-second step, 6-digit
//! codes, ±1 step drift tolerance on verification.

use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

const STEP_SECONDS: u64 = 30;
const DIGITS: u32 = 6;
const DRIFT_STEPS: i64 = 1;

/// Computes the RFC 4226 HOTP value for `secret` at `counter`.
pub fn hotp(secret: &[u8], counter: u64) -> u32 {
    let mut mac = HmacSha1::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(&counter.to_be_bytes());
    let hash = mac.finalize().into_bytes();

    let offset = (hash[hash.len() - 1] & 0x0f) as usize;
    let binary = ((hash[offset] as u32 & 0x7f) << 24)
        | ((hash[offset + 1] as u32) << 16)
        | ((hash[offset + 2] as u32) << 8)
        | (hash[offset + 3] as u32);

    binary % 10u32.pow(DIGITS)
}

/// Formats an HOTP/TOTP numeric value as a zero-padded 6-digit string.
pub fn format_code(value: u32) -> String {
    format!("{:0width$}", value, width = DIGITS as usize)
}

/// Computes the RFC 6238 TOTP code for `secret` at `unix_time_seconds`.
pub fn totp_at(secret: &[u8], unix_time_seconds: u64) -> String {
    let counter = unix_time_seconds / STEP_SECONDS;
    format_code(hotp(secret, counter))
}

/// Verifies a user-submitted `code` against `secret` at `unix_time_seconds`,
/// accepting the current step and up to [`DRIFT_STEPS`] steps before or
/// after it to tolerate clock skew between client and server.
pub fn verify_totp(secret: &[u8], code: &str, unix_time_seconds: u64) -> bool {
    if code.len() != DIGITS as usize || !code.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let counter = (unix_time_seconds / STEP_SECONDS) as i64;
    for drift in -DRIFT_STEPS..=DRIFT_STEPS {
        let step = counter + drift;
        if step < 0 {
            continue;
        }
        let expected = format_code(hotp(secret, step as u64));
        if crate::crypto::primitives::constant_time_eq(expected.as_bytes(), code.as_bytes()) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    /// RFC 4226 appendix D test vectors for the 20-byte ASCII secret
    /// "12345678901234567890".
    #[test]
    fn test_hotp_rfc4226_vectors() {
        let secret = b"12345678901234567890";
        let expected = [755224, 287082, 359152, 969429, 338314, 254676, 287922, 162583, 399871, 520489];
        for (counter, &exp) in expected.iter().enumerate() {
            assert_eq!(hotp(secret, counter as u64), exp, "counter {counter}");
        }
    }

    #[test]
    fn test_format_code_zero_pads() {
        assert_eq!(format_code(42), "000042");
        assert_eq!(format_code(755224), "755224");
    }

    #[test]
    fn test_totp_matches_verify_at_same_time() {
        let secret = b"12345678901234567890";
        let now = 1_700_000_000u64;
        let code = totp_at(secret, now);
        assert!(verify_totp(secret, &code, now));
    }

    #[test]
    fn test_totp_tolerates_one_step_drift() {
        let secret = b"12345678901234567890";
        let now = 1_700_000_000u64;
        let code = totp_at(secret, now);
        assert!(verify_totp(secret, &code, now + STEP_SECONDS));
        assert!(verify_totp(secret, &code, now - STEP_SECONDS));
    }

    #[test]
    fn test_totp_rejects_beyond_drift_window() {
        let secret = b"12345678901234567890";
        let now = 1_700_000_000u64;
        let code = totp_at(secret, now);
        assert!(!verify_totp(secret, &code, now + 2 * STEP_SECONDS));
    }

    #[test]
    fn test_totp_rejects_malformed_code() {
        let secret = b"12345678901234567890";
        assert!(!verify_totp(secret, "12a456", 1_700_000_000));
        assert!(!verify_totp(secret, "12345", 1_700_000_000));
    }
}
