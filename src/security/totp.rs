//! RFC 6238 time-based one-time passwords (HMAC-SHA1, 30 s step, 6 digits)
//!
//! Angel One requires a fresh TOTP on every password login. The shared
//! secret is the base32 string shown when TOTP is enabled on the account.

use crate::error::{AppError, Result};
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

const TIME_STEP_SECS: u64 = 30;
const DIGITS: u32 = 6;
const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// TOTP generator for a single shared secret
#[derive(Clone)]
pub struct Totp {
    mac: HmacSha1,
}

impl Totp {
    /// Create from a base32 secret. Case, spaces and `=` padding are ignored.
    pub fn from_base32(secret: &str) -> Result<Self> {
        let key = decode_base32(secret)?;
        if key.is_empty() {
            return Err(AppError::Validation("TOTP secret is empty".to_string()));
        }
        let mac = HmacSha1::new_from_slice(&key)
            .map_err(|e| AppError::Validation(format!("Invalid TOTP secret: {}", e)))?;
        Ok(Self { mac })
    }

    /// Code for the step containing `unix_secs`
    pub fn generate_at(&self, unix_secs: u64) -> String {
        let counter = unix_secs / TIME_STEP_SECS;

        let mut mac = self.mac.clone();
        mac.update(&counter.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        // Dynamic truncation
        let offset = (digest[digest.len() - 1] & 0x0f) as usize;
        let binary = ((digest[offset] as u32 & 0x7f) << 24)
            | ((digest[offset + 1] as u32) << 16)
            | ((digest[offset + 2] as u32) << 8)
            | (digest[offset + 3] as u32);

        let code = binary % 10u32.pow(DIGITS);
        format!("{:0width$}", code, width = DIGITS as usize)
    }

    /// Code for the current time
    pub fn now(&self) -> String {
        let secs = chrono::Utc::now().timestamp().max(0) as u64;
        self.generate_at(secs)
    }
}

impl std::fmt::Debug for Totp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Totp { .. }")
    }
}

fn decode_base32(input: &str) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u64 = 0;
    let mut bits = 0u32;

    for c in input.chars() {
        if c.is_whitespace() || c == '=' || c == '-' {
            continue;
        }
        let value = u8::try_from(c.to_ascii_uppercase())
            .ok()
            .and_then(|upper| BASE32_ALPHABET.iter().position(|&b| b == upper))
            .ok_or_else(|| {
                AppError::Validation(format!("Invalid base32 character '{}' in TOTP secret", c))
            })?;

        buffer = (buffer << 5) | value as u64;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            output.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    // "12345678901234567890" from RFC 6238 appendix B
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn test_rfc6238_vectors() {
        let totp = Totp::from_base32(RFC_SECRET).unwrap();
        assert_eq!(totp.generate_at(59), "287082");
        assert_eq!(totp.generate_at(1111111109), "081804");
        assert_eq!(totp.generate_at(1111111111), "050471");
        assert_eq!(totp.generate_at(1234567890), "005924");
        assert_eq!(totp.generate_at(2000000000), "279037");
    }

    #[test]
    fn test_same_step_same_code() {
        let totp = Totp::from_base32(RFC_SECRET).unwrap();
        assert_eq!(totp.generate_at(60), totp.generate_at(89));
        assert_ne!(totp.generate_at(89), totp.generate_at(90));
    }

    #[test]
    fn test_secret_formatting_ignored() {
        let plain = Totp::from_base32(RFC_SECRET).unwrap();
        let messy = Totp::from_base32("gezd gnbv gy3t qojq gezd gnbv gy3t qojq").unwrap();
        assert_eq!(plain.generate_at(59), messy.generate_at(59));
    }

    #[test]
    fn test_now_has_six_digits() {
        let totp = Totp::from_base32(RFC_SECRET).unwrap();
        let code = totp.now();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_invalid_secret() {
        assert!(matches!(Totp::from_base32("NOT*BASE32"), Err(AppError::Validation(_))));
        assert!(matches!(Totp::from_base32("   "), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_decode_base32() {
        assert_eq!(decode_base32("MZXW6YTBOI======").unwrap(), b"foobar");
        assert_eq!(decode_base32("MY").unwrap(), b"f");
    }
}
