//! Security helpers for broker authentication
//!
//! Credentials never leave the process except in the broker login request;
//! anything shown on the dashboard goes through `mask_secret` first.

mod totp;

pub use totp::Totp;

/// Keep the first `visible` characters and mask the rest
pub fn mask_secret(secret: &str, visible: usize) -> String {
    if secret.is_empty() {
        return "Not set".to_string();
    }
    let shown: String = secret.chars().take(visible).collect();
    format!("{}...", shown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("tKo2xsA5abc", 4), "tKo2...");
        assert_eq!(mask_secret("ab", 4), "ab...");
        assert_eq!(mask_secret("", 4), "Not set");
    }
}
