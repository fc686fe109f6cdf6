use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in seconds; 0 if the clock is before the epoch.
pub fn now() -> i64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs() as i64)
    .unwrap_or_default()
}

/// Constant-time comparison of operator tokens.
pub fn tokens_match(expected: &str, given: &str) -> bool {
  if expected.len() != given.len() {
    return false;
  }
  expected
    .bytes()
    .zip(given.bytes())
    .fold(0u8, |acc, (a, b)| acc | (a ^ b))
    == 0
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_now_is_after_2024() {
    assert!(now() > 1_704_067_200);
  }

  #[test]
  fn test_tokens_match() {
    assert!(tokens_match("secret", "secret"));
    assert!(!tokens_match("secret", "secreT"));
    assert!(!tokens_match("secret", "secret-longer"));
    assert!(!tokens_match("secret", ""));
  }
}
