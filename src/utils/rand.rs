//! Random string generation.

use rand::distributions::{Alphanumeric, DistString};

/// Length of password reset tokens.
pub const RESET_TOKEN_LEN: usize = 64;

/// Generates a random alphanumeric string of the specified length.
#[must_use]
pub fn gen_rand_str(len: usize) -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), len)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_gen_rand_str_length() {
        assert!(gen_rand_str(0).is_empty());
        assert_eq!(gen_rand_str(RESET_TOKEN_LEN).len(), RESET_TOKEN_LEN);
    }

    #[test]
    fn test_gen_rand_str_alphanumeric() {
        let s = gen_rand_str(500);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_reset_tokens_are_unique() {
        let generated: HashSet<String> = (0..200).map(|_| gen_rand_str(RESET_TOKEN_LEN)).collect();
        assert_eq!(generated.len(), 200);
    }
}
