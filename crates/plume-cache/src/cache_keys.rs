//! Cache key generators for consistent key naming.

/// Prefix for all cache keys to namespace them.
const CACHE_PREFIX: &str = "plume:cache";

/// Usage counters for a user.
#[must_use]
pub fn usage(user_id: &str) -> String {
    format!("{}:usage:{}", CACHE_PREFIX, user_id)
}

/// Connected social accounts for a user.
#[must_use]
pub fn social_accounts(user_id: &str) -> String {
    format!("{}:user:{}:social-accounts", CACHE_PREFIX, user_id)
}

/// Profile of a connected account. Platform names are case-insensitive.
#[must_use]
pub fn account_profile(platform: &str, account_id: &str) -> String {
    format!(
        "{}:account:{}:{}:profile",
        CACHE_PREFIX,
        platform.to_lowercase(),
        account_id
    )
}

/// Analytics for an account over a named range (e.g. `7d`, `30d`).
#[must_use]
pub fn analytics(account_id: &str, range: &str) -> String {
    format!("{}:analytics:{}:{}", CACHE_PREFIX, account_id, range)
}

/// AI generation result keyed by a hash of its inputs.
#[must_use]
pub fn ai_generation(input_hash: &str) -> String {
    format!("{}:ai:{}", CACHE_PREFIX, input_hash)
}

/// Pattern matching every usage entry.
#[must_use]
pub fn usage_pattern() -> String {
    format!("{}:usage:*", CACHE_PREFIX)
}

/// Pattern matching every per-user entry for one user.
#[must_use]
pub fn user_pattern(user_id: &str) -> String {
    format!("{}:user:{}:*", CACHE_PREFIX, user_id)
}

/// Pattern matching every analytics range for one account.
#[must_use]
pub fn analytics_pattern(account_id: &str) -> String {
    format!("{}:analytics:{}:*", CACHE_PREFIX, account_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_pattern;

    #[test]
    fn test_usage_key() {
        assert_eq!(usage("u-1"), "plume:cache:usage:u-1");
    }

    #[test]
    fn test_account_profile_key_lowercases_platform() {
        assert_eq!(
            account_profile("Instagram", "1789"),
            "plume:cache:account:instagram:1789:profile"
        );
    }

    #[test]
    fn test_builders_are_not_patterns() {
        for key in [
            usage("u-1"),
            social_accounts("u-1"),
            account_profile("x", "a-1"),
            analytics("a-1", "30d"),
            ai_generation("ab12"),
        ] {
            assert!(!is_pattern(&key), "{} should be a plain key", key);
        }
    }

    #[test]
    fn test_patterns_cover_their_keys() {
        assert!(is_pattern(&usage_pattern()));
        assert!(usage("u-1").starts_with(usage_pattern().trim_end_matches('*')));
        assert!(social_accounts("u-1").starts_with(user_pattern("u-1").trim_end_matches('*')));
        assert!(analytics("a-1", "7d").starts_with(analytics_pattern("a-1").trim_end_matches('*')));
        assert!(!analytics("a-10", "7d").starts_with(analytics_pattern("a-1").trim_end_matches('*')));
    }
}
