use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use rand::Rng;
use crate::models::User;

/// Placeholder avatar seeded by the user's name, so a name keeps its picture.
pub fn placeholder_avatar(seed: &str) -> String {
    format!("https://picsum.photos/seed/{}/200/200", utf8_percent_encode(seed, NON_ALPHANUMERIC))
}

/// Local stand-in used whenever the generative provider is unavailable.
pub fn fallback_users<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<User> {
    (0..count)
        .map(|i| User {
            id: format!("fallback_{}", i),
            name: format!("User_{}", rng.gen_range(0..1000)),
            avatar: format!("https://picsum.photos/200/200?random={}", i),
            level: rng.gen_range(1..=50),
            location: Some("Unknown".to_string()),
        })
        .collect()
}
