//! Physical index generations
//!
//! A logical index `orders` is served by physical indices `orders_0`,
//! `orders_1`, ... and only ever addressed through its alias.

use crate::client::AdminClient;
use crate::Result;

/// Name of generation `n` of a logical index
pub fn physical_name(name: &str, generation: u64) -> String {
    format!("{}_{}", name, generation)
}

/// Generation number of `physical` if it is `{name}_{n}`
pub fn parse_generation(name: &str, physical: &str) -> Option<u64> {
    let suffix = physical.strip_prefix(name)?.strip_prefix('_')?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// First unused physical name, probing upward.
///
/// Probing starts after `current` when it is a generation of `name`,
/// otherwise at 0.
pub async fn next_generation(
    client: &dyn AdminClient,
    name: &str,
    current: Option<&str>,
) -> Result<String> {
    let mut generation = current
        .and_then(|c| parse_generation(name, c))
        .map_or(0, |n| n + 1);

    loop {
        let candidate = physical_name(name, generation);
        if !client.exists(&candidate).await? {
            return Ok(candidate);
        }
        tracing::debug!("Generation {} taken, probing further", candidate);
        generation += 1;
    }
}
