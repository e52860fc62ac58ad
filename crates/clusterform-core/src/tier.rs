//! Shared (tenant) tier identifiers

/// Entry-level instance sizes provisioned on shared infrastructure
pub const SHARED_TIERS: [&str; 3] = ["M0", "M2", "M5"];

/// Whether an instance size belongs to the shared tier family
pub fn is_shared_tier(instance_size: &str) -> bool {
    SHARED_TIERS.contains(&instance_size)
}
