use lazy_static::lazy_static;

/// Configuration surface recognized by the core (spec.md §6 "Environment").
/// Read once from environment variables at process start, following the
/// teacher's `lazy_static! Config` pattern in `config.rs`.
pub struct Config {
    pub round_window_seconds: u64,
    pub deadline_poll_interval_seconds: u64,
    pub salvage_ttl_seconds: u64,
    pub corporation_creation_cost: i64,
    pub fighter_price: i64,
    pub warp_power_price: i64,
    pub banking_sector_id: i64,
    pub admin_password: Option<String>,
    pub max_participants_per_sector_combat: usize,
    /// Garrison burst size for offensive-mode auto-actions (spec.md §4.7
    /// step 1): `commit = min(own fighters, configured burst)`. Not named
    /// in spec.md's environment table but required to implement the
    /// offensive AI deterministically; kept configurable rather than
    /// hard-coded so test scenarios can tune it.
    pub garrison_offensive_burst: i64,
    /// Fraction of missing shields regained per round (spec.md §4.7 step 2,
    /// "a fixed fraction (external constant)"). Expressed as a percent.
    pub shield_recharge_percent: i64,
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

lazy_static! {
    pub static ref CONFIG: Config = {
        let admin_password = match std::env::var("ADMIN_PASSWORD") {
            Ok(val) if val.is_empty() => None,
            Ok(val) => Some(val),
            Err(_) => None,
        };
        Config {
            round_window_seconds: env_u64("ROUND_WINDOW_SECONDS", 15),
            deadline_poll_interval_seconds: env_u64("DEADLINE_POLL_INTERVAL_SECONDS", 1),
            salvage_ttl_seconds: env_u64("SALVAGE_TTL_SECONDS", 3600),
            corporation_creation_cost: env_i64("CORPORATION_CREATION_COST", 10_000),
            fighter_price: env_i64("FIGHTER_PRICE", 5),
            warp_power_price: env_i64("WARP_POWER_PRICE", 2),
            banking_sector_id: env_i64("BANKING_SECTOR_ID", 0),
            admin_password,
            max_participants_per_sector_combat: env_u64("MAX_PARTICIPANTS_PER_SECTOR_COMBAT", 64) as usize,
            garrison_offensive_burst: env_i64("GARRISON_OFFENSIVE_BURST", 25),
            shield_recharge_percent: env_i64("SHIELD_RECHARGE_PERCENT", 20),
        }
    };
}
