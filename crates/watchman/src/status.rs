/// Point-in-time view of the watchman, published on a watch channel after
/// every cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchmanStatus {
    /// Height of the last scan; zero until the first successful poll.
    pub last_seen_height: u32,
    /// Completed scan cycles.
    pub cycles: u64,
    /// Entries that were due in the last cycle.
    pub last_due: u64,
    /// Successful redemption submissions since startup.
    pub redeemed: u64,
    /// Failed redemption attempts since startup.
    pub failed: u64,
}
