pub mod memory;

#[cfg(feature = "manager-cacache")]
pub mod cacache;

#[cfg(feature = "manager-redis")]
pub mod redis;
