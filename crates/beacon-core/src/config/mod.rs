//! Configuration: feature flags, the live flag cell and the config file.

mod cell;
mod features;
mod file;

pub use self::cell::FeatureConfigCell;
pub use self::features::FeatureConfig;
pub use self::file::{BeaconConfig, spawn_feature_reloader};
