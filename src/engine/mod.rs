pub mod optimizer;
pub mod registry;
pub mod tracker;
pub mod zones;
