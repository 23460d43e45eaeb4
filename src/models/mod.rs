pub mod partner;
pub mod route;
pub mod tracking;
pub mod zone;
