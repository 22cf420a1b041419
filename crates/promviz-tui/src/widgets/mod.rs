pub mod fmt;
pub mod status;
