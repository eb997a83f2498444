pub mod profile;
pub mod utils;
