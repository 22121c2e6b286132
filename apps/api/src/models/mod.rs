pub mod opportunity;
pub mod profile;
pub mod record;
pub mod search;
