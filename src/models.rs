pub mod account;
pub mod link;
pub mod profile;
pub mod types;
