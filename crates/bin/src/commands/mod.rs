pub mod account;
pub mod capabilities;
pub mod info;
