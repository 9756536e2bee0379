pub mod database;
pub mod entities;
pub mod memory;
pub mod profile_api;
pub mod repositories;
pub mod telegram;
pub mod traits;
