mod auth;
mod client;
mod types;

pub use auth::SupabaseAuth;
pub use client::SupabaseClient;
