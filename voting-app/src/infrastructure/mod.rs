pub mod cache;

#[cfg(feature = "supabase")]
pub mod supabase;
