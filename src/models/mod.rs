pub mod event;
pub mod user_profile;
