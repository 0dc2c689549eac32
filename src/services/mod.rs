pub mod booking;
pub mod conflict;
pub mod mail;
pub mod notifications;
pub mod otp;
pub mod sessions;
pub mod slot_policy;
