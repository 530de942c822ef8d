//! Scheduled announcements.

pub mod scheduler;

pub use scheduler::GreetingJob;
