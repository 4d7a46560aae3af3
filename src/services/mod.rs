pub mod denylist;
pub mod submission;
