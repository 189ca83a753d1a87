pub mod notify;
pub mod status;
pub mod tasks;
