pub mod attendance;
pub mod person;
pub mod scan;
