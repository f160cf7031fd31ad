pub mod alert;
pub mod job;
pub mod sensor;
