pub mod admission;
pub mod lifecycle;
pub mod overlap;
pub mod slots;
pub mod working_hours;
