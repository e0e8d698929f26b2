pub mod area;
pub mod detector;
pub mod gesture;
pub mod input;
pub mod scroll;
