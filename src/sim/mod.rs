pub mod clock;
pub mod controller;
pub mod intent;
pub mod nav;
pub mod theatre;
