pub mod creators;
pub mod grading;
pub mod picks;
pub mod system;

pub use creators::*;
pub use grading::*;
pub use picks::*;
pub use system::*;
