pub mod compositor;
pub mod error;
pub mod feather;
pub mod grading;

pub use compositor::composite;
pub use error::CompositeError;
pub use grading::GradeParams;
