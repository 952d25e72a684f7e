pub mod course;
pub mod enrollment;
pub mod refresh_token;
pub mod user;

pub use course::{CourseStore, SqlxCourseStore};
pub use enrollment::{EnrollmentStore, SqlxEnrollmentStore};
