pub mod note;
pub mod project;

pub use note::Note;
pub use project::{CategoryClass, Project, ProjectKey};
