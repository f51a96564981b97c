pub mod graph;
pub mod profile;
pub mod project;
