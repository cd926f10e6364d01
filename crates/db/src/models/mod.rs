pub mod design;
pub mod generation;
