pub mod duplicates;
pub mod large;
