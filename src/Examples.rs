/// numbered demonstration tasks run by main.rs
pub mod chem_examples;
