pub mod generate;
pub mod merge;
pub mod mutate;
pub mod optimise;
