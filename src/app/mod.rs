pub mod assemblers;
pub mod export;
