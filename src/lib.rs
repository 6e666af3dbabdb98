pub mod config;
pub mod error;
pub mod generator;
pub mod logging;
pub mod materializer;

pub use error::{ConfigError, GeneratorError, MaterializeError};
pub use generator::{Alphabet, CharacterClass, CharacterClasses, UniqueStringGenerator};
pub use materializer::{FileMaterializer, FileSpec, Progress, RunConfig, RunResult};
