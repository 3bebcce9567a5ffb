/**
 * Adaptive question selection: decides which questions of a bank a learner should see
 * next, based on what they have already seen, where they are weak and how well they
 * have been doing lately.
 */
#[macro_use]
pub mod iohelper;
pub mod common;
pub mod config;
pub mod difficulty;
pub mod history;
pub mod persistence;
pub mod quiz;
pub mod random;
pub mod repetition;
pub mod select;
pub mod session;
pub mod shell;
pub mod verify;
pub mod weights;

pub use common::{DrillError, Result};
pub use persistence::{JsonFileStore, MemoryStore, SqliteStore, Store};
pub use quiz::{Bank, Difficulty, QuestionItem};
pub use random::Randomness;
pub use select::{select, Selection, SelectionRequest, SessionMode};
