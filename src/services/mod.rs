// Service exports
pub mod directory;
pub mod matching;
pub mod memory;
pub mod notifications;
pub mod postgres;

pub use directory::{
    AssignmentError, AssignmentRequest, AssignmentSink, ContractorDirectory, DirectoryError,
};
pub use matching::{AssignmentOutcome, MatchingError, MatchingOptions, MatchingService};
pub use memory::{DirectorySeed, InMemoryDirectory};
pub use notifications::{HttpNotifier, LogNotifier, NotificationError, NotificationSink};
pub use postgres::PostgresDirectory;
