pub mod connection;
pub mod snapshots;

pub use connection::Database;
pub use snapshots::SnapshotRepository;
