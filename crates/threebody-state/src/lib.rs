pub mod error;
pub mod json_file;
pub mod sqlite;

pub use error::StateError;
pub use json_file::JsonFileStore;
pub use sqlite::SqliteStore;

use threebody_models::DashboardRecord;

/// Single-slot store for the last cycle's dashboard record.
///
/// `save` replaces the whole record; readers never see a partial write.
pub trait StateStore: Send + Sync {
    fn save(&self, record: &DashboardRecord) -> Result<(), StateError>;

    /// The last saved record, or `None` before the first cycle.
    fn load(&self) -> Result<Option<DashboardRecord>, StateError>;
}
