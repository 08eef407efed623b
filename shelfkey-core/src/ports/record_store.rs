//! Record store port - one implementation per secret-bearing collection

use crate::domain::result::Result;
use crate::domain::SecretBearing;

/// Storage service owning one collection of secret-bearing records
pub trait RecordStore {
    type Record: SecretBearing;

    /// All records carrying catalog credentials, in storage order
    fn list_all(&self) -> Result<Vec<Self::Record>>;

    /// Save the record's secret fields
    fn persist(&self, record: &Self::Record) -> Result<()>;
}
