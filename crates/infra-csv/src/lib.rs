// Jobwatch Infrastructure - CSV Adapter
// Implements: RecordStore (store file and per-cycle delta file)

pub mod codec;
mod record_store;

pub use codec::COLUMNS;
pub use record_store::CsvRecordStore;
