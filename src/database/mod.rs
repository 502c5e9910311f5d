pub mod clock;
pub mod manager;
pub mod models;
pub mod postgres;
pub mod schema;
pub mod sqlite;
pub mod store;

pub use manager::{connect, DatabaseError};
pub use store::{
    from_record, from_records, record_i64, returned_id, with_transaction, Backend, ExecResult, Record,
    RelationalStore, SqlValue, StoreTransaction,
};
