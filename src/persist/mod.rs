/// JSON pool table on disk
pub mod pool_table;
