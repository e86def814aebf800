pub mod database_retry;
