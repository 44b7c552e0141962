pub mod in_memory_account_store;
pub mod in_memory_enrollment_store;
pub mod in_memory_recovery_code_store;
pub mod in_memory_session_store;
pub mod in_memory_throttle_store;
pub mod password_hash;
pub mod postgres_account_store;
pub mod redis_enrollment_store;
pub mod redis_recovery_code_store;
pub mod redis_session_store;
pub mod redis_throttle_store;

pub use in_memory_account_store::InMemoryAccountStore;
pub use in_memory_enrollment_store::InMemoryEnrollmentStore;
pub use in_memory_recovery_code_store::InMemoryRecoveryCodeStore;
pub use in_memory_session_store::InMemorySessionStore;
pub use in_memory_throttle_store::InMemoryThrottleStore;
pub use postgres_account_store::PostgresAccountStore;
pub use redis_enrollment_store::RedisEnrollmentStore;
pub use redis_recovery_code_store::RedisRecoveryCodeStore;
pub use redis_session_store::RedisSessionStore;
pub use redis_throttle_store::RedisThrottleStore;
