pub mod candidates;
pub mod directory;
pub mod migrations;
pub mod pool;
pub mod primary;
pub mod skills;
pub mod store;
pub mod util;

use std::error::Error;

use deadpool_postgres::PoolError;
use tokio_postgres::Error as PgError;

use crate::store::StoreError;

pub use candidates::{
    CandidateStorageError, fetch_candidates_by_id, fetch_candidates_by_link_key, list_candidates,
    update_candidate_link_key,
};
pub use directory::{DirectoryFetchError, find_identity_by_email};
pub use migrations::{MigrationError, SCHEMA_VERSION, applied_schema_version, run_migrations};
pub use pool::{DbPoolError, PgPool, create_pool_from_url, create_pool_from_url_checked};
pub use primary::{PrimaryFetchError, fetch_primary_record};
pub use skills::{SkillFetchError, fetch_skills_for_candidate};
pub use store::{DEFAULT_QUERY_TIMEOUT_MS, PgProfileStore};

/// Pool errors mean no usable connection could be obtained.
pub(crate) fn pool_fault(err: &PoolError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

/// Only a closed connection or a socket-level failure counts as the store
/// being unreachable; server-side and client-side encoding errors are query
/// failures.
pub(crate) fn classify_pg_error(err: &PgError) -> StoreError {
    if is_transport_fault(err.is_closed(), err.source()) {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Query(err.to_string())
    }
}

fn is_transport_fault(closed: bool, source: Option<&(dyn Error + 'static)>) -> bool {
    closed || source.is_some_and(|cause| cause.is::<std::io::Error>())
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    #[derive(Debug)]
    struct EncodeFailure;

    impl fmt::Display for EncodeFailure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("cannot encode parameter")
        }
    }

    impl Error for EncodeFailure {}

    #[test]
    fn closed_connections_and_io_errors_are_transport_faults() {
        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(is_transport_fault(true, None));
        assert!(is_transport_fault(false, Some(&reset)));
    }

    #[test]
    fn encoding_errors_are_not_transport_faults() {
        assert!(!is_transport_fault(false, Some(&EncodeFailure)));
        assert!(!is_transport_fault(false, None));
    }
}
