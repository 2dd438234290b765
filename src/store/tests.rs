use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

#[test]
fn missing_vector_type_is_recognized_from_type_resolution() {
    let err = sqlx::Error::TypeNotFound {
        type_name: "vector".to_string(),
    };
    assert!(is_missing_vector_type(&err));
}

#[test]
fn other_missing_types_are_not_healed() {
    let err = sqlx::Error::TypeNotFound {
        type_name: "geometry".to_string(),
    };
    assert!(!is_missing_vector_type(&err));
}

#[test]
fn unrelated_errors_are_not_healed() {
    assert!(!is_missing_vector_type(&sqlx::Error::RowNotFound));
    assert!(!is_missing_vector_type(&sqlx::Error::PoolTimedOut));
}

#[test]
fn table_ddl_pins_dimension_and_dedup_key() {
    let ddl = create_table_sql(384);
    assert!(ddl.contains("vector(384)"));
    assert!(ddl.contains("context TEXT NOT NULL UNIQUE"));
    assert!(ddl.contains("IF NOT EXISTS"));
}

#[test]
fn context_chunk_carries_provenance() {
    let chunk = crate::chunker::TextChunk {
        chunk_id: 2,
        start_word: 500,
        end_word: 523,
        text: "some chunk text".to_string(),
    };
    let stored = ContextChunk::from_chunk(&chunk, vec![0.1, 0.2, 0.3]);

    assert_eq!(stored.chunk_id, 2);
    assert_eq!(stored.start_word, 500);
    assert_eq!(stored.end_word, 523);
    assert_eq!(stored.text, "some chunk text");
    assert_eq!(stored.embedding.len(), 3);
}

#[test]
fn database_error_reports_operation_and_cause() {
    let err = DatabaseError::new("querying nearest contexts", sqlx::Error::PoolTimedOut);
    let message = err.to_string();
    assert!(message.contains("querying nearest contexts"));
}

fn missing_vector_fault() -> sqlx::Error {
    sqlx::Error::TypeNotFound {
        type_name: "vector".to_string(),
    }
}

#[tokio::test]
async fn vector_type_fault_is_healed_and_retried_once() {
    let attempts = AtomicUsize::new(0);
    let heals = AtomicUsize::new(0);

    let result = heal_and_retry(
        "running a scripted statement",
        || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(missing_vector_fault())
                } else {
                    Ok(7)
                }
            }
        },
        || async {
            heals.fetch_add(1, Ordering::SeqCst);
            Ok::<(), DatabaseError>(())
        },
    )
    .await;

    // The retried statement's result comes back clean, with no visible
    // error from the first attempt.
    assert_eq!(result.expect("retry should succeed"), 7);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(heals.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn second_vector_type_fault_surfaces_as_database_error() {
    let attempts = AtomicUsize::new(0);

    let result: Result<(), DatabaseError> = heal_and_retry(
        "running a scripted statement",
        || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), sqlx::Error>(missing_vector_fault()) }
        },
        || async { Ok::<(), DatabaseError>(()) },
    )
    .await;

    let err = result.expect_err("a fault on the retry must surface");
    assert!(err.to_string().contains("running a scripted statement"));
    // Exactly one retry: two attempts total, never a third.
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unrelated_fault_is_not_healed_or_retried() {
    let attempts = AtomicUsize::new(0);
    let heals = AtomicUsize::new(0);

    let result: Result<(), DatabaseError> = heal_and_retry(
        "running a scripted statement",
        || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), sqlx::Error>(sqlx::Error::PoolTimedOut) }
        },
        || async {
            heals.fetch_add(1, Ordering::SeqCst);
            Ok::<(), DatabaseError>(())
        },
    )
    .await;

    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(heals.load(Ordering::SeqCst), 0);
}
