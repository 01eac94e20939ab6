// Concurrency and streaming tests for the filesystem backend

mod common;

use common::{chunked_stream, seeded_bytes};
use restash_storage::{
    DirEntry, FilesystemBackend, ObjectStore, ReadRange, StorageError, collect_stream,
};
use std::sync::Arc;
use tempfile::TempDir;
use time::OffsetDateTime;

async fn backend() -> (TempDir, Arc<FilesystemBackend>) {
    let temp_dir = TempDir::new().unwrap();
    let backend = FilesystemBackend::new(temp_dir.path()).await.unwrap();
    (temp_dir, Arc::new(backend))
}

#[tokio::test]
async fn test_concurrent_creates_of_one_key_have_single_winner() {
    let (_temp_dir, backend) = backend().await;

    let mut handles = Vec::new();
    for seed in 0..16u64 {
        let backend = backend.clone();
        handles.push(tokio::spawn(async move {
            let data = seeded_bytes(seed, 256 * 1024);
            let result = backend
                .create_from_stream(
                    "repo/data/ab/abcdef",
                    chunked_stream(data.clone(), 8 * 1024),
                    OffsetDateTime::now_utc(),
                )
                .await;
            (data, result)
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        let (data, result) = handle.await.unwrap();
        match result {
            Ok(meta) => {
                assert_eq!(meta.size, data.len() as u64);
                winners.push(data);
            }
            Err(StorageError::AlreadyExists(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(winners.len(), 1, "exactly one create must succeed");

    let stored = collect_stream(
        backend
            .get_stream("repo/data/ab/abcdef", None)
            .await
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(stored, winners[0], "stored bytes must be the winner's");

    // No temp files leak into the listing
    let entries = backend.list_dir("repo/data/ab").await.unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_listing_during_concurrent_creates() {
    let (_temp_dir, backend) = backend().await;
    backend.mkdir("repo/snapshots").await.unwrap();

    let writer = {
        let backend = backend.clone();
        tokio::spawn(async move {
            for i in 0..100u64 {
                backend
                    .create_from_stream(
                        &format!("repo/snapshots/{i:04}"),
                        chunked_stream(seeded_bytes(i, 4096), 1024),
                        OffsetDateTime::now_utc(),
                    )
                    .await
                    .unwrap();
            }
        })
    };

    // Every listing must contain only complete objects
    for _ in 0..20 {
        for entry in backend.list_dir("repo/snapshots").await.unwrap() {
            match entry {
                DirEntry::Object { key, size } => {
                    assert!(key.starts_with("repo/snapshots/"));
                    assert_eq!(size, 4096, "{key} listed before it was complete");
                }
                DirEntry::Dir { key } => panic!("unexpected directory {key}"),
            }
        }
        tokio::task::yield_now().await;
    }

    writer.await.unwrap();
    assert_eq!(backend.list_dir("repo/snapshots").await.unwrap().len(), 100);
}

#[tokio::test]
async fn test_large_object_ranged_reads() {
    let (_temp_dir, backend) = backend().await;
    let data = seeded_bytes(7, 1024 * 1024 + 17);

    backend
        .create_from_stream(
            "repo/data/00/00ff",
            chunked_stream(data.clone(), 100_000),
            OffsetDateTime::now_utc(),
        )
        .await
        .unwrap();

    for (offset, end) in [(0, 10), (65_530, 65_550), (1_000_000, data.len() as u64)] {
        let stream = backend
            .get_stream("repo/data/00/00ff", Some(ReadRange { offset, end }))
            .await
            .unwrap();
        let chunk = collect_stream(stream).await.unwrap();
        assert_eq!(chunk, data.slice(offset as usize..end as usize));
    }

    let full = collect_stream(backend.get_stream("repo/data/00/00ff", None).await.unwrap())
        .await
        .unwrap();
    assert_eq!(full, data);
}
