mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::*;
use rozip::{CompressionMethod as Method, ZipArchive, ZipError};

fn docs_zip() -> Vec<u8> {
    build_zip(
        &[
            ("docs/a.txt", b"alpha", STORED),
            ("docs/b.txt", b"bravo", DEFLATED),
            ("readme.md", b"# readme\n", DEFLATED),
        ],
        None,
    )
}

#[tokio::test]
async fn lists_in_directory_order_and_by_prefix() {
    let (_tmp, archive) = open_bytes(&docs_zip()).await;

    assert_eq!(
        archive.file_names().await.unwrap(),
        ["docs/a.txt", "docs/b.txt", "readme.md"]
    );
    assert_eq!(
        archive.subpaths("docs/").await.unwrap(),
        ["docs/a.txt", "docs/b.txt"]
    );
    assert!(archive.subpaths("nothing/").await.unwrap().is_empty());
    assert_eq!(
        archive.first_file_name().await.unwrap().as_deref(),
        Some("docs/a.txt")
    );
    assert_eq!(archive.len().await.unwrap(), 3);
}

#[tokio::test]
async fn hash_table_keeps_the_name_set() {
    let (_tmp, archive) = open_bytes(&docs_zip()).await;
    let ordered = archive.file_names().await.unwrap();

    assert!(!archive.has_hash_table().await);
    archive.build_hash_table().await.unwrap();
    assert!(archive.has_hash_table().await);

    let hashed = archive.file_names().await.unwrap();
    assert_eq!(hashed.len(), ordered.len());
    assert_eq!(
        hashed.into_iter().collect::<HashSet<_>>(),
        ordered.into_iter().collect::<HashSet<_>>()
    );
    assert_eq!(
        archive.subpaths("docs/").await.unwrap(),
        ["docs/a.txt", "docs/b.txt"]
    );
}

#[tokio::test]
async fn building_twice_changes_nothing() {
    let (_tmp, archive) = open_bytes(&docs_zip()).await;
    let lookups = ["docs/a.txt", "DOCS/A.TXT", "readme.md", "README.MD", "missing"];

    archive.build_hash_table().await.unwrap();
    let mut once = Vec::new();
    for name in lookups {
        once.push((
            archive.file_exists(name, true).await.unwrap(),
            archive.file_exists(name, false).await.unwrap(),
        ));
    }

    archive.build_hash_table().await.unwrap();
    for (name, expected) in lookups.iter().zip(once) {
        let got = (
            archive.file_exists(name, true).await.unwrap(),
            archive.file_exists(name, false).await.unwrap(),
        );
        assert_eq!(got, expected, "{}", name);
    }
}

#[tokio::test]
async fn case_sensitivity_with_and_without_index() {
    let bytes = build_zip(
        &[("A.txt", b"upper", STORED), ("1234/5678.bin", b"digits", STORED)],
        None,
    );
    let (_tmp, archive) = open_bytes(&bytes).await;

    for indexed in [false, true] {
        if indexed {
            archive.build_hash_table().await.unwrap();
        }
        assert!(archive.file_exists("A.txt", true).await.unwrap());
        assert!(!archive.file_exists("a.txt", true).await.unwrap());
        assert!(archive.file_exists("a.txt", false).await.unwrap());
        assert!(archive.file_exists("1234/5678.bin", true).await.unwrap());
        assert!(archive.file_exists("1234/5678.bin", false).await.unwrap());

        assert_eq!(archive.read("a.txt", true, 0).await.unwrap(), None);
        assert_eq!(
            archive.read("a.txt", false, 0).await.unwrap().as_deref(),
            Some(&b"upper"[..])
        );
    }
}

#[tokio::test]
async fn full_reads_match_recorded_crc_and_size() {
    let big = lorem(200_000);
    let bytes = build_zip(
        &[
            ("empty.txt", b"", STORED),
            ("dir/", b"", STORED),
            ("dir/stored.txt", &big[..3000], STORED),
            ("dir/deflated.txt", &big, DEFLATED),
            ("tiny", b"x", DEFLATED),
        ],
        None,
    );
    let (_tmp, archive) = open_bytes(&bytes).await;

    let entries = archive.entries().await.unwrap();
    assert_eq!(entries.len(), 5);
    assert!(entries[1].is_directory);
    assert_eq!(entries[3].compression_method, Method::Deflate);
    assert!(entries[3].compressed_size < entries[3].uncompressed_size);

    for entry in &entries {
        let data = archive
            .read(&entry.file_name, true, 0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(data.len() as u64, entry.uncompressed_size, "{}", entry.file_name);
        assert_eq!(crc32(&data), entry.crc32, "{}", entry.file_name);
    }

    let data = archive.read("dir/deflated.txt", true, 0).await.unwrap().unwrap();
    assert_eq!(data, big);
}

#[tokio::test]
async fn capped_reads_are_prefixes() {
    let content = lorem(70_000);
    let bytes = build_zip(
        &[("s.txt", &content, STORED), ("d.txt", &content, DEFLATED)],
        None,
    );
    let (_tmp, archive) = open_bytes(&bytes).await;

    for name in ["s.txt", "d.txt"] {
        for cap in [1u64, 17, 4096, 65_537, 69_999] {
            let head = archive.read(name, true, cap).await.unwrap().unwrap();
            assert_eq!(head, &content[..cap as usize], "{} capped at {}", name, cap);
        }
        // Caps at or past the end read the whole entry.
        for cap in [70_000u64, 1 << 40] {
            let all = archive.read(name, true, cap).await.unwrap().unwrap();
            assert_eq!(all, content);
        }
    }
}

#[tokio::test]
async fn entry_metadata_lookup() {
    let (_tmp, archive) = open_bytes(&docs_zip()).await;

    let entry = archive.entry("DOCS/B.TXT", false).await.unwrap().unwrap();
    assert_eq!(entry.file_name, "docs/b.txt");
    assert_eq!(entry.raw_name, b"docs/b.txt");
    assert_eq!(entry.compression_method, Method::Deflate);
    assert_eq!(entry.uncompressed_size, 5);
    assert!(archive.entry("DOCS/B.TXT", true).await.unwrap().is_none());
}

#[tokio::test]
async fn lifecycle_misuse_is_reported() {
    let tmp = write_temp(&docs_zip());
    let archive = ZipArchive::new(tmp.path()).unwrap();

    assert!(matches!(archive.close().await, Err(ZipError::NotOpen)));
    archive.open().await.unwrap();
    assert!(archive.is_open().await);
    assert!(matches!(archive.open().await, Err(ZipError::AlreadyOpen)));
    assert!(archive.is_open().await);

    archive.build_hash_table().await.unwrap();
    archive.close().await.unwrap();
    assert!(!archive.is_open().await);
    assert!(!archive.has_hash_table().await);
    assert!(matches!(archive.close().await, Err(ZipError::NotOpen)));
    assert!(matches!(archive.file_names().await, Err(ZipError::NotOpen)));
    assert!(matches!(archive.read("readme.md", true, 0).await, Err(ZipError::NotOpen)));
    assert!(matches!(archive.entries().await, Err(ZipError::NotOpen)));

    // Reopening parses again and starts without an index.
    archive.open().await.unwrap();
    assert!(!archive.has_hash_table().await);
    assert_eq!(
        archive.file_names().await.unwrap(),
        ["docs/a.txt", "docs/b.txt", "readme.md"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_readers_share_one_archive() {
    let files: Vec<(String, Vec<u8>)> = (0..24)
        .map(|i| (format!("file{:02}.txt", i), lorem(1000 + i * 997)))
        .collect();
    let spec: Vec<(&str, &[u8], zip::CompressionMethod)> = files
        .iter()
        .enumerate()
        .map(|(i, (name, data))| {
            let method = if i % 2 == 0 { STORED } else { DEFLATED };
            (name.as_str(), data.as_slice(), method)
        })
        .collect();
    let (_tmp, archive) = open_bytes(&build_zip(&spec, None)).await;
    let archive = Arc::new(archive);
    let files = Arc::new(files);

    let mut tasks = Vec::new();
    for worker in 0..16 {
        let archive = archive.clone();
        let files = files.clone();
        tasks.push(tokio::spawn(async move {
            if worker % 4 == 0 {
                archive.build_hash_table().await.unwrap();
            }
            for (name, data) in files.iter() {
                let got = archive.read(name, worker % 3 != 0, 0).await.unwrap().unwrap();
                assert_eq!(&got, data);
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert!(archive.has_hash_table().await);
    assert_eq!(archive.file_names().await.unwrap().len(), 24);
}

#[tokio::test]
async fn close_waits_for_in_flight_reads() {
    let content = lorem(500_000);
    let bytes = build_zip(&[("big.txt", &content, DEFLATED)], None);
    let (_tmp, archive) = open_bytes(&bytes).await;
    let archive = Arc::new(archive);

    let reader = {
        let archive = archive.clone();
        tokio::spawn(async move { archive.read("big.txt", true, 0).await })
    };
    tokio::task::yield_now().await;
    archive.close().await.unwrap();

    // The read either finished before the close or was refused; it never
    // sees a half-closed archive.
    match reader.await.unwrap() {
        Ok(Some(data)) => assert_eq!(data, content),
        Err(ZipError::NotOpen) => {}
        other => panic!("unexpected read outcome: {:?}", other.map(|d| d.map(|d| d.len()))),
    }
}
