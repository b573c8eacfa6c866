//! End-to-end download sessions against a local HTTP server.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use fetchy::{
    find_orphaned_parts, Downgrade, DownloadHandle, Downloader, FetchConfig, PartNaming,
    SessionState,
};
use httpmock::prelude::*;
use httpmock::Method::HEAD;
use tempfile::TempDir;

const SIZE: usize = 1_000_000;

fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn config() -> FetchConfig {
    FetchConfig::default()
        .with_probe_timeout(Duration::from_secs(5))
        .with_chunk_timeout(Duration::from_secs(10))
        .with_pause_poll_interval(Duration::from_millis(10))
}

fn downloader() -> Downloader {
    Downloader::new(config()).expect("client builds")
}

fn mock_head(server: &MockServer, path: &str, len: usize, ranges: bool) {
    server.mock(|when, then| {
        when.method(HEAD).path(path);
        let then = then.status(200).header("content-length", len.to_string());
        if ranges {
            then.header("accept-ranges", "bytes");
        }
    });
}

fn wait_until_finished(handle: &DownloadHandle) {
    let deadline = Instant::now() + Duration::from_secs(20);
    while !handle.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
}

fn assert_no_parts(output: &Path) {
    assert!(find_orphaned_parts(output, PartNaming::Suffixed)
        .unwrap()
        .is_empty());
}

#[test]
fn test_four_way_ranged_download() {
    let server = MockServer::start();
    let data = body(SIZE);
    mock_head(&server, "/big.bin", SIZE, true);

    let ranges = [
        (0, 249_999),
        (250_000, 499_999),
        (500_000, 749_999),
        (750_000, 999_999),
    ];
    let range_mocks: Vec<_> = ranges
        .iter()
        .map(|&(start, end)| {
            let slice = data[start..=end].to_vec();
            server.mock(move |when, then| {
                when.method(GET)
                    .path("/big.bin")
                    .header("range", format!("bytes={}-{}", start, end));
                then.status(206).body(slice);
            })
        })
        .collect();

    let temp = TempDir::new().unwrap();
    let output = temp.path().join("big.bin");
    let handle = downloader().start(&server.url("/big.bin"), Some(output.clone()), Some(4));

    wait_until_finished(&handle);
    assert_eq!(handle.progress(), SIZE as u64);
    let outcome = handle.await_completion();

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.state, SessionState::Completed);
    assert_eq!(outcome.bytes, SIZE as u64);
    assert_eq!(outcome.warning, None);
    assert_eq!(outcome.downgrade, None);
    for mock in &range_mocks {
        mock.assert();
    }
    assert_eq!(fs::read(&output).unwrap(), data);
    assert_no_parts(&output);
}

#[test]
fn test_no_range_support_uses_single_unranged_request() {
    let server = MockServer::start();
    let data = body(4096);
    mock_head(&server, "/plain.bin", data.len(), false);
    let full = server.mock(|when, then| {
        when.method(GET).path("/plain.bin").matches(|req| {
            req.headers.as_ref().map_or(true, |headers| {
                headers.iter().all(|(k, _)| !k.eq_ignore_ascii_case("range"))
            })
        });
        then.status(200).body(&data);
    });
    let ranged = server.mock(|when, then| {
        when.method(GET).path("/plain.bin").header_exists("range");
        then.status(206);
    });

    let temp = TempDir::new().unwrap();
    let output = temp.path().join("plain.bin");
    let outcome = downloader().download(&server.url("/plain.bin"), Some(output.clone()), Some(8));

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.downgrade, Some(Downgrade::RangesUnsupported));
    full.assert_hits(1);
    ranged.assert_hits(0);
    assert_eq!(fs::read(&output).unwrap(), data);
    assert_no_parts(&output);
}

#[test]
fn test_more_threads_than_bytes() {
    let server = MockServer::start();
    mock_head(&server, "/tiny.txt", 3, true);
    for (i, byte) in ["a", "b", "c"].iter().enumerate() {
        server.mock(|when, then| {
            when.method(GET)
                .path("/tiny.txt")
                .header("range", format!("bytes={}-{}", i, i));
            then.status(206).body(*byte);
        });
    }

    let temp = TempDir::new().unwrap();
    let output = temp.path().join("tiny.txt");
    let outcome = downloader().download(&server.url("/tiny.txt"), Some(output.clone()), Some(8));

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(fs::read_to_string(&output).unwrap(), "abc");
    assert_no_parts(&output);
}

#[test]
fn test_cancel_stalled_download() {
    let server = MockServer::start();
    mock_head(&server, "/slow.bin", 1000, true);
    server.mock(|when, then| {
        when.method(GET).path("/slow.bin");
        then.status(206)
            .body(vec![0u8; 500])
            .delay(Duration::from_secs(2));
    });

    let temp = TempDir::new().unwrap();
    let output = temp.path().join("slow.bin");
    let handle = downloader().start(&server.url("/slow.bin"), Some(output.clone()), Some(2));

    thread::sleep(Duration::from_millis(300));
    handle.cancel();
    handle.cancel();
    let outcome = handle.await_completion();

    assert!(!outcome.success);
    assert_eq!(outcome.state, SessionState::Cancelled);
    assert!(!output.exists());
    assert_no_parts(&output);
}

#[test]
fn test_pause_holds_progress_until_resume() {
    let server = MockServer::start();
    let data = body(64 * 1024);
    mock_head(&server, "/paused.bin", data.len(), true);
    let half = data.len() / 2;
    for (start, end) in [(0, half - 1), (half, data.len() - 1)] {
        let slice = data[start..=end].to_vec();
        server.mock(move |when, then| {
            when.method(GET)
                .path("/paused.bin")
                .header("range", format!("bytes={}-{}", start, end));
            then.status(206)
                .body(slice)
                .delay(Duration::from_millis(200));
        });
    }

    let temp = TempDir::new().unwrap();
    let output = temp.path().join("paused.bin");
    let handle = downloader().start(&server.url("/paused.bin"), Some(output.clone()), Some(2));
    handle.pause();
    handle.pause();

    thread::sleep(Duration::from_millis(800));
    assert!(handle.is_paused());
    assert_eq!(handle.progress(), 0);
    assert_eq!(handle.state(), SessionState::Downloading);

    handle.resume();
    handle.resume();
    let outcome = handle.await_completion();

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(fs::read(&output).unwrap(), data);
}

#[test]
fn test_progress_never_decreases() {
    let server = MockServer::start();
    let data = body(SIZE);
    mock_head(&server, "/steady.bin", SIZE, true);
    server.mock(|when, then| {
        when.method(GET).path("/steady.bin");
        then.status(200).body(&data);
    });

    let temp = TempDir::new().unwrap();
    let output = temp.path().join("steady.bin");
    let downloader = Downloader::new(config().with_read_increment(1024)).unwrap();
    // One connection, and the server answers the range with the full body.
    let handle = downloader.start(&server.url("/steady.bin"), Some(output), Some(1));

    let mut last = 0;
    let deadline = Instant::now() + Duration::from_secs(20);
    while !handle.is_finished() && Instant::now() < deadline {
        let current = handle.progress();
        assert!(current >= last, "progress went from {} to {}", last, current);
        last = current;
        thread::sleep(Duration::from_millis(1));
    }

    let outcome = handle.await_completion();
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.bytes, SIZE as u64);
}

#[test]
fn test_probe_failure_fails_session() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(HEAD).path("/gone");
        then.status(404);
    });

    let outcome = downloader().download(&server.url("/gone"), None, None);

    assert!(!outcome.success);
    assert_eq!(outcome.state, SessionState::Failed);
    assert_eq!(outcome.output, None);
}

#[test]
fn test_failed_chunk_fails_session_without_leftovers() {
    let server = MockServer::start();
    let data = body(2000);
    mock_head(&server, "/broken.bin", data.len(), true);
    let first = data[..1000].to_vec();
    server.mock(move |when, then| {
        when.method(GET)
            .path("/broken.bin")
            .header("range", "bytes=0-999");
        then.status(206).body(first);
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/broken.bin")
            .header("range", "bytes=1000-1999");
        then.status(404);
    });

    let temp = TempDir::new().unwrap();
    let output = temp.path().join("broken.bin");
    let outcome = downloader().download(&server.url("/broken.bin"), Some(output.clone()), Some(2));

    assert!(!outcome.success);
    assert_eq!(outcome.state, SessionState::Failed);
    assert!(outcome.message.contains("404"), "{}", outcome.message);
    assert!(!output.exists());
    assert_no_parts(&output);
}

#[test]
fn test_download_without_head_length() {
    let server = MockServer::start();
    let data = body(10_000);
    server.mock(|when, then| {
        when.method(HEAD).path("/stream");
        then.status(200);
    });
    server.mock(|when, then| {
        when.method(GET).path("/stream").matches(|req| {
            req.headers.as_ref().map_or(true, |headers| {
                headers.iter().all(|(k, _)| !k.eq_ignore_ascii_case("range"))
            })
        });
        then.status(200).body(&data);
    });

    let temp = TempDir::new().unwrap();
    let output = temp.path().join("stream.out");
    let outcome = downloader().download(&server.url("/stream"), Some(output.clone()), Some(4));

    assert!(outcome.success, "{}", outcome.message);
    assert!(outcome.downgrade.is_some());
    assert_eq!(fs::read(&output).unwrap(), data);
}

#[test]
fn test_output_directory_and_indexed_parts() {
    let server = MockServer::start();
    let data = body(3000);
    mock_head(&server, "/files/report.pdf", data.len(), true);
    server.mock(|when, then| {
        when.method(GET).path("/files/report.pdf");
        then.status(200).body(&data);
    });

    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("nested/dir");
    let output = dir.join("report.pdf");
    let downloader = Downloader::new(config().with_part_naming(PartNaming::Indexed)).unwrap();

    let outcome = downloader.download(&server.url("/files/report.pdf"), Some(output.clone()), Some(3));

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(fs::read(&output).unwrap(), data);
    assert!(find_orphaned_parts(&output, PartNaming::Indexed)
        .unwrap()
        .is_empty());
}

#[test]
fn test_existing_directory_gets_resolved_filename() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(HEAD).path("/dl");
        then.status(200)
            .header("content-length", "5")
            .header("content-disposition", "attachment; filename*=UTF-8''caf%C3%A9.txt");
    });
    server.mock(|when, then| {
        when.method(GET).path("/dl");
        then.status(200).body("hello");
    });

    let temp = TempDir::new().unwrap();
    let outcome = downloader().download(&server.url("/dl"), Some(temp.path().to_path_buf()), None);

    assert!(outcome.success, "{}", outcome.message);
    let expected = temp.path().join("café.txt");
    assert_eq!(outcome.output.as_deref(), Some(expected.as_path()));
    assert_eq!(fs::read_to_string(expected).unwrap(), "hello");
}

#[test]
fn test_size_mismatch_is_a_warning() {
    let server = MockServer::start();
    mock_head(&server, "/liar.bin", 10, false);
    server.mock(|when, then| {
        when.method(GET).path("/liar.bin");
        then.status(200).body("twelve bytes");
    });

    let temp = TempDir::new().unwrap();
    let output = temp.path().join("liar.bin");
    let outcome = downloader().download(&server.url("/liar.bin"), Some(output.clone()), Some(1));

    assert!(outcome.success, "{}", outcome.message);
    let warning = outcome.warning.expect("size mismatch reported");
    assert_eq!(warning.expected, 10);
    assert_eq!(warning.actual, 12);
    assert_eq!(fs::read_to_string(&output).unwrap(), "twelve bytes");
}

#[test]
fn test_crate_level_resolve() {
    let server = MockServer::start();
    mock_head(&server, "/path/file.zip", 1234, true);

    let meta = fetchy::resolve(&server.url("/path/file.zip?x=1")).expect("metadata");

    assert_eq!(meta.filename, "file.zip");
    assert_eq!(meta.total_size, Some(1234));
    assert!(meta.supports_range);
}

#[test]
fn test_pause_after_cancel_is_ignored() {
    let server = MockServer::start();
    mock_head(&server, "/late.bin", 100, true);
    server.mock(|when, then| {
        when.method(GET).path("/late.bin");
        then.status(206)
            .body(vec![0u8; 50])
            .delay(Duration::from_millis(500));
    });

    let temp = TempDir::new().unwrap();
    let output = temp.path().join("late.bin");
    let handle = downloader().start(&server.url("/late.bin"), Some(output.clone()), Some(2));

    handle.cancel();
    handle.pause();
    handle.resume();

    assert!(handle.is_cancelled());
    assert!(!handle.is_paused());
    let outcome = handle.await_completion();
    assert!(!outcome.success);
    assert!(!output.exists());
}

#[test]
fn test_metadata_published_before_transfer() {
    let server = MockServer::start();
    let data = body(8192);
    server.mock(|when, then| {
        when.method(HEAD).path("/meta/raw.bin");
        then.status(200)
            .header("content-length", data.len().to_string())
            .header("accept-ranges", "bytes")
            .header("content-type", "application/octet-stream")
            .header("content-disposition", "attachment; filename=\"named.bin\"");
    });
    server.mock(|when, then| {
        when.method(GET).path("/meta/raw.bin");
        then.status(200).body(&data);
    });

    let temp = TempDir::new().unwrap();
    let handle = downloader().start(
        &server.url("/meta/raw.bin"),
        Some(temp.path().to_path_buf()),
        Some(2),
    );
    handle.pause();

    let deadline = Instant::now() + Duration::from_secs(10);
    while handle.state() != SessionState::Downloading && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    let meta = handle.metadata().expect("metadata published");
    assert_eq!(meta.filename, "named.bin");
    assert_eq!(meta.total_size, Some(8192));
    assert_eq!(meta.effective_threads(2), 2);
    let expected = temp.path().join("named.bin");
    assert_eq!(handle.output_path().as_deref(), Some(expected.as_path()));
    assert!(!handle.is_finished());

    handle.resume();
    let outcome = handle.await_completion();
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(fs::read(&expected).unwrap(), data);
}
