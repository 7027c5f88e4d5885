//! End-to-end runs over log directories on disk.

use std::collections::HashSet;
use std::fs;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use logpipe::{
    Compression, Concat, LineSource, Pipeline, PipelineError, Report, Value, access_log,
    aggregate, discover, open,
};
use tempfile::TempDir;

const PLAIN_LINE: &str = r#"1.2.3.4 - - [d] "GET /a HTTP/1.1" 200 100"#;
const GZIP_LINE: &str = r#"5.6.7.8 - - [d] "GET /b HTTP/1.1" 404 -"#;

fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

fn bzip2(text: &str) -> Vec<u8> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

fn write(root: &Path, rel: &str, data: &[u8]) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, data).unwrap();
    path
}

fn texts(values: &[&str]) -> HashSet<Value> {
    values.iter().map(|v| Value::from(*v)).collect()
}

#[test]
fn test_plain_and_gzip_sources() {
    let dir = TempDir::new().unwrap();
    let plain = write(dir.path(), "access-log", format!("{PLAIN_LINE}\n").as_bytes());
    let gz = write(dir.path(), "access-log.1.gz", &gzip(&format!("{GZIP_LINE}\n")));

    let records = access_log([&plain, &gz]).materialize().unwrap();
    assert_eq!(records.len(), 2);

    let not_found = aggregate::collect_set_where(aggregate::replay(&records), "request", |r| {
        r.get("status") == Some(&Value::Int(404))
    })
    .unwrap();
    assert_eq!(not_found, texts(&["/b"]));

    assert_eq!(aggregate::sum(aggregate::replay(&records), "bytes").unwrap(), 100);
    assert_eq!(
        aggregate::distinct(aggregate::replay(&records), "host").unwrap(),
        texts(&["1.2.3.4", "5.6.7.8"])
    );
}

#[test]
fn test_discovered_tree_with_all_formats() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("www");
    write(&root, "access-log", format!("{PLAIN_LINE}\njunk\n").as_bytes());
    write(
        &root,
        "old/access-log.1.gz",
        &gzip(&format!("{GZIP_LINE}\n{PLAIN_LINE}\n")),
    );
    write(
        &root,
        "old/access-log.2.bz2",
        &bzip2(r#"9.9.9.9 - - [d] "GET /big HTTP/1.1" 200 3000000"#),
    );
    write(&root, "old/error-log", PLAIN_LINE.as_bytes());

    let paths = discover(&root, "**/access-log*").unwrap();
    assert_eq!(paths.len(), 3);

    let records = access_log(&paths).materialize().unwrap();
    assert_eq!(records.len(), 4);

    let report = Report::build(&records, 1_000_000).unwrap();
    assert_eq!(report.total_bytes, 3_000_200);
    assert_eq!(report.largest, Some(("/big".to_string(), 3_000_000)));
    assert_eq!(report.downloads_of("/a"), 2);
    assert_eq!(report.hosts.len(), 3);
}

#[test]
fn test_single_pass_aggregation_over_live_stream() {
    let dir = TempDir::new().unwrap();
    let a = write(
        dir.path(),
        "access-log",
        format!("{PLAIN_LINE}\n{GZIP_LINE}\n").as_bytes(),
    );
    let b = write(dir.path(), "access-log.gz", &gzip(&format!("{PLAIN_LINE}\n")));

    let count = aggregate::count_eq(access_log([&a, &b]), "status", &Value::Int(200)).unwrap();
    assert_eq!(count, 2);
}

#[test]
fn test_concatenated_line_count() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "one", b"1\n2\n3\n");
    let b = write(dir.path(), "two.gz", &gzip("4\n5\n"));
    let c = write(dir.path(), "three.bz2", &bzip2("6\n"));

    let lines: Vec<String> = open([a, b, c])
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(lines, vec!["1", "2", "3", "4", "5", "6"]);
}

#[test]
fn test_missing_source_aborts_run() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "access-log", format!("{PLAIN_LINE}\n").as_bytes());
    let missing = dir.path().join("access-log.9.gz");

    let result = access_log([a, missing]).materialize();
    match result {
        Err(PipelineError::SourceOpen(err)) => {
            assert_eq!(err.compression, Compression::Gzip);
            assert_eq!(err.source.kind(), io::ErrorKind::NotFound);
        }
        other => panic!("expected source open error, got {other:?}"),
    }
}

#[test]
fn test_corrupt_archive_aborts_run() {
    let dir = TempDir::new().unwrap();
    let bad = write(dir.path(), "access-log.bz2", PLAIN_LINE.as_bytes());
    assert!(matches!(
        access_log([bad]).materialize(),
        Err(PipelineError::SourceOpen(_))
    ));
}

/// Open descriptors of this process that refer to `path`.
#[cfg(target_os = "linux")]
fn handles_on(path: &Path) -> usize {
    let path = fs::canonicalize(path).unwrap();
    fs::read_dir("/proc/self/fd")
        .unwrap()
        .filter_map(Result::ok)
        .filter(|fd| fs::read_link(fd.path()).is_ok_and(|target| target == path))
        .count()
}

#[cfg(target_os = "linux")]
#[test]
fn test_abandoned_run_closes_files() {
    let dir = TempDir::new().unwrap();
    let first = write(
        dir.path(),
        "access-log.0.gz",
        &gzip(&format!("{PLAIN_LINE}\n{GZIP_LINE}\n")),
    );
    let rest: Vec<PathBuf> = (1..3)
        .map(|i| {
            write(
                dir.path(),
                &format!("access-log.{i}.bz2"),
                &bzip2(&format!("{PLAIN_LINE}\n")),
            )
        })
        .collect();
    let paths = [first.clone(), rest[0].clone(), rest[1].clone()];

    {
        let mut records = access_log(&paths);
        let record = records.next().unwrap().unwrap();
        assert_eq!(record.text("host").unwrap(), "1.2.3.4");
        assert_eq!(handles_on(&first), 1);
        assert!(rest.iter().all(|path| handles_on(path) == 0));
    }
    assert_eq!(handles_on(&first), 0);
}

#[test]
fn test_byte_total_overflow_is_error() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "access-log.gz",
        &gzip(concat!(
            r#"1.2.3.4 - - [d] "GET /a HTTP/1.1" 200 9223372036854775807"#,
            "\n",
            r#"1.2.3.4 - - [d] "GET /b HTTP/1.1" 200 1"#,
            "\n",
        )),
    );
    assert!(matches!(
        aggregate::sum(access_log([&path]), "bytes"),
        Err(PipelineError::Overflow { .. })
    ));
}

/// Reader counting how many sources are currently open.
struct Counted {
    inner: Box<dyn Read>,
    open: Arc<AtomicUsize>,
}

impl Read for Counted {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[test]
fn test_abandoned_pipeline_releases_sources() {
    let dir = TempDir::new().unwrap();
    let paths: Vec<PathBuf> = (0..3)
        .map(|i| {
            write(
                dir.path(),
                &format!("access-log.{i}.gz"),
                &gzip(&format!("{PLAIN_LINE}\n{GZIP_LINE}\n")),
            )
        })
        .collect();

    let live = Arc::new(AtomicUsize::new(0));
    let opened = Arc::new(AtomicUsize::new(0));
    {
        let sources = paths.iter().map(|path| {
            let file = fs::File::open(path).map_err(|source| {
                PipelineError::from(logpipe::SourceOpenError {
                    path: path.clone(),
                    compression: Compression::Gzip,
                    source,
                })
            })?;
            live.fetch_add(1, Ordering::SeqCst);
            opened.fetch_add(1, Ordering::SeqCst);
            let reader = Counted {
                inner: Box::new(flate2::read::MultiGzDecoder::new(file)),
                open: Arc::clone(&live),
            };
            Ok::<_, PipelineError>(LineSource::new(
                path,
                Compression::Gzip,
                BufReader::new(reader),
            ))
        });

        let mut records = Pipeline::new(Concat::new(sources)).access_log_records();
        let first = records.next().unwrap().unwrap();
        assert_eq!(first.text("host").unwrap(), "1.2.3.4");
        assert_eq!(live.load(Ordering::SeqCst), 1);
    }
    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert_eq!(live.load(Ordering::SeqCst), 0);
}
