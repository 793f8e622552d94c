use pixpack::batch::{self, Batch};
use pixpack::container::serialize;
use pixpack::decoder::{self, inspect, read_stream};
use pixpack::encoder::{self, encode_records};
use pixpack::notify::{Level, RecordingNotifier};
use pixpack::{
    CollisionPolicy, DecodeOptions, EncodeOptions, Error, ErrorKind, FileRecord, FormatError,
    Layout, PixelGrid,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn record(name: &str, content: &[u8]) -> FileRecord {
    FileRecord::new(name, content.to_vec()).unwrap()
}

fn write_stream_image(stream: Vec<u8>, path: &Path) {
    PixelGrid::pack(stream, Layout::Square).unwrap().save(path).unwrap();
}

/// One row, no padding at all, so a cut stream cannot be completed by
/// zero-filled pixels.
fn write_exact_image(stream: Vec<u8>, path: &Path) {
    assert_eq!(stream.len() % 3, 0, "stream must fill whole pixels");
    let width = (stream.len() / 3) as u32;
    PixelGrid::pack(stream, Layout::Width(width)).unwrap().save(path).unwrap();
}

#[test]
fn test_known_vector_in_pixels() {
    let tmp = TempDir::new().unwrap();
    let image = tmp.path().join("a.png");

    let report = encode_records(
        &[record("a.txt", b"hi")],
        &image,
        &EncodeOptions { layout: Layout::Width(5) },
    );
    assert!(report.succeeded());
    assert_eq!(report.stream_len, 13);
    assert_eq!((report.width, report.height), (5, 1));

    let stream = read_stream(&image).unwrap();
    assert_eq!(
        stream,
        vec![0x05, 0x61, 0x2E, 0x74, 0x78, 0x74, 0x00, 0x00, 0x00, 0x02, 0x68, 0x69, 0x00, 0x00, 0x00]
    );

    let out = tmp.path().join("out");
    let report = decoder::decode(&[image], &out, &DecodeOptions::default());
    assert!(report.succeeded());
    assert_eq!(fs::read(out.join("a.txt")).unwrap(), vec![0x68, 0x69]);
}

#[test]
fn test_multifile_roundtrip_preserves_order() {
    let tmp = TempDir::new().unwrap();
    let image = tmp.path().join("multi.png");
    let records = vec![
        record("gamma.txt", b"Gamma file contents here"),
        record("alpha.bin", &[0, 255, 0, 255, 1]),
        record("nested/beta.txt", b"Beta"),
        record("empty.dat", b""),
    ];
    assert!(encode_records(&records, &image, &EncodeOptions::default()).succeeded());

    let listed = inspect(&image).unwrap();
    let names: Vec<_> = listed.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["gamma.txt", "alpha.bin", "nested/beta.txt", "empty.dat"]);
    assert_eq!(listed.stream_len, pixpack::container::stream_len(&records));

    let out = tmp.path().join("out");
    let report = decoder::decode(&[image], &out, &DecodeOptions::default());
    assert_eq!(report.written.len(), 4);
    for r in &records {
        assert_eq!(fs::read(out.join(r.name())).unwrap(), r.content());
    }
    assert_eq!(fs::metadata(out.join("empty.dat")).unwrap().len(), 0);
}

#[test]
fn test_empty_container_decodes_to_nothing() {
    let tmp = TempDir::new().unwrap();
    let image = tmp.path().join("empty.png");
    write_stream_image(serialize(&[]).unwrap(), &image);

    let sink = RecordingNotifier::new();
    let out = tmp.path().join("out");
    assert!(!batch::decode(&[image], &out, &DecodeOptions::default(), &sink));
    assert_eq!(sink.failure_count(), 0);
    assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
}

#[test]
fn test_name_length_boundaries_do_not_abort_batch() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    fs::create_dir(&src).unwrap();

    let ok_name = "n".repeat(255);
    let long_name = "n".repeat(256);
    let ok_path = src.join(&ok_name);
    fs::write(&ok_path, b"fits").unwrap();

    let sources = vec![
        pixpack::walk::FileSource { path: ok_path.clone(), name: String::new() },
        pixpack::walk::FileSource { path: ok_path.clone(), name: ok_name.clone() },
        pixpack::walk::FileSource { path: ok_path.clone(), name: long_name },
    ];
    let image = tmp.path().join("names.png");
    let report = encoder::encode(&sources, &image, &EncodeOptions::default());
    assert!(report.succeeded());
    assert_eq!(report.packed, vec![ok_name.clone()]);
    assert_eq!(report.failures.len(), 2);
    assert!(matches!(report.failures[0].error, Error::Format(FormatError::EmptyName)));
    assert!(matches!(report.failures[1].error, Error::Format(FormatError::NameTooLong(256))));

    let out = tmp.path().join("out");
    decoder::decode(&[image], &out, &DecodeOptions::default());
    assert_eq!(fs::read(out.join(&ok_name)).unwrap(), b"fits");
}

#[test]
fn test_truncated_image_rolls_back() {
    let tmp = TempDir::new().unwrap();
    let image = tmp.path().join("cut.png");
    let mut stream = serialize(&[record("first.txt", b"complete"), record("second.txt", b"0123456789")]).unwrap();
    stream.truncate(stream.len() - 6); // mid-way through second.txt's data
    write_exact_image(stream, &image);

    let out = tmp.path().join("out");
    let report = decoder::decode(&[image.clone()], &out, &DecodeOptions::default());
    assert!(!report.succeeded());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, image);
    assert_eq!(report.failures[0].error.kind(), ErrorKind::Format);
    assert!(!out.join("first.txt").exists());
    assert!(!out.join("second.txt").exists());
}

#[test]
fn test_mixed_batch_keeps_good_image() {
    let tmp = TempDir::new().unwrap();
    let good = tmp.path().join("good.png");
    let bad = tmp.path().join("bad.png");
    write_stream_image(serialize(&[record("kept.txt", b"kept")]).unwrap(), &good);
    let mut stream = serialize(&[record("lost.txt", b"this record is cut short")]).unwrap();
    stream.truncate(15);
    write_exact_image(stream, &bad);

    let sink = RecordingNotifier::new();
    let out = tmp.path().join("out");
    assert!(batch::decode(&[good, bad], &out, &DecodeOptions::default(), &sink));
    assert_eq!(sink.failure_count(), 1);
    assert_eq!(sink.events()[0].level, Level::Exception);
    assert_eq!(sink.events()[0].message, "Incorrectly encoded input image!");

    let files: Vec<_> = fs::read_dir(&out).unwrap().map(|e| e.unwrap().file_name()).collect();
    assert_eq!(files, vec![std::ffi::OsString::from("kept.txt")]);
}

#[test]
fn test_directory_roundtrip_through_batch() {
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("docs");
    fs::create_dir_all(docs.join("sub")).unwrap();
    fs::write(docs.join("readme.md"), b"# hello").unwrap();
    fs::write(docs.join("sub").join("data.bin"), (0u8..=255).collect::<Vec<_>>()).unwrap();
    let missing = tmp.path().join("missing.txt");

    let sink = RecordingNotifier::new();
    let image = tmp.path().join("docs.png");
    let report = Batch::new(&sink).encode(&[docs, missing], &image, &EncodeOptions::default());
    assert!(report.succeeded());
    assert_eq!(report.packed, vec!["docs/readme.md", "docs/sub/data.bin"]);
    assert_eq!(sink.failure_count(), 1);

    // Non-images next to the PNG are filtered out silently.
    fs::write(tmp.path().join("notes.txt"), b"not an image").unwrap();
    let out = tmp.path().join("restored");
    let sink = RecordingNotifier::new();
    let ok = batch::decode(&[tmp.path().to_path_buf()], &out, &DecodeOptions::default(), &sink);
    assert!(ok);
    assert_eq!(sink.failure_count(), 0);
    assert_eq!(fs::read(out.join("docs/readme.md")).unwrap(), b"# hello");
    assert_eq!(fs::read(out.join("docs/sub/data.bin")).unwrap().len(), 256);
}

#[test]
fn test_reject_collisions_across_images() {
    let tmp = TempDir::new().unwrap();
    let one = tmp.path().join("one.png");
    let two = tmp.path().join("two.png");
    write_stream_image(serialize(&[record("same.txt", b"first")]).unwrap(), &one);
    write_stream_image(serialize(&[record("other.txt", b"x"), record("same.txt", b"second")]).unwrap(), &two);

    let out = tmp.path().join("out");
    let opts = DecodeOptions { collisions: CollisionPolicy::Reject };
    let report = decoder::decode(&[one, two.clone()], &out, &opts);
    assert!(report.succeeded());
    assert_eq!(report.written, vec![out.join("same.txt")]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, two);
    assert_eq!(fs::read(out.join("same.txt")).unwrap(), b"first");
    assert!(!out.join("other.txt").exists());
}

#[test]
fn test_rollback_of_overwrite_drops_earlier_file() {
    let tmp = TempDir::new().unwrap();
    let one = tmp.path().join("one.png");
    let two = tmp.path().join("two.png");
    write_stream_image(serialize(&[record("same.txt", b"first")]).unwrap(), &one);
    let mut stream = serialize(&[record("same.txt", b"second"), record("tail.txt", b"0123456789")]).unwrap();
    stream.truncate(stream.len() - 4);
    write_exact_image(stream, &two);

    let out = tmp.path().join("out");
    let report = decoder::decode(&[one, two], &out, &DecodeOptions::default());
    assert!(!out.join("same.txt").exists());
    assert!(report.written.is_empty());
    assert!(!report.succeeded());
}

#[test]
fn test_unreadable_image_is_read_error() {
    let tmp = TempDir::new().unwrap();
    let fake = tmp.path().join("fake.png");
    fs::write(&fake, b"definitely not a png").unwrap();

    let sink = RecordingNotifier::new();
    let out = tmp.path().join("out");
    let report = Batch::new(&sink).decode(&[fake.clone()], &out, &DecodeOptions::default());
    assert!(!report.succeeded());
    assert_eq!(report.failures[0].error.kind(), ErrorKind::Read);
    assert_eq!(sink.failure_count(), 1);
    assert_eq!(sink.events()[0].message, format!("Failed to read image: {}", fake.display()));
    assert_eq!(report.outcome().unwrap_err().kind(), ErrorKind::Read);
}

#[test]
fn test_alpha_and_grayscale_sources_are_normalized() {
    let tmp = TempDir::new().unwrap();
    let stream = serialize(&[record("x.txt", b"rgba")]).unwrap();
    let grid = PixelGrid::pack(stream, Layout::Square).unwrap();

    // Re-save the same channels with an opaque alpha channel added.
    let rgba = image::RgbaImage::from_fn(grid.width(), grid.height(), |x, y| {
        let [r, g, b] = grid.pixel((y * grid.width() + x) as usize).unwrap();
        image::Rgba([r, g, b, 255])
    });
    let image_path = tmp.path().join("rgba.png");
    rgba.save(&image_path).unwrap();

    let out = tmp.path().join("out");
    let report = decoder::decode(&[image_path], &out, &DecodeOptions::default());
    assert!(report.succeeded());
    assert_eq!(fs::read(out.join("x.txt")).unwrap(), b"rgba");
}

#[test]
fn test_nothing_packable_writes_no_image() {
    let tmp = TempDir::new().unwrap();
    let image = tmp.path().join("never.png");
    let sink = RecordingNotifier::new();
    let inputs: Vec<PathBuf> = vec![tmp.path().join("a"), tmp.path().join("b")];
    assert!(!batch::encode(&inputs, &image, &EncodeOptions::default(), &sink));
    assert!(!image.exists());
    assert_eq!(sink.failure_count(), 2);
}

#[test]
fn test_bmp_and_tiff_outputs_roundtrip() {
    let tmp = TempDir::new().unwrap();
    for ext in ["bmp", "tif", "tiff"] {
        let image = tmp.path().join(format!("out.{ext}"));
        let report = encode_records(&[record("a.txt", b"hi")], &image, &EncodeOptions::default());
        assert!(report.succeeded(), "{ext}");

        let out = tmp.path().join(format!("out_{ext}"));
        let report = decoder::decode(&[image], &out, &DecodeOptions::default());
        assert!(report.failures.is_empty(), "{ext}: {:?}", report.failures);
        assert_eq!(fs::read(out.join("a.txt")).unwrap(), b"hi");
    }
}

#[test]
fn test_lossy_output_extension_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let image = tmp.path().join("out.jpg");
    let sink = RecordingNotifier::new();
    let src = tmp.path().join("a.txt");
    fs::write(&src, b"hi").unwrap();

    let report = Batch::new(&sink).encode(&[src], &image, &EncodeOptions::default());
    assert!(!report.succeeded());
    assert!(!image.exists());
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0].error,
        Error::Format(FormatError::UnsupportedOutput(_))
    ));
    assert_eq!(sink.events()[0].message, format!("Failed to create image: {}", image.display()));
}

#[test]
fn test_write_failure_rolls_back_image() {
    let tmp = TempDir::new().unwrap();
    let image = tmp.path().join("clash.png");
    write_stream_image(serialize(&[record("f", b"file"), record("f/x", b"needs a dir")]).unwrap(), &image);

    let sink = RecordingNotifier::new();
    let out = tmp.path().join("out");
    let report = Batch::new(&sink).decode(&[image.clone()], &out, &DecodeOptions::default());
    assert!(!report.succeeded());
    assert_eq!(report.failures[0].error.kind(), ErrorKind::Write);
    assert!(!out.join("f").exists());
    assert_eq!(sink.events()[0].message, format!("Failed to create files from: {}", image.display()));
}
