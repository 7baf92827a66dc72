use std::collections::HashSet;
use std::fs::File;
use std::io::{Cursor, Read, Write};

use streamlib::{
    CharFilterProducer, DiacriticsProducer, Producer, Schema, StreamError,
    TranscodeProducer, ReadTap, XmlTranslateOptions, XmlTranslateProducer,
};
use tempdir::TempDir;

const CAFE_1252: &[u8] = &[0x63, 0x61, 0x66, 0xE9];

fn drain_in_steps(mut reader: impl Read, step: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut dest = vec![0u8; step];
    loop {
        let copied = reader.read(&mut dest).expect("read failed");
        if copied == 0 {
            break;
        }
        out.extend_from_slice(&dest[..copied]);
    }
    out
}

#[test]
fn transcoding_is_chop_invariant() {
    let mut outputs = Vec::new();
    for step in [1, 3, 7, 4096] {
        let engine = TranscodeProducer::new(
            Cursor::new(CAFE_1252.to_vec()),
            "windows-1252",
            "utf-8",
        )
        .expect("failed to build transcoder")
        .into_engine();
        outputs.push(drain_in_steps(engine, step));
    }
    for output in &outputs {
        assert_eq!(output, "café".as_bytes());
    }
}

#[test]
fn transcoding_round_trips_through_utf8() {
    let utf8 = drain_in_steps(
        TranscodeProducer::new(
            Cursor::new(CAFE_1252.to_vec()),
            "windows-1252",
            "utf-8",
        )
        .unwrap()
        .into_engine(),
        4096,
    );
    let back = drain_in_steps(
        TranscodeProducer::new(
            Cursor::new(utf8),
            "utf-8",
            "windows-1252",
        )
        .unwrap()
        .into_engine(),
        4096,
    );
    assert_eq!(back, CAFE_1252);
}

#[test]
fn engines_compose_as_readers() {
    // Transcode, then strip diacritics, then drop the separators; each
    // stage pulls lazily from the previous one.
    let transcoded = TranscodeProducer::new(
        Cursor::new(vec![0x63, 0x61, 0x66, 0xE9, b',', 0x6E, 0x61, 0xEF]),
        "windows-1252",
        "utf-8",
    )
    .unwrap()
    .into_engine();
    let stripped = DiacriticsProducer::new(transcoded)
        .unwrap()
        .into_engine();
    let excluded: HashSet<char> = [','].into_iter().collect();
    let filtered = CharFilterProducer::new(stripped, excluded)
        .unwrap()
        .into_engine();

    assert_eq!(drain_in_steps(filtered, 2), b"cafenai");
}

#[test]
fn tap_spools_while_a_transform_consumes() {
    let dir = TempDir::new("streamlib_test")
        .expect("Failed to create temporary directory");
    let spool_path = dir.path().join("spool.bin");

    {
        let mut spool = File::create(&spool_path)
            .expect("Failed to create spool file");
        let tap = ReadTap::new(
            Cursor::new(CAFE_1252.to_vec()),
            |chunk| -> anyhow::Result<()> {
                spool.write_all(chunk)?;
                Ok(())
            },
        );
        let engine =
            TranscodeProducer::new(tap, "windows-1252", "utf-8")
                .unwrap()
                .into_engine();
        assert_eq!(drain_in_steps(engine, 1), "café".as_bytes());
    }

    // The tap captured the raw source bytes, not the transformed ones.
    let spooled =
        std::fs::read(&spool_path).expect("Failed to read spool file");
    assert_eq!(spooled, CAFE_1252);
}

const SCHEMA: &[u8] = br#"
    <schema root="order">
      <element name="order">
        <attribute name="id" required="true" pattern="[0-9]+"/>
        <child name="item"/>
      </element>
      <element name="item">
        <text pattern="[a-z ]+"/>
      </element>
    </schema>
"#;

#[test]
fn terse_translation_keeps_only_structure() {
    let doc = "<order id=\"1\"><!-- note -->\n  <item>widget</item>\n\
               </order>";
    let engine = XmlTranslateProducer::new(
        Cursor::new(doc.as_bytes().to_vec()),
        XmlTranslateOptions { terse: true },
    )
    .into_engine();
    assert_eq!(
        drain_in_steps(engine, 5),
        b"<order id=\"1\"><item>widget</item></order>"
    );
}

#[test]
fn validation_failures_surface_once_at_end_of_stream() {
    let doc = "<order id=\"1\"><item>widget</item><item>99</item></order>";
    let schema = Schema::parse(SCHEMA).expect("schema must parse");
    let mut engine = XmlTranslateProducer::validating(
        Cursor::new(doc.as_bytes().to_vec()),
        XmlTranslateOptions::default(),
        schema,
    )
    .into_engine();

    let mut streamed = Vec::new();
    let mut dest = [0u8; 1];
    let err = loop {
        match engine.read_transformed(&mut dest) {
            Ok(0) => panic!("stream ended without the failure"),
            Ok(copied) => streamed.extend_from_slice(&dest[..copied]),
            Err(err) => break err,
        }
    };

    // The whole document streamed before the failure surfaced.
    assert_eq!(streamed, doc.as_bytes());
    match err {
        StreamError::Validation { errors } => {
            assert!(!errors.is_empty())
        }
        other => panic!("expected validation failure, got {other}"),
    }
    assert_eq!(engine.read_transformed(&mut dest).unwrap(), 0);
}

#[test]
fn io_faults_reach_the_caller_unchanged() {
    struct Broken;
    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "source went away",
            ))
        }
    }

    let mut engine = TranscodeProducer::new(Broken, "utf-8", "utf-8")
        .unwrap()
        .into_engine();
    let mut dest = [0u8; 4];
    let err = engine.read_transformed(&mut dest).unwrap_err();
    match err {
        StreamError::Io(io) => {
            assert_eq!(io.kind(), std::io::ErrorKind::ConnectionReset)
        }
        other => panic!("expected IO fault, got {other}"),
    }
}
