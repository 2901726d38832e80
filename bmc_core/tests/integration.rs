//! End-to-end tests: the full LZ77 → Huffman pipeline through the `.bmc`
//! container, plus container-level decode failures.

use bmc_codecs::pipeline::{compress, decompress, encode_payload};
use bmc_core::error::Error;
use bmc_core::format::{Container, Geometry};

/// Generate `len` deterministic bytes using a simple LCG.
///
/// Values are masked to 0x00–0xFE: a 0xFF byte in literal position collides
/// with the token stream's end sentinel and is dropped on decode, a known
/// part of the wire format.
fn pseudo_random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = seed;
    (0..len)
        .map(|_| {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let b = (rng >> 56) as u8;
            if b == 0xFF {
                0xFE
            } else {
                b
            }
        })
        .collect()
}

fn roundtrip(pixels: &[u8]) -> Vec<u8> {
    let geometry = Geometry {
        width: pixels.len() as u32,
        height: 1,
        channels: 1,
    };
    let bytes = compress(pixels, geometry, b"hdr").unwrap();
    let (restored, geo, header) = decompress(&bytes).unwrap();
    assert_eq!(geo, geometry);
    assert_eq!(header, b"hdr");
    restored
}

// ── pipeline round-trips ────────────────────────────────────────────────────

#[test]
fn tiny_input_skips_both_stages_and_round_trips() {
    let data = b"AAAAAAAAAA"; // 10 bytes: below both stage thresholds
    let (payload, meta) = encode_payload(data).unwrap();
    assert!(!meta.lz77.applied);
    assert!(!meta.huffman.applied);
    assert_eq!(payload, data);
    assert_eq!(roundtrip(data), data);
}

#[test]
fn long_repeated_run_collapses_to_few_tokens() {
    let data = vec![b'A'; 200];
    let (payload, meta) = encode_payload(&data).unwrap();
    assert!(meta.lz77.applied);
    assert!(payload.len() < data.len() / 4);
    assert_eq!(roundtrip(&data), data);
}

#[test]
fn round_trip_across_size_thresholds() {
    // Sizes straddling the LZ77 (50) and Huffman (100) skip thresholds.
    for len in [0usize, 1, 49, 50, 99, 100, 10_000] {
        let data = pseudo_random_bytes(len, 0xDEAD_BEEF ^ len as u64);
        assert_eq!(roundtrip(&data), data, "round-trip failed for len {len}");
    }
}

#[test]
fn compressible_data_shrinks_the_container() {
    let pattern = b"the quick brown fox jumps over the lazy dog. ";
    let data: Vec<u8> = pattern.iter().cycle().take(20_000).copied().collect();
    let geometry = Geometry {
        width: data.len() as u32,
        height: 1,
        channels: 1,
    };
    let bytes = compress(&data, geometry, &[]).unwrap();
    assert!(bytes.len() < data.len());
    let (restored, ..) = decompress(&bytes).unwrap();
    assert_eq!(restored, data);
}

#[test]
fn incompressible_data_degrades_to_passthrough() {
    let data = pseudo_random_bytes(4096, 0x1234_5678);
    let (payload, meta) = encode_payload(&data).unwrap();
    assert!(!meta.lz77.applied, "random data should not LZ77-compress");
    assert!(!meta.huffman.applied, "random data should not entropy-code");
    assert_eq!(payload, data);
}

#[test]
fn multi_channel_geometry_round_trips() {
    let data = pseudo_random_bytes(64 * 48 * 3, 7);
    let geometry = Geometry {
        width: 64,
        height: 48,
        channels: 3,
    };
    let bytes = compress(&data, geometry, &[0u8; 54]).unwrap();
    let (restored, geo, header) = decompress(&bytes).unwrap();
    assert_eq!(restored, data);
    assert_eq!(geo, geometry);
    assert_eq!(header.len(), 54);
}

// ── container-level failures ────────────────────────────────────────────────

#[test]
fn container_fields_round_trip() {
    let container = Container {
        geometry: Geometry {
            width: 1920,
            height: 1080,
            channels: 3,
        },
        header_blob: vec![0xAB; 54],
        metadata_blob: vec![1, 2, 3, 4],
        payload: vec![0x55; 777],
    };
    let restored = Container::from_bytes(&container.to_bytes()).unwrap();
    assert_eq!(restored, container);
}

#[test]
fn empty_blobs_round_trip() {
    let container = Container {
        geometry: Geometry {
            width: 0,
            height: 0,
            channels: 0,
        },
        header_blob: Vec::new(),
        metadata_blob: Vec::new(),
        payload: Vec::new(),
    };
    let restored = Container::from_bytes(&container.to_bytes()).unwrap();
    assert_eq!(restored, container);
}

#[test]
fn payload_length_prefix_past_eof_is_truncated_input() {
    let container = Container {
        geometry: Geometry {
            width: 4,
            height: 4,
            channels: 1,
        },
        header_blob: Vec::new(),
        metadata_blob: Vec::new(),
        payload: vec![7u8; 16],
    };
    let mut bytes = container.to_bytes();
    // Inflate the payload length prefix so it requests bytes past the end.
    let prefix_at = bytes.len() - 16 - 4;
    bytes[prefix_at..prefix_at + 4].copy_from_slice(&999u32.to_le_bytes());
    assert!(matches!(
        Container::from_bytes(&bytes),
        Err(Error::TruncatedInput {
            needed: 999,
            remaining: 16
        })
    ));
}

#[test]
fn truncated_container_is_rejected_at_every_prefix() {
    let data = pseudo_random_bytes(500, 99);
    let geometry = Geometry {
        width: 500,
        height: 1,
        channels: 1,
    };
    let bytes = compress(&data, geometry, b"HDRHDR").unwrap();
    for cut in [0, 3, 8, 9, 12, bytes.len() - 1] {
        assert!(
            matches!(
                Container::from_bytes(&bytes[..cut]),
                Err(Error::TruncatedInput { .. })
            ),
            "cut at {cut} should be truncated input"
        );
    }
}
