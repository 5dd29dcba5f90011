use renderware_rs::texture::{dxt, RasterFormat};

fn dxt1_block(color0: u16, color1: u16, indices: u32) -> Vec<u8> {
    let mut block = Vec::with_capacity(8);
    block.extend_from_slice(&color0.to_le_bytes());
    block.extend_from_slice(&color1.to_le_bytes());
    block.extend_from_slice(&indices.to_le_bytes());
    block
}

#[test]
fn dxt1_solid_endpoint_block_decodes_to_white() {
    // color0 = 0xFFFF > color1, four-color mode, every index 0.
    let block = dxt1_block(0xFFFF, 0x0000, 0);
    let rgba = dxt::decode(RasterFormat::Dxt1, &block, 4, 4).unwrap();
    assert_eq!(rgba.len(), 64);
    for px in rgba.chunks_exact(4) {
        assert_eq!(px, [255, 255, 255, 255]);
    }
}

#[test]
fn dxt1_565_expansion_replicates_high_bits() {
    // 0xF800 is pure red in RGB565; expansion must reach full 255.
    let rgba = dxt::decode(RasterFormat::Dxt1, &dxt1_block(0xF800, 0, 0), 4, 4).unwrap();
    assert_eq!(&rgba[0..4], &[255, 0, 0, 255]);

    let rgba = dxt::decode(RasterFormat::Dxt1, &dxt1_block(0x07E0, 0, 0), 4, 4).unwrap();
    assert_eq!(&rgba[0..4], &[0, 255, 0, 255]);

    let rgba = dxt::decode(RasterFormat::Dxt1, &dxt1_block(0x001F, 0, 0), 4, 4).unwrap();
    assert_eq!(&rgba[0..4], &[0, 0, 255, 255]);
}

#[test]
fn dxt1_interpolated_indices_follow_two_one_weights() {
    // color0 = red, color1 = blue, all texels index 2 (2/3 red, 1/3 blue).
    let rgba = dxt::decode(
        RasterFormat::Dxt1,
        &dxt1_block(0xF800, 0x001F, 0xAAAAAAAA),
        4,
        4,
    )
    .unwrap();
    for px in rgba.chunks_exact(4) {
        // (255 * 2) / 3 and 255 / 3, the 2:1 and 1:2 mixes of the endpoints.
        assert_eq!(px, [170, 0, 85, 255]);
    }
}

#[test]
fn dxt1_punch_through_mode_yields_transparent_texels() {
    // color0 <= color1 selects three-color mode; index 3 is transparent black.
    let rgba = dxt::decode(
        RasterFormat::Dxt1,
        &dxt1_block(0x0000, 0xFFFF, 0xFFFFFFFF),
        4,
        4,
    )
    .unwrap();
    for px in rgba.chunks_exact(4) {
        assert_eq!(px, [0, 0, 0, 0]);
    }
}

#[test]
fn dxt3_explicit_alpha_scales_nibbles_by_17() {
    let mut block = vec![0u8; 16];
    // First two texels alpha 0xF and 0x8, the rest 0x0.
    block[0] = 0x8F;
    // Opaque white color half.
    block[8..16].copy_from_slice(&dxt1_block(0xFFFF, 0, 0));

    let rgba = dxt::decode(RasterFormat::Dxt3, &block, 4, 4).unwrap();
    assert_eq!(rgba[3], 255);
    assert_eq!(rgba[7], 8 * 17);
    assert_eq!(rgba[11], 0);
}

#[test]
fn dxt5_alpha_endpoints_decode_exactly() {
    let mut block = vec![0u8; 16];
    block[0] = 200; // a0
    block[1] = 40; // a1
    // First texel index 0, second index 1, rest 0.
    block[2] = 0b0000_1000;
    block[8..16].copy_from_slice(&dxt1_block(0xFFFF, 0, 0));

    let rgba = dxt::decode(RasterFormat::Dxt5, &block, 4, 4).unwrap();
    assert_eq!(rgba[3], 200);
    assert_eq!(rgba[7], 40);
}

#[test]
fn decoding_is_deterministic() {
    let payload: Vec<u8> = (0..32).map(|i| (i * 37) as u8).collect();
    let first = dxt::decode(RasterFormat::Dxt5, &payload, 4, 4).unwrap();
    let second = dxt::decode(RasterFormat::Dxt5, &payload, 4, 4).unwrap();
    assert_eq!(first, second);
}

#[test]
fn encoding_is_deterministic() {
    let rgba: Vec<u8> = (0..8 * 8 * 4).map(|i| (i * 13) as u8).collect();
    for format in [RasterFormat::Dxt1, RasterFormat::Dxt3, RasterFormat::Dxt5] {
        let first = dxt::encode(format, &rgba, 8, 8).unwrap();
        let second = dxt::encode(format, &rgba, 8, 8).unwrap();
        assert_eq!(first, second, "{format:?} encode must be deterministic");
    }
}

#[test]
fn solid_color_survives_encode_decode_within_565_precision() {
    let rgba = [40u8, 100, 180, 255].repeat(16);
    let encoded = dxt::encode(RasterFormat::Dxt1, &rgba, 4, 4).unwrap();
    assert_eq!(encoded.len(), 8);

    let decoded = dxt::decode(RasterFormat::Dxt1, &encoded, 4, 4).unwrap();
    for px in decoded.chunks_exact(4) {
        assert!((px[0] as i32 - 40).abs() <= 4, "r drifted: {px:?}");
        assert!((px[1] as i32 - 100).abs() <= 4, "g drifted: {px:?}");
        assert!((px[2] as i32 - 180).abs() <= 4, "b drifted: {px:?}");
        assert_eq!(px[3], 255);
    }
}

#[test]
fn two_color_block_round_trips_exactly() {
    // Pure red and pure blue are exact RGB565 values, so both must
    // come back untouched as the chosen endpoints.
    let mut rgba = Vec::new();
    for i in 0..16 {
        if i % 2 == 0 {
            rgba.extend_from_slice(&[255, 0, 0, 255]);
        } else {
            rgba.extend_from_slice(&[0, 0, 255, 255]);
        }
    }

    let encoded = dxt::encode(RasterFormat::Dxt1, &rgba, 4, 4).unwrap();
    let decoded = dxt::decode(RasterFormat::Dxt1, &encoded, 4, 4).unwrap();
    assert_eq!(decoded, rgba);
}

#[test]
fn dxt5_preserves_uniform_alpha_exactly() {
    let rgba = [10u8, 20, 30, 100].repeat(16);
    let encoded = dxt::encode(RasterFormat::Dxt5, &rgba, 4, 4).unwrap();
    assert_eq!(encoded.len(), 16);

    let decoded = dxt::decode(RasterFormat::Dxt5, &encoded, 4, 4).unwrap();
    for px in decoded.chunks_exact(4) {
        assert_eq!(px[3], 100);
    }
}

#[test]
fn dxt3_alpha_quantizes_to_nibble_steps() {
    let rgba = [0u8, 0, 0, 0x80].repeat(16);
    let encoded = dxt::encode(RasterFormat::Dxt3, &rgba, 4, 4).unwrap();
    let decoded = dxt::decode(RasterFormat::Dxt3, &encoded, 4, 4).unwrap();
    for px in decoded.chunks_exact(4) {
        assert_eq!(px[3], (0x80 >> 4) * 17);
    }
}

#[test]
fn non_multiple_of_four_dimensions_use_clamped_edge_blocks() {
    let rgba = [200u8, 50, 25, 255].repeat(6);
    let encoded = dxt::encode(RasterFormat::Dxt1, &rgba, 3, 2).unwrap();
    assert_eq!(encoded.len(), 8, "3x2 still occupies one block");

    let decoded = dxt::decode(RasterFormat::Dxt1, &encoded, 3, 2).unwrap();
    assert_eq!(decoded.len(), 3 * 2 * 4);
    for px in decoded.chunks_exact(4) {
        assert!((px[0] as i32 - 200).abs() <= 8);
    }
}

#[test]
fn short_payloads_and_foreign_formats_are_rejected() {
    assert!(dxt::decode(RasterFormat::Dxt1, &[0u8; 7], 4, 4).is_none());
    assert!(dxt::decode(RasterFormat::Argb8888, &[0u8; 64], 4, 4).is_none());
    assert!(dxt::encode(RasterFormat::Pal8, &[0u8; 64], 4, 4).is_none());
    assert!(dxt::encode(RasterFormat::Dxt1, &[0u8; 10], 4, 4).is_none());
}
