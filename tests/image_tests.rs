use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use renderware_rs::image::{bmp, decode_auto, ilbm, pcx, tga, SourceFormat};
use renderware_rs::RwError;

// 2x2, 8-bit, uncompressed. Entry 0 is (10, 20, 30), entry 1 is
// (40, 50, 60). Rows are stored bottom-up unless `height` is negative.
fn bmp_fixture(height: i32, rows: &[&[u8]]) -> Vec<u8> {
    let mut data = vec![0u8; 54];
    data[0] = b'B';
    data[1] = b'M';
    data[10..14].copy_from_slice(&1078u32.to_le_bytes());
    data[14..18].copy_from_slice(&40u32.to_le_bytes());
    data[18..22].copy_from_slice(&2i32.to_le_bytes());
    data[22..26].copy_from_slice(&height.to_le_bytes());
    data[26..28].copy_from_slice(&1u16.to_le_bytes());
    data[28..30].copy_from_slice(&8u16.to_le_bytes());

    let mut palette = vec![0u8; 1024];
    palette[0..4].copy_from_slice(&[30, 20, 10, 0]);
    palette[4..8].copy_from_slice(&[60, 50, 40, 0]);
    data.extend_from_slice(&palette);

    for row in rows {
        data.extend_from_slice(row);
        data.extend_from_slice(&[0, 0]); // pad to a 4-byte boundary
    }
    data
}

const DARK: [u8; 4] = [10, 20, 30, 255];
const LIGHT: [u8; 4] = [40, 50, 60, 255];

fn px(rgba: &[u8], index: usize) -> [u8; 4] {
    rgba[index * 4..][..4].try_into().unwrap()
}

#[test]
fn bmp_bottom_up_rows_are_flipped_to_top_down() -> Result<(), RwError> {
    // Stored bottom-up: first stored row is the bottom of the image.
    let data = bmp_fixture(2, &[&[1, 0], &[0, 1]]);
    let decoded = bmp::decode(&data)?;

    assert_eq!((decoded.width, decoded.height), (2, 2));
    assert_eq!(px(&decoded.rgba, 0), DARK);
    assert_eq!(px(&decoded.rgba, 1), LIGHT);
    assert_eq!(px(&decoded.rgba, 2), LIGHT);
    assert_eq!(px(&decoded.rgba, 3), DARK);
    assert!(!decoded.has_alpha);
    assert_eq!(decoded.source, SourceFormat::Bmp);
    Ok(())
}

#[test]
fn bmp_negative_height_means_top_down() -> Result<(), RwError> {
    let data = bmp_fixture(-2, &[&[0, 1], &[1, 0]]);
    let decoded = bmp::decode(&data)?;
    assert_eq!(px(&decoded.rgba, 0), DARK);
    assert_eq!(px(&decoded.rgba, 3), DARK);
    Ok(())
}

#[test]
fn bmp_alpha_is_always_opaque() -> Result<(), RwError> {
    let data = bmp_fixture(2, &[&[0, 0], &[1, 1]]);
    let decoded = bmp::decode(&data)?;
    assert!(decoded.rgba.chunks_exact(4).all(|px| px[3] == 255));
    Ok(())
}

#[test]
fn bmp_rejects_compressed_and_truncated_files() {
    let mut data = bmp_fixture(2, &[&[0, 0], &[0, 0]]);
    data[30..34].copy_from_slice(&1u32.to_le_bytes()); // RLE8
    assert!(matches!(bmp::decode(&data), Err(RwError::FormatSignature { .. })));

    let data = bmp_fixture(2, &[&[0, 0]]);
    assert!(matches!(bmp::decode(&data), Err(RwError::TruncatedData { .. })));
}

#[test]
fn bmp_pixel_offset_past_the_buffer_is_truncation() {
    let mut data = bmp_fixture(2, &[&[0, 0], &[0, 0]]);
    data[10..14].copy_from_slice(&0xFFFF_0000u32.to_le_bytes());
    assert!(matches!(bmp::decode(&data), Err(RwError::TruncatedData { .. })));
}

// 2x1 version-5 PCX with the 768-byte palette trailing the image data.
fn pcx_fixture(image_data: &[u8]) -> Vec<u8> {
    let mut data = vec![0u8; 128];
    data[0] = 0x0A;
    data[1] = 5;
    data[2] = 1; // RLE
    data[3] = 8;
    data[8..10].copy_from_slice(&1u16.to_le_bytes()); // xmax
    data[65] = 1;
    data[66..68].copy_from_slice(&2u16.to_le_bytes()); // bytes per line
    data.extend_from_slice(image_data);

    data.push(0x0C);
    let mut palette = vec![0u8; 768];
    palette[0..3].copy_from_slice(&[1, 2, 3]);
    palette[3..6].copy_from_slice(&[4, 5, 6]);
    palette[21..24].copy_from_slice(&[9, 9, 9]); // entry 7
    data.extend_from_slice(&palette);
    data
}

#[test]
fn pcx_literal_bytes_decode_through_the_palette() -> Result<(), RwError> {
    let decoded = pcx::decode(&pcx_fixture(&[0x00, 0x01]))?;
    assert_eq!((decoded.width, decoded.height), (2, 1));
    assert_eq!(px(&decoded.rgba, 0), [1, 2, 3, 255]);
    assert_eq!(px(&decoded.rgba, 1), [4, 5, 6, 255]);
    Ok(())
}

#[test]
fn pcx_run_markers_expand() -> Result<(), RwError> {
    // 0xC2 runs the next byte twice.
    let decoded = pcx::decode(&pcx_fixture(&[0xC2, 0x07]))?;
    assert_eq!(px(&decoded.rgba, 0), [9, 9, 9, 255]);
    assert_eq!(px(&decoded.rgba, 1), [9, 9, 9, 255]);
    Ok(())
}

#[test]
fn pcx_rows_narrower_than_the_image_are_rejected() {
    // bytes_per_line 1 cannot hold a 2-pixel row.
    let mut data = pcx_fixture(&[0x00, 0x01]);
    data[66..68].copy_from_slice(&1u16.to_le_bytes());
    assert!(matches!(
        pcx::decode(&data),
        Err(RwError::FormatSignature { .. })
    ));
}

#[test]
fn pcx_data_running_into_the_palette_is_truncation() {
    assert!(matches!(
        pcx::decode(&pcx_fixture(&[0x00])),
        Err(RwError::TruncatedData { .. })
    ));
}

// 2x2 type-1 TGA with a 2-entry color map.
fn tga_fixture(map_depth: u8, map: &[u8], pixels: &[u8], descriptor: u8) -> Vec<u8> {
    let mut data = vec![0u8; 18];
    data[1] = 1;
    data[2] = 1;
    data[5..7].copy_from_slice(&2u16.to_le_bytes());
    data[7] = map_depth;
    data[12..14].copy_from_slice(&2u16.to_le_bytes());
    data[14..16].copy_from_slice(&2u16.to_le_bytes());
    data[16] = 8;
    data[17] = descriptor;
    data.extend_from_slice(map);
    data.extend_from_slice(pixels);
    data
}

#[test]
fn tga_bottom_up_default_is_flipped() -> Result<(), RwError> {
    // BGR map entries; stored rows are bottom-up with descriptor 0.
    let data = tga_fixture(24, &[30, 20, 10, 60, 50, 40], &[1, 0, 0, 1], 0);
    let decoded = tga::decode(&data)?;
    assert_eq!(px(&decoded.rgba, 0), DARK);
    assert_eq!(px(&decoded.rgba, 1), LIGHT);
    assert_eq!(px(&decoded.rgba, 2), LIGHT);
    assert_eq!(px(&decoded.rgba, 3), DARK);
    assert!(!decoded.has_alpha);
    Ok(())
}

#[test]
fn tga_32bit_map_carries_alpha() -> Result<(), RwError> {
    let map = [30, 20, 10, 128, 60, 50, 40, 255];
    let data = tga_fixture(32, &map, &[0, 1, 1, 0], 0x20);
    let decoded = tga::decode(&data)?;
    assert_eq!(px(&decoded.rgba, 0), [10, 20, 30, 128]);
    assert_eq!(px(&decoded.rgba, 1), [40, 50, 60, 255]);
    assert!(decoded.has_alpha);
    Ok(())
}

#[test]
fn tga_out_of_range_index_clamps_to_the_map() -> Result<(), RwError> {
    let data = tga_fixture(24, &[30, 20, 10, 60, 50, 40], &[5, 5, 5, 5], 0x20);
    let decoded = tga::decode(&data)?;
    assert_eq!(px(&decoded.rgba, 0), LIGHT);
    Ok(())
}

// 8x1 single-plane ILBM. One plane row is padded to 16 pixels, so the
// BODY carries two bytes per row even for an 8-pixel image.
fn ilbm_fixture(compression: u8, body: &[u8]) -> Vec<u8> {
    let mut bmhd = vec![0u8; 20];
    bmhd[0..2].copy_from_slice(&8u16.to_be_bytes());
    bmhd[2..4].copy_from_slice(&1u16.to_be_bytes());
    bmhd[8] = 1; // planes
    bmhd[10] = compression;

    let cmap = [0u8, 0, 0, 255, 255, 255];

    let mut data = Vec::new();
    data.extend_from_slice(b"FORM");
    data.extend_from_slice(&0u32.to_be_bytes()); // patched below
    data.extend_from_slice(b"ILBM");

    for (fourcc, payload) in [(b"BMHD", &bmhd[..]), (b"CMAP", &cmap[..]), (b"BODY", body)] {
        data.extend_from_slice(fourcc);
        data.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        data.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            data.push(0);
        }
    }

    let form_size = (data.len() - 8) as u32;
    data[4..8].copy_from_slice(&form_size.to_be_bytes());
    data
}

#[test]
fn ilbm_planar_rows_decode_with_16_pixel_padding() -> Result<(), RwError> {
    let decoded = ilbm::decode(&ilbm_fixture(0, &[0xFF, 0x00]))?;
    assert_eq!((decoded.width, decoded.height), (8, 1));
    for i in 0..8 {
        assert_eq!(px(&decoded.rgba, i), [255, 255, 255, 255]);
    }
    Ok(())
}

#[test]
fn ilbm_byterun1_literals_unpack() -> Result<(), RwError> {
    // Control byte 1 copies two literal bytes.
    let decoded = ilbm::decode(&ilbm_fixture(1, &[0x01, 0xFF, 0x00]))?;
    for i in 0..8 {
        assert_eq!(px(&decoded.rgba, i), [255, 255, 255, 255]);
    }
    Ok(())
}

#[test]
fn ilbm_short_body_is_truncation() {
    assert!(matches!(
        ilbm::decode(&ilbm_fixture(0, &[0xFF])),
        Err(RwError::TruncatedData { .. })
    ));
}

fn png_fixture(rgba: &[u8], width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(rgba, width, height, ExtendedColorType::Rgba8)
        .unwrap();
    out
}

#[test]
fn png_round_trips_through_the_decoder() -> Result<(), RwError> {
    let rgba = [
        255, 0, 0, 255, 0, 255, 0, 255, //
        0, 0, 255, 255, 10, 20, 30, 128,
    ];
    let decoded = decode_auto(&png_fixture(&rgba, 2, 2))?;
    assert_eq!(decoded.source, SourceFormat::Png);
    assert_eq!(decoded.rgba, rgba);
    assert!(decoded.has_alpha);
    Ok(())
}

// Hand-assembled GIF87a, 2x1, global palette {black, red}, both pixels
// index 1. The LZW stream is clear, 1, 1, end at a minimum code size
// of 2.
fn gif_fixture() -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"GIF87a");
    data.extend_from_slice(&[0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00]);
    data.extend_from_slice(&[0, 0, 0, 255, 0, 0]);
    data.extend_from_slice(&[0x2C, 0, 0, 0, 0, 0x02, 0x00, 0x01, 0x00, 0x00]);
    data.extend_from_slice(&[0x02, 0x02, 0x4C, 0x0A, 0x00]);
    data.push(0x3B);
    data
}

#[test]
fn gif_decodes_through_the_global_palette() -> Result<(), RwError> {
    let decoded = decode_auto(&gif_fixture())?;
    assert_eq!(decoded.source, SourceFormat::Gif);
    assert_eq!((decoded.width, decoded.height), (2, 1));
    assert_eq!(px(&decoded.rgba, 0), [255, 0, 0, 255]);
    assert_eq!(px(&decoded.rgba, 1), [255, 0, 0, 255]);
    assert!(!decoded.has_alpha);
    Ok(())
}

#[test]
fn auto_detection_dispatches_on_signatures() -> Result<(), RwError> {
    let bmp_data = bmp_fixture(2, &[&[0, 0], &[0, 0]]);
    assert_eq!(decode_auto(&bmp_data)?.source, SourceFormat::Bmp);

    let pcx_data = pcx_fixture(&[0x00, 0x01]);
    assert_eq!(decode_auto(&pcx_data)?.source, SourceFormat::Pcx);

    let ilbm_data = ilbm_fixture(0, &[0xFF, 0x00]);
    assert_eq!(decode_auto(&ilbm_data)?.source, SourceFormat::Ilbm);

    // TGA has no signature; it is the fallback.
    let tga_data = tga_fixture(24, &[30, 20, 10, 60, 50, 40], &[0, 0, 0, 0], 0);
    assert_eq!(decode_auto(&tga_data)?.source, SourceFormat::Tga);
    Ok(())
}

#[test]
fn unrecognized_buffers_are_signature_errors() {
    assert!(matches!(
        decode_auto(b"RIFFxxxxWAVEfmt "),
        Err(RwError::FormatSignature { .. })
    ));
    assert!(matches!(decode_auto(&[]), Err(RwError::FormatSignature { .. })));
}

#[test]
fn opaque_sources_always_fill_alpha_with_255() -> Result<(), RwError> {
    let fixtures: Vec<Vec<u8>> = vec![
        bmp_fixture(2, &[&[0, 1], &[1, 0]]),
        pcx_fixture(&[0x00, 0x01]),
        ilbm_fixture(0, &[0xFF, 0x00]),
        tga_fixture(24, &[30, 20, 10, 60, 50, 40], &[1, 0, 0, 1], 0),
        gif_fixture(),
    ];
    for fixture in &fixtures {
        let decoded = decode_auto(fixture)?;
        assert!(decoded.rgba.chunks_exact(4).all(|px| px[3] == 255));
        assert!(!decoded.has_alpha);
    }
    Ok(())
}
