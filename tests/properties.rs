use dci::archive::parse_archive;
use dci::icon::layer::{parse_layer_name, Adjustments, LayerMeta};
use dci::icon::{ImageFormat, Palette};
use dci::natsort::natural_cmp;
use dci::{ArchiveBuilder, DciError};
use proptest::prelude::*;
use std::cmp::Ordering;

fn sample_archive() -> Vec<u8> {
    let mut b = ArchiveBuilder::new();
    b.write_file("16/normal.light/1/1.0p.-1.0_0_0_0_0_0_0.webp", b"light".to_vec()).unwrap();
    b.write_file("16/normal.light/2/1.0p.-1.0_0_0_0_0_0_0.png", vec![7; 40]).unwrap();
    b.link("../../normal.light/1/1.0p.-1.0_0_0_0_0_0_0.webp", "16/normal.dark/1/1.0p.-1.0_0_0_0_0_0_0.webp").unwrap();
    b.write_file("32/hover.dark/1/2.4p.0.0_0_0_0_0_0_0.jpg", b"hover".to_vec()).unwrap();
    b.to_bytes().unwrap()
}

fn adjustments() -> impl Strategy<Value = Adjustments> {
    prop::array::uniform7(-100i32..=100).prop_map(|[hue, saturation, brightness, red, green, blue, alpha]| {
        Adjustments { hue, saturation, brightness, red, green, blue, alpha }
    })
}

fn layer_meta() -> impl Strategy<Value = LayerMeta> {
    (1i32..1000, 0i32..200, -1i32..=3, adjustments(), any::<bool>()).prop_map(
        |(priority, padding, palette, adjustments, alpha8)| LayerMeta {
            priority,
            padding,
            palette: Palette::from_i32(palette),
            adjustments,
            alpha8,
        },
    )
}

proptest! {
    #[test]
    fn truncated_archives_are_rejected(cut in 0usize..1024) {
        let bytes = sample_archive();
        let cut = cut % bytes.len();
        let result = parse_archive(bytes[..cut].to_vec());
        let is_truncated = matches!(result, Err(DciError::Truncated { .. }));
        prop_assert!(is_truncated);
    }

    #[test]
    fn arbitrary_bytes_never_panic(tail in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut bytes = b"DCI\0\x01".to_vec();
        bytes.extend(tail);
        if let Ok(view) = parse_archive(bytes) {
            for entry in view.walk() {
                let _ = view.resolve(&entry.path);
            }
            let _ = view.resolved_icon_images();
        }
    }

    #[test]
    fn corrupt_nested_content_keeps_top_level(flip in 0usize..4096, value in any::<u8>()) {
        let mut bytes = sample_archive();
        // Only touch the content of the first top-level directory.
        let len = u64::from_le_bytes(bytes[72..80].try_into().unwrap()) as usize;
        bytes[80 + flip % len] = value;
        let view = parse_archive(bytes).unwrap();
        prop_assert_eq!(view.entries().len(), 2);
    }

    #[test]
    fn layer_filenames_parse_back(meta in layer_meta(), fmt in prop::sample::select(vec![ImageFormat::Webp, ImageFormat::Png, ImageFormat::Jpg])) {
        let name = meta.filename(fmt);
        let parsed = parse_layer_name(&name);
        prop_assert_eq!(parsed.meta, meta);
        prop_assert_eq!(parsed.format, fmt.extension());
    }

    #[test]
    fn natural_order_is_total(a in "[a-zA-Z0-9.]{0,8}", b in "[a-zA-Z0-9.]{0,8}") {
        prop_assert_eq!(natural_cmp(&a, &b), natural_cmp(&b, &a).reverse());
        prop_assert_eq!(natural_cmp(&a, &b) == Ordering::Equal, a == b);
    }

    #[test]
    fn numbers_sort_by_value(x in 0u32..100_000, y in 0u32..100_000) {
        prop_assert_eq!(natural_cmp(&x.to_string(), &y.to_string()), x.cmp(&y));
    }
}
