//! Page selection, splitting and merging

mod common;

use common::{load, page_markers, PdfBuilder};
use lopdf::Object;
use pdf_compactor::{merge, organize, split, split_range, CompactError};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[case("3,1-2", vec![3, 1, 2])]
#[case("5-3", vec![5, 4, 3])]
#[case("1,1,2", vec![1, 1, 2])]
#[case("2,9,4-7", vec![2, 4, 5])]
#[case("", vec![1, 2, 3, 4, 5])]
#[case("x,y-z", vec![1, 2, 3, 4, 5])]
fn organize_follows_page_order(#[case] order: &str, #[case] expected: Vec<i64>) {
    let input = PdfBuilder::new(5).build();
    let output = organize(&input, order).unwrap();
    assert_eq!(page_markers(&output), expected);
}

#[test]
fn repeated_pages_are_distinct_nodes() {
    let input = PdfBuilder::new(2).build();
    let output = organize(&input, "2,2,2").unwrap();

    let doc = load(&output);
    let pages: Vec<_> = doc.get_pages().into_values().collect();
    assert_eq!(pages.len(), 3);
    assert_ne!(pages[0], pages[1]);
    assert_ne!(pages[1], pages[2]);
}

#[test]
fn organize_keeps_inherited_media_box() {
    let input = PdfBuilder::new(3).inherited_media_box().build();
    let output = organize(&input, "3,1").unwrap();

    let doc = load(&output);
    for page_id in doc.get_pages().into_values() {
        let page = doc.get_dictionary(page_id).unwrap();
        assert!(matches!(page.get(b"MediaBox"), Ok(Object::Array(a)) if a.len() == 4));
    }
}

#[test]
fn dropped_pages_do_not_leave_images_behind() {
    let input = PdfBuilder::new(4).image_per_page(200, 200).build();
    let output = organize(&input, "1").unwrap();

    assert_eq!(common::image_streams(&load(&output)).len(), 1);
    assert!(output.len() < input.len());
}

#[test]
fn split_writes_one_document_per_page() {
    let input = PdfBuilder::new(3).build();
    let pages = split(&input, None).unwrap();

    assert_eq!(pages.len(), 3);
    for (index, page) in pages.iter().enumerate() {
        assert_eq!(page.page_number, index as u32 + 1);
        assert_eq!(page_markers(&page.bytes), vec![index as i64 + 1]);
    }
}

#[test]
fn split_with_page_order() {
    let input = PdfBuilder::new(4).build();
    let pages = split(&input, Some("4,2")).unwrap();

    let numbers: Vec<u32> = pages.iter().map(|p| p.page_number).collect();
    assert_eq!(numbers, vec![4, 2]);
}

#[rstest]
#[case(None, None, vec![1, 2, 3, 4])]
#[case(Some(2), None, vec![2, 3, 4])]
#[case(None, Some(2), vec![1, 2])]
#[case(Some(3), Some(10), vec![3, 4])]
#[case(Some(4), Some(2), vec![])]
fn split_range_is_clamped(
    #[case] start: Option<u32>,
    #[case] end: Option<u32>,
    #[case] expected: Vec<u32>,
) {
    let input = PdfBuilder::new(4).build();
    let pages = split_range(&input, start, end).unwrap();

    let numbers: Vec<u32> = pages.iter().map(|p| p.page_number).collect();
    assert_eq!(numbers, expected);
}

#[test]
fn merge_concatenates_in_order() {
    let first = PdfBuilder::new(3).image_per_page(150, 150).build();
    let second = PdfBuilder::new(2).inherited_media_box().build();

    let merged = merge(&[first.as_slice(), second.as_slice()]).unwrap();

    assert_eq!(page_markers(&merged), vec![1, 2, 3, 1, 2]);

    let doc = load(&merged);
    for page_id in doc.get_pages().into_values() {
        let page = doc.get_dictionary(page_id).unwrap();
        assert!(page.has(b"MediaBox"));
    }
    assert_eq!(common::image_streams(&doc).len(), 3);
}

#[test]
fn merge_of_one_document_keeps_its_pages() {
    let only = PdfBuilder::new(2).build();
    let merged = merge(&[only.as_slice()]).unwrap();
    assert_eq!(page_markers(&merged), vec![1, 2]);
}

#[test]
fn merge_rejects_bad_input() {
    assert!(matches!(merge(&[]), Err(CompactError::ProcessingError(_))));

    let good = PdfBuilder::new(1).build();
    assert!(matches!(
        merge(&[good.as_slice(), &b"not a pdf"[..]]),
        Err(CompactError::LoadError(_))
    ));
}
