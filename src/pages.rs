//! Page specification parsing
//!
//! Turns strings such as `"1, 3-5, 2"` into zero-based page indices. The
//! parser is forgiving: bad tokens are dropped one at a time and a selection
//! that yields nothing falls back to every page in natural order.

use tracing::debug;

/// A single comma-separated token of a page specification (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageToken {
    Single(i64),
    Range(i64, i64),
}

/// Resolve a page specification against a document with `total_pages` pages.
///
/// Returns zero-based indices in the order they were written. Duplicates are
/// kept, so `"1,1"` selects the first page twice.
pub fn resolve_page_spec(spec: &str, total_pages: u32) -> Vec<u32> {
    let total = i64::from(total_pages);
    let mut selected = Vec::new();

    for raw in spec.split(',') {
        let token = raw.trim();
        if token.is_empty() {
            continue;
        }

        match parse_token(token) {
            Some(PageToken::Single(page)) => {
                if (1..=total).contains(&page) {
                    selected.push((page - 1) as u32);
                } else {
                    debug!(page, total_pages, "Dropping out-of-range page");
                }
            }
            Some(PageToken::Range(start, end)) => expand_range(start, end, total, &mut selected),
            None => debug!(token, "Ignoring malformed page token"),
        }
    }

    if selected.is_empty() {
        return all_pages(total_pages);
    }
    selected
}

/// Identity selection `[0, 1, ..., total_pages - 1]`
pub fn all_pages(total_pages: u32) -> Vec<u32> {
    (0..total_pages).collect()
}

fn parse_token(token: &str) -> Option<PageToken> {
    if token.contains('-') {
        let mut parts = token.split('-');
        let start = parse_number(parts.next()?)?;
        let end = parse_number(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }
        Some(PageToken::Range(start, end))
    } else {
        parse_number(token).map(PageToken::Single)
    }
}

fn parse_number(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}

/// Append the 1-based inclusive range `start..=end`, clipped to the document.
///
/// Forward ranges ascend, backward ranges descend. Edges beyond the document
/// are clipped rather than rejected.
fn expand_range(start: i64, end: i64, total: i64, selected: &mut Vec<u32>) {
    if start <= end {
        let low = start.max(1);
        let high = end.min(total);
        selected.extend((low..=high).map(|page| (page - 1) as u32));
    } else {
        let high = start.min(total);
        let low = end.max(1);
        selected.extend((low..=high).rev().map(|page| (page - 1) as u32));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1,2,3", 3, vec![0, 1, 2])]
    #[case("3-1", 3, vec![2, 1, 0])]
    #[case("5-10", 3, vec![0, 1, 2])]
    #[case("", 5, vec![0, 1, 2, 3, 4])]
    #[case("abc,2", 4, vec![1])]
    #[case("1, 3-5, 2", 6, vec![0, 2, 3, 4, 1])]
    #[case("2,2,2", 3, vec![1, 1, 1])]
    #[case(" 2 - 3 ", 4, vec![1, 2])]
    fn resolves_specifications(#[case] spec: &str, #[case] total: u32, #[case] expected: Vec<u32>) {
        assert_eq!(resolve_page_spec(spec, total), expected);
    }

    #[test]
    fn range_edges_are_clipped() {
        assert_eq!(resolve_page_spec("0-2", 5), vec![0, 1]);
        assert_eq!(resolve_page_spec("4-9", 5), vec![3, 4]);
        assert_eq!(resolve_page_spec("9-4", 5), vec![4, 3]);
    }

    #[test]
    fn out_of_range_singles_are_dropped() {
        assert_eq!(resolve_page_spec("0,7,2", 3), vec![1]);
    }

    #[test]
    fn malformed_tokens_are_skipped_individually() {
        assert_eq!(resolve_page_spec("1-2-3,-3,3-,x-1,2", 4), vec![1]);
    }

    #[test]
    fn garbage_falls_back_to_natural_order() {
        assert_eq!(resolve_page_spec("foo, bar ,,", 3), vec![0, 1, 2]);
    }

    #[test]
    fn empty_document_selects_nothing() {
        assert!(resolve_page_spec("1-3", 0).is_empty());
    }
}
