// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page range parsing: "1,3-5" <-> zero-based page indices.

use std::collections::BTreeSet;

/// Parse a 1-based page range expression into sorted, unique, zero-based
/// indices that fall inside `[0, max_pages)`.
///
/// Tokens are comma separated; each is a page number or an inclusive
/// `start-end` range. Reversed ranges yield nothing, out-of-range pages are
/// dropped and tokens that are not numbers are ignored. Nothing here fails:
/// the worst case is an empty list.
pub fn parse_ranges(input: &str, max_pages: usize) -> Vec<usize> {
    let mut pages = BTreeSet::new();

    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        match token.split_once('-') {
            Some((start, end)) => {
                let (Some(start), Some(end)) = (parse_page(start), parse_page(end)) else {
                    continue;
                };
                // Clamp before iterating so "1-999999999" stays cheap.
                let end = end.min(max_pages as i64);
                for page in start.max(1)..=end {
                    pages.insert(page);
                }
            }
            None => {
                if let Some(page) = parse_page(token) {
                    pages.insert(page);
                }
            }
        }
    }

    pages
        .into_iter()
        .filter(|&page| page >= 1 && page <= max_pages as i64)
        .map(|page| (page - 1) as usize)
        .collect()
}

/// Render sorted zero-based indices back into compact 1-based syntax, e.g.
/// `[0, 2, 3, 4]` becomes `"1,3-5"`. Unsorted or duplicated input is
/// normalised first.
pub fn to_range_string(indices: &[usize]) -> String {
    let sorted: BTreeSet<usize> = indices.iter().copied().collect();
    let mut parts = Vec::new();
    let mut iter = sorted.into_iter().peekable();

    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        if start == end {
            parts.push(format!("{}", start + 1));
        } else {
            parts.push(format!("{}-{}", start + 1, end + 1));
        }
    }

    parts.join(",")
}

/// Leading-integer parse in the manner of a lenient form field: "3abc" is 3,
/// "abc" is nothing.
fn parse_page(token: &str) -> Option<i64> {
    let token = token.trim();
    let digits = token.strip_prefix('+').unwrap_or(token);
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<i64>().ok()
}
