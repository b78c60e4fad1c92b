// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page selection and output naming for the command line.

use std::ops::RangeInclusive;
use std::path::PathBuf;

/// Placeholder replaced by the one-based page number in output patterns.
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// A one-based, inclusive page selection: `3`, `2..5` or `4..`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSelection {
    first: usize,
    last: Option<usize>,
}

impl PageSelection {
    pub fn all() -> Self {
        Self {
            first: 1,
            last: None,
        }
    }

    /// Zero-based indices of the selected pages that exist in a document of
    /// `len` pages.
    pub fn indices(&self, len: usize) -> RangeInclusive<usize> {
        let last = self.last.unwrap_or(len).min(len);
        // An empty selection yields 1..=0.
        if last < self.first {
            return 1..=0;
        }
        (self.first - 1)..=(last - 1)
    }
}

/// `clap` value parser for `--pages`.
pub fn parse_selection(value: &str) -> Result<PageSelection, String> {
    let number = |text: &str| -> Result<usize, String> {
        match text.trim().parse::<usize>() {
            Ok(0) => Err("page numbers start at 1".to_string()),
            Ok(n) => Ok(n),
            Err(_) => Err(format!("`{text}` is not a page number")),
        }
    };

    let (first, last) = match value.split_once("..") {
        None => {
            let page = number(value)?;
            (page, Some(page))
        }
        Some((first, "")) => (number(first)?, None),
        Some((first, last)) => {
            let last = last.strip_prefix('=').unwrap_or(last);
            (number(first)?, Some(number(last)?))
        }
    };
    if let Some(last) = last
        && last < first
    {
        return Err(format!("range {value} ends before it starts"));
    }
    Ok(PageSelection { first, last })
}

/// Output path for one-based `page`, substituting every `{page}`.
pub fn output_path(pattern: &str, page: usize) -> PathBuf {
    PathBuf::from(pattern.replace(PAGE_PLACEHOLDER, &page.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_page() {
        let selection = parse_selection("3").unwrap();
        assert_eq!(selection.indices(10), 2..=2);
    }

    #[test]
    fn closed_ranges_are_inclusive() {
        assert_eq!(parse_selection("2..4").unwrap().indices(10), 1..=3);
        assert_eq!(parse_selection("2..=4").unwrap().indices(10), 1..=3);
    }

    #[test]
    fn open_ranges_run_to_the_end() {
        assert_eq!(parse_selection("4..").unwrap().indices(6), 3..=5);
        assert_eq!(PageSelection::all().indices(3), 0..=2);
    }

    #[test]
    fn selections_are_clamped_to_the_document() {
        assert_eq!(parse_selection("2..9").unwrap().indices(3), 1..=2);
        assert!(parse_selection("5").unwrap().indices(3).is_empty());
        assert!(PageSelection::all().indices(0).is_empty());
    }

    #[test]
    fn malformed_selections_are_rejected() {
        assert!(parse_selection("0").is_err());
        assert!(parse_selection("x..3").is_err());
        assert!(parse_selection("5..2").is_err());
        assert!(parse_selection("").is_err());
    }

    #[test]
    fn placeholder_takes_the_page_number() {
        assert_eq!(
            output_path("out/page-{page}.png", 7),
            PathBuf::from("out/page-7.png")
        );
        assert_eq!(output_path("cover.png", 1), PathBuf::from("cover.png"));
    }
}
