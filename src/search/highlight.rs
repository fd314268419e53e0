use std::ops::Range;

/// A piece of a cell value, either plain or a keyword match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub marked: bool,
}

impl<'a> Segment<'a> {
    fn plain(text: &'a str) -> Self {
        Segment {
            text,
            marked: false,
        }
    }

    fn marked(text: &'a str) -> Self {
        Segment { text, marked: true }
    }
}

/// Split `text` into plain and marked segments for every case-insensitive
/// occurrence of `keyword`. An empty keyword yields the whole text unmarked.
pub fn highlight<'a>(text: &'a str, keyword: &str) -> Vec<Segment<'a>> {
    if keyword.is_empty() {
        return vec![Segment::plain(text)];
    }
    let ranges = match_ranges(text, keyword);
    if ranges.is_empty() {
        return vec![Segment::plain(text)];
    }

    let mut segments = Vec::with_capacity(ranges.len() * 2 + 1);
    let mut pos = 0;
    for range in ranges {
        if range.start > pos {
            segments.push(Segment::plain(&text[pos..range.start]));
        }
        segments.push(Segment::marked(&text[range.clone()]));
        pos = range.end;
    }
    if pos < text.len() {
        segments.push(Segment::plain(&text[pos..]));
    }
    segments
}

/// Byte ranges of non-overlapping, case-insensitive matches, left to right.
///
/// Matching runs on the lowercased form, but every range starts and ends on a
/// char boundary of the original text.
pub fn match_ranges(text: &str, keyword: &str) -> Vec<Range<usize>> {
    let needle = fold_needle(keyword);
    if needle.is_empty() {
        return Vec::new();
    }
    let folded = fold(text);

    let mut ranges = Vec::new();
    let mut i = 0;
    while let Some(start) = find_from(&folded, &needle, i) {
        let end = start + needle.len();
        let stop = folded.get(end).map_or(text.len(), |&(_, offset)| offset);
        ranges.push(folded[start].1..stop);
        i = end;
    }
    ranges
}

/// True iff `keyword` occurs in `text` by the same rule [`match_ranges`] uses.
/// An empty keyword is contained everywhere.
pub fn contains_match(text: &str, keyword: &str) -> bool {
    let needle = fold_needle(keyword);
    needle.is_empty() || find_from(&fold(text), &needle, 0).is_some()
}

// Lowercase char by char. `str::to_lowercase` is context sensitive (final sigma)
// and would disagree with the offsets kept in `fold`.
fn fold_needle(keyword: &str) -> Vec<char> {
    keyword.chars().flat_map(char::to_lowercase).collect()
}

// (lowercased char, byte offset of the original char it came from)
fn fold(text: &str) -> Vec<(char, usize)> {
    text.char_indices()
        .flat_map(|(offset, c)| c.to_lowercase().map(move |lc| (lc, offset)))
        .collect()
}

fn find_from(folded: &[(char, usize)], needle: &[char], from: usize) -> Option<usize> {
    let char_start = |i: usize| i == 0 || i == folded.len() || folded[i].1 != folded[i - 1].1;
    (from..=folded.len().checked_sub(needle.len())?).find(|&i| {
        let end = i + needle.len();
        char_start(i)
            && char_start(end)
            && folded[i..end].iter().map(|&(c, _)| c).eq(needle.iter().copied())
    })
}
