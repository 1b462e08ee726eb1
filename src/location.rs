use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Line start offsets for a source buffer, for repeated offset lookups.
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { starts }
    }

    /// Convert a byte offset into (line, col), both 1-indexed.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&s| s <= offset);
        let line_start = self.starts[line.saturating_sub(1)];
        (line.max(1), offset - line_start + 1)
    }
}

/// Convert a byte offset into (line, col), both 1-indexed.
pub fn offset_to_line_col(offset: usize, source: &str) -> (usize, usize) {
    LineIndex::new(source).line_col(offset)
}

/// A set of 1-based line numbers, written on the command line as
/// comma-separated numbers and inclusive ranges: `3,10-12`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineSet {
    lines: BTreeSet<usize>,
}

impl LineSet {
    pub fn insert(&mut self, line: usize) {
        self.lines.insert(line);
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn contains(&self, line: usize) -> bool {
        self.lines.contains(&line)
    }

    /// Any line in `first..=last` is in the set.
    pub fn overlaps(&self, first: usize, last: usize) -> bool {
        first <= last && self.lines.range(first..=last).next().is_some()
    }
}

impl FromIterator<usize> for LineSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().collect(),
        }
    }
}

impl FromStr for LineSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let number = |t: &str| match t.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(format!("invalid line number `{}`", t.trim())),
        };
        let mut set = LineSet::default();
        for part in s.split(',').filter(|p| !p.trim().is_empty()) {
            match part.split_once('-') {
                Some((from, to)) => {
                    let (from, to) = (number(from)?, number(to)?);
                    if from > to {
                        return Err(format!("empty line range `{}`", part.trim()));
                    }
                    set.lines.extend(from..=to);
                }
                None => set.insert(number(part)?),
            }
        }
        if set.is_empty() {
            return Err("no line numbers given".to_string());
        }
        Ok(set)
    }
}

impl fmt::Display for LineSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut iter = self.lines.iter().copied().peekable();
        while let Some(start) = iter.next() {
            let mut end = start;
            while iter.peek() == Some(&(end + 1)) {
                end += 1;
                iter.next();
            }
            if !first {
                f.write_str(",")?;
            }
            first = false;
            if start == end {
                write!(f, "{start}")?;
            } else {
                write!(f, "{start}-{end}")?;
            }
        }
        Ok(())
    }
}
