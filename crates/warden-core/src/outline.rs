//! Line-level outline of a block-style YAML workflow.
//!
//! The outline locates top-level keys, the jobs under `jobs:`, and any
//! `permissions` key inside them, by indentation alone. It never interprets
//! values, so every line it does not point at can be copied through verbatim.

/// A job header and the lines that belong to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpan {
    pub name: String,
    /// Index of the `name:` line.
    pub header: usize,
    /// One past the last line of the job.
    pub end: usize,
    /// Indentation of the `name:` line.
    pub indent: usize,
    /// Indentation of the job's own keys, when the job has a block body.
    pub body_indent: Option<usize>,
    /// The header carries an inline (flow) value, e.g. `build: {…}`.
    pub inline: bool,
}

/// A top-level or nested key occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLine {
    pub key: String,
    pub line: usize,
}

/// Positional index over the lines of a workflow.
#[derive(Debug)]
pub struct Outline<'a> {
    lines: Vec<&'a str>,
    eol: &'static str,
}

impl<'a> Outline<'a> {
    pub fn new(text: &'a str) -> Self {
        let eol = if text.contains("\r\n") { "\r\n" } else { "\n" };
        Self {
            lines: text.split_inclusive('\n').collect(),
            eol,
        }
    }

    pub fn lines(&self) -> &[&'a str] {
        &self.lines
    }

    /// Line terminator used by the document.
    pub fn eol(&self) -> &'static str {
        self.eol
    }

    /// Keys at column zero, in document order.
    pub fn top_level_keys(&self) -> Vec<KeyLine> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| is_content(line) && indent_of(line) == 0)
            .filter_map(|(i, line)| {
                split_key(line).map(|(key, _)| KeyLine { key, line: i })
            })
            .collect()
    }

    pub fn top_level_key(&self, key: &str) -> Option<KeyLine> {
        self.top_level_keys().into_iter().find(|k| k.key == key)
    }

    /// One past the last line owned by the key on line `header`: the next
    /// content line indented no deeper than the header, or the end of text.
    pub fn section_end(&self, header: usize) -> usize {
        let indent = indent_of(self.lines[header]);
        (header + 1..self.lines.len())
            .find(|&i| is_content(self.lines[i]) && indent_of(self.lines[i]) <= indent)
            .unwrap_or(self.lines.len())
    }

    /// Like `section_end`, but trailing blank and comment lines are left out
    /// of the section so they stay attached to whatever follows.
    pub fn section_content_end(&self, header: usize) -> usize {
        let mut end = self.section_end(header);
        while end > header + 1 && !is_content(self.lines[end - 1]) {
            end -= 1;
        }
        end
    }

    /// Where a new top-level key may be inserted before the key on `line`:
    /// directly above it, or above the comment lines attached to it.
    pub fn insertion_point_before(&self, line: usize) -> usize {
        let mut at = line;
        while at > 0 && is_comment(self.lines[at - 1]) {
            at -= 1;
        }
        at
    }

    /// Every job declared in block style under the top-level `jobs:` key.
    pub fn jobs(&self) -> Vec<JobSpan> {
        let Some(jobs) = self.top_level_key("jobs") else {
            return Vec::new();
        };
        if has_inline_value(self.lines[jobs.line]) {
            return Vec::new();
        }
        let end = self.section_end(jobs.line);

        let Some(job_indent) = (jobs.line + 1..end)
            .find(|&i| is_content(self.lines[i]))
            .map(|i| indent_of(self.lines[i]))
        else {
            return Vec::new();
        };

        let mut spans = Vec::new();
        for i in jobs.line + 1..end {
            let line = self.lines[i];
            if !is_content(line) || indent_of(line) != job_indent {
                continue;
            }
            let Some((name, _)) = split_key(line) else {
                continue;
            };
            let job_end = self.section_end(i);
            let body_indent = (i + 1..job_end)
                .find(|&j| is_content(self.lines[j]))
                .map(|j| indent_of(self.lines[j]));
            spans.push(JobSpan {
                name,
                header: i,
                end: job_end,
                indent: job_indent,
                body_indent,
                inline: has_inline_value(line),
            });
        }
        spans
    }

    pub fn job(&self, name: &str) -> Option<JobSpan> {
        self.jobs().into_iter().find(|j| j.name == name)
    }

    /// The `permissions` key directly inside `job`, if present.
    pub fn job_permissions(&self, job: &JobSpan) -> Option<KeyLine> {
        let body_indent = job.body_indent?;
        (job.header + 1..job.end)
            .filter(|&i| is_content(self.lines[i]) && indent_of(self.lines[i]) == body_indent)
            .find_map(|i| match split_key(self.lines[i]) {
                Some((key, _)) if key == "permissions" => Some(KeyLine { key, line: i }),
                _ => None,
            })
    }

    /// Indentation step used by the document, from the first nested key.
    pub fn indent_unit(&self) -> usize {
        self.lines
            .iter()
            .filter(|line| is_content(line))
            .map(|line| indent_of(line))
            .find(|&n| n > 0)
            .unwrap_or(2)
    }

    /// True when the text does not end in a line terminator.
    pub fn missing_final_eol(&self) -> bool {
        self.lines.last().is_some_and(|l| !l.ends_with('\n'))
    }
}

pub(crate) fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// A line that carries YAML content: not blank, not a comment, not a
/// document marker.
fn is_content(line: &str) -> bool {
    let trimmed = line.trim();
    !(trimmed.is_empty()
        || trimmed.starts_with('#')
        || (indent_of(line) == 0 && (trimmed == "---" || trimmed == "...")))
}

/// True when the key on `line` carries its value on the same line. Anchors
/// (`&name`) and tags (`!tag`) alone still introduce a block on the next lines.
fn has_inline_value(line: &str) -> bool {
    split_key(line).is_some_and(|(_, rest)| {
        rest.split_whitespace()
            .find(|token| !token.starts_with('&') && !token.starts_with('!'))
            .is_some_and(|token| !token.starts_with('#'))
    })
}

/// Split a mapping line into its (unquoted) key and the text after the colon.
fn split_key(line: &str) -> Option<(String, &str)> {
    let body = line.trim_start();
    if body.starts_with('#') || body.starts_with('-') {
        return None;
    }

    let (key, rest) = match body.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let close = body[1..].find(quote)? + 1;
            let rest = body[close + 1..].trim_start().strip_prefix(':')?;
            (body[1..close].to_string(), rest)
        }
        _ => {
            let mut chars = body.char_indices().peekable();
            let colon = loop {
                let (i, c) = chars.next()?;
                if c == ':' && chars.peek().map_or(true, |&(_, next)| next.is_whitespace()) {
                    break i;
                }
            };
            (body[..colon].trim_end().to_string(), &body[colon + 1..])
        }
    };

    if key.is_empty() {
        return None;
    }
    Some((key, rest))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
