//! Redis-style glob matching for key scans.
//!
//! Supports `*`, `?`, `[abc]`, `[^abc]`, `[a-z]` and `\` escapes.

/// Returns true if `text` matches the glob `pattern`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    matches(pattern.as_bytes(), text.as_bytes())
}

fn matches(p: &[u8], t: &[u8]) -> bool {
    match p.first() {
        None => t.is_empty(),
        Some(b'*') => {
            let rest = &p[1..];
            if rest.is_empty() {
                return true;
            }
            (0..=t.len()).any(|i| matches(rest, &t[i..]))
        }
        Some(b'?') => !t.is_empty() && matches(&p[1..], &t[1..]),
        Some(b'[') => {
            let Some((&c, t_rest)) = t.split_first() else {
                return false;
            };
            match match_class(&p[1..], c) {
                Some((hit, consumed)) => hit && matches(&p[1 + consumed..], t_rest),
                // unterminated class
                None => false,
            }
        }
        Some(b'\\') if p.len() > 1 => t.first() == Some(&p[1]) && matches(&p[2..], &t[1..]),
        Some(&c) => t.first() == Some(&c) && matches(&p[1..], &t[1..]),
    }
}

/// Tests `c` against the class body starting after `[`. Returns the outcome
/// and the number of bytes consumed including the closing `]`.
fn match_class(p: &[u8], c: u8) -> Option<(bool, usize)> {
    let negate = p.first() == Some(&b'^');
    let mut i = usize::from(negate);
    let mut hit = false;

    while i < p.len() {
        match p[i] {
            b']' => return Some((hit != negate, i + 1)),
            b'\\' if i + 1 < p.len() => {
                hit |= p[i + 1] == c;
                i += 2;
            }
            lo if i + 2 < p.len() && p[i + 1] == b'-' && p[i + 2] != b']' => {
                let hi = p[i + 2];
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                hit |= (lo..=hi).contains(&c);
                i += 3;
            }
            other => {
                hit |= other == c;
                i += 1;
            }
        }
    }
    None
}
