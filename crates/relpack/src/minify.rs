/// Comment-preservation policy for the minifier stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentPolicy {
    /// Strip every comment.
    None,
    /// Keep only license-style comments, marked by a `/*!` opener.
    Important,
    /// Keep every comment.
    All,
}

/// Minify artifact content: strip comments per `policy`, drop trailing
/// whitespace and whitespace-only lines. String and template literals are
/// copied through untouched, so content that merely looks like a comment
/// inside a literal survives.
pub fn minify(source: &str, policy: CommentPolicy) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            quote @ ('"' | '\'' | '`') => i = copy_literal(&chars, i, quote, &mut out),
            '/' if chars.get(i + 1) == Some(&'/') => {
                let end = line_comment_end(&chars, i);
                if policy == CommentPolicy::All {
                    out.extend(&chars[i..end]);
                }
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let important = chars.get(i + 2) == Some(&'!');
                let end = block_comment_end(&chars, i);
                let keep = match policy {
                    CommentPolicy::All => true,
                    CommentPolicy::Important => important,
                    CommentPolicy::None => false,
                };
                if keep {
                    out.extend(&chars[i..end]);
                }
                i = end;
            }
            '\n' => {
                // Trailing whitespace goes; a line left empty goes entirely
                while out.ends_with(' ') || out.ends_with('\t') {
                    out.pop();
                }
                if !(out.is_empty() || out.ends_with('\n')) {
                    out.push('\n');
                }
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Copy a string or template literal verbatim, honoring backslash escapes.
/// Returns the index just past the closing quote.
fn copy_literal(chars: &[char], start: usize, quote: char, out: &mut String) -> usize {
    out.push(chars[start]);
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        i += 1;
        if c == '\\' && i < chars.len() {
            out.push(chars[i]);
            i += 1;
        } else if c == quote {
            break;
        }
    }
    i
}

fn line_comment_end(chars: &[char], start: usize) -> usize {
    chars[start..]
        .iter()
        .position(|&c| c == '\n')
        .map_or(chars.len(), |offset| start + offset)
}

fn block_comment_end(chars: &[char], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    // Unterminated block comment runs to the end of input
    chars.len()
}
