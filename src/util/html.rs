use std::borrow::Cow;

/// Elements whose text content is dropped together with their tags, with
/// the prefix that starts their closing tag.
const SKIP_CONTENT_TAGS: [(&str, &str); 2] = [("script", "</script"), ("style", "</style")];

/// Longest entity name we try to decode (`&CounterClockwiseContourIntegral;`).
const MAX_ENTITY_LEN: usize = 32;

/// Strips all markup from an entry body, leaving plain text.
///
/// The policy is strip, not escape: tags, comments and the contents of
/// `<script>`/`<style>` are removed, character references are decoded and
/// whitespace runs are collapsed to single spaces. References that decode to
/// `<` or `>` stay encoded so decoding can never reintroduce markup.
///
/// A `<` only opens a tag when followed by a letter, `/`, `!` or `?`; any
/// other `<` is kept as text.
///
/// Runs in a single pass over the input; the output is never rescanned.
/// Returns `Cow::Borrowed` when the input is already plain, normalized text.
///
/// # Examples
///
/// ```
/// use rssbox::util::strip_tags;
///
/// assert_eq!(strip_tags("<p>Hello <b>World</b></p>"), "Hello World");
/// assert_eq!(strip_tags("Fish &amp; Chips"), "Fish & Chips");
/// assert_eq!(strip_tags("1 < 2"), "1 < 2");
/// ```
pub fn strip_tags(input: &str) -> Cow<'_, str> {
    if !input.bytes().any(|b| b == b'<' || b == b'&') && is_collapsed(input) {
        return Cow::Borrowed(input);
    }

    let mut text = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(['<', '&']) {
        text.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(body) = tail.strip_prefix('<') {
            rest = match skip_markup(body) {
                Some(after) => rejoin(&mut text, after),
                None => {
                    text.push('<');
                    body
                }
            };
        } else {
            let consumed = decode_entity(tail, &mut text);
            rest = &tail[consumed..];
        }
    }
    text.push_str(rest);

    Cow::Owned(text.split_whitespace().collect::<Vec<&str>>().join(" "))
}

/// Removing markup can leave a literal `<` right before text that opens a
/// tag ("<<b>i>"). Such a pair is markup as well and is skipped here.
fn rejoin<'a>(text: &mut String, mut after: &'a str) -> &'a str {
    while text.ends_with('<') && after.chars().next().is_some_and(opens_tag) {
        match skip_markup(after) {
            Some(next) => {
                text.pop();
                after = next;
            }
            None => break,
        }
    }
    after
}

/// Skips one markup construct whose `<` has already been consumed.
///
/// Returns the remaining input, or `None` if the `<` does not open markup.
fn skip_markup(body: &str) -> Option<&str> {
    if let Some(comment) = body.strip_prefix("!--") {
        return Some(comment.find("-->").map_or("", |end| &comment[end + 3..]));
    }

    if !body.chars().next().is_some_and(opens_tag) {
        return None;
    }

    let Some(end) = find_tag_end(body) else {
        // Unterminated tag runs to the end of input
        return Some("");
    };
    let tag = &body[..=end];
    let after = &body[end + 1..];

    let name_len = tag.bytes().take_while(u8::is_ascii_alphanumeric).count();
    let name = &tag[..name_len];
    let skipped = SKIP_CONTENT_TAGS
        .iter()
        .find(|(skip, _)| name.eq_ignore_ascii_case(skip));

    match skipped {
        Some((_, closing)) if !tag.ends_with("/>") => {
            Some(match find_ignore_ascii_case(after, closing) {
                Some(start) => {
                    let close_body = &after[start + 1..];
                    find_tag_end(close_body).map_or("", |e| &close_body[e + 1..])
                }
                None => "",
            })
        }
        _ => Some(after),
    }
}

/// Byte index of the `>` closing the tag that `body` starts, ignoring any
/// `>` inside quoted attribute values.
fn find_tag_end(body: &str) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, b) in body.bytes().enumerate() {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Decodes the character reference at the start of `tail` (which begins
/// with `&`) into `out`. Returns the number of bytes consumed.
fn decode_entity(tail: &str, out: &mut String) -> usize {
    let name_len = tail[1..]
        .bytes()
        .take(MAX_ENTITY_LEN)
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'#')
        .count();
    if name_len == 0 || !tail[1 + name_len..].starts_with(';') {
        out.push('&');
        return 1;
    }

    let raw = &tail[..name_len + 2];
    let decoded = html_escape::decode_html_entities(raw);
    let forms_markup = decoded.contains(['<', '>', '\0'])
        || (out.ends_with('<') && decoded.chars().next().is_some_and(opens_tag));

    if forms_markup {
        out.push_str(raw);
    } else {
        out.push_str(&decoded);
    }
    raw.len()
}

fn opens_tag(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?')
}

/// True if `s` has no leading/trailing whitespace and no whitespace other
/// than single spaces.
fn is_collapsed(s: &str) -> bool {
    let mut prev_space = true;
    for c in s.chars() {
        if c.is_whitespace() {
            if c != ' ' || prev_space {
                return false;
            }
            prev_space = true;
        } else {
            prev_space = false;
        }
    }
    s.is_empty() || !prev_space
}
