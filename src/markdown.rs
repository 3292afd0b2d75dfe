//! Converts article paragraphs to HTML. Each entry of an article's `content`
//! is rendered as its own markdown document, so a paragraph is never merged
//! with its neighbours and a `#`-prefixed entry becomes a heading.

use pulldown_cmark::{html, Event, Options, Parser, Tag};

/// Article headings are demoted by this many levels so that `#` sits below
/// the article title (h1) rather than competing with it.
const HEADING_OFFSET: u32 = 1;

/// The deepest heading HTML supports.
const MAX_HEADING: u32 = 6;

/// Renders each paragraph into `out`, in order.
pub fn to_html<S: AsRef<str>>(out: &mut String, paragraphs: &[S]) {
    for paragraph in paragraphs {
        push_paragraph(out, paragraph.as_ref());
    }
}

/// Renders a single paragraph, e.g., an article's lead on listing pages.
pub fn paragraph_to_html(paragraph: &str) -> String {
    let mut out = String::new();
    push_paragraph(&mut out, paragraph);
    out
}

/// Escapes text for inclusion in HTML.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a `String` can't fail.
    let _ = pulldown_cmark::escape::escape_html(&mut out, text);
    out
}

fn push_paragraph(out: &mut String, paragraph: &str) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    html::push_html(out, Parser::new_ext(paragraph, options).map(convert));
}

fn convert(ev: Event) -> Event {
    match ev {
        Event::Start(Tag::Heading(level)) => Event::Start(Tag::Heading(demote(level))),
        Event::End(Tag::Heading(level)) => Event::End(Tag::Heading(demote(level))),
        _ => ev,
    }
}

fn demote(level: u32) -> u32 {
    (level + HEADING_OFFSET).min(MAX_HEADING)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_paragraphs_and_headings() {
        let mut out = String::new();
        to_html(
            &mut out,
            &["# The Vibe", "Plain *words* and `code`.", "###### Deep"],
        );
        assert_eq!(
            "<h2>The Vibe</h2>\n<p>Plain <em>words</em> and <code>code</code>.</p>\n<h6>Deep</h6>\n",
            out
        );
    }

    #[test]
    fn test_list_paragraph() {
        assert_eq!(
            "<ul>\n<li>Source one</li>\n</ul>\n",
            paragraph_to_html("* Source one")
        );
    }

    #[test]
    fn test_escape() {
        assert_eq!("Tom &amp; &lt;Jerry&gt;", escape("Tom & <Jerry>"));
    }
}
