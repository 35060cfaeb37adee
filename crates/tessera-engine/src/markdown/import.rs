use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde_json::{Value, json};

use crate::blocks::catalog::*;
use crate::models::{Attrs, InlineRun, Mark, Node};

/// A textblock still receiving inline content.
struct OpenBlock {
    kind: &'static str,
    attrs: Attrs,
    runs: Vec<InlineRun>,
}

struct ImageState {
    src: String,
    alt: String,
}

#[derive(Default)]
struct Builder {
    /// Children of the root followed by one frame per open block quote.
    frames: Vec<Vec<Node>>,
    /// `true` for ordered lists.
    lists: Vec<bool>,
    open: Option<OpenBlock>,
    marks: Vec<Mark>,
    code: Option<(String, String)>,
    image: Option<ImageState>,
    table: Option<Vec<Vec<String>>>,
}

/// Parses Markdown into a document tree.
///
/// Headings deeper than level 3 are clamped to 3, nested lists are flattened
/// into list-item blocks carrying an `indent` attribute, and thematic breaks,
/// images and tables become atoms. Raw HTML is kept as text.
pub fn import(content: &str) -> Node {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut builder = Builder {
        frames: vec![Vec::new()],
        ..Default::default()
    };
    for event in Parser::new_ext(content, options) {
        builder.event(event);
    }
    builder.finish()
}

impl Builder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => self.text(&text),
            Event::Code(text) => {
                self.marks.push(Mark::Code);
                self.text(&text);
                self.marks.pop();
            }
            Event::SoftBreak => self.text(" "),
            Event::HardBreak => self.text("\n"),
            Event::Rule => {
                self.flush();
                self.push(Node::atom(DIVIDER));
            }
            Event::TaskListMarker(checked) => {
                if let Some(open) = self.open.as_mut() {
                    open.kind = TODO_ITEM;
                    open.attrs.insert("checked".into(), Value::Bool(checked));
                }
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.open.is_none() {
                    self.open_block(PARAGRAPH, Attrs::new());
                } else if self.open.as_ref().is_some_and(|open| !open.runs.is_empty()) {
                    self.text(" ");
                }
            }
            Tag::Heading { level, .. } => {
                self.flush();
                let level = match level {
                    HeadingLevel::H1 => 1,
                    HeadingLevel::H2 => 2,
                    _ => 3,
                };
                let mut attrs = Attrs::new();
                attrs.insert("level".into(), json!(level));
                self.open_block(HEADING, attrs);
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.frames.push(Vec::new());
            }
            Tag::CodeBlock(kind) => {
                self.flush();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().unwrap_or("").to_string()
                    }
                    CodeBlockKind::Indented => String::new(),
                };
                self.code = Some((language, String::new()));
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start.is_some());
            }
            Tag::Item => {
                self.flush();
                let ordered = self.lists.last().copied().unwrap_or(false);
                let mut attrs = Attrs::new();
                attrs.insert("indent".into(), json!(self.lists.len().saturating_sub(1)));
                let kind = if ordered {
                    NUMBERED_LIST_ITEM
                } else {
                    BULLET_LIST_ITEM
                };
                self.open_block(kind, attrs);
            }
            Tag::Emphasis => self.marks.push(Mark::Italic),
            Tag::Strong => self.marks.push(Mark::Bold),
            Tag::Strikethrough => self.marks.push(Mark::Strike),
            Tag::Link { dest_url, .. } => self.marks.push(Mark::Link {
                href: dest_url.to_string(),
            }),
            Tag::Image { dest_url, .. } => {
                self.image = Some(ImageState {
                    src: dest_url.to_string(),
                    alt: String::new(),
                });
            }
            Tag::Table(_) => {
                self.flush();
                self.table = Some(Vec::new());
            }
            Tag::TableHead | Tag::TableRow => {
                if let Some(rows) = self.table.as_mut() {
                    rows.push(Vec::new());
                }
            }
            Tag::TableCell => {
                if let Some(row) = self.table.as_mut().and_then(|rows| rows.last_mut()) {
                    row.push(String::new());
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if self.lists.is_empty() {
                    self.flush();
                }
            }
            TagEnd::Heading(_) | TagEnd::Item => self.flush(),
            TagEnd::BlockQuote(_) => {
                self.flush();
                if self.frames.len() > 1 {
                    let mut children = self.frames.pop().unwrap_or_default();
                    if children.is_empty() {
                        children.push(Node::text(PARAGRAPH, ""));
                    }
                    self.push(Node::blocks(QUOTE, children));
                }
            }
            TagEnd::CodeBlock => {
                if let Some((language, mut text)) = self.code.take() {
                    if text.ends_with('\n') {
                        text.pop();
                    }
                    self.push(Node::text(CODE_BLOCK, text).with_attr("language", language));
                }
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
            }
            TagEnd::Emphasis => self.pop_mark(|mark| *mark == Mark::Italic),
            TagEnd::Strong => self.pop_mark(|mark| *mark == Mark::Bold),
            TagEnd::Strikethrough => self.pop_mark(|mark| *mark == Mark::Strike),
            TagEnd::Link => self.pop_mark(|mark| matches!(mark, Mark::Link { .. })),
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    self.flush();
                    self.push(
                        Node::atom(IMAGE)
                            .with_attr("src", image.src)
                            .with_attr("alt", image.alt),
                    );
                }
            }
            TagEnd::Table => {
                if let Some(rows) = self.table.take() {
                    self.push(Node::atom(TABLE).with_attr("rows", json!(rows)));
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some((_, code)) = self.code.as_mut() {
            code.push_str(text);
            return;
        }
        if let Some(image) = self.image.as_mut() {
            image.alt.push_str(text);
            return;
        }
        if let Some(rows) = self.table.as_mut() {
            if let Some(cell) = rows.last_mut().and_then(|row| row.last_mut()) {
                cell.push_str(text);
            }
            return;
        }
        if self.open.is_none() {
            self.open_block(PARAGRAPH, Attrs::new());
        }
        let marks = self.marks.clone();
        if let Some(open) = self.open.as_mut() {
            open.runs.push(InlineRun::marked(text, marks));
        }
    }

    fn pop_mark(&mut self, is_match: impl Fn(&Mark) -> bool) {
        if let Some(index) = self.marks.iter().rposition(is_match) {
            self.marks.remove(index);
        }
    }

    fn open_block(&mut self, kind: &'static str, attrs: Attrs) {
        self.open = Some(OpenBlock {
            kind,
            attrs,
            runs: Vec::new(),
        });
    }

    /// Closes the open textblock. Empty paragraphs are dropped.
    fn flush(&mut self) {
        let Some(open) = self.open.take() else {
            return;
        };
        let node = Node::textblock(open.kind, open.runs).with_attrs(open.attrs);
        if node.kind == PARAGRAPH && node.content_size() == 0 {
            return;
        }
        self.push(node);
    }

    fn push(&mut self, node: Node) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push(node);
        }
    }

    fn finish(mut self) -> Node {
        self.flush();
        while self.frames.len() > 1 {
            let children = self.frames.pop().unwrap_or_default();
            if !children.is_empty() {
                self.push(Node::blocks(QUOTE, children));
            }
        }
        let mut children = self.frames.pop().unwrap_or_default();
        if children.is_empty() {
            children.push(Node::text(PARAGRAPH, ""));
        }
        Node::blocks(DOC, children)
    }
}
