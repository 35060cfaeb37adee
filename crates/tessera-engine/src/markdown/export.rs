use crate::blocks::catalog::*;
use crate::models::{InlineRun, Mark, Node};

/// Renders a document tree as Markdown.
///
/// Consecutive list items are written on adjacent lines; every other block is
/// separated by a blank line. Kinds without a Markdown form fall back to
/// their text (toggles use a `<details>` element).
pub fn export(root: &Node) -> String {
    let mut out = String::new();
    write_blocks(root.children(), &mut out);
    out.push('\n');
    out
}

fn write_blocks(blocks: &[Node], out: &mut String) {
    let mut previous_was_item = false;
    let mut first = true;
    for block in blocks {
        let is_item = is_list_item(block);
        let rendered = render_block(block);
        if !first {
            out.push_str(if previous_was_item && is_item { "\n" } else { "\n\n" });
        }
        out.push_str(&rendered);
        previous_was_item = is_item;
        first = false;
    }
}

fn is_list_item(node: &Node) -> bool {
    matches!(
        node.kind.as_str(),
        BULLET_LIST_ITEM | NUMBERED_LIST_ITEM | TODO_ITEM
    )
}

fn render_block(node: &Node) -> String {
    let indent = "  ".repeat(attr_u64(node, "indent") as usize);
    match node.kind.as_str() {
        HEADING => {
            let level = attr_u64(node, "level").clamp(1, 6) as usize;
            format!("{} {}", "#".repeat(level), render_inline(node.inline()))
        }
        BULLET_LIST_ITEM => format!("{indent}- {}", render_inline(node.inline())),
        NUMBERED_LIST_ITEM => format!("{indent}1. {}", render_inline(node.inline())),
        TODO_ITEM => {
            let checked = node
                .attrs
                .get("checked")
                .and_then(|value| value.as_bool())
                .unwrap_or(false);
            let marker = if checked { "x" } else { " " };
            format!("{indent}- [{marker}] {}", render_inline(node.inline()))
        }
        CODE_BLOCK => format!(
            "```{}\n{}\n```",
            attr_str(node, "language"),
            node.plain_text()
        ),
        QUOTE => quote_lines(&render_children(node), ""),
        CALLOUT => quote_lines(&render_children(node), attr_str(node, "emoji")),
        TOGGLE => {
            let title = node
                .children()
                .iter()
                .find(|slot| slot.is_textblock())
                .map(|slot| render_inline(slot.inline()))
                .unwrap_or_default();
            let body = node
                .children()
                .iter()
                .find(|slot| slot.has_blocks())
                .map(render_children)
                .unwrap_or_default();
            format!("<details>\n<summary>{title}</summary>\n\n{body}\n\n</details>")
        }
        COLUMN_LAYOUT => {
            let columns: Vec<String> = node.children().iter().map(render_children).collect();
            columns.join("\n\n")
        }
        DIVIDER => "---".to_string(),
        IMAGE => format!("![{}]({})", attr_str(node, "alt"), attr_str(node, "src")),
        TABLE => render_table(node),
        LINKED_PAGE => format!(
            "[{}](page:{})",
            attr_str(node, "title"),
            attr_str(node, "pageId")
        ),
        _ => match &node.content {
            crate::models::NodeContent::Blocks(_) => render_children(node),
            _ => render_inline(node.inline()),
        },
    }
}

fn render_children(node: &Node) -> String {
    let mut out = String::new();
    write_blocks(node.children(), &mut out);
    out
}

fn quote_lines(body: &str, lead: &str) -> String {
    let mut lines = Vec::new();
    for (i, line) in body.lines().enumerate() {
        let line = if i == 0 && !lead.is_empty() {
            format!("{lead} {line}")
        } else {
            line.to_string()
        };
        lines.push(if line.is_empty() {
            ">".to_string()
        } else {
            format!("> {line}")
        });
    }
    lines.join("\n")
}

fn render_table(node: &Node) -> String {
    let rows: Vec<Vec<String>> = node
        .attrs
        .get("rows")
        .and_then(|rows| serde_json::from_value(rows.clone()).ok())
        .unwrap_or_default();
    let Some(header) = rows.first() else {
        return String::new();
    };

    let mut lines = vec![table_row(header)];
    lines.push(table_row(&vec!["---".to_string(); header.len()]));
    lines.extend(rows.iter().skip(1).map(|row| table_row(row)));
    lines.join("\n")
}

fn table_row(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

/// Renders inline runs, wrapping each in its marks.
pub fn render_inline(runs: &[InlineRun]) -> String {
    let mut out = String::new();
    for run in runs {
        let mut text = run.text.clone();
        if run.marks.contains(&Mark::Code) {
            text = format!("`{text}`");
        }
        if run.marks.contains(&Mark::Italic) {
            text = format!("*{text}*");
        }
        if run.marks.contains(&Mark::Bold) {
            text = format!("**{text}**");
        }
        if run.marks.contains(&Mark::Strike) {
            text = format!("~~{text}~~");
        }
        for mark in &run.marks {
            if let Mark::Link { href } = mark {
                text = format!("[{text}]({href})");
            }
        }
        out.push_str(&text);
    }
    out
}

fn attr_u64(node: &Node, key: &str) -> u64 {
    node.attrs
        .get(key)
        .and_then(|value| value.as_u64())
        .unwrap_or(0)
}

fn attr_str<'a>(node: &'a Node, key: &str) -> &'a str {
    node.attrs
        .get(key)
        .and_then(|value| value.as_str())
        .unwrap_or("")
}
