// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
use tessera_engine::blocks::catalog::*;
use tessera_engine::Node;

#[allow(dead_code)]
pub fn generate_markdown_content(size: usize) -> String {
    let base = concat!(
        "# Title\n\n## Section\n\nParagraph with some content.\n\n",
        "- Bullet point\n  - Nested item\n- Another item\n\n",
        "> A quote\n> over two lines\n\n",
        "```rust\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n",
    );
    base.repeat(size)
}

/// A document of `sections` blocks, cycling through the nested structures.
#[allow(dead_code)]
pub fn generate_nested_document(sections: usize) -> Node {
    let mut blocks = Vec::with_capacity(sections);
    for section in 0..sections {
        let text = format!("Section {section}");
        let block = match section % 4 {
            0 => Node::text(PARAGRAPH, text),
            1 => Node::blocks(
                QUOTE,
                vec![
                    Node::text(PARAGRAPH, text),
                    Node::text(PARAGRAPH, "more"),
                ],
            ),
            2 => Node::blocks(
                TOGGLE,
                vec![
                    Node::text(TOGGLE_TITLE, text),
                    Node::blocks(TOGGLE_CONTENT, vec![Node::text(PARAGRAPH, "hidden")]),
                ],
            ),
            _ => Node::blocks(
                COLUMN_LAYOUT,
                vec![
                    Node::blocks(COLUMN, vec![Node::text(PARAGRAPH, text)]),
                    Node::blocks(COLUMN, vec![Node::text(PARAGRAPH, "right")]),
                ],
            ),
        };
        blocks.push(block);
    }
    Node::blocks(DOC, blocks)
}
