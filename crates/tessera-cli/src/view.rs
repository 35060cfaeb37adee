use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};
use tessera_engine::{
    BlockTypeRegistry, Node,
    blocks::catalog::*,
    locate::{Rect as LayoutRect, VisualTree},
};

use crate::app::{App, CELL_HEIGHT, CELL_WIDTH, MenuKind, Pane};

pub fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)].as_ref())
        .split(f.area());

    let count = app.panes.len().max(1) as u32;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, count); count as usize])
        .split(rows[0]);

    for (i, pane) in app.panes.iter_mut().enumerate() {
        let border = if i == app.focus {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(pane.title());
        let inner = block.inner(columns[i]);
        pane.relayout(inner);

        let lines = render_pane(&app.registry, pane, inner);
        f.render_widget(Paragraph::new(lines).block(block), columns[i]);
    }

    let status = if app.is_dragging() {
        "Dragging: release over a block to drop above or below it".to_string()
    } else {
        app.status.clone().unwrap_or_default()
    };
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            status,
            Style::default().fg(Color::Cyan),
        ))),
        rows[1],
    );

    let help_text = Line::from(vec![
        Span::raw("q: Quit | "),
        Span::raw("Tab: Switch pane | "),
        Span::raw("↑/k ↓/j: Select | "),
        Span::raw("c: Convert | i: Insert | s: Save | "),
        Span::raw("Mouse: click to select, drag to move"),
    ]);
    f.render_widget(Paragraph::new(vec![help_text]), rows[2]);

    if let Some(menu) = app.menu.as_mut() {
        let (title, items): (&str, Vec<ListItem>) = match menu.kind {
            MenuKind::Convert => (
                "Turn into",
                menu.items
                    .iter()
                    .filter_map(|id| app.registry.lookup(id))
                    .map(|block_type| {
                        let shortcut = block_type
                            .conversion
                            .and_then(|entry| entry.shortcut)
                            .unwrap_or("");
                        ListItem::new(format!(
                            "{} {:<18} {shortcut}",
                            block_type.icon, block_type.label
                        ))
                    })
                    .collect(),
            ),
            MenuKind::Insert => (
                "Insert block",
                menu.items
                    .iter()
                    .filter_map(|id| app.registry.lookup(id))
                    .map(|block_type| {
                        let category = block_type
                            .insertion
                            .map(|entry| entry.category.label())
                            .unwrap_or("");
                        ListItem::new(format!(
                            "{category:<11} {} {}",
                            block_type.icon, block_type.label
                        ))
                    })
                    .collect(),
            ),
        };

        let area = centered_rect(50, 60, f.area());
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
        f.render_widget(Clear, area);
        f.render_stateful_widget(list, area, &mut menu.state);
    }
}

/// Draws a pane's blocks at the cells their layout rects cover.
fn render_pane(registry: &BlockTypeRegistry, pane: &Pane, inner: Rect) -> Vec<Line<'static>> {
    let width = inner.width as usize;
    let height = (pane.tree.height() / CELL_HEIGHT).ceil() as usize;
    let mut grid = vec![vec![' '; width]; height];

    let selected = pane
        .selected
        .and_then(|address| pane.tree.block_rect(address))
        .map(|rect| cell_rows(&rect));

    for entry in pane.doc.outline() {
        let (Ok(block), Some(rect)) = (
            pane.doc.block_at(entry.address),
            pane.tree.block_rect(entry.address),
        ) else {
            continue;
        };
        let node = block.node;
        let column = (rect.x / CELL_WIDTH) as usize;
        let right = (rect.right() / CELL_WIDTH) as usize;
        let rows = cell_rows(&rect);

        let handle = if registry.custom_drag_kinds().contains(&node.kind) {
            Some("⣿")
        } else if pane.selected == Some(entry.address) {
            Some("⠿")
        } else {
            None
        };
        if let Some(handle) = handle {
            put(&mut grid, rows.start, column.saturating_sub(2), handle, column);
        }

        match node.kind.as_str() {
            QUOTE | CALLOUT => {
                for row in rows {
                    put(&mut grid, row, column, "│", right);
                }
            }
            TOGGLE => {
                let title = node
                    .children()
                    .first()
                    .map(Node::plain_text)
                    .unwrap_or_default();
                put(&mut grid, rows.start, column, &format!("▾ {title}"), right);
            }
            COLUMN_LAYOUT => {}
            _ => {
                let label = block_label(node, right.saturating_sub(column));
                put(&mut grid, rows.start, column, &label, right);
            }
        }
    }

    grid.into_iter()
        .enumerate()
        .skip(pane.scroll as usize)
        .map(|(row, cells)| {
            let text: String = cells.into_iter().collect();
            let style = match &selected {
                Some(range) if range.contains(&row) => Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
                _ => Style::default(),
            };
            Line::from(Span::styled(text, style))
        })
        .collect()
}

fn block_label(node: &Node, width: usize) -> String {
    let attr_u64 = |key: &str| node.attrs.get(key).and_then(|v| v.as_u64()).unwrap_or(0);
    let attr_str = |key: &str| {
        node.attrs
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    };
    let indent = "  ".repeat(attr_u64("indent") as usize);
    let text = node.plain_text().replace('\n', " ⏎ ");

    match node.kind.as_str() {
        HEADING => format!("{} {text}", "#".repeat(attr_u64("level").max(1) as usize)),
        BULLET_LIST_ITEM => format!("{indent}• {text}"),
        NUMBERED_LIST_ITEM => format!("{indent}1. {text}"),
        TODO_ITEM => {
            let checked = node
                .attrs
                .get("checked")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            format!("{indent}[{}] {text}", if checked { "x" } else { " " })
        }
        CODE_BLOCK => format!("` {text}"),
        DIVIDER => "─".repeat(width),
        IMAGE => format!("[image: {}]", attr_str("alt")),
        TABLE => "[table]".to_string(),
        LINKED_PAGE => format!("↗ {}", attr_str("title")),
        _ => text,
    }
}

fn cell_rows(rect: &LayoutRect) -> std::ops::Range<usize> {
    let top = (rect.y / CELL_HEIGHT) as usize;
    let bottom = (rect.bottom() / CELL_HEIGHT).ceil() as usize;
    top..bottom.max(top + 1)
}

fn put(grid: &mut [Vec<char>], row: usize, column: usize, text: &str, limit: usize) {
    let Some(cells) = grid.get_mut(row) else {
        return;
    };
    let limit = limit.min(cells.len());
    for (offset, ch) in text.chars().enumerate() {
        let at = column + offset;
        if at >= limit {
            break;
        }
        cells[at] = ch;
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
