use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{layout::Rect, widgets::ListState};
use relative_path::{RelativePath, RelativePathBuf};
use std::{fs, path::Path, sync::Arc};
use tessera_engine::{
    ActiveDrag, BlockTransformer, BlockTypeRegistry, Document, DragPayload, DragSessions,
    DropData, EditorError, FileStore, InsertOutcome, InsertionActions, Patch, TargetType,
    TransformOutcome,
    editing::{ActionTicket, EditorOpener, LinkedPageService, PageRef, ServiceError},
    locate::{BlockLocator, LayoutTree, LocatorConfig, Point, StackedLayout, VisualTree},
    relocate,
};

/// Layout units per terminal cell. The locator works in pixels.
pub const CELL_WIDTH: f32 = 8.0;
pub const CELL_HEIGHT: f32 = 16.0;

pub fn terminal_layout(columns: u16) -> StackedLayout {
    StackedLayout {
        width: columns as f32 * CELL_WIDTH,
        line_height: CELL_HEIGHT,
        indent: 2.0 * CELL_WIDTH,
        gap: 2.0 * CELL_WIDTH,
        gutter: 2.0 * CELL_WIDTH,
    }
}

/// One open document.
pub struct Pane {
    pub doc: Document,
    pub store: FileStore,
    pub path: RelativePathBuf,
    pub locator: BlockLocator,
    pub tree: LayoutTree,
    /// Inner area of the pane at the last draw.
    pub area: Rect,
    pub scroll: u16,
    pub selected: Option<usize>,
    saved_version: u64,
}

impl Pane {
    pub fn open(
        registry: Arc<BlockTypeRegistry>,
        locator: LocatorConfig,
        root: &Path,
        path: &RelativePath,
    ) -> Result<Self> {
        let mut store = FileStore::new(root);
        let doc = store.read_document(registry.clone(), path)?;
        log::info!("opened {} as {}", path, doc.id());
        Ok(Self {
            saved_version: doc.version(),
            doc,
            store,
            path: path.to_relative_path_buf(),
            locator: BlockLocator::with_config(registry, locator),
            tree: LayoutTree::new(),
            area: Rect::default(),
            scroll: 0,
            selected: None,
        })
    }

    pub fn title(&self) -> String {
        let dirty = if self.is_dirty() { " *" } else { "" };
        format!("{}{dirty}", self.path)
    }

    pub fn is_dirty(&self) -> bool {
        self.doc.version() != self.saved_version
    }

    pub fn relayout(&mut self, area: Rect) {
        self.area = area;
        self.tree = terminal_layout(area.width).layout(&self.doc);
    }

    /// The layout point under a terminal cell, if the cell is in this pane.
    pub fn point_at(&self, column: u16, row: u16) -> Option<Point> {
        let inside = column >= self.area.x
            && column < self.area.x + self.area.width
            && row >= self.area.y
            && row < self.area.y + self.area.height;
        inside.then(|| {
            Point::new(
                (column - self.area.x) as f32 * CELL_WIDTH + CELL_WIDTH / 2.0,
                (row - self.area.y + self.scroll) as f32 * CELL_HEIGHT + CELL_HEIGHT / 2.0,
            )
        })
    }

    pub fn select(&mut self, address: usize) {
        let caret = match self.doc.block_at(address) {
            Ok(block) if block.node.is_textblock() => address + 1,
            _ => address,
        };
        self.selected = Some(address);
        self.doc.set_selection(caret..caret);
    }

    /// Moves the selection to the block the patch left the caret in.
    pub fn follow(&mut self, patch: &Patch) {
        self.selected = self
            .doc
            .block_at(patch.new_selection.start)
            .ok()
            .map(|block| block.address);
    }

    /// Selects the block `step` entries away in document order.
    pub fn step_selection(&mut self, step: isize) {
        let outline = self.doc.outline();
        if outline.is_empty() {
            return;
        }
        let current = self
            .selected
            .and_then(|address| outline.iter().position(|entry| entry.address == address));
        let next = match current {
            Some(index) => index.saturating_add_signed(step).min(outline.len() - 1),
            None => 0,
        };
        self.select(outline[next].address);
    }

    /// Where a new block goes: after the selected block, or at the end.
    pub fn insertion_point(&self) -> usize {
        self.selected
            .and_then(|address| self.doc.block_at(address).ok())
            .map(|block| block.range().end)
            .unwrap_or_else(|| self.doc.content_size())
    }

    pub fn save(&mut self) -> Result<()> {
        self.store.write_document(&self.doc, &self.path)?;
        self.saved_version = self.doc.version();
        Ok(())
    }

    fn mark_saved(&mut self) {
        self.saved_version = self.doc.version();
    }
}

/// Linked pages are new `.json` documents next to the open ones.
pub struct LocalPages {
    store: FileStore,
    started: Vec<(ActionTicket, String)>,
}

impl LocalPages {
    pub fn new(root: &Path) -> Self {
        Self {
            store: FileStore::new(root),
            started: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    fn create(
        &mut self,
        registry: &Arc<BlockTypeRegistry>,
        title: &str,
    ) -> Result<PageRef, ServiceError> {
        let doc = Document::new(registry.clone());
        let path = page_path(&doc.id().to_string());
        self.store
            .write_document(&doc, &path)
            .map_err(|err| ServiceError::Unavailable(err.to_string()))?;
        Ok(PageRef {
            id: doc.id().to_string(),
            title: title.to_string(),
        })
    }
}

impl LinkedPageService for LocalPages {
    fn create_page(&mut self, ticket: ActionTicket, title: &str) {
        self.started.push((ticket, title.to_string()));
    }

    fn delete_page(&mut self, page: &PageRef) -> Result<(), ServiceError> {
        let path = page_path(&page.id).to_path(self.store.root());
        fs::remove_file(&path).map_err(|err| ServiceError::NotFound(format!("{}: {err}", page.id)))
    }
}

fn page_path(id: &str) -> RelativePathBuf {
    RelativePathBuf::from(format!("{id}.json"))
}

#[derive(Default)]
struct OpenRequests(Vec<PageRef>);

impl EditorOpener for OpenRequests {
    fn open_page(&mut self, page: &PageRef) {
        self.0.push(page.clone());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKind {
    Convert,
    Insert,
}

pub struct Menu {
    pub kind: MenuKind,
    /// Block type ids in menu order.
    pub items: Vec<&'static str>,
    pub state: ListState,
}

impl Menu {
    fn new(kind: MenuKind, items: Vec<&'static str>) -> Self {
        let mut state = ListState::default();
        if !items.is_empty() {
            state.select(Some(0));
        }
        Self { kind, items, state }
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = self.state.selected().map_or(0, |i| (i + 1) % self.items.len());
        self.state.select(Some(i));
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    fn chosen(&self) -> Option<&'static str> {
        self.state
            .selected()
            .and_then(|i| self.items.get(i))
            .copied()
    }
}

struct Drag {
    _guard: ActiveDrag,
    data: DropData,
    pane: usize,
    address: usize,
}

pub struct App {
    pub registry: Arc<BlockTypeRegistry>,
    pub panes: Vec<Pane>,
    pub focus: usize,
    pub menu: Option<Menu>,
    pub status: Option<String>,
    locator: LocatorConfig,
    transformer: BlockTransformer,
    actions: InsertionActions,
    pages: LocalPages,
    sessions: DragSessions,
    drag: Option<Drag>,
}

impl App {
    pub fn new(
        registry: Arc<BlockTypeRegistry>,
        locator: LocatorConfig,
        panes: Vec<Pane>,
        pages_root: &Path,
    ) -> Self {
        Self {
            transformer: BlockTransformer::new(registry.clone()),
            actions: InsertionActions::new(registry.clone()),
            pages: LocalPages::new(pages_root),
            registry,
            panes,
            focus: 0,
            menu: None,
            status: None,
            locator,
            sessions: DragSessions::new(),
            drag: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.sessions.is_active()
    }

    /// Handles a key press. Returns `true` when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.menu.is_some() {
            self.handle_menu_key(key);
            return false;
        }
        if self.panes.is_empty() {
            return key.code == KeyCode::Char('q');
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab => self.focus = (self.focus + 1) % self.panes.len(),
            KeyCode::Down | KeyCode::Char('j') => self.panes[self.focus].step_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.panes[self.focus].step_selection(-1),
            KeyCode::Char('c') => self.open_menu(MenuKind::Convert),
            KeyCode::Char('i') => self.open_menu(MenuKind::Insert),
            KeyCode::Char('s') => self.save(),
            _ => {}
        }
        false
    }

    fn handle_menu_key(&mut self, key: KeyEvent) {
        let Some(menu) = self.menu.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.menu = None,
            KeyCode::Down | KeyCode::Char('j') => menu.next(),
            KeyCode::Up | KeyCode::Char('k') => menu.previous(),
            KeyCode::Enter => {
                let kind = menu.kind;
                let chosen = menu.chosen();
                self.menu = None;
                match (kind, chosen) {
                    (MenuKind::Convert, Some(id)) => self.convert(id),
                    (MenuKind::Insert, Some(id)) => self.insert(id),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fn open_menu(&mut self, kind: MenuKind) {
        let entries = match kind {
            MenuKind::Convert => {
                if self.panes[self.focus].selected.is_none() {
                    self.status = Some("Select a block to convert".to_string());
                    return;
                }
                self.registry.list_for_conversion_menu()
            }
            MenuKind::Insert => self.registry.list_for_insertion_menu(),
        };
        let items = entries.iter().map(|block_type| block_type.id).collect();
        self.menu = Some(Menu::new(kind, items));
    }

    fn convert(&mut self, type_id: &str) {
        let Some(block_type) = self.registry.lookup(type_id) else {
            return;
        };
        let target = TargetType::of(block_type);
        let pane = &mut self.panes[self.focus];
        let Some(address) = pane.selected else {
            return;
        };

        match self
            .transformer
            .transform(&mut pane.doc, address, &target, &mut pane.store)
        {
            Ok(TransformOutcome::Applied(patch)) => {
                pane.follow(&patch);
                // The transformer saves through the pane's store
                pane.mark_saved();
            }
            Ok(TransformOutcome::Unchanged) => {}
            Err(err) => self.report(err),
        }
    }

    fn insert(&mut self, type_id: &str) {
        let pane = &mut self.panes[self.focus];
        let at = pane.insertion_point();
        match self.actions.insert(&mut pane.doc, type_id, at, &mut self.pages) {
            Ok(InsertOutcome::Inserted(patch)) => pane.follow(&patch),
            Ok(InsertOutcome::Pending(ticket)) => {
                log::debug!("waiting for page #{}", ticket.generation());
                self.fulfil_pages();
            }
            Err(err) => self.report(err),
        }
    }

    /// Creates the pages started by insertion actions and settles them.
    fn fulfil_pages(&mut self) {
        let started = std::mem::take(&mut self.pages.started);
        for (ticket, title) in started {
            let result = self.pages.create(&self.registry, &title);
            let mut opener = OpenRequests::default();
            let pane = &mut self.panes[self.focus];
            let settled =
                self.actions
                    .settle(ticket, result, &mut pane.doc, &mut self.pages, &mut opener);
            match settled {
                Ok(patch) => pane.follow(&patch),
                Err(err) => self.report(err),
            }
            for page in opener.0 {
                self.open_page(&page);
            }
        }
    }

    /// Shows a linked page in the pane next to the focused one.
    fn open_page(&mut self, page: &PageRef) {
        let root = self.pages.root().to_path_buf();
        match Pane::open(
            self.registry.clone(),
            self.locator.clone(),
            &root,
            &page_path(&page.id),
        ) {
            Ok(pane) if self.panes.len() < 2 => self.panes.push(pane),
            Ok(pane) => {
                let other = if self.focus == 0 { 1 } else { 0 };
                self.panes[other] = pane;
            }
            Err(err) => self.status = Some(format!("Cannot open {}: {err}", page.title)),
        }
    }

    fn save(&mut self) {
        let pane = &mut self.panes[self.focus];
        self.status = Some(match pane.save() {
            Ok(()) => format!("Saved {}", pane.path),
            Err(err) => format!("Save failed: {err}"),
        });
    }

    fn report(&mut self, err: EditorError) {
        if err.is_user_visible() {
            log::error!("{err}");
            self.status = Some(err.to_string());
        } else {
            log::debug!("ignored: {err}");
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let hit = self.panes.iter().enumerate().find_map(|(index, pane)| {
            pane.point_at(mouse.column, mouse.row)
                .map(|point| (index, point))
        });
        let Some((index, point)) = hit else {
            if matches!(mouse.kind, MouseEventKind::Up(_)) {
                self.drag = None;
            }
            return;
        };

        match mouse.kind {
            MouseEventKind::Moved | MouseEventKind::Drag(MouseButton::Left) => {
                let pane = &mut self.panes[index];
                let top = pane.tree.elements_at(point).first().copied();
                pane.locator.track_hover(top);
            }
            MouseEventKind::Down(MouseButton::Left) => self.press(index, point),
            MouseEventKind::Up(MouseButton::Left) => self.release(index, point),
            MouseEventKind::ScrollDown => {
                let pane = &mut self.panes[index];
                pane.scroll = pane.scroll.saturating_add(1);
            }
            MouseEventKind::ScrollUp => {
                let pane = &mut self.panes[index];
                pane.scroll = pane.scroll.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn press(&mut self, index: usize, point: Point) {
        self.focus = index;
        let pane = &mut self.panes[index];
        let Some(address) = pane
            .locator
            .locate(&pane.doc, &pane.tree, point)
            .map(|located| located.address)
        else {
            pane.selected = None;
            return;
        };
        pane.select(address);

        let payload = match DragPayload::capture(&pane.doc, address) {
            Ok(payload) => payload,
            Err(err) => {
                log::debug!("block at {address} cannot be dragged: {err}");
                return;
            }
        };
        match payload.to_drop_data() {
            Ok(data) => {
                self.drag = Some(Drag {
                    _guard: self.sessions.begin(payload),
                    data,
                    pane: index,
                    address,
                });
            }
            Err(err) => log::error!("cannot serialize drag payload: {err}"),
        }
    }

    fn release(&mut self, index: usize, point: Point) {
        // Dropping `drag` at the end of this function ends the session
        let Some(drag) = self.drag.take() else {
            return;
        };
        let target = &self.panes[index];
        let Some((address, size)) = target
            .locator
            .locate(&target.doc, &target.tree, point)
            .map(|located| (located.address, located.node.node_size()))
        else {
            return;
        };
        if index == drag.pane && address == drag.address {
            return;
        }

        let upper_half = target
            .tree
            .block_rect(address)
            .is_some_and(|rect| point.y <= rect.center().y);
        let at = if upper_half { address } else { address + size };

        let result = if index == drag.pane {
            relocate(
                &self.sessions,
                &drag.data,
                &mut self.panes[index].doc,
                at,
                None,
            )
        } else {
            let (target, source) = pair_mut(&mut self.panes, index, drag.pane);
            let result = relocate(
                &self.sessions,
                &drag.data,
                &mut target.doc,
                at,
                Some(&mut source.doc),
            );
            source.selected = None;
            result
        };

        match result {
            Ok(Some(patch)) => {
                self.focus = index;
                self.panes[index].follow(&patch);
            }
            Ok(None) => {}
            Err(err) => self.report(err),
        }
    }
}

/// Two distinct panes, mutably.
fn pair_mut(panes: &mut [Pane], first: usize, second: usize) -> (&mut Pane, &mut Pane) {
    if first < second {
        let (low, high) = panes.split_at_mut(second);
        (&mut low[first], &mut high[0])
    } else {
        let (low, high) = panes.split_at_mut(first);
        (&mut high[0], &mut low[second])
    }
}
