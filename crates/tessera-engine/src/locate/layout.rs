use std::collections::HashMap;

/// A point in layout coordinates (pixels, y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Half-open containment: the right and bottom edges are outside.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

/// What a rendered element stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementRole {
    /// Editor chrome (drag handles, menus, overlays). Never a locate target.
    Chrome,
    /// Renders document content; `pos` is the document position it maps to.
    Node { pos: usize },
    /// Purely visual wrapper; defers to its ancestors.
    Decoration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualElement {
    pub id: ElementId,
    pub parent: Option<ElementId>,
    pub rect: Rect,
    pub role: ElementRole,
}

/// The rendered view the locator reads.
pub trait VisualTree {
    /// Elements whose rect contains `point`, topmost first.
    fn elements_at(&self, point: Point) -> Vec<ElementId>;

    fn element(&self, id: ElementId) -> Option<&VisualElement>;

    /// Rendered rect of the block whose address is `address`.
    fn block_rect(&self, address: usize) -> Option<Rect>;

    /// Elements without children that render document content.
    fn leaves(&self) -> Vec<ElementId>;
}

/// An in-memory visual tree. Later elements paint over earlier ones.
#[derive(Debug, Clone, Default)]
pub struct LayoutTree {
    elements: Vec<VisualElement>,
    has_children: Vec<bool>,
    block_rects: HashMap<usize, Rect>,
}

impl LayoutTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, parent: Option<ElementId>, rect: Rect, role: ElementRole) -> ElementId {
        let id = ElementId(self.elements.len());
        if let Some(parent) = parent
            && let Some(flag) = self.has_children.get_mut(parent.0)
        {
            *flag = true;
        }
        self.elements.push(VisualElement {
            id,
            parent,
            rect,
            role,
        });
        self.has_children.push(false);
        id
    }

    /// Replaces the rect of an element pushed earlier.
    pub fn resize(&mut self, id: ElementId, rect: Rect) {
        if let Some(element) = self.elements.get_mut(id.0) {
            element.rect = rect;
        }
    }

    pub fn set_block_rect(&mut self, address: usize, rect: Rect) {
        self.block_rects.insert(address, rect);
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VisualElement> {
        self.elements.iter()
    }

    /// Bottom edge of the lowest element.
    pub fn height(&self) -> f32 {
        self.elements
            .iter()
            .map(|element| element.rect.bottom())
            .fold(0.0, f32::max)
    }
}

impl VisualTree for LayoutTree {
    fn elements_at(&self, point: Point) -> Vec<ElementId> {
        self.elements
            .iter()
            .rev()
            .filter(|element| element.rect.contains(point))
            .map(|element| element.id)
            .collect()
    }

    fn element(&self, id: ElementId) -> Option<&VisualElement> {
        self.elements.get(id.0)
    }

    fn block_rect(&self, address: usize) -> Option<Rect> {
        self.block_rects.get(&address).copied()
    }

    fn leaves(&self) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|element| !self.has_children[element.id.0])
            .filter(|element| matches!(element.role, ElementRole::Node { .. }))
            .map(|element| element.id)
            .collect()
    }
}
