//! The typed cell tree.
//!
//! A worksheet expression is a chain of [`Cell`] nodes linked through the
//! owning `next` pointer; compound constructs own their children as boxed
//! sub-chains inside the closed [`CellBody`] enum. Layout state lives on the
//! cell itself and is recomputed by [`Cell::recalculate`]; the draw order is
//! a flattened visit recomputed on demand, never an owning link.

pub mod layout;

use smallvec::SmallVec;

/// Font size decrement applied to subscript and superscript children.
pub const SCRIPT_FONT_DECREASE: i32 = 3;
/// Font size decrement applied to the "under" chain of limit-like cells.
pub const LIMIT_FONT_DECREASE: i32 = 1;
/// Layout never shrinks a font below this size.
pub const MIN_FONT_SIZE: i32 = 8;

/// Presentation style of a text cell; group and compound cells keep
/// `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextStyle {
    #[default]
    Default,
    Variable,
    Operator,
    Number,
    String,
    FunctionName,
    Greek,
    SpecialConstant,
    Label,
    UserLabel,
    Error,
    Warning,
}

/// Fraction rendering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FracStyle {
    /// Ordinary horizontal-bar fraction.
    #[default]
    Normal,
    /// Binomial coefficient: stacked without a bar.
    Choose,
    /// Derivative symbol, drawn tighter than an ordinary fraction.
    Diff,
}

/// Style of an iteration cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SumStyle {
    #[default]
    Sum,
    Prod,
}

/// One script slot of a multi-script cell, in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptRole {
    PreSub,
    PreSup,
    PostSub,
    PostSup,
}

/// Kind of a document group cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Code,
    Image,
    Pagebreak,
    Text,
    Title,
    Section,
    Subsection,
    Subsubsection,
    Heading5,
    Heading6,
}

/// Kind of an editable-text cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorKind {
    #[default]
    Input,
    Text,
    Title,
    Section,
    Subsection,
    Subsubsection,
    Heading5,
    Heading6,
}

/// A document group: an editable source region plus the output chain it
/// produced, and optionally a folded-away sub-chain.
#[derive(Debug, Clone)]
pub struct GroupData {
    pub kind: GroupKind,
    pub hide: bool,
    pub editor_text: String,
    pub editor_kind: EditorKind,
    pub hidden: Option<Box<Cell>>,
    pub output: Option<Box<Cell>>,
    pub suppress_tooltip: bool,
    pub auto_answer: bool,
}

impl GroupData {
    pub fn new(kind: GroupKind) -> Self {
        GroupData {
            kind,
            hide: false,
            editor_text: String::new(),
            editor_kind: EditorKind::Input,
            hidden: None,
            output: None,
            suppress_tooltip: false,
            auto_answer: false,
        }
    }
}

/// A two-dimensional grid of cell chains with its display flags.
#[derive(Debug, Clone, Default)]
pub struct MatrixData {
    pub rows: Vec<Vec<Cell>>,
    pub special: bool,
    pub inference: bool,
    pub col_names: bool,
    pub row_names: bool,
    pub rounded_parens: bool,
}

/// An embedded image or animation; only the path and display attributes are
/// carried, byte loading stays with the host.
#[derive(Debug, Clone, Default)]
pub struct MediaData {
    pub path: String,
    pub animation: bool,
    pub delete_file: bool,
    pub draw_rect: bool,
    pub gnuplot_source: Option<String>,
    pub gnuplot_data: Option<String>,
    pub frame_rate: Option<i64>,
    pub displayed_frame: Option<i64>,
    pub running: bool,
    pub max_width: Option<f64>,
    pub max_height: Option<f64>,
}

/// The closed set of constructs a cell can be.
#[derive(Debug, Clone)]
pub enum CellBody {
    Text {
        text: String,
        /// Invisible multiplication dot the user may toggle visible.
        hidable_mult: bool,
        /// User-chosen label name, carried only by user-label cells.
        user_label: Option<String>,
    },
    Frac {
        num: Box<Cell>,
        denom: Box<Cell>,
        style: FracStyle,
        /// Division-sign cell spliced into draw order when broken into lines.
        divide: Box<Cell>,
    },
    Diff {
        diff: Box<Cell>,
        base: Box<Cell>,
    },
    Expt {
        base: Box<Cell>,
        power: Box<Cell>,
        matrix: bool,
    },
    Sub {
        base: Box<Cell>,
        index: Box<Cell>,
    },
    SubSup {
        base: Box<Cell>,
        pre_sub: Option<Box<Cell>>,
        pre_sup: Option<Box<Cell>>,
        post_sub: Option<Box<Cell>>,
        post_sup: Option<Box<Cell>>,
        /// Script slots in the order they were attached. Empty for the
        /// canonical index+exponent form.
        script_order: SmallVec<[ScriptRole; 4]>,
    },
    Sum {
        style: SumStyle,
        under: Box<Cell>,
        /// Absent for list iteration (no upper bound).
        over: Option<Box<Cell>>,
        base: Box<Cell>,
    },
    Int {
        definite: bool,
        under: Option<Box<Cell>>,
        over: Option<Box<Cell>>,
        base: Box<Cell>,
        var: Box<Cell>,
    },
    Fun {
        name: Box<Cell>,
        arg: Box<Cell>,
    },
    Sqrt {
        inner: Box<Cell>,
    },
    Abs {
        inner: Box<Cell>,
    },
    Conjugate {
        inner: Box<Cell>,
    },
    At {
        base: Box<Cell>,
        index: Box<Cell>,
    },
    Paren {
        inner: Option<Box<Cell>>,
        /// When false the parentheses exist logically but are not printed.
        print: bool,
        open: Box<Cell>,
        close: Box<Cell>,
    },
    Limit {
        name: Box<Cell>,
        under: Box<Cell>,
        base: Box<Cell>,
        // Separators owned from construction, drawn only when broken.
        open: Box<Cell>,
        comma: Box<Cell>,
        close: Box<Cell>,
    },
    Matrix(MatrixData),
    Group(GroupData),
    Editor {
        text: String,
        kind: EditorKind,
    },
    Media(MediaData),
}

/// One node of the expression tree. See the module documentation.
#[derive(Debug, Clone)]
pub struct Cell {
    pub body: CellBody,
    style: TextStyle,
    highlight: bool,
    is_exponent: bool,
    broken: bool,
    force_break_line: bool,
    tooltip: Option<String>,
    alt_copy_text: Option<String>,
    width: i32,
    height: i32,
    center: i32,
    /// Font size of the last layout pass; `None` marks the cell dirty.
    last_font_size: Option<i32>,
    next: Option<Box<Cell>>,
}

impl Cell {
    pub fn new(body: CellBody) -> Self {
        Cell {
            body,
            style: TextStyle::Default,
            highlight: false,
            is_exponent: false,
            broken: false,
            force_break_line: false,
            tooltip: None,
            alt_copy_text: None,
            width: 0,
            height: 0,
            center: 0,
            last_font_size: None,
            next: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Cell::new(CellBody::Text {
            text: text.into(),
            hidable_mult: false,
            user_label: None,
        })
    }

    pub fn text_styled(text: impl Into<String>, style: TextStyle) -> Self {
        let mut cell = Cell::text(text);
        cell.style = style;
        cell
    }

    // --- shared attributes -------------------------------------------------

    pub fn style(&self) -> TextStyle {
        self.style
    }

    pub fn set_style(&mut self, style: TextStyle) {
        self.style = style;
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlight
    }

    pub fn set_highlight(&mut self, highlight: bool) {
        self.highlight = highlight;
    }

    pub fn is_exponent(&self) -> bool {
        self.is_exponent
    }

    pub fn set_exponent_flag(&mut self) {
        self.is_exponent = true;
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn forces_break_line(&self) -> bool {
        self.force_break_line
    }

    pub fn set_force_break_line(&mut self, force: bool) {
        self.force_break_line = force;
    }

    pub fn tooltip(&self) -> Option<&str> {
        self.tooltip.as_deref()
    }

    pub fn set_tooltip(&mut self, tooltip: impl Into<String>) {
        self.tooltip = Some(tooltip.into());
    }

    pub fn alt_copy_text(&self) -> Option<&str> {
        self.alt_copy_text.as_deref()
    }

    pub fn set_alt_copy_text(&mut self, text: impl Into<String>) {
        self.alt_copy_text = Some(text.into());
    }

    // --- logical chain -----------------------------------------------------

    pub fn next(&self) -> Option<&Cell> {
        self.next.as_deref()
    }

    pub fn next_mut(&mut self) -> Option<&mut Cell> {
        self.next.as_deref_mut()
    }

    /// Appends `cell` at the end of this chain.
    pub fn append_cell(&mut self, cell: Cell) {
        self.last_mut().next = Some(Box::new(cell));
    }

    pub fn last_mut(&mut self) -> &mut Cell {
        let mut cur = self;
        loop {
            match cur.next {
                Some(ref mut next) => cur = &mut **next,
                None => return cur,
            }
        }
    }

    /// Iterates over this cell and its logical successors.
    pub fn iter(&self) -> CellListIter<'_> {
        CellListIter { cur: Some(self) }
    }

    // --- computed layout ---------------------------------------------------

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn center(&self) -> i32 {
        self.center
    }

    /// Extent below the baseline.
    pub fn drop(&self) -> i32 {
        self.height - self.center
    }

    /// Sum of widths over the logical chain.
    pub fn full_width_list(&self) -> i32 {
        self.iter().map(Cell::width).sum()
    }

    /// Largest extent above the baseline over the chain.
    pub fn center_list(&self) -> i32 {
        self.iter().map(Cell::center).max().unwrap_or(0)
    }

    /// Largest extent below the baseline over the chain.
    pub fn max_drop_list(&self) -> i32 {
        self.iter().map(Cell::drop).max().unwrap_or(0)
    }

    /// Total height of the chain drawn on one baseline.
    pub fn height_list(&self) -> i32 {
        self.center_list() + self.max_drop_list()
    }

    /// Marks this cell (not its children) in need of a layout pass.
    pub fn reset_layout(&mut self) {
        self.last_font_size = None;
    }

    // --- draw order --------------------------------------------------------

    /// Flattened draw order of the chain. For cells broken into lines the
    /// children and owned separators are visited in place of the compound.
    pub fn draw_chain(&self) -> Vec<&Cell> {
        let mut out = Vec::new();
        for cell in self.iter() {
            cell.append_draw(&mut out);
        }
        out
    }

    fn append_draw<'a>(&'a self, out: &mut Vec<&'a Cell>) {
        if !self.broken {
            out.push(self);
            return;
        }
        match &self.body {
            CellBody::Fun { name, arg } => {
                for c in name.iter() {
                    c.append_draw(out);
                }
                for c in arg.iter() {
                    c.append_draw(out);
                }
            }
            CellBody::Limit {
                name,
                under,
                base,
                open,
                comma,
                close,
            } => {
                for c in name.iter() {
                    c.append_draw(out);
                }
                out.push(open);
                for c in base.iter() {
                    c.append_draw(out);
                }
                out.push(comma);
                for c in under.iter() {
                    c.append_draw(out);
                }
                out.push(close);
            }
            CellBody::Frac {
                num, denom, divide, ..
            } => {
                for c in num.iter() {
                    c.append_draw(out);
                }
                out.push(divide);
                for c in denom.iter() {
                    c.append_draw(out);
                }
            }
            CellBody::Paren {
                inner, open, close, ..
            } => {
                out.push(open);
                if let Some(inner) = inner {
                    for c in inner.iter() {
                        c.append_draw(out);
                    }
                }
                out.push(close);
            }
            _ => out.push(self),
        }
    }

    /// Breaks a function, limit, fraction or parenthesis cell into its
    /// linearized form. Returns whether anything changed; logical links are
    /// untouched either way.
    pub fn break_up(&mut self) -> bool {
        if self.broken {
            return false;
        }
        match self.body {
            CellBody::Fun { .. }
            | CellBody::Limit { .. }
            | CellBody::Frac { .. }
            | CellBody::Paren { .. } => {
                self.broken = true;
                self.reset_layout();
                true
            }
            _ => false,
        }
    }

    // --- classification ----------------------------------------------------

    /// True for cells that act as infix operators in linear output.
    pub fn is_operator(&self) -> bool {
        match &self.body {
            CellBody::Text { text, .. } => {
                let t = text.trim();
                !t.is_empty()
                    && t.chars()
                        .all(|c| matches!(c, '+' | '-' | '\u{2212}' | '*' | '/' | '^' | '=' | '<' | '>' | ':' | '#'))
            }
            CellBody::Frac { style, .. } => *style == FracStyle::Normal,
            _ => false,
        }
    }

    /// A chain is compound when it is not a single atomic leaf; compound
    /// bases get parenthesized in linear output.
    pub fn list_is_compound(&self) -> bool {
        self.next.is_some() || self.iter().any(Cell::is_operator)
    }

    // --- structural equality ----------------------------------------------

    /// Compares construct, text content and child structure, ignoring layout
    /// state, tooltips and styling detail. This is the round-trip notion of
    /// equality.
    pub fn structure_eq(&self, other: &Cell) -> bool {
        if !self.body_eq(&other.body) {
            return false;
        }
        match (&self.next, &other.next) {
            (None, None) => true,
            (Some(a), Some(b)) => a.structure_eq(b),
            _ => false,
        }
    }

    fn body_eq(&self, other: &CellBody) -> bool {
        use CellBody::*;
        match (&self.body, other) {
            (Text { text: a, .. }, Text { text: b, .. }) => a == b,
            (
                Frac {
                    num: na,
                    denom: da,
                    style: sa,
                    ..
                },
                Frac {
                    num: nb,
                    denom: db,
                    style: sb,
                    ..
                },
            ) => sa == sb && na.structure_eq(nb) && da.structure_eq(db),
            (Diff { diff: da, base: ba }, Diff { diff: db, base: bb }) => {
                da.structure_eq(db) && ba.structure_eq(bb)
            }
            (
                Expt {
                    base: ba, power: pa, ..
                },
                Expt {
                    base: bb, power: pb, ..
                },
            ) => ba.structure_eq(bb) && pa.structure_eq(pb),
            (Sub { base: ba, index: ia }, Sub { base: bb, index: ib }) => {
                ba.structure_eq(bb) && ia.structure_eq(ib)
            }
            (
                SubSup {
                    base: ba,
                    pre_sub: psa,
                    pre_sup: pua,
                    post_sub: sba,
                    post_sup: spa,
                    ..
                },
                SubSup {
                    base: bb,
                    pre_sub: psb,
                    pre_sup: pub_,
                    post_sub: sbb,
                    post_sup: spb,
                    ..
                },
            ) => {
                ba.structure_eq(bb)
                    && opt_eq(psa, psb)
                    && opt_eq(pua, pub_)
                    && opt_eq(sba, sbb)
                    && opt_eq(spa, spb)
            }
            (
                Sum {
                    style: sa,
                    under: ua,
                    over: oa,
                    base: ba,
                },
                Sum {
                    style: sb,
                    under: ub,
                    over: ob,
                    base: bb,
                },
            ) => sa == sb && ua.structure_eq(ub) && opt_eq(oa, ob) && ba.structure_eq(bb),
            (
                Int {
                    definite: da,
                    under: ua,
                    over: oa,
                    base: ba,
                    var: va,
                },
                Int {
                    definite: db,
                    under: ub,
                    over: ob,
                    base: bb,
                    var: vb,
                },
            ) => {
                da == db
                    && opt_eq(ua, ub)
                    && opt_eq(oa, ob)
                    && ba.structure_eq(bb)
                    && va.structure_eq(vb)
            }
            (Fun { name: na, arg: aa }, Fun { name: nb, arg: ab }) => {
                na.structure_eq(nb) && aa.structure_eq(ab)
            }
            (Sqrt { inner: a }, Sqrt { inner: b })
            | (Abs { inner: a }, Abs { inner: b })
            | (Conjugate { inner: a }, Conjugate { inner: b }) => a.structure_eq(b),
            (At { base: ba, index: ia }, At { base: bb, index: ib }) => {
                ba.structure_eq(bb) && ia.structure_eq(ib)
            }
            (
                Paren {
                    inner: ia,
                    print: pa,
                    ..
                },
                Paren {
                    inner: ib,
                    print: pb,
                    ..
                },
            ) => pa == pb && opt_eq(ia, ib),
            (
                Limit {
                    name: na,
                    under: ua,
                    base: ba,
                    ..
                },
                Limit {
                    name: nb,
                    under: ub,
                    base: bb,
                    ..
                },
            ) => na.structure_eq(nb) && ua.structure_eq(ub) && ba.structure_eq(bb),
            (Matrix(a), Matrix(b)) => {
                a.rows.len() == b.rows.len()
                    && a.rows.iter().zip(&b.rows).all(|(ra, rb)| {
                        ra.len() == rb.len()
                            && ra.iter().zip(rb).all(|(ca, cb)| ca.structure_eq(cb))
                    })
            }
            (Group(a), Group(b)) => {
                a.kind == b.kind
                    && a.hide == b.hide
                    && a.editor_text == b.editor_text
                    && opt_eq(&a.hidden, &b.hidden)
                    && opt_eq(&a.output, &b.output)
            }
            (
                Editor { text: ta, kind: ka },
                Editor { text: tb, kind: kb },
            ) => ta == tb && ka == kb,
            (Media(a), Media(b)) => a.path == b.path && a.animation == b.animation,
            _ => false,
        }
    }
}

fn opt_eq(a: &Option<Box<Cell>>, b: &Option<Box<Cell>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.structure_eq(b),
        _ => false,
    }
}

/// Iterator over a logical cell chain.
pub struct CellListIter<'a> {
    cur: Option<&'a Cell>,
}

impl<'a> Iterator for CellListIter<'a> {
    type Item = &'a Cell;

    fn next(&mut self) -> Option<&'a Cell> {
        let cell = self.cur?;
        self.cur = cell.next();
        Some(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(texts: &[&str]) -> Cell {
        let mut it = texts.iter();
        let mut head = Cell::text(*it.next().unwrap());
        for t in it {
            head.append_cell(Cell::text(*t));
        }
        head
    }

    #[test]
    fn append_and_iterate() {
        let c = chain(&["a", "b", "c"]);
        let texts: Vec<_> = c
            .iter()
            .map(|c| match &c.body {
                CellBody::Text { text, .. } => text.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(texts, ["a", "b", "c"]);
    }

    #[test]
    fn operator_classification() {
        assert!(Cell::text("+").is_operator());
        assert!(Cell::text("\u{2212}").is_operator());
        assert!(!Cell::text("x").is_operator());
        assert!(!Cell::text("").is_operator());
        assert!(chain(&["a", "+", "b"]).list_is_compound());
        assert!(!Cell::text("a").list_is_compound());
    }

    #[test]
    fn unbroken_draw_chain_matches_logical_chain() {
        let c = chain(&["a", "b"]);
        let draw = c.draw_chain();
        assert_eq!(draw.len(), 2);
        assert!(std::ptr::eq(draw[0], &c));
    }

    #[test]
    fn broken_fun_draws_name_then_arg_and_keeps_logical_links() {
        let mut fun = Cell::new(CellBody::Fun {
            name: Box::new(Cell::text("f")),
            arg: Box::new(Cell::text("x")),
        });
        fun.append_cell(Cell::text("+"));
        assert!(fun.break_up());
        assert!(!fun.break_up());
        let draw = fun.draw_chain();
        // name, arg, then the logical successor.
        assert_eq!(draw.len(), 3);
        assert_eq!(fun.iter().count(), 2);
    }

    #[test]
    fn broken_paren_splices_separators() {
        let mut paren = Cell::new(CellBody::Paren {
            inner: Some(Box::new(chain(&["a", "b"]))),
            print: true,
            open: Box::new(Cell::text("(")),
            close: Box::new(Cell::text(")")),
        });
        assert!(paren.break_up());
        let draw = paren.draw_chain();
        assert_eq!(draw.len(), 4);
    }

    #[test]
    fn text_cells_do_not_break() {
        let mut c = Cell::text("x");
        assert!(!c.break_up());
        assert!(!c.is_broken());
    }

    #[test]
    fn structure_eq_ignores_layout_and_tooltips() {
        let mut a = Cell::text("x");
        a.set_tooltip("hint");
        let b = Cell::text("x");
        assert!(a.structure_eq(&b));
        assert!(!a.structure_eq(&Cell::text("y")));
    }
}
