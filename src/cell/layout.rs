//! Size and baseline computation.
//!
//! Each cell computes `width`, `height` and `center` bottom-up from its
//! children's chain metrics; results are memoized on the font size so a
//! repeated pass over an unchanged tree measures nothing.

use super::{
    Cell, CellBody, FracStyle, LIMIT_FONT_DECREASE, MIN_FONT_SIZE, SCRIPT_FONT_DECREASE,
};
use crate::common::Configuration;

/// Font size for subscript/superscript children.
pub fn script_size(font_size: i32) -> i32 {
    (font_size - SCRIPT_FONT_DECREASE).max(MIN_FONT_SIZE)
}

/// Font size for the "under" chain of limit-like cells.
pub fn limit_size(font_size: i32) -> i32 {
    (font_size - LIMIT_FONT_DECREASE).max(MIN_FONT_SIZE)
}

/// Vertical overlap between a base and its attached script.
fn exp_indent(cfg: &Configuration, font_size: i32) -> i32 {
    cfg.scale_px(0.8 * font_size as f64 + 1.0)
}

fn recalc_opt(cell: &mut Option<Box<Cell>>, cfg: &Configuration, font_size: i32) {
    if let Some(cell) = cell {
        cell.recalculate_list(cfg, font_size);
    }
}

fn opt_width(cell: &Option<Box<Cell>>) -> i32 {
    cell.as_deref().map(Cell::full_width_list).unwrap_or(0)
}

fn opt_height(cell: &Option<Box<Cell>>) -> i32 {
    cell.as_deref().map(Cell::height_list).unwrap_or(0)
}

fn text_block_extent(cfg: &Configuration, text: &str, font_size: i32) -> (i32, i32) {
    let line_height = cfg.text_extent("X", font_size).1;
    let mut width = 0;
    let mut lines = 0;
    for line in text.split('\n') {
        width = width.max(cfg.text_extent(line, font_size).0);
        lines += 1;
    }
    (width, line_height * lines.max(1))
}

impl Cell {
    /// Lays out this cell and every logical successor at `font_size`.
    pub fn recalculate_list(&mut self, cfg: &Configuration, font_size: i32) {
        let mut cur = Some(self);
        while let Some(cell) = cur.take() {
            cell.recalculate(cfg, font_size);
            cur = cell.next.as_deref_mut();
        }
    }

    /// Computes width, height and center. Returns immediately when the cell
    /// was already laid out at this font size.
    pub fn recalculate(&mut self, cfg: &Configuration, font_size: i32) {
        if self.last_font_size == Some(font_size) {
            return;
        }
        let broken = self.broken;
        let (width, height, center) = match &mut self.body {
            CellBody::Text { text, .. } => {
                let (w, h) = cfg.text_extent(text, font_size);
                (w, h, h / 2)
            }
            CellBody::Editor { text, .. } => {
                let (w, h) = text_block_extent(cfg, text, font_size);
                (w, h, h / 2)
            }
            CellBody::Media(media) => {
                let w = cfg.scale_px(media.max_width.unwrap_or(64.0));
                let h = cfg.scale_px(media.max_height.unwrap_or(64.0));
                (w, h, h / 2)
            }
            CellBody::Frac {
                num,
                denom,
                style,
                divide,
            } => {
                num.recalculate_list(cfg, font_size);
                denom.recalculate_list(cfg, font_size);
                divide.recalculate(cfg, font_size);
                if broken {
                    (0, num.height_list(), num.center_list())
                } else {
                    let protrusion = if *style == FracStyle::Diff {
                        0
                    } else {
                        cfg.scale_px(1.0)
                    };
                    let w = num.full_width_list().max(denom.full_width_list()) + 2 * protrusion;
                    let h = num.height_list() + denom.height_list() + cfg.scale_px(4.0);
                    let c = num.height_list() + cfg.scale_px(2.0);
                    (w, h, c)
                }
            }
            CellBody::Diff { diff, base } => {
                diff.recalculate_list(cfg, font_size);
                base.recalculate_list(cfg, font_size);
                let w = diff.full_width_list() + base.full_width_list() + cfg.scale_px(2.0);
                let c = diff.center_list().max(base.center_list());
                let h = c + diff.max_drop_list().max(base.max_drop_list());
                (w, h, c)
            }
            CellBody::Expt { base, power, .. } => {
                base.recalculate_list(cfg, font_size);
                power.recalculate_list(cfg, script_size(font_size));
                let indent = exp_indent(cfg, font_size);
                let w = base.full_width_list() + power.full_width_list() - cfg.scale_px(1.0);
                let raised = (power.height_list() - indent).max(0);
                (w, base.height_list() + raised, base.center_list() + raised)
            }
            CellBody::Sub { base, index } => {
                base.recalculate_list(cfg, font_size);
                index.recalculate_list(cfg, script_size(font_size));
                let indent = exp_indent(cfg, font_size);
                let w = base.full_width_list() + index.full_width_list() - cfg.scale_px(1.0);
                let lowered = (index.height_list() - indent).max(0);
                (w, base.height_list() + lowered, base.center_list())
            }
            CellBody::SubSup {
                base,
                pre_sub,
                pre_sup,
                post_sub,
                post_sup,
                ..
            } => {
                let small = script_size(font_size);
                base.recalculate_list(cfg, font_size);
                recalc_opt(pre_sub, cfg, small);
                recalc_opt(pre_sup, cfg, small);
                recalc_opt(post_sub, cfg, small);
                recalc_opt(post_sup, cfg, small);
                let indent = exp_indent(cfg, font_size);
                let post_width = opt_width(post_sub).max(opt_width(post_sup));
                let pre_width = opt_width(pre_sub).max(opt_width(pre_sup));
                let sub_height = opt_height(post_sub).max(opt_height(pre_sub));
                let sup_height = opt_height(post_sup).max(opt_height(pre_sup));
                let raised = (sup_height - indent).max(0);
                let lowered = (sub_height - indent).max(0);
                let w = pre_width + base.full_width_list() + post_width;
                let h = base.height_list() + raised + lowered;
                let c = base.center_list() + raised;
                (w, h, c)
            }
            CellBody::Sum { under, over, base, .. } => {
                under.recalculate_list(cfg, limit_size(font_size));
                recalc_opt(over, cfg, limit_size(font_size));
                base.recalculate_list(cfg, font_size);
                let sign_w = cfg.scale_px(1.5 * font_size as f64);
                let sign_h = cfg.scale_px(2.0 * font_size as f64);
                let w = sign_w
                    .max(under.full_width_list())
                    .max(opt_width(over))
                    + base.full_width_list()
                    + cfg.scale_px(2.0);
                let c = (opt_height(over) + sign_h / 2).max(base.center_list());
                let h = c + (sign_h / 2 + under.height_list()).max(base.max_drop_list());
                (w, h, c)
            }
            CellBody::Int {
                under,
                over,
                base,
                var,
                ..
            } => {
                recalc_opt(under, cfg, limit_size(font_size));
                recalc_opt(over, cfg, limit_size(font_size));
                base.recalculate_list(cfg, font_size);
                var.recalculate_list(cfg, font_size);
                let sign_w = cfg.scale_px(font_size as f64 / 2.0);
                let sign_h = cfg.scale_px(2.5 * font_size as f64);
                let w = sign_w
                    + opt_width(under).max(opt_width(over))
                    + base.full_width_list()
                    + var.full_width_list()
                    + cfg.scale_px(4.0);
                let c = (opt_height(over) + sign_h / 2).max(base.center_list());
                let h = c
                    + (sign_h / 2 + opt_height(under))
                        .max(base.max_drop_list())
                        .max(var.max_drop_list());
                (w, h, c)
            }
            CellBody::Fun { name, arg } => {
                name.recalculate_list(cfg, font_size);
                arg.recalculate_list(cfg, font_size);
                if broken {
                    (0, 0, 0)
                } else {
                    let w = name.full_width_list() + arg.full_width_list() - cfg.scale_px(1.0);
                    let c = name.center_list().max(arg.center_list());
                    let h = c + name.max_drop_list().max(arg.max_drop_list());
                    (w, h, c)
                }
            }
            CellBody::Sqrt { inner } => {
                inner.recalculate_list(cfg, font_size);
                let w = inner.full_width_list() + cfg.scale_px(13.0);
                let h = inner.height_list() + cfg.scale_px(3.0);
                let c = inner.center_list() + cfg.scale_px(3.0);
                (w, h, c)
            }
            CellBody::Abs { inner } => {
                inner.recalculate_list(cfg, font_size);
                let w = inner.full_width_list() + 2 * cfg.scale_px(4.0);
                let h = inner.height_list() + 2 * cfg.scale_px(2.0);
                let c = inner.center_list() + cfg.scale_px(2.0);
                (w, h, c)
            }
            CellBody::Conjugate { inner } => {
                inner.recalculate_list(cfg, font_size);
                let w = inner.full_width_list() + 2 * cfg.scale_px(2.0);
                let h = inner.height_list() + cfg.scale_px(4.0);
                let c = inner.center_list() + cfg.scale_px(4.0);
                (w, h, c)
            }
            CellBody::At { base, index } => {
                base.recalculate_list(cfg, font_size);
                index.recalculate_list(cfg, script_size(font_size));
                let indent = exp_indent(cfg, font_size);
                let w =
                    base.full_width_list() + index.full_width_list() + cfg.scale_px(4.0);
                let lowered = (index.height_list() - indent).max(0);
                (w, base.height_list() + lowered, base.center_list())
            }
            CellBody::Paren {
                inner,
                open,
                close,
                ..
            } => {
                recalc_opt(inner, cfg, font_size);
                open.recalculate(cfg, font_size);
                close.recalculate(cfg, font_size);
                if broken {
                    (0, open.height(), open.center())
                } else {
                    let inner_c = inner.as_deref().map(Cell::center_list).unwrap_or(0);
                    let w = opt_width(inner) + open.width() + close.width();
                    let h = opt_height(inner) + 2 * cfg.scale_px(2.0);
                    let c = inner_c + cfg.scale_px(2.0);
                    (w, h.max(open.height()), c.max(open.center()))
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
                name.recalculate_list(cfg, font_size);
                under.recalculate_list(cfg, limit_size(font_size));
                base.recalculate_list(cfg, font_size);
                open.recalculate(cfg, font_size);
                comma.recalculate(cfg, font_size);
                close.recalculate(cfg, font_size);
                if broken {
                    (0, name.height_list(), name.center_list())
                } else {
                    let w = name.full_width_list().max(under.full_width_list())
                        + base.full_width_list();
                    let c = base.center_list().max(name.center_list());
                    let h = c
                        + base
                            .max_drop_list()
                            .max(name.max_drop_list() + under.height_list());
                    (w, h, c)
                }
            }
            CellBody::Matrix(matrix) => {
                let pad = cfg.scale_px(2.0);
                let cols = matrix.rows.iter().map(Vec::len).max().unwrap_or(0);
                let mut col_widths = vec![0; cols];
                let mut height = pad;
                for row in &mut matrix.rows {
                    let mut row_center = 0;
                    let mut row_drop = 0;
                    for (j, entry) in row.iter_mut().enumerate() {
                        entry.recalculate_list(cfg, font_size);
                        col_widths[j] = col_widths[j].max(entry.full_width_list());
                        row_center = row_center.max(entry.center_list());
                        row_drop = row_drop.max(entry.max_drop_list());
                    }
                    height += row_center + row_drop + pad;
                }
                let w = col_widths.iter().sum::<i32>()
                    + (cols as i32 + 1) * pad
                    + 2 * cfg.scale_px(4.0);
                (w, height, height / 2)
            }
            CellBody::Group(group) => {
                let (editor_w, editor_h) =
                    text_block_extent(cfg, &group.editor_text, font_size);
                recalc_opt(&mut group.hidden, cfg, font_size);
                recalc_opt(&mut group.output, cfg, font_size);
                let output_h = if group.hide { 0 } else { opt_height(&group.output) };
                let output_w = if group.hide { 0 } else { opt_width(&group.output) };
                let w = editor_w.max(output_w);
                let h = editor_h + output_h;
                (w, h, h / 2)
            }
        };
        self.width = width;
        self.height = height.max(0);
        self.center = center.clamp(0, self.height);
        self.last_font_size = Some(font_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::FontMetrics;
    use std::cell::Cell as Counter;
    use std::rc::Rc;

    struct CountingMetrics {
        calls: Rc<Counter<usize>>,
    }

    impl FontMetrics for CountingMetrics {
        fn text_extent(&self, text: &str, font_size: i32) -> (i32, i32) {
            self.calls.set(self.calls.get() + 1);
            let advance = (font_size / 2).max(1);
            (text.chars().count() as i32 * advance, font_size + 2)
        }
    }

    fn counting_config() -> (Configuration, Rc<Counter<usize>>) {
        let calls = Rc::new(Counter::new(0));
        let cfg = Configuration::with_metrics(Box::new(CountingMetrics {
            calls: Rc::clone(&calls),
        }));
        (cfg, calls)
    }

    fn subsup(post_sub: Option<&str>, post_sup: Option<&str>) -> Cell {
        Cell::new(CellBody::SubSup {
            base: Box::new(Cell::text("x")),
            pre_sub: None,
            pre_sup: None,
            post_sub: post_sub.map(|t| Box::new(Cell::text(t))),
            post_sup: post_sup.map(|t| Box::new(Cell::text(t))),
            script_order: smallvec::SmallVec::new(),
        })
    }

    #[test]
    fn text_layout_is_memoized() {
        let (cfg, calls) = counting_config();
        let mut cell = Cell::text("hello");
        cell.recalculate(&cfg, 12);
        let after_first = calls.get();
        assert!(after_first > 0);
        cell.recalculate(&cfg, 12);
        assert_eq!(calls.get(), after_first);
    }

    #[test]
    fn memoization_covers_children() {
        let (cfg, calls) = counting_config();
        let mut cell = subsup(Some("i"), Some("2"));
        cell.recalculate(&cfg, 12);
        let after_first = calls.get();
        cell.recalculate(&cfg, 12);
        assert_eq!(calls.get(), after_first);
    }

    #[test]
    fn recalculate_is_idempotent() {
        let cfg = Configuration::new();
        let mut cell = subsup(Some("i"), Some("2"));
        cell.recalculate(&cfg, 12);
        let (w, h, c) = (cell.width(), cell.height(), cell.center());
        cell.reset_layout();
        cell.recalculate(&cfg, 12);
        assert_eq!((w, h, c), (cell.width(), cell.height(), cell.center()));
    }

    #[test]
    fn font_size_change_invalidates_the_memo() {
        let (cfg, calls) = counting_config();
        let mut cell = Cell::text("x");
        cell.recalculate(&cfg, 12);
        let after_first = calls.get();
        cell.recalculate(&cfg, 16);
        assert!(calls.get() > after_first);
    }

    #[test]
    fn subsup_width_is_base_plus_widest_postscript() {
        let cfg = Configuration::new();
        let mut narrow_sub = subsup(Some("i"), Some("1234"));
        narrow_sub.recalculate(&cfg, 12);
        let (base_w, _) = cfg.text_extent("x", 12);
        let (sup_w, _) = cfg.text_extent("1234", script_size(12));
        assert_eq!(narrow_sub.width(), base_w + sup_w);
    }

    #[test]
    fn script_sizes_floor_at_minimum() {
        assert_eq!(script_size(12), 9);
        assert_eq!(script_size(9), MIN_FONT_SIZE);
        assert_eq!(limit_size(8), MIN_FONT_SIZE);
        assert_eq!(limit_size(12), 11);
    }

    #[test]
    fn broken_fraction_collapses_width() {
        let cfg = Configuration::new();
        let mut frac = Cell::new(CellBody::Frac {
            num: Box::new(Cell::text("a")),
            denom: Box::new(Cell::text("b")),
            style: FracStyle::Normal,
            divide: Box::new(Cell::text("/")),
        });
        frac.recalculate(&cfg, 12);
        assert!(frac.width() > 0);
        assert!(frac.break_up());
        frac.recalculate(&cfg, 12);
        assert_eq!(frac.width(), 0);
    }

    #[test]
    fn broken_limit_takes_height_from_its_name() {
        let cfg = Configuration::new();
        let mut lim = Cell::new(CellBody::Limit {
            name: Box::new(Cell::text("lim")),
            under: Box::new(Cell::text("x->0")),
            base: Box::new(Cell::text("f")),
            open: Box::new(Cell::text("(")),
            comma: Box::new(Cell::text(",")),
            close: Box::new(Cell::text(")")),
        });
        lim.recalculate(&cfg, 12);
        let unbroken_height = lim.height();
        assert!(lim.break_up());
        lim.recalculate(&cfg, 12);
        assert_eq!(lim.width(), 0);
        assert!(lim.height() < unbroken_height);
    }

    #[test]
    fn chain_metrics_aggregate() {
        let cfg = Configuration::new();
        let mut chain = Cell::text("ab");
        chain.append_cell(Cell::text("c"));
        chain.recalculate_list(&cfg, 12);
        let (w_ab, h) = cfg.text_extent("ab", 12);
        let (w_c, _) = cfg.text_extent("c", 12);
        assert_eq!(chain.full_width_list(), w_ab + w_c);
        assert_eq!(chain.height_list(), h);
    }
}
