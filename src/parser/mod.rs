//! Recursive-descent parser from worksheet XML to the cell tree.
//!
//! One builder method per tag; tag names resolve through the static tables
//! in [`lookup`]. Malformed XML is the only fatal condition. A missing child
//! inside well-formed XML becomes an error placeholder cell, an unknown tag
//! degrades to its parsed children plus a single warning per parsed line.

pub mod lookup;

use std::borrow::Cow;

use smallvec::SmallVec;

use crate::cell::{
    Cell, CellBody, EditorKind, FracStyle, GroupData, GroupKind, MatrixData, MediaData,
    ScriptRole, SumStyle, TextStyle,
};
use crate::common::Configuration;
use crate::xml::{self, XmlNode};
use lookup::{GROUP_TAGS, GroupTag, INNER_TAGS, InnerTag};

/// Receives user-facing warnings raised during parsing.
pub trait Notifier {
    fn warn(&self, message: &str);
}

/// Discards all warnings; the default when the host has no message sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn warn(&self, _message: &str) {}
}

pub(crate) const TOO_LONG_TEXT: &str =
    "(Expression longer than allowed by the configuration setting)";
const TOO_LONG_TOOLTIP: &str = "The maximum size of the expressions this program is allowed \
     to display can be changed in the configuration dialogue.";
pub(crate) const MISSING_CONTENT_TEXT: &str = "Bug: Missing contents";
const MISSING_CONTENT_TOOLTIP: &str = "The worksheet XML was missing data here.\n\
     If you can reproduce this problem please file a bug report.";
const LAMBDA_TOOLTIP: &str = "If this isn't a function returning a lambda() expression, \
     a multiplication sign (*) between closing and opening parenthesis is missing here.";

/// Placeholder substituted wherever a required child was absent.
fn missing_content() -> Cell {
    let mut cell = Cell::text_styled(MISSING_CONTENT_TEXT, TextStyle::Error);
    cell.set_tooltip(MISSING_CONTENT_TOOLTIP);
    cell
}

fn or_missing(cell: Option<Cell>) -> Cell {
    cell.unwrap_or_else(missing_content)
}

/// A text node counts as whitespace when its trimmed content is at most one
/// character long.
fn skip_whitespace(nodes: &[XmlNode], mut idx: usize) -> usize {
    while idx < nodes.len()
        && nodes[idx].is_text()
        && nodes[idx].content().trim().chars().count() <= 1
    {
        idx += 1;
    }
    idx
}

fn next_tag(nodes: &[XmlNode], idx: usize) -> usize {
    skip_whitespace(nodes, idx + 1)
}

/// Control characters other than tab, newline and carriage return become
/// U+FFFD before the XML reader sees them.
fn scrub_control_chars(input: &str) -> Cow<'_, str> {
    let bad = |c: char| c.is_control() && !matches!(c, '\t' | '\n' | '\r');
    if !input.chars().any(bad) {
        return Cow::Borrowed(input);
    }
    Cow::Owned(
        input
            .chars()
            .map(|c| if bad(c) { '\u{FFFD}' } else { c })
            .collect(),
    )
}

/// The parser. Holds scoped state (highlight region, fraction style) that
/// builders save and restore explicitly.
pub struct MathParser<'a> {
    config: &'a Configuration,
    notifier: &'a dyn Notifier,
    frac_style: FracStyle,
    highlight: bool,
    warned_unknown: bool,
}

impl<'a> MathParser<'a> {
    pub fn new(config: &'a Configuration, notifier: &'a dyn Notifier) -> Self {
        MathParser {
            config,
            notifier,
            frac_style: FracStyle::Normal,
            highlight: false,
            warned_unknown: false,
        }
    }

    /// Parses one line of worksheet XML into a cell chain.
    ///
    /// `None` means the input was not well-formed XML, the only condition
    /// that produces no cells at all. Input longer than the configured
    /// ceiling is replaced by a single warning cell without being parsed.
    pub fn parse_line(&mut self, input: &str) -> Option<Cell> {
        self.frac_style = FracStyle::Normal;
        self.highlight = false;
        self.warned_unknown = false;

        let scrubbed = scrub_control_chars(input);
        if let Some(limit) = self.config.settings.max_displayed_length.char_limit()
            && scrubbed.chars().count() >= limit
        {
            let mut cell = Cell::text_styled(TOO_LONG_TEXT, TextStyle::Warning);
            cell.set_tooltip(TOO_LONG_TOOLTIP);
            cell.set_force_break_line(true);
            return Some(cell);
        }

        match xml::parse_document(&scrubbed) {
            Ok(root) => self.parse_siblings(root.children(), true),
            Err(_) => None,
        }
    }

    /// Parses a run of sibling nodes. With `consume_all` the whole run is
    /// consumed into one chain; otherwise exactly one non-whitespace node.
    pub fn parse_siblings(&mut self, nodes: &[XmlNode], consume_all: bool) -> Option<Cell> {
        let mut result: Option<Cell> = None;
        let mut idx = skip_whitespace(nodes, 0);
        while idx < nodes.len() {
            let node = &nodes[idx];
            let produced = if node.is_element() {
                let mut cell = match INNER_TAGS.get(node.name()) {
                    Some(tag) => self.build_tag(*tag, node),
                    None => {
                        self.warn_unknown(node.name());
                        None
                    }
                };
                // A tag that produced nothing still contributes whatever its
                // children parse to.
                if cell.is_none() && !node.children().is_empty() {
                    cell = self.parse_siblings(node.children(), true);
                }
                if let Some(cell) = cell.as_mut() {
                    self.apply_common_attrs(node, cell);
                }
                cell
            } else {
                Some(self.parse_text(node.content(), TextStyle::Default))
            };

            if let Some(cell) = produced {
                match result.as_mut() {
                    Some(head) => head.append_cell(cell),
                    None => result = Some(cell),
                }
            }

            if !consume_all {
                break;
            }
            idx = next_tag(nodes, idx);
        }
        result
    }

    fn build_tag(&mut self, tag: InnerTag, node: &XmlNode) -> Option<Cell> {
        match tag {
            InnerTag::Variable => Some(self.parse_text(node.inner_text(), TextStyle::Variable)),
            InnerTag::Operator => Some(self.parse_text(node.inner_text(), TextStyle::Operator)),
            InnerTag::MiscText => Some(self.parse_misc_text(node)),
            InnerTag::Number => Some(self.parse_text(node.inner_text(), TextStyle::Number)),
            InnerTag::StringText => Some(self.parse_text(node.inner_text(), TextStyle::String)),
            InnerTag::Greek => Some(self.parse_text(node.inner_text(), TextStyle::Greek)),
            InnerTag::SpecialConstant => {
                Some(self.parse_text(node.inner_text(), TextStyle::SpecialConstant))
            }
            InnerTag::FunctionName => {
                Some(self.parse_text(node.inner_text(), TextStyle::FunctionName))
            }
            InnerTag::Space => Some(self.parse_text(" ", TextStyle::Default)),
            InnerTag::CharCode => Some(self.parse_char_code(node)),
            InnerTag::HiddenOperator => Some(self.parse_hidden_operator(node)),
            InnerTag::Highlight => self.parse_highlight(node),
            InnerTag::Contents => self.parse_siblings(node.children(), true),
            InnerTag::Math => Some(self.parse_math(node)),
            InnerTag::OutputLabel => Some(self.parse_output_label(node)),
            InnerTag::Paren => Some(self.parse_paren(node)),
            InnerTag::Frac => Some(self.parse_frac(node)),
            InnerTag::Power => Some(self.parse_power(node)),
            InnerTag::Sub => Some(self.parse_sub(node)),
            InnerTag::SubSup => Some(self.parse_subsup(node)),
            InnerTag::MultiScripts => Some(self.parse_multiscripts(node)),
            InnerTag::Fun => Some(self.parse_fun(node)),
            InnerTag::Sqrt => Some(self.parse_sqrt(node)),
            InnerTag::Abs => Some(self.parse_abs(node)),
            InnerTag::Conjugate => Some(self.parse_conjugate(node)),
            InnerTag::Diff => Some(self.parse_diff(node)),
            InnerTag::Sum => Some(self.parse_sum(node)),
            InnerTag::Integral => Some(self.parse_integral(node)),
            InnerTag::At => Some(self.parse_at(node)),
            InnerTag::Limit => Some(self.parse_limit(node)),
            InnerTag::Table => Some(self.parse_table(node)),
            InnerTag::Image => Some(self.parse_image(node)),
            InnerTag::Slideshow => Some(self.parse_slideshow(node)),
            InnerTag::Editor => Some(self.parse_editor(node)),
            InnerTag::CellGroup => self.parse_cell_group(node),
        }
    }

    fn warn_unknown(&mut self, name: &str) {
        if self.warned_unknown {
            return;
        }
        self.warned_unknown = true;
        self.notifier.warn(&format!(
            "Parts of the document will not be loaded correctly:\n\
             Found unknown XML tag name <{name}>"
        ));
    }

    fn apply_common_attrs(&self, node: &XmlNode, cell: &mut Cell) {
        if node.attribute_or("breakline", "false") == "true" {
            cell.set_force_break_line(true);
        }
        if let Some(tooltip) = node.attribute("tooltip") {
            cell.set_tooltip(tooltip);
        }
        if let Some(alt) = node.attribute("altCopy") {
            cell.set_alt_copy_text(alt);
        }
    }

    // --- text-like tags ----------------------------------------------------

    /// Builds a text cell chain: one cell per non-empty line, all but the
    /// first carrying a forced line break. ASCII minus becomes U+2212.
    fn parse_text(&self, content: &str, style: TextStyle) -> Cell {
        let mut result: Option<Cell> = None;
        if !content.is_empty() {
            let text = content.replace('-', "\u{2212}");
            for line in text.split('\n').filter(|l| !l.is_empty()) {
                let mut cell = Cell::text_styled(line, style);
                cell.set_highlight(self.highlight);
                if result.is_some() {
                    cell.set_force_break_line(true);
                }
                match result.as_mut() {
                    Some(head) => head.append_cell(cell),
                    None => result = Some(cell),
                }
            }
        }
        result.unwrap_or_else(|| {
            let mut cell = Cell::text_styled("", style);
            cell.set_highlight(self.highlight);
            cell
        })
    }

    fn parse_misc_text(&self, node: &XmlNode) -> Cell {
        let style = match node.attribute("type") {
            Some("error") => TextStyle::Error,
            Some("warning") => TextStyle::Warning,
            _ => TextStyle::Default,
        };
        self.parse_text(node.inner_text(), style)
    }

    fn parse_char_code(&self, node: &XmlNode) -> Cell {
        let raw = node.inner_text();
        let text = raw
            .trim()
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| raw.to_owned());
        let mut cell = Cell::text(text);
        cell.set_highlight(self.highlight);
        cell
    }

    fn parse_hidden_operator(&self, node: &XmlNode) -> Cell {
        let mut cell = self.parse_text(node.inner_text(), TextStyle::Default);
        if let CellBody::Text { hidable_mult, .. } = &mut cell.body {
            *hidable_mult = true;
        }
        cell
    }

    fn parse_highlight(&mut self, node: &XmlNode) -> Option<Cell> {
        let saved = self.highlight;
        self.highlight = true;
        let cell = self.parse_siblings(node.children(), true);
        self.highlight = saved;
        cell
    }

    fn parse_math(&mut self, node: &XmlNode) -> Cell {
        match self.parse_siblings(node.children(), true) {
            Some(mut cell) => {
                cell.set_force_break_line(true);
                cell
            }
            None => Cell::text(" "),
        }
    }

    fn parse_output_label(&mut self, node: &XmlNode) -> Cell {
        let userdefined = node.attribute_or("userdefined", "no") == "yes";
        let mut user_lbl = node
            .attribute("userdefinedlabel")
            .map(str::to_owned)
            .filter(|l| !l.is_empty());

        let style = if userdefined {
            TextStyle::UserLabel
        } else {
            TextStyle::Label
        };
        let mut cell = self.parse_text(node.inner_text(), style);

        // Worksheets written before the label attribute existed stored the
        // user's name as the parenthesized automatic label.
        if userdefined && user_lbl.is_none() {
            if let CellBody::Text { text, .. } = &cell.body {
                let chars: Vec<char> = text.chars().collect();
                if chars.len() >= 2 {
                    user_lbl = Some(chars[1..chars.len() - 1].iter().collect());
                }
            }
        }
        if let CellBody::Text { user_label, .. } = &mut cell.body {
            *user_label = user_lbl;
        }
        cell.set_force_break_line(true);
        cell
    }

    // --- child-list helpers ------------------------------------------------

    fn parse_one(&mut self, nodes: &[XmlNode], idx: usize) -> Option<Cell> {
        if idx < nodes.len() {
            self.parse_siblings(&nodes[idx..], false)
        } else {
            None
        }
    }

    fn parse_rest(&mut self, nodes: &[XmlNode], idx: usize) -> Option<Cell> {
        if idx < nodes.len() {
            self.parse_siblings(&nodes[idx..], true)
        } else {
            None
        }
    }

    // --- compound tags -----------------------------------------------------

    fn parse_frac(&mut self, node: &XmlNode) -> Cell {
        let kids = node.children();
        let idx = skip_whitespace(kids, 0);
        let num = or_missing(self.parse_one(kids, idx));
        let denom = or_missing(self.parse_one(kids, next_tag(kids, idx)));

        let mut style = self.frac_style;
        if node.attribute("line") == Some("no") {
            style = FracStyle::Choose;
        }
        if node.attribute("diffstyle") == Some("yes") {
            style = FracStyle::Diff;
        }
        let mut cell = Cell::new(CellBody::Frac {
            num: Box::new(num),
            denom: Box::new(denom),
            style,
            divide: Box::new(Cell::text_styled("/", TextStyle::Operator)),
        });
        cell.set_style(TextStyle::Variable);
        cell.set_highlight(self.highlight);
        cell
    }

    fn parse_diff(&mut self, node: &XmlNode) -> Cell {
        let kids = node.children();
        let idx = skip_whitespace(kids, 0);
        let saved = self.frac_style;
        self.frac_style = FracStyle::Diff;
        let diff = or_missing(self.parse_one(kids, idx));
        self.frac_style = saved;
        let base = or_missing(self.parse_rest(kids, next_tag(kids, idx)));
        let mut cell = Cell::new(CellBody::Diff {
            diff: Box::new(diff),
            base: Box::new(base),
        });
        cell.set_style(TextStyle::Variable);
        cell
    }

    fn parse_power(&mut self, node: &XmlNode) -> Cell {
        let kids = node.children();
        let idx = skip_whitespace(kids, 0);
        let base = or_missing(self.parse_one(kids, idx));
        let base_text = base.list_to_text();
        let mut power = or_missing(self.parse_one(kids, next_tag(kids, idx)));
        power.set_exponent_flag();
        let power_text = power.list_to_text();

        let mut cell = Cell::new(CellBody::Expt {
            base: Box::new(base),
            power: Box::new(power),
            matrix: node.has_attributes(),
        });
        cell.set_style(TextStyle::Variable);
        if node.attribute("mat") == Some("true") {
            cell.set_alt_copy_text(format!("{base_text}^^{power_text}"));
        }
        cell
    }

    fn parse_sub(&mut self, node: &XmlNode) -> Cell {
        let kids = node.children();
        let idx = skip_whitespace(kids, 0);
        let base = or_missing(self.parse_one(kids, idx));
        let mut index = or_missing(self.parse_one(kids, next_tag(kids, idx)));
        index.set_exponent_flag();
        let mut cell = Cell::new(CellBody::Sub {
            base: Box::new(base),
            index: Box::new(index),
        });
        cell.set_style(TextStyle::Variable);
        cell
    }

    fn empty_subsup(base: Cell) -> CellBody {
        CellBody::SubSup {
            base: Box::new(base),
            pre_sub: None,
            pre_sup: None,
            post_sub: None,
            post_sup: None,
            script_order: SmallVec::new(),
        }
    }

    fn parse_subsup(&mut self, node: &XmlNode) -> Cell {
        let kids = node.children();
        let mut idx = skip_whitespace(kids, 0);
        let base = or_missing(self.parse_one(kids, idx));
        idx = next_tag(kids, idx);

        let mut body = Self::empty_subsup(base);
        let attributed = kids
            .get(idx)
            .is_some_and(|c| c.attribute("pos").is_some_and(|p| !p.is_empty()));

        if let CellBody::SubSup {
            pre_sub,
            pre_sup,
            post_sub,
            post_sup,
            script_order,
            ..
        } = &mut body
        {
            if attributed {
                while idx < kids.len() {
                    let pos = kids[idx].attribute_or("pos", "").to_owned();
                    let cell = Box::new(or_missing(self.parse_one(kids, idx)));
                    match pos.as_str() {
                        "presub" => {
                            *pre_sub = Some(cell);
                            script_order.push(ScriptRole::PreSub);
                        }
                        "presup" => {
                            *pre_sup = Some(cell);
                            script_order.push(ScriptRole::PreSup);
                        }
                        "postsub" => {
                            *post_sub = Some(cell);
                            script_order.push(ScriptRole::PostSub);
                        }
                        "postsup" => {
                            *post_sup = Some(cell);
                            script_order.push(ScriptRole::PostSup);
                        }
                        // A wrapper without a recognized role is dropped.
                        _ => {}
                    }
                    idx = next_tag(kids, idx);
                }
            } else {
                let mut index = or_missing(self.parse_one(kids, idx));
                index.set_exponent_flag();
                *post_sub = Some(Box::new(index));
                idx = next_tag(kids, idx);
                let mut power = or_missing(self.parse_one(kids, idx));
                power.set_exponent_flag();
                *post_sup = Some(Box::new(power));
            }
        }
        let mut cell = Cell::new(body);
        cell.set_style(TextStyle::Variable);
        cell
    }

    fn parse_multiscripts(&mut self, node: &XmlNode) -> Cell {
        let kids = node.children();
        let mut idx = skip_whitespace(kids, 0);
        let base = or_missing(self.parse_one(kids, idx));
        idx = next_tag(kids, idx);

        let mut body = Self::empty_subsup(base);
        if let CellBody::SubSup {
            pre_sub,
            pre_sup,
            post_sub,
            post_sup,
            script_order,
            ..
        } = &mut body
        {
            let mut pre = false;
            let mut subscript = true;
            while idx < kids.len() {
                let child = &kids[idx];
                if child.name() == "mprescripts" {
                    pre = true;
                    subscript = true;
                    idx = next_tag(kids, idx);
                    continue;
                }
                if child.name() != "none" {
                    if let Some(cell) = self.parse_one(kids, idx) {
                        let cell = Box::new(cell);
                        let role = match (pre, subscript) {
                            (true, true) => ScriptRole::PreSub,
                            (true, false) => ScriptRole::PreSup,
                            (false, true) => ScriptRole::PostSub,
                            (false, false) => ScriptRole::PostSup,
                        };
                        match role {
                            ScriptRole::PreSub => *pre_sub = Some(cell),
                            ScriptRole::PreSup => *pre_sup = Some(cell),
                            ScriptRole::PostSub => *post_sub = Some(cell),
                            ScriptRole::PostSup => *post_sup = Some(cell),
                        }
                        script_order.push(role);
                    }
                }
                // The role alternates for every non-marker child, filled or
                // not.
                subscript = !subscript;
                idx = next_tag(kids, idx);
            }
        }
        let mut cell = Cell::new(body);
        cell.set_style(TextStyle::Variable);
        cell
    }

    fn parse_fun(&mut self, node: &XmlNode) -> Cell {
        let kids = node.children();
        let idx = skip_whitespace(kids, 0);
        let name = or_missing(self.parse_one(kids, idx));
        let arg = or_missing(self.parse_one(kids, next_tag(kids, idx)));
        let mut cell = Cell::new(CellBody::Fun {
            name: Box::new(name),
            arg: Box::new(arg),
        });
        cell.set_style(TextStyle::FunctionName);
        let rendered = cell.list_to_text();
        if memchr::memmem::find(rendered.as_bytes(), b")(").is_some() {
            cell.set_tooltip(LAMBDA_TOOLTIP);
        }
        cell
    }

    fn parse_sqrt(&mut self, node: &XmlNode) -> Cell {
        let inner = or_missing(self.parse_rest(node.children(), 0));
        let mut cell = Cell::new(CellBody::Sqrt {
            inner: Box::new(inner),
        });
        cell.set_style(TextStyle::Variable);
        cell.set_highlight(self.highlight);
        cell
    }

    fn parse_abs(&mut self, node: &XmlNode) -> Cell {
        let inner = or_missing(self.parse_rest(node.children(), 0));
        let mut cell = Cell::new(CellBody::Abs {
            inner: Box::new(inner),
        });
        cell.set_style(TextStyle::Variable);
        cell.set_highlight(self.highlight);
        cell
    }

    fn parse_conjugate(&mut self, node: &XmlNode) -> Cell {
        let inner = or_missing(self.parse_rest(node.children(), 0));
        let mut cell = Cell::new(CellBody::Conjugate {
            inner: Box::new(inner),
        });
        cell.set_style(TextStyle::Variable);
        cell.set_highlight(self.highlight);
        cell
    }

    fn parse_paren(&mut self, node: &XmlNode) -> Cell {
        // An absent inner chain is legal here, unlike everywhere else.
        let inner = self.parse_rest(node.children(), 0);
        let mut cell = Cell::new(CellBody::Paren {
            inner: inner.map(Box::new),
            print: !node.has_attributes(),
            open: Box::new(Cell::text("(")),
            close: Box::new(Cell::text(")")),
        });
        cell.set_style(TextStyle::Variable);
        cell.set_highlight(self.highlight);
        cell
    }

    fn parse_at(&mut self, node: &XmlNode) -> Cell {
        let kids = node.children();
        let idx = skip_whitespace(kids, 0);
        let base = or_missing(self.parse_one(kids, idx));
        let index = or_missing(self.parse_one(kids, next_tag(kids, idx)));
        let mut cell = Cell::new(CellBody::At {
            base: Box::new(base),
            index: Box::new(index),
        });
        cell.set_style(TextStyle::Variable);
        cell.set_highlight(self.highlight);
        cell
    }

    fn parse_limit(&mut self, node: &XmlNode) -> Cell {
        let kids = node.children();
        let mut idx = skip_whitespace(kids, 0);
        let name = or_missing(self.parse_one(kids, idx));
        idx = next_tag(kids, idx);
        let under = or_missing(self.parse_one(kids, idx));
        idx = next_tag(kids, idx);
        let base = or_missing(self.parse_one(kids, idx));
        let mut cell = Cell::new(CellBody::Limit {
            name: Box::new(name),
            under: Box::new(under),
            base: Box::new(base),
            open: Box::new(Cell::text("(")),
            comma: Box::new(Cell::text(",")),
            close: Box::new(Cell::text(")")),
        });
        cell.set_style(TextStyle::Variable);
        cell
    }

    fn parse_sum(&mut self, node: &XmlNode) -> Cell {
        let kids = node.children();
        let mut idx = skip_whitespace(kids, 0);
        let kind = node.attribute_or("type", "sum");
        let style = if kind == "prod" {
            SumStyle::Prod
        } else {
            SumStyle::Sum
        };
        let under = or_missing(self.parse_one(kids, idx));
        idx = next_tag(kids, idx);
        // List iteration writes a placeholder where the upper bound would
        // be; it is skipped but still advances the child cursor.
        let over = if kind != "lsum" {
            Some(Box::new(or_missing(self.parse_one(kids, idx))))
        } else {
            None
        };
        idx = next_tag(kids, idx);
        let base = or_missing(self.parse_one(kids, idx));
        let mut cell = Cell::new(CellBody::Sum {
            style,
            under: Box::new(under),
            over,
            base: Box::new(base),
        });
        cell.set_style(TextStyle::Variable);
        cell.set_highlight(self.highlight);
        cell
    }

    fn parse_integral(&mut self, node: &XmlNode) -> Cell {
        let kids = node.children();
        let mut idx = skip_whitespace(kids, 0);
        let definite = node.attribute_or("def", "true") == "true";

        let body = if definite {
            let under = or_missing(self.parse_one(kids, idx));
            idx = next_tag(kids, idx);
            let over = or_missing(self.parse_one(kids, idx));
            idx = next_tag(kids, idx);
            let base = or_missing(self.parse_one(kids, idx));
            idx = next_tag(kids, idx);
            let var = or_missing(self.parse_rest(kids, idx));
            CellBody::Int {
                definite: true,
                under: Some(Box::new(under)),
                over: Some(Box::new(over)),
                base: Box::new(base),
                var: Box::new(var),
            }
        } else {
            let base = or_missing(self.parse_one(kids, idx));
            idx = next_tag(kids, idx);
            let var = or_missing(self.parse_rest(kids, idx));
            CellBody::Int {
                definite: false,
                under: None,
                over: None,
                base: Box::new(base),
                var: Box::new(var),
            }
        };
        let mut cell = Cell::new(body);
        cell.set_style(TextStyle::Variable);
        cell.set_highlight(self.highlight);
        cell
    }

    fn parse_table(&mut self, node: &XmlNode) -> Cell {
        let mut matrix = MatrixData {
            special: node.attribute_or("special", "false") == "true",
            inference: node.attribute_or("inference", "false") == "true",
            col_names: node.attribute_or("colnames", "false") == "true",
            row_names: node.attribute_or("rownames", "false") == "true",
            rounded_parens: node.attribute_or("roundedParens", "false") == "true",
            rows: Vec::new(),
        };
        if matrix.inference {
            matrix.special = true;
        }
        let kids = node.children();
        let mut r = skip_whitespace(kids, 0);
        while r < kids.len() {
            let row_kids = kids[r].children();
            let mut row = Vec::new();
            let mut c = skip_whitespace(row_kids, 0);
            while c < row_kids.len() {
                row.push(or_missing(self.parse_one(row_kids, c)));
                c = next_tag(row_kids, c);
            }
            matrix.rows.push(row);
            r = next_tag(kids, r);
        }
        let mut cell = Cell::new(CellBody::Matrix(matrix));
        cell.set_style(TextStyle::Variable);
        cell.set_highlight(self.highlight);
        cell
    }

    // --- media, editors and groups ----------------------------------------

    fn parse_image(&self, node: &XmlNode) -> Cell {
        let media = MediaData {
            path: node.inner_text().trim().to_owned(),
            animation: false,
            delete_file: node.attribute_or("del", "yes") != "no",
            draw_rect: node.attribute_or("rect", "true") != "false",
            gnuplot_source: node.attribute("gnuplotsource").map(str::to_owned),
            gnuplot_data: node.attribute("gnuplotdata").map(str::to_owned),
            frame_rate: None,
            displayed_frame: None,
            running: false,
            max_width: node
                .attribute("maxWidth")
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| *v >= 0.0),
            max_height: node
                .attribute("maxHeight")
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| *v >= 0.0),
        };
        Cell::new(CellBody::Media(media))
    }

    fn parse_slideshow(&self, node: &XmlNode) -> Cell {
        let media = MediaData {
            path: node.inner_text().trim().to_owned(),
            animation: true,
            delete_file: node.attribute_or("del", "false") == "true",
            draw_rect: true,
            gnuplot_source: node.attribute("gnuplotSources").map(str::to_owned),
            gnuplot_data: node.attribute("gnuplotData").map(str::to_owned),
            frame_rate: node.attribute("fr").and_then(|v| v.parse().ok()),
            displayed_frame: node.attribute("frame").and_then(|v| v.parse().ok()),
            running: node.attribute_or("running", "true") != "false",
            max_width: None,
            max_height: None,
        };
        Cell::new(CellBody::Media(media))
    }

    fn parse_editor(&self, node: &XmlNode) -> Cell {
        let kind = match node.attribute_or("type", "input") {
            "text" => EditorKind::Text,
            "title" => EditorKind::Title,
            "section" => EditorKind::Section,
            "subsection" => EditorKind::Subsection,
            "subsubsection" => EditorKind::Subsubsection,
            "heading5" => EditorKind::Heading5,
            "heading6" => EditorKind::Heading6,
            _ => EditorKind::Input,
        };
        let mut text = String::new();
        for line in node.children() {
            if line.is_element() && line.name() == "line" {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(line.inner_text());
            }
        }
        Cell::new(CellBody::Editor { text, kind })
    }

    fn group_from_type(&self, tag: GroupTag, node: &XmlNode) -> GroupData {
        let kind = match tag {
            GroupTag::Code => GroupKind::Code,
            GroupTag::Image => GroupKind::Image,
            GroupTag::Pagebreak => GroupKind::Pagebreak,
            GroupTag::Text => GroupKind::Text,
            GroupTag::Title => GroupKind::Title,
            GroupTag::Section => GroupKind::Section,
            // Deeper section levels were historically written as
            // subsections with a sectioning_level attribute so old readers
            // still show them as subsections.
            GroupTag::Subsection => match node.attribute_or("sectioning_level", "0") {
                "0" | "3" => GroupKind::Subsection,
                "4" => GroupKind::Subsubsection,
                "5" => GroupKind::Heading5,
                _ => GroupKind::Heading6,
            },
            GroupTag::Subsubsection => GroupKind::Subsubsection,
            GroupTag::Heading5 => GroupKind::Heading5,
            GroupTag::Heading6 => GroupKind::Heading6,
        };
        let mut group = GroupData::new(kind);
        if kind == GroupKind::Code {
            group.auto_answer = node.attribute_or("auto_answer", "no") == "yes";
        }
        group.suppress_tooltip = node.attribute_or("hideToolTip", "false") == "true";
        group
    }

    fn parse_cell_group(&mut self, node: &XmlNode) -> Option<Cell> {
        let kind = node.attribute_or("type", "text");
        let tag = *GROUP_TAGS.get(kind)?;
        let mut group = self.group_from_type(tag, node);
        group.hide = node.attribute_or("hide", "false") == "true";

        let kids = node.children();
        let mut idx = skip_whitespace(kids, 0);
        while idx < kids.len() {
            let child = &kids[idx];
            match child.name() {
                "editor" => {
                    if let CellBody::Editor { text, kind } = self.parse_editor(child).body {
                        group.editor_text = text;
                        group.editor_kind = kind;
                    }
                }
                "input" => {
                    group.editor_text = match self.parse_rest(child.children(), 0) {
                        Some(cell) => match cell.body {
                            CellBody::Editor { text, .. } => text,
                            _ => cell.list_to_text(),
                        },
                        None => MISSING_CONTENT_TEXT.to_owned(),
                    };
                }
                "fold" => {
                    let fold_kids = child.children();
                    let mut f = skip_whitespace(fold_kids, 0);
                    let mut hidden: Option<Cell> = None;
                    while f < fold_kids.len() {
                        if let Some(cell) = self.parse_one(fold_kids, f) {
                            match hidden.as_mut() {
                                Some(head) => head.append_cell(cell),
                                None => hidden = Some(cell),
                            }
                        }
                        f = next_tag(fold_kids, f);
                    }
                    group.hidden = hidden.map(Box::new);
                }
                _ => {
                    let output = or_missing(self.parse_one(kids, idx));
                    match group.output.as_mut() {
                        Some(head) => head.append_cell(output),
                        None => group.output = Some(Box::new(output)),
                    }
                }
            }
            idx = next_tag(kids, idx);
        }
        Some(Cell::new(CellBody::Group(group)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::MaxLength;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingNotifier {
        messages: RefCell<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn warn(&self, message: &str) {
            self.messages.borrow_mut().push(message.to_owned());
        }
    }

    fn parse(input: &str) -> Option<Cell> {
        let cfg = Configuration::new();
        let notifier = SilentNotifier;
        MathParser::new(&cfg, &notifier).parse_line(input)
    }

    fn text_of(cell: &Cell) -> &str {
        match &cell.body {
            CellBody::Text { text, .. } => text,
            other => panic!("expected a text cell, got {other:?}"),
        }
    }

    #[test]
    fn parses_a_simple_expression_chain() {
        let cell = parse("<mth><v>x</v><mo>+</mo><n>1</n></mth>").unwrap();
        let texts: Vec<_> = cell.iter().map(text_of).collect();
        assert_eq!(texts, ["x", "+", "1"]);
        assert_eq!(cell.iter().nth(1).unwrap().style(), TextStyle::Operator);
        assert_eq!(cell.iter().nth(2).unwrap().style(), TextStyle::Number);
    }

    #[test]
    fn malformed_xml_yields_nothing() {
        assert!(parse("<mth><v>x</mth>").is_none());
        assert!(parse("not xml at all").is_none());
    }

    #[test]
    fn missing_fraction_child_becomes_error_placeholder() {
        let cell = parse("<mth><f><r><n>1</n></r></f></mth>").unwrap();
        let CellBody::Frac { num, denom, .. } = &cell.body else {
            panic!("expected a fraction");
        };
        assert_eq!(text_of(num), "1");
        assert_eq!(text_of(denom), MISSING_CONTENT_TEXT);
        assert_eq!(denom.style(), TextStyle::Error);
        assert!(denom.tooltip().is_some());

        // The placeholder tree must survive a layout pass.
        let cfg = Configuration::new();
        let mut cell = cell;
        cell.recalculate_list(&cfg, 12);
        assert!(cell.width() > 0);
    }

    #[test]
    fn subsup_pos_attribute_routes_scripts() {
        let cell =
            parse("<mth><ie><r><v>x</v></r><r pos=\"presub\"><n>1</n></r></ie></mth>").unwrap();
        let CellBody::SubSup {
            pre_sub,
            pre_sup,
            post_sub,
            post_sup,
            ..
        } = &cell.body
        else {
            panic!("expected a multi-script cell");
        };
        assert_eq!(text_of(pre_sub.as_deref().unwrap()), "1");
        assert!(pre_sup.is_none());
        assert!(post_sub.is_none());
        assert!(post_sup.is_none());
    }

    #[test]
    fn subsup_without_pos_is_index_and_exponent() {
        let cell =
            parse("<mth><ie><r><v>x</v></r><r><n>1</n></r><r><n>2</n></r></ie></mth>").unwrap();
        let CellBody::SubSup {
            post_sub, post_sup, ..
        } = &cell.body
        else {
            panic!("expected a multi-script cell");
        };
        let sub = post_sub.as_deref().unwrap();
        let sup = post_sup.as_deref().unwrap();
        assert_eq!(text_of(sub), "1");
        assert_eq!(text_of(sup), "2");
        assert!(sub.is_exponent());
        assert!(sup.is_exponent());
    }

    #[test]
    fn multiscripts_alternate_and_skip_none() {
        let cell = parse(
            "<mth><mmultiscripts><mrow><mi>x</mi></mrow>\
             <none/><mrow><mn>2</mn></mrow>\
             <mprescripts/><mrow><mn>3</mn></mrow><none/>\
             </mmultiscripts></mth>",
        )
        .unwrap();
        let CellBody::SubSup {
            pre_sub,
            pre_sup,
            post_sub,
            post_sup,
            ..
        } = &cell.body
        else {
            panic!("expected a multi-script cell");
        };
        assert!(post_sub.is_none());
        assert_eq!(text_of(post_sup.as_deref().unwrap()), "2");
        assert_eq!(text_of(pre_sub.as_deref().unwrap()), "3");
        assert!(pre_sup.is_none());
    }

    #[test]
    fn second_prescripts_marker_resets_to_subscript() {
        let cell = parse(
            "<mth><mmultiscripts><mrow><mi>x</mi></mrow>\
             <mprescripts/><mrow><mn>1</mn></mrow>\
             <mprescripts/><mrow><mn>2</mn></mrow>\
             </mmultiscripts></mth>",
        )
        .unwrap();
        let CellBody::SubSup { pre_sub, .. } = &cell.body else {
            panic!("expected a multi-script cell");
        };
        // The second marker resets the role, so the last child overwrites
        // the presubscript slot.
        assert_eq!(text_of(pre_sub.as_deref().unwrap()), "2");
    }

    #[test]
    fn unknown_tag_degrades_with_exactly_one_warning() {
        let cfg = Configuration::new();
        let notifier = RecordingNotifier::default();
        let mut parser = MathParser::new(&cfg, &notifier);
        let cell = parser
            .parse_line("<mth><blob><v>x</v></blob><blip><v>y</v></blip></mth>")
            .unwrap();
        let texts: Vec<_> = cell.iter().map(text_of).collect();
        assert_eq!(texts, ["x", "y"]);
        assert_eq!(notifier.messages.borrow().len(), 1);
        assert!(notifier.messages.borrow()[0].contains("blob"));

        // The next line warns again.
        parser.parse_line("<mth><blob><v>x</v></blob></mth>").unwrap();
        assert_eq!(notifier.messages.borrow().len(), 2);
    }

    #[test]
    fn oversized_input_becomes_a_single_warning_cell() {
        let mut cfg = Configuration::new();
        cfg.settings.max_displayed_length = MaxLength::Shortest;
        let notifier = SilentNotifier;
        let mut parser = MathParser::new(&cfg, &notifier);
        let input = format!("<mth><t>{}</t></mth>", "a".repeat(7_000));
        let cell = parser.parse_line(&input).unwrap();
        assert!(cell.next().is_none());
        assert_eq!(text_of(&cell), TOO_LONG_TEXT);
        assert_eq!(cell.style(), TextStyle::Warning);
        assert!(cell.forces_break_line());
        assert!(cell.tooltip().is_some());
    }

    #[test]
    fn unlimited_tier_parses_everything() {
        let mut cfg = Configuration::new();
        cfg.settings.max_displayed_length = MaxLength::Unlimited;
        let notifier = SilentNotifier;
        let mut parser = MathParser::new(&cfg, &notifier);
        let input = format!("<mth><t>{}</t></mth>", "a".repeat(60_000));
        let cell = parser.parse_line(&input).unwrap();
        assert_eq!(text_of(&cell).chars().count(), 60_000);
    }

    #[test]
    fn control_characters_are_scrubbed() {
        let cell = parse("<mth><t>a\u{1}b</t></mth>").unwrap();
        assert_eq!(text_of(&cell), "a\u{FFFD}b");
    }

    #[test]
    fn text_lines_split_and_force_breaks() {
        let cell = parse("<mth><t>a\nb</t></mth>").unwrap();
        let cells: Vec<_> = cell.iter().collect();
        assert_eq!(cells.len(), 2);
        assert!(!cells[0].forces_break_line());
        assert!(cells[1].forces_break_line());
    }

    #[test]
    fn minus_becomes_unicode_minus() {
        let cell = parse("<mth><n>-1</n></mth>").unwrap();
        assert_eq!(text_of(&cell), "\u{2212}1");
    }

    #[test]
    fn highlight_scope_is_restored() {
        let cell = parse("<mth><hl><v>x</v></hl><v>y</v></mth>").unwrap();
        let cells: Vec<_> = cell.iter().collect();
        assert!(cells[0].is_highlighted());
        assert!(!cells[1].is_highlighted());
    }

    #[test]
    fn label_back_compat_recovers_user_label() {
        let cell = parse("<mth><lbl userdefined=\"yes\">(foo)</lbl></mth>").unwrap();
        assert!(cell.forces_break_line());
        assert_eq!(cell.style(), TextStyle::UserLabel);
        let CellBody::Text { user_label, .. } = &cell.body else {
            panic!("expected a text cell");
        };
        assert_eq!(user_label.as_deref(), Some("foo"));
    }

    #[test]
    fn label_attribute_wins_over_value() {
        let cell =
            parse("<mth><lbl userdefined=\"yes\" userdefinedlabel=\"bar\">(%o1)</lbl></mth>")
                .unwrap();
        let CellBody::Text { user_label, .. } = &cell.body else {
            panic!("expected a text cell");
        };
        assert_eq!(user_label.as_deref(), Some("bar"));
    }

    #[test]
    fn empty_math_row_degrades_to_a_space() {
        let cell = parse("<r><mth></mth></r>").unwrap();
        assert_eq!(text_of(&cell), " ");
    }

    #[test]
    fn lsum_skips_the_upper_bound_slot() {
        let cell = parse(
            "<mth><sm type=\"lsum\"><r><v>x</v></r><r/><r><v>L</v></r></sm></mth>",
        )
        .unwrap();
        let CellBody::Sum {
            style,
            under,
            over,
            base,
        } = &cell.body
        else {
            panic!("expected an iteration cell");
        };
        assert_eq!(*style, SumStyle::Sum);
        assert!(over.is_none());
        assert_eq!(text_of(under), "x");
        assert_eq!(text_of(base), "L");
    }

    #[test]
    fn product_type_is_recognized() {
        let cell = parse(
            "<mth><sm type=\"prod\"><r><v>i</v></r><r><n>3</n></r><r><v>i</v></r></sm></mth>",
        )
        .unwrap();
        let CellBody::Sum { style, over, .. } = &cell.body else {
            panic!("expected an iteration cell");
        };
        assert_eq!(*style, SumStyle::Prod);
        assert!(over.is_some());
    }

    #[test]
    fn indefinite_integral_takes_base_and_variable_only() {
        let cell =
            parse("<mth><in def=\"false\"><r><v>f</v></r><r><v>x</v></r></in></mth>").unwrap();
        let CellBody::Int {
            definite,
            under,
            over,
            base,
            var,
        } = &cell.body
        else {
            panic!("expected an integral");
        };
        assert!(!definite);
        assert!(under.is_none() && over.is_none());
        assert_eq!(text_of(base), "f");
        assert_eq!(text_of(var), "x");
    }

    #[test]
    fn definite_integral_takes_bounds() {
        let cell = parse(
            "<mth><in><r><n>0</n></r><r><n>1</n></r><r><v>f</v></r><r><v>x</v></r></in></mth>",
        )
        .unwrap();
        let CellBody::Int {
            definite,
            under,
            over,
            ..
        } = &cell.body
        else {
            panic!("expected an integral");
        };
        assert!(definite);
        assert_eq!(text_of(under.as_deref().unwrap()), "0");
        assert_eq!(text_of(over.as_deref().unwrap()), "1");
    }

    #[test]
    fn power_with_mat_attribute_gets_alt_copy() {
        let cell =
            parse("<mth><e mat=\"true\"><r><v>A</v></r><r><n>2</n></r></e></mth>").unwrap();
        let CellBody::Expt { matrix, .. } = &cell.body else {
            panic!("expected a power cell");
        };
        assert!(matrix);
        assert_eq!(cell.alt_copy_text(), Some("A^^2"));
    }

    #[test]
    fn paren_with_attribute_suppresses_printing() {
        let cell = parse("<mth><p print=\"no\"><r><v>x</v></r></p></mth>").unwrap();
        let CellBody::Paren { print, .. } = &cell.body else {
            panic!("expected a parenthesis cell");
        };
        assert!(!print);
    }

    #[test]
    fn function_of_adjacent_parens_gets_a_tooltip() {
        let cell = parse(
            "<mth><fn><r><p><r><v>f</v></r></p></r><r><p><r><v>x</v></r></p></r></fn></mth>",
        )
        .unwrap();
        assert!(cell.tooltip().is_some());
    }

    #[test]
    fn hidden_operator_sets_the_hidable_flag() {
        let cell = parse("<mth><h>*</h></mth>").unwrap();
        let CellBody::Text { hidable_mult, .. } = &cell.body else {
            panic!("expected a text cell");
        };
        assert!(hidable_mult);
    }

    #[test]
    fn char_code_converts_to_a_character() {
        let cell = parse("<mth><ascii>65</ascii></mth>").unwrap();
        assert_eq!(text_of(&cell), "A");
    }

    #[test]
    fn diff_scopes_the_fraction_style() {
        let cell = parse(
            "<mth><d><f diffstyle=\"yes\"><r><v>d</v></r><r><v>x</v></r></f>\
             <f><r><n>1</n></r><r><n>2</n></r></f></d></mth>",
        )
        .unwrap();
        let CellBody::Diff { diff, base } = &cell.body else {
            panic!("expected a derivative");
        };
        let CellBody::Frac { style, .. } = &diff.body else {
            panic!("expected a fraction symbol");
        };
        assert_eq!(*style, FracStyle::Diff);
        // The base fraction is outside the derivative-symbol scope.
        let CellBody::Frac { style, .. } = &base.body else {
            panic!("expected a fraction in the base");
        };
        assert_eq!(*style, FracStyle::Normal);
    }

    #[test]
    fn editor_joins_line_children() {
        let cell =
            parse("<r><editor type=\"text\"><line>a</line><line>b</line></editor></r>").unwrap();
        let CellBody::Editor { text, kind } = &cell.body else {
            panic!("expected an editor cell");
        };
        assert_eq!(text, "a\nb");
        assert_eq!(*kind, EditorKind::Text);
    }

    #[test]
    fn sectioning_level_back_compat() {
        let levels = [
            ("", GroupKind::Subsection),
            (" sectioning_level=\"3\"", GroupKind::Subsection),
            (" sectioning_level=\"4\"", GroupKind::Subsubsection),
            (" sectioning_level=\"5\"", GroupKind::Heading5),
            (" sectioning_level=\"7\"", GroupKind::Heading6),
        ];
        for (attr, expected) in levels {
            let input = format!(
                "<r><cell type=\"subsection\"{attr}>\
                 <editor type=\"subsection\"><line>t</line></editor></cell></r>"
            );
            let cell = parse(&input).unwrap();
            let CellBody::Group(group) = &cell.body else {
                panic!("expected a group cell");
            };
            assert_eq!(group.kind, expected, "attr {attr:?}");
        }
    }

    #[test]
    fn group_collects_editor_and_output() {
        let cell = parse(
            "<r><cell type=\"code\" hide=\"true\" auto_answer=\"yes\">\
             <editor type=\"input\"><line>1+1;</line></editor>\
             <mth><lbl>(%o1)</lbl><n>2</n></mth>\
             </cell></r>",
        )
        .unwrap();
        let CellBody::Group(group) = &cell.body else {
            panic!("expected a group cell");
        };
        assert_eq!(group.kind, GroupKind::Code);
        assert!(group.hide);
        assert!(group.auto_answer);
        assert_eq!(group.editor_text, "1+1;");
        let output = group.output.as_deref().unwrap();
        assert_eq!(output.iter().count(), 2);
        assert!(output.forces_break_line());
    }

    #[test]
    fn group_fold_builds_a_hidden_chain() {
        let cell = parse(
            "<r><cell type=\"section\">\
             <editor type=\"section\"><line>s</line></editor>\
             <fold>\
             <cell type=\"text\"><editor type=\"text\"><line>a</line></editor></cell>\
             <cell type=\"text\"><editor type=\"text\"><line>b</line></editor></cell>\
             </fold></cell></r>",
        )
        .unwrap();
        let CellBody::Group(group) = &cell.body else {
            panic!("expected a group cell");
        };
        let hidden = group.hidden.as_deref().unwrap();
        assert_eq!(hidden.iter().count(), 2);
    }

    #[test]
    fn unknown_group_type_degrades_to_children() {
        let cfg = Configuration::new();
        let notifier = RecordingNotifier::default();
        let mut parser = MathParser::new(&cfg, &notifier);
        let cell = parser
            .parse_line("<r><cell type=\"chapter\"><mth><v>x</v></mth></cell></r>")
            .unwrap();
        // The cell tag produced nothing, so its children are parsed
        // generically.
        assert_eq!(text_of(&cell), "x");
    }

    #[test]
    fn breakline_tooltip_and_alt_copy_attributes_apply() {
        let cell = parse(
            "<mth><v breakline=\"true\" tooltip=\"hint\" altCopy=\"alt\">x</v></mth>",
        )
        .unwrap();
        assert!(cell.forces_break_line());
        assert_eq!(cell.tooltip(), Some("hint"));
        assert_eq!(cell.alt_copy_text(), Some("alt"));
    }

    #[test]
    fn whitespace_between_tags_is_skipped() {
        let cell = parse("<mth>\n  <v>x</v>\n  <n>1</n>\n</mth>").unwrap();
        assert_eq!(cell.iter().count(), 2);
    }

    #[test]
    fn image_tag_carries_path_and_size() {
        let cell = parse(
            "<r><img rect=\"false\" maxWidth=\"12.5\" del=\"no\">image1.png</img></r>",
        )
        .unwrap();
        let CellBody::Media(media) = &cell.body else {
            panic!("expected a media cell");
        };
        assert_eq!(media.path, "image1.png");
        assert!(!media.animation);
        assert!(!media.draw_rect);
        assert!(!media.delete_file);
        assert_eq!(media.max_width, Some(12.5));
        assert_eq!(media.max_height, None);
    }

    #[test]
    fn slideshow_tag_carries_frame_attributes() {
        let cell = parse(
            "<r><slide fr=\"4\" frame=\"2\" running=\"false\">a.png;b.png</slide></r>",
        )
        .unwrap();
        let CellBody::Media(media) = &cell.body else {
            panic!("expected a media cell");
        };
        assert!(media.animation);
        assert_eq!(media.frame_rate, Some(4));
        assert_eq!(media.displayed_frame, Some(2));
        assert!(!media.running);
    }
}
