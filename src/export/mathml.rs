//! Presentation-MathML rendering.

use quick_xml::escape::escape;

use crate::cell::{Cell, CellBody, FracStyle, GroupKind, SumStyle, TextStyle};

/// Wraps a chain in `<mrow>` when it contains more than one cell, so the
/// result always behaves as a single MathML operand.
fn row(cell: &Cell) -> String {
    if cell.next().is_some() {
        format!("<mrow>{}</mrow>", cell.list_to_mathml())
    } else {
        cell.list_to_mathml()
    }
}

fn opt_row(cell: &Option<Box<Cell>>) -> String {
    cell.as_deref().map(row).unwrap_or_else(|| "<mrow></mrow>".to_owned())
}

impl Cell {
    pub fn list_to_mathml(&self) -> String {
        self.iter().map(Cell::to_mathml).collect()
    }

    pub fn to_mathml(&self) -> String {
        match &self.body {
            CellBody::Text { text, .. } => {
                let escaped = escape(text.as_str());
                match self.style() {
                    TextStyle::Number => format!("<mn>{escaped}</mn>"),
                    TextStyle::Operator => format!("<mo>{escaped}</mo>"),
                    TextStyle::Variable
                    | TextStyle::Greek
                    | TextStyle::SpecialConstant
                    | TextStyle::FunctionName => format!("<mi>{escaped}</mi>"),
                    TextStyle::String => format!("<ms>{escaped}</ms>"),
                    _ => format!("<mtext>{escaped}</mtext>"),
                }
            }
            CellBody::Frac {
                num, denom, style, ..
            } => match style {
                FracStyle::Choose => format!(
                    "<mrow><mo>(</mo><mfrac linethickness=\"0\">{}{}</mfrac><mo>)</mo></mrow>",
                    row(num),
                    row(denom)
                ),
                _ => format!("<mfrac>{}{}</mfrac>", row(num), row(denom)),
            },
            CellBody::Diff { diff, base } => {
                format!(
                    "<mrow>{}{}</mrow>",
                    diff.list_to_mathml(),
                    base.list_to_mathml()
                )
            }
            CellBody::Expt { base, power, .. } => {
                format!("<msup>{}{}</msup>", row(base), row(power))
            }
            CellBody::Sub { base, index } => {
                format!("<msub>{}{}</msub>", row(base), row(index))
            }
            CellBody::SubSup {
                base,
                pre_sub,
                pre_sup,
                post_sub,
                post_sup,
                script_order,
            } => {
                let canonical = script_order.is_empty()
                    && pre_sub.is_none()
                    && pre_sup.is_none()
                    && post_sub.is_some()
                    && post_sup.is_some();
                if canonical {
                    format!(
                        "<msubsup>{}{}{}</msubsup>",
                        row(base),
                        opt_row(post_sub),
                        opt_row(post_sup)
                    )
                } else {
                    let placeholder = |c: &Option<Box<Cell>>| {
                        c.as_deref().map(row).unwrap_or_else(|| "<none/>".to_owned())
                    };
                    let mut s = format!("<mmultiscripts>{}", row(base));
                    s.push_str(&placeholder(post_sub));
                    s.push_str(&placeholder(post_sup));
                    if pre_sub.is_some() || pre_sup.is_some() {
                        s.push_str("<mprescripts/>");
                        s.push_str(&placeholder(pre_sub));
                        s.push_str(&placeholder(pre_sup));
                    }
                    s.push_str("</mmultiscripts>");
                    s
                }
            }
            CellBody::Sum {
                style,
                under,
                over,
                base,
            } => {
                let sign = match style {
                    SumStyle::Sum => "<mo>&#x2211;</mo>",
                    SumStyle::Prod => "<mo>&#x220F;</mo>",
                };
                match over {
                    Some(over) => format!(
                        "<mrow><munderover>{sign}{}{}</munderover>{}</mrow>",
                        row(under),
                        row(over),
                        row(base)
                    ),
                    None => format!(
                        "<mrow><munder>{sign}{}</munder>{}</mrow>",
                        row(under),
                        row(base)
                    ),
                }
            }
            CellBody::Int {
                definite,
                under,
                over,
                base,
                var,
            } => {
                let sign = if *definite {
                    format!(
                        "<msubsup><mo>&#x222B;</mo>{}{}</msubsup>",
                        opt_row(under),
                        opt_row(over)
                    )
                } else {
                    "<mo>&#x222B;</mo>".to_owned()
                };
                format!(
                    "<mrow>{sign}{}<mi>d</mi>{}</mrow>",
                    row(base),
                    row(var)
                )
            }
            CellBody::Fun { name, arg } => {
                if self.is_broken() {
                    String::new()
                } else {
                    format!(
                        "<mrow>{}<mo>&#x2061;</mo>{}</mrow>",
                        name.list_to_mathml(),
                        arg.list_to_mathml()
                    )
                }
            }
            CellBody::Sqrt { inner } => {
                format!("<msqrt>{}</msqrt>", inner.list_to_mathml())
            }
            CellBody::Abs { inner } => format!(
                "<mrow><mo>|</mo>{}<mo>|</mo></mrow>",
                inner.list_to_mathml()
            ),
            CellBody::Conjugate { inner } => format!(
                "<mover accent=\"true\">{}<mo>&#xAF;</mo></mover>",
                row(inner)
            ),
            CellBody::At { base, index } => format!(
                "<msub><mrow>{}<mo>|</mo></mrow>{}</msub>",
                base.list_to_mathml(),
                row(index)
            ),
            CellBody::Paren { inner, print, .. } => {
                let inner = inner
                    .as_deref()
                    .map(Cell::list_to_mathml)
                    .unwrap_or_default();
                if *print {
                    format!("<mrow><mo>(</mo>{inner}<mo>)</mo></mrow>")
                } else {
                    inner
                }
            }
            CellBody::Limit { name, under, base, .. } => format!(
                "<mrow><munder>{}{}</munder>{}</mrow>",
                row(name),
                row(under),
                row(base)
            ),
            CellBody::Matrix(matrix) => {
                let mut s = String::from("<mrow><mo>(</mo><mtable>");
                for r in &matrix.rows {
                    s.push_str("<mtr>");
                    for c in r {
                        s.push_str(&format!("<mtd>{}</mtd>", c.list_to_mathml()));
                    }
                    s.push_str("</mtr>");
                }
                s.push_str("</mtable><mo>)</mo></mrow>");
                s
            }
            CellBody::Group(group) => {
                let mut s = String::new();
                if group.kind == GroupKind::Code || !group.editor_text.is_empty() {
                    s.push_str(&format!(
                        "<mtext>{}</mtext>",
                        escape(group.editor_text.as_str())
                    ));
                }
                if let Some(output) = &group.output {
                    s.push_str(&output.list_to_mathml());
                }
                s
            }
            CellBody::Editor { text, .. } => {
                format!("<mtext>{}</mtext>", escape(text.as_str()))
            }
            CellBody::Media(media) => {
                format!("<mtext>{}</mtext>", escape(media.path.as_str()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cell::Cell;
    use crate::common::Configuration;
    use crate::parser::{MathParser, SilentNotifier};

    fn parse(input: &str) -> Cell {
        let cfg = Configuration::new();
        let notifier = SilentNotifier;
        MathParser::new(&cfg, &notifier)
            .parse_line(input)
            .expect("parse failed")
    }

    #[test]
    fn text_styles_pick_the_right_tag() {
        let cell = parse("<mth><v>x</v><mo>+</mo><n>1</n></mth>");
        assert_eq!(
            cell.list_to_mathml(),
            "<mi>x</mi><mo>+</mo><mn>1</mn>"
        );
    }

    #[test]
    fn canonical_subsup_uses_msubsup() {
        let cell =
            parse("<mth><ie><r><v>x</v></r><r><n>1</n></r><r><n>2</n></r></ie></mth>");
        assert_eq!(
            cell.list_to_mathml(),
            "<msubsup><mi>x</mi><mn>1</mn><mn>2</mn></msubsup>"
        );
    }

    #[test]
    fn prescripts_use_mmultiscripts_with_markers() {
        let cell = parse(
            "<mth><ie><r><v>x</v></r><r pos=\"presub\"><n>1</n></r></ie></mth>",
        );
        assert_eq!(
            cell.list_to_mathml(),
            "<mmultiscripts><mi>x</mi><none/><none/>\
             <mprescripts/><mn>1</mn><none/></mmultiscripts>"
        );
    }

    #[test]
    fn function_application_uses_invisible_apply() {
        let cell = parse(
            "<mth><fn><r><fnm>sin</fnm></r><r><p><r><v>x</v></r></p></r></fn></mth>",
        );
        assert_eq!(
            cell.list_to_mathml(),
            "<mrow><mi>sin</mi><mo>&#x2061;</mo>\
             <mrow><mo>(</mo><mi>x</mi><mo>)</mo></mrow></mrow>"
        );
    }

    #[test]
    fn sum_uses_munderover() {
        let cell = parse(
            "<mth><sm><r><v>i</v><mo>=</mo><n>1</n></r><r><n>9</n></r>\
             <r><v>i</v></r></sm></mth>",
        );
        let out = cell.list_to_mathml();
        assert!(out.starts_with("<mrow><munderover><mo>&#x2211;</mo>"));
        assert!(out.contains("<mrow><mi>i</mi><mo>=</mo><mn>1</mn></mrow>"));
    }

    #[test]
    fn text_content_is_escaped() {
        let cell = Cell::text("a<b".to_owned());
        assert!(cell.to_mathml().contains("a&lt;b"));
    }
}
