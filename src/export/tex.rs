//! TeX rendering.

use phf::phf_set;

use crate::cell::{Cell, CellBody, FracStyle, GroupKind, SumStyle, TextStyle};
use crate::common::Configuration;

use super::text::split_limit_under;

/// Function names typeset with their TeX macro instead of upright text.
pub static TEX_FUNCTIONS: phf::Set<&'static str> = phf_set! {
    "sin", "cos", "tan", "sinh", "cosh", "cot", "sec", "csc", "log",
};

/// Escapes TeX specials; the Unicode minus becomes an ASCII hyphen, which
/// TeX typesets correctly in math mode.
pub(crate) fn escape_tex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\backslash{}"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '$' => out.push_str("\\$"),
            '%' => out.push_str("\\%"),
            '&' => out.push_str("\\&"),
            '#' => out.push_str("\\#"),
            '_' => out.push_str("\\_"),
            '^' => out.push_str("\\^{}"),
            '~' => out.push_str("\\~{}"),
            '\u{2212}' => out.push('-'),
            _ => out.push(c),
        }
    }
    out
}

fn opt_tex(cell: &Option<Box<Cell>>, cfg: &Configuration) -> String {
    cell.as_deref().map(|c| c.list_to_tex(cfg)).unwrap_or_default()
}

impl Cell {
    pub fn list_to_tex(&self, cfg: &Configuration) -> String {
        self.iter().map(|c| c.to_tex(cfg)).collect()
    }

    pub fn to_tex(&self, cfg: &Configuration) -> String {
        match &self.body {
            CellBody::Text { text, .. } => match self.style() {
                TextStyle::Label | TextStyle::UserLabel => {
                    format!("\\mbox{{{}}}", escape_tex(text))
                }
                _ => escape_tex(text),
            },
            CellBody::Frac {
                num, denom, style, ..
            } => match style {
                FracStyle::Choose => format!(
                    "\\binom{{{}}}{{{}}}",
                    num.list_to_tex(cfg),
                    denom.list_to_tex(cfg)
                ),
                _ => format!(
                    "\\frac{{{}}}{{{}}}",
                    num.list_to_tex(cfg),
                    denom.list_to_tex(cfg)
                ),
            },
            CellBody::Diff { diff, base } => {
                format!("{}{}", diff.list_to_tex(cfg), base.list_to_tex(cfg))
            }
            CellBody::Expt { base, power, .. } => {
                format!("{{{{{}}}^{{{}}}}}", base.list_to_tex(cfg), power.list_to_tex(cfg))
            }
            CellBody::Sub { base, index } => {
                format!("{{{{{}}}_{{{}}}}}", base.list_to_tex(cfg), index.list_to_tex(cfg))
            }
            CellBody::SubSup {
                base,
                pre_sub,
                pre_sup,
                post_sub,
                post_sup,
                script_order,
            } => {
                let mut s = String::new();
                if script_order.is_empty() {
                    if cfg.settings.tex_exponents_after_subscript {
                        s.push_str(&format!("{{{{{{{}}}", base.list_to_tex(cfg)));
                        if let Some(sub) = post_sub {
                            s.push_str(&format!("_{{{}}}", sub.list_to_tex(cfg)));
                        }
                        s.push('}');
                        if let Some(sup) = post_sup {
                            s.push_str(&format!("^{{{}}}", sup.list_to_tex(cfg)));
                        }
                        s.push('}');
                    } else {
                        s.push_str(&format!("{{{{{}}}", base.list_to_tex(cfg)));
                        if let Some(sub) = post_sub {
                            s.push_str(&format!("_{{{}}}", sub.list_to_tex(cfg)));
                        }
                        if let Some(sup) = post_sup {
                            s.push_str(&format!("^{{{}}}", sup.list_to_tex(cfg)));
                        }
                        s.push('}');
                    }
                } else {
                    if pre_sub.is_some() || pre_sup.is_some() {
                        s.push_str("{}");
                        if let Some(sub) = pre_sub {
                            s.push_str(&format!("_{{{}}}", sub.list_to_tex(cfg)));
                        }
                        if let Some(sup) = pre_sup {
                            s.push_str(&format!("^{{{}}}", sup.list_to_tex(cfg)));
                        }
                    }
                    s.push_str(&format!("{{{}}}", base.list_to_tex(cfg)));
                    if let Some(sub) = post_sub {
                        s.push_str(&format!("_{{{}}}", sub.list_to_tex(cfg)));
                    }
                    if let Some(sup) = post_sup {
                        s.push_str(&format!("^{{{}}}", sup.list_to_tex(cfg)));
                    }
                }
                s
            }
            CellBody::Sum {
                style,
                under,
                over,
                base,
            } => {
                let sign = match style {
                    SumStyle::Sum => "\\sum",
                    SumStyle::Prod => "\\prod",
                };
                match over {
                    Some(over) => format!(
                        "{sign}_{{{}}}^{{{}}}{{{}}}",
                        under.list_to_tex(cfg),
                        over.list_to_tex(cfg),
                        base.list_to_tex(cfg)
                    ),
                    None => format!(
                        "{sign}_{{{}}}{{{}}}",
                        under.list_to_tex(cfg),
                        base.list_to_tex(cfg)
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
                if *definite {
                    format!(
                        "\\int_{{{}}}^{{{}}}{{{}\\;d{}}}",
                        opt_tex(under, cfg),
                        opt_tex(over, cfg),
                        base.list_to_tex(cfg),
                        var.list_to_tex(cfg)
                    )
                } else {
                    format!(
                        "\\int{{{}\\;d{}}}",
                        base.list_to_tex(cfg),
                        var.list_to_tex(cfg)
                    )
                }
            }
            CellBody::Fun { name, arg } => {
                if self.is_broken() {
                    return String::new();
                }
                let plain_name = name.list_to_text();
                if TEX_FUNCTIONS.contains(plain_name.as_str()) {
                    format!("\\{plain_name}{{{}}}", arg.list_to_tex(cfg))
                } else {
                    format!("{}{}", name.list_to_tex(cfg), arg.list_to_tex(cfg))
                }
            }
            CellBody::Sqrt { inner } => format!("\\sqrt{{{}}}", inner.list_to_tex(cfg)),
            CellBody::Abs { inner } => {
                format!("\\left| {}\\right|", inner.list_to_tex(cfg))
            }
            CellBody::Conjugate { inner } => {
                format!("\\overline{{{}}}", inner.list_to_tex(cfg))
            }
            CellBody::At { base, index } => {
                format!(
                    "\\left.{}\\right|_{{{}}}",
                    base.list_to_tex(cfg),
                    index.list_to_tex(cfg)
                )
            }
            CellBody::Paren { inner, print, .. } => {
                let inner = inner
                    .as_deref()
                    .map(|c| c.list_to_tex(cfg))
                    .unwrap_or_default();
                if *print {
                    format!("\\left({inner}\\right)")
                } else {
                    inner
                }
            }
            CellBody::Limit { under, base, .. } => {
                let (var, to) = split_limit_under(&under.list_to_text());
                format!(
                    "\\lim_{{{}\\to {}}}{{{}}}",
                    escape_tex(&var),
                    escape_tex(&to),
                    base.list_to_tex(cfg)
                )
            }
            CellBody::Matrix(matrix) => {
                let rows: Vec<String> = matrix
                    .rows
                    .iter()
                    .map(|row| {
                        let cells: Vec<String> =
                            row.iter().map(|c| c.list_to_tex(cfg)).collect();
                        cells.join(" & ")
                    })
                    .collect();
                format!(
                    "\\begin{{pmatrix}}{}\\end{{pmatrix}}",
                    rows.join("\\\\\n")
                )
            }
            CellBody::Group(group) => {
                let heading = match group.kind {
                    GroupKind::Title => Some("\\title"),
                    GroupKind::Section => Some("\\section"),
                    GroupKind::Subsection => Some("\\subsection"),
                    GroupKind::Subsubsection => Some("\\subsubsection"),
                    GroupKind::Heading5 => Some("\\paragraph"),
                    GroupKind::Heading6 => Some("\\subparagraph"),
                    _ => None,
                };
                let mut s = match (heading, group.kind) {
                    (Some(cmd), _) => {
                        format!("{cmd}{{{}}}\n", escape_tex(&group.editor_text))
                    }
                    (None, GroupKind::Code) => format!(
                        "\\begin{{verbatim}}\n{}\n\\end{{verbatim}}\n",
                        group.editor_text
                    ),
                    (None, GroupKind::Pagebreak) => "\\pagebreak\n".to_owned(),
                    _ => format!("{}\n", escape_tex(&group.editor_text)),
                };
                if let Some(output) = &group.output {
                    s.push_str(&format!("\\[{}\\]\n", output.list_to_tex(cfg)));
                }
                s
            }
            CellBody::Editor { text, .. } => escape_tex(text),
            CellBody::Media(media) => {
                format!("\\includegraphics{{{}}}", media.path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{MathParser, SilentNotifier};

    fn parse(input: &str) -> Cell {
        let cfg = Configuration::new();
        let notifier = SilentNotifier;
        MathParser::new(&cfg, &notifier)
            .parse_line(input)
            .expect("parse failed")
    }

    #[test]
    fn known_function_names_become_macros() {
        let cell = parse(
            "<mth><fn><r><fnm>sin</fnm></r><r><p><r><v>x</v></r></p></r></fn></mth>",
        );
        let cfg = Configuration::new();
        assert_eq!(cell.list_to_tex(&cfg), "\\sin{\\left(x\\right)}");
    }

    #[test]
    fn unknown_function_names_stay_plain() {
        let cell = parse(
            "<mth><fn><r><fnm>foo</fnm></r><r><p><r><v>x</v></r></p></r></fn></mth>",
        );
        let cfg = Configuration::new();
        assert_eq!(cell.list_to_tex(&cfg), "foo\\left(x\\right)");
    }

    #[test]
    fn exponent_placement_follows_the_configuration_switch() {
        let cell =
            parse("<mth><ie><r><v>x</v></r><r><n>1</n></r><r><n>2</n></r></ie></mth>");
        let mut cfg = Configuration::new();
        assert_eq!(cell.list_to_tex(&cfg), "{{x}_{1}^{2}}");
        cfg.settings.tex_exponents_after_subscript = true;
        assert_eq!(cell.list_to_tex(&cfg), "{{{x}_{1}}^{2}}");
    }

    #[test]
    fn limit_renders_with_to_arrow() {
        let cell = parse(
            "<mth><lm><r><fnm>lim</fnm></r><r><v>x</v><t>-&gt;</t><n>0</n></r>\
             <r><v>f</v></r></lm></mth>",
        );
        let cfg = Configuration::new();
        assert_eq!(cell.list_to_tex(&cfg), "\\lim_{x\\to 0}{f}");
    }

    #[test]
    fn specials_are_escaped() {
        assert_eq!(escape_tex("a_b%c"), "a\\_b\\%c");
        assert_eq!(escape_tex("\u{2212}1"), "-1");
    }

    #[test]
    fn fraction_and_sqrt() {
        let cell = parse(
            "<mth><q><f><r><n>1</n></r><r><n>2</n></r></f></q></mth>",
        );
        let cfg = Configuration::new();
        assert_eq!(cell.list_to_tex(&cfg), "\\sqrt{\\frac{1}{2}}");
    }
}
