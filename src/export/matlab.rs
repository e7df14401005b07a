//! Matlab-flavoured text rendering. Close to the plain-text form, with
//! Matlab's matrix literal syntax and script-list bracketing.

use crate::cell::{Cell, CellBody, FracStyle, SumStyle};

use super::text::split_limit_under;

fn wrapped(cell: &Cell) -> String {
    if cell.list_is_compound() {
        format!("({})", cell.list_to_matlab())
    } else {
        cell.list_to_matlab()
    }
}

impl Cell {
    pub fn list_to_matlab(&self) -> String {
        self.iter().map(Cell::to_matlab).collect()
    }

    pub fn to_matlab(&self) -> String {
        if let Some(alt) = self.alt_copy_text() {
            return alt.to_owned();
        }
        match &self.body {
            CellBody::Text { text, .. } => text.replace('\u{2212}', "-"),
            CellBody::Frac {
                num, denom, style, ..
            } => match style {
                FracStyle::Choose => format!(
                    "nchoosek({},{})",
                    num.list_to_matlab(),
                    denom.list_to_matlab()
                ),
                _ => format!("{}/{}", wrapped(num), wrapped(denom)),
            },
            CellBody::Diff { diff, base } => {
                format!("{}{}", diff.list_to_matlab(), base.list_to_matlab())
            }
            CellBody::Expt { base, power, .. } => {
                format!("{}^{}", wrapped(base), wrapped(power))
            }
            CellBody::Sub { base, index } => {
                format!("{}[{}]", base.list_to_matlab(), index.list_to_matlab())
            }
            CellBody::SubSup {
                base,
                pre_sub,
                pre_sup,
                post_sub,
                post_sup,
                script_order,
            } => {
                let mut s = wrapped(base);
                if script_order.is_empty() {
                    if let Some(sub) = post_sub {
                        s.push_str(&format!("[{}]", sub.list_to_matlab()));
                    }
                    if let Some(sup) = post_sup {
                        s.push('^');
                        s.push_str(&wrapped(sup));
                    }
                } else {
                    let scripts: Vec<String> = [pre_sub, pre_sup, post_sub, post_sup]
                        .into_iter()
                        .flatten()
                        .map(|c| c.list_to_matlab())
                        .collect();
                    s.push_str(&format!("[{}]", scripts.join(";")));
                }
                s
            }
            CellBody::Sum {
                style,
                under,
                over,
                base,
            } => {
                let name = match (style, over) {
                    (SumStyle::Prod, _) => "prod",
                    (SumStyle::Sum, Some(_)) => "sum",
                    (SumStyle::Sum, None) => "sum",
                };
                let mut s = format!("{name}({}", base.list_to_matlab());
                s.push_str(&format!(",{}", under.list_to_matlab()));
                if let Some(over) = over {
                    s.push_str(&format!(",{}", over.list_to_matlab()));
                }
                s.push(')');
                s
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
                        "integral(@({}) {},{},{})",
                        var.list_to_matlab(),
                        base.list_to_matlab(),
                        under.as_deref().map(Cell::list_to_matlab).unwrap_or_default(),
                        over.as_deref().map(Cell::list_to_matlab).unwrap_or_default()
                    )
                } else {
                    format!("int({},{})", base.list_to_matlab(), var.list_to_matlab())
                }
            }
            CellBody::Fun { name, arg } => {
                if self.is_broken() {
                    String::new()
                } else {
                    format!("{}{}", name.list_to_matlab(), arg.list_to_matlab())
                }
            }
            CellBody::Sqrt { inner } => format!("sqrt({})", inner.list_to_matlab()),
            CellBody::Abs { inner } => format!("abs({})", inner.list_to_matlab()),
            CellBody::Conjugate { inner } => format!("conj({})", inner.list_to_matlab()),
            CellBody::At { base, index } => {
                format!("at({},{})", base.list_to_matlab(), index.list_to_matlab())
            }
            CellBody::Paren { inner, print, .. } => {
                let inner = inner
                    .as_deref()
                    .map(Cell::list_to_matlab)
                    .unwrap_or_default();
                if *print {
                    format!("({inner})")
                } else {
                    inner
                }
            }
            CellBody::Limit { under, base, .. } => {
                let (var, to) = split_limit_under(&under.list_to_matlab());
                format!("limit({},{var},{to})", base.list_to_matlab())
            }
            CellBody::Matrix(matrix) => {
                let rows: Vec<String> = matrix
                    .rows
                    .iter()
                    .map(|row| {
                        let cells: Vec<String> =
                            row.iter().map(Cell::list_to_matlab).collect();
                        cells.join(" ")
                    })
                    .collect();
                format!("[{}]", rows.join("; "))
            }
            CellBody::Group(group) => {
                let mut s = group.editor_text.clone();
                if let Some(output) = &group.output {
                    if !s.is_empty() {
                        s.push('\n');
                    }
                    s.push_str(&output.list_to_matlab());
                }
                s
            }
            CellBody::Editor { text, .. } => text.clone(),
            CellBody::Media(media) => media.path.clone(),
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
    fn matrix_uses_matlab_literal_syntax() {
        let cell = parse(
            "<mth><tb><mtr><mtd><n>1</n></mtd><mtd><n>2</n></mtd></mtr>\
             <mtr><mtd><n>3</n></mtd><mtd><n>4</n></mtd></mtr></tb></mth>",
        );
        assert_eq!(cell.list_to_matlab(), "[1 2; 3 4]");
    }

    #[test]
    fn conjugate_maps_to_conj() {
        let cell = parse("<mth><cj><v>z</v></cj></mth>");
        assert_eq!(cell.list_to_matlab(), "conj(z)");
    }

    #[test]
    fn limit_matches_text_form() {
        let cell = parse(
            "<mth><lm><r><fnm>lim</fnm></r><r><v>x</v><t>-&gt;</t><n>0</n></r>\
             <r><v>f</v></r></lm></mth>",
        );
        assert_eq!(cell.list_to_matlab(), "limit(f,x,0)");
    }
}
