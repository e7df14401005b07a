//! Plain-text rendering, the form used for copy and for recovering linear
//! input.

use crate::cell::{Cell, CellBody, FracStyle, SumStyle};

/// Parenthesizes a chain when it is not a single atomic leaf.
fn wrapped(cell: &Cell) -> String {
    if cell.list_is_compound() {
        format!("({})", cell.list_to_text())
    } else {
        cell.list_to_text()
    }
}

/// Splits a limit "under" chain `var->target` into its two halves, mapping a
/// trailing one-sided marker to `,plus` / `,minus`.
pub(crate) fn split_limit_under(under: &str) -> (String, String) {
    let (var, to) = match under.find("->") {
        Some(pos) => (&under[..pos], &under[pos + 2..]),
        None => ("", under),
    };
    let mut to = to.to_owned();
    if let Some(stripped) = to.strip_suffix('+') {
        to = format!("{stripped},plus");
    } else if let Some(stripped) = to.strip_suffix('-') {
        to = format!("{stripped},minus");
    }
    (var.to_owned(), to)
}

impl Cell {
    /// Renders the whole logical chain as plain text.
    pub fn list_to_text(&self) -> String {
        self.iter().map(Cell::to_text).collect()
    }

    /// Renders this cell alone as plain text. An alternate copy text wins
    /// verbatim.
    pub fn to_text(&self) -> String {
        if let Some(alt) = self.alt_copy_text() {
            return alt.to_owned();
        }
        match &self.body {
            CellBody::Text { text, .. } => text.replace('\u{2212}', "-"),
            CellBody::Frac {
                num, denom, style, ..
            } => match style {
                FracStyle::Choose => format!(
                    "binomial({},{})",
                    num.list_to_text(),
                    denom.list_to_text()
                ),
                _ => format!("{}/{}", wrapped(num), wrapped(denom)),
            },
            CellBody::Diff { diff, base } => {
                format!("{}{}", diff.list_to_text(), base.list_to_text())
            }
            CellBody::Expt { base, power, .. } => {
                format!("{}^{}", wrapped(base), wrapped(power))
            }
            CellBody::Sub { base, index } => {
                format!("{}[{}]", base.list_to_text(), index.list_to_text())
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
                        s.push_str(&format!("[{}]", sub.list_to_text()));
                    }
                    if let Some(sup) = post_sup {
                        s.push('^');
                        s.push_str(&wrapped(sup));
                    }
                } else {
                    for script in [pre_sub, pre_sup, post_sub, post_sup]
                        .into_iter()
                        .flatten()
                    {
                        s.push_str(&format!("[{}]", script.list_to_text()));
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
                let name = match (style, over) {
                    (SumStyle::Prod, _) => "product",
                    (SumStyle::Sum, Some(_)) => "sum",
                    (SumStyle::Sum, None) => "lsum",
                };
                let under_text = under.list_to_text();
                match over {
                    Some(over) => {
                        let (var, start) = match under_text.split_once('=') {
                            Some((var, start)) => (var.to_owned(), start.to_owned()),
                            None => (under_text, String::new()),
                        };
                        format!(
                            "{name}({},{var},{start},{})",
                            base.list_to_text(),
                            over.list_to_text()
                        )
                    }
                    None => {
                        let (var, list) = match under_text.split_once(" in ") {
                            Some((var, list)) => (var.to_owned(), list.to_owned()),
                            None => (under_text, String::new()),
                        };
                        format!("{name}({},{var},{list})", base.list_to_text())
                    }
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
                        "integrate({},{},{},{})",
                        base.list_to_text(),
                        var.list_to_text(),
                        under.as_deref().map(Cell::list_to_text).unwrap_or_default(),
                        over.as_deref().map(Cell::list_to_text).unwrap_or_default()
                    )
                } else {
                    format!("integrate({},{})", base.list_to_text(), var.list_to_text())
                }
            }
            CellBody::Fun { name, arg } => {
                if self.is_broken() {
                    String::new()
                } else {
                    format!("{}{}", name.list_to_text(), arg.list_to_text())
                }
            }
            CellBody::Sqrt { inner } => format!("sqrt({})", inner.list_to_text()),
            CellBody::Abs { inner } => format!("abs({})", inner.list_to_text()),
            CellBody::Conjugate { inner } => {
                format!("conjugate({})", inner.list_to_text())
            }
            CellBody::At { base, index } => {
                format!("at({},{})", base.list_to_text(), index.list_to_text())
            }
            CellBody::Paren { inner, print, .. } => {
                let inner = inner.as_deref().map(Cell::list_to_text).unwrap_or_default();
                if *print {
                    format!("({inner})")
                } else {
                    inner
                }
            }
            CellBody::Limit { under, base, .. } => {
                let (var, to) = split_limit_under(&under.list_to_text());
                format!("limit({},{var},{to})", base.list_to_text())
            }
            CellBody::Matrix(matrix) => {
                let rows: Vec<String> = matrix
                    .rows
                    .iter()
                    .map(|row| {
                        let cells: Vec<String> =
                            row.iter().map(Cell::list_to_text).collect();
                        format!("[{}]", cells.join(","))
                    })
                    .collect();
                format!("matrix({})", rows.join(","))
            }
            CellBody::Group(group) => {
                let mut s = group.editor_text.clone();
                if let Some(output) = &group.output {
                    if !s.is_empty() {
                        s.push('\n');
                    }
                    s.push_str(&output.list_to_text());
                }
                s
            }
            CellBody::Editor { text, .. } => text.clone(),
            CellBody::Media(media) => media.path.clone(),
        }
    }
}
