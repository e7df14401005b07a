//! Office Math (OMML) rendering, for pasting into word processors.

use quick_xml::escape::escape;

use crate::cell::{Cell, CellBody, FracStyle, SumStyle};

fn run(text: &str) -> String {
    format!("<m:r><m:t>{}</m:t></m:r>", escape(text))
}

/// An empty run, the OMML placeholder for an absent script slot.
const EMPTY_RUN: &str = "<m:r></m:r>";

fn opt_omml(cell: &Option<Box<Cell>>) -> String {
    cell.as_deref()
        .map(Cell::list_to_omml)
        .unwrap_or_else(|| EMPTY_RUN.to_owned())
}

impl Cell {
    pub fn list_to_omml(&self) -> String {
        self.iter().map(Cell::to_omml).collect()
    }

    pub fn to_omml(&self) -> String {
        match &self.body {
            CellBody::Text { text, .. } => run(&text.replace('\u{2212}', "-")),
            CellBody::Frac {
                num, denom, style, ..
            } => {
                let props = match style {
                    FracStyle::Choose => "<m:fPr><m:type m:val=\"noBar\"/></m:fPr>",
                    _ => "",
                };
                format!(
                    "<m:f>{props}<m:num>{}</m:num><m:den>{}</m:den></m:f>",
                    num.list_to_omml(),
                    denom.list_to_omml()
                )
            }
            CellBody::Diff { diff, base } => {
                format!("{}{}", diff.list_to_omml(), base.list_to_omml())
            }
            CellBody::Expt { base, power, .. } => format!(
                "<m:sSup><m:e>{}</m:e><m:sup>{}</m:sup></m:sSup>",
                base.list_to_omml(),
                power.list_to_omml()
            ),
            CellBody::Sub { base, index } => format!(
                "<m:sSub><m:e>{}</m:e><m:sub>{}</m:sub></m:sSub>",
                base.list_to_omml(),
                index.list_to_omml()
            ),
            CellBody::SubSup {
                base,
                pre_sub,
                pre_sup,
                post_sub,
                post_sup,
                ..
            } => {
                let mut s = String::new();
                if pre_sub.is_some() || pre_sup.is_some() {
                    s.push_str(&format!(
                        "<m:sSubSup><m:e>{EMPTY_RUN}</m:e><m:sub>{}</m:sub>\
                         <m:sup>{}</m:sup></m:sSubSup>",
                        opt_omml(pre_sub),
                        opt_omml(pre_sup)
                    ));
                }
                match (post_sub, post_sup) {
                    (Some(sub), Some(sup)) => s.push_str(&format!(
                        "<m:sSubSup><m:e>{}</m:e><m:sub>{}</m:sub>\
                         <m:sup>{}</m:sup></m:sSubSup>",
                        base.list_to_omml(),
                        sub.list_to_omml(),
                        sup.list_to_omml()
                    )),
                    (Some(sub), None) => s.push_str(&format!(
                        "<m:sSub><m:e>{}</m:e><m:sub>{}</m:sub></m:sSub>",
                        base.list_to_omml(),
                        sub.list_to_omml()
                    )),
                    (None, Some(sup)) => s.push_str(&format!(
                        "<m:sSup><m:e>{}</m:e><m:sup>{}</m:sup></m:sSup>",
                        base.list_to_omml(),
                        sup.list_to_omml()
                    )),
                    (None, None) => s.push_str(&base.list_to_omml()),
                }
                s
            }
            CellBody::Sum {
                style,
                under,
                over,
                base,
            } => {
                let chr = match style {
                    SumStyle::Sum => "\u{2211}",
                    SumStyle::Prod => "\u{220F}",
                };
                let sup = over
                    .as_deref()
                    .map(Cell::list_to_omml)
                    .unwrap_or_default();
                format!(
                    "<m:nary><m:naryPr><m:chr m:val=\"{chr}\"/></m:naryPr>\
                     <m:sub>{}</m:sub><m:sup>{sup}</m:sup><m:e>{}</m:e></m:nary>",
                    under.list_to_omml(),
                    base.list_to_omml()
                )
            }
            CellBody::Int {
                definite,
                under,
                over,
                base,
                var,
            } => {
                let (sub, sup) = if *definite {
                    (opt_omml(under), opt_omml(over))
                } else {
                    (String::new(), String::new())
                };
                format!(
                    "<m:nary><m:naryPr><m:chr m:val=\"\u{222B}\"/></m:naryPr>\
                     <m:sub>{sub}</m:sub><m:sup>{sup}</m:sup>\
                     <m:e>{}{}{}</m:e></m:nary>",
                    base.list_to_omml(),
                    run("d"),
                    var.list_to_omml()
                )
            }
            CellBody::Fun { name, arg } => {
                if self.is_broken() {
                    String::new()
                } else {
                    format!(
                        "<m:func><m:fName>{}</m:fName><m:e>{}</m:e></m:func>",
                        name.list_to_omml(),
                        arg.list_to_omml()
                    )
                }
            }
            CellBody::Sqrt { inner } => format!(
                "<m:rad><m:radPr><m:degHide m:val=\"1\"/></m:radPr>\
                 <m:deg></m:deg><m:e>{}</m:e></m:rad>",
                inner.list_to_omml()
            ),
            CellBody::Abs { inner } => format!(
                "<m:d><m:dPr><m:begChr m:val=\"|\"/><m:endChr m:val=\"|\"/></m:dPr>\
                 <m:e>{}</m:e></m:d>",
                inner.list_to_omml()
            ),
            CellBody::Conjugate { inner } => format!(
                "<m:bar><m:barPr><m:pos m:val=\"top\"/></m:barPr>\
                 <m:e>{}</m:e></m:bar>",
                inner.list_to_omml()
            ),
            CellBody::At { base, index } => format!(
                "<m:sSub><m:e>{}{}</m:e><m:sub>{}</m:sub></m:sSub>",
                base.list_to_omml(),
                run("|"),
                index.list_to_omml()
            ),
            CellBody::Paren { inner, print, .. } => {
                let inner = inner
                    .as_deref()
                    .map(Cell::list_to_omml)
                    .unwrap_or_default();
                if *print {
                    format!("<m:d><m:e>{inner}</m:e></m:d>")
                } else {
                    inner
                }
            }
            CellBody::Limit { name, under, base, .. } => {
                let under_text = under.list_to_text().replace("->", "\u{2192}");
                format!(
                    "<m:func><m:fName><m:limLow><m:e>{}</m:e>\
                     <m:lim>{}</m:lim></m:limLow></m:fName>\
                     <m:e>{}</m:e></m:func>",
                    name.list_to_omml(),
                    run(&under_text),
                    base.list_to_omml()
                )
            }
            CellBody::Matrix(matrix) => {
                let mut s = String::from("<m:d><m:m>");
                for r in &matrix.rows {
                    s.push_str("<m:mr>");
                    for c in r {
                        s.push_str(&format!("<m:e>{}</m:e>", c.list_to_omml()));
                    }
                    s.push_str("</m:mr>");
                }
                s.push_str("</m:m></m:d>");
                s
            }
            CellBody::Group(group) => {
                let mut s = String::new();
                if !group.editor_text.is_empty() {
                    s.push_str(&run(&group.editor_text));
                }
                if let Some(output) = &group.output {
                    s.push_str(&output.list_to_omml());
                }
                s
            }
            CellBody::Editor { text, .. } => run(text),
            CellBody::Media(media) => run(&media.path),
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
    fn text_becomes_a_run() {
        let cell = parse("<mth><n>-5</n></mth>");
        assert_eq!(cell.list_to_omml(), "<m:r><m:t>-5</m:t></m:r>");
    }

    #[test]
    fn prescripts_emit_a_leading_script_group_with_empty_base() {
        let cell = parse(
            "<mth><ie><r><v>x</v></r><r pos=\"presub\"><n>1</n></r></ie></mth>",
        );
        let out = cell.list_to_omml();
        assert!(out.starts_with("<m:sSubSup><m:e><m:r></m:r></m:e>"));
        assert!(out.ends_with("<m:r><m:t>x</m:t></m:r>"));
    }

    #[test]
    fn limit_arrow_is_translated() {
        let cell = parse(
            "<mth><lm><r><fnm>lim</fnm></r><r><v>x</v><t>-&gt;</t><n>0</n></r>\
             <r><v>f</v></r></lm></mth>",
        );
        let out = cell.list_to_omml();
        assert!(out.contains("<m:lim><m:r><m:t>x\u{2192}0</m:t></m:r></m:lim>"));
    }

    #[test]
    fn sqrt_hides_the_degree() {
        let cell = parse("<mth><q><n>2</n></q></mth>");
        assert!(cell.list_to_omml().contains("<m:degHide m:val=\"1\"/>"));
    }
}
