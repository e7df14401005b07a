//! Worksheet-XML rendering. The inverse of the parser: feeding the output
//! back through it reproduces the same structure.

use quick_xml::escape::escape;

use crate::cell::{
    Cell, CellBody, EditorKind, FracStyle, GroupKind, MatrixData, MediaData,
    SumStyle, TextStyle,
};

fn editor_type(kind: EditorKind) -> &'static str {
    match kind {
        EditorKind::Input => "input",
        EditorKind::Text => "text",
        EditorKind::Title => "title",
        EditorKind::Section => "section",
        EditorKind::Subsection => "subsection",
        EditorKind::Subsubsection => "subsubsection",
        EditorKind::Heading5 => "heading5",
        EditorKind::Heading6 => "heading6",
    }
}

fn group_type(kind: GroupKind) -> &'static str {
    match kind {
        GroupKind::Code => "code",
        GroupKind::Image => "image",
        GroupKind::Pagebreak => "pagebreak",
        GroupKind::Text => "text",
        GroupKind::Title => "title",
        GroupKind::Section => "section",
        GroupKind::Subsection => "subsection",
        GroupKind::Subsubsection => "subsubsection",
        GroupKind::Heading5 => "heading5",
        GroupKind::Heading6 => "heading6",
    }
}

/// A child chain wrapped in one `<r>` element.
fn wrap(cell: &Cell) -> String {
    format!("<r>{}</r>", cell.list_to_xml())
}

fn wrap_opt(cell: &Option<Box<Cell>>) -> String {
    match cell {
        Some(cell) => wrap(cell),
        None => "<r></r>".to_owned(),
    }
}

impl Cell {
    pub fn list_to_xml(&self) -> String {
        self.iter().map(Cell::to_xml).collect()
    }

    /// The line-break, tooltip and alternate-copy attributes shared by all
    /// tags. Left off tags whose reader keys behavior on the presence of any
    /// attribute.
    fn common_attrs(&self) -> String {
        let mut s = String::new();
        if self.forces_break_line() {
            s.push_str(" breakline=\"true\"");
        }
        if let Some(tooltip) = self.tooltip() {
            s.push_str(&format!(" tooltip=\"{}\"", escape(tooltip)));
        }
        if let Some(alt) = self.alt_copy_text() {
            s.push_str(&format!(" altCopy=\"{}\"", escape(alt)));
        }
        s
    }

    pub fn to_xml(&self) -> String {
        let attrs = self.common_attrs();
        match &self.body {
            CellBody::Text {
                text,
                hidable_mult,
                user_label,
            } => {
                let escaped = escape(text.as_str());
                if *hidable_mult {
                    return format!("<h{attrs}>{escaped}</h>");
                }
                match self.style() {
                    TextStyle::Variable => format!("<v{attrs}>{escaped}</v>"),
                    TextStyle::Operator => format!("<mo{attrs}>{escaped}</mo>"),
                    TextStyle::Number => format!("<n{attrs}>{escaped}</n>"),
                    TextStyle::String => format!("<st{attrs}>{escaped}</st>"),
                    TextStyle::FunctionName => format!("<fnm{attrs}>{escaped}</fnm>"),
                    TextStyle::Greek => format!("<g{attrs}>{escaped}</g>"),
                    TextStyle::SpecialConstant => format!("<s{attrs}>{escaped}</s>"),
                    TextStyle::Label => format!("<lbl{attrs}>{escaped}</lbl>"),
                    TextStyle::UserLabel => {
                        let label = user_label
                            .as_deref()
                            .map(|l| format!(" userdefinedlabel=\"{}\"", escape(l)))
                            .unwrap_or_default();
                        format!("<lbl userdefined=\"yes\"{label}{attrs}>{escaped}</lbl>")
                    }
                    TextStyle::Error => format!("<t type=\"error\"{attrs}>{escaped}</t>"),
                    TextStyle::Warning => {
                        format!("<t type=\"warning\"{attrs}>{escaped}</t>")
                    }
                    TextStyle::Default => format!("<t{attrs}>{escaped}</t>"),
                }
            }
            CellBody::Frac {
                num, denom, style, ..
            } => {
                let style_attr = match style {
                    FracStyle::Normal => "",
                    FracStyle::Choose => " line=\"no\"",
                    FracStyle::Diff => " diffstyle=\"yes\"",
                };
                format!("<f{style_attr}{attrs}>{}{}</f>", wrap(num), wrap(denom))
            }
            CellBody::Diff { diff, base } => {
                format!("<d{attrs}>{}{}</d>", wrap(diff), wrap(base))
            }
            CellBody::Expt {
                base,
                power,
                matrix,
            } => {
                // The reader treats any attribute as the matrix marker, so a
                // plain power stays attribute-free.
                if *matrix {
                    format!("<e mat=\"true\">{}{}</e>", wrap(base), wrap(power))
                } else {
                    format!("<e>{}{}</e>", wrap(base), wrap(power))
                }
            }
            CellBody::Sub { base, index } => {
                format!("<i{attrs}>{}{}</i>", wrap(base), wrap(index))
            }
            CellBody::SubSup {
                base,
                pre_sub,
                pre_sup,
                post_sub,
                post_sup,
                script_order,
            } => {
                if script_order.is_empty() {
                    format!(
                        "<ie{attrs}>{}{}{}</ie>",
                        wrap(base),
                        wrap_opt(post_sub),
                        wrap_opt(post_sup)
                    )
                } else {
                    let mut s = format!("<ie{attrs}>{}", wrap(base));
                    for (slot, pos) in [
                        (pre_sub, "presub"),
                        (pre_sup, "presup"),
                        (post_sub, "postsub"),
                        (post_sup, "postsup"),
                    ] {
                        if let Some(script) = slot {
                            s.push_str(&format!(
                                "<r pos=\"{pos}\">{}</r>",
                                script.list_to_xml()
                            ));
                        }
                    }
                    s.push_str("</ie>");
                    s
                }
            }
            CellBody::Sum {
                style,
                under,
                over,
                base,
            } => {
                let kind = match (style, over) {
                    (SumStyle::Prod, _) => "prod",
                    (SumStyle::Sum, Some(_)) => "sum",
                    (SumStyle::Sum, None) => "lsum",
                };
                format!(
                    "<sm type=\"{kind}\"{attrs}>{}{}{}</sm>",
                    wrap(under),
                    wrap_opt(over),
                    wrap(base)
                )
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
                        "<in{attrs}>{}{}{}{}</in>",
                        wrap_opt(under),
                        wrap_opt(over),
                        wrap(base),
                        wrap(var)
                    )
                } else {
                    format!("<in def=\"false\"{attrs}>{}{}</in>", wrap(base), wrap(var))
                }
            }
            CellBody::Fun { name, arg } => {
                format!("<fn{attrs}>{}{}</fn>", wrap(name), wrap(arg))
            }
            CellBody::Sqrt { inner } => {
                format!("<q{attrs}>{}</q>", inner.list_to_xml())
            }
            CellBody::Abs { inner } => {
                format!("<a{attrs}>{}</a>", inner.list_to_xml())
            }
            CellBody::Conjugate { inner } => {
                format!("<cj{attrs}>{}</cj>", inner.list_to_xml())
            }
            CellBody::At { base, index } => {
                format!("<at{attrs}>{}{}</at>", wrap(base), wrap(index))
            }
            CellBody::Paren { inner, print, .. } => {
                let inner = inner
                    .as_deref()
                    .map(Cell::list_to_xml)
                    .unwrap_or_default();
                // Same attribute-presence convention as <e>.
                if *print {
                    format!("<p>{inner}</p>")
                } else {
                    format!("<p print=\"no\">{inner}</p>")
                }
            }
            CellBody::Limit {
                name, under, base, ..
            } => format!(
                "<lm{attrs}>{}{}{}</lm>",
                wrap(name),
                wrap(under),
                wrap(base)
            ),
            CellBody::Matrix(matrix) => matrix_to_xml(matrix, &attrs),
            CellBody::Group(group) => {
                let mut s = format!("<cell type=\"{}\"", group_type(group.kind));
                if group.hide {
                    s.push_str(" hide=\"true\"");
                }
                if group.kind == GroupKind::Code && group.auto_answer {
                    s.push_str(" auto_answer=\"yes\"");
                }
                if group.suppress_tooltip {
                    s.push_str(" hideToolTip=\"true\"");
                }
                s.push('>');
                s.push_str(&format!(
                    "<editor type=\"{}\">",
                    editor_type(group.editor_kind)
                ));
                if !group.editor_text.is_empty() {
                    for line in group.editor_text.split('\n') {
                        s.push_str(&format!("<line>{}</line>", escape(line)));
                    }
                }
                s.push_str("</editor>");
                if let Some(hidden) = &group.hidden {
                    s.push_str(&format!("<fold>{}</fold>", hidden.list_to_xml()));
                }
                if let Some(output) = &group.output {
                    s.push_str(&output.list_to_xml());
                }
                s.push_str("</cell>");
                s
            }
            CellBody::Editor { text, kind } => {
                let mut s = format!("<editor type=\"{}\">", editor_type(*kind));
                if !text.is_empty() {
                    for line in text.split('\n') {
                        s.push_str(&format!("<line>{}</line>", escape(line)));
                    }
                }
                s.push_str("</editor>");
                s
            }
            CellBody::Media(media) => media_to_xml(media, &attrs),
        }
    }
}

fn matrix_to_xml(matrix: &MatrixData, attrs: &str) -> String {
    let mut s = String::from("<tb");
    for (flag, name) in [
        (matrix.special, "special"),
        (matrix.inference, "inference"),
        (matrix.col_names, "colnames"),
        (matrix.row_names, "rownames"),
        (matrix.rounded_parens, "roundedParens"),
    ] {
        if flag {
            s.push_str(&format!(" {name}=\"true\""));
        }
    }
    s.push_str(attrs);
    s.push('>');
    for row in &matrix.rows {
        s.push_str("<mtr>");
        for cell in row {
            s.push_str(&format!("<mtd>{}</mtd>", cell.list_to_xml()));
        }
        s.push_str("</mtr>");
    }
    s.push_str("</tb>");
    s
}

fn media_to_xml(media: &MediaData, attrs: &str) -> String {
    let path = escape(media.path.as_str());
    if media.animation {
        let mut s = String::from("<slide");
        if media.delete_file {
            s.push_str(" del=\"true\"");
        }
        if !media.running {
            s.push_str(" running=\"false\"");
        }
        if let Some(fr) = media.frame_rate {
            s.push_str(&format!(" fr=\"{fr}\""));
        }
        if let Some(frame) = media.displayed_frame {
            s.push_str(&format!(" frame=\"{frame}\""));
        }
        if let Some(src) = &media.gnuplot_source {
            s.push_str(&format!(" gnuplotSources=\"{}\"", escape(src.as_str())));
        }
        if let Some(data) = &media.gnuplot_data {
            s.push_str(&format!(" gnuplotData=\"{}\"", escape(data.as_str())));
        }
        s.push_str(attrs);
        s.push_str(&format!(">{path}</slide>"));
        s
    } else {
        let mut s = String::from("<img");
        if !media.delete_file {
            s.push_str(" del=\"no\"");
        }
        if !media.draw_rect {
            s.push_str(" rect=\"false\"");
        }
        if let Some(src) = &media.gnuplot_source {
            s.push_str(&format!(" gnuplotsource=\"{}\"", escape(src.as_str())));
        }
        if let Some(data) = &media.gnuplot_data {
            s.push_str(&format!(" gnuplotdata=\"{}\"", escape(data.as_str())));
        }
        if let Some(w) = media.max_width {
            s.push_str(&format!(" maxWidth=\"{w}\""));
        }
        if let Some(h) = media.max_height {
            s.push_str(&format!(" maxHeight=\"{h}\""));
        }
        s.push_str(attrs);
        s.push_str(&format!(">{path}</img>"));
        s
    }
}
