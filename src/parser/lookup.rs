//! Static tag dispatch tables.
//!
//! Tag names map to closed enums at compile time; the parser matches on the
//! enum exhaustively, so adding a tag is a two-line change here plus one
//! match arm there.

use phf::phf_map;

/// Inline expression tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InnerTag {
    Variable,
    Operator,
    MiscText,
    Number,
    Paren,
    Frac,
    Power,
    Sub,
    Fun,
    Greek,
    SpecialConstant,
    FunctionName,
    Sqrt,
    Diff,
    Sum,
    Integral,
    Space,
    At,
    Abs,
    Conjugate,
    SubSup,
    MultiScripts,
    Limit,
    Contents,
    Table,
    Math,
    OutputLabel,
    StringText,
    Highlight,
    HiddenOperator,
    Image,
    Slideshow,
    Editor,
    CellGroup,
    CharCode,
}

pub static INNER_TAGS: phf::Map<&'static str, InnerTag> = phf_map! {
    "v" => InnerTag::Variable,
    "mi" => InnerTag::Variable,
    "mo" => InnerTag::Operator,
    "t" => InnerTag::MiscText,
    "n" => InnerTag::Number,
    "mn" => InnerTag::Number,
    "p" => InnerTag::Paren,
    "f" => InnerTag::Frac,
    "mfrac" => InnerTag::Frac,
    "e" => InnerTag::Power,
    "msup" => InnerTag::Power,
    "i" => InnerTag::Sub,
    "munder" => InnerTag::Sub,
    "fn" => InnerTag::Fun,
    "g" => InnerTag::Greek,
    "s" => InnerTag::SpecialConstant,
    "fnm" => InnerTag::FunctionName,
    "q" => InnerTag::Sqrt,
    "d" => InnerTag::Diff,
    "sm" => InnerTag::Sum,
    "in" => InnerTag::Integral,
    "mspace" => InnerTag::Space,
    "at" => InnerTag::At,
    "a" => InnerTag::Abs,
    "cj" => InnerTag::Conjugate,
    "ie" => InnerTag::SubSup,
    "mmultiscripts" => InnerTag::MultiScripts,
    "lm" => InnerTag::Limit,
    "r" => InnerTag::Contents,
    "mrow" => InnerTag::Contents,
    "tb" => InnerTag::Table,
    "mth" => InnerTag::Math,
    "line" => InnerTag::Math,
    "lbl" => InnerTag::OutputLabel,
    "st" => InnerTag::StringText,
    "hl" => InnerTag::Highlight,
    "h" => InnerTag::HiddenOperator,
    "img" => InnerTag::Image,
    "slide" => InnerTag::Slideshow,
    "editor" => InnerTag::Editor,
    "cell" => InnerTag::CellGroup,
    "ascii" => InnerTag::CharCode,
};

/// Document group types carried by the `type` attribute of a `cell` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupTag {
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

pub static GROUP_TAGS: phf::Map<&'static str, GroupTag> = phf_map! {
    "code" => GroupTag::Code,
    "image" => GroupTag::Image,
    "pagebreak" => GroupTag::Pagebreak,
    "text" => GroupTag::Text,
    "title" => GroupTag::Title,
    "section" => GroupTag::Section,
    "subsection" => GroupTag::Subsection,
    "subsubsection" => GroupTag::Subsubsection,
    "heading5" => GroupTag::Heading5,
    "heading6" => GroupTag::Heading6,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_the_same_tag() {
        assert_eq!(INNER_TAGS.get("v"), INNER_TAGS.get("mi"));
        assert_eq!(INNER_TAGS.get("f"), INNER_TAGS.get("mfrac"));
        assert_eq!(INNER_TAGS.get("mth"), INNER_TAGS.get("line"));
        assert_eq!(INNER_TAGS.get("e"), INNER_TAGS.get("msup"));
    }

    #[test]
    fn unknown_names_miss() {
        assert!(INNER_TAGS.get("blob").is_none());
        assert!(GROUP_TAGS.get("chapter").is_none());
    }
}
