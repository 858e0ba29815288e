// src/core/directive.rs

use crate::constants::DIRECTIVE_MARKER;
use crate::models::{ChainElement, Directive};

/// Parses one chain element.
///
/// Anything that does not start with `@@`, or is too short to carry a directive,
/// is a literal shell command. Directives take the form `@@[!]name:args`; the name
/// is case-insensitive and the arguments are kept verbatim.
pub fn parse_element(element: &str) -> ChainElement {
    let Some(body) = element
        .strip_prefix(DIRECTIVE_MARKER)
        .filter(|_| element.len() > DIRECTIVE_MARKER.len())
    else {
        return ChainElement::Literal(element.to_string());
    };

    let (negated, body) = match body.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, body),
    };

    let directive = match body.split_once(':') {
        Some((name, args)) => directive_from(name.trim(), args),
        None => Directive::Unknown(body.trim().to_string()),
    };
    ChainElement::Directive { negated, directive }
}

/// Parses a whole chain, in declaration order.
pub fn parse_chain(elements: &[String]) -> Vec<ChainElement> {
    elements.iter().map(|e| parse_element(e)).collect()
}

fn directive_from(name: &str, args: &str) -> Directive {
    match name.to_ascii_lowercase().as_str() {
        "hasfile" => Directive::HasFile(split_paths(args)),
        "hasfiles" => Directive::HasFiles(split_paths(args)),
        "cd" => Directive::Cd(args.trim().to_string()),
        "set" | "env" => Directive::Set(args.trim().to_string()),
        "unset" | "unenv" => Directive::Unset(args.trim().to_string()),
        "echo" => Directive::Echo(args.trim().to_string()),
        "isfile" => Directive::IsFile(args.trim().to_string()),
        "isdir" => Directive::IsDir(args.trim().to_string()),
        _ => Directive::Unknown(name.to_string()),
    }
}

/// Comma separated, trimmed, empty entries dropped.
fn split_paths(args: &str) -> Vec<String> {
    args.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directive(negated: bool, directive: Directive) -> ChainElement {
        ChainElement::Directive { negated, directive }
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse_element("echo hi"), ChainElement::Literal("echo hi".into()));
        assert_eq!(parse_element("@@"), ChainElement::Literal("@@".into()));
        assert_eq!(parse_element("@"), ChainElement::Literal("@".into()));
        assert_eq!(parse_element(""), ChainElement::Literal(String::new()));
        assert_eq!(
            parse_element("echo @@hasfile:x"),
            ChainElement::Literal("echo @@hasfile:x".into())
        );
    }

    #[test]
    fn test_file_guards_split_and_trim() {
        assert_eq!(
            parse_element("@@hasfile: a.txt , ,b.txt"),
            directive(false, Directive::HasFile(vec!["a.txt".into(), "b.txt".into()]))
        );
        assert_eq!(
            parse_element("@@!hasfiles:package.json"),
            directive(true, Directive::HasFiles(vec!["package.json".into()]))
        );
        assert_eq!(parse_element("@@hasfile:"), directive(false, Directive::HasFile(vec![])));
    }

    #[test]
    fn test_aliases_and_case() {
        assert_eq!(
            parse_element("@@env:A=1"),
            directive(false, Directive::Set("A=1".into()))
        );
        assert_eq!(
            parse_element("@@SET:A=1"),
            directive(false, Directive::Set("A=1".into()))
        );
        assert_eq!(parse_element("@@unenv:A"), directive(false, Directive::Unset("A".into())));
        assert_eq!(parse_element("@@unset:A"), directive(false, Directive::Unset("A".into())));
    }

    #[test]
    fn test_arguments_keep_inner_colons() {
        assert_eq!(
            parse_element("@@echo:  time: 12:00  "),
            directive(false, Directive::Echo("time: 12:00".into()))
        );
        assert_eq!(
            parse_element("@@cd:C:/work"),
            directive(false, Directive::Cd("C:/work".into()))
        );
    }

    #[test]
    fn test_unknown_directives() {
        assert_eq!(parse_element("@@frobnicate:x"), directive(false, Directive::Unknown("frobnicate".into())));
        assert_eq!(parse_element("@@!nocolon"), directive(true, Directive::Unknown("nocolon".into())));
    }

    #[test]
    fn test_parse_chain_keeps_order() {
        let chain = vec!["echo hi".to_string(), "@@isdir:src".to_string()];
        let parsed = parse_chain(&chain);
        assert_eq!(parsed.len(), 2);
        assert!(matches!(parsed.first(), Some(ChainElement::Literal(_))));
        assert!(matches!(
            parsed.get(1),
            Some(ChainElement::Directive { directive: Directive::IsDir(_), .. })
        ));
    }
}
